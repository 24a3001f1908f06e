//! 内核中运行时的入口、堆、控制台与日志

#[macro_use]
pub mod console;
mod lang_items;
mod logging;

use alloc::vec::Vec;
use core::ffi::{c_char, CStr};
use core::ptr;

use buddy_system_allocator::LockedHeap;

/// 32KB 的堆空间
const USER_HEAP_SIZE: usize = 0x8000;

static mut HEAP_SPACE: [u8; USER_HEAP_SIZE] = [0; USER_HEAP_SIZE];

#[global_allocator]
static HEAP: LockedHeap<32> = LockedHeap::empty();

extern "Rust" {
    /// 由 bin 中的 `entry!` 定义
    fn ag_main(args: &[&str]) -> !;
}

/// 内核以`argc`与以 null 结尾的`argv`进入程序
#[no_mangle]
#[link_section = ".text.entry"]
pub extern "C" fn _start(argc: usize, argv: *const *const c_char) -> ! {
    unsafe {
        HEAP.lock()
            .init(ptr::addr_of_mut!(HEAP_SPACE) as usize, USER_HEAP_SIZE);
    }
    logging::init();

    let args: Vec<&str> = (0..argc)
        .map(|i| unsafe { CStr::from_ptr(*argv.add(i)) })
        .map(|arg| arg.to_str().unwrap_or_default())
        .collect();

    unsafe { ag_main(&args) }
}
