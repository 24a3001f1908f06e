//! # 用户测试程序
//!
//! Each program is a `main` generic over [`ag::Kernel`], so the same body
//! runs inside the kernel under test (through [`ag::guest::GuestKernel`]) or
//! on the host simulator.
//!
//! A bin wraps a program with [`entry!`]:
//!
//! ```ignore
//! #![cfg_attr(all(target_arch = "riscv64", target_os = "none"), no_std, no_main)]
//!
//! user::entry!(user::exec_test::main);
//! ```

#![cfg_attr(all(target_arch = "riscv64", target_os = "none"), no_std)]

extern crate alloc;


#[cfg(all(target_arch = "riscv64", target_os = "none"))]
mod rt;

#[cfg(all(target_arch = "riscv64", target_os = "none"))]
pub use ag::guest::GuestKernel;

/// Every program this crate ships, by bin name.
pub const PROGRAMS: &[&str] = &["exec_test", "file_tests", "dir_test"];

/// Generates a bin's entry point for `main`.
///
/// Inside the kernel under test it becomes the symbol the runtime's
/// `_start` jumps to; on the host the bin only explains how to run it.
#[macro_export]
macro_rules! entry {
    ($main:path) => {
        #[cfg(all(target_arch = "riscv64", target_os = "none"))]
        #[no_mangle]
        fn ag_main(args: &[&str]) -> ! {
            $main(&$crate::GuestKernel, args)
        }

        #[cfg(not(all(target_arch = "riscv64", target_os = "none")))]
        fn main() {
            $crate::hosted(::core::env!("CARGO_BIN_NAME"))
        }
    };
}

#[cfg(not(all(target_arch = "riscv64", target_os = "none")))]
pub fn hosted(name: &str) -> ! {
    eprintln!("{name} talks to the kernel under test and cannot run on its own.");
    eprintln!("Run it on the simulator instead: ag-grader {name} <TEST_ID>");
    std::process::exit(2)
}
