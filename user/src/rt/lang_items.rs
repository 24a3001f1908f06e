use core::panic::PanicInfo;

use ag::guest::GuestKernel;
use ag::Kernel;

/// panic 视作未处理的异常：父进程 join 时得到 -1
#[panic_handler]
fn panic_handler(panic_info: &PanicInfo) -> ! {
    let err = panic_info.message();

    if let Some(location) = panic_info.location() {
        println!(
            "Panicked at {}:{}, {}",
            location.file(),
            location.line(),
            err
        );
    } else {
        println!("Panicked: {}", err);
    }

    GuestKernel.exit(-1)
}
