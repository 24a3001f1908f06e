use core::fmt::{self, Write};

use ag::guest::GuestKernel;
use ag::{Kernel, STDOUT};

struct Stdout;

impl Write for Stdout {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        match GuestKernel.write(STDOUT, s.as_bytes()) {
            -1 => Err(fmt::Error),
            _ => Ok(()),
        }
    }
}

pub fn print(args: fmt::Arguments) {
    // 标准输出都写不了时也没有别处可以报告
    let _ = Stdout.write_fmt(args);
}

macro_rules! println {
    ($($arg:tt)*) => {
        $crate::rt::console::print(format_args!("{}\n", format_args!($($arg)*)))
    };
}
