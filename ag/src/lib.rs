//! # ag 测试支架
//!
//! Every test program links this crate. It registers the process with the
//! grading driver, exposes the driver's parameter slots and semaphores, and
//! reports the test outcome back to the driver.
//!
//! ## Layers
//!
//! 1. [`Kernel`]: the raw syscall surface of the kernel under test
//! 2. [`Request`], [`Slot`], [`Semaphore`]: the driver's pseudo-syscall protocol
//! 3. [`Context`]: per-process harness state handed to the test body

#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod context;
mod kernel;
mod protocol;
pub mod words;

#[cfg(all(target_arch = "riscv64", target_os = "none"))]
pub mod guest;

pub use self::{
    context::{start, Context, LockInit, Stdout},
    kernel::{Kernel, STDIN, STDOUT},
    protocol::{Request, Semaphore, Slot},
};

#[doc(hidden)]
pub use log as __log;

/// Checks a test postcondition, reporting failure to the driver when it
/// does not hold.
///
/// ```ignore
/// ag::ensure!(ctx, fd != -1);
/// ag::ensure!(ctx, status == expected, "status {status} != {expected}");
/// ```
#[macro_export]
macro_rules! ensure {
    ($ctx:expr, $cond:expr $(,)?) => {
        if !$cond {
            $crate::__log::error!(
                "assertion failed at {}:{}: {}",
                ::core::file!(),
                ::core::line!(),
                ::core::stringify!($cond)
            );
            $ctx.fail()
        }
    };
    ($ctx:expr, $cond:expr, $($arg:tt)+) => {
        if !$cond {
            $crate::__log::error!(
                "assertion failed at {}:{}: {}",
                ::core::file!(),
                ::core::line!(),
                ::core::format_args!($($arg)+)
            );
            $ctx.fail()
        }
    };
}
