//! # 模拟内核
//!
//! A host-side stand-in for the kernel under test and its grading driver.
//! Test programs written against [`ag::Kernel`] run here as host threads,
//! one per simulated process, on top of an in-memory file system.

mod driver;
mod fs;
mod kernel;
mod machine;
mod path;
mod process;

pub use self::{
    driver::{Driver, Halted, Outcome},
    fs::FsError,
    kernel::SimProcess,
    machine::{Machine, MachineBuilder, Program, Report, SimError, Verdict},
    process::{Pid, Termination, MAX_OPEN_FILES},
};

/// 一页的大小，`exec`的参数总长不能超过它
pub const PAGE_SIZE: usize = 1024;
