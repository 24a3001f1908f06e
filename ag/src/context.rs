use alloc::string::String;
use alloc::vec;
use core::fmt;

use crate::kernel::{Kernel, STDOUT};
use crate::protocol::{Request, Semaphore, Slot};
use crate::words;

/// Who performs the first V on [`Semaphore::ProcessLock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockInit {
    /// The driver creates the lock with one permit before any test process
    /// starts.
    Driver,
    /// The process that sees `ProcessCount == 0` releases the lock once.
    ///
    /// Only sound while the first process registers before any sibling can
    /// observe the counter.
    FirstProcess,
}

impl Default for LockInit {
    fn default() -> Self {
        if cfg!(feature = "legacy-lock-init") {
            Self::FirstProcess
        } else {
            Self::Driver
        }
    }
}

/// Per-process harness state, handed to the test body.
pub struct Context<'k, K> {
    kernel: &'k K,
    process_id: i32,
    test_id: i32,
    shell_program_name: String,
}

impl<'k, K: Kernel> Context<'k, K> {
    /// Registers the calling process with the driver.
    ///
    /// Takes the next value of [`Slot::ProcessCount`] as this process's ID
    /// under [`Semaphore::ProcessLock`], then reads the shell program name and
    /// the test selector.
    pub fn register(kernel: &'k K, lock_init: LockInit) -> Self {
        let mut ctx = Self {
            kernel,
            process_id: 0,
            test_id: 0,
            shell_program_name: String::new(),
        };

        if lock_init == LockInit::FirstProcess && ctx.load(Slot::ProcessCount) == 0 {
            ctx.v(Semaphore::ProcessLock);
        }

        ctx.p(Semaphore::ProcessLock);
        ctx.process_id = ctx.load(Slot::ProcessCount);
        ctx.store(Slot::ProcessCount, ctx.process_id + 1);
        ctx.v(Semaphore::ProcessLock);

        ctx.shell_program_name =
            ctx.string_argument(Slot::ShellProgramName, Slot::SHELL_PROGRAM_NAME_WORDS);
        ctx.test_id = ctx.load(Slot::TestId);

        log::debug!(
            "registered process {} of {:?}, test {}",
            ctx.process_id,
            ctx.shell_program_name,
            ctx.test_id
        );

        ctx
    }

    pub fn kernel(&self) -> &'k K {
        self.kernel
    }

    pub fn process_id(&self) -> i32 {
        self.process_id
    }

    pub fn test_id(&self) -> i32 {
        self.test_id
    }

    pub fn shell_program_name(&self) -> &str {
        &self.shell_program_name
    }

    #[doc(alias = "agLoad")]
    pub fn load(&self, slot: Slot) -> i32 {
        self.load_index(slot.index())
    }

    #[doc(alias = "agStore")]
    pub fn store(&self, slot: Slot, value: i32) {
        self.kernel
            .ag(Request::StoreWord.code(), [slot.index(), value]);
    }

    /// Fills `dst` from the slots starting at `slot`, four bytes per slot.
    #[doc(alias = "getStringArgument")]
    pub fn load_words(&self, slot: Slot, dst: &mut [u8]) {
        let base = slot.index();
        let count = dst.len().div_ceil(words::WORD_BYTES) as i32;
        words::unpack_into((0..count).map(|i| self.load_index(base + i)), dst);
    }

    /// Reads a NUL padded string of `count` words starting at `slot`.
    pub fn string_argument(&self, slot: Slot, count: usize) -> String {
        let mut buf = vec![0; count * words::WORD_BYTES];
        self.load_words(slot, &mut buf);
        String::from_utf8_lossy(words::c_str(&buf)).into_owned()
    }

    fn load_index(&self, index: i32) -> i32 {
        self.kernel.ag(Request::LoadWord.code(), [index, 0])
    }

    pub fn p(&self, semaphore: Semaphore) {
        self.kernel.ag(Request::P.code(), [semaphore.id(), 0]);
    }

    pub fn v(&self, semaphore: Semaphore) {
        self.kernel.ag(Request::V.code(), [semaphore.id(), 0]);
    }

    /// 父进程等待一个子进程的[`signal_parent`](Self::signal_parent)
    #[doc(alias = "childWait")]
    pub fn wait_child(&self) {
        self.p(Semaphore::ChildWait);
    }

    #[doc(alias = "parentSignal")]
    pub fn signal_parent(&self) {
        self.v(Semaphore::ChildWait);
    }

    pub fn checkpoint(&self, value: i32) {
        self.kernel.ag(Request::Checkpoint.code(), [value, 0]);
    }

    /// Asks the driver whether the file named in `count` words at `slot`
    /// exists.
    pub fn file_exists(&self, slot: Slot, count: usize) -> bool {
        self.kernel
            .ag(Request::Exists.code(), [slot.index(), count as i32])
            == 1
    }

    /// Re-executes the shell program with no arguments.
    pub fn restart(&self) -> i32 {
        self.kernel.exec(&self.shell_program_name, &[])
    }

    #[doc(alias = "agDone")]
    pub fn done(&self) -> ! {
        log::info!("process {} reports done", self.process_id);
        self.kernel.ag(Request::Done.code(), [0, 0]);
        self.kernel.exit(0)
    }

    #[doc(alias = "agFail")]
    pub fn fail(&self) -> ! {
        log::error!("process {} reports failure", self.process_id);
        self.kernel.ag(Request::Fail.code(), [0, 0]);
        self.kernel.exit(1)
    }

    pub fn exit(&self, status: i32) -> ! {
        self.kernel.exit(status)
    }

    pub fn stdout(&self) -> Stdout<'k, K> {
        Stdout(self.kernel)
    }
}

/// [`fmt::Write`] over the process's standard output.
pub struct Stdout<'k, K>(&'k K);

impl<K: Kernel> fmt::Write for Stdout<'_, K> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        match self.0.write(STDOUT, s.as_bytes()) {
            n if n as usize == s.len() => Ok(()),
            _ => Err(fmt::Error),
        }
    }
}

/// Harness entry: registers the process, runs the selected test body, and
/// reports failure if the body returns without reaching an outcome.
pub fn start<K, F>(kernel: &K, args: &[&str], run: F) -> !
where
    K: Kernel,
    F: FnOnce(&Context<'_, K>, &[&str]),
{
    let ctx = Context::register(kernel, LockInit::default());
    run(&ctx, args);

    log::error!(
        "test {} fell through in process {}",
        ctx.test_id,
        ctx.process_id
    );
    ctx.fail()
}
