use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use ag::{LockInit, Semaphore, Slot};
use derive_more::Display;

use crate::driver::{Driver, Outcome};
use crate::fs::{FileSystem, FsError};
use crate::kernel::{SimProcess, Unwind};
use crate::path::Path;
use crate::process::{Pid, ProcessTable, Termination};

/// 停机后等待各进程线程退出的时间
const GRACE: Duration = Duration::from_secs(1);

/// A test program: runs as one simulated process with its argv.
pub type Program = Arc<dyn Fn(&SimProcess, &[&str]) + Send + Sync>;

#[derive(Debug, Display)]
pub enum SimError {
    #[display(fmt = "no program named {:?}", _0)]
    UnknownProgram(String),
    #[display(fmt = "{:?} does not fit in {} words", _0, _1)]
    StringTooLong(String, usize),
    #[display(fmt = "cannot seed {}: {}", _0, _1)]
    Seed(String, FsError),
    #[display(fmt = "machine already booted")]
    AlreadyBooted,
}

impl std::error::Error for SimError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Verdict {
    /// A process reported done.
    #[display(fmt = "done")]
    Done,
    /// A process reported failure.
    #[display(fmt = "fail")]
    Fail,
    /// Every process exited without reporting.
    #[display(fmt = "exited without outcome")]
    Exited,
    #[display(fmt = "timed out")]
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub verdict: Verdict,
    pub checkpoints: Vec<i32>,
    pub stdout: Vec<u8>,
    /// 停机时仍在运行的进程
    pub halted: Vec<Pid>,
}

#[derive(Debug, Default)]
pub(crate) struct KernelState {
    pub fs: FileSystem,
    pub processes: ProcessTable,
}

impl KernelState {
    /// 以进程`pid`的当前目录解析`path`
    pub fn resolve(&self, pid: Pid, path: &str) -> Option<String> {
        let cwd = &self.processes.get(pid)?.cwd;
        path.canonicalize(cwd)
    }
}

pub(crate) struct Shared {
    pub driver: Driver,
    kernel: Mutex<KernelState>,
    /// 有进程结束或机器停机
    pub exited: Condvar,
    pub stdin: Mutex<VecDeque<u8>>,
    pub stdout: Mutex<Vec<u8>>,
    programs: HashMap<String, Program>,
}

impl Shared {
    pub fn kernel(&self) -> MutexGuard<'_, KernelState> {
        self.kernel.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn halt(&self) {
        self.driver.halt();
        let _kernel = self.kernel();
        self.exited.notify_all();
    }

    /// The first report halts the machine.
    pub fn report(&self, outcome: Outcome, pid: Pid) {
        if self.driver.report(outcome, pid) {
            self.halt();
        }
    }

    /// Starts `path` as a new process. Children inherit the parent's cwd.
    pub fn launch(self: &Arc<Self>, parent: Option<Pid>, path: &str, args: &[&str]) -> Option<Pid> {
        let Some(program) = self.programs.get(path.trim_start_matches('/')).cloned() else {
            log::debug!("exec {path:?}: no such program");
            return None;
        };

        let pid = {
            let mut kernel = self.kernel();
            let cwd = parent
                .and_then(|parent| kernel.processes.get(parent))
                .map_or_else(|| String::from("/"), |parent| parent.cwd.clone());
            kernel.processes.spawn(parent, cwd)
        };
        self.driver.process_started();

        log::debug!("pid={pid} starts {path:?} {args:?}");
        let args: Vec<String> = args.iter().map(|&arg| arg.to_owned()).collect();
        let shared = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(format!("{path}#{pid}"))
            .spawn(move || shared.run(pid, program, args));
        if let Err(e) = spawned {
            log::error!("cannot start thread for pid={pid}: {e}");
            self.kernel().processes.reap(pid);
            self.driver.process_ended();
            return None;
        }

        Some(pid)
    }

    fn run(self: Arc<Self>, pid: Pid, program: Program, args: Vec<String>) {
        let process = SimProcess::new(pid, Arc::clone(&self));
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        let body = AssertUnwindSafe(|| (*program)(&process, &args[..]));
        let termination = match panic::catch_unwind(body) {
            Ok(()) => Termination::Exited(0),
            Err(payload) => match payload.downcast::<Unwind>() {
                Ok(unwind) => unwind.0,
                Err(_) => {
                    log::warn!("pid={pid} died of an unhandled exception");
                    Termination::Exception
                }
            },
        };

        log::debug!("pid={pid} terminated: {termination:?}");
        if self.kernel().processes.terminate(pid, termination) {
            self.exited.notify_all();
        }
        self.driver.process_ended();
    }
}

pub struct MachineBuilder {
    programs: HashMap<String, Program>,
    fs: FileSystem,
    driver: Driver,
    stdin: VecDeque<u8>,
    lock_init: LockInit,
}

impl MachineBuilder {
    pub fn program<F>(mut self, name: &str, program: F) -> Self
    where
        F: Fn(&SimProcess, &[&str]) + Send + Sync + 'static,
    {
        self.programs.insert(name.to_owned(), Arc::new(program));
        self
    }

    pub fn slot(self, slot: Slot, value: i32) -> Self {
        self.driver.set_slot(slot, value);
        self
    }

    /// Packs `s` into `words` slots starting at `slot`.
    pub fn string(self, slot: Slot, s: &str, words: usize) -> Result<Self, SimError> {
        if !self.driver.set_string(slot, s, words) {
            return Err(SimError::StringTooLong(s.to_owned(), words));
        }
        Ok(self)
    }

    /// Seeds a file, creating its parent directories.
    pub fn file(mut self, path: &str, contents: &[u8]) -> Result<Self, SimError> {
        let seeded = path
            .canonicalize("/")
            .ok_or(FsError::InvalidPath)
            .and_then(|canonical| self.fs.write_file(&canonical, contents));
        seeded.map_err(|e| SimError::Seed(path.to_owned(), e))?;
        Ok(self)
    }

    pub fn dir(mut self, path: &str) -> Result<Self, SimError> {
        let created = path
            .canonicalize("/")
            .ok_or(FsError::InvalidPath)
            .and_then(|canonical| self.fs.create_dir_all(&canonical));
        created.map_err(|e| SimError::Seed(path.to_owned(), e))?;
        Ok(self)
    }

    pub fn stdin(mut self, bytes: &[u8]) -> Self {
        self.stdin.extend(bytes);
        self
    }

    pub fn lock_init(mut self, lock_init: LockInit) -> Self {
        self.lock_init = lock_init;
        self
    }

    pub fn build(self) -> Machine {
        if self.lock_init == LockInit::Driver {
            self.driver.set_permits(Semaphore::ProcessLock, 1);
        }

        Machine {
            shared: Arc::new(Shared {
                driver: self.driver,
                kernel: Mutex::new(KernelState {
                    fs: self.fs,
                    processes: ProcessTable::default(),
                }),
                exited: Condvar::new(),
                stdin: Mutex::new(self.stdin),
                stdout: Mutex::new(Vec::new()),
                programs: self.programs,
            }),
            booted: AtomicBool::new(false),
        }
    }
}

/// A simulated kernel together with its grading driver.
///
/// ```ignore
/// let machine = Machine::builder()
///     .program("exec_test", |process, args| user::exec_test::main(process, args))
///     .slot(Slot::TestId, 3)
///     .build();
/// let report = machine.run("exec_test", &[], Duration::from_secs(5))?;
/// ```
pub struct Machine {
    shared: Arc<Shared>,
    booted: AtomicBool,
}

impl Machine {
    pub fn builder() -> MachineBuilder {
        MachineBuilder {
            programs: HashMap::new(),
            fs: FileSystem::new(),
            driver: Driver::default(),
            stdin: VecDeque::new(),
            lock_init: LockInit::default(),
        }
    }

    pub fn driver(&self) -> &Driver {
        &self.shared.driver
    }

    /// Boots `program` as the first process and waits until the test
    /// settles or `timeout` elapses, then halts the machine.
    ///
    /// The booted program becomes the shell program that `restart`
    /// re-executes.
    pub fn run(&self, program: &str, args: &[&str], timeout: Duration) -> Result<Report, SimError> {
        if self.booted.swap(true, Ordering::SeqCst) {
            return Err(SimError::AlreadyBooted);
        }

        let driver = &self.shared.driver;
        if !driver.set_string(Slot::ShellProgramName, program, Slot::SHELL_PROGRAM_NAME_WORDS) {
            return Err(SimError::StringTooLong(
                program.to_owned(),
                Slot::SHELL_PROGRAM_NAME_WORDS,
            ));
        }

        log::info!("booting {program:?} with {args:?}");
        self.shared
            .launch(None, program, args)
            .ok_or_else(|| SimError::UnknownProgram(program.to_owned()))?;

        let settled = driver.wait_settled(timeout);
        self.shared.halt();
        if !driver.wait_idle(GRACE) {
            log::warn!("some processes ignored the halt");
        }

        let verdict = match driver.outcome() {
            Some(Outcome::Done) => Verdict::Done,
            Some(Outcome::Fail) => Verdict::Fail,
            None if settled => Verdict::Exited,
            None => Verdict::TimedOut,
        };
        let halted = self
            .shared
            .kernel()
            .processes
            .iter()
            .filter(|(_, process)| process.termination == Some(Termination::Halted))
            .map(|(pid, _)| pid)
            .collect();
        log::info!("{program:?} finished: {verdict}");

        Ok(Report {
            verdict,
            checkpoints: driver.checkpoints(),
            stdout: self.stdout(),
            halted,
        })
    }

    pub fn exists(&self, path: &str) -> bool {
        path.canonicalize("/")
            .is_some_and(|path| self.shared.kernel().fs.exists(&path))
    }

    pub fn read_file(&self, path: &str) -> Result<Vec<u8>, FsError> {
        let path = path.canonicalize("/").ok_or(FsError::InvalidPath)?;
        self.shared.kernel().fs.read_file(&path)
    }

    pub fn stdout(&self) -> Vec<u8> {
        self.shared
            .stdout
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Drop for Machine {
    fn drop(&mut self) {
        self.shared.halt();
    }
}
