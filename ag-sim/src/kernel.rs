//! 模拟进程的系统调用
//!
//! Every call first checks whether the machine has halted; a halted
//! machine terminates the caller on its next syscall.

use std::cmp;
use std::panic;
use std::sync::Arc;

use ag::{Kernel, Request};

use crate::driver::{Halted, Outcome};
use crate::fs::{FileData, FileSystem, FsError};
use crate::machine::{KernelState, Shared};
use crate::path::Path;
use crate::process::{Descriptor, Endpoint, Pid, Termination};
use crate::PAGE_SIZE;

/// 结束进程线程时携带的载荷
pub(crate) struct Unwind(pub Termination);

/// One simulated process, handed to its program as the [`Kernel`].
pub struct SimProcess {
    pid: Pid,
    shared: Arc<Shared>,
}

impl SimProcess {
    pub(crate) fn new(pid: Pid, shared: Arc<Shared>) -> Self {
        Self { pid, shared }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    fn terminate(&self, termination: Termination) -> ! {
        panic::resume_unwind(Box::new(Unwind(termination)))
    }

    fn enter(&self, name: &str) {
        if self.shared.driver.is_halted() {
            log::trace!("pid={} called {name} after halt", self.pid);
            self.terminate(Termination::Halted);
        }
        log::trace!("pid={} {name}", self.pid);
    }

    /// Runs a path syscall whose only result is success or failure.
    fn fs_op<F>(&self, name: &str, path: &str, op: F) -> i32
    where
        F: FnOnce(&mut KernelState, &str) -> Result<(), FsError>,
    {
        self.enter(name);
        let mut kernel = self.shared.kernel();
        let Some(canonical) = kernel.resolve(self.pid, path) else {
            log::debug!("pid={} {name} {path:?}: invalid path", self.pid);
            return -1;
        };

        match op(&mut *kernel, &canonical) {
            Ok(()) => 0,
            Err(e) => {
                log::debug!("pid={} {name} {canonical}: {e}", self.pid);
                -1
            }
        }
    }

    /// Opens `path` through `open_with` and installs a descriptor for it.
    fn open_with<F>(&self, name: &str, path: &str, open_with: F) -> i32
    where
        F: FnOnce(&mut FileSystem, &str) -> Result<FileData, FsError>,
    {
        self.enter(name);
        let mut kernel = self.shared.kernel();
        let Some(canonical) = kernel.resolve(self.pid, path) else {
            return -1;
        };
        let data = match open_with(&mut kernel.fs, &canonical) {
            Ok(data) => data,
            Err(e) => {
                log::debug!("pid={} {name} {canonical}: {e}", self.pid);
                return -1;
            }
        };

        let Some(process) = kernel.processes.get_mut(self.pid) else {
            return -1;
        };
        match process.fd_table.insert(Descriptor::file(data)) {
            Some(fd) => fd as i32,
            None => {
                log::debug!("pid={} {name} {canonical}: too many open files", self.pid);
                -1
            }
        }
    }

    fn exists(&self, index: i32, words: i32) -> i32 {
        let Ok(words) = usize::try_from(words) else {
            return -1;
        };
        let name = self.shared.driver.string(index, words);
        let exists = name
            .canonicalize("/")
            .is_some_and(|path| self.shared.kernel().fs.exists(&path));
        log::debug!("pid={} exists {name:?}: {exists}", self.pid);

        i32::from(exists)
    }
}

impl Kernel for SimProcess {
    fn exec(&self, path: &str, args: &[&str]) -> i32 {
        self.enter("exec");
        let arg_bytes: usize = args.iter().map(|arg| arg.len() + 1).sum();
        if arg_bytes > PAGE_SIZE {
            log::debug!(
                "pid={} exec {path:?}: {arg_bytes} bytes of arguments",
                self.pid
            );
            return -1;
        }

        self.shared
            .launch(Some(self.pid), path, args)
            .unwrap_or(-1)
    }

    fn join(&self, pid: Pid, status: &mut i32) -> i32 {
        self.enter("join");
        let mut kernel = self.shared.kernel();
        match kernel.processes.get(pid) {
            Some(child) if child.parent == Some(self.pid) => (),
            _ => {
                log::debug!("pid={} join {pid}: not a child", self.pid);
                return -1;
            }
        }

        loop {
            if self.shared.driver.is_halted() {
                drop(kernel);
                self.terminate(Termination::Halted);
            }

            let termination = kernel
                .processes
                .get(pid)
                .and_then(|child| child.termination);
            if let Some(termination) = termination {
                kernel.processes.reap(pid);
                return match termination {
                    Termination::Exited(code) => {
                        *status = code;
                        1
                    }
                    Termination::Exception | Termination::Halted => {
                        *status = -1;
                        0
                    }
                };
            }

            kernel = self
                .shared
                .exited
                .wait(kernel)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    fn exit(&self, status: i32) -> ! {
        log::trace!("pid={} exit({status})", self.pid);
        self.terminate(Termination::Exited(status))
    }

    fn creat(&self, name: &str) -> i32 {
        self.open_with("creat", name, |fs, path| fs.create(path))
    }

    fn open(&self, name: &str) -> i32 {
        self.open_with("open", name, |fs, path| fs.open(path))
    }

    fn read(&self, fd: i32, buf: &mut [u8]) -> i32 {
        self.enter("read");
        let mut kernel = self.shared.kernel();
        let Some(descriptor) = kernel
            .processes
            .get_mut(self.pid)
            .and_then(|process| process.fd_table.get_mut(fd))
        else {
            return -1;
        };
        if !descriptor.readable() {
            return -1;
        }

        match &mut descriptor.endpoint {
            Endpoint::Stdin => {
                let mut stdin = self.shared.stdin.lock().unwrap_or_else(|e| e.into_inner());
                let n = cmp::min(buf.len(), stdin.len());
                for (dst, src) in buf.iter_mut().zip(stdin.drain(..n)) {
                    *dst = src;
                }
                n as i32
            }
            Endpoint::File { data, pos } => {
                let data = data.lock().unwrap_or_else(|e| e.into_inner());
                // 文件可能已被其他描述符截断
                let start = cmp::min(*pos, data.len());
                let n = cmp::min(buf.len(), data.len() - start);
                buf[..n].copy_from_slice(&data[start..start + n]);
                *pos = start + n;
                n as i32
            }
            Endpoint::Stdout => -1,
        }
    }

    fn write(&self, fd: i32, buf: &[u8]) -> i32 {
        self.enter("write");
        let mut kernel = self.shared.kernel();
        let Some(descriptor) = kernel
            .processes
            .get_mut(self.pid)
            .and_then(|process| process.fd_table.get_mut(fd))
        else {
            return -1;
        };
        if !descriptor.writable() {
            return -1;
        }

        match &mut descriptor.endpoint {
            Endpoint::Stdout => {
                self.shared
                    .stdout
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .extend_from_slice(buf);
            }
            Endpoint::File { data, pos } => {
                let mut data = data.lock().unwrap_or_else(|e| e.into_inner());
                let end = *pos + buf.len();
                if data.len() < end {
                    data.resize(end, 0);
                }
                data[*pos..end].copy_from_slice(buf);
                *pos = end;
            }
            Endpoint::Stdin => return -1,
        }

        buf.len() as i32
    }

    unsafe fn read_raw(&self, fd: i32, addr: usize, len: usize) -> i32 {
        self.enter("read");
        log::debug!(
            "pid={} read({fd}, {addr:#x}, {len}): address not mapped",
            self.pid
        );
        -1
    }

    unsafe fn write_raw(&self, fd: i32, addr: usize, len: usize) -> i32 {
        self.enter("write");
        log::debug!(
            "pid={} write({fd}, {addr:#x}, {len}): address not mapped",
            self.pid
        );
        -1
    }

    fn close(&self, fd: i32) -> i32 {
        self.enter("close");
        let mut kernel = self.shared.kernel();
        let closed = kernel
            .processes
            .get_mut(self.pid)
            .and_then(|process| process.fd_table.remove(fd));
        match closed {
            Some(_) => 0,
            None => {
                log::debug!("pid={} close({fd}): bad descriptor", self.pid);
                -1
            }
        }
    }

    fn unlink(&self, name: &str) -> i32 {
        self.fs_op("unlink", name, |kernel, path| kernel.fs.unlink(path))
    }

    fn chdir(&self, path: &str) -> i32 {
        let pid = self.pid;
        self.fs_op("chdir", path, |kernel, path| {
            if !kernel.fs.is_dir(path) {
                return Err(FsError::NotADirectory);
            }
            let process = kernel.processes.get_mut(pid).ok_or(FsError::NotFound)?;
            process.cwd = path.to_owned();
            Ok(())
        })
    }

    fn mkdir(&self, path: &str) -> i32 {
        self.fs_op("mkdir", path, |kernel, path| kernel.fs.mkdir(path))
    }

    fn rmdir(&self, path: &str) -> i32 {
        self.fs_op("rmdir", path, |kernel, path| {
            // 不能删除进程所在的目录
            let in_use = kernel
                .processes
                .iter()
                .any(|(_, process)| process.termination.is_none() && process.cwd == path);
            if in_use {
                return Err(FsError::InUse);
            }
            kernel.fs.rmdir(path)
        })
    }

    fn ag(&self, request: i32, [a0, a1]: [i32; 2]) -> i32 {
        self.enter("ag");
        let Ok(request) = Request::try_from(request) else {
            log::warn!("pid={} unknown ag request {request}", self.pid);
            return -1;
        };

        let driver = &self.shared.driver;
        match request {
            Request::P => match driver.p(a0) {
                Ok(()) => 0,
                Err(Halted) => self.terminate(Termination::Halted),
            },
            Request::V => {
                driver.v(a0);
                0
            }
            Request::LoadWord => driver.load(a0),
            Request::StoreWord => {
                driver.store(a0, a1);
                0
            }
            Request::Done => {
                self.shared.report(Outcome::Done, self.pid);
                0
            }
            Request::Fail => {
                self.shared.report(Outcome::Fail, self.pid);
                0
            }
            Request::Checkpoint => {
                driver.checkpoint(a0);
                0
            }
            Request::Exists => self.exists(a0, a1),
        }
    }
}
