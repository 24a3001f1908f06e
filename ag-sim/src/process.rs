use std::collections::BTreeMap;
use std::ops::Deref;

use enumflags2::{bitflags, BitFlags};

use crate::fs::FileData;

pub type Pid = i32;

/// 每个进程最多同时打开的文件数，包括标准输入输出
pub const MAX_OPEN_FILES: usize = 16;

#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read = 0b01,
    Write = 0b10,
}

#[derive(Debug, Clone)]
pub enum Endpoint {
    Stdin,
    Stdout,
    File { data: FileData, pos: usize },
}

#[derive(Debug, Clone)]
pub struct Descriptor {
    pub endpoint: Endpoint,
    pub access: BitFlags<Access>,
}

impl Descriptor {
    pub fn file(data: FileData) -> Self {
        Self {
            endpoint: Endpoint::File { data, pos: 0 },
            access: Access::Read | Access::Write,
        }
    }

    pub fn readable(&self) -> bool {
        self.access.contains(Access::Read)
    }

    pub fn writable(&self) -> bool {
        self.access.contains(Access::Write)
    }
}

/// **文件描述符表**
// Option 表示文件描述符是否指示着文件
#[derive(Debug)]
pub struct FdTable(Vec<Option<Descriptor>>);

impl FdTable {
    /// 标准输入、标准输出分别占据 0、1 号描述符
    pub fn with_stdio() -> Self {
        Self(vec![
            Some(Descriptor {
                endpoint: Endpoint::Stdin,
                access: Access::Read.into(),
            }),
            Some(Descriptor {
                endpoint: Endpoint::Stdout,
                access: Access::Write.into(),
            }),
        ])
    }

    /// 插入新描述符至空槽位，并返回槽位的索引；表满时返回`None`
    pub fn insert(&mut self, descriptor: Descriptor) -> Option<usize> {
        let index = match self.0.iter().position(Option::is_none) {
            Some(index) => index,
            None if self.0.len() < MAX_OPEN_FILES => {
                self.0.push(None);
                self.0.len() - 1
            }
            None => return None,
        };
        self.0[index] = Some(descriptor);
        Some(index)
    }

    pub fn get_mut(&mut self, fd: i32) -> Option<&mut Descriptor> {
        let fd = usize::try_from(fd).ok()?;
        self.0.get_mut(fd)?.as_mut()
    }

    pub fn remove(&mut self, fd: i32) -> Option<Descriptor> {
        let fd = usize::try_from(fd).ok()?;
        self.0.get_mut(fd)?.take()
    }

    pub fn clear(&mut self) {
        self.0.clear()
    }
}

impl Deref for FdTable {
    type Target = [Option<Descriptor>];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Exited(i32),
    /// 未处理的异常（宿主线程 panic）
    Exception,
    /// 机器停机时仍在运行
    Halted,
}

#[derive(Debug)]
pub struct Process {
    pub parent: Option<Pid>,
    pub cwd: String,
    pub fd_table: FdTable,
    pub termination: Option<Termination>,
}

#[derive(Debug)]
pub struct ProcessTable {
    next_pid: Pid,
    processes: BTreeMap<Pid, Process>,
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self {
            next_pid: 1,
            processes: BTreeMap::new(),
        }
    }
}

impl ProcessTable {
    pub fn spawn(&mut self, parent: Option<Pid>, cwd: String) -> Pid {
        let pid = self.next_pid;
        self.next_pid += 1;
        self.processes.insert(
            pid,
            Process {
                parent,
                cwd,
                fd_table: FdTable::with_stdio(),
                termination: None,
            },
        );
        pid
    }

    pub fn get(&self, pid: Pid) -> Option<&Process> {
        self.processes.get(&pid)
    }

    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        self.processes.get_mut(&pid)
    }

    /// 回收已结束的进程
    pub fn reap(&mut self, pid: Pid) -> Option<Process> {
        self.processes.remove(&pid)
    }

    /// Records how `pid` ended and closes its descriptors.
    ///
    /// Returns `false` if the process had already terminated.
    pub fn terminate(&mut self, pid: Pid, termination: Termination) -> bool {
        let Some(process) = self.processes.get_mut(&pid) else {
            return false;
        };
        if process.termination.is_some() {
            return false;
        }
        process.termination = Some(termination);
        process.fd_table.clear();
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (Pid, &Process)> {
        self.processes.iter().map(|(&pid, process)| (pid, process))
    }
}
