//! Codes shared between the harness and the grading driver.

/// Request codes of the [`crate::Kernel::ag`] pseudo-syscall.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Request {
    /// 记录一个检查点，`a0`为检查点的值
    Checkpoint = -1,
    /// 驱动从自己的槽位中解出文件名并检查文件是否存在，
    /// `a0`为起始槽位，`a1`为字数
    Exists = 0,
    Fail = 10,
    Done = 11,
    LoadWord = 12,
    StoreWord = 13,
    V = 14,
    P = 15,
}

impl Request {
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for Request {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        use Request::*;

        Ok(match code {
            -1 => Checkpoint,
            0 => Exists,
            10 => Fail,
            11 => Done,
            12 => LoadWord,
            13 => StoreWord,
            14 => V,
            15 => P,
            code => return Err(code),
        })
    }
}

/// A driver parameter slot.
///
/// The reserved slots sit at the top of the table; everything below
/// [`Slot::Random`] belongs to the individual test program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Param(u8),
    Random,
    /// 4 words, NUL padded
    ShellProgramName,
    ProcessCount,
    TestId,
}

impl Slot {
    /// Number of test-specific slots.
    pub const PARAMS: u8 = 9;

    /// Words reserved for [`Slot::ShellProgramName`].
    pub const SHELL_PROGRAM_NAME_WORDS: usize = 4;

    pub const fn param(index: u8) -> Self {
        assert!(index < Self::PARAMS, "parameter slot overlaps a reserved slot");
        Self::Param(index)
    }

    pub const fn index(self) -> i32 {
        match self {
            Self::Param(index) => index as i32,
            Self::Random => 9,
            Self::ShellProgramName => 10,
            Self::ProcessCount => 14,
            Self::TestId => 15,
        }
    }
}

/// A driver semaphore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Semaphore {
    User(u8),
    /// 父进程等待子进程的会合点
    ChildWait,
    /// 保护`ProcessCount`的注册锁
    ProcessLock,
}

impl Semaphore {
    pub const USER: u8 = 14;

    pub const fn user(id: u8) -> Self {
        assert!(id < Self::USER, "semaphore id overlaps a reserved semaphore");
        Self::User(id)
    }

    pub const fn id(self) -> i32 {
        match self {
            Self::User(id) => id as i32,
            Self::ChildWait => 14,
            Self::ProcessLock => 15,
        }
    }
}
