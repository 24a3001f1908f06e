use core::fmt;

use ag_sim::SimProcess;
use derive_more::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Program {
    #[display(fmt = "exec_test")]
    ExecTest,
    #[display(fmt = "file_tests")]
    FileTests,
    #[display(fmt = "dir_test")]
    DirTest,
}

impl Program {
    pub const ALL: [Program; 3] = [Program::ExecTest, Program::FileTests, Program::DirTest];

    pub fn name(self) -> &'static str {
        match self {
            Program::ExecTest => "exec_test",
            Program::FileTests => "file_tests",
            Program::DirTest => "dir_test",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|program| program.name() == name)
    }

    pub fn run(self, process: &SimProcess, args: &[&str]) -> ! {
        match self {
            Program::ExecTest => user::exec_test::main(process, args),
            Program::FileTests => user::file_tests::main(process, args),
            Program::DirTest => user::dir_test::main(process, args),
        }
    }
}

/// 除了报告 done 之外还要满足的条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Done,
    Checkpoints(&'static [i32]),
    Stdout(&'static [u8]),
}

#[derive(Debug)]
pub struct Scenario {
    pub program: Program,
    pub test_id: i32,
    pub description: &'static str,
    pub expect: Expect,
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{} ({})", self.program, self.test_id, self.description)
    }
}

const fn scenario(
    program: Program,
    test_id: i32,
    description: &'static str,
    expect: Expect,
) -> Scenario {
    Scenario {
        program,
        test_id,
        description,
        expect,
    }
}

use Expect::*;
use Program::*;

#[rustfmt::skip]
pub static SCENARIOS: &[Scenario] = &[
    scenario(ExecTest, 0, "child reaches its checkpoint first", Checkpoints(&[2, 1])),
    scenario(ExecTest, 1, "sixteen children get distinct pids", Done),
    scenario(ExecTest, 2, "two rendezvous through one parent", Done),
    scenario(ExecTest, 3, "join returns the exit status", Done),
    scenario(ExecTest, 4, "exec of a missing program fails", Done),
    scenario(ExecTest, 5, "a grandchild cannot be joined", Done),
    scenario(ExecTest, 6, "arguments reach the child", Done),
    scenario(ExecTest, 7, "arguments larger than a page are rejected", Done),
    scenario(ExecTest, 8, "eight small arguments", Done),
    scenario(ExecTest, 11, "twenty children in a row", Done),
    scenario(FileTests, 0, "creat makes the file exist", Done),
    scenario(FileTests, 1, "unlink removes a closed file", Done),
    scenario(FileTests, 2, "close releases the descriptor", Done),
    scenario(FileTests, 3, "open runs out of descriptors", Done),
    scenario(FileTests, 4, "exit closes every descriptor", Done),
    scenario(FileTests, 5, "read", Done),
    scenario(FileTests, 6, "descriptor tables are private", Done),
    scenario(FileTests, 7, "write then read back", Done),
    scenario(FileTests, 8, "write from a bad address fails", Done),
    scenario(FileTests, 9, "read into a bad address fails", Done),
    scenario(FileTests, 10, "standard input is the console", Done),
    scenario(FileTests, 11, "standard output does not interleave", Stdout(b"inputinput")),
    scenario(DirTest, 0, "chdir, mkdir and rmdir", Stdout(b"hello from asdf\nhello world!")),
];

/// Picks the scenarios matching `program` and `test_id`; `None` matches all.
pub fn select(program: Option<Program>, test_id: Option<i32>) -> Vec<&'static Scenario> {
    SCENARIOS
        .iter()
        .filter(|scenario| program.map_or(true, |program| scenario.program == program))
        .filter(|scenario| test_id.map_or(true, |id| scenario.test_id == id))
        .collect()
}
