//! # 评测器
//!
//! Sets up the simulated driver for one scenario, runs the test program on
//! [`ag_sim::Machine`], and checks the report against what the scenario
//! expects.

mod scenario;

use std::time::Duration;

use ag::Slot;
use ag_sim::{Machine, Report, SimError, Verdict};
use derive_more::Display;

pub use self::scenario::{select, Expect, Program, Scenario, SCENARIOS};

/// 驱动为文件测试准备的两个文件名，各占两个槽位
pub const FILE1: &str = "input";
pub const FILE2: &str = "aa";
const NAME_WORDS: usize = 2;

/// 目录测试读取的文件
pub const ASDF_PATH: &str = "/test/asdf";
pub const ASDF: &[u8] = b"hello from asdf\n";

#[derive(Debug, Display)]
pub enum Error {
    #[display(fmt = "no program named {:?}", _0)]
    UnknownProgram(String),
    #[display(fmt = "no scenario matches")]
    NoScenario,
    #[display(fmt = "{}", _0)]
    Sim(SimError),
}

impl std::error::Error for Error {}

impl From<SimError> for Error {
    fn from(e: SimError) -> Self {
        Self::Sim(e)
    }
}

#[derive(Debug, Display)]
pub enum Mismatch {
    #[display(fmt = "verdict was {}", _0)]
    Verdict(Verdict),
    #[display(fmt = "checkpoints {:?}, expected {:?}", _0, _1)]
    Checkpoints(Vec<i32>, &'static [i32]),
    #[display(fmt = "stdout {:?}, expected {:?}", _0, _1)]
    Stdout(String, String),
}

#[derive(Debug)]
pub struct Grade {
    pub scenario: &'static Scenario,
    pub report: Report,
    pub mismatch: Option<Mismatch>,
}

impl Grade {
    pub fn passed(&self) -> bool {
        self.mismatch.is_none()
    }
}

/// Builds the machine for `scenario`, with `random` in [`Slot::Random`].
///
/// File tests get [`FILE1`] holding the little-endian bytes of `random`, the
/// same bytes on standard input, and [`FILE2`] absent.
pub fn machine(scenario: &Scenario, random: i32) -> Result<Machine, SimError> {
    let mut builder = Machine::builder()
        .slot(Slot::TestId, scenario.test_id)
        .slot(Slot::Random, random);
    for program in Program::ALL {
        builder = builder.program(program.name(), move |process, args| {
            program.run(process, args)
        });
    }

    let value = random.to_le_bytes();
    let builder = match scenario.program {
        Program::ExecTest => builder,
        Program::FileTests => builder
            .string(Slot::param(0), FILE1, NAME_WORDS)?
            .string(Slot::param(2), FILE2, NAME_WORDS)?
            .file(FILE1, &value)?
            .stdin(&value),
        Program::DirTest => builder.file(ASDF_PATH, ASDF)?,
    };

    Ok(builder.build())
}

pub fn grade(scenario: &'static Scenario, random: i32, timeout: Duration) -> Result<Grade, Error> {
    log::info!("running {scenario}");
    let machine = machine(scenario, random)?;
    let report = machine.run(scenario.program.name(), &[], timeout)?;

    let mismatch = check(scenario.expect, &report);
    if let Some(mismatch) = &mismatch {
        log::warn!("{scenario}: {mismatch}");
    }

    Ok(Grade {
        scenario,
        report,
        mismatch,
    })
}

fn check(expect: Expect, report: &Report) -> Option<Mismatch> {
    if report.verdict != Verdict::Done {
        return Some(Mismatch::Verdict(report.verdict));
    }

    match expect {
        Expect::Done => None,
        Expect::Checkpoints(expected) if report.checkpoints != expected => Some(
            Mismatch::Checkpoints(report.checkpoints.clone(), expected),
        ),
        Expect::Stdout(expected) if report.stdout != expected => Some(Mismatch::Stdout(
            String::from_utf8_lossy(&report.stdout).into_owned(),
            String::from_utf8_lossy(expected).into_owned(),
        )),
        Expect::Checkpoints(_) | Expect::Stdout(_) => None,
    }
}
