mod cli;

use std::process::ExitCode;
use std::time::Duration;

use ag_grader::{Error, Program, SCENARIOS};
use clap::Parser;

use self::cli::Cli;

fn main() -> Result<ExitCode, Error> {
    env_logger::init();

    let cli = Cli::parse();
    if cli.list {
        for scenario in SCENARIOS {
            println!(
                "{:<10} {:>2}  {}",
                scenario.program.name(),
                scenario.test_id,
                scenario.description
            );
        }
        return Ok(ExitCode::SUCCESS);
    }

    let program = cli
        .program
        .as_deref()
        .map(|name| Program::from_name(name).ok_or_else(|| Error::UnknownProgram(name.to_owned())))
        .transpose()?;
    let scenarios = ag_grader::select(program, cli.test_id);
    if scenarios.is_empty() {
        return Err(Error::NoScenario);
    }

    let random = cli.random.unwrap_or_else(|| fastrand::i32(..));
    let timeout = Duration::from_secs(cli.timeout);
    log::info!("random={random:#x} timeout={timeout:?}");

    let mut failed = 0;
    for &scenario in &scenarios {
        let grade = ag_grader::grade(scenario, random, timeout)?;
        match &grade.mismatch {
            None => println!("\x1b[32m[PASS]\x1b[0m {scenario}"),
            Some(mismatch) => {
                failed += 1;
                println!("\x1b[31m[FAIL]\x1b[0m {scenario}: {mismatch}");
            }
        }
    }

    println!(
        "{} passed, {failed} failed (random={random:#x})",
        scenarios.len() - failed
    );
    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
