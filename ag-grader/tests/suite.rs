use std::time::Duration;

use ag_grader::{grade, select, Program, SCENARIOS};

const TIMEOUT: Duration = Duration::from_secs(10);

fn grade_all(random: i32) {
    for scenario in SCENARIOS {
        let grade = grade(scenario, random, TIMEOUT).unwrap();
        assert!(
            grade.passed(),
            "{scenario} with random={random:#x}: {}",
            grade.mismatch.unwrap()
        );
    }
}

#[test]
fn every_scenario_passes() {
    grade_all(0x1234_5678);
}

#[test]
fn every_scenario_passes_with_negative_random() {
    grade_all(-3);
}

#[test]
fn random_exit_status_round_trips() {
    let scenario = select(Some(Program::ExecTest), Some(3))[0];
    for _ in 0..4 {
        let random = fastrand::i32(..);
        assert!(grade(scenario, random, TIMEOUT).unwrap().passed(), "random={random:#x}");
    }
}

#[test]
fn ordering_checkpoints_are_reported() {
    let scenario = select(Some(Program::ExecTest), Some(0))[0];
    let grade = grade(scenario, 0, TIMEOUT).unwrap();
    assert_eq!(vec![2, 1], grade.report.checkpoints);
}
