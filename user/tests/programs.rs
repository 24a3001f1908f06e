//! 测试程序在驱动给出错误环境时必须报告失败

use std::time::Duration;

use ag::Slot;
use ag_sim::{Machine, MachineBuilder, Verdict};

const TIMEOUT: Duration = Duration::from_secs(10);

fn programs() -> MachineBuilder {
    Machine::builder()
        .program("exec_test", |process, args| user::exec_test::main(process, args))
        .program("file_tests", |process, args| user::file_tests::main(process, args))
        .program("dir_test", |process, args| user::dir_test::main(process, args))
}

fn verdict(builder: MachineBuilder, program: &str, test_id: i32) -> Verdict {
    builder
        .slot(Slot::TestId, test_id)
        .build()
        .run(program, &[], TIMEOUT)
        .unwrap()
        .verdict
}

fn file_names(builder: MachineBuilder) -> MachineBuilder {
    builder
        .string(Slot::param(0), "input", 2)
        .unwrap()
        .string(Slot::param(2), "aa", 2)
        .unwrap()
}

#[test]
fn unknown_test_id_fails() {
    assert_eq!(Verdict::Fail, verdict(programs(), "exec_test", 9));
    assert_eq!(Verdict::Fail, verdict(file_names(programs()), "file_tests", 12));
    assert_eq!(Verdict::Fail, verdict(programs(), "dir_test", 1));
}

#[test]
fn wrong_file_contents_fail() {
    let builder = file_names(programs())
        .slot(Slot::Random, 0x1234_5678)
        .file("/input", &0x0BAD_F00D_i32.to_le_bytes())
        .unwrap();

    assert_eq!(Verdict::Fail, verdict(builder, "file_tests", 5));
}

#[test]
fn matching_file_contents_pass() {
    let value = 0x1234_5678i32;
    let builder = file_names(programs())
        .slot(Slot::Random, value)
        .file("/input", &value.to_le_bytes())
        .unwrap();

    assert_eq!(Verdict::Done, verdict(builder, "file_tests", 5));
}

#[test]
fn existing_target_fails_creat_test() {
    let builder = file_names(programs()).file("/aa", b"").unwrap();
    assert_eq!(Verdict::Fail, verdict(builder, "file_tests", 0));
}

#[test]
fn empty_console_fails_stdin_test() {
    let builder = file_names(programs()).slot(Slot::Random, 7);
    assert_eq!(Verdict::Fail, verdict(builder, "file_tests", 10));
}

#[test]
fn missing_directory_fails_dir_test() {
    assert_eq!(Verdict::Fail, verdict(programs(), "dir_test", 0));
}

#[test]
fn dir_test_echoes_both_files() {
    let machine = programs()
        .file("/test/asdf", b"hello from asdf\n")
        .unwrap()
        .build();

    let report = machine.run("dir_test", &[], TIMEOUT).unwrap();
    assert_eq!(Verdict::Done, report.verdict);
    assert_eq!(b"hello from asdf\nhello world!", report.stdout.as_slice());
    assert!(!machine.exists("/test"));
    assert!(!machine.exists("/blah"));
}

#[test]
fn exec_test_passes_arguments() {
    assert_eq!(Verdict::Done, verdict(programs(), "exec_test", 6));
    assert_eq!(Verdict::Done, verdict(programs(), "exec_test", 8));
}
