use std::time::Duration;

use ag::{Context, Kernel, LockInit, Request, Semaphore, Slot, STDIN, STDOUT};
use ag_sim::{Machine, Report, SimError, Verdict};

const TIMEOUT: Duration = Duration::from_secs(10);

fn run(machine: &Machine, program: &str) -> Report {
    machine.run(program, &[], TIMEOUT).unwrap()
}

#[test]
fn process_ids_are_unique() {
    const CHILDREN: i32 = 8;

    let machine = Machine::builder()
        .program("ids", |process, args| {
            ag::start(process, args, |ctx, _| {
                if ctx.process_id() == 0 {
                    ctx.checkpoint(0);
                    for _ in 0..CHILDREN {
                        ag::ensure!(ctx, ctx.restart() != -1);
                        ctx.wait_child();
                    }
                    ctx.done();
                }

                ctx.checkpoint(ctx.process_id());
                ctx.signal_parent();
                ctx.exit(0);
            })
        })
        .build();

    let report = run(&machine, "ids");
    assert_eq!(Verdict::Done, report.verdict);

    let mut ids = report.checkpoints;
    ids.sort_unstable();
    assert_eq!((0..=CHILDREN).collect::<Vec<_>>(), ids);
}

#[test]
fn restarted_process_registers_next() {
    let machine = Machine::builder()
        .program("ab", |process, args| {
            ag::start(process, args, |ctx, _| match ctx.process_id() {
                0 => {
                    ctx.restart();
                    ctx.wait_child();
                    ctx.done();
                }
                id => {
                    ctx.checkpoint(id);
                    ctx.signal_parent();
                    ctx.exit(0);
                }
            })
        })
        .build();

    let report = run(&machine, "ab");
    assert_eq!(Verdict::Done, report.verdict);
    assert_eq!(vec![1], report.checkpoints);
    assert_eq!(2, machine.driver().slot(Slot::ProcessCount));
}

#[test]
fn mailbox_between_siblings() {
    let machine = Machine::builder()
        .program("mailbox", |process, args| {
            ag::start(process, args, |ctx, _| {
                if ctx.process_id() == 0 {
                    ctx.store(Slot::param(3), 77);
                    ctx.restart();
                    ctx.exit(0);
                }

                ag::ensure!(ctx, ctx.load(Slot::param(3)) == 77);
                ctx.done();
            })
        })
        .build();

    assert_eq!(Verdict::Done, run(&machine, "mailbox").verdict);
}

#[test]
fn string_argument_from_driver() {
    let machine = Machine::builder()
        .string(Slot::param(0), "hello", 2)
        .unwrap()
        .program("strings", |process, args| {
            ag::start(process, args, |ctx, _| {
                ag::ensure!(ctx, ctx.string_argument(Slot::param(0), 2) == "hello");
                ag::ensure!(ctx, ctx.shell_program_name() == "strings");
                ctx.done();
            })
        })
        .build();

    assert_eq!(Verdict::Done, run(&machine, "strings").verdict);
}

#[test]
fn oversized_string_is_rejected() {
    let result = Machine::builder().string(Slot::param(0), "12345678", 2);
    assert!(matches!(result, Err(SimError::StringTooLong(_, 2))));
}

#[test]
fn wait_child_blocks_without_signal() {
    let machine = Machine::builder()
        .program("lonely", |process, args| {
            ag::start(process, args, |ctx, _| {
                ctx.wait_child();
                ctx.done();
            })
        })
        .build();

    let report = machine
        .run("lonely", &[], Duration::from_millis(200))
        .unwrap();
    assert_eq!(Verdict::TimedOut, report.verdict);
    assert_eq!(vec![1], report.halted);
}

#[test]
fn creat_and_unlink_change_existence() {
    let machine = Machine::builder()
        .string(Slot::param(2), "aa", 2)
        .unwrap()
        .program("exists", |process, args| {
            ag::start(process, args, |ctx, _| {
                let kernel = ctx.kernel();
                ag::ensure!(ctx, !ctx.file_exists(Slot::param(2), 2));

                let fd = kernel.creat("aa");
                ag::ensure!(ctx, fd != -1);
                ag::ensure!(ctx, ctx.file_exists(Slot::param(2), 2));

                ag::ensure!(ctx, kernel.close(fd) == 0);
                ag::ensure!(ctx, kernel.unlink("aa") == 0);
                ag::ensure!(ctx, !ctx.file_exists(Slot::param(2), 2));
                ctx.done();
            })
        })
        .build();

    assert_eq!(Verdict::Done, run(&machine, "exists").verdict);
    assert!(!machine.exists("/aa"));
}

#[test]
fn join_reports_how_children_end() {
    let machine = Machine::builder()
        .program("status", |process, args| {
            process.exit(args.first().and_then(|s| s.parse().ok()).unwrap_or(0))
        })
        .program("crash", |_, _| panic!("illegal instruction"))
        .program("join", |process, args| {
            ag::start(process, args, |ctx, _| {
                let kernel = ctx.kernel();
                let mut status = 0;

                let child = kernel.exec("status", &["5"]);
                ag::ensure!(ctx, child != -1);
                ag::ensure!(ctx, kernel.join(child, &mut status) == 1);
                ag::ensure!(ctx, status == 5, "status {status}");
                ag::ensure!(ctx, kernel.join(child, &mut status) == -1);

                let child = kernel.exec("crash", &[]);
                ag::ensure!(ctx, kernel.join(child, &mut status) == 0);
                ag::ensure!(ctx, status == -1);

                ag::ensure!(ctx, kernel.join(4242, &mut status) == -1);
                ag::ensure!(ctx, kernel.exec("missing", &[]) == -1);
                ctx.done();
            })
        })
        .build();

    assert_eq!(Verdict::Done, run(&machine, "join").verdict);
}

#[test]
fn grandchildren_cannot_be_joined() {
    let machine = Machine::builder()
        .program("leaf", |process, _| process.exit(0))
        .program("middle", |process, _| {
            let leaf = process.exec("leaf", &[]);
            process.ag(Request::StoreWord.code(), [Slot::param(0).index(), leaf]);
            process.ag(Request::V.code(), [Semaphore::ChildWait.id(), 0]);
            process.exit(0)
        })
        .program("top", |process, args| {
            ag::start(process, args, |ctx, _| {
                let mut status = 0;
                ag::ensure!(ctx, ctx.kernel().exec("middle", &[]) != -1);
                ctx.wait_child();

                let leaf = ctx.load(Slot::param(0));
                ag::ensure!(ctx, leaf > 0);
                ag::ensure!(ctx, ctx.kernel().join(leaf, &mut status) == -1);
                ctx.done();
            })
        })
        .build();

    assert_eq!(Verdict::Done, run(&machine, "top").verdict);
}

#[test]
fn arguments_must_fit_in_a_page() {
    let machine = Machine::builder()
        .program("argc", |process, args| process.exit(args.len() as i32))
        .program("argv", |process, args| {
            ag::start(process, args, |ctx, _| {
                let kernel = ctx.kernel();
                let mut status = 0;

                let fits = "x".repeat(1023);
                let child = kernel.exec("argc", &[&fits]);
                ag::ensure!(ctx, child != -1);
                ag::ensure!(ctx, kernel.join(child, &mut status) == 1 && status == 1);

                let too_long = "x".repeat(1024);
                ag::ensure!(ctx, kernel.exec("argc", &[&too_long]) == -1);
                ctx.done();
            })
        })
        .build();

    assert_eq!(Verdict::Done, run(&machine, "argv").verdict);
}

#[test]
fn descriptors_run_out_and_stay_private() {
    let machine = Machine::builder()
        .file("/input", b"data")
        .unwrap()
        .program("peer", |process, _| {
            // 父进程的 2 号描述符不属于子进程
            let status = if process.close(2) == -1 { 0 } else { 1 };
            process.exit(status)
        })
        .program("fds", |process, args| {
            ag::start(process, args, |ctx, _| {
                let kernel = ctx.kernel();
                for fd in 2..ag_sim::MAX_OPEN_FILES as i32 {
                    ag::ensure!(ctx, kernel.open("input") == fd);
                }
                ag::ensure!(ctx, kernel.open("input") == -1);

                let mut status = -1;
                let peer = kernel.exec("peer", &[]);
                ag::ensure!(ctx, kernel.join(peer, &mut status) == 1 && status == 0);

                ag::ensure!(ctx, kernel.close(2) == 0);
                ag::ensure!(ctx, kernel.close(2) == -1);
                ag::ensure!(ctx, kernel.open("input") == 2);
                ctx.done();
            })
        })
        .build();

    assert_eq!(Verdict::Done, run(&machine, "fds").verdict);
}

#[test]
fn console_queues() {
    let machine = Machine::builder()
        .stdin(b"abc")
        .program("console", |process, args| {
            ag::start(process, args, |ctx, _| {
                let kernel = ctx.kernel();
                let mut buf = [0; 2];
                ag::ensure!(ctx, kernel.read(STDIN, &mut buf) == 2 && &buf == b"ab");
                ag::ensure!(ctx, kernel.read(STDIN, &mut buf) == 1 && buf[0] == b'c');
                ag::ensure!(ctx, kernel.read(STDIN, &mut buf) == 0);

                ag::ensure!(ctx, kernel.read(STDOUT, &mut buf) == -1);
                ag::ensure!(ctx, kernel.write(STDIN, b"no") == -1);
                ag::ensure!(ctx, kernel.write(STDOUT, b"xyz") == 3);

                let mut raw = 0u32;
                let addr = &mut raw as *mut u32 as usize;
                ag::ensure!(ctx, unsafe { kernel.read_raw(STDIN, addr, 4) } == -1);
                ctx.done();
            })
        })
        .build();

    let report = run(&machine, "console");
    assert_eq!(Verdict::Done, report.verdict);
    assert_eq!(b"xyz", report.stdout.as_slice());
}

#[test]
fn children_inherit_cwd() {
    let machine = Machine::builder()
        .dir("/d")
        .unwrap()
        .program("probe", |process, _| {
            let status = if process.open("f") == -1 { 1 } else { 0 };
            process.exit(status)
        })
        .program("cwd", |process, args| {
            ag::start(process, args, |ctx, _| {
                let kernel = ctx.kernel();
                let mut status = -1;
                ag::ensure!(ctx, kernel.chdir("d") == 0);
                ag::ensure!(ctx, kernel.creat("f") != -1);

                let probe = kernel.exec("probe", &[]);
                ag::ensure!(ctx, kernel.join(probe, &mut status) == 1 && status == 0);

                ag::ensure!(ctx, kernel.rmdir("/d") == -1);
                ag::ensure!(ctx, kernel.unlink("../d/f") == 0);
                ag::ensure!(ctx, kernel.rmdir("/d") == -1, "cwd is still /d");
                ag::ensure!(ctx, kernel.chdir("..") == 0);
                ag::ensure!(ctx, kernel.rmdir("d") == 0);
                ag::ensure!(ctx, kernel.chdir("d") == -1);
                ctx.done();
            })
        })
        .build();

    assert_eq!(Verdict::Done, run(&machine, "cwd").verdict);
    assert!(!machine.exists("/d"));
}

#[test]
fn fall_through_fails() {
    let machine = Machine::builder()
        .program("empty", |process, args| ag::start(process, args, |_, _| ()))
        .build();

    assert_eq!(Verdict::Fail, run(&machine, "empty").verdict);
}

#[test]
fn exit_without_outcome() {
    let machine = Machine::builder()
        .program("quiet", |process, _| process.exit(0))
        .build();

    let report = run(&machine, "quiet");
    assert_eq!(Verdict::Exited, report.verdict);
    assert!(report.halted.is_empty());
}

#[test]
fn first_outcome_wins() {
    let machine = Machine::builder()
        .program("twice", |process, _| {
            process.ag(Request::Fail.code(), [0, 0]);
            process.ag(Request::Done.code(), [0, 0]);
            process.exit(0)
        })
        .build();

    assert_eq!(Verdict::Fail, run(&machine, "twice").verdict);
}

#[test]
fn first_process_may_init_lock() {
    let machine = Machine::builder()
        .lock_init(LockInit::FirstProcess)
        .program("legacy", |process, _| {
            let ctx = Context::register(process, LockInit::FirstProcess);
            if ctx.process_id() == 0 {
                ctx.done();
            }
            ctx.fail()
        })
        .build();

    assert_eq!(Verdict::Done, run(&machine, "legacy").verdict);
}

#[test]
fn machine_boots_once() {
    let machine = Machine::builder()
        .program("quiet", |process, _| process.exit(0))
        .build();

    assert!(matches!(
        machine.run("missing", &[], TIMEOUT),
        Err(SimError::UnknownProgram(_))
    ));
    assert!(matches!(
        machine.run("quiet", &[], TIMEOUT),
        Err(SimError::AlreadyBooted)
    ));
}
