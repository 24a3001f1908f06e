use clap::Parser;

/// Runs the test programs on the simulated kernel and grades them
#[derive(Parser)]
pub struct Cli {
    /// Program to run (exec_test, file_tests, dir_test); all when omitted
    pub program: Option<String>,

    /// Test ID; every test of the program when omitted
    pub test_id: Option<i32>,

    /// Value of the random slot; drawn afresh when omitted
    #[arg(long, short)]
    pub random: Option<i32>,

    /// Seconds before a run counts as hung
    #[arg(long, short, default_value_t = 10)]
    pub timeout: u64,

    /// List the scenarios instead of running them
    #[arg(long, short)]
    pub list: bool,
}
