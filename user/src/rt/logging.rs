use log::{Level, LevelFilter, Log, Metadata, Record};

struct Logger;

impl Log for Logger {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        use Level::*;
        let color = match record.level() {
            Error => 31,
            Warn => 93,
            Info => 34,
            Debug => 32,
            Trace => 90,
        };

        println!(
            "\u{1B}[{}m[{:<5}] [user] {}\u{1B}[0m",
            color,
            record.level(),
            record.args()
        );
    }

    fn flush(&self) {}
}

/// 日志级别在编译时由环境变量`LOG`决定，默认关闭
pub fn init() {
    static LOGGER: Logger = Logger;
    if log::set_logger(&LOGGER).is_err() {
        return;
    }

    let level = option_env!("LOG")
        .and_then(|s: &'static str| s.parse().ok())
        .unwrap_or(LevelFilter::Off);
    log::set_max_level(level);
}
