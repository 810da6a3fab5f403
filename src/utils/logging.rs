use chrono::Local;
use env_logger::{Builder, Env};
use std::io::Write;

fn default_log_level() -> &'static str {
    #[cfg(debug_assertions)]
    {
        return "debug";
    }
    #[cfg(not(debug_assertions))]
    {
        return "info";
    }
}

pub fn init() {
    Builder::from_env(Env::default().default_filter_or(default_log_level()))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
