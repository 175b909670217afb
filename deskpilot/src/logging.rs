//! stderr logging through `env_logger`, with `RUST_LOG` directives on top of the
//! configured level.

use crate::settings::LogLevel;
use chrono::Local;
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::io::Write;

/// Logger builder: `level` for everything, then `RUST_LOG`-style `directives`
pub fn builder(level: LogLevel, directives: Option<&str>) -> Builder {
    let mut builder = Builder::new();
    builder
        .target(Target::Stderr)
        .filter_level(LevelFilter::from(level))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} [{}] {}",
                Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        });
    if let Some(directives) = directives {
        builder.parse_filters(directives);
    }
    builder
}

/// Install the global logger. Calling it twice keeps the first logger.
pub fn init(level: LogLevel) {
    let directives = std::env::var("RUST_LOG").ok();
    let _ = builder(level, directives.as_deref()).try_init();
}
