use std::io;
use std::sync::Once;

use tracing::Level;
use tracing_appender::rolling;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// Initializes the global `tracing` subscriber once per process.
/// Repeated calls are no-ops, mirroring how a long-running CLI
/// session only wants one active subscriber.
pub fn init(config: &LoggingConfig) {
    INIT.call_once(|| {
        let level = parse_level(config.level());

        let format = tracing_subscriber::fmt::format()
            .with_file(true)
            .with_line_number(true)
            .with_target(false)
            .with_thread_ids(false)
            .compact();

        match config.log_dir() {
            None => {
                let _ = tracing_subscriber::fmt()
                    .with_max_level(level)
                    .event_format(format)
                    .try_init();
            }
            Some(dir) => {
                let file_appender = rolling::daily(dir, "badsubd.log");
                let writer = file_appender.and(io::stdout);

                let _ = tracing_subscriber::fmt()
                    .with_max_level(level)
                    .event_format(format)
                    .with_writer(writer)
                    .try_init();
            }
        }
    });
}

fn parse_level(level: &str) -> Level {
    level.parse().unwrap_or(Level::INFO)
}
