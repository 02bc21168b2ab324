// this_file: src/logging.rs
//! Logger setup for the CLI and a small timing guard

use env_logger::Builder;
use log::{Level, LevelFilter};
use std::io::Write;
use std::time::Instant;

/// Map a level name to a filter. `warning` is accepted for `warn`; unknown
/// names fall back to `Info`.
pub fn parse_level(level: &str) -> LevelFilter {
    let name = level.trim();
    let name = if name.eq_ignore_ascii_case("warning") {
        "warn"
    } else {
        name
    };
    name.parse().unwrap_or_else(|_| {
        eprintln!("Invalid log level '{}', using 'info'", level);
        LevelFilter::Info
    })
}

fn level_color(level: Level) -> &'static str {
    match level {
        Level::Error => "\x1b[31m",
        Level::Warn => "\x1b[33m",
        Level::Info => "\x1b[32m",
        Level::Debug => "\x1b[34m",
        Level::Trace => "\x1b[35m",
    }
}

/// Install the stderr logger.
///
/// stdout stays free for the render report. `quiet` keeps errors only and
/// `RUST_LOG` filters, when set, are applied on top.
pub fn init_logging(level: &str, quiet: bool, timestamps: bool) {
    let filter = if quiet {
        LevelFilter::Error
    } else {
        parse_level(level)
    };

    let mut builder = Builder::new();
    builder.filter_level(filter).format(move |buf, record| {
        if timestamps {
            write!(buf, "{} ", buf.timestamp_millis())?;
        }
        writeln!(
            buf,
            "{}{:5}\x1b[0m [{}] {}",
            level_color(record.level()),
            record.level(),
            record.target(),
            record.args()
        )
    });
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    // Keep whichever logger was installed first (tests, embedding apps).
    let _ = builder.try_init();
}

/// Measures an operation; logs its duration at debug level when dropped.
pub struct Timer {
    label: String,
    start: Instant,
}

impl Timer {
    /// Start timing `label`.
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        log::debug!("Starting: {}", label);
        Self {
            label,
            start: Instant::now(),
        }
    }

    /// Milliseconds since the timer started.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        log::debug!("{} took {:.3}ms", self.label, self.elapsed_ms());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_parse_case_insensitively() {
        assert_eq!(parse_level("TRACE"), LevelFilter::Trace);
        assert_eq!(parse_level("Warning"), LevelFilter::Warn);
        assert_eq!(parse_level(" error "), LevelFilter::Error);
        assert_eq!(parse_level("off"), LevelFilter::Off);
        assert_eq!(parse_level("bogus"), LevelFilter::Info);
    }

    #[test]
    fn each_level_has_its_own_color() {
        let colors = [Level::Error, Level::Warn, Level::Info, Level::Debug, Level::Trace]
            .map(level_color);
        for (i, a) in colors.iter().enumerate() {
            assert!(colors.iter().skip(i + 1).all(|b| a != b));
        }
    }

    #[test]
    fn timer_reports_elapsed() {
        let timer = Timer::new("render");
        assert!(timer.elapsed_ms() >= 0.0);
    }

    #[test]
    fn init_twice_is_harmless() {
        init_logging("debug", false, true);
        init_logging("info", true, false);
    }
}
