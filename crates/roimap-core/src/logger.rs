//! Process-wide logging for roimap tools.
//!
//! [`LogBuilder`] installs a stderr `log` backend whose level comes from
//! [`LOG_ENV`] or an explicit filter. Records from the workspace crates print
//! with the `roimap_` prefix dropped:
//!
//! ```text
//!    0.412s WARN  transform::region: corner 2 at (340, 280) has no depth; ...
//! ```
//!
//! With the `tracing` feature, [`init_tracing`] installs a
//! `tracing-subscriber` reading the same variable.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log level (`off`, `error` .. `trace`).
pub const LOG_ENV: &str = "ROIMAP_LOG";

const CRATE_PREFIX: &str = "roimap";

struct RigLogger {
    level: LevelFilter,
    roimap_only: bool,
    started: Instant,
}

fn short_target(target: &str) -> &str {
    target.strip_prefix("roimap_").unwrap_or(target)
}

fn parse_level(raw: Option<&str>) -> Option<LevelFilter> {
    raw?.trim().parse().ok()
}

impl Log for RigLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
            && (!self.roimap_only || metadata.target().starts_with(CRATE_PREFIX))
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(
            stderr,
            "{:>8.3}s {:<5} {}: {}",
            self.started.elapsed().as_secs_f64(),
            record.level(),
            short_target(record.target()),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<RigLogger> = OnceLock::new();

/// Configures and installs the stderr logger.
#[derive(Clone, Copy, Debug)]
pub struct LogBuilder {
    level: LevelFilter,
    roimap_only: bool,
}

impl Default for LogBuilder {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            roimap_only: false,
        }
    }
}

impl LogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// Take the level from [`LOG_ENV`] when it holds a valid filter.
    pub fn from_env(self) -> Self {
        match parse_level(std::env::var(LOG_ENV).ok().as_deref()) {
            Some(level) => self.level(level),
            None => self,
        }
    }

    /// Drop records from dependencies such as `chess-corners`.
    pub fn roimap_only(mut self, yes: bool) -> Self {
        self.roimap_only = yes;
        self
    }

    /// Install the logger. Later calls keep the first configuration.
    pub fn install(self) -> Result<(), log::SetLoggerError> {
        if LOGGER.get().is_some() {
            return Ok(());
        }
        let logger = LOGGER.get_or_init(|| RigLogger {
            level: self.level,
            roimap_only: self.roimap_only,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(self.level);
        Ok(())
    }
}

/// Install the stderr logger at `level`.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    LogBuilder::new().level(level).install()
}

/// Install a `tracing` subscriber filtered by [`LOG_ENV`] (default
/// `warn,roimap=info`), emitting span close events for instrumented stages.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn,roimap=info"));
    let subscriber = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);
    let _ = if json {
        subscriber.json().flatten_event(true).finish().try_init()
    } else {
        subscriber.compact().finish().try_init()
    };
}
