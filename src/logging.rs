//! Tracing subscriber setup driven by the numeric debug level.
//!
//! Levels follow the classic 0-10 scale: 0 is silent, 1-2 errors only,
//! 3 warnings, 4 informational (the default), 5-6 debug, 7 and up trace.

use std::sync::OnceLock;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

/// Reload handle for the installed filter; unset when `RUST_LOG` chose it
static FILTER: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Map a numeric debug level to a tracing filter
pub fn level_filter(debug_level: u32) -> LevelFilter {
    match debug_level {
        0 => LevelFilter::OFF,
        1 | 2 => LevelFilter::ERROR,
        3 => LevelFilter::WARN,
        4 => LevelFilter::INFO,
        5 | 6 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn level_env_filter(debug_level: u32) -> EnvFilter {
    EnvFilter::default().add_directive(level_filter(debug_level).into())
}

/// Install the global subscriber. `RUST_LOG` wins over `debug_level` when set.
///
/// Returns false if a subscriber was already installed.
pub fn init(debug_level: u32) -> bool {
    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (level_env_filter(debug_level), false),
    };
    let (filter, handle) = reload::Layer::new(filter);

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .is_ok();

    if installed && !from_env {
        let _ = FILTER.set(handle);
    }
    installed
}

/// Swap the installed filter for one at `debug_level`.
///
/// Returns false when nothing was installed by [`init`] or `RUST_LOG`
/// fixed the filter.
pub fn set_level(debug_level: u32) -> bool {
    match FILTER.get() {
        Some(handle) => match handle.reload(level_env_filter(debug_level)) {
            Ok(()) => true,
            Err(e) => {
                eprintln!("cannot change log level: {}", e);
                false
            }
        },
        None => false,
    }
}
