//! Logger and logging macros
//!
//! For the macros to properly compile, the calling crate must add a dependency to
//! crate log (ie. `log.workspace = true`) because the macros internally use the
//! `log` crate.

mod consts;
mod logger;

pub use consts::DEFAULT_LOGGER_ENV;

#[macro_export]
macro_rules! trace {
    ($($t:tt)*) => {
        log::trace!($($t)*);
    };
}

#[macro_export]
macro_rules! debug {
    ($($t:tt)*) => {
        log::debug!($($t)*);
    };
}

#[macro_export]
macro_rules! info {
    ($($t:tt)*) => {
        log::info!($($t)*);
    };
}

#[macro_export]
macro_rules! warn {
    ($($t:tt)*) => {
        log::warn!($($t)*);
    };
}

#[macro_export]
macro_rules! error {
    ($($t:tt)*) => {
        log::error!($($t)*);
    };
}

/// Initializes the global logger with the given filters expression,
/// after applying any overrides found in the `RUST_LOG` environment
/// variable. Panics if a global logger was already installed.
pub fn init_logger(filters: &str) {
    let mut builder = logger::Builder::from_expression(filters);
    builder.parse_env(consts::DEFAULT_LOGGER_ENV);
    logger::init(&builder.build()).expect("the logger is initialized only once");
}

/// Same as [`init_logger`] but silently keeps the existing global logger
/// when one is already installed. Intended for tests, where any test of
/// the process may have installed the logger first.
pub fn try_init_logger(filters: &str) {
    let mut builder = logger::Builder::from_expression(filters);
    builder.parse_env(consts::DEFAULT_LOGGER_ENV);
    let _ = logger::init(&builder.build());
}
