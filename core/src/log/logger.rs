use super::consts::LOG_LINE_PATTERN;
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Config, Logger, Root},
    encode::pattern::PatternEncoder,
};
use std::{collections::HashMap, env, mem, str::FromStr};

const CONSOLE_APPENDER: &str = "stdout";

#[derive(Clone, Debug, thiserror::Error)]
pub enum LogError {
    #[error("Logger config error: {0}")]
    Config(String),

    #[error("logger already initialized")]
    AlreadyInitialized,
}

pub(super) struct Loggers {
    root_level: LevelFilter,
    loggers: HashMap<String, LevelFilter>,
}

/// Builds a [`Loggers`] set out of filter spec expressions.
///
/// An expression is a comma-separated list of specs, each being either a bare
/// level (`debug`), defining the root level, or a `target=level` pair
/// (`idnet_notify=trace`), defining the level of one module tree.
/// Unparsable specs are ignored.
pub(super) struct Builder {
    root_level: Option<LevelFilter>,
    loggers: HashMap<String, LevelFilter>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder { root_level: None, loggers: HashMap::new() }
    }

    pub fn from_expression(expression: &str) -> Self {
        let mut builder = Self::new();
        builder.parse_expression(expression);
        builder
    }

    pub fn parse_env(&mut self, env: &str) -> &mut Self {
        self.parse_expression(&env::var(env).unwrap_or_default())
    }

    pub fn parse_expression(&mut self, expression: &str) -> &mut Self {
        for spec in expression.split(',').map(|x| x.trim()).filter(|x| !x.is_empty()) {
            match spec.split_once('=') {
                None => {
                    if let Ok(level) = LevelFilter::from_str(spec) {
                        self.root_level = Some(level);
                    }
                }
                Some((name, level)) => {
                    if let Ok(level) = LevelFilter::from_str(level.trim()) {
                        // Module paths use underscores while crate names use dashes
                        self.loggers.insert(name.trim().replace('-', "_"), level);
                    }
                }
            }
        }
        self
    }

    pub fn build(&mut self) -> Loggers {
        Loggers { root_level: self.root_level.unwrap_or(LevelFilter::Info), loggers: mem::take(&mut self.loggers) }
    }
}

pub(super) fn init(loggers: &Loggers) -> Result<(), LogError> {
    let stdout = ConsoleAppender::builder().encoder(Box::new(PatternEncoder::new(LOG_LINE_PATTERN))).build();
    let config = Config::builder()
        .appender(Appender::builder().build(CONSOLE_APPENDER, Box::new(stdout)))
        .loggers(loggers.loggers.iter().map(|(name, level)| Logger::builder().build(name.clone(), *level)))
        .build(Root::builder().appender(CONSOLE_APPENDER).build(loggers.root_level))
        .map_err(|err| LogError::Config(err.to_string()))?;
    log4rs::init_config(config).map_err(|_| LogError::AlreadyInitialized)?;
    Ok(())
}
