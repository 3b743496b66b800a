use crate::history::History;
use crate::limits::{DataSegmentLimit, LimitBackend, ResourceLimiter};
use std::env as stdenv;
use std::path::PathBuf;

/// Session state owned by the interpreter.
///
/// The environment contains:
/// - `current_dir`: the working directory, kept in sync with the process by `chdir`.
/// - `channel`: the named pipe supplied at startup, if any.
/// - `history`: the bounded log of every line the user entered.
/// - `limiter`: the data segment limit shared by the interpreter and future children.
#[derive(Debug)]
pub struct Environment {
    pub current_dir: PathBuf,
    pub channel: Option<PathBuf>,
    pub history: History,
    pub limiter: ResourceLimiter<Box<dyn LimitBackend>>,
}

impl Environment {
    /// Capture the current working directory and start with an empty history.
    pub fn new(channel: Option<PathBuf>) -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            current_dir,
            channel,
            history: History::default(),
            limiter: ResourceLimiter::new(Box::new(DataSegmentLimit)),
        }
    }

    /// Replace where resource limits are read from and written to.
    pub fn with_limits(mut self, backend: impl LimitBackend + 'static) -> Self {
        self.limiter = ResourceLimiter::new(Box::new(backend));
        self
    }
}
