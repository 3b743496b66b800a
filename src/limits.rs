//! Soft data-segment limit of the interpreter.
//!
//! A new soft limit applies to the interpreter itself and is inherited by every child
//! created afterwards. Children that are already running keep the limit they started with.

use crate::error::ShellError;
use log::{info, warn};
use nix::sys::resource::{Resource, getrlimit, setrlimit};
use std::fmt;

/// Current soft limit and the hard cap it may not reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimitState {
    pub current: u64,
    pub hard_cap: u64,
}

/// Where limits are read from and written to.
pub trait LimitBackend: fmt::Debug {
    fn read(&self) -> Result<ResourceLimitState, ShellError>;

    fn write(&mut self, state: ResourceLimitState) -> Result<(), ShellError>;
}

impl<B: LimitBackend + ?Sized> LimitBackend for Box<B> {
    fn read(&self) -> Result<ResourceLimitState, ShellError> {
        (**self).read()
    }

    fn write(&mut self, state: ResourceLimitState) -> Result<(), ShellError> {
        (**self).write(state)
    }
}

/// `RLIMIT_DATA` of the calling process.
#[derive(Debug, Clone, Copy)]
pub struct DataSegmentLimit;

impl LimitBackend for DataSegmentLimit {
    fn read(&self) -> Result<ResourceLimitState, ShellError> {
        let (current, hard_cap) =
            getrlimit(Resource::RLIMIT_DATA).map_err(ShellError::LimitUnavailable)?;
        Ok(ResourceLimitState { current, hard_cap })
    }

    fn write(&mut self, state: ResourceLimitState) -> Result<(), ShellError> {
        setrlimit(Resource::RLIMIT_DATA, state.current, state.hard_cap)
            .map_err(ShellError::LimitUnavailable)
    }
}

/// Adjusts the soft limit, never letting it reach the hard cap.
#[derive(Debug)]
pub struct ResourceLimiter<B> {
    backend: B,
}

impl<B: LimitBackend> ResourceLimiter<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn state(&self) -> Result<ResourceLimitState, ShellError> {
        self.backend.read()
    }

    /// Parse `requested` as a base-10 byte count and install it as the soft limit.
    ///
    /// Returns the applied value. A request at or above the hard cap is rejected and
    /// the current limit is left untouched.
    pub fn set_limit(&mut self, requested: &str) -> Result<u64, ShellError> {
        let requested: u64 = requested
            .parse()
            .map_err(|_| ShellError::InvalidLimitArgument(requested.to_owned()))?;
        let state = self.backend.read()?;
        if requested >= state.hard_cap {
            warn!(
                "rejected soft limit {} (hard limit {})",
                requested, state.hard_cap
            );
            return Err(ShellError::LimitExceedsHardCap {
                requested,
                hard_cap: state.hard_cap,
            });
        }
        self.backend.write(ResourceLimitState {
            current: requested,
            ..state
        })?;
        info!("data segment soft limit {} -> {}", state.current, requested);
        Ok(requested)
    }
}
