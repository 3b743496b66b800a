use nix::errno::Errno;
use std::path::PathBuf;

/// Everything that can go wrong while reading, classifying or running a command.
///
/// Only [`ShellError::ChildCreationFailed`] and [`ShellError::InputError`] end the
/// session; every other variant is reported to the user and the loop continues.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("empty command")]
    EmptyCommand,

    #[error("{0}: invalid limit, expected a non-negative integer")]
    InvalidLimitArgument(String),

    #[error("Failed. This size is larger than the hard limit of {hard_cap}")]
    LimitExceedsHardCap { requested: u64, hard_cap: u64 },

    #[error("failed to access the data segment limit: {0}")]
    LimitUnavailable(#[source] Errno),

    #[error("{0}: No such file or directory")]
    NoSuchDirectory(String),

    #[error("No path to a FIFO is present.")]
    NoChannelConfigured,

    #[error("{}: not a named pipe", .0.display())]
    InvalidChannel(PathBuf),

    #[error("only two-stage pipelines are supported, got {0} stages")]
    UnsupportedPipelineDepth(usize),

    #[error("argument contains a NUL byte: {0:?}")]
    InteriorNul(String),

    #[error("Failed to create child process: {0}")]
    ChildCreationFailed(#[source] Errno),

    #[error("failed to replace the child's program image: {0}")]
    ChildImageReplacementFailed(#[source] Errno),

    #[error("failed to wait for child process: {0}")]
    WaitFailed(#[source] Errno),

    #[error("Could not get command")]
    InputError(#[source] std::io::Error),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl ShellError {
    /// Whether the error terminates the whole interpreter.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ShellError::ChildCreationFailed(_) | ShellError::InputError(_)
        )
    }

    /// The OS error behind this failure, if there is one.
    pub fn errno(&self) -> Option<Errno> {
        match self {
            ShellError::LimitUnavailable(errno)
            | ShellError::ChildCreationFailed(errno)
            | ShellError::ChildImageReplacementFailed(errno)
            | ShellError::WaitFailed(errno) => Some(*errno),
            _ => None,
        }
    }
}
