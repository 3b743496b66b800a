use crate::env::Environment;
use crate::error::ShellError;
use nix::sys::signal::Signal;
use nix::unistd::Pid;
use regex::Regex;
use std::ffi::CString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// Object-safe trait for a directive the interpreter runs in-process.
pub trait ExecutableCommand {
    /// Executes the command, writing any report to `stdout`.
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode, ShellError>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>>;
}

/// Status of a child whose stage setup failed (channel open or redirect).
pub const STATUS_CHANNEL_FAILED: ExitCode = 125;
/// Status of a child whose program was found but could not be executed.
pub const STATUS_EXEC_FAILED: ExitCode = 126;
/// Status of a child whose program could not be found.
pub const STATUS_NOT_FOUND: ExitCode = 127;
/// Status of a downstream stage that could not create its upstream stage.
pub const STATUS_STAGE_SPAWN_FAILED: ExitCode = 124;

/// A pipe character with whitespace on both sides.
static PIPE_DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s\|\s").expect("valid delimiter pattern"));

/// A program name plus its full argument vector, ready to create a process.
///
/// `arguments[0]` is the program name itself, following the usual argv layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub arguments: Vec<String>,
}

impl Invocation {
    /// Split a raw command line on runs of whitespace.
    ///
    /// No quoting, escaping or globbing: every whitespace-delimited substring is one token.
    pub fn parse(raw: &str) -> Result<Self, ShellError> {
        let arguments: Vec<String> = raw.split_whitespace().map(str::to_owned).collect();
        let program = arguments.first().cloned().ok_or(ShellError::EmptyCommand)?;
        Ok(Self { program, arguments })
    }

    /// Convert to NUL-terminated strings so the child never allocates after fork.
    pub(crate) fn to_c_strings(&self) -> Result<PreparedInvocation, ShellError> {
        let arguments = self
            .arguments
            .iter()
            .map(|arg| CString::new(arg.as_str()).map_err(|_| ShellError::InteriorNul(arg.clone())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PreparedInvocation { arguments })
    }
}

/// An [`Invocation`] converted for `execvp`.
pub(crate) struct PreparedInvocation {
    pub(crate) arguments: Vec<CString>,
}

impl PreparedInvocation {
    pub(crate) fn program(&self) -> &CString {
        &self.arguments[0]
    }
}

/// Two invocations connected through a named channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSpec {
    pub upstream: Invocation,
    pub downstream: Invocation,
    pub channel_path: PathBuf,
}

impl PipelineSpec {
    /// Whether `raw` asks for a pipeline, i.e. contains `|` surrounded by whitespace.
    ///
    /// Any other spacing of the delimiter is not a pipeline request.
    pub fn is_requested(raw: &str) -> bool {
        PIPE_DELIMITER.is_match(raw)
    }

    /// Split `raw` on the pipe character into exactly two stages joined by `channel_path`.
    ///
    /// More than one delimiter fails with [`ShellError::UnsupportedPipelineDepth`]
    /// instead of silently dropping the extra stages. Malformed stages are reported
    /// before a missing channel ([`ShellError::NoChannelConfigured`]).
    pub fn parse(raw: &str, channel_path: Option<&Path>) -> Result<Self, ShellError> {
        let segments: Vec<&str> = raw.split('|').collect();
        let [upstream, downstream] = segments.as_slice() else {
            return Err(ShellError::UnsupportedPipelineDepth(segments.len()));
        };
        let upstream = Invocation::parse(upstream)?;
        let downstream = Invocation::parse(downstream)?;
        let channel_path = channel_path.ok_or(ShellError::NoChannelConfigured)?;
        Ok(Self {
            upstream,
            downstream,
            channel_path: channel_path.to_path_buf(),
        })
    }
}

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildStatus {
    Exited(ExitCode),
    Signaled(Signal),
}

/// A terminated child, as observed by the launcher that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildResult {
    pub pid: Pid,
    pub status: ChildStatus,
}

impl ChildResult {
    /// Shell-style exit code: the exit status as-is, or `128 + signal`.
    pub fn exit_code(&self) -> ExitCode {
        match self.status {
            ChildStatus::Exited(code) => code,
            ChildStatus::Signaled(signal) => 128 + signal as i32,
        }
    }

    pub fn success(&self) -> bool {
        self.status == ChildStatus::Exited(0)
    }
}
