use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::env::Environment;
use crate::error::ShellError;
use crate::interpreter::Factory;
use argh::{EarlyExit, FromArgs};
use log::debug;
use std::env;
use std::fs;
use std::io::Write;

/// Directives known to the interpreter at compile time.
///
/// Directives are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the directive, e.g. "chdir".
    fn name() -> &'static str;

    /// Executes the directive, writing any report to `stdout`.
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode, ShellError>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode, ShellError> {
        <T as BuiltinCommand>::execute(*self, stdout, env)
    }
}

/// Usage errors and `--help` output produced by argh.
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode, ShellError> {
        writeln!(stdout, "{}", self.output.trim_end())?;
        Ok(if self.is_error { 1 } else { 0 })
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if name != T::name() {
            return None;
        }
        let cmd: Box<dyn ExecutableCommand> = match T::from_args(&[name], args) {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                output,
                is_error: status.is_err(),
            }),
        };
        Some(cmd)
    }
}

fn ignore_rest(name: &str, rest: &[String]) {
    if !rest.is_empty() {
        debug!("{} ignores extra words {:?}", name, rest);
    }
}

#[derive(FromArgs)]
/// Change the current working directory of the interpreter and of every later command.
pub struct Chdir {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory.
    pub target: String,

    #[argh(positional, greedy, arg_name = "ignored")]
    /// further words are accepted and ignored.
    pub rest: Vec<String>,
}

impl BuiltinCommand for Chdir {
    fn name() -> &'static str {
        "chdir"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode, ShellError> {
        ignore_rest(Self::name(), &self.rest);
        let new_dir = env.current_dir.join(&self.target);
        let canonical =
            fs::canonicalize(&new_dir).map_err(|_| ShellError::NoSuchDirectory(self.target.clone()))?;
        env::set_current_dir(&canonical).map_err(|_| ShellError::NoSuchDirectory(self.target))?;
        debug!("working directory is now {}", canonical.display());
        env.current_dir = canonical;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List the most recent commands, oldest first.
pub struct History {
    #[argh(positional, greedy, arg_name = "ignored")]
    /// further words are accepted and ignored.
    pub rest: Vec<String>,
}

impl BuiltinCommand for History {
    fn name() -> &'static str {
        "history"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode, ShellError> {
        ignore_rest(Self::name(), &self.rest);
        env.history.print(stdout)?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Set the soft data segment limit of the interpreter and of every command started later.
pub struct Limit {
    #[argh(positional)]
    /// new soft limit in bytes; must stay below the hard limit.
    pub bytes: String,

    #[argh(positional, greedy, arg_name = "ignored")]
    /// further words are accepted and ignored.
    pub rest: Vec<String>,
}

impl BuiltinCommand for Limit {
    fn name() -> &'static str {
        "limit"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode, ShellError> {
        ignore_rest(Self::name(), &self.rest);
        let applied = env.limiter.set_limit(&self.bytes)?;
        writeln!(stdout, "New resource limit: {} Bytes", applied)?;
        Ok(0)
    }
}
