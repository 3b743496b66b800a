use crate::PROMPT;
use crate::command::{CommandFactory, ExitCode, Invocation, PipelineSpec};
use crate::env::Environment;
use crate::error::ShellError;
use crate::external;
use crate::io_adapters::{Line, LineSource};
use crate::pipeline;
use crate::signals::{self, Confirmation, ExitPrompt};
use log::{debug, warn};
use std::io::Write;

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports the directives defined in this crate.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// A minimal interactive interpreter for directives, programs and two-stage pipelines.
///
/// The interpreter owns an [`Environment`] and a list of [`CommandFactory`] objects
/// that are queried for directives by name. Anything that is not a directive is run
/// as an external program, or as a pipeline when the line contains ` | `.
///
/// Example
/// ```
/// use tiny_shell::Interpreter;
/// use tiny_shell::env::Environment;
/// let mut sh = Interpreter::new(Environment::new(None));
/// let mut out = Vec::new();
/// let code = sh.dispatch("true", &mut out).unwrap();
/// assert_eq!(code, 0);
/// ```
pub struct Interpreter {
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create an interpreter with the built-in directives `chdir`, `history` and `limit`.
    pub fn new(env: Environment) -> Self {
        use crate::builtin::*;
        Self {
            env,
            commands: vec![
                Box::new(Factory::<Chdir>::default()),
                Box::new(Factory::<History>::default()),
                Box::new(Factory::<Limit>::default()),
            ],
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Log, classify and run one command line.
    ///
    /// Directive reports are written to `stdout`; programs write to the inherited
    /// standard streams. Returns the exit code of the directive or of the process
    /// the interpreter waited on.
    pub fn dispatch(&mut self, raw: &str, stdout: &mut dyn Write) -> Result<ExitCode, ShellError> {
        self.env.history.push(raw);

        let mut words = raw.split_whitespace();
        let name = words.next().ok_or(ShellError::EmptyCommand)?;
        let args: Vec<&str> = words.collect();
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(name, &args) {
                debug!("directive {} {:?}", name, args);
                return cmd.execute(stdout, &mut self.env);
            }
        }

        stdout.flush()?;
        let result = if PipelineSpec::is_requested(raw) {
            let spec = PipelineSpec::parse(raw, self.env.channel.as_deref())?;
            debug!("pipeline {:?}", spec);
            pipeline::launch(&spec)?
        } else {
            let inv = Invocation::parse(raw)?;
            debug!("invocation {:?}", inv);
            external::launch(&inv)?
        };
        Ok(result.exit_code())
    }

    /// Read and run lines until the session ends.
    ///
    /// An empty line or a confirmed interrupt ends the session with status 0.
    /// Non-fatal errors are reported on `stdout` as `tiny-shell: <message>` and the
    /// loop continues; fatal errors are returned.
    pub fn repl(
        &mut self,
        input: &mut dyn LineSource,
        exit_prompt: &dyn ExitPrompt,
        stdout: &mut dyn Write,
    ) -> Result<ExitCode, ShellError> {
        loop {
            if exit_requested(exit_prompt) {
                return Ok(0);
            }

            let raw = match input.read_line(PROMPT)? {
                Line::EndOfSession => return Ok(0),
                Line::Interrupted => {
                    signals::take_interrupt();
                    if exit_prompt.confirm_exit() == Confirmation::Exit {
                        return Ok(0);
                    }
                    continue;
                }
                Line::Command(raw) => raw,
            };
            // A SIGINT that arrives after the line was complete is seen here.
            if exit_requested(exit_prompt) {
                return Ok(0);
            }

            match self.dispatch(&raw, stdout) {
                Ok(code) => debug!("{:?} finished with {}", raw, code),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("{:?}: {}", raw, e);
                    writeln!(stdout, "tiny-shell: {}", e)?;
                }
            }
            stdout.flush()?;
        }
    }
}

fn exit_requested(exit_prompt: &dyn ExitPrompt) -> bool {
    signals::take_interrupt() && exit_prompt.confirm_exit() == Confirmation::Exit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io_adapters::Reader;
    use serial_test::serial;
    use std::cell::Cell;
    use std::env as stdenv;
    use std::fs;
    use std::io::Cursor;
    use std::path::{Path, PathBuf};

    struct Answer {
        choice: Confirmation,
        asked: Cell<usize>,
    }

    impl Answer {
        fn new(choice: Confirmation) -> Self {
            Self {
                choice,
                asked: Cell::new(0),
            }
        }
    }

    impl ExitPrompt for Answer {
        fn confirm_exit(&self) -> Confirmation {
            self.asked.set(self.asked.get() + 1);
            self.choice
        }
    }

    fn session(
        sh: &mut Interpreter,
        lines: &str,
        answer: &Answer,
    ) -> (Result<ExitCode, ShellError>, String) {
        let mut input = Reader::new(Cursor::new(lines.as_bytes().to_vec()), Vec::new());
        let mut out = Vec::new();
        let res = sh.repl(&mut input, answer, &mut out);
        (res, String::from_utf8(out).unwrap())
    }

    fn pwd_script(dir: &Path, name: &str) -> (String, PathBuf) {
        let script = dir.join(name);
        let out = dir.join(format!("{}.out", name));
        fs::write(&script, format!("pwd > {}\n", out.display())).unwrap();
        (format!("sh {}", script.display()), out)
    }

    #[test]
    #[serial]
    fn pwd_chdir_pwd_then_empty_line() {
        let orig = stdenv::current_dir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        let (first_pwd, first_out) = pwd_script(scratch.path(), "first");
        let (second_pwd, second_out) = pwd_script(scratch.path(), "second");

        let mut sh = Interpreter::new(Environment::new(None));
        let lines = format!(
            "{}\nchdir {}\n{}\n\n",
            first_pwd,
            target.path().display(),
            second_pwd
        );
        let (res, out) = session(&mut sh, &lines, &Answer::new(Confirmation::Resume));
        stdenv::set_current_dir(&orig).expect("failed to restore cwd");

        assert_eq!(res.unwrap(), 0);
        assert_eq!(out, "");
        assert_eq!(
            fs::canonicalize(fs::read_to_string(first_out).unwrap().trim_end()).unwrap(),
            fs::canonicalize(&orig).unwrap()
        );
        assert_eq!(
            fs::canonicalize(fs::read_to_string(second_out).unwrap().trim_end()).unwrap(),
            fs::canonicalize(target.path()).unwrap()
        );
    }

    #[test]
    #[serial]
    fn end_of_stream_is_fatal() {
        let mut sh = Interpreter::new(Environment::new(None));
        let (res, _) = session(&mut sh, "true\n", &Answer::new(Confirmation::Resume));
        assert!(matches!(res, Err(ShellError::InputError(_))));
    }

    #[test]
    #[serial]
    fn directive_errors_are_reported_and_loop_continues() {
        let orig = stdenv::current_dir().unwrap();
        let mut sh = Interpreter::new(Environment::new(None));
        let (res, out) = session(
            &mut sh,
            "chdir /definitely/not/here\n   \nhistory\n\n",
            &Answer::new(Confirmation::Resume),
        );

        assert_eq!(res.unwrap(), 0);
        assert_eq!(
            out,
            "tiny-shell: /definitely/not/here: No such file or directory\n\
             tiny-shell: empty command\n\
             1  chdir /definitely/not/here\n\
             2     \n\
             3  history\n"
        );
        assert_eq!(stdenv::current_dir().unwrap(), orig);
    }

    #[test]
    #[serial]
    fn pipeline_without_channel_is_reported() {
        let mut sh = Interpreter::new(Environment::new(None));
        let (res, out) = session(&mut sh, "echo hi | cat\n\n", &Answer::new(Confirmation::Resume));
        assert_eq!(res.unwrap(), 0);
        assert_eq!(out, "tiny-shell: No path to a FIFO is present.\n");
    }

    #[test]
    #[serial]
    fn deep_pipeline_is_rejected() {
        let mut sh = Interpreter::new(Environment::new(Some(PathBuf::from("/nonexistent/fifo"))));
        let mut out = Vec::new();
        let err = sh.dispatch("ls | sort | uniq", &mut out).unwrap_err();
        assert!(matches!(err, ShellError::UnsupportedPipelineDepth(3)));
        assert_eq!(sh.env().history.iter().last(), Some("ls | sort | uniq"));
    }

    #[test]
    #[serial]
    fn deep_pipeline_without_channel_reports_depth() {
        let mut sh = Interpreter::new(Environment::new(None));
        let (res, out) = session(&mut sh, "a | b | c\n\n", &Answer::new(Confirmation::Resume));
        assert_eq!(res.unwrap(), 0);
        assert_eq!(
            out,
            "tiny-shell: only two-stage pipelines are supported, got 3 stages\n"
        );
    }

    #[test]
    #[serial]
    fn glued_delimiter_is_not_a_pipeline() {
        let mut sh = Interpreter::new(Environment::new(None));
        let mut out = Vec::new();
        let code = sh.dispatch("true|false", &mut out).unwrap();
        assert_eq!(code, crate::command::STATUS_NOT_FOUND);
    }

    #[test]
    #[serial]
    fn dispatch_returns_program_status() {
        let mut sh = Interpreter::new(Environment::new(None));
        let mut out = Vec::new();
        assert_eq!(sh.dispatch("true", &mut out).unwrap(), 0);
        assert_eq!(sh.dispatch("false", &mut out).unwrap(), 1);
    }

    #[test]
    #[serial]
    fn pending_interrupt_confirmed_ends_session() {
        let mut sh = Interpreter::new(Environment::new(None));
        let answer = Answer::new(Confirmation::Exit);
        signals::request_interrupt();

        let (res, _) = session(&mut sh, "", &answer);

        assert_eq!(res.unwrap(), 0);
        assert_eq!(answer.asked.get(), 1);
    }

    #[test]
    #[serial]
    fn pending_interrupt_declined_resumes() {
        let mut sh = Interpreter::new(Environment::new(None));
        let answer = Answer::new(Confirmation::Resume);
        signals::request_interrupt();

        let (res, _) = session(&mut sh, "history\n\n", &answer);

        assert_eq!(res.unwrap(), 0);
        assert_eq!(answer.asked.get(), 1);
        assert_eq!(sh.env().history.len(), 1);
    }

    struct Interrupts(Vec<Line>);

    impl LineSource for Interrupts {
        fn read_line(&mut self, _prompt: &str) -> Result<Line, ShellError> {
            Ok(self.0.remove(0))
        }
    }

    #[test]
    #[serial]
    fn interrupted_read_asks_for_confirmation() {
        let mut sh = Interpreter::new(Environment::new(None));
        let answer = Answer::new(Confirmation::Resume);
        let mut input = Interrupts(vec![Line::Interrupted, Line::EndOfSession]);

        let mut out = Vec::new();
        let res = sh.repl(&mut input, &answer, &mut out);

        assert_eq!(res.unwrap(), 0);
        assert_eq!(answer.asked.get(), 1);
        assert!(out.is_empty(), "loop wrote {:?}", String::from_utf8_lossy(&out));
        assert!(sh.env().history.is_empty());
    }
}
