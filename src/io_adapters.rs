use crate::error::ShellError;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, BufRead, Write};

/// One read from the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// A non-empty line, line terminator already stripped.
    Command(String),
    /// A line consisting of only the terminator.
    EndOfSession,
    /// The read was cut short by an interrupt request.
    Interrupted,
}

/// Source of command lines for the read-execute loop.
///
/// End of stream is an error ([`ShellError::InputError`]), not a regular outcome.
pub trait LineSource {
    /// Show `prompt` and read one line.
    fn read_line(&mut self, prompt: &str) -> Result<Line, ShellError>;
}

fn end_of_stream() -> ShellError {
    ShellError::InputError(io::Error::from(io::ErrorKind::UnexpectedEof))
}

/// Interactive line editor for terminals.
pub struct Editor {
    editor: DefaultEditor,
}

impl Editor {
    pub fn new() -> Result<Self, ShellError> {
        let editor =
            DefaultEditor::new().map_err(|e| ShellError::InputError(io::Error::other(e.to_string())))?;
        Ok(Self { editor })
    }
}

impl LineSource for Editor {
    fn read_line(&mut self, prompt: &str) -> Result<Line, ShellError> {
        match self.editor.readline(prompt) {
            Ok(line) if line.is_empty() => Ok(Line::EndOfSession),
            Ok(line) => {
                let _ = self.editor.add_history_entry(line.as_str());
                Ok(Line::Command(line))
            }
            Err(ReadlineError::Interrupted) => Ok(Line::Interrupted),
            Err(ReadlineError::Eof) => Err(end_of_stream()),
            Err(ReadlineError::Io(e)) if e.kind() == io::ErrorKind::Interrupted => {
                Ok(Line::Interrupted)
            }
            Err(ReadlineError::Io(e)) => Err(ShellError::InputError(e)),
            Err(e) => Err(ShellError::InputError(io::Error::other(e.to_string()))),
        }
    }
}

/// Plain buffered reader, for piped input and tests.
///
/// The prompt marker is written to `prompt_out` before every read. A read cut short
/// by a signal is reported as [`Line::Interrupted`]; bytes received before the
/// signal are kept and complete the next line.
pub struct Reader<R, W> {
    input: R,
    prompt_out: W,
    partial: Vec<u8>,
}

impl<R: BufRead, W: Write> Reader<R, W> {
    pub fn new(input: R, prompt_out: W) -> Self {
        Self {
            input,
            prompt_out,
            partial: Vec::new(),
        }
    }

    /// Read up to and including the next `\n`, or to end of stream.
    ///
    /// `BufRead::read_line` retries on `EINTR`, which would hide interrupts, so the
    /// buffer is walked by hand.
    fn fill_line(&mut self) -> io::Result<()> {
        loop {
            let available = self.input.fill_buf()?;
            if available.is_empty() {
                return Ok(());
            }
            match available.iter().position(|&b| b == b'\n') {
                Some(end) => {
                    self.partial.extend_from_slice(&available[..=end]);
                    self.input.consume(end + 1);
                    return Ok(());
                }
                None => {
                    let taken = available.len();
                    self.partial.extend_from_slice(available);
                    self.input.consume(taken);
                }
            }
        }
    }
}

impl<R: BufRead, W: Write> LineSource for Reader<R, W> {
    fn read_line(&mut self, prompt: &str) -> Result<Line, ShellError> {
        write!(self.prompt_out, "{}", prompt).map_err(ShellError::InputError)?;
        self.prompt_out.flush().map_err(ShellError::InputError)?;

        match self.fill_line() {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(Line::Interrupted),
            Err(e) => return Err(ShellError::InputError(e)),
        }
        if self.partial.is_empty() {
            return Err(end_of_stream());
        }

        let bytes = std::mem::take(&mut self.partial);
        let line = String::from_utf8(bytes)
            .map_err(|e| ShellError::InputError(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        let stripped = line
            .strip_suffix('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .unwrap_or(line.as_str());
        if stripped.is_empty() {
            Ok(Line::EndOfSession)
        } else {
            Ok(Line::Command(stripped.to_owned()))
        }
    }
}
