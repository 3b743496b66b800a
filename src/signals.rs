//! Interrupt (SIGINT) and suspend (SIGTSTP) handling.
//!
//! The SIGINT handler only raises a flag. The read-execute loop consumes it between
//! commands and runs the exit confirmation dialog, which talks to the terminal with
//! raw `read(2)` / `write(2)` only. SIGTSTP never stops the interpreter; its handler
//! just redraws the prompt marker.

use log::debug;
use nix::errno::Errno;
use nix::libc;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use nix::unistd;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};
use std::sync::atomic::{AtomicBool, Ordering};

const CONFIRM_PROMPT: &[u8] = b"\n>>> Do you wish to exit Tiny-shell(y/n)? ";
const SUSPEND_REDRAW: &[u8] = b"\n>>> ";

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_interrupt(_: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

extern "C" fn on_suspend(_: libc::c_int) {
    // SAFETY: stdout stays open for the lifetime of the process.
    let stdout = unsafe { BorrowedFd::borrow_raw(libc::STDOUT_FILENO) };
    let _ = unistd::write(stdout, SUSPEND_REDRAW);
}

/// What the user chose in the exit confirmation dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Exit,
    Resume,
}

/// Owner of the installed signal handlers.
#[derive(Debug)]
pub struct InterruptController {
    _private: (),
}

impl InterruptController {
    /// Install the SIGINT and SIGTSTP handlers for the whole process.
    ///
    /// Handlers are installed without `SA_RESTART`, so a blocking read returns
    /// `EINTR` and the loop gets a chance to look at the flag.
    pub fn install() -> Result<Self, Errno> {
        let interrupt = SigAction::new(
            SigHandler::Handler(on_interrupt),
            SaFlags::empty(),
            SigSet::empty(),
        );
        let suspend = SigAction::new(
            SigHandler::Handler(on_suspend),
            SaFlags::empty(),
            SigSet::empty(),
        );
        // SAFETY: both handlers only touch an atomic or call write(2).
        unsafe {
            sigaction(Signal::SIGINT, &interrupt)?;
            sigaction(Signal::SIGTSTP, &suspend)?;
        }
        debug!("installed SIGINT and SIGTSTP handlers");
        Ok(Self { _private: () })
    }
}

/// Something that can ask the user whether to leave the interpreter.
pub trait ExitPrompt {
    fn confirm_exit(&self) -> Confirmation;
}

impl ExitPrompt for InterruptController {
    /// Ask on the terminal, through the raw standard descriptors.
    fn confirm_exit(&self) -> Confirmation {
        // SAFETY: stdin and stdout stay open for the lifetime of the process.
        let (stdin, stdout) = unsafe {
            (
                BorrowedFd::borrow_raw(libc::STDIN_FILENO),
                BorrowedFd::borrow_raw(libc::STDOUT_FILENO),
            )
        };
        confirm_exit(stdin, stdout)
    }
}

/// Consume a pending interrupt request.
pub fn take_interrupt() -> bool {
    INTERRUPTED.swap(false, Ordering::SeqCst)
}

/// Record an interrupt request, as the SIGINT handler does.
pub fn request_interrupt() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Exit confirmation dialog over raw descriptors.
///
/// Exits when the first byte of the answer is `y` or `Y`. Anything else, including
/// a failed or empty read, resumes; the next read shows the prompt marker again.
pub fn confirm_exit(input: impl AsFd, output: impl AsFd) -> Confirmation {
    let _ = unistd::write(output.as_fd(), CONFIRM_PROMPT);
    let mut answer = [0u8; 4];
    let read = loop {
        match unistd::read(input.as_fd().as_raw_fd(), &mut answer) {
            Err(Errno::EINTR) => continue,
            other => break other,
        }
    };
    match read {
        Ok(n) if n > 0 && matches!(answer[0], b'y' | b'Y') => Confirmation::Exit,
        _ => Confirmation::Resume,
    }
}
