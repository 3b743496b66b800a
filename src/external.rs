use crate::command::{
    ChildResult, ChildStatus, Invocation, PreparedInvocation, STATUS_EXEC_FAILED,
    STATUS_NOT_FOUND,
};
use crate::error::ShellError;
use log::{debug, info};
use nix::errno::Errno;
use nix::libc;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{self, ForkResult, Pid};
use std::convert::Infallible;
use std::ffi::CStr;
use std::os::fd::BorrowedFd;

/// Run `inv` in a new child process and block until it terminates.
///
/// A program that cannot be found or executed makes the child exit with
/// [`STATUS_NOT_FOUND`] or [`STATUS_EXEC_FAILED`]; the child never returns into
/// interpreter code.
pub fn launch(inv: &Invocation) -> Result<ChildResult, ShellError> {
    let prepared = inv.to_c_strings()?;
    // SAFETY: the child only calls async-signal-safe functions before exec or _exit.
    match unsafe { unistd::fork() } {
        Ok(ForkResult::Child) => exec_or_exit(&prepared),
        Ok(ForkResult::Parent { child }) => {
            info!("started {} as pid {}", inv.program, child);
            let result = wait_for(child)?;
            info!("pid {} finished with {:?}", child, result.status);
            Ok(result)
        }
        Err(errno) => Err(ShellError::ChildCreationFailed(errno)),
    }
}

/// Block until `pid` terminates, retrying when a signal interrupts the wait.
pub(crate) fn wait_for(pid: Pid) -> Result<ChildResult, ShellError> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(pid, code)) => {
                return Ok(ChildResult {
                    pid,
                    status: ChildStatus::Exited(code),
                });
            }
            Ok(WaitStatus::Signaled(pid, signal, _)) => {
                return Ok(ChildResult {
                    pid,
                    status: ChildStatus::Signaled(signal),
                });
            }
            Ok(other) => debug!("ignoring wait status {:?}", other),
            Err(Errno::EINTR) => debug!("wait for pid {} interrupted, retrying", pid),
            Err(errno) => return Err(ShellError::WaitFailed(errno)),
        }
    }
}

/// Replace the current process image with `prepared`.
///
/// Only returns when the replacement failed.
pub(crate) fn replace_image(prepared: &PreparedInvocation) -> Result<Infallible, ShellError> {
    unistd::execvp(prepared.program(), &prepared.arguments)
        .map_err(ShellError::ChildImageReplacementFailed)
}

/// Child side of a launch: exec, or report and terminate with a distinct status.
pub(crate) fn exec_or_exit(prepared: &PreparedInvocation) -> ! {
    let Err(err) = replace_image(prepared);
    let errno = err.errno().unwrap_or(Errno::UnknownErrno);
    let status = match errno {
        Errno::ENOENT => STATUS_NOT_FOUND,
        _ => STATUS_EXEC_FAILED,
    };
    child_exit(prepared.program(), errno, status)
}

/// Write `<what>: <errno description>` to stderr and `_exit` without unwinding.
///
/// Safe to call between fork and exec: raw writes only, no allocation, no stdio buffers.
pub(crate) fn child_exit(what: &CStr, errno: Errno, status: i32) -> ! {
    // SAFETY: stderr stays open for the lifetime of the process.
    let stderr = unsafe { BorrowedFd::borrow_raw(libc::STDERR_FILENO) };
    for part in [what.to_bytes(), &b": "[..], errno.desc().as_bytes(), &b"\n"[..]] {
        let _ = unistd::write(stderr, part);
    }
    // SAFETY: _exit skips atexit handlers and stdio flushing inherited from the parent.
    unsafe { libc::_exit(status) }
}
