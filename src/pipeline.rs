//! Two programs connected through a named pipe.
//!
//! The interpreter forks the downstream stage first, and the downstream stage forks
//! the upstream one before replacing its own image. The interpreter then only waits
//! on the downstream process, which cannot finish before the upstream stage has
//! closed its end of the channel.
//!
//! Opening a FIFO blocks until the opposite end is opened too. The upstream stage
//! opens for writing and the downstream stage for reading, concurrently; if both
//! stages tried to open the channel in the same direction, or one stage dies
//! before opening it, the other blocks forever.

use crate::command::{
    ChildResult, PipelineSpec, PreparedInvocation, STATUS_CHANNEL_FAILED,
    STATUS_STAGE_SPAWN_FAILED,
};
use crate::error::ShellError;
use crate::external::{child_exit, exec_or_exit, wait_for};
use log::info;
use nix::fcntl::{OFlag, open};
use nix::libc;
use nix::sys::stat::Mode;
use nix::unistd::{self, ForkResult};
use std::ffi::{CStr, CString};
use std::fs;
use std::os::fd::RawFd;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;

/// Run both stages of `spec` and block until the downstream stage terminates.
///
/// The returned result describes the downstream process.
pub fn launch(spec: &PipelineSpec) -> Result<ChildResult, ShellError> {
    check_channel(&spec.channel_path)?;
    let upstream = spec.upstream.to_c_strings()?;
    let downstream = spec.downstream.to_c_strings()?;
    let channel = CString::new(spec.channel_path.as_os_str().as_bytes())
        .map_err(|_| ShellError::InteriorNul(spec.channel_path.display().to_string()))?;

    // SAFETY: both children only call async-signal-safe functions before exec or _exit.
    match unsafe { unistd::fork() } {
        Ok(ForkResult::Child) => run_downstream(&upstream, &downstream, &channel),
        Ok(ForkResult::Parent { child }) => {
            info!(
                "started pipeline {} | {} as pid {} via {}",
                spec.upstream.program,
                spec.downstream.program,
                child,
                spec.channel_path.display()
            );
            let result = wait_for(child)?;
            info!("pipeline pid {} finished with {:?}", child, result.status);
            Ok(result)
        }
        Err(errno) => Err(ShellError::ChildCreationFailed(errno)),
    }
}

/// The channel must already exist and be a FIFO; it is never created here.
fn check_channel(path: &Path) -> Result<(), ShellError> {
    match fs::metadata(path) {
        Ok(meta) if meta.file_type().is_fifo() => Ok(()),
        _ => Err(ShellError::InvalidChannel(path.to_path_buf())),
    }
}

fn run_downstream(
    upstream: &PreparedInvocation,
    downstream: &PreparedInvocation,
    channel: &CStr,
) -> ! {
    // SAFETY: see `launch`.
    match unsafe { unistd::fork() } {
        Ok(ForkResult::Child) => run_stage(upstream, channel, OFlag::O_WRONLY, libc::STDOUT_FILENO),
        Ok(ForkResult::Parent { .. }) => {
            run_stage(downstream, channel, OFlag::O_RDONLY, libc::STDIN_FILENO)
        }
        Err(errno) => child_exit(upstream.program(), errno, STATUS_STAGE_SPAWN_FAILED),
    }
}

/// Open `channel` with `access`, move it onto `target` and exec the stage.
fn run_stage(prepared: &PreparedInvocation, channel: &CStr, access: OFlag, target: RawFd) -> ! {
    let fd = match open(channel, access, Mode::empty()) {
        Ok(fd) => fd,
        Err(errno) => child_exit(channel, errno, STATUS_CHANNEL_FAILED),
    };
    if fd != target {
        if let Err(errno) = unistd::dup2(fd, target) {
            child_exit(channel, errno, STATUS_CHANNEL_FAILED);
        }
        let _ = unistd::close(fd);
    }
    exec_or_exit(prepared)
}
