//! POSIX descriptor handling.

use std::io;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd, RawFd};
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::Command;

use rustix::fs::{Mode, OFlags};
use rustix::io::{Errno, FdFlags};

use spawnio_common::Stream;

use super::HandlePlatform;

/// Lowest descriptor number handed out for duplicates.
///
/// Duplicates never land on 0-2, so they can't be mistaken for the
/// process's own standard streams.
const MIN_DUP_FD: RawFd = 3;

/// Descriptor model: inheritance is controlled by `FD_CLOEXEC`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PosixPlatform;

impl PosixPlatform {
    /// Create the POSIX platform.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HandlePlatform for PosixPlatform {
    fn name(&self) -> &'static str {
        "posix"
    }

    fn inherits_by_default(&self) -> bool {
        true
    }

    fn duplicate_std(&self, stream: Stream) -> io::Result<Option<OwnedFd>> {
        let result = match stream {
            Stream::Stdin => rustix::io::fcntl_dupfd_cloexec(io::stdin().as_fd(), MIN_DUP_FD),
            Stream::Stdout => rustix::io::fcntl_dupfd_cloexec(io::stdout().as_fd(), MIN_DUP_FD),
            Stream::Stderr => rustix::io::fcntl_dupfd_cloexec(io::stderr().as_fd(), MIN_DUP_FD),
        };

        match result {
            Ok(fd) => Ok(Some(fd)),
            // The parent itself runs without this stream.
            Err(errno) if errno == Errno::BADF => {
                tracing::debug!(%stream, "Parent has no descriptor for stream");
                Ok(None)
            }
            Err(errno) => Err(errno.into()),
        }
    }

    fn duplicate(&self, handle: BorrowedFd<'_>) -> io::Result<OwnedFd> {
        Ok(rustix::io::fcntl_dupfd_cloexec(handle, MIN_DUP_FD)?)
    }

    fn anonymous_pipe(&self) -> io::Result<(OwnedFd, OwnedFd)> {
        #[cfg(not(target_vendor = "apple"))]
        {
            use rustix::pipe::PipeFlags;

            Ok(rustix::pipe::pipe_with(PipeFlags::CLOEXEC)?)
        }

        // No pipe2 here, so close the window by hand.
        #[cfg(target_vendor = "apple")]
        {
            let (read, write) = rustix::pipe::pipe()?;
            rustix::io::fcntl_setfd(&read, FdFlags::CLOEXEC)?;
            rustix::io::fcntl_setfd(&write, FdFlags::CLOEXEC)?;
            Ok((read, write))
        }
    }

    fn open_null(&self, path: &Path) -> io::Result<OwnedFd> {
        Ok(rustix::fs::open(
            path,
            OFlags::RDWR | OFlags::CLOEXEC | OFlags::NOCTTY,
            Mode::empty(),
        )?)
    }

    fn set_inheritable(&self, handle: BorrowedFd<'_>, inheritable: bool) -> io::Result<()> {
        let mut flags = rustix::io::fcntl_getfd(handle)?;
        flags.set(FdFlags::CLOEXEC, !inheritable);
        rustix::io::fcntl_setfd(handle, flags)?;
        Ok(())
    }

    fn is_inheritable(&self, handle: BorrowedFd<'_>) -> io::Result<bool> {
        let flags = rustix::io::fcntl_getfd(handle)?;
        Ok(!flags.contains(FdFlags::CLOEXEC))
    }
}

/// Close `fds` in the child once its stdio is in place, just before `exec`.
///
/// Descriptors 0-2 are skipped: at that point they are the child's own
/// streams.
#[allow(unsafe_code)]
pub(crate) fn close_in_child(cmd: &mut Command, fds: Vec<RawFd>) {
    let fds: Vec<RawFd> = fds.into_iter().filter(|&fd| fd > 2).collect();
    if fds.is_empty() {
        return;
    }

    // SAFETY: the hook runs between fork and exec and only calls close(2),
    // which is async-signal-safe. The descriptors were collected before the
    // fork, and std has already moved the child's stdio onto 0-2.
    unsafe {
        cmd.pre_exec(move || {
            for &fd in &fds {
                rustix::io::close(fd);
            }
            Ok(())
        });
    }
}
