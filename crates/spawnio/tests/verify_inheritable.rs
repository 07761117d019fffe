//! A platform that silently ignores the inheritance flag is caught.
//!
//! Kept to a single test so no other thread reuses descriptor numbers
//! while closed descriptors are being probed.
#![cfg(unix)]

use std::cell::{Cell, RefCell};
use std::io;
use std::os::fd::{AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::path::Path;

use rustix::io::Errno;
use spawnio::config::ResolverConfig;
use spawnio::resolve::{StdioResolver, StreamSpec};
use spawnio::sys::{HandlePlatform, PosixPlatform};
use spawnio_common::{StdioError, Stream};

/// Posix platform that honours only the first `honoured` requests to make
/// a handle inheritable and quietly drops the rest.
struct IgnoresInherit {
    inner: PosixPlatform,
    honoured: Cell<usize>,
    opened: RefCell<Vec<RawFd>>,
}

impl IgnoresInherit {
    fn new(honoured: usize) -> Self {
        Self {
            inner: PosixPlatform::new(),
            honoured: Cell::new(honoured),
            opened: RefCell::default(),
        }
    }

    fn record(&self, fd: &OwnedFd) {
        self.opened.borrow_mut().push(fd.as_raw_fd());
    }
}

impl HandlePlatform for IgnoresInherit {
    fn name(&self) -> &'static str {
        "ignores-inherit"
    }

    fn inherits_by_default(&self) -> bool {
        self.inner.inherits_by_default()
    }

    fn duplicate_std(&self, stream: Stream) -> io::Result<Option<OwnedFd>> {
        let fd = self.inner.duplicate_std(stream)?;
        if let Some(fd) = &fd {
            self.record(fd);
        }
        Ok(fd)
    }

    fn duplicate(&self, handle: BorrowedFd<'_>) -> io::Result<OwnedFd> {
        let fd = self.inner.duplicate(handle)?;
        self.record(&fd);
        Ok(fd)
    }

    fn anonymous_pipe(&self) -> io::Result<(OwnedFd, OwnedFd)> {
        let (read, write) = self.inner.anonymous_pipe()?;
        self.record(&read);
        self.record(&write);
        Ok((read, write))
    }

    fn open_null(&self, path: &Path) -> io::Result<OwnedFd> {
        let fd = self.inner.open_null(path)?;
        self.record(&fd);
        Ok(fd)
    }

    fn set_inheritable(&self, handle: BorrowedFd<'_>, inheritable: bool) -> io::Result<()> {
        if inheritable {
            let left = self.honoured.get();
            if left == 0 {
                return Ok(());
            }
            self.honoured.set(left - 1);
        }
        self.inner.set_inheritable(handle, inheritable)
    }

    fn is_inheritable(&self, handle: BorrowedFd<'_>) -> io::Result<bool> {
        self.inner.is_inheritable(handle)
    }
}

#[allow(unsafe_code)]
fn is_closed(fd: RawFd) -> bool {
    // SAFETY: only probes the descriptor table; a closed number yields EBADF.
    let fd = unsafe { BorrowedFd::borrow_raw(fd) };
    rustix::io::fcntl_getfd(fd) == Err(Errno::BADF)
}

#[test]
fn ignored_inherit_flag_fails_resolution() {
    // Stdin's null handle is prepared properly, stdout's pipe end is not.
    let platform = IgnoresInherit::new(1);
    let resolver = StdioResolver::with_platform(&platform);

    let err = resolver
        .resolve(StreamSpec::Null, StreamSpec::Pipe, StreamSpec::Null)
        .unwrap_err();
    assert!(
        matches!(
            err,
            StdioError::InheritanceNotApplied {
                stream: Stream::Stdout
            }
        ),
        "unexpected error: {err}"
    );

    let opened = platform.opened.take();
    assert_eq!(opened.len(), 3, "stderr must not be attempted");
    for fd in opened {
        assert!(is_closed(fd), "handle {fd} leaked");
    }

    // Without verification the same platform resolves, and the unprepared
    // handles are passed through as they are.
    let platform = IgnoresInherit::new(0);
    let resolver = StdioResolver::with_platform(&platform)
        .with_config(ResolverConfig::default().with_verify_inheritable(false));

    let resolved = resolver
        .resolve(StreamSpec::Null, StreamSpec::Pipe, StreamSpec::Null)
        .unwrap();
    assert_eq!(resolved.to_close().len(), 3);
    for stream in Stream::ALL {
        let handle = resolved.child_handle(stream).unwrap();
        assert!(!platform.is_inheritable(handle).unwrap());
    }
    resolved.release();
}
