//! Platform handle capabilities.
//!
//! The resolver never talks to the OS directly. Everything it needs from
//! the platform goes through [`HandlePlatform`], which has one
//! implementation per handle model:
//!
//! - [`PosixPlatform`]: descriptors are inherited across `exec` unless
//!   `FD_CLOEXEC` is set on them.
//! - [`WindowsPlatform`]: handles are inherited only when
//!   `HANDLE_FLAG_INHERIT` is set on them.
//!
//! [`NativePlatform`] names the implementation for the build target.

use std::io;
use std::path::Path;

use spawnio_common::{StdioError, StdioResult, Stream};

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub(crate) use unix::close_in_child;
#[cfg(unix)]
pub use unix::PosixPlatform;
#[cfg(windows)]
pub use windows::WindowsPlatform;

#[cfg(unix)]
pub use std::os::fd::{
    AsFd as AsHandle, BorrowedFd as BorrowedHandle, OwnedFd as OwnedHandle, RawFd as RawHandle,
};
#[cfg(windows)]
pub use std::os::windows::io::{AsHandle, BorrowedHandle, OwnedHandle, RawHandle};

/// Platform implementation for the build target.
#[cfg(unix)]
pub type NativePlatform = PosixPlatform;

/// Platform implementation for the build target.
#[cfg(windows)]
pub type NativePlatform = WindowsPlatform;

/// OS operations needed to prepare standard stream handles.
///
/// Every handle returned by these methods is owned by the caller and is
/// created non-inheritable; the resolver flips inheritability explicitly
/// with [`HandlePlatform::set_inheritable`]. Fresh handles must always be
/// allocated by the OS in one call, never by probing for free slots.
pub trait HandlePlatform {
    /// Short platform name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Whether standard descriptors pass to children without any flag.
    ///
    /// Informational only. Preparation runs regardless of this value.
    fn inherits_by_default(&self) -> bool;

    /// Duplicate the current process's handle for `stream`.
    ///
    /// Returns `Ok(None)` when the process has no handle for that stream.
    fn duplicate_std(&self, stream: Stream) -> io::Result<Option<OwnedHandle>>;

    /// Duplicate `handle` into a fresh, non-inheritable handle.
    fn duplicate(&self, handle: BorrowedHandle<'_>) -> io::Result<OwnedHandle>;

    /// Create an anonymous pipe, returning `(read, write)`.
    fn anonymous_pipe(&self) -> io::Result<(OwnedHandle, OwnedHandle)>;

    /// Open the null device for reading and writing.
    fn open_null(&self, path: &Path) -> io::Result<OwnedHandle>;

    /// Set or clear the inheritability of `handle`.
    fn set_inheritable(&self, handle: BorrowedHandle<'_>, inheritable: bool) -> io::Result<()>;

    /// Query the inheritability of `handle`.
    fn is_inheritable(&self, handle: BorrowedHandle<'_>) -> io::Result<bool>;
}

impl<P: HandlePlatform + ?Sized> HandlePlatform for &P {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn inherits_by_default(&self) -> bool {
        (**self).inherits_by_default()
    }

    fn duplicate_std(&self, stream: Stream) -> io::Result<Option<OwnedHandle>> {
        (**self).duplicate_std(stream)
    }

    fn duplicate(&self, handle: BorrowedHandle<'_>) -> io::Result<OwnedHandle> {
        (**self).duplicate(handle)
    }

    fn anonymous_pipe(&self) -> io::Result<(OwnedHandle, OwnedHandle)> {
        (**self).anonymous_pipe()
    }

    fn open_null(&self, path: &Path) -> io::Result<OwnedHandle> {
        (**self).open_null(path)
    }

    fn set_inheritable(&self, handle: BorrowedHandle<'_>, inheritable: bool) -> io::Result<()> {
        (**self).set_inheritable(handle, inheritable)
    }

    fn is_inheritable(&self, handle: BorrowedHandle<'_>) -> io::Result<bool> {
        (**self).is_inheritable(handle)
    }
}

/// Borrow an owned handle.
#[must_use]
pub fn borrow(handle: &OwnedHandle) -> BorrowedHandle<'_> {
    #[cfg(unix)]
    {
        handle.as_fd()
    }
    #[cfg(windows)]
    {
        handle.as_handle()
    }
}

/// Raw value of a borrowed handle.
#[must_use]
pub fn raw(handle: BorrowedHandle<'_>) -> RawHandle {
    #[cfg(unix)]
    {
        std::os::fd::AsRawFd::as_raw_fd(&handle)
    }
    #[cfg(windows)]
    {
        std::os::windows::io::AsRawHandle::as_raw_handle(&handle)
    }
}

/// Numeric form of a raw handle, for logs and reports.
#[must_use]
pub fn raw_value(handle: RawHandle) -> i64 {
    #[cfg(unix)]
    {
        i64::from(handle)
    }
    #[cfg(windows)]
    {
        handle as isize as i64
    }
}

/// Borrow a handle of the current process by its numeric value.
///
/// # Safety
///
/// `value` must name a handle that stays open for as long as the returned
/// borrow is used.
#[allow(unsafe_code)]
pub unsafe fn borrow_raw(value: i64) -> StdioResult<BorrowedHandle<'static>> {
    let invalid = || StdioError::InvalidStreamArg {
        value: value.to_string(),
    };

    #[cfg(unix)]
    {
        let fd = RawHandle::try_from(value).map_err(|_| invalid())?;
        if fd < 0 {
            return Err(invalid());
        }
        // SAFETY: the caller guarantees the descriptor is open.
        Ok(unsafe { BorrowedHandle::borrow_raw(fd) })
    }

    #[cfg(windows)]
    {
        let value = isize::try_from(value).map_err(|_| invalid())?;
        if value == 0 {
            return Err(invalid());
        }
        // SAFETY: the caller guarantees the handle is open.
        Ok(unsafe { BorrowedHandle::borrow_raw(value as RawHandle) })
    }
}
