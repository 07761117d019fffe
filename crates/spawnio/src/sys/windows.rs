//! Windows handle handling.
#![allow(unsafe_code)]

use std::io;
use std::os::windows::io::{AsRawHandle, BorrowedHandle, FromRawHandle, OwnedHandle, RawHandle};
use std::path::Path;
use std::ptr;

use windows_sys::Win32::Foundation::{
    DUPLICATE_SAME_ACCESS, DuplicateHandle, FALSE, GetHandleInformation, HANDLE,
    HANDLE_FLAG_INHERIT, INVALID_HANDLE_VALUE, SetHandleInformation,
};
use windows_sys::Win32::System::Console::{
    GetStdHandle, STD_ERROR_HANDLE, STD_INPUT_HANDLE, STD_OUTPUT_HANDLE,
};
use windows_sys::Win32::System::Pipes::CreatePipe;
use windows_sys::Win32::System::Threading::GetCurrentProcess;

use spawnio_common::Stream;

use super::HandlePlatform;

/// Handle model: inheritance is controlled by `HANDLE_FLAG_INHERIT`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsPlatform;

impl WindowsPlatform {
    /// Create the Windows platform.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn duplicate_raw(source: HANDLE) -> io::Result<OwnedHandle> {
        let mut target: HANDLE = ptr::null_mut();
        // SAFETY: `source` is a live handle of this process and `target`
        // is a valid out-pointer.
        let ok = unsafe {
            DuplicateHandle(
                GetCurrentProcess(),
                source,
                GetCurrentProcess(),
                &mut target,
                0,
                FALSE,
                DUPLICATE_SAME_ACCESS,
            )
        };
        if ok == 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: DuplicateHandle succeeded, so we own `target`.
        Ok(unsafe { OwnedHandle::from_raw_handle(target as RawHandle) })
    }
}

impl HandlePlatform for WindowsPlatform {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn inherits_by_default(&self) -> bool {
        false
    }

    fn duplicate_std(&self, stream: Stream) -> io::Result<Option<OwnedHandle>> {
        let which = match stream {
            Stream::Stdin => STD_INPUT_HANDLE,
            Stream::Stdout => STD_OUTPUT_HANDLE,
            Stream::Stderr => STD_ERROR_HANDLE,
        };

        // SAFETY: GetStdHandle has no preconditions.
        let handle = unsafe { GetStdHandle(which) };
        if handle == INVALID_HANDLE_VALUE {
            return Err(io::Error::last_os_error());
        }
        // The parent itself runs without this stream.
        if handle.is_null() {
            tracing::debug!(%stream, "Parent has no handle for stream");
            return Ok(None);
        }

        Self::duplicate_raw(handle).map(Some)
    }

    fn duplicate(&self, handle: BorrowedHandle<'_>) -> io::Result<OwnedHandle> {
        Self::duplicate_raw(handle.as_raw_handle() as HANDLE)
    }

    fn anonymous_pipe(&self) -> io::Result<(OwnedHandle, OwnedHandle)> {
        let mut read: HANDLE = ptr::null_mut();
        let mut write: HANDLE = ptr::null_mut();
        // SAFETY: out-pointers are valid; null security attributes make
        // both ends non-inheritable.
        let ok = unsafe { CreatePipe(&mut read, &mut write, ptr::null(), 0) };
        if ok == 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: CreatePipe succeeded, so we own both ends.
        unsafe {
            Ok((
                OwnedHandle::from_raw_handle(read as RawHandle),
                OwnedHandle::from_raw_handle(write as RawHandle),
            ))
        }
    }

    fn open_null(&self, path: &Path) -> io::Result<OwnedHandle> {
        // std opens files without inheritance.
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)?;
        Ok(OwnedHandle::from(file))
    }

    fn set_inheritable(&self, handle: BorrowedHandle<'_>, inheritable: bool) -> io::Result<()> {
        let flags = if inheritable { HANDLE_FLAG_INHERIT } else { 0 };
        // SAFETY: `handle` is borrowed, so it is open for this call.
        let ok = unsafe {
            SetHandleInformation(handle.as_raw_handle() as HANDLE, HANDLE_FLAG_INHERIT, flags)
        };
        if ok == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn is_inheritable(&self, handle: BorrowedHandle<'_>) -> io::Result<bool> {
        let mut flags = 0u32;
        // SAFETY: `handle` is borrowed, so it is open for this call.
        let ok = unsafe { GetHandleInformation(handle.as_raw_handle() as HANDLE, &mut flags) };
        if ok == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(flags & HANDLE_FLAG_INHERIT != 0)
    }
}
