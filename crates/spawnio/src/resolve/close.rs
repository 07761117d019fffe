//! Ownership of handles opened during resolution.

use std::fs::File;
use std::mem;

use spawnio_common::Stream;

use crate::sys::{self, BorrowedHandle, OwnedHandle, RawHandle};

/// Handles opened for a single child that the parent must close once the
/// child has been created.
///
/// Dropping the set closes the handles in reverse order of acquisition.
#[derive(Debug, Default)]
pub struct ToCloseSet {
    handles: Vec<OwnedHandle>,
}

impl ToCloseSet {
    /// Number of handles in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Raw values of the handles, in acquisition order.
    pub fn raw_handles(&self) -> impl Iterator<Item = RawHandle> + '_ {
        self.handles.iter().map(|handle| sys::raw(sys::borrow(handle)))
    }

    /// Borrow the handle with raw value `raw`, if the set owns it.
    #[must_use]
    pub fn get(&self, raw: RawHandle) -> Option<BorrowedHandle<'_>> {
        self.handles
            .iter()
            .map(sys::borrow)
            .find(|handle| sys::raw(*handle) == raw)
    }

    /// Close every handle in the set.
    pub fn release(self) {
        tracing::trace!(count = self.handles.len(), "Releasing child handles");
        drop(self);
    }

    fn push(&mut self, handle: OwnedHandle) {
        self.handles.push(handle);
    }
}

impl Drop for ToCloseSet {
    fn drop(&mut self) {
        while let Some(handle) = self.handles.pop() {
            close(handle);
        }
    }
}

fn close(handle: OwnedHandle) {
    tracing::trace!(
        handle = sys::raw_value(sys::raw(sys::borrow(&handle))),
        "Closing handle"
    );
    drop(handle);
}

/// Pipe endpoints kept by the parent, never inheritable.
///
/// The stdin slot holds the write end; stdout and stderr hold read ends.
#[derive(Debug, Default)]
pub struct ParentPipes {
    slots: [Option<OwnedHandle>; 3],
}

impl ParentPipes {
    /// Borrow the parent endpoint for `stream`.
    #[must_use]
    pub fn get(&self, stream: Stream) -> Option<BorrowedHandle<'_>> {
        self.slots[stream.index()].as_ref().map(sys::borrow)
    }

    /// Take ownership of the parent endpoint for `stream`.
    pub fn take(&mut self, stream: Stream) -> Option<OwnedHandle> {
        self.slots[stream.index()].take()
    }

    /// Take the parent endpoint for `stream` as a [`File`].
    pub fn take_file(&mut self, stream: Stream) -> Option<File> {
        self.take(stream).map(File::from)
    }

    /// Whether no endpoints remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    fn set(&mut self, stream: Stream, handle: OwnedHandle) {
        self.slots[stream.index()] = Some(handle);
    }
}

/// Everything opened so far by one resolution, in acquisition order.
///
/// If resolution fails, dropping this closes the handles newest first.
#[derive(Debug, Default)]
pub(crate) struct Acquisitions {
    entries: Vec<(Owner, OwnedHandle)>,
}

#[derive(Debug, Clone, Copy)]
enum Owner {
    Child,
    Parent(Stream),
}

impl Acquisitions {
    /// Record a handle destined for the child and return its raw value.
    pub(crate) fn child(&mut self, handle: OwnedHandle) -> RawHandle {
        let raw = sys::raw(sys::borrow(&handle));
        self.entries.push((Owner::Child, handle));
        raw
    }

    /// Record a pipe endpoint the parent keeps.
    pub(crate) fn parent(&mut self, stream: Stream, handle: OwnedHandle) {
        self.entries.push((Owner::Parent(stream), handle));
    }

    /// Split into the to-close set and the parent endpoints.
    pub(crate) fn finish(mut self) -> (ToCloseSet, ParentPipes) {
        let mut to_close = ToCloseSet::default();
        let mut parent = ParentPipes::default();

        for (owner, handle) in mem::take(&mut self.entries) {
            match owner {
                Owner::Child => to_close.push(handle),
                Owner::Parent(stream) => parent.set(stream, handle),
            }
        }

        (to_close, parent)
    }
}

impl Drop for Acquisitions {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            tracing::debug!(
                count = self.entries.len(),
                "Resolution abandoned, closing acquired handles"
            );
        }
        while let Some((_, handle)) = self.entries.pop() {
            close(handle);
        }
    }
}
