//! Standard stream handle resolution.
//!
//! Turns a redirection request for each of stdin, stdout and stderr into
//! the concrete handles a child process should receive. Every handle placed
//! in a child slot is explicitly made inheritable, and each stream is
//! prepared from its own request alone: asking for `Inherit` on all three
//! streams does the same per-stream duplication work as asking for it on
//! one.
//!
//! ```no_run
//! use spawnio::resolve::{StdioResolver, StreamSpec};
//!
//! # fn example() -> spawnio_common::StdioResult<()> {
//! let resolver = StdioResolver::new();
//! let resolved = resolver.resolve(StreamSpec::Null, StreamSpec::Pipe, StreamSpec::Inherit)?;
//!
//! let handles = resolved.child_handles();
//! // ... hand `handles` to process creation ...
//!
//! let mut pipes = resolved.release();
//! let stdout = pipes.take_file(spawnio_common::Stream::Stdout);
//! # Ok(())
//! # }
//! ```

mod close;
mod report;

use std::io;
use std::process::{Command, Stdio};

use spawnio_common::{StdioError, StdioResult, Stream, StreamArg};

use crate::config::ResolverConfig;
use crate::sys::{self, BorrowedHandle, HandlePlatform, NativePlatform, OwnedHandle, RawHandle};

pub use close::{ParentPipes, ToCloseSet};
pub use report::{ResolutionReport, StreamReport};

use close::Acquisitions;

/// What the child should receive for one standard stream.
#[derive(Debug, Clone, Copy, Default)]
pub enum StreamSpec<'a> {
    /// A duplicate of the parent's current handle for the stream.
    #[default]
    Inherit,
    /// One end of a new anonymous pipe; the parent keeps the other.
    Pipe,
    /// The null device.
    Null,
    /// A duplicate of a caller-supplied handle. The original is untouched.
    UseHandle(BorrowedHandle<'a>),
}

impl StreamSpec<'_> {
    /// Textual form of the request.
    #[must_use]
    pub fn to_arg(&self) -> StreamArg {
        match self {
            Self::Inherit => StreamArg::Inherit,
            Self::Pipe => StreamArg::Pipe,
            Self::Null => StreamArg::Null,
            Self::UseHandle(handle) => StreamArg::Raw(sys::raw_value(sys::raw(*handle))),
        }
    }
}

/// The handle prepared for one stream of the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedStream {
    stream: Stream,
    requested: StreamArg,
    handle: Option<RawHandle>,
}

impl ResolvedStream {
    /// The stream this handle is for.
    #[must_use]
    pub const fn stream(&self) -> Stream {
        self.stream
    }

    /// The request that produced this handle.
    #[must_use]
    pub const fn requested(&self) -> StreamArg {
        self.requested
    }

    /// Handle to pass to the child, or `None` if the child gets none.
    #[must_use]
    pub const fn handle(&self) -> Option<RawHandle> {
        self.handle
    }

    /// Whether the parent must close the handle after spawning.
    ///
    /// Every handle the resolver hands out was opened for this child alone.
    #[must_use]
    pub const fn close_after_spawn(&self) -> bool {
        self.handle.is_some()
    }
}

/// Prepared handles for all three streams of one child.
#[derive(Debug)]
pub struct ResolvedStdio {
    streams: [ResolvedStream; 3],
    to_close: ToCloseSet,
    parent: ParentPipes,
}

impl ResolvedStdio {
    /// Resolved stdin.
    #[must_use]
    pub const fn stdin(&self) -> &ResolvedStream {
        &self.streams[0]
    }

    /// Resolved stdout.
    #[must_use]
    pub const fn stdout(&self) -> &ResolvedStream {
        &self.streams[1]
    }

    /// Resolved stderr.
    #[must_use]
    pub const fn stderr(&self) -> &ResolvedStream {
        &self.streams[2]
    }

    /// Resolved handle for `stream`.
    #[must_use]
    pub const fn stream(&self, stream: Stream) -> &ResolvedStream {
        &self.streams[stream.index()]
    }

    /// Child handles in stdin, stdout, stderr order.
    #[must_use]
    pub fn child_handles(&self) -> [Option<RawHandle>; 3] {
        self.streams.map(|resolved| resolved.handle)
    }

    /// Handles the parent closes after spawning.
    #[must_use]
    pub const fn to_close(&self) -> &ToCloseSet {
        &self.to_close
    }

    /// Parent-side pipe endpoints.
    #[must_use]
    pub const fn parent_pipes(&self) -> &ParentPipes {
        &self.parent
    }

    /// Mutable access to the parent-side pipe endpoints.
    pub fn parent_pipes_mut(&mut self) -> &mut ParentPipes {
        &mut self.parent
    }

    /// Borrow the child handle for `stream`.
    #[must_use]
    pub fn child_handle(&self, stream: Stream) -> Option<BorrowedHandle<'_>> {
        self.stream(stream)
            .handle
            .and_then(|raw| self.to_close.get(raw))
    }

    /// Build a [`Stdio`] for `std::process::Command`.
    ///
    /// `Command` takes ownership of what it is given, so this hands it a
    /// separate duplicate; closing the resolver's own handles with
    /// [`ResolvedStdio::release`] after spawning is still required.
    pub fn command_stdio(&self, stream: Stream) -> StdioResult<Stdio> {
        let Some(handle) = self.child_handle(stream) else {
            return Ok(Stdio::inherit());
        };

        let owned = handle
            .try_clone_to_owned()
            .map_err(|source| StdioError::DuplicationFailed { stream, source })?;
        Ok(Stdio::from(owned))
    }

    /// Point the stdio of `cmd` at the prepared handles.
    ///
    /// Each stream gets its own copy from [`ResolvedStdio::command_stdio`].
    /// On Unix the resolver's handles are also closed in the child right
    /// before `exec`, so they reach it only as its descriptors 0-2.
    pub fn configure_command(&self, cmd: &mut Command) -> StdioResult<()> {
        cmd.stdin(self.command_stdio(Stream::Stdin)?)
            .stdout(self.command_stdio(Stream::Stdout)?)
            .stderr(self.command_stdio(Stream::Stderr)?);

        #[cfg(unix)]
        sys::close_in_child(cmd, self.to_close.raw_handles().collect());

        Ok(())
    }

    /// Close the to-close set and hand back the parent pipe endpoints.
    ///
    /// Call this as soon as process creation returns, whether or not it
    /// succeeded. A child-side pipe end left open in the parent keeps the
    /// pipe from ever reporting end-of-stream.
    pub fn release(self) -> ParentPipes {
        let Self {
            to_close, parent, ..
        } = self;
        to_close.release();
        parent
    }
}

/// Resolves stream requests against a [`HandlePlatform`].
#[derive(Debug, Clone, Default)]
pub struct StdioResolver<P = NativePlatform> {
    platform: P,
    config: ResolverConfig,
}

impl StdioResolver<NativePlatform> {
    /// Create a resolver for the native platform with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_platform(NativePlatform::default())
    }
}

impl<P: HandlePlatform> StdioResolver<P> {
    /// Create a resolver over `platform` with default settings.
    #[must_use]
    pub fn with_platform(platform: P) -> Self {
        Self {
            platform,
            config: ResolverConfig::default(),
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// The platform in use.
    pub const fn platform(&self) -> &P {
        &self.platform
    }

    /// The configuration in use.
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve all three streams for one child.
    ///
    /// On failure every handle opened by this call is closed, newest
    /// first, before the error is returned.
    pub fn resolve(
        &self,
        stdin: StreamSpec<'_>,
        stdout: StreamSpec<'_>,
        stderr: StreamSpec<'_>,
    ) -> StdioResult<ResolvedStdio> {
        resolve_with(&self.platform, &self.config, [stdin, stdout, stderr])
    }

    /// Summarize a resolution, querying current inheritability.
    pub fn report(&self, resolved: &ResolvedStdio) -> StdioResult<ResolutionReport> {
        ResolutionReport::collect(&self.platform, resolved)
    }
}

/// Resolve all three streams against `platform` with default settings.
pub fn resolve<P: HandlePlatform + ?Sized>(
    stdin: StreamSpec<'_>,
    stdout: StreamSpec<'_>,
    stderr: StreamSpec<'_>,
    platform: &P,
) -> StdioResult<ResolvedStdio> {
    resolve_with(platform, &ResolverConfig::default(), [stdin, stdout, stderr])
}

fn resolve_with<P: HandlePlatform + ?Sized>(
    platform: &P,
    config: &ResolverConfig,
    specs: [StreamSpec<'_>; 3],
) -> StdioResult<ResolvedStdio> {
    let mut acquired = Acquisitions::default();
    let mut streams = Vec::with_capacity(3);

    for (stream, spec) in Stream::ALL.into_iter().zip(specs) {
        streams.push(resolve_stream(platform, config, stream, spec, &mut acquired)?);
    }

    let (to_close, parent) = acquired.finish();
    let streams: [ResolvedStream; 3] = [streams[0], streams[1], streams[2]];

    tracing::debug!(
        platform = platform.name(),
        to_close = to_close.len(),
        "Resolved child stdio"
    );

    Ok(ResolvedStdio {
        streams,
        to_close,
        parent,
    })
}

/// Prepare one stream. Depends on nothing but this stream's request.
fn resolve_stream<P: HandlePlatform + ?Sized>(
    platform: &P,
    config: &ResolverConfig,
    stream: Stream,
    spec: StreamSpec<'_>,
    acquired: &mut Acquisitions,
) -> StdioResult<ResolvedStream> {
    let requested = spec.to_arg();
    let resolved = |handle| ResolvedStream {
        stream,
        requested,
        handle,
    };

    let child = match spec {
        StreamSpec::Null => {
            let null_err = |source| StdioError::NullDeviceUnavailable {
                stream,
                path: config.null_device.clone(),
                source,
            };
            let handle = platform.open_null(&config.null_device).map_err(null_err)?;
            make_inheritable(platform, config, stream, &handle, null_err)?;
            handle
        }

        StreamSpec::Pipe => {
            let pipe_err = |source| StdioError::PipeCreationFailed { stream, source };
            let (read, write) = platform.anonymous_pipe().map_err(pipe_err)?;
            let (child, parent) = if stream.is_input() {
                (read, write)
            } else {
                (write, read)
            };

            platform
                .set_inheritable(sys::borrow(&parent), false)
                .map_err(pipe_err)?;
            make_inheritable(platform, config, stream, &child, pipe_err)?;

            tracing::trace!(
                %stream,
                parent = sys::raw_value(sys::raw(sys::borrow(&parent))),
                "Keeping parent pipe end"
            );
            acquired.parent(stream, parent);
            child
        }

        StreamSpec::UseHandle(original) => {
            let dup_err = |source| StdioError::DuplicationFailed { stream, source };
            let handle = platform.duplicate(original).map_err(dup_err)?;
            make_inheritable(platform, config, stream, &handle, dup_err)?;
            handle
        }

        StreamSpec::Inherit => {
            let dup_err = |source| StdioError::DuplicationFailed { stream, source };
            let Some(handle) = platform.duplicate_std(stream).map_err(dup_err)? else {
                return Ok(resolved(None));
            };
            make_inheritable(platform, config, stream, &handle, dup_err)?;
            handle
        }
    };

    let raw = acquired.child(child);
    tracing::debug!(
        %stream,
        requested = %requested,
        handle = sys::raw_value(raw),
        "Prepared child handle"
    );

    Ok(resolved(Some(raw)))
}

fn make_inheritable<P, E>(
    platform: &P,
    config: &ResolverConfig,
    stream: Stream,
    handle: &OwnedHandle,
    map_err: E,
) -> StdioResult<()>
where
    P: HandlePlatform + ?Sized,
    E: Fn(io::Error) -> StdioError,
{
    let handle = sys::borrow(handle);
    platform.set_inheritable(handle, true).map_err(&map_err)?;

    if config.verify_inheritable && !platform.is_inheritable(handle).map_err(&map_err)? {
        return Err(StdioError::InheritanceNotApplied { stream });
    }

    Ok(())
}
