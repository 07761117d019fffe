//! Human and machine readable summaries of a resolution.

use std::fmt;

use serde::Serialize;

use spawnio_common::{StdioError, StdioResult, Stream, StreamArg};

use crate::sys::{self, HandlePlatform};

use super::ResolvedStdio;

/// Summary of a resolved set of child handles.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionReport {
    /// Platform that prepared the handles.
    pub platform: String,
    /// Whether the platform passes descriptors to children without a flag.
    pub inherits_by_default: bool,
    /// One entry per stream, stdin first.
    pub streams: Vec<StreamReport>,
    /// Number of handles the parent closes after spawning.
    pub to_close: usize,
}

/// Summary of one stream.
#[derive(Debug, Clone, Serialize)]
pub struct StreamReport {
    /// The stream.
    pub stream: Stream,
    /// What was asked for.
    pub requested: StreamArg,
    /// Handle value passed to the child.
    pub handle: Option<i64>,
    /// Whether the child handle is currently inheritable.
    pub inheritable: Option<bool>,
    /// Whether the parent closes the child handle after spawning.
    pub close_after_spawn: bool,
    /// Parent-side pipe endpoint, for `pipe` requests.
    pub parent_handle: Option<i64>,
}

impl ResolutionReport {
    pub(crate) fn collect<P: HandlePlatform + ?Sized>(
        platform: &P,
        resolved: &ResolvedStdio,
    ) -> StdioResult<Self> {
        let mut streams = Vec::with_capacity(Stream::ALL.len());

        for stream in Stream::ALL {
            let entry = resolved.stream(stream);
            let inheritable = match resolved.child_handle(stream) {
                Some(handle) => Some(platform.is_inheritable(handle).map_err(StdioError::Io)?),
                None => None,
            };

            streams.push(StreamReport {
                stream,
                requested: entry.requested(),
                handle: entry.handle().map(sys::raw_value),
                inheritable,
                close_after_spawn: entry.close_after_spawn(),
                parent_handle: resolved
                    .parent_pipes()
                    .get(stream)
                    .map(|handle| sys::raw_value(sys::raw(handle))),
            });
        }

        Ok(Self {
            platform: platform.name().to_string(),
            inherits_by_default: platform.inherits_by_default(),
            streams,
            to_close: resolved.to_close().len(),
        })
    }
}

impl fmt::Display for ResolutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "platform: {} (inherits by default: {})",
            self.platform, self.inherits_by_default
        )?;
        writeln!(
            f,
            "{:<8} {:<12} {:<8} {:<12} {:<8} {}",
            "STREAM", "REQUESTED", "HANDLE", "INHERITABLE", "CLOSE", "PARENT"
        )?;

        let show = |value: Option<i64>| value.map_or_else(|| "-".to_string(), |v| v.to_string());
        for entry in &self.streams {
            let inheritable = match entry.inheritable {
                Some(true) => "yes",
                Some(false) => "no",
                None => "-",
            };
            writeln!(
                f,
                "{:<8} {:<12} {:<8} {:<12} {:<8} {}",
                entry.stream.as_str(),
                entry.requested.to_string(),
                show(entry.handle),
                inheritable,
                if entry.close_after_spawn { "yes" } else { "no" },
                show(entry.parent_handle),
            )?;
        }

        write!(f, "handles to close after spawn: {}", self.to_close)
    }
}
