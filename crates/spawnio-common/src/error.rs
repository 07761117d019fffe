//! Common error types for spawnio.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::stream::Stream;

/// Result type alias using [`StdioError`].
pub type StdioResult<T> = Result<T, StdioError>;

/// Errors raised while preparing standard stream handles for a child.
#[derive(Error, Diagnostic, Debug)]
pub enum StdioError {
    /// The OS refused to duplicate a handle.
    #[error("Failed to duplicate {stream} handle: {source}")]
    #[diagnostic(
        code(spawnio::duplication_failed),
        help("The handle table may be exhausted, or the source handle is not accessible")
    )]
    DuplicationFailed {
        /// The stream being resolved.
        stream: Stream,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// An anonymous pipe could not be created or prepared.
    #[error("Failed to create pipe for {stream}: {source}")]
    #[diagnostic(code(spawnio::pipe_creation_failed))]
    PipeCreationFailed {
        /// The stream being resolved.
        stream: Stream,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The null device could not be opened.
    #[error("Null device {} unavailable for {stream}: {source}", .path.display())]
    #[diagnostic(
        code(spawnio::null_device_unavailable),
        help("Set SPAWNIO_NULL_DEVICE to override the null device path")
    )]
    NullDeviceUnavailable {
        /// The stream being resolved.
        stream: Stream,
        /// The path that failed to open.
        path: PathBuf,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// A handle prepared for the child was still not inheritable.
    #[error("Handle for {stream} is not inheritable after preparation")]
    #[diagnostic(
        code(spawnio::inheritance_not_applied),
        help("This is a bug in the platform layer, please report it")
    )]
    InheritanceNotApplied {
        /// The affected stream.
        stream: Stream,
    },

    /// A textual stream request could not be parsed.
    #[error("Invalid stream argument: {value}")]
    #[diagnostic(
        code(spawnio::invalid_stream_arg),
        help("Use one of 'inherit', 'pipe', 'null', 'fd:<n>' or 'handle:<n>'")
    )]
    InvalidStreamArg {
        /// The rejected value.
        value: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(spawnio::io))]
    Io(#[from] std::io::Error),
}

impl StdioError {
    /// The stream the error relates to, if any.
    #[must_use]
    pub const fn stream(&self) -> Option<Stream> {
        match self {
            Self::DuplicationFailed { stream, .. }
            | Self::PipeCreationFailed { stream, .. }
            | Self::NullDeviceUnavailable { stream, .. }
            | Self::InheritanceNotApplied { stream } => Some(*stream),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StdioError::DuplicationFailed {
            stream: Stream::Stdout,
            source: std::io::Error::new(std::io::ErrorKind::Other, "too many open files"),
        };
        insta::assert_snapshot!(err.to_string(), @"Failed to duplicate stdout handle: too many open files");
    }

    #[test]
    fn null_device_display() {
        let err = StdioError::NullDeviceUnavailable {
            stream: Stream::Stderr,
            path: PathBuf::from("/nonexistent/null"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        insta::assert_snapshot!(err.to_string(), @"Null device /nonexistent/null unavailable for stderr: missing");
    }

    #[test]
    fn error_stream() {
        let err = StdioError::InheritanceNotApplied {
            stream: Stream::Stdin,
        };
        assert_eq!(err.stream(), Some(Stream::Stdin));

        let err = StdioError::InvalidStreamArg {
            value: "bogus".to_string(),
        };
        assert_eq!(err.stream(), None);
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: StdioError = io_err.into();
        assert!(matches!(err, StdioError::Io(_)));
    }
}
