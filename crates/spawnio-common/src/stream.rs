//! Standard stream identifiers and textual stream requests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{StdioError, StdioResult};

/// One of the three standard streams of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    /// Standard input.
    Stdin,
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl Stream {
    /// All streams in the order they are handed to process creation.
    pub const ALL: [Self; 3] = [Self::Stdin, Self::Stdout, Self::Stderr];

    /// Conventional descriptor number (0, 1, 2).
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Stdin => 0,
            Self::Stdout => 1,
            Self::Stderr => 2,
        }
    }

    /// Whether the child reads from this stream.
    #[must_use]
    pub const fn is_input(self) -> bool {
        matches!(self, Self::Stdin)
    }

    /// Stream name as used in logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdin => "stdin",
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owned, textual form of a per-stream redirection request.
///
/// Accepted forms are `inherit`, `pipe`, `null`, and `fd:<n>` or
/// `handle:<n>` for an existing handle of the current process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StreamArg {
    /// Child gets a duplicate of the parent's handle.
    #[default]
    Inherit,
    /// Child gets one end of a new anonymous pipe.
    Pipe,
    /// Child gets the null device.
    Null,
    /// Child gets a duplicate of this raw handle value.
    Raw(i64),
}

impl fmt::Display for StreamArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inherit => f.write_str("inherit"),
            Self::Pipe => f.write_str("pipe"),
            Self::Null => f.write_str("null"),
            #[cfg(windows)]
            Self::Raw(value) => write!(f, "handle:{value}"),
            #[cfg(not(windows))]
            Self::Raw(value) => write!(f, "fd:{value}"),
        }
    }
}

impl FromStr for StreamArg {
    type Err = StdioError;

    fn from_str(s: &str) -> StdioResult<Self> {
        let invalid = || StdioError::InvalidStreamArg {
            value: s.to_string(),
        };

        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "inherit" => return Ok(Self::Inherit),
            "pipe" | "piped" => return Ok(Self::Pipe),
            "null" | "devnull" => return Ok(Self::Null),
            _ => {}
        }

        let (prefix, value) = trimmed.split_once(':').ok_or_else(invalid)?;
        if !prefix.eq_ignore_ascii_case("fd") && !prefix.eq_ignore_ascii_case("handle") {
            return Err(invalid());
        }

        let value: i64 = value.parse().map_err(|_| invalid())?;
        if value < 0 {
            return Err(invalid());
        }

        Ok(Self::Raw(value))
    }
}

impl TryFrom<String> for StreamArg {
    type Error = StdioError;

    fn try_from(value: String) -> StdioResult<Self> {
        value.parse()
    }
}

impl From<StreamArg> for String {
    fn from(arg: StreamArg) -> Self {
        arg.to_string()
    }
}
