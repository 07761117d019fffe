//! # spawnio-common
//!
//! Shared types for the spawnio stream handle resolver.
//!
//! This crate holds the pieces that carry no OS handles themselves:
//! - The [`Stream`] identifier for stdin, stdout and stderr
//! - The textual [`StreamArg`] request used by configuration and the CLI
//! - Platform defaults such as the null device path
//! - Common error types

#![warn(missing_docs)]

pub mod defaults;
pub mod error;
pub mod stream;

pub use defaults::NULL_DEVICE;
pub use error::{StdioError, StdioResult};
pub use stream::{Stream, StreamArg};
