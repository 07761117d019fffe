//! # spawnio
//!
//! Prepares the standard stream handles of a child process just before it
//! is created.
//!
//! For each of stdin, stdout and stderr the caller asks for one of
//! [`StreamSpec::Inherit`], [`StreamSpec::Pipe`], [`StreamSpec::Null`] or
//! [`StreamSpec::UseHandle`]. The resolver produces a handle for every
//! child slot, explicitly marked inheritable, plus the set of handles the
//! parent must close once the child exists.
//!
//! ## Usage
//!
//! ```no_run
//! use spawnio::resolve::{StdioResolver, StreamSpec};
//! use spawnio_common::Stream;
//!
//! # fn example() -> spawnio_common::StdioResult<()> {
//! let resolver = StdioResolver::new();
//! let resolved = resolver.resolve(StreamSpec::Inherit, StreamSpec::Pipe, StreamSpec::Null)?;
//!
//! let mut cmd = std::process::Command::new("ls");
//! cmd.stdout(resolved.command_stdio(Stream::Stdout)?);
//! let child = cmd.spawn();
//! drop(cmd);
//!
//! // Always release, whether or not the spawn worked.
//! let mut pipes = resolved.release();
//! let output = pipes.take_file(Stream::Stdout);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod forward;
pub mod resolve;
pub mod sys;

pub use config::ResolverConfig;
pub use resolve::{ResolvedStdio, ResolvedStream, StdioResolver, StreamSpec, resolve};
pub use sys::{HandlePlatform, NativePlatform};
