//! CLI command definitions and handlers.

use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Result, WrapErr, eyre};

use spawnio_common::{StdioResult, Stream, StreamArg};

use crate::config::ResolverConfig;
use crate::forward::StreamForwarder;
use crate::resolve::{StdioResolver, StreamSpec};
use crate::sys;

/// spawnio - prepare standard stream handles for child processes
#[derive(Parser)]
#[command(name = "spawnio")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Null device used for `null` streams
    #[arg(long, global = true, env = "SPAWNIO_NULL_DEVICE")]
    pub null_device: Option<PathBuf>,

    /// Skip re-checking inheritability after preparation
    #[arg(long, global = true)]
    pub no_verify: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Per-stream requests shared by all commands.
#[derive(Args, Debug, Clone, Copy)]
pub struct StreamArgs {
    /// Child stdin: inherit, pipe, null or fd:<n>
    #[arg(long, default_value = "inherit")]
    pub stdin: StreamArg,

    /// Child stdout: inherit, pipe, null or fd:<n>
    #[arg(long, default_value = "inherit")]
    pub stdout: StreamArg,

    /// Child stderr: inherit, pipe, null or fd:<n>
    #[arg(long, default_value = "inherit")]
    pub stderr: StreamArg,
}

/// Report output format.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned text table.
    Text,
    /// JSON document.
    Json,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the requested streams and print the prepared handles
    Resolve {
        /// Stream requests.
        #[command(flatten)]
        streams: StreamArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Resolve the requested streams and run a command with them
    Run {
        /// Stream requests.
        #[command(flatten)]
        streams: StreamArgs,

        /// Command and arguments
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },
}

impl Cli {
    /// Resolver configuration from global flags.
    #[must_use]
    pub fn resolver_config(&self) -> ResolverConfig {
        let config = ResolverConfig::default().with_verify_inheritable(!self.no_verify);
        match &self.null_device {
            Some(path) => config.with_null_device(path),
            None => config,
        }
    }

    /// Execute the CLI command, returning the process exit code.
    pub fn execute(self) -> Result<i32> {
        let resolver = StdioResolver::new().with_config(self.resolver_config());

        match self.command {
            Commands::Resolve { streams, format } => {
                let [stdin, stdout, stderr] = stream_specs(&streams)?;
                let resolved = resolver
                    .resolve(stdin, stdout, stderr)
                    .wrap_err("Failed to resolve child stdio")?;

                let report = resolver.report(&resolved)?;
                resolved.release();

                let mut out = std::io::stdout().lock();
                match format {
                    OutputFormat::Text => writeln!(out, "{report}")?,
                    OutputFormat::Json => {
                        serde_json::to_writer_pretty(&mut out, &report)?;
                        writeln!(out)?;
                    }
                }
                Ok(0)
            }

            Commands::Run { streams, command } => run(&resolver, &streams, &command),
        }
    }
}

fn stream_specs(streams: &StreamArgs) -> StdioResult<[StreamSpec<'static>; 3]> {
    Ok([
        stream_spec(streams.stdin)?,
        stream_spec(streams.stdout)?,
        stream_spec(streams.stderr)?,
    ])
}

#[allow(unsafe_code)]
fn stream_spec(arg: StreamArg) -> StdioResult<StreamSpec<'static>> {
    Ok(match arg {
        StreamArg::Inherit => StreamSpec::Inherit,
        StreamArg::Pipe => StreamSpec::Pipe,
        StreamArg::Null => StreamSpec::Null,
        // SAFETY: the user names a handle this process was started with;
        // nothing here closes it. A stale value is rejected by the OS when
        // the resolver duplicates it.
        StreamArg::Raw(value) => StreamSpec::UseHandle(unsafe { sys::borrow_raw(value)? }),
    })
}

fn run(resolver: &StdioResolver, streams: &StreamArgs, command: &[String]) -> Result<i32> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| eyre!("No command specified"))?;

    let [stdin, stdout, stderr] = stream_specs(streams)?;
    let resolved = resolver
        .resolve(stdin, stdout, stderr)
        .wrap_err("Failed to resolve child stdio")?;

    let mut cmd = Command::new(program);
    cmd.args(args);
    resolved.configure_command(&mut cmd)?;

    let spawned = cmd.spawn();
    // Drop cmd too: it holds its own copies of the child ends.
    drop(cmd);
    let mut pipes = resolved.release();
    let mut child = spawned.wrap_err_with(|| format!("Failed to spawn {program}"))?;
    tracing::debug!(pid = child.id(), command = ?command, "Child spawned");

    let forwarder = StreamForwarder::new();
    let mut relays = Vec::new();

    if let Some(writer) = pipes.take_file(Stream::Stdin) {
        // Not joined: reading our stdin may block past the child's exit.
        forwarder.spawn("stdin", std::io::stdin(), writer)?;
    }
    if let Some(reader) = pipes.take_file(Stream::Stdout) {
        relays.push(forwarder.spawn("stdout", reader, std::io::stdout())?);
    }
    if let Some(reader) = pipes.take_file(Stream::Stderr) {
        relays.push(forwarder.spawn("stderr", reader, std::io::stderr())?);
    }

    let status = child.wait().wrap_err("Failed to wait for child")?;
    for relay in relays {
        relay
            .join()
            .map_err(|_| eyre!("Stream relay thread panicked"))?;
    }
    // Output is drained. The stdin relay may still be parked in a read;
    // it exits on its next chunk.
    forwarder.stop();

    let code = status.code().unwrap_or(1);
    tracing::debug!(exit_code = code, "Child exited");
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_resolve_defaults() {
        let cli = Cli::try_parse_from(["spawnio", "resolve"]).unwrap();
        match cli.command {
            Commands::Resolve { streams, format } => {
                assert_eq!(streams.stdin, StreamArg::Inherit);
                assert_eq!(streams.stdout, StreamArg::Inherit);
                assert_eq!(streams.stderr, StreamArg::Inherit);
                assert_eq!(format, OutputFormat::Text);
            }
            Commands::Run { .. } => panic!("expected resolve"),
        }
    }

    #[test]
    fn parse_run_with_streams() {
        let cli = Cli::try_parse_from([
            "spawnio", "run", "--stdout", "pipe", "--stderr", "null", "--", "echo", "hi",
        ])
        .unwrap();
        match cli.command {
            Commands::Run { streams, command } => {
                assert_eq!(streams.stdout, StreamArg::Pipe);
                assert_eq!(streams.stderr, StreamArg::Null);
                assert_eq!(command, vec!["echo".to_string(), "hi".to_string()]);
            }
            Commands::Resolve { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn rejects_bad_stream() {
        assert!(Cli::try_parse_from(["spawnio", "resolve", "--stdin", "tty"]).is_err());
    }

    #[test]
    fn config_from_flags() {
        let cli = Cli::try_parse_from([
            "spawnio",
            "--null-device",
            "/tmp/null",
            "--no-verify",
            "resolve",
        ])
        .unwrap();
        let config = cli.resolver_config();
        assert_eq!(config.null_device, PathBuf::from("/tmp/null"));
        assert!(!config.verify_inheritable);
    }
}
