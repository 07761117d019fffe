//! Byte forwarding between the parent's stdio and retained pipe ends.
//!
//! Used by the `run` command to relay a child's piped streams. Each
//! forwarder copies until end-of-stream, a write failure, or a stop
//! request.

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

const CHUNK_SIZE: usize = 4096;

/// Copies a reader into a writer until told to stop.
#[derive(Debug, Clone, Default)]
pub struct StreamForwarder {
    /// Stop flag.
    stop: Arc<AtomicBool>,
}

impl StreamForwarder {
    /// Create a new forwarder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal stop.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Check if stopped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Copy `reader` into `writer`, returning the number of bytes moved.
    ///
    /// Read errors end the copy with an error; a failed write (the other
    /// side went away) ends it quietly.
    pub fn forward<R: Read, W: Write>(&self, mut reader: R, mut writer: W) -> io::Result<u64> {
        let mut buf = [0u8; CHUNK_SIZE];
        let mut total = 0u64;

        while !self.is_stopped() {
            match reader.read(&mut buf) {
                Ok(0) => break, // EOF
                Ok(n) => {
                    if writer.write_all(&buf[..n]).is_err() {
                        break;
                    }
                    writer.flush().ok();
                    total += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(total)
    }

    /// Run [`StreamForwarder::forward`] on a new thread.
    pub fn spawn<R, W>(&self, name: &str, reader: R, writer: W) -> io::Result<JoinHandle<u64>>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let forwarder = self.clone();
        let label = name.to_string();

        thread::Builder::new()
            .name(format!("spawnio-{name}"))
            .spawn(move || match forwarder.forward(reader, writer) {
                Ok(bytes) => {
                    tracing::trace!(stream = %label, bytes, "Forwarding finished");
                    bytes
                }
                Err(e) => {
                    tracing::debug!(stream = %label, error = %e, "Forwarding stopped");
                    0
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwards_until_eof() {
        let forwarder = StreamForwarder::new();
        let input = vec![7u8; CHUNK_SIZE * 2 + 17];
        let mut output = Vec::new();

        let moved = forwarder.forward(input.as_slice(), &mut output).unwrap();
        assert_eq!(moved, input.len() as u64);
        assert_eq!(output, input);
    }

    #[test]
    fn stopped_forwarder_moves_nothing() {
        let forwarder = StreamForwarder::new();
        assert!(!forwarder.is_stopped());
        forwarder.stop();
        assert!(forwarder.is_stopped());
        assert!(forwarder.clone().is_stopped());

        let mut output = Vec::new();
        let moved = forwarder.forward(&b"ignored"[..], &mut output).unwrap();
        assert_eq!(moved, 0);
        assert!(output.is_empty());
    }

    #[test]
    fn spawned_forwarder_joins() {
        let forwarder = StreamForwarder::new();
        let handle = forwarder
            .spawn("test", io::Cursor::new(b"abc".to_vec()), io::sink())
            .unwrap();
        assert_eq!(handle.join().unwrap(), 3);
    }
}
