//! Resolver configuration.

use std::path::PathBuf;

use spawnio_common::NULL_DEVICE;

/// Resolver configuration options.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Device opened for `Null` streams.
    pub null_device: PathBuf,
    /// Re-query every child handle after preparation and fail if the
    /// platform did not apply the inheritance flag.
    pub verify_inheritable: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            null_device: NULL_DEVICE.clone(),
            verify_inheritable: true,
        }
    }
}

impl ResolverConfig {
    /// Set the null device path.
    #[must_use]
    pub fn with_null_device(mut self, path: impl Into<PathBuf>) -> Self {
        self.null_device = path.into();
        self
    }

    /// Enable or disable post-preparation verification.
    #[must_use]
    pub const fn with_verify_inheritable(mut self, verify: bool) -> Self {
        self.verify_inheritable = verify;
        self
    }
}
