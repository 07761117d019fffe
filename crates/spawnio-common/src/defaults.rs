//! Platform defaults for spawnio.

use std::path::PathBuf;

use once_cell::sync::Lazy;

/// Platform null device path.
#[cfg(windows)]
pub const PLATFORM_NULL_DEVICE: &str = "NUL";

/// Platform null device path.
#[cfg(not(windows))]
pub const PLATFORM_NULL_DEVICE: &str = "/dev/null";

/// Null device used for `Null` streams (overridable with `SPAWNIO_NULL_DEVICE`).
pub static NULL_DEVICE: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var_os("SPAWNIO_NULL_DEVICE")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(PLATFORM_NULL_DEVICE))
});
