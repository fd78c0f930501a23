//! # dvdsalvage Platform
//!
//! Platform-specific adapters for the file operations the copier relies on.
//!
//! The copy engine needs three things the standard library does not expose
//! uniformly across operating systems:
//!
//! - a storage identity for a path (device + inode on Unix, volume serial +
//!   file index on Windows), used to detect duplicate files on the disc and to
//!   check that an existing hard link in the destination points where it should;
//! - hard-link creation with errors mapped to something a user can act on;
//! - opening a source file with a hint that it will be read sequentially,
//!   exactly once.
//!
//! Sector alignment helpers live here as well since both the reader and the
//! output side round byte offsets to 2048-byte sectors.

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::fs::File;
use std::path::Path;
use thiserror::Error;

/// Platform-specific errors
#[derive(Error, Debug)]
pub enum PlatformError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Path does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Access denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Hard link could not be created
    #[error("Link failed: {0}")]
    LinkFailed(String),

    /// Operation not supported on this platform
    #[error("Not supported: {0}")]
    NotSupported(String),
}

/// Result type for platform operations
pub type Result<T> = std::result::Result<T, PlatformError>;

/// Identity of the storage object behind a path.
///
/// Two paths with equal identities refer to the same file: either the same
/// directory entry or two hard links to one inode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileIdentity {
    /// Device (Unix) or volume serial number (Windows)
    pub device: u64,

    /// Inode number (Unix) or file index (Windows)
    pub index: u64,
}

/// Platform operations interface
pub trait PlatformOps {
    /// Get the storage identity of an existing path
    fn file_identity(path: &Path) -> Result<FileIdentity>;

    /// Create `link` as a hard link to `original`
    fn hard_link(original: &Path, link: &Path) -> Result<()>;

    /// Open a file read-only, hinting that it will be read front to back once
    fn open_sequential(path: &Path) -> Result<File>;
}

/// Align a value up to the given alignment
#[inline]
pub fn align_up(value: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return value;
    }
    value.div_ceil(alignment) * alignment
}

/// Align a value down to the given alignment
#[inline]
pub fn align_down(value: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return value;
    }
    value - value % alignment
}

/// Check if a value is aligned to the given alignment
#[allow(clippy::manual_is_multiple_of)]
#[inline]
pub fn is_aligned(value: u64, alignment: u64) -> bool {
    if alignment == 0 {
        return true;
    }
    value % alignment == 0
}

fn map_io_error(path: &Path, err: std::io::Error) -> PlatformError {
    match err.kind() {
        std::io::ErrorKind::NotFound => PlatformError::NotFound(path.display().to_string()),
        std::io::ErrorKind::PermissionDenied => {
            PlatformError::PermissionDenied(path.display().to_string())
        }
        _ => PlatformError::Io(err),
    }
}

// Platform-specific implementations
cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod linux;
        pub use linux::LinuxPlatform as Platform;
    } else if #[cfg(target_os = "macos")] {
        mod macos;
        pub use macos::MacOSPlatform as Platform;
    } else if #[cfg(target_os = "windows")] {
        mod windows;
        pub use windows::WindowsPlatform as Platform;
    }
}

cfg_if::cfg_if! {
    if #[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))] {
        /// Get the storage identity of an existing path
        pub fn file_identity(path: &Path) -> Result<FileIdentity> {
            Platform::file_identity(path)
        }

        /// Create `link` as a hard link to `original`
        pub fn hard_link(original: &Path, link: &Path) -> Result<()> {
            Platform::hard_link(original, link)
        }

        /// Open a file for a single sequential pass
        pub fn open_sequential(path: &Path) -> Result<File> {
            Platform::open_sequential(path)
        }
    } else {
        /// Get the storage identity of a path (unsupported platform)
        pub fn file_identity(_path: &Path) -> Result<FileIdentity> {
            Err(PlatformError::NotSupported("Platform not supported".to_string()))
        }

        /// Create a hard link (unsupported platform)
        pub fn hard_link(_original: &Path, _link: &Path) -> Result<()> {
            Err(PlatformError::NotSupported("Platform not supported".to_string()))
        }

        /// Open a file for reading without any access hint
        pub fn open_sequential(path: &Path) -> Result<File> {
            File::open(path).map_err(|e| map_io_error(path, e))
        }
    }
}

/// Check whether two existing paths refer to the same storage object
pub fn is_same_file(a: &Path, b: &Path) -> Result<bool> {
    Ok(file_identity(a)? == file_identity(b)?)
}

// ============================================================================
// UNIT TESTS
// ============================================================================
