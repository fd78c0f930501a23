//! macOS platform implementation
//!
//! Identity comes from `st_dev`/`st_ino`; read-ahead is enabled with
//! `fcntl(F_RDAHEAD)`.

use crate::{map_io_error, FileIdentity, PlatformError, PlatformOps, Result};
use std::fs::File;
use std::os::unix::fs::MetadataExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;

/// macOS platform implementation
pub struct MacOSPlatform;

impl PlatformOps for MacOSPlatform {
    fn file_identity(path: &Path) -> Result<FileIdentity> {
        let metadata = std::fs::metadata(path).map_err(|e| map_io_error(path, e))?;
        Ok(FileIdentity {
            device: metadata.dev(),
            index: metadata.ino(),
        })
    }

    fn hard_link(original: &Path, link: &Path) -> Result<()> {
        std::fs::hard_link(original, link).map_err(|e| match e.raw_os_error() {
            Some(libc::EXDEV) => PlatformError::LinkFailed(format!(
                "{} and {} are on different volumes",
                original.display(),
                link.display()
            )),
            Some(libc::EEXIST) => {
                PlatformError::LinkFailed(format!("{} already exists", link.display()))
            }
            _ => map_io_error(original, e),
        })
    }

    fn open_sequential(path: &Path) -> Result<File> {
        let file = File::open(path).map_err(|e| map_io_error(path, e))?;

        // SAFETY: the descriptor is owned by `file`; F_RDAHEAD takes an int flag.
        #[allow(unsafe_code)]
        let ret = unsafe { libc::fcntl(file.as_raw_fd(), libc::F_RDAHEAD, 1) };
        if ret == -1 {
            tracing::debug!("F_RDAHEAD failed on {:?}", path);
        }

        Ok(file)
    }
}
