//! Linux platform implementation
//!
//! Identity comes from `st_dev`/`st_ino`; sequential reads are announced with
//! `posix_fadvise`.

use crate::{map_io_error, FileIdentity, PlatformError, PlatformOps, Result};
use std::fs::File;
use std::os::unix::fs::MetadataExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;

/// Linux platform implementation
pub struct LinuxPlatform;

impl PlatformOps for LinuxPlatform {
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
                "{} and {} are on different filesystems",
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

        // SAFETY: the descriptor is owned by `file` and stays open for the
        // duration of the call. posix_fadvise only records an access hint.
        #[allow(unsafe_code)]
        let ret = unsafe { libc::posix_fadvise(file.as_raw_fd(), 0, 0, libc::POSIX_FADV_SEQUENTIAL) };
        if ret != 0 {
            tracing::debug!("posix_fadvise failed on {:?}: errno {}", path, ret);
        }

        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_identity_same_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.vob");
        std::fs::write(&path, b"data").unwrap();

        let a = LinuxPlatform::file_identity(&path).unwrap();
        let b = LinuxPlatform::file_identity(&path).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_identity_hard_link_matches() {
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("VTS_01_0.IFO");
        let link = dir.path().join("VTS_01_0.BUP");
        std::fs::write(&original, b"ifo").unwrap();

        LinuxPlatform::hard_link(&original, &link).unwrap();

        assert_eq!(
            LinuxPlatform::file_identity(&original).unwrap(),
            LinuxPlatform::file_identity(&link).unwrap()
        );
    }

    #[test]
    fn test_identity_distinct_files_differ() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, b"same").unwrap();
        std::fs::write(&b, b"same").unwrap();

        assert_ne!(
            LinuxPlatform::file_identity(&a).unwrap(),
            LinuxPlatform::file_identity(&b).unwrap()
        );
    }

    #[test]
    fn test_identity_missing_path() {
        let result = LinuxPlatform::file_identity(Path::new("/nonexistent/VIDEO_TS.IFO"));
        assert!(matches!(result, Err(PlatformError::NotFound(_))));
    }

    #[test]
    fn test_hard_link_existing_target() {
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("a");
        let link = dir.path().join("b");
        std::fs::write(&original, b"1").unwrap();
        std::fs::write(&link, b"2").unwrap();

        let result = LinuxPlatform::hard_link(&original, &link);
        assert!(matches!(result, Err(PlatformError::LinkFailed(_))));
    }

    #[test]
    fn test_open_sequential_reads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("VIDEO_TS.IFO");
        let mut f = File::create(&path).unwrap();
        f.write_all(b"DVDVIDEO-VMG").unwrap();
        drop(f);

        let mut file = LinuxPlatform::open_sequential(&path).unwrap();
        let mut contents = String::new();
        std::io::Read::read_to_string(&mut file, &mut contents).unwrap();
        assert_eq!(contents, "DVDVIDEO-VMG");
    }
}
