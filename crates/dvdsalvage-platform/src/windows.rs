//! Windows platform implementation
//!
//! Identity is the volume serial number plus the 64-bit file index reported by
//! `GetFileInformationByHandle`. Source files are opened with
//! `FILE_FLAG_SEQUENTIAL_SCAN`.

use crate::{map_io_error, FileIdentity, PlatformError, PlatformOps, Result};
use std::fs::File;
use std::path::Path;

#[cfg(target_os = "windows")]
use std::os::windows::fs::OpenOptionsExt;
#[cfg(target_os = "windows")]
use std::os::windows::io::AsRawHandle;
#[cfg(target_os = "windows")]
use windows_sys::Win32::Foundation::HANDLE;
#[cfg(target_os = "windows")]
use windows_sys::Win32::Storage::FileSystem::{
    GetFileInformationByHandle, BY_HANDLE_FILE_INFORMATION, FILE_FLAG_SEQUENTIAL_SCAN,
};

/// Windows platform implementation
pub struct WindowsPlatform;

impl PlatformOps for WindowsPlatform {
    fn file_identity(path: &Path) -> Result<FileIdentity> {
        #[cfg(target_os = "windows")]
        {
            let file = File::open(path).map_err(|e| map_io_error(path, e))?;
            // SAFETY: zeroed is a valid bit pattern for this plain C struct.
            #[allow(unsafe_code)]
            let mut info: BY_HANDLE_FILE_INFORMATION = unsafe { std::mem::zeroed() };

            // SAFETY: the handle belongs to `file`, which outlives the call, and
            // `info` is a valid out-pointer.
            #[allow(unsafe_code)]
            let ok = unsafe { GetFileInformationByHandle(file.as_raw_handle() as HANDLE, &mut info) };
            if ok == 0 {
                return Err(PlatformError::Io(std::io::Error::last_os_error()));
            }

            Ok(FileIdentity {
                device: u64::from(info.dwVolumeSerialNumber),
                index: (u64::from(info.nFileIndexHigh) << 32) | u64::from(info.nFileIndexLow),
            })
        }
        #[cfg(not(target_os = "windows"))]
        {
            let _ = path;
            Err(PlatformError::NotSupported(
                "Windows API not available".to_string(),
            ))
        }
    }

    fn hard_link(original: &Path, link: &Path) -> Result<()> {
        std::fs::hard_link(original, link).map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => {
                PlatformError::LinkFailed(format!("{} already exists", link.display()))
            }
            _ => map_io_error(original, e),
        })
    }

    fn open_sequential(path: &Path) -> Result<File> {
        #[cfg(target_os = "windows")]
        {
            std::fs::OpenOptions::new()
                .read(true)
                .custom_flags(FILE_FLAG_SEQUENTIAL_SCAN)
                .open(path)
                .map_err(|e| map_io_error(path, e))
        }
        #[cfg(not(target_os = "windows"))]
        {
            File::open(path).map_err(|e| map_io_error(path, e))
        }
    }
}
