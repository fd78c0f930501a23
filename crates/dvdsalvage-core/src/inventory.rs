//! Logical file inventory
//!
//! Lists the files a disc exposes and detects duplicates: two directory
//! entries backed by the same storage object on the medium.

use crate::error::{Error, Result};
use crate::layout::{FileId, LogicalFile, VIDEO_TS_DIR};
use dvdsalvage_platform::FileIdentity;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Source of the logical file list
#[cfg_attr(test, mockall::automock)]
pub trait Inventory {
    /// List every logical file on the disc
    fn list_files(&self) -> Result<Vec<LogicalFile>>;
}

/// Locate the `VIDEO_TS` directory of a mounted disc or extracted tree
///
/// Accepts the directory itself or its parent, matching the name
/// case-insensitively.
pub fn find_video_ts(source: &Path) -> Option<PathBuf> {
    let is_video_ts = |p: &Path| {
        p.file_name()
            .is_some_and(|n| n.to_string_lossy().eq_ignore_ascii_case(VIDEO_TS_DIR))
    };

    if source.is_dir() && is_video_ts(source) {
        return Some(source.to_path_buf());
    }

    let direct = source.join(VIDEO_TS_DIR);
    if direct.is_dir() {
        return Some(direct);
    }

    std::fs::read_dir(source)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| p.is_dir() && is_video_ts(p))
}

/// Map the DVD files found in `dir` to their paths
pub(crate) fn scan_video_ts(dir: &Path) -> std::io::Result<HashMap<FileId, PathBuf>> {
    let mut found = HashMap::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        match FileId::parse_file_name(&name.to_string_lossy()) {
            Some(id) => {
                found.insert(id, entry.path());
            }
            None => tracing::debug!("Ignoring {:?}", entry.path()),
        }
    }
    Ok(found)
}

/// Inventory read from a `VIDEO_TS` directory
#[derive(Debug, Clone)]
pub struct VideoTsInventory {
    source: PathBuf,
}

impl VideoTsInventory {
    /// Inventory of the disc mounted or extracted at `source`
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Source path
    pub fn source(&self) -> &Path {
        &self.source
    }
}

impl Inventory for VideoTsInventory {
    fn list_files(&self) -> Result<Vec<LogicalFile>> {
        let dir = find_video_ts(&self.source).ok_or_else(|| {
            Error::Inventory(format!(
                "no {} directory in {}",
                VIDEO_TS_DIR,
                self.source.display()
            ))
        })?;

        let mut entries: Vec<(FileId, PathBuf)> = scan_video_ts(&dir)
            .map_err(|e| Error::Inventory(format!("cannot list {}: {}", dir.display(), e)))?
            .into_iter()
            .collect();
        entries.sort_by_key(|(id, _)| *id);

        let mut seen: HashMap<FileIdentity, FileId> = HashMap::new();
        let mut files = Vec::with_capacity(entries.len());

        for (id, path) in entries {
            let size = match std::fs::metadata(&path) {
                Ok(meta) => meta.len(),
                Err(e) => {
                    tracing::warn!("Cannot stat {:?}: {}", path, e);
                    0
                }
            };
            let mut file = LogicalFile::new(id, size);

            if !id.is_continuation() {
                match dvdsalvage_platform::file_identity(&path) {
                    Ok(identity) => {
                        if let Some(original) = seen.get(&identity) {
                            tracing::debug!(
                                "{} shares storage with {}",
                                id.file_name(),
                                original.file_name()
                            );
                            file = file.duplicate_of(*original);
                        } else {
                            seen.insert(identity, id);
                        }
                    }
                    Err(e) => tracing::debug!("No identity for {:?}: {}", path, e),
                }
            }

            files.push(file);
        }

        tracing::debug!("Found {} files in {:?}", files.len(), dir);
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Domain;
    use tempfile::TempDir;

    fn disc() -> TempDir {
        let dir = TempDir::new().unwrap();
        let video_ts = dir.path().join("VIDEO_TS");
        std::fs::create_dir(&video_ts).unwrap();
        std::fs::write(video_ts.join("VIDEO_TS.IFO"), vec![0u8; 2048]).unwrap();
        std::fs::write(video_ts.join("VTS_01_0.IFO"), vec![1u8; 4096]).unwrap();
        std::fs::write(video_ts.join("VTS_01_1.VOB"), vec![2u8; 8192]).unwrap();
        std::fs::write(video_ts.join("vts_01_2.vob"), vec![3u8; 2048]).unwrap();
        std::fs::write(video_ts.join("notes.txt"), b"ignored").unwrap();
        dir
    }

    #[test]
    fn test_find_video_ts() {
        let dir = disc();
        let expected = dir.path().join("VIDEO_TS");
        assert_eq!(find_video_ts(dir.path()), Some(expected.clone()));
        assert_eq!(find_video_ts(&expected), Some(expected));

        let empty = TempDir::new().unwrap();
        assert_eq!(find_video_ts(empty.path()), None);
    }

    #[test]
    fn test_find_video_ts_lowercase() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("video_ts")).unwrap();
        let found = find_video_ts(dir.path()).unwrap();
        assert!(found.to_string_lossy().to_lowercase().ends_with("video_ts"));
    }

    #[test]
    fn test_list_files_orders_and_sizes() {
        let dir = disc();
        let files = VideoTsInventory::new(dir.path()).list_files().unwrap();

        let ids: Vec<FileId> = files.iter().map(|f| f.id).collect();
        assert_eq!(
            ids,
            vec![
                FileId::new(0, Domain::Info, 1),
                FileId::new(1, Domain::Info, 1),
                FileId::new(1, Domain::TitleVobs, 1),
                FileId::new(1, Domain::TitleVobs, 2),
            ]
        );
        assert_eq!(files[2].size, 8192);
        assert!(files.iter().all(|f| f.duplicate_of.is_none()));
    }

    #[cfg(unix)]
    #[test]
    fn test_list_files_detects_shared_storage() {
        let dir = disc();
        let video_ts = dir.path().join("VIDEO_TS");
        std::fs::hard_link(video_ts.join("VTS_01_0.IFO"), video_ts.join("VTS_01_0.BUP")).unwrap();

        let files = VideoTsInventory::new(dir.path()).list_files().unwrap();
        let bup = files
            .iter()
            .find(|f| f.id == FileId::new(1, Domain::InfoBackup, 1))
            .unwrap();
        assert_eq!(bup.duplicate_of, Some(FileId::new(1, Domain::Info, 1)));
    }

    #[test]
    fn test_list_files_without_video_ts() {
        let dir = TempDir::new().unwrap();
        let result = VideoTsInventory::new(dir.path()).list_files();
        assert!(matches!(result, Err(Error::Inventory(_))));
    }
}
