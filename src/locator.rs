use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Returns every file under `root` whose file name equals `file_name`.
///
/// Paths come back in walk order: depth first, siblings sorted by name.
/// Symbolic links are followed. Subtrees that cannot be read, dangling links
/// and link loops are skipped without aborting the walk.
pub(crate) fn locate(root: &Path, file_name: &str) -> Vec<PathBuf> {
    if file_name.is_empty() {
        return Vec::new();
    }
    source_files(root)
        .filter(|entry| entry.file_name() == file_name)
        .map(DirEntry::into_path)
        .collect()
}

/// Files under a source root grouped by file name, built with a single walk.
///
/// `candidates` answers the same question as [`locate`] without re-walking
/// the tree for every violation.
#[derive(Debug, Default)]
pub(crate) struct SourceIndex {
    files: BTreeMap<OsString, Vec<PathBuf>>,
}

impl SourceIndex {
    pub(crate) fn scan(root: &Path) -> Self {
        let mut files: BTreeMap<OsString, Vec<PathBuf>> = BTreeMap::new();
        for entry in source_files(root) {
            files
                .entry(entry.file_name().to_os_string())
                .or_default()
                .push(entry.into_path());
        }
        Self { files }
    }

    pub(crate) fn candidates(&self, file_name: &str) -> &[PathBuf] {
        if file_name.is_empty() {
            return &[];
        }
        self.files
            .get(OsStr::new(file_name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub(crate) fn file_count(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }
}

fn source_files(root: &Path) -> impl Iterator<Item = DirEntry> {
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|item| match item {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!("skipping unreadable entry during source walk: {err}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
}
