//! Directory scanner for discovering loadable table sources

use crate::error::Result;
use crate::source::SourceFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Files of one source format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceGroup {
    pub format: SourceFormat,
    /// Paths sorted lexicographically
    pub files: Vec<PathBuf>,
}

/// Result of scanning directories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Root directories that were scanned
    pub roots: Vec<PathBuf>,
    /// Discovered sources, one group per format
    pub groups: Vec<SourceGroup>,
    /// Total number of files found
    pub total_files: usize,
}

impl ScanResult {
    /// Find the group for a format
    pub fn group(&self, format: SourceFormat) -> Option<&SourceGroup> {
        self.groups.iter().find(|g| g.format == format)
    }

    /// All discovered files in group order
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.groups
            .iter()
            .flat_map(|g| g.files.iter().map(PathBuf::as_path))
    }
}

/// Scan one or more directories for files a loader understands
pub fn scan_directory<P: AsRef<Path>>(roots: &[P]) -> Result<ScanResult> {
    let mut file_map: BTreeMap<SourceFormat, Vec<PathBuf>> = BTreeMap::new();
    let mut total_files = 0;

    for root in roots {
        let root = root.as_ref();

        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Some(format) = path
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(SourceFormat::from_extension)
            else {
                continue;
            };

            debug!(path = %path.display(), format = %format, "found source");
            file_map.entry(format).or_default().push(path.to_path_buf());
            total_files += 1;
        }
    }

    let groups = file_map
        .into_iter()
        .map(|(format, mut files)| {
            files.sort();
            SourceGroup { format, files }
        })
        .collect();

    Ok(ScanResult {
        roots: roots.iter().map(|r| r.as_ref().to_path_buf()).collect(),
        groups,
        total_files,
    })
}
