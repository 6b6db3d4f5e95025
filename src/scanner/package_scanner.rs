use crate::config::ScanConfig;
use crate::error::{CensusError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFile {
    pub path: PathBuf,
    pub filename: String,
    pub size: u64,
}

impl PackageFile {
    pub fn new(path: PathBuf, size: u64) -> Self {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            path,
            filename,
            size,
        }
    }

    pub fn format_size(&self) -> String {
        format_bytes(self.size)
    }
}

/// Lists the packages sitting directly in the input folder.
pub struct PackageScanner {
    extension: String,
}

impl PackageScanner {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            extension: config.extension.trim_start_matches('.').to_lowercase(),
        }
    }

    /// Case-insensitive extension match: `mod.APK` counts as a package.
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension))
    }

    /// Packages in `root`, sorted by file name. Subfolders are not entered.
    pub fn scan_directory<P: AsRef<Path>>(&self, root: P) -> Result<Vec<PackageFile>> {
        let root_path = root.as_ref();

        if !root_path.is_dir() {
            return Err(CensusError::InputFolderNotFound {
                path: root_path.display().to_string(),
            });
        }

        let walker = WalkDir::new(root_path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();

        let mut packages = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };

            if let Some(package) = self.process_entry(&entry) {
                packages.push(package);
            }
        }

        debug!(
            folder = %root_path.display(),
            packages = packages.len(),
            "input folder scanned"
        );
        Ok(packages)
    }

    fn process_entry(&self, entry: &DirEntry) -> Option<PackageFile> {
        if !entry.file_type().is_file() || !self.matches(entry.path()) {
            return None;
        }

        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        Some(PackageFile::new(entry.path().to_path_buf(), size))
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
