use crate::error::{CensusError, Result};
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempDir};
use tracing::debug;

pub const MANIFEST_ENTRY: &str = "AndroidManifest.xml";
pub const RESOURCE_TABLE_ENTRY: &str = "resources.arsc";

/// A package unpacked into a private temporary directory.
///
/// The directory is removed when this value is dropped or closed.
#[derive(Debug)]
pub struct ExtractedPackage {
    dir: TempDir,
    source: PathBuf,
    files_extracted: usize,
}

impl ExtractedPackage {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn files_extracted(&self) -> usize {
        self.files_extracted
    }

    /// Reads a file from the unpacked tree; `Ok(None)` when it is absent.
    pub fn read_entry<P: AsRef<Path>>(&self, relative: P) -> Result<Option<Vec<u8>>> {
        let path = self.root().join(relative);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CensusError::Io(e)),
        }
    }

    pub fn manifest_bytes(&self) -> Result<Option<Vec<u8>>> {
        self.read_entry(MANIFEST_ENTRY)
    }

    pub fn resource_table_bytes(&self) -> Result<Option<Vec<u8>>> {
        self.read_entry(RESOURCE_TABLE_ENTRY)
    }

    /// Removes the extraction directory, reporting any failure to do so.
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        debug!(path = %path.display(), "removed extraction directory");
        Ok(())
    }
}

/// Unpacks package archives into exclusively owned temporary directories.
#[derive(Debug, Clone, Default)]
pub struct ArchiveExtractor {
    temp_root: Option<PathBuf>,
}

impl ArchiveExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temp_root<P: Into<PathBuf>>(mut self, root: Option<P>) -> Self {
        self.temp_root = root.map(Into::into);
        self
    }

    pub fn extract(&self, package: &Path) -> Result<ExtractedPackage> {
        let mut builder = Builder::new();
        builder.prefix("apkcensus-");
        let dir = match self.temp_root {
            Some(ref root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };

        // On any error below `dir` is dropped, which deletes the partial tree.
        let files_extracted = unpack_zip(package, dir.path())?;
        debug!(
            package = %package.display(),
            files = files_extracted,
            dir = %dir.path().display(),
            "package extracted"
        );

        Ok(ExtractedPackage {
            dir,
            source: package.to_path_buf(),
            files_extracted,
        })
    }
}

fn unpack_zip(archive_path: &Path, dest_path: &Path) -> Result<usize> {
    let extraction_error = |message: String| CensusError::Extraction {
        path: archive_path.display().to_string(),
        message,
    };

    let file = File::open(archive_path)
        .map_err(|e| extraction_error(format!("failed to open archive: {}", e)))?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))
        .map_err(|e| extraction_error(format!("invalid or corrupt archive: {}", e)))?;

    let mut count = 0;
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| extraction_error(format!("failed to read entry {}: {}", index, e)))?;

        let entry_path = match entry.enclosed_name() {
            Some(path) => path.to_path_buf(),
            None => {
                debug!(entry = entry.name(), "skipping entry with unsafe path");
                continue;
            }
        };
        let output_path = dest_path.join(&entry_path);

        if entry.is_dir() {
            fs::create_dir_all(&output_path)?;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(&output_path)?;
        io::copy(&mut entry, &mut outfile).map_err(|e| {
            extraction_error(format!("failed to write {}: {}", entry_path.display(), e))
        })?;
        count += 1;
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_package(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (name, bytes) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap();
    }

    fn remaining_entries(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_extract_and_cleanup_on_drop() {
        let workspace = TempDir::new().unwrap();
        let temp_root = workspace.path().join("scratch");
        fs::create_dir(&temp_root).unwrap();
        let package = workspace.path().join("mod.apk");
        write_package(
            &package,
            &[
                ("AndroidManifest.xml", b"manifest"),
                ("assets/csv_logic/characters.csv", b"Name,Type\n"),
            ],
        );

        let extractor = ArchiveExtractor::new().with_temp_root(Some(&temp_root));
        let extracted = extractor.extract(&package).unwrap();
        let root = extracted.root().to_path_buf();

        assert_eq!(extracted.files_extracted(), 2);
        assert!(root.join("assets/csv_logic/characters.csv").is_file());
        assert_eq!(extracted.manifest_bytes().unwrap(), Some(b"manifest".to_vec()));
        assert_eq!(extracted.resource_table_bytes().unwrap(), None);
        assert_eq!(extracted.source(), package.as_path());

        drop(extracted);
        assert!(!root.exists());
        assert_eq!(remaining_entries(&temp_root), 0);
    }

    #[test]
    fn test_directory_removed_while_unwinding() {
        let workspace = TempDir::new().unwrap();
        let temp_root = workspace.path().join("scratch");
        fs::create_dir(&temp_root).unwrap();
        let package = workspace.path().join("mod.apk");
        write_package(&package, &[("assets/server/logic.bin", b"x")]);

        let extractor = ArchiveExtractor::new().with_temp_root(Some(&temp_root));
        let result = std::panic::catch_unwind(|| {
            let extracted = extractor.extract(&package).unwrap();
            assert!(extracted.root().join("assets/server").is_dir());
            panic!("inspection failed midway");
        });

        assert!(result.is_err());
        assert_eq!(remaining_entries(&temp_root), 0);
    }

    #[test]
    fn test_close_removes_directory() {
        let workspace = TempDir::new().unwrap();
        let package = workspace.path().join("mod.apk");
        write_package(&package, &[("assets/server/logic.bin", b"x")]);

        let extracted = ArchiveExtractor::new().extract(&package).unwrap();
        let root = extracted.root().to_path_buf();
        extracted.close().unwrap();
        assert!(!root.exists());
    }

    #[test]
    fn test_invalid_archive_leaves_nothing_behind() {
        let workspace = TempDir::new().unwrap();
        let temp_root = workspace.path().join("scratch");
        fs::create_dir(&temp_root).unwrap();
        let package = workspace.path().join("broken.apk");
        fs::write(&package, b"definitely not a zip file").unwrap();

        let extractor = ArchiveExtractor::new().with_temp_root(Some(&temp_root));
        let result = extractor.extract(&package);

        assert!(matches!(result, Err(CensusError::Extraction { .. })));
        assert_eq!(remaining_entries(&temp_root), 0);
    }

    #[test]
    fn test_missing_archive_is_extraction_error() {
        let workspace = TempDir::new().unwrap();
        let result = ArchiveExtractor::new().extract(&workspace.path().join("absent.apk"));
        assert!(matches!(result, Err(CensusError::Extraction { .. })));
    }
}
