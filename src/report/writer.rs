use crate::error::{CensusError, Result};
use crate::inspect::{InspectionRecord, PackageOutcome};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const STANDARD_COLUMNS: [&str; 6] = [
    "apk_name",
    "apk_path",
    "version",
    "offline",
    "added_skins",
    "added_brawlers",
];

pub const EXTENDED_COLUMNS: [&str; 8] = [
    "custom_sc",
    "custom_icons",
    "modified_skins",
    "new_models",
    "discord_link",
    "download_link",
    "creator",
    "status",
];

/// Writes the inventory table, one row per package, in the order given.
pub struct TableWriter<W: Write> {
    writer: csv::Writer<W>,
    extended: bool,
}

impl TableWriter<File> {
    /// Creates (or truncates) the output file and writes the header row.
    pub fn create(path: &Path, extended: bool) -> Result<Self> {
        let not_writable = |message: String| CensusError::OutputNotWritable {
            path: path.display().to_string(),
            message,
        };

        let file = File::create(path).map_err(|e| not_writable(e.to_string()))?;
        Self::from_writer(file, extended).map_err(|e| not_writable(e.to_string()))
    }
}

impl<W: Write> TableWriter<W> {
    pub fn from_writer(inner: W, extended: bool) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(inner);

        let mut header: Vec<&str> = STANDARD_COLUMNS.to_vec();
        if extended {
            header.extend(EXTENDED_COLUMNS);
        }
        writer.write_record(&header)?;

        Ok(Self {
            writer,
            extended,
        })
    }

    pub fn write_record(&mut self, record: &InspectionRecord) -> Result<()> {
        self.writer.write_record(format_row(record, self.extended))?;
        Ok(())
    }

    /// Flushes buffered rows and hands back the underlying writer.
    pub fn finish(self) -> Result<W> {
        self.writer.into_inner().map_err(|e| {
            CensusError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                e.error().to_string(),
            ))
        })
    }
}

pub fn format_row(record: &InspectionRecord, extended: bool) -> Vec<String> {
    let features = &record.features;
    let mut row = vec![
        record.display_name.clone(),
        record.source_path.display().to_string(),
        record.version.clone().unwrap_or_default(),
        python_bool(features.is_offline).to_string(),
        features.new_skin_count.to_string(),
        features.new_character_count.to_string(),
    ];

    if extended {
        row.extend([
            features.custom_shaders.to_string(),
            features.custom_icons.to_string(),
            features.modified_skins.to_string(),
            features.new_models.to_string(),
            record.discord_link.clone(),
            record.download_link.clone(),
            record.creator.clone(),
            record.curation_status.clone(),
        ]);
    }

    row
}

// Existing inventories were produced with capitalised booleans.
fn python_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Summary of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub output_path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub packages_inspected: usize,
    pub packages_with_warnings: usize,
    pub offline_packages: usize,
    pub outcomes: Vec<PackageOutcome>,
}

impl BatchReport {
    pub fn new(
        output_path: PathBuf,
        started_at: DateTime<Utc>,
        duration: Duration,
        outcomes: Vec<PackageOutcome>,
    ) -> Self {
        Self {
            output_path,
            started_at,
            duration,
            packages_inspected: outcomes.len(),
            packages_with_warnings: outcomes.iter().filter(|o| o.has_warnings()).count(),
            offline_packages: outcomes
                .iter()
                .filter(|o| o.record.features.is_offline)
                .count(),
            outcomes,
        }
    }

    pub fn has_warnings(&self) -> bool {
        self.packages_with_warnings > 0
    }
}
