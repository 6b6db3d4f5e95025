use crate::apk::ArchiveExtractor;
use crate::config::AssetLayout;
use crate::inspect::features::{FeatureInspector, FeatureReport};
use crate::inspect::resolver::ResourceResolver;
use crate::inspect::vocabulary::BaselineVocabulary;
use crate::scanner::PackageFile;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Everything the inventory knows about one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectionRecord {
    pub display_name: String,
    pub source_path: PathBuf,
    pub version: Option<String>,
    #[serde(flatten)]
    pub features: FeatureReport,
    // Curated by hand after the scan; always empty here.
    pub discord_link: String,
    pub download_link: String,
    pub creator: String,
    pub curation_status: String,
}

impl InspectionRecord {
    pub fn new(display_name: String, source_path: PathBuf) -> Self {
        Self {
            display_name,
            source_path,
            version: None,
            features: FeatureReport::default(),
            discord_link: String::new(),
            download_link: String::new(),
            creator: String::new(),
            curation_status: String::new(),
        }
    }
}

/// An inspection record plus the recoverable problems met while building it.
#[derive(Debug, Clone, Serialize)]
pub struct PackageOutcome {
    pub record: InspectionRecord,
    pub diagnostics: Vec<String>,
}

impl PackageOutcome {
    pub fn has_warnings(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Runs one package through extraction, resolution and feature inspection.
///
/// Always produces a record; failures only downgrade fields to their defaults.
pub struct PackageInspector<'a> {
    vocabulary: &'a BaselineVocabulary,
    layout: &'a AssetLayout,
    extractor: ArchiveExtractor,
}

impl<'a> PackageInspector<'a> {
    pub fn new(
        vocabulary: &'a BaselineVocabulary,
        layout: &'a AssetLayout,
        extractor: ArchiveExtractor,
    ) -> Self {
        Self {
            vocabulary,
            layout,
            extractor,
        }
    }

    pub fn inspect(&self, package: &PackageFile) -> PackageOutcome {
        let mut diagnostics = Vec::new();

        let contents = match self.extractor.extract(&package.path) {
            Ok(contents) => Some(contents),
            Err(e) => {
                debug!(package = %package.path.display(), error = %e, "extraction failed");
                diagnostics.push(e.to_string());
                None
            }
        };

        let identity = ResourceResolver::new(&self.layout.app_name_key).resolve(
            &package.path,
            contents.as_ref(),
            &mut diagnostics,
        );
        let features = FeatureInspector::new(self.vocabulary, self.layout)
            .inspect(contents.as_ref().map(|c| c.root()), &mut diagnostics);

        if let Some(contents) = contents {
            if let Err(e) = contents.close() {
                debug!(package = %package.path.display(), error = %e, "cleanup failed");
                diagnostics.push(format!("cleanup failed: {}", e));
            }
        }

        let mut record = InspectionRecord::new(identity.display_name, package.path.clone());
        record.version = identity.version;
        record.features = features;

        if diagnostics.is_empty() {
            debug!(package = %package.filename, name = %record.display_name, "package inspected");
        } else {
            warn!(
                package = %package.path.display(),
                issues = %diagnostics.join("; "),
                "package inspected with warnings"
            );
        }

        PackageOutcome {
            record,
            diagnostics,
        }
    }
}
