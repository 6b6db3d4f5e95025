pub mod apk;
pub mod cli;
pub mod config;
pub mod error;
pub mod inspect;
pub mod report;
pub mod scanner;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{AssetLayout, CliOverrides, Config};
pub use error::{CensusError, Result, UserFriendlyError};

// Core functionality re-exports
pub use apk::{ArchiveExtractor, ExtractedPackage, Manifest, ResourceTable};
pub use inspect::{
    BaselineVocabulary, Detection, FeatureInspector, FeatureReport, InspectionRecord,
    PackageInspector, PackageOutcome, ResourceResolver,
};
pub use report::{BatchReport, TableWriter};
pub use scanner::{PackageFile, PackageScanner};
pub use ui::{OutputFormatter, OutputMode, ProgressManager};

use chrono::Utc;
use indicatif::ProgressBar;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Batch driver: one inventory row for every package in the input folder.
pub struct ApkCensus {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
}

impl ApkCensus {
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        // Progress bars would interleave with machine-readable output.
        let show_progress = !quiet && output_mode == OutputMode::Human;

        Self {
            config,
            output_formatter: OutputFormatter::new(output_mode, verbose, quiet),
            progress_manager: ProgressManager::new(show_progress),
        }
    }

    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        };

        Ok(Self::new(config, output_mode, cli_args.verbose, cli_args.quiet))
    }

    /// Runs the whole batch and writes the output table.
    ///
    /// Fails only on batch-level problems (input folder, baseline, output
    /// file). Problems with individual packages end up in the report.
    pub fn run(&self) -> Result<BatchReport> {
        let started_at = Utc::now();
        let start_time = Instant::now();

        self.output_formatter.start_operation("Building package inventory");

        let input = self.check_input_folder()?;
        let vocabulary = self.load_baseline()?;

        let output_path = &self.config.paths.output_csv;
        let mut writer = TableWriter::create(output_path, self.config.report.extended_columns)?;

        let packages = PackageScanner::new(&self.config.scan).scan_directory(input)?;
        self.output_formatter
            .info(&format!("Found {} packages in {}", packages.len(), input.display()));

        let outcomes = self.inspect_packages(&packages, &vocabulary, &mut writer)?;
        writer
            .finish()
            .map_err(|e| output_error(output_path, e))?;

        let report = BatchReport::new(
            output_path.clone(),
            started_at,
            start_time.elapsed(),
            outcomes,
        );
        info!(
            packages = report.packages_inspected,
            warnings = report.packages_with_warnings,
            output = %output_path.display(),
            "inventory complete"
        );
        Ok(report)
    }

    /// Runs every batch-level check and lists the packages a real run would
    /// inspect, without unpacking anything or touching the output file.
    pub fn plan(&self) -> Result<Vec<PackageFile>> {
        let input = self.check_input_folder()?;
        self.load_baseline()?;
        PackageScanner::new(&self.config.scan).scan_directory(input)
    }

    fn check_input_folder(&self) -> Result<&Path> {
        let input = self.config.input_folder()?;
        if !input.is_dir() {
            return Err(CensusError::InputFolderNotFound {
                path: input.display().to_string(),
            });
        }
        Ok(input)
    }

    fn load_baseline(&self) -> Result<BaselineVocabulary> {
        let spinner = self
            .progress_manager
            .create_spinner("Loading reference assets...");
        let result = BaselineVocabulary::load(&self.config.paths.reference_dir, &self.config.layout);
        spinner.finish_and_clear();

        let vocabulary = result?;
        self.output_formatter.info(&format!(
            "Reference build knows {} characters and {} skins",
            vocabulary.character_count(),
            vocabulary.skin_count()
        ));
        Ok(vocabulary)
    }

    fn inspector<'a>(&'a self, vocabulary: &'a BaselineVocabulary) -> PackageInspector<'a> {
        let extractor =
            ArchiveExtractor::new().with_temp_root(self.config.paths.temp_dir.as_ref());
        PackageInspector::new(vocabulary, &self.config.layout, extractor)
    }

    #[cfg(not(feature = "parallel"))]
    fn inspect_packages(
        &self,
        packages: &[PackageFile],
        vocabulary: &BaselineVocabulary,
        writer: &mut TableWriter<File>,
    ) -> Result<Vec<PackageOutcome>> {
        let inspector = self.inspector(vocabulary);
        let pb = self
            .progress_manager
            .create_package_progress(packages.len() as u64);

        let mut outcomes = Vec::with_capacity(packages.len());
        for package in packages {
            pb.set_message(package.filename.clone());
            let outcome = inspector.inspect(package);
            self.record_outcome(&outcome, writer, &pb)?;
            outcomes.push(outcome);
        }

        pb.finish_and_clear();
        Ok(outcomes)
    }

    /// Packages are inspected concurrently; rows are still written in
    /// enumeration order by this thread alone.
    #[cfg(feature = "parallel")]
    fn inspect_packages(
        &self,
        packages: &[PackageFile],
        vocabulary: &BaselineVocabulary,
        writer: &mut TableWriter<File>,
    ) -> Result<Vec<PackageOutcome>> {
        use rayon::prelude::*;

        let inspector = self.inspector(vocabulary);
        let pb = self
            .progress_manager
            .create_package_progress(packages.len() as u64);

        let outcomes: Vec<PackageOutcome> = packages
            .par_iter()
            .map(|package| {
                let outcome = inspector.inspect(package);
                pb.inc(1);
                outcome
            })
            .collect();

        pb.set_position(0);
        for outcome in &outcomes {
            self.record_outcome(outcome, writer, &pb)?;
        }

        pb.finish_and_clear();
        Ok(outcomes)
    }

    fn record_outcome(
        &self,
        outcome: &PackageOutcome,
        writer: &mut TableWriter<File>,
        pb: &ProgressBar,
    ) -> Result<()> {
        writer
            .write_record(&outcome.record)
            .map_err(|e| output_error(&self.config.paths.output_csv, e))?;

        if outcome.has_warnings() {
            self.progress_manager.suspend(|| {
                self.output_formatter.warning(&format!(
                    "{}: {}",
                    outcome.record.source_path.display(),
                    outcome.diagnostics.join("; ")
                ));
            });
        }

        pb.inc(1);
        Ok(())
    }

    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config)?;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn handle_error(&self, error: &CensusError) {
        self.progress_manager.clear();
        self.output_formatter.print_user_friendly_error(error);
    }
}

fn output_error(path: &Path, error: CensusError) -> CensusError {
    CensusError::OutputNotWritable {
        path: path.display().to_string(),
        message: error.to_string(),
    }
}
