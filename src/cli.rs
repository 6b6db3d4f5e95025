use crate::config::{CliOverrides, Config};
use crate::error::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "apkcensus")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inventory a folder of game APK mods against a reference build")]
#[command(
    long_about = "ApkCensus unpacks every .apk in a folder, reads its application name and \
                  version, compares its character and skin tables with an unpacked reference \
                  build, and writes one CSV row per package."
)]
#[command(after_help = "EXAMPLES:\n  \
    apkcensus mods/\n  \
    apkcensus mods/ --reference latest_brawl_stars_apk --output inventory.csv\n  \
    apkcensus mods/ --extended --output-format json\n  \
    apkcensus --config census.toml --dry-run")]
pub struct Cli {
    /// Folder holding the packages to inventory
    pub input: Option<PathBuf>,

    /// Output CSV file (defaults to apk_database.csv)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Unpacked reference build used as the baseline
    #[arg(short, long, env = "APKCENSUS_REFERENCE")]
    pub reference: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Directory in which per-package extraction directories are created
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// Append the content-check and curation columns
    #[arg(long)]
    pub extended: bool,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Dry run (show what would be done without executing)
    #[arg(long, help = "List the packages that would be inspected without unpacking them")]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::default()
            .with_input_folder(self.input.clone())
            .with_output_csv(self.output.clone())
            .with_reference_dir(self.reference.clone())
            .with_temp_dir(self.temp_dir.clone())
            .with_extended_columns(self.extended)
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}
