use crate::error::{CensusError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub layout: AssetLayout,
    pub scan: ScanConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_folder: Option<PathBuf>,
    pub output_csv: PathBuf,
    pub reference_dir: PathBuf,
    /// Where per-package extraction directories are created (system temp dir when unset).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
}

/// Locations and vocabulary of the game data inside an unpacked package.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetLayout {
    pub server_asset: PathBuf,
    pub characters_table: PathBuf,
    pub skins_table: PathBuf,
    pub type_column: String,
    pub playable_type: String,
    pub app_name_key: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanConfig {
    pub extension: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    pub extended_columns: bool,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_folder: None,
            output_csv: PathBuf::from("apk_database.csv"),
            reference_dir: PathBuf::from("latest_brawl_stars_apk"),
            temp_dir: None,
        }
    }
}

impl Default for AssetLayout {
    fn default() -> Self {
        Self {
            server_asset: PathBuf::from("assets/server"),
            characters_table: PathBuf::from("assets/csv_logic/characters.csv"),
            skins_table: PathBuf::from("assets/csv_logic/skin_confs.csv"),
            type_column: "Type".to_string(),
            playable_type: "Hero".to_string(),
            app_name_key: "app_name".to_string(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extension: "apk".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(CensusError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CensusError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| CensusError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["apkcensus.toml", ".apkcensus.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref input) = cli_args.input_folder {
            self.paths.input_folder = Some(input.clone());
        }

        if let Some(ref output) = cli_args.output_csv {
            self.paths.output_csv = output.clone();
        }

        if let Some(ref reference) = cli_args.reference_dir {
            self.paths.reference_dir = reference.clone();
        }

        if let Some(ref temp_dir) = cli_args.temp_dir {
            self.paths.temp_dir = Some(temp_dir.clone());
        }

        if cli_args.extended_columns {
            self.report.extended_columns = true;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| CensusError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| CensusError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let extension = self.scan.extension.trim_start_matches('.');
        if extension.is_empty() {
            return Err(CensusError::Config {
                message: "A package file extension must be specified".to_string(),
            });
        }

        if self.paths.output_csv.as_os_str().is_empty() {
            return Err(CensusError::Config {
                message: "Output table path must not be empty".to_string(),
            });
        }

        if self.paths.reference_dir.as_os_str().is_empty() {
            return Err(CensusError::Config {
                message: "Reference directory must not be empty".to_string(),
            });
        }

        if self.layout.type_column.is_empty() || self.layout.playable_type.is_empty() {
            return Err(CensusError::Config {
                message: "Character type column and playable type must be set".to_string(),
            });
        }

        if let Some(ref temp_dir) = self.paths.temp_dir {
            if !temp_dir.is_dir() {
                return Err(CensusError::Config {
                    message: format!("Temporary directory does not exist: {}", temp_dir.display()),
                });
            }
        }

        Ok(())
    }

    /// The configured input folder, or an error naming the missing setting.
    pub fn input_folder(&self) -> Result<&Path> {
        self.paths
            .input_folder
            .as_deref()
            .ok_or_else(|| CensusError::Config {
                message: "No input folder given (pass it as an argument or set [paths].input_folder)"
                    .to_string(),
            })
    }

    pub fn create_sample_config() -> String {
        let mut sample_config = Self::default();
        sample_config.paths.input_folder = Some(PathBuf::from("mods"));
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub input_folder: Option<PathBuf>,
    pub output_csv: Option<PathBuf>,
    pub reference_dir: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub extended_columns: bool,
}

impl CliOverrides {
    pub fn with_input_folder(mut self, input: Option<PathBuf>) -> Self {
        self.input_folder = input;
        self
    }

    pub fn with_output_csv(mut self, output: Option<PathBuf>) -> Self {
        self.output_csv = output;
        self
    }

    pub fn with_reference_dir(mut self, reference: Option<PathBuf>) -> Self {
        self.reference_dir = reference;
        self
    }

    pub fn with_temp_dir(mut self, temp_dir: Option<PathBuf>) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    pub fn with_extended_columns(mut self, extended: bool) -> Self {
        self.extended_columns = extended;
        self
    }
}
