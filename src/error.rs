use thiserror::Error;

#[derive(Error, Debug)]
pub enum CensusError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Input folder not found: {path}")]
    InputFolderNotFound { path: String },

    #[error("Reference assets unavailable: {path}")]
    BaselineUnavailable { path: String, message: String },

    #[error("Output file is not writable: {path}")]
    OutputNotWritable { path: String, message: String },

    #[error("Failed to extract package {path}: {message}")]
    Extraction { path: String, message: String },

    #[error("Failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: DecodeError,
    },

    #[error("Failed to read table {path}: {message}")]
    Table { path: String, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Failures raised by the binary manifest and resource table decoders.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of data at offset {offset}")]
    Truncated { offset: usize },

    #[error("unexpected chunk type 0x{found:04x} (expected 0x{expected:04x})")]
    UnexpectedChunk { expected: u16, found: u16 },

    #[error("chunk at offset {offset} declares invalid size {size}")]
    InvalidChunkSize { offset: usize, size: u32 },

    #[error("string index {index} out of range ({count} strings)")]
    StringIndex { index: u32, count: usize },

    #[error("invalid string data: {0}")]
    InvalidString(String),

    #[error("no root element found")]
    MissingRootElement,
}

impl From<std::io::Error> for DecodeError {
    fn from(_: std::io::Error) -> Self {
        // byteorder reads only fail on a short buffer
        DecodeError::Truncated { offset: usize::MAX }
    }
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for CensusError {
    fn user_message(&self) -> String {
        match self {
            CensusError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            CensusError::InputFolderNotFound { path } => {
                format!("The input folder does not exist or is not a directory: {}", path)
            }
            CensusError::BaselineUnavailable { path, message } => {
                format!("Could not load reference assets from {}: {}", path, message)
            }
            CensusError::OutputNotWritable { path, message } => {
                format!("Cannot write output table {}: {}", path, message)
            }
            CensusError::Extraction { path, message } => {
                format!("Could not unpack {}: {}", path, message)
            }
            CensusError::Table { path, message } => {
                format!("Could not read table {}: {}", path, message)
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            CensusError::Config { .. } => Some(
                "Check your configuration file syntax or regenerate one with --generate-config.".to_string()
            ),
            CensusError::InputFolderNotFound { .. } => Some(
                "Pass the folder holding the .apk files as the first argument or set [paths].input_folder.".to_string()
            ),
            CensusError::BaselineUnavailable { .. } => Some(
                "Point --reference at an unpacked copy of the latest official build (it must contain assets/csv_logic).".to_string()
            ),
            CensusError::OutputNotWritable { .. } => Some(
                "Choose another location with --output or check the directory permissions.".to_string()
            ),
            CensusError::Extraction { .. } => Some(
                "The file is probably not a valid APK; re-download it or remove it from the folder.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for CensusError {
    fn from(error: toml::de::Error) -> Self {
        CensusError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CensusError>;
