use std::io::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OfficeExtractError {
    #[error("Input is not a readable ZIP archive: {message}")]
    InvalidArchive {
        message: String,
        #[source]
        source: Option<zip::result::ZipError>,
    },

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Two entries resolve to the same name: {name}")]
    NameCollision {
        name: String,
        first: String,
        second: String,
    },

    #[error("Unknown file type category: {name}")]
    UnknownCategory { name: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Operation was cancelled by user")]
    Cancelled,

    #[error("File too large: {size} bytes (max: {max_size} bytes)")]
    FileTooLarge { size: u64, max_size: u64 },

    #[error("Path validation failed: {path}")]
    InvalidPath { path: String },

    #[error("Output file already exists: {path}")]
    OutputExists { path: String },
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for OfficeExtractError {
    fn user_message(&self) -> String {
        match self {
            OfficeExtractError::InvalidArchive { message, .. } => {
                format!("The uploaded file is not a valid ZIP archive: {}", message)
            }
            OfficeExtractError::Io(e) => {
                format!("Working storage failure: {}", e)
            }
            OfficeExtractError::NameCollision { name, first, second } => {
                format!(
                    "'{}' and '{}' would both be stored as '{}'",
                    first, second, name
                )
            }
            OfficeExtractError::UnknownCategory { name } => {
                format!("Unknown file type: {}", name)
            }
            OfficeExtractError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            OfficeExtractError::Cancelled => "Operation was cancelled by user".to_string(),
            OfficeExtractError::FileTooLarge { size, max_size } => {
                format!(
                    "Archive entry too large: {} (maximum allowed: {})",
                    format_bytes(*size),
                    format_bytes(*max_size)
                )
            }
            OfficeExtractError::InvalidPath { path } => {
                format!("Invalid file path: {}", path)
            }
            OfficeExtractError::OutputExists { path } => {
                format!("Output file already exists: {}", path)
            }
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            OfficeExtractError::InvalidArchive { .. } => Some(
                "Make sure the file is a .zip archive (for example the bulk download from the submission system) and that it is not truncated.".to_string()
            ),
            OfficeExtractError::Io(_) => Some(
                "Check free disk space and permissions of the temporary directory, or choose another one with --scratch-dir.".to_string()
            ),
            OfficeExtractError::NameCollision { .. } => Some(
                "Use --collision number to keep both files, or --collision last-write-wins to keep the later one.".to_string()
            ),
            OfficeExtractError::UnknownCategory { .. } => Some(
                "Supported types are: excel, word, powerpoint.".to_string()
            ),
            OfficeExtractError::Config { .. } => Some(
                "Check your configuration file syntax and ensure all required fields are present.".to_string()
            ),
            OfficeExtractError::FileTooLarge { .. } => Some(
                "Increase the maximum entry size with --max-size.".to_string()
            ),
            OfficeExtractError::OutputExists { .. } => Some(
                "Remove the existing file, choose a different name with --output, or use --force to overwrite.".to_string()
            ),
            _ => None,
        }
    }
}

impl OfficeExtractError {
    /// Classifies a failure while reading archive data. Checksum mismatches,
    /// corrupt deflate streams and truncated entries mean a damaged archive;
    /// anything else stays a storage error.
    pub(crate) fn from_archive_read(error: std::io::Error) -> Self {
        match error.kind() {
            ErrorKind::InvalidData | ErrorKind::InvalidInput | ErrorKind::UnexpectedEof => {
                OfficeExtractError::InvalidArchive {
                    message: format!("corrupt entry data ({})", error),
                    source: Some(zip::result::ZipError::Io(error)),
                }
            }
            _ => OfficeExtractError::Io(error),
        }
    }
}

impl From<zip::result::ZipError> for OfficeExtractError {
    fn from(error: zip::result::ZipError) -> Self {
        match error {
            zip::result::ZipError::Io(e) => OfficeExtractError::from_archive_read(e),
            other => OfficeExtractError::InvalidArchive {
                message: other.to_string(),
                source: Some(other),
            },
        }
    }
}

impl From<toml::de::Error> for OfficeExtractError {
    fn from(error: toml::de::Error) -> Self {
        OfficeExtractError::Config {
            message: error.to_string(),
        }
    }
}

impl From<regex::Error> for OfficeExtractError {
    fn from(error: regex::Error) -> Self {
        OfficeExtractError::Config {
            message: format!("Invalid exclude pattern: {}", error),
        }
    }
}

pub type Result<T> = std::result::Result<T, OfficeExtractError>;

pub(crate) fn format_bytes(bytes: u64) -> String {
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
