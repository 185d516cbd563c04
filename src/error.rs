use std::path::PathBuf;

use thiserror::Error;

use crate::outcome::ErrorKind;

/// Every way a pre-validation can fail before or during policy evaluation
#[derive(Error, Debug)]
pub enum PrevalidationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File does not exist or is not readable: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid file extension ('{extension}')")]
    InvalidExtension { extension: String },

    #[error("Cannot decompress archive: {path} - {details}")]
    CannotDecompress { path: PathBuf, details: String },

    #[error("Empty archive: {path}")]
    EmptyArchive { path: PathBuf },

    #[error("Archive must contain a single file, found more than one file ({count} entries)")]
    MultipleEntries { count: usize },

    #[error("Invalid inner extension ('{extension}') for archive entry {entry}")]
    InvalidInnerExtension { entry: String, extension: String },

    #[error("Nested archives are not supported: {path} (max depth {max_depth})")]
    NestedArchive { path: PathBuf, max_depth: usize },

    #[error("Archive entry {entry} is too large: {size} bytes exceeds limit of {limit} bytes")]
    EntryTooLarge { entry: String, size: u64, limit: u64 },

    #[error("Invalid file encoding: {path}")]
    InvalidEncoding { path: PathBuf },

    #[error("File could not be parsed: {path} - {details}")]
    Unparsable { path: PathBuf, details: String },

    #[error("Not a GeoPackage file: {path} - {details}")]
    NotGeoPackage { path: PathBuf, details: String },

    #[error("Missing spatial reference structure ({table}) in {path}")]
    MissingSpatialReference { path: PathBuf, table: String },

    #[error("Missing required schema-mapping structure ({table}) in {path}")]
    MissingSchemaMapping { path: PathBuf, table: String },

    #[error("Malformed model entry: '{entry}'")]
    MalformedModelEntry { entry: String },

    #[error("Problem accessing the GeoPackage: {path} - {details}")]
    StoreAccess { path: PathBuf, details: String },

    #[error("File does not include any of the required models: {}", required.join(", "))]
    MissingRequiredModels { required: Vec<String> },

    #[error("File does not include the target model: {target}")]
    MissingTargetModel { target: String },

    #[error("Invalid model policy: {details}")]
    InvalidPolicy { details: String },

    #[error("Concurrent operation error: {details}")]
    Concurrency { details: String },
}

impl PrevalidationError {
    /// Machine-readable category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            PrevalidationError::FileNotFound { .. } => ErrorKind::NotFound,
            PrevalidationError::InvalidExtension { .. } => ErrorKind::UnsupportedFormat,
            PrevalidationError::CannotDecompress { .. }
            | PrevalidationError::EmptyArchive { .. }
            | PrevalidationError::MultipleEntries { .. }
            | PrevalidationError::InvalidInnerExtension { .. }
            | PrevalidationError::NestedArchive { .. }
            | PrevalidationError::EntryTooLarge { .. } => ErrorKind::MalformedArchive,
            PrevalidationError::InvalidEncoding { .. }
            | PrevalidationError::Unparsable { .. }
            | PrevalidationError::NotGeoPackage { .. }
            | PrevalidationError::MissingSpatialReference { .. }
            | PrevalidationError::MissingSchemaMapping { .. }
            | PrevalidationError::MalformedModelEntry { .. } => ErrorKind::MalformedContent,
            PrevalidationError::MissingRequiredModels { .. }
            | PrevalidationError::MissingTargetModel { .. }
            | PrevalidationError::InvalidPolicy { .. } => ErrorKind::PolicyViolation,
            PrevalidationError::Io(_)
            | PrevalidationError::StoreAccess { .. }
            | PrevalidationError::Concurrency { .. } => ErrorKind::InternalIoFailure,
        }
    }
}

/// LibXML2-specific error types
#[derive(Error, Debug)]
pub enum LibXml2Error {
    #[error("Reader creation failed")]
    ReaderCreationFailed,

    #[error("Invalid XML structure (reader code {code})")]
    MalformedXml { code: i32 },

    #[error("Input of {size} bytes is too large for libxml2")]
    InputTooLarge { size: usize },

    #[error("Invalid XML name: {name:?}")]
    InvalidName { name: String },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, PrevalidationError>;

/// LibXML2 result type alias
pub type LibXml2Result<T> = std::result::Result<T, LibXml2Error>;
