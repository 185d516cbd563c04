//! # ili-prevalidator Library
//!
//! Cheap pre-validation of INTERLIS data deliveries: decides whether an XTF
//! transfer file, an ili2db GeoPackage, or a ZIP archive wrapping one of them
//! declares the required data models before it is handed to a full
//! (expensive) validator.

pub mod archive;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod geopackage;
pub mod header;
pub mod libxml2;
pub mod model_graph;
pub mod outcome;
pub mod output;
pub mod policy;
pub mod validator;

pub use archive::{ArchiveResolver, ExtractedEntry};
pub use classifier::{ContainerTag, classify};
pub use cli::{Cli, OutputFormat, VerbosityLevel};
pub use config::{Config, ConfigError, ConfigManager};
pub use error::{LibXml2Error, PrevalidationError};
pub use geopackage::GeoPackageModelExtractor;
pub use header::{HeaderFragment, HeaderModelExtractor, HeaderScanner};
pub use libxml2::LibXml2Wrapper;
pub use model_graph::{ModelDependencyGraph, parse_registry_entry};
pub use outcome::{ErrorKind, ValidationOutcome};
pub use output::Output;
pub use policy::{ModelSet, RequiredModelPolicy};
pub use validator::{FileOutcome, MAX_ARCHIVE_DEPTH, PrevalidationReport, Prevalidator};
