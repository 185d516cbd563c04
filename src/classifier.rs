use std::path::Path;

use serde::{Deserialize, Serialize};

/// Container format of a candidate file, derived from its extension only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerTag {
    /// Single-entry ZIP archive
    Archive,
    /// INTERLIS transfer file (XTF)
    TextContainer,
    /// GeoPackage written by ili2db
    StructuredStore,
    Unknown,
}

impl ContainerTag {
    /// Whether an archive may wrap this container
    pub fn is_archive_payload(&self) -> bool {
        matches!(self, ContainerTag::TextContainer | ContainerTag::StructuredStore)
    }
}

/// Lower-cased extension of `path`, without the dot ("" if none)
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Extension of `path` with its leading dot, as shown to operators
pub fn dotted_extension(path: &Path) -> String {
    match extension_of(path) {
        ext if ext.is_empty() => ext,
        ext => format!(".{}", ext),
    }
}

/// Classify a path by its extension, case-insensitively
pub fn classify(path: &Path) -> ContainerTag {
    match extension_of(path).as_str() {
        "zip" => ContainerTag::Archive,
        "xtf" => ContainerTag::TextContainer,
        "gpkg" => ContainerTag::StructuredStore,
        _ => ContainerTag::Unknown,
    }
}
