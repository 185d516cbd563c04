//! Validation outcomes
//!
//! Every public operation of the engine resolves to a [`ValidationOutcome`]:
//! an acceptance flag, a human-readable message and, for rejections, a
//! machine-readable [`ErrorKind`]. Callers branch on `accepted` (or `code`),
//! never on the message text.

use serde::{Deserialize, Serialize};

use crate::error::PrevalidationError;

/// Message attached to every accepted file
pub const ACCEPTED_MESSAGE: &str = "Pre-valid file!";

/// Category of a rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Path missing or unreadable
    NotFound,
    /// Unrecognized extension at any nesting level
    UnsupportedFormat,
    /// Corrupt archive, wrong entry count or invalid inner entry
    MalformedArchive,
    /// Bad encoding, unparsable header, missing structural markers
    MalformedContent,
    /// Well-formed file that does not declare a required or target model
    PolicyViolation,
    /// I/O or store-access faults not otherwise classified
    InternalIoFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::UnsupportedFormat => "unsupported_format",
            ErrorKind::MalformedArchive => "malformed_archive",
            ErrorKind::MalformedContent => "malformed_content",
            ErrorKind::PolicyViolation => "policy_violation",
            ErrorKind::InternalIoFailure => "internal_io_failure",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of pre-validating one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub accepted: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub code: Option<ErrorKind>,
}

impl ValidationOutcome {
    /// Outcome for a file that passed every check
    pub fn accepted() -> Self {
        Self {
            accepted: true,
            message: ACCEPTED_MESSAGE.to_string(),
            code: None,
        }
    }

    /// Outcome for a rejected file
    pub fn rejected(code: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            accepted: false,
            message: message.into(),
            code: Some(code),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted
    }
}

impl From<PrevalidationError> for ValidationOutcome {
    fn from(error: PrevalidationError) -> Self {
        ValidationOutcome::rejected(error.kind(), error.to_string())
    }
}

impl From<crate::error::Result<()>> for ValidationOutcome {
    fn from(result: crate::error::Result<()>) -> Self {
        match result {
            Ok(()) => ValidationOutcome::accepted(),
            Err(error) => error.into(),
        }
    }
}
