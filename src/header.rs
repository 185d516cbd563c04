//! XTF header model extraction
//!
//! INTERLIS transfer files can be very large, so the declared models are read
//! without parsing the whole file:
//!
//! 1. The file is streamed line by line into a [`HeaderScanner`], which keeps
//!    only the text from the `<HEADERSECTION` marker onwards and stops at the
//!    first complete `<HEADERSECTION ...>...</HEADERSECTION>` region.
//! 2. That fragment alone is handed to libxml2, which reads the `NAME`
//!    attribute of every child of its `MODELS` element.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::debug;

use crate::error::{PrevalidationError, Result};
use crate::libxml2::LibXml2Wrapper;
use crate::policy::ModelSet;

const HEADER_CLOSE: &str = "</HEADERSECTION>";
const MODELS_ELEMENT: &str = "MODELS";
const MODEL_NAME_ATTRIBUTE: &str = "NAME";

/// Cached regex for the header open marker
static HEADER_OPEN_REGEX: OnceLock<Regex> = OnceLock::new();

/// Cached regex for a complete header region
static HEADER_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_header_open_regex() -> &'static Regex {
    HEADER_OPEN_REGEX.get_or_init(|| {
        Regex::new(r"<HEADERSECTION\b").expect("Failed to compile header open regex")
    })
}

/// Smallest region from an open marker to the next close marker
fn get_header_regex() -> &'static Regex {
    HEADER_REGEX.get_or_init(|| {
        Regex::new(r"(?s)<HEADERSECTION\b[^>]*>.*?</HEADERSECTION>")
            .expect("Failed to compile header regex")
    })
}

/// Result of a bounded header scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderFragment {
    /// Text from the open marker through the matching close marker
    Found(String),
    /// Input ended before a complete header region was seen
    NotFound,
}

/// Incremental search for the header region
///
/// Text before the open marker is discarded as it arrives; once the marker is
/// seen, lines accumulate until a close marker completes the region.
#[derive(Debug, Default)]
pub struct HeaderScanner {
    region: Option<String>,
}

impl HeaderScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next line (without its terminator). Returns the header
    /// fragment as soon as it is complete.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        if let Some(region) = self.region.as_mut() {
            region.push('\n');
            region.push_str(line);
        } else {
            let start = get_header_open_regex().find(line)?.start();
            self.region = Some(line[start..].to_string());
        }

        if !line.contains(HEADER_CLOSE) {
            return None;
        }

        get_header_regex()
            .find(self.region.as_deref()?)
            .map(|found| found.as_str().to_string())
    }

    /// Whether the open marker has been seen
    pub fn in_header(&self) -> bool {
        self.region.is_some()
    }
}

/// Scan already-decoded text for the header region
pub fn scan_header(text: &str) -> HeaderFragment {
    let mut scanner = HeaderScanner::new();
    for line in text.lines() {
        if let Some(fragment) = scanner.push_line(line) {
            return HeaderFragment::Found(fragment);
        }
    }
    HeaderFragment::NotFound
}

/// Reads the models an XTF file declares in its header
#[derive(Debug, Default)]
pub struct HeaderModelExtractor {
    libxml2: LibXml2Wrapper,
}

impl HeaderModelExtractor {
    pub fn new() -> Self {
        Self {
            libxml2: LibXml2Wrapper::new(),
        }
    }

    /// Extract the declared model names of the XTF file at `path`
    pub async fn extract_models(&self, path: &Path) -> Result<ModelSet> {
        let file = File::open(path)
            .await
            .map_err(|e| Self::read_error(path, e))?;

        let fragment = Self::scan_reader(file)
            .await
            .map_err(|e| Self::read_error(path, e))?;

        let models = self.models_from_fragment(path, &fragment)?;
        debug!(path = %path.display(), %models, "models declared in XTF header");
        Ok(models)
    }

    /// Stream `reader` line by line until the header region is complete
    pub async fn scan_reader<R>(reader: R) -> std::io::Result<HeaderFragment>
    where
        R: AsyncRead + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();
        let mut scanner = HeaderScanner::new();

        while let Some(line) = lines.next_line().await? {
            if let Some(fragment) = scanner.push_line(&line) {
                return Ok(HeaderFragment::Found(fragment));
            }
        }

        Ok(HeaderFragment::NotFound)
    }

    /// Model names declared by a header fragment; a missing header yields an
    /// empty set and is left to the policy to reject
    pub fn models_from_fragment(&self, path: &Path, fragment: &HeaderFragment) -> Result<ModelSet> {
        let text = match fragment {
            HeaderFragment::Found(text) => text,
            HeaderFragment::NotFound => return Ok(ModelSet::new()),
        };

        let names = self
            .libxml2
            .child_attribute_values(text.as_bytes(), MODELS_ELEMENT, MODEL_NAME_ATTRIBUTE)
            .map_err(|e| PrevalidationError::Unparsable {
                path: path.to_path_buf(),
                details: e.to_string(),
            })?;

        Ok(names.into_iter().collect())
    }

    fn read_error(path: &Path, error: std::io::Error) -> PrevalidationError {
        match error.kind() {
            std::io::ErrorKind::InvalidData => PrevalidationError::InvalidEncoding {
                path: path.to_path_buf(),
            },
            _ => PrevalidationError::Unparsable {
                path: path.to_path_buf(),
                details: error.to_string(),
            },
        }
    }
}
