//! Single-entry ZIP unpacking
//!
//! An acceptable archive holds exactly one entry whose name classifies as an
//! XTF or GeoPackage file. Entry count, inner extension and declared size are
//! all checked before anything is written, so a rejected archive never leaves
//! files behind. The accepted entry is copied into a fresh, uniquely named
//! temporary directory owned by the returned [`ExtractedEntry`].

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::classifier::{classify, dotted_extension};
use crate::error::{PrevalidationError, Result};

/// Prefix of every extraction directory
pub const TEMP_DIR_PREFIX: &str = "ili-prevalidator-";

/// Default upper bound for the declared uncompressed size of the entry
pub const DEFAULT_MAX_ENTRY_SIZE: u64 = 4096 * 1024 * 1024;

/// An archive entry extracted to disk
///
/// Dropping this removes the extraction directory; [`ExtractedEntry::close`]
/// does the same but reports a failed removal.
#[derive(Debug)]
pub struct ExtractedEntry {
    dir: TempDir,
    path: PathBuf,
}

impl ExtractedEntry {
    /// Path of the extracted file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the extracted file
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the extraction directory and everything in it
    pub fn close(self) -> std::io::Result<()> {
        self.dir.close()
    }
}

/// Unpacks single-entry ZIP archives
#[derive(Debug, Clone)]
pub struct ArchiveResolver {
    temp_root: Option<PathBuf>,
    max_entry_size: u64,
}

impl ArchiveResolver {
    pub fn new() -> Self {
        Self {
            temp_root: None,
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
        }
    }

    /// Create extraction directories under `temp_root` instead of the system
    /// temporary directory
    pub fn with_temp_root(mut self, temp_root: Option<PathBuf>) -> Self {
        self.temp_root = temp_root;
        self
    }

    /// Reject entries declaring more than `max_entry_size` uncompressed bytes
    pub fn with_max_entry_size(mut self, max_entry_size: u64) -> Self {
        self.max_entry_size = max_entry_size;
        self
    }

    pub fn temp_root(&self) -> Option<&Path> {
        self.temp_root.as_deref()
    }

    pub fn max_entry_size(&self) -> u64 {
        self.max_entry_size
    }

    /// Unpack the archive at `path` on the blocking thread pool
    pub async fn unpack(&self, path: &Path) -> Result<ExtractedEntry> {
        let resolver = self.clone();
        let path = path.to_path_buf();

        tokio::task::spawn_blocking(move || resolver.unpack_blocking(&path))
            .await
            .map_err(|e| PrevalidationError::Concurrency {
                details: format!("Join error: {}", e),
            })?
    }

    /// Check the archive at `path` and extract its sole entry
    pub fn unpack_blocking(&self, path: &Path) -> Result<ExtractedEntry> {
        let cannot_decompress = |details: String| PrevalidationError::CannotDecompress {
            path: path.to_path_buf(),
            details,
        };

        let file = File::open(path)?;
        let mut archive = zip::ZipArchive::new(file).map_err(|e| cannot_decompress(e.to_string()))?;

        Self::validate_entry_count(path, archive.len())?;

        let mut entry = archive
            .by_index(0)
            .map_err(|e| cannot_decompress(e.to_string()))?;
        let entry_name = entry.name().to_string();

        let file_name = Self::validate_entry_name(&entry_name)?;
        self.validate_entry_size(&entry_name, entry.size())?;

        let dir = self.create_temp_dir()?;
        let target = dir.path().join(file_name);
        Self::copy_entry(&mut entry, &target).map_err(|e| cannot_decompress(e.to_string()))?;

        debug!(
            archive = %path.display(),
            entry = %entry_name,
            extracted = %target.display(),
            "extracted archive entry"
        );

        Ok(ExtractedEntry { dir, path: target })
    }

    fn validate_entry_count(path: &Path, count: usize) -> Result<()> {
        match count {
            0 => Err(PrevalidationError::EmptyArchive {
                path: path.to_path_buf(),
            }),
            1 => Ok(()),
            count => Err(PrevalidationError::MultipleEntries { count }),
        }
    }

    /// Base name of the entry if it classifies as an XTF or GeoPackage file
    fn validate_entry_name(entry_name: &str) -> Result<&str> {
        let invalid = || PrevalidationError::InvalidInnerExtension {
            entry: entry_name.to_string(),
            extension: dotted_extension(Path::new(entry_name)),
        };

        let file_name = entry_base_name(entry_name).ok_or_else(invalid)?;
        if !classify(Path::new(file_name)).is_archive_payload() {
            return Err(invalid());
        }
        Ok(file_name)
    }

    fn validate_entry_size(&self, entry_name: &str, size: u64) -> Result<()> {
        if size > self.max_entry_size {
            return Err(PrevalidationError::EntryTooLarge {
                entry: entry_name.to_string(),
                size,
                limit: self.max_entry_size,
            });
        }
        Ok(())
    }

    fn create_temp_dir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_DIR_PREFIX);

        let dir = match &self.temp_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    fn copy_entry(entry: &mut impl Read, target: &Path) -> std::io::Result<u64> {
        let mut output = File::create(target)?;
        std::io::copy(entry, &mut output)
    }
}

impl Default for ArchiveResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Last component of a ZIP entry name, `None` for directory-like names
pub fn entry_base_name(entry_name: &str) -> Option<&str> {
    entry_name
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
}
