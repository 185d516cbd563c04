//! Validation Orchestrator
//!
//! [`Prevalidator::validate`] is total: every failure, from a missing file to
//! a policy violation, comes back as a rejected [`ValidationOutcome`].
//!
//! Archives are handled by two mutually recursive operations:
//! [`Prevalidator::validate_at_depth`] dispatches on the container tag and
//! hands archives to [`Prevalidator::resolve_archive`], which unpacks the
//! single entry and re-enters `validate_at_depth` one level deeper. Archives
//! are never opened beyond [`MAX_ARCHIVE_DEPTH`].

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::archive::ArchiveResolver;
use crate::classifier::{ContainerTag, classify, dotted_extension};
use crate::config::Config;
use crate::error::{PrevalidationError, Result};
use crate::geopackage::GeoPackageModelExtractor;
use crate::header::HeaderModelExtractor;
use crate::outcome::{ErrorKind, ValidationOutcome};
use crate::policy::RequiredModelPolicy;

/// Deepest level at which an archive is still unpacked; the top-level file
/// is depth 0
pub const MAX_ARCHIVE_DEPTH: usize = 1;

/// Outcome of pre-validating one file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    /// Path as given by the caller
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: ValidationOutcome,
    /// Wall time spent on this file
    pub duration: Duration,
}

/// Aggregated outcomes of pre-validating several files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrevalidationReport {
    /// Total number of files processed
    pub total_files: usize,
    /// Number of accepted files
    pub accepted_files: usize,
    /// Number of rejected files
    pub rejected_files: usize,
    /// Rejections per error kind
    pub rejections_by_kind: BTreeMap<ErrorKind, usize>,
    /// Total duration of pre-validation
    pub total_duration: Duration,
    /// Average duration per file
    pub average_duration: Duration,
    /// Individual file outcomes, in input order
    pub file_outcomes: Vec<FileOutcome>,
}

impl PrevalidationReport {
    /// Aggregate individual file outcomes into a summary
    pub fn aggregate(file_outcomes: Vec<FileOutcome>) -> Self {
        let total_files = file_outcomes.len();
        let mut accepted_files = 0;
        let mut rejections_by_kind = BTreeMap::new();
        let mut total_duration = Duration::ZERO;

        for file in &file_outcomes {
            if file.outcome.accepted {
                accepted_files += 1;
            } else if let Some(code) = file.outcome.code {
                *rejections_by_kind.entry(code).or_insert(0) += 1;
            }
            total_duration += file.duration;
        }

        let average_duration = if total_files > 0 {
            total_duration / total_files as u32
        } else {
            Duration::ZERO
        };

        Self {
            total_files,
            accepted_files,
            rejected_files: total_files - accepted_files,
            rejections_by_kind,
            total_duration,
            average_duration,
            file_outcomes,
        }
    }

    /// Check if every file was accepted
    pub fn all_accepted(&self) -> bool {
        self.accepted_files == self.total_files && self.total_files > 0
    }

    pub fn has_rejections(&self) -> bool {
        self.rejected_files > 0
    }

    /// Get acceptance rate as a percentage
    pub fn acceptance_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.accepted_files as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Pre-validation engine: container dispatch, model discovery and policy
///
/// Holds no state between calls; every archive gets its own extraction
/// directory and every GeoPackage its own connection, so one instance can
/// serve concurrent calls.
#[derive(Debug)]
pub struct Prevalidator {
    policy: RequiredModelPolicy,
    archives: ArchiveResolver,
    header: HeaderModelExtractor,
    geopackage: GeoPackageModelExtractor,
}

impl Prevalidator {
    /// Create an engine enforcing `policy`, extracting archives into the
    /// system temporary directory
    pub fn new(policy: RequiredModelPolicy) -> Self {
        Self {
            policy,
            archives: ArchiveResolver::new(),
            header: HeaderModelExtractor::new(),
            geopackage: GeoPackageModelExtractor::new(),
        }
    }

    /// Create an engine from loaded configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let archives = ArchiveResolver::new()
            .with_temp_root(config.archive.temp_dir.clone())
            .with_max_entry_size(config.archive.max_entry_size_bytes());

        Ok(Self::new(config.policy()?).with_archive_resolver(archives))
    }

    pub fn with_archive_resolver(mut self, archives: ArchiveResolver) -> Self {
        self.archives = archives;
        self
    }

    pub fn policy(&self) -> &RequiredModelPolicy {
        &self.policy
    }

    pub fn archive_resolver(&self) -> &ArchiveResolver {
        &self.archives
    }

    /// Pre-validate the file at `path`
    pub async fn validate(&self, path: &Path) -> ValidationOutcome {
        let outcome = self.validate_at_depth(path, 0).await;
        debug!(
            path = %path.display(),
            accepted = outcome.accepted,
            message = %outcome.message,
            "pre-validation finished"
        );
        outcome
    }

    /// Pre-validate `path`, reached through `depth` levels of archives
    pub fn validate_at_depth<'a>(
        &'a self,
        path: &'a Path,
        depth: usize,
    ) -> Pin<Box<dyn Future<Output = ValidationOutcome> + 'a>> {
        Box::pin(async move {
            if let Err(e) = Self::ensure_readable(path).await {
                return e.into();
            }

            let tag = classify(path);
            debug!(path = %path.display(), ?tag, depth, "dispatching file");

            match tag {
                ContainerTag::Archive => self.resolve_archive(path, depth).await,
                tag => self.validate_container(path, tag).await.into(),
            }
        })
    }

    /// Unpack the archive at `path` and validate its entry one level deeper.
    ///
    /// The entry's outcome is returned unchanged. The extraction directory is
    /// removed afterwards; a failed removal is only logged.
    pub async fn resolve_archive(&self, path: &Path, depth: usize) -> ValidationOutcome {
        if depth >= MAX_ARCHIVE_DEPTH {
            return PrevalidationError::NestedArchive {
                path: path.to_path_buf(),
                max_depth: MAX_ARCHIVE_DEPTH,
            }
            .into();
        }

        let extracted = match self.archives.unpack(path).await {
            Ok(extracted) => extracted,
            Err(e) => return e.into(),
        };

        let outcome = self.validate_at_depth(extracted.path(), depth + 1).await;

        let dir = extracted.dir().to_path_buf();
        if let Err(e) = extracted.close() {
            warn!(dir = %dir.display(), error = %e, "failed to remove extraction directory");
        }

        outcome
    }

    /// Validate several files one after another
    pub async fn validate_paths(&self, paths: &[PathBuf]) -> PrevalidationReport {
        let mut file_outcomes = Vec::with_capacity(paths.len());

        for path in paths {
            let start_time = Instant::now();
            let outcome = self.validate(path).await;
            file_outcomes.push(FileOutcome {
                path: path.clone(),
                outcome,
                duration: start_time.elapsed(),
            });
        }

        PrevalidationReport::aggregate(file_outcomes)
    }

    async fn validate_container(&self, path: &Path, tag: ContainerTag) -> Result<()> {
        let models = match tag {
            ContainerTag::TextContainer => self.header.extract_models(path).await?,
            ContainerTag::StructuredStore => self.geopackage.extract_models(path).await?,
            ContainerTag::Archive | ContainerTag::Unknown => {
                return Err(PrevalidationError::InvalidExtension {
                    extension: dotted_extension(path),
                });
            }
        };

        self.policy.evaluate(&models)
    }

    /// The path must name an existing regular file that can be opened
    async fn ensure_readable(path: &Path) -> Result<()> {
        let not_found = || PrevalidationError::FileNotFound {
            path: path.to_path_buf(),
        };

        let metadata = tokio::fs::metadata(path).await.map_err(|_| not_found())?;
        if !metadata.is_file() {
            return Err(not_found());
        }
        tokio::fs::File::open(path).await.map_err(|_| not_found())?;
        Ok(())
    }
}

impl Default for Prevalidator {
    fn default() -> Self {
        Self::new(RequiredModelPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn xtf_declaring(models: &[&str]) -> String {
        let models: String = models
            .iter()
            .map(|name| format!("<MODEL NAME=\"{}\" VERSION=\"1\" URI=\"x\"/>", name))
            .collect();
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<TRANSFER>\n<HEADERSECTION VERSION=\"2.3\">\n<MODELS>{}</MODELS>\n</HEADERSECTION>\n<DATASECTION/>\n</TRANSFER>\n",
            models
        )
    }

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let mut writer = zip::ZipWriter::new(std::fs::File::create(path).unwrap());
        for (name, content) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
    }

    fn engine(required: &[&str], extract_root: &Path) -> Prevalidator {
        let policy = RequiredModelPolicy::any_of(required.iter().copied()).unwrap();
        Prevalidator::new(policy).with_archive_resolver(
            ArchiveResolver::new().with_temp_root(Some(extract_root.to_path_buf())),
        )
    }

    fn is_empty_dir(path: &Path) -> bool {
        std::fs::read_dir(path).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_missing_file() {
        let extract_root = TempDir::new().unwrap();
        let outcome = engine(&["M1"], extract_root.path())
            .validate(Path::new("/definitely/not/here.xtf"))
            .await;

        assert!(!outcome.accepted);
        assert_eq!(outcome.code, Some(ErrorKind::NotFound));
        assert!(outcome.message.contains("does not exist"));
    }

    #[tokio::test]
    async fn test_directory_is_not_a_file() {
        let dir = TempDir::new().unwrap();
        let xtf_dir = dir.path().join("folder.xtf");
        std::fs::create_dir(&xtf_dir).unwrap();

        let outcome = engine(&["M1"], dir.path()).validate(&xtf_dir).await;
        assert_eq!(outcome.code, Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_unknown_extension_names_it() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.TXT");
        std::fs::write(&path, "hello").unwrap();

        let outcome = engine(&["M1"], dir.path()).validate(&path).await;
        assert_eq!(outcome.code, Some(ErrorKind::UnsupportedFormat));
        assert!(outcome.message.contains(".txt"));
    }

    #[tokio::test]
    async fn test_xtf_accepted_and_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.xtf");
        std::fs::write(&path, xtf_declaring(&["M1"])).unwrap();

        let accepted = engine(&["M1"], dir.path()).validate(&path).await;
        assert_eq!(accepted, ValidationOutcome::accepted());

        let rejected = engine(&["M2"], dir.path()).validate(&path).await;
        assert_eq!(rejected.code, Some(ErrorKind::PolicyViolation));
        assert!(rejected.message.contains("M2"));
    }

    #[tokio::test]
    async fn test_archive_outcome_matches_inner_file() {
        let input = TempDir::new().unwrap();
        let extract_root = TempDir::new().unwrap();
        let archive = input.path().join("data.zip");
        write_zip(&archive, &[("data.xtf", xtf_declaring(&["M1"]).as_bytes())]);

        let accepted = engine(&["M1"], extract_root.path()).validate(&archive).await;
        assert!(accepted.accepted);

        let rejected = engine(&["M2"], extract_root.path()).validate(&archive).await;
        assert_eq!(rejected.code, Some(ErrorKind::PolicyViolation));

        assert!(is_empty_dir(extract_root.path()));
    }

    #[tokio::test]
    async fn test_archive_below_max_depth_is_nested() {
        let input = TempDir::new().unwrap();
        let extract_root = TempDir::new().unwrap();
        let archive = input.path().join("data.zip");
        write_zip(&archive, &[("data.xtf", xtf_declaring(&["M1"]).as_bytes())]);

        let engine = engine(&["M1"], extract_root.path());
        let outcome = engine.resolve_archive(&archive, MAX_ARCHIVE_DEPTH).await;
        assert_eq!(outcome.code, Some(ErrorKind::MalformedArchive));
        assert!(outcome.message.contains("Nested"));

        let outcome = engine.validate_at_depth(&archive, MAX_ARCHIVE_DEPTH).await;
        assert_eq!(outcome.code, Some(ErrorKind::MalformedArchive));
        assert!(is_empty_dir(extract_root.path()));
    }

    #[tokio::test]
    async fn test_validate_paths_report() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.xtf");
        let bad = dir.path().join("bad.xtf");
        std::fs::write(&good, xtf_declaring(&["M1"])).unwrap();
        std::fs::write(&bad, xtf_declaring(&["Other"])).unwrap();
        let missing = dir.path().join("missing.gpkg");

        let report = engine(&["M1"], dir.path())
            .validate_paths(&[good.clone(), bad, missing])
            .await;

        assert_eq!(report.total_files, 3);
        assert_eq!(report.accepted_files, 1);
        assert_eq!(report.rejected_files, 2);
        assert_eq!(report.rejections_by_kind.get(&ErrorKind::PolicyViolation), Some(&1));
        assert_eq!(report.rejections_by_kind.get(&ErrorKind::NotFound), Some(&1));
        assert_eq!(report.file_outcomes[0].path, good);
        assert!(report.has_rejections());
        assert!(!report.all_accepted());
    }

    #[test]
    fn test_empty_report() {
        let report = PrevalidationReport::aggregate(vec![]);
        assert_eq!(report.total_files, 0);
        assert_eq!(report.average_duration, Duration::ZERO);
        assert_eq!(report.acceptance_rate(), 0.0);
        assert!(!report.all_accepted());
        assert!(!report.has_rejections());
    }

    #[test]
    fn test_report_json_flattens_outcome() {
        let report = PrevalidationReport::aggregate(vec![FileOutcome {
            path: PathBuf::from("a.xtf"),
            outcome: ValidationOutcome::rejected(ErrorKind::PolicyViolation, "no models"),
            duration: Duration::from_millis(3),
        }]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["file_outcomes"][0]["accepted"], false);
        assert_eq!(json["file_outcomes"][0]["code"], "policy_violation");
        assert_eq!(json["rejections_by_kind"]["policy_violation"], 1);
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.policy.required_models = vec!["M1".to_string()];
        config.archive.max_entry_size_mb = 2;

        let engine = Prevalidator::from_config(&config).unwrap();
        assert_eq!(engine.policy().required_any_of(), &["M1".to_string()]);
        assert_eq!(engine.archive_resolver().max_entry_size(), 2 * 1024 * 1024);

        config.policy.required_models.clear();
        assert!(Prevalidator::from_config(&config).is_err());
    }
}
