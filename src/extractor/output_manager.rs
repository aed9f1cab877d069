use crate::error::{format_bytes, OfficeExtractError, Result};
use crate::extractor::repackager::{CollisionPolicy, NameCollision, PlannedEntry};
use crate::extractor::ExtractionProgress;
use crate::scanner::{ArchiveEntry, FileTypeCategory, SkippedEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub category: FileTypeCategory,
    pub output_file: Option<String>,
    pub extraction_summary: ExtractionSummary,
    pub files: Vec<FileInfo>,
    pub collisions: Vec<NameCollision>,
    pub skipped: Vec<SkippedEntry>,
    pub extraction_time: DateTime<Utc>,
    pub config_used: ConfigSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub entries_scanned: usize,
    pub files_selected: usize,
    /// Distinct source folders the selected files came from.
    pub folders: usize,
    pub files_written: usize,
    pub bytes_written: u64,
    pub scratch_bytes: u64,
    pub extraction_duration: Duration,
    pub files_by_extension: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub archive_path: String,
    pub final_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub rename: bool,
    pub submission_infix: String,
    pub collision_policy: CollisionPolicy,
    pub compression_level: u8,
    pub max_file_size: u64,
}

impl From<&PlannedEntry> for FileInfo {
    fn from(entry: &PlannedEntry) -> Self {
        Self {
            archive_path: entry.archive_path.clone(),
            final_name: entry.final_name.clone(),
        }
    }
}

/// Everything the pipeline learned during one run.
pub struct RunRecord<'a> {
    pub category: FileTypeCategory,
    pub entries_scanned: usize,
    pub selected: &'a [ArchiveEntry],
    pub folders: usize,
    pub written: &'a [PlannedEntry],
    pub collisions: Vec<NameCollision>,
    pub skipped: Vec<SkippedEntry>,
    pub progress: &'a ExtractionProgress,
    pub bytes_written: u64,
    pub scratch_bytes: u64,
}

impl ExtractionReport {
    pub fn build(record: RunRecord<'_>, config: &ConfigSnapshot) -> Self {
        let mut files_by_extension = BTreeMap::new();
        for entry in record.selected {
            *files_by_extension.entry(entry.extension.clone()).or_insert(0) += 1;
        }

        ExtractionReport {
            category: record.category,
            output_file: None,
            extraction_summary: ExtractionSummary {
                entries_scanned: record.entries_scanned,
                files_selected: record.selected.len(),
                folders: record.folders,
                files_written: record.written.len(),
                bytes_written: record.bytes_written,
                scratch_bytes: record.scratch_bytes,
                extraction_duration: record.progress.elapsed(),
                files_by_extension,
            },
            files: record.written.iter().map(FileInfo::from).collect(),
            collisions: record.collisions,
            skipped: record.skipped,
            extraction_time: Utc::now(),
            config_used: config.clone(),
        }
    }

    pub fn has_warnings(&self) -> bool {
        !self.collisions.is_empty() || !self.skipped.is_empty()
    }

    pub fn display_summary(&self) -> String {
        format!(
            "{} of {} entries selected, {} written ({})",
            self.extraction_summary.files_selected,
            self.extraction_summary.entries_scanned,
            self.extraction_summary.files_written,
            format_bytes(self.extraction_summary.bytes_written)
        )
    }
}

/// What a run would write, computed without touching the filesystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionPlan {
    pub category: FileTypeCategory,
    pub entries_scanned: usize,
    pub files: Vec<FileInfo>,
    pub collisions: Vec<NameCollision>,
    pub skipped: Vec<SkippedEntry>,
}

/// Persists the output archive next to its final location, then renames it into place.
pub struct OutputManager {
    output_path: PathBuf,
    force_overwrite: bool,
}

impl OutputManager {
    pub fn new(base_path: &Path, file_name: &str) -> Self {
        Self::for_path(base_path.join(sanitize_filename(file_name)))
    }

    pub fn for_path(output_path: PathBuf) -> Self {
        Self {
            output_path,
            force_overwrite: false,
        }
    }

    pub fn with_force_overwrite(mut self, force: bool) -> Self {
        self.force_overwrite = force;
        self
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Fails early when the destination cannot be used.
    pub fn check_destination(&self) -> Result<()> {
        if self.output_path.exists() && !self.force_overwrite {
            return Err(OfficeExtractError::OutputExists {
                path: self.output_path.display().to_string(),
            });
        }

        if self.output_path.is_dir() {
            return Err(OfficeExtractError::InvalidPath {
                path: format!("{} is a directory", self.output_path.display()),
            });
        }

        Ok(())
    }

    pub fn write_archive(&self, bytes: &[u8]) -> Result<&Path> {
        self.check_destination()?;

        let parent = match self.output_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let mut temp = NamedTempFile::new_in(&parent)?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;

        let persisted = if self.force_overwrite {
            temp.persist(&self.output_path)
        } else {
            temp.persist_noclobber(&self.output_path)
        };
        persisted.map_err(|e| match e.error.kind() {
            std::io::ErrorKind::AlreadyExists => OfficeExtractError::OutputExists {
                path: self.output_path.display().to_string(),
            },
            _ => OfficeExtractError::Io(e.error),
        })?;

        log::info!("Wrote {} ({})", self.output_path.display(), format_bytes(bytes.len() as u64));
        Ok(&self.output_path)
    }

    /// Writes the report as pretty JSON beside the archive (`<archive>.report.json`).
    pub fn write_report(&self, report: &ExtractionReport) -> Result<PathBuf> {
        let mut report_name = self
            .output_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        report_name.push(".report.json");
        let report_path = self.output_path.with_file_name(report_name);

        let json_content =
            serde_json::to_string_pretty(report).map_err(|e| OfficeExtractError::Config {
                message: format!("Failed to serialize report to JSON: {}", e),
            })?;

        fs::write(&report_path, json_content)?;
        Ok(report_path)
    }
}

/// Replaces characters that are not allowed in file names on common platforms.
pub fn sanitize_filename(name: &str) -> String {
    let mut sanitized = String::new();

    for ch in name.chars() {
        match ch {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => sanitized.push('_'),
            '/' | '\\' => sanitized.push('_'),
            c if c.is_control() => sanitized.push('_'),
            c => sanitized.push(c),
        }
    }

    let sanitized = sanitized.trim_end_matches(&['.', ' '][..]).to_string();

    if sanitized.is_empty() {
        "unnamed_file".to_string()
    } else {
        sanitized
    }
}
