pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod naming;
pub mod scanner;
pub mod ui;

#[cfg(test)]
mod test_support;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, Config, FilterConfig, NamingConfig, OutputConfig, WorkspaceConfig};
pub use error::{OfficeExtractError, Result, UserFriendlyError};

// Core functionality re-exports
pub use extractor::{
    CollisionPolicy, ConfigSnapshot, ExtractionPlan, ExtractionProgress, ExtractionReport,
    FileOperations, OutputManager, PlannedEntry, Repackager, ScratchSpace,
};
pub use naming::{RenameRule, StudentName};
pub use scanner::{ArchiveEntry, ArchiveScanner, FileFilter, FileTypeCategory};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressManager};

use extractor::{FileInfo, RunRecord};
use std::cell::Cell;
use std::fmt;
use std::path::{Path, PathBuf};

/// Where a run currently is. Any failure aborts from the stage it happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Scanning,
    Extracting,
    Renaming,
    Repackaging,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Scanning => "scanning",
            PipelineStage::Extracting => "extracting",
            PipelineStage::Renaming => "renaming",
            PipelineStage::Repackaging => "repackaging",
            PipelineStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Result of a successful run: the new archive plus what went into it.
#[derive(Debug)]
pub struct ProcessedArchive {
    pub archive: Vec<u8>,
    pub report: ExtractionReport,
    pub message: String,
}

/// Main library interface for office-extract functionality
pub struct OfficeExtract {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
    stage: Cell<PipelineStage>,
}

impl OfficeExtract {
    /// Create an instance that installs a Ctrl+C handler
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let shutdown = GracefulShutdown::new()?;
        Ok(Self::with_shutdown(config, output_mode, verbose, quiet, shutdown))
    }

    /// Create a silent instance without a signal handler (tests, embedding)
    pub fn new_detached(config: Config) -> Self {
        Self::with_shutdown(
            config,
            OutputMode::Plain,
            0,
            true,
            GracefulShutdown::detached(),
        )
    }

    fn with_shutdown(
        config: Config,
        output_mode: OutputMode,
        verbose: u8,
        quiet: bool,
        shutdown: GracefulShutdown,
    ) -> Self {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);

        Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
            stage: Cell::new(PipelineStage::Idle),
        }
    }

    /// Create an instance from CLI arguments
    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        };

        Self::new(config, output_mode, cli_args.verbose, cli_args.quiet)
    }

    /// Runs the whole pipeline on archive bytes and returns the repackaged archive.
    ///
    /// Scratch storage is released before this returns, whatever the outcome.
    pub fn process_archive(
        &self,
        input: &[u8],
        category: FileTypeCategory,
    ) -> Result<ProcessedArchive> {
        self.stage.set(PipelineStage::Idle);

        match self.run_pipeline(input, category) {
            Ok(processed) => {
                log::debug!("Pipeline stage: {} -> {}", self.stage.get(), PipelineStage::Done);
                self.stage.set(PipelineStage::Done);
                Ok(processed)
            }
            Err(e) => {
                log::error!("Pipeline aborted while {}: {}", self.current_stage(), e);
                Err(e)
            }
        }
    }

    fn run_pipeline(&self, input: &[u8], category: FileTypeCategory) -> Result<ProcessedArchive> {
        let scratch = ScratchSpace::acquire(self.config.workspace.scratch_root.as_deref())?;

        // Step 1: Scan the archive
        self.enter(PipelineStage::Scanning)?;
        self.output_formatter
            .start_operation(&format!("Scanning archive for {}", category.label()));
        let spinner = self.progress_manager.create_spinner("Reading archive entries");
        let mut archive = scanner::open_archive(input)?;
        let scanner = ArchiveScanner::new(FileFilter::new(category, &self.config.filters)?);
        let scan = scanner.scan(&mut archive)?;
        spinner.finish_and_clear();

        let folders = scan.folder_groups().len();
        self.output_formatter
            .debug(&scanner.get_statistics(&scan.entries).display_summary());
        self.output_formatter.info(&format!(
            "Selected {} {} from {} folder(s)",
            scan.entries.len(),
            category.label(),
            folders
        ));
        self.warn_on_empty_selection(category, scan.entries.len());

        // Step 2: Materialize selected entries
        self.enter(PipelineStage::Extracting)?;
        let (extracted, progress) = self.extract_files(&mut archive, &scan.entries, &scratch)?;
        self.output_formatter.print_extraction_summary(&progress);

        // Step 3: Compute final names
        self.enter(PipelineStage::Renaming)?;
        let rule = RenameRule::new(&self.config.naming);
        let planned: Vec<PlannedEntry> = extracted
            .iter()
            .map(|file| {
                PlannedEntry::new(
                    file.scratch_path.clone(),
                    rule.final_name(file.folder_name(), &file.file_name),
                    file.archive_path.clone(),
                )
            })
            .collect();

        // Step 4: Write the output archive
        self.enter(PipelineStage::Repackaging)?;
        let repackager = Repackager::new(
            self.config.output.collision_policy,
            self.config.output.compression_level,
        );
        let output = repackager.repackage(planned)?;

        let report = ExtractionReport::build(
            RunRecord {
                category,
                entries_scanned: scan.total_entries,
                selected: &scan.entries,
                folders,
                written: &output.entries,
                collisions: output.collisions,
                skipped: scan.skipped,
                progress: &progress,
                bytes_written: output.bytes_written,
                scratch_bytes: scratch.disk_usage(),
            },
            &self.create_config_snapshot(),
        );

        scratch.close()?;

        Ok(ProcessedArchive {
            archive: output.bytes,
            report,
            message: category.success_message(),
        })
    }

    /// Scans and names entries without extracting anything.
    pub fn plan(&self, input: &[u8], category: FileTypeCategory) -> Result<ExtractionPlan> {
        let mut archive = scanner::open_archive(input)?;
        let scanner = ArchiveScanner::new(FileFilter::new(category, &self.config.filters)?);
        let scan = scanner.scan(&mut archive)?;

        let rule = RenameRule::new(&self.config.naming);
        let planned = scan
            .entries
            .iter()
            .map(|entry| {
                PlannedEntry::new(
                    PathBuf::from(&entry.path),
                    rule.final_name_for_path(&entry.path),
                    entry.path.clone(),
                )
            })
            .collect();

        let repackager = Repackager::new(
            self.config.output.collision_policy,
            self.config.output.compression_level,
        );
        let (resolved, collisions) = repackager.resolve_names(planned)?;

        Ok(ExtractionPlan {
            category,
            entries_scanned: scan.total_entries,
            files: resolved.iter().map(FileInfo::from).collect(),
            collisions,
            skipped: scan.skipped,
        })
    }

    /// Reads `input`, runs the pipeline and persists the new archive.
    ///
    /// Without `output`, the archive goes to `<base_directory>/<category default name>`.
    pub fn extract_to_file(
        &self,
        input: &Path,
        category: FileTypeCategory,
        output: Option<&Path>,
        write_report: bool,
    ) -> Result<ExtractionReport> {
        let output_manager = match output {
            Some(path) => OutputManager::for_path(path.to_path_buf()),
            None => OutputManager::new(
                &self.config.output.base_directory,
                &category.default_output_name(),
            ),
        }
        .with_force_overwrite(self.config.output.force_overwrite);

        // Refuse before doing any work
        output_manager.check_destination()?;

        let bytes = std::fs::read(input)?;
        let processed = self.process_archive(&bytes, category)?;
        self.shutdown.check_shutdown()?;

        let written = output_manager.write_archive(&processed.archive)?;
        let mut report = processed.report;
        report.output_file = Some(written.display().to_string());

        if write_report {
            let report_path = output_manager.write_report(&report)?;
            self.output_formatter
                .info(&format!("Report written to {}", report_path.display()));
        }

        self.output_formatter.success(&processed.message);
        Ok(report)
    }

    fn extract_files<R: std::io::Read + std::io::Seek>(
        &self,
        archive: &mut zip::ZipArchive<R>,
        entries: &[ArchiveEntry],
        scratch: &ScratchSpace,
    ) -> Result<(Vec<extractor::ExtractedFile>, ExtractionProgress)> {
        self.output_formatter.start_operation("Extracting selected files");

        let file_progress = self.progress_manager.create_file_progress(entries.len() as u64);
        let progress_callback = {
            let pb = file_progress.clone();
            move |progress: &ExtractionProgress| {
                ui::progress::update_file_progress(&pb, progress);
            }
        };

        let file_ops = FileOperations::new().with_max_file_size(self.config.filters.max_file_size);
        let result = file_ops.extract_entries(archive, entries, scratch, Some(&progress_callback));

        match result {
            Ok((extracted, progress)) => {
                ui::progress::finish_progress_with_summary(
                    &file_progress,
                    &format!("Extracted {} files", progress.files_processed),
                    progress.elapsed(),
                );
                Ok((extracted, progress))
            }
            Err(e) => {
                file_progress.abandon();
                Err(e)
            }
        }
    }

    fn warn_on_empty_selection(&self, category: FileTypeCategory, selected: usize) {
        if selected == 0 {
            log::warn!("No {} found; the output archive will be empty", category.label());
            self.output_formatter.warning(&format!(
                "No {} found in the archive; the output archive is empty",
                category.label()
            ));
        } else {
            self.output_formatter
                .info(&format!("Found {} {}", selected, category.label()));
        }
    }

    fn enter(&self, stage: PipelineStage) -> Result<()> {
        self.shutdown.check_shutdown()?;
        log::debug!("Pipeline stage: {} -> {}", self.stage.get(), stage);
        self.stage.set(stage);
        Ok(())
    }

    /// Create configuration snapshot for reporting
    fn create_config_snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            rename: self.config.naming.rename,
            submission_infix: self.config.naming.submission_infix.clone(),
            collision_policy: self.config.output.collision_policy,
            compression_level: self.config.output.compression_level,
            max_file_size: self.config.filters.max_file_size,
        }
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        Config::sample().save_to_file(output_path)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn progress_manager(&self) -> &ProgressManager {
        &self.progress_manager
    }

    pub fn current_stage(&self) -> PipelineStage {
        self.stage.get()
    }

    /// Check if shutdown has been requested
    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    /// Request graceful shutdown
    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &OfficeExtractError) {
        self.progress_manager.clear();
        self.output_formatter.print_user_friendly_error(error);
    }
}

/// Convenience function: repackage `input` for `category` with default settings
pub fn extract_simple(input: &[u8], category: FileTypeCategory) -> Result<Vec<u8>> {
    let office_extract = OfficeExtract::new_detached(Config::default());
    office_extract
        .process_archive(input, category)
        .map(|processed| processed.archive)
}

/// Get version information
pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Get build information
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
        build_date: option_env!("BUILD_DATE").unwrap_or("unknown"),
        target: std::env::consts::ARCH.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_date: &'static str,
    pub target: String,
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "office-extract {} ({}) built on {} for {}",
            self.version, self.git_hash, self.build_date, self.target
        )
    }
}
