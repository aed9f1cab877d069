use crate::config::{CliOverrides, Config};
use crate::error::Result;
use crate::extractor::CollisionPolicy;
use crate::scanner::FileTypeCategory;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "office-extract")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract office documents from a submissions archive")]
#[command(
    long_about = "office-extract picks the spreadsheets, documents or presentations out of a \
                  ZIP archive, names each one after the student folder it came from, and \
                  packs them into a new flat ZIP archive."
)]
#[command(before_help = "📦 office-extract - Submission Archive Repackager")]
#[command(after_help = "EXAMPLES:\n  \
    office-extract submissions.zip --type excel\n  \
    office-extract submissions.zip --type word --output essays.zip --verbose\n  \
    office-extract submissions.zip --type powerpoint --collision number --dry-run\n  \
    office-extract submissions.zip --type excel --no-rename --config my-config.toml")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// ZIP archive to read
    #[arg(required_unless_present = "generate_config")]
    pub archive: Option<PathBuf>,

    /// File type to extract
    #[arg(short = 't', long = "type", value_enum, required_unless_present = "generate_config")]
    pub file_type: Option<FileTypeCategory>,

    /// Output archive path, or an existing directory for the default name
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Keep original file names instead of prefixing the student name
    #[arg(long, help = "Store files under their original names")]
    pub no_rename: bool,

    /// Text removed from every file name
    #[arg(long, help = "Submission infix to strip (default: assignsubmission_file_)")]
    pub infix: Option<String>,

    /// What to do when two files get the same name
    #[arg(long, value_enum)]
    pub collision: Option<CollisionPolicy>,

    /// Deflate level for the output archive (0 stores without compression)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=9))]
    pub compression_level: Option<u8>,

    /// Maximum size of a single entry in MB
    #[arg(long, help = "Maximum entry size to extract (in MB)")]
    pub max_size: Option<u64>,

    /// Directory in which per-run scratch directories are created
    #[arg(long, help = "Parent directory for temporary working files")]
    pub scratch_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Overwrite an existing output archive
    #[arg(long, help = "Overwrite existing output file")]
    pub force: bool,

    /// Also write <output>.report.json
    #[arg(long, help = "Write a JSON report next to the output archive")]
    pub report: bool,

    /// Show what would be extracted without writing anything
    #[arg(long, help = "Show the rename plan without extracting")]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        let max_file_size = self.max_size.map(|size| size * 1024 * 1024); // Convert MB to bytes

        CliOverrides::new()
            .with_rename(self.no_rename.then_some(false))
            .with_submission_infix(self.infix.clone())
            .with_collision_policy(self.collision)
            .with_compression_level(self.compression_level)
            .with_max_file_size(max_file_size)
            .with_output_dir(self.output.clone().filter(|path| path.is_dir()))
            .with_scratch_root(self.scratch_dir.clone())
            .with_force(self.force)
    }

    /// Output file given on the command line; directories go through the config instead.
    pub fn output_path(&self) -> Option<&std::path::Path> {
        self.output.as_deref().filter(|path| !path.is_dir())
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}
