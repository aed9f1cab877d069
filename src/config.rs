use crate::error::{OfficeExtractError, Result};
use crate::extractor::CollisionPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Infix that the submission system inserts in front of every uploaded file name.
pub const DEFAULT_SUBMISSION_INFIX: &str = "assignsubmission_file_";

/// macOS resource forks, AppleDouble files and Office lock files. Off unless configured.
pub const PLATFORM_JUNK_PATTERNS: [&str; 3] = [
    r"(^|/)__MACOSX/",
    r"(^|/)\._[^/]*$",
    r"(^|/)~\$[^/]*$",
];

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub filters: FilterConfig,
    pub naming: NamingConfig,
    pub output: OutputConfig,
    pub workspace: WorkspaceConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    pub max_file_size: u64,
    pub exclude_patterns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NamingConfig {
    pub rename: bool,
    pub submission_infix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub base_directory: PathBuf,
    pub collision_policy: CollisionPolicy,
    pub compression_level: u8,
    pub force_overwrite: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Parent directory for per-run scratch directories (system temp dir when unset).
    pub scratch_root: Option<PathBuf>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_file_size: 100 * 1024 * 1024, // 100MB
            exclude_patterns: Vec::new(),
        }
    }
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            rename: true,
            submission_infix: DEFAULT_SUBMISSION_INFIX.to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_directory: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            collision_policy: CollisionPolicy::default(),
            compression_level: 6,
            force_overwrite: false,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(OfficeExtractError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| OfficeExtractError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| OfficeExtractError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["office-extract.toml", ".office-extract.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(rename) = cli_args.rename {
            self.naming.rename = rename;
        }

        if let Some(ref infix) = cli_args.submission_infix {
            self.naming.submission_infix = infix.clone();
        }

        if let Some(policy) = cli_args.collision_policy {
            self.output.collision_policy = policy;
        }

        if let Some(level) = cli_args.compression_level {
            self.output.compression_level = level;
        }

        if let Some(max_size) = cli_args.max_file_size {
            self.filters.max_file_size = max_size;
        }

        if let Some(ref output_dir) = cli_args.output_dir {
            self.output.base_directory = output_dir.clone();
        }

        if let Some(ref scratch_root) = cli_args.scratch_root {
            self.workspace.scratch_root = Some(scratch_root.clone());
        }

        if cli_args.force {
            self.output.force_overwrite = true;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| OfficeExtractError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| OfficeExtractError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.filters.max_file_size == 0 {
            return Err(OfficeExtractError::Config {
                message: "Maximum file size must be greater than 0".to_string(),
            });
        }

        for pattern in &self.filters.exclude_patterns {
            regex::Regex::new(pattern)?;
        }

        if self.output.compression_level > 9 {
            return Err(OfficeExtractError::Config {
                message: format!(
                    "Compression level must be between 0 and 9, got {}",
                    self.output.compression_level
                ),
            });
        }

        if let Some(ref scratch_root) = self.workspace.scratch_root {
            if !scratch_root.is_dir() {
                return Err(OfficeExtractError::Config {
                    message: format!(
                        "Scratch directory does not exist: {}",
                        scratch_root.display()
                    ),
                });
            }
        }

        if let Some(parent) = self.output.base_directory.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(OfficeExtractError::Config {
                    message: format!("Parent directory does not exist: {}", parent.display()),
                });
            }
        }

        Ok(())
    }

    /// Defaults plus the platform junk excludes, for `--generate-config`.
    pub fn sample() -> Self {
        let mut sample = Self::default();
        sample.filters.exclude_patterns = PLATFORM_JUNK_PATTERNS
            .iter()
            .map(|pattern| pattern.to_string())
            .collect();
        sample
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub rename: Option<bool>,
    pub submission_infix: Option<String>,
    pub collision_policy: Option<CollisionPolicy>,
    pub compression_level: Option<u8>,
    pub max_file_size: Option<u64>,
    pub output_dir: Option<PathBuf>,
    pub scratch_root: Option<PathBuf>,
    pub force: bool,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rename(mut self, rename: Option<bool>) -> Self {
        self.rename = rename;
        self
    }

    pub fn with_submission_infix(mut self, infix: Option<String>) -> Self {
        self.submission_infix = infix;
        self
    }

    pub fn with_collision_policy(mut self, policy: Option<CollisionPolicy>) -> Self {
        self.collision_policy = policy;
        self
    }

    pub fn with_compression_level(mut self, level: Option<u8>) -> Self {
        self.compression_level = level;
        self
    }

    pub fn with_max_file_size(mut self, max_size: Option<u64>) -> Self {
        self.max_file_size = max_size;
        self
    }

    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        self.output_dir = output_dir;
        self
    }

    pub fn with_scratch_root(mut self, scratch_root: Option<PathBuf>) -> Self {
        self.scratch_root = scratch_root;
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}
