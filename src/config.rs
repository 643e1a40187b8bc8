//! Layered application configuration.
//!
//! Settings are merged in increasing priority:
//!
//! 1. Built-in defaults
//! 2. TOML file (`config.toml` in the platform config directory, or `--config`)
//! 3. Environment variables prefixed `FILESAME_` (e.g. `FILESAME_MAX_BYTES=4096`)
//! 4. Command-line flags
//!
//! # Example
//!
//! ```toml
//! ignore_case = true
//! max_bytes = 4096
//! two_stage = true
//! separator = "\t"
//! backend = "hashed"
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::{CompareArgs, GroupArgs, MatchArgs, OutputFormat};
use crate::duplicates::{Backend, FinderConfig, MatchConfig};
use crate::scanner::{NormalizationConfig, DEFAULT_BUFFER_SIZE};

/// Prefix of environment variables read into [`Config`].
pub const ENV_PREFIX: &str = "FILESAME_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fold ASCII case before comparing.
    pub ignore_case: bool,
    /// Drop whitespace bytes before comparing.
    pub ignore_whitespace: bool,
    /// Byte cap per file, 0 for the whole file.
    pub max_bytes: u64,
    /// Read buffer size per pass.
    pub buffer_size: usize,
    /// Field separator for text output.
    pub separator: String,
    /// Prefix class lines with their digest.
    pub print_digest: bool,
    /// Verify capped classes over the whole file.
    pub two_stage: bool,
    /// Use file lengths to rule out candidates.
    pub size_check: bool,
    /// Class map used for grouping.
    pub backend: Backend,
    /// Report singletons and known-unique files too.
    pub show_all: bool,
    /// Output format.
    pub output: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ignore_case: false,
            ignore_whitespace: false,
            max_bytes: 0,
            buffer_size: DEFAULT_BUFFER_SIZE,
            separator: " ".to_string(),
            print_digest: false,
            two_stage: false,
            size_check: true,
            backend: Backend::default(),
            show_all: false,
            output: OutputFormat::default(),
        }
    }
}

impl Config {
    /// Load from the default platform-specific file and the environment.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from_path(path),
            None => Self::extract_or_default(Self::figment(None)),
        }
    }

    /// Load from `path` and the environment.
    ///
    /// A missing file contributes nothing. An unreadable or malformed file
    /// is logged and the built-in defaults are used.
    pub fn load_from_path(path: impl AsRef<Path>) -> Self {
        Self::extract_or_default(Self::figment(Some(path.as_ref())))
    }

    /// The provider stack below the command line.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            log::debug!("Reading config from {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    fn extract_or_default(figment: Figment) -> Self {
        match figment.extract() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Default platform-specific configuration path.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "filesame", "filesame")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Apply the normalization flags given on the command line.
    pub fn merge_compare_args(&mut self, args: &CompareArgs) {
        if args.ignore_case {
            self.ignore_case = true;
        }
        if args.ignore_whitespace {
            self.ignore_whitespace = true;
        }
        if let Some(max_bytes) = args.max_bytes {
            self.max_bytes = max_bytes;
        }
        if let Some(buffer_size) = args.buffer_size {
            self.buffer_size = usize::try_from(buffer_size).unwrap_or(usize::MAX);
        }
        if args.no_size_check {
            self.size_check = false;
        }
    }

    /// Apply `group` flags given on the command line.
    pub fn merge_group_args(&mut self, args: &GroupArgs) {
        self.merge_compare_args(&args.compare);
        if args.two_stage {
            self.two_stage = true;
        }
        if args.print_digest {
            self.print_digest = true;
        }
        if let Some(separator) = &args.separator {
            self.separator.clone_from(separator);
        }
        if args.all {
            self.show_all = true;
        }
        if let Some(backend) = args.backend {
            self.backend = backend;
        }
        if let Some(output) = args.output {
            self.output = output;
        }
    }

    /// Apply `match` flags given on the command line.
    pub fn merge_match_args(&mut self, args: &MatchArgs) {
        self.merge_compare_args(&args.compare);
        if let Some(output) = args.output {
            self.output = output;
        }
    }

    /// Normalization described by this configuration.
    ///
    /// The buffer size is taken as is, so a zero survives to validation.
    #[must_use]
    pub fn normalization(&self) -> NormalizationConfig {
        NormalizationConfig {
            ignore_case: self.ignore_case,
            ignore_whitespace: self.ignore_whitespace,
            max_bytes: self.max_bytes,
            buffer_size: self.buffer_size,
        }
    }

    /// Grouping pipeline settings.
    #[must_use]
    pub fn finder_config(&self) -> FinderConfig {
        FinderConfig::default()
            .with_normalization(self.normalization())
            .with_two_stage(self.two_stage)
            .with_size_check(self.size_check)
            .with_backend(self.backend)
    }

    /// Matching pipeline settings.
    #[must_use]
    pub fn match_config(&self) -> MatchConfig {
        MatchConfig::default()
            .with_normalization(self.normalization())
            .with_size_check(self.size_check)
    }
}
