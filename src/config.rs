//! Configuration loading for cachai.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Explicit config file (`--config`), or project config (`./cachai.toml`)
//! 3. User config (`~/.cachai/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. An experiment runs with the default
//! strategy and simulator when no config exists.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CachaiError, Result};
use crate::strategies::StrategyConfig;

/// File name of the project config.
pub const PROJECT_CONFIG_FILE: &str = "cachai.toml";

/// Main configuration struct for cachai.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Experiment naming and output location.
    pub experiment: ExperimentConfig,
    /// Strategy under evaluation.
    pub strategy: StrategyConfig,
    /// Synthetic workload.
    pub simulator: SimulatorConfig,
}

/// Experiment naming and output location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExperimentConfig {
    pub name: String,
    /// Experiments write to `<output_dir>/<slug(name)>/`.
    pub output_dir: PathBuf,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            name: "experiment".to_string(),
            output_dir: PathBuf::from("results"),
        }
    }
}

/// Synthetic workload parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Distinct keys to simulate.
    pub records_count: usize,
    /// Write/feedback cycles per experiment.
    pub operations_count: u64,
    /// Half-open range the per-record mean TTL is drawn from.
    pub record_mean_range: [u32; 2],
    /// Half-open range the per-record spread is drawn from.
    pub record_var_range: [u32; 2],
    /// Probability of a hit in each second a value stays cached.
    pub hit_rate: f64,
    /// Seed for reproducible runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            records_count: 100,
            operations_count: 10_000,
            record_mean_range: [10, 500],
            record_var_range: [1, 50],
            hit_rate: 0.01,
            seed: None,
        }
    }
}

impl SimulatorConfig {
    /// Check if a value is a valid hit rate.
    pub fn is_valid_hit_rate(value: f64) -> bool {
        (0.0..=1.0).contains(&value)
    }

    pub fn validate(&self) -> Result<()> {
        if self.records_count == 0 {
            return Err(CachaiError::config("simulator.records_count must be at least 1"));
        }
        for (name, [lo, hi]) in [
            ("record_mean_range", self.record_mean_range),
            ("record_var_range", self.record_var_range),
        ] {
            if lo >= hi {
                return Err(CachaiError::config(format!(
                    "simulator.{} must be a non-empty range, got [{}, {})",
                    name, lo, hi
                )));
            }
        }
        if !Self::is_valid_hit_rate(self.hit_rate) {
            return Err(CachaiError::config(format!(
                "simulator.hit_rate must be in [0, 1], got {}",
                self.hit_rate
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration with full precedence chain from the current
    /// directory.
    ///
    /// An explicit file must exist and parse; the project and user files are
    /// optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd, explicit),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                if let Some(path) = explicit {
                    config = config.merge(Self::load_from_file(path)?);
                }
                config.apply_env_overrides();
                Ok(config)
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path, explicit: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        // Layer 4 → 3: Apply user config
        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        // Layer 3 → 2: Apply explicit or project config
        match explicit {
            Some(path) => config = config.merge(Self::load_from_file(path)?),
            None => {
                if let Some(project_config) = Self::load_project_config(cwd) {
                    config = config.merge(project_config);
                }
            }
        }

        // Layer 2 → 1: Apply environment variables
        config.apply_env_overrides();

        Ok(config)
    }

    /// Load user config from `~/.cachai/config.toml`.
    fn load_user_config() -> Option<Config> {
        let path = cachai_home()?.join("config.toml");
        Self::load_optional(&path)
    }

    /// Load project config from `cachai.toml` in the given directory.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        Self::load_optional(&cwd.join(PROJECT_CONFIG_FILE))
    }

    /// Load a config that may be absent; a present but broken file is warned about.
    fn load_optional(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("ignoring config {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| CachaiError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| CachaiError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("CACHAI_EXPERIMENT_NAME") {
            if val.trim().is_empty() {
                tracing::warn!(
                    "Invalid CACHAI_EXPERIMENT_NAME: empty. Using '{}'.",
                    self.experiment.name
                );
            } else {
                self.experiment.name = val;
            }
        }

        if let Ok(val) = env::var("CACHAI_OUTPUT_DIR") {
            if val.is_empty() {
                tracing::warn!(
                    "Invalid CACHAI_OUTPUT_DIR: empty. Using '{}'.",
                    self.experiment.output_dir.display()
                );
            } else {
                self.experiment.output_dir = PathBuf::from(val);
            }
        }

        if let Ok(val) = env::var("CACHAI_OPERATIONS_COUNT") {
            match val.parse::<u64>() {
                Ok(n) => self.simulator.operations_count = n,
                Err(_) => tracing::warn!(
                    "Invalid CACHAI_OPERATIONS_COUNT value '{}'. \
                    Expected a non-negative integer. Using '{}'.",
                    val,
                    self.simulator.operations_count
                ),
            }
        }

        if let Ok(val) = env::var("CACHAI_RECORDS_COUNT") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => self.simulator.records_count = n,
                _ => tracing::warn!(
                    "Invalid CACHAI_RECORDS_COUNT value '{}'. \
                    Expected a positive integer. Using '{}'.",
                    val,
                    self.simulator.records_count
                ),
            }
        }

        if let Ok(val) = env::var("CACHAI_HIT_RATE") {
            match val.parse::<f64>() {
                Ok(rate) if SimulatorConfig::is_valid_hit_rate(rate) => {
                    self.simulator.hit_rate = rate
                }
                _ => tracing::warn!(
                    "Invalid CACHAI_HIT_RATE value '{}'. \
                    Must be between 0.0 and 1.0. Using '{}'.",
                    val,
                    self.simulator.hit_rate
                ),
            }
        }

        if let Ok(val) = env::var("CACHAI_SEED") {
            match val.parse::<u64>() {
                Ok(seed) => self.simulator.seed = Some(seed),
                Err(_) => tracing::warn!(
                    "Invalid CACHAI_SEED value '{}'. Expected a non-negative integer.",
                    val
                ),
            }
        }
    }

    /// Merge another config into this one.
    ///
    /// Values from `other` take precedence when they differ from the default.
    /// A higher layer cannot reset a lower layer's value back to the default;
    /// the strategy table is replaced as a whole.
    fn merge(mut self, other: Config) -> Self {
        let default_experiment = ExperimentConfig::default();
        if other.experiment.name != default_experiment.name {
            self.experiment.name = other.experiment.name;
        }
        if other.experiment.output_dir != default_experiment.output_dir {
            self.experiment.output_dir = other.experiment.output_dir;
        }

        if other.strategy != StrategyConfig::default() {
            self.strategy = other.strategy;
        }

        let default_sim = SimulatorConfig::default();
        if other.simulator.records_count != default_sim.records_count {
            self.simulator.records_count = other.simulator.records_count;
        }
        if other.simulator.operations_count != default_sim.operations_count {
            self.simulator.operations_count = other.simulator.operations_count;
        }
        if other.simulator.record_mean_range != default_sim.record_mean_range {
            self.simulator.record_mean_range = other.simulator.record_mean_range;
        }
        if other.simulator.record_var_range != default_sim.record_var_range {
            self.simulator.record_var_range = other.simulator.record_var_range;
        }
        if other.simulator.hit_rate != default_sim.hit_rate {
            self.simulator.hit_rate = other.simulator.hit_rate;
        }
        if other.simulator.seed.is_some() {
            self.simulator.seed = other.simulator.seed;
        }

        self
    }

    /// Check every section, failing on the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.experiment.name.trim().is_empty() {
            return Err(CachaiError::config("experiment.name must not be empty"));
        }
        self.strategy.validate()?;
        self.simulator.validate()
    }

    /// Directory an experiment writes into.
    pub fn experiment_dir(&self) -> PathBuf {
        self.experiment.output_dir.join(slug(&self.experiment.name))
    }

    /// Write the config as TOML.
    ///
    /// Creates parent directories. Uses atomic write (write to temp file,
    /// then rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| CachaiError::storage(&dir, e))?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| CachaiError::config(e.to_string()))?;

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(PROJECT_CONFIG_FILE);
        let temp_path = dir.join(format!(".{}.tmp", file_name));
        fs::write(&temp_path, &content).map_err(|e| CachaiError::storage(&temp_path, e))?;

        let file = fs::File::open(&temp_path).map_err(|e| CachaiError::storage(&temp_path, e))?;
        file.sync_all()
            .map_err(|e| CachaiError::storage(&temp_path, e))?;
        drop(file);

        fs::rename(&temp_path, path).map_err(|e| CachaiError::storage(path, e))?;

        Ok(())
    }
}

/// Relative directory for an experiment name.
///
/// Lowercased with spaces as `_`. Backslashes become `/`, so a name like
/// `sweeps\\mode` nests under `sweeps/`. Leading and trailing separators are
/// dropped to keep the result under the output directory.
pub fn slug(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .replace('\\', "/")
        .trim_matches('/')
        .replace(' ', "_")
}

/// Get the cachai home directory.
///
/// Returns `$CACHAI_HOME` if set and non-empty, otherwise `~/.cachai`.
pub fn cachai_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("CACHAI_HOME") {
        if home.is_empty() {
            tracing::warn!("CACHAI_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("CACHAI_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    dirs::home_dir().map(|home| home.join(".cachai"))
}
