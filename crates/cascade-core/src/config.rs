use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global user configuration loaded from `~/.cascade/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub ui: UiConfig,
}

/// Runtime settings from `[runtime]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// March target evaluated before any user input.
    #[serde(default = "default_march")]
    pub march: String,
    /// Extra directories searched for `` `include`` files and inputs.
    #[serde(default, rename = "include-dirs")]
    pub include_dirs: Vec<String>,
    /// Target wall-clock seconds per open-loop batch.
    #[serde(default = "default_open_loop_target", rename = "open-loop-target")]
    pub open_loop_target: u64,
    /// Milliseconds between profiler reports; zero disables profiling.
    #[serde(default, rename = "profile-interval")]
    pub profile_interval: u64,
    #[serde(default, rename = "disable-warnings")]
    pub disable_warnings: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            march: default_march(),
            include_dirs: Vec::new(),
            open_loop_target: default_open_loop_target(),
            profile_interval: 0,
            disable_warnings: false,
        }
    }
}

fn default_march() -> String {
    "minimal".to_string()
}

fn default_open_loop_target() -> u64 {
    1
}

/// Terminal settings from `[ui]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_color")]
    pub color: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            color: default_color(),
        }
    }
}

fn default_color() -> bool {
    true
}

impl GlobalConfig {
    /// Load the global configuration from `~/.cascade/config.toml`, or return defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from an explicit path, or return defaults if the file doesn't exist.
    pub fn load_from(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            cascade_util::errors::CascadeError::Config {
                message: format!("Failed to read global config: {e}"),
            }
        })?;
        toml::from_str(&content).map_err(|e| {
            cascade_util::errors::CascadeError::Config {
                message: format!("Failed to parse global config: {e}"),
            }
            .into()
        })
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }
}

/// Returns the path to the Cascade data directory.
///
/// `CASCADE_HOME` wins when set; otherwise `~/.cascade/`.
pub fn dirs_path() -> PathBuf {
    if let Ok(home) = std::env::var("CASCADE_HOME") {
        return PathBuf::from(home);
    }
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".cascade")
}
