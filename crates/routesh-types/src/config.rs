//! Shell configuration.
//!
//! Values come from, in increasing precedence: built-in defaults, an
//! optional TOML file, and the environment. Command-line flags are applied
//! on top by the binary.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, ShellError};

/// Environment variable overriding the plugin search directory.
pub const PLUGIN_DIR_ENV: &str = "ROUTESH_PLUGIN_DIR";

/// Environment variable pointing at a TOML configuration file.
pub const CONFIG_ENV: &str = "ROUTESH_CONFIG";

/// Upper bound on simultaneously loaded plugins.
pub const DEFAULT_MAX_PLUGINS: usize = 32;

/// Runtime configuration for one shell session.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShellConfig {
    /// Product name substituted into every prompt.
    #[serde(default = "default_product_name")]
    pub product_name: String,
    /// Directory scanned for plugin descriptors.
    #[serde(default)]
    pub plugin_dir: Option<PathBuf>,
    /// Maximum number of loaded plugins.
    #[serde(default = "default_max_plugins")]
    pub max_plugins: usize,
    /// Maximum number of completion suggestions returned per request.
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
    /// Secret required by `enable`. `None` means no credential check.
    #[serde(default)]
    pub enable_secret: Option<String>,
    /// Scan the plugin directory at startup.
    #[serde(default = "yes")]
    pub autoload_plugins: bool,
    /// Statically linked plugins offered to descriptors as `builtin:<name>`.
    #[serde(default = "default_builtin_plugins")]
    pub builtin_plugins: Vec<String>,
}

fn default_product_name() -> String {
    "Router".to_string()
}
fn default_max_plugins() -> usize {
    DEFAULT_MAX_PLUGINS
}
fn default_max_suggestions() -> usize {
    64
}
fn yes() -> bool {
    true
}
fn default_builtin_plugins() -> Vec<String> {
    vec!["network".to_string(), "system".to_string()]
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            product_name: default_product_name(),
            plugin_dir: None,
            max_plugins: DEFAULT_MAX_PLUGINS,
            max_suggestions: default_max_suggestions(),
            enable_secret: None,
            autoload_plugins: true,
            builtin_plugins: default_builtin_plugins(),
        }
    }
}

impl ShellConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        log::debug!("Loaded configuration from {}", path.display());
        Self::from_toml(&text)
    }

    /// Apply environment overrides using the given lookup.
    ///
    /// The lookup is a parameter so tests do not touch the process
    /// environment; the binary passes `|k| std::env::var(k).ok()`.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(PLUGIN_DIR_ENV).filter(|d| !d.is_empty()) {
            self.plugin_dir = Some(PathBuf::from(dir));
        }
        self
    }

    /// The plugin directory to scan.
    ///
    /// Falls back to `plugins/` next to the running executable when neither
    /// the file nor the environment named one.
    pub fn resolve_plugin_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.plugin_dir {
            return Some(dir.clone());
        }
        let exe = std::env::current_exe().ok()?;
        exe.parent().map(|dir| dir.join("plugins"))
    }

    /// Reject values the shell cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.product_name.trim().is_empty() {
            return Err(ShellError::Config("product_name must not be empty".into()));
        }
        if self.product_name.chars().any(char::is_whitespace) {
            return Err(ShellError::Config(
                "product_name must not contain whitespace".into(),
            ));
        }
        if self.max_plugins == 0 {
            return Err(ShellError::Config("max_plugins must be at least 1".into()));
        }
        Ok(())
    }
}
