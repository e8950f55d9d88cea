//! Command-line flags and configuration assembly.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use routesh_plugin::{NativeLoader, RegisterFn};
use routesh_types::config::{CONFIG_ENV, ShellConfig};

/// Statically linked plugins this binary can offer as `builtin:<name>`.
const BUNDLED: [(&str, RegisterFn); 2] = [
    ("network", routesh_plugin_network::register),
    ("system", routesh_plugin_system::register),
];

#[derive(Parser, Debug, Default)]
#[command(name = "routesh", version, about = "Router-style interactive shell")]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = CONFIG_ENV, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory scanned for plugin descriptors at startup
    #[arg(long, value_name = "DIR")]
    pub plugin_dir: Option<PathBuf>,

    /// Do not load plugins at startup
    #[arg(long)]
    pub no_plugins: bool,

    /// Product name shown in the prompt
    #[arg(long, value_name = "NAME")]
    pub hostname: Option<String>,

    /// Run these lines and exit instead of starting the interactive loop
    #[arg(short = 'e', long = "exec", value_name = "LINE")]
    pub exec: Vec<String>,
}

impl Cli {
    /// Defaults, then the config file, then the environment, then flags.
    pub fn shell_config<F>(&self, lookup: F) -> Result<ShellConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = match &self.config {
            Some(path) => ShellConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => ShellConfig::default(),
        };
        let mut config = config.with_env(lookup);
        if let Some(dir) = &self.plugin_dir {
            config.plugin_dir = Some(dir.clone());
        }
        if self.no_plugins {
            config.autoload_plugins = false;
        }
        if let Some(name) = &self.hostname {
            config.product_name = name.clone();
        }
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

/// A loader offering the bundled plugins enabled in `config`.
pub fn loader(config: &ShellConfig) -> NativeLoader {
    let mut loader = NativeLoader::new(config.resolve_plugin_dir());
    for wanted in &config.builtin_plugins {
        match BUNDLED.iter().find(|(name, _)| name == wanted) {
            Some((name, entry)) => loader = loader.with_builtin(name, *entry),
            None => log::warn!("Unknown builtin plugin '{wanted}' in configuration"),
        }
    }
    loader
}
