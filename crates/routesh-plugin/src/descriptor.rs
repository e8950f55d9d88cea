//! Plugin descriptor files.
//!
//! A descriptor is JSON or TOML (picked by extension) with four required
//! string fields and an optional informational command list:
//!
//! ```toml
//! name = "network"
//! description = "Interface configuration"
//! version = "1.0.0"
//! library = "builtin:network"
//!
//! [[commands]]
//! name = "interface"
//! help = "Select an interface"
//! handler = "cmd_interface"
//! view = "config"
//! ```

use std::path::{Path, PathBuf};

use routesh_terminal::ViewId;
use routesh_types::error::PluginError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RawDescriptor {
    name: Option<String>,
    description: Option<String>,
    version: Option<String>,
    #[serde(alias = "module")]
    library: Option<String>,
    #[serde(default)]
    commands: Vec<RawCommand>,
}

#[derive(Debug, Deserialize)]
struct RawCommand {
    name: Option<String>,
    #[serde(alias = "description")]
    help: Option<String>,
    handler: Option<String>,
    view: Option<String>,
}

/// A command listed in a descriptor. Informational only: the plugin's
/// `get_commands` is the source of truth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredCommand {
    pub name: String,
    pub help: String,
    pub handler: String,
    pub view: Option<ViewId>,
}

/// A parsed, validated descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDescriptor {
    pub name: String,
    pub description: String,
    pub version: String,
    /// Code unit reference: `builtin:<name>`, a path, or a bare library name.
    pub library: String,
    pub commands: Vec<DeclaredCommand>,
    /// File the descriptor was read from.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

impl Format {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            ext if ext.eq_ignore_ascii_case("json") => Some(Self::Json),
            ext if ext.eq_ignore_ascii_case("toml") => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Whether `path` looks like a descriptor a directory scan should pick up:
/// a `.json` or `.toml` file whose name does not start with a dot.
pub fn is_descriptor_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_none_or(|n| n.starts_with('.'));
    !hidden && Format::from_path(path).is_some()
}

impl PluginDescriptor {
    /// Read and validate a descriptor file.
    pub fn from_file(path: &Path) -> Result<Self, PluginError> {
        let invalid = |reason: String| PluginError::InvalidDescriptor {
            path: path.to_path_buf(),
            reason,
        };
        let format = Format::from_path(path)
            .ok_or_else(|| invalid("expected a .json or .toml file".into()))?;
        let text = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let raw: RawDescriptor = match format {
            Format::Json => serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))?,
            Format::Toml => toml::from_str(&text).map_err(|e| invalid(e.to_string()))?,
        };
        Self::from_raw(raw, path)
    }

    fn from_raw(raw: RawDescriptor, path: &Path) -> Result<Self, PluginError> {
        let required = |field: &str, value: Option<String>| match value {
            Some(v) if !v.trim().is_empty() => Ok(v),
            Some(_) => Err(PluginError::InvalidDescriptor {
                path: path.to_path_buf(),
                reason: format!("field `{field}` must not be empty"),
            }),
            None => Err(PluginError::InvalidDescriptor {
                path: path.to_path_buf(),
                reason: format!("missing field `{field}`"),
            }),
        };
        let name = required("name", raw.name)?;
        let description = required("description", raw.description)?;
        let version = required("version", raw.version)?;
        let library = required("library", raw.library)?;

        let mut commands = Vec::new();
        for (i, c) in raw.commands.into_iter().enumerate() {
            let view = match c.view.as_deref().map(ViewId::parse) {
                None => None,
                Some(Some(view)) => Some(view),
                Some(None) => {
                    log::warn!(
                        "{}: commands[{i}] names unknown view {:?}; ignored",
                        path.display(),
                        c.view.as_deref().unwrap_or_default()
                    );
                    continue;
                },
            };
            match (c.name, c.help, c.handler) {
                (Some(name), Some(help), Some(handler)) => commands.push(DeclaredCommand {
                    name,
                    help,
                    handler,
                    view,
                }),
                _ => log::warn!(
                    "{}: commands[{i}] lacks name, help, or handler; ignored",
                    path.display()
                ),
            }
        }

        Ok(Self {
            name,
            description,
            version,
            library,
            commands,
            path: path.to_path_buf(),
        })
    }

    /// Directory holding the descriptor; relative library paths resolve
    /// against it.
    pub fn base_dir(&self) -> Option<&Path> {
        self.path.parent()
    }
}
