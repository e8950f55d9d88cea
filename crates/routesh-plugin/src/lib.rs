//! Runtime-loadable command plugins.
//!
//! A plugin is described on disk by a small JSON or TOML descriptor that
//! names a code unit (a dynamic library, or a `builtin:` entry linked into
//! the host). The code unit exports one registration entry point which
//! hands the host a `ShellPlugin` implementation; the `PluginManager`
//! drives it through init, command enumeration, and cleanup.

pub mod api;
pub mod descriptor;
pub mod loader;
pub mod manager;

pub use api::{
    PLUGIN_API_VERSION, PluginContext, REGISTER_SYMBOL, RegisterFn, Registrar, ShellPlugin,
};
pub use descriptor::{DeclaredCommand, PluginDescriptor, is_descriptor_file};
pub use loader::{CodeUnit, ModuleLoader, NativeLoader};
pub use manager::{LoadReport, PluginManager, PluginSummary, ScanReport, SkippedCommand};
