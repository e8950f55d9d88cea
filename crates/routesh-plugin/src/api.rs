//! The host/plugin contract.
//!
//! A code unit exports `routesh_plugin_register`, normally generated with
//! [`declare_plugin!`](crate::declare_plugin). The host calls it with a
//! fresh [`Registrar`]; the plugin registers one [`ShellPlugin`] together
//! with the API version it was compiled against.
//!
//! The entry point uses the Rust ABI, so dynamic plugins must be built with
//! the same toolchain as the host. The version handshake catches API drift
//! between releases, not compiler mismatches.

use std::any::Any;

use routesh_terminal::{Command, STATUS_OK, Status};

/// Version of this contract. Bumped on any breaking change to
/// [`ShellPlugin`], [`Registrar`], or the command types they carry.
pub const PLUGIN_API_VERSION: u32 = 1;

/// Symbol name of the registration entry point.
pub const REGISTER_SYMBOL: &str = "routesh_plugin_register";

/// Signature of the registration entry point.
pub type RegisterFn = fn(&mut Registrar) -> Status;

/// Host state visible to a plugin during init and cleanup.
pub struct PluginContext<'a> {
    pub product_name: &'a str,
    /// Opaque application data supplied to the shell.
    pub user_data: Option<&'a dyn Any>,
}

/// Capabilities a plugin provides.
pub trait ShellPlugin {
    /// Called once after registration. Non-zero aborts the load.
    fn init(&mut self, _ctx: &PluginContext<'_>) -> Status {
        STATUS_OK
    }

    /// Called before the plugin is dropped, on unload or on a failed
    /// command enumeration.
    fn cleanup(&mut self, _ctx: &PluginContext<'_>) -> Status {
        STATUS_OK
    }

    /// The commands this plugin contributes. `Err(status)` aborts the load.
    fn get_commands(&mut self) -> Result<Vec<Box<dyn Command>>, Status>;
}

/// Receives the plugin from the registration entry point.
#[derive(Default)]
pub struct Registrar {
    registered: Option<(u32, Box<dyn ShellPlugin>)>,
}

impl Registrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand over the plugin. A second call replaces the first.
    pub fn register(&mut self, api_version: u32, plugin: Box<dyn ShellPlugin>) {
        if self.registered.is_some() {
            log::warn!("Registration entry point registered more than one plugin; keeping the last");
        }
        self.registered = Some((api_version, plugin));
    }

    pub fn is_empty(&self) -> bool {
        self.registered.is_none()
    }

    /// The registered API version and plugin, if any.
    pub fn into_registered(self) -> Option<(u32, Box<dyn ShellPlugin>)> {
        self.registered
    }
}

/// Export the registration entry point for a dynamic plugin.
///
/// `$ctor` is an expression producing the plugin value. Use once per
/// `cdylib`; two plugins linked into the same binary would export the
/// same symbol.
///
/// ```ignore
/// routesh_plugin::declare_plugin!(MyPlugin::default());
/// ```
#[macro_export]
macro_rules! declare_plugin {
    ($ctor:expr) => {
        #[unsafe(no_mangle)]
        pub fn routesh_plugin_register(registrar: &mut $crate::Registrar) -> i32 {
            registrar.register(
                $crate::PLUGIN_API_VERSION,
                ::std::boxed::Box::new($ctor),
            );
            0
        }
    };
}
