//! Network plugin for routesh.
//!
//! Adds an interface configuration view (`interface <name>` from config
//! mode, prompt `NAME(config-if-<name>)# `) with `ip address`,
//! `description`, `shutdown`, and `no`, plus `interfaces` and `ping` in the
//! privileged view. Interface state is simulated in memory.
//!
//! Linked statically through [`register`], or built as a dynamic library
//! with the `dynamic` feature.

pub mod commands;
pub mod interfaces;

use std::cell::RefCell;
use std::rc::Rc;

use routesh_plugin::{PLUGIN_API_VERSION, PluginContext, Registrar, ShellPlugin};
use routesh_terminal::{Command, STATUS_OK, Status};

use crate::interfaces::InterfaceTable;

pub use commands::INTERFACE_FAMILY;

/// The network plugin instance.
#[derive(Default)]
pub struct NetworkPlugin {
    table: Rc<RefCell<InterfaceTable>>,
}

impl NetworkPlugin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ShellPlugin for NetworkPlugin {
    fn init(&mut self, ctx: &PluginContext<'_>) -> Status {
        log::info!(
            "Initializing network plugin on {} ({} interfaces)",
            ctx.product_name,
            self.table.borrow().iter().count()
        );
        STATUS_OK
    }

    fn cleanup(&mut self, _ctx: &PluginContext<'_>) -> Status {
        log::info!("Cleaning up network plugin");
        STATUS_OK
    }

    fn get_commands(&mut self) -> Result<Vec<Box<dyn Command>>, Status> {
        Ok(commands::all(&self.table))
    }
}

/// Registration entry point for static linking (`builtin:network`).
pub fn register(registrar: &mut Registrar) -> i32 {
    registrar.register(PLUGIN_API_VERSION, Box::new(NetworkPlugin::new()));
    STATUS_OK
}

#[cfg(feature = "dynamic")]
routesh_plugin::declare_plugin!(NetworkPlugin::new());
