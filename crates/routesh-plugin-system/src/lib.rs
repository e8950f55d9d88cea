//! System plugin for routesh: `status` and `info` in the privileged view,
//! `echo` in the user and privileged views.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use routesh_plugin::{PLUGIN_API_VERSION, PluginContext, Registrar, ShellPlugin};
use routesh_terminal::{Command, ExecContext, ParamSpec, STATUS_OK, Status, ViewId};

type Started = Rc<Cell<Option<Instant>>>;

/// The system plugin instance. Uptime counts from `init`.
#[derive(Default)]
pub struct SystemPlugin {
    started: Started,
}

impl SystemPlugin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ShellPlugin for SystemPlugin {
    fn init(&mut self, ctx: &PluginContext<'_>) -> Status {
        log::info!("Initializing system plugin (v{})", env!("CARGO_PKG_VERSION"));
        log::debug!("System plugin host: {}", ctx.product_name);
        self.started.set(Some(Instant::now()));
        STATUS_OK
    }

    fn cleanup(&mut self, _ctx: &PluginContext<'_>) -> Status {
        log::info!("Cleaning up system plugin");
        self.started.set(None);
        STATUS_OK
    }

    fn get_commands(&mut self) -> Result<Vec<Box<dyn Command>>, Status> {
        Ok(vec![
            Box::new(StatusCmd {
                started: Rc::clone(&self.started),
            }),
            Box::new(InfoCmd),
            Box::new(EchoCmd::new(ViewId::User)),
            Box::new(EchoCmd::new(ViewId::Privileged)),
        ])
    }
}

/// Registration entry point for static linking (`builtin:system`).
pub fn register(registrar: &mut Registrar) -> i32 {
    registrar.register(PLUGIN_API_VERSION, Box::new(SystemPlugin::new()));
    STATUS_OK
}

#[cfg(feature = "dynamic")]
routesh_plugin::declare_plugin!(SystemPlugin::new());

/// `up 01:02:03` or `up 2 day(s), 01:02:03`.
fn format_uptime(secs: u64) -> String {
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let mins = (secs % 3600) / 60;
    let s = secs % 60;
    if days > 0 {
        format!("up {days} day(s), {hours:02}:{mins:02}:{s:02}")
    } else {
        format!("up {hours:02}:{mins:02}:{s:02}")
    }
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

struct StatusCmd {
    started: Started,
}
impl Command for StatusCmd {
    fn name(&self) -> &str {
        "status"
    }
    fn description(&self) -> &str {
        "Show system status"
    }
    fn view(&self) -> ViewId {
        ViewId::Privileged
    }
    fn execute(&self, ctx: &mut ExecContext<'_>) -> Status {
        let uptime = self
            .started
            .get()
            .map_or_else(|| "not started".to_string(), |t| {
                format_uptime(t.elapsed().as_secs())
            });
        ctx.println(format!("System uptime: {uptime}"));
        ctx.println(format!("Current view:  {}", ctx.view));
        STATUS_OK
    }
}

// ---------------------------------------------------------------------------
// info
// ---------------------------------------------------------------------------

struct InfoCmd;
impl Command for InfoCmd {
    fn name(&self) -> &str {
        "info"
    }
    fn description(&self) -> &str {
        "Show platform and build information"
    }
    fn view(&self) -> ViewId {
        ViewId::Privileged
    }
    fn execute(&self, ctx: &mut ExecContext<'_>) -> Status {
        ctx.println(format!("OS:            {}", std::env::consts::OS));
        ctx.println(format!("Architecture:  {}", std::env::consts::ARCH));
        ctx.println(format!("Plugin:        system v{}", env!("CARGO_PKG_VERSION")));
        ctx.println(format!("Plugin API:    v{PLUGIN_API_VERSION}"));
        STATUS_OK
    }
}

// ---------------------------------------------------------------------------
// echo
// ---------------------------------------------------------------------------

struct EchoCmd {
    view: ViewId,
    params: Vec<ParamSpec>,
}
impl EchoCmd {
    fn new(view: ViewId) -> Self {
        Self {
            view,
            params: vec![
                ParamSpec::string("text")
                    .optional()
                    .help("Quote text containing spaces"),
            ],
        }
    }
}
impl Command for EchoCmd {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "Display a line of text"
    }
    fn view(&self) -> ViewId {
        self.view.clone()
    }
    fn params(&self) -> &[ParamSpec] {
        &self.params
    }
    fn execute(&self, ctx: &mut ExecContext<'_>) -> Status {
        let text = ctx.arg(0).unwrap_or("");
        ctx.println(text);
        STATUS_OK
    }
}
