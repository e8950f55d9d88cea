//! Built-in commands.
//!
//! Builtins follow the same rules as plugin commands: they are registered
//! per view and act on the shell only through signals.

use routesh_terminal::{
    Command, CommandRegistry, ExecContext, Owner, ParamSpec, STATUS_FAILED, STATUS_OK, Signal,
    Status, ViewId,
};
use routesh_types::config::ShellConfig;
use routesh_types::error::Result;

/// Register all built-in commands of the base views.
pub fn register_builtins(reg: &mut CommandRegistry, config: &ShellConfig) -> Result<()> {
    let commands: Vec<Box<dyn Command>> = vec![
        // User view.
        Box::new(HelpCmd(ViewId::User)),
        Box::new(EnableCmd::new(config.enable_secret.clone())),
        Box::new(ShowCmd::new(ViewId::User, &["version"])),
        Box::new(ExitCmd(ViewId::User)),
        Box::new(QuitCmd(ViewId::User)),
        // Privileged view.
        Box::new(HelpCmd(ViewId::Privileged)),
        Box::new(DisableCmd),
        Box::new(ConfigureCmd::new()),
        Box::new(ShowCmd::new(
            ViewId::Privileged,
            &["commands", "plugins", "version"],
        )),
        Box::new(LoadCmd::new()),
        Box::new(UnloadCmd::new()),
        Box::new(ExitCmd(ViewId::Privileged)),
        Box::new(QuitCmd(ViewId::Privileged)),
        // Config view.
        Box::new(HelpCmd(ViewId::Config)),
        Box::new(HostnameCmd::new()),
        Box::new(ExitCmd(ViewId::Config)),
        Box::new(EndCmd(ViewId::Config)),
    ];
    for cmd in commands {
        reg.register(cmd, Owner::Builtin)?;
    }
    Ok(())
}

/// Navigation commands every feature view gets: `help`, `exit`, `end`.
pub fn feature_navigation(view: &ViewId) -> Vec<Box<dyn Command>> {
    vec![
        Box::new(HelpCmd(view.clone())),
        Box::new(ExitCmd(view.clone())),
        Box::new(EndCmd(view.clone())),
    ]
}

// ---------------------------------------------------------------------------
// help
// ---------------------------------------------------------------------------

struct HelpCmd(ViewId);
impl Command for HelpCmd {
    fn name(&self) -> &str {
        "help"
    }
    fn description(&self) -> &str {
        "List the commands of this view"
    }
    fn view(&self) -> ViewId {
        self.0.clone()
    }
    fn execute(&self, ctx: &mut ExecContext<'_>) -> Status {
        ctx.signal(Signal::ListCommands);
        STATUS_OK
    }
}

// ---------------------------------------------------------------------------
// enable / disable
// ---------------------------------------------------------------------------

struct EnableCmd {
    secret: Option<String>,
    params: Vec<ParamSpec>,
}

impl EnableCmd {
    fn new(secret: Option<String>) -> Self {
        Self {
            secret,
            params: vec![ParamSpec::string("secret").optional().help("Enable secret")],
        }
    }
}

impl Command for EnableCmd {
    fn name(&self) -> &str {
        "enable"
    }
    fn description(&self) -> &str {
        "Turn on privileged commands"
    }
    fn view(&self) -> ViewId {
        ViewId::User
    }
    fn params(&self) -> &[ParamSpec] {
        &self.params
    }
    fn target_view(&self) -> Option<ViewId> {
        Some(ViewId::Privileged)
    }
    fn execute(&self, ctx: &mut ExecContext<'_>) -> Status {
        if let Some(expected) = &self.secret
            && ctx.arg(0) != Some(expected.as_str())
        {
            ctx.println("% Bad secrets");
            return STATUS_FAILED;
        }
        ctx.signal(Signal::Privilege(true));
        STATUS_OK
    }
}

struct DisableCmd;
impl Command for DisableCmd {
    fn name(&self) -> &str {
        "disable"
    }
    fn description(&self) -> &str {
        "Turn off privileged commands"
    }
    fn view(&self) -> ViewId {
        ViewId::Privileged
    }
    fn target_view(&self) -> Option<ViewId> {
        Some(ViewId::User)
    }
    fn execute(&self, ctx: &mut ExecContext<'_>) -> Status {
        ctx.signal(Signal::Privilege(false));
        STATUS_OK
    }
}

// ---------------------------------------------------------------------------
// configure
// ---------------------------------------------------------------------------

struct ConfigureCmd {
    params: Vec<ParamSpec>,
}

impl ConfigureCmd {
    fn new() -> Self {
        Self {
            params: vec![ParamSpec::choice("mode", &["terminal"]).help("Configure from the terminal")],
        }
    }
}

impl Command for ConfigureCmd {
    fn name(&self) -> &str {
        "configure"
    }
    fn description(&self) -> &str {
        "Enter configuration mode"
    }
    fn view(&self) -> ViewId {
        ViewId::Privileged
    }
    fn params(&self) -> &[ParamSpec] {
        &self.params
    }
    fn target_view(&self) -> Option<ViewId> {
        Some(ViewId::Config)
    }
    fn execute(&self, ctx: &mut ExecContext<'_>) -> Status {
        ctx.println("Enter configuration commands, one per line.  End with 'end'.");
        STATUS_OK
    }
}

// ---------------------------------------------------------------------------
// exit / end / quit
// ---------------------------------------------------------------------------

struct ExitCmd(ViewId);
impl Command for ExitCmd {
    fn name(&self) -> &str {
        "exit"
    }
    fn description(&self) -> &str {
        match self.0 {
            ViewId::User => "Exit the shell",
            _ => "Exit from the current mode",
        }
    }
    fn view(&self) -> ViewId {
        self.0.clone()
    }
    fn execute(&self, ctx: &mut ExecContext<'_>) -> Status {
        ctx.signal(Signal::Exit);
        STATUS_OK
    }
}

struct EndCmd(ViewId);
impl Command for EndCmd {
    fn name(&self) -> &str {
        "end"
    }
    fn description(&self) -> &str {
        "Exit to privileged mode"
    }
    fn view(&self) -> ViewId {
        self.0.clone()
    }
    fn execute(&self, ctx: &mut ExecContext<'_>) -> Status {
        ctx.signal(Signal::End);
        STATUS_OK
    }
}

struct QuitCmd(ViewId);
impl Command for QuitCmd {
    fn name(&self) -> &str {
        "quit"
    }
    fn description(&self) -> &str {
        "Exit the shell"
    }
    fn view(&self) -> ViewId {
        self.0.clone()
    }
    fn execute(&self, ctx: &mut ExecContext<'_>) -> Status {
        ctx.signal(Signal::Quit);
        STATUS_OK
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

struct ShowCmd {
    view: ViewId,
    params: Vec<ParamSpec>,
}

impl ShowCmd {
    fn new(view: ViewId, topics: &[&str]) -> Self {
        Self {
            view,
            params: vec![ParamSpec::choice("topic", topics)],
        }
    }
}

impl Command for ShowCmd {
    fn name(&self) -> &str {
        "show"
    }
    fn description(&self) -> &str {
        "Show running system information"
    }
    fn view(&self) -> ViewId {
        self.view.clone()
    }
    fn params(&self) -> &[ParamSpec] {
        &self.params
    }
    fn execute(&self, ctx: &mut ExecContext<'_>) -> Status {
        match ctx.arg(0) {
            Some("commands") => ctx.signal(Signal::ListCommands),
            Some("plugins") => ctx.signal(Signal::ListPlugins),
            Some("version") => {
                ctx.println(format!("routesh version {}", env!("CARGO_PKG_VERSION")));
                ctx.println(format!(
                    "Built for {}-{}",
                    std::env::consts::ARCH,
                    std::env::consts::OS
                ));
            },
            _ => return STATUS_FAILED,
        }
        STATUS_OK
    }
}

// ---------------------------------------------------------------------------
// hostname
// ---------------------------------------------------------------------------

struct HostnameCmd {
    params: Vec<ParamSpec>,
}

impl HostnameCmd {
    fn new() -> Self {
        Self {
            params: vec![ParamSpec::string("name").help("This system's network name")],
        }
    }
}

impl Command for HostnameCmd {
    fn name(&self) -> &str {
        "hostname"
    }
    fn description(&self) -> &str {
        "Set system's network name"
    }
    fn view(&self) -> ViewId {
        ViewId::Config
    }
    fn params(&self) -> &[ParamSpec] {
        &self.params
    }
    fn execute(&self, ctx: &mut ExecContext<'_>) -> Status {
        match ctx.arg(0) {
            Some(name) if !name.is_empty() && !name.chars().any(char::is_whitespace) => {
                ctx.signal(Signal::Hostname(name.to_string()));
                STATUS_OK
            },
            _ => {
                ctx.println("% Hostname must be a single word");
                STATUS_FAILED
            },
        }
    }
}

// ---------------------------------------------------------------------------
// load / unload
// ---------------------------------------------------------------------------

struct LoadCmd {
    params: Vec<ParamSpec>,
}

impl LoadCmd {
    fn new() -> Self {
        Self {
            params: vec![
                ParamSpec::choice("kind", &["plugin", "directory"]),
                ParamSpec::string("path").help("Descriptor file or plugin directory"),
            ],
        }
    }
}

impl Command for LoadCmd {
    fn name(&self) -> &str {
        "load"
    }
    fn description(&self) -> &str {
        "Load a plugin or a directory of plugins"
    }
    fn view(&self) -> ViewId {
        ViewId::Privileged
    }
    fn params(&self) -> &[ParamSpec] {
        &self.params
    }
    fn execute(&self, ctx: &mut ExecContext<'_>) -> Status {
        let (Some(kind), Some(path)) = (ctx.arg(0), ctx.arg(1)) else {
            return STATUS_FAILED;
        };
        let path = std::path::PathBuf::from(path);
        ctx.signal(match kind {
            "directory" => Signal::LoadPluginDir(path),
            _ => Signal::LoadPlugin(path),
        });
        STATUS_OK
    }
}

struct UnloadCmd {
    params: Vec<ParamSpec>,
}

impl UnloadCmd {
    fn new() -> Self {
        Self {
            params: vec![
                ParamSpec::choice("kind", &["plugin"]),
                ParamSpec::string("name").help("Name of a loaded plugin"),
            ],
        }
    }
}

impl Command for UnloadCmd {
    fn name(&self) -> &str {
        "unload"
    }
    fn description(&self) -> &str {
        "Unload a plugin and remove its commands"
    }
    fn view(&self) -> ViewId {
        ViewId::Privileged
    }
    fn params(&self) -> &[ParamSpec] {
        &self.params
    }
    fn execute(&self, ctx: &mut ExecContext<'_>) -> Status {
        match ctx.arg(1) {
            Some(name) => {
                ctx.signal(Signal::UnloadPlugin(name.to_string()));
                STATUS_OK
            },
            None => STATUS_FAILED,
        }
    }
}
