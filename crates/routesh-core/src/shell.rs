//! The shell session: one registry, one view state machine, one plugin
//! manager, dispatched one line at a time.

use std::any::Any;
use std::path::{Path, PathBuf};

use routesh_plugin::{
    LoadReport, ModuleLoader, NativeLoader, PluginContext, PluginManager, PluginSummary,
    ScanReport,
};
use routesh_terminal::parser::{self, Resolution};
use routesh_terminal::{
    Command, CommandRegistry, ExecContext, Owner, STATUS_OK, Signal, Status, View, ViewId,
    ViewStateMachine,
};
use routesh_types::config::ShellConfig;
use routesh_types::error::{Result, ShellError};

use crate::builtins;

/// Result of dispatching one line.
#[derive(Debug, Default)]
pub struct Dispatch {
    /// Lines to print, in order.
    pub output: Vec<String>,
    /// Handler status, or `None` if no command ran (blank line, `?`).
    pub status: Option<Status>,
    /// Non-fatal failures that happened after the handler returned, such
    /// as a refused view transition or a plugin that failed to load. The
    /// handler's own effects stand.
    pub errors: Vec<ShellError>,
}

impl Dispatch {
    pub fn succeeded(&self) -> bool {
        self.status.is_none_or(|s| s == STATUS_OK) && self.errors.is_empty()
    }
}

/// An interactive shell session.
pub struct Shell {
    config: ShellConfig,
    registry: CommandRegistry,
    views: ViewStateMachine,
    plugins: PluginManager,
    plugin_dir: Option<PathBuf>,
    running: bool,
    user_data: Option<Box<dyn Any>>,
}

impl Shell {
    /// A shell whose plugins load from dynamic libraries only.
    pub fn new(config: ShellConfig) -> Result<Self> {
        let loader = NativeLoader::new(config.resolve_plugin_dir());
        Self::with_loader(config, Box::new(loader))
    }

    /// A shell using `loader` to open plugin code units.
    pub fn with_loader(config: ShellConfig, loader: Box<dyn ModuleLoader>) -> Result<Self> {
        config.validate()?;
        let mut registry = CommandRegistry::new();
        builtins::register_builtins(&mut registry, &config)?;
        let shell = Self {
            views: ViewStateMachine::new(&config.product_name),
            plugins: PluginManager::with_capacity(loader, config.max_plugins),
            plugin_dir: config.resolve_plugin_dir(),
            registry,
            running: true,
            user_data: None,
            config,
        };
        log::debug!(
            "Shell ready: {} builtin commands, plugin dir {:?}",
            shell.registry.len(),
            shell.plugin_dir
        );
        Ok(shell)
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn current_view(&self) -> &ViewId {
        self.views.current()
    }

    pub fn view(&self) -> View {
        self.views.current_view()
    }

    pub fn views(&self) -> &ViewStateMachine {
        &self.views
    }

    pub fn prompt(&self) -> &str {
        self.views.prompt()
    }

    pub fn is_privileged(&self) -> bool {
        self.views.is_privileged()
    }

    /// False once `quit`, `exit` from the user view, or [`stop`](Self::stop)
    /// has run.
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn plugin_dir(&self) -> Option<&Path> {
        self.plugin_dir.as_deref()
    }

    /// Opaque application data handed to every command and plugin.
    pub fn set_user_data(&mut self, data: Box<dyn Any>) {
        self.user_data = Some(data);
    }

    /// Register an application command as a builtin.
    pub fn register(&mut self, command: Box<dyn Command>) -> Result<()> {
        self.registry.register(command, Owner::Builtin)?;
        self.ensure_feature_navigation();
        Ok(())
    }

    /// Resolve and run one input line.
    ///
    /// Resolution errors are returned as `Err`; the caller prints them and
    /// carries on. Once a handler has run the result is always `Ok`.
    pub fn execute_line(&mut self, line: &str) -> Result<Dispatch> {
        let resolution = parser::resolve(&self.registry, line, self.views.current())?;
        let (command, args) = match resolution {
            Resolution::Empty => return Ok(Dispatch::default()),
            Resolution::Help => {
                return Ok(Dispatch {
                    output: parser::help_lines(&self.registry, self.views.current()),
                    ..Dispatch::default()
                });
            },
            Resolution::Command { command, args } => (command, args),
        };

        let name = command.name().to_string();
        let target = command.target_view();
        log::debug!("Dispatching '{name}' in {} view", self.views.current());
        let mut ctx = ExecContext::new(&name, &args, self.views.current(), self.user_data.as_deref());
        let status = command.execute(&mut ctx);
        let (output, signals) = ctx.into_parts();

        let mut dispatch = Dispatch {
            output,
            status: Some(status),
            errors: Vec::new(),
        };
        if status != STATUS_OK {
            log::debug!("'{name}' returned {status}; no transition");
            return Ok(dispatch);
        }

        let label = self.apply_signals(signals, &mut dispatch);
        if let Some(target) = target
            && let Err(e) = self.enter(target, label)
        {
            log::debug!("Transition after '{name}' refused: {e}");
            dispatch.errors.push(e);
        }
        Ok(dispatch)
    }

    /// Completion candidates for `line` with the cursor at byte `cursor`.
    pub fn suggestions(&self, line: &str, cursor: usize) -> Vec<String> {
        parser::suggestions(
            &self.registry,
            self.views.current(),
            line,
            cursor,
            self.config.max_suggestions,
        )
    }

    // -- Plugin API --

    /// Load one plugin from a descriptor file.
    pub fn load_plugin(&mut self, path: &Path) -> Result<LoadReport> {
        let ctx = PluginContext {
            product_name: self.views.product_name(),
            user_data: self.user_data.as_deref(),
        };
        let report = self.plugins.load(path, &mut self.registry, &ctx)?;
        self.ensure_feature_navigation();
        Ok(report)
    }

    /// Load every descriptor in `dir`.
    pub fn load_plugin_dir(&mut self, dir: &Path) -> Result<ScanReport> {
        let ctx = PluginContext {
            product_name: self.views.product_name(),
            user_data: self.user_data.as_deref(),
        };
        let report = self.plugins.load_all(dir, &mut self.registry, &ctx)?;
        self.ensure_feature_navigation();
        Ok(report)
    }

    /// Scan the configured plugin directory, if autoloading is enabled and
    /// the directory exists.
    pub fn autoload(&mut self) -> Option<Result<ScanReport>> {
        if !self.config.autoload_plugins {
            return None;
        }
        let dir = self.plugin_dir.clone()?;
        if !dir.is_dir() {
            log::info!("Plugin directory {} does not exist; skipping", dir.display());
            return None;
        }
        Some(self.load_plugin_dir(&dir))
    }

    /// Unload a plugin by name.
    pub fn unload_plugin(&mut self, name: &str) -> Result<()> {
        let ctx = PluginContext {
            product_name: self.views.product_name(),
            user_data: self.user_data.as_deref(),
        };
        self.plugins.unload(name, &mut self.registry, &ctx)?;
        self.leave_orphaned_views();
        Ok(())
    }

    pub fn plugins(&self) -> Vec<PluginSummary> {
        self.plugins.list()
    }

    /// Stop the session and unload every plugin.
    pub fn shutdown(&mut self) {
        self.running = false;
        let ctx = PluginContext {
            product_name: self.views.product_name(),
            user_data: self.user_data.as_deref(),
        };
        self.plugins.unload_all(&mut self.registry, &ctx);
        self.leave_orphaned_views();
    }

    /// `show plugins` table.
    pub fn plugin_table(&self) -> Vec<String> {
        let plugins = self.plugins.list();
        let mut lines = Vec::with_capacity(plugins.len() + 3);
        if plugins.is_empty() {
            lines.push("No plugins loaded".to_string());
        } else {
            lines.push(format!("{:<16} {:<10} {:<8} {}", "NAME", "VERSION", "COMMANDS", "DESCRIPTION"));
            for p in &plugins {
                lines.push(format!(
                    "{:<16} {:<10} {:<8} {}",
                    p.name, p.version, p.commands, p.description
                ));
            }
        }
        lines.push(format!(
            "Plugin directory: {}",
            self.plugin_dir
                .as_deref()
                .map_or_else(|| "(none)".to_string(), |d| d.display().to_string())
        ));
        lines
    }

    // -- Internals --

    fn apply_signals(&mut self, signals: Vec<Signal>, dispatch: &mut Dispatch) -> Option<String> {
        let mut label = None;
        for signal in signals {
            match signal {
                Signal::Exit => match self.views.exit() {
                    Ok(Some(_)) => {},
                    Ok(None) => self.running = false,
                    Err(e) => dispatch.errors.push(e),
                },
                Signal::End => {
                    if let Err(e) = self.views.end() {
                        dispatch.errors.push(e);
                    }
                },
                Signal::Quit => self.running = false,
                Signal::Privilege(granted) => self.views.set_privilege(granted),
                Signal::FeatureLabel(l) => label = Some(l),
                Signal::Hostname(name) => {
                    if name.is_empty() || name.chars().any(char::is_whitespace) {
                        dispatch
                            .errors
                            .push(ShellError::InvalidArgument(format!("hostname {name:?}")));
                    } else {
                        self.views.set_product_name(&name);
                        self.config.product_name = name;
                    }
                },
                Signal::ListCommands => dispatch
                    .output
                    .extend(parser::help_lines(&self.registry, self.views.current())),
                Signal::ListPlugins => dispatch.output.extend(self.plugin_table()),
                Signal::LoadPlugin(path) => match self.load_plugin(&path) {
                    Ok(report) => dispatch.output.extend(describe_load(&report)),
                    Err(e) => dispatch.errors.push(e),
                },
                Signal::LoadPluginDir(dir) => match self.load_plugin_dir(&dir) {
                    Ok(report) => {
                        for loaded in &report.loaded {
                            dispatch.output.extend(describe_load(loaded));
                        }
                        dispatch.output.push(format!(
                            "Loaded {} plugin(s) from {}",
                            report.loaded_count(),
                            dir.display()
                        ));
                        dispatch
                            .errors
                            .extend(report.failures.into_iter().map(|(_, e)| e.into()));
                    },
                    Err(e) => dispatch.errors.push(e),
                },
                Signal::UnloadPlugin(name) => match self.unload_plugin(&name) {
                    Ok(()) => dispatch.output.push(format!("Unloaded plugin {name}")),
                    Err(e) => dispatch.errors.push(e),
                },
            }
        }
        label
    }

    fn enter(&mut self, target: ViewId, label: Option<String>) -> Result<()> {
        match target {
            ViewId::Feature(family) => {
                let label = label.unwrap_or_else(|| family.clone());
                self.views.enter_feature(&family, &label, true)?;
                Ok(())
            },
            base => self.views.set(base),
        }
    }

    /// Give every feature family some command targets its own `help`,
    /// `exit`, and `end`, unless it already has them.
    ///
    /// Navigation is owned by whoever owns the entering command, so it
    /// goes away with the plugin that introduced the family.
    /// Fall back to the config view when a feature view on the stack has
    /// no commands left.
    fn leave_orphaned_views(&mut self) {
        let orphaned = self
            .views
            .feature_families()
            .find(|family| {
                let view = ViewId::feature(*family);
                self.registry.commands_in(&view).next().is_none()
            })
            .map(str::to_string);
        let Some(family) = orphaned else {
            return;
        };
        log::info!("Feature view {family} has no commands left; returning to config");
        if let Err(e) = self.views.set(ViewId::Config) {
            log::warn!("Could not leave feature view {family}: {e}");
        }
    }

    fn ensure_feature_navigation(&mut self) {
        let families: Vec<(ViewId, Owner)> = self
            .registry
            .iter()
            .filter_map(|(c, owner)| {
                c.target_view()
                    .filter(ViewId::is_feature)
                    .map(|v| (v, owner.clone()))
            })
            .collect();
        for (view, owner) in families {
            for cmd in builtins::feature_navigation(&view) {
                if self.registry.contains(cmd.name(), &view) {
                    continue;
                }
                if let Err(e) = self.registry.register(cmd, owner.clone()) {
                    log::warn!("Could not add navigation to {view}: {e}");
                }
            }
        }
    }
}

impl Drop for Shell {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn describe_load(report: &LoadReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Loaded plugin {} v{} ({} commands)",
        report.name, report.version, report.registered
    )];
    for s in &report.skipped {
        lines.push(format!("% Skipped command '{}' in {} view: {}", s.name, s.view, s.reason));
    }
    for d in &report.declared {
        let mut line = format!(
            "Would register command '{}' with handler '{}'",
            d.name, d.handler
        );
        if let Some(view) = &d.view {
            line.push_str(&format!(" in {view} view"));
        }
        lines.push(line);
    }
    lines
}

/// Format an error for the terminal.
///
/// Parse errors get a caret line aligned under the offending column,
/// assuming the input was typed right after `prompt`.
pub fn render_error(prompt: &str, err: &ShellError) -> Vec<String> {
    match err {
        ShellError::Parse(p) => vec![
            parser::caret_line(prompt.chars().count(), p.column()),
            p.to_string(),
        ],
        other => {
            let msg = other.to_string();
            if msg.starts_with('%') {
                vec![msg]
            } else {
                vec![format!("% {msg}")]
            }
        },
    }
}
