//! Command trait and per-invocation context.

use std::any::Any;
use std::path::PathBuf;

use crate::param::ParamSpec;
use crate::view::ViewId;

/// Handler status code. `STATUS_OK` means success; anything else is a
/// failure that suppresses the command's view transition.
pub type Status = i32;

pub const STATUS_OK: Status = 0;
pub const STATUS_FAILED: Status = 1;

/// Shell-level effects a command asks for.
///
/// Commands never touch the shell directly. They queue signals on the
/// context and the shell applies them after a successful return, in
/// order, before the command's static target view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Leave the current view, one level up. Exiting the user view quits.
    Exit,
    /// Return to the privileged view.
    End,
    /// Stop the dispatch loop.
    Quit,
    /// Grant or revoke the session privilege.
    Privilege(bool),
    /// Instance label for the feature view this command enters.
    FeatureLabel(String),
    /// Change the product name shown in prompts.
    Hostname(String),
    /// Print the commands of the current view.
    ListCommands,
    /// Print the loaded plugins.
    ListPlugins,
    /// Load one plugin from a descriptor file.
    LoadPlugin(PathBuf),
    /// Load every descriptor in a directory.
    LoadPluginDir(PathBuf),
    /// Unload a plugin by name.
    UnloadPlugin(String),
}

/// Everything a command sees while it runs.
pub struct ExecContext<'a> {
    /// Name the command was invoked as.
    pub command: &'a str,
    /// Validated arguments, command name excluded.
    pub args: &'a [String],
    /// View the command was resolved in.
    pub view: &'a ViewId,
    /// Opaque application data supplied to the shell.
    pub user_data: Option<&'a dyn Any>,
    output: Vec<String>,
    signals: Vec<Signal>,
}

impl<'a> ExecContext<'a> {
    pub fn new(
        command: &'a str,
        args: &'a [String],
        view: &'a ViewId,
        user_data: Option<&'a dyn Any>,
    ) -> Self {
        Self {
            command,
            args,
            view,
            user_data,
            output: Vec::new(),
            signals: Vec::new(),
        }
    }

    /// Argument at `index`, if present.
    pub fn arg(&self, index: usize) -> Option<&'a str> {
        self.args.get(index).map(String::as_str)
    }

    /// Append one line of output.
    pub fn println(&mut self, line: impl Into<String>) {
        self.output.push(line.into());
    }

    pub fn signal(&mut self, signal: Signal) {
        self.signals.push(signal);
    }

    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    /// Consume the context, yielding output lines and queued signals.
    pub fn into_parts(self) -> (Vec<String>, Vec<Signal>) {
        (self.output, self.signals)
    }
}

/// A single executable command.
pub trait Command {
    /// The command name (what the user types). A single token.
    fn name(&self) -> &str;

    /// One-line description for `?` and `help`.
    fn description(&self) -> &str;

    /// View the command is registered in.
    fn view(&self) -> ViewId;

    /// Positional parameter schema.
    fn params(&self) -> &[ParamSpec] {
        &[]
    }

    /// View entered after a successful run, if any.
    fn target_view(&self) -> Option<ViewId> {
        None
    }

    /// Usage line built from the parameter schema.
    fn usage(&self) -> String {
        let mut usage = self.name().to_string();
        for p in self.params() {
            usage.push(' ');
            usage.push_str(&p.usage());
        }
        usage
    }

    /// Run the command. Arguments have already been validated.
    fn execute(&self, ctx: &mut ExecContext<'_>) -> Status;
}

type Handler = Box<dyn Fn(&mut ExecContext<'_>) -> Status>;

/// A command assembled from parts, with a closure handler.
///
/// Plugins build most of their commands this way:
///
/// ```
/// use routesh_terminal::{CommandDef, ParamSpec, ViewId, STATUS_OK};
///
/// let cmd = CommandDef::new("hostname", "Set system name", ViewId::Config)
///     .param(ParamSpec::string("name"))
///     .handler(|ctx| {
///         ctx.println(format!("name is {}", ctx.args[0]));
///         STATUS_OK
///     });
/// # let _ = cmd;
/// ```
pub struct CommandDef {
    name: String,
    description: String,
    view: ViewId,
    params: Vec<ParamSpec>,
    target: Option<ViewId>,
    handler: Handler,
}

impl CommandDef {
    /// A command with no parameters whose handler succeeds silently.
    pub fn new(name: impl Into<String>, description: impl Into<String>, view: ViewId) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            view,
            params: Vec::new(),
            target: None,
            handler: Box::new(|_| STATUS_OK),
        }
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Enter `view` after a successful run.
    pub fn enters(mut self, view: ViewId) -> Self {
        self.target = Some(view);
        self
    }

    pub fn handler<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut ExecContext<'_>) -> Status + 'static,
    {
        self.handler = Box::new(f);
        self
    }

    /// Box the definition for registration.
    pub fn boxed(self) -> Box<dyn Command> {
        Box::new(self)
    }
}

impl Command for CommandDef {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn view(&self) -> ViewId {
        self.view.clone()
    }

    fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    fn target_view(&self) -> Option<ViewId> {
        self.target.clone()
    }

    fn execute(&self, ctx: &mut ExecContext<'_>) -> Status {
        (self.handler)(ctx)
    }
}
