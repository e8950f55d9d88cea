//! Command resolution core.
//!
//! The terminal is a registry-based dispatch system scoped by views.
//! Commands implement the `Command` trait and are registered under a
//! (name, view) key. The resolver tokenizes an input line, looks the first
//! token up in the current view, and validates the remaining tokens against
//! the command's parameter schema before the shell dispatches `execute()`.

pub mod command;
pub mod param;
pub mod parser;
pub mod registry;
pub mod view;

/// A single executable command trait.
pub use command::Command;
/// Closure-backed command definition.
pub use command::CommandDef;
/// Per-invocation context handed to `Command::execute`.
pub use command::ExecContext;
/// Shell-level effects requested by a command.
pub use command::Signal;
/// Handler status code (0 = success).
pub use command::{STATUS_FAILED, STATUS_OK, Status};
/// Typed parameter descriptors and the validator.
pub use param::{ParamKind, ParamSpec, validate};
/// Tokenizer, resolver, and completion.
pub use parser::{Resolution, Token, caret_line, help_lines, resolve, suggestions, tokenize};
/// Registry of commands keyed by (name, view).
pub use registry::{CommandRegistry, Owner, ViewScope};
/// View identifiers, descriptors, and the view state machine.
pub use view::{View, ViewId, ViewStateMachine};
