//! The routesh shell session.
//!
//! [`Shell`] owns the command registry, the view state machine, and the
//! plugin manager, and turns input lines into dispatched commands.

pub mod builtins;
pub mod shell;

pub use shell::{Dispatch, Shell, render_error};
