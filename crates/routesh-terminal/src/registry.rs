//! Command registry keyed by (name, view).

use std::collections::HashMap;

use routesh_types::error::{Result, ShellError};

use crate::command::Command;
use crate::param::ParamKind;
use crate::view::ViewId;

/// Who registered a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    Builtin,
    Plugin(String),
}

/// Which views a lookup considers.
#[derive(Debug, Clone, Copy)]
pub enum ViewScope<'a> {
    In(&'a ViewId),
    /// Every view; the first registered match wins.
    Any,
}

impl<'a> From<&'a ViewId> for ViewScope<'a> {
    fn from(view: &'a ViewId) -> Self {
        Self::In(view)
    }
}

struct Entry {
    name: String,
    view: ViewId,
    owner: Owner,
    command: Box<dyn Command>,
}

/// Registry of available commands.
///
/// Entries keep registration order, which is also listing order. The
/// name/view key is captured at registration so lookups never call back
/// into plugin code.
#[derive(Default)]
pub struct CommandRegistry {
    entries: Vec<Entry>,
    index: HashMap<(String, ViewId), usize>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command.
    ///
    /// Fails with `DuplicateName` if the (name, view) key is taken, and with
    /// `InvalidArgument` if the command is malformed: an empty or
    /// multi-token name, a choice parameter without choices, or a feature
    /// target without a family.
    pub fn register(&mut self, command: Box<dyn Command>, owner: Owner) -> Result<()> {
        let name = command.name().to_string();
        let view = command.view();
        if name.is_empty() || name.chars().any(char::is_whitespace) || name.contains('"') {
            return Err(ShellError::InvalidArgument(format!(
                "command name {name:?} must be a single token"
            )));
        }
        if let Some(p) = command
            .params()
            .iter()
            .find(|p| matches!(&p.kind, ParamKind::Choice(c) if c.is_empty()))
        {
            return Err(ShellError::InvalidArgument(format!(
                "parameter '{}' of '{name}' has no choices",
                p.name
            )));
        }
        if matches!(command.target_view(), Some(ViewId::Feature(ref f)) if f.is_empty())
            || matches!(&view, ViewId::Feature(f) if f.is_empty())
        {
            return Err(ShellError::InvalidArgument(format!(
                "command '{name}' names an empty feature view"
            )));
        }
        let key = (name, view);
        if self.index.contains_key(&key) {
            let (name, view) = key;
            return Err(ShellError::DuplicateName {
                name,
                view: view.to_string(),
            });
        }
        log::debug!("Registered command '{}' in {} view", key.0, key.1);
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push(Entry {
            name: key.0,
            view: key.1,
            owner,
            command,
        });
        Ok(())
    }

    /// Look up a command by exact name.
    pub fn find<'s>(&self, name: &str, scope: impl Into<ViewScope<'s>>) -> Option<&dyn Command> {
        match scope.into() {
            ViewScope::In(view) => self
                .index
                .get(&(name.to_string(), view.clone()))
                .map(|&i| self.entries[i].command.as_ref()),
            ViewScope::Any => self
                .entries
                .iter()
                .find(|e| e.name == name)
                .map(|e| e.command.as_ref()),
        }
    }

    /// Whether (name, view) is registered.
    pub fn contains(&self, name: &str, view: &ViewId) -> bool {
        self.index.contains_key(&(name.to_string(), view.clone()))
    }

    /// Owner of the command registered under (name, view).
    pub fn owner_of(&self, name: &str, view: &ViewId) -> Option<&Owner> {
        self.index
            .get(&(name.to_string(), view.clone()))
            .map(|&i| &self.entries[i].owner)
    }

    /// Commands whose name starts with `prefix`, in registration order,
    /// capped at `max`.
    pub fn matches_by_prefix<'s>(
        &self,
        prefix: &str,
        scope: impl Into<ViewScope<'s>>,
        max: usize,
    ) -> Vec<&dyn Command> {
        let scope = scope.into();
        self.entries
            .iter()
            .filter(|e| match scope {
                ViewScope::In(view) => &e.view == view,
                ViewScope::Any => true,
            })
            .filter(|e| e.name.starts_with(prefix))
            .take(max)
            .map(|e| e.command.as_ref())
            .collect()
    }

    /// Commands registered in `view`, in registration order.
    pub fn commands_in<'s>(&'s self, view: &'s ViewId) -> impl Iterator<Item = &'s dyn Command> {
        self.entries
            .iter()
            .filter(move |e| &e.view == view)
            .map(|e| e.command.as_ref())
    }

    /// Every command with its owner, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&dyn Command, &Owner)> {
        self.entries.iter().map(|e| (e.command.as_ref(), &e.owner))
    }

    /// Remove every command owned by `plugin`. Returns how many went.
    pub fn remove_all_for(&mut self, plugin: &str) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|e| !matches!(&e.owner, Owner::Plugin(p) if p == plugin));
        let removed = before - self.entries.len();
        if removed > 0 {
            self.rebuild_index();
            log::debug!("Removed {removed} command(s) owned by plugin {plugin}");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| ((e.name.clone(), e.view.clone()), i))
            .collect();
    }
}
