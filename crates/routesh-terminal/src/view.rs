//! Views and the view state machine.
//!
//! A view is a named interaction context: it scopes which commands are
//! visible and determines the prompt. The three base views form a fixed
//! ladder (user, privileged, config). Feature views sit above config and
//! are pushed at runtime when a command enters a sub-mode such as
//! interface configuration. They form a stack so that `exit` unwinds one
//! level at a time.

use std::fmt;

use routesh_types::error::{Result, ShellError};

/// Identifies a view.
///
/// Feature views are identified by their family name, which is also the
/// scope commands register under (e.g. every `interface <name>` sub-mode
/// shares the `if` family).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewId {
    User,
    Privileged,
    Config,
    Feature(String),
}

impl ViewId {
    /// Shorthand for `ViewId::Feature(name.into())`.
    pub fn feature(name: impl Into<String>) -> Self {
        Self::Feature(name.into())
    }

    /// Stable lowercase name, used in diagnostics and descriptors.
    pub fn name(&self) -> &str {
        match self {
            Self::User => "user",
            Self::Privileged => "privileged",
            Self::Config => "config",
            Self::Feature(name) => name,
        }
    }

    /// Parse the textual form used in plugin descriptors.
    ///
    /// `user`, `privileged` (or `enable`), and `config` name the base views.
    /// `feature:<name>` names a feature family.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Self::User),
            "privileged" | "enable" => Some(Self::Privileged),
            "config" => Some(Self::Config),
            other => other
                .strip_prefix("feature:")
                .filter(|name| !name.is_empty())
                .map(Self::feature),
        }
    }

    pub fn is_feature(&self) -> bool {
        matches!(self, Self::Feature(_))
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Feature(name) => write!(f, "feature:{name}"),
            base => f.write_str(base.name()),
        }
    }
}

/// Descriptor for the current (or any base) view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub id: ViewId,
    /// Display name; for feature views this is the instance label.
    pub name: String,
    pub prompt: String,
    pub requires_privilege: bool,
}

/// One pushed feature view.
#[derive(Debug, Clone)]
struct FeatureFrame {
    family: String,
    label: String,
    requires_privilege: bool,
}

/// Tracks the current view, the feature stack, and the session privilege.
#[derive(Debug)]
pub struct ViewStateMachine {
    product: String,
    current: ViewId,
    privileged: bool,
    features: Vec<FeatureFrame>,
    prompt: String,
}

impl ViewStateMachine {
    /// Start in the user view, unprivileged.
    pub fn new(product_name: &str) -> Self {
        let mut vsm = Self {
            product: product_name.to_string(),
            current: ViewId::User,
            privileged: false,
            features: Vec::new(),
            prompt: String::new(),
        };
        vsm.refresh_prompt();
        vsm
    }

    pub fn current(&self) -> &ViewId {
        &self.current
    }

    /// Descriptor of the current view.
    pub fn current_view(&self) -> View {
        View {
            id: self.current.clone(),
            name: match self.features.last() {
                Some(frame) if self.current.is_feature() => frame.label.clone(),
                _ => self.current.name().to_string(),
            },
            prompt: self.prompt.clone(),
            requires_privilege: self.requires_privilege(&self.current),
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn product_name(&self) -> &str {
        &self.product
    }

    /// Change the product name shown in every prompt.
    pub fn set_product_name(&mut self, name: &str) {
        self.product = name.to_string();
        self.refresh_prompt();
    }

    pub fn is_privileged(&self) -> bool {
        self.privileged
    }

    /// Grant or revoke the session privilege.
    ///
    /// Revoking does not move the current view; callers transition to the
    /// user view themselves.
    pub fn set_privilege(&mut self, privileged: bool) {
        if self.privileged != privileged {
            log::debug!("Session privilege {}", if privileged { "granted" } else { "revoked" });
        }
        self.privileged = privileged;
    }

    /// Whether the session may enter `view` right now.
    ///
    /// Unknown feature families are never enterable.
    pub fn has_privilege(&self, view: &ViewId) -> bool {
        if let ViewId::Feature(family) = view
            && self.find_feature(family).is_none()
        {
            return false;
        }
        !self.requires_privilege(view) || self.privileged
    }

    /// Number of pushed feature views.
    pub fn feature_depth(&self) -> usize {
        self.features.len()
    }

    /// Families on the feature stack, bottom first.
    pub fn feature_families(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|f| f.family.as_str())
    }

    /// Push a feature view without entering it.
    ///
    /// `label` is substituted into the prompt template
    /// `NAME(config-<label>)# `; it defaults to the family when empty.
    pub fn register_feature(
        &mut self,
        family: &str,
        label: &str,
        requires_privilege: bool,
    ) -> ViewId {
        let label = if label.is_empty() { family } else { label };
        self.features.push(FeatureFrame {
            family: family.to_string(),
            label: label.to_string(),
            requires_privilege,
        });
        log::debug!("Registered feature view {family} ({label})");
        ViewId::feature(family)
    }

    /// Check privilege, push a feature view, and enter it.
    ///
    /// On failure the stack is left untouched.
    pub fn enter_feature(
        &mut self,
        family: &str,
        label: &str,
        requires_privilege: bool,
    ) -> Result<ViewId> {
        if family.is_empty() {
            return Err(ShellError::InvalidView("feature family must not be empty".into()));
        }
        if requires_privilege && !self.privileged {
            return Err(ShellError::InsufficientPrivilege(family.to_string()));
        }
        let id = self.register_feature(family, label, requires_privilege);
        self.current = id.clone();
        self.refresh_prompt();
        Ok(id)
    }

    /// Transition to `view`.
    ///
    /// Entering a base view discards the feature stack. Entering a feature
    /// view selects the topmost pushed frame of that family and pops the
    /// frames above it. On error nothing changes.
    pub fn set(&mut self, view: ViewId) -> Result<()> {
        match &view {
            ViewId::Feature(family) => {
                let idx = self
                    .find_feature(family)
                    .ok_or_else(|| ShellError::InvalidView(view.to_string()))?;
                if self.features[idx].requires_privilege && !self.privileged {
                    return Err(ShellError::InsufficientPrivilege(view.to_string()));
                }
                self.features.truncate(idx + 1);
            },
            base => {
                if self.requires_privilege(base) && !self.privileged {
                    return Err(ShellError::InsufficientPrivilege(base.to_string()));
                }
                self.features.clear();
            },
        }
        log::debug!("View {} -> {}", self.current, view);
        self.current = view;
        self.refresh_prompt();
        Ok(())
    }

    /// Leave the current view, one level up.
    ///
    /// Leaving the privileged view drops the session privilege. Returns the
    /// new view, or `None` when exiting the user view, which ends the
    /// session.
    pub fn exit(&mut self) -> Result<Option<ViewId>> {
        let next = match &self.current {
            ViewId::User => return Ok(None),
            ViewId::Privileged => ViewId::User,
            ViewId::Config => ViewId::Privileged,
            ViewId::Feature(_) => {
                self.features.pop();
                match self.features.last() {
                    Some(frame) => ViewId::feature(frame.family.clone()),
                    None => ViewId::Config,
                }
            },
        };
        if let ViewId::Feature(_) = next {
            // The frame is already on top; just make it current.
            self.current = next.clone();
            self.refresh_prompt();
        } else {
            self.set(next.clone())?;
        }
        if next == ViewId::User {
            self.set_privilege(false);
        }
        Ok(Some(next))
    }

    /// Return to the privileged view from config or any feature view.
    ///
    /// From user or privileged this is a no-op.
    pub fn end(&mut self) -> Result<ViewId> {
        match self.current {
            ViewId::User | ViewId::Privileged => Ok(self.current.clone()),
            _ => {
                self.set(ViewId::Privileged)?;
                Ok(ViewId::Privileged)
            },
        }
    }

    fn requires_privilege(&self, view: &ViewId) -> bool {
        match view {
            ViewId::User => false,
            ViewId::Privileged | ViewId::Config => true,
            ViewId::Feature(family) => self
                .find_feature(family)
                .is_some_and(|idx| self.features[idx].requires_privilege),
        }
    }

    fn find_feature(&self, family: &str) -> Option<usize> {
        self.features.iter().rposition(|f| f.family == family)
    }

    fn refresh_prompt(&mut self) {
        let p = &self.product;
        self.prompt = match &self.current {
            ViewId::User => format!("{p}> "),
            ViewId::Privileged => format!("{p}# "),
            ViewId::Config => format!("{p}(config)# "),
            ViewId::Feature(family) => {
                let label = self
                    .features
                    .last()
                    .map_or(family.as_str(), |f| f.label.as_str());
                format!("{p}(config-{label})# ")
            },
        };
    }
}
