//! Typed parameter schema and argument validation.

use routesh_types::error::ValidationError;

/// Kind of value a parameter accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    /// Accepts anything; placeholder for flag-like slots.
    None,
    String,
    /// Optional leading `-` followed by one or more ASCII digits.
    Integer,
    /// Dotted-quad IPv4 address, each octet 0-255.
    IpAddress,
    /// One of a fixed set of literals, compared exactly.
    Choice(Vec<String>),
}

impl ParamKind {
    /// Whether `arg` is a well-formed value of this kind.
    pub fn accepts(&self, arg: &str) -> bool {
        match self {
            Self::None | Self::String => true,
            Self::Integer => is_integer(arg),
            Self::IpAddress => is_ipv4(arg),
            Self::Choice(choices) => choices.iter().any(|c| c == arg),
        }
    }

    /// Short placeholder for usage lines.
    pub fn placeholder(&self) -> String {
        match self {
            Self::None => "<flag>".to_string(),
            Self::String => "<word>".to_string(),
            Self::Integer => "<number>".to_string(),
            Self::IpAddress => "<A.B.C.D>".to_string(),
            Self::Choice(choices) => format!("{{{}}}", choices.join("|")),
        }
    }
}

/// One positional parameter of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub help: String,
}

impl ParamSpec {
    /// A required parameter of the given kind.
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            help: String::new(),
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Integer)
    }

    pub fn ip_address(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::IpAddress)
    }

    pub fn choice<S: AsRef<str>>(name: impl Into<String>, choices: &[S]) -> Self {
        let choices = choices.iter().map(|c| c.as_ref().to_string()).collect();
        Self::new(name, ParamKind::Choice(choices))
    }

    /// Mark the parameter optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.help = text.into();
        self
    }

    /// Usage fragment: `<placeholder>` or `[<placeholder>]`.
    pub fn usage(&self) -> String {
        let body = match &self.kind {
            ParamKind::Choice(_) => self.kind.placeholder(),
            kind => format!("{}:{}", self.name, kind.placeholder()),
        };
        if self.required { body } else { format!("[{body}]") }
    }
}

/// Check `args` against the parameter schema.
///
/// Rules apply in order: required-count, then extra arguments, then per
/// argument kind. The error carries the argument index the caret should
/// point at.
pub fn validate<S: AsRef<str>>(params: &[ParamSpec], args: &[S]) -> Result<(), ValidationError> {
    let required = params.iter().filter(|p| p.required).count();
    if args.len() < required {
        return Err(ValidationError::Incomplete { index: args.len() });
    }
    if args.len() > params.len() {
        return Err(ValidationError::TooMany {
            index: params.len(),
        });
    }
    for (index, (param, arg)) in params.iter().zip(args).enumerate() {
        if !param.kind.accepts(arg.as_ref()) {
            return Err(ValidationError::WrongType { index });
        }
    }
    Ok(())
}

fn is_integer(arg: &str) -> bool {
    let digits = arg.strip_prefix('-').unwrap_or(arg);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_ipv4(arg: &str) -> bool {
    let mut octets = 0;
    for part in arg.split('.') {
        octets += 1;
        if octets > 4 || part.is_empty() || part.len() > 3 {
            return false;
        }
        if !part.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        match part.parse::<u16>() {
            Ok(n) if n <= 255 => {},
            _ => return false,
        }
    }
    octets == 4
}
