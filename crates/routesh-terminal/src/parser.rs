//! Line tokenizer, command resolver, and completion.
//!
//! Tokens are separated by ASCII whitespace. A double quote toggles a
//! quoted run in which whitespace is literal; the quote characters
//! themselves are dropped and there are no escapes.

use routesh_types::error::ParseError;

use crate::command::Command;
use crate::param::ParamKind;
use crate::registry::CommandRegistry;
use crate::view::ViewId;

/// One token with the byte column where it starts in the input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub column: usize,
}

/// What a line resolved to.
pub enum Resolution<'r> {
    /// Blank line; nothing to do.
    Empty,
    /// A bare `?`: list the commands of the current view.
    Help,
    /// A command and its validated arguments.
    Command {
        command: &'r dyn Command,
        args: Vec<String>,
    },
}

/// Split a line into tokens.
pub fn tokenize(line: &str) -> Vec<Token> {
    scan(line).0
}

/// Tokenize and report whether the line ends inside an open quote.
fn scan(line: &str) -> (Vec<Token>, bool) {
    let mut tokens = Vec::new();
    let mut current: Option<Token> = None;
    let mut quoted = false;

    for (i, ch) in line.char_indices() {
        if ch == '"' {
            quoted = !quoted;
            current.get_or_insert_with(|| Token {
                text: String::new(),
                column: i,
            });
        } else if ch.is_ascii_whitespace() && !quoted {
            if let Some(tok) = current.take() {
                tokens.push(tok);
            }
        } else {
            current
                .get_or_insert_with(|| Token {
                    text: String::new(),
                    column: i,
                })
                .text
                .push(ch);
        }
    }
    if let Some(tok) = current {
        tokens.push(tok);
    }
    (tokens, quoted)
}

/// Resolve `line` against the commands visible in `view`.
///
/// The first token must name a command in `view` exactly; the rest are
/// validated against its parameter schema. The error carries the column
/// the caret should point at.
pub fn resolve<'r>(
    registry: &'r CommandRegistry,
    line: &str,
    view: &ViewId,
) -> Result<Resolution<'r>, ParseError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(Resolution::Empty);
    }
    if trimmed == "?" {
        return Ok(Resolution::Help);
    }

    let mut tokens = tokenize(line).into_iter();
    let Some(head) = tokens.next() else {
        return Ok(Resolution::Empty);
    };
    let Some(command) = registry.find(&head.text, view) else {
        return Err(ParseError::Unrecognized {
            column: head.column,
        });
    };

    let rest: Vec<Token> = tokens.collect();
    let args: Vec<String> = rest.iter().map(|t| t.text.clone()).collect();
    if let Err(source) = crate::param::validate(command.params(), &args) {
        let column = rest
            .get(source.index())
            .map_or(line.trim_end().len(), |t| t.column);
        return Err(ParseError::Invalid { column, source });
    }
    Ok(Resolution::Command { command, args })
}

/// Completion candidates for `line` with the cursor at byte `cursor`.
///
/// Only the text left of the cursor matters. While the first token is
/// being typed, candidates are command names of `view` by prefix. After
/// that, candidates are the choices of the parameter being typed, if it
/// is a choice parameter.
pub fn suggestions(
    registry: &CommandRegistry,
    view: &ViewId,
    line: &str,
    cursor: usize,
    max: usize,
) -> Vec<String> {
    let mut cursor = cursor.min(line.len());
    while !line.is_char_boundary(cursor) {
        cursor -= 1;
    }
    let head = &line[..cursor];
    let (tokens, quoted) = scan(head);
    let at_boundary = !quoted && head.ends_with(|c: char| c.is_ascii_whitespace());

    let (command_prefix, arg_index, partial) = match (tokens.as_slice(), at_boundary) {
        ([], _) => return names(registry, view, "", max),
        ([first], false) => return names(registry, view, &first.text, max),
        ([first, rest @ ..], true) => (&first.text, rest.len(), ""),
        ([first, rest @ ..], false) => {
            let partial = rest.last().map_or("", |t| t.text.as_str());
            (&first.text, rest.len() - 1, partial)
        },
    };

    let Some(command) = registry.find(command_prefix, view) else {
        return Vec::new();
    };
    match command.params().get(arg_index).map(|p| &p.kind) {
        Some(ParamKind::Choice(choices)) => choices
            .iter()
            .filter(|c| c.starts_with(partial))
            .take(max)
            .cloned()
            .collect(),
        _ => Vec::new(),
    }
}

fn names(registry: &CommandRegistry, view: &ViewId, prefix: &str, max: usize) -> Vec<String> {
    registry
        .matches_by_prefix(prefix, view, max)
        .into_iter()
        .map(|c| c.name().to_string())
        .collect()
}

/// Help listing for `view`: one `  name                 description` line
/// per command.
pub fn help_lines(registry: &CommandRegistry, view: &ViewId) -> Vec<String> {
    registry
        .commands_in(view)
        .map(|c| format!("  {:<20} {}", c.name(), c.description()))
        .collect()
}

/// A caret under `column`, shifted right by `indent` (the prompt width).
pub fn caret_line(indent: usize, column: usize) -> String {
    format!("{}^", " ".repeat(indent + column))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandDef;
    use crate::param::ParamSpec;
    use crate::registry::Owner;
    use routesh_types::error::ValidationError;

    fn registry() -> CommandRegistry {
        let mut reg = CommandRegistry::new();
        let defs = [
            CommandDef::new("show", "Show running system information", ViewId::Privileged)
                .param(ParamSpec::choice("topic", &["commands", "plugins", "version"])),
            CommandDef::new("shutdown", "Shut down", ViewId::Privileged),
            CommandDef::new("ping", "Send echo messages", ViewId::Privileged)
                .param(ParamSpec::ip_address("target"))
                .param(ParamSpec::integer("count").optional()),
            CommandDef::new("enable", "Turn on privileged commands", ViewId::User),
            CommandDef::new("description", "Set description", ViewId::feature("if"))
                .param(ParamSpec::string("text")),
        ];
        for d in defs {
            reg.register(d.boxed(), Owner::Builtin).unwrap();
        }
        reg
    }

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn tokenize_quoted_argument_after_plain_ones() {
        let t = tokenize("interface eth0 \"up now\"");
        assert_eq!(texts(&t), vec!["interface", "eth0", "up now"]);
        assert_eq!(t[2].column, 15);
    }

    #[test]
    fn tokenize_simple() {
        let t = tokenize("  ping 10.0.0.1   5 ");
        assert_eq!(texts(&t), vec!["ping", "10.0.0.1", "5"]);
        assert_eq!(t[0].column, 2);
        assert_eq!(t[1].column, 7);
        assert_eq!(t[2].column, 18);
    }

    #[test]
    fn tokenize_quotes_group_whitespace() {
        let t = tokenize("description \"uplink to core\" x");
        assert_eq!(texts(&t), vec!["description", "uplink to core", "x"]);
        assert_eq!(t[1].column, 12);
    }

    #[test]
    fn tokenize_quotes_join_adjacent_text() {
        let t = tokenize("a\"b c\"d");
        assert_eq!(texts(&t), vec!["ab cd"]);
    }

    #[test]
    fn tokenize_empty_quotes_yield_empty_token() {
        let t = tokenize("x \"\"");
        assert_eq!(texts(&t), vec!["x", ""]);
    }

    #[test]
    fn tokenize_unterminated_quote_runs_to_end() {
        let t = tokenize("description \"half open");
        assert_eq!(texts(&t), vec!["description", "half open"]);
    }

    #[test]
    fn tokenize_tabs() {
        assert_eq!(texts(&tokenize("a\tb")), vec!["a", "b"]);
    }

    #[test]
    fn resolve_blank_and_help() {
        let reg = registry();
        assert!(matches!(
            resolve(&reg, "   ", &ViewId::User),
            Ok(Resolution::Empty)
        ));
        assert!(matches!(resolve(&reg, "", &ViewId::User), Ok(Resolution::Empty)));
        assert!(matches!(resolve(&reg, " ? ", &ViewId::User), Ok(Resolution::Help)));
    }

    #[test]
    fn resolve_command_with_args() {
        let reg = registry();
        let view = ViewId::Privileged;
        match resolve(&reg, "ping 10.0.0.1 3", &view) {
            Ok(Resolution::Command { command, args }) => {
                assert_eq!(command.name(), "ping");
                assert_eq!(args, vec!["10.0.0.1", "3"]);
            },
            _ => panic!("expected command"),
        }
    }

    #[test]
    fn unrecognized_points_at_first_token() {
        let reg = registry();
        let err = resolve(&reg, "  bogus", &ViewId::User).err().unwrap();
        assert_eq!(err, ParseError::Unrecognized { column: 2 });
    }

    #[test]
    fn command_from_other_view_is_unrecognized() {
        let reg = registry();
        let err = resolve(&reg, "show version", &ViewId::User).err().unwrap();
        assert!(matches!(err, ParseError::Unrecognized { column: 0 }));
    }

    #[test]
    fn prefix_is_not_a_match() {
        let reg = registry();
        assert!(resolve(&reg, "sh version", &ViewId::Privileged).is_err());
    }

    #[test]
    fn incomplete_points_past_end_of_line() {
        let reg = registry();
        let err = resolve(&reg, "show  ", &ViewId::Privileged).err().unwrap();
        assert_eq!(
            err,
            ParseError::Invalid {
                column: 4,
                source: ValidationError::Incomplete { index: 0 },
            }
        );
    }

    #[test]
    fn wrong_type_points_at_argument() {
        let reg = registry();
        let err = resolve(&reg, "ping 10.0.0.300", &ViewId::Privileged)
            .err()
            .unwrap();
        assert_eq!(err.column(), 5);
        assert_eq!(err.to_string(), "% Wrong parameter found at '^' position.");
    }

    #[test]
    fn too_many_points_at_extra_argument() {
        let reg = registry();
        let err = resolve(&reg, "shutdown now", &ViewId::Privileged)
            .err()
            .unwrap();
        assert_eq!(err.column(), 9);
        assert_eq!(err.to_string(), "% Too many parameters found at '^' position.");
    }

    #[test]
    fn quoted_argument_counts_as_one() {
        let reg = registry();
        let view = ViewId::feature("if");
        assert!(resolve(&reg, "description \"to core switch\"", &view).is_ok());
    }

    #[test]
    fn suggest_all_commands_on_empty_line() {
        let reg = registry();
        let s = suggestions(&reg, &ViewId::Privileged, "", 0, 64);
        assert_eq!(s, vec!["show", "shutdown", "ping"]);
    }

    #[test]
    fn suggest_command_names_by_prefix() {
        let reg = registry();
        let s = suggestions(&reg, &ViewId::Privileged, "sh", 2, 64);
        assert_eq!(s, vec!["show", "shutdown"]);
    }

    #[test]
    fn suggest_uses_text_left_of_cursor() {
        let reg = registry();
        let s = suggestions(&reg, &ViewId::Privileged, "show", 3, 64);
        assert_eq!(s, vec!["show"]);
    }

    #[test]
    fn suggest_choices_after_command() {
        let reg = registry();
        let s = suggestions(&reg, &ViewId::Privileged, "show ", 5, 64);
        assert_eq!(s, vec!["commands", "plugins", "version"]);
        let s = suggestions(&reg, &ViewId::Privileged, "show p", 6, 64);
        assert_eq!(s, vec!["plugins"]);
    }

    #[test]
    fn suggest_nothing_for_free_form_params() {
        let reg = registry();
        assert!(suggestions(&reg, &ViewId::Privileged, "ping ", 5, 64).is_empty());
        assert!(suggestions(&reg, &ViewId::Privileged, "bogus ", 6, 64).is_empty());
        assert!(suggestions(&reg, &ViewId::Privileged, "show version ", 13, 64).is_empty());
    }

    #[test]
    fn suggest_respects_max_and_clamps_cursor() {
        let reg = registry();
        assert_eq!(suggestions(&reg, &ViewId::Privileged, "", 0, 1).len(), 1);
        let s = suggestions(&reg, &ViewId::Privileged, "pi", 99, 64);
        assert_eq!(s, vec!["ping"]);
    }

    #[test]
    fn help_lines_are_aligned() {
        let reg = registry();
        let lines = help_lines(&reg, &ViewId::User);
        assert_eq!(
            lines,
            vec![format!("  {:<20} {}", "enable", "Turn on privileged commands")]
        );
    }

    #[test]
    fn caret_line_offsets_by_prompt() {
        assert_eq!(caret_line(3, 2), "     ^");
        assert_eq!(caret_line(0, 0), "^");
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn unquoted_tokens_match_split_whitespace(line in "[a-z0-9 \t.]{0,60}") {
                let ours: Vec<String> = tokenize(&line).into_iter().map(|t| t.text).collect();
                let std: Vec<String> = line.split_ascii_whitespace().map(str::to_string).collect();
                prop_assert_eq!(ours, std);
            }

            #[test]
            fn token_columns_point_at_token_text(line in "[a-z ]{0,40}") {
                for tok in tokenize(&line) {
                    prop_assert!(line[tok.column..].starts_with(&tok.text));
                }
            }

            #[test]
            fn suggestions_never_panic(line in "\\PC{0,30}", cursor in 0usize..40) {
                let reg = registry();
                let _ = suggestions(&reg, &ViewId::Privileged, &line, cursor, 8);
            }
        }
    }
}
