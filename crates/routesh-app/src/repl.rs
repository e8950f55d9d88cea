//! Line-editor front end and dispatch loop.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Result, anyhow};
use routesh_core::{Dispatch, Shell, render_error};
use routesh_types::error::ShellError;
use rustyline::completion::{Completer, FilenameCompleter, Pair};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Context, Editor};

/// Tab completion backed by the shell's suggestion engine. The path
/// argument of `load` completes file names.
pub struct ShellHelper {
    shell: Rc<RefCell<Shell>>,
    files: FilenameCompleter,
}

impl ShellHelper {
    pub fn new(shell: &Rc<RefCell<Shell>>) -> Self {
        Self {
            shell: Rc::clone(shell),
            files: FilenameCompleter::new(),
        }
    }
}

impl rustyline::Helper for ShellHelper {}

impl rustyline::highlight::Highlighter for ShellHelper {}

impl rustyline::hint::Hinter for ShellHelper {
    type Hint = String;
    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl rustyline::validate::Validator for ShellHelper {}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        // Token boundaries are ASCII whitespace, as in the tokenizer.
        let start = line[..pos]
            .rfind(|c: char| c.is_ascii_whitespace())
            .map_or(0, |i| i + 1);
        let before: Vec<&str> = line[..start].split_ascii_whitespace().collect();
        if before.len() >= 2 && before[0] == "load" {
            return self.files.complete(line, pos, ctx);
        }
        let candidates = self
            .shell
            .borrow()
            .suggestions(line, pos)
            .into_iter()
            .map(|s| Pair {
                display: s.clone(),
                replacement: s,
            })
            .collect();
        Ok((start, candidates))
    }
}

/// Print a dispatch result.
pub fn print_dispatch(prompt: &str, dispatch: &Dispatch) {
    for line in &dispatch.output {
        println!("{line}");
    }
    for err in &dispatch.errors {
        print_error(prompt, err);
    }
}

pub fn print_error(prompt: &str, err: &ShellError) {
    for line in render_error(prompt, err) {
        println!("{line}");
    }
}

/// Run one line, printing its output. Returns whether it succeeded.
pub fn run_line(shell: &RefCell<Shell>, line: &str) -> bool {
    let prompt = shell.borrow().prompt().to_string();
    let result = shell.borrow_mut().execute_line(line);
    match result {
        Ok(dispatch) => {
            print_dispatch(&prompt, &dispatch);
            dispatch.succeeded()
        },
        Err(e) => {
            print_error(&prompt, &e);
            false
        },
    }
}

/// Interactive loop until `quit`, `exit` from the user view, or EOF.
pub fn interactive(shell: Rc<RefCell<Shell>>) -> Result<()> {
    let mut rl: Editor<ShellHelper, DefaultHistory> =
        Editor::new().map_err(|e| anyhow!("failed to init line editor: {e}"))?;
    rl.set_helper(Some(ShellHelper::new(&shell)));

    while shell.borrow().is_running() {
        let prompt = shell.borrow().prompt().to_string();
        let line = match rl.readline(&prompt) {
            Ok(l) => l,
            Err(ReadlineError::Eof) => break,
            // Ctrl-C drops the current line.
            Err(ReadlineError::Interrupted) => continue,
            Err(e) => return Err(anyhow!("readline error: {e}")),
        };
        if !line.trim().is_empty() {
            rl.add_history_entry(line.as_str())
                .map_err(|e| anyhow!("failed to record history: {e}"))?;
        }
        run_line(&shell, &line);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use routesh_plugin::NativeLoader;
    use routesh_types::config::ShellConfig;

    fn helper() -> ShellHelper {
        let config = ShellConfig {
            autoload_plugins: false,
            ..ShellConfig::default()
        };
        let shell = Shell::with_loader(config, Box::new(NativeLoader::new(None))).unwrap();
        ShellHelper::new(&Rc::new(RefCell::new(shell)))
    }

    fn replacements(line: &str, pos: usize) -> (usize, Vec<String>) {
        let history = DefaultHistory::new();
        let ctx = Context::new(&history);
        let (start, pairs) = helper().complete(line, pos, &ctx).unwrap();
        (start, pairs.into_iter().map(|p| p.replacement).collect())
    }

    #[test]
    fn completes_first_token() {
        assert_eq!(replacements("en", 2), (0, vec!["enable".to_string()]));
    }

    #[test]
    fn wide_whitespace_stays_inside_the_token() {
        for line in ["enable\u{3000}x", "\u{3000}en", "en\u{2003}"] {
            let (start, _) = replacements(line, line.len());
            assert!(line.is_char_boundary(start), "{line:?} -> {start}");
            assert_eq!(start, 0);
        }
    }
}
