//! Command string parser
//!
//! Splits a raw single-line command into a command name and arguments using
//! POSIX shell quoting rules, without ever handing the string to a shell.
//! Any shell operator anywhere in the raw text rejects the whole request,
//! including operators that appear inside quotes.
//!
//! `#` has no special meaning: `grep #include ./src` keeps both arguments.

use crate::errors::SecurityError;
use crate::tools::types::ParsedCommand;

/// Shell operators rejected by literal substring match, in check order
pub const SHELL_OPERATORS: [&str; 8] = ["&&", "||", "|", ">", ">>", "<", "<<", ";"];

/// Return the first shell operator contained in `raw`, if any
pub fn find_shell_operator(raw: &str) -> Option<&'static str> {
    SHELL_OPERATORS
        .iter()
        .copied()
        .find(|operator| raw.contains(*operator))
}

/// Parse a raw command string
///
/// # Errors
///
/// - `ShellOperatorRejected` if any operator from [`SHELL_OPERATORS`] occurs
/// - `MalformedCommand` on unbalanced quotes or an empty token list
pub fn parse(raw: &str) -> Result<ParsedCommand, SecurityError> {
    if let Some(operator) = find_shell_operator(raw) {
        return Err(SecurityError::ShellOperatorRejected(operator.to_string()));
    }

    let mut tokens = split_words(raw)?.into_iter();

    let command = tokens
        .next()
        .ok_or_else(|| SecurityError::MalformedCommand("Empty command".to_string()))?;

    Ok(ParsedCommand::new(command, tokens.collect()))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum LexState {
    Between,
    Word,
    SingleQuoted,
    DoubleQuoted,
}

/// POSIX word splitting with comments disabled
///
/// - Outside quotes a backslash takes the next character literally
/// - Inside double quotes a backslash only escapes `"` and `\`
/// - Inside single quotes everything is literal
/// - Adjacent quoted and unquoted parts join into one word; `""` is an
///   empty word
fn split_words(raw: &str) -> Result<Vec<String>, SecurityError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut state = LexState::Between;
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match state {
            LexState::Between | LexState::Word => match c {
                ' ' | '\t' | '\r' | '\n' => {
                    if state == LexState::Word {
                        words.push(std::mem::take(&mut current));
                        state = LexState::Between;
                    }
                }
                '\\' => {
                    let escaped = chars.next().ok_or_else(no_escaped_character)?;
                    current.push(escaped);
                    state = LexState::Word;
                }
                '\'' => state = LexState::SingleQuoted,
                '"' => state = LexState::DoubleQuoted,
                other => {
                    current.push(other);
                    state = LexState::Word;
                }
            },
            LexState::SingleQuoted => match c {
                '\'' => state = LexState::Word,
                other => current.push(other),
            },
            LexState::DoubleQuoted => match c {
                '"' => state = LexState::Word,
                '\\' => {
                    let escaped = chars.next().ok_or_else(no_escaped_character)?;
                    if escaped != '"' && escaped != '\\' {
                        current.push('\\');
                    }
                    current.push(escaped);
                }
                other => current.push(other),
            },
        }
    }

    match state {
        LexState::SingleQuoted | LexState::DoubleQuoted => Err(SecurityError::MalformedCommand(
            "No closing quotation".to_string(),
        )),
        LexState::Word => {
            words.push(current);
            Ok(words)
        }
        LexState::Between => Ok(words),
    }
}

fn no_escaped_character() -> SecurityError {
    SecurityError::MalformedCommand("No escaped character".to_string())
}
