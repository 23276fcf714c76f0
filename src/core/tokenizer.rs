//! Tokenizer for console input.
//!
//! A line is split into statements on `;` and line breaks, a statement into
//! whitespace-separated arguments. Single and double quotes group text; there
//! are no escape sequences.

/// Characters removed from both ends of an assigned value.
const VALUE_TRIM: &[char] = &[' ', '\t', '\r', '\n', '"', '\''];

/// Result of tokenizing a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedCommand<'a> {
    /// The command name (first token).
    pub command: &'a str,
    /// The arguments (remaining tokens).
    pub args: Vec<&'a str>,
    /// The statement as given.
    pub raw: &'a str,
}

/// Tokenize a statement into its command name and arguments.
///
/// Returns `None` for blank input.
///
/// ```
/// use bevy_xconsole::core::tokenize;
///
/// let result = tokenize(r#"Bind f1 "r_fov 90""#).unwrap();
/// assert_eq!(result.command, "Bind");
/// assert_eq!(result.args, vec!["f1", "r_fov 90"]);
/// ```
pub fn tokenize(statement: &str) -> Option<TokenizedCommand<'_>> {
    let mut tokens = tokenize_string(statement).into_iter();
    let command = tokens.next()?;
    Some(TokenizedCommand {
        command,
        args: tokens.collect(),
        raw: statement,
    })
}

/// Split a statement into tokens, the command name included.
///
/// A quote starts a token that runs to the matching quote (or to the end of
/// the input); its content, without the quotes, is one token.
pub fn tokenize_string(input: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            quote @ (b'"' | b'\'') => {
                let start = i + 1;
                let end = input[start..]
                    .find(quote as char)
                    .map_or(input.len(), |offset| start + offset);
                tokens.push(&input[start..end]);
                i = end + 1;
            }
            _ => {
                let start = i;
                while i < bytes.len() && !matches!(bytes[i], b' ' | b'\t' | b'\r' | b'\n' | b'"' | b'\'') {
                    i += 1;
                }
                tokens.push(&input[start..i]);
            }
        }
    }

    tokens
}

/// Split a line into statements on `;`, `\n` and `\r`.
///
/// Separators inside quotes do not split. Statements are trimmed and empty
/// ones dropped.
///
/// ```
/// use bevy_xconsole::core::split_commands;
///
/// let statements = split_commands(r#"r_fov 45; echo "a;b""#);
/// assert_eq!(statements, vec!["r_fov 45", r#"echo "a;b""#]);
/// ```
pub fn split_commands(line: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let bytes = line.as_bytes();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'"' | b'\'') => {
                i = line[i + 1..]
                    .find(quote as char)
                    .map_or(bytes.len(), |offset| i + 1 + offset + 1);
            }
            b';' | b'\n' | b'\r' => {
                statements.push(&line[start..i]);
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    statements.push(&line[start..]);

    statements
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Leading identifier of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementHead<'a> {
    /// Text before the first `=` (or the first space), trimmed.
    pub name: &'a str,
    /// Byte index of that separator.
    pub separator: Option<usize>,
}

impl<'a> StatementHead<'a> {
    /// Whatever follows the separator, with blanks and quotes stripped.
    pub fn value(&self, statement: &'a str) -> Option<&'a str> {
        self.separator.map(|at| strip_value(&statement[at + 1..]))
    }
}

/// Find the identifier a statement starts with.
pub fn statement_head(statement: &str) -> StatementHead<'_> {
    let separator = statement.find('=').or_else(|| statement.find(' '));
    let name = match separator {
        Some(at) => &statement[..at],
        None => statement,
    };
    StatementHead {
        name: name.trim(),
        separator,
    }
}

/// Strip blanks and quote characters from both ends.
pub fn strip_value(value: &str) -> &str {
    value.trim_matches(VALUE_TRIM)
}
