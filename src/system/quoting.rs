// src/system/quoting.rs

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Tokens made only of these characters never need quoting in a POSIX shell.
    static ref SAFE_TOKEN_RE: Regex = Regex::new(r"^[A-Za-z0-9_@%+=:,./-]+$")
        .expect("SAFE_TOKEN_RE is a valid regex");
}

/// Wraps `value` in double quotes, escaping what the shell interprets inside them.
///
/// `"`, `$` and `` ` `` are always escaped. A backslash is escaped only where the
/// shell would consume it: before one of the special characters, a backslash,
/// a newline, or at the end of the string. Everywhere else it stays literal.
pub fn double_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' | '$' | '`' => {
                quoted.push('\\');
                quoted.push(c);
            }
            '\\' => {
                let consumed = matches!(chars.peek(), None | Some('"' | '$' | '`' | '\\' | '\n'));
                quoted.push('\\');
                if consumed {
                    quoted.push('\\');
                }
            }
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Quotes a single token only when the shell would otherwise split or expand it.
pub fn quote_token(token: &str) -> String {
    if SAFE_TOKEN_RE.is_match(token) {
        token.to_string()
    } else {
        double_quote(token)
    }
}

/// Joins literal tokens into one command line a shell parses back into the same tokens.
pub fn escape_cmd<S: AsRef<str>>(argv: &[S]) -> String {
    argv.iter()
        .map(|token| quote_token(token.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}
