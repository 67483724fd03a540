//! Message Tokenizer
//!
//! Splits raw message content into argument tokens, honoring double quotes
//! and backslash escapes, and separates `--named` arguments from positional
//! ones.

use std::collections::HashMap;

/// Split content on whitespace with respect to double quotes and escapes.
///
/// ```text
/// "1 2" 3 4      -> [1 2] [3] [4]
/// "1 \" 2 3" 4   -> [1 " 2 3] [4]
/// 1\ 2 3 4       -> [1 2] [3] [4]
/// ```
pub fn split_content(content: &str) -> Vec<String> {
    if !content.contains('"') && !content.contains('\\') {
        return content.split_whitespace().map(str::to_string).collect();
    }

    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for ch in content.chars() {
        if ch == '\\' && !escaped {
            escaped = true;
            continue;
        }

        if in_quotes {
            if ch == '"' && !escaped {
                in_quotes = false;
            } else {
                current.push(ch);
            }
        } else if ch.is_whitespace() && !escaped {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else if ch == '"' && !escaped {
            in_quotes = true;
        } else {
            current.push(ch);
        }

        escaped = false;
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// Arguments separated into `--named` values and positional leftovers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedArguments {
    pub named: HashMap<String, String>,
    pub positional: Vec<String>,
}

impl NamedArguments {
    /// Value of a named argument; flags without a value map to an empty string.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    /// Whether a named argument or flag was supplied.
    pub fn has_flag(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }
}

/// Parse `--name=value`, `--name value` and bare `--flag` arguments.
///
/// ```text
/// 00 --arg --arg2=123 --arg3 456 789 -> {arg: "", arg2: 123, arg3: 456}, [00, 789]
/// --arg 123 --arg=456                -> {arg: 456}, []
/// ```
pub fn parse_named_arguments<S: AsRef<str>>(args: &[S]) -> NamedArguments {
    let mut parsed = NamedArguments::default();
    let mut pending: Option<String> = None;

    for arg in args {
        let arg: &str = arg.as_ref();
        if let Some(body) = arg.strip_prefix("--") {
            if let Some(flag) = pending.take() {
                parsed.named.insert(flag, String::new());
            }
            match body.split_once('=') {
                Some((name, value)) => {
                    parsed.named.insert(name.to_string(), value.to_string());
                }
                None => pending = Some(body.to_string()),
            }
        } else if let Some(name) = pending.take() {
            parsed.named.insert(name, arg.to_string());
        } else {
            parsed.positional.push(arg.to_string());
        }
    }

    if let Some(flag) = pending {
        parsed.named.insert(flag, String::new());
    }

    parsed
}
