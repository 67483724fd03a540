//! Format Router
//!
//! Picks the routing format that fits an incoming message and exposes the
//! resulting named slots.

use super::argument_format::ArgumentFormat;

/// Message tokens paired with the placeholder name each one was routed to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutedArguments {
    tokens: Vec<String>,
    names: Vec<Option<String>>,
    matched_format: Option<usize>,
}

impl RoutedArguments {
    /// Tokens with no names attached.
    pub fn positional(tokens: Vec<String>) -> Self {
        let names = vec![None; tokens.len()];
        Self {
            tokens,
            names,
            matched_format: None,
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Placeholder name per token index.
    pub fn names(&self) -> &[Option<String>] {
        &self.names
    }

    /// Index of the format that matched, if any did.
    pub fn matched_format(&self) -> Option<usize> {
        self.matched_format
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn with_index(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.names.get(index).and_then(|n| n.as_deref())
    }

    /// Value routed to `name`, ignoring case.
    ///
    /// Several tokens routed to the same name (a `:rest()` slot, or a name used
    /// twice) are joined with single spaces.
    pub fn with_name(&self, name: &str) -> Option<String> {
        let parts: Vec<&str> = self
            .names
            .iter()
            .zip(&self.tokens)
            .filter(|(slot, _)| matches!(slot, Some(n) if n.eq_ignore_ascii_case(name)))
            .map(|(_, token)| token.as_str())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.with_name(name)?.parse().ok()
    }

    pub fn get_i32(&self, name: &str) -> Option<i32> {
        self.with_name(name)?.parse().ok()
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        let value = self.with_name(name)?;
        if value.eq_ignore_ascii_case("true") {
            Some(true)
        } else if value.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }

    /// Snowflake id carried by a mention or raw id, keeping only its digits.
    pub fn get_id(&self, name: &str) -> Option<i64> {
        let digits: String = self
            .with_name(name)?
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        digits.parse().ok()
    }
}

/// Route message tokens against candidate formats.
///
/// Formats with the same token count as the message are tried first; when
/// none has that length every format is tried, which lets `:rest()` formats
/// absorb longer messages. The first full match wins. When nothing matches,
/// every token is left unnamed.
pub fn route(tokens: Vec<String>, formats: &[ArgumentFormat]) -> RoutedArguments {
    if tokens.len() <= 1 || formats.is_empty() {
        return RoutedArguments::positional(tokens);
    }

    let exact: Vec<usize> = formats
        .iter()
        .enumerate()
        .filter(|(_, f)| f.len() == tokens.len())
        .map(|(i, _)| i)
        .collect();

    let candidates: Vec<usize> = if exact.is_empty() {
        (0..formats.len()).collect()
    } else {
        exact
    };

    for index in candidates {
        if let Some(names) = formats[index].match_tokens(&tokens) {
            return RoutedArguments {
                tokens,
                names,
                matched_format: Some(index),
            };
        }
    }

    RoutedArguments::positional(tokens)
}
