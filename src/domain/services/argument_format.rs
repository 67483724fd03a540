//! Routing Format Parser
//!
//! A routing format describes the tokens a text-triggered command expects:
//!
//! ```text
//! quiz :[difficulty::(easy,medium,hard)] :[rounds:of(numeric):required()]
//! ban :[target:user] :[reason:rest()]
//! ```
//!
//! Plain words are literals. `:[...]` is a placeholder whose body is a name
//! followed by modifiers:
//!
//! | Modifier              | Meaning                                         |
//! |-----------------------|-------------------------------------------------|
//! | `:of(type)` / `:type` | structural type check (see [`ArgumentKind`])    |
//! | `::(a,b)`             | one of the listed values, ignoring case         |
//! | `:(a,b)`              | one of the listed values, exact case            |
//! | `:{regex}`            | whole token must match the pattern              |
//! | `:required()`         | registration metadata only                      |
//! | `:optional()`         | registration metadata only                      |
//! | `:description(text)`  | registration metadata only                      |
//! | `:rest()`             | last placeholder absorbs all remaining tokens   |
//!
//! Formats are parsed and their patterns compiled once, when a command is
//! built. Matching is then pure.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

static USER_MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<@!?\d+>$").expect("valid user mention pattern"));
static CHANNEL_MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<#\d+>$").expect("valid channel mention pattern"));
static ROLE_MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<@&\d+>$").expect("valid role mention pattern"));
static CUSTOM_EMOJI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<a?:[0-9A-Za-z_]+:\d+>$").expect("valid emoji pattern"));
static MESSAGE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://(?:(?:canary|ptb)\.)?discord(?:app)?\.com/channels/(?:@me|\d+)/\d+/\d+$")
        .expect("valid message link pattern")
});
static WEBHOOK_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://(?:(?:canary|ptb)\.)?discord(?:app)?\.com/api/webhooks/\d+/[^\s/]+$")
        .expect("valid webhook pattern")
});

/// Errors raised while parsing a routing format.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("format is empty")]
    Empty,

    #[error("missing `{expected}` to close the group opened at position {position}")]
    Unclosed { position: usize, expected: char },

    #[error("placeholder `{0}` has no name")]
    EmptyName(String),

    #[error("unknown argument type `{0}`")]
    UnknownType(String),

    #[error("unknown modifier `{0}`")]
    UnknownModifier(String),

    #[error("modifier `{modifier}` appears twice in placeholder `{placeholder}`")]
    DuplicateModifier { placeholder: String, modifier: &'static str },

    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("placeholder `{0}` absorbs the remaining tokens and must be last")]
    RestNotLast(String),
}

/// Structural type constraint of a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgumentKind {
    User,
    Channel,
    Role,
    Message,
    Emoji,
    Webhook,
    Boolean,
    Numeric,
    Integer,
    String,
}

impl ArgumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgumentKind::User => "user",
            ArgumentKind::Channel => "channel",
            ArgumentKind::Role => "role",
            ArgumentKind::Message => "message",
            ArgumentKind::Emoji => "emoji",
            ArgumentKind::Webhook => "webhook",
            ArgumentKind::Boolean => "boolean",
            ArgumentKind::Numeric => "numeric",
            ArgumentKind::Integer => "integer",
            ArgumentKind::String => "string",
        }
    }

    /// Whether the token has the shape this kind expects.
    pub fn accepts(&self, token: &str) -> bool {
        match self {
            ArgumentKind::User => USER_MENTION.is_match(token),
            ArgumentKind::Channel => CHANNEL_MENTION.is_match(token),
            ArgumentKind::Role => ROLE_MENTION.is_match(token),
            ArgumentKind::Message => MESSAGE_LINK.is_match(token),
            ArgumentKind::Emoji => CUSTOM_EMOJI.is_match(token),
            ArgumentKind::Webhook => WEBHOOK_URL.is_match(token),
            ArgumentKind::Boolean => {
                token.eq_ignore_ascii_case("true") || token.eq_ignore_ascii_case("false")
            }
            // Shape only: any run of digits, however long.
            ArgumentKind::Numeric | ArgumentKind::Integer => {
                !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
            }
            ArgumentKind::String => true,
        }
    }
}

impl FromStr for ArgumentKind {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(ArgumentKind::User),
            "channel" => Ok(ArgumentKind::Channel),
            "role" => Ok(ArgumentKind::Role),
            "message" => Ok(ArgumentKind::Message),
            "emoji" => Ok(ArgumentKind::Emoji),
            "webhook" => Ok(ArgumentKind::Webhook),
            "boolean" => Ok(ArgumentKind::Boolean),
            "numeric" => Ok(ArgumentKind::Numeric),
            "integer" => Ok(ArgumentKind::Integer),
            "string" => Ok(ArgumentKind::String),
            _ => Err(FormatError::UnknownType(s.to_string())),
        }
    }
}

impl fmt::Display for ArgumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enumerated values a placeholder accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choices {
    pub values: Vec<String>,
    pub case_sensitive: bool,
}

impl Choices {
    pub fn accepts(&self, token: &str) -> bool {
        self.values.iter().any(|value| {
            if self.case_sensitive {
                value == token
            } else {
                value.eq_ignore_ascii_case(token)
            }
        })
    }
}

/// A typed, named slot in a routing format.
#[derive(Debug, Clone)]
pub struct Placeholder {
    pub name: String,
    pub kind: Option<ArgumentKind>,
    pub choices: Option<Choices>,
    pub pattern: Option<Regex>,
    /// `Some(true)` for `:required()`, `Some(false)` for `:optional()`.
    pub required: Option<bool>,
    pub description: Option<String>,
    pub rest: bool,
}

impl Placeholder {
    fn named(name: String) -> Self {
        Self {
            name,
            kind: None,
            choices: None,
            pattern: None,
            required: None,
            description: None,
            rest: false,
        }
    }

    /// Check every constraint against a message token.
    pub fn accepts(&self, token: &str) -> bool {
        if let Some(kind) = &self.kind {
            if !kind.accepts(token) {
                return false;
            }
        }
        if let Some(choices) = &self.choices {
            if !choices.accepts(token) {
                return false;
            }
        }
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(token) {
                return false;
            }
        }
        true
    }

    fn parse(body: &str, offset: usize) -> Result<Self, FormatError> {
        let name_end = body.find(':').unwrap_or(body.len());
        let name = body[..name_end].trim();
        if name.is_empty() {
            return Err(FormatError::EmptyName(body.to_string()));
        }

        let mut placeholder = Placeholder::named(name.to_string());
        let mut cursor = name_end;

        while cursor < body.len() {
            let remaining = &body[cursor..];
            let position = offset + cursor;

            if let Some(inner) = remaining.strip_prefix("::(") {
                let end = find_closure(inner, '(', ')', position)?;
                placeholder.set_choices(&inner[..end], false)?;
                cursor += 3 + end + 1;
            } else if let Some(inner) = remaining.strip_prefix(":(") {
                let end = find_closure(inner, '(', ')', position)?;
                placeholder.set_choices(&inner[..end], true)?;
                cursor += 2 + end + 1;
            } else if let Some(inner) = remaining.strip_prefix(":{") {
                let end = find_closure(inner, '{', '}', position)?;
                placeholder.set_pattern(&inner[..end])?;
                cursor += 2 + end + 1;
            } else if let Some(after_colon) = remaining.strip_prefix(':') {
                let ident_len = after_colon
                    .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
                    .unwrap_or(after_colon.len());
                let ident = &after_colon[..ident_len];
                let tail = &after_colon[ident_len..];

                let (argument, consumed) = match tail.strip_prefix('(') {
                    Some(inner) => {
                        let end = find_closure(inner, '(', ')', position)?;
                        (Some(&inner[..end]), 1 + ident_len + 1 + end + 1)
                    }
                    None => (None, 1 + ident_len),
                };

                placeholder.apply_modifier(ident, argument)?;
                cursor += consumed;
            } else {
                return Err(FormatError::UnknownModifier(remaining.to_string()));
            }
        }

        Ok(placeholder)
    }

    fn apply_modifier(&mut self, ident: &str, argument: Option<&str>) -> Result<(), FormatError> {
        match (ident, argument) {
            ("of", Some(kind)) => self.set_kind(kind.trim().parse()?),
            ("required", _) => {
                self.required = Some(true);
                Ok(())
            }
            ("optional", _) => {
                self.required = Some(false);
                Ok(())
            }
            ("description", Some(text)) => {
                self.description = Some(text.trim().to_string());
                Ok(())
            }
            ("rest", _) => {
                self.rest = true;
                Ok(())
            }
            (kind, None) => match kind.parse::<ArgumentKind>() {
                Ok(kind) => self.set_kind(kind),
                Err(_) => Err(FormatError::UnknownModifier(format!(":{}", ident))),
            },
            (other, Some(_)) => Err(FormatError::UnknownModifier(format!(":{}(...)", other))),
        }
    }

    fn set_kind(&mut self, kind: ArgumentKind) -> Result<(), FormatError> {
        if self.kind.is_some() {
            return Err(self.duplicate("type"));
        }
        self.kind = Some(kind);
        Ok(())
    }

    fn set_choices(&mut self, list: &str, case_sensitive: bool) -> Result<(), FormatError> {
        if self.choices.is_some() {
            return Err(self.duplicate("choices"));
        }
        let values = list
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        self.choices = Some(Choices {
            values,
            case_sensitive,
        });
        Ok(())
    }

    fn set_pattern(&mut self, source: &str) -> Result<(), FormatError> {
        if self.pattern.is_some() {
            return Err(self.duplicate("pattern"));
        }
        let anchored = format!("^(?:{})$", source);
        let pattern = Regex::new(&anchored).map_err(|e| FormatError::InvalidPattern {
            pattern: source.to_string(),
            source: e,
        })?;
        self.pattern = Some(pattern);
        Ok(())
    }

    fn duplicate(&self, modifier: &'static str) -> FormatError {
        FormatError::DuplicateModifier {
            placeholder: self.name.clone(),
            modifier,
        }
    }
}

/// One whitespace-delimited unit of a routing format.
#[derive(Debug, Clone)]
pub enum FormatToken {
    Literal(String),
    Placeholder(Placeholder),
}

impl FormatToken {
    /// Name of the placeholder, `None` for literals.
    pub fn name(&self) -> Option<&str> {
        match self {
            FormatToken::Literal(_) => None,
            FormatToken::Placeholder(p) => Some(&p.name),
        }
    }
}

/// A parsed routing format.
#[derive(Debug, Clone)]
pub struct ArgumentFormat {
    source: String,
    tokens: Vec<FormatToken>,
}

impl ArgumentFormat {
    pub fn parse(source: &str) -> Result<Self, FormatError> {
        let mut tokens = Vec::new();

        for (offset, raw) in split_format(source)? {
            let token = match raw.strip_prefix(":[").and_then(|r| r.strip_suffix(']')) {
                Some(body) => FormatToken::Placeholder(Placeholder::parse(body, offset + 2)?),
                None => FormatToken::Literal(raw.to_string()),
            };
            tokens.push(token);
        }

        if tokens.is_empty() {
            return Err(FormatError::Empty);
        }

        let last = tokens.len() - 1;
        for (index, token) in tokens.iter().enumerate() {
            if let FormatToken::Placeholder(p) = token {
                if p.rest && index != last {
                    return Err(FormatError::RestNotLast(p.name.clone()));
                }
            }
        }

        Ok(Self {
            source: source.to_string(),
            tokens,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tokens(&self) -> &[FormatToken] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Whether the last placeholder absorbs a variable number of tokens.
    pub fn is_variadic(&self) -> bool {
        matches!(self.tokens.last(), Some(FormatToken::Placeholder(p)) if p.rest)
    }

    /// Placeholders in declaration order.
    pub fn placeholders(&self) -> impl Iterator<Item = &Placeholder> {
        self.tokens.iter().filter_map(|t| match t {
            FormatToken::Placeholder(p) => Some(p),
            FormatToken::Literal(_) => None,
        })
    }

    /// Try to match message tokens against this format.
    ///
    /// Returns one slot per message token holding the placeholder name that
    /// claimed it, or `None` for literal positions. The token at index 0 is the
    /// invocation token and a literal there always matches.
    pub fn match_tokens<S: AsRef<str>>(&self, message: &[S]) -> Option<Vec<Option<String>>> {
        let variadic = self.is_variadic();
        let fits = if variadic {
            message.len() >= self.tokens.len()
        } else {
            message.len() == self.tokens.len()
        };
        if !fits {
            return None;
        }

        let mut names = Vec::with_capacity(message.len());
        let last = self.tokens.len() - 1;

        for (index, token) in self.tokens.iter().enumerate() {
            match token {
                FormatToken::Literal(word) => {
                    if index != 0 && !word.eq_ignore_ascii_case(message[index].as_ref()) {
                        return None;
                    }
                    names.push(None);
                }
                FormatToken::Placeholder(p) if p.rest && index == last => {
                    let absorbed: Vec<&str> = message[index..].iter().map(|t| t.as_ref()).collect();
                    if !p.accepts(&absorbed.join(" ")) {
                        return None;
                    }
                    names.extend(std::iter::repeat(Some(p.name.clone())).take(absorbed.len()));
                }
                FormatToken::Placeholder(p) => {
                    if !p.accepts(message[index].as_ref()) {
                        return None;
                    }
                    names.push(Some(p.name.clone()));
                }
            }
        }

        Some(names)
    }
}

impl FromStr for ArgumentFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ArgumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Index of the closing delimiter in `inner`, honoring nesting.
fn find_closure(inner: &str, open: char, close: char, position: usize) -> Result<usize, FormatError> {
    let mut depth = 0usize;
    let mut escaped = false;

    for (index, ch) in inner.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
        } else if ch == open {
            depth += 1;
        } else if ch == close {
            if depth == 0 {
                return Ok(index);
            }
            depth -= 1;
        }
    }

    Err(FormatError::Unclosed {
        position,
        expected: close,
    })
}

/// Split a format on whitespace, keeping each `:[...]` group whole.
fn split_format(source: &str) -> Result<Vec<(usize, &str)>, FormatError> {
    let mut parts = Vec::new();
    let mut start: Option<usize> = None;
    let mut depth = 0usize;
    let mut escaped = false;
    let mut opened_at = 0usize;

    let bytes = source.as_bytes();
    for (index, ch) in source.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if depth > 0 => escaped = true,
            '[' if index > 0 && bytes[index - 1] == b':' => {
                if depth == 0 {
                    opened_at = index - 1;
                }
                depth += 1;
            }
            '[' if depth > 0 => depth += 1,
            ']' if depth > 0 => depth -= 1,
            c if c.is_whitespace() && depth == 0 => {
                if let Some(s) = start.take() {
                    parts.push((s, &source[s..index]));
                }
                continue;
            }
            _ => {}
        }
        if start.is_none() {
            start = Some(index);
        }
    }

    if depth > 0 {
        return Err(FormatError::Unclosed {
            position: opened_at,
            expected: ']',
        });
    }
    if let Some(s) = start {
        parts.push((s, &source[s..]));
    }

    Ok(parts)
}
