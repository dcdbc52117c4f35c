//! Command template resolution
//!
//! Templates are plain command lines with a closed set of placeholders:
//! `${src_path}`, `${database_path}` and `${text}`. Resolution tokenizes the
//! template on runs of spaces and tabs first, then renders each token in a
//! single left-to-right pass. Replacement text is never re-scanned, so a value
//! containing `${...}` or whitespace stays literal and stays in its argument.
//!
//! Quoting is not supported: a template cannot express an argument that
//! contains a space.

use thiserror::Error;

use crate::runner::ExecutionRequest;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Command template is empty")]
    Empty,
    #[error("Unclosed '${{' in command template: {0}")]
    Unclosed(String),
    #[error("Unknown placeholder '${{{0}}}' in command template")]
    Unknown(String),
    #[error("No value for placeholder '{0}' in this command")]
    Unbound(&'static str),
}

/// The placeholders a template may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// A source root being enumerated
    SrcPath,
    /// Directory holding the index
    DatabasePath,
    /// The user's search text
    Text,
}

impl Placeholder {
    pub const ALL: [Placeholder; 3] = [
        Placeholder::SrcPath,
        Placeholder::DatabasePath,
        Placeholder::Text,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Placeholder::SrcPath => "src_path",
            Placeholder::DatabasePath => "database_path",
            Placeholder::Text => "text",
        }
    }

    /// The literal token as written in templates, e.g. `${text}`
    pub fn token(self) -> &'static str {
        match self {
            Placeholder::SrcPath => "${src_path}",
            Placeholder::DatabasePath => "${database_path}",
            Placeholder::Text => "${text}",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

/// Values bound to placeholders for one resolution
#[derive(Debug, Clone, Copy, Default)]
pub struct Bindings<'a> {
    src_path: Option<&'a str>,
    database_path: Option<&'a str>,
    text: Option<&'a str>,
}

impl<'a> Bindings<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn src_path(mut self, value: &'a str) -> Self {
        self.src_path = Some(value);
        self
    }

    pub fn database_path(mut self, value: Option<&'a str>) -> Self {
        self.database_path = value;
        self
    }

    pub fn text(mut self, value: &'a str) -> Self {
        self.text = Some(value);
        self
    }

    pub fn get(&self, placeholder: Placeholder) -> Option<&'a str> {
        match placeholder {
            Placeholder::SrcPath => self.src_path,
            Placeholder::DatabasePath => self.database_path,
            Placeholder::Text => self.text,
        }
    }
}

/// Split a command line on runs of spaces and tabs.
///
/// Never yields empty tokens: `"cmd   p1\tp2"` becomes `["cmd", "p1", "p2"]`.
pub fn tokenize(command: &str) -> Vec<&str> {
    command
        .split([' ', '\t'])
        .filter(|token| !token.is_empty())
        .collect()
}

/// Replace every placeholder in `input` with its bound value.
///
/// Single pass: text produced by a substitution is copied through untouched.
/// A lone `$` or a `$` not followed by `{` is literal.
pub fn substitute(input: &str, bindings: &Bindings<'_>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| TemplateError::Unclosed(input.to_string()))?;
        let name = &after[..end];
        let placeholder =
            Placeholder::from_name(name).ok_or_else(|| TemplateError::Unknown(name.to_string()))?;
        let value = bindings
            .get(placeholder)
            .ok_or(TemplateError::Unbound(placeholder.token()))?;
        out.push_str(value);
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Resolve a template into argv.
///
/// Tokens that render to an empty string (an empty `${text}`, say) are
/// dropped so the child never sees blank arguments.
pub fn resolve(template: &str, bindings: &Bindings<'_>) -> Result<ExecutionRequest, TemplateError> {
    let mut argv = Vec::new();
    for token in tokenize(template) {
        let rendered = substitute(token, bindings)?;
        if !rendered.is_empty() {
            argv.push(rendered);
        }
    }

    if argv.is_empty() {
        return Err(TemplateError::Empty);
    }
    let program = argv.remove(0);
    Ok(ExecutionRequest::new(program, argv))
}
