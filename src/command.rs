//! The `SqlCommand` boundary value handed to connection providers.

use serde::{Deserialize, Serialize};

use crate::statement::StatementKind;
use crate::value::Value;

/// What shape of result a command produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    /// Returns zero or more rows.
    Query,
    /// Returns a single scalar (count, exists).
    Scalar,
    /// Returns an affected-row count only.
    Execute,
}

/// An immutable pairing of SQL text with an ordered parameter bag.
///
/// Parameters are always bound by the provider, never interpolated into
/// the text. The parameter list preserves insertion order; providers that
/// need positional placeholders rewrite `@Name` occurrences in that order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlCommand {
    text: String,
    params: Vec<(String, Value)>,
    kind: CommandKind,
    shape: Option<StatementKind>,
}

impl SqlCommand {
    pub fn query(text: impl Into<String>) -> Self {
        Self::new(text, CommandKind::Query)
    }

    pub fn scalar(text: impl Into<String>) -> Self {
        Self::new(text, CommandKind::Scalar)
    }

    pub fn execute(text: impl Into<String>) -> Self {
        Self::new(text, CommandKind::Execute)
    }

    fn new(text: impl Into<String>, kind: CommandKind) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
            kind,
            shape: None,
        }
    }

    /// Tag the command with the operation shape that produced it.
    #[must_use]
    pub fn with_shape(mut self, shape: StatementKind) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Append a named parameter, preserving order.
    #[must_use]
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Append every parameter from an ordered list.
    #[must_use]
    pub fn bind_all(mut self, params: impl IntoIterator<Item = (String, Value)>) -> Self {
        self.params.extend(params);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &[(String, Value)] {
        &self.params
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// The operation shape that produced this command, when known.
    /// Raw-SQL entry points leave it unset.
    pub fn shape(&self) -> Option<StatementKind> {
        self.shape
    }

    /// Snapshot of the parameter bag, for error reporting.
    pub fn params_snapshot(&self) -> Vec<(String, Value)> {
        self.params.clone()
    }
}
