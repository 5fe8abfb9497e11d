//! Argument binding for script templates.
//!
//! Every string that ends up inside a rendered script passes through
//! [`BoundArgs`], which escapes it for a PowerShell single-quoted literal.
//! Categorical values are translated to remote identifiers through closed
//! [`CategoricalMapping`] tables; an unknown label is an error, never a
//! fallback identifier.

use crate::{ScriptOpsError, ScriptOpsResult};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Characters PowerShell treats as single-quote delimiters.
const SINGLE_QUOTE_CHARS: [char; 5] = ['\'', '\u{2018}', '\u{2019}', '\u{201A}', '\u{201B}'];

/// Escape a value for use inside a PowerShell single-quoted string.
///
/// Single-quoted strings are verbatim in PowerShell apart from the quote
/// characters themselves, which are escaped by doubling.
pub fn escape_single_quoted(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if SINGLE_QUOTE_CHARS.contains(&ch) {
            escaped.push(ch);
        }
        escaped.push(ch);
    }
    escaped
}

/// Characters with meaning to PowerShell wildcard matching, including its escape character.
const WILDCARD_CHARS: [char; 5] = ['`', '*', '?', '[', ']'];

/// Escape a value for a wildcard-matching parameter (`-Name`, `-VMName`)
/// inside a single-quoted string, so it only matches itself.
///
/// Wildcard metacharacters get a backtick prefix, which single quotes pass
/// through verbatim to the wildcard engine.
pub fn escape_wildcard_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in escape_single_quoted(value).chars() {
        if WILDCARD_CHARS.contains(&ch) {
            escaped.push('`');
        }
        escaped.push(ch);
    }
    escaped
}

/// Closed table translating category labels to opaque remote identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoricalMapping {
    category: String,
    entries: BTreeMap<String, String>,
}

impl CategoricalMapping {
    /// Build a mapping. Duplicate or empty labels and empty identifiers are rejected.
    pub fn new<I, L, R>(category: impl Into<String>, entries: I) -> ScriptOpsResult<Self>
    where
        I: IntoIterator<Item = (L, R)>,
        L: Into<String>,
        R: Into<String>,
    {
        let category = category.into();
        let mut table = BTreeMap::new();

        for (label, remote_id) in entries {
            let label = label.into();
            let remote_id = remote_id.into();

            if label.trim().is_empty() || remote_id.trim().is_empty() {
                return Err(ScriptOpsError::Config(format!(
                    "category {category} contains an empty label or identifier"
                )));
            }
            if table.insert(label.clone(), remote_id).is_some() {
                return Err(ScriptOpsError::Config(format!(
                    "category {category} maps label {label:?} more than once"
                )));
            }
        }

        if table.is_empty() {
            return Err(ScriptOpsError::Config(format!(
                "category {category} has no entries"
            )));
        }

        Ok(Self {
            category,
            entries: table,
        })
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Resolve a label to its remote identifier. Labels match exactly.
    pub fn resolve(&self, label: &str) -> ScriptOpsResult<&str> {
        self.entries
            .get(label)
            .map(String::as_str)
            .ok_or_else(|| ScriptOpsError::UnrecognizedCategory {
                category: self.category.clone(),
                label: label.to_string(),
            })
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.contains_key(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Owns the category tables supplied at startup and binds argument records.
#[derive(Debug, Clone, Default)]
pub struct ArgumentBinder {
    mappings: BTreeMap<String, CategoricalMapping>,
}

impl ArgumentBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a category table. A category can only be supplied once.
    pub fn with_mapping(mut self, mapping: CategoricalMapping) -> ScriptOpsResult<Self> {
        let category = mapping.category().to_string();
        if self.mappings.contains_key(&category) {
            return Err(ScriptOpsError::Config(format!(
                "category {category} is already registered"
            )));
        }
        self.mappings.insert(category, mapping);
        Ok(self)
    }

    pub fn mapping(&self, category: &str) -> Option<&CategoricalMapping> {
        self.mappings.get(category)
    }

    pub fn resolve(&self, category: &str, label: &str) -> ScriptOpsResult<&str> {
        self.mappings
            .get(category)
            .ok_or_else(|| {
                ScriptOpsError::Config(format!("no category table named {category}"))
            })?
            .resolve(label)
    }

    pub fn bind<A: ScriptArgs + ?Sized>(&self, args: &A) -> ScriptOpsResult<BoundArgs> {
        args.bind(self)
    }
}

/// An argument record that can be turned into a template substitution context.
pub trait ScriptArgs {
    fn bind(&self, binder: &ArgumentBinder) -> ScriptOpsResult<BoundArgs>;
}

impl ScriptArgs for () {
    fn bind(&self, _binder: &ArgumentBinder) -> ScriptOpsResult<BoundArgs> {
        Ok(BoundArgs::new())
    }
}

impl ScriptArgs for BoundArgs {
    fn bind(&self, _binder: &ArgumentBinder) -> ScriptOpsResult<BoundArgs> {
        Ok(self.clone())
    }
}

/// Escaped substitution context for one render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArgs {
    values: Map<String, Value>,
}

impl BoundArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a free-form string, escaped for a single-quoted literal.
    pub fn text(mut self, key: &str, value: &str) -> ScriptOpsResult<Self> {
        self.values
            .insert(key.to_string(), Value::String(checked_escape(key, value)?));
        Ok(self)
    }

    /// Bind a string used as a literal in a wildcard-matching parameter.
    pub fn wildcard_literal(mut self, key: &str, value: &str) -> ScriptOpsResult<Self> {
        checked_escape(key, value)?;
        self.values.insert(
            key.to_string(),
            Value::String(escape_wildcard_literal(value)),
        );
        Ok(self)
    }

    /// Bind a list of free-form strings, each escaped.
    pub fn text_list<S: AsRef<str>>(mut self, key: &str, values: &[S]) -> ScriptOpsResult<Self> {
        let escaped = values
            .iter()
            .map(|value| checked_escape(key, value.as_ref()).map(Value::String))
            .collect::<ScriptOpsResult<Vec<_>>>()?;
        self.values.insert(key.to_string(), Value::Array(escaped));
        Ok(self)
    }

    /// Bind a remote identifier produced by a [`CategoricalMapping`].
    pub fn identifier(self, key: &str, remote_id: &str) -> ScriptOpsResult<Self> {
        self.text(key, remote_id)
    }

    pub fn flag(mut self, key: &str, value: bool) -> Self {
        self.values.insert(key.to_string(), Value::Bool(value));
        self
    }

    pub fn number(mut self, key: &str, value: i64) -> Self {
        self.values.insert(key.to_string(), Value::from(value));
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub(crate) fn values(&self) -> &Map<String, Value> {
        &self.values
    }
}

fn checked_escape(key: &str, value: &str) -> ScriptOpsResult<String> {
    if value.contains('\0') {
        return Err(ScriptOpsError::InvalidArgument {
            key: key.to_string(),
            message: "value contains a NUL character".to_string(),
        });
    }
    Ok(escape_single_quoted(value))
}
