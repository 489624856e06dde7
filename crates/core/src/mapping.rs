//! Declarative projection of source records onto remote entity shapes.
//!
//! A [`FieldMapping`] is an ordered list of `(target field, extractor)` pairs.
//! Projection walks the list in order, so when two pairs name the same target
//! the later one wins.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::record::Record;

/// Derivation over the whole source record.
pub type DeriveFn = Arc<dyn Fn(&Record) -> Value + Send + Sync>;

/// How a target field obtains its value.
#[derive(Clone)]
pub enum Extractor {
    /// Copy the named source field when present; omit the target otherwise.
    CopyField(String),
    /// Always invoked; whatever it returns is stored, `Value::Null` included.
    Derive(DeriveFn),
}

impl Extractor {
    pub fn copy(source: impl Into<String>) -> Self {
        Self::CopyField(source.into())
    }

    pub fn derive<F>(f: F) -> Self
    where
        F: Fn(&Record) -> Value + Send + Sync + 'static,
    {
        Self::Derive(Arc::new(f))
    }

    fn extract(&self, source: &Record) -> Option<Value> {
        match self {
            Self::CopyField(name) => source.get(name).cloned(),
            Self::Derive(f) => Some(f(source)),
        }
    }
}

impl fmt::Debug for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CopyField(name) => f.debug_tuple("CopyField").field(name).finish(),
            Self::Derive(_) => f.write_str("Derive(..)"),
        }
    }
}

/// Ordered mapping table.
#[derive(Debug, Clone, Default)]
pub struct FieldMapping {
    entries: Vec<(String, Extractor)>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a direct copy `source -> target`.
    pub fn copy(mut self, target: impl Into<String>, source: impl Into<String>) -> Self {
        self.push(target, Extractor::copy(source));
        self
    }

    /// Append a derived field.
    pub fn derive<F>(mut self, target: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Record) -> Value + Send + Sync + 'static,
    {
        self.push(target, Extractor::derive(f));
        self
    }

    pub fn push(&mut self, target: impl Into<String>, extractor: Extractor) {
        self.entries.push((target.into(), extractor));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Target field names in table order (duplicates included).
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(target, _)| target.as_str())
    }

    /// Project `source` through this table. See [`project`].
    pub fn project(&self, source: &Record, fallback: Option<&Record>) -> Record {
        project(source, self, fallback)
    }
}

/// Project `source` onto a target shape.
///
/// After the table is applied, every field of `fallback` missing from the
/// result is copied in unchanged, which keeps remote fields this engine does
/// not manage. Fields present in both keep the projected value.
pub fn project(source: &Record, mapping: &FieldMapping, fallback: Option<&Record>) -> Record {
    let mut target = Record::new();
    for (field, extractor) in &mapping.entries {
        if let Some(value) = extractor.extract(source) {
            target.insert(field.clone(), value);
        }
    }
    if let Some(fallback) = fallback {
        merge_missing(&mut target, fallback);
    }
    target
}

/// Copy every field of `from` that `into` lacks.
pub fn merge_missing(into: &mut Record, from: &Record) {
    for (key, value) in from {
        if !into.contains_key(key) {
            into.insert(key.clone(), value.clone());
        }
    }
}
