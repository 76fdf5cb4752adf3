//! The closed set of person names an annotator may assign.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// A stable, human-assigned identity label. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonName(String);

impl PersonName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PersonName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Names supplied at session start, trimmed and deduplicated in first-seen order.
/// Immutable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonNameCatalog {
    names: Vec<PersonName>,
}

impl PersonNameCatalog {
    /// Parse newline-delimited names. Blank lines are skipped.
    pub fn parse(text: &str) -> Result<Self, CatalogError> {
        Self::from_names(text.lines())
    }

    /// Build a catalog from individual names.
    pub fn from_names<I, S>(names: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<PersonName> = Vec::new();
        for raw in names {
            let name = raw.as_ref().trim();
            if name.is_empty() || out.iter().any(|n| n.as_str() == name) {
                continue;
            }
            out.push(PersonName(name.to_string()));
        }
        if out.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self { names: out })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::parse(&text)?;
        tracing::info!(path = %path.display(), names = catalog.len(), "loaded name catalog");
        Ok(catalog)
    }

    /// Resolve a label against the catalog. Surrounding whitespace is ignored.
    pub fn get(&self, name: &str) -> Option<&PersonName> {
        let name = name.trim();
        self.names.iter().find(|n| n.as_str() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> &[PersonName] {
        &self.names
    }

    /// Selectable label options for a row: the empty label, then every name.
    pub fn options(&self) -> Vec<String> {
        std::iter::once(String::new())
            .chain(self.names.iter().map(|n| n.0.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false: an empty catalog cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
