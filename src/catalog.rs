//! Pattern catalog
//!
//! The list of movement-pattern identifiers available for selection is
//! supplied from outside (one file per pattern in a directory). The
//! configuration core only ever asks whether a name is in the list.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternCatalog {
    patterns: BTreeSet<String>,
}

impl PatternCatalog {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// Build the catalog from file stems in `dir`
    ///
    /// A missing directory gives an empty catalog; every pattern then shows
    /// up as unresolved, which is the caller's cue to warn the operator.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        if !dir.exists() {
            warn!(path = %dir.display(), "Pattern directory not found, catalog is empty");
            return Ok(Self::default());
        }

        let mut patterns = BTreeSet::new();
        for entry in fs::read_dir(dir)
            .with_context(|| format!("Failed to read pattern directory {}", dir.display()))?
        {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if !stem.starts_with('.') && !stem.starts_with("__") {
                    patterns.insert(stem.to_string());
                }
            }
        }

        info!(count = patterns.len(), path = %dir.display(), "Loaded pattern catalog");
        Ok(Self { patterns })
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.patterns.contains(pattern)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
