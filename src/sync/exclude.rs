//! Exclude pattern matching for sync operations.
//!
//! Supports .gitignore-style glob lines. An excluded path is invisible to the
//! differ on both sides: never copied from the source, never deleted from the
//! replica.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Component, Path};

use crate::error::{Result, SyncError};

/// Pattern matching for path exclusion. Empty by default.
#[derive(Debug, Clone)]
pub struct ExcludePatterns {
    /// Compiled glob set for matching.
    glob_set: GlobSet,
    /// Raw pattern strings, kept for display and rebuilding.
    patterns: Vec<String>,
}

impl Default for ExcludePatterns {
    fn default() -> Self {
        Self::new()
    }
}

impl ExcludePatterns {
    pub fn new() -> Self {
        Self {
            glob_set: GlobSet::empty(),
            patterns: Vec::new(),
        }
    }

    /// Create from a list of patterns.
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut excludes = Self::new();
        for pattern in patterns {
            excludes.patterns.push(pattern.as_ref().to_string());
        }
        excludes.rebuild()?;
        Ok(excludes)
    }

    /// Parse patterns from ignore-file content, one per line.
    /// Blank lines and `#` comments are skipped; negations are not supported and ignored.
    pub fn parse_ignore_file(content: &str) -> Result<Self> {
        let patterns: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with('!'))
            .map(|l| l.trim_end_matches('/'))
            .collect();

        Self::from_patterns(&patterns)
    }

    pub fn add_pattern(&mut self, pattern: &str) -> Result<()> {
        if self.patterns.iter().any(|p| p == pattern) {
            return Ok(());
        }
        self.patterns.push(pattern.to_string());
        self.rebuild()
    }

    /// Merge another pattern set into this one.
    pub fn merge(&mut self, other: &ExcludePatterns) -> Result<()> {
        for pattern in &other.patterns {
            if !self.patterns.contains(pattern) {
                self.patterns.push(pattern.clone());
            }
        }
        self.rebuild()
    }

    fn rebuild(&mut self) -> Result<()> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                SyncError::config(format!("invalid exclude pattern '{}': {}", pattern, e))
            })?;
            builder.add(glob);
        }
        self.glob_set = builder
            .build()
            .map_err(|e| SyncError::config(format!("cannot build exclude set: {}", e)))?;
        Ok(())
    }

    /// Check whether a relative path should be excluded.
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }

        if self.glob_set.is_match(path) {
            return true;
        }

        // Each component on its own, so "node_modules" also hides everything under it.
        path.components().any(|component| match component {
            Component::Normal(name) => self.glob_set.is_match(Path::new(name)),
            _ => false,
        })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
