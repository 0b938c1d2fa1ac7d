//! Ignore patterns (`.nutignore`)
//!
//! One pattern per line; blank lines and `#` comments are skipped, all
//! other lines are trimmed. A pattern excludes a path when it matches as a
//! glob, or when the path merely contains it as a substring (so a bare
//! directory name ignores the whole subtree).

use std::fs;
use std::path::Path;

use glob::Pattern;

use crate::error::Result;

/// File the patterns are read from, at the repository root
pub const IGNORE_FILE: &str = ".nutignore";

struct IgnorePattern {
    raw: String,
    // Invalid globs fall back to substring-only matching
    compiled: Option<Pattern>,
}

/// The ignore rules in effect for one repository
pub struct IgnoreList {
    patterns: Vec<IgnorePattern>,
}

impl IgnoreList {
    /// Load patterns from `<root>/.nutignore`; a missing file means no rules
    pub fn load(root: &Path) -> Result<Self> {
        let data = match fs::read_to_string(root.join(IGNORE_FILE)) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::from_patterns(&[] as &[&str]))
            }
            Err(e) => return Err(e.into()),
        };

        let lines: Vec<&str> = data
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect();

        Ok(Self::from_patterns(&lines))
    }

    /// Build an ignore list from raw pattern strings
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Self {
        let patterns = patterns
            .iter()
            .map(|p| {
                let raw = p.as_ref().to_string();
                let compiled = Pattern::new(&raw).ok();
                IgnorePattern { raw, compiled }
            })
            .collect();
        Self { patterns }
    }

    /// Whether a repository-relative path is excluded
    pub fn matches(&self, rel_path: &str) -> bool {
        self.patterns.iter().any(|pattern| {
            if let Some(glob) = &pattern.compiled {
                if glob.matches(rel_path) {
                    return true;
                }
            }
            rel_path.contains(pattern.raw.as_str())
        })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
