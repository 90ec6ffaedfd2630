//! Dependency manifest parsing
//!
//! A manifest is a plain-text, line-oriented list of dependency specifiers:
//! one `name` plus optional version constraint per line. Blank lines and `#`
//! comments are ignored. The manifest exposes a canonical form from which its
//! content digest is derived, so two manifests that differ only in comments or
//! whitespace address the same cached environment.

use crate::digest::Digest;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Manifest not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid dependency specifier on line {line_no}: '{line}'")]
    InvalidSpecifier { line_no: usize, line: String },
}

/// A single dependency declaration: a package name and an optional version
/// constraint (e.g. `>=1.0`, `==2.3.1`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    pub name: String,
    pub constraint: Option<String>,
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            Some(c) => write!(f, "{}{}", self.name, c),
            None => write!(f, "{}", self.name),
        }
    }
}

/// An ordered, immutable list of dependency specifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    specs: Vec<DependencySpec>,
}

impl Manifest {
    /// Load and parse a manifest file
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        if !path.is_file() {
            return Err(ManifestError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content)
    }

    /// Parse manifest content
    ///
    /// Blank lines and comment lines are skipped; trailing ` # ...` comments
    /// are stripped before the specifier is parsed.
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let spec_re = Regex::new(r"^([A-Za-z0-9][A-Za-z0-9._+-]*)\s*([=<>!~].*)?$")
            .expect("valid regex");

        let mut specs = Vec::new();

        for (idx, raw_line) in content.lines().enumerate() {
            let line = match raw_line.find('#') {
                Some(pos) => &raw_line[..pos],
                None => raw_line,
            };
            let line = line.trim();

            if line.is_empty() {
                continue;
            }

            let captures = spec_re
                .captures(line)
                .ok_or_else(|| ManifestError::InvalidSpecifier {
                    line_no: idx + 1,
                    line: raw_line.to_string(),
                })?;

            let name = captures[1].to_string();
            let constraint = captures.get(2).map(|m| {
                // Normalize internal whitespace so "foo >= 1.0" and "foo>=1.0"
                // produce the same canonical form
                m.as_str().split_whitespace().collect::<String>()
            });

            specs.push(DependencySpec { name, constraint });
        }

        Ok(Self { specs })
    }

    pub fn specs(&self) -> &[DependencySpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Canonical form: one normalized specifier per line, in manifest order
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        for spec in &self.specs {
            out.push_str(&spec.to_string());
            out.push('\n');
        }
        out
    }

    /// Content digest of the canonical form; the cached environment key
    pub fn digest(&self) -> Digest {
        Digest::sha256_of(self.canonical().as_bytes())
    }
}
