//! OpenVPN profile rewriting
//!
//! Read → compute → re-read → write only when the content differs.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::ipv6::Ipv6Matcher;

/// A text document the rewriter can read and overwrite.
pub trait TextDocument {
    fn read(&self) -> std::io::Result<String>;
    fn write(&self, contents: &str) -> std::io::Result<()>;
    /// Name used in log and error messages.
    fn describe(&self) -> String;
}

/// A document backed by a file on disk.
#[derive(Debug, Clone)]
pub struct FileDocument {
    path: PathBuf,
}

impl FileDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TextDocument for FileDocument {
    fn read(&self) -> std::io::Result<String> {
        std::fs::read_to_string(&self.path)
    }

    fn write(&self, contents: &str) -> std::io::Result<()> {
        std::fs::write(&self.path, contents)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// The document was written. `previous` is the first literal it held.
    Changed { previous: Option<String> },
    /// Nothing to write: no literal, or it already holds the replacement.
    Unchanged,
}

pub struct ConfigRewriter {
    matcher: Ipv6Matcher,
}

impl ConfigRewriter {
    pub fn new() -> Result<Self> {
        let matcher = Ipv6Matcher::new().context("Failed to compile IPv6 pattern")?;
        Ok(Self { matcher })
    }

    pub fn matcher(&self) -> &Ipv6Matcher {
        &self.matcher
    }

    /// Replaces the IPv6 literal of `document` with `replacement`.
    pub fn rewrite<D: TextDocument>(&self, document: &D, replacement: &str) -> Result<RewriteOutcome> {
        let original = document
            .read()
            .with_context(|| format!("Failed to read {}", document.describe()))?;
        let previous = self.matcher.literals(&original).next().map(str::to_string);
        let substitution = self.matcher.find_and_replace(&original, replacement);

        // 쓰기 직전에 다시 읽어 디스크 내용과 비교
        let current = document
            .read()
            .with_context(|| format!("Failed to re-read {}", document.describe()))?;
        if substitution.text == current {
            tracing::info!(
                "{}: no IPv6 change (current: {})",
                document.describe(),
                previous.as_deref().unwrap_or("none")
            );
            return Ok(RewriteOutcome::Unchanged);
        }

        document
            .write(&substitution.text)
            .with_context(|| format!("Failed to write {}", document.describe()))?;
        tracing::info!(
            "{}: {} -> {}",
            document.describe(),
            previous.as_deref().unwrap_or("none"),
            replacement
        );
        Ok(RewriteOutcome::Changed { previous })
    }
}
