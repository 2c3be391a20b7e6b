//! Manifest model — typed, validated description of what to document.
//!
//! A manifest has three independent, optional groups:
//!
//! - `files`: sections listing source files whose leading doc comment is shown
//! - `methods`: sections listing source files whose documented bindings are shown
//! - `options`: a single option reference rendered from an option-description JSON
//!
//! Raw input goes through [`Manifest::from_value`] exactly once; everything
//! downstream works on these types and never looks at the raw document again.

pub mod load;
mod validate;
pub(crate) mod value;

use std::fmt;
use std::path::{Path, PathBuf};

pub use validate::validate_relative_path;

/// Validated manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub files: Option<SectionGroup<FileSection>>,
    pub methods: Option<SectionGroup<MethodSection>>,
    pub options: Option<OptionsConfig>,
}

/// Shared shape of the `files` and `methods` groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionGroup<S> {
    pub title: String,
    pub title_level: TitleLevel,
    /// Document-level anchor prefix. Empty means no explicit anchors.
    pub anchor_prefix: String,
    pub sections: Vec<S>,
}

/// Markdown heading level of a group title, always within 1..=6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TitleLevel(u8);

impl TitleLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 6;

    /// Returns `None` when `level` is outside 1..=6.
    pub fn new(level: u64) -> Option<Self> {
        if (Self::MIN as u64..=Self::MAX as u64).contains(&level) {
            Some(TitleLevel(level as u8))
        } else {
            None
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Level of a heading `depth` levels below the title, capped at 6.
    pub fn nested(self, depth: u8) -> u8 {
        self.0.saturating_add(depth).min(Self::MAX)
    }
}

impl Default for TitleLevel {
    fn default() -> Self {
        TitleLevel(1)
    }
}

/// A path relative to the documented source root, free of `..` components.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourcePath(PathBuf);

impl SourcePath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// File name without extension, used for default headings.
    /// "lib/strings.nix" → "strings"
    pub fn stem(&self) -> String {
        self.0
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.to_string())
    }
}

impl fmt::Display for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Forward slashes regardless of platform so output stays reproducible.
        let parts: Vec<String> = self
            .0
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        f.write_str(&parts.join("/"))
    }
}

/// One section of the `files` group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSection {
    pub name: String,
    pub entries: Vec<FileEntry>,
}

/// A file listed in a [`FileSection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEntry {
    /// Bare path (or a record without `fallback`).
    Path(SourcePath),
    /// Record with literal fallback text.
    WithFallback { path: SourcePath, fallback: String },
}

impl FileEntry {
    pub fn path(&self) -> &SourcePath {
        match self {
            FileEntry::Path(path) => path,
            FileEntry::WithFallback { path, .. } => path,
        }
    }

    pub fn fallback(&self) -> Option<&str> {
        match self {
            FileEntry::Path(_) => None,
            FileEntry::WithFallback { fallback, .. } => Some(fallback),
        }
    }
}

/// One section of the `methods` group: all documented bindings of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSection {
    pub path: SourcePath,
    pub heading: Option<String>,
    /// Restricts extraction to these symbols, in this order.
    pub exports: Option<Vec<String>>,
}

impl MethodSection {
    /// The explicit heading, or the file stem of `path`.
    pub fn display_heading(&self) -> String {
        self.heading.clone().unwrap_or_else(|| self.path.stem())
    }
}

/// The `options` group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionsConfig {
    pub title: String,
    pub anchor_prefix: String,
    /// Option-description JSON. Relative paths resolve against the source root.
    pub file: Option<PathBuf>,
    pub preamble: Option<String>,
    pub declarations_base_url: Option<String>,
    pub revision: Option<String>,
}
