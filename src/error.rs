//! Error taxonomy for manifest compilation and generation runs.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the library.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Any failure of a generation run.
///
/// Every variant carries enough context (section, entry index, path) to
/// locate the offending manifest element.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read manifest {path}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest {path}: {message}")]
    ManifestParse { path: PathBuf, message: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("{section}: source file not found: {}", path.display())]
    SourceNotFound { section: String, path: PathBuf },

    #[error("options: no option description JSON given (set `options.file` or pass --options-json)")]
    MissingOptionsJson,

    #[error("{section}: extraction failed for {entry} ({})", path.display())]
    Extraction {
        section: String,
        entry: String,
        path: PathBuf,
        #[source]
        source: ToolError,
    },

    #[error("formatting {} failed", target.display())]
    Formatting {
        target: PathBuf,
        #[source]
        source: ToolError,
    },

    #[error("site build failed")]
    SiteBuild(#[source] ToolError),

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file watcher failed")]
    Watch(#[from] notify::Error),
}

/// A structurally invalid manifest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid manifest at `{field}`: {message}")]
pub struct SchemaError {
    pub field: FieldPath,
    pub message: String,
}

impl SchemaError {
    pub fn new(field: &FieldPath, message: impl Into<String>) -> Self {
        SchemaError {
            field: field.clone(),
            message: message.into(),
        }
    }
}

/// Dotted location inside the manifest, e.g. `files.sections[1].entries[0]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(Vec<Segment>);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

impl FieldPath {
    pub fn root() -> Self {
        FieldPath::default()
    }

    pub fn key(&self, key: &str) -> Self {
        let mut next = self.clone();
        next.0.push(Segment::Key(key.to_string()));
        next
    }

    pub fn index(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.0.push(Segment::Index(index));
        next
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => write!(f, "{}", key)?,
                Segment::Key(key) => write!(f, ".{}", key)?,
                Segment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

/// Failure of an external tool invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("could not run `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("`{program}` produced output that is not valid UTF-8")]
    InvalidOutput { program: String },
}
