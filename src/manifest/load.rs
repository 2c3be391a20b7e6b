//! Reading manifest documents from disk.
//!
//! `.toml` files are parsed as TOML, anything else as JSON. Both end up as a
//! `serde_json::Value` so validation only deals with one representation.

use crate::error::{Error, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Manifest document syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Toml,
}

impl Format {
    pub fn from_path(path: &Path) -> Format {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Format::Toml,
            _ => Format::Json,
        }
    }
}

/// Read and parse a manifest document without validating it.
pub fn read_document(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).map_err(|source| Error::ManifestRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(&text, Format::from_path(path)).map_err(|message| Error::ManifestParse {
        path: path.to_path_buf(),
        message,
    })
}

/// Parse manifest text in the given syntax.
pub fn parse_document(text: &str, format: Format) -> Result<Value, String> {
    match format {
        Format::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        Format::Toml => toml::from_str(text).map_err(|e| e.to_string()),
    }
}
