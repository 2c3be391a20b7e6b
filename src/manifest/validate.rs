//! Structural validation: raw document → [`Manifest`].

use super::value::{type_name, Record};
use super::{
    FileEntry, FileSection, Manifest, MethodSection, OptionsConfig, SectionGroup, SourcePath,
    TitleLevel,
};
use crate::error::{FieldPath, SchemaError};
use regex::Regex;
use serde_json::Value;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

/// Exported binding names: Nix-style identifiers, never containing a comma.
static RE_SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_'\-]*$").unwrap());

impl Manifest {
    /// Validate a raw manifest document.
    ///
    /// Keys other than `files`, `methods` and `options` are ignored here;
    /// generator settings are read separately by [`crate::Settings`].
    pub fn from_value(value: &Value) -> Result<Manifest, SchemaError> {
        let root = Record::new(value, FieldPath::root())?;

        let files = root
            .optional_record("files")?
            .map(|group| section_group(&group, file_section))
            .transpose()?;
        let methods = root
            .optional_record("methods")?
            .map(|group| section_group(&group, method_section))
            .transpose()?;
        let options = root
            .optional_record("options")?
            .map(|record| options_config(&record))
            .transpose()?;

        Ok(Manifest {
            files,
            methods,
            options,
        })
    }
}

fn section_group<S>(
    group: &Record,
    parse_section: fn(&Value, FieldPath) -> Result<S, SchemaError>,
) -> Result<SectionGroup<S>, SchemaError> {
    let title = group.required_str("title")?.to_string();
    let title_level = match group.optional_integer("titleLevel")? {
        None => TitleLevel::default(),
        Some(level) => u64::try_from(level)
            .ok()
            .and_then(TitleLevel::new)
            .ok_or_else(|| {
                SchemaError::new(
                    &group.field("titleLevel"),
                    format!("must be between 1 and 6, got {}", level),
                )
            })?,
    };
    let anchor_prefix = group.optional_str("anchorPrefix")?.unwrap_or("").to_string();

    let sections_at = group.field("sections");
    let sections = match group.optional_list("sections")? {
        None => Vec::new(),
        Some(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_section(item, sections_at.index(i)))
            .collect::<Result<Vec<_>, _>>()?,
    };

    Ok(SectionGroup {
        title,
        title_level,
        anchor_prefix,
        sections,
    })
}

fn file_section(value: &Value, at: FieldPath) -> Result<FileSection, SchemaError> {
    let record = Record::new(value, at)?;
    let name = record.required_str("name")?.to_string();

    let entries_at = record.field("entries");
    let entries = match record.optional_list("entries")? {
        None => Vec::new(),
        Some(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| file_entry(item, entries_at.index(i)))
            .collect::<Result<Vec<_>, _>>()?,
    };

    Ok(FileSection { name, entries })
}

/// An entry is either a bare path string or a `{ path, fallback? }` record.
fn file_entry(value: &Value, at: FieldPath) -> Result<FileEntry, SchemaError> {
    match value {
        Value::String(raw) => Ok(FileEntry::Path(validate_relative_path(raw, &at)?)),
        Value::Object(map) if map.contains_key("path") => {
            let record = Record::new(value, at)?;
            let path = validate_relative_path(record.required_str("path")?, &record.field("path"))?;
            match record.optional_str("fallback")? {
                Some(fallback) => Ok(FileEntry::WithFallback {
                    path,
                    fallback: fallback.to_string(),
                }),
                None => Ok(FileEntry::Path(path)),
            }
        }
        other => Err(SchemaError::new(
            &at,
            format!(
                "entry must be a path string or a record with `path` (and optional `fallback`), found {}",
                describe_shape(other)
            ),
        )),
    }
}

fn method_section(value: &Value, at: FieldPath) -> Result<MethodSection, SchemaError> {
    if !matches!(value, Value::Object(map) if map.contains_key("path")) {
        return Err(SchemaError::new(
            &at,
            format!(
                "section must be a record with `path` (and optional `heading`, `exports`), found {}",
                describe_shape(value)
            ),
        ));
    }
    let record = Record::new(value, at)?;
    let path = validate_relative_path(record.required_str("path")?, &record.field("path"))?;
    let heading = record.optional_str("heading")?.map(str::to_string);

    let exports = match record.optional_str_list("exports")? {
        None => None,
        Some(names) => {
            let exports_at = record.field("exports");
            if names.is_empty() {
                return Err(SchemaError::new(
                    &exports_at,
                    "must name at least one symbol (omit the field to export everything)",
                ));
            }
            for (i, name) in names.iter().enumerate() {
                if !RE_SYMBOL.is_match(name) {
                    return Err(SchemaError::new(
                        &exports_at.index(i),
                        format!("`{}` is not a valid symbol name", name),
                    ));
                }
            }
            Some(names)
        }
    };

    Ok(MethodSection {
        path,
        heading,
        exports,
    })
}

fn options_config(record: &Record) -> Result<OptionsConfig, SchemaError> {
    let file = record
        .optional_str("file")?
        .map(|raw| {
            if raw.is_empty() {
                Err(SchemaError::new(&record.field("file"), "path must not be empty"))
            } else {
                Ok(PathBuf::from(raw))
            }
        })
        .transpose()?;

    Ok(OptionsConfig {
        title: record.required_str("title")?.to_string(),
        anchor_prefix: record.optional_str("anchorPrefix")?.unwrap_or("").to_string(),
        file,
        preamble: record.optional_str("preamble")?.map(str::to_string),
        declarations_base_url: record
            .optional_str("declarationsBaseUrl")?
            .map(str::to_string),
        revision: record.optional_str("revision")?.map(str::to_string),
    })
}

/// Check that `raw` stays inside the source root.
///
/// Rejects empty paths, absolute paths and any `..` component.
/// `./` prefixes are dropped.
pub fn validate_relative_path(raw: &str, at: &FieldPath) -> Result<SourcePath, SchemaError> {
    if raw.is_empty() {
        return Err(SchemaError::new(at, "path must not be empty"));
    }
    let mut normalized = PathBuf::new();
    for component in Path::new(raw).components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(SchemaError::new(
                    at,
                    format!("path `{}` must not contain `..`", raw),
                ))
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(SchemaError::new(
                    at,
                    format!("path `{}` must be relative to the source root", raw),
                ))
            }
        }
    }
    if normalized.as_os_str().is_empty() {
        return Err(SchemaError::new(
            at,
            format!("path `{}` does not name a file", raw),
        ));
    }
    Ok(SourcePath(normalized))
}

fn describe_shape(value: &Value) -> String {
    match value {
        Value::Object(map) if map.is_empty() => "an empty record".to_string(),
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("a record with keys [{}]", keys.join(", "))
        }
        other => type_name(other).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn err(value: Value) -> SchemaError {
        Manifest::from_value(&value).unwrap_err()
    }

    #[test]
    fn empty_manifest_has_no_groups() {
        let manifest = Manifest::from_value(&json!({})).unwrap();
        assert!(manifest.files.is_none());
        assert!(manifest.methods.is_none());
        assert!(manifest.options.is_none());
    }

    #[test]
    fn unknown_top_level_keys_are_ignored() {
        let manifest = Manifest::from_value(&json!({
            "navigation": { "whatever": true },
            "version": 3,
            "methods": { "title": "Functions", "sections": [] }
        }))
        .unwrap();
        assert!(manifest.methods.is_some());
    }

    #[test]
    fn title_level_defaults_to_one() {
        let manifest = Manifest::from_value(&json!({
            "files": { "title": "Files", "sections": [] }
        }))
        .unwrap();
        assert_eq!(manifest.files.unwrap().title_level.get(), 1);
    }

    #[test]
    fn title_level_out_of_range_is_rejected() {
        for level in [0, 7, -1] {
            let e = err(json!({ "files": { "title": "Files", "titleLevel": level } }));
            assert_eq!(e.field.to_string(), "files.titleLevel");
            assert!(e.message.contains("between 1 and 6"), "{}", e.message);
        }
    }

    #[test]
    fn title_level_must_be_integer() {
        let e = err(json!({ "methods": { "title": "M", "titleLevel": "2" } }));
        assert_eq!(e.field.to_string(), "methods.titleLevel");
    }

    #[test]
    fn bare_and_detailed_entries() {
        let manifest = Manifest::from_value(&json!({
            "files": {
                "title": "Files",
                "sections": [{
                    "name": "Core",
                    "entries": [
                        "lib/default.nix",
                        { "path": "./lib/strings.nix" },
                        { "path": "lib/fetchers.nix", "fallback": "Fetchers." }
                    ]
                }]
            }
        }))
        .unwrap();
        let entries = &manifest.files.unwrap().sections[0].entries;
        assert!(matches!(&entries[0], FileEntry::Path(p) if p.to_string() == "lib/default.nix"));
        assert!(matches!(&entries[1], FileEntry::Path(p) if p.to_string() == "lib/strings.nix"));
        assert_eq!(entries[2].fallback(), Some("Fetchers."));
    }

    #[test]
    fn entry_of_unknown_shape_names_its_index() {
        let e = err(json!({
            "files": {
                "title": "Files",
                "sections": [
                    { "name": "A", "entries": [] },
                    { "name": "B", "entries": ["ok.nix", { "file": "x.nix" }] }
                ]
            }
        }));
        assert_eq!(e.field.to_string(), "files.sections[1].entries[1]");
        assert!(e.message.contains("keys [file]"), "{}", e.message);
    }

    #[test]
    fn numeric_entry_is_a_shape_error() {
        let e = err(json!({
            "files": { "title": "F", "sections": [{ "name": "A", "entries": [42] }] }
        }));
        assert_eq!(e.field.to_string(), "files.sections[0].entries[0]");
    }

    #[test]
    fn absolute_path_is_rejected() {
        let e = err(json!({
            "methods": { "title": "M", "sections": [{ "path": "/etc/passwd" }] }
        }));
        assert_eq!(e.field.to_string(), "methods.sections[0].path");
        assert!(e.message.contains("relative"));
    }

    #[test]
    fn parent_traversal_is_rejected() {
        let e = err(json!({
            "files": { "title": "F", "sections": [{ "name": "A", "entries": ["lib/../../secret.nix"] }] }
        }));
        assert_eq!(e.field.to_string(), "files.sections[0].entries[0]");
        assert!(e.message.contains(".."));
    }

    #[test]
    fn method_section_without_path_is_rejected() {
        let e = err(json!({
            "methods": { "title": "M", "sections": [{ "heading": "Strings" }] }
        }));
        assert_eq!(e.field.to_string(), "methods.sections[0]");
    }

    #[test]
    fn exports_keep_manifest_order() {
        let manifest = Manifest::from_value(&json!({
            "methods": {
                "title": "M",
                "sections": [{ "path": "lib/a.nix", "exports": ["foo", "bar", "baz"] }]
            }
        }))
        .unwrap();
        let section = &manifest.methods.unwrap().sections[0];
        assert_eq!(
            section.exports.as_deref(),
            Some(&["foo".to_string(), "bar".to_string(), "baz".to_string()][..])
        );
    }

    #[test]
    fn empty_exports_are_rejected() {
        let e = err(json!({
            "methods": { "title": "M", "sections": [{ "path": "a.nix", "exports": [] }] }
        }));
        assert_eq!(e.field.to_string(), "methods.sections[0].exports");
    }

    #[test]
    fn export_with_comma_is_rejected() {
        let e = err(json!({
            "methods": { "title": "M", "sections": [{ "path": "a.nix", "exports": ["ok", "a,b"] }] }
        }));
        assert_eq!(e.field.to_string(), "methods.sections[0].exports[1]");
    }

    #[test]
    fn options_defaults() {
        let manifest = Manifest::from_value(&json!({
            "options": { "title": "Module options" }
        }))
        .unwrap();
        let options = manifest.options.unwrap();
        assert_eq!(options.anchor_prefix, "");
        assert!(options.file.is_none());
    }

    #[test]
    fn missing_title_is_reported() {
        let e = err(json!({ "options": { "anchorPrefix": "opt-" } }));
        assert_eq!(e.field.to_string(), "options.title");
    }
}
