//! Generator settings: where sources live, where output goes, which tools run.
//!
//! Read from the same document as the manifest (`localPaths`, `referenceDir`,
//! `outputFiles`, `tools`, `fallbackPolicy`, `watch`), then merged with command
//! line overrides. After [`Settings::from_value`] every field is concrete.

use crate::error::{FieldPath, SchemaError};
use crate::manifest::value::Record;
use crate::manifest::validate_relative_path;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// When a file entry's `fallback` text is used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// The fallback always replaces extraction.
    #[default]
    Always,
    /// The extractor runs; the fallback is used only if it finds no comment.
    WhenMissing,
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(FallbackPolicy::Always),
            "when-missing" => Ok(FallbackPolicy::WhenMissing),
            _ => Err(format!(
                "unknown fallback policy `{}`. Use always or when-missing",
                s
            )),
        }
    }
}

/// Output file names per group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFiles {
    pub files: String,
    pub methods: String,
    pub options: String,
}

impl OutputFiles {
    fn by_key(&self) -> [(&'static str, &str); 3] {
        [
            ("files", self.files.as_str()),
            ("methods", self.methods.as_str()),
            ("options", self.options.as_str()),
        ]
    }
}

impl Default for OutputFiles {
    fn default() -> Self {
        OutputFiles {
            files: "files.md".to_string(),
            methods: "methods.md".to_string(),
            options: "options.md".to_string(),
        }
    }
}

/// Argv prefixes of the external tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommands {
    pub extractor: Vec<String>,
    pub formatter: Vec<String>,
    pub site_builder: Vec<String>,
}

impl Default for ToolCommands {
    fn default() -> Self {
        ToolCommands {
            extractor: vec!["nixdoc".to_string()],
            formatter: vec!["mdformat".to_string(), "-".to_string()],
            site_builder: vec!["mdbook".to_string(), "build".to_string()],
        }
    }
}

/// Fully normalized generator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub source_root: PathBuf,
    pub site_root: PathBuf,
    /// Subdirectory of the site root receiving the outputs. Empty = site root.
    pub reference_dir: PathBuf,
    pub output_files: OutputFiles,
    pub tools: ToolCommands,
    pub fallback_policy: FallbackPolicy,
    /// Option-description JSON, when given on the command line.
    pub options_json: Option<PathBuf>,
    /// Glob patterns (relative to the source root) ignored by `serve`.
    pub watch_ignore: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            source_root: PathBuf::from("."),
            site_root: PathBuf::from("docs"),
            reference_dir: PathBuf::from("reference"),
            output_files: OutputFiles::default(),
            tools: ToolCommands::default(),
            fallback_policy: FallbackPolicy::default(),
            options_json: None,
            watch_ignore: vec![
                ".git/**".to_string(),
                "book/**".to_string(),
                "result/**".to_string(),
                "target/**".to_string(),
            ],
        }
    }
}

/// Command line values that win over the manifest.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub source_root: Option<PathBuf>,
    pub site_root: Option<PathBuf>,
    pub reference_dir: Option<String>,
    pub options_json: Option<PathBuf>,
    pub fallback_policy: Option<FallbackPolicy>,
}

impl Settings {
    /// Read settings from a raw manifest document and apply `overrides`.
    pub fn from_value(value: &Value, overrides: &Overrides) -> Result<Settings, SchemaError> {
        let root = Record::new(value, FieldPath::root())?;
        let mut settings = Settings::default();

        if let Some(paths) = root.optional_record("localPaths")? {
            if let Some(source) = paths.optional_str("sourceRoot")? {
                settings.source_root = non_empty_path(source, &paths.field("sourceRoot"))?;
            }
            if let Some(site) = paths.optional_str("siteRoot")? {
                settings.site_root = non_empty_path(site, &paths.field("siteRoot"))?;
            }
        }

        if let Some(dir) = root.optional_str("referenceDir")? {
            settings.reference_dir = reference_dir(dir, &root.field("referenceDir"))?;
        }

        if let Some(outputs) = root.optional_record("outputFiles")? {
            let mut given = HashSet::new();
            for (key, slot) in [
                ("files", &mut settings.output_files.files),
                ("methods", &mut settings.output_files.methods),
                ("options", &mut settings.output_files.options),
            ] {
                if let Some(name) = outputs.optional_str(key)? {
                    *slot = file_name(name, &outputs.field(key))?;
                    given.insert(key);
                }
            }

            // Two groups must never write the same file.
            let names = settings.output_files.by_key();
            for (j, (later, name)) in names.iter().enumerate() {
                if let Some((earlier, _)) = names[..j].iter().find(|(_, n)| n == name) {
                    let (blamed, other) = if given.contains(later) {
                        (later, earlier)
                    } else {
                        (earlier, later)
                    };
                    return Err(SchemaError::new(
                        &outputs.field(blamed),
                        format!("`{}` is already the output file of `{}`", name, other),
                    ));
                }
            }
        }

        if let Some(tools) = root.optional_record("tools")? {
            for (key, slot) in [
                ("extractor", &mut settings.tools.extractor),
                ("formatter", &mut settings.tools.formatter),
                ("siteBuilder", &mut settings.tools.site_builder),
            ] {
                if let Some(argv) = tools.optional_str_list(key)? {
                    if argv.is_empty() || argv[0].is_empty() {
                        return Err(SchemaError::new(
                            &tools.field(key),
                            "command must name a program",
                        ));
                    }
                    *slot = argv;
                }
            }
        }

        if let Some(policy) = root.optional_str("fallbackPolicy")? {
            settings.fallback_policy = policy
                .parse::<FallbackPolicy>()
                .map_err(|message: String| SchemaError::new(&root.field("fallbackPolicy"), message))?;
        }

        if let Some(watch) = root.optional_record("watch")? {
            if let Some(patterns) = watch.optional_str_list("ignore")? {
                let at = watch.field("ignore");
                for (i, pattern) in patterns.iter().enumerate() {
                    glob::Pattern::new(pattern).map_err(|e| {
                        SchemaError::new(&at.index(i), format!("invalid glob pattern: {}", e))
                    })?;
                }
                settings.watch_ignore = patterns;
            }
        }

        settings.apply(overrides)?;
        Ok(settings)
    }

    fn apply(&mut self, overrides: &Overrides) -> Result<(), SchemaError> {
        let cli = FieldPath::root().key("<command line>");
        if let Some(ref source) = overrides.source_root {
            self.source_root = source.clone();
        }
        if let Some(ref site) = overrides.site_root {
            self.site_root = site.clone();
        }
        if let Some(ref dir) = overrides.reference_dir {
            self.reference_dir = reference_dir(dir, &cli.key("reference-dir"))?;
        }
        if let Some(ref json) = overrides.options_json {
            self.options_json = Some(json.clone());
        }
        if let Some(policy) = overrides.fallback_policy {
            self.fallback_policy = policy;
        }
        Ok(())
    }

    /// Directory receiving the generated files.
    pub fn output_dir(&self) -> PathBuf {
        if self.reference_dir.as_os_str().is_empty() {
            self.site_root.clone()
        } else {
            self.site_root.join(&self.reference_dir)
        }
    }

    /// Resolve a manifest-relative path against the source root.
    /// A source root of "." leaves the path as written.
    pub fn source_path(&self, relative: &Path) -> PathBuf {
        if self.source_root == Path::new(".") || self.source_root.as_os_str().is_empty() {
            relative.to_path_buf()
        } else {
            self.source_root.join(relative)
        }
    }
}

fn non_empty_path(raw: &str, at: &FieldPath) -> Result<PathBuf, SchemaError> {
    if raw.is_empty() {
        return Err(SchemaError::new(at, "path must not be empty"));
    }
    Ok(PathBuf::from(raw))
}

/// `""` means the site root itself; anything else must stay inside it.
fn reference_dir(raw: &str, at: &FieldPath) -> Result<PathBuf, SchemaError> {
    if raw.is_empty() {
        return Ok(PathBuf::new());
    }
    Ok(validate_relative_path(raw, at)?.as_path().to_path_buf())
}

fn file_name(raw: &str, at: &FieldPath) -> Result<String, SchemaError> {
    let path = validate_relative_path(raw, at)?;
    if path.as_path().components().count() != 1 {
        return Err(SchemaError::new(
            at,
            format!("`{}` must be a file name, not a path", raw),
        ));
    }
    Ok(path.to_string())
}
