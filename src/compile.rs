//! Section compiler — one section group in, one ordered document out.
//!
//! Layout of a compiled group:
//!
//! ```text
//! # Title                      (titleLevel)
//! ## Section                   (titleLevel + 1)
//! ### `path/of/entry.nix`      (titleLevel + 2, files only)
//! <entry body>
//! ```
//!
//! Sections and entries keep manifest order. Nothing is sorted or deduplicated.

use crate::manifest::{FileSection, MethodSection, OptionsConfig, SectionGroup};
use crate::plan::{Document, Origin};
use crate::resolve::{self, Resolver};
use crate::settings::Settings;
use std::path::Path;

/// Compile the `files` group.
pub fn compile_files(group: &SectionGroup<FileSection>, settings: &Settings) -> Document {
    let mut resolver = Resolver::new(settings, &group.anchor_prefix);
    let mut doc = Document::default();
    doc.push(resolver.heading(group.title_level.get(), &group.title));

    for (i, section) in group.sections.iter().enumerate() {
        doc.push(resolver.heading(group.title_level.nested(1), &section.name));
        for (j, entry) in section.entries.iter().enumerate() {
            let origin = Origin {
                section: format!("files section {} `{}`", i, section.name),
                entry: format!("entry {}", j),
            };
            doc.extend(resolver.file_entry(entry, group.title_level.nested(2), origin));
        }
    }

    doc
}

/// Compile the `methods` group. Each section is one file's bindings.
pub fn compile_methods(group: &SectionGroup<MethodSection>, settings: &Settings) -> Document {
    let mut resolver = Resolver::new(settings, &group.anchor_prefix);
    let mut doc = Document::default();
    doc.push(resolver.heading(group.title_level.get(), &group.title));

    for (i, section) in group.sections.iter().enumerate() {
        let origin = Origin {
            section: format!("methods section {} `{}`", i, section.display_heading()),
            entry: "documented bindings".to_string(),
        };
        doc.extend(resolver.method_section(section, group.title_level.nested(1), origin));
    }

    doc
}

/// Compile the `options` group from its option-description JSON.
pub fn compile_options(config: &OptionsConfig, json: &Path) -> Document {
    let mut doc = Document::default();
    doc.push(resolve::options(config, json));
    doc
}
