//! Entry resolver — turns one manifest entry into document blocks.
//!
//! The resolver never reads source files. It decides between literal
//! fallback text and an extractor invocation, builds that invocation's
//! arguments, and renders the entry's heading through the document's
//! [`AnchorRegistry`].

use crate::anchor::AnchorRegistry;
use crate::manifest::{FileEntry, MethodSection, OptionsConfig};
use crate::plan::{Block, Invocation, Origin};
use crate::settings::{FallbackPolicy, Settings};
use std::path::Path;

/// Shared inputs for resolving the entries of one document.
pub struct Resolver<'a> {
    settings: &'a Settings,
    anchors: AnchorRegistry,
}

impl<'a> Resolver<'a> {
    pub fn new(settings: &'a Settings, anchor_prefix: &str) -> Self {
        Resolver {
            settings,
            anchors: AnchorRegistry::new(anchor_prefix),
        }
    }

    /// Plain heading through the document's anchor bookkeeping.
    pub fn heading(&mut self, level: u8, text: &str) -> Block {
        Block::text(self.anchors.heading(level, text))
    }

    /// A file entry: its path as a heading, then the file's leading doc
    /// comment or the literal fallback.
    pub fn file_entry(
        &mut self,
        entry: &FileEntry,
        level: u8,
        origin: Origin,
    ) -> Vec<Block> {
        let heading = self.heading(level, &format!("`{}`", entry.path()));

        let body = match (entry.fallback(), self.settings.fallback_policy) {
            (Some(fallback), FallbackPolicy::Always) => Block::text(fallback),
            (fallback, _) => {
                let input = self.settings.source_path(entry.path().as_path());
                let mut args = vec![
                    "file-doc".to_string(),
                    "--file".to_string(),
                    path_arg(&input),
                ];
                // The comment's own headings nest under the entry heading.
                args.push("--shift-headings".to_string());
                args.push(level.to_string());
                Block::Capture {
                    invocation: Invocation { args, input, origin },
                    when_empty: fallback.map(str::to_string),
                }
            }
        };

        vec![heading, body]
    }

    /// A method section: heading, then the rendered bindings of the whole file.
    ///
    /// The document's anchor prefix doubles as the extractor's `--prefix`.
    pub fn method_section(
        &mut self,
        section: &MethodSection,
        level: u8,
        origin: Origin,
    ) -> Vec<Block> {
        let heading = self.heading(level, &section.display_heading());

        let input = self.settings.source_path(section.path.as_path());
        // Empty category/description keep the extractor from printing its own title.
        let mut args = vec![
            "--category".to_string(),
            String::new(),
            "--description".to_string(),
            String::new(),
            "--file".to_string(),
            path_arg(&input),
        ];
        let prefix = self.anchors.prefix();
        if !prefix.is_empty() {
            args.push("--prefix".to_string());
            args.push(prefix.to_string());
        }
        if let Some(ref exports) = section.exports {
            args.push("--export".to_string());
            args.push(exports.join(","));
        }

        vec![
            heading,
            Block::capture(Invocation {
                args,
                input,
                origin,
            }),
        ]
    }
}

/// The options document: one invocation whose output is the whole body.
pub fn options(config: &OptionsConfig, json: &Path) -> Block {
    let mut args = vec![
        "options".to_string(),
        "--file".to_string(),
        path_arg(json),
        "--title".to_string(),
        config.title.clone(),
        "--anchor-prefix".to_string(),
        config.anchor_prefix.clone(),
    ];
    if let Some(ref preamble) = config.preamble {
        args.push("--preamble".to_string());
        args.push(preamble.clone());
    }
    if let Some(ref url) = config.declarations_base_url {
        args.push("--declarations-base-url".to_string());
        args.push(url.clone());
    }
    if let Some(ref revision) = config.revision {
        args.push("--revision".to_string());
        args.push(revision.clone());
    }

    Block::capture(Invocation {
        args,
        input: json.to_path_buf(),
        origin: Origin {
            section: "options".to_string(),
            entry: "option descriptions".to_string(),
        },
    })
}

/// Paths on the command line always use forward slashes.
fn path_arg(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
