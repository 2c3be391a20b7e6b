//! Build plan — the compiled, tool-agnostic form of a manifest.
//!
//! A plan is an ordered list of outputs. Each output is a document made of
//! blocks; a block is either literal markdown or the captured stdout of one
//! extractor invocation. Executing the plan (see [`crate::execute`]) or
//! rendering it as a shell script (see [`crate::script`]) must produce the
//! same bytes.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// The three independent output categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Files,
    Methods,
    Options,
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SectionKind::Files => "files",
            SectionKind::Methods => "methods",
            SectionKind::Options => "options",
        })
    }
}

/// Where an invocation comes from, for error messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Origin {
    pub section: String,
    pub entry: String,
}

/// One extractor call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    /// Mode arguments, appended to the configured extractor command.
    pub args: Vec<String>,
    /// File the extractor reads; must exist before anything in the document runs.
    pub input: PathBuf,
    pub origin: Origin,
}

/// A unit of a document. Blocks are joined with one blank line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Block {
    Text { text: String },
    Capture {
        invocation: Invocation,
        /// Used instead of the captured output when that is blank.
        when_empty: Option<String>,
    },
}

impl Block {
    pub fn text(text: impl Into<String>) -> Block {
        Block::Text { text: text.into() }
    }

    pub fn capture(invocation: Invocation) -> Block {
        Block::Capture {
            invocation,
            when_empty: None,
        }
    }

    pub fn invocation(&self) -> Option<&Invocation> {
        match self {
            Block::Text { .. } => None,
            Block::Capture { invocation, .. } => Some(invocation),
        }
    }
}

/// The ordered body of one output file, before formatting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn extend(&mut self, blocks: impl IntoIterator<Item = Block>) {
        self.blocks.extend(blocks);
    }

    /// All extractor calls in document order.
    pub fn invocations(&self) -> impl Iterator<Item = &Invocation> {
        self.blocks.iter().filter_map(Block::invocation)
    }
}

/// Processing applied to a document body before it is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PostProcess {
    /// Pipe through the formatter tool.
    Format,
}

/// One file to produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedOutput {
    pub kind: SectionKind,
    pub target: PathBuf,
    pub document: Document,
    pub post: PostProcess,
}

/// Everything a generation run writes, in write order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildPlan {
    pub outputs: Vec<PlannedOutput>,
}

impl BuildPlan {
    pub fn output(&self, kind: SectionKind) -> Option<&PlannedOutput> {
        self.outputs.iter().find(|o| o.kind == kind)
    }
}

/// Join rendered blocks the way both the executor and the script do:
/// trailing newlines stripped, empty parts dropped, one blank line between
/// parts, one final newline.
pub fn join_parts<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let kept: Vec<&str> = parts
        .into_iter()
        .map(|p| p.trim_end_matches('\n'))
        .filter(|p| !p.is_empty())
        .collect();
    let mut out = kept.join("\n\n");
    out.push('\n');
    out
}
