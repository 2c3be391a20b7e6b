//! refgen — compile a documentation manifest into markdown reference pages.
//!
//! A manifest lists what to document in three independent groups:
//!
//! - **files**: source files shown by their leading doc comment
//! - **methods**: source files shown by their documented bindings
//! - **options**: an option reference rendered from an option-description JSON
//!
//! The pipeline is strictly one-way:
//!
//! ```text
//! document ─▶ Manifest + Settings ─▶ compile ─▶ BuildPlan ─┬─▶ execute (write files)
//!                                                          └─▶ script  (bash)
//! ```
//!
//! Extraction, formatting and site building are delegated to external
//! [`tool::Tool`]s; the core never parses source files itself.

pub mod anchor;
pub mod assemble;
pub mod compile;
pub mod error;
pub mod execute;
pub mod manifest;
pub mod plan;
pub mod resolve;
pub mod script;
pub mod settings;
pub mod tool;
pub mod watch;

pub use error::{Error, Result};
pub use manifest::Manifest;
pub use settings::{Overrides, Settings};

use execute::Generator;
use std::path::{Path, PathBuf};
use tool::ProcessTool;

/// Read and validate the manifest at `path` together with its settings.
pub fn load(path: &Path, overrides: &Overrides) -> Result<(Manifest, Settings)> {
    let document = manifest::load::read_document(path)?;
    let manifest = Manifest::from_value(&document)?;
    let settings = Settings::from_value(&document, overrides)?;
    tracing::debug!(manifest = %path.display(), ?settings, "manifest loaded");
    Ok((manifest, settings))
}

/// Generate every reference page with the configured tools.
pub fn generate(manifest: &Manifest, settings: &Settings) -> Result<Vec<PathBuf>> {
    let plan = assemble::assemble(manifest, settings)?;
    let extractor = ProcessTool::new(settings.tools.extractor.clone());
    let formatter = ProcessTool::new(settings.tools.formatter.clone());
    Generator::new(&extractor, &formatter).run(&plan)
}

/// [`generate`], then run the site builder.
pub fn build(manifest: &Manifest, settings: &Settings) -> Result<Vec<PathBuf>> {
    let written = generate(manifest, settings)?;
    execute::build_site(&ProcessTool::new(settings.tools.site_builder.clone()))?;
    Ok(written)
}
