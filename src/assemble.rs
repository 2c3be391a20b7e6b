//! Build plan assembler: compiled documents paired with their targets.

use crate::compile::{compile_files, compile_methods, compile_options};
use crate::error::{Error, Result};
use crate::manifest::{Manifest, OptionsConfig};
use crate::plan::{BuildPlan, PlannedOutput, PostProcess, SectionKind};
use crate::settings::Settings;
use std::path::PathBuf;

/// Build the ordered plan (files, methods, options). Absent groups produce
/// no output.
pub fn assemble(manifest: &Manifest, settings: &Settings) -> Result<BuildPlan> {
    let out_dir = settings.output_dir();
    let names = &settings.output_files;
    let mut plan = BuildPlan::default();

    if let Some(ref files) = manifest.files {
        plan.outputs.push(PlannedOutput {
            kind: SectionKind::Files,
            target: out_dir.join(&names.files),
            document: compile_files(files, settings),
            post: PostProcess::Format,
        });
    }

    if let Some(ref methods) = manifest.methods {
        plan.outputs.push(PlannedOutput {
            kind: SectionKind::Methods,
            target: out_dir.join(&names.methods),
            document: compile_methods(methods, settings),
            post: PostProcess::Format,
        });
    }

    if let Some(ref options) = manifest.options {
        let json = options_json(options, settings)?;
        plan.outputs.push(PlannedOutput {
            kind: SectionKind::Options,
            target: out_dir.join(&names.options),
            document: compile_options(options, &json),
            post: PostProcess::Format,
        });
    }

    Ok(plan)
}

/// `--options-json` wins and is taken as given; `options.file` resolves
/// against the source root unless absolute.
fn options_json(options: &OptionsConfig, settings: &Settings) -> Result<PathBuf> {
    if let Some(ref path) = settings.options_json {
        return Ok(path.clone());
    }
    match options.file {
        Some(ref file) if file.is_absolute() => Ok(file.clone()),
        Some(ref file) => Ok(settings.source_path(file)),
        None => Err(Error::MissingOptionsJson),
    }
}
