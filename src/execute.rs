//! Plan executor: run the tools, format each document, write the outputs.
//!
//! Documents render on scoped threads, one per output. Nothing touches the
//! output directory until every document rendered and formatted, so a failed
//! run leaves previous outputs as they were.

use crate::error::{Error, Result};
use crate::plan::{join_parts, Block, BuildPlan, PlannedOutput, PostProcess};
use crate::tool::Tool;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use tempfile::Builder;

/// Runs a [`BuildPlan`] against an extractor and a formatter.
pub struct Generator<'a> {
    extractor: &'a dyn Tool,
    formatter: &'a dyn Tool,
}

impl<'a> Generator<'a> {
    pub fn new(extractor: &'a dyn Tool, formatter: &'a dyn Tool) -> Self {
        Generator {
            extractor,
            formatter,
        }
    }

    /// Render one output to its final, formatted content.
    ///
    /// Every input file of the document is checked before the first tool runs.
    pub fn render(&self, output: &PlannedOutput) -> Result<String> {
        for invocation in output.document.invocations() {
            if !invocation.input.is_file() {
                return Err(Error::SourceNotFound {
                    section: invocation.origin.section.clone(),
                    path: invocation.input.clone(),
                });
            }
        }

        let mut parts = Vec::with_capacity(output.document.blocks.len());
        for block in &output.document.blocks {
            match block {
                Block::Text { text } => parts.push(text.clone()),
                Block::Capture {
                    invocation,
                    when_empty,
                } => {
                    let captured = self
                        .extractor
                        .invoke(&invocation.args, None)
                        .map_err(|source| Error::Extraction {
                            section: invocation.origin.section.clone(),
                            entry: invocation.origin.entry.clone(),
                            path: invocation.input.clone(),
                            source,
                        })?;
                    match when_empty {
                        Some(fallback) if captured.trim().is_empty() => {
                            tracing::debug!(
                                input = %invocation.input.display(),
                                "no doc comment found, using fallback"
                            );
                            parts.push(fallback.clone());
                        }
                        _ => parts.push(captured),
                    }
                }
            }
        }

        let body = join_parts(parts.iter().map(String::as_str));
        match output.post {
            PostProcess::Format => {
                self.formatter
                    .invoke(&[], Some(&body))
                    .map_err(|source| Error::Formatting {
                        target: output.target.clone(),
                        source,
                    })
            }
        }
    }

    /// Render every output, then write them all. Returns the written paths
    /// in plan order.
    pub fn run(&self, plan: &BuildPlan) -> Result<Vec<PathBuf>> {
        let rendered: Vec<Result<String>> = thread::scope(|scope| {
            let handles: Vec<_> = plan
                .outputs
                .iter()
                .map(|output| scope.spawn(move || self.render(output)))
                .collect();
            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });

        // First failure in plan order wins; nothing has been written yet.
        let contents = rendered.into_iter().collect::<Result<Vec<String>>>()?;

        let mut written = Vec::with_capacity(contents.len());
        for (output, content) in plan.outputs.iter().zip(contents) {
            write_atomic(&output.target, &content)?;
            tracing::info!(
                kind = %output.kind,
                path = %output.target.display(),
                "wrote reference page"
            );
            written.push(output.target.clone());
        }
        Ok(written)
    }
}

/// Run the site builder once.
pub fn build_site(site_builder: &dyn Tool) -> Result<()> {
    let log = site_builder.invoke(&[], None).map_err(Error::SiteBuild)?;
    if !log.trim().is_empty() {
        tracing::debug!(tool = site_builder.name(), "{}", log.trim_end());
    }
    tracing::info!(tool = site_builder.name(), "site built");
    Ok(())
}

/// Temp files for new pages get the mode of a plain file create (0666 less
/// the umask) rather than tempfile's private 0600.
#[cfg(unix)]
fn page_builder() -> Builder<'static, 'static> {
    use std::os::unix::fs::PermissionsExt;
    let mut builder = Builder::new();
    builder.permissions(fs::Permissions::from_mode(0o666));
    builder
}

#[cfg(not(unix))]
fn page_builder() -> Builder<'static, 'static> {
    Builder::new()
}

/// Write through a temporary file in the target's directory, then rename.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let write_err = |source| Error::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(write_err)?;
    let existing = fs::metadata(path).ok().map(|m| m.permissions());
    let mut tmp = page_builder().tempfile_in(dir).map_err(write_err)?;
    // Rewriting a page keeps its mode.
    if let Some(permissions) = existing {
        tmp.as_file().set_permissions(permissions).map_err(write_err)?;
    }
    tmp.write_all(content.as_bytes()).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
