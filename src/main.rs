//! refgen — generate markdown reference pages from a documentation manifest.
//!
//! - `refgen generate`: write the reference pages
//! - `refgen build`: generate, then run the site builder
//! - `refgen serve`: build, then rebuild whenever a source changes
//! - `refgen script`: print the equivalent bash build script
//! - `refgen check`: validate the manifest and list the planned outputs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use refgen::settings::FallbackPolicy;
use refgen::{Manifest, Overrides, Settings};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "refgen",
    version,
    about = "Compile a documentation manifest into markdown reference pages"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Manifest file (.json or .toml)
    #[arg(short = 'm', long, global = true, default_value = "refgen.json")]
    manifest: PathBuf,

    /// Root the manifest's source paths are relative to
    #[arg(long, global = true)]
    source_root: Option<PathBuf>,

    /// Root of the documentation site
    #[arg(long, global = true)]
    site_root: Option<PathBuf>,

    /// Subdirectory of the site root for generated pages ("" = site root)
    #[arg(long, global = true)]
    reference_dir: Option<String>,

    /// Option-description JSON for the options page, taken as given
    #[arg(long, global = true)]
    options_json: Option<PathBuf>,

    /// When fallback text replaces extraction: always, when-missing
    #[arg(long, global = true)]
    fallback_policy: Option<FallbackPolicy>,

    /// More log output (-v info, -vv debug). REFGEN_LOG overrides.
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Write the reference pages
    Generate,
    /// Generate the reference pages, then build the site
    Build,
    /// Build, then rebuild on every source change
    Serve,
    /// Print the bash script equivalent to `generate`
    Script {
        /// Write the script to this file instead of stdout
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },
    /// Validate the manifest and list the planned outputs
    Check {
        /// Print the full build plan as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let overrides = Overrides {
        source_root: cli.source_root.clone(),
        site_root: cli.site_root.clone(),
        reference_dir: cli.reference_dir.clone(),
        options_json: cli.options_json.clone(),
        fallback_policy: cli.fallback_policy,
    };

    match cli.command {
        Command::Generate => {
            let (manifest, settings) = load(&cli.manifest, &overrides)?;
            for path in refgen::generate(&manifest, &settings).context("generation failed")? {
                println!("{}", path.display());
            }
        }
        Command::Build => {
            let (manifest, settings) = load(&cli.manifest, &overrides)?;
            refgen::build(&manifest, &settings).context("build failed")?;
        }
        Command::Serve => serve(&cli.manifest, &overrides)?,
        Command::Script { ref output } => {
            let (manifest, settings) = load(&cli.manifest, &overrides)?;
            let plan = refgen::assemble::assemble(&manifest, &settings)?;
            let script = refgen::script::render_script(&plan, &settings.tools);
            match output {
                Some(path) => write_script(path, &script)?,
                None => print!("{}", script),
            }
        }
        Command::Check { json } => {
            let (manifest, settings) = load(&cli.manifest, &overrides)?;
            let plan = refgen::assemble::assemble(&manifest, &settings)?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&plan).context("failed to serialize plan")?
                );
            } else {
                for output in &plan.outputs {
                    println!(
                        "{}\t{}\t{} tool invocations",
                        output.kind,
                        output.target.display(),
                        output.document.invocations().count()
                    );
                }
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env("REFGEN_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load(path: &Path, overrides: &Overrides) -> Result<(Manifest, Settings)> {
    refgen::load(path, overrides)
        .with_context(|| format!("failed to load manifest {}", path.display()))
}

/// Initial build, then watch. The manifest is re-read on every rebuild.
fn serve(manifest_path: &Path, overrides: &Overrides) -> Result<()> {
    let (_, settings) = load(manifest_path, overrides)?;

    let rebuild = || -> Result<()> {
        let (manifest, settings) = load(manifest_path, overrides)?;
        refgen::build(&manifest, &settings).context("build failed")?;
        Ok(())
    };

    if let Err(e) = rebuild() {
        tracing::warn!("initial build failed: {:#}", e);
    }

    refgen::watch::watch(&settings, rebuild).context("watching sources failed")
}

fn write_script(path: &Path, script: &str) -> Result<()> {
    fs::write(path, script).with_context(|| format!("failed to write {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))
            .with_context(|| format!("failed to make {} executable", path.display()))?;
    }
    Ok(())
}
