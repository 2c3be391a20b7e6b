//! Bash rendering of a build plan.
//!
//! The script reproduces [`crate::execute::Generator::run`] byte for byte:
//! captured output loses its trailing newlines (command substitution), empty
//! parts are skipped, parts are separated by one blank line and the document
//! ends with a single newline. All outputs are rendered into temporary files
//! first and moved into place at the end.

use crate::plan::{Block, BuildPlan, PlannedOutput, PostProcess};
use crate::settings::ToolCommands;
use std::fmt::Write;
use std::path::Path;

const PRELUDE: &str = r#"set -euo pipefail

tmps=()
trap 'rm -f -- ${tmps[@]+"${tmps[@]}"}' EXIT

# require <path> <where>
require() {
  if [ ! -f "$1" ]; then
    printf '%s: source file not found: %s\n' "$2" "$1" >&2
    exit 1
  fi
}

# mode_like <tmp> <target>: give tmp the target's mode, or a new file's mode
mode_like() {
  if [ -e "$2" ]; then
    chmod "$(stat -c '%a' "$2" 2>/dev/null || stat -f '%Lp' "$2")" "$1"
  else
    chmod "$(printf '%o' $(( 0666 & ~0$(umask) )))" "$1"
  fi
}

# emit <part>: print a non-empty part, separated from the previous one by a blank line
emit() {
  if [ -n "$1" ]; then
    printf '%s%s' "$sep" "$1"
    sep=$'\n\n'
  fi
}
"#;

/// Render `plan` as a standalone bash script using `tools`.
pub fn render_script(plan: &BuildPlan, tools: &ToolCommands) -> String {
    let mut out = String::new();
    out.push_str("#!/usr/bin/env bash\n");
    out.push_str("# Generated by refgen. Regenerate instead of editing.\n");
    out.push_str(PRELUDE);
    out.push('\n');
    let _ = writeln!(out, "extractor=({})", quote_all(&tools.extractor));
    let _ = writeln!(out, "formatter=({})", quote_all(&tools.formatter));

    for (i, output) in plan.outputs.iter().enumerate() {
        out.push('\n');
        render_output(&mut out, i, output);
    }

    if !plan.outputs.is_empty() {
        out.push('\n');
        for (i, output) in plan.outputs.iter().enumerate() {
            let _ = writeln!(out, "mv -f -- \"$tmp_{}\" {}", i, quote(&path_str(&output.target)));
        }
    }
    out
}

fn render_output(out: &mut String, index: usize, output: &PlannedOutput) {
    let target = path_str(&output.target);
    let dir = match output.target.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => path_str(dir),
        _ => ".".to_string(),
    };
    let name = output
        .target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let _ = writeln!(out, "# {} -> {}", output.kind, target);
    for invocation in output.document.invocations() {
        let _ = writeln!(
            out,
            "require {} {}",
            quote(&path_str(&invocation.input)),
            quote(&invocation.origin.section)
        );
    }
    let _ = writeln!(out, "mkdir -p -- {}", quote(&dir));
    let _ = writeln!(
        out,
        "tmp_{}=\"$(mktemp {})\"",
        index,
        quote(&format!("{}/.{}.XXXXXX", dir, name))
    );
    let _ = writeln!(out, "tmps+=(\"$tmp_{}\")", index);
    let _ = writeln!(out, "mode_like \"$tmp_{}\" {}", index, quote(&target));

    out.push_str("{\n  sep=''\n");
    for block in &output.document.blocks {
        match block {
            Block::Text { text } => {
                let text = text.trim_end_matches('\n');
                if !text.is_empty() {
                    let _ = writeln!(out, "  emit {}", quote(text));
                }
            }
            Block::Capture {
                invocation,
                when_empty,
            } => {
                let _ = writeln!(
                    out,
                    "  part=\"$(\"${{extractor[@]}}\" {})\"",
                    quote_all(&invocation.args)
                );
                if let Some(fallback) = when_empty {
                    let _ = writeln!(
                        out,
                        "  if [ -z \"${{part//[[:space:]]/}}\" ]; then part={}; fi",
                        quote(fallback.trim_end_matches('\n'))
                    );
                }
                out.push_str("  emit \"$part\"\n");
            }
        }
    }
    out.push_str("  printf '\\n'\n");
    match output.post {
        PostProcess::Format => {
            let _ = writeln!(out, "}} | \"${{formatter[@]}}\" > \"$tmp_{}\"", index);
        }
    }
}

/// Double-quote `s` for bash, escaping `\`, `"`, `$` and backticks.
pub fn quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        if matches!(c, '\\' | '"' | '$' | '`') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

fn quote_all(args: &[String]) -> String {
    args.iter().map(|a| quote(a)).collect::<Vec<_>>().join(" ")
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
