//! CLI tests against stand-in tools (shell scripts under tests/fixtures).
#![cfg(unix)]

use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn cmd() -> assert_cmd::Command {
    assert_cmd::Command::from(Command::new(env!("CARGO_BIN_EXE_refgen")))
}

fn fixture_path(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

/// A project directory with source files and a `refgen.json` using the
/// stand-in tools.
fn project(sources: &[&str], mut manifest: Value, extractor: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    for source in sources {
        let path = dir.path().join("src").join(source);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ }\n").unwrap();
    }
    let object = manifest.as_object_mut().unwrap();
    object.insert("localPaths".to_string(), json!({ "sourceRoot": "src" }));
    object.entry("tools").or_insert(json!({
        "extractor": ["sh", fixture_path(extractor)],
        "formatter": ["sh", fixture_path("formatter.sh")],
        "siteBuilder": ["sh", "-c", "touch site-built"]
    }));
    fs::write(
        dir.path().join("refgen.json"),
        serde_json::to_string_pretty(&manifest).unwrap(),
    )
    .unwrap();
    dir
}

fn read(dir: &Path, rel: &str) -> String {
    fs::read_to_string(dir.join(rel)).unwrap()
}

fn methods_manifest() -> Value {
    json!({
        "methods": {
            "title": "Functions",
            "anchorPrefix": "mylib",
            "sections": [
                { "path": "lib/strings.nix", "heading": "Strings", "exports": ["foo", "bar", "baz"] },
                { "path": "lib/lists.nix" }
            ]
        }
    })
}

// -- generate --

#[test]
fn methods_only_writes_exactly_methods_md() {
    let dir = project(&["lib/strings.nix", "lib/lists.nix"], methods_manifest(), "extractor.sh");

    cmd()
        .current_dir(dir.path())
        .arg("generate")
        .assert()
        .success()
        .stdout(predicate::str::contains("docs/reference/methods.md"));

    let entries: Vec<_> = fs::read_dir(dir.path().join("docs/reference"))
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(entries, ["methods.md"]);

    let page = read(dir.path(), "docs/reference/methods.md");
    assert!(page.starts_with("# Functions {#mylibfunctions}\n\n## Strings {#mylibstrings}\n"));
    assert!(page.contains("[--file] [src/lib/strings.nix] [--prefix] [mylib] [--export] [foo,bar,baz]"));
    assert!(page.contains("## lists {#myliblists}"));
    assert_eq!(page.matches("[--prefix] [mylib]").count(), 2);
}

fn options_manifest(file: Option<&str>) -> Value {
    let mut options = json!({ "title": "Module options", "anchorPrefix": "opt-" });
    if let Some(file) = file {
        options["file"] = json!(file);
    }
    json!({ "options": options })
}

fn mode(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).unwrap().permissions().mode() & 0o777
}

#[test]
fn options_only_writes_exactly_options_md() {
    let dir = project(&[], options_manifest(Some("options.json")), "extractor.sh");
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::copy(fixture_path("options.json"), dir.path().join("src/options.json")).unwrap();

    cmd()
        .current_dir(dir.path())
        .arg("generate")
        .assert()
        .success()
        .stdout(predicate::str::contains("docs/reference/options.md"));

    let entries: Vec<_> = fs::read_dir(dir.path().join("docs/reference"))
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(entries, ["options.md"]);
    assert_eq!(
        read(dir.path(), "docs/reference/options.md"),
        "extracted: [options] [--file] [src/options.json] [--title] [Module options] [--anchor-prefix] [opt-]\n"
    );
}

#[test]
fn options_json_flag_replaces_manifest_file() {
    let dir = project(&[], options_manifest(None), "extractor.sh");
    let json = fixture_path("options.json");

    cmd()
        .current_dir(dir.path())
        .args(["generate", "--options-json", &json])
        .assert()
        .success();

    let page = read(dir.path(), "docs/reference/options.md");
    assert!(page.starts_with(&format!("extracted: [options] [--file] [{}] ", json)));
}

#[test]
fn missing_options_file_aborts_without_writing() {
    let dir = project(&[], options_manifest(Some("options.json")), "extractor.sh");

    cmd()
        .current_dir(dir.path())
        .arg("generate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("source file not found"))
        .stderr(predicate::str::contains("src/options.json"));

    assert!(!dir.path().join("docs").exists());
}

#[test]
fn missing_options_json_flag_target_aborts_without_writing() {
    let dir = project(&[], options_manifest(None), "extractor.sh");

    cmd()
        .current_dir(dir.path())
        .args(["generate", "--options-json", "build/options.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("source file not found"))
        .stderr(predicate::str::contains("build/options.json"));

    assert!(!dir.path().join("docs").exists());
}

#[test]
fn regenerating_keeps_page_mode() {
    use std::os::unix::fs::PermissionsExt;
    let dir = project(&["lib/strings.nix", "lib/lists.nix"], methods_manifest(), "extractor.sh");
    let page = dir.path().join("docs/reference/methods.md");
    fs::create_dir_all(page.parent().unwrap()).unwrap();
    fs::write(&page, "stale\n").unwrap();
    fs::set_permissions(&page, fs::Permissions::from_mode(0o644)).unwrap();

    cmd().current_dir(dir.path()).arg("generate").assert().success();

    assert!(read(dir.path(), "docs/reference/methods.md").starts_with("# Functions"));
    assert_eq!(mode(&page), 0o644);
}

#[test]
fn fallback_is_written_verbatim_for_missing_file() {
    let manifest = json!({
        "files": {
            "title": "Files",
            "sections": [{
                "name": "Core",
                "entries": [{ "path": "lib/gone.nix", "fallback": "Written by *hand*." }]
            }]
        }
    });
    let dir = project(&[], manifest, "failing-extractor.sh");

    cmd().current_dir(dir.path()).arg("generate").assert().success();

    assert_eq!(
        read(dir.path(), "docs/reference/files.md"),
        "# Files\n\n## Core\n\n### `lib/gone.nix`\n\nWritten by *hand*.\n"
    );
}

#[test]
fn when_missing_policy_falls_back_on_empty_extraction() {
    let manifest = json!({
        "files": {
            "title": "Files",
            "sections": [{
                "name": "Core",
                "entries": [{ "path": "a.nix", "fallback": "No comment yet." }, "b.nix"]
            }]
        }
    });
    let dir = project(&["a.nix", "b.nix"], manifest, "silent-extractor.sh");

    cmd()
        .current_dir(dir.path())
        .args(["generate", "--fallback-policy", "when-missing"])
        .assert()
        .success();

    assert_eq!(
        read(dir.path(), "docs/reference/files.md"),
        "# Files\n\n## Core\n\n### `a.nix`\n\nNo comment yet.\n\n### `b.nix`\n"
    );
}

#[test]
fn sections_keep_manifest_order() {
    let manifest = json!({
        "files": {
            "title": "Files",
            "titleLevel": 3,
            "sections": [
                { "name": "Core", "entries": [] },
                { "name": "Utils", "entries": [] },
                { "name": "Extras", "entries": [] }
            ]
        }
    });
    let dir = project(&[], manifest, "extractor.sh");

    cmd().current_dir(dir.path()).arg("generate").assert().success();

    assert_eq!(
        read(dir.path(), "docs/reference/files.md"),
        "### Files\n\n#### Core\n\n#### Utils\n\n#### Extras\n"
    );
}

#[test]
fn empty_reference_dir_writes_under_site_root() {
    let dir = project(&["lib/strings.nix", "lib/lists.nix"], methods_manifest(), "extractor.sh");

    cmd()
        .current_dir(dir.path())
        .args(["generate", "--reference-dir", ""])
        .assert()
        .success();

    assert!(dir.path().join("docs/methods.md").is_file());
    assert!(!dir.path().join("docs/reference").exists());
}

#[test]
fn toml_manifest_is_accepted() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("lib")).unwrap();
    fs::write(dir.path().join("lib/a.nix"), "{ }\n").unwrap();
    let manifest = format!(
        r#"
referenceDir = "api"

[tools]
extractor = ["sh", "{}"]
formatter = ["sh", "{}"]

[methods]
title = "Functions"

[[methods.sections]]
path = "lib/a.nix"
heading = "A"
"#,
        fixture_path("extractor.sh"),
        fixture_path("formatter.sh")
    );
    fs::write(dir.path().join("refgen.toml"), manifest).unwrap();

    cmd()
        .current_dir(dir.path())
        .args(["generate", "--manifest", "refgen.toml"])
        .assert()
        .success();

    let page = read(dir.path(), "docs/api/methods.md");
    assert!(page.starts_with("# Functions\n\n## A\n\nextracted:"));
    assert!(page.contains("[--file] [lib/a.nix]"));
}

#[test]
fn regenerating_is_byte_identical() {
    let dir = project(&["lib/strings.nix", "lib/lists.nix"], methods_manifest(), "extractor.sh");

    cmd().current_dir(dir.path()).arg("generate").assert().success();
    let first = fs::read(dir.path().join("docs/reference/methods.md")).unwrap();
    cmd().current_dir(dir.path()).arg("generate").assert().success();
    let second = fs::read(dir.path().join("docs/reference/methods.md")).unwrap();
    assert_eq!(first, second);
}

// -- failures --

#[test]
fn schema_error_names_field_and_writes_nothing() {
    let manifest = json!({
        "files": {
            "title": "Files",
            "titleLevel": 9,
            "sections": []
        }
    });
    let dir = project(&[], manifest, "extractor.sh");

    cmd()
        .current_dir(dir.path())
        .arg("generate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("files.titleLevel"))
        .stderr(predicate::str::contains("between 1 and 6"));

    assert!(!dir.path().join("docs").exists());
}

#[test]
fn bad_entry_reports_its_index() {
    let manifest = json!({
        "files": {
            "title": "Files",
            "sections": [{ "name": "Core", "entries": ["a.nix", 7] }]
        }
    });
    let dir = project(&[], manifest, "extractor.sh");

    cmd()
        .current_dir(dir.path())
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("files.sections[0].entries[1]"));
}

#[test]
fn missing_source_aborts_without_writing() {
    let manifest = json!({
        "files": { "title": "Files", "sections": [] },
        "methods": { "title": "Functions", "sections": [{ "path": "lib/absent.nix" }] }
    });
    let dir = project(&[], manifest, "extractor.sh");

    cmd()
        .current_dir(dir.path())
        .arg("generate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("source file not found"))
        .stderr(predicate::str::contains("absent.nix"));

    assert!(!dir.path().join("docs").exists());
}

#[test]
fn extractor_failure_carries_tool_stderr() {
    let manifest = json!({
        "files": { "title": "Files", "sections": [{ "name": "Core", "entries": ["a.nix"] }] }
    });
    let dir = project(&["a.nix"], manifest, "failing-extractor.sh");

    cmd()
        .current_dir(dir.path())
        .arg("generate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("extraction failed for entry 0"))
        .stderr(predicate::str::contains("cannot parse input"));
}

#[test]
fn missing_manifest_fails() {
    let dir = TempDir::new().unwrap();
    cmd()
        .current_dir(dir.path())
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("refgen.json"));
}

#[test]
fn unknown_fallback_policy_is_rejected() {
    cmd()
        .args(["check", "--fallback-policy", "sometimes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown fallback policy"));
}

// -- build --

#[test]
fn build_runs_site_builder_after_generating() {
    let dir = project(&["lib/strings.nix", "lib/lists.nix"], methods_manifest(), "extractor.sh");

    cmd().current_dir(dir.path()).arg("build").assert().success();

    assert!(dir.path().join("docs/reference/methods.md").is_file());
    assert!(dir.path().join("site-built").is_file());
}

// -- check --

#[test]
fn check_lists_planned_outputs() {
    let dir = project(&["lib/strings.nix", "lib/lists.nix"], methods_manifest(), "extractor.sh");

    cmd()
        .current_dir(dir.path())
        .arg("check")
        .assert()
        .success()
        .stdout("methods\tdocs/reference/methods.md\t2 tool invocations\n");
}

#[test]
fn check_json_prints_the_plan() {
    let dir = project(&["lib/strings.nix", "lib/lists.nix"], methods_manifest(), "extractor.sh");

    let assert = cmd()
        .current_dir(dir.path())
        .args(["check", "--json"])
        .assert()
        .success();
    let plan: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(plan["outputs"][0]["kind"], "methods");
    assert_eq!(plan["outputs"][0]["document"]["blocks"][0]["kind"], "text");
    assert_eq!(plan["outputs"][0]["document"]["blocks"][2]["kind"], "capture");
}

// -- script --

#[test]
fn script_quotes_prefix_in_every_invocation() {
    let dir = project(&["lib/strings.nix", "lib/lists.nix"], methods_manifest(), "extractor.sh");

    cmd()
        .current_dir(dir.path())
        .arg("script")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("#!/usr/bin/env bash\n"))
        .stdout(predicate::str::contains("--prefix \"mylib\"").count(2))
        .stdout(predicate::str::contains("--export \"foo,bar,baz\""));

    assert!(!dir.path().join("docs").exists());
}

#[test]
fn script_output_matches_generate() {
    let manifest = json!({
        "files": {
            "title": "Files",
            "anchorPrefix": "f-",
            "sections": [{
                "name": "Core",
                "entries": ["a.nix", { "path": "b.nix", "fallback": "Costs $5 and `ticks`." }]
            }]
        },
        "methods": {
            "title": "Functions",
            "sections": [{ "path": "lib/strings.nix", "exports": ["x"] }]
        }
    });
    let dir = project(&["a.nix", "lib/strings.nix"], manifest, "extractor.sh");

    cmd().current_dir(dir.path()).arg("generate").assert().success();
    let files = read(dir.path(), "docs/reference/files.md");
    let methods = read(dir.path(), "docs/reference/methods.md");
    let modes = (
        mode(&dir.path().join("docs/reference/files.md")),
        mode(&dir.path().join("docs/reference/methods.md")),
    );
    fs::remove_dir_all(dir.path().join("docs")).unwrap();

    cmd()
        .current_dir(dir.path())
        .args(["script", "-o", "build.sh"])
        .assert()
        .success();
    let status = Command::new("bash")
        .arg("build.sh")
        .current_dir(dir.path())
        .status()
        .unwrap();
    assert!(status.success());

    assert_eq!(read(dir.path(), "docs/reference/files.md"), files);
    assert_eq!(read(dir.path(), "docs/reference/methods.md"), methods);
    assert_eq!(
        (
            mode(&dir.path().join("docs/reference/files.md")),
            mode(&dir.path().join("docs/reference/methods.md")),
        ),
        modes
    );
}
