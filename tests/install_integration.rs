//! End-to-end installs against a temporary theme project.

use arc_installer::archive::ArchiveError;
use arc_installer::fieldgroup::Placement;
use arc_installer::installer::{InstallError, InstallOutcome, Installer};
use arc_installer::patch::{PatchError, PatchResult};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

const LAYOUT_GROUP: &str = "acf-json/group_572229fc5045c.json";
const COMPONENT_GROUP: &str = "acf-json/group_5c903f684a8ae.json";

/// Field-group document with one layout per `(name, label)`.
fn field_group(entries: &[(&str, &str)]) -> String {
    let mut out = String::from(
        r#"{
    "key": "group_572229fc5045c",
    "title": "Page Content",
    "fields": [
        {
            "key": "field_572229fc5045d",
            "label": "Blocks",
            "name": "blocks",
            "type": "flexible_content",
            "layouts": {
"#,
    );

    for (index, (name, label)) in entries.iter().enumerate() {
        let closing = if index + 1 == entries.len() { "}" } else { "}," };
        out.push_str(&format!(
            r#"                "layout_{index}": {{
                    "key": "layout_{index}",
                    "name": "{name}",
                    "label": "{label}",
                    "display": "block",
                    "sub_fields": [],
                    "min": "",
                    "max": ""
                {closing}
"#
        ));
    }

    out.push_str(
        r#"            },
            "button_label": "Add Block"
        }
    ],
    "active": true,
    "modified": 1690000000
}
"#,
    );
    out
}

/// A theme project with a stylesheet, a template and both field groups.
fn setup_theme() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    fs::create_dir_all(root.join("src/scss")).unwrap();
    fs::create_dir_all(root.join("acf-json")).unwrap();
    fs::write(
        root.join("src/scss/style.scss"),
        "@import 'base';\n@import 'layout';\n/* END */\n",
    )
    .unwrap();
    fs::write(
        root.join(LAYOUT_GROUP),
        field_group(&[
            ("alpha", "Alpha"),
            ("gamma", "Gamma"),
            ("page_content", "Page Content (Layouts Only)"),
        ]),
    )
    .unwrap();
    fs::write(root.join(COMPONENT_GROUP), field_group(&[("widget", "Widget")])).unwrap();

    dir
}

fn write_archive(path: &Path, manifest: &str, files: &[(&str, &str)]) {
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    zip.start_file("manifest.json", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(manifest.as_bytes()).unwrap();
    for (name, content) in files {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

fn beta_archive(root: &Path) -> PathBuf {
    let path = root.join("beta.zip");
    write_archive(
        &path,
        r#"{
    "key": "beta",
    "name": "Beta",
    "acfgroup": "group_beta0000000",
    "modifications": {
        "src/scss/style.scss": [
            "@import 'blocks/beta';",
            {"target": "/* END */", "code": "@import 'blocks/beta-extra';", "mode": "prepend"}
        ],
        "functions.php": "require 'blocks/beta.php';"
    }
}"#,
        &[
            ("blocks/beta/beta.php", "<?php // beta"),
            ("src/scss/blocks/_beta.scss", ".beta {}"),
        ],
    );
    path
}

fn layout_labels(path: &Path) -> Vec<String> {
    let parsed: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    parsed["fields"][0]["layouts"]
        .as_object()
        .unwrap()
        .values()
        .map(|entry| entry["label"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_install_archive_end_to_end() {
    let theme = setup_theme();
    let root = theme.path();
    let archive = beta_archive(root);

    let installer = Installer::open(root).unwrap();
    let outcome = installer.install_archive(&archive).unwrap();

    let report = match outcome {
        InstallOutcome::Installed(report) => report,
        other => panic!("expected install, got {other:?}"),
    };
    assert_eq!(report.name, "Beta");
    assert!(matches!(
        report.placement,
        Ok(Placement::Sorted { ref before, .. }) if before == "Gamma"
    ));

    // Layout spliced in label order, terminal entry still last
    let group = root.join(LAYOUT_GROUP);
    assert_eq!(
        layout_labels(&group),
        vec!["Alpha", "Beta", "Gamma", "Page Content (Layouts Only)"]
    );
    let content = fs::read_to_string(&group).unwrap();
    assert!(!content.contains("1690000000"));
    assert!(content.contains("\"group_beta0000000\""));

    // Component group untouched
    assert_eq!(
        fs::read_to_string(root.join(COMPONENT_GROUP)).unwrap(),
        field_group(&[("widget", "Widget")])
    );

    // Files extracted, manifest not
    assert!(root.join("blocks/beta/beta.php").is_file());
    assert!(root.join("src/scss/blocks/_beta.scss").is_file());
    assert!(!root.join("manifest.json").exists());

    // Stylesheet patched in directive order
    assert_eq!(
        fs::read_to_string(root.join("src/scss/style.scss")).unwrap(),
        "@import 'base';\n@import 'layout';\n@import 'blocks/beta-extra';\n/* END */\n@import 'blocks/beta';\n"
    );

    // Missing destination reported but not fatal
    assert_eq!(report.modifications.len(), 2);
    assert_eq!(report.modifications[0].0, "src/scss/style.scss");
    assert!(matches!(
        report.modifications[0].1,
        Ok(PatchResult::Applied { .. })
    ));
    assert_eq!(report.modifications[1].0, "functions.php");
    assert!(matches!(
        report.modifications[1].1,
        Err(PatchError::Unavailable { .. })
    ));

    // Archive cleaned up
    assert!(!archive.exists());
}

#[test]
fn test_reinstall_is_detected() {
    let theme = setup_theme();
    let root = theme.path();
    let installer = Installer::open(root).unwrap();

    let first = installer.install_archive(&beta_archive(root)).unwrap();
    assert!(matches!(first, InstallOutcome::Installed(_)));
    let group_after_first = fs::read_to_string(root.join(LAYOUT_GROUP)).unwrap();
    let style_after_first = fs::read_to_string(root.join("src/scss/style.scss")).unwrap();

    let archive = beta_archive(root);
    let second = installer.install_archive(&archive).unwrap();
    assert!(matches!(
        second,
        InstallOutcome::AlreadyInstalled { ref name } if name == "Beta"
    ));

    assert_eq!(
        fs::read_to_string(root.join(LAYOUT_GROUP)).unwrap(),
        group_after_first
    );
    assert_eq!(
        fs::read_to_string(root.join("src/scss/style.scss")).unwrap(),
        style_after_first
    );
    assert!(!archive.exists());
}

#[test]
fn test_component_goes_before_widget() {
    let theme = setup_theme();
    let root = theme.path();
    let archive = root.join("card.zip");
    write_archive(
        &archive,
        r#"{"key": "card", "name": "Zebra Card", "acfgroup": "group_card", "contents": "component"}"#,
        &[],
    );

    let installer = Installer::open(root).unwrap();
    let outcome = installer.install_archive(&archive).unwrap();
    assert!(matches!(outcome, InstallOutcome::Installed(_)));

    assert_eq!(
        layout_labels(&root.join(COMPONENT_GROUP)),
        vec!["Zebra Card", "Widget"]
    );
    assert_eq!(
        layout_labels(&root.join(LAYOUT_GROUP)),
        vec!["Alpha", "Gamma", "Page Content (Layouts Only)"]
    );
}

#[test]
fn test_invalid_manifest_aborts_archive() {
    let theme = setup_theme();
    let root = theme.path();
    let archive = root.join("broken.zip");
    write_archive(
        &archive,
        r#"{"key": "", "name": "Broken"}"#,
        &[("blocks/broken.php", "<?php")],
    );
    let group_before = fs::read_to_string(root.join(LAYOUT_GROUP)).unwrap();

    let installer = Installer::open(root).unwrap();
    let result = installer.install_archive(&archive);

    assert!(matches!(
        result,
        Err(InstallError::Archive(ArchiveError::Manifest(_)))
    ));
    assert!(!root.join("blocks/broken.php").exists());
    assert_eq!(
        fs::read_to_string(root.join(LAYOUT_GROUP)).unwrap(),
        group_before
    );
}

#[test]
fn test_pending_archives_installed_in_order() {
    let theme = setup_theme();
    let root = theme.path();
    write_archive(
        &root.join("b-delta.zip"),
        r#"{"key": "delta", "name": "Delta", "acfgroup": "group_delta"}"#,
        &[],
    );
    write_archive(
        &root.join("a-beta.zip"),
        r#"{"key": "beta", "name": "Beta", "acfgroup": "group_beta"}"#,
        &[],
    );

    let installer = Installer::open(root).unwrap();
    let archives = installer.pending_archives().unwrap();
    assert_eq!(archives.len(), 2);

    for archive in &archives {
        let outcome = installer.install_archive(archive).unwrap();
        assert!(matches!(outcome, InstallOutcome::Installed(_)));
    }

    assert_eq!(
        layout_labels(&root.join(LAYOUT_GROUP)),
        vec![
            "Alpha",
            "Beta",
            "Delta",
            "Gamma",
            "Page Content (Layouts Only)"
        ]
    );
    assert!(installer.pending_archives().unwrap().is_empty());
}

#[test]
fn test_modification_cannot_escape_project() {
    let theme = setup_theme();
    let outside = TempDir::new().unwrap();
    fs::write(outside.path().join("victim.txt"), "untouched\n").unwrap();

    let root = theme.path();
    let archive = root.join("evil.zip");
    let escape = format!(
        "../{}/victim.txt",
        outside.path().file_name().unwrap().to_string_lossy()
    );
    write_archive(
        &archive,
        &format!(
            r#"{{"key": "evil", "name": "Evil", "acfgroup": "group_evil", "modifications": {{"{escape}": "pwned"}}}}"#
        ),
        &[],
    );

    let installer = Installer::open(root).unwrap();
    let report = match installer.install_archive(&archive).unwrap() {
        InstallOutcome::Installed(report) => report,
        other => panic!("expected install, got {other:?}"),
    };

    assert!(report.modifications[0].1.is_err());
    assert_eq!(
        fs::read_to_string(outside.path().join("victim.txt")).unwrap(),
        "untouched\n"
    );
}
