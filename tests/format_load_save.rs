//! Loading and saving through a file format
//!
//! Uses the recipe schemas under `tests/fixtures`: version 1.0 only accepts
//! ingredient amounts in grams, version 2.0 also accepts millilitres.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use treefile::{codec, DiagnosticCode, Document, FileFormat, FormatError, Schema};

fn fixtures_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn schema(name: &str) -> Schema {
    let text = std::fs::read_to_string(fixtures_path().join(name)).unwrap();
    Schema::parse_text(&text).unwrap()
}

fn recipe_format() -> FileFormat {
    FileFormat::new("recipe", vec![schema("recipe_v1.schema"), schema("recipe_v2.schema")]).unwrap()
}

fn violations(err: FormatError) -> treefile::Diagnostics {
    match err {
        FormatError::Violation { diagnostics, .. } => diagnostics,
        other => panic!("Expected a violation, got {}", other),
    }
}

#[test]
fn test_load_valid_fixture() {
    let document = recipe_format().load(fixtures_path().join("pancakes.rcp")).unwrap();

    assert_eq!(
        document.to_text(),
        "recipe:pancakes\n  flour:200g\n  sugar:30g\nsteps:(mix everything\nfry in batches)"
    );
    assert_eq!(document.tree[document.root].line, Some(7));
}

#[test]
fn test_load_reports_offending_line() {
    let err = recipe_format().load(fixtures_path().join("broken.rcp")).unwrap_err();
    let diagnostics = violations(err);

    let item = diagnostics
        .all()
        .iter()
        .find(|d| d.code == DiagnosticCode::NoMatchingFormat)
        .unwrap();
    assert!(item.subject.contains("'milk' (line 9)"));
    assert!(item.context.iter().any(|c| c.starts_with("ingredient:")));
}

#[test]
fn test_latest_schema_is_highest_number() {
    let format = recipe_format();
    assert_eq!(format.latest_schema().unwrap().version_string(), "2.0");
    assert!(format.schema("1.0").is_some());
    assert!(format.schema("3.0").is_none());
}

#[test]
fn test_save_picks_requested_version() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("latte.rcp");
    let format = recipe_format();

    let (tree, root) = codec::parse_str("recipe:latte\n  coffee:18g\n  milk:200ml\nsteps:steam").unwrap();
    let document = Document::new(tree, root);

    let diagnostics = violations(format.save(&path, &document, "1.0").unwrap_err());
    assert!(diagnostics.has(DiagnosticCode::NoMatchingFormat));
    assert!(!path.exists());

    format.save(&path, &document, "2.0").unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("    schemaVersionString:2.0\n    schemaVersionNum:2\n"));
    assert!(written.ends_with("steps:steam\n"));

    let loaded = format.load(&path).unwrap();
    assert_eq!(loaded.to_text(), document.to_text());
}

#[test]
fn test_loaded_document_can_be_saved_again() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("copy.RCP");
    let format = recipe_format();

    let document = format.load(fixtures_path().join("pancakes.rcp")).unwrap();
    format.save(&path, &document, "1.0").unwrap();

    let original = std::fs::read_to_string(fixtures_path().join("pancakes.rcp")).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
}

#[test]
fn test_wrong_extension_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("pancakes.txt");
    std::fs::copy(fixtures_path().join("pancakes.rcp"), &path).unwrap();

    let diagnostics = violations(recipe_format().load(&path).unwrap_err());
    assert!(diagnostics.has(DiagnosticCode::ExtensionMismatch));
    assert_eq!(diagnostics.len(), 1);
}

#[test]
fn test_header_must_name_this_format() {
    let format = FileFormat::new("cookbook", vec![schema("recipe_v1.schema")]).unwrap();
    let diagnostics = violations(format.load(fixtures_path().join("pancakes.rcp")).unwrap_err());
    assert!(diagnostics.has(DiagnosticCode::DataMismatch));
}

#[test]
fn test_unparseable_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bad.rcp");
    std::fs::write(&path, "fileHeader\n").unwrap();

    assert!(matches!(
        recipe_format().load(&path).unwrap_err(),
        FormatError::Parse(_)
    ));
}
