use locdata_core::export::{flatten, to_tsv};
use locdata_core::repo::document_repo::{from_json_str, to_records};
use locdata_core::{
    Document, DocumentRepository, Entry, JsonFileDocumentRepository, Language, RepoError,
    TextLine, Variant,
};
use std::fs;

const DATASET: &str = r#"[
  {
    "Speaker": "Narrator",
    "GUID": "3F2504E0-4F89-11D3-9A0C-0305E82C3301",
    "Variants": {
      "intro": [
        {"Text": "Once upon a time", "Language": "en_us"},
        {"Text": "Il était une fois", "Language": "fr_fr"}
      ],
      "outro": []
    }
  },
  {
    "Speaker": "Guard",
    "GUID": "not-a-guid",
    "Variants": {}
  }
]"#;

fn sample_document() -> Document {
    let mut doc = Document::new();
    let entry = doc.push_entry(Entry::with_id("Bob", "3F2504E0-4F89-11D3-9A0C-0305E82C3301"));
    let variant = doc
        .push_variant(entry, Variant::new("greet"))
        .expect("push variant");
    doc.push_text_line(variant, TextLine::new("Hello", Some(Language::EnglishUs)))
        .expect("push line");
    doc.push_text_line(variant, TextLine::new("こんにちは", Some(Language::Japanese)))
        .expect("push line");
    doc.push_text_line(variant, TextLine::new("???", None))
        .expect("push line");
    doc
}

#[test]
fn save_then_load_preserves_visible_content() {
    let dir = tempfile::tempdir().expect("temp dir");
    let repo = JsonFileDocumentRepository::new(dir.path().join("dataset.json"));
    let doc = sample_document();

    repo.save(&doc).expect("save");
    let loaded = repo.load().expect("load");

    assert_eq!(to_records(&loaded), to_records(&doc));
}

#[test]
fn load_reads_dataset_shape() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("dataset.json");
    fs::write(&path, DATASET).expect("write dataset");

    let doc = JsonFileDocumentRepository::new(&path)
        .load()
        .expect("load");
    assert_eq!(doc.len(), 2);

    let narrator = doc.entry(doc.entry_keys()[0]).expect("narrator");
    assert_eq!(narrator.variants().len(), 2);
    let intro = doc.variant(narrator.variants()[0]).expect("intro");
    assert_eq!(intro.name(), "intro");
    let french = doc.text_line(intro.text_lines()[1]).expect("french line");
    assert_eq!(french.text(), "Il était une fois");
    assert_eq!(french.language(), Some(Language::French));
}

#[test]
fn saved_file_uses_dataset_field_names() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("out.json");
    JsonFileDocumentRepository::new(&path)
        .save(&sample_document())
        .expect("save");

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).expect("read back")).expect("json");
    let entry = &value[0];
    assert_eq!(entry["Speaker"], "Bob");
    assert_eq!(entry["GUID"], "3F2504E0-4F89-11D3-9A0C-0305E82C3301");
    assert_eq!(entry["Variants"]["greet"][1]["Language"], "jp_jp");
    assert_eq!(entry["Variants"]["greet"][2]["Language"], serde_json::Value::Null);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = JsonFileDocumentRepository::new(dir.path().join("absent.json"))
        .load()
        .expect_err("missing file");
    assert!(matches!(err, RepoError::Io { .. }));
}

#[test]
fn malformed_file_loads_nothing() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("broken.json");
    fs::write(&path, r#"[{"Speaker": "Bob", "GUID": "x", "Variants": {"v": [{"Text": 3}]}}]"#)
        .expect("write");

    let err = JsonFileDocumentRepository::new(&path)
        .load()
        .expect_err("malformed");
    assert!(matches!(err, RepoError::Parse(_)));
}

#[test]
fn null_variants_load_as_empty_entry() {
    let doc = from_json_str(
        r#"[{"Speaker": "Bob", "GUID": "3F2504E0-4F89-11D3-9A0C-0305E82C3301", "Variants": null}]"#,
    )
    .expect("null variants load");

    assert_eq!(doc.len(), 1);
    let entry = doc.entry(doc.entry_keys()[0]).expect("entry");
    assert_eq!(entry.speaker(), "Bob");
    assert!(entry.variants().is_empty());
}

#[test]
fn null_strings_load_as_empty() {
    let doc = from_json_str(
        r#"[{"Speaker": null, "GUID": null, "Variants": {"v": [{"Text": null, "Language": "en_us"}]}}]"#,
    )
    .expect("null strings load");

    let entry = doc.entry(doc.entry_keys()[0]).expect("entry");
    assert_eq!(entry.speaker(), "");
    assert_eq!(entry.id(), "");
    let line = doc.text_line(doc.text_line_keys()[0]).expect("line");
    assert_eq!(line.text(), "");
    assert_eq!(line.language(), Some(Language::EnglishUs));
}

#[test]
fn export_flattens_loaded_dataset() {
    let doc = from_json_str(DATASET).expect("parse");
    let rows = flatten(&doc);

    assert_eq!(rows.len(), 4);
    assert_eq!(rows[2].name.as_deref(), Some("outro"));
    assert_eq!(rows[2].text, None);
    assert_eq!(rows[3].speaker, "Guard");
    assert_eq!(rows[3].name, None);

    let tsv = to_tsv(&rows);
    assert_eq!(tsv.lines().count(), 5);
    assert!(tsv.contains(
        "0\tNarrator\t3F2504E0-4F89-11D3-9A0C-0305E82C3301\tintro\tOnce upon a time\ten_us"
    ));
}
