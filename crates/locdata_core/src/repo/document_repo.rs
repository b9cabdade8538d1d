//! Document persistence in the JSON dataset format.
//!
//! # Responsibility
//! - Map the document graph to and from its on-disk record shape.
//! - Load and save whole documents through a repository contract.
//!
//! # Invariants
//! - Loading is all-or-nothing: a malformed file yields an error and no
//!   partial document.
//! - Variant order and repeated variant names are preserved as written.
//! - Unknown or `null` language codes load as unset; they are never an error.
//! - Validity flags and cached translations are never persisted.
//!
//! ```text
//! [{"Speaker": "Bob", "GUID": "...", "Variants": {"greet": [{"Text": "Hi", "Language": "en_us"}]}}]
//! ```

use crate::model::document::{Document, DocumentError};
use crate::model::entry::{Entry, TextLine, Variant};
use crate::model::language::Language;
use log::{info, warn};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence errors.
#[derive(Debug)]
pub enum RepoError {
    Io { path: PathBuf, source: io::Error },
    Parse(serde_json::Error),
    Document(DocumentError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "io error at {}: {source}", path.display()),
            Self::Parse(err) => write!(f, "malformed document: {err}"),
            Self::Document(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Document(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl From<DocumentError> for RepoError {
    fn from(value: DocumentError) -> Self {
        Self::Document(value)
    }
}

/// Persisted text line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextLineRecord {
    #[serde(rename = "Text", default, deserialize_with = "null_as_empty")]
    pub text: String,
    #[serde(rename = "Language", default, with = "language_code")]
    pub language: Option<Language>,
}

/// Variants keyed by name, kept in file order including repeated names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VariantRecords(pub Vec<(String, Vec<TextLineRecord>)>);

/// Persisted entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    #[serde(rename = "Speaker", default, deserialize_with = "null_as_empty")]
    pub speaker: String,
    #[serde(rename = "GUID", default, deserialize_with = "null_as_empty")]
    pub id: String,
    #[serde(rename = "Variants", default)]
    pub variants: VariantRecords,
}

impl Serialize for VariantRecords {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, lines) in &self.0 {
            map.serialize_entry(name, lines)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for VariantRecords {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVariants;

        impl<'de> Visitor<'de> for OrderedVariants {
            type Value = VariantRecords;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "an object mapping variant names to text line arrays")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut variants = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, lines)) =
                    access.next_entry::<String, Vec<TextLineRecord>>()?
                {
                    variants.push((name, lines));
                }
                Ok(VariantRecords(variants))
            }

            fn visit_some<D: Deserializer<'de>>(
                self,
                deserializer: D,
            ) -> Result<Self::Value, D::Error> {
                deserializer.deserialize_map(self)
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(VariantRecords::default())
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(VariantRecords::default())
            }
        }

        deserializer.deserialize_option(OrderedVariants)
    }
}

/// Reads a string field, treating `null` as empty.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

mod language_code {
    use crate::model::language::Language;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Language>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(language) => serializer.serialize_str(language.as_code()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Language>, D::Error> {
        let code = Option::<String>::deserialize(deserializer)?;
        Ok(code.as_deref().and_then(Language::from_code))
    }
}

/// Converts the attached part of a document to records.
pub fn to_records(doc: &Document) -> Vec<EntryRecord> {
    doc.entry_keys()
        .iter()
        .filter_map(|key| doc.entry(*key))
        .map(|entry| EntryRecord {
            speaker: entry.speaker().to_string(),
            id: entry.id().to_string(),
            variants: VariantRecords(
                entry
                    .variants()
                    .iter()
                    .filter_map(|key| doc.variant(*key))
                    .map(|variant| {
                        let lines = variant
                            .text_lines()
                            .iter()
                            .filter_map(|key| doc.text_line(*key))
                            .map(|line| TextLineRecord {
                                text: line.text().to_string(),
                                language: line.language(),
                            })
                            .collect();
                        (variant.name().to_string(), lines)
                    })
                    .collect(),
            ),
        })
        .collect()
}

/// Builds a fresh document from records.
pub fn from_records(records: Vec<EntryRecord>) -> RepoResult<Document> {
    let mut doc = Document::new();
    for record in records {
        let entry = doc.push_entry(Entry::with_id(record.speaker, record.id));
        for (name, lines) in record.variants.0 {
            let variant = doc.push_variant(entry, Variant::new(name))?;
            for line in lines {
                doc.push_text_line(variant, TextLine::new(line.text, line.language))?;
            }
        }
    }
    Ok(doc)
}

/// Parses a whole document from JSON text.
pub fn from_json_str(json: &str) -> RepoResult<Document> {
    let records: Vec<EntryRecord> = serde_json::from_str(json)?;
    from_records(records)
}

/// Renders a document as pretty-printed JSON.
pub fn to_json_string(doc: &Document) -> RepoResult<String> {
    Ok(serde_json::to_string_pretty(&to_records(doc))?)
}

/// Whole-document persistence contract.
pub trait DocumentRepository {
    fn load(&self) -> RepoResult<Document>;
    fn save(&self, doc: &Document) -> RepoResult<()>;
}

/// Repository reading and writing one JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileDocumentRepository {
    path: PathBuf,
}

impl JsonFileDocumentRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> RepoError {
        RepoError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl DocumentRepository for JsonFileDocumentRepository {
    fn load(&self) -> RepoResult<Document> {
        let json = fs::read_to_string(&self.path).map_err(|err| self.io_error(err))?;
        match from_json_str(&json) {
            Ok(doc) => {
                info!(
                    "event=document_load module=repo status=ok path={} entries={}",
                    self.path.display(),
                    doc.len()
                );
                Ok(doc)
            }
            Err(err) => {
                warn!(
                    "event=document_load module=repo status=error path={} error={}",
                    self.path.display(),
                    err
                );
                Err(err)
            }
        }
    }

    fn save(&self, doc: &Document) -> RepoResult<()> {
        let json = to_json_string(doc)?;
        fs::write(&self.path, json).map_err(|err| self.io_error(err))?;
        info!(
            "event=document_save module=repo status=ok path={} entries={}",
            self.path.display(),
            doc.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{from_json_str, to_json_string, to_records, RepoError};
    use crate::model::language::Language;

    const SAMPLE: &str = r#"[
        {
            "Speaker": "Bob",
            "GUID": "9F2B3C4D5E6F47A8B9C0D1E2F3A4B5C6",
            "Variants": {
                "greet": [
                    {"Text": "Hello", "Language": "en_us"},
                    {"Text": "Bonjour", "Language": "fr_fr"}
                ],
                "bye": [{"Text": "Bye", "Language": "xx_yy"}],
                "greet": [{"Text": "Hi", "Language": null}]
            }
        }
    ]"#;

    #[test]
    fn load_preserves_variant_order_and_repeated_names() {
        let doc = from_json_str(SAMPLE).expect("sample parses");
        let records = to_records(&doc);
        let names: Vec<&str> = records[0]
            .variants
            .0
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(names, vec!["greet", "bye", "greet"]);
        assert_eq!(records[0].variants.0[0].1[1].language, Some(Language::French));
    }

    #[test]
    fn unknown_or_null_language_loads_as_unset() {
        let doc = from_json_str(SAMPLE).expect("sample parses");
        let records = to_records(&doc);
        assert_eq!(records[0].variants.0[1].1[0].language, None);
        assert_eq!(records[0].variants.0[2].1[0].language, None);
    }

    #[test]
    fn save_writes_codes_and_null_for_unset() {
        let doc = from_json_str(SAMPLE).expect("sample parses");
        let json = to_json_string(&doc).expect("serialize");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");

        assert_eq!(value[0]["GUID"], "9F2B3C4D5E6F47A8B9C0D1E2F3A4B5C6");
        assert_eq!(value[0]["Variants"]["bye"][0]["Language"], serde_json::Value::Null);
        assert!(!json.contains("Valid"));
    }

    #[test]
    fn malformed_input_is_rejected_whole() {
        let err = from_json_str(r#"[{"Speaker": "Bob", "Variants": {"v": "oops"}}]"#)
            .expect_err("must fail");
        assert!(matches!(err, RepoError::Parse(_)));
    }
}
