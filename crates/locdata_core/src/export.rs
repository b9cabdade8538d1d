//! Flat tabular view of a document for spreadsheet export.
//!
//! One row per text line, with entry and variant columns repeated on every
//! row. Entries without variants and variants without lines still produce one
//! row with the missing columns left empty. Writing the spreadsheet file itself
//! is left to the caller.

use crate::model::document::Document;
use crate::model::entry::Entry;
use crate::model::language::Language;

/// Column headers in output order.
pub const EXPORT_COLUMNS: [&str; 6] = ["ID", "Speaker", "GUID", "Name", "Text", "Language"];

/// One exported row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    /// Position of the entry in the document.
    pub entry_index: usize,
    pub speaker: String,
    pub guid: String,
    pub name: Option<String>,
    pub text: Option<String>,
    pub language: Option<Language>,
}

/// Flattens the document into rows in document order.
pub fn flatten(doc: &Document) -> Vec<ExportRow> {
    let mut rows = Vec::new();
    for (entry_index, entry_key) in doc.entry_keys().iter().enumerate() {
        let Some(entry) = doc.entry(*entry_key) else {
            continue;
        };
        let variants: Vec<_> = entry
            .variants()
            .iter()
            .filter_map(|key| doc.variant(*key))
            .collect();
        if variants.is_empty() {
            rows.push(leaf_row(entry_index, entry, None, None, None));
            continue;
        }

        for variant in variants {
            let lines: Vec<_> = variant
                .text_lines()
                .iter()
                .filter_map(|key| doc.text_line(*key))
                .collect();
            if lines.is_empty() {
                rows.push(leaf_row(entry_index, entry, Some(variant.name()), None, None));
                continue;
            }
            for line in lines {
                rows.push(leaf_row(
                    entry_index,
                    entry,
                    Some(variant.name()),
                    Some(line.text()),
                    line.language(),
                ));
            }
        }
    }
    rows
}

fn leaf_row(
    entry_index: usize,
    entry: &Entry,
    name: Option<&str>,
    text: Option<&str>,
    language: Option<Language>,
) -> ExportRow {
    ExportRow {
        entry_index,
        speaker: entry.speaker().to_string(),
        guid: entry.id().to_string(),
        name: name.map(str::to_string),
        text: text.map(str::to_string),
        language,
    }
}

/// Renders rows as tab-separated text with a header line.
///
/// Tabs and line breaks inside cells are replaced by spaces.
pub fn to_tsv(rows: &[ExportRow]) -> String {
    let mut out = EXPORT_COLUMNS.join("\t");
    out.push('\n');
    for row in rows {
        let cells = [
            row.entry_index.to_string(),
            sanitize_cell(&row.speaker),
            sanitize_cell(&row.guid),
            sanitize_cell(row.name.as_deref().unwrap_or_default()),
            sanitize_cell(row.text.as_deref().unwrap_or_default()),
            row.language
                .map(|language| language.as_code().to_string())
                .unwrap_or_default(),
        ];
        out.push_str(&cells.join("\t"));
        out.push('\n');
    }
    out
}

fn sanitize_cell(value: &str) -> String {
    value.replace(['\t', '\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::{flatten, to_tsv};
    use crate::model::document::Document;
    use crate::model::entry::{Entry, TextLine, Variant};
    use crate::model::language::Language;

    #[test]
    fn rows_repeat_parents_and_cover_empty_branches() {
        let mut doc = Document::new();
        let bob = doc.push_entry(Entry::with_id("Bob", "A"));
        let greet = doc.push_variant(bob, Variant::new("greet")).unwrap();
        doc.push_text_line(greet, TextLine::new("Hello", Some(Language::EnglishUs)))
            .unwrap();
        doc.push_text_line(greet, TextLine::new("Bonjour", Some(Language::French)))
            .unwrap();
        doc.push_variant(bob, Variant::new("empty")).unwrap();
        doc.push_entry(Entry::with_id("Ann", "B"));

        let rows = flatten(&doc);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1].speaker, "Bob");
        assert_eq!(rows[1].text.as_deref(), Some("Bonjour"));
        assert_eq!(rows[2].name.as_deref(), Some("empty"));
        assert_eq!(rows[2].text, None);
        assert_eq!(rows[3].entry_index, 1);
        assert_eq!(rows[3].name, None);
    }

    #[test]
    fn tsv_has_header_and_escapes_cells() {
        let mut doc = Document::new();
        let entry = doc.push_entry(Entry::with_id("Bob", "A"));
        let variant = doc.push_variant(entry, Variant::new("v")).unwrap();
        doc.push_text_line(variant, TextLine::new("two\tcells\nhere", Some(Language::Japanese)))
            .unwrap();

        let tsv = to_tsv(&flatten(&doc));
        let lines: Vec<&str> = tsv.lines().collect();
        assert_eq!(lines[0], "ID\tSpeaker\tGUID\tName\tText\tLanguage");
        assert_eq!(lines[1], "0\tBob\tA\tv\ttwo cells here\tjp_jp");
    }
}
