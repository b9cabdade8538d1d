//! Entry filtering for list views.

use crate::model::document::Document;
use crate::model::entry::{Entry, EntryKey};

/// Case-insensitive substring filters. Blank filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    pub speaker: String,
    pub id: String,
    /// Matches entries having at least one variant with this name fragment.
    pub variant_name: String,
    /// Matches entries having at least one line containing this fragment.
    pub text: String,
}

impl EntryFilter {
    pub fn is_empty(&self) -> bool {
        [&self.speaker, &self.id, &self.variant_name, &self.text]
            .iter()
            .all(|value| value.trim().is_empty())
    }

    /// Returns whether the entry passes every non-blank filter.
    pub fn matches(&self, doc: &Document, entry: &Entry) -> bool {
        if !contains_ignore_case(entry.speaker(), &self.speaker)
            || !contains_ignore_case(entry.id(), &self.id)
        {
            return false;
        }

        let variants = || entry.variants().iter().filter_map(|key| doc.variant(*key));
        if !self.variant_name.trim().is_empty()
            && !variants().any(|variant| contains_ignore_case(variant.name(), &self.variant_name))
        {
            return false;
        }
        if !self.text.trim().is_empty()
            && !variants().any(|variant| {
                variant
                    .text_lines()
                    .iter()
                    .filter_map(|key| doc.text_line(*key))
                    .any(|line| contains_ignore_case(line.text(), &self.text))
            })
        {
            return false;
        }
        true
    }
}

/// Entries passing `filter`, in document order.
pub fn filter_entries(doc: &Document, filter: &EntryFilter) -> Vec<EntryKey> {
    doc.entry_keys()
        .iter()
        .copied()
        .filter(|key| {
            doc.entry(*key)
                .is_some_and(|entry| filter.matches(doc, entry))
        })
        .collect()
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}
