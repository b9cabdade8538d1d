//! Entry / variant / text-line records.
//!
//! # Responsibility
//! - Define the plain mutable records of the localization hierarchy.
//! - Keep field writes and validity bookkeeping in one place.
//!
//! # Invariants
//! - Every write to a validated field goes through a setter that calls
//!   `FieldStatus::mark_edited()` (optimistically valid, pending rescan).
//! - Writing `TextLine::text` resets the translation cache fields.
//! - Child sequences hold arena handles; the owning `Document` resolves them.

use crate::model::language::Language;
use uuid::Uuid;

/// Arena handle of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryKey(Uuid);

/// Arena handle of a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariantKey(Uuid);

/// Arena handle of a text line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextLineKey(Uuid);

macro_rules! impl_key {
    ($name:ident) => {
        impl $name {
            pub(crate) fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// Raw opaque value, useful for logging.
            pub fn as_uuid(self) -> Uuid {
                self.0
            }
        }
    };
}

impl_key!(EntryKey);
impl_key!(VariantKey);
impl_key!(TextLineKey);

/// Handle of any node in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKey {
    Entry(EntryKey),
    Variant(VariantKey),
    TextLine(TextLineKey),
}

impl NodeKey {
    /// Stable kind label used in log events.
    pub fn kind(self) -> &'static str {
        match self {
            Self::Entry(_) => "entry",
            Self::Variant(_) => "variant",
            Self::TextLine(_) => "text_line",
        }
    }
}

impl From<EntryKey> for NodeKey {
    fn from(value: EntryKey) -> Self {
        Self::Entry(value)
    }
}

impl From<VariantKey> for NodeKey {
    fn from(value: VariantKey) -> Self {
        Self::Variant(value)
    }
}

impl From<TextLineKey> for NodeKey {
    fn from(value: TextLineKey) -> Self {
        Self::TextLine(value)
    }
}

/// Validity bookkeeping for one field.
///
/// `valid` is the last verdict; `needs_rescan` is set by edits and cleared by
/// scan passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldStatus {
    valid: bool,
    needs_rescan: bool,
}

impl Default for FieldStatus {
    fn default() -> Self {
        Self {
            valid: true,
            needs_rescan: true,
        }
    }
}

impl FieldStatus {
    pub fn is_valid(self) -> bool {
        self.valid
    }

    pub fn needs_rescan(self) -> bool {
        self.needs_rescan
    }

    /// Field was written: trust it until the next scan says otherwise.
    pub fn mark_edited(&mut self) {
        self.valid = true;
        self.needs_rescan = true;
    }

    /// Stores a scan verdict.
    pub fn record_scan(&mut self, valid: bool) {
        self.valid = valid;
        self.needs_rescan = false;
    }
}

/// Generates an identifier token in the dataset's canonical form
/// (32 upper-case hex digits, no separators).
pub fn generate_entry_id() -> String {
    Uuid::new_v4().simple().to_string().to_ascii_uppercase()
}

/// Returns whether `value` is a well-formed identifier token.
///
/// Accepts the GUID spellings the dataset has historically used: plain hex,
/// hyphenated, braced and urn forms, in any letter case.
pub fn is_well_formed_id(value: &str) -> bool {
    Uuid::parse_str(value.trim()).is_ok()
}

/// Top-level localization record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    speaker: String,
    id: String,
    pub(crate) variants: Vec<VariantKey>,
    speaker_status: FieldStatus,
    id_status: FieldStatus,
}

impl Entry {
    /// Creates an entry with a freshly generated id.
    pub fn new(speaker: impl Into<String>) -> Self {
        Self::with_id(speaker, generate_entry_id())
    }

    /// Creates an entry with a caller-provided id (import paths).
    ///
    /// The id is not validated here; uniqueness and shape are checked by scan.
    pub fn with_id(speaker: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            id: id.into(),
            variants: Vec::new(),
            speaker_status: FieldStatus::default(),
            id_status: FieldStatus::default(),
        }
    }

    pub fn speaker(&self) -> &str {
        &self.speaker
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Child variant handles in display order.
    pub fn variants(&self) -> &[VariantKey] {
        &self.variants
    }

    pub fn speaker_status(&self) -> FieldStatus {
        self.speaker_status
    }

    pub fn id_status(&self) -> FieldStatus {
        self.id_status
    }

    pub fn set_speaker(&mut self, speaker: impl Into<String>) {
        self.speaker = speaker.into();
        self.speaker_status.mark_edited();
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
        self.id_status.mark_edited();
    }

    pub(crate) fn speaker_status_mut(&mut self) -> &mut FieldStatus {
        &mut self.speaker_status
    }

    pub(crate) fn id_status_mut(&mut self) -> &mut FieldStatus {
        &mut self.id_status
    }
}

/// Named grouping of text lines within an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    name: String,
    pub(crate) text_lines: Vec<TextLineKey>,
    name_status: FieldStatus,
}

impl Variant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text_lines: Vec::new(),
            name_status: FieldStatus::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Child text-line handles in display order.
    pub fn text_lines(&self) -> &[TextLineKey] {
        &self.text_lines
    }

    pub fn name_status(&self) -> FieldStatus {
        self.name_status
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.name_status.mark_edited();
    }

    pub(crate) fn name_status_mut(&mut self) -> &mut FieldStatus {
        &mut self.name_status
    }
}

/// A single piece of source text tagged with a language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLine {
    text: String,
    language: Option<Language>,
    text_status: FieldStatus,
    language_status: FieldStatus,
    translated_text: String,
    translation_language: Option<Language>,
}

impl TextLine {
    pub fn new(text: impl Into<String>, language: Option<Language>) -> Self {
        Self {
            text: text.into(),
            language,
            text_status: FieldStatus::default(),
            language_status: FieldStatus::default(),
            translated_text: String::new(),
            translation_language: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn language(&self) -> Option<Language> {
        self.language
    }

    pub fn text_status(&self) -> FieldStatus {
        self.text_status
    }

    pub fn language_status(&self) -> FieldStatus {
        self.language_status
    }

    /// Cached translation of `text`; empty when none was requested.
    pub fn translated_text(&self) -> &str {
        &self.translated_text
    }

    pub fn translation_language(&self) -> Option<Language> {
        self.translation_language
    }

    /// Writes the text and drops any cached translation of the old text.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.translated_text.clear();
        self.translation_language = None;
        self.text_status.mark_edited();
    }

    pub fn set_language(&mut self, language: Option<Language>) {
        self.language = language;
        self.language_status.mark_edited();
    }

    /// Stores a translation result for the current text.
    pub fn set_translation(&mut self, translated_text: impl Into<String>, language: Language) {
        self.translated_text = translated_text.into();
        self.translation_language = Some(language);
    }

    pub(crate) fn text_status_mut(&mut self) -> &mut FieldStatus {
        &mut self.text_status
    }

    pub(crate) fn language_status_mut(&mut self) -> &mut FieldStatus {
        &mut self.language_status
    }
}

#[cfg(test)]
mod tests {
    use super::{generate_entry_id, is_well_formed_id, Entry, FieldStatus, TextLine};
    use crate::model::language::Language;

    #[test]
    fn generated_ids_are_plain_upper_hex() {
        let id = generate_entry_id();
        assert_eq!(id.len(), 32);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
        assert!(is_well_formed_id(&id));
    }

    #[test]
    fn id_shape_accepts_common_guid_spellings() {
        assert!(is_well_formed_id("67e55044-10b1-426f-9247-bb680e5fe0c8"));
        assert!(is_well_formed_id("{67e55044-10b1-426f-9247-bb680e5fe0c8}"));
        assert!(is_well_formed_id("67E5504410B1426F9247BB680E5FE0C8"));
        assert!(!is_well_formed_id("ABCD"));
        assert!(!is_well_formed_id(""));
    }

    #[test]
    fn field_status_edit_is_optimistic_until_scan() {
        let mut status = FieldStatus::default();
        status.record_scan(false);
        assert!(!status.is_valid());
        assert!(!status.needs_rescan());

        status.mark_edited();
        assert!(status.is_valid());
        assert!(status.needs_rescan());
    }

    #[test]
    fn setters_mark_fields_valid_again() {
        let mut entry = Entry::with_id("", "ABCD");
        entry.speaker_status_mut().record_scan(false);
        entry.set_speaker("Bob");
        assert!(entry.speaker_status().is_valid());
        assert_eq!(entry.speaker(), "Bob");
    }

    #[test]
    fn writing_text_resets_translation_cache() {
        let mut line = TextLine::new("hello", Some(Language::EnglishUs));
        line.set_translation("bonjour", Language::French);
        assert_eq!(line.translated_text(), "bonjour");

        line.set_text("hi");
        assert_eq!(line.translated_text(), "");
        assert_eq!(line.translation_language(), None);
        assert_eq!(line.language(), Some(Language::EnglishUs));
    }
}
