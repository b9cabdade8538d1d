//! Data-integrity scan and heal.
//!
//! # Responsibility
//! - Flag invalid fields across the whole document (`scan`).
//! - Repair what can be repaired automatically (`heal`).
//! - Use the translation service for language checks and fixes.
//!
//! # Invariants
//! - Structural passes never depend on the translation service.
//! - A service failure skips only the language pass; it is reported, not raised.
//! - `heal` mutates the document without tracking. Callers holding a command
//!   stack must call `CommandStack::refresh` right after.
//!
//! # See also
//! - `service::editor_service` for the heal-then-refresh sequence.

use crate::model::document::Document;
use crate::model::entry::{is_well_formed_id, EntryKey, TextLineKey, VariantKey};
use crate::model::language::Language;
use crate::translation::service::{ServiceError, TranslationService};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Outcome of the language detection pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LanguagePass {
    /// Detection ran (or there was nothing to detect).
    #[default]
    Completed,
    /// Service failed; the pass was skipped.
    Skipped(ServiceError),
}

impl LanguagePass {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

/// Counters produced by `IntegrityService::scan`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanReport {
    pub entries_scanned: usize,
    pub malformed_ids: usize,
    /// Entries sharing an id with at least one other entry.
    pub duplicated_ids: usize,
    pub blank_speakers: usize,
    pub blank_variant_names: usize,
    pub blank_texts: usize,
    pub missing_languages: usize,
    pub language_mismatches: usize,
    pub language_pass: LanguagePass,
}

impl ScanReport {
    /// Returns whether no invalid field was found.
    pub fn is_clean(&self) -> bool {
        self.invalid_fields() == 0
    }

    /// Total number of fields flagged invalid.
    pub fn invalid_fields(&self) -> usize {
        self.malformed_ids
            + self.duplicated_ids
            + self.blank_speakers
            + self.blank_variant_names
            + self.blank_texts
            + self.missing_languages
            + self.language_mismatches
    }
}

/// Counters produced by `IntegrityService::heal`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HealReport {
    pub removed_malformed: usize,
    pub removed_duplicates: usize,
    pub merged_variants: usize,
    pub moved_text_lines: usize,
    pub languages_corrected: usize,
    pub language_pass: LanguagePass,
}

impl HealReport {
    /// Returns whether heal changed the document structure.
    pub fn changed_structure(&self) -> bool {
        self.removed_malformed + self.removed_duplicates + self.merged_variants > 0
    }
}

/// Scan/heal engine over a translation service.
pub struct IntegrityService<S: TranslationService> {
    service: S,
}

impl<S: TranslationService> IntegrityService<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Validates every field and records verdicts on the document.
    ///
    /// Entries are checked for a well-formed id and a non-blank speaker,
    /// variants for a non-blank name, and lines for non-blank text and a set
    /// language. Entries sharing an id are all flagged. A line's language is
    /// flagged when detection recognizes a different one than stored.
    pub fn scan(&self, doc: &mut Document) -> ScanReport {
        let mut report = ScanReport::default();
        self.scan_structure(doc, &mut report);
        mark_duplicated_ids(doc, &mut report);
        report.language_pass = self.check_languages(doc, &mut report);

        info!(
            "event=scan module=integrity status={} entries={} invalid_fields={} language_pass={}",
            if report.is_clean() { "clean" } else { "invalid" },
            report.entries_scanned,
            report.invalid_fields(),
            if report.language_pass.is_skipped() {
                "skipped"
            } else {
                "completed"
            }
        );
        report
    }

    /// Repairs the document in place.
    ///
    /// Removes entries with malformed ids, keeps only the first entry per id,
    /// merges variants of one entry that share a normalized name, then sets
    /// each line's language to the detected one where detection is conclusive.
    /// An empty document is left untouched.
    pub fn heal(&self, doc: &mut Document) -> HealReport {
        let mut report = HealReport::default();
        if doc.is_empty() {
            return report;
        }

        report.removed_malformed = remove_malformed_ids(doc);
        report.removed_duplicates = remove_duplicated_ids(doc);
        let (merged, moved) = merge_duplicate_variants(doc);
        report.merged_variants = merged;
        report.moved_text_lines = moved;
        report.language_pass = self.correct_languages(doc, &mut report);

        info!(
            "event=heal module=integrity status=ok removed_malformed={} removed_duplicates={} merged_variants={} languages_corrected={} language_pass={}",
            report.removed_malformed,
            report.removed_duplicates,
            report.merged_variants,
            report.languages_corrected,
            if report.language_pass.is_skipped() {
                "skipped"
            } else {
                "completed"
            }
        );
        report
    }

    fn scan_structure(&self, doc: &mut Document, report: &mut ScanReport) {
        let entry_keys = doc.entry_keys().to_vec();
        for entry_key in entry_keys {
            let Some(entry) = doc.entry_mut(entry_key) else {
                continue;
            };
            report.entries_scanned += 1;

            let id_ok = is_well_formed_id(entry.id());
            entry.id_status_mut().record_scan(id_ok);
            if !id_ok {
                report.malformed_ids += 1;
            }
            let speaker_ok = !entry.speaker().trim().is_empty();
            entry.speaker_status_mut().record_scan(speaker_ok);
            if !speaker_ok {
                report.blank_speakers += 1;
            }

            let variant_keys = entry.variants().to_vec();
            for variant_key in variant_keys {
                let Some(variant) = doc.variant_mut(variant_key) else {
                    continue;
                };
                let name_ok = !variant.name().trim().is_empty();
                variant.name_status_mut().record_scan(name_ok);
                if !name_ok {
                    report.blank_variant_names += 1;
                }

                let line_keys = variant.text_lines().to_vec();
                for line_key in line_keys {
                    let Some(line) = doc.text_line_mut(line_key) else {
                        continue;
                    };
                    let text_ok = !line.text().trim().is_empty();
                    line.text_status_mut().record_scan(text_ok);
                    if !text_ok {
                        report.blank_texts += 1;
                    }
                    let language_ok = line.language().is_some();
                    line.language_status_mut().record_scan(language_ok);
                    if !language_ok {
                        report.missing_languages += 1;
                    }
                }
            }
        }
    }

    fn check_languages(&self, doc: &mut Document, report: &mut ScanReport) -> LanguagePass {
        let detections = match self.detect_all(doc) {
            Ok(detections) => detections,
            Err(err) => return LanguagePass::Skipped(err),
        };

        for (line_key, detected) in detections {
            let Some(line) = doc.text_line_mut(line_key) else {
                continue;
            };
            match (detected, line.language()) {
                (Some(detected), Some(stored)) if detected != stored => {
                    line.language_status_mut().record_scan(false);
                    report.language_mismatches += 1;
                }
                _ => {}
            }
        }
        LanguagePass::Completed
    }

    fn correct_languages(&self, doc: &mut Document, report: &mut HealReport) -> LanguagePass {
        let detections = match self.detect_all(doc) {
            Ok(detections) => detections,
            Err(err) => return LanguagePass::Skipped(err),
        };

        for (line_key, detected) in detections {
            let (Some(detected), Some(line)) = (detected, doc.text_line_mut(line_key)) else {
                continue;
            };
            if line.language() != Some(detected) {
                line.set_language(Some(detected));
                report.languages_corrected += 1;
            }
            line.language_status_mut().record_scan(true);
        }
        LanguagePass::Completed
    }

    /// Detects every attached line's language in one batch.
    fn detect_all(
        &self,
        doc: &Document,
    ) -> Result<Vec<(TextLineKey, Option<Language>)>, ServiceError> {
        let keys = doc.text_line_keys();
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let texts: Vec<String> = keys
            .iter()
            .filter_map(|key| doc.text_line(*key))
            .map(|line| line.text().to_string())
            .collect();

        let detections = self.service.detect_languages(&texts).map_err(|err| {
            warn!(
                "event=detect module=integrity status=skipped lines={} error={}",
                texts.len(),
                err
            );
            err
        })?;
        if detections.len() != keys.len() {
            let err = ServiceError::MalformedResponse(format!(
                "expected {} detections, got {}",
                keys.len(),
                detections.len()
            ));
            warn!(
                "event=detect module=integrity status=skipped lines={} error={}",
                keys.len(),
                err
            );
            return Err(err);
        }
        Ok(keys.into_iter().zip(detections).collect())
    }
}

/// Key used to compare variant names for merging.
pub fn normalize_variant_name(name: &str) -> String {
    WHITESPACE_RE.replace_all(name.trim(), " ").to_lowercase()
}

fn mark_duplicated_ids(doc: &mut Document, report: &mut ScanReport) {
    let mut by_id: HashMap<String, Vec<EntryKey>> = HashMap::new();
    for key in doc.entry_keys() {
        if let Some(entry) = doc.entry(*key) {
            by_id.entry(entry.id().to_string()).or_default().push(*key);
        }
    }

    for keys in by_id.into_values().filter(|keys| keys.len() > 1) {
        for key in keys {
            if let Some(entry) = doc.entry_mut(key) {
                entry.id_status_mut().record_scan(false);
                report.duplicated_ids += 1;
            }
        }
    }
}

fn remove_malformed_ids(doc: &mut Document) -> usize {
    let malformed: Vec<EntryKey> = doc
        .entry_keys()
        .iter()
        .copied()
        .filter(|key| {
            doc.entry(*key)
                .is_some_and(|entry| !is_well_formed_id(entry.id()))
        })
        .collect();
    malformed
        .into_iter()
        .filter_map(|key| doc.remove_entry(key))
        .count()
}

fn remove_duplicated_ids(doc: &mut Document) -> usize {
    let mut seen: HashMap<String, EntryKey> = HashMap::new();
    let mut survivors: HashSet<EntryKey> = HashSet::new();
    let mut duplicates = Vec::new();

    for key in doc.entry_keys() {
        let Some(entry) = doc.entry(*key) else {
            continue;
        };
        match seen.get(entry.id()) {
            Some(first) => {
                survivors.insert(*first);
                duplicates.push(*key);
            }
            None => {
                seen.insert(entry.id().to_string(), *key);
            }
        }
    }

    for key in survivors {
        if let Some(entry) = doc.entry_mut(key) {
            entry.id_status_mut().record_scan(true);
        }
    }
    duplicates
        .into_iter()
        .filter_map(|key| doc.remove_entry(key))
        .count()
}

/// Returns `(merged_variants, moved_text_lines)`.
fn merge_duplicate_variants(doc: &mut Document) -> (usize, usize) {
    let mut merged = 0;
    let mut moved = 0;

    let entry_keys = doc.entry_keys().to_vec();
    for entry_key in entry_keys {
        let Some(entry) = doc.entry(entry_key) else {
            continue;
        };
        let mut first_by_name: HashMap<String, VariantKey> = HashMap::new();
        let mut merges = Vec::new();
        for variant_key in entry.variants() {
            let Some(variant) = doc.variant(*variant_key) else {
                continue;
            };
            let normalized = normalize_variant_name(variant.name());
            match first_by_name.get(&normalized) {
                Some(first) => merges.push((*variant_key, *first)),
                None => {
                    first_by_name.insert(normalized, *variant_key);
                }
            }
        }

        for (duplicate, first) in merges {
            match doc.move_text_lines(duplicate, first) {
                Ok(count) => moved += count,
                Err(err) => {
                    warn!(
                        "event=heal module=integrity status=error stage=merge_variants error={}",
                        err
                    );
                    continue;
                }
            }
            if doc.remove_variant(duplicate).is_some() {
                merged += 1;
            }
        }
    }
    (merged, moved)
}
