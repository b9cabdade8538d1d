//! Editing session over one document.
//!
//! # Responsibility
//! - Own the document, its command stack and the integrity engine.
//! - Route user edits through tracked operations.
//! - Run scan/heal/translate one at a time and keep history consistent after
//!   untracked mutations.
//!
//! # Invariants
//! - Every untracked structural mutation made here is followed by a refresh.
//! - While the busy flag is set, long-running operations return `Busy`.
//! - Undo/redo are refused instead of panicking when their range is empty.

use crate::model::document::{CollectionRef, Document, DocumentError};
use crate::model::entry::{Entry, EntryKey, NodeKey, TextLine, TextLineKey, Variant, VariantKey};
use crate::model::language::Language;
use crate::service::integrity_service::{HealReport, IntegrityService, ScanReport};
use crate::translation::service::{ServiceError, TranslationService};
use crate::undo::command::{CommandId, Snapshot};
use crate::undo::stack::{CommandStack, StepOutcome};
use crate::undo::tracked::{edit_tracked, TrackError, TrackedCollection};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Editing session errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Another scan/heal/translate is in flight.
    Busy,
    NothingToUndo,
    NothingToRedo,
    /// Node handle does not resolve in the current document.
    NodeNotFound(NodeKey),
    /// Line has no language to translate from.
    MissingSourceLanguage(TextLineKey),
    Track(TrackError),
    Service(ServiceError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Busy => write!(f, "another operation is in progress"),
            Self::NothingToUndo => write!(f, "nothing to undo"),
            Self::NothingToRedo => write!(f, "nothing to redo"),
            Self::NodeNotFound(node) => write!(f, "{} not found", node.kind()),
            Self::MissingSourceLanguage(_) => write!(f, "text line has no language set"),
            Self::Track(err) => write!(f, "{err}"),
            Self::Service(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Track(err) => Some(err),
            Self::Service(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TrackError> for SessionError {
    fn from(value: TrackError) -> Self {
        Self::Track(value)
    }
}

impl From<ServiceError> for SessionError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

/// Result alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Clears the busy flag when dropped.
struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> SessionResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SessionError::Busy)?;
        Ok(Self { flag: flag.clone() })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// One open document with its history.
pub struct EditorService<S: TranslationService> {
    document: Document,
    stack: CommandStack,
    integrity: IntegrityService<S>,
    busy: Arc<AtomicBool>,
}

impl<S: TranslationService> EditorService<S> {
    pub fn new(document: Document, service: S) -> Self {
        Self::with_stack(document, CommandStack::new(), service)
    }

    /// Uses a caller-built stack, e.g. one carrying availability notifiers.
    pub fn with_stack(document: Document, stack: CommandStack, service: S) -> Self {
        Self {
            document,
            stack,
            integrity: IntegrityService::new(service),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn stack(&self) -> &CommandStack {
        &self.stack
    }

    /// Shared busy flag, for observers that disable actions while set.
    pub fn busy_flag(&self) -> Arc<AtomicBool> {
        self.busy.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Replaces the document and forgets all history.
    pub fn replace_document(&mut self, document: Document) {
        self.document = document;
        self.stack.clear();
        self.stack.release_dropped(&mut self.document);
    }

    /// Gives the document back, e.g. for saving.
    pub fn into_document(self) -> Document {
        self.document
    }

    /* ------------------------------ history ------------------------------ */

    pub fn undo(&mut self) -> SessionResult<StepOutcome> {
        if !self.stack.can_undo() {
            return Err(SessionError::NothingToUndo);
        }
        let outcome = self.stack.undo(&mut self.document);
        self.stack.release_dropped(&mut self.document);
        Ok(outcome)
    }

    pub fn redo(&mut self) -> SessionResult<StepOutcome> {
        if !self.stack.can_redo() {
            return Err(SessionError::NothingToRedo);
        }
        let outcome = self.stack.redo(&mut self.document);
        self.stack.release_dropped(&mut self.document);
        Ok(outcome)
    }

    /* --------------------------- tracked edits --------------------------- */

    pub fn add_entry(&mut self, entry: Entry) -> SessionResult<EntryKey> {
        let key = self.document.alloc_entry(entry);
        self.tracked(CollectionRef::Entries)?.add_tracked(key)?;
        Ok(key)
    }

    pub fn insert_entry(&mut self, index: usize, entry: Entry) -> SessionResult<EntryKey> {
        let key = self.document.alloc_entry(entry);
        self.tracked(CollectionRef::Entries)?
            .insert_tracked(index, key)?;
        Ok(key)
    }

    pub fn remove_entry(&mut self, key: EntryKey) -> SessionResult<usize> {
        Ok(self.tracked(CollectionRef::Entries)?.remove_tracked(key)?)
    }

    pub fn add_variant(&mut self, entry: EntryKey, variant: Variant) -> SessionResult<VariantKey> {
        let collection = CollectionRef::Variants(entry);
        self.require_collection(collection)?;
        let key = self.document.alloc_variant(variant);
        self.tracked(collection)?.add_tracked(key)?;
        Ok(key)
    }

    pub fn remove_variant(&mut self, entry: EntryKey, key: VariantKey) -> SessionResult<usize> {
        Ok(self
            .tracked(CollectionRef::Variants(entry))?
            .remove_tracked(key)?)
    }

    pub fn add_text_line(
        &mut self,
        variant: VariantKey,
        line: TextLine,
    ) -> SessionResult<TextLineKey> {
        let collection = CollectionRef::TextLines(variant);
        self.require_collection(collection)?;
        let key = self.document.alloc_text_line(line);
        self.tracked(collection)?.add_tracked(key)?;
        Ok(key)
    }

    pub fn remove_text_line(
        &mut self,
        variant: VariantKey,
        key: TextLineKey,
    ) -> SessionResult<usize> {
        Ok(self
            .tracked(CollectionRef::TextLines(variant))?
            .remove_tracked(key)?)
    }

    /// Applies field values to a node and records the edit.
    pub fn edit(
        &mut self,
        target: impl Into<NodeKey>,
        values: Snapshot,
    ) -> SessionResult<Option<CommandId>> {
        Ok(edit_tracked(
            &mut self.document,
            &mut self.stack,
            target,
            values,
        )?)
    }

    /// Deletes an entry without recording it, then drops history that
    /// depended on it.
    pub fn delete_entry_untracked(&mut self, key: EntryKey) -> SessionResult<usize> {
        let index = self
            .document
            .remove_entry(key)
            .ok_or(SessionError::NodeNotFound(key.into()))?;
        self.stack.refresh(&self.document);
        self.stack.release_dropped(&mut self.document);
        Ok(index)
    }

    /* ------------------------ integrity / translate ------------------------ */

    pub fn scan(&mut self) -> SessionResult<ScanReport> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        Ok(self.integrity.scan(&mut self.document))
    }

    /// Heals the document, then purges history made stale by the repair.
    pub fn heal(&mut self) -> SessionResult<HealReport> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        let report = self.integrity.heal(&mut self.document);
        self.stack.refresh(&self.document);
        self.stack.release_dropped(&mut self.document);
        Ok(report)
    }

    /// Translates one line into `target` and caches the result on the line.
    ///
    /// The cache is not part of history and is cleared by any text change.
    pub fn translate_line(&mut self, key: TextLineKey, target: Language) -> SessionResult<String> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        let line = self
            .document
            .text_line(key)
            .ok_or(SessionError::NodeNotFound(key.into()))?;
        let source = line
            .language()
            .ok_or(SessionError::MissingSourceLanguage(key))?;

        let translated = match self.integrity.service().translate(line.text(), source, target) {
            Ok(translated) => translated,
            Err(err) => {
                warn!(
                    "event=translate module=editor status=error source={} target={} error={}",
                    source.as_code(),
                    target.as_code(),
                    err
                );
                return Err(err.into());
            }
        };

        if let Some(line) = self.document.text_line_mut(key) {
            line.set_translation(translated.clone(), target);
        }
        info!(
            "event=translate module=editor status=ok source={} target={} chars={}",
            source.as_code(),
            target.as_code(),
            translated.chars().count()
        );
        Ok(translated)
    }

    fn require_collection(&self, collection: CollectionRef) -> SessionResult<()> {
        if self.document.collection_exists(collection) {
            Ok(())
        } else {
            Err(TrackError::Document(DocumentError::CollectionNotFound(collection)).into())
        }
    }

    fn tracked(&mut self, collection: CollectionRef) -> SessionResult<TrackedCollection<'_>> {
        Ok(TrackedCollection::new(
            &mut self.document,
            &mut self.stack,
            collection,
        )?)
    }
}
