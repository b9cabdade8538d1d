//! Reversible commands over the document graph.
//!
//! # Responsibility
//! - Describe one structural or field mutation as a closed sum type.
//! - Replay that mutation forwards or backwards against a `Document`.
//!
//! # Invariants
//! - Commands hold handles only; the document owns every node.
//! - `undo` requires `CommandState::Undoable`, `redo` requires
//!   `CommandState::Redoable`. Violations panic.
//! - An edit touches only the fields present in both snapshots whose values
//!   differ.

use crate::model::document::{CollectionRef, Document};
use crate::model::entry::NodeKey;
use crate::model::language::Language;
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};

const UNDO_CONSECUTIVE_CALL_ERROR: &str =
    "command already undone cannot be undone again; call redo first";
const REDO_CONSECUTIVE_CALL_ERROR: &str =
    "command already redone cannot be redone again; call undo first";

/// Stack-assigned command identity, used for dependency links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommandId(pub(crate) u64);

/// Which direction a command can be replayed next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    /// Mutation is applied; ready to undo.
    Undoable,
    /// Mutation is reverted; ready to redo.
    Redoable,
}

/// Editable field of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Speaker,
    EntryId,
    VariantName,
    Text,
    Language,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Speaker => "speaker",
            Self::EntryId => "entry_id",
            Self::VariantName => "variant_name",
            Self::Text => "text",
            Self::Language => "language",
        }
    }

    /// Returns whether this field exists on the node kind of `target`.
    pub fn applies_to(self, target: NodeKey) -> bool {
        matches!(
            (self, target),
            (Self::Speaker | Self::EntryId, NodeKey::Entry(_))
                | (Self::VariantName, NodeKey::Variant(_))
                | (Self::Text | Self::Language, NodeKey::TextLine(_))
        )
    }
}

/// Value of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Speaker(String),
    EntryId(String),
    VariantName(String),
    Text(String),
    /// `None` means "language unset", which is itself a value.
    Language(Option<Language>),
}

impl FieldValue {
    pub fn field(&self) -> Field {
        match self {
            Self::Speaker(_) => Field::Speaker,
            Self::EntryId(_) => Field::EntryId,
            Self::VariantName(_) => Field::VariantName,
            Self::Text(_) => Field::Text,
            Self::Language(_) => Field::Language,
        }
    }
}

/// Partial set of field values; absent fields are untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    values: Vec<FieldValue>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn speaker(self, value: impl Into<String>) -> Self {
        self.with(FieldValue::Speaker(value.into()))
    }

    pub fn entry_id(self, value: impl Into<String>) -> Self {
        self.with(FieldValue::EntryId(value.into()))
    }

    pub fn variant_name(self, value: impl Into<String>) -> Self {
        self.with(FieldValue::VariantName(value.into()))
    }

    pub fn text(self, value: impl Into<String>) -> Self {
        self.with(FieldValue::Text(value.into()))
    }

    pub fn language(self, value: Option<Language>) -> Self {
        self.with(FieldValue::Language(value))
    }

    /// Sets a value, replacing an earlier value of the same field.
    pub fn with(mut self, value: FieldValue) -> Self {
        let field = value.field();
        self.values.retain(|existing| existing.field() != field);
        self.values.push(value);
        self
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.values.iter().find(|value| value.field() == field)
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.values.iter().map(FieldValue::field)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Reads the current values of `fields` from `target`.
    ///
    /// Returns `None` when the target does not resolve or a field does not
    /// apply to it.
    pub fn capture(
        doc: &Document,
        target: NodeKey,
        fields: impl IntoIterator<Item = Field>,
    ) -> Option<Self> {
        let mut snapshot = Self::new();
        for field in fields {
            snapshot = snapshot.with(read_field(doc, target, field)?);
        }
        Some(snapshot)
    }
}

/// Edit construction errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// Snapshot names a field the target kind does not have.
    FieldNotApplicable { field: Field, target: NodeKey },
    /// No field differs between the snapshots.
    NoChanges,
}

impl Display for EditError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FieldNotApplicable { field, target } => write!(
                f,
                "field `{}` does not exist on {}",
                field.as_str(),
                target.kind()
            ),
            Self::NoChanges => write!(f, "edit does not change any field"),
        }
    }
}

impl Error for EditError {}

/// One touched field with both values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub old: FieldValue,
    pub new: FieldValue,
}

/// Insert/remove of one item in one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionChange {
    pub collection: CollectionRef,
    /// Index the item occupied (remove) or was placed at (add).
    pub index: usize,
    pub item: NodeKey,
}

/// Field edit of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditChange {
    pub target: NodeKey,
    pub changes: Vec<FieldChange>,
    /// Add/Remove command this edit's liveness derives from; set on push.
    pub(crate) rely_on: Option<CommandId>,
}

impl EditChange {
    pub fn rely_on(&self) -> Option<CommandId> {
        self.rely_on
    }
}

/// Closed set of command kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Add(CollectionChange),
    Remove(CollectionChange),
    Edit(EditChange),
}

/// One reversible mutation plus its replay state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    kind: CommandKind,
    state: CommandState,
}

impl Command {
    /// Item was inserted into `collection` at `index`.
    pub fn add(collection: CollectionRef, index: usize, item: NodeKey) -> Self {
        Self::applied(CommandKind::Add(CollectionChange {
            collection,
            index,
            item,
        }))
    }

    /// Item was removed from `collection` at `index`.
    pub fn remove(collection: CollectionRef, index: usize, item: NodeKey) -> Self {
        Self::applied(CommandKind::Remove(CollectionChange {
            collection,
            index,
            item,
        }))
    }

    /// Fields of `target` changed from `old` to `new`.
    ///
    /// Only fields present in both snapshots with differing values are kept.
    pub fn edit(target: NodeKey, old: &Snapshot, new: &Snapshot) -> Result<Self, EditError> {
        let mut changes = Vec::new();
        for new_value in &new.values {
            let field = new_value.field();
            if !field.applies_to(target) {
                return Err(EditError::FieldNotApplicable { field, target });
            }
            let Some(old_value) = old.get(field) else {
                continue;
            };
            if old_value != new_value {
                changes.push(FieldChange {
                    old: old_value.clone(),
                    new: new_value.clone(),
                });
            }
        }
        if changes.is_empty() {
            return Err(EditError::NoChanges);
        }
        Ok(Self::applied(CommandKind::Edit(EditChange {
            target,
            changes,
            rely_on: None,
        })))
    }

    fn applied(kind: CommandKind) -> Self {
        Self {
            kind,
            state: CommandState::Undoable,
        }
    }

    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    pub fn state(&self) -> CommandState {
        self.state
    }

    /// Node the command is about.
    pub fn target(&self) -> NodeKey {
        match &self.kind {
            CommandKind::Add(change) | CommandKind::Remove(change) => change.item,
            CommandKind::Edit(change) => change.target,
        }
    }

    /// Nodes the command replays against: its target and, for Add/Remove,
    /// the collection owner.
    pub fn referenced_nodes(&self) -> impl Iterator<Item = NodeKey> {
        let owner = match &self.kind {
            CommandKind::Add(change) | CommandKind::Remove(change) => change.collection.owner(),
            CommandKind::Edit(_) => None,
        };
        std::iter::once(self.target()).chain(owner)
    }

    /// Returns whether this is an Add or Remove command.
    pub fn is_structural(&self) -> bool {
        matches!(self.kind, CommandKind::Add(_) | CommandKind::Remove(_))
    }

    pub(crate) fn set_rely_on(&mut self, anchor: CommandId) {
        if let CommandKind::Edit(change) = &mut self.kind {
            change.rely_on = Some(anchor);
        }
    }

    /// Local liveness: the command's own handles still make sense.
    ///
    /// Edit anchors are resolved by the stack.
    pub(crate) fn is_live(&self, doc: &Document) -> bool {
        match (&self.kind, self.state) {
            (CommandKind::Add(change), CommandState::Undoable)
            | (CommandKind::Remove(change), CommandState::Redoable) => {
                doc.collection_contains(change.collection, change.item)
            }
            (CommandKind::Add(change), CommandState::Redoable)
            | (CommandKind::Remove(change), CommandState::Undoable) => {
                doc.collection_exists(change.collection)
                    && doc.resolves(change.item)
                    && !doc.is_attached(change.item)
            }
            (CommandKind::Edit(change), _) => doc.resolves(change.target),
        }
    }

    /// Reverts the mutation.
    ///
    /// # Panics
    /// Panics when the command is already undone.
    pub(crate) fn undo(&mut self, doc: &mut Document) {
        assert!(
            self.state == CommandState::Undoable,
            "{UNDO_CONSECUTIVE_CALL_ERROR}"
        );
        match &self.kind {
            CommandKind::Add(change) => detach(doc, change),
            CommandKind::Remove(change) => reinsert(doc, change),
            CommandKind::Edit(change) => {
                for field in &change.changes {
                    write_field(doc, change.target, &field.old);
                }
            }
        }
        self.state = CommandState::Redoable;
    }

    /// Re-applies the mutation.
    ///
    /// # Panics
    /// Panics when the command is not undone.
    pub(crate) fn redo(&mut self, doc: &mut Document) {
        assert!(
            self.state == CommandState::Redoable,
            "{REDO_CONSECUTIVE_CALL_ERROR}"
        );
        match &self.kind {
            CommandKind::Add(change) => reinsert(doc, change),
            CommandKind::Remove(change) => detach(doc, change),
            CommandKind::Edit(change) => {
                for field in &change.changes {
                    write_field(doc, change.target, &field.new);
                }
            }
        }
        self.state = CommandState::Undoable;
    }
}

fn detach(doc: &mut Document, change: &CollectionChange) {
    if doc.detach_from(change.collection, change.item).is_none() {
        warn!(
            "event=command_replay module=undo status=skipped reason=item_missing collection={}",
            change.collection.kind()
        );
    }
}

fn reinsert(doc: &mut Document, change: &CollectionChange) {
    // Out-of-range index appends; `insert_into` clamps.
    if let Err(err) = doc.insert_into(change.collection, change.index, change.item) {
        warn!(
            "event=command_replay module=undo status=skipped collection={} error={}",
            change.collection.kind(),
            err
        );
    }
}

pub(crate) fn read_field(doc: &Document, target: NodeKey, field: Field) -> Option<FieldValue> {
    match (target, field) {
        (NodeKey::Entry(key), Field::Speaker) => {
            Some(FieldValue::Speaker(doc.entry(key)?.speaker().to_string()))
        }
        (NodeKey::Entry(key), Field::EntryId) => {
            Some(FieldValue::EntryId(doc.entry(key)?.id().to_string()))
        }
        (NodeKey::Variant(key), Field::VariantName) => {
            Some(FieldValue::VariantName(doc.variant(key)?.name().to_string()))
        }
        (NodeKey::TextLine(key), Field::Text) => {
            Some(FieldValue::Text(doc.text_line(key)?.text().to_string()))
        }
        (NodeKey::TextLine(key), Field::Language) => {
            Some(FieldValue::Language(doc.text_line(key)?.language()))
        }
        _ => None,
    }
}

/// Writes one value through the model setters (marks the field edited).
pub(crate) fn write_field(doc: &mut Document, target: NodeKey, value: &FieldValue) {
    match (target, value) {
        (NodeKey::Entry(key), FieldValue::Speaker(speaker)) => {
            if let Some(entry) = doc.entry_mut(key) {
                entry.set_speaker(speaker.as_str());
            }
        }
        (NodeKey::Entry(key), FieldValue::EntryId(id)) => {
            if let Some(entry) = doc.entry_mut(key) {
                entry.set_id(id.as_str());
            }
        }
        (NodeKey::Variant(key), FieldValue::VariantName(name)) => {
            if let Some(variant) = doc.variant_mut(key) {
                variant.set_name(name.as_str());
            }
        }
        (NodeKey::TextLine(key), FieldValue::Text(text)) => {
            if let Some(line) = doc.text_line_mut(key) {
                line.set_text(text.as_str());
            }
        }
        (NodeKey::TextLine(key), FieldValue::Language(language)) => {
            if let Some(line) = doc.text_line_mut(key) {
                line.set_language(*language);
            }
        }
        _ => {}
    }
}
