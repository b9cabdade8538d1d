//! Undo-tracked collection and field edits.
//!
//! # Responsibility
//! - Perform structural edits on one document sequence and push the matching
//!   Add/Remove command.
//! - Perform field edits and push the matching Edit command.
//!
//! # Invariants
//! - The mutation is applied before the command is pushed.
//! - Raw sequence edits stay available on `Document`; only these helpers
//!   create commands.

use crate::model::document::{CollectionRef, Document, DocumentError};
use crate::model::entry::NodeKey;
use crate::undo::command::{write_field, Command, CommandId, EditError, Snapshot};
use crate::undo::stack::CommandStack;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from tracked edits. Nothing is pushed when one is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackError {
    /// Structural precondition failed in the document.
    Document(DocumentError),
    /// Item is not a member of the tracked collection.
    NotInCollection(NodeKey),
    /// Removal index is past the end.
    IndexOutOfRange { index: usize, len: usize },
    /// Edit could not be built.
    Edit(EditError),
}

impl Display for TrackError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Document(err) => write!(f, "{err}"),
            Self::NotInCollection(item) => write!(f, "{} is not in collection", item.kind()),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for length {len}")
            }
            Self::Edit(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TrackError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Document(err) => Some(err),
            Self::Edit(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DocumentError> for TrackError {
    fn from(value: DocumentError) -> Self {
        Self::Document(value)
    }
}

impl From<EditError> for TrackError {
    fn from(value: EditError) -> Self {
        Self::Edit(value)
    }
}

/// One document sequence whose edits are recorded on a command stack.
pub struct TrackedCollection<'a> {
    doc: &'a mut Document,
    stack: &'a mut CommandStack,
    collection: CollectionRef,
}

impl<'a> TrackedCollection<'a> {
    /// Wraps an existing collection.
    pub fn new(
        doc: &'a mut Document,
        stack: &'a mut CommandStack,
        collection: CollectionRef,
    ) -> Result<Self, TrackError> {
        if !doc.collection_exists(collection) {
            return Err(DocumentError::CollectionNotFound(collection).into());
        }
        Ok(Self {
            doc,
            stack,
            collection,
        })
    }

    pub fn collection(&self) -> CollectionRef {
        self.collection
    }

    pub fn len(&self) -> usize {
        self.doc.collection_len(self.collection).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a detached item and records an Add at its final index.
    pub fn add_tracked(&mut self, item: impl Into<NodeKey>) -> Result<usize, TrackError> {
        let item = item.into();
        let index = self.doc.insert_into(self.collection, usize::MAX, item)?;
        self.record(Command::add(self.collection, index, item));
        Ok(index)
    }

    /// Inserts a detached item at `index` (appends when out of range) and
    /// records an Add carrying the requested index.
    pub fn insert_tracked(
        &mut self,
        index: usize,
        item: impl Into<NodeKey>,
    ) -> Result<usize, TrackError> {
        let item = item.into();
        let placed = self.doc.insert_into(self.collection, index, item)?;
        self.record(Command::add(self.collection, index, item));
        Ok(placed)
    }

    /// Detaches `item` and records a Remove at the index it occupied.
    pub fn remove_tracked(&mut self, item: impl Into<NodeKey>) -> Result<usize, TrackError> {
        let item = item.into();
        let index = self
            .doc
            .detach_from(self.collection, item)
            .ok_or(TrackError::NotInCollection(item))?;
        self.record(Command::remove(self.collection, index, item));
        Ok(index)
    }

    /// Detaches the item at `index` and records a Remove.
    pub fn remove_at_tracked(&mut self, index: usize) -> Result<NodeKey, TrackError> {
        let len = self.len();
        let item = self
            .doc
            .detach_at(self.collection, index)
            .ok_or(TrackError::IndexOutOfRange { index, len })?;
        self.record(Command::remove(self.collection, index, item));
        Ok(item)
    }

    fn record(&mut self, command: Command) {
        self.stack.push(command);
        self.stack.release_dropped(self.doc);
    }
}

/// Applies `new` to `target` and records an Edit with the previous values.
///
/// Returns `Ok(None)` when nothing changed; no command is pushed then.
pub fn edit_tracked(
    doc: &mut Document,
    stack: &mut CommandStack,
    target: impl Into<NodeKey>,
    new: Snapshot,
) -> Result<Option<CommandId>, TrackError> {
    let target = target.into();
    if !doc.resolves(target) {
        return Err(DocumentError::NodeNotFound(target).into());
    }
    for field in new.fields() {
        if !field.applies_to(target) {
            return Err(EditError::FieldNotApplicable { field, target }.into());
        }
    }
    let old = Snapshot::capture(doc, target, new.fields())
        .ok_or(DocumentError::NodeNotFound(target))?;

    let command = match Command::edit(target, &old, &new) {
        Ok(command) => command,
        Err(EditError::NoChanges) => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    for field in new.fields() {
        if let Some(value) = new.get(field) {
            write_field(doc, target, value);
        }
    }
    let id = stack.push(command);
    stack.release_dropped(doc);
    Ok(Some(id))
}
