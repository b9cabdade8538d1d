//! Arena-backed document graph.
//!
//! # Responsibility
//! - Own every entry, variant and text line in handle-keyed tables.
//! - Provide raw (untracked) structural edits and the collection primitives
//!   that undo commands replay against.
//!
//! # Invariants
//! - A node detached by a tracked removal stays in its table so a command can
//!   re-insert it.
//! - A node removed by a raw removal is purged with its whole subtree,
//!   including children that were detached from it earlier. Purged handles
//!   never resolve again.
//! - A node is present in at most one sequence at a time.

use crate::model::entry::{Entry, EntryKey, NodeKey, TextLine, TextLineKey, Variant, VariantKey};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Names one ordered sequence of the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionRef {
    /// Root list of entries.
    Entries,
    /// Variants of one entry.
    Variants(EntryKey),
    /// Text lines of one variant.
    TextLines(VariantKey),
}

impl CollectionRef {
    /// Node owning the sequence; `None` for the root entry list.
    pub fn owner(self) -> Option<NodeKey> {
        match self {
            Self::Entries => None,
            Self::Variants(entry) => Some(entry.into()),
            Self::TextLines(variant) => Some(variant.into()),
        }
    }

    /// Stable label used in log events.
    pub fn kind(self) -> &'static str {
        match self {
            Self::Entries => "entries",
            Self::Variants(_) => "variants",
            Self::TextLines(_) => "text_lines",
        }
    }
}

/// Structural edit errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// Collection owner handle does not resolve.
    CollectionNotFound(CollectionRef),
    /// Item handle does not resolve.
    NodeNotFound(NodeKey),
    /// Item kind does not fit the collection.
    KindMismatch {
        collection: CollectionRef,
        item: NodeKey,
    },
    /// Item is already present in a sequence.
    AlreadyAttached(NodeKey),
}

impl Display for DocumentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CollectionNotFound(collection) => {
                write!(f, "collection not found: {}", collection.kind())
            }
            Self::NodeNotFound(item) => write!(f, "{} not found", item.kind()),
            Self::KindMismatch { collection, item } => write!(
                f,
                "{} cannot be stored in {} collection",
                item.kind(),
                collection.kind()
            ),
            Self::AlreadyAttached(item) => write!(f, "{} is already attached", item.kind()),
        }
    }
}

impl Error for DocumentError {}

#[derive(Debug, Clone)]
struct EntrySlot {
    entry: Entry,
    attached: bool,
}

#[derive(Debug, Clone)]
struct VariantSlot {
    variant: Variant,
    owner: Option<EntryKey>,
    attached: bool,
}

#[derive(Debug, Clone)]
struct TextLineSlot {
    line: TextLine,
    owner: Option<VariantKey>,
    attached: bool,
}

/// The localization dataset: ordered entries plus handle tables.
#[derive(Debug, Clone, Default)]
pub struct Document {
    order: Vec<EntryKey>,
    entries: HashMap<EntryKey, EntrySlot>,
    variants: HashMap<VariantKey, VariantSlot>,
    text_lines: HashMap<TextLineKey, TextLineSlot>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attached entries.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Attached entries in document order.
    pub fn entry_keys(&self) -> &[EntryKey] {
        &self.order
    }

    pub fn entry(&self, key: EntryKey) -> Option<&Entry> {
        self.entries.get(&key).map(|slot| &slot.entry)
    }

    pub fn entry_mut(&mut self, key: EntryKey) -> Option<&mut Entry> {
        self.entries.get_mut(&key).map(|slot| &mut slot.entry)
    }

    pub fn variant(&self, key: VariantKey) -> Option<&Variant> {
        self.variants.get(&key).map(|slot| &slot.variant)
    }

    pub fn variant_mut(&mut self, key: VariantKey) -> Option<&mut Variant> {
        self.variants.get_mut(&key).map(|slot| &mut slot.variant)
    }

    pub fn text_line(&self, key: TextLineKey) -> Option<&TextLine> {
        self.text_lines.get(&key).map(|slot| &slot.line)
    }

    pub fn text_line_mut(&mut self, key: TextLineKey) -> Option<&mut TextLine> {
        self.text_lines.get_mut(&key).map(|slot| &mut slot.line)
    }

    /// Returns whether a handle still resolves (attached or detached).
    pub fn resolves(&self, node: NodeKey) -> bool {
        match node {
            NodeKey::Entry(key) => self.entries.contains_key(&key),
            NodeKey::Variant(key) => self.variants.contains_key(&key),
            NodeKey::TextLine(key) => self.text_lines.contains_key(&key),
        }
    }

    /// Returns whether a node is currently present in some sequence.
    pub fn is_attached(&self, node: NodeKey) -> bool {
        match node {
            NodeKey::Entry(key) => self.entries.get(&key).is_some_and(|slot| slot.attached),
            NodeKey::Variant(key) => self.variants.get(&key).is_some_and(|slot| slot.attached),
            NodeKey::TextLine(key) => self.text_lines.get(&key).is_some_and(|slot| slot.attached),
        }
    }

    /// Attached text lines in document order (entry, then variant, then line).
    pub fn text_line_keys(&self) -> Vec<TextLineKey> {
        let mut keys = Vec::new();
        for entry_key in &self.order {
            let Some(entry) = self.entry(*entry_key) else {
                continue;
            };
            for variant_key in entry.variants() {
                if let Some(variant) = self.variant(*variant_key) {
                    keys.extend_from_slice(variant.text_lines());
                }
            }
        }
        keys
    }

    /* ------------------------- detached allocation ------------------------- */

    /// Stores an entry without attaching it; used before a tracked add.
    pub fn alloc_entry(&mut self, entry: Entry) -> EntryKey {
        let key = EntryKey::generate();
        self.entries.insert(
            key,
            EntrySlot {
                entry,
                attached: false,
            },
        );
        key
    }

    /// Stores a variant without attaching it; used before a tracked add.
    pub fn alloc_variant(&mut self, variant: Variant) -> VariantKey {
        let key = VariantKey::generate();
        self.variants.insert(
            key,
            VariantSlot {
                variant,
                owner: None,
                attached: false,
            },
        );
        key
    }

    /// Stores a text line without attaching it; used before a tracked add.
    pub fn alloc_text_line(&mut self, line: TextLine) -> TextLineKey {
        let key = TextLineKey::generate();
        self.text_lines.insert(
            key,
            TextLineSlot {
                line,
                owner: None,
                attached: false,
            },
        );
        key
    }

    /* --------------------------- raw construction -------------------------- */

    /// Appends an entry without undo tracking.
    pub fn push_entry(&mut self, entry: Entry) -> EntryKey {
        let key = self.alloc_entry(entry);
        self.order.push(key);
        if let Some(slot) = self.entries.get_mut(&key) {
            slot.attached = true;
        }
        key
    }

    /// Appends a variant to an entry without undo tracking.
    pub fn push_variant(
        &mut self,
        entry: EntryKey,
        variant: Variant,
    ) -> Result<VariantKey, DocumentError> {
        let collection = CollectionRef::Variants(entry);
        if !self.collection_exists(collection) {
            return Err(DocumentError::CollectionNotFound(collection));
        }
        let key = self.alloc_variant(variant);
        self.insert_into(collection, usize::MAX, key.into())?;
        Ok(key)
    }

    /// Appends a text line to a variant without undo tracking.
    pub fn push_text_line(
        &mut self,
        variant: VariantKey,
        line: TextLine,
    ) -> Result<TextLineKey, DocumentError> {
        let collection = CollectionRef::TextLines(variant);
        if !self.collection_exists(collection) {
            return Err(DocumentError::CollectionNotFound(collection));
        }
        let key = self.alloc_text_line(line);
        self.insert_into(collection, usize::MAX, key.into())?;
        Ok(key)
    }

    /* ----------------------------- raw removal ----------------------------- */

    /// Removes and purges an entry subtree without undo tracking.
    ///
    /// Returns the index the entry occupied. Callers holding a command stack
    /// must refresh it afterwards.
    pub fn remove_entry(&mut self, key: EntryKey) -> Option<usize> {
        let index = self.order.iter().position(|candidate| *candidate == key)?;
        self.order.remove(index);
        self.purge_entry(key);
        Some(index)
    }

    /// Removes and purges the entry at `index` without undo tracking.
    pub fn remove_entry_at(&mut self, index: usize) -> Option<EntryKey> {
        let key = *self.order.get(index)?;
        self.order.remove(index);
        self.purge_entry(key);
        Some(key)
    }

    /// Removes and purges a variant subtree without undo tracking.
    pub fn remove_variant(&mut self, key: VariantKey) -> Option<usize> {
        let owner = self.variants.get(&key).filter(|slot| slot.attached)?.owner?;
        let index = self.detach_from(CollectionRef::Variants(owner), key.into())?;
        self.purge_variant(key);
        Some(index)
    }

    /// Removes and purges a text line without undo tracking.
    pub fn remove_text_line(&mut self, key: TextLineKey) -> Option<usize> {
        let owner = self
            .text_lines
            .get(&key)
            .filter(|slot| slot.attached)?
            .owner?;
        let index = self.detach_from(CollectionRef::TextLines(owner), key.into())?;
        self.text_lines.remove(&key);
        Some(index)
    }

    /// Moves every text line of `from` to the end of `to`, without tracking.
    ///
    /// Returns the number of moved lines.
    pub fn move_text_lines(
        &mut self,
        from: VariantKey,
        to: VariantKey,
    ) -> Result<usize, DocumentError> {
        if !self.variants.contains_key(&to) {
            return Err(DocumentError::CollectionNotFound(CollectionRef::TextLines(
                to,
            )));
        }
        let moved = match self.variants.get_mut(&from) {
            Some(slot) => std::mem::take(&mut slot.variant.text_lines),
            None => {
                return Err(DocumentError::CollectionNotFound(
                    CollectionRef::TextLines(from),
                ))
            }
        };
        for line in &moved {
            if let Some(slot) = self.text_lines.get_mut(line) {
                slot.owner = Some(to);
            }
        }
        let count = moved.len();
        if let Some(slot) = self.variants.get_mut(&to) {
            slot.variant.text_lines.extend(moved);
        }
        Ok(count)
    }

    /// Purges detached `candidates` whose subtree holds no node `keep` accepts.
    ///
    /// Attached candidates and candidates that no longer resolve are skipped.
    /// Returns the number of purged subtrees.
    pub fn purge_detached(
        &mut self,
        candidates: impl IntoIterator<Item = NodeKey>,
        keep: impl Fn(NodeKey) -> bool,
    ) -> usize {
        let mut purged = 0;
        for node in candidates {
            if !self.resolves(node) || self.is_attached(node) {
                continue;
            }
            if self.subtree(node).into_iter().any(&keep) {
                continue;
            }
            match node {
                NodeKey::Entry(key) => self.purge_entry(key),
                NodeKey::Variant(key) => self.purge_variant(key),
                NodeKey::TextLine(key) => {
                    self.text_lines.remove(&key);
                }
            }
            purged += 1;
        }
        purged
    }

    /// Drops every node and returns an empty document.
    pub fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
        self.variants.clear();
        self.text_lines.clear();
    }

    /* ------------------------ collection primitives ------------------------ */

    /// Returns whether the collection's owner resolves.
    pub fn collection_exists(&self, collection: CollectionRef) -> bool {
        match collection {
            CollectionRef::Entries => true,
            CollectionRef::Variants(owner) => self.entries.contains_key(&owner),
            CollectionRef::TextLines(owner) => self.variants.contains_key(&owner),
        }
    }

    /// Number of items in a collection; `None` when it does not exist.
    pub fn collection_len(&self, collection: CollectionRef) -> Option<usize> {
        match collection {
            CollectionRef::Entries => Some(self.order.len()),
            CollectionRef::Variants(owner) => self.entry(owner).map(|e| e.variants.len()),
            CollectionRef::TextLines(owner) => self.variant(owner).map(|v| v.text_lines.len()),
        }
    }

    /// Item at `index` of a collection.
    pub fn collection_item(&self, collection: CollectionRef, index: usize) -> Option<NodeKey> {
        match collection {
            CollectionRef::Entries => self.order.get(index).map(|key| (*key).into()),
            CollectionRef::Variants(owner) => self
                .entry(owner)?
                .variants
                .get(index)
                .map(|key| (*key).into()),
            CollectionRef::TextLines(owner) => self
                .variant(owner)?
                .text_lines
                .get(index)
                .map(|key| (*key).into()),
        }
    }

    /// Index of `item` inside `collection`.
    pub fn position_in(&self, collection: CollectionRef, item: NodeKey) -> Option<usize> {
        match (collection, item) {
            (CollectionRef::Entries, NodeKey::Entry(key)) => {
                self.order.iter().position(|candidate| *candidate == key)
            }
            (CollectionRef::Variants(owner), NodeKey::Variant(key)) => self
                .entry(owner)?
                .variants
                .iter()
                .position(|candidate| *candidate == key),
            (CollectionRef::TextLines(owner), NodeKey::TextLine(key)) => self
                .variant(owner)?
                .text_lines
                .iter()
                .position(|candidate| *candidate == key),
            _ => None,
        }
    }

    /// Returns whether `collection` currently holds `item`.
    pub fn collection_contains(&self, collection: CollectionRef, item: NodeKey) -> bool {
        self.position_in(collection, item).is_some()
    }

    /// Inserts a detached node at `index`; an out-of-range index appends.
    ///
    /// Returns the index the node ended up at.
    pub(crate) fn insert_into(
        &mut self,
        collection: CollectionRef,
        index: usize,
        item: NodeKey,
    ) -> Result<usize, DocumentError> {
        let len = self
            .collection_len(collection)
            .ok_or(DocumentError::CollectionNotFound(collection))?;
        if !self.resolves(item) {
            return Err(DocumentError::NodeNotFound(item));
        }
        if self.is_attached(item) {
            return Err(DocumentError::AlreadyAttached(item));
        }
        let at = index.min(len);

        match (collection, item) {
            (CollectionRef::Entries, NodeKey::Entry(key)) => {
                self.order.insert(at, key);
                if let Some(slot) = self.entries.get_mut(&key) {
                    slot.attached = true;
                }
            }
            (CollectionRef::Variants(owner), NodeKey::Variant(key)) => {
                if let Some(slot) = self.entries.get_mut(&owner) {
                    slot.entry.variants.insert(at, key);
                }
                if let Some(slot) = self.variants.get_mut(&key) {
                    slot.owner = Some(owner);
                    slot.attached = true;
                }
            }
            (CollectionRef::TextLines(owner), NodeKey::TextLine(key)) => {
                if let Some(slot) = self.variants.get_mut(&owner) {
                    slot.variant.text_lines.insert(at, key);
                }
                if let Some(slot) = self.text_lines.get_mut(&key) {
                    slot.owner = Some(owner);
                    slot.attached = true;
                }
            }
            _ => return Err(DocumentError::KindMismatch { collection, item }),
        }
        Ok(at)
    }

    /// Detaches `item` from `collection`, keeping it in its table.
    ///
    /// Returns the index it occupied.
    pub(crate) fn detach_from(
        &mut self,
        collection: CollectionRef,
        item: NodeKey,
    ) -> Option<usize> {
        let index = self.position_in(collection, item)?;
        self.detach_at(collection, index)?;
        Some(index)
    }

    /// Detaches the item at `index`, keeping it in its table.
    pub(crate) fn detach_at(&mut self, collection: CollectionRef, index: usize) -> Option<NodeKey> {
        let item = self.collection_item(collection, index)?;
        match (collection, item) {
            (CollectionRef::Entries, NodeKey::Entry(key)) => {
                self.order.remove(index);
                if let Some(slot) = self.entries.get_mut(&key) {
                    slot.attached = false;
                }
            }
            (CollectionRef::Variants(owner), NodeKey::Variant(key)) => {
                if let Some(slot) = self.entries.get_mut(&owner) {
                    slot.entry.variants.remove(index);
                }
                if let Some(slot) = self.variants.get_mut(&key) {
                    slot.attached = false;
                }
            }
            (CollectionRef::TextLines(owner), NodeKey::TextLine(key)) => {
                if let Some(slot) = self.variants.get_mut(&owner) {
                    slot.variant.text_lines.remove(index);
                }
                if let Some(slot) = self.text_lines.get_mut(&key) {
                    slot.attached = false;
                }
            }
            _ => return None,
        }
        Some(item)
    }

    /// `node` plus every node owned below it, detached children included.
    fn subtree(&self, node: NodeKey) -> Vec<NodeKey> {
        let mut nodes = vec![node];
        let variants: Vec<VariantKey> = match node {
            NodeKey::Entry(key) => self
                .variants
                .iter()
                .filter(|(_, slot)| slot.owner == Some(key))
                .map(|(variant_key, _)| *variant_key)
                .collect(),
            NodeKey::Variant(key) => vec![key],
            NodeKey::TextLine(_) => return nodes,
        };
        for variant_key in variants {
            if NodeKey::Variant(variant_key) != node {
                nodes.push(variant_key.into());
            }
            nodes.extend(
                self.text_lines
                    .iter()
                    .filter(|(_, slot)| slot.owner == Some(variant_key))
                    .map(|(line_key, _)| NodeKey::TextLine(*line_key)),
            );
        }
        nodes
    }

    fn purge_entry(&mut self, key: EntryKey) {
        self.entries.remove(&key);
        let owned: Vec<VariantKey> = self
            .variants
            .iter()
            .filter(|(_, slot)| slot.owner == Some(key))
            .map(|(variant_key, _)| *variant_key)
            .collect();
        for variant_key in owned {
            self.purge_variant(variant_key);
        }
    }

    fn purge_variant(&mut self, key: VariantKey) {
        self.variants.remove(&key);
        self.text_lines.retain(|_, slot| slot.owner != Some(key));
    }
}
