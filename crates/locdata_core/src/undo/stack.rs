//! Command history with a single undo/redo cursor.
//!
//! # Responsibility
//! - Keep commands in push order and replay them against a `Document`.
//! - Link edits to the Add/Remove command their target depends on.
//! - Purge commands whose handles no longer resolve.
//!
//! # Invariants
//! - `[0, cursor)` is undoable, `[cursor, len)` is redoable.
//! - Pushing truncates everything at or after the cursor.
//! - Stale commands are removed, never executed.
//! - Detached nodes referenced only by dropped commands are freed by
//!   `release_dropped`.
//! - Undo with nothing to undo and redo with nothing to redo panic.
//!
//! ```text
//! push(c4)            [c1 c2 c3 c4 | ]
//! undo x2             [c1 c2 | c3 c4]
//! push(c5)            [c1 c2 c5 | ]
//! ```

use crate::model::document::Document;
use crate::model::entry::NodeKey;
use crate::undo::command::{Command, CommandId, CommandKind};
use log::{debug, info};
use std::collections::HashSet;
use std::fmt;

/// Callback fired when undo or redo availability may have changed.
pub type Notifier = Box<dyn FnMut()>;

/// Result of one undo/redo step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The command's mutation was replayed.
    Applied,
    /// The command was stale and has been dropped from history.
    Discarded,
}

struct Slot {
    id: CommandId,
    command: Command,
}

/// Ordered command history.
pub struct CommandStack {
    slots: Vec<Slot>,
    cursor: usize,
    next_id: u64,
    dropped_nodes: Vec<NodeKey>,
    on_undo_changed: Option<Notifier>,
    on_redo_changed: Option<Notifier>,
}

impl fmt::Debug for CommandStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandStack")
            .field("undo_count", &self.undo_count())
            .field("redo_count", &self.redo_count())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl Default for CommandStack {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandStack {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            cursor: 0,
            next_id: 0,
            dropped_nodes: Vec::new(),
            on_undo_changed: None,
            on_redo_changed: None,
        }
    }

    /// Creates a stack that reports availability changes to observers.
    pub fn with_notifiers(on_undo_changed: Notifier, on_redo_changed: Notifier) -> Self {
        Self {
            on_undo_changed: Some(on_undo_changed),
            on_redo_changed: Some(on_redo_changed),
            ..Self::new()
        }
    }

    pub fn undo_count(&self) -> usize {
        self.cursor
    }

    pub fn redo_count(&self) -> usize {
        self.slots.len() - self.cursor
    }

    pub fn can_undo(&self) -> bool {
        self.undo_count() > 0
    }

    pub fn can_redo(&self) -> bool {
        self.redo_count() > 0
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Looks up a command still in history.
    pub fn get(&self, id: CommandId) -> Option<&Command> {
        self.slots
            .iter()
            .find(|slot| slot.id == id)
            .map(|slot| &slot.command)
    }

    /// Commands in push order with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (CommandId, &Command)> + '_ {
        self.slots.iter().map(|slot| (slot.id, &slot.command))
    }

    /// Records an already-applied command.
    ///
    /// Discards the redo range. An edit whose target is also the target of an
    /// earlier Add/Remove command is linked to the most recent such command.
    pub fn push(&mut self, mut command: Command) -> CommandId {
        let cut: Vec<Slot> = self.slots.drain(self.cursor..).collect();
        for slot in &cut {
            self.forget(&slot.command);
        }

        if let CommandKind::Edit(edit) = command.kind() {
            let target = edit.target;
            let anchor = self
                .slots
                .iter()
                .rev()
                .find(|slot| slot.command.is_structural() && slot.command.target() == target)
                .map(|slot| slot.id);
            if let Some(anchor) = anchor {
                command.set_rely_on(anchor);
            }
        }

        let id = CommandId(self.next_id);
        self.next_id += 1;
        self.slots.push(Slot { id, command });
        self.cursor += 1;
        self.notify();
        id
    }

    /// Reverts the most recent undoable command.
    ///
    /// # Panics
    /// Panics when `undo_count() == 0`.
    pub fn undo(&mut self, doc: &mut Document) -> StepOutcome {
        assert!(self.cursor > 0, "undo called with nothing to undo");
        self.cursor -= 1;
        let outcome = if self.is_live(self.cursor, doc) {
            self.slots[self.cursor].command.undo(doc);
            StepOutcome::Applied
        } else {
            let slot = self.slots.remove(self.cursor);
            self.forget(&slot.command);
            debug!(
                "event=undo module=undo status=discarded target={} reason=stale",
                slot.command.target().kind()
            );
            StepOutcome::Discarded
        };
        self.notify();
        outcome
    }

    /// Re-applies the oldest redoable command.
    ///
    /// # Panics
    /// Panics when `redo_count() == 0`.
    pub fn redo(&mut self, doc: &mut Document) -> StepOutcome {
        assert!(
            self.cursor < self.slots.len(),
            "redo called with nothing to redo"
        );
        let outcome = if self.is_live(self.cursor, doc) {
            self.slots[self.cursor].command.redo(doc);
            self.cursor += 1;
            StepOutcome::Applied
        } else {
            let slot = self.slots.remove(self.cursor);
            self.forget(&slot.command);
            debug!(
                "event=redo module=undo status=discarded target={} reason=stale",
                slot.command.target().kind()
            );
            StepOutcome::Discarded
        };
        self.notify();
        outcome
    }

    /// Drops every command whose handles no longer resolve.
    ///
    /// Call after any document mutation that bypassed tracking. Add/Remove
    /// commands are checked first because edit liveness depends on them.
    /// Returns the number of purged commands.
    pub fn refresh(&mut self, doc: &Document) -> usize {
        let before = self.slots.len();
        self.purge_where(doc, Command::is_structural);
        self.purge_where(doc, |command| !command.is_structural());
        let purged = before - self.slots.len();

        if purged > 0 {
            info!(
                "event=refresh module=undo status=ok purged={} undo_count={} redo_count={}",
                purged,
                self.undo_count(),
                self.redo_count()
            );
            self.notify();
        }
        purged
    }

    /// Forgets the whole history.
    pub fn clear(&mut self) {
        let had_history = !self.slots.is_empty();
        let dropped: Vec<Slot> = self.slots.drain(..).collect();
        for slot in &dropped {
            self.forget(&slot.command);
        }
        self.cursor = 0;
        if had_history {
            self.notify();
        }
    }

    /// Frees detached nodes that only dropped commands referred to.
    ///
    /// A node stays when a command still in history references it or any node
    /// below it. Call after `push`, `clear` or `refresh` with the document the
    /// history replays against. Returns the number of purged subtrees.
    pub fn release_dropped(&mut self, doc: &mut Document) -> usize {
        if self.dropped_nodes.is_empty() {
            return 0;
        }
        let referenced: HashSet<NodeKey> = self
            .slots
            .iter()
            .flat_map(|slot| slot.command.referenced_nodes())
            .collect();
        let candidates = std::mem::take(&mut self.dropped_nodes);
        let purged = doc.purge_detached(candidates, |node| referenced.contains(&node));
        if purged > 0 {
            debug!("event=release module=undo status=ok purged={}", purged);
        }
        purged
    }

    fn forget(&mut self, command: &Command) {
        self.dropped_nodes.extend(command.referenced_nodes());
    }

    fn purge_where(&mut self, doc: &Document, select: impl Fn(&Command) -> bool) {
        let mut index = 0;
        while index < self.slots.len() {
            if select(&self.slots[index].command) && !self.is_live(index, doc) {
                let slot = self.slots.remove(index);
                self.forget(&slot.command);
                if index < self.cursor {
                    self.cursor -= 1;
                }
            } else {
                index += 1;
            }
        }
    }

    /// Liveness including the edit dependency link.
    fn is_live(&self, index: usize, doc: &Document) -> bool {
        let command = &self.slots[index].command;
        if !command.is_live(doc) {
            return false;
        }
        match command.kind() {
            CommandKind::Edit(edit) => match edit.rely_on() {
                Some(anchor) => self
                    .slots
                    .iter()
                    .position(|slot| slot.id == anchor)
                    .is_some_and(|anchor_index| self.is_live(anchor_index, doc)),
                None => true,
            },
            CommandKind::Add(_) | CommandKind::Remove(_) => true,
        }
    }

    fn notify(&mut self) {
        if let Some(callback) = self.on_undo_changed.as_mut() {
            callback();
        }
        if let Some(callback) = self.on_redo_changed.as_mut() {
            callback();
        }
    }
}
