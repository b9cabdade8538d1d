//! Undo/redo engine.
//!
//! # Responsibility
//! - Model every document mutation as a reversible `Command`.
//! - Keep history in a `CommandStack` with one cursor.
//! - Offer tracked collection/field edits that push commands as a side effect.
//!
//! # Invariants
//! - Commands reference document nodes by handle only.
//! - After any untracked structural edit, `CommandStack::refresh` must run
//!   before the next undo/redo.

pub mod command;
pub mod stack;
pub mod tracked;
