//! Document model for the localization dataset.
//!
//! # Responsibility
//! - Define entries, variants and text lines as plain mutable records.
//! - Own them in an arena so other layers hold handles, never references.
//!
//! # Invariants
//! - Every node is identified by a stable handle that stops resolving once
//!   the node is purged.
//! - Field validity is tracked per field as a `FieldStatus` pair.

pub mod document;
pub mod entry;
pub mod language;
