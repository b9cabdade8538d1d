//! Core use-case services.
//!
//! # Responsibility
//! - Run integrity scan/heal over a document.
//! - Coordinate an editing session: tracked edits, history, translation.
//!
//! # See also
//! - `undo` for the command engine these services drive.

pub mod editor_service;
pub mod integrity_service;
