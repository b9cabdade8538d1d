//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the whole-document persistence contract.
//! - Keep the file format out of services and the model.
//!
//! # Invariants
//! - Repository loads return a complete document or an error.

pub mod document_repo;
