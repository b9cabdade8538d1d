//! Language detection and translation boundary.
//!
//! # Responsibility
//! - Define the service contract used by the integrity engine.
//! - Adapt raw cloud clients to that contract.
//!
//! # See also
//! - docs in `config` for the settings consumed by the adapter.

pub mod adapter;
pub mod service;
