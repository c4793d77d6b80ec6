//! Domain Layer - Core types and business logic.
//!
//! This layer contains the pure domain types for the bridge
//! with no external dependencies beyond serialization support.

/// OCC option symbol codec.
pub mod occ;

/// Trading position model.
pub mod position;
