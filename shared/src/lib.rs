//! Shared domain types for the Hospital Supply Tracking Platform
//!
//! This crate contains the pure, I/O-free parts of the inventory core:
//! tracking modes, the per-item lifecycle state machine, barcode resolution,
//! and validation helpers. The backend builds its persistent services on top
//! of these types.

pub mod resolution;
pub mod types;
pub mod validation;

pub use resolution::*;
pub use types::*;
pub use validation::*;
