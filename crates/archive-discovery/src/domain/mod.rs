//! # Domain Module
//!
//! Core domain types for archive discovery: candidates, probe results, the
//! dedup/stats ledger, and the invariants binding them.

pub mod entities;
pub mod errors;
pub mod invariants;
pub mod ledger;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use ledger::Ledger;
pub use value_objects::*;
