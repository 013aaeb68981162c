//! Domain layer containing the intake model and its rules.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (identifiers, timestamps, errors)
//! - `intake` - Field schema, session aggregate, merge rules, rendered texts

pub mod foundation;
pub mod intake;
