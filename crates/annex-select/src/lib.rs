//! # Annex Select
//!
//! The fluent query surface over annex annotation indexes.
//!
//! A selection accumulates option flags and at most one positioning
//! operator, then runs through a terminal accessor:
//!
//! ```text
//! select(&cas, view)        ← bind a graph and view
//!     .of_type(token)       ← restrict by type (and subtypes)
//!     .covered_by(0, 40)    ← position by span relationship
//!     .non_overlapping()    ← option flags, all default off
//!     .as_list()?           ← terminal: list / iterator / get / single
//! ```
//!
//! Single-result accessors report an empty selection as
//! [`SelectError::EmptyOrNull`] unless `null_ok` was requested, and more
//! than one element as [`SelectError::TooManyResults`].

pub mod error;
pub mod select;

pub use error::SelectError;
pub use select::{SelectFs, select};
