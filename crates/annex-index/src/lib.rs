//! # Annex Index
//!
//! The index containers behind annex: an ordered, comparator-driven set
//! with tombstone removal and batched lazy merge, plus a compact
//! positive-integer set for auxiliary bookkeeping.
//!
//! This crate is **element-agnostic**: it does not prescribe what indexed
//! records are. It only prescribes how they must compare, through the
//! [`TotalOrder`] comparator pair.
//!
//! ## Architecture
//!
//! ```text
//! TotalOrder<T>        ← with-identity / without-identity comparator pair
//!     │
//! OrderedFsSet<T, C>   ← tombstone array, fast append, batched merge
//!     │
//! SubSet<'_, T, C>     ← read-only windowed views
//!
//! PositiveIntSet       ← offset-addressable bit-vector set
//! ```

pub mod cmp;
pub mod error;
pub mod int_set;
pub mod ordered_set;

pub use cmp::{IndexKind, NaturalOrder, TotalOrder};
pub use error::IndexError;
pub use int_set::PositiveIntSet;
pub use ordered_set::{OrderedFsSet, SetIter, SubSet};
