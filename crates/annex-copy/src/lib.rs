//! Cross-graph deep copy for annex record graphs.
//!
//! A [`CasCopier`] walks a source graph and recreates its records against
//! a destination graph, possibly built over a different type system.
//! Types and features are matched by name; what happens on a mismatch is
//! the construction-time [`CopyMode`]:
//!
//! ```text
//!   copy_cas ──────┐
//!   copy_cas_view ─┼──▶ shell pass ──▶ identity map ──▶ feature pass
//!   copy_fs ───────┘        │               ▲                │
//!                           └── worklist ◀──┴── references ──┘
//! ```
//!
//! The per-view subject-of-analysis record and the whole-document
//! annotation are never cloned; they resolve to (or overwrite) the
//! destination view's own instances.

mod copier;
mod error;

pub use copier::{CasCopier, CopyMode};
pub use error::CopyError;
