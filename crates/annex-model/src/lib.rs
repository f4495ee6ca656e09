//! # Annex Model
//!
//! The record model annex indexes and copies: committed type systems,
//! arena-owned feature structures, views, and per-view annotation
//! indexes.
//!
//! ## Architecture
//!
//! ```text
//! TypeSystem            ← subtype hierarchy + feature declarations,
//!     │                   open during assembly, frozen by commit()
//! Cas                   ← one record graph: arena + named views
//!     │
//! View                  ← sorted annotation index + bag + singletons
//!     │
//! AnnotKey / AnnotOrder ← pre-extracted sort keys for the index
//! ```
//!
//! A record is owned by exactly one [`Cas`]; reference slots store
//! [`FsRef`] handles that carry the owning graph's id, so cross-graph
//! stores fail at the assignment.

pub mod annot;
pub mod cas;
pub mod error;
pub mod fs;
pub mod typesystem;
pub mod value;

pub use annot::{AnnotKey, AnnotOrder};
pub use cas::{Cas, INITIAL_VIEW, View};
pub use error::ModelError;
pub use fs::{FeatureStructure, FsId, FsRef};
pub use typesystem::{
    ANNOTATION_TYPE, BuiltinFeatures, BuiltinTypes, DOCUMENT_ANNOTATION_TYPE, FeatureId, SOFA_TYPE,
    TOP_TYPE, TypeId, TypeSystem,
};
pub use value::{FeatureValue, ValueKind};
