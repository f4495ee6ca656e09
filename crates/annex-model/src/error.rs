//! Error types for the record model.

use crate::fs::FsId;
use crate::value::ValueKind;

/// Errors raised by type-system assembly and record-graph operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// The type system was committed and can no longer be extended.
    #[error("type system is frozen; cannot add {0}")]
    Frozen(String),

    /// A graph requires a committed type system.
    #[error("type system is not committed")]
    NotCommitted,

    #[error("unknown type: {0}")]
    UnknownType(String),

    #[error("duplicate type: {0}")]
    DuplicateType(String),

    #[error("unknown feature: {0}")]
    UnknownFeature(String),

    #[error("feature {feature} expects {expected:?}, got {given:?}")]
    ValueKindMismatch {
        feature: String,
        expected: ValueKind,
        given: ValueKind,
    },

    /// A record from one graph was stored into a field of another graph
    /// without being copied.
    #[error("record {id} belongs to graph {found}, not graph {expected}")]
    CrossGraphReference { id: FsId, found: u32, expected: u32 },

    #[error("unknown view: {0}")]
    UnknownView(String),

    #[error("view already exists: {0}")]
    DuplicateView(String),

    #[error("no such record: {0}")]
    UnknownRecord(FsId),

    #[error("record {0} is not an annotation")]
    NotAnnotation(FsId),

    /// A lexical value could not be parsed into the target kind.
    #[error("cannot parse {text:?} as {kind:?}")]
    Lexical { text: String, kind: ValueKind },
}
