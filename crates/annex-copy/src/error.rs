//! Error types for cross-graph copying.

use annex_index::IndexError;
use annex_model::{ModelError, ValueKind};

/// Errors raised while copying records between graphs.
///
/// The mismatch variants only surface in strict mode; a lenient copier
/// downgrades them to silent skips.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CopyError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Index(#[from] IndexError),

    /// The destination type system has no type of this name.
    #[error("destination type system has no type named {0}")]
    MissingType(String),

    /// The destination's same-named type lacks this feature.
    #[error("destination type {ty} has no feature named {feature}")]
    MissingFeature { ty: String, feature: String },

    /// The same-named feature ranges over a different kind in the
    /// destination and the value has no lexical form to transfer through.
    #[error("feature {feature} ranges over {expected:?} in the destination, source holds {given:?}")]
    RangeMismatch {
        feature: String,
        expected: ValueKind,
        given: ValueKind,
    },
}
