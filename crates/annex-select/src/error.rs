//! Error types for selection.

use annex_index::IndexError;
use annex_model::ModelError;

/// Errors raised while building or running a selection.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SelectError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Index(#[from] IndexError),

    /// A single-result accessor found nothing and `null_ok` was not set.
    #[error("selection is empty and null_ok was not requested")]
    EmptyOrNull,

    /// A `single*` accessor found more than one element after positioning.
    #[error("selection produced {0} elements where at most one was expected")]
    TooManyResults(usize),
}
