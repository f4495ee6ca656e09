//! Feature structures and their identities.

use crate::typesystem::TypeId;
use crate::value::FeatureValue;
use serde::{Deserialize, Serialize};

/// Dense, graph-local record identifier.
///
/// Ids are allocated in creation order, which makes them usable as the
/// final identity tie-break in index comparators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FsId(pub u32);

impl std::fmt::Display for FsId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fs#{}", self.0)
    }
}

/// A record handle that remembers which graph owns the record.
///
/// Reference-valued slots store these, so storing a record from graph A
/// into a field of graph B is detectable at the point of violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsRef {
    pub graph: u32,
    pub id: FsId,
}

impl std::fmt::Display for FsRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g{}/{}", self.graph, self.id)
    }
}

/// A typed record: an instance of a committed type with one slot per
/// declared (and inherited) feature.
///
/// Owned by exactly one graph; the arena in [`crate::cas::Cas`] is the
/// only place these live.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureStructure {
    pub id: FsId,
    pub type_id: TypeId,
    pub(crate) slots: Vec<FeatureValue>,
}

impl FeatureStructure {
    pub(crate) fn new(id: FsId, type_id: TypeId, slots: Vec<FeatureValue>) -> Self {
        Self { id, type_id, slots }
    }

    pub fn slot(&self, index: usize) -> Option<&FeatureValue> {
        self.slots.get(index)
    }
}
