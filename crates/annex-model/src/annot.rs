//! Annotation sort keys and span relations.
//!
//! The per-view sorted index does not store records; it stores these keys,
//! extracted once when a record is indexed. Comparing two keys never
//! re-enters the record arena.

use crate::fs::FsId;
use annex_index::TotalOrder;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sort key for one indexed annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotKey {
    pub begin: i32,
    pub end: i32,
    /// Dense type code; registration order is the type-priority order.
    pub type_code: u32,
    pub id: FsId,
}

impl AnnotKey {
    /// Span containment: `[begin, end)` of `other` lies inside ours.
    pub fn covers(&self, other: &AnnotKey) -> bool {
        self.begin <= other.begin && other.end <= self.end
    }

    /// Our span ends at or before `other` starts.
    pub fn precedes(&self, other: &AnnotKey) -> bool {
        self.end <= other.begin
    }

    /// Our span starts at or after `other` ends.
    pub fn follows(&self, other: &AnnotKey) -> bool {
        self.begin >= other.end
    }

    pub fn overlaps(&self, other: &AnnotKey) -> bool {
        self.begin < other.end && other.begin < self.end
    }

    /// Key order: begin ascending, end descending (wider first), then
    /// type priority.
    pub fn cmp_span_and_type(&self, other: &AnnotKey) -> Ordering {
        self.begin
            .cmp(&other.begin)
            .then(other.end.cmp(&self.end))
            .then(self.type_code.cmp(&other.type_code))
    }

    /// Key order without the type tie-break.
    pub fn cmp_span(&self, other: &AnnotKey) -> Ordering {
        self.begin.cmp(&other.begin).then(other.end.cmp(&self.end))
    }
}

/// Comparator pair for annotation indexes.
///
/// With-identity refines the key order with the record id, producing the
/// total order the backing array is sorted by.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotOrder;

impl TotalOrder<AnnotKey> for AnnotOrder {
    fn cmp_with_id(&self, a: &AnnotKey, b: &AnnotKey) -> Ordering {
        a.cmp_span_and_type(b).then(a.id.cmp(&b.id))
    }

    fn cmp_key(&self, a: &AnnotKey, b: &AnnotKey) -> Ordering {
        a.cmp_span_and_type(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(begin: i32, end: i32, id: u32) -> AnnotKey {
        AnnotKey {
            begin,
            end,
            type_code: 1,
            id: FsId(id),
        }
    }

    #[test]
    fn wider_spans_sort_first_at_equal_begin() {
        let order = AnnotOrder;
        let wide = key(0, 10, 1);
        let narrow = key(0, 5, 2);
        assert_eq!(order.cmp_with_id(&wide, &narrow), Ordering::Less);
    }

    #[test]
    fn identity_breaks_full_key_ties() {
        let order = AnnotOrder;
        let a = key(3, 7, 1);
        let b = key(3, 7, 2);
        assert_eq!(order.cmp_key(&a, &b), Ordering::Equal);
        assert_eq!(order.cmp_with_id(&a, &b), Ordering::Less);
    }

    #[test]
    fn span_relations() {
        let outer = key(0, 10, 1);
        let inner = key(2, 8, 2);
        let after = key(10, 12, 3);
        assert!(outer.covers(&inner));
        assert!(!inner.covers(&outer));
        assert!(outer.precedes(&after));
        assert!(after.follows(&outer));
        assert!(outer.overlaps(&inner));
        assert!(!outer.overlaps(&after), "half-open spans: end == begin");
    }
}
