//! The comparator seam between the index containers and the record model.
//!
//! Every ordered index carries two comparators over its elements:
//! *with-identity* breaks ties by record identity and yields the total
//! order the backing array is sorted by; *without-identity* compares keys
//! only and decides "logical" equality. The first must refine the second:
//! elements equal with identity are equal without it.

use std::cmp::Ordering;

/// Comparator pair for an ordered index.
///
/// Implementations are plain values owned by the index; they must be
/// consistent for the lifetime of the index (comparing the same two
/// elements always yields the same ordering).
pub trait TotalOrder<T> {
    /// Total order including record identity as the final tie-break.
    fn cmp_with_id(&self, a: &T, b: &T) -> Ordering;

    /// Key-only order, ignoring which concrete instance occupies a slot.
    fn cmp_key(&self, a: &T, b: &T) -> Ordering;
}

/// Dedup policy of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    /// Key duplicates allowed; distinct instances with equal keys coexist.
    Sorted,
    /// At most one element per without-identity key.
    Set,
    /// No ordering, no dedup. Bag indexes do not use `OrderedFsSet`.
    Bag,
}

/// Comparator over elements that already are totally ordered.
///
/// Used where the element is its own key, e.g. integer elements in tests
/// or pre-extracted sort keys whose `Ord` includes identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaturalOrder;

impl<T: Ord> TotalOrder<T> for NaturalOrder {
    fn cmp_with_id(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }

    fn cmp_key(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}
