//! The selection builder.
//!
//! A [`SelectFs`] accumulates option flags and at most one positioning
//! operator, then a terminal accessor runs the query against the view's
//! sorted annotation index. Options all default to off; a positioning
//! operator replaces any earlier one.

use crate::error::SelectError;
use annex_index::TotalOrder;
use annex_model::{AnnotKey, AnnotOrder, Cas, FsId, TypeId};

/// How a bound annotation is named: by record, or as a bare span.
///
/// Only record-named bounds are ever skipped from their own results.
#[derive(Debug, Clone, Copy)]
enum Bound {
    Fs(FsId),
    Span(i32, i32),
}

#[derive(Debug, Clone, Copy)]
enum Position {
    None,
    StartAt(Bound),
    At(Bound),
    CoveredBy(Bound),
    Covering(Bound),
    Between(FsId, FsId),
    Following(Bound),
    Preceding(Bound),
}

/// Fluent selection over one view (or all views) of a graph.
#[derive(Clone)]
pub struct SelectFs<'a> {
    cas: &'a Cas,
    view: &'a str,
    ty: Option<TypeId>,
    position: Position,
    shift: i32,
    type_priority: bool,
    position_uses_type: bool,
    non_overlapping: bool,
    include_end_beyond_bounds: bool,
    use_annotation_equals: bool,
    all_views: bool,
    null_ok: bool,
    order_not_needed: bool,
    backwards: bool,
}

/// Start a selection over one view of `cas`.
pub fn select<'a>(cas: &'a Cas, view: &'a str) -> SelectFs<'a> {
    SelectFs {
        cas,
        view,
        ty: None,
        position: Position::None,
        shift: 0,
        type_priority: false,
        position_uses_type: false,
        non_overlapping: false,
        include_end_beyond_bounds: false,
        use_annotation_equals: false,
        all_views: false,
        null_ok: false,
        order_not_needed: false,
        backwards: false,
    }
}

impl<'a> SelectFs<'a> {
    /// Restrict to annotations of `ty` and its subtypes.
    pub fn of_type(mut self, ty: TypeId) -> Self {
        self.ty = Some(ty);
        self
    }

    // ----- option flags (all default off) -----

    /// Include type-hierarchy order as a tie-break when positioning.
    pub fn type_priority(mut self) -> Self {
        self.type_priority = true;
        self
    }

    /// After positioning to an equal key, require type equality too.
    pub fn position_uses_type(mut self) -> Self {
        self.position_uses_type = true;
        self
    }

    /// Suppress annotations overlapping a previously yielded one.
    pub fn non_overlapping(mut self) -> Self {
        self.non_overlapping = true;
        self
    }

    /// For `covered_by`, keep annotations extending past the bound's end.
    pub fn include_annotations_with_end_beyond_bounds(mut self) -> Self {
        self.include_end_beyond_bounds = true;
        self
    }

    /// For `covered_by`/`covering`, skip annotations equal to the bound
    /// by value instead of by identity.
    pub fn use_annotation_equals(mut self) -> Self {
        self.use_annotation_equals = true;
        self
    }

    /// Extend the selection across every view of the graph.
    pub fn all_views(mut self) -> Self {
        self.all_views = true;
        self
    }

    /// Let single-result accessors return `None` instead of erroring on
    /// an empty selection.
    pub fn null_ok(mut self) -> Self {
        self.null_ok = true;
        self
    }

    /// Permit unordered traversal (indexing order) for plain iteration.
    pub fn order_not_needed(mut self) -> Self {
        self.order_not_needed = true;
        self
    }

    /// Reverse iteration direction. Does not compose: calling it twice
    /// still yields reverse order.
    pub fn backwards(mut self) -> Self {
        self.backwards = true;
        self
    }

    // ----- positioning operators -----

    /// Skip `n` elements after positioning (negative: back up).
    pub fn shifted(mut self, n: i32) -> Self {
        self.shift = n;
        self
    }

    /// Start iteration at the first annotation at or after this span.
    pub fn start_at(mut self, begin: i32, end: i32) -> Self {
        self.position = Position::StartAt(Bound::Span(begin, end));
        self
    }

    /// Start iteration at the position of a record.
    pub fn start_at_fs(mut self, id: FsId) -> Self {
        self.position = Position::StartAt(Bound::Fs(id));
        self
    }

    /// Exact span match.
    pub fn at(mut self, begin: i32, end: i32) -> Self {
        self.position = Position::At(Bound::Span(begin, end));
        self
    }

    pub fn at_fs(mut self, id: FsId) -> Self {
        self.position = Position::At(Bound::Fs(id));
        self
    }

    /// Annotations lying within the bound's span.
    pub fn covered_by(mut self, begin: i32, end: i32) -> Self {
        self.position = Position::CoveredBy(Bound::Span(begin, end));
        self
    }

    pub fn covered_by_fs(mut self, id: FsId) -> Self {
        self.position = Position::CoveredBy(Bound::Fs(id));
        self
    }

    /// Annotations whose span contains the bound's span.
    pub fn covering(mut self, begin: i32, end: i32) -> Self {
        self.position = Position::Covering(Bound::Span(begin, end));
        self
    }

    pub fn covering_fs(mut self, id: FsId) -> Self {
        self.position = Position::Covering(Bound::Fs(id));
        self
    }

    /// Annotations in the gap between two annotations. If `a` sorts
    /// after `b` the bounds swap and the output order reverses.
    pub fn between(mut self, a: FsId, b: FsId) -> Self {
        self.position = Position::Between(a, b);
        self
    }

    /// Annotations beginning strictly after the reference end.
    pub fn following(mut self, begin: i32, end: i32) -> Self {
        self.position = Position::Following(Bound::Span(begin, end));
        self
    }

    pub fn following_fs(mut self, id: FsId) -> Self {
        self.position = Position::Following(Bound::Fs(id));
        self
    }

    /// Annotations ending at or before the reference begin, yielded in
    /// forward order by default.
    pub fn preceding(mut self, begin: i32, end: i32) -> Self {
        self.position = Position::Preceding(Bound::Span(begin, end));
        self
    }

    pub fn preceding_fs(mut self, id: FsId) -> Self {
        self.position = Position::Preceding(Bound::Fs(id));
        self
    }

    // ----- terminal accessors -----

    /// Run the query and iterate over matching records.
    pub fn fs_iterator(self) -> Result<impl Iterator<Item = FsId>, SelectError> {
        Ok(self.evaluate()?.into_iter())
    }

    /// Run the query into a list.
    pub fn as_list(self) -> Result<Vec<FsId>, SelectError> {
        self.evaluate()
    }

    /// Run the query into a boxed slice.
    pub fn as_array(self) -> Result<Box<[FsId]>, SelectError> {
        Ok(self.evaluate()?.into_boxed_slice())
    }

    /// First element. Errors on an empty selection unless `null_ok`.
    pub fn get(self) -> Result<Option<FsId>, SelectError> {
        let null_ok = self.null_ok;
        let result = self.evaluate()?;
        match result.first() {
            Some(id) => Ok(Some(*id)),
            None if null_ok => Ok(None),
            None => Err(SelectError::EmptyOrNull),
        }
    }

    /// One-argument positioning form of [`SelectFs::get`].
    pub fn get_fs(self, id: FsId) -> Result<Option<FsId>, SelectError> {
        self.start_at_fs(id).get()
    }

    /// Two-argument positioning form of [`SelectFs::get`].
    pub fn get_span(self, begin: i32, end: i32) -> Result<Option<FsId>, SelectError> {
        self.start_at(begin, end).get()
    }

    /// Three-argument positioning form of [`SelectFs::get`].
    pub fn get_span_offset(
        self,
        begin: i32,
        end: i32,
        shift: i32,
    ) -> Result<Option<FsId>, SelectError> {
        self.start_at(begin, end).shifted(shift).get()
    }

    /// Exactly one element. Errors on empty and on more than one.
    pub fn single(self) -> Result<FsId, SelectError> {
        let result = self.evaluate()?;
        match result.len() {
            0 => Err(SelectError::EmptyOrNull),
            1 => Ok(result[0]),
            n => Err(SelectError::TooManyResults(n)),
        }
    }

    /// At most one element; `None` when empty.
    pub fn single_or_null(self) -> Result<Option<FsId>, SelectError> {
        let result = self.evaluate()?;
        match result.len() {
            0 => Ok(None),
            1 => Ok(Some(result[0])),
            n => Err(SelectError::TooManyResults(n)),
        }
    }

    // ----- evaluation -----

    fn evaluate(&self) -> Result<Vec<FsId>, SelectError> {
        let keys = self.candidates()?;
        let (mut keys, reversed) = self.positioned(keys)?;
        if self.backwards != reversed {
            keys.reverse();
        }
        if self.non_overlapping {
            let mut kept: Vec<AnnotKey> = Vec::with_capacity(keys.len());
            for key in keys {
                if kept.last().is_none_or(|prev| !prev.overlaps(&key)) {
                    kept.push(key);
                }
            }
            keys = kept;
        }
        Ok(keys.into_iter().map(|k| k.id).collect())
    }

    /// The ordered candidate keys, type-restricted, across one or all
    /// views.
    fn candidates(&self) -> Result<Vec<AnnotKey>, SelectError> {
        let views: Vec<&str> = if self.all_views {
            self.cas.view_names().collect()
        } else {
            vec![self.view]
        };
        // Unordered traversal is only sound for plain iteration.
        let unordered = self.order_not_needed && matches!(self.position, Position::None);
        let mut keys = Vec::new();
        for name in views {
            let view = self.cas.view(name)?;
            if unordered {
                for id in view.bag() {
                    if let Ok(key) = self.cas.annot_key(*id) {
                        keys.push(key);
                    }
                }
            } else {
                for item in view.annotations().iter() {
                    keys.push(item?);
                }
            }
        }
        // Per-view streams are each ordered; concatenating them is not.
        // Re-sort so positioning arithmetic sees one global order.
        if self.all_views && !unordered {
            keys.sort_by(|a, b| AnnotOrder.cmp_with_id(a, b));
        }
        if let Some(ty) = self.ty {
            let ts = self.cas.type_system();
            keys.retain(|k| ts.is_subtype_of(TypeId(k.type_code), ty));
        }
        Ok(keys)
    }

    fn bound_key(&self, bound: Bound) -> Result<AnnotKey, SelectError> {
        match bound {
            Bound::Fs(id) => Ok(self.cas.annot_key(id)?),
            Bound::Span(begin, end) => Ok(AnnotKey {
                begin,
                end,
                type_code: 0,
                id: FsId(u32::MAX),
            }),
        }
    }

    /// Whether a candidate is the bound itself and must be skipped.
    fn skips_bound(&self, key: &AnnotKey, bound: Bound, bound_key: &AnnotKey) -> bool {
        match bound {
            Bound::Span(..) => false,
            Bound::Fs(_) => {
                if self.use_annotation_equals {
                    key.cmp_span_and_type(bound_key) == std::cmp::Ordering::Equal
                } else {
                    key.id == bound_key.id
                }
            }
        }
    }

    /// Position order for `start_at`: span, then type when requested.
    fn position_cmp(&self, key: &AnnotKey, bound: &AnnotKey) -> std::cmp::Ordering {
        if self.type_priority {
            key.cmp_span_and_type(bound)
        } else {
            key.cmp_span(bound)
        }
    }

    fn positioned(&self, keys: Vec<AnnotKey>) -> Result<(Vec<AnnotKey>, bool), SelectError> {
        use std::cmp::Ordering;
        let result = match self.position {
            Position::None => {
                let start = self.shift.max(0) as usize;
                (keys.into_iter().skip(start).collect(), false)
            }
            Position::StartAt(bound) => {
                let target = self.bound_key(bound)?;
                let mut start = keys
                    .iter()
                    .position(|k| self.position_cmp(k, &target) != Ordering::Less)
                    .unwrap_or(keys.len());
                if self.position_uses_type && matches!(bound, Bound::Fs(_)) {
                    let want = target.type_code;
                    while start < keys.len()
                        && keys[start].cmp_span(&target) == Ordering::Equal
                        && keys[start].type_code != want
                    {
                        start += 1;
                    }
                }
                let start = (start as i64 + self.shift as i64).clamp(0, keys.len() as i64) as usize;
                (keys.into_iter().skip(start).collect(), false)
            }
            Position::At(bound) => {
                let target = self.bound_key(bound)?;
                let want_type = self.position_uses_type.then(|| target.type_code);
                let matched: Vec<AnnotKey> = keys
                    .into_iter()
                    .filter(|k| {
                        k.begin == target.begin
                            && k.end == target.end
                            && want_type.is_none_or(|t| k.type_code == t)
                    })
                    .collect();
                (self.skip_front(matched), false)
            }
            Position::CoveredBy(bound) => {
                let target = self.bound_key(bound)?;
                let matched: Vec<AnnotKey> = keys
                    .into_iter()
                    .filter(|k| {
                        let starts_inside = k.begin >= target.begin
                            && (k.begin < target.end || k.begin == target.begin);
                        let fits = if self.include_end_beyond_bounds {
                            starts_inside
                        } else {
                            starts_inside && k.end <= target.end
                        };
                        fits && !self.skips_bound(k, bound, &target)
                    })
                    .collect();
                (self.skip_front(matched), false)
            }
            Position::Covering(bound) => {
                let target = self.bound_key(bound)?;
                let matched: Vec<AnnotKey> = keys
                    .into_iter()
                    .filter(|k| {
                        k.covers(&target) && !self.skips_bound(k, bound, &target)
                    })
                    .collect();
                (self.skip_front(matched), false)
            }
            Position::Between(a, b) => {
                let ka = self.cas.annot_key(a)?;
                let kb = self.cas.annot_key(b)?;
                let (gap_begin, gap_end, reversed) = if ka.cmp_span(&kb) == Ordering::Greater {
                    (kb.end, ka.begin, true)
                } else {
                    (ka.end, kb.begin, false)
                };
                let matched: Vec<AnnotKey> = keys
                    .into_iter()
                    .filter(|k| {
                        k.begin >= gap_begin
                            && k.end <= gap_end
                            && k.id != ka.id
                            && k.id != kb.id
                    })
                    .collect();
                (self.skip_front(matched), reversed)
            }
            Position::Following(bound) => {
                let target = self.bound_key(bound)?;
                let matched: Vec<AnnotKey> = keys
                    .into_iter()
                    .filter(|k| k.begin > target.end)
                    .collect();
                (self.skip_front(matched), false)
            }
            Position::Preceding(bound) => {
                let target = self.bound_key(bound)?;
                let mut matched: Vec<AnnotKey> = keys
                    .into_iter()
                    .filter(|k| k.end <= target.begin && !self.skips_bound(k, bound, &target))
                    .collect();
                // The offset walks backward from the reference, so it
                // drops the elements nearest to it.
                let keep = matched.len().saturating_sub(self.shift.max(0) as usize);
                matched.truncate(keep);
                (matched, false)
            }
        };
        Ok(result)
    }

    fn skip_front(&self, keys: Vec<AnnotKey>) -> Vec<AnnotKey> {
        let n = self.shift.max(0) as usize;
        if n == 0 { keys } else { keys.into_iter().skip(n).collect() }
    }
}
