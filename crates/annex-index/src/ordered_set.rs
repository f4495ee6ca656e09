//! The ordered feature-structure set backing sorted and set indexes.
//!
//! One growable array holds the elements in ascending with-identity order.
//! A logical deletion leaves a null slot (tombstone) instead of shifting;
//! lookups binary-search past tombstones. Inserts that extend the current
//! maximum append in O(1); every other insert lands in an unsorted batch
//! that is merged into the array the next time a read-dependent operation
//! runs.
//!
//! Concurrency: readers serialize against a mid-flight merge on the batch
//! lock, and the fast append path never touches that lock. A same-thread
//! re-entry into the merge (a host callback firing mid-merge) is a no-op;
//! merges from distinct threads serialize on the batch lock.

use crate::cmp::{IndexKind, TotalOrder};
use crate::error::IndexError;
use std::cmp::Ordering;
use std::sync::{Mutex, OnceLock, RwLock};
use std::thread::{self, ThreadId};

/// Live-span density below which removal triggers compaction.
const COMPACT_MIN_SIZE: usize = 8;

/// An ordered, comparator-driven container of records.
///
/// `T` is whatever the caller indexes — typically a small pre-extracted
/// sort key — and `C` supplies the with-identity / without-identity
/// comparator pair. `kind` selects the dedup policy: [`IndexKind::Sorted`]
/// keeps distinct instances with equal keys, [`IndexKind::Set`] keeps at
/// most one element per without-identity key.
pub struct OrderedFsSet<T, C> {
    core: RwLock<Core<T>>,
    batch: Mutex<Batch<T>>,
    merge_owner: Mutex<Option<ThreadId>>,
    cmp: C,
    kind: IndexKind,
}

struct Batch<T> {
    pending: Vec<T>,
    /// Bumped on every out-of-order add and on every merge.
    epoch: u64,
}

struct Core<T> {
    arr: Vec<Option<T>>,
    /// Lowest slot that may be live. Slots below are always null.
    first_used: usize,
    /// One past the highest live slot. Slots at or above are always null.
    next_free: usize,
    /// Count of live (non-null) slots.
    size: usize,
    /// Most recently vacated slot, reused by the next single insert.
    space_hint: Option<usize>,
    /// A known contiguous tombstone run, for O(1) skips in `find_slot`.
    null_block: Option<(usize, usize)>,
}

impl<T> Default for Core<T> {
    fn default() -> Self {
        Self {
            arr: Vec::new(),
            first_used: 0,
            next_free: 0,
            size: 0,
            space_hint: None,
            null_block: None,
        }
    }
}

impl<T: Clone, C: TotalOrder<T>> OrderedFsSet<T, C> {
    pub fn new(kind: IndexKind, cmp: C) -> Self {
        debug_assert!(kind != IndexKind::Bag, "bag indexes do not use OrderedFsSet");
        Self {
            core: RwLock::new(Core::default()),
            batch: Mutex::new(Batch {
                pending: Vec::new(),
                epoch: 0,
            }),
            merge_owner: Mutex::new(None),
            cmp,
            kind,
        }
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// Insert an element.
    ///
    /// Returns false only when the element is immediately known to be a
    /// duplicate; batched duplicates collapse silently at the next merge.
    pub fn add(&self, value: T) -> bool {
        {
            let mut core = self.core.write().expect("index poisoned");
            match core.last_live() {
                None => {
                    core.append(value);
                    return true;
                }
                Some(highest) => {
                    if self.kind == IndexKind::Set
                        && self.cmp.cmp_key(&value, highest) == Ordering::Equal
                    {
                        return false;
                    }
                    match self.cmp.cmp_with_id(&value, highest) {
                        Ordering::Greater => {
                            core.append(value);
                            return true;
                        }
                        Ordering::Equal => return false,
                        Ordering::Less => {}
                    }
                }
            }
        }
        let mut batch = self.batch.lock().expect("batch poisoned");
        batch.pending.push(value);
        batch.epoch += 1;
        true
    }

    /// Remove an element. Returns true if it was present.
    ///
    /// Set-kind indexes match by without-identity key, sorted-kind by the
    /// full with-identity order.
    pub fn remove(&self, value: &T) -> bool {
        self.merge_pending();
        let mut core = self.core.write().expect("index poisoned");
        let found = self.locate(&core, value);
        if found < 0 {
            return false;
        }
        core.remove_slot(found as usize);
        true
    }

    pub fn contains(&self, value: &T) -> bool {
        self.merge_pending();
        let core = self.core.read().expect("index poisoned");
        self.locate(&core, value) >= 0
    }

    pub fn size(&self) -> usize {
        self.merge_pending();
        self.core.read().expect("index poisoned").size
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Reset to empty. Identity and comparators are unchanged.
    pub fn clear(&self) {
        let mut batch = self.batch.lock().expect("batch poisoned");
        batch.pending.clear();
        batch.epoch += 1;
        let mut core = self.core.write().expect("index poisoned");
        *core = Core::default();
    }

    pub fn first(&self) -> Option<T> {
        self.merge_pending();
        self.core
            .read()
            .expect("index poisoned")
            .first_live()
            .cloned()
    }

    pub fn last(&self) -> Option<T> {
        self.merge_pending();
        self.core
            .read()
            .expect("index poisoned")
            .last_live()
            .cloned()
    }

    /// Greatest element strictly less than `value`.
    pub fn lower(&self, value: &T) -> Option<T> {
        self.merge_pending();
        let core = self.core.read().expect("index poisoned");
        core.lower(&self.cmp, value).cloned()
    }

    /// Greatest element less than or equal to `value`.
    pub fn floor(&self, value: &T) -> Option<T> {
        self.merge_pending();
        let core = self.core.read().expect("index poisoned");
        core.floor(&self.cmp, value).cloned()
    }

    /// Least element greater than or equal to `value`.
    pub fn ceiling(&self, value: &T) -> Option<T> {
        self.merge_pending();
        let core = self.core.read().expect("index poisoned");
        core.ceiling(&self.cmp, value).cloned()
    }

    /// Least element strictly greater than `value`.
    pub fn higher(&self, value: &T) -> Option<T> {
        self.merge_pending();
        let core = self.core.read().expect("index poisoned");
        core.higher(&self.cmp, value).cloned()
    }

    /// Binary-search position of `value` among the live elements.
    ///
    /// Returns the logical (tombstone-free) index of an exact match, or
    /// `-(insertion_point) - 1` where `insertion_point` is the lowest
    /// logical index at which `value` could be inserted keeping order.
    pub fn find(&self, value: &T) -> isize {
        self.merge_pending();
        let core = self.core.read().expect("index poisoned");
        let found = core.find_slot(|x| self.cmp.cmp_with_id(x, value));
        if found >= 0 {
            core.logical_index(found as usize) as isize
        } else {
            let ip = (-found - 1) as usize;
            -(core.logical_index(ip) as isize) - 1
        }
    }

    /// Ascending iteration. Yields an error if a pending batch appears
    /// mid-traversal or a merge lands between two steps.
    pub fn iter(&self) -> SetIter<'_, T, C> {
        self.merge_pending();
        SetIter {
            set: self,
            epoch: self.epoch(),
            last: None,
            descending: false,
            done: false,
        }
    }

    /// Descending iteration.
    pub fn iter_desc(&self) -> SetIter<'_, T, C> {
        self.merge_pending();
        SetIter {
            set: self,
            epoch: self.epoch(),
            last: None,
            descending: true,
            done: false,
        }
    }

    /// Read-only view of the elements in `[from, to)` by with-identity
    /// order. `from` sorting after `to` is an input error.
    pub fn sub_set(&self, from: T, to: T) -> Result<SubSet<'_, T, C>, IndexError> {
        if self.cmp.cmp_with_id(&from, &to) == Ordering::Greater {
            return Err(IndexError::invalid("sub-set bounds: from sorts after to"));
        }
        self.merge_pending();
        let first = self
            .ceiling(&from)
            .filter(|v| self.cmp.cmp_with_id(v, &to) == Ordering::Less);
        let last = self
            .lower(&to)
            .filter(|v| self.cmp.cmp_with_id(v, &from) != Ordering::Less);
        Ok(SubSet {
            parent: self,
            from,
            to,
            first,
            last,
            size: OnceLock::new(),
        })
    }

    fn locate(&self, core: &Core<T>, value: &T) -> isize {
        match self.kind {
            IndexKind::Set => core.find_slot(|x| self.cmp.cmp_key(x, value)),
            _ => core.find_slot(|x| self.cmp.cmp_with_id(x, value)),
        }
    }

    /// Drain the batch into the array if anything is pending.
    ///
    /// Same-thread re-entry is a no-op; the merge it re-entered will pick
    /// the pending elements up. Distinct threads serialize on the batch
    /// lock.
    fn merge_pending(&self) {
        {
            let owner = self.merge_owner.lock().expect("guard poisoned");
            if *owner == Some(thread::current().id()) {
                return;
            }
        }
        let mut batch = self.batch.lock().expect("batch poisoned");
        if batch.pending.is_empty() {
            return;
        }
        *self.merge_owner.lock().expect("guard poisoned") = Some(thread::current().id());
        let pending = std::mem::take(&mut batch.pending);
        {
            let mut core = self.core.write().expect("index poisoned");
            core.merge(&self.cmp, self.kind, pending);
        }
        batch.epoch += 1;
        *self.merge_owner.lock().expect("guard poisoned") = None;
    }

    fn has_pending(&self) -> bool {
        !self
            .batch
            .lock()
            .expect("batch poisoned")
            .pending
            .is_empty()
    }

    fn epoch(&self) -> u64 {
        self.batch.lock().expect("batch poisoned").epoch
    }
}

/// Checked iterator over an [`OrderedFsSet`].
///
/// Navigation is by value rather than by slot, so a compaction between
/// two `next` calls cannot misposition it. An unmerged batch observed
/// mid-traversal surfaces as [`IndexError::ConcurrentModification`], and
/// so does a batch that another accessor already merged away: the batch
/// epoch is snapshot at construction and re-checked on every step.
pub struct SetIter<'a, T, C> {
    set: &'a OrderedFsSet<T, C>,
    /// Batch epoch at construction. Any later out-of-order add or merge
    /// bumps it, which this iterator must report rather than absorb.
    epoch: u64,
    last: Option<T>,
    descending: bool,
    done: bool,
}

impl<T: Clone, C: TotalOrder<T>> Iterator for SetIter<'_, T, C> {
    type Item = Result<T, IndexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.set.has_pending() || self.set.epoch() != self.epoch {
            self.done = true;
            return Some(Err(IndexError::ConcurrentModification));
        }
        let core = self.set.core.read().expect("index poisoned");
        let next = match (&self.last, self.descending) {
            (None, false) => core.first_live().cloned(),
            (None, true) => core.last_live().cloned(),
            (Some(prev), false) => core.higher(&self.set.cmp, prev).cloned(),
            (Some(prev), true) => core.lower(&self.set.cmp, prev).cloned(),
        };
        drop(core);
        match next {
            Some(v) => {
                self.last = Some(v.clone());
                Some(Ok(v))
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

/// Read-only window over a parent set, bounded by `[from, to)`.
pub struct SubSet<'a, T, C> {
    parent: &'a OrderedFsSet<T, C>,
    from: T,
    to: T,
    first: Option<T>,
    last: Option<T>,
    size: OnceLock<usize>,
}

impl<T: Clone, C: TotalOrder<T>> SubSet<'_, T, C> {
    pub fn first(&self) -> Option<&T> {
        self.first.as_ref()
    }

    pub fn last(&self) -> Option<&T> {
        self.last.as_ref()
    }

    /// Element count, counted on the first successful request and cached.
    ///
    /// A traversal cut short by a concurrent modification propagates the
    /// error and caches nothing.
    pub fn size(&self) -> Result<usize, IndexError> {
        if let Some(n) = self.size.get() {
            return Ok(*n);
        }
        let mut n = 0;
        for item in self.iter() {
            item?;
            n += 1;
        }
        let _ = self.size.set(n);
        Ok(n)
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    pub fn contains(&self, value: &T) -> bool {
        self.in_range(value) && self.parent.contains(value)
    }

    /// Sub-views are read-only.
    pub fn add(&self, _value: T) -> Result<(), IndexError> {
        Err(IndexError::unsupported("sub-set views are read-only"))
    }

    /// Sub-views are read-only.
    pub fn remove(&self, _value: &T) -> Result<(), IndexError> {
        Err(IndexError::unsupported("sub-set views are read-only"))
    }

    pub fn lower(&self, value: &T) -> Option<T> {
        let cmp = &self.parent.cmp;
        if cmp.cmp_with_id(value, &self.to) != Ordering::Less {
            return self.last.clone();
        }
        self.parent
            .lower(value)
            .filter(|v| cmp.cmp_with_id(v, &self.from) != Ordering::Less)
    }

    pub fn floor(&self, value: &T) -> Option<T> {
        let cmp = &self.parent.cmp;
        if cmp.cmp_with_id(value, &self.to) != Ordering::Less {
            return self.last.clone();
        }
        self.parent
            .floor(value)
            .filter(|v| cmp.cmp_with_id(v, &self.from) != Ordering::Less)
    }

    pub fn ceiling(&self, value: &T) -> Option<T> {
        let cmp = &self.parent.cmp;
        if cmp.cmp_with_id(value, &self.from) == Ordering::Less {
            return self.first.clone();
        }
        self.parent
            .ceiling(value)
            .filter(|v| cmp.cmp_with_id(v, &self.to) == Ordering::Less)
    }

    pub fn higher(&self, value: &T) -> Option<T> {
        let cmp = &self.parent.cmp;
        if cmp.cmp_with_id(value, &self.from) == Ordering::Less {
            return self.first.clone();
        }
        self.parent
            .higher(value)
            .filter(|v| cmp.cmp_with_id(v, &self.to) == Ordering::Less)
    }

    /// Ascending iteration over the window.
    pub fn iter(&self) -> impl Iterator<Item = Result<T, IndexError>> + '_ {
        let cmp = &self.parent.cmp;
        let mut inner = self.parent.iter();
        inner.last = self
            .first
            .as_ref()
            .and_then(|f| self.parent.lower(f));
        inner
            .take_while(move |item| match item {
                Ok(v) => cmp.cmp_with_id(v, &self.to) == Ordering::Less,
                Err(_) => true,
            })
            .filter(move |item| match item {
                Ok(v) => cmp.cmp_with_id(v, &self.from) != Ordering::Less,
                Err(_) => true,
            })
    }

    fn in_range(&self, value: &T) -> bool {
        let cmp = &self.parent.cmp;
        cmp.cmp_with_id(value, &self.from) != Ordering::Less
            && cmp.cmp_with_id(value, &self.to) == Ordering::Less
    }
}

impl<T: Clone> Core<T> {
    fn first_live(&self) -> Option<&T> {
        self.arr[self.first_used..self.next_free]
            .iter()
            .find_map(|s| s.as_ref())
    }

    fn last_live(&self) -> Option<&T> {
        // next_free - 1 is live by invariant whenever size > 0
        if self.size == 0 {
            None
        } else {
            self.arr[self.next_free - 1].as_ref()
        }
    }

    /// Null-skipping binary search over `[first_used, next_free)`.
    ///
    /// `probe(elem)` orders the stored element against the target. Returns
    /// the physical slot of an exact match, or `-(slot) - 1` for the
    /// lowest physical slot at which the target could be placed.
    fn find_slot(&self, probe: impl Fn(&T) -> Ordering) -> isize {
        let mut lo = self.first_used;
        let mut hi = self.next_free;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let scanned_up = self.live_at_or_after(mid, hi);
            let (pos, item) = match scanned_up {
                Some(found) => found,
                None => match self.live_before(mid, lo) {
                    Some(found) => found,
                    None => return -(lo as isize) - 1,
                },
            };
            match probe(item) {
                Ordering::Equal => return pos as isize,
                Ordering::Less => lo = pos + 1,
                Ordering::Greater => {
                    hi = if pos >= mid { mid.min(pos) } else { pos };
                }
            }
        }
        -(lo as isize) - 1
    }

    /// Nearest live slot in `[start, hi)`, skipping known tombstone runs.
    fn live_at_or_after(&self, start: usize, hi: usize) -> Option<(usize, &T)> {
        let mut pos = start;
        while pos < hi {
            if let Some(item) = self.arr[pos].as_ref() {
                return Some((pos, item));
            }
            pos = match self.null_block {
                Some((lo, nb_hi)) if pos >= lo && pos <= nb_hi => nb_hi + 1,
                _ => pos + 1,
            };
        }
        None
    }

    /// Nearest live slot in `[lo, end)` scanning downward.
    fn live_before(&self, end: usize, lo: usize) -> Option<(usize, &T)> {
        let mut pos = end;
        while pos > lo {
            pos = match self.null_block {
                Some((nb_lo, nb_hi)) if pos - 1 >= nb_lo && pos - 1 <= nb_hi => {
                    if nb_lo == 0 {
                        return None;
                    }
                    nb_lo - 1
                }
                _ => pos - 1,
            };
            if pos < lo {
                return None;
            }
            if let Some(item) = self.arr[pos].as_ref() {
                return Some((pos, item));
            }
        }
        None
    }

    /// Count of live slots below `slot`.
    fn logical_index(&self, slot: usize) -> usize {
        self.arr[self.first_used..slot.min(self.next_free)]
            .iter()
            .filter(|s| s.is_some())
            .count()
    }

    /// O(1) append past the current maximum.
    fn append(&mut self, value: T) {
        if self.next_free == self.arr.len() {
            self.arr.push(Some(value));
        } else {
            self.arr[self.next_free] = Some(value);
        }
        self.next_free += 1;
        self.size += 1;
    }

    fn ceiling<'a, C: TotalOrder<T>>(&'a self, cmp: &C, value: &T) -> Option<&'a T> {
        let found = self.find_slot(|x| cmp.cmp_with_id(x, value));
        let slot = if found >= 0 {
            found as usize
        } else {
            (-found - 1) as usize
        };
        self.live_at_or_after(slot, self.next_free).map(|(_, v)| v)
    }

    fn higher<'a, C: TotalOrder<T>>(&'a self, cmp: &C, value: &T) -> Option<&'a T> {
        let found = self.find_slot(|x| cmp.cmp_with_id(x, value));
        let slot = if found >= 0 {
            found as usize + 1
        } else {
            (-found - 1) as usize
        };
        self.live_at_or_after(slot, self.next_free).map(|(_, v)| v)
    }

    fn floor<'a, C: TotalOrder<T>>(&'a self, cmp: &C, value: &T) -> Option<&'a T> {
        let found = self.find_slot(|x| cmp.cmp_with_id(x, value));
        if found >= 0 {
            return self.arr[found as usize].as_ref();
        }
        let ip = (-found - 1) as usize;
        self.live_before(ip, self.first_used).map(|(_, v)| v)
    }

    fn lower<'a, C: TotalOrder<T>>(&'a self, cmp: &C, value: &T) -> Option<&'a T> {
        let found = self.find_slot(|x| cmp.cmp_with_id(x, value));
        let end = if found >= 0 {
            found as usize
        } else {
            (-found - 1) as usize
        };
        self.live_before(end, self.first_used).map(|(_, v)| v)
    }

    /// Sort, collapse, and splice a drained batch into the array.
    fn merge<C: TotalOrder<T>>(&mut self, cmp: &C, kind: IndexKind, mut pending: Vec<T>) {
        pending.sort_by(|a, b| cmp.cmp_with_id(a, b));

        // Collapse runs of equal elements, walking from the end so the
        // most recently added instance of a run survives. Set-kind
        // collapses by key (unique per without-identity key); sorted-kind
        // collapses only genuinely identical elements, keeping distinct
        // instances with equal keys.
        let mut survivors: Vec<T> = Vec::with_capacity(pending.len());
        while let Some(item) = pending.pop() {
            let duplicate = survivors.last().is_some_and(|kept| match kind {
                IndexKind::Set => cmp.cmp_key(kept, &item) == Ordering::Equal,
                _ => cmp.cmp_with_id(kept, &item) == Ordering::Equal,
            });
            if !duplicate {
                survivors.push(item);
            }
        }

        // survivors is descending; insert largest first so earlier
        // insertions do not shift later insertion points.
        for item in survivors {
            let present = match kind {
                IndexKind::Set => self.find_slot(|x| cmp.cmp_key(x, &item)) >= 0,
                _ => self.find_slot(|x| cmp.cmp_with_id(x, &item)) >= 0,
            };
            if !present {
                self.insert_one(cmp, item);
            }
        }
        self.null_block = None;
    }

    /// Place one element at its with-identity position, opening a slot by
    /// whichever of the three space sources costs the least movement:
    /// the most recently vacated slot, front free space, or back free
    /// space.
    fn insert_one<C: TotalOrder<T>>(&mut self, cmp: &C, value: T) {
        let found = self.find_slot(|x| cmp.cmp_with_id(x, &value));
        debug_assert!(found < 0, "insert_one caller checked presence");
        let ip = (-found - 1) as usize;

        if ip >= self.next_free {
            self.append(value);
            return;
        }
        if self.arr[ip].is_none() {
            self.arr[ip] = Some(value);
            self.size += 1;
            self.invalidate_nulls_at(ip);
            return;
        }

        let hint = self
            .space_hint
            .filter(|&h| h >= self.first_used && h < self.next_free && self.arr[h].is_none());
        let hint_cost = hint.map(|h| if h < ip { ip - 1 - h } else { h - ip });
        let front_cost = (self.first_used > 0).then(|| ip - self.first_used);
        let back_cost = Some(self.next_free - ip);

        let cheapest = [
            (hint_cost, 0u8),
            (front_cost, 1u8),
            (back_cost, 2u8),
        ]
        .into_iter()
        .filter_map(|(cost, tag)| cost.map(|c| (c, tag)))
        .min()
        .map(|(_, tag)| tag)
        .unwrap_or(2);

        match cheapest {
            0 => {
                let h = hint.unwrap_or(ip);
                if h < ip {
                    self.arr[h..ip].rotate_left(1);
                    self.arr[ip - 1] = Some(value);
                } else {
                    self.arr[ip..=h].rotate_right(1);
                    self.arr[ip] = Some(value);
                }
                self.space_hint = None;
            }
            1 => {
                self.first_used -= 1;
                self.arr[self.first_used..ip].rotate_left(1);
                self.arr[ip - 1] = Some(value);
            }
            _ => {
                self.grow_back();
                self.arr[ip..self.next_free].rotate_right(1);
                self.arr[ip] = Some(value);
            }
        }
        self.size += 1;
        self.null_block = None;
    }

    /// Ensure a null slot exists at `next_free` and claim it.
    fn grow_back(&mut self) {
        if self.next_free == self.arr.len() {
            self.arr.push(None);
        }
        self.next_free += 1;
    }

    fn invalidate_nulls_at(&mut self, slot: usize) {
        if let Some((lo, hi)) = self.null_block
            && slot >= lo
            && slot <= hi
        {
            self.null_block = None;
        }
        if self.space_hint == Some(slot) {
            self.space_hint = None;
        }
    }

    /// Tombstone the slot and restore the edge invariants.
    fn remove_slot(&mut self, slot: usize) {
        self.arr[slot] = None;
        self.size -= 1;

        if self.size == 0 {
            *self = Core::default();
            return;
        }
        if slot == self.first_used {
            while self.first_used < self.next_free && self.arr[self.first_used].is_none() {
                self.first_used += 1;
            }
        } else if slot + 1 == self.next_free {
            while self.next_free > self.first_used && self.arr[self.next_free - 1].is_none() {
                self.next_free -= 1;
            }
        } else {
            self.space_hint = Some(slot);
            self.null_block = Some(match self.null_block {
                Some((lo, hi)) if slot + 1 == lo => (slot, hi),
                Some((lo, hi)) if slot == hi + 1 => (lo, slot),
                _ => (slot, slot),
            });
        }

        let span = self.next_free - self.first_used;
        if self.size > COMPACT_MIN_SIZE && self.size * 2 < span {
            self.compact();
        }
    }

    /// Slide all live elements down contiguously from slot 0.
    fn compact(&mut self) {
        let mut write = 0;
        for read in self.first_used..self.next_free {
            if self.arr[read].is_some() {
                if read != write {
                    self.arr[write] = self.arr[read].take();
                }
                write += 1;
            }
        }
        for slot in write..self.next_free {
            self.arr[slot] = None;
        }
        self.first_used = 0;
        self.next_free = write;
        self.space_hint = None;
        self.null_block = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmp::NaturalOrder;

    fn sorted_set() -> OrderedFsSet<i32, NaturalOrder> {
        OrderedFsSet::new(IndexKind::Sorted, NaturalOrder)
    }

    fn collect(set: &OrderedFsSet<i32, NaturalOrder>) -> Vec<i32> {
        set.iter().map(|r| r.unwrap()).collect()
    }

    #[test]
    fn out_of_order_adds_merge_on_first_read() {
        let set = sorted_set();
        for v in [5, 3, 8, 1, 9, 2] {
            set.add(v);
        }
        assert_eq!(set.first(), Some(1));
        assert_eq!(collect(&set), vec![1, 2, 3, 5, 8, 9]);
        assert_eq!(
            set.iter_desc().map(|r| r.unwrap()).collect::<Vec<_>>(),
            vec![9, 8, 5, 3, 2, 1]
        );
    }

    #[test]
    fn remove_updates_size_and_membership() {
        let set = sorted_set();
        for v in [5, 3, 8, 1, 9, 2] {
            set.add(v);
        }
        assert!(set.remove(&5));
        assert!(!set.contains(&5));
        assert_eq!(set.size(), 5);
        assert_eq!(collect(&set), vec![1, 2, 3, 8, 9]);
        assert!(!set.remove(&5), "second remove is a no-op");
    }

    #[test]
    fn monotonic_adds_stay_on_fast_path() {
        let set = sorted_set();
        for v in 0..100 {
            set.add(v);
        }
        // No batch was ever created, so iteration needs no merge.
        assert!(!set.has_pending());
        assert_eq!(collect(&set), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn reverse_insertion_order() {
        let set = sorted_set();
        for v in (0..50).rev() {
            set.add(v);
        }
        assert_eq!(collect(&set), (0..50).collect::<Vec<_>>());
        assert_eq!(set.size(), 50);
    }

    #[test]
    fn duplicate_add_is_idempotent() {
        let set = OrderedFsSet::new(IndexKind::Set, NaturalOrder);
        set.add(7);
        set.add(3);
        set.add(7);
        set.add(3);
        assert_eq!(set.size(), 2);
        assert_eq!(
            set.iter().map(|r| r.unwrap()).collect::<Vec<_>>(),
            vec![3, 7]
        );
    }

    #[test]
    fn navigation_operators() {
        let set = sorted_set();
        for v in [10, 20, 30, 40] {
            set.add(v);
        }
        assert_eq!(set.lower(&30), Some(20));
        assert_eq!(set.floor(&30), Some(30));
        assert_eq!(set.floor(&35), Some(30));
        assert_eq!(set.ceiling(&30), Some(30));
        assert_eq!(set.ceiling(&25), Some(30));
        assert_eq!(set.higher(&30), Some(40));
        assert_eq!(set.higher(&40), None);
        assert_eq!(set.lower(&10), None);
    }

    #[test]
    fn navigation_skips_tombstones() {
        let set = sorted_set();
        for v in [10, 20, 30, 40, 50] {
            set.add(v);
        }
        set.remove(&30);
        set.remove(&40);
        assert_eq!(set.higher(&20), Some(50));
        assert_eq!(set.lower(&50), Some(20));
        assert_eq!(set.ceiling(&25), Some(50));
        assert_eq!(set.floor(&45), Some(20));
    }

    #[test]
    fn find_encoding_for_missing_keys() {
        let set = sorted_set();
        for v in [10, 20, 30] {
            set.add(v);
        }
        assert_eq!(set.find(&20), 1);
        assert_eq!(set.find(&5), -1); // insertion point 0
        assert_eq!(set.find(&25), -3); // insertion point 2
        assert_eq!(set.find(&99), -4); // insertion point 3
    }

    #[test]
    fn find_encoding_survives_tombstones() {
        let set = sorted_set();
        for v in [10, 20, 30, 40] {
            set.add(v);
        }
        set.remove(&20);
        assert_eq!(set.find(&30), 1, "logical index ignores tombstones");
        assert_eq!(set.find(&20), -2);
    }

    #[test]
    fn compaction_after_heavy_removal() {
        let set = sorted_set();
        for v in 0..40 {
            set.add(v);
        }
        for v in 10..39 {
            set.remove(&v);
        }
        assert_eq!(set.size(), 11);
        let expected: Vec<i32> = (0..10).chain([39]).collect();
        assert_eq!(collect(&set), expected);
        assert!(set.contains(&39));
        assert!(!set.contains(&20));
    }

    #[test]
    fn interleaved_add_remove_add() {
        let set = sorted_set();
        for v in [50, 10, 30] {
            set.add(v);
        }
        set.remove(&30);
        set.add(20);
        set.add(25);
        assert_eq!(collect(&set), vec![10, 20, 25, 50]);
    }

    #[test]
    fn clear_resets_to_empty() {
        let set = sorted_set();
        for v in [4, 2, 9] {
            set.add(v);
        }
        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.first(), None);
        set.add(1);
        assert_eq!(collect(&set), vec![1]);
    }

    #[test]
    fn sub_set_window() {
        let set = sorted_set();
        for v in [10, 20, 30, 40, 50] {
            set.add(v);
        }
        let window = set.sub_set(15, 45).unwrap();
        assert_eq!(window.first(), Some(&20));
        assert_eq!(window.last(), Some(&40));
        assert_eq!(window.size().unwrap(), 3);
        assert!(window.contains(&30));
        assert!(!window.contains(&50));
        let elems: Vec<i32> = window.iter().map(|r| r.unwrap()).collect();
        assert_eq!(elems, vec![20, 30, 40]);
    }

    #[test]
    fn sub_set_navigation_clamps_to_bounds() {
        let set = sorted_set();
        for v in [10, 20, 30, 40, 50] {
            set.add(v);
        }
        let window = set.sub_set(20, 50).unwrap();
        assert_eq!(window.ceiling(&5), Some(20));
        assert_eq!(window.higher(&40), None);
        assert_eq!(window.floor(&99), Some(40));
        assert_eq!(window.lower(&20), None);
    }

    #[test]
    fn sub_set_size_counts_after_pending_merges() {
        let set = sorted_set();
        for v in [10, 20, 30, 40, 50] {
            set.add(v);
        }
        let window = set.sub_set(15, 45).unwrap();
        // The counting traversal merges this batched add first, so the
        // count it caches is for a settled window.
        set.add(25);
        assert_eq!(window.size().unwrap(), 4);
        assert_eq!(window.size().unwrap(), 4, "cached once computed");
    }

    #[test]
    fn sub_set_is_read_only() {
        let set = sorted_set();
        set.add(1);
        set.add(9);
        let window = set.sub_set(0, 10).unwrap();
        assert!(matches!(
            window.add(5),
            Err(IndexError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            window.remove(&1),
            Err(IndexError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn malformed_sub_set_bounds() {
        let set = sorted_set();
        assert!(matches!(
            set.sub_set(10, 5),
            Err(IndexError::InvalidArgument(_))
        ));
    }

    #[test]
    fn iterator_detects_pending_batch() {
        let set = sorted_set();
        for v in [3, 1, 2] {
            set.add(v);
        }
        let mut iter = set.iter();
        assert_eq!(iter.next(), Some(Ok(1)));
        // An out-of-order add while the iterator is live leaves a pending
        // batch, which the next step must report instead of merging.
        set.add(100);
        set.add(0);
        assert_eq!(iter.next(), Some(Err(IndexError::ConcurrentModification)));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn merge_between_iteration_steps_is_detected() {
        let set = sorted_set();
        for v in [10, 20, 30] {
            set.add(v);
        }
        let mut iter = set.iter();
        assert_eq!(iter.next(), Some(Ok(10)));
        // An out-of-order add lands in the batch, and the size() call
        // merges it away before the iterator looks again. The merge must
        // still surface instead of being silently absorbed.
        set.add(15);
        assert_eq!(set.size(), 4);
        assert!(!set.has_pending());
        assert_eq!(iter.next(), Some(Err(IndexError::ConcurrentModification)));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn sorted_kind_keeps_key_duplicates() {
        // Elements are (key, id); identity order refines key order.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        struct Keyed(i32, u32);
        struct KeyedOrder;
        impl TotalOrder<Keyed> for KeyedOrder {
            fn cmp_with_id(&self, a: &Keyed, b: &Keyed) -> Ordering {
                a.0.cmp(&b.0).then(a.1.cmp(&b.1))
            }
            fn cmp_key(&self, a: &Keyed, b: &Keyed) -> Ordering {
                a.0.cmp(&b.0)
            }
        }

        let sorted = OrderedFsSet::new(IndexKind::Sorted, KeyedOrder);
        sorted.add(Keyed(5, 1));
        sorted.add(Keyed(5, 2));
        sorted.add(Keyed(3, 3));
        assert_eq!(sorted.size(), 3, "sorted kind keeps equal-key instances");

        let set = OrderedFsSet::new(IndexKind::Set, KeyedOrder);
        set.add(Keyed(5, 1));
        set.add(Keyed(5, 2));
        set.add(Keyed(3, 3));
        assert_eq!(set.size(), 2, "set kind is unique per key");
        // The first instance added still occupies the slot.
        let elems: Vec<Keyed> = set.iter().map(|r| r.unwrap()).collect();
        assert_eq!(elems, vec![Keyed(3, 3), Keyed(5, 1)]);
    }
}
