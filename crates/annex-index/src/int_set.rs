//! Compact set of non-negative integers.
//!
//! Backed by a bit vector with an optional offset, so a set whose members
//! cluster far from zero stores `key - offset` instead of `key`. All
//! operations except iteration are O(1) amortized. Single-thread use only.

use crate::error::IndexError;

const WORD_BITS: usize = 64;

/// A compact, offset-addressable set of non-negative integers.
#[derive(Debug, Clone, Default)]
pub struct PositiveIntSet {
    words: Vec<u64>,
    offset: usize,
    size: usize,
}

impl PositiveIntSet {
    /// An empty set with offset 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty set storing keys as `key - offset`.
    ///
    /// Adding a key below `offset` is an input error.
    pub fn with_offset(offset: usize) -> Self {
        Self {
            words: Vec::new(),
            offset,
            size: 0,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of members.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Remove all members. Capacity and offset are retained.
    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
        self.size = 0;
    }

    fn slot(&self, key: usize) -> Result<(usize, u64), IndexError> {
        let rel = key.checked_sub(self.offset).ok_or_else(|| {
            IndexError::invalid(format!("key {key} below set offset {}", self.offset))
        })?;
        Ok((rel / WORD_BITS, 1u64 << (rel % WORD_BITS)))
    }

    /// Insert `key`. Returns true if the key was newly inserted.
    ///
    /// Growing the backing vector never loses existing members.
    pub fn add(&mut self, key: usize) -> Result<bool, IndexError> {
        let (word, mask) = self.slot(key)?;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let fresh = self.words[word] & mask == 0;
        if fresh {
            self.words[word] |= mask;
            self.size += 1;
        }
        Ok(fresh)
    }

    /// Remove `key`. Returns true if the key was present.
    pub fn remove(&mut self, key: usize) -> Result<bool, IndexError> {
        let (word, mask) = self.slot(key)?;
        if word >= self.words.len() || self.words[word] & mask == 0 {
            return Ok(false);
        }
        self.words[word] &= !mask;
        self.size -= 1;
        Ok(true)
    }

    /// Membership test. Keys below the offset are simply absent.
    pub fn contains(&self, key: usize) -> bool {
        match self.slot(key) {
            Ok((word, mask)) => word < self.words.len() && self.words[word] & mask != 0,
            Err(_) => false,
        }
    }

    /// Ascending iteration over members.
    pub fn iter(&self) -> PositiveIntIter<'_> {
        PositiveIntIter {
            set: self,
            word: 0,
            current: if self.words.is_empty() { 0 } else { self.words[0] },
        }
    }
}

/// Ascending iterator over a [`PositiveIntSet`].
#[derive(Debug)]
pub struct PositiveIntIter<'a> {
    set: &'a PositiveIntSet,
    word: usize,
    current: u64,
}

impl Iterator for PositiveIntIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.current == 0 {
            self.word += 1;
            if self.word >= self.set.words.len() {
                return None;
            }
            self.current = self.set.words[self.word];
        }
        let bit = self.current.trailing_zeros() as usize;
        self.current &= self.current - 1;
        Some(self.set.offset + self.word * WORD_BITS + bit)
    }
}
