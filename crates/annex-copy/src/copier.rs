//! Worklist-driven deep copy between record graphs.
//!
//! Copying a record first creates an empty shell of the same-named type
//! in the destination, registers `source -> shell` in the identity map,
//! and enqueues the pair for a later feature pass. The pass resolves
//! reference slots through the same map, so a record referenced from
//! several places is cloned at most once and reference cycles terminate.
//! No recursion: chains of any length cost worklist entries, not stack.

use crate::error::CopyError;
use annex_index::PositiveIntSet;
use annex_model::{Cas, FeatureId, FeatureValue, FsId, ValueKind};
use std::collections::HashMap;

/// How type-system differences between source and destination are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    /// A missing type or feature fails the copy with [`CopyError`].
    Strict,
    /// A missing type skips the record, a missing feature skips the slot.
    Lenient,
}

/// Deep-copies records from one graph into another.
///
/// Scoped to one (source, destination) pair. The identity map persists
/// across calls on the same copier, so copying two records that share a
/// substructure yields one shared copy of it.
pub struct CasCopier<'s, 'd> {
    src: &'s Cas,
    dst: &'d mut Cas,
    mode: CopyMode,
    /// source record -> its destination counterpart
    fs_map: HashMap<FsId, FsId>,
    /// source records that were genuinely cloned (not resolved singletons,
    /// not lenient skips)
    cloned: PositiveIntSet,
    /// source records a lenient copy declined, so they are not re-attempted
    skipped: PositiveIntSet,
    /// pending (source, destination shell) feature passes
    worklist: Vec<(FsId, FsId)>,
}

impl<'s, 'd> CasCopier<'s, 'd> {
    /// A copier that fails on type-system mismatches.
    pub fn strict(src: &'s Cas, dst: &'d mut Cas) -> Self {
        Self::new(src, dst, CopyMode::Strict)
    }

    /// A copier that skips mismatched records and slots.
    pub fn lenient(src: &'s Cas, dst: &'d mut Cas) -> Self {
        Self::new(src, dst, CopyMode::Lenient)
    }

    pub fn new(src: &'s Cas, dst: &'d mut Cas, mode: CopyMode) -> Self {
        Self {
            src,
            dst,
            mode,
            fs_map: HashMap::new(),
            cloned: PositiveIntSet::new(),
            skipped: PositiveIntSet::new(),
            worklist: Vec::new(),
        }
    }

    /// Copy every view of the source graph.
    pub fn copy_cas(&mut self) -> Result<(), CopyError> {
        let names: Vec<String> = self.src.view_names().map(str::to_string).collect();
        for name in names {
            self.copy_view_records(&name)?;
        }
        Ok(())
    }

    /// Copy one named view, creating it in the destination if absent.
    pub fn copy_cas_view(&mut self, view: &str) -> Result<(), CopyError> {
        self.src.view(view)?;
        self.copy_view_records(view)
    }

    /// Copy one record and its reference closure. The copies are not
    /// indexed into any destination view.
    ///
    /// Returns `None` when a lenient copier skipped the record.
    pub fn copy_fs(&mut self, id: FsId) -> Result<Option<FsId>, CopyError> {
        let copy = self.copy_shell(id)?;
        self.drain()?;
        Ok(copy)
    }

    /// Whether `id` was actually duplicated into the destination.
    ///
    /// False for records a lenient copy skipped and for the per-view
    /// singletons, which are resolved in place rather than cloned.
    pub fn already_copied(&self, id: FsId) -> bool {
        self.cloned.contains(id.0 as usize)
    }

    fn copy_view_records(&mut self, view: &str) -> Result<(), CopyError> {
        self.ensure_view(view)?;
        let src = self.src;
        if src.view(view)?.sofa_id().is_some() {
            if let Some(text) = src.sofa_string(view)? {
                self.dst.set_sofa_string(view, &text)?;
            }
        }
        let ids: Vec<FsId> = src.view(view)?.bag().to_vec();
        for id in ids {
            let Some(copy) = self.copy_shell(id)? else {
                continue;
            };
            self.drain()?;
            // Singletons were resolved, not cloned; they already sit in
            // the destination view's indexes.
            if self.cloned.contains(id.0 as usize) {
                self.dst.index_fs(view, copy)?;
            }
        }
        Ok(())
    }

    fn ensure_view(&mut self, view: &str) -> Result<(), CopyError> {
        if !self.dst.has_view(view) {
            self.dst.create_view(view)?;
        }
        Ok(())
    }

    /// Resolve or create the destination counterpart of `id`, enqueueing
    /// a feature pass for fresh shells. Identity-map hits return early,
    /// which is what terminates cycles.
    fn copy_shell(&mut self, id: FsId) -> Result<Option<FsId>, CopyError> {
        if let Some(d) = self.fs_map.get(&id) {
            return Ok(Some(*d));
        }
        if self.skipped.contains(id.0 as usize) {
            return Ok(None);
        }
        let src = self.src;

        // The subject-of-analysis record resolves to the same-named
        // view's existing instance, never a clone.
        if let Some(view) = src.sofa_view(id) {
            let view = view.to_string();
            self.ensure_view(&view)?;
            let d = self.dst.sofa(&view)?;
            if self.dst.sofa_string(&view)?.is_none()
                && let Some(text) = src.sofa_string(&view)?
            {
                self.dst.set_sofa_string(&view, &text)?;
            }
            self.fs_map.insert(id, d);
            return Ok(Some(d));
        }

        // The whole-document annotation overwrites its destination
        // counterpart's slots in place.
        if let Some(view) = src.document_annotation_view(id) {
            let view = view.to_string();
            self.ensure_view(&view)?;
            let d = self.dst.document_annotation(&view)?;
            self.fs_map.insert(id, d);
            self.worklist.push((id, d));
            return Ok(Some(d));
        }

        let name = src.type_system().type_name(src.fs(id)?.type_id);
        let Some(dst_ty) = self.dst.type_system().type_named(name) else {
            return match self.mode {
                CopyMode::Strict => Err(CopyError::MissingType(name.to_string())),
                CopyMode::Lenient => {
                    self.skipped.add(id.0 as usize)?;
                    Ok(None)
                }
            };
        };
        let shell = self.dst.create_fs(dst_ty)?;
        self.fs_map.insert(id, shell);
        self.cloned.add(id.0 as usize)?;
        self.worklist.push((id, shell));
        Ok(Some(shell))
    }

    fn drain(&mut self) -> Result<(), CopyError> {
        while let Some((src_id, dst_id)) = self.worklist.pop() {
            // An in-place overwrite of a document annotation changes its
            // index key, so pull it out and re-index around the pass.
            let doc_view = self
                .dst
                .document_annotation_view(dst_id)
                .map(str::to_string);
            if let Some(view) = &doc_view {
                self.dst.remove_from_index(view, dst_id)?;
            }
            self.copy_features(src_id, dst_id)?;
            if let Some(view) = &doc_view {
                self.dst.index_fs(view, dst_id)?;
            }
        }
        Ok(())
    }

    /// Transfer every slot of `src_id` onto `dst_id`, mapping features by
    /// name between the two type systems.
    fn copy_features(&mut self, src_id: FsId, dst_id: FsId) -> Result<(), CopyError> {
        let src = self.src;
        let src_ts = src.type_system();
        let src_ty = src.fs(src_id)?.type_id;
        let dst_ty = self.dst.fs(dst_id)?.type_id;
        for &f in src_ts.all_features(src_ty) {
            let name = src_ts.feature_name(f);
            let Some(dst_f) = self.dst.type_system().feature_named(dst_ty, name) else {
                match self.mode {
                    CopyMode::Strict => {
                        return Err(CopyError::MissingFeature {
                            ty: self.dst.type_system().type_name(dst_ty).to_string(),
                            feature: name.to_string(),
                        });
                    }
                    CopyMode::Lenient => continue,
                }
            };
            let value = src.get_feature(src_id, f)?.clone();
            self.copy_value(dst_id, dst_f, value)?;
        }
        Ok(())
    }

    fn copy_value(
        &mut self,
        dst_id: FsId,
        dst_f: FeatureId,
        value: FeatureValue,
    ) -> Result<(), CopyError> {
        let expected = self.dst.type_system().feature_range(dst_f);
        match value {
            FeatureValue::Ref(r) => {
                if expected != ValueKind::Ref {
                    return self.mismatch(dst_f, expected, ValueKind::Ref);
                }
                let copied = match r {
                    None => None,
                    Some(r) => self.copy_shell(r.id)?.map(|c| self.dst.fs_ref(c)),
                };
                self.dst
                    .set_feature(dst_id, dst_f, FeatureValue::Ref(copied))?;
            }
            FeatureValue::RefArray(refs) => {
                if expected != ValueKind::RefArray {
                    return self.mismatch(dst_f, expected, ValueKind::RefArray);
                }
                let mut out = Vec::with_capacity(refs.len());
                for r in refs {
                    // Lenient skips drop the element rather than leave a
                    // dangling handle.
                    if let Some(c) = self.copy_shell(r.id)? {
                        out.push(self.dst.fs_ref(c));
                    }
                }
                self.dst
                    .set_feature(dst_id, dst_f, FeatureValue::RefArray(out))?;
            }
            primitive => {
                if primitive.kind() == expected {
                    self.dst.set_feature(dst_id, dst_f, primitive)?;
                } else if let Some(text) = primitive.as_lexical() {
                    // Differing scalar kinds transfer through the
                    // universal lexical form.
                    match FeatureValue::from_lexical(expected, &text) {
                        Ok(converted) => self.dst.set_feature(dst_id, dst_f, converted)?,
                        Err(e) => match self.mode {
                            CopyMode::Strict => return Err(e.into()),
                            CopyMode::Lenient => {}
                        },
                    }
                } else {
                    let given = primitive.kind();
                    return self.mismatch(dst_f, expected, given);
                }
            }
        }
        Ok(())
    }

    fn mismatch(
        &mut self,
        dst_f: FeatureId,
        expected: ValueKind,
        given: ValueKind,
    ) -> Result<(), CopyError> {
        match self.mode {
            CopyMode::Strict => Err(CopyError::RangeMismatch {
                feature: self.dst.type_system().feature_name(dst_f).to_string(),
                expected,
                given,
            }),
            CopyMode::Lenient => Ok(()),
        }
    }
}
