//! The record graph: an arena of feature structures, named views, and
//! per-view indexes.
//!
//! Every record is owned by exactly one graph. Reference slots store
//! [`FsRef`] handles carrying the owning graph's id, so storing a record
//! from another graph without copying fails at the assignment, not at
//! some later traversal.

use crate::annot::{AnnotKey, AnnotOrder};
use crate::error::ModelError;
use crate::fs::{FeatureStructure, FsId, FsRef};
use crate::typesystem::{FeatureId, TypeId, TypeSystem};
use crate::value::FeatureValue;
use annex_index::{IndexKind, OrderedFsSet};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

/// The view every graph starts with.
pub const INITIAL_VIEW: &str = "_InitialView";

static NEXT_GRAPH_ID: AtomicU32 = AtomicU32::new(1);

/// One logical view of a graph: a sorted annotation index, a bag of all
/// indexed records, and the per-view singletons.
pub struct View {
    name: String,
    sofa: Option<FsId>,
    document_annotation: Option<FsId>,
    annotations: OrderedFsSet<AnnotKey, AnnotOrder>,
    bag: Vec<FsId>,
}

impl View {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            sofa: None,
            document_annotation: None,
            annotations: OrderedFsSet::new(IndexKind::Sorted, AnnotOrder),
            bag: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The sorted annotation index of this view.
    pub fn annotations(&self) -> &OrderedFsSet<AnnotKey, AnnotOrder> {
        &self.annotations
    }

    /// Every indexed record, in indexing order, duplicates included.
    pub fn bag(&self) -> &[FsId] {
        &self.bag
    }

    pub fn sofa_id(&self) -> Option<FsId> {
        self.sofa
    }

    pub fn document_annotation_id(&self) -> Option<FsId> {
        self.document_annotation
    }
}

/// An in-memory record graph over a committed type system.
pub struct Cas {
    graph_id: u32,
    ts: Arc<TypeSystem>,
    records: Vec<FeatureStructure>,
    views: BTreeMap<String, View>,
}

impl Cas {
    /// A fresh graph with one initial view. The type system must be
    /// committed.
    pub fn new(ts: Arc<TypeSystem>) -> Result<Self, ModelError> {
        if !ts.is_committed() {
            return Err(ModelError::NotCommitted);
        }
        let mut views = BTreeMap::new();
        views.insert(INITIAL_VIEW.to_string(), View::new(INITIAL_VIEW));
        Ok(Self {
            graph_id: NEXT_GRAPH_ID.fetch_add(1, AtomicOrdering::Relaxed),
            ts,
            records: Vec::new(),
            views,
        })
    }

    pub fn graph_id(&self) -> u32 {
        self.graph_id
    }

    pub fn type_system(&self) -> &Arc<TypeSystem> {
        &self.ts
    }

    /// Drop all records and views, keeping identity and type system.
    pub fn reset(&mut self) {
        self.records.clear();
        self.views.clear();
        self.views
            .insert(INITIAL_VIEW.to_string(), View::new(INITIAL_VIEW));
    }

    // ----- views -----

    pub fn create_view(&mut self, name: &str) -> Result<&View, ModelError> {
        if self.views.contains_key(name) {
            return Err(ModelError::DuplicateView(name.to_string()));
        }
        self.views.insert(name.to_string(), View::new(name));
        Ok(&self.views[name])
    }

    pub fn view(&self, name: &str) -> Result<&View, ModelError> {
        self.views
            .get(name)
            .ok_or_else(|| ModelError::UnknownView(name.to_string()))
    }

    pub fn has_view(&self, name: &str) -> bool {
        self.views.contains_key(name)
    }

    pub fn view_names(&self) -> impl Iterator<Item = &str> {
        self.views.keys().map(String::as_str)
    }

    // ----- records -----

    /// Allocate a record of `ty` with every slot at its default. The
    /// record is not indexed until [`Cas::index_fs`].
    pub fn create_fs(&mut self, ty: TypeId) -> Result<FsId, ModelError> {
        if ty.0 as usize >= self.ts.type_count() {
            return Err(ModelError::UnknownType(format!("type code {}", ty.0)));
        }
        let id = FsId(self.records.len() as u32);
        let slots = self
            .ts
            .all_features(ty)
            .iter()
            .map(|f| FeatureValue::default_for(self.ts.feature_range(*f)))
            .collect();
        self.records.push(FeatureStructure::new(id, ty, slots));
        Ok(id)
    }

    pub fn fs(&self, id: FsId) -> Result<&FeatureStructure, ModelError> {
        self.records
            .get(id.0 as usize)
            .ok_or(ModelError::UnknownRecord(id))
    }

    /// Handle for storing this record into a reference slot.
    pub fn fs_ref(&self, id: FsId) -> FsRef {
        FsRef {
            graph: self.graph_id,
            id,
        }
    }

    /// Dereference a handle, rejecting handles from other graphs.
    pub fn resolve(&self, r: FsRef) -> Result<&FeatureStructure, ModelError> {
        self.check_owned(r)?;
        self.fs(r.id)
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn get_feature(&self, id: FsId, feature: FeatureId) -> Result<&FeatureValue, ModelError> {
        let fs = self.fs(id)?;
        let slot = self
            .ts
            .slot_of(fs.type_id, feature)
            .ok_or_else(|| ModelError::UnknownFeature(self.ts.feature_name(feature).to_string()))?;
        Ok(&fs.slots[slot])
    }

    /// Assign a feature. The value kind must match the declared range and
    /// every contained reference must belong to this graph.
    pub fn set_feature(
        &mut self,
        id: FsId,
        feature: FeatureId,
        value: FeatureValue,
    ) -> Result<(), ModelError> {
        let expected = self.ts.feature_range(feature);
        if value.kind() != expected {
            return Err(ModelError::ValueKindMismatch {
                feature: self.ts.feature_name(feature).to_string(),
                expected,
                given: value.kind(),
            });
        }
        match &value {
            FeatureValue::Ref(Some(r)) => self.check_owned(*r)?,
            FeatureValue::RefArray(refs) => {
                for r in refs {
                    self.check_owned(*r)?;
                }
            }
            _ => {}
        }
        let ts = Arc::clone(&self.ts);
        let fs = self
            .records
            .get_mut(id.0 as usize)
            .ok_or(ModelError::UnknownRecord(id))?;
        let slot = ts
            .slot_of(fs.type_id, feature)
            .ok_or_else(|| ModelError::UnknownFeature(ts.feature_name(feature).to_string()))?;
        fs.slots[slot] = value;
        Ok(())
    }

    fn check_owned(&self, r: FsRef) -> Result<(), ModelError> {
        if r.graph != self.graph_id {
            return Err(ModelError::CrossGraphReference {
                id: r.id,
                found: r.graph,
                expected: self.graph_id,
            });
        }
        if r.id.0 as usize >= self.records.len() {
            return Err(ModelError::UnknownRecord(r.id));
        }
        Ok(())
    }

    // ----- annotations -----

    /// Create an annotation-subtype record, set its span, and index it.
    pub fn create_annotation(
        &mut self,
        view: &str,
        ty: TypeId,
        begin: i32,
        end: i32,
    ) -> Result<FsId, ModelError> {
        let b = self.ts.builtins();
        if !self.ts.is_subtype_of(ty, b.annotation) {
            return Err(ModelError::UnknownType(format!(
                "{} is not an annotation type",
                self.ts.type_name(ty)
            )));
        }
        let bf = self.ts.builtin_features();
        let id = self.create_fs(ty)?;
        self.set_feature(id, bf.begin, FeatureValue::Int(begin))?;
        self.set_feature(id, bf.end, FeatureValue::Int(end))?;
        self.index_fs(view, id)?;
        Ok(id)
    }

    /// `[begin, end)` of an annotation record.
    pub fn annotation_span(&self, id: FsId) -> Result<(i32, i32), ModelError> {
        let fs = self.fs(id)?;
        let b = self.ts.builtins();
        if !self.ts.is_subtype_of(fs.type_id, b.annotation) {
            return Err(ModelError::NotAnnotation(id));
        }
        let bf = self.ts.builtin_features();
        let begin = match self.get_feature(id, bf.begin)? {
            FeatureValue::Int(v) => *v,
            _ => 0,
        };
        let end = match self.get_feature(id, bf.end)? {
            FeatureValue::Int(v) => *v,
            _ => 0,
        };
        Ok((begin, end))
    }

    /// The index key of an annotation record.
    pub fn annot_key(&self, id: FsId) -> Result<AnnotKey, ModelError> {
        let (begin, end) = self.annotation_span(id)?;
        let fs = self.fs(id)?;
        Ok(AnnotKey {
            begin,
            end,
            type_code: fs.type_id.0,
            id,
        })
    }

    /// Add a record to a view's indexes: the bag always, the sorted
    /// annotation index when the record is an annotation.
    pub fn index_fs(&mut self, view: &str, id: FsId) -> Result<(), ModelError> {
        let fs = self.fs(id)?;
        let is_annotation = self
            .ts
            .is_subtype_of(fs.type_id, self.ts.builtins().annotation);
        let key = if is_annotation {
            Some(self.annot_key(id)?)
        } else {
            None
        };
        let view = self
            .views
            .get_mut(view)
            .ok_or_else(|| ModelError::UnknownView(view.to_string()))?;
        view.bag.push(id);
        if let Some(key) = key {
            view.annotations.add(key);
        }
        Ok(())
    }

    /// Remove a record from a view's indexes.
    pub fn remove_from_index(&mut self, view: &str, id: FsId) -> Result<(), ModelError> {
        let key = self.annot_key(id).ok();
        let view = self
            .views
            .get_mut(view)
            .ok_or_else(|| ModelError::UnknownView(view.to_string()))?;
        view.bag.retain(|v| *v != id);
        if let Some(key) = key {
            view.annotations.remove(&key);
        }
        Ok(())
    }

    // ----- per-view singletons -----

    /// The per-view subject-of-analysis record, created on first request.
    pub fn sofa(&mut self, view: &str) -> Result<FsId, ModelError> {
        if let Some(id) = self.view(view)?.sofa {
            return Ok(id);
        }
        let b = self.ts.builtins();
        let bf = self.ts.builtin_features();
        let id = self.create_fs(b.sofa)?;
        self.set_feature(id, bf.sofa_id, FeatureValue::Str(Some(view.to_string())))?;
        let view = self
            .views
            .get_mut(view)
            .ok_or_else(|| ModelError::UnknownView(view.to_string()))?;
        view.sofa = Some(id);
        view.bag.push(id);
        Ok(id)
    }

    /// Set the subject text, adjusting the document annotation's span if
    /// one exists.
    pub fn set_sofa_string(&mut self, view: &str, text: &str) -> Result<(), ModelError> {
        let sofa = self.sofa(view)?;
        let bf = self.ts.builtin_features();
        self.set_feature(sofa, bf.sofa_string, FeatureValue::Str(Some(text.to_string())))?;
        if let Some(doc) = self.view(view)?.document_annotation {
            let old_key = self.annot_key(doc)?;
            self.set_feature(doc, bf.end, FeatureValue::Int(text.len() as i32))?;
            let new_key = self.annot_key(doc)?;
            let v = self.views.get_mut(view).expect("view checked above");
            v.annotations.remove(&old_key);
            v.annotations.add(new_key);
        }
        Ok(())
    }

    pub fn sofa_string(&self, view: &str) -> Result<Option<String>, ModelError> {
        let Some(sofa) = self.view(view)?.sofa else {
            return Ok(None);
        };
        let bf = self.ts.builtin_features();
        match self.get_feature(sofa, bf.sofa_string)? {
            FeatureValue::Str(v) => Ok(v.clone()),
            _ => Ok(None),
        }
    }

    /// The per-view whole-document annotation, created on first request
    /// spanning the current subject text.
    pub fn document_annotation(&mut self, view: &str) -> Result<FsId, ModelError> {
        if let Some(id) = self.view(view)?.document_annotation {
            return Ok(id);
        }
        let end = self
            .sofa_string(view)?
            .map(|s| s.len() as i32)
            .unwrap_or(0);
        let b = self.ts.builtins();
        let id = self.create_annotation(view, b.document_annotation, 0, end)?;
        let view = self
            .views
            .get_mut(view)
            .ok_or_else(|| ModelError::UnknownView(view.to_string()))?;
        view.document_annotation = Some(id);
        Ok(id)
    }

    /// The view whose sofa singleton is `id`, if any.
    pub fn sofa_view(&self, id: FsId) -> Option<&str> {
        self.views
            .values()
            .find(|v| v.sofa == Some(id))
            .map(|v| v.name())
    }

    /// The view whose document annotation is `id`, if any.
    pub fn document_annotation_view(&self, id: FsId) -> Option<&str> {
        self.views
            .values()
            .find(|v| v.document_annotation == Some(id))
            .map(|v| v.name())
    }

    // ----- debug export -----

    /// Deterministic JSON rendering of the graph, for inspection and
    /// golden tests. Graph-local: handles render without the graph id.
    pub fn to_debug_json(&self) -> Value {
        let records: Vec<Value> = self
            .records
            .iter()
            .map(|fs| {
                let features: Vec<Value> = self
                    .ts
                    .all_features(fs.type_id)
                    .iter()
                    .zip(&fs.slots)
                    .map(|(f, v)| {
                        json!({
                            "feature": self.ts.feature_name(*f),
                            "value": Self::value_json(v),
                        })
                    })
                    .collect();
                json!({
                    "id": fs.id.to_string(),
                    "type": self.ts.type_name(fs.type_id),
                    "features": features,
                })
            })
            .collect();
        let views: Vec<Value> = self
            .views
            .values()
            .map(|v| {
                let annotations: Vec<String> = v
                    .annotations
                    .iter()
                    .filter_map(|r| r.ok())
                    .map(|k| k.id.to_string())
                    .collect();
                json!({
                    "name": v.name(),
                    "sofa": v.sofa.map(|s| s.to_string()),
                    "annotations": annotations,
                })
            })
            .collect();
        json!({ "records": records, "views": views })
    }

    fn value_json(value: &FeatureValue) -> Value {
        match value {
            FeatureValue::Ref(Some(r)) => json!(r.id.to_string()),
            FeatureValue::Ref(None) => Value::Null,
            FeatureValue::RefArray(refs) => {
                json!(refs.iter().map(|r| r.id.to_string()).collect::<Vec<_>>())
            }
            other => serde_json::to_value(other).expect("feature values serialize"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueKind;

    fn token_system() -> (Arc<TypeSystem>, TypeId) {
        let mut ts = TypeSystem::new();
        let b = ts.builtins();
        let token = ts.register_type("Token", Some(b.annotation)).unwrap();
        ts.register_feature(token, "pos", ValueKind::Str).unwrap();
        ts.commit();
        (Arc::new(ts), token)
    }

    #[test]
    fn uncommitted_type_system_is_rejected() {
        let ts = Arc::new(TypeSystem::new());
        assert!(matches!(Cas::new(ts), Err(ModelError::NotCommitted)));
    }

    #[test]
    fn annotations_index_in_span_order() {
        let (ts, token) = token_system();
        let mut cas = Cas::new(ts).unwrap();
        let c = cas.create_annotation(INITIAL_VIEW, token, 10, 12).unwrap();
        let a = cas.create_annotation(INITIAL_VIEW, token, 0, 4).unwrap();
        let b = cas.create_annotation(INITIAL_VIEW, token, 5, 9).unwrap();
        let ids: Vec<FsId> = cas
            .view(INITIAL_VIEW)
            .unwrap()
            .annotations()
            .iter()
            .map(|r| r.unwrap().id)
            .collect();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[test]
    fn cross_graph_reference_is_rejected() {
        let mut ts = TypeSystem::new();
        let b = ts.builtins();
        let holder = ts.register_type("Holder", Some(b.top)).unwrap();
        let link = ts.register_feature(holder, "link", ValueKind::Ref).unwrap();
        ts.commit();
        let ts = Arc::new(ts);

        let mut source = Cas::new(Arc::clone(&ts)).unwrap();
        let mut target = Cas::new(ts).unwrap();
        let foreign = source.create_fs(holder).unwrap();
        let foreign = source.fs_ref(foreign);
        let local = target.create_fs(holder).unwrap();
        let err = target
            .set_feature(local, link, FeatureValue::Ref(Some(foreign)))
            .unwrap_err();
        assert!(matches!(err, ModelError::CrossGraphReference { .. }));
        assert!(target.resolve(foreign).is_err());
    }

    #[test]
    fn sofa_is_a_per_view_singleton() {
        let (ts, _) = token_system();
        let mut cas = Cas::new(ts).unwrap();
        let s1 = cas.sofa(INITIAL_VIEW).unwrap();
        let s2 = cas.sofa(INITIAL_VIEW).unwrap();
        assert_eq!(s1, s2);
        cas.create_view("gold").unwrap();
        let s3 = cas.sofa("gold").unwrap();
        assert_ne!(s1, s3);
        assert_eq!(cas.sofa_view(s3), Some("gold"));
    }

    #[test]
    fn document_annotation_spans_the_sofa_text() {
        let (ts, _) = token_system();
        let mut cas = Cas::new(ts).unwrap();
        cas.set_sofa_string(INITIAL_VIEW, "hello world").unwrap();
        let doc = cas.document_annotation(INITIAL_VIEW).unwrap();
        assert_eq!(cas.annotation_span(doc).unwrap(), (0, 11));
        // Growing the text re-spans the document annotation.
        cas.set_sofa_string(INITIAL_VIEW, "hello wider world").unwrap();
        assert_eq!(cas.annotation_span(doc).unwrap(), (0, 17));
    }

    #[test]
    fn remove_from_index_keeps_the_record() {
        let (ts, token) = token_system();
        let mut cas = Cas::new(ts).unwrap();
        let a = cas.create_annotation(INITIAL_VIEW, token, 0, 4).unwrap();
        cas.remove_from_index(INITIAL_VIEW, a).unwrap();
        assert_eq!(cas.view(INITIAL_VIEW).unwrap().annotations().size(), 0);
        assert!(cas.fs(a).is_ok(), "unindexed records stay in the arena");
    }

    #[test]
    fn value_kind_mismatch_is_an_error() {
        let (ts, token) = token_system();
        let pos = ts.feature_named(token, "pos").unwrap();
        let mut cas = Cas::new(ts).unwrap();
        let t = cas.create_annotation(INITIAL_VIEW, token, 0, 1).unwrap();
        let err = cas.set_feature(t, pos, FeatureValue::Int(3)).unwrap_err();
        assert!(matches!(err, ModelError::ValueKindMismatch { .. }));
    }

    #[test]
    fn reset_keeps_identity_and_type_system() {
        let (ts, token) = token_system();
        let mut cas = Cas::new(ts).unwrap();
        cas.create_annotation(INITIAL_VIEW, token, 0, 1).unwrap();
        let graph = cas.graph_id();
        cas.reset();
        assert_eq!(cas.graph_id(), graph);
        assert_eq!(cas.record_count(), 0);
        assert!(cas.has_view(INITIAL_VIEW));
    }
}
