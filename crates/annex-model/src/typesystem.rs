//! The type registry: a single-rooted subtype hierarchy with declared
//! features, open during schema assembly and frozen by `commit`.
//!
//! The registry is an explicit value owned by whoever assembles the
//! schema and shared (via `Arc`) with every graph built from it. There is
//! no process-global type table and no load-order dependence: type codes
//! are dense indexes assigned in registration order, and registration
//! order doubles as the type-priority order.

use crate::error::ModelError;
use crate::value::ValueKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dense type code. Assigned in registration order by one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeId(pub u32);

/// Dense registry-wide feature code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeatureId(pub u32);

#[derive(Debug, Clone)]
struct TypeDef {
    name: String,
    parent: Option<TypeId>,
    /// Features declared directly on this type.
    own_features: Vec<FeatureId>,
    /// Full slot layout, inherited first. Filled at commit.
    all_features: Vec<FeatureId>,
}

#[derive(Debug, Clone)]
struct FeatureDef {
    name: String,
    owner: TypeId,
    range: ValueKind,
}

/// Well-known types every registry starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinTypes {
    pub top: TypeId,
    pub annotation: TypeId,
    pub sofa: TypeId,
    pub document_annotation: TypeId,
}

/// Well-known features every registry starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinFeatures {
    pub begin: FeatureId,
    pub end: FeatureId,
    pub sofa_id: FeatureId,
    pub sofa_string: FeatureId,
    pub language: FeatureId,
}

/// The type system: assembled open, then committed and immutable.
#[derive(Debug, Clone)]
pub struct TypeSystem {
    types: Vec<TypeDef>,
    by_name: BTreeMap<String, TypeId>,
    features: Vec<FeatureDef>,
    committed: bool,
    builtins: BuiltinTypes,
    builtin_features: BuiltinFeatures,
}

pub const TOP_TYPE: &str = "Top";
pub const ANNOTATION_TYPE: &str = "Annotation";
pub const SOFA_TYPE: &str = "Sofa";
pub const DOCUMENT_ANNOTATION_TYPE: &str = "DocumentAnnotation";

impl TypeSystem {
    /// A fresh, open registry holding only the built-in types.
    pub fn new() -> Self {
        let mut ts = Self {
            types: Vec::new(),
            by_name: BTreeMap::new(),
            features: Vec::new(),
            committed: false,
            builtins: BuiltinTypes {
                top: TypeId(0),
                annotation: TypeId(0),
                sofa: TypeId(0),
                document_annotation: TypeId(0),
            },
            builtin_features: BuiltinFeatures {
                begin: FeatureId(0),
                end: FeatureId(0),
                sofa_id: FeatureId(0),
                sofa_string: FeatureId(0),
                language: FeatureId(0),
            },
        };
        let top = ts.register_type(TOP_TYPE, None).expect("fresh registry");
        let annotation = ts
            .register_type(ANNOTATION_TYPE, Some(top))
            .expect("fresh registry");
        let sofa = ts.register_type(SOFA_TYPE, Some(top)).expect("fresh registry");
        let document_annotation = ts
            .register_type(DOCUMENT_ANNOTATION_TYPE, Some(annotation))
            .expect("fresh registry");
        let begin = ts
            .register_feature(annotation, "begin", ValueKind::Int)
            .expect("fresh registry");
        let end = ts
            .register_feature(annotation, "end", ValueKind::Int)
            .expect("fresh registry");
        let sofa_id = ts
            .register_feature(sofa, "sofaID", ValueKind::Str)
            .expect("fresh registry");
        let sofa_string = ts
            .register_feature(sofa, "sofaString", ValueKind::Str)
            .expect("fresh registry");
        let language = ts
            .register_feature(document_annotation, "language", ValueKind::Str)
            .expect("fresh registry");
        ts.builtins = BuiltinTypes {
            top,
            annotation,
            sofa,
            document_annotation,
        };
        ts.builtin_features = BuiltinFeatures {
            begin,
            end,
            sofa_id,
            sofa_string,
            language,
        };
        ts
    }

    pub fn builtins(&self) -> BuiltinTypes {
        self.builtins
    }

    pub fn builtin_features(&self) -> BuiltinFeatures {
        self.builtin_features
    }

    /// Register a subtype. Input error once committed or on a duplicate
    /// name.
    pub fn register_type(
        &mut self,
        name: &str,
        parent: Option<TypeId>,
    ) -> Result<TypeId, ModelError> {
        if self.committed {
            return Err(ModelError::Frozen(format!("type {name}")));
        }
        if self.by_name.contains_key(name) {
            return Err(ModelError::DuplicateType(name.to_string()));
        }
        if let Some(p) = parent
            && p.0 as usize >= self.types.len()
        {
            return Err(ModelError::UnknownType(format!("type code {}", p.0)));
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeDef {
            name: name.to_string(),
            parent,
            own_features: Vec::new(),
            all_features: Vec::new(),
        });
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Declare a feature on `owner`.
    pub fn register_feature(
        &mut self,
        owner: TypeId,
        name: &str,
        range: ValueKind,
    ) -> Result<FeatureId, ModelError> {
        if self.committed {
            return Err(ModelError::Frozen(format!("feature {name}")));
        }
        let def = self
            .types
            .get_mut(owner.0 as usize)
            .ok_or_else(|| ModelError::UnknownType(format!("type code {}", owner.0)))?;
        let id = FeatureId(self.features.len() as u32);
        def.own_features.push(id);
        self.features.push(FeatureDef {
            name: name.to_string(),
            owner,
            range,
        });
        Ok(id)
    }

    /// Freeze the hierarchy and compute every type's slot layout.
    pub fn commit(&mut self) {
        if self.committed {
            return;
        }
        // Types are registered parent-first, so one forward pass suffices.
        for code in 0..self.types.len() {
            let mut layout = match self.types[code].parent {
                Some(p) => self.types[p.0 as usize].all_features.clone(),
                None => Vec::new(),
            };
            layout.extend(self.types[code].own_features.iter().copied());
            self.types[code].all_features = layout;
        }
        self.committed = true;
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    pub fn type_named(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    pub fn type_name(&self, id: TypeId) -> &str {
        &self.types[id.0 as usize].name
    }

    pub fn parent(&self, id: TypeId) -> Option<TypeId> {
        self.types[id.0 as usize].parent
    }

    /// Subtype query: walks the parent chain from `sub` up to the root.
    pub fn is_subtype_of(&self, sub: TypeId, sup: TypeId) -> bool {
        let mut current = Some(sub);
        while let Some(t) = current {
            if t == sup {
                return true;
            }
            current = self.types[t.0 as usize].parent;
        }
        false
    }

    /// All features a record of this type carries, inherited first.
    ///
    /// Only meaningful after commit (layouts are computed then).
    pub fn all_features(&self, id: TypeId) -> &[FeatureId] {
        &self.types[id.0 as usize].all_features
    }

    /// Slot position of `feature` in the layout of `ty`.
    pub fn slot_of(&self, ty: TypeId, feature: FeatureId) -> Option<usize> {
        self.all_features(ty).iter().position(|f| *f == feature)
    }

    /// Look a feature up by name anywhere in the layout of `ty`.
    pub fn feature_named(&self, ty: TypeId, name: &str) -> Option<FeatureId> {
        self.all_features(ty)
            .iter()
            .copied()
            .find(|f| self.feature_name(*f) == name)
    }

    pub fn feature_name(&self, id: FeatureId) -> &str {
        &self.features[id.0 as usize].name
    }

    pub fn feature_owner(&self, id: FeatureId) -> TypeId {
        self.features[id.0 as usize].owner
    }

    pub fn feature_range(&self, id: FeatureId) -> ValueKind {
        self.features[id.0 as usize].range
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}

impl Default for TypeSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_rooted_at_top() {
        let ts = TypeSystem::new();
        let b = ts.builtins();
        assert!(ts.is_subtype_of(b.annotation, b.top));
        assert!(ts.is_subtype_of(b.document_annotation, b.annotation));
        assert!(ts.is_subtype_of(b.sofa, b.top));
        assert!(!ts.is_subtype_of(b.top, b.annotation));
    }

    #[test]
    fn commit_freezes_the_registry() {
        let mut ts = TypeSystem::new();
        let b = ts.builtins();
        let token = ts.register_type("Token", Some(b.annotation)).unwrap();
        ts.commit();
        assert!(ts.is_committed());
        assert!(matches!(
            ts.register_type("Late", Some(b.top)),
            Err(ModelError::Frozen(_))
        ));
        assert!(matches!(
            ts.register_feature(token, "late", ValueKind::Int),
            Err(ModelError::Frozen(_))
        ));
    }

    #[test]
    fn slot_layout_inherits_parent_features_first() {
        let mut ts = TypeSystem::new();
        let b = ts.builtins();
        let token = ts.register_type("Token", Some(b.annotation)).unwrap();
        let pos = ts.register_feature(token, "pos", ValueKind::Str).unwrap();
        ts.commit();
        let bf = ts.builtin_features();
        assert_eq!(ts.all_features(token), &[bf.begin, bf.end, pos]);
        assert_eq!(ts.slot_of(token, bf.begin), Some(0));
        assert_eq!(ts.slot_of(token, pos), Some(2));
        assert_eq!(ts.slot_of(b.annotation, pos), None);
    }

    #[test]
    fn duplicate_type_names_are_rejected() {
        let mut ts = TypeSystem::new();
        let b = ts.builtins();
        ts.register_type("Token", Some(b.annotation)).unwrap();
        assert!(matches!(
            ts.register_type("Token", Some(b.annotation)),
            Err(ModelError::DuplicateType(_))
        ));
    }

    #[test]
    fn feature_lookup_by_name_spans_the_hierarchy() {
        let mut ts = TypeSystem::new();
        let b = ts.builtins();
        let token = ts.register_type("Token", Some(b.annotation)).unwrap();
        ts.commit();
        assert_eq!(
            ts.feature_named(token, "begin"),
            Some(ts.builtin_features().begin)
        );
        assert_eq!(ts.feature_named(token, "missing"), None);
    }
}
