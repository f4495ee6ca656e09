//! Feature values: a closed tagged union over the primitive kinds, the
//! per-kind primitive arrays, and record references.
//!
//! The union is closed on purpose: code that dispatches per element kind
//! (the copier in particular) matches once over these variants instead of
//! re-testing runtime classes per call.

use crate::error::ModelError;
use crate::fs::FsRef;
use serde::{Deserialize, Serialize};

/// The kind of value a feature ranges over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueKind {
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Str,
    Ref,
    BoolArray,
    ByteArray,
    ShortArray,
    IntArray,
    LongArray,
    FloatArray,
    DoubleArray,
    StrArray,
    RefArray,
}

impl ValueKind {
    /// Whether values of this kind are copied by direct value transfer.
    pub fn is_primitive(self) -> bool {
        !matches!(self, ValueKind::Ref | ValueKind::RefArray)
    }

    pub fn is_array(self) -> bool {
        matches!(
            self,
            ValueKind::BoolArray
                | ValueKind::ByteArray
                | ValueKind::ShortArray
                | ValueKind::IntArray
                | ValueKind::LongArray
                | ValueKind::FloatArray
                | ValueKind::DoubleArray
                | ValueKind::StrArray
                | ValueKind::RefArray
        )
    }
}

/// A slot value in a feature structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeatureValue {
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(Option<String>),
    Ref(Option<FsRef>),
    BoolArray(Vec<bool>),
    ByteArray(Vec<i8>),
    ShortArray(Vec<i16>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    StrArray(Vec<String>),
    RefArray(Vec<FsRef>),
}

impl FeatureValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            FeatureValue::Bool(_) => ValueKind::Bool,
            FeatureValue::Byte(_) => ValueKind::Byte,
            FeatureValue::Short(_) => ValueKind::Short,
            FeatureValue::Int(_) => ValueKind::Int,
            FeatureValue::Long(_) => ValueKind::Long,
            FeatureValue::Float(_) => ValueKind::Float,
            FeatureValue::Double(_) => ValueKind::Double,
            FeatureValue::Str(_) => ValueKind::Str,
            FeatureValue::Ref(_) => ValueKind::Ref,
            FeatureValue::BoolArray(_) => ValueKind::BoolArray,
            FeatureValue::ByteArray(_) => ValueKind::ByteArray,
            FeatureValue::ShortArray(_) => ValueKind::ShortArray,
            FeatureValue::IntArray(_) => ValueKind::IntArray,
            FeatureValue::LongArray(_) => ValueKind::LongArray,
            FeatureValue::FloatArray(_) => ValueKind::FloatArray,
            FeatureValue::DoubleArray(_) => ValueKind::DoubleArray,
            FeatureValue::StrArray(_) => ValueKind::StrArray,
            FeatureValue::RefArray(_) => ValueKind::RefArray,
        }
    }

    /// The unset value for a feature of the given kind.
    pub fn default_for(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Bool => FeatureValue::Bool(false),
            ValueKind::Byte => FeatureValue::Byte(0),
            ValueKind::Short => FeatureValue::Short(0),
            ValueKind::Int => FeatureValue::Int(0),
            ValueKind::Long => FeatureValue::Long(0),
            ValueKind::Float => FeatureValue::Float(0.0),
            ValueKind::Double => FeatureValue::Double(0.0),
            ValueKind::Str => FeatureValue::Str(None),
            ValueKind::Ref => FeatureValue::Ref(None),
            ValueKind::BoolArray => FeatureValue::BoolArray(Vec::new()),
            ValueKind::ByteArray => FeatureValue::ByteArray(Vec::new()),
            ValueKind::ShortArray => FeatureValue::ShortArray(Vec::new()),
            ValueKind::IntArray => FeatureValue::IntArray(Vec::new()),
            ValueKind::LongArray => FeatureValue::LongArray(Vec::new()),
            ValueKind::FloatArray => FeatureValue::FloatArray(Vec::new()),
            ValueKind::DoubleArray => FeatureValue::DoubleArray(Vec::new()),
            ValueKind::StrArray => FeatureValue::StrArray(Vec::new()),
            ValueKind::RefArray => FeatureValue::RefArray(Vec::new()),
        }
    }

    /// Render a scalar primitive as text. The universal accessor used for
    /// cross-kind primitive transfer; arrays and references have none.
    pub fn as_lexical(&self) -> Option<String> {
        match self {
            FeatureValue::Bool(v) => Some(v.to_string()),
            FeatureValue::Byte(v) => Some(v.to_string()),
            FeatureValue::Short(v) => Some(v.to_string()),
            FeatureValue::Int(v) => Some(v.to_string()),
            FeatureValue::Long(v) => Some(v.to_string()),
            FeatureValue::Float(v) => Some(v.to_string()),
            FeatureValue::Double(v) => Some(v.to_string()),
            FeatureValue::Str(v) => v.clone(),
            _ => None,
        }
    }

    /// Parse text into a scalar primitive of the given kind.
    pub fn from_lexical(kind: ValueKind, text: &str) -> Result<Self, ModelError> {
        let err = || ModelError::Lexical {
            text: text.to_string(),
            kind,
        };
        Ok(match kind {
            ValueKind::Bool => FeatureValue::Bool(text.parse().map_err(|_| err())?),
            ValueKind::Byte => FeatureValue::Byte(text.parse().map_err(|_| err())?),
            ValueKind::Short => FeatureValue::Short(text.parse().map_err(|_| err())?),
            ValueKind::Int => FeatureValue::Int(text.parse().map_err(|_| err())?),
            ValueKind::Long => FeatureValue::Long(text.parse().map_err(|_| err())?),
            ValueKind::Float => FeatureValue::Float(text.parse().map_err(|_| err())?),
            ValueKind::Double => FeatureValue::Double(text.parse().map_err(|_| err())?),
            ValueKind::Str => FeatureValue::Str(Some(text.to_string())),
            _ => return Err(err()),
        })
    }
}
