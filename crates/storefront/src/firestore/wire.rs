//! Firestore REST v1 wire format.
//!
//! Hand-written serde types for the small slice of the REST surface the
//! storefront uses: typed document values, structured queries
//! (`documents:runQuery`) and atomic writes (`documents:commit`).
//!
//! Values are externally tagged objects (`{"stringValue": "x"}`); 64-bit
//! integers travel as JSON strings per the protobuf JSON mapping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// =============================================================================
// Values & Documents
// =============================================================================

/// A typed Firestore value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    /// int64 encoded as a JSON string.
    IntegerValue(String),
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    MapValue(MapValue),
    ArrayValue(ArrayValue),
}

/// Nested map value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

/// Array value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<Value>,
}

impl Value {
    /// String value constructor.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::StringValue(value.into())
    }

    /// Integer value constructor.
    #[must_use]
    pub fn integer(value: i64) -> Self {
        Self::IntegerValue(value.to_string())
    }

    /// Double value constructor.
    #[must_use]
    pub const fn double(value: f64) -> Self {
        Self::DoubleValue(value)
    }

    /// Map value constructor.
    #[must_use]
    pub const fn map(fields: BTreeMap<String, Value>) -> Self {
        Self::MapValue(MapValue { fields })
    }

    /// Array-of-strings constructor (used for `IN` predicates).
    #[must_use]
    pub fn string_array<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ArrayValue(ArrayValue {
            values: values.into_iter().map(Self::string).collect(),
        })
    }

    /// The contained string, if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::StringValue(s) => Some(s),
            _ => None,
        }
    }

    /// The contained integer, if this is an integer value.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::IntegerValue(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// The contained number as `f64` (integer or double).
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::DoubleValue(d) => Some(*d),
            #[allow(clippy::cast_precision_loss)]
            Self::IntegerValue(s) => s.parse::<i64>().ok().map(|i| i as f64),
            _ => None,
        }
    }

    /// The contained field map, if this is a map value.
    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::MapValue(m) => Some(&m.fields),
            _ => None,
        }
    }
}

/// A Firestore document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name
    /// (`projects/{p}/databases/{db}/documents/{collection}/{id}`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Document {
    /// The store-assigned document id (last path segment of the name).
    #[must_use]
    pub fn document_id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }
}

/// Standard REST error envelope (`{"error": {"code": ..., "message": ...}}`).
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorStatus,
}

/// The `error` payload of [`ErrorBody`].
#[derive(Debug, Deserialize)]
pub struct ErrorStatus {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

// =============================================================================
// Structured Queries
// =============================================================================

/// Request body for `documents:runQuery`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryRequest {
    pub structured_query: StructuredQuery,
}

/// The subset of `StructuredQuery` the storefront issues: a single
/// collection selector plus optional server-side predicates. Ordering and
/// inequality predicates stay client-side (the residual filter) because the
/// store cannot combine them with `IN` membership without extra indexes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuery {
    pub from: Vec<CollectionSelector>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
}

impl StructuredQuery {
    /// Query every document of one collection.
    #[must_use]
    pub fn collection(collection_id: impl Into<String>) -> Self {
        Self {
            from: vec![CollectionSelector {
                collection_id: collection_id.into(),
            }],
            filter: None,
        }
    }

    /// Attach server-side predicates, AND-combined when more than one.
    #[must_use]
    pub fn with_predicates(mut self, predicates: Vec<Filter>) -> Self {
        self.filter = and(predicates);
        self
    }
}

/// Selects one collection to query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSelector {
    pub collection_id: String,
}

/// A query predicate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Filter {
    CompositeFilter(CompositeFilter),
    FieldFilter(FieldFilter),
}

/// AND-combination of predicates.
#[derive(Debug, Clone, Serialize)]
pub struct CompositeFilter {
    pub op: String,
    pub filters: Vec<Filter>,
}

/// A single field predicate.
#[derive(Debug, Clone, Serialize)]
pub struct FieldFilter {
    pub field: FieldReference,
    pub op: String,
    pub value: Value,
}

/// Reference to a document field.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReference {
    pub field_path: String,
}

/// `field == value` predicate.
#[must_use]
pub fn equality(field: impl Into<String>, value: Value) -> Filter {
    Filter::FieldFilter(FieldFilter {
        field: FieldReference {
            field_path: field.into(),
        },
        op: "EQUAL".to_string(),
        value,
    })
}

/// `field IN {values}` set-membership predicate.
#[must_use]
pub fn membership<I, S>(field: impl Into<String>, values: I) -> Filter
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Filter::FieldFilter(FieldFilter {
        field: FieldReference {
            field_path: field.into(),
        },
        op: "IN".to_string(),
        value: Value::string_array(values),
    })
}

/// AND-combine predicates; a single predicate stays bare, none means no
/// `where` clause at all.
#[must_use]
pub fn and(mut predicates: Vec<Filter>) -> Option<Filter> {
    match predicates.len() {
        0 => None,
        1 => predicates.pop(),
        _ => Some(Filter::CompositeFilter(CompositeFilter {
            op: "AND".to_string(),
            filters: predicates,
        })),
    }
}

/// One element of a `runQuery` response stream. Elements without a
/// `document` carry only a read time and are skipped.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryElement {
    #[serde(default)]
    pub document: Option<Document>,
    #[serde(default)]
    pub read_time: Option<String>,
}

// =============================================================================
// Writes
// =============================================================================

/// Request body for `documents:commit`.
#[derive(Debug, Clone, Serialize)]
pub struct CommitRequest {
    pub writes: Vec<Write>,
}

/// A single write inside a commit.
///
/// With an `update_mask`, only the masked fields are touched and the
/// document is created if it does not exist; a masked field absent from
/// `update.fields` is deleted. Transforms apply atomically server-side.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Write {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_mask: Option<DocumentMask>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub update_transforms: Vec<FieldTransform>,
}

/// Set of field paths affected by a write.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMask {
    pub field_paths: Vec<String>,
}

/// A server-side field transformation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldTransform {
    pub field_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub increment: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_to_server_value: Option<String>,
}

impl FieldTransform {
    /// Atomic integer increment of `field_path` by `amount`.
    #[must_use]
    pub fn increment(field_path: impl Into<String>, amount: i64) -> Self {
        Self {
            field_path: field_path.into(),
            increment: Some(Value::integer(amount)),
            set_to_server_value: None,
        }
    }

    /// Set `field_path` to the commit's server timestamp.
    #[must_use]
    pub fn request_time(field_path: impl Into<String>) -> Self {
        Self {
            field_path: field_path.into(),
            increment: None,
            set_to_server_value: Some("REQUEST_TIME".to_string()),
        }
    }
}

// =============================================================================
// Field Paths
// =============================================================================

/// Join path segments into a field path, backtick-quoting any segment that
/// is not a simple identifier (document ids can start with a digit).
#[must_use]
pub fn field_path<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| quote_segment(s.as_ref()))
        .collect::<Vec<_>>()
        .join(".")
}

fn quote_segment(segment: &str) -> String {
    let simple = !segment.is_empty()
        && segment
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if simple {
        segment.to_string()
    } else {
        format!("`{}`", segment.replace('\\', "\\\\").replace('`', "\\`"))
    }
}
