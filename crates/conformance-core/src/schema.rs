use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single entity as inserted or queried: field name to value.
pub type Row = serde_json::Map<String, Value>;

// ---------------------------------------------------------------------------
// Scalar enums
// ---------------------------------------------------------------------------

/// Field data types, named as the REST API names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float,
    Double,
    VarChar,
    #[serde(rename = "JSON")]
    Json,
    Array,
    FloatVector,
    BinaryVector,
    Float16Vector,
    BFloat16Vector,
    Int8Vector,
    SparseFloatVector,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Bool => "Bool",
            DataType::Int8 => "Int8",
            DataType::Int16 => "Int16",
            DataType::Int32 => "Int32",
            DataType::Int64 => "Int64",
            DataType::Float => "Float",
            DataType::Double => "Double",
            DataType::VarChar => "VarChar",
            DataType::Json => "JSON",
            DataType::Array => "Array",
            DataType::FloatVector => "FloatVector",
            DataType::BinaryVector => "BinaryVector",
            DataType::Float16Vector => "Float16Vector",
            DataType::BFloat16Vector => "BFloat16Vector",
            DataType::Int8Vector => "Int8Vector",
            DataType::SparseFloatVector => "SparseFloatVector",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let all = [
            DataType::Bool,
            DataType::Int8,
            DataType::Int16,
            DataType::Int32,
            DataType::Int64,
            DataType::Float,
            DataType::Double,
            DataType::VarChar,
            DataType::Json,
            DataType::Array,
            DataType::FloatVector,
            DataType::BinaryVector,
            DataType::Float16Vector,
            DataType::BFloat16Vector,
            DataType::Int8Vector,
            DataType::SparseFloatVector,
        ];
        all.into_iter().find(|t| t.as_str().eq_ignore_ascii_case(s))
    }

    pub fn is_vector(self) -> bool {
        matches!(
            self,
            DataType::FloatVector
                | DataType::BinaryVector
                | DataType::Float16Vector
                | DataType::BFloat16Vector
                | DataType::Int8Vector
                | DataType::SparseFloatVector
        )
    }

    /// Vector types that carry a fixed `dim`.
    pub fn is_dense_vector(self) -> bool {
        self.is_vector() && self != DataType::SparseFloatVector
    }

    pub fn is_float_vector(self) -> bool {
        matches!(
            self,
            DataType::FloatVector
                | DataType::Float16Vector
                | DataType::BFloat16Vector
                | DataType::Int8Vector
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetricType {
    L2,
    IP,
    Cosine,
    Hamming,
    Jaccard,
}

impl MetricType {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricType::L2 => "L2",
            MetricType::IP => "IP",
            MetricType::Cosine => "COSINE",
            MetricType::Hamming => "HAMMING",
            MetricType::Jaccard => "JACCARD",
        }
    }

    /// Metric names are matched exactly; `" "` or `"cosine "` are rejected.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "L2" => Some(MetricType::L2),
            "IP" => Some(MetricType::IP),
            "COSINE" => Some(MetricType::Cosine),
            "HAMMING" => Some(MetricType::Hamming),
            "JACCARD" => Some(MetricType::Jaccard),
            _ => None,
        }
    }

    /// Whether a larger score ranks first.
    pub fn higher_is_better(self) -> bool {
        matches!(self, MetricType::IP | MetricType::Cosine)
    }

    pub fn supports(self, data_type: DataType) -> bool {
        match data_type {
            DataType::BinaryVector => matches!(self, MetricType::Hamming | MetricType::Jaccard),
            DataType::SparseFloatVector => self == MetricType::IP,
            t if t.is_float_vector() => {
                matches!(self, MetricType::L2 | MetricType::IP | MetricType::Cosine)
            }
            _ => false,
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexType {
    #[serde(rename = "AUTOINDEX")]
    AutoIndex,
    #[serde(rename = "FLAT")]
    Flat,
    #[serde(rename = "HNSW")]
    Hnsw,
    #[serde(rename = "IVF_FLAT")]
    IvfFlat,
    #[serde(rename = "SPARSE_INVERTED_INDEX")]
    SparseInvertedIndex,
    #[serde(rename = "INVERTED")]
    Inverted,
    #[serde(rename = "STL_SORT")]
    StlSort,
}

impl IndexType {
    pub fn as_str(self) -> &'static str {
        match self {
            IndexType::AutoIndex => "AUTOINDEX",
            IndexType::Flat => "FLAT",
            IndexType::Hnsw => "HNSW",
            IndexType::IvfFlat => "IVF_FLAT",
            IndexType::SparseInvertedIndex => "SPARSE_INVERTED_INDEX",
            IndexType::Inverted => "INVERTED",
            IndexType::StlSort => "STL_SORT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "AUTOINDEX" => Some(IndexType::AutoIndex),
            "FLAT" => Some(IndexType::Flat),
            "HNSW" => Some(IndexType::Hnsw),
            "IVF_FLAT" => Some(IndexType::IvfFlat),
            "SPARSE_INVERTED_INDEX" => Some(IndexType::SparseInvertedIndex),
            "INVERTED" => Some(IndexType::Inverted),
            "STL_SORT" => Some(IndexType::StlSort),
            _ => None,
        }
    }

    /// Whether an index of this type can be built over a field of `data_type`.
    pub fn supports(self, data_type: DataType) -> bool {
        use DataType::*;
        match self {
            IndexType::AutoIndex => true,
            IndexType::Flat => matches!(
                data_type,
                FloatVector | Float16Vector | BFloat16Vector | Int8Vector | BinaryVector
            ),
            IndexType::Hnsw => matches!(
                data_type,
                FloatVector | Float16Vector | BFloat16Vector | Int8Vector | BinaryVector
            ),
            IndexType::IvfFlat => matches!(data_type, FloatVector | Float16Vector | BFloat16Vector),
            IndexType::SparseInvertedIndex => data_type == SparseFloatVector,
            IndexType::Inverted => !data_type.is_vector(),
            IndexType::StlSort => matches!(
                data_type,
                Int8 | Int16 | Int32 | Int64 | Float | Double | VarChar
            ),
        }
    }

    /// Exact indexes return the true top-k in distance order.
    pub fn is_exact(self) -> bool {
        self == IndexType::Flat
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-after-write staleness bound. Compared for equality only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsistencyLevel {
    #[default]
    Strong,
    Session,
    Bounded,
    Eventually,
    Customized,
}

impl ConsistencyLevel {
    pub fn code(self) -> i32 {
        match self {
            ConsistencyLevel::Strong => 0,
            ConsistencyLevel::Session => 1,
            ConsistencyLevel::Bounded => 2,
            ConsistencyLevel::Eventually => 3,
            ConsistencyLevel::Customized => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConsistencyLevel::Strong => "Strong",
            ConsistencyLevel::Session => "Session",
            ConsistencyLevel::Bounded => "Bounded",
            ConsistencyLevel::Eventually => "Eventually",
            ConsistencyLevel::Customized => "Customized",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Strong" | "0" => Some(ConsistencyLevel::Strong),
            "Session" | "1" => Some(ConsistencyLevel::Session),
            "Bounded" | "2" => Some(ConsistencyLevel::Bounded),
            "Eventually" | "3" => Some(ConsistencyLevel::Eventually),
            "Customized" | "4" => Some(ConsistencyLevel::Customized),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdType {
    #[default]
    Int,
    String,
}

// ---------------------------------------------------------------------------
// Primary keys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryKey {
    Int(i64),
    Str(String),
}

impl PrimaryKey {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(PrimaryKey::Int),
            Value::String(s) => Some(PrimaryKey::Str(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            PrimaryKey::Int(i) => Value::from(*i),
            PrimaryKey::Str(s) => Value::from(s.clone()),
        }
    }

    /// Literal form used inside filter expressions.
    pub fn to_literal(&self) -> String {
        match self {
            PrimaryKey::Int(i) => i.to_string(),
            PrimaryKey::Str(s) => format!("\"{s}\""),
        }
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimaryKey::Int(i) => write!(f, "{i}"),
            PrimaryKey::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for PrimaryKey {
    fn from(value: i64) -> Self {
        PrimaryKey::Int(value)
    }
}

impl From<&str> for PrimaryKey {
    fn from(value: &str) -> Self {
        PrimaryKey::Str(value.to_string())
    }
}

/// String serialization used for stored property values and index params.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub auto_id: bool,
    #[serde(default)]
    pub is_partition_key: bool,
    #[serde(default)]
    pub is_clustering_key: bool,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    /// Kept signed so out-of-range requests can be expressed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dim: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_capacity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<DataType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            is_primary: false,
            auto_id: false,
            is_partition_key: false,
            is_clustering_key: false,
            nullable: false,
            max_length: None,
            dim: None,
            max_capacity: None,
            element_type: None,
            default_value: None,
        }
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    pub fn with_auto_id(mut self, auto_id: bool) -> Self {
        self.auto_id = auto_id;
        self
    }

    pub fn partition_key(mut self) -> Self {
        self.is_partition_key = true;
        self
    }

    pub fn clustering_key(mut self) -> Self {
        self.is_clustering_key = true;
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn with_dim(mut self, dim: i64) -> Self {
        self.dim = Some(dim);
        self
    }

    pub fn with_element_type(mut self, element_type: DataType, max_capacity: u32) -> Self {
        self.element_type = Some(element_type);
        self.max_capacity = Some(max_capacity);
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Attributes that decide whether two creations describe the same collection.
    pub fn same_shape(&self, other: &FieldSchema) -> bool {
        self.name == other.name
            && self.data_type == other.data_type
            && self.is_primary == other.is_primary
            && self.auto_id == other.auto_id
            && self.dim == other.dim
            && self.max_length == other.max_length
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub fields: Vec<FieldSchema>,
    /// `None` stands for an explicit null description, which the service rejects.
    pub description: Option<String>,
    #[serde(default)]
    pub enable_dynamic_field: bool,
}

impl Default for CollectionSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectionSchema {
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            description: Some(String::new()),
            enable_dynamic_field: false,
        }
    }

    pub fn with_field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_null_description(mut self) -> Self {
        self.description = None;
        self
    }

    pub fn with_dynamic_field(mut self, enabled: bool) -> Self {
        self.enable_dynamic_field = enabled;
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn primary_field(&self) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.is_primary)
    }

    pub fn vector_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter().filter(|f| f.data_type.is_vector())
    }

    pub fn auto_id(&self) -> bool {
        self.primary_field().is_some_and(|f| f.auto_id)
    }

    pub fn same_shape(&self, other: &CollectionSchema) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(other.fields.iter())
                .all(|(a, b)| a.same_shape(b))
    }
}

// ---------------------------------------------------------------------------
// Index parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub field_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    pub index_type: String,
    pub metric_type: String,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

impl IndexSpec {
    pub fn new(field_name: impl Into<String>, metric_type: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            index_name: None,
            index_type: IndexType::AutoIndex.as_str().to_string(),
            metric_type: metric_type.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_type(mut self, index_type: impl Into<String>) -> Self {
        self.index_type = index_type.into();
        self
    }

    pub fn with_name(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = Some(index_name.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Index name, defaulting to the field name.
    pub fn name(&self) -> &str {
        self.index_name.as_deref().unwrap_or(&self.field_name)
    }
}

// ---------------------------------------------------------------------------
// Create request
// ---------------------------------------------------------------------------

/// Parameters of `create_collection`, either quick (dimension only) or schema based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCollection {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<CollectionSchema>,
    #[serde(default)]
    pub index_params: Vec<IndexSpec>,
    pub primary_field_name: String,
    pub vector_field_name: String,
    pub id_type: IdType,
    pub auto_id: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    pub metric_type: String,
    pub consistency_level: ConsistencyLevel,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl CreateCollection {
    /// Quick setup: an `id` primary key and a `vector` float vector field.
    pub fn fast(name: impl Into<String>, dimension: i64) -> Self {
        Self {
            name: name.into(),
            dimension: Some(dimension),
            schema: None,
            index_params: Vec::new(),
            primary_field_name: "id".to_string(),
            vector_field_name: "vector".to_string(),
            id_type: IdType::Int,
            auto_id: false,
            max_length: None,
            metric_type: MetricType::Cosine.as_str().to_string(),
            consistency_level: ConsistencyLevel::Strong,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_schema(name: impl Into<String>, schema: CollectionSchema) -> Self {
        Self {
            dimension: None,
            schema: Some(schema),
            ..Self::fast(name, 0)
        }
    }

    pub fn with_id_type(mut self, id_type: IdType) -> Self {
        self.id_type = id_type;
        self
    }

    pub fn with_auto_id(mut self, auto_id: bool) -> Self {
        self.auto_id = auto_id;
        self
    }

    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn with_metric(mut self, metric_type: impl Into<String>) -> Self {
        self.metric_type = metric_type.into();
        self
    }

    pub fn with_consistency(mut self, level: ConsistencyLevel) -> Self {
        self.consistency_level = level;
        self
    }

    pub fn with_index(mut self, index: IndexSpec) -> Self {
        self.index_params.push(index);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn is_fast(&self) -> bool {
        self.schema.is_none()
    }

    /// The schema the service materializes for this request.
    pub fn resolved_schema(&self) -> CollectionSchema {
        if let Some(schema) = &self.schema {
            return schema.clone();
        }
        let pk = match self.id_type {
            IdType::Int => FieldSchema::new(&self.primary_field_name, DataType::Int64),
            IdType::String => {
                let field = FieldSchema::new(&self.primary_field_name, DataType::VarChar);
                match self.max_length {
                    Some(len) => field.with_max_length(len),
                    None => field,
                }
            }
        };
        CollectionSchema::new()
            .with_field(pk.primary().with_auto_id(self.auto_id))
            .with_field(
                FieldSchema::new(&self.vector_field_name, DataType::FloatVector)
                    .with_dim(self.dimension.unwrap_or_default()),
            )
            .with_dynamic_field(true)
    }

    /// Explicit index params, or the default index over every vector field.
    pub fn resolved_indexes(&self) -> Vec<IndexSpec> {
        if !self.index_params.is_empty() {
            return self.index_params.clone();
        }
        let schema = self.resolved_schema();
        schema
            .vector_fields()
            .map(|f| {
                let metric = if self.is_fast() {
                    self.metric_type.clone()
                } else {
                    default_metric_for(f.data_type).as_str().to_string()
                };
                IndexSpec::new(&f.name, metric)
            })
            .collect()
    }
}

/// Metric a vector type gets when none is supplied.
pub fn default_metric_for(data_type: DataType) -> MetricType {
    match data_type {
        DataType::BinaryVector => MetricType::Hamming,
        DataType::SparseFloatVector => MetricType::IP,
        _ => MetricType::Cosine,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fast_create_resolves_default_schema() {
        let req = CreateCollection::fast("books", 128);
        let schema = req.resolved_schema();
        assert_eq!(schema.fields.len(), 2);
        let pk = schema.primary_field().unwrap();
        assert_eq!(pk.name, "id");
        assert_eq!(pk.data_type, DataType::Int64);
        let vector = schema.field("vector").unwrap();
        assert_eq!(vector.dim, Some(128));
        assert!(schema.enable_dynamic_field);
    }

    #[test]
    fn fast_create_default_index_uses_requested_metric() {
        let req = CreateCollection::fast("books", 8).with_metric("L2");
        let indexes = req.resolved_indexes();
        assert_eq!(indexes.len(), 1);
        assert_eq!(indexes[0].field_name, "vector");
        assert_eq!(indexes[0].metric_type, "L2");
        assert_eq!(indexes[0].index_type, "AUTOINDEX");
    }

    #[test]
    fn string_primary_key_keeps_max_length() {
        let req = CreateCollection::fast("c", 8)
            .with_id_type(IdType::String)
            .with_max_length(64);
        let pk = req.resolved_schema().primary_field().cloned().unwrap();
        assert_eq!(pk.data_type, DataType::VarChar);
        assert_eq!(pk.max_length, Some(64));
    }

    #[test]
    fn same_shape_ignores_nullable_but_not_dim() {
        let a = FieldSchema::new("v", DataType::FloatVector).with_dim(8);
        let b = a.clone().with_nullable(true);
        let c = FieldSchema::new("v", DataType::FloatVector).with_dim(9);
        assert!(a.same_shape(&b));
        assert!(!a.same_shape(&c));
    }

    #[test]
    fn metric_parse_is_exact() {
        assert_eq!(MetricType::parse("COSINE"), Some(MetricType::Cosine));
        assert_eq!(MetricType::parse(" "), None);
        assert_eq!(MetricType::parse("invalid"), None);
        assert!(MetricType::L2.supports(DataType::FloatVector));
        assert!(!MetricType::L2.supports(DataType::BinaryVector));
    }

    #[test]
    fn stringify_keeps_strings_verbatim() {
        assert_eq!(stringify(&json!("abc")), "abc");
        assert_eq!(stringify(&json!(true)), "true");
        assert_eq!(stringify(&json!(16)), "16");
    }

    #[test]
    fn primary_key_serde_is_untagged() {
        let keys: Vec<PrimaryKey> = serde_json::from_value(json!([1, "a"])).unwrap();
        assert_eq!(keys, vec![PrimaryKey::Int(1), PrimaryKey::Str("a".into())]);
    }
}
