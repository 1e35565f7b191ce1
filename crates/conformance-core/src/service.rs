use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConformanceError;
use crate::resource::LoadState;
use crate::schema::{
    CollectionSchema, ConsistencyLevel, CreateCollection, FieldSchema, IndexSpec, PrimaryKey, Row,
};

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// What `describe_collection` returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDescription {
    pub collection_name: String,
    pub description: String,
    pub fields: Vec<FieldSchema>,
    pub auto_id: bool,
    pub consistency_level: ConsistencyLevel,
    pub enable_dynamic_field: bool,
    pub num_partitions: usize,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl CollectionDescription {
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn primary_field(&self) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.is_primary)
    }

    pub fn vector_field_names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.data_type.is_vector())
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Same description under another name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            collection_name: name.into(),
            ..self.clone()
        }
    }

    pub fn schema(&self) -> CollectionSchema {
        CollectionSchema {
            fields: self.fields.clone(),
            description: Some(self.description.clone()),
            enable_dynamic_field: self.enable_dynamic_field,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDescription {
    pub index_name: String,
    pub field_name: String,
    pub index_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_type: Option<String>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertResult {
    pub insert_count: usize,
    pub ids: Vec<PrimaryKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteSelector {
    Ids(Vec<PrimaryKey>),
    Filter(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub vectors: Vec<Vec<f32>>,
    pub limit: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anns_field: Option<String>,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

impl SearchRequest {
    pub fn new(vectors: Vec<Vec<f32>>, limit: usize) -> Self {
        Self {
            vectors,
            limit,
            anns_field: None,
            params: BTreeMap::new(),
        }
    }

    pub fn with_anns_field(mut self, field: impl Into<String>) -> Self {
        self.anns_field = Some(field.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: PrimaryKey,
    pub distance: f32,
}

// ---------------------------------------------------------------------------
// MilvusService
// ---------------------------------------------------------------------------

/// The remote service boundary.
///
/// Every call either returns a value or fails. Domain failures surface as
/// [`ConformanceError::Service`]; transport problems as `Transport`/`Timeout`.
#[async_trait]
pub trait MilvusService: Send + Sync {
    async fn create_collection(&self, request: &CreateCollection) -> Result<(), ConformanceError>;

    async fn drop_collection(&self, name: &str) -> Result<(), ConformanceError>;

    async fn describe_collection(
        &self,
        name: &str,
    ) -> Result<CollectionDescription, ConformanceError>;

    async fn has_collection(&self, name: &str) -> Result<bool, ConformanceError>;

    async fn list_collections(&self) -> Result<Vec<String>, ConformanceError>;

    async fn load_collection(&self, name: &str) -> Result<(), ConformanceError>;

    async fn release_collection(&self, name: &str) -> Result<(), ConformanceError>;

    async fn get_load_state(&self, name: &str) -> Result<LoadState, ConformanceError>;

    async fn create_partition(&self, name: &str, partition: &str) -> Result<(), ConformanceError>;

    async fn load_partitions(&self, name: &str, partitions: &[String])
        -> Result<(), ConformanceError>;

    async fn release_partitions(
        &self,
        name: &str,
        partitions: &[String],
    ) -> Result<(), ConformanceError>;

    async fn rename_collection(&self, old_name: &str, new_name: &str)
        -> Result<(), ConformanceError>;

    async fn alter_collection_properties(
        &self,
        name: &str,
        properties: &BTreeMap<String, Value>,
    ) -> Result<(), ConformanceError>;

    async fn drop_collection_properties(
        &self,
        name: &str,
        keys: &[String],
    ) -> Result<(), ConformanceError>;

    async fn add_collection_field(
        &self,
        name: &str,
        field: &FieldSchema,
    ) -> Result<(), ConformanceError>;

    async fn create_index(&self, name: &str, indexes: &[IndexSpec]) -> Result<(), ConformanceError>;

    async fn drop_index(&self, name: &str, index_name: &str) -> Result<(), ConformanceError>;

    async fn list_indexes(&self, name: &str) -> Result<Vec<String>, ConformanceError>;

    async fn describe_index(
        &self,
        name: &str,
        index_name: &str,
    ) -> Result<IndexDescription, ConformanceError>;

    async fn create_alias(&self, collection: &str, alias: &str) -> Result<(), ConformanceError>;

    async fn drop_alias(&self, alias: &str) -> Result<(), ConformanceError>;

    /// Inserts into the default partition.
    async fn insert(&self, name: &str, rows: &[Row]) -> Result<InsertResult, ConformanceError> {
        self.insert_into(name, None, rows).await
    }

    /// Inserts into `partition`, or the default partition when `None`.
    async fn insert_into(
        &self,
        name: &str,
        partition: Option<&str>,
        rows: &[Row],
    ) -> Result<InsertResult, ConformanceError>;

    /// Returns the number of deleted entities.
    async fn delete(&self, name: &str, selector: &DeleteSelector)
        -> Result<usize, ConformanceError>;

    /// One result set per query vector.
    async fn search(
        &self,
        name: &str,
        request: &SearchRequest,
    ) -> Result<Vec<Vec<SearchHit>>, ConformanceError>;

    async fn query(&self, name: &str, filter: &str) -> Result<Vec<Row>, ConformanceError>;
}
