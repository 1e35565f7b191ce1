//! The resource model: a locally predicted mirror of remote collections.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::filter::Filter;
use crate::metric;
use crate::oracle::ServiceLimits;
use crate::schema::{
    default_metric_for, stringify, CollectionSchema, ConsistencyLevel, CreateCollection,
    FieldSchema, IndexSpec, IndexType, MetricType, PrimaryKey, Row,
};
use crate::service::{CollectionDescription, IndexDescription, SearchHit, SearchRequest};

/// Load state of a collection, derived from its partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadState {
    NotLoad,
    Loaded,
    PartiallyLoaded,
}

/// An index as the mirror records it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexState {
    pub index_name: String,
    pub field_name: String,
    pub index_type: IndexType,
    pub metric_type: Option<MetricType>,
    /// Build parameters in their string serialization.
    pub params: BTreeMap<String, String>,
}

impl IndexState {
    /// Assumes `spec` already passed validation; unknown names fall back to defaults.
    pub fn from_spec(spec: &IndexSpec) -> Self {
        Self {
            index_name: spec.name().to_string(),
            field_name: spec.field_name.clone(),
            index_type: IndexType::parse(&spec.index_type).unwrap_or(IndexType::AutoIndex),
            metric_type: MetricType::parse(&spec.metric_type),
            params: spec
                .params
                .iter()
                .map(|(k, v)| (k.clone(), stringify(v)))
                .collect(),
        }
    }

    /// What `describe_index` should return for this index.
    pub fn describe(&self) -> IndexDescription {
        IndexDescription {
            index_name: self.index_name.clone(),
            field_name: self.field_name.clone(),
            index_type: self.index_type.as_str().to_string(),
            metric_type: self.metric_type.map(|m| m.as_str().to_string()),
            params: self.params.clone(),
        }
    }
}

/// One addressable collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub exists: bool,
    pub schema: CollectionSchema,
    pub consistency_level: ConsistencyLevel,
    pub properties: BTreeMap<String, String>,
    /// Keyed by index name.
    pub indexes: BTreeMap<String, IndexState>,
    /// Partition name to loaded flag.
    pub partitions: BTreeMap<String, bool>,
    pub num_partitions: usize,
    /// Logical dataset keyed by primary key.
    pub rows: BTreeMap<PrimaryKey, Row>,
    /// Partition holding each row.
    #[serde(default)]
    pub placement: BTreeMap<PrimaryKey, String>,
}

impl Resource {
    /// The state right after a successful create. Indexes are taken verbatim.
    pub fn from_request(request: &CreateCollection, limits: &ServiceLimits) -> Self {
        let schema = request.resolved_schema();
        let num_partitions = if schema.fields.iter().any(|f| f.is_partition_key) {
            limits.partition_key_partitions
        } else {
            1
        };
        let indexes = request
            .resolved_indexes()
            .iter()
            .map(|spec| (spec.name().to_string(), IndexState::from_spec(spec)))
            .collect();
        Self {
            name: request.name.clone(),
            exists: true,
            schema,
            consistency_level: request.consistency_level,
            properties: request
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), stringify(v)))
                .collect(),
            indexes,
            partitions: BTreeMap::from([(limits.default_partition.clone(), false)]),
            num_partitions,
            rows: BTreeMap::new(),
            placement: BTreeMap::new(),
        }
    }

    /// The primary-key field, if the schema declares one.
    pub fn primary_field(&self) -> Option<&FieldSchema> {
        self.schema.primary_field()
    }

    pub fn auto_id(&self) -> bool {
        self.schema.auto_id()
    }

    /// Loaded when every partition is, partially loaded when some are.
    pub fn load_state(&self) -> LoadState {
        let loaded = self.partitions.values().filter(|l| **l).count();
        if loaded == 0 {
            LoadState::NotLoad
        } else if loaded == self.partitions.len() {
            LoadState::Loaded
        } else {
            LoadState::PartiallyLoaded
        }
    }

    /// True when at least one partition is loaded.
    pub fn is_queryable(&self) -> bool {
        self.load_state() != LoadState::NotLoad
    }

    /// Loads or releases every partition.
    pub fn set_all_loaded(&mut self, loaded: bool) {
        self.partitions.values_mut().for_each(|l| *l = loaded);
    }

    /// Unknown partition names are ignored.
    pub fn set_partitions_loaded(&mut self, partitions: &[String], loaded: bool) {
        for p in partitions {
            if let Some(state) = self.partitions.get_mut(p) {
                *state = loaded;
            }
        }
    }

    /// The first requested partition the collection does not have.
    pub fn missing_partition<'a>(&self, partitions: &'a [String]) -> Option<&'a String> {
        partitions.iter().find(|p| !self.partitions.contains_key(*p))
    }

    /// Vector fields that no index covers.
    pub fn unindexed_vector_fields(&self) -> Vec<&str> {
        self.schema
            .vector_fields()
            .filter(|f| !self.indexes.values().any(|i| i.field_name == f.name))
            .map(|f| f.name.as_str())
            .collect()
    }

    pub fn index_names(&self) -> Vec<String> {
        self.indexes.keys().cloned().collect()
    }

    /// What `describe_collection` should return.
    pub fn describe(&self) -> CollectionDescription {
        CollectionDescription {
            collection_name: self.name.clone(),
            description: self.schema.description.clone().unwrap_or_default(),
            fields: self.schema.fields.clone(),
            auto_id: self.auto_id(),
            consistency_level: self.consistency_level,
            enable_dynamic_field: self.schema.enable_dynamic_field,
            num_partitions: self.num_partitions,
            properties: self.properties.clone(),
        }
    }

    /// Merges properties, storing each value's string form.
    pub fn alter_properties(&mut self, properties: &BTreeMap<String, Value>) {
        for (k, v) in properties {
            self.properties.insert(k.clone(), stringify(v));
        }
    }

    pub fn drop_properties(&mut self, keys: &[String]) {
        for k in keys {
            self.properties.remove(k);
        }
    }

    /// Appends a field added after creation; such fields are always nullable.
    pub fn add_field(&mut self, field: &FieldSchema) {
        self.schema
            .fields
            .push(field.clone().with_nullable(true));
    }

    /// Stores the rows under `ids` in `partition`. A re-inserted key moves to the new partition.
    pub fn insert_rows(&mut self, rows: &[Row], ids: &[PrimaryKey], partition: &str) {
        let pk_name = self
            .primary_field()
            .map(|f| f.name.clone())
            .unwrap_or_default();
        for (row, id) in rows.iter().zip(ids) {
            let mut row = row.clone();
            row.insert(pk_name.clone(), id.to_value());
            self.rows.insert(id.clone(), row);
            self.placement.insert(id.clone(), partition.to_string());
        }
    }

    pub fn delete_ids(&mut self, ids: &[PrimaryKey]) -> usize {
        let mut deleted = 0;
        for id in ids {
            self.placement.remove(id);
            if self.rows.remove(id).is_some() {
                deleted += 1;
            }
        }
        deleted
    }

    pub fn delete_matching(&mut self, filter: &Filter) -> usize {
        let before = self.rows.len();
        self.rows.retain(|_, row| !filter.matches(row));
        let rows = &self.rows;
        self.placement.retain(|id, _| rows.contains_key(id));
        before - self.rows.len()
    }

    fn is_resident(&self, id: &PrimaryKey) -> bool {
        self.placement
            .get(id)
            .and_then(|p| self.partitions.get(p))
            .copied()
            .unwrap_or(false)
    }

    /// Rows visible to search and query: those in loaded partitions.
    pub fn resident_rows(&self) -> impl Iterator<Item = (&PrimaryKey, &Row)> {
        self.rows.iter().filter(|(id, _)| self.is_resident(id))
    }

    pub fn query(&self, filter: &Filter) -> Vec<Row> {
        self.resident_rows()
            .filter(|(_, row)| filter.matches(row))
            .map(|(_, row)| row.clone())
            .collect()
    }

    /// The field searched when a request names none: the first vector field.
    pub fn anns_field<'a>(&'a self, request: &'a SearchRequest) -> Option<&'a str> {
        request.anns_field.as_deref().or_else(|| {
            self.schema
                .vector_fields()
                .next()
                .map(|f| f.name.as_str())
        })
    }

    pub fn index_on(&self, field: &str) -> Option<&IndexState> {
        self.indexes.values().find(|i| i.field_name == field)
    }

    pub fn metric_for(&self, field: &str) -> MetricType {
        self.index_on(field)
            .and_then(|i| i.metric_type)
            .or_else(|| self.schema.field(field).map(|f| default_metric_for(f.data_type)))
            .unwrap_or(MetricType::Cosine)
    }

    /// Exact brute-force search over the surviving rows of loaded partitions.
    pub fn search(&self, request: &SearchRequest) -> Vec<Vec<SearchHit>> {
        let Some(field) = self.anns_field(request) else {
            return vec![Vec::new(); request.vectors.len()];
        };
        let metric = self.metric_for(field);
        let vectors: Vec<(&PrimaryKey, Vec<f32>)> = self
            .resident_rows()
            .filter_map(|(id, row)| vector_of(row, field).map(|v| (id, v)))
            .collect();
        request
            .vectors
            .iter()
            .map(|query| {
                metric::rank(
                    metric,
                    query,
                    vectors.iter().map(|(id, v)| (*id, v.as_slice())),
                    request.limit,
                )
            })
            .collect()
    }
}

/// Reads a dense vector out of a row.
pub fn vector_of(row: &Row, field: &str) -> Option<Vec<f32>> {
    row.get(field)?
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

/// The mirror of every collection and alias a scenario touches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    resources: BTreeMap<String, Resource>,
    aliases: BTreeMap<String, String>,
}

impl Registry {
    /// An empty mirror.
    pub fn new() -> Self {
        Self::default()
    }

    /// An existing collection, looked up by name or alias.
    pub fn get(&self, name: &str) -> Option<&Resource> {
        let name = self.aliases.get(name).map(String::as_str).unwrap_or(name);
        self.resources.get(name).filter(|r| r.exists)
    }

    /// Mutable form of [`Registry::get`].
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Resource> {
        let name = self.aliases.get(name).cloned().unwrap_or_else(|| name.to_string());
        self.resources.get_mut(&name).filter(|r| r.exists)
    }

    /// True when `name` resolves to an existing collection, directly or through an alias.
    pub fn exists(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// An existing collection under exactly this name; aliases are not followed.
    pub fn collection(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name).filter(|r| r.exists)
    }

    /// Any resource that ever existed under `name`, dropped or not.
    pub fn history(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    /// Records a created collection, replacing any dropped one of the same name.
    pub fn insert(&mut self, resource: Resource) {
        self.resources.insert(resource.name.clone(), resource);
    }

    /// Marks the collection dropped and releases its aliases.
    pub fn mark_dropped(&mut self, name: &str) {
        if let Some(resource) = self.resources.get_mut(name) {
            resource.exists = false;
            resource.rows.clear();
            resource.placement.clear();
        }
        self.aliases.retain(|_, target| target != name);
    }

    /// Moves the collection to `new_name`; aliases follow it.
    pub fn rename(&mut self, old_name: &str, new_name: &str) {
        if let Some(mut resource) = self.resources.remove(old_name) {
            resource.name = new_name.to_string();
            for target in self.aliases.values_mut() {
                if target == old_name {
                    *target = new_name.to_string();
                }
            }
            self.resources.insert(new_name.to_string(), resource);
        }
    }

    /// Sorted names of existing collections.
    pub fn names(&self) -> Vec<String> {
        self.resources
            .values()
            .filter(|r| r.exists)
            .map(|r| r.name.clone())
            .collect()
    }

    /// Names that existed at some point and have since been dropped.
    pub fn dropped_names(&self) -> Vec<String> {
        self.resources
            .values()
            .filter(|r| !r.exists)
            .map(|r| r.name.clone())
            .collect()
    }

    /// True when `name` is a live alias.
    pub fn is_alias(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    /// True when `name` denotes an existing collection or alias.
    pub fn is_taken(&self, name: &str) -> bool {
        self.is_alias(name) || self.resources.get(name).is_some_and(|r| r.exists)
    }

    /// Points `alias` at `collection`.
    pub fn add_alias(&mut self, alias: &str, collection: &str) {
        self.aliases.insert(alias.to_string(), collection.to_string());
    }

    /// Removing an unknown alias is a no-op.
    pub fn remove_alias(&mut self, alias: &str) {
        self.aliases.remove(alias);
    }

    /// The collection `alias` points at.
    pub fn alias_target(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resource() -> Resource {
        Resource::from_request(&CreateCollection::fast("c1", 4), &ServiceLimits::default())
    }

    #[test]
    fn fresh_resource_is_unloaded_with_default_index() {
        let r = resource();
        assert!(r.exists);
        assert_eq!(r.load_state(), LoadState::NotLoad);
        assert_eq!(r.index_names(), vec!["vector".to_string()]);
        assert!(r.unindexed_vector_fields().is_empty());
        assert_eq!(r.partitions.keys().cloned().collect::<Vec<_>>(), vec!["_default"]);
    }

    #[test]
    fn partial_load_state() {
        let mut r = resource();
        r.partitions.insert("p1".into(), false);
        r.set_partitions_loaded(&["p1".into()], true);
        assert_eq!(r.load_state(), LoadState::PartiallyLoaded);
        r.set_all_loaded(true);
        assert_eq!(r.load_state(), LoadState::Loaded);
        r.set_all_loaded(false);
        assert_eq!(r.load_state(), LoadState::NotLoad);
    }

    #[test]
    fn property_round_trip() {
        let mut r = resource();
        r.alter_properties(&BTreeMap::from([("mmap.enabled".to_string(), json!(true))]));
        assert_eq!(r.describe().properties["mmap.enabled"], "true");
        r.drop_properties(&["mmap.enabled".to_string()]);
        assert!(!r.describe().properties.contains_key("mmap.enabled"));
    }

    #[test]
    fn rename_preserves_everything_but_the_name() {
        let mut reg = Registry::new();
        reg.insert(resource());
        let before = reg.get("c1").unwrap().describe();
        reg.rename("c1", "c2");
        assert!(!reg.exists("c1"));
        assert_eq!(reg.get("c2").unwrap().describe(), before.renamed("c2"));
    }

    #[test]
    fn drop_clears_aliases() {
        let mut reg = Registry::new();
        reg.insert(resource());
        reg.add_alias("a1", "c1");
        assert!(reg.exists("a1"));
        reg.mark_dropped("c1");
        assert!(!reg.exists("c1"));
        assert!(!reg.is_taken("a1"));
        assert!(reg.history("c1").is_some());
        assert_eq!(reg.dropped_names(), vec!["c1".to_string()]);
    }

    #[test]
    fn delete_and_search_surviving_rows() {
        let mut r = resource();
        let rows: Vec<Row> = (0..5)
            .map(|i| {
                json!({"vector": [i as f32, 1.0, 0.0, 0.0]})
                    .as_object()
                    .cloned()
                    .unwrap()
            })
            .collect();
        let ids: Vec<PrimaryKey> = (0..5).map(PrimaryKey::Int).collect();
        r.insert_rows(&rows, &ids, "_default");
        r.set_all_loaded(true);
        assert_eq!(r.delete_matching(&Filter::parse("id < 2").unwrap()), 2);
        let hits = r.search(&SearchRequest::new(vec![vec![4.0, 1.0, 0.0, 0.0]], 10));
        assert_eq!(hits[0].len(), 3);
        assert!(hits[0].iter().all(|h| h.id >= PrimaryKey::Int(2)));
    }

    #[test]
    fn released_partition_rows_are_not_searchable() {
        let mut r = resource();
        r.partitions.insert("p1".into(), false);
        let rows: Vec<Row> = (0..4)
            .map(|i| {
                json!({"vector": [i as f32, 0.0, 0.0, 1.0]})
                    .as_object()
                    .cloned()
                    .unwrap()
            })
            .collect();
        let ids: Vec<PrimaryKey> = (0..4).map(PrimaryKey::Int).collect();
        r.insert_rows(&rows[..3], &ids[..3], "_default");
        r.insert_rows(&rows[3..], &ids[3..], "p1");

        r.set_partitions_loaded(&["p1".into()], true);
        let request = SearchRequest::new(vec![vec![0.0, 0.0, 0.0, 1.0]], 10);
        let hits = r.search(&request);
        assert_eq!(hits[0].iter().map(|h| h.id.clone()).collect::<Vec<_>>(), vec![PrimaryKey::Int(3)]);
        assert_eq!(r.query(&Filter::parse("").unwrap()).len(), 1);

        r.set_partitions_loaded(&["p1".into()], false);
        r.set_partitions_loaded(&["_default".into()], true);
        assert_eq!(r.search(&request)[0].len(), 3);
        assert_eq!(r.resident_rows().count(), 3);
    }
}
