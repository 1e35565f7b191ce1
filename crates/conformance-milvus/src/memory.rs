use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use conformance_core::oracle::{validate_field, validate_index, validate_name, validate_schema};
use conformance_core::{
    CollectionDescription, ConformanceError, CreateCollection, DataType, DeleteSelector,
    ErrorTemplate, FieldSchema, Filter, IndexDescription, IndexSpec, IndexState, InsertResult,
    LoadState, MilvusService, PrimaryKey, Registry, Resource, Row, SearchHit, SearchRequest,
    ServiceLimits,
};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

enum Fault {
    Fail(ConformanceError),
    Delay(Duration),
}

/// An in-process service that enforces the collection rules of a conforming
/// Milvus deployment.
///
/// Clones share state, so two clones behave like two client sessions against
/// one server.
#[derive(Clone)]
pub struct InMemoryMilvus {
    state: Arc<RwLock<Registry>>,
    faults: Arc<Mutex<HashMap<String, VecDeque<Fault>>>>,
    next_id: Arc<AtomicI64>,
    limits: Arc<ServiceLimits>,
}

impl Default for InMemoryMilvus {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMilvus {
    pub fn new() -> Self {
        Self::with_limits(ServiceLimits::default())
    }

    pub fn with_limits(limits: ServiceLimits) -> Self {
        Self {
            state: Arc::new(RwLock::new(Registry::new())),
            faults: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
            limits: Arc::new(limits),
        }
    }

    pub fn limits(&self) -> &ServiceLimits {
        &self.limits
    }

    /// The next call of `operation` fails with `error` instead of executing.
    pub async fn inject_fault(&self, operation: &str, error: ConformanceError) {
        self.push_fault(operation, Fault::Fail(error)).await;
    }

    /// The next call of `operation` is held back for `delay` before executing.
    pub async fn inject_delay(&self, operation: &str, delay: Duration) {
        self.push_fault(operation, Fault::Delay(delay)).await;
    }

    async fn push_fault(&self, operation: &str, fault: Fault) {
        self.faults
            .lock()
            .await
            .entry(operation.to_string())
            .or_default()
            .push_back(fault);
    }

    async fn intercept(&self, operation: &str) -> Result<(), ConformanceError> {
        let fault = self
            .faults
            .lock()
            .await
            .get_mut(operation)
            .and_then(VecDeque::pop_front);
        match fault {
            None => Ok(()),
            Some(Fault::Fail(error)) => {
                tracing::debug!(operation, %error, "injected fault");
                Err(error)
            }
            Some(Fault::Delay(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }

    fn not_found(&self, name: &str) -> ErrorTemplate {
        ErrorTemplate::CollectionNotFound {
            database: self.limits.database.clone(),
            collection: name.to_string(),
        }
    }

    fn existing<'a>(&self, state: &'a Registry, name: &str) -> Result<&'a Resource, ErrorTemplate> {
        validate_name(name, &self.limits)?;
        state.get(name).ok_or_else(|| self.not_found(name))
    }

    fn existing_mut<'a>(
        &self,
        state: &'a mut Registry,
        name: &str,
    ) -> Result<&'a mut Resource, ErrorTemplate> {
        validate_name(name, &self.limits)?;
        state.get_mut(name).ok_or_else(|| self.not_found(name))
    }

    fn generate_ids(&self, pk: &FieldSchema, count: usize) -> Vec<PrimaryKey> {
        (0..count)
            .map(|_| {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                match pk.data_type {
                    DataType::VarChar => PrimaryKey::Str(id.to_string()),
                    _ => PrimaryKey::Int(id),
                }
            })
            .collect()
    }
}

fn reject(template: ErrorTemplate) -> ConformanceError {
    template.to_error()
}

fn require_indexed(resource: &Resource, name: &str) -> Result<(), ErrorTemplate> {
    if resource.unindexed_vector_fields().is_empty() {
        Ok(())
    } else {
        Err(ErrorTemplate::IndexNotFound {
            collection: name.to_string(),
        })
    }
}

fn require_loaded(resource: &Resource, name: &str) -> Result<(), ErrorTemplate> {
    if resource.is_queryable() {
        Ok(())
    } else {
        Err(ErrorTemplate::CollectionNotLoaded {
            collection: name.to_string(),
        })
    }
}

fn require_partitions(resource: &Resource, partitions: &[String]) -> Result<(), ErrorTemplate> {
    match resource.missing_partition(partitions) {
        Some(partition) => Err(ErrorTemplate::PartitionNotFound {
            partition: partition.clone(),
        }),
        None => Ok(()),
    }
}

fn index_field<'a>(resource: &'a Resource, spec: &IndexSpec) -> Result<&'a FieldSchema, ErrorTemplate> {
    resource
        .schema
        .field(&spec.field_name)
        .ok_or_else(|| ErrorTemplate::IndexBuildRejected {
            index_type: spec.index_type.clone(),
        })
}

/// Primary keys of the batch, checked against the schema before anything is written.
fn check_rows(resource: &Resource, rows: &[Row]) -> Result<Vec<PrimaryKey>, ErrorTemplate> {
    let Some(pk) = resource.primary_field() else {
        return Ok(Vec::new());
    };
    let mut ids = Vec::new();
    for row in rows {
        match row.get(&pk.name) {
            Some(_) if pk.auto_id => {
                return Err(ErrorTemplate::PrimaryKeyOnAutoId {
                    field: pk.name.clone(),
                })
            }
            None if !pk.auto_id => {
                return Err(ErrorTemplate::MissingPrimaryKey {
                    field: pk.name.clone(),
                })
            }
            Some(value) => ids.extend(PrimaryKey::from_value(value)),
            None => {}
        }
        for field in resource
            .schema
            .fields
            .iter()
            .filter(|f| f.data_type.is_float_vector())
        {
            let Some(dim) = field.dim else { continue };
            let Some(values) = row.get(&field.name).and_then(Value::as_array) else {
                continue;
            };
            if values.len() as i64 != dim {
                return Err(ErrorTemplate::DimensionMismatch {
                    field: field.name.clone(),
                    actual: values.len(),
                    dim: u32::try_from(dim).unwrap_or_default(),
                });
            }
        }
    }
    Ok(ids)
}

#[async_trait]
impl MilvusService for InMemoryMilvus {
    async fn create_collection(&self, request: &CreateCollection) -> Result<(), ConformanceError> {
        self.intercept("create_collection").await?;
        let limits = &self.limits;
        validate_name(&request.name, limits).map_err(reject)?;
        let schema = request.resolved_schema();
        validate_schema(&request.name, &schema, limits).map_err(reject)?;
        for spec in request.resolved_indexes() {
            let field = schema.field(&spec.field_name).ok_or_else(|| {
                reject(ErrorTemplate::IndexBuildRejected {
                    index_type: spec.index_type.clone(),
                })
            })?;
            validate_index(&spec, field, limits).map_err(reject)?;
        }

        let mut state = self.state.write().await;
        if state.is_alias(&request.name) {
            return Err(reject(ErrorTemplate::DuplicateCollectionName {
                database: limits.database.clone(),
                name: request.name.clone(),
            }));
        }
        if let Some(existing) = state.collection(&request.name) {
            if existing.schema.same_shape(&schema)
                && existing.consistency_level == request.consistency_level
            {
                return Ok(());
            }
            return Err(reject(ErrorTemplate::DuplicateDifferentParams {
                collection: request.name.clone(),
            }));
        }
        state.insert(Resource::from_request(request, limits));
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> Result<(), ConformanceError> {
        self.intercept("drop_collection").await?;
        if name.is_empty() {
            return Err(reject(ErrorTemplate::IllegalCollectionName {
                repr: String::new(),
            }));
        }
        validate_name(name, &self.limits).map_err(reject)?;
        let mut state = self.state.write().await;
        if state.collection(name).is_some() {
            state.mark_dropped(name);
        }
        Ok(())
    }

    async fn describe_collection(
        &self,
        name: &str,
    ) -> Result<CollectionDescription, ConformanceError> {
        self.intercept("describe_collection").await?;
        validate_name(name, &self.limits).map_err(reject)?;
        let state = self.state.read().await;
        let resource = state.get(name).ok_or_else(|| {
            reject(ErrorTemplate::CannotFindCollection {
                database: self.limits.database.clone(),
                collection: name.to_string(),
            })
        })?;
        Ok(resource.describe())
    }

    async fn has_collection(&self, name: &str) -> Result<bool, ConformanceError> {
        self.intercept("has_collection").await?;
        validate_name(name, &self.limits).map_err(reject)?;
        Ok(self.state.read().await.exists(name))
    }

    async fn list_collections(&self) -> Result<Vec<String>, ConformanceError> {
        self.intercept("list_collections").await?;
        Ok(self.state.read().await.names())
    }

    async fn load_collection(&self, name: &str) -> Result<(), ConformanceError> {
        self.intercept("load_collection").await?;
        let mut state = self.state.write().await;
        let resource = self.existing_mut(&mut state, name).map_err(reject)?;
        require_indexed(resource, name).map_err(reject)?;
        resource.set_all_loaded(true);
        Ok(())
    }

    async fn release_collection(&self, name: &str) -> Result<(), ConformanceError> {
        self.intercept("release_collection").await?;
        let mut state = self.state.write().await;
        let resource = self.existing_mut(&mut state, name).map_err(reject)?;
        resource.set_all_loaded(false);
        Ok(())
    }

    async fn get_load_state(&self, name: &str) -> Result<LoadState, ConformanceError> {
        self.intercept("get_load_state").await?;
        let state = self.state.read().await;
        let resource = self.existing(&state, name).map_err(reject)?;
        Ok(resource.load_state())
    }

    async fn create_partition(&self, name: &str, partition: &str) -> Result<(), ConformanceError> {
        self.intercept("create_partition").await?;
        let mut state = self.state.write().await;
        let resource = self.existing_mut(&mut state, name).map_err(reject)?;
        resource
            .partitions
            .entry(partition.to_string())
            .or_insert(false);
        Ok(())
    }

    async fn load_partitions(
        &self,
        name: &str,
        partitions: &[String],
    ) -> Result<(), ConformanceError> {
        self.intercept("load_partitions").await?;
        let mut state = self.state.write().await;
        let resource = self.existing_mut(&mut state, name).map_err(reject)?;
        require_partitions(resource, partitions).map_err(reject)?;
        require_indexed(resource, name).map_err(reject)?;
        resource.set_partitions_loaded(partitions, true);
        Ok(())
    }

    async fn release_partitions(
        &self,
        name: &str,
        partitions: &[String],
    ) -> Result<(), ConformanceError> {
        self.intercept("release_partitions").await?;
        let mut state = self.state.write().await;
        let resource = self.existing_mut(&mut state, name).map_err(reject)?;
        require_partitions(resource, partitions).map_err(reject)?;
        resource.set_partitions_loaded(partitions, false);
        Ok(())
    }

    async fn rename_collection(
        &self,
        old_name: &str,
        new_name: &str,
    ) -> Result<(), ConformanceError> {
        self.intercept("rename_collection").await?;
        let limits = &self.limits;
        validate_name(old_name, limits).map_err(reject)?;
        let mut state = self.state.write().await;
        if state.collection(old_name).is_none() {
            return Err(reject(self.not_found(old_name)));
        }
        validate_name(new_name, limits).map_err(reject)?;
        if old_name == new_name || state.is_taken(new_name) {
            return Err(reject(ErrorTemplate::DuplicateCollectionName {
                database: limits.database.clone(),
                name: new_name.to_string(),
            }));
        }
        state.rename(old_name, new_name);
        Ok(())
    }

    async fn alter_collection_properties(
        &self,
        name: &str,
        properties: &BTreeMap<String, Value>,
    ) -> Result<(), ConformanceError> {
        self.intercept("alter_collection_properties").await?;
        let mut state = self.state.write().await;
        let resource = self.existing_mut(&mut state, name).map_err(reject)?;
        if properties.is_empty() {
            return Err(reject(ErrorTemplate::IllegalProperties {
                repr: "{}".to_string(),
            }));
        }
        resource.alter_properties(properties);
        Ok(())
    }

    async fn drop_collection_properties(
        &self,
        name: &str,
        keys: &[String],
    ) -> Result<(), ConformanceError> {
        self.intercept("drop_collection_properties").await?;
        let mut state = self.state.write().await;
        let resource = self.existing_mut(&mut state, name).map_err(reject)?;
        if keys.is_empty() {
            return Err(reject(ErrorTemplate::EmptyPropertyMutation));
        }
        resource.drop_properties(keys);
        Ok(())
    }

    async fn add_collection_field(
        &self,
        name: &str,
        field: &FieldSchema,
    ) -> Result<(), ConformanceError> {
        self.intercept("add_collection_field").await?;
        let mut state = self.state.write().await;
        let resource = self.existing_mut(&mut state, name).map_err(reject)?;
        if field.is_primary {
            return Err(reject(ErrorTemplate::CannotAddPrimary {
                field: field.name.clone(),
            }));
        }
        if resource.schema.field(&field.name).is_some() {
            return Err(reject(ErrorTemplate::DuplicateField {
                field: field.name.clone(),
            }));
        }
        if !field.nullable {
            return Err(reject(ErrorTemplate::AddedFieldNotNullable {
                field: field.name.clone(),
            }));
        }
        validate_field(name, field, &self.limits).map_err(reject)?;
        resource.add_field(field);
        Ok(())
    }

    async fn create_index(&self, name: &str, indexes: &[IndexSpec]) -> Result<(), ConformanceError> {
        self.intercept("create_index").await?;
        let mut state = self.state.write().await;
        let resource = self.existing_mut(&mut state, name).map_err(reject)?;
        for spec in indexes {
            let field = index_field(resource, spec).map_err(reject)?;
            validate_index(spec, field, &self.limits).map_err(reject)?;
        }
        for spec in indexes {
            resource.indexes.retain(|_, i| i.field_name != spec.field_name);
            resource
                .indexes
                .insert(spec.name().to_string(), IndexState::from_spec(spec));
        }
        Ok(())
    }

    async fn drop_index(&self, name: &str, index_name: &str) -> Result<(), ConformanceError> {
        self.intercept("drop_index").await?;
        let mut state = self.state.write().await;
        let resource = self.existing_mut(&mut state, name).map_err(reject)?;
        if resource.is_queryable() {
            return Err(reject(ErrorTemplate::DropIndexWhileLoaded));
        }
        resource.indexes.remove(index_name);
        Ok(())
    }

    async fn list_indexes(&self, name: &str) -> Result<Vec<String>, ConformanceError> {
        self.intercept("list_indexes").await?;
        let state = self.state.read().await;
        let resource = self.existing(&state, name).map_err(reject)?;
        Ok(resource.index_names())
    }

    async fn describe_index(
        &self,
        name: &str,
        index_name: &str,
    ) -> Result<IndexDescription, ConformanceError> {
        self.intercept("describe_index").await?;
        let state = self.state.read().await;
        let resource = self.existing(&state, name).map_err(reject)?;
        resource
            .indexes
            .get(index_name)
            .map(IndexState::describe)
            .ok_or_else(|| {
                reject(ErrorTemplate::IndexNotFound {
                    collection: name.to_string(),
                })
            })
    }

    async fn create_alias(&self, collection: &str, alias: &str) -> Result<(), ConformanceError> {
        self.intercept("create_alias").await?;
        let mut state = self.state.write().await;
        self.existing(&state, collection).map_err(reject)?;
        validate_name(alias, &self.limits).map_err(reject)?;
        if state.is_alias(alias) {
            return Err(reject(ErrorTemplate::AliasExists {
                alias: alias.to_string(),
            }));
        }
        if state.collection(alias).is_some() {
            return Err(reject(ErrorTemplate::DuplicateCollectionName {
                database: self.limits.database.clone(),
                name: alias.to_string(),
            }));
        }
        state.add_alias(alias, collection);
        Ok(())
    }

    async fn drop_alias(&self, alias: &str) -> Result<(), ConformanceError> {
        self.intercept("drop_alias").await?;
        validate_name(alias, &self.limits).map_err(reject)?;
        self.state.write().await.remove_alias(alias);
        Ok(())
    }

    async fn insert_into(
        &self,
        name: &str,
        partition: Option<&str>,
        rows: &[Row],
    ) -> Result<InsertResult, ConformanceError> {
        self.intercept("insert").await?;
        let mut state = self.state.write().await;
        let resource = self.existing_mut(&mut state, name).map_err(reject)?;
        let partition = partition.unwrap_or(self.limits.default_partition.as_str());
        if !resource.partitions.contains_key(partition) {
            return Err(reject(ErrorTemplate::PartitionNotFound {
                partition: partition.to_string(),
            }));
        }
        let mut ids = check_rows(resource, rows).map_err(reject)?;
        if let Some(pk) = resource.primary_field().filter(|pk| pk.auto_id) {
            ids = self.generate_ids(pk, rows.len());
        }
        resource.insert_rows(rows, &ids, partition);
        tracing::debug!(collection = name, partition, rows = rows.len(), "rows inserted");
        Ok(InsertResult {
            insert_count: rows.len(),
            ids,
        })
    }

    async fn delete(
        &self,
        name: &str,
        selector: &DeleteSelector,
    ) -> Result<usize, ConformanceError> {
        self.intercept("delete").await?;
        let mut state = self.state.write().await;
        let resource = self.existing_mut(&mut state, name).map_err(reject)?;
        let deleted = match selector {
            DeleteSelector::Ids(ids) => resource.delete_ids(ids),
            DeleteSelector::Filter(expr) => {
                let filter = Filter::parse(expr).map_err(reject)?;
                resource.delete_matching(&filter)
            }
        };
        Ok(deleted)
    }

    async fn search(
        &self,
        name: &str,
        request: &SearchRequest,
    ) -> Result<Vec<Vec<SearchHit>>, ConformanceError> {
        self.intercept("search").await?;
        let state = self.state.read().await;
        let resource = self.existing(&state, name).map_err(reject)?;
        require_loaded(resource, name).map_err(reject)?;
        Ok(resource.search(request))
    }

    async fn query(&self, name: &str, filter: &str) -> Result<Vec<Row>, ConformanceError> {
        self.intercept("query").await?;
        let state = self.state.read().await;
        let resource = self.existing(&state, name).map_err(reject)?;
        require_loaded(resource, name).map_err(reject)?;
        let filter = Filter::parse(filter).map_err(reject)?;
        Ok(resource.query(&filter))
    }
}
