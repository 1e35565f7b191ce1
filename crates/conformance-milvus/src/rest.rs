use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use conformance_core::{
    CollectionDescription, ConformanceError, CreateCollection, DeleteSelector, FieldSchema,
    IndexDescription, IndexSpec, InsertResult, LoadState, MilvusService, PrimaryKey, Row,
    SearchHit, SearchRequest,
};
use serde_json::{json, Value};

use crate::config::MilvusConfig;
use crate::wire;

const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(200);
const MAX_QUERY_LIMIT: usize = 16384;

/// A [`MilvusService`] speaking the Milvus REST API v2.
///
/// A non-zero `code` in a response body is surfaced unchanged as
/// [`ConformanceError::Service`]; anything that prevents reading a response
/// is an infrastructure error.
pub struct MilvusRestClient {
    config: MilvusConfig,
    client: reqwest::Client,
}

impl MilvusRestClient {
    pub fn new(config: MilvusConfig) -> Result<Self, ConformanceError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConformanceError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> Result<Self, ConformanceError> {
        Self::new(MilvusConfig::from_env())
    }

    pub fn config(&self) -> &MilvusConfig {
        &self.config
    }

    /// POSTs `body` to `path` and returns the `data` member of the reply.
    async fn request(&self, path: &str, mut body: Value) -> Result<Value, ConformanceError> {
        if let Value::Object(map) = &mut body {
            map.insert("dbName".to_string(), json!(self.config.database));
        }
        let url = self.config.url(path);
        tracing::debug!(path, "milvus request");

        let mut req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");
        if let Some(ref key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {key}"));
        }
        let resp = req.json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                ConformanceError::Timeout(format!("{path}: {e}"))
            } else {
                ConformanceError::Transport(format!("{path}: {e}"))
            }
        })?;
        let status = resp.status().as_u16();
        let json: Value = resp
            .json()
            .await
            .map_err(|e| ConformanceError::Parse(format!("{path}: {e}")))?;
        if status >= 400 {
            return Err(ConformanceError::Transport(format!(
                "{path}: HTTP {status}: {json}"
            )));
        }

        let code = json["code"].as_i64().unwrap_or(0);
        if code != 0 {
            let message = json["message"].as_str().unwrap_or_default();
            tracing::warn!(path, code, reason = message, "milvus returned an error");
            return Err(ConformanceError::service(code, message));
        }
        Ok(json.get("data").cloned().unwrap_or(Value::Null))
    }

    async fn load_state(
        &self,
        name: &str,
        partitions: &[String],
    ) -> Result<LoadState, ConformanceError> {
        let mut body = json!({ "collectionName": name });
        if !partitions.is_empty() {
            body["partitionNames"] = json!(partitions);
        }
        let data = self
            .request("/v2/vectordb/collections/get_load_state", body)
            .await?;
        Ok(wire::load_state_from_wire(&data))
    }

    /// Loads are asynchronous on the server; block until they finish.
    async fn wait_loaded(&self, name: &str, partitions: &[String]) -> Result<(), ConformanceError> {
        let deadline = tokio::time::Instant::now() + self.config.timeout;
        loop {
            if self.load_state(name, partitions).await? == LoadState::Loaded {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(ConformanceError::Timeout(format!(
                    "{name} not loaded within {:?}",
                    self.config.timeout
                )));
            }
            tokio::time::sleep(LOAD_POLL_INTERVAL).await;
        }
    }

    async fn primary_field_name(&self, name: &str) -> Option<String> {
        let description = self.describe_collection(name).await.ok()?;
        description.primary_field().map(|f| f.name.clone())
    }

    async fn collection_call(&self, path: &str, name: &str) -> Result<(), ConformanceError> {
        self.request(path, json!({ "collectionName": name })).await?;
        Ok(())
    }
}

#[async_trait]
impl MilvusService for MilvusRestClient {
    async fn create_collection(&self, request: &CreateCollection) -> Result<(), ConformanceError> {
        self.request("/v2/vectordb/collections/create", wire::create_body(request))
            .await?;
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> Result<(), ConformanceError> {
        self.collection_call("/v2/vectordb/collections/drop", name).await
    }

    async fn describe_collection(
        &self,
        name: &str,
    ) -> Result<CollectionDescription, ConformanceError> {
        let data = self
            .request(
                "/v2/vectordb/collections/describe",
                json!({ "collectionName": name }),
            )
            .await?;
        wire::description_from_wire(&data)
    }

    async fn has_collection(&self, name: &str) -> Result<bool, ConformanceError> {
        let data = self
            .request("/v2/vectordb/collections/has", json!({ "collectionName": name }))
            .await?;
        data["has"]
            .as_bool()
            .ok_or_else(|| ConformanceError::Parse(format!("unexpected has payload: {data}")))
    }

    async fn list_collections(&self) -> Result<Vec<String>, ConformanceError> {
        let data = self
            .request("/v2/vectordb/collections/list", json!({}))
            .await?;
        wire::names_from_wire(&data)
    }

    async fn load_collection(&self, name: &str) -> Result<(), ConformanceError> {
        self.collection_call("/v2/vectordb/collections/load", name)
            .await?;
        self.wait_loaded(name, &[]).await
    }

    async fn release_collection(&self, name: &str) -> Result<(), ConformanceError> {
        self.collection_call("/v2/vectordb/collections/release", name)
            .await
    }

    async fn get_load_state(&self, name: &str) -> Result<LoadState, ConformanceError> {
        self.load_state(name, &[]).await
    }

    async fn create_partition(&self, name: &str, partition: &str) -> Result<(), ConformanceError> {
        self.request(
            "/v2/vectordb/partitions/create",
            json!({ "collectionName": name, "partitionName": partition }),
        )
        .await?;
        Ok(())
    }

    async fn load_partitions(
        &self,
        name: &str,
        partitions: &[String],
    ) -> Result<(), ConformanceError> {
        self.request(
            "/v2/vectordb/partitions/load",
            json!({ "collectionName": name, "partitionNames": partitions }),
        )
        .await?;
        self.wait_loaded(name, partitions).await
    }

    async fn release_partitions(
        &self,
        name: &str,
        partitions: &[String],
    ) -> Result<(), ConformanceError> {
        self.request(
            "/v2/vectordb/partitions/release",
            json!({ "collectionName": name, "partitionNames": partitions }),
        )
        .await?;
        Ok(())
    }

    async fn rename_collection(
        &self,
        old_name: &str,
        new_name: &str,
    ) -> Result<(), ConformanceError> {
        self.request(
            "/v2/vectordb/collections/rename",
            json!({ "collectionName": old_name, "newCollectionName": new_name }),
        )
        .await?;
        Ok(())
    }

    async fn alter_collection_properties(
        &self,
        name: &str,
        properties: &BTreeMap<String, Value>,
    ) -> Result<(), ConformanceError> {
        self.request(
            "/v2/vectordb/collections/alter_properties",
            json!({ "collectionName": name, "properties": properties }),
        )
        .await?;
        Ok(())
    }

    async fn drop_collection_properties(
        &self,
        name: &str,
        keys: &[String],
    ) -> Result<(), ConformanceError> {
        self.request(
            "/v2/vectordb/collections/drop_properties",
            json!({ "collectionName": name, "propertyKeys": keys }),
        )
        .await?;
        Ok(())
    }

    async fn add_collection_field(
        &self,
        name: &str,
        field: &FieldSchema,
    ) -> Result<(), ConformanceError> {
        self.request(
            "/v2/vectordb/collections/fields/add",
            json!({ "collectionName": name, "schema": wire::field_to_wire(field) }),
        )
        .await?;
        Ok(())
    }

    async fn create_index(&self, name: &str, indexes: &[IndexSpec]) -> Result<(), ConformanceError> {
        self.request(
            "/v2/vectordb/indexes/create",
            json!({ "collectionName": name, "indexParams": wire::indexes_to_wire(indexes) }),
        )
        .await?;
        Ok(())
    }

    async fn drop_index(&self, name: &str, index_name: &str) -> Result<(), ConformanceError> {
        self.request(
            "/v2/vectordb/indexes/drop",
            json!({ "collectionName": name, "indexName": index_name }),
        )
        .await?;
        Ok(())
    }

    async fn list_indexes(&self, name: &str) -> Result<Vec<String>, ConformanceError> {
        let data = self
            .request("/v2/vectordb/indexes/list", json!({ "collectionName": name }))
            .await?;
        wire::names_from_wire(&data)
    }

    async fn describe_index(
        &self,
        name: &str,
        index_name: &str,
    ) -> Result<IndexDescription, ConformanceError> {
        let data = self
            .request(
                "/v2/vectordb/indexes/describe",
                json!({ "collectionName": name, "indexName": index_name }),
            )
            .await?;
        wire::index_from_wire(&data)
    }

    async fn create_alias(&self, collection: &str, alias: &str) -> Result<(), ConformanceError> {
        self.request(
            "/v2/vectordb/aliases/create",
            json!({ "collectionName": collection, "aliasName": alias }),
        )
        .await?;
        Ok(())
    }

    async fn drop_alias(&self, alias: &str) -> Result<(), ConformanceError> {
        self.request("/v2/vectordb/aliases/drop", json!({ "aliasName": alias }))
            .await?;
        Ok(())
    }

    async fn insert_into(
        &self,
        name: &str,
        partition: Option<&str>,
        rows: &[Row],
    ) -> Result<InsertResult, ConformanceError> {
        let mut body = json!({ "collectionName": name, "data": rows });
        if let Some(partition) = partition {
            body["partitionName"] = json!(partition);
        }
        let data = self.request("/v2/vectordb/entities/insert", body).await?;
        let insert_count = data["insertCount"]
            .as_u64()
            .ok_or_else(|| ConformanceError::Parse(format!("unexpected insert payload: {data}")))?
            as usize;
        Ok(InsertResult {
            insert_count,
            ids: wire::ids_from_wire(&data["insertIds"]),
        })
    }

    async fn delete(
        &self,
        name: &str,
        selector: &DeleteSelector,
    ) -> Result<usize, ConformanceError> {
        let filter = match selector {
            DeleteSelector::Filter(expr) => expr.clone(),
            DeleteSelector::Ids(ids) => {
                // A missing collection still goes to the server so it reports its own error.
                let pk = self
                    .primary_field_name(name)
                    .await
                    .unwrap_or_else(|| "id".to_string());
                let literals: Vec<String> = ids.iter().map(PrimaryKey::to_literal).collect();
                format!("{pk} in [{}]", literals.join(","))
            }
        };
        let data = self
            .request(
                "/v2/vectordb/entities/delete",
                json!({ "collectionName": name, "filter": filter }),
            )
            .await?;
        Ok(data["deleteCount"].as_u64().unwrap_or(0) as usize)
    }

    async fn search(
        &self,
        name: &str,
        request: &SearchRequest,
    ) -> Result<Vec<Vec<SearchHit>>, ConformanceError> {
        let mut body = json!({
            "collectionName": name,
            "data": request.vectors,
            "limit": request.limit,
            "searchParams": { "params": request.params },
        });
        if let Some(field) = &request.anns_field {
            body["annsField"] = json!(field);
        }
        let data = self.request("/v2/vectordb/entities/search", body).await?;
        let pk = self
            .primary_field_name(name)
            .await
            .unwrap_or_else(|| "id".to_string());
        wire::hits_from_wire(&data, request.vectors.len(), &pk)
    }

    async fn query(&self, name: &str, filter: &str) -> Result<Vec<Row>, ConformanceError> {
        let mut body = json!({ "collectionName": name, "filter": filter, "outputFields": ["*"] });
        // The server requires a limit for an unfiltered query.
        if filter.trim().is_empty() {
            body["limit"] = json!(MAX_QUERY_LIMIT);
        }
        let data = self.request("/v2/vectordb/entities/query", body).await?;
        let rows = data
            .as_array()
            .ok_or_else(|| ConformanceError::Parse(format!("unexpected query payload: {data}")))?;
        Ok(rows.iter().filter_map(|row| row.as_object().cloned()).collect())
    }
}
