//! Translation between model types and REST v2 JSON bodies.

use std::collections::BTreeMap;

use conformance_core::{
    stringify, CollectionDescription, ConformanceError, ConsistencyLevel, CreateCollection,
    DataType, FieldSchema, IdType, IndexDescription, IndexSpec, LoadState, PrimaryKey,
    SearchHit,
};
use serde_json::{json, Map, Value};

pub(crate) fn create_body(request: &CreateCollection) -> Value {
    let mut params = Map::new();
    params.insert(
        "consistencyLevel".to_string(),
        json!(request.consistency_level.as_str()),
    );
    for (key, value) in &request.properties {
        params.insert(key.clone(), json!(stringify(value)));
    }

    let mut map = Map::new();
    map.insert("collectionName".to_string(), json!(request.name));

    match &request.schema {
        None => {
            map.insert("dimension".to_string(), json!(request.dimension));
            map.insert("metricType".to_string(), json!(request.metric_type));
            map.insert("primaryFieldName".to_string(), json!(request.primary_field_name));
            map.insert("vectorFieldName".to_string(), json!(request.vector_field_name));
            map.insert("autoId".to_string(), json!(request.auto_id));
            let id_type = match request.id_type {
                IdType::Int => DataType::Int64,
                IdType::String => DataType::VarChar,
            };
            map.insert("idType".to_string(), json!(id_type.as_str()));
            if let Some(max_length) = request.max_length {
                params.insert("max_length".to_string(), json!(max_length));
            }
        }
        Some(schema) => {
            map.insert(
                "schema".to_string(),
                json!({
                    "autoId": schema.auto_id(),
                    "enableDynamicField": schema.enable_dynamic_field,
                    "fields": schema.fields.iter().map(field_to_wire).collect::<Vec<_>>(),
                }),
            );
            // An explicit null is sent as such; the service rejects it.
            map.insert("description".to_string(), json!(schema.description));
        }
    }
    if !request.index_params.is_empty() {
        map.insert(
            "indexParams".to_string(),
            indexes_to_wire(&request.index_params),
        );
    }
    map.insert("params".to_string(), Value::Object(params));
    Value::Object(map)
}

pub(crate) fn field_to_wire(field: &FieldSchema) -> Value {
    let mut type_params = Map::new();
    if let Some(dim) = field.dim {
        type_params.insert("dim".to_string(), json!(dim.to_string()));
    }
    if let Some(max_length) = field.max_length {
        type_params.insert("max_length".to_string(), json!(max_length.to_string()));
    }
    if let Some(max_capacity) = field.max_capacity {
        type_params.insert("max_capacity".to_string(), json!(max_capacity.to_string()));
    }

    let mut wire = json!({
        "fieldName": field.name,
        "dataType": field.data_type.as_str(),
        "isPrimary": field.is_primary,
        "isPartitionKey": field.is_partition_key,
        "isClusteringKey": field.is_clustering_key,
        "nullable": field.nullable,
        "elementTypeParams": type_params,
    });
    if let Value::Object(map) = &mut wire {
        if field.is_primary {
            map.insert("autoID".to_string(), json!(field.auto_id));
        }
        if let Some(element_type) = field.element_type {
            map.insert("elementDataType".to_string(), json!(element_type.as_str()));
        }
        if let Some(default) = &field.default_value {
            map.insert("defaultValue".to_string(), default.clone());
        }
    }
    wire
}

pub(crate) fn indexes_to_wire(indexes: &[IndexSpec]) -> Value {
    indexes
        .iter()
        .map(|spec| {
            json!({
                "fieldName": spec.field_name,
                "indexName": spec.name(),
                "indexType": spec.index_type,
                "metricType": spec.metric_type,
                "params": spec.params,
            })
        })
        .collect()
}

fn parse_err(what: &str, data: &Value) -> ConformanceError {
    ConformanceError::Parse(format!("unexpected {what} payload: {data}"))
}

/// `[{"key": .., "value": ..}]` pairs as returned by describe calls.
fn key_values(data: &Value) -> BTreeMap<String, String> {
    data.as_array()
        .into_iter()
        .flatten()
        .filter_map(|kv| Some((kv["key"].as_str()?.to_string(), stringify(&kv["value"]))))
        .collect()
}

fn field_from_wire(data: &Value) -> Result<FieldSchema, ConformanceError> {
    let name = data["name"]
        .as_str()
        .ok_or_else(|| parse_err("field", data))?;
    let data_type = data["type"]
        .as_str()
        .and_then(DataType::parse)
        .ok_or_else(|| parse_err("field type", data))?;
    let params = key_values(&data["params"]);
    let number = |key: &str| params.get(key).and_then(|v| v.parse::<i64>().ok());

    let mut field = FieldSchema::new(name, data_type);
    field.is_primary = data["primaryKey"].as_bool().unwrap_or(false);
    field.auto_id = data["autoId"].as_bool().unwrap_or(false);
    field.is_partition_key = data["partitionKey"].as_bool().unwrap_or(false);
    field.is_clustering_key = data["clusteringKey"].as_bool().unwrap_or(false);
    field.nullable = data["nullable"].as_bool().unwrap_or(false);
    field.dim = number("dim");
    field.max_length = number("max_length").and_then(|v| u32::try_from(v).ok());
    field.max_capacity = number("max_capacity").and_then(|v| u32::try_from(v).ok());
    field.element_type = data["elementType"].as_str().and_then(DataType::parse);
    field.default_value = match &data["defaultValue"] {
        Value::Null => None,
        other => Some(other.clone()),
    };
    Ok(field)
}

pub(crate) fn description_from_wire(
    data: &Value,
) -> Result<CollectionDescription, ConformanceError> {
    let collection_name = data["collectionName"]
        .as_str()
        .ok_or_else(|| parse_err("describe", data))?
        .to_string();
    let fields = data["fields"]
        .as_array()
        .ok_or_else(|| parse_err("describe", data))?
        .iter()
        .map(field_from_wire)
        .collect::<Result<Vec<_>, _>>()?;
    let consistency_level = match &data["consistencyLevel"] {
        Value::String(s) => ConsistencyLevel::parse(s),
        Value::Number(n) => ConsistencyLevel::parse(&n.to_string()),
        _ => None,
    }
    .unwrap_or_default();

    Ok(CollectionDescription {
        collection_name,
        description: data["description"].as_str().unwrap_or_default().to_string(),
        auto_id: data["autoId"].as_bool().unwrap_or(false),
        consistency_level,
        enable_dynamic_field: data["enableDynamicField"].as_bool().unwrap_or(false),
        num_partitions: data["partitionsNum"].as_u64().unwrap_or(1) as usize,
        properties: key_values(&data["properties"]),
        fields,
    })
}

const INDEX_STATUS_KEYS: [&str; 9] = [
    "indexName",
    "fieldName",
    "indexType",
    "metricType",
    "indexState",
    "totalRows",
    "indexedRows",
    "pendingRows",
    "failReason",
];

/// Build parameters come back either nested under `params` or flattened next
/// to the status fields; both are collected.
pub(crate) fn index_from_wire(data: &Value) -> Result<IndexDescription, ConformanceError> {
    let entry = match data {
        Value::Array(entries) => entries.first().ok_or_else(|| parse_err("index", data))?,
        other => other,
    };
    let index_name = entry["indexName"]
        .as_str()
        .ok_or_else(|| parse_err("index", data))?
        .to_string();
    let mut params = BTreeMap::new();
    if let Some(map) = entry.as_object() {
        for (key, value) in map {
            if key == "params" {
                if let Some(nested) = value.as_object() {
                    params.extend(nested.iter().map(|(k, v)| (k.clone(), stringify(v))));
                }
            } else if !INDEX_STATUS_KEYS.contains(&key.as_str()) {
                params.insert(key.clone(), stringify(value));
            }
        }
    }
    Ok(IndexDescription {
        index_name,
        field_name: entry["fieldName"].as_str().unwrap_or_default().to_string(),
        index_type: entry["indexType"].as_str().unwrap_or_default().to_string(),
        metric_type: entry["metricType"].as_str().map(str::to_string),
        params,
    })
}

pub(crate) fn load_state_from_wire(data: &Value) -> LoadState {
    match data["loadState"].as_str() {
        Some("LoadStateLoaded") => LoadState::Loaded,
        Some("LoadStateLoading") => LoadState::PartiallyLoaded,
        _ => LoadState::NotLoad,
    }
}

pub(crate) fn names_from_wire(data: &Value) -> Result<Vec<String>, ConformanceError> {
    data.as_array()
        .ok_or_else(|| parse_err("name list", data))?
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| parse_err("name list", data))
        })
        .collect()
}

pub(crate) fn ids_from_wire(data: &Value) -> Vec<PrimaryKey> {
    data.as_array()
        .into_iter()
        .flatten()
        .filter_map(PrimaryKey::from_value)
        .collect()
}

fn hit_from_wire(hit: &Value, pk_field: &str) -> Option<SearchHit> {
    let id = PrimaryKey::from_value(&hit[pk_field]).or_else(|| PrimaryKey::from_value(&hit["id"]))?;
    let distance = hit["distance"].as_f64()? as f32;
    Some(SearchHit { id, distance })
}

/// Search results arrive nested per query vector or as one flat list of
/// equally sized groups.
pub(crate) fn hits_from_wire(
    data: &Value,
    nq: usize,
    pk_field: &str,
) -> Result<Vec<Vec<SearchHit>>, ConformanceError> {
    let entries = data.as_array().ok_or_else(|| parse_err("search", data))?;
    let parse_group = |group: &[Value]| -> Result<Vec<SearchHit>, ConformanceError> {
        group
            .iter()
            .map(|hit| hit_from_wire(hit, pk_field).ok_or_else(|| parse_err("search hit", hit)))
            .collect()
    };

    if entries.iter().all(Value::is_array) && !entries.is_empty() {
        return entries
            .iter()
            .map(|group| parse_group(group.as_array().map(Vec::as_slice).unwrap_or_default()))
            .collect();
    }
    if nq <= 1 {
        return Ok(vec![parse_group(entries)?]);
    }
    if entries.is_empty() {
        return Ok(vec![Vec::new(); nq]);
    }
    if entries.len() % nq != 0 {
        return Err(parse_err("search (uneven groups)", data));
    }
    entries.chunks(entries.len() / nq).map(parse_group).collect()
}
