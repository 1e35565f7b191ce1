//! Naming and schema validation rules the service is expected to enforce.
//!
//! Everything here is pure: the catalog uses these functions to predict an
//! outcome before the real call is made.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::schema::{CollectionSchema, DataType, FieldSchema, IndexSpec, IndexType, MetricType};
use crate::template::ErrorTemplate;

static NAME_CHARSET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]*$").unwrap());

/// Limits the service under test is configured with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceLimits {
    /// Smallest accepted vector dimension.
    pub min_dim: u32,
    /// Largest accepted vector dimension.
    pub max_dim: u32,
    /// Names at least this long are rejected.
    pub max_name_length: usize,
    /// Database the session is bound to; appears in not-found messages.
    pub database: String,
    /// Partition every collection starts with and unqualified inserts land in.
    pub default_partition: String,
    /// Number of partitions a partition-key collection is created with.
    pub partition_key_partitions: usize,
    /// Lower bound of the HNSW `M` parameter.
    pub min_hnsw_m: i64,
    /// Upper bound of the HNSW `M` parameter.
    pub max_hnsw_m: i64,
}

impl Default for ServiceLimits {
    fn default() -> Self {
        Self {
            min_dim: 2,
            max_dim: 32768,
            max_name_length: 255,
            database: "default".to_string(),
            default_partition: "_default".to_string(),
            partition_key_partitions: 16,
            min_hnsw_m: 2,
            max_hnsw_m: 2048,
        }
    }
}

impl ServiceLimits {
    /// Set the accepted vector dimension range.
    pub fn with_dim_range(mut self, min_dim: u32, max_dim: u32) -> Self {
        self.min_dim = min_dim;
        self.max_dim = max_dim;
        self
    }

    /// Set the database name.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the name length limit.
    pub fn with_max_name_length(mut self, max_name_length: usize) -> Self {
        self.max_name_length = max_name_length;
        self
    }
}

/// Collection (and alias) naming grammar.
pub fn validate_name(name: &str, limits: &ServiceLimits) -> Result<(), ErrorTemplate> {
    if name.trim().is_empty() {
        return Err(ErrorTemplate::NameEmpty {
            name: name.to_string(),
        });
    }
    if name.chars().count() >= limits.max_name_length {
        return Err(ErrorTemplate::NameTooLong {
            name: name.to_string(),
            max: limits.max_name_length,
        });
    }
    let mut chars = name.chars();
    let first = chars.next().unwrap_or_default();
    if first != '_' && !first.is_ascii_alphabetic() {
        return Err(ErrorTemplate::NameFirstChar {
            name: name.to_string(),
        });
    }
    if !NAME_CHARSET.is_match(chars.as_str()) {
        return Err(ErrorTemplate::NameCharset {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Dimension bounds for vector fields.
///
/// Below the minimum the message is global; above the maximum it names the field.
pub fn validate_dimension(
    dim: i64,
    field_name: &str,
    is_vector_field: bool,
    limits: &ServiceLimits,
) -> Result<(), ErrorTemplate> {
    if !is_vector_field {
        return Ok(());
    }
    if dim < i64::from(limits.min_dim) {
        return Err(ErrorTemplate::DimensionBelowMin {
            dim,
            min: limits.min_dim,
            max: limits.max_dim,
        });
    }
    if dim > i64::from(limits.max_dim) {
        return Err(ErrorTemplate::DimensionAboveMax {
            dim,
            field: field_name.to_string(),
            min: limits.min_dim,
            max: limits.max_dim,
        });
    }
    Ok(())
}

pub fn validate_schema(
    collection: &str,
    schema: &CollectionSchema,
    limits: &ServiceLimits,
) -> Result<(), ErrorTemplate> {
    if schema.description.is_none() {
        return Err(ErrorTemplate::BadDescriptionType);
    }
    let primaries = schema.fields.iter().filter(|f| f.is_primary).count();
    if primaries > 1 {
        return Err(ErrorTemplate::MultiplePrimaryKeys);
    }
    if primaries == 0 {
        return Err(ErrorTemplate::NoPrimaryKey);
    }
    let mut seen = HashSet::new();
    for field in &schema.fields {
        if !seen.insert(field.name.as_str()) {
            return Err(ErrorTemplate::DuplicateField {
                field: field.name.clone(),
            });
        }
    }
    for field in &schema.fields {
        validate_field(collection, field, limits)?;
    }
    Ok(())
}

/// Per-field rules shared by creation and `add_collection_field`.
pub fn validate_field(
    collection: &str,
    field: &FieldSchema,
    limits: &ServiceLimits,
) -> Result<(), ErrorTemplate> {
    if field.data_type == DataType::VarChar && field.max_length.is_none() {
        return Err(ErrorTemplate::MissingMaxLength {
            field: field.name.clone(),
            collection: collection.to_string(),
        });
    }
    if field.data_type.is_dense_vector() {
        validate_dimension(field.dim.unwrap_or_default(), &field.name, true, limits)?;
    }
    Ok(())
}

/// Checks an index request against the field it targets.
///
/// Returns the parsed index type and, for vector fields, the metric.
pub fn validate_index(
    spec: &IndexSpec,
    field: &FieldSchema,
    limits: &ServiceLimits,
) -> Result<(IndexType, Option<MetricType>), ErrorTemplate> {
    let rejected = || ErrorTemplate::IndexBuildRejected {
        index_type: spec.index_type.clone(),
    };
    let index_type = IndexType::parse(&spec.index_type).ok_or_else(rejected)?;
    if !field.data_type.is_vector() {
        return if index_type.supports(field.data_type) {
            Ok((index_type, None))
        } else {
            Err(rejected())
        };
    }
    let metric = MetricType::parse(&spec.metric_type)
        .filter(|m| m.supports(field.data_type))
        .ok_or_else(|| ErrorTemplate::UnsupportedMetric {
            metric: spec.metric_type.clone(),
        })?;
    if !index_type.supports(field.data_type) {
        return Err(rejected());
    }
    match index_type {
        IndexType::Hnsw => {
            check_param(spec, "M", limits.min_hnsw_m, limits.max_hnsw_m)?;
            check_param(spec, "efConstruction", 1, i64::from(i32::MAX))?;
        }
        IndexType::IvfFlat => check_param(spec, "nlist", 1, 65536)?,
        _ => {}
    }
    Ok((index_type, Some(metric)))
}

/// Integer build parameter within `[min, max]`; absent parameters pass.
fn check_param(spec: &IndexSpec, param: &str, min: i64, max: i64) -> Result<(), ErrorTemplate> {
    let Some(value) = spec.params.get(param) else {
        return Ok(());
    };
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse::<i64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if (min..=max).contains(&v) => Ok(()),
        _ => Err(ErrorTemplate::InvalidIndexParam {
            param: param.to_string(),
            value: crate::schema::stringify(value),
            min,
            max,
        }),
    }
}
