use serde::{Deserialize, Serialize};

use crate::error::{ConformanceError, ErrorKind, SchemaErrorKind};

/// A service error message with its placeholders bound from action parameters.
///
/// Every variant renders to the literal text the service is expected to return,
/// so a rendered template is checked as a substring of the actual message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "template", rename_all = "snake_case")]
pub enum ErrorTemplate {
    NameEmpty { name: String },
    NameTooLong { name: String, max: usize },
    NameFirstChar { name: String },
    NameCharset { name: String },
    IllegalCollectionName { repr: String },
    DimensionBelowMin { dim: i64, min: u32, max: u32 },
    DimensionAboveMax { dim: i64, field: String, min: u32, max: u32 },
    NoPrimaryKey,
    DuplicateField { field: String },
    MultiplePrimaryKeys,
    MissingMaxLength { field: String, collection: String },
    BadDescriptionType,
    DuplicateDifferentParams { collection: String },
    CannotAddPrimary { field: String },
    AddedFieldNotNullable { field: String },
    CollectionNotFound { database: String, collection: String },
    CannotFindCollection { database: String, collection: String },
    PartitionNotFound { partition: String },
    DuplicateCollectionName { database: String, name: String },
    AliasExists { alias: String },
    IndexNotFound { collection: String },
    CollectionNotLoaded { collection: String },
    DropIndexWhileLoaded,
    IllegalProperties { repr: String },
    EmptyPropertyMutation,
    UnsupportedMetric { metric: String },
    IndexBuildRejected { index_type: String },
    InvalidIndexParam { param: String, value: String, min: i64, max: i64 },
    PrimaryKeyOnAutoId { field: String },
    MissingPrimaryKey { field: String },
    DimensionMismatch { field: String, actual: usize, dim: u32 },
    InvalidFilter { expr: String },
}

impl ErrorTemplate {
    pub fn kind(&self) -> ErrorKind {
        use ErrorTemplate::*;
        match self {
            NameEmpty { .. }
            | NameTooLong { .. }
            | NameFirstChar { .. }
            | NameCharset { .. }
            | IllegalCollectionName { .. } => ErrorKind::InvalidName,
            DimensionBelowMin { .. } | DimensionAboveMax { .. } => ErrorKind::InvalidDimension,
            NoPrimaryKey => ErrorKind::SchemaError(SchemaErrorKind::NoPrimaryKey),
            DuplicateField { .. } => ErrorKind::SchemaError(SchemaErrorKind::DuplicateField),
            MultiplePrimaryKeys => ErrorKind::SchemaError(SchemaErrorKind::MultiplePrimaryKeys),
            MissingMaxLength { .. } => ErrorKind::SchemaError(SchemaErrorKind::MissingMaxLength),
            BadDescriptionType => ErrorKind::SchemaError(SchemaErrorKind::BadDescriptionType),
            DuplicateDifferentParams { .. } => ErrorKind::DuplicateDifferentParams,
            CannotAddPrimary { .. } => ErrorKind::CannotAddPrimary,
            CollectionNotFound { .. } | CannotFindCollection { .. } | PartitionNotFound { .. } => {
                ErrorKind::NotFound
            }
            DuplicateCollectionName { .. } | AliasExists { .. } => ErrorKind::DuplicateName,
            IndexNotFound { .. } => ErrorKind::IndexNotFound,
            CollectionNotLoaded { .. } => ErrorKind::NotLoaded,
            IndexBuildRejected { .. } | InvalidIndexParam { .. } => ErrorKind::IndexBuildRejected,
            AddedFieldNotNullable { .. }
            | DropIndexWhileLoaded
            | IllegalProperties { .. }
            | EmptyPropertyMutation
            | UnsupportedMetric { .. }
            | PrimaryKeyOnAutoId { .. }
            | MissingPrimaryKey { .. }
            | DimensionMismatch { .. }
            | InvalidFilter { .. } => ErrorKind::InvalidArgument,
        }
    }

    /// Wire error code the service reports for this message.
    pub fn code(&self) -> i64 {
        use ErrorTemplate::*;
        match self {
            IllegalCollectionName { .. }
            | DuplicateDifferentParams { .. }
            | IllegalProperties { .. }
            | PrimaryKeyOnAutoId { .. }
            | MissingPrimaryKey { .. } => 1,
            CollectionNotFound { .. } | CannotFindCollection { .. } => 100,
            CollectionNotLoaded { .. } => 101,
            PartitionNotFound { .. } => 200,
            IndexNotFound { .. } => 700,
            MultiplePrimaryKeys | IndexBuildRejected { .. } => 999,
            DimensionBelowMin { .. }
            | DimensionAboveMax { .. }
            | MissingMaxLength { .. }
            | DuplicateCollectionName { .. }
            | AliasExists { .. }
            | DropIndexWhileLoaded
            | EmptyPropertyMutation
            | DimensionMismatch { .. } => 65535,
            NameEmpty { .. }
            | NameTooLong { .. }
            | NameFirstChar { .. }
            | NameCharset { .. }
            | NoPrimaryKey
            | DuplicateField { .. }
            | BadDescriptionType
            | CannotAddPrimary { .. }
            | AddedFieldNotNullable { .. }
            | UnsupportedMetric { .. }
            | InvalidIndexParam { .. }
            | InvalidFilter { .. } => 1100,
        }
    }

    pub fn render(&self) -> String {
        use ErrorTemplate::*;
        match self {
            NameEmpty { name } => {
                format!("Invalid collection name: {name}. collection name should not be empty")
            }
            NameTooLong { name, max } => format!(
                "Invalid collection name: {name}. the length of a collection name must be less than {max} characters"
            ),
            NameFirstChar { name } => format!(
                "Invalid collection name: {name}. the first character of a collection name must be an underscore or letter"
            ),
            NameCharset { name } => format!(
                "Invalid collection name: {name}. collection name can only contain numbers, letters and underscores"
            ),
            IllegalCollectionName { repr } => format!("`collection_name` value {repr} is illegal"),
            DimensionBelowMin { dim, min, max } => {
                format!("invalid dimension: {dim}. should be in range {min} ~ {max}")
            }
            DimensionAboveMax {
                dim,
                field,
                min,
                max,
            } => format!(
                "invalid dimension: {dim} of field {field}. float vector dimension should be in range {min} ~ {max}"
            ),
            NoPrimaryKey => "Schema must have a primary key field".to_string(),
            DuplicateField { field } => format!("duplicated field name: {field}"),
            MultiplePrimaryKeys => "Expected only one primary key field".to_string(),
            MissingMaxLength { field, collection } => format!(
                "type param(max_length) should be specified for the field({field}) of collection {collection}"
            ),
            BadDescriptionType => {
                "description [None] has type NoneType, but expected one of: bytes, str".to_string()
            }
            DuplicateDifferentParams { collection } => format!(
                "create duplicate collection with different parameters, collection: {collection}"
            ),
            CannotAddPrimary { field } => {
                format!("not support to add pk field, field name = {field}: invalid parameter")
            }
            AddedFieldNotNullable { field } => format!(
                "added field must be nullable, please check it, field name = {field}: invalid parameter"
            ),
            CollectionNotFound {
                database,
                collection,
            } => format!("collection not found[database={database}][collection={collection}]"),
            CannotFindCollection {
                database,
                collection,
            } => format!("can't find collection[database={database}][collection={collection}]"),
            PartitionNotFound { partition } => {
                format!("partition not found[partition={partition}]")
            }
            DuplicateCollectionName { database, name } => format!(
                "duplicated new collection name {database}:{name} with other collection name or alias"
            ),
            AliasExists { alias } => format!("alias already exist: {alias}"),
            IndexNotFound { collection } => format!("index not found[collection={collection}]"),
            CollectionNotLoaded { collection } => {
                format!("collection not loaded[collection={collection}]")
            }
            DropIndexWhileLoaded => {
                "index cannot be dropped, collection is loaded, please release it first".to_string()
            }
            IllegalProperties { repr } => format!("`properties` value {repr} is illegal"),
            EmptyPropertyMutation => "The collection properties to alter and keys to delete must not be empty at the same time".to_string(),
            UnsupportedMetric { metric } => {
                format!("float vector index does not support metric type: {metric}")
            }
            IndexBuildRejected { index_type } => {
                format!("can't build with this index {index_type}: invalid parameter")
            }
            InvalidIndexParam {
                param,
                value,
                min,
                max,
            } => format!("param '{param}' ({value}) should be in range [{min}, {max}]"),
            PrimaryKeyOnAutoId { field } => format!(
                "attempt to insert an unexpected field `{field}` to collection without enabling dynamic field"
            ),
            MissingPrimaryKey { field } => format!(
                "Insert missed an field `{field}` to collection without set nullable==true or set default_value"
            ),
            DimensionMismatch { field, actual, dim } => format!(
                "the dim ({actual}) of field data({field}) is not equal to schema dim ({dim})"
            ),
            InvalidFilter { expr } => {
                format!("failed to create query plan: cannot parse expression: {expr}")
            }
        }
    }

    /// The error a conforming service returns for this template.
    pub fn to_error(&self) -> ConformanceError {
        ConformanceError::service(self.code(), self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_templates_differ_in_field_name() {
        let below = ErrorTemplate::DimensionBelowMin {
            dim: 1,
            min: 2,
            max: 32768,
        };
        let above = ErrorTemplate::DimensionAboveMax {
            dim: 32769,
            field: "vector".into(),
            min: 2,
            max: 32768,
        };
        assert_eq!(below.render(), "invalid dimension: 1. should be in range 2 ~ 32768");
        assert!(!below.render().contains("of field"));
        assert!(above.render().contains("of field vector"));
        assert_eq!(below.kind(), above.kind());
    }

    #[test]
    fn not_found_renders_database_and_collection() {
        let t = ErrorTemplate::CollectionNotFound {
            database: "default".into(),
            collection: "books".into(),
        };
        assert_eq!(t.code(), 100);
        assert_eq!(
            t.render(),
            "collection not found[database=default][collection=books]"
        );
        assert_eq!(t.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn to_error_carries_code_and_message() {
        let err = ErrorTemplate::IndexNotFound {
            collection: "c1".into(),
        }
        .to_error();
        assert_eq!(err.as_service(), Some((700, "index not found[collection=c1]")));
    }
}
