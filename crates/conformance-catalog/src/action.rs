use std::collections::BTreeMap;

use conformance_core::{
    CreateCollection, DeleteSelector, FieldSchema, IndexSpec, Row, SearchRequest,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One remote operation with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    CreateCollection {
        request: CreateCollection,
    },
    DropCollection {
        name: String,
    },
    DescribeCollection {
        name: String,
    },
    HasCollection {
        name: String,
    },
    ListCollections,
    LoadCollection {
        name: String,
    },
    ReleaseCollection {
        name: String,
    },
    GetLoadState {
        name: String,
    },
    CreatePartition {
        name: String,
        partition: String,
    },
    LoadPartitions {
        name: String,
        partitions: Vec<String>,
    },
    ReleasePartitions {
        name: String,
        partitions: Vec<String>,
    },
    RenameCollection {
        old_name: String,
        new_name: String,
    },
    AlterCollectionProperties {
        name: String,
        properties: BTreeMap<String, Value>,
    },
    DropCollectionProperties {
        name: String,
        keys: Vec<String>,
    },
    AddCollectionField {
        name: String,
        field: FieldSchema,
    },
    CreateIndex {
        name: String,
        indexes: Vec<IndexSpec>,
    },
    DropIndex {
        name: String,
        index_name: String,
    },
    ListIndexes {
        name: String,
    },
    DescribeIndex {
        name: String,
        index_name: String,
    },
    CreateAlias {
        collection: String,
        alias: String,
    },
    DropAlias {
        alias: String,
    },
    Insert {
        name: String,
        /// Target partition; the default partition when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        partition: Option<String>,
        rows: Vec<Row>,
    },
    Delete {
        name: String,
        selector: DeleteSelector,
    },
    Search {
        name: String,
        request: SearchRequest,
    },
    Query {
        name: String,
        filter: String,
    },
}

impl Action {
    pub fn create_collection(request: CreateCollection) -> Self {
        Action::CreateCollection { request }
    }

    pub fn drop_collection(name: impl Into<String>) -> Self {
        Action::DropCollection { name: name.into() }
    }

    pub fn describe_collection(name: impl Into<String>) -> Self {
        Action::DescribeCollection { name: name.into() }
    }

    pub fn has_collection(name: impl Into<String>) -> Self {
        Action::HasCollection { name: name.into() }
    }

    pub fn load_collection(name: impl Into<String>) -> Self {
        Action::LoadCollection { name: name.into() }
    }

    pub fn release_collection(name: impl Into<String>) -> Self {
        Action::ReleaseCollection { name: name.into() }
    }

    pub fn get_load_state(name: impl Into<String>) -> Self {
        Action::GetLoadState { name: name.into() }
    }

    pub fn rename_collection(old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Action::RenameCollection {
            old_name: old_name.into(),
            new_name: new_name.into(),
        }
    }

    pub fn alter_collection_properties(
        name: impl Into<String>,
        properties: impl IntoIterator<Item = (String, Value)>,
    ) -> Self {
        Action::AlterCollectionProperties {
            name: name.into(),
            properties: properties.into_iter().collect(),
        }
    }

    pub fn drop_collection_properties(name: impl Into<String>, keys: Vec<String>) -> Self {
        Action::DropCollectionProperties {
            name: name.into(),
            keys,
        }
    }

    pub fn add_collection_field(name: impl Into<String>, field: FieldSchema) -> Self {
        Action::AddCollectionField {
            name: name.into(),
            field,
        }
    }

    pub fn create_index(name: impl Into<String>, indexes: Vec<IndexSpec>) -> Self {
        Action::CreateIndex {
            name: name.into(),
            indexes,
        }
    }

    pub fn insert(name: impl Into<String>, rows: Vec<Row>) -> Self {
        Action::Insert {
            name: name.into(),
            partition: None,
            rows,
        }
    }

    pub fn insert_into(
        name: impl Into<String>,
        partition: impl Into<String>,
        rows: Vec<Row>,
    ) -> Self {
        Action::Insert {
            name: name.into(),
            partition: Some(partition.into()),
            rows,
        }
    }

    pub fn delete(name: impl Into<String>, selector: DeleteSelector) -> Self {
        Action::Delete {
            name: name.into(),
            selector,
        }
    }

    pub fn search(name: impl Into<String>, request: SearchRequest) -> Self {
        Action::Search {
            name: name.into(),
            request,
        }
    }

    pub fn query(name: impl Into<String>, filter: impl Into<String>) -> Self {
        Action::Query {
            name: name.into(),
            filter: filter.into(),
        }
    }

    /// Operation name as the service calls it.
    pub fn name(&self) -> &'static str {
        match self {
            Action::CreateCollection { .. } => "create_collection",
            Action::DropCollection { .. } => "drop_collection",
            Action::DescribeCollection { .. } => "describe_collection",
            Action::HasCollection { .. } => "has_collection",
            Action::ListCollections => "list_collections",
            Action::LoadCollection { .. } => "load_collection",
            Action::ReleaseCollection { .. } => "release_collection",
            Action::GetLoadState { .. } => "get_load_state",
            Action::CreatePartition { .. } => "create_partition",
            Action::LoadPartitions { .. } => "load_partitions",
            Action::ReleasePartitions { .. } => "release_partitions",
            Action::RenameCollection { .. } => "rename_collection",
            Action::AlterCollectionProperties { .. } => "alter_collection_properties",
            Action::DropCollectionProperties { .. } => "drop_collection_properties",
            Action::AddCollectionField { .. } => "add_collection_field",
            Action::CreateIndex { .. } => "create_index",
            Action::DropIndex { .. } => "drop_index",
            Action::ListIndexes { .. } => "list_indexes",
            Action::DescribeIndex { .. } => "describe_index",
            Action::CreateAlias { .. } => "create_alias",
            Action::DropAlias { .. } => "drop_alias",
            Action::Insert { .. } => "insert",
            Action::Delete { .. } => "delete",
            Action::Search { .. } => "search",
            Action::Query { .. } => "query",
        }
    }

    /// Whether a successful call changes server-side state.
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Action::DescribeCollection { .. }
                | Action::HasCollection { .. }
                | Action::ListCollections
                | Action::GetLoadState { .. }
                | Action::ListIndexes { .. }
                | Action::DescribeIndex { .. }
                | Action::Search { .. }
                | Action::Query { .. }
        )
    }

    /// The collection the action addresses, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            Action::CreateCollection { request } => Some(&request.name),
            Action::ListCollections => None,
            Action::RenameCollection { old_name, .. } => Some(old_name),
            Action::CreateAlias { collection, .. } => Some(collection),
            Action::DropAlias { alias } => Some(alias),
            Action::DropCollection { name }
            | Action::DescribeCollection { name }
            | Action::HasCollection { name }
            | Action::LoadCollection { name }
            | Action::ReleaseCollection { name }
            | Action::GetLoadState { name }
            | Action::CreatePartition { name, .. }
            | Action::LoadPartitions { name, .. }
            | Action::ReleasePartitions { name, .. }
            | Action::AlterCollectionProperties { name, .. }
            | Action::DropCollectionProperties { name, .. }
            | Action::AddCollectionField { name, .. }
            | Action::CreateIndex { name, .. }
            | Action::DropIndex { name, .. }
            | Action::ListIndexes { name }
            | Action::DescribeIndex { name, .. }
            | Action::Insert { name, .. }
            | Action::Delete { name, .. }
            | Action::Search { name, .. }
            | Action::Query { name, .. } => Some(name),
        }
    }

    /// Parameters as JSON, for diagnostics.
    pub fn params_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
