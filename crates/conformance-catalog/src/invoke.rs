use conformance_core::{ConformanceError, MilvusService};
use conformance_eval::Response;

use crate::action::Action;

impl Action {
    /// Issues the real call.
    pub async fn invoke(&self, service: &dyn MilvusService) -> Result<Response, ConformanceError> {
        let response = match self {
            Action::CreateCollection { request } => {
                service.create_collection(request).await?;
                Response::Unit
            }
            Action::DropCollection { name } => {
                service.drop_collection(name).await?;
                Response::Unit
            }
            Action::DescribeCollection { name } => {
                Response::Description(service.describe_collection(name).await?)
            }
            Action::HasCollection { name } => Response::Bool(service.has_collection(name).await?),
            Action::ListCollections => Response::Names(service.list_collections().await?),
            Action::LoadCollection { name } => {
                service.load_collection(name).await?;
                Response::Unit
            }
            Action::ReleaseCollection { name } => {
                service.release_collection(name).await?;
                Response::Unit
            }
            Action::GetLoadState { name } => Response::LoadState(service.get_load_state(name).await?),
            Action::CreatePartition { name, partition } => {
                service.create_partition(name, partition).await?;
                Response::Unit
            }
            Action::LoadPartitions { name, partitions } => {
                service.load_partitions(name, partitions).await?;
                Response::Unit
            }
            Action::ReleasePartitions { name, partitions } => {
                service.release_partitions(name, partitions).await?;
                Response::Unit
            }
            Action::RenameCollection { old_name, new_name } => {
                service.rename_collection(old_name, new_name).await?;
                Response::Unit
            }
            Action::AlterCollectionProperties { name, properties } => {
                service.alter_collection_properties(name, properties).await?;
                Response::Unit
            }
            Action::DropCollectionProperties { name, keys } => {
                service.drop_collection_properties(name, keys).await?;
                Response::Unit
            }
            Action::AddCollectionField { name, field } => {
                service.add_collection_field(name, field).await?;
                Response::Unit
            }
            Action::CreateIndex { name, indexes } => {
                service.create_index(name, indexes).await?;
                Response::Unit
            }
            Action::DropIndex { name, index_name } => {
                service.drop_index(name, index_name).await?;
                Response::Unit
            }
            Action::ListIndexes { name } => Response::Names(service.list_indexes(name).await?),
            Action::DescribeIndex { name, index_name } => {
                Response::Index(service.describe_index(name, index_name).await?)
            }
            Action::CreateAlias { collection, alias } => {
                service.create_alias(collection, alias).await?;
                Response::Unit
            }
            Action::DropAlias { alias } => {
                service.drop_alias(alias).await?;
                Response::Unit
            }
            Action::Insert {
                name,
                partition,
                rows,
            } => Response::Insert(service.insert_into(name, partition.as_deref(), rows).await?),
            Action::Delete { name, selector } => {
                Response::Deleted(service.delete(name, selector).await?)
            }
            Action::Search { name, request } => Response::Search(service.search(name, request).await?),
            Action::Query { name, filter } => Response::Query(service.query(name, filter).await?),
        };
        Ok(response)
    }
}
