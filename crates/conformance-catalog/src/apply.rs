use conformance_core::{
    DeleteSelector, Filter, IndexState, PrimaryKey, Registry, Resource, ServiceLimits,
};
use conformance_eval::Response;

use crate::action::Action;

impl Action {
    /// Folds a successful call into the mirror.
    ///
    /// Only called when both the prediction and the actual outcome were a
    /// success. The response is consulted where the service chooses values,
    /// such as auto-generated primary keys.
    pub fn apply(&self, registry: &mut Registry, response: &Response, limits: &ServiceLimits) {
        match self {
            Action::CreateCollection { request } => {
                if registry.collection(&request.name).is_none() {
                    registry.insert(Resource::from_request(request, limits));
                }
            }
            Action::DropCollection { name } => registry.mark_dropped(name),
            Action::LoadCollection { name } => {
                if let Some(r) = registry.get_mut(name) {
                    r.set_all_loaded(true);
                }
            }
            Action::ReleaseCollection { name } => {
                if let Some(r) = registry.get_mut(name) {
                    r.set_all_loaded(false);
                }
            }
            Action::CreatePartition { name, partition } => {
                if let Some(r) = registry.get_mut(name) {
                    r.partitions.entry(partition.clone()).or_insert(false);
                }
            }
            Action::LoadPartitions { name, partitions } => {
                if let Some(r) = registry.get_mut(name) {
                    r.set_partitions_loaded(partitions, true);
                }
            }
            Action::ReleasePartitions { name, partitions } => {
                if let Some(r) = registry.get_mut(name) {
                    r.set_partitions_loaded(partitions, false);
                }
            }
            Action::RenameCollection { old_name, new_name } => registry.rename(old_name, new_name),
            Action::AlterCollectionProperties { name, properties } => {
                if let Some(r) = registry.get_mut(name) {
                    r.alter_properties(properties);
                }
            }
            Action::DropCollectionProperties { name, keys } => {
                if let Some(r) = registry.get_mut(name) {
                    r.drop_properties(keys);
                }
            }
            Action::AddCollectionField { name, field } => {
                if let Some(r) = registry.get_mut(name) {
                    r.add_field(field);
                }
            }
            Action::CreateIndex { name, indexes } => {
                if let Some(r) = registry.get_mut(name) {
                    for spec in indexes {
                        r.indexes.retain(|_, i| i.field_name != spec.field_name);
                        r.indexes
                            .insert(spec.name().to_string(), IndexState::from_spec(spec));
                    }
                }
            }
            Action::DropIndex { name, index_name } => {
                if let Some(r) = registry.get_mut(name) {
                    r.indexes.remove(index_name);
                }
            }
            Action::CreateAlias { collection, alias } => registry.add_alias(alias, collection),
            Action::DropAlias { alias } => registry.remove_alias(alias),
            Action::Insert {
                name,
                partition,
                rows,
            } => {
                let Some(r) = registry.get_mut(name) else {
                    return;
                };
                let ids: Vec<PrimaryKey> = match response {
                    Response::Insert(result) if result.ids.len() == rows.len() => result.ids.clone(),
                    _ => {
                        let pk = r.primary_field().map(|f| f.name.clone()).unwrap_or_default();
                        rows.iter()
                            .filter_map(|row| row.get(&pk).and_then(PrimaryKey::from_value))
                            .collect()
                    }
                };
                let partition = partition.as_deref().unwrap_or(limits.default_partition.as_str());
                r.insert_rows(rows, &ids, partition);
            }
            Action::Delete { name, selector } => {
                let Some(r) = registry.get_mut(name) else {
                    return;
                };
                match selector {
                    DeleteSelector::Ids(ids) => {
                        r.delete_ids(ids);
                    }
                    DeleteSelector::Filter(expr) => {
                        if let Ok(filter) = Filter::parse(expr) {
                            r.delete_matching(&filter);
                        }
                    }
                }
            }
            Action::DescribeCollection { .. }
            | Action::HasCollection { .. }
            | Action::ListCollections
            | Action::GetLoadState { .. }
            | Action::ListIndexes { .. }
            | Action::DescribeIndex { .. }
            | Action::Search { .. }
            | Action::Query { .. } => {}
        }
    }
}
