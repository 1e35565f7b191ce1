use conformance_core::oracle::{validate_field, validate_index, validate_name, validate_schema};
use conformance_core::{
    CreateCollection, DeleteSelector, ErrorTemplate, Filter, IndexSpec, PrimaryKey, Registry,
    Resource, Row, SearchRequest, ServiceLimits,
};
use conformance_eval::{Expectation, StatePredicate};

use crate::action::Action;

type Prediction = Result<Vec<StatePredicate>, ErrorTemplate>;

impl Action {
    /// Predicts the outcome of this action against the mirrored state.
    ///
    /// Pure: the registry is only read.
    pub fn predict(&self, registry: &Registry, limits: &ServiceLimits) -> Expectation {
        match self.predict_inner(registry, limits) {
            Ok(predicates) => Expectation::success_with(predicates),
            Err(template) => Expectation::failure(template),
        }
    }

    fn predict_inner(&self, registry: &Registry, limits: &ServiceLimits) -> Prediction {
        match self {
            Action::CreateCollection { request } => predict_create(request, registry, limits),
            Action::DropCollection { name } => {
                if name.is_empty() {
                    return Err(ErrorTemplate::IllegalCollectionName { repr: name.clone() });
                }
                validate_name(name, limits)?;
                Ok(vec![StatePredicate::Unit])
            }
            Action::DescribeCollection { name } => {
                validate_name(name, limits)?;
                let resource = registry.get(name).ok_or_else(|| {
                    ErrorTemplate::CannotFindCollection {
                        database: limits.database.clone(),
                        collection: name.clone(),
                    }
                })?;
                Ok(vec![StatePredicate::Describes {
                    expected: resource.describe(),
                }])
            }
            Action::HasCollection { name } => {
                validate_name(name, limits)?;
                Ok(vec![StatePredicate::Bool {
                    value: registry.exists(name),
                }])
            }
            Action::ListCollections => Ok(vec![
                StatePredicate::Contains {
                    names: registry.names(),
                },
                StatePredicate::Excludes {
                    names: registry.dropped_names(),
                },
            ]),
            Action::LoadCollection { name } => {
                let resource = existing(registry, name, limits)?;
                require_indexes(resource, name)?;
                Ok(vec![StatePredicate::Unit])
            }
            Action::ReleaseCollection { name } => {
                existing(registry, name, limits)?;
                Ok(vec![StatePredicate::Unit])
            }
            Action::GetLoadState { name } => {
                let resource = existing(registry, name, limits)?;
                Ok(vec![StatePredicate::LoadState {
                    state: resource.load_state(),
                }])
            }
            Action::CreatePartition { name, .. } => {
                existing(registry, name, limits)?;
                Ok(vec![StatePredicate::Unit])
            }
            Action::LoadPartitions { name, partitions } => {
                let resource = existing(registry, name, limits)?;
                require_partitions(resource, partitions)?;
                require_indexes(resource, name)?;
                Ok(vec![StatePredicate::Unit])
            }
            Action::ReleasePartitions { name, partitions } => {
                let resource = existing(registry, name, limits)?;
                require_partitions(resource, partitions)?;
                Ok(vec![StatePredicate::Unit])
            }
            Action::RenameCollection { old_name, new_name } => {
                validate_name(old_name, limits)?;
                if registry.collection(old_name).is_none() {
                    return Err(not_found(old_name, limits));
                }
                validate_name(new_name, limits)?;
                if old_name == new_name || registry.is_taken(new_name) {
                    return Err(ErrorTemplate::DuplicateCollectionName {
                        database: limits.database.clone(),
                        name: new_name.clone(),
                    });
                }
                Ok(vec![StatePredicate::Unit])
            }
            Action::AlterCollectionProperties { name, properties } => {
                existing(registry, name, limits)?;
                if properties.is_empty() {
                    return Err(ErrorTemplate::IllegalProperties {
                        repr: "{}".to_string(),
                    });
                }
                Ok(vec![StatePredicate::Unit])
            }
            Action::DropCollectionProperties { name, keys } => {
                existing(registry, name, limits)?;
                if keys.is_empty() {
                    return Err(ErrorTemplate::EmptyPropertyMutation);
                }
                Ok(vec![StatePredicate::Unit])
            }
            Action::AddCollectionField { name, field } => {
                let resource = existing(registry, name, limits)?;
                if field.is_primary {
                    return Err(ErrorTemplate::CannotAddPrimary {
                        field: field.name.clone(),
                    });
                }
                if resource.schema.field(&field.name).is_some() {
                    return Err(ErrorTemplate::DuplicateField {
                        field: field.name.clone(),
                    });
                }
                if !field.nullable {
                    return Err(ErrorTemplate::AddedFieldNotNullable {
                        field: field.name.clone(),
                    });
                }
                validate_field(name, field, limits)?;
                Ok(vec![StatePredicate::Unit])
            }
            Action::CreateIndex { name, indexes } => {
                let resource = existing(registry, name, limits)?;
                for spec in indexes {
                    check_index(resource, spec, limits)?;
                }
                Ok(vec![StatePredicate::Unit])
            }
            Action::DropIndex { name, .. } => {
                let resource = existing(registry, name, limits)?;
                if resource.is_queryable() {
                    return Err(ErrorTemplate::DropIndexWhileLoaded);
                }
                Ok(vec![StatePredicate::Unit])
            }
            Action::ListIndexes { name } => {
                let resource = existing(registry, name, limits)?;
                Ok(vec![StatePredicate::Exactly {
                    names: resource.index_names(),
                }])
            }
            Action::DescribeIndex { name, index_name } => {
                let resource = existing(registry, name, limits)?;
                let index = resource.indexes.get(index_name).ok_or_else(|| {
                    ErrorTemplate::IndexNotFound {
                        collection: name.clone(),
                    }
                })?;
                Ok(vec![StatePredicate::DescribesIndex {
                    expected: index.describe(),
                }])
            }
            Action::CreateAlias { collection, alias } => {
                existing(registry, collection, limits)?;
                validate_name(alias, limits)?;
                if registry.is_alias(alias) {
                    return Err(ErrorTemplate::AliasExists {
                        alias: alias.clone(),
                    });
                }
                if registry.collection(alias).is_some() {
                    return Err(ErrorTemplate::DuplicateCollectionName {
                        database: limits.database.clone(),
                        name: alias.clone(),
                    });
                }
                Ok(vec![StatePredicate::Unit])
            }
            Action::DropAlias { alias } => {
                validate_name(alias, limits)?;
                Ok(vec![StatePredicate::Unit])
            }
            Action::Insert {
                name,
                partition,
                rows,
            } => {
                let resource = existing(registry, name, limits)?;
                if let Some(partition) = partition {
                    require_partitions(resource, std::slice::from_ref(partition))?;
                }
                predict_insert(resource, rows)
            }
            Action::Delete { name, selector } => {
                existing(registry, name, limits)?;
                if let DeleteSelector::Filter(expr) = selector {
                    Filter::parse(expr)?;
                }
                Ok(Vec::new())
            }
            Action::Search { name, request } => {
                let resource = existing(registry, name, limits)?;
                require_loaded(resource, name)?;
                Ok(vec![predict_search(resource, request)])
            }
            Action::Query { name, filter } => {
                let resource = existing(registry, name, limits)?;
                require_loaded(resource, name)?;
                let filter = Filter::parse(filter)?;
                let pk_field = resource
                    .primary_field()
                    .map(|f| f.name.clone())
                    .unwrap_or_default();
                let ids = resource
                    .resident_rows()
                    .filter(|(_, row)| filter.matches(row))
                    .map(|(id, _)| id.clone())
                    .collect();
                Ok(vec![StatePredicate::QueryIds { pk_field, ids }])
            }
        }
    }
}

fn not_found(name: &str, limits: &ServiceLimits) -> ErrorTemplate {
    ErrorTemplate::CollectionNotFound {
        database: limits.database.clone(),
        collection: name.to_string(),
    }
}

/// Name grammar first, then existence.
fn existing<'a>(
    registry: &'a Registry,
    name: &str,
    limits: &ServiceLimits,
) -> Result<&'a Resource, ErrorTemplate> {
    validate_name(name, limits)?;
    registry.get(name).ok_or_else(|| not_found(name, limits))
}

fn require_indexes(resource: &Resource, name: &str) -> Result<(), ErrorTemplate> {
    if resource.unindexed_vector_fields().is_empty() {
        Ok(())
    } else {
        Err(ErrorTemplate::IndexNotFound {
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

fn require_loaded(resource: &Resource, name: &str) -> Result<(), ErrorTemplate> {
    if resource.is_queryable() {
        Ok(())
    } else {
        Err(ErrorTemplate::CollectionNotLoaded {
            collection: name.to_string(),
        })
    }
}

fn predict_create(request: &CreateCollection, registry: &Registry, limits: &ServiceLimits) -> Prediction {
    validate_name(&request.name, limits)?;
    let schema = request.resolved_schema();
    validate_schema(&request.name, &schema, limits)?;
    for spec in request.resolved_indexes() {
        let field = schema
            .field(&spec.field_name)
            .ok_or_else(|| ErrorTemplate::IndexBuildRejected {
                index_type: spec.index_type.clone(),
            })?;
        validate_index(&spec, field, limits)?;
    }
    if registry.is_alias(&request.name) {
        return Err(ErrorTemplate::DuplicateCollectionName {
            database: limits.database.clone(),
            name: request.name.clone(),
        });
    }
    if let Some(existing) = registry.collection(&request.name) {
        let same = existing.schema.same_shape(&schema)
            && existing.consistency_level == request.consistency_level;
        if !same {
            return Err(ErrorTemplate::DuplicateDifferentParams {
                collection: request.name.clone(),
            });
        }
    }
    Ok(vec![StatePredicate::Unit])
}

fn check_index(resource: &Resource, spec: &IndexSpec, limits: &ServiceLimits) -> Result<(), ErrorTemplate> {
    let field = resource
        .schema
        .field(&spec.field_name)
        .ok_or_else(|| ErrorTemplate::IndexBuildRejected {
            index_type: spec.index_type.clone(),
        })?;
    validate_index(spec, field, limits).map(|_| ())
}

fn predict_insert(resource: &Resource, rows: &[Row]) -> Prediction {
    let Some(pk) = resource.primary_field() else {
        return Ok(Vec::new());
    };
    let mut ids = Vec::with_capacity(rows.len());
    for row in rows {
        match (row.get(&pk.name), pk.auto_id) {
            (Some(_), true) => {
                return Err(ErrorTemplate::PrimaryKeyOnAutoId {
                    field: pk.name.clone(),
                })
            }
            (None, false) => {
                return Err(ErrorTemplate::MissingPrimaryKey {
                    field: pk.name.clone(),
                })
            }
            (Some(value), false) => ids.extend(PrimaryKey::from_value(value)),
            (None, true) => {}
        }
        for field in resource.schema.fields.iter().filter(|f| f.data_type.is_float_vector()) {
            let (Some(dim), Some(values)) = (field.dim, row.get(&field.name).and_then(|v| v.as_array())) else {
                continue;
            };
            if i64::try_from(values.len()).ok() != Some(dim) {
                return Err(ErrorTemplate::DimensionMismatch {
                    field: field.name.clone(),
                    actual: values.len(),
                    dim: u32::try_from(dim).unwrap_or_default(),
                });
            }
        }
    }
    let mut predicates = vec![StatePredicate::InsertCount { count: rows.len() }];
    if !pk.auto_id {
        predicates.push(StatePredicate::InsertedIds { ids });
    }
    Ok(predicates)
}

fn predict_search(resource: &Resource, request: &SearchRequest) -> StatePredicate {
    let exact = resource
        .anns_field(request)
        .and_then(|field| resource.index_on(field))
        .is_some_and(|index| index.index_type.is_exact());
    let ranked = exact.then(|| {
        resource
            .search(request)
            .into_iter()
            .map(|hits| hits.into_iter().map(|h| h.id).collect::<Vec<_>>())
            .collect()
    });
    StatePredicate::SearchResults {
        nq: request.vectors.len(),
        limit: request.limit,
        alive: resource.resident_rows().map(|(id, _)| id.clone()).collect(),
        ranked,
    }
}
