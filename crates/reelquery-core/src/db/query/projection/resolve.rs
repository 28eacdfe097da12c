use crate::{
    config::EngineConfig,
    db::query::{
        predicate::{Predicate, normalize, validate, validate_join},
        projection::{
            FetchSpec, ProjectionError, ProjectionSpec, RelationCountPlan, ResolvedFetch,
            ResolvedPlan, ResolvedRelation,
        },
        window::{Window, resolve_window},
    },
    model::{EntityDescriptor, SchemaRegistry},
};

/// Resolve a root fetch: row filter, window and output shape.
pub fn resolve_fetch(
    registry: &SchemaRegistry,
    config: &EngineConfig,
    entity: &str,
    fetch: &FetchSpec,
) -> Result<ResolvedFetch, ProjectionError> {
    if fetch.join_predicate.is_some() {
        return Err(ProjectionError::JoinPredicateAtRoot {
            entity: entity.to_string(),
        });
    }

    resolve_scoped_fetch(registry, config, entity, fetch, 0)
}

/// Resolve an output shape for `entity`.
pub fn resolve(
    registry: &SchemaRegistry,
    config: &EngineConfig,
    entity: &str,
    projection: &ProjectionSpec,
) -> Result<ResolvedPlan, ProjectionError> {
    resolve_at(registry, config, entity, projection, 0)
}

fn resolve_scoped_fetch(
    registry: &SchemaRegistry,
    config: &EngineConfig,
    entity: &str,
    fetch: &FetchSpec,
    depth: usize,
) -> Result<ResolvedFetch, ProjectionError> {
    let predicate = resolve_predicate(registry, entity, fetch.predicate.as_ref())?;
    let window = resolve_window(
        registry,
        config,
        entity,
        fetch.cursor.as_ref(),
        fetch.take,
        fetch.skip,
        &fetch.order,
    )?;
    let plan = resolve_at(registry, config, entity, &fetch.projection, depth)?;

    Ok(ResolvedFetch {
        plan,
        predicate,
        join_predicate: None,
        window,
    })
}

fn resolve_predicate(
    registry: &SchemaRegistry,
    entity: &str,
    predicate: Option<&Predicate>,
) -> Result<Predicate, ProjectionError> {
    match predicate {
        Some(predicate) => {
            validate(registry, entity, predicate)?;
            Ok(normalize(predicate))
        }
        None => Ok(Predicate::empty()),
    }
}

fn resolve_at(
    registry: &SchemaRegistry,
    config: &EngineConfig,
    entity: &str,
    projection: &ProjectionSpec,
    depth: usize,
) -> Result<ResolvedPlan, ProjectionError> {
    let descriptor = registry.describe(entity)?;
    let fields = resolve_fields(descriptor, projection)?;

    let mut relations = Vec::with_capacity(projection.relations.len());
    for (name, fetch) in &projection.relations {
        relations.push(resolve_relation(registry, config, descriptor, name, fetch, depth)?);
    }

    let mut counts = Vec::with_capacity(projection.counts.len());
    for (name, predicate) in &projection.counts {
        let relation = registry.resolve_relation(entity, name)?;
        if relation.cardinality.is_to_one() {
            return Err(ProjectionError::CountOnToOneRelation {
                entity: entity.to_string(),
                relation: name.clone(),
            });
        }
        registry.inverse_of(entity, name)?;

        counts.push(RelationCountPlan {
            relation: name.clone(),
            predicate: resolve_predicate(registry, &relation.target, predicate.as_ref())?,
        });
    }

    if fields.is_empty() && relations.is_empty() && counts.is_empty() {
        return Err(ProjectionError::EmptySelection {
            entity: entity.to_string(),
        });
    }

    Ok(ResolvedPlan {
        entity: entity.to_string(),
        fields,
        relations,
        counts,
    })
}

// Scalar output fields in declaration order.
fn resolve_fields(
    descriptor: &EntityDescriptor,
    projection: &ProjectionSpec,
) -> Result<Vec<String>, ProjectionError> {
    let named = match (&projection.select, &projection.omit) {
        (Some(_), Some(_)) => {
            return Err(ProjectionError::AmbiguousSelection {
                entity: descriptor.name.clone(),
            });
        }
        (Some(names), None) | (None, Some(names)) => Some(names),
        (None, None) => None,
    };

    if let Some(names) = named
        && let Some(unknown) = names.iter().find(|name| descriptor.field(name).is_none())
    {
        return Err(ProjectionError::InvalidField {
            entity: descriptor.name.clone(),
            field: unknown.clone(),
        });
    }

    let keep = |name: &String| match (&projection.select, &projection.omit) {
        (Some(select), _) => select.contains(name),
        (_, Some(omit)) => !omit.contains(name),
        (None, None) => true,
    };

    Ok(descriptor
        .fields
        .iter()
        .map(|f| &f.name)
        .filter(|&name| keep(name))
        .cloned()
        .collect())
}

fn resolve_relation(
    registry: &SchemaRegistry,
    config: &EngineConfig,
    descriptor: &EntityDescriptor,
    name: &str,
    fetch: &FetchSpec,
    depth: usize,
) -> Result<ResolvedRelation, ProjectionError> {
    let relation = registry.resolve_relation(&descriptor.name, name)?;

    // CONTRACT: never traverse a relation whose inverse cannot be resolved.
    registry.inverse_of(&descriptor.name, name)?;

    let nested_depth = depth + 1;
    if nested_depth > config.max_relation_depth {
        return Err(ProjectionError::DepthExceeded {
            entity: descriptor.name.clone(),
            relation: name.to_string(),
            limit: config.max_relation_depth,
        });
    }

    if relation.cardinality.is_to_one() && fetch.has_row_arguments() {
        return Err(ProjectionError::ToOneRelationArguments {
            entity: descriptor.name.clone(),
            relation: name.to_string(),
        });
    }

    let join_predicate = match &fetch.join_predicate {
        None => None,
        Some(_) if !relation.is_join_table() => {
            return Err(ProjectionError::JoinPredicateWithoutJoinTable {
                entity: descriptor.name.clone(),
                relation: name.to_string(),
            });
        }
        Some(predicate) => {
            validate_join(registry, relation, predicate)?;
            Some(normalize(predicate))
        }
    };

    let fetch = if relation.cardinality.is_to_one() {
        ResolvedFetch {
            plan: resolve_at(
                registry,
                config,
                &relation.target,
                &fetch.projection,
                nested_depth,
            )?,
            predicate: Predicate::empty(),
            join_predicate: None,
            window: Window::default(),
        }
    } else {
        ResolvedFetch {
            join_predicate,
            ..resolve_scoped_fetch(registry, config, &relation.target, fetch, nested_depth)?
        }
    };

    Ok(ResolvedRelation {
        relation: relation.clone(),
        fetch,
    })
}
