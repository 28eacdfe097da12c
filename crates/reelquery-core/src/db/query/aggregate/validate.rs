use crate::{
    config::EngineConfig,
    db::query::{
        aggregate::{
            AggregateError, AggregateFunction, AggregateSpec, AggregationPlan,
            AggregationRequest, GroupOrderKey, GroupingPlan, HavingPredicate, HavingTarget,
        },
        order::{Direction, OrderError, OrderSpec, OrderTarget},
        predicate::{CompareOp, Predicate, normalize, validate},
        window::{Window, WindowError, resolve_window},
    },
    model::{EntityDescriptor, ScalarKind, SchemaRegistry},
    value::Value,
};
use std::collections::BTreeSet;

/// Validate an aggregation request into a plan.
///
/// Every check here is static: it depends on the request shape and the
/// schema only, never on data.
pub fn resolve(
    registry: &SchemaRegistry,
    config: &EngineConfig,
    request: &AggregationRequest,
) -> Result<AggregationPlan, AggregateError> {
    let entity = request.entity.as_str();
    let descriptor = registry.describe(entity)?;

    let predicate = match &request.predicate {
        Some(predicate) => {
            validate(registry, entity, predicate)?;
            normalize(predicate)
        }
        None => Predicate::empty(),
    };

    for spec in &request.aggregates {
        check_aggregate(descriptor, spec)?;
    }

    let windowed = request.take.is_some() || request.skip.is_some();
    if windowed && request.order.is_empty() {
        return Err(AggregateError::OrderRequiredForWindow {
            entity: entity.to_string(),
        });
    }

    let (window, grouping) = match &request.group_by {
        None => {
            if request.having.is_some() {
                return Err(AggregateError::HavingRequiresGroupBy {
                    entity: entity.to_string(),
                });
            }
            if request.aggregates.is_empty() {
                return Err(AggregateError::NoAggregates {
                    entity: entity.to_string(),
                });
            }

            let window = resolve_window(
                registry,
                config,
                entity,
                None,
                request.take,
                request.skip,
                &request.order,
            )?;
            (window, None)
        }
        Some(group_by) => {
            let grouping = resolve_grouping(descriptor, config, request, group_by)?;
            (Window::default(), Some(grouping))
        }
    };

    Ok(AggregationPlan {
        entity: entity.to_string(),
        predicate,
        aggregates: request.aggregates.clone(),
        window,
        grouping,
    })
}

/// Resolve a `groupBy` request; group fields are mandatory.
pub fn resolve_grouped(
    registry: &SchemaRegistry,
    config: &EngineConfig,
    request: &AggregationRequest,
) -> Result<AggregationPlan, AggregateError> {
    if request.group_by.is_none() {
        return Err(AggregateError::EmptyGroupBy {
            entity: request.entity.clone(),
        });
    }

    resolve(registry, config, request)
}

/// Resolve an `aggregate` request; group fields are rejected.
pub fn resolve_ungrouped(
    registry: &SchemaRegistry,
    config: &EngineConfig,
    request: &AggregationRequest,
) -> Result<AggregationPlan, AggregateError> {
    if request.group_by.is_some() {
        return Err(AggregateError::UnexpectedGroupBy {
            entity: request.entity.clone(),
        });
    }

    resolve(registry, config, request)
}

fn resolve_grouping(
    descriptor: &EntityDescriptor,
    config: &EngineConfig,
    request: &AggregationRequest,
    group_by: &[String],
) -> Result<GroupingPlan, AggregateError> {
    if group_by.is_empty() {
        return Err(AggregateError::EmptyGroupBy {
            entity: descriptor.name.clone(),
        });
    }

    let mut fields = Vec::with_capacity(group_by.len());
    for field in group_by {
        let declared = descriptor
            .field(field)
            .ok_or_else(|| invalid_field(descriptor, field))?;
        if !declared.kind.is_sortable() {
            return Err(AggregateError::UngroupableField {
                entity: descriptor.name.clone(),
                field: field.clone(),
            });
        }
        if fields.contains(field) {
            return Err(AggregateError::DuplicateGroupField {
                entity: descriptor.name.clone(),
                field: field.clone(),
            });
        }
        fields.push(field.clone());
    }

    if let Some(having) = &request.having {
        check_having(descriptor, &fields, having)?;
    }

    let order = resolve_group_order(descriptor, &fields, &request.order)?;

    if let (Some(take), Some(limit)) = (request.take, config.max_take)
        && take.unsigned_abs() > limit
    {
        return Err(WindowError::TakeExceedsLimit {
            take: take.unsigned_abs(),
            limit,
        }
        .into());
    }

    Ok(GroupingPlan {
        fields,
        having: request.having.clone(),
        order,
        take: request.take,
        skip: request.skip.unwrap_or(0),
    })
}

fn check_aggregate(
    descriptor: &EntityDescriptor,
    spec: &AggregateSpec,
) -> Result<(), AggregateError> {
    let Some(field) = &spec.field else {
        return match spec.function {
            AggregateFunction::Count => Ok(()),
            function => Err(AggregateError::MissingAggregateField { function }),
        };
    };

    let declared = descriptor
        .field(field)
        .ok_or_else(|| invalid_field(descriptor, field))?;
    let legal = match spec.function {
        AggregateFunction::Count => true,
        AggregateFunction::Avg | AggregateFunction::Sum => declared.kind.is_numeric(),
        AggregateFunction::Min | AggregateFunction::Max => declared.kind.supports_range(),
    };
    if !legal {
        return Err(AggregateError::InvalidAggregateType {
            entity: descriptor.name.clone(),
            field: field.clone(),
            function: spec.function,
            kind: declared.kind.to_string(),
        });
    }

    Ok(())
}

// Having may read group fields and aggregate results only.
fn check_having(
    descriptor: &EntityDescriptor,
    group_fields: &[String],
    having: &HavingPredicate,
) -> Result<(), AggregateError> {
    match having {
        HavingPredicate::And(children) | HavingPredicate::Or(children) => {
            for child in children {
                check_having(descriptor, group_fields, child)?;
            }
            Ok(())
        }
        HavingPredicate::Not(inner) => check_having(descriptor, group_fields, inner),
        HavingPredicate::Compare { target, op, value } => {
            if !matches!(
                op,
                CompareOp::Eq
                    | CompareOp::Ne
                    | CompareOp::Lt
                    | CompareOp::Lte
                    | CompareOp::Gt
                    | CompareOp::Gte
                    | CompareOp::In
                    | CompareOp::NotIn
            ) {
                return Err(AggregateError::InvalidHavingOperator { op: *op });
            }

            let result_kind = match target {
                HavingTarget::Field(field) => {
                    if !group_fields.contains(field) {
                        return Err(AggregateError::HavingFieldNotInGroupBy {
                            entity: descriptor.name.clone(),
                            field: field.clone(),
                        });
                    }
                    descriptor
                        .field(field)
                        .map(|f| f.kind.clone())
                        .ok_or_else(|| invalid_field(descriptor, field))?
                }
                HavingTarget::Aggregate(spec) => {
                    check_aggregate(descriptor, spec)?;
                    aggregate_result_kind(descriptor, spec)
                }
            };

            check_having_value(target, *op, value, &result_kind)
        }
    }
}

// Kind of the value an aggregate produces, used to type-check literals.
fn aggregate_result_kind(descriptor: &EntityDescriptor, spec: &AggregateSpec) -> ScalarKind {
    let field_kind = spec
        .field
        .as_deref()
        .and_then(|f| descriptor.field(f))
        .map(|f| f.kind.clone());

    match spec.function {
        AggregateFunction::Count => ScalarKind::Int,
        AggregateFunction::Avg => ScalarKind::Float,
        AggregateFunction::Sum | AggregateFunction::Min | AggregateFunction::Max => {
            field_kind.unwrap_or(ScalarKind::Int)
        }
    }
}

fn check_having_value(
    target: &HavingTarget,
    op: CompareOp,
    value: &Value,
    kind: &ScalarKind,
) -> Result<(), AggregateError> {
    let invalid = |reason: String| AggregateError::InvalidHavingValue {
        target: target.to_string(),
        reason,
    };
    // Sums of integer fields may overflow into floats.
    let accepts = |v: &Value| kind.matches_literal(v) || (kind.is_numeric() && v.is_numeric());

    if op.is_range() && !kind.supports_range() {
        return Err(invalid(format!("'{op}' is not supported on {kind}")));
    }
    if op.is_membership() {
        let Some(items) = value.as_list() else {
            return Err(invalid(format!("'{op}' requires a list literal")));
        };
        if let Some(item) = items.iter().find(|item| !accepts(item)) {
            return Err(invalid(format!("{} literal is not a valid {kind}", item.kind_label())));
        }
        return Ok(());
    }
    if !accepts(value) {
        return Err(invalid(format!("{} literal is not a valid {kind}", value.kind_label())));
    }

    Ok(())
}

// Grouped order keys may read group fields and aggregates; all group fields
// are appended as a tie-break.
fn resolve_group_order(
    descriptor: &EntityDescriptor,
    group_fields: &[String],
    spec: &OrderSpec,
) -> Result<Vec<GroupOrderKey>, AggregateError> {
    let mut seen = BTreeSet::new();
    let mut keys = Vec::with_capacity(spec.len() + group_fields.len());

    for entry in spec {
        let label = entry.target.to_string();
        if !seen.insert(label.clone()) {
            return Err(OrderError::DuplicateTarget { target: label }.into());
        }

        let (target, nullable) = match &entry.target {
            OrderTarget::Field(field) => {
                if !group_fields.contains(field) {
                    return Err(AggregateError::OrderFieldNotInGroupBy {
                        entity: descriptor.name.clone(),
                        field: field.clone(),
                    });
                }
                let nullable = descriptor.field(field).is_some_and(|f| f.nullable);
                (HavingTarget::Field(field.clone()), nullable)
            }
            OrderTarget::Aggregate(spec) => {
                check_aggregate(descriptor, spec)?;
                (
                    HavingTarget::Aggregate(spec.clone()),
                    spec.function != AggregateFunction::Count,
                )
            }
            OrderTarget::Path { .. } | OrderTarget::RelationCount(_) => {
                return Err(AggregateError::UnsupportedGroupOrder { target: label });
            }
        };

        if entry.nulls.is_some() && !nullable {
            return Err(OrderError::NullsOnNonNullable { target: label }.into());
        }

        keys.push(GroupOrderKey {
            target,
            direction: entry.direction,
            nulls: entry
                .nulls
                .unwrap_or_else(|| entry.direction.default_nulls()),
        });
    }

    for field in group_fields {
        let present = keys
            .iter()
            .any(|k| matches!(&k.target, HavingTarget::Field(f) if f == field));
        if !present {
            keys.push(GroupOrderKey {
                target: HavingTarget::Field(field.clone()),
                direction: Direction::Asc,
                nulls: Direction::Asc.default_nulls(),
            });
        }
    }

    Ok(keys)
}

fn invalid_field(descriptor: &EntityDescriptor, field: &str) -> AggregateError {
    AggregateError::InvalidField {
        entity: descriptor.name.clone(),
        field: field.to_string(),
    }
}
