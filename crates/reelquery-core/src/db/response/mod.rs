//! Reshaping storage rows into the exact nested shape a request asked for.


use crate::{
    db::{
        query::{
            aggregate::{AggregateRow, AggregateSpec},
            projection::{RelationCountPlan, ResolvedPlan},
        },
        storage::StoredRow,
    },
    value::{Record, Value},
};
use thiserror::Error as ThisError;

///
/// ResponseError
///
/// Storage returned rows that cannot satisfy the resolved plan, or a
/// single-row operation found no row.
///

#[remain::sorted]
#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ResponseError {
    #[error("storage row for '{entity}' is missing field '{field}'")]
    MissingField { entity: String, field: String },

    #[error("storage row for '{entity}' is missing relation '{relation}'")]
    MissingRelation { entity: String, relation: String },

    #[error("expected at most one row for '{entity}', got {count}")]
    MultipleRows { entity: String, count: usize },

    #[error("no '{entity}' row matched")]
    NotFound { entity: String },
}

/// Reshape one stored row to exactly the plan's output keys.
pub fn reshape(plan: &ResolvedPlan, mut row: StoredRow) -> Result<Record, ResponseError> {
    let mut out = Record::new();

    for field in &plan.fields {
        let value = row
            .fields
            .remove(field)
            .ok_or_else(|| ResponseError::MissingField {
                entity: plan.entity.clone(),
                field: field.clone(),
            })?;
        out.insert(field.clone(), value);
    }

    for resolved in &plan.relations {
        let name = &resolved.relation.name;
        let related = row
            .relations
            .remove(name)
            .ok_or_else(|| ResponseError::MissingRelation {
                entity: plan.entity.clone(),
                relation: name.clone(),
            })?;
        let nested = &resolved.fetch.plan;

        let value = if resolved.relation.cardinality.is_to_many() {
            Value::List(
                related
                    .into_iter()
                    .map(|child| reshape(nested, child).map(Value::Record))
                    .collect::<Result<_, _>>()?,
            )
        } else {
            let count = related.len();
            let mut related = related.into_iter();
            match (related.next(), count) {
                (None, _) => Value::Null,
                (Some(child), 1) => Value::Record(reshape(nested, child)?),
                (Some(_), count) => {
                    return Err(ResponseError::MultipleRows {
                        entity: nested.entity.clone(),
                        count,
                    });
                }
            }
        };
        out.insert(name.clone(), value);
    }

    if !plan.counts.is_empty() {
        let mut counts = Record::new();
        for count in &plan.counts {
            let n = row.counts.get(&count.relation).copied().unwrap_or(0);
            counts.insert(
                count.relation.clone(),
                Value::Int(i64::try_from(n).unwrap_or(i64::MAX)),
            );
        }
        out.insert(RelationCountPlan::KEY.to_string(), Value::Record(counts));
    }

    Ok(out)
}

/// Reshape every stored row.
pub fn reshape_many(
    plan: &ResolvedPlan,
    rows: Vec<StoredRow>,
) -> Result<Vec<Record>, ResponseError> {
    rows.into_iter().map(|row| reshape(plan, row)).collect()
}

/// Reshape one aggregate row: group fields at the top level, then one
/// object per aggregate function keyed by target field (`_all` for row counts).
#[must_use]
pub fn reshape_aggregate(aggregates: &[AggregateSpec], row: AggregateRow) -> Record {
    let AggregateRow { group, mut values } = row;
    let mut out = group;

    for spec in aggregates {
        let value = values.remove(spec).unwrap_or(Value::Null);
        let key = spec.function.label().to_string();
        let mut bucket = match out.remove(&key) {
            Some(Value::Record(existing)) => existing,
            _ => Record::new(),
        };
        bucket.insert(spec.output_key().to_string(), value);
        out.insert(key, Value::Record(bucket));
    }

    out
}
