use crate::{
    db::query::{
        aggregate::{
            AggregateFunction, AggregateRow, AggregateSpec, AggregationPlan, GroupOrderKey,
            GroupingPlan, HavingPredicate, HavingTarget,
        },
        order::compare_keyed,
        predicate::{CompareOp, Row, eval},
    },
    value::{Record, TextMode, Value, compare_eq, compare_order},
};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
};

impl AggregationPlan {
    /// Reference reduction of candidate rows into aggregate results.
    ///
    /// Rows are filtered by the plan's predicate here; callers pass every
    /// row of the entity (or any superset of the matching rows).
    #[must_use]
    pub fn evaluate<R: Row>(&self, rows: Vec<R>) -> Vec<AggregateRow> {
        let rows = rows
            .into_iter()
            .filter(|row| eval(row, &self.predicate))
            .collect::<Vec<_>>();

        match &self.grouping {
            None => {
                let rows = self.window.apply(rows);
                vec![AggregateRow {
                    group: Record::new(),
                    values: reduce_all(&self.aggregates, &rows),
                }]
            }
            Some(grouping) => evaluate_grouped(&self.aggregates, grouping, rows),
        }
    }
}

fn evaluate_grouped<R: Row>(
    aggregates: &[AggregateSpec],
    grouping: &GroupingPlan,
    rows: Vec<R>,
) -> Vec<AggregateRow> {
    // Group keys compare with null equal to null.
    let mut groups: Vec<(Vec<Value>, Vec<R>)> = Vec::new();
    for row in rows {
        let key = grouping
            .fields
            .iter()
            .map(|f| row.field(f).cloned().unwrap_or(Value::Null))
            .collect::<Vec<_>>();
        match groups.iter_mut().find(|(k, _)| same_key(k, &key)) {
            Some((_, members)) => members.push(row),
            None => groups.push((key, vec![row])),
        }
    }

    // Having and order may read aggregates the caller did not ask for.
    let mut needed = aggregates.iter().cloned().collect::<BTreeSet<_>>();
    if let Some(having) = &grouping.having {
        collect_having_aggregates(having, &mut needed);
    }
    for key in &grouping.order {
        if let HavingTarget::Aggregate(spec) = &key.target {
            needed.insert(spec.clone());
        }
    }
    let needed = needed.into_iter().collect::<Vec<_>>();

    let mut reduced = groups
        .into_iter()
        .map(|(key, members)| {
            let group = grouping.fields.iter().cloned().zip(key).collect::<Record>();
            let values = reduce_all(&needed, &members);
            AggregateRow { group, values }
        })
        .filter(|row| {
            grouping
                .having
                .as_ref()
                .is_none_or(|having| eval_having(having, row))
        })
        .collect::<Vec<_>>();

    reduced.sort_by(|a, b| compare_groups(&grouping.order, a, b));
    let mut reduced = slice_groups(reduced, grouping.take, grouping.skip);

    for row in &mut reduced {
        row.values.retain(|spec, _| aggregates.contains(spec));
    }

    reduced
}

fn same_key(lhs: &[Value], rhs: &[Value]) -> bool {
    lhs.iter().zip(rhs).all(|(a, b)| match (a, b) {
        (Value::Null, Value::Null) => true,
        _ => compare_eq(a, b, TextMode::Cs) == Some(true),
    })
}

fn collect_having_aggregates(having: &HavingPredicate, out: &mut BTreeSet<AggregateSpec>) {
    match having {
        HavingPredicate::And(children) | HavingPredicate::Or(children) => {
            for child in children {
                collect_having_aggregates(child, out);
            }
        }
        HavingPredicate::Not(inner) => collect_having_aggregates(inner, out),
        HavingPredicate::Compare { target, .. } => {
            if let HavingTarget::Aggregate(spec) = target {
                out.insert(spec.clone());
            }
        }
    }
}

fn target_value<'a>(target: &HavingTarget, row: &'a AggregateRow) -> Option<&'a Value> {
    match target {
        HavingTarget::Field(field) => row.group.value(field),
        HavingTarget::Aggregate(spec) => row.values.get(spec),
    }
}

fn eval_having(having: &HavingPredicate, row: &AggregateRow) -> bool {
    match having {
        HavingPredicate::And(children) => children.iter().all(|c| eval_having(c, row)),
        HavingPredicate::Or(children) => children.iter().any(|c| eval_having(c, row)),
        HavingPredicate::Not(inner) => !eval_having(inner, row),
        HavingPredicate::Compare { target, op, value } => {
            let Some(actual) = target_value(target, row).filter(|v| !v.is_null()) else {
                return false;
            };
            let mode = TextMode::Cs;
            let in_list = || {
                value.as_list().is_some_and(|items| {
                    items
                        .iter()
                        .any(|item| compare_eq(actual, item, mode) == Some(true))
                })
            };

            match op {
                CompareOp::Eq => compare_eq(actual, value, mode) == Some(true),
                CompareOp::Ne => compare_eq(actual, value, mode) == Some(false),
                CompareOp::Lt => compare_order(actual, value, mode).is_some_and(Ordering::is_lt),
                CompareOp::Lte => compare_order(actual, value, mode).is_some_and(Ordering::is_le),
                CompareOp::Gt => compare_order(actual, value, mode).is_some_and(Ordering::is_gt),
                CompareOp::Gte => compare_order(actual, value, mode).is_some_and(Ordering::is_ge),
                CompareOp::In => in_list(),
                CompareOp::NotIn => value.as_list().is_some() && !in_list(),
                _ => false,
            }
        }
    }
}

fn compare_groups(order: &[GroupOrderKey], a: &AggregateRow, b: &AggregateRow) -> Ordering {
    for key in order {
        let lhs = target_value(&key.target, a).unwrap_or(&Value::Null);
        let rhs = target_value(&key.target, b).unwrap_or(&Value::Null);
        let ord = compare_keyed(lhs, rhs, key.direction, key.nulls);
        if ord.is_ne() {
            return ord;
        }
    }

    Ordering::Equal
}

fn slice_groups(mut rows: Vec<AggregateRow>, take: Option<i64>, skip: u64) -> Vec<AggregateRow> {
    let skip = usize::try_from(skip).unwrap_or(usize::MAX);
    let limit = take.map(|n| usize::try_from(n.unsigned_abs()).unwrap_or(usize::MAX));

    if matches!(take, Some(n) if n < 0) {
        let end = rows.len().saturating_sub(skip);
        let start = limit.map_or(0, |n| end.saturating_sub(n));
        rows.truncate(end);
        rows.drain(..start);
    } else {
        rows.drain(..skip.min(rows.len()));
        if let Some(n) = limit {
            rows.truncate(n);
        }
    }

    rows
}

//
// Accumulators
//

fn reduce_all<R: Row>(specs: &[AggregateSpec], rows: &[R]) -> BTreeMap<AggregateSpec, Value> {
    specs
        .iter()
        .map(|spec| (spec.clone(), reduce(spec, rows)))
        .collect()
}

/// Reduce one aggregate. Empty input yields `Null` except for counts.
fn reduce<R: Row>(spec: &AggregateSpec, rows: &[R]) -> Value {
    let Some(field) = &spec.field else {
        return count_value(rows.len());
    };
    let values = rows
        .iter()
        .filter_map(|row| row.field(field))
        .filter(|value| !value.is_null())
        .collect::<Vec<_>>();

    match spec.function {
        AggregateFunction::Count => count_value(values.len()),
        AggregateFunction::Sum => sum(&values),
        AggregateFunction::Avg => avg(&values),
        AggregateFunction::Min => extreme(&values, Ordering::Less),
        AggregateFunction::Max => extreme(&values, Ordering::Greater),
    }
}

fn count_value(n: usize) -> Value {
    Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
}

fn sum(values: &[&Value]) -> Value {
    if values.is_empty() {
        return Value::Null;
    }

    let ints = values
        .iter()
        .map(|v| match v {
            Value::Int(n) => Some(*n),
            _ => None,
        })
        .try_fold(0i64, |acc, n| acc.checked_add(n?));

    match ints {
        Some(total) => Value::Int(total),
        None => Value::Float(values.iter().filter_map(|v| v.as_f64()).sum()),
    }
}

#[expect(clippy::cast_precision_loss)]
fn avg(values: &[&Value]) -> Value {
    if values.is_empty() {
        return Value::Null;
    }

    let total = values.iter().filter_map(|v| v.as_f64()).sum::<f64>();
    Value::Float(total / values.len() as f64)
}

fn extreme(values: &[&Value], keep: Ordering) -> Value {
    let mut best: Option<&Value> = None;
    for &value in values {
        best = match best {
            Some(current) if compare_order(value, current, TextMode::Cs) != Some(keep) => {
                Some(current)
            }
            _ => Some(value),
        };
    }

    best.cloned().unwrap_or(Value::Null)
}
