use crate::{
    db::query::predicate::{CompareOp, ComparePredicate, Predicate, Quantifier},
    value::{Record, TextMode, Value, compare_eq, compare_order},
};
use std::cmp::Ordering;

///
/// Row
///
/// Abstraction over a row that can expose scalar fields by name and walk
/// its relations. This decouples evaluation from any concrete store.
///

pub trait Row: Sized {
    /// Scalar field value; `None` when the row has no such field.
    fn field(&self, name: &str) -> Option<&Value>;

    /// Rows reachable through `relation`, scoped to this row only.
    fn related(&self, relation: &str) -> Vec<Self>;
}

// Join rows and detached records have fields but no relations.
impl Row for &Record {
    fn field(&self, name: &str) -> Option<&Value> {
        self.value(name)
    }

    fn related(&self, _relation: &str) -> Vec<Self> {
        Vec::new()
    }
}

///
/// Evaluate a predicate against a single row.
///
/// This is pure runtime evaluation: no schema access and no validation.
/// Comparisons against a missing or null field never match.
/// CONTRACT: predicates must be validated before evaluation.
///
#[must_use]
pub fn eval<R: Row>(row: &R, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::And(children) => children.iter().all(|child| eval(row, child)),
        Predicate::Or(children) => children.iter().any(|child| eval(row, child)),
        Predicate::Not(inner) => !eval(row, inner),

        Predicate::Compare(cmp) => eval_compare(row, cmp),

        Predicate::IsNull { field } => matches!(row.field(field), Some(Value::Null)),
        Predicate::IsEmpty { field } => {
            matches!(row.field(field), Some(Value::List(items)) if items.is_empty())
        }

        Predicate::Relation(rel) => {
            let related = row.related(&rel.relation);
            let mut matching = related.iter().map(|child| eval(child, &rel.predicate));

            match rel.quantifier {
                // every/none are vacuously true over zero rows; some is false.
                Quantifier::Every => matching.all(|m| m),
                Quantifier::Some => matching.any(|m| m),
                Quantifier::None | Quantifier::IsNot => !matching.any(|m| m),
                Quantifier::Is => matching.next().unwrap_or(false),
            }
        }
    }
}

fn eval_compare<R: Row>(row: &R, cmp: &ComparePredicate) -> bool {
    let Some(actual) = row.field(&cmp.field) else {
        return false;
    };
    if actual.is_null() {
        return false;
    }

    let mode = cmp.mode.text_mode();
    let value = &cmp.value;

    match cmp.op {
        CompareOp::Eq => compare_eq(actual, value, mode).unwrap_or(false),
        CompareOp::Ne => compare_eq(actual, value, mode).is_some_and(|eq| !eq),

        CompareOp::Lt => compare_order(actual, value, mode).is_some_and(Ordering::is_lt),
        CompareOp::Lte => compare_order(actual, value, mode).is_some_and(Ordering::is_le),
        CompareOp::Gt => compare_order(actual, value, mode).is_some_and(Ordering::is_gt),
        CompareOp::Gte => compare_order(actual, value, mode).is_some_and(Ordering::is_ge),

        CompareOp::In => in_list(actual, value, mode),
        CompareOp::NotIn => value.as_list().is_some() && !in_list(actual, value, mode),

        CompareOp::Contains => text_match(actual, value, mode, |a, b| a.contains(b)),
        CompareOp::StartsWith => text_match(actual, value, mode, |a, b| a.starts_with(b)),
        CompareOp::EndsWith => text_match(actual, value, mode, |a, b| a.ends_with(b)),

        CompareOp::Has => list_has(actual, value, mode),
        CompareOp::HasEvery => value
            .as_list()
            .is_some_and(|wanted| wanted.iter().all(|w| list_has(actual, w, mode))),
        CompareOp::HasSome => value
            .as_list()
            .is_some_and(|wanted| wanted.iter().any(|w| list_has(actual, w, mode))),
    }
}

fn in_list(actual: &Value, list: &Value, mode: TextMode) -> bool {
    list.as_list().is_some_and(|items| {
        items
            .iter()
            .any(|item| compare_eq(actual, item, mode).unwrap_or(false))
    })
}

fn list_has(actual: &Value, needle: &Value, mode: TextMode) -> bool {
    actual.as_list().is_some_and(|items| {
        items
            .iter()
            .any(|item| compare_eq(item, needle, mode).unwrap_or(false))
    })
}

fn text_match(
    actual: &Value,
    needle: &Value,
    mode: TextMode,
    op: impl Fn(&str, &str) -> bool,
) -> bool {
    let (Value::Text(actual), Value::Text(needle)) = (actual, needle) else {
        return false;
    };

    match mode {
        TextMode::Cs => op(actual, needle),
        TextMode::Ci => op(&actual.to_lowercase(), &needle.to_lowercase()),
    }
}
