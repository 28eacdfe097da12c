use crate::db::query::predicate::{Predicate, RelationPredicate};

///
/// Normalize a predicate into a canonical form.
///
/// Normalization guarantees:
/// - Logical equivalence is preserved
/// - Nested AND / OR nodes are flattened into their parent
/// - Single-child AND / OR nodes are unwrapped
/// - Double negation is eliminated
/// - Relation predicates are normalized in their own scope
///
/// Child order is kept as written; callers may rely on evaluation order
/// being irrelevant to the result, not on any particular order.
///
#[must_use]
pub fn normalize(predicate: &Predicate) -> Predicate {
    match predicate {
        Predicate::And(children) => normalize_group(children, true),
        Predicate::Or(children) => normalize_group(children, false),
        Predicate::Not(inner) => normalize_not(inner),
        Predicate::Relation(rel) => Predicate::Relation(RelationPredicate {
            relation: rel.relation.clone(),
            quantifier: rel.quantifier,
            predicate: Box::new(normalize(&rel.predicate)),
        }),
        Predicate::Compare(_) | Predicate::IsNull { .. } | Predicate::IsEmpty { .. } => {
            predicate.clone()
        }
    }
}

fn normalize_group(children: &[Predicate], conjunction: bool) -> Predicate {
    let mut flat = Vec::with_capacity(children.len());

    for child in children {
        match (normalize(child), conjunction) {
            (Predicate::And(grand), true) | (Predicate::Or(grand), false) => flat.extend(grand),
            (other, _) => flat.push(other),
        }
    }

    // An empty group keeps its identity element (And => true, Or => false).
    if flat.len() == 1 {
        return flat.remove(0);
    }

    if conjunction {
        Predicate::And(flat)
    } else {
        Predicate::Or(flat)
    }
}

fn normalize_not(inner: &Predicate) -> Predicate {
    match normalize(inner) {
        Predicate::Not(double) => *double,
        other => Predicate::Not(Box::new(other)),
    }
}
