use crate::{
    db::query::{
        predicate::{CaseMode, CompareOp, ComparePredicate, Predicate, validate},
        window::{Cursor, WindowError},
    },
    model::{SchemaRegistry, UniqueKey},
};
use std::collections::BTreeSet;

///
/// UniqueLookup
///
/// A predicate proven to address at most one row: equality on exactly the
/// members of one declared unique key.
///

#[derive(Clone, Debug, PartialEq)]
pub struct UniqueLookup {
    pub entity: String,
    pub key: UniqueKey,
    pub values: Cursor,
}

impl UniqueLookup {
    /// Equivalent filter predicate for the storage collaborator.
    #[must_use]
    pub fn predicate(&self) -> Predicate {
        Predicate::And(
            self.values
                .iter()
                .map(|(field, value)| Predicate::eq(field.clone(), value.clone()))
                .collect(),
        )
    }
}

/// Check that `predicate` is structurally a unique-key lookup on `entity`.
///
/// Uniqueness is decided from the predicate's shape alone, never from data.
pub fn resolve_unique(
    registry: &SchemaRegistry,
    entity: &str,
    predicate: &Predicate,
) -> Result<UniqueLookup, WindowError> {
    validate(registry, entity, predicate)?;
    let descriptor = registry.describe(entity)?;

    let reject = |reason: &str| WindowError::NotAUniquePredicate {
        entity: entity.to_string(),
        reason: reason.to_string(),
    };

    let comparisons = match predicate {
        Predicate::Compare(cmp) => vec![cmp],
        Predicate::And(children) if !children.is_empty() => children
            .iter()
            .map(|child| match child {
                Predicate::Compare(cmp) => Ok(cmp),
                _ => Err(reject("only a flat conjunction of equalities is accepted")),
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => return Err(reject("only a flat conjunction of equalities is accepted")),
    };

    let mut values = Cursor::new();
    for ComparePredicate {
        field,
        op,
        value,
        mode,
    } in comparisons
    {
        if *op != CompareOp::Eq {
            return Err(reject(&format!("'{field}' uses '{op}' instead of equality")));
        }
        if *mode != CaseMode::Default {
            return Err(reject(&format!("'{field}' uses case-insensitive matching")));
        }
        if values.contains_key(field) {
            return Err(reject(&format!("'{field}' is constrained more than once")));
        }
        values = values.with(field.clone(), value.clone());
    }

    let fields = values.keys().map(String::as_str).collect::<BTreeSet<_>>();
    let key = descriptor
        .unique_key_for(&fields)
        .ok_or_else(|| reject(&format!("fields {fields:?} are not a declared unique key")))?
        .clone();

    Ok(UniqueLookup {
        entity: entity.to_string(),
        key,
        values,
    })
}
