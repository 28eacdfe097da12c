use crate::model::{
    entity::EntityDescriptor,
    relation::{Cardinality, Ownership, RelationDescriptor},
};
use std::collections::{BTreeMap, BTreeSet};

// Record one validation issue.
macro_rules! err {
    ($issues:expr, $($arg:tt)*) => {
        $issues.push(format!($($arg)*))
    };
}

/// Validate a full set of entity descriptors, collecting every issue.
pub(super) fn validate_entities(entities: &[EntityDescriptor]) -> Vec<String> {
    let mut issues = Vec::new();

    // Phase 1: names must be unique before anything can be resolved.
    let mut by_name = BTreeMap::new();
    for entity in entities {
        if by_name.insert(entity.name.as_str(), entity).is_some() {
            err!(
                issues,
                "entity '{}' is declared more than once",
                entity.name,
            );
        }
    }

    // Phase 2: entity-local shape.
    for entity in entities {
        validate_entity_shape(entity, &mut issues);
    }

    // Phase 3: relations, which need the whole name map.
    for entity in entities {
        for relation in &entity.relations {
            validate_relation(&by_name, entity, relation, &mut issues);
        }
        validate_inverse_claims(entity, &mut issues);
    }

    issues
}

fn validate_entity_shape(entity: &EntityDescriptor, issues: &mut Vec<String>) {
    let mut names = BTreeSet::new();
    for field in &entity.fields {
        if !names.insert(field.name.as_str()) {
            err!(
                issues,
                "entity '{}': field '{}' is declared more than once",
                entity.name,
                field.name,
            );
        }
    }
    for relation in &entity.relations {
        if !names.insert(relation.name.as_str()) {
            err!(
                issues,
                "entity '{}': relation '{}' collides with another field or relation",
                entity.name,
                relation.name,
            );
        }
    }

    if entity.unique_keys.is_empty() {
        err!(issues, "entity '{}' declares no unique key", entity.name);
    }

    let mut seen_keys = BTreeSet::new();
    for key in &entity.unique_keys {
        if key.is_empty() {
            err!(
                issues,
                "entity '{}' declares an empty unique key",
                entity.name,
            );
            continue;
        }

        let members = key.iter().map(String::as_str).collect::<BTreeSet<_>>();
        if members.len() != key.len() {
            err!(
                issues,
                "entity '{}': unique key {:?} repeats a field",
                entity.name,
                key.fields(),
            );
        }
        if !seen_keys.insert(members.clone()) {
            err!(
                issues,
                "entity '{}': unique key {:?} is declared more than once",
                entity.name,
                key.fields(),
            );
        }
        for member in members {
            if entity.field(member).is_none() {
                err!(
                    issues,
                    "entity '{}': unique key member '{member}' is not a scalar field",
                    entity.name,
                );
            }
        }
    }

    // The primary key is the final ordering tie-break; nulls would tie.
    if let Some(primary) = entity.primary_key() {
        for member in primary.fields() {
            if entity.field(member).is_some_and(|field| field.nullable) {
                err!(
                    issues,
                    "entity '{}': primary key member '{member}' is nullable",
                    entity.name,
                );
            }
        }
    }
}

fn validate_relation(
    by_name: &BTreeMap<&str, &EntityDescriptor>,
    entity: &EntityDescriptor,
    relation: &RelationDescriptor,
    issues: &mut Vec<String>,
) {
    let Some(target) = by_name.get(relation.target.as_str()) else {
        err!(
            issues,
            "entity '{}', relation '{}': target entity '{}' does not exist",
            entity.name,
            relation.name,
            relation.target,
        );
        return;
    };

    match &relation.ownership {
        Ownership::ForeignKey { fields, references } => {
            validate_foreign_key(entity, target, relation, fields, references, issues);
        }
        Ownership::JoinTable {
            table,
            this_column,
            other_column,
            attributes,
        } => {
            if relation.cardinality != Cardinality::Many {
                err!(
                    issues,
                    "entity '{}', relation '{}': join-table relations must be to-many",
                    entity.name,
                    relation.name,
                );
            }
            if entity.single_primary_key().is_none() || target.single_primary_key().is_none() {
                err!(
                    issues,
                    "entity '{}', relation '{}': join table '{table}' requires single-field primary keys on both sides",
                    entity.name,
                    relation.name,
                );
            }
            if this_column == other_column {
                err!(
                    issues,
                    "entity '{}', relation '{}': join table '{table}' uses '{this_column}' for both sides",
                    entity.name,
                    relation.name,
                );
            }
            for attribute in attributes {
                if attribute.name == *this_column || attribute.name == *other_column {
                    err!(
                        issues,
                        "entity '{}', relation '{}': join attribute '{}' shadows a key column",
                        entity.name,
                        relation.name,
                        attribute.name,
                    );
                }
            }
        }
        Ownership::Inverse => {
            if relation.inverse.is_none() {
                err!(
                    issues,
                    "entity '{}', relation '{}': inverse-side relation must name the owning relation",
                    entity.name,
                    relation.name,
                );
            }
            if relation.cardinality == Cardinality::One {
                err!(
                    issues,
                    "entity '{}', relation '{}': inverse side cannot be a required to-one",
                    entity.name,
                    relation.name,
                );
            }
        }
    }

    if let Some(inverse_name) = &relation.inverse {
        validate_declared_inverse(entity, target, relation, inverse_name, issues);
    }
}

fn validate_foreign_key(
    entity: &EntityDescriptor,
    target: &EntityDescriptor,
    relation: &RelationDescriptor,
    fields: &[String],
    references: &[String],
    issues: &mut Vec<String>,
) {
    if relation.cardinality == Cardinality::Many {
        err!(
            issues,
            "entity '{}', relation '{}': foreign-key owners must be to-one",
            entity.name,
            relation.name,
        );
    }
    if fields.is_empty() || fields.len() != references.len() {
        err!(
            issues,
            "entity '{}', relation '{}': foreign key needs matching non-empty field and reference lists",
            entity.name,
            relation.name,
        );
        return;
    }

    for field in fields {
        match entity.field(field) {
            None => {
                err!(
                    issues,
                    "entity '{}', relation '{}': foreign-key field '{field}' does not exist",
                    entity.name,
                    relation.name,
                );
            }
            Some(descriptor) => {
                let required = relation.cardinality == Cardinality::One;
                if required && descriptor.nullable {
                    err!(
                        issues,
                        "entity '{}', relation '{}': required relation uses nullable field '{field}'",
                        entity.name,
                        relation.name,
                    );
                }
                if !required && !descriptor.nullable {
                    err!(
                        issues,
                        "entity '{}', relation '{}': optional relation uses non-nullable field '{field}'",
                        entity.name,
                        relation.name,
                    );
                }
            }
        }
    }

    let referenced = references.iter().map(String::as_str).collect::<BTreeSet<_>>();
    if target.unique_key_for(&referenced).is_none() {
        err!(
            issues,
            "entity '{}', relation '{}': references {:?} are not a unique key of '{}'",
            entity.name,
            relation.name,
            references,
            target.name,
        );
    }
}

// Every declared inverse must exist on the target, point back, and pair
// ownership so that exactly one side stores the linking keys.
fn validate_declared_inverse(
    entity: &EntityDescriptor,
    target: &EntityDescriptor,
    relation: &RelationDescriptor,
    inverse_name: &str,
    issues: &mut Vec<String>,
) {
    let Some(inverse) = target.relation(inverse_name) else {
        err!(
            issues,
            "entity '{}', relation '{}': inverse '{inverse_name}' does not exist on '{}'",
            entity.name,
            relation.name,
            target.name,
        );
        return;
    };

    if inverse.target != entity.name {
        err!(
            issues,
            "entity '{}', relation '{}': inverse '{}.{inverse_name}' targets '{}' instead",
            entity.name,
            relation.name,
            target.name,
            inverse.target,
        );
    }
    if let Some(back) = &inverse.inverse
        && *back != relation.name
    {
        err!(
            issues,
            "entity '{}', relation '{}': inverse '{}.{inverse_name}' names '{back}' as its own inverse",
            entity.name,
            relation.name,
            target.name,
        );
    }

    let paired = match (&relation.ownership, &inverse.ownership) {
        (Ownership::ForeignKey { .. }, Ownership::Inverse)
        | (Ownership::Inverse, Ownership::ForeignKey { .. }) => true,
        (
            Ownership::JoinTable {
                table: a,
                this_column: a_this,
                other_column: a_other,
                ..
            },
            Ownership::JoinTable {
                table: b,
                this_column: b_this,
                other_column: b_other,
                ..
            },
        ) => a == b && a_this == b_other && a_other == b_this,
        _ => false,
    };
    if !paired {
        err!(
            issues,
            "entity '{}', relation '{}': ownership does not pair with inverse '{}.{inverse_name}'",
            entity.name,
            relation.name,
            target.name,
        );
    }
}

// Two relations on one entity may not claim the same inverse.
fn validate_inverse_claims(entity: &EntityDescriptor, issues: &mut Vec<String>) {
    let mut claims = BTreeSet::new();
    for relation in &entity.relations {
        if let Some(inverse) = &relation.inverse
            && !claims.insert((relation.target.as_str(), inverse.as_str()))
        {
            err!(
                issues,
                "entity '{}': more than one relation claims '{}.{inverse}' as inverse",
                entity.name,
                relation.target,
            );
        }
    }
}
