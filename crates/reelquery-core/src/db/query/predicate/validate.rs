use crate::{
    db::query::predicate::{
        CaseMode, CompareOp, ComparePredicate, Predicate, Quantifier, RelationPredicate,
    },
    model::{Cardinality, FieldDescriptor, RelationDescriptor, SchemaError, SchemaRegistry},
    value::Value,
};
use thiserror::Error as ThisError;

///
/// ValidateError
///
/// Structural mismatch between a predicate and the schema scope it is
/// evaluated in. Deterministic for a given predicate and schema.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ValidateError {
    #[error("unknown field '{field}' on '{entity}'")]
    InvalidField { entity: String, field: String },

    #[error("type mismatch on '{entity}.{field}': {reason}")]
    TypeMismatch {
        entity: String,
        field: String,
        reason: String,
    },

    #[error(
        "quantifier '{quantifier}' cannot be applied to {cardinality} relation '{entity}.{relation}'"
    )]
    InvalidRelationQuantifier {
        entity: String,
        relation: String,
        quantifier: Quantifier,
        cardinality: Cardinality,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

///
/// Scope
///
/// The field set (and, for entities, the relation set) a predicate resolves
/// against. Relation predicates shift scope to the target entity.
///

struct Scope<'a> {
    label: &'a str,
    fields: &'a [FieldDescriptor],
    traversable: bool,
}

impl Scope<'_> {
    fn field(&self, name: &str) -> Result<&FieldDescriptor, ValidateError> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| ValidateError::InvalidField {
                entity: self.label.to_string(),
                field: name.to_string(),
            })
    }

    fn mismatch(&self, field: &str, reason: impl Into<String>) -> ValidateError {
        ValidateError::TypeMismatch {
            entity: self.label.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Validate a predicate against an entity of the registry.
pub fn validate(
    registry: &SchemaRegistry,
    entity: &str,
    predicate: &Predicate,
) -> Result<(), ValidateError> {
    let descriptor = registry.describe(entity)?;
    let scope = Scope {
        label: &descriptor.name,
        fields: &descriptor.fields,
        traversable: true,
    };

    validate_in_scope(registry, &scope, predicate)
}

/// Validate a predicate against the join-row attributes of a join-table relation.
pub(crate) fn validate_join(
    registry: &SchemaRegistry,
    relation: &RelationDescriptor,
    predicate: &Predicate,
) -> Result<(), ValidateError> {
    let scope = Scope {
        label: &relation.name,
        fields: relation.join_attributes(),
        traversable: false,
    };

    validate_in_scope(registry, &scope, predicate)
}

fn validate_in_scope(
    registry: &SchemaRegistry,
    scope: &Scope<'_>,
    predicate: &Predicate,
) -> Result<(), ValidateError> {
    match predicate {
        Predicate::And(children) | Predicate::Or(children) => {
            for child in children {
                validate_in_scope(registry, scope, child)?;
            }
            Ok(())
        }
        Predicate::Not(inner) => validate_in_scope(registry, scope, inner),
        Predicate::Compare(cmp) => validate_compare(scope, cmp),
        Predicate::IsNull { field } => {
            if scope.field(field)?.nullable {
                Ok(())
            } else {
                Err(scope.mismatch(field, "null check on a non-nullable field"))
            }
        }
        Predicate::IsEmpty { field } => {
            if scope.field(field)?.kind.is_list() {
                Ok(())
            } else {
                Err(scope.mismatch(field, "isEmpty requires a list field"))
            }
        }
        Predicate::Relation(rel) => validate_relation(registry, scope, rel),
    }
}

fn validate_relation(
    registry: &SchemaRegistry,
    scope: &Scope<'_>,
    rel: &RelationPredicate,
) -> Result<(), ValidateError> {
    if !scope.traversable {
        return Err(SchemaError::unknown_relation(scope.label, &rel.relation).into());
    }

    let descriptor = registry.resolve_relation(scope.label, &rel.relation)?;
    if rel.quantifier.is_to_many() != descriptor.cardinality.is_to_many() {
        return Err(ValidateError::InvalidRelationQuantifier {
            entity: scope.label.to_string(),
            relation: rel.relation.clone(),
            quantifier: rel.quantifier,
            cardinality: descriptor.cardinality,
        });
    }

    // CONTRACT: traversal only follows relations whose inverse resolves.
    registry.inverse_of(scope.label, &rel.relation)?;

    validate(registry, &descriptor.target, &rel.predicate)
}

fn validate_compare(scope: &Scope<'_>, cmp: &ComparePredicate) -> Result<(), ValidateError> {
    let field = scope.field(&cmp.field)?;
    let kind = &field.kind;
    let name = cmp.field.as_str();

    if cmp.mode == CaseMode::Insensitive && !kind.is_text() {
        return Err(scope.mismatch(name, format!("case-insensitive mode on {kind} field")));
    }
    if cmp.value.is_null() {
        return Err(scope.mismatch(name, "null literal in comparison; use a null check"));
    }

    let unsupported = || scope.mismatch(name, format!("'{}' is not supported on {kind}", cmp.op));
    let bad_literal = |value: &Value| {
        let label = value.kind_label();
        scope.mismatch(
            name,
            format!("{label} literal is not a valid {kind} for '{}'", cmp.op),
        )
    };

    match cmp.op {
        CompareOp::Eq | CompareOp::Ne => {
            if !kind.matches_literal(&cmp.value) {
                return Err(bad_literal(&cmp.value));
            }
        }
        CompareOp::Lt | CompareOp::Lte | CompareOp::Gt | CompareOp::Gte => {
            if !kind.supports_range() {
                return Err(unsupported());
            }
            if !kind.matches_literal(&cmp.value) {
                return Err(bad_literal(&cmp.value));
            }
        }
        CompareOp::In | CompareOp::NotIn => {
            if kind.is_list() {
                return Err(unsupported());
            }
            let Value::List(items) = &cmp.value else {
                return Err(bad_literal(&cmp.value));
            };
            if let Some(item) = items.iter().find(|item| !kind.matches_literal(item)) {
                return Err(bad_literal(item));
            }
        }
        CompareOp::Contains | CompareOp::StartsWith | CompareOp::EndsWith => {
            if !kind.is_text() {
                return Err(unsupported());
            }
            if !matches!(cmp.value, Value::Text(_)) {
                return Err(bad_literal(&cmp.value));
            }
        }
        CompareOp::Has => {
            if !kind.is_list() {
                return Err(unsupported());
            }
            if !kind.matches_element(&cmp.value) {
                return Err(bad_literal(&cmp.value));
            }
        }
        CompareOp::HasEvery | CompareOp::HasSome => {
            if !kind.is_list() {
                return Err(unsupported());
            }
            let Value::List(items) = &cmp.value else {
                return Err(bad_literal(&cmp.value));
            };
            if let Some(item) = items.iter().find(|item| !kind.matches_element(item)) {
                return Err(bad_literal(item));
            }
        }
    }

    Ok(())
}
