
use crate::{
    db::query::predicate::{
        CompareOp, Predicate, Quantifier, ValidateError, eval, normalize, validate, validate_join,
    },
    model::{Cardinality, SchemaError},
    test_support::{date, registry, rows_of, seeded_store},
    value::{Record, Value},
};

fn mismatch_reason(err: ValidateError) -> String {
    match err {
        ValidateError::TypeMismatch { reason, .. } => reason,
        other => panic!("expected a type mismatch, got {other:?}"),
    }
}

//
// Validation
//

#[test]
fn unknown_field_is_rejected() {
    let registry = registry();
    let err = validate(&registry, "Movie", &Predicate::eq("director", "Nolan")).unwrap_err();

    assert_eq!(
        err,
        ValidateError::InvalidField {
            entity: "Movie".to_string(),
            field: "director".to_string(),
        }
    );
}

#[test]
fn unknown_entity_is_a_schema_error() {
    let registry = registry();
    let err = validate(&registry, "Podcast", &Predicate::empty()).unwrap_err();

    assert_eq!(
        err,
        ValidateError::Schema(SchemaError::NotFound {
            entity: "Podcast".to_string()
        })
    );
}

#[test]
fn range_operator_on_boolean_is_rejected() {
    let registry = registry();
    let join = registry
        .resolve_relation("Movie", "genres")
        .expect("relation exists")
        .clone();
    let err = validate_join(&registry, &join, &Predicate::gt("isPrimary", true)).unwrap_err();

    assert!(mismatch_reason(err).contains("'gt' is not supported on boolean"));
}

#[test]
fn literal_type_must_match_field_kind() {
    let registry = registry();
    let err = validate(&registry, "Movie", &Predicate::eq("title", 42)).unwrap_err();

    assert!(mismatch_reason(err).contains("int literal is not a valid text"));
}

#[test]
fn integer_literals_widen_for_float_fields() {
    let registry = registry();

    validate(&registry, "Movie", &Predicate::gte("rating", 8)).expect("int widens to float");
}

#[test]
fn insensitive_mode_requires_text_field() {
    let registry = registry();

    validate(
        &registry,
        "Movie",
        &Predicate::contains("title", "day").insensitive(),
    )
    .expect("text field accepts insensitive mode");

    let err = validate(&registry, "Movie", &Predicate::eq("id", 1).insensitive()).unwrap_err();
    assert!(mismatch_reason(err).contains("case-insensitive"));
}

#[test]
fn null_literals_require_a_null_check() {
    let registry = registry();
    let err = validate(&registry, "Movie", &Predicate::eq("rating", Value::Null)).unwrap_err();

    assert!(mismatch_reason(err).contains("null check"));
    validate(&registry, "Movie", &Predicate::is_null("rating")).expect("nullable field");
}

#[test]
fn null_check_on_required_field_is_rejected() {
    let registry = registry();
    let err = validate(&registry, "Movie", &Predicate::is_null("title")).unwrap_err();

    assert!(mismatch_reason(err).contains("non-nullable"));
}

#[test]
fn membership_needs_list_of_matching_literals() {
    let registry = registry();

    let roles = Predicate::in_("role", vec!["ADMIN", "CRITIC"]);
    validate(&registry, "User", &roles).expect("enum spellings accepted");

    let err = validate(&registry, "User", &Predicate::in_("role", vec!["OWNER"])).unwrap_err();
    assert!(mismatch_reason(err).contains("text literal is not a valid enum Role"));

    let err = validate(
        &registry,
        "User",
        &Predicate::compare("role", CompareOp::In, "ADMIN"),
    )
    .unwrap_err();
    assert!(mismatch_reason(err).contains("text literal"));
}

#[test]
fn list_operators_apply_to_list_fields_only() {
    let registry = registry();

    validate(&registry, "Movie", &Predicate::has("tags", "classic")).expect("has on list");
    validate(
        &registry,
        "Movie",
        &Predicate::has_every("tags", vec!["classic", "spoof"]),
    )
    .expect("hasEvery on list");

    let err = validate(&registry, "Movie", &Predicate::has("title", "A")).unwrap_err();
    assert!(mismatch_reason(err).contains("'has' is not supported on text"));

    let err = validate(&registry, "Movie", &Predicate::is_empty_list("title")).unwrap_err();
    assert!(mismatch_reason(err).contains("list field"));
}

#[test]
fn text_operators_need_text_literals() {
    let registry = registry();
    let err = validate(&registry, "Movie", &Predicate::starts_with("title", 1)).unwrap_err();

    assert!(mismatch_reason(err).contains("int literal"));

    let err = validate(&registry, "Movie", &Predicate::contains("releasedAt", "19")).unwrap_err();
    assert!(mismatch_reason(err).contains("'contains' is not supported on datetime"));
}

#[test]
fn timestamps_compare_by_range() {
    let registry = registry();

    validate(
        &registry,
        "Movie",
        &Predicate::lt("releasedAt", date(2000, 1, 1)),
    )
    .expect("datetime supports range");
}

#[test]
fn relation_quantifier_must_match_cardinality() {
    let registry = registry();

    validate(
        &registry,
        "Movie",
        &Predicate::some("genres", Predicate::eq("name", "Comedy")),
    )
    .expect("some on to-many");
    validate(
        &registry,
        "Movie",
        &Predicate::is("curator", Predicate::eq("name", "Carol")),
    )
    .expect("is on to-one");

    let err = validate(
        &registry,
        "Movie",
        &Predicate::every("curator", Predicate::empty()),
    )
    .unwrap_err();
    assert_eq!(
        err,
        ValidateError::InvalidRelationQuantifier {
            entity: "Movie".to_string(),
            relation: "curator".to_string(),
            quantifier: Quantifier::Every,
            cardinality: Cardinality::OptionalOne,
        }
    );

    let err = validate(
        &registry,
        "Review",
        &Predicate::is("author", Predicate::empty()),
    );
    assert!(err.is_ok());
}

#[test]
fn relation_predicates_validate_in_target_scope() {
    let registry = registry();

    let err = validate(
        &registry,
        "Movie",
        &Predicate::some("reviews", Predicate::eq("title", "x")),
    )
    .unwrap_err();

    assert_eq!(
        err,
        ValidateError::InvalidField {
            entity: "Review".to_string(),
            field: "title".to_string(),
        }
    );
}

#[test]
fn unknown_relation_is_a_schema_error() {
    let registry = registry();
    let err = validate(
        &registry,
        "Movie",
        &Predicate::some("cast", Predicate::empty()),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        ValidateError::Schema(SchemaError::UnknownRelation { .. })
    ));
}

#[test]
fn join_predicates_cannot_traverse_relations() {
    let registry = registry();
    let join = registry
        .resolve_relation("Movie", "genres")
        .expect("relation exists")
        .clone();

    let err = validate_join(
        &registry,
        &join,
        &Predicate::some("movies", Predicate::empty()),
    )
    .unwrap_err();

    assert!(matches!(err, ValidateError::Schema(_)));
}

//
// Evaluation
//

fn titles_matching(predicate: &Predicate) -> Vec<String> {
    let store = seeded_store();

    rows_of(&store, "Movie")
        .iter()
        .filter(|row| eval(*row, predicate))
        .filter_map(|row| row.record.value("title").and_then(Value::as_text))
        .map(str::to_string)
        .collect()
}

#[test]
fn missing_and_null_fields_never_match() {
    let record = Record::new().with("rating", Value::Null);
    let row = &record;

    assert!(!eval(&row, &Predicate::eq("rating", 1.0)));
    assert!(!eval(&row, &Predicate::ne("rating", 1.0)));
    assert!(!eval(&row, &Predicate::eq("title", "Heat")));
    assert!(eval(&row, &Predicate::is_null("rating")));
}

#[test]
fn empty_groups_are_identity_elements() {
    let record = Record::new();
    let row = &record;

    assert!(eval(&row, &Predicate::and(vec![])));
    assert!(!eval(&row, &Predicate::or(vec![])));
}

#[test]
fn not_in_requires_a_list_literal() {
    let record = Record::new().with("id", 5);
    let row = &record;

    assert!(eval(&row, &Predicate::not_in("id", vec![1, 2])));
    assert!(!eval(&row, &Predicate::not_in("id", vec![5])));
    assert!(!eval(&row, &Predicate::compare("id", CompareOp::NotIn, 7)));
}

#[test]
fn insensitive_text_matching_folds_case() {
    assert_eq!(
        titles_matching(&Predicate::contains("title", "DAY").insensitive()),
        ["Groundhog Day"]
    );
    assert!(titles_matching(&Predicate::contains("title", "DAY")).is_empty());
}

#[test]
fn list_operators_match_elements() {
    assert_eq!(
        titles_matching(&Predicate::has("tags", "classic")),
        ["Airplane!", "Groundhog Day"]
    );
    assert_eq!(
        titles_matching(&Predicate::has_every("tags", vec!["classic", "spoof"])),
        ["Airplane!"]
    );
    assert_eq!(
        titles_matching(&Predicate::has_some("tags", vec!["crime", "family"])),
        ["Heat", "Paddington 2"]
    );
    assert_eq!(
        titles_matching(&Predicate::is_empty_list("tags")),
        ["Hereditary"]
    );
}

#[test]
fn relation_quantifiers_follow_related_rows() {
    assert_eq!(
        titles_matching(&Predicate::some("genres", Predicate::eq("name", "Comedy"))),
        ["Airplane!", "Groundhog Day", "Paddington 2"]
    );
    assert_eq!(
        titles_matching(&Predicate::none("genres", Predicate::eq("name", "Comedy"))),
        ["Heat", "Hereditary"]
    );
    assert_eq!(
        titles_matching(&Predicate::every("reviews", Predicate::gte("rating", 4))),
        ["Airplane!", "Groundhog Day", "Paddington 2"]
    );
    assert_eq!(
        titles_matching(&Predicate::is("curator", Predicate::eq("name", "Alice"))),
        ["Heat", "Paddington 2"]
    );
    assert_eq!(
        titles_matching(&Predicate::is_not("curator", Predicate::eq("name", "Alice"))),
        ["Airplane!", "Groundhog Day", "Hereditary"]
    );
}

#[test]
fn every_is_vacuously_true_and_some_false_over_no_rows() {
    let store = seeded_store();
    let users = rows_of(&store, "User");
    let bob = users
        .iter()
        .find(|row| row.record.value("name") == Some(&Value::from("Bob")))
        .expect("seeded");

    // Bob curates nothing.
    assert!(eval(bob, &Predicate::every("curated", Predicate::or(vec![]))));
    assert!(eval(bob, &Predicate::none("curated", Predicate::and(vec![]))));
    assert!(!eval(bob, &Predicate::some("curated", Predicate::and(vec![]))));
}

#[test]
fn normalization_flattens_and_removes_double_negation() {
    let a = Predicate::eq("title", "Heat");
    let b = Predicate::gt("rating", 8.0);
    let c = Predicate::has("tags", "crime");

    let nested = Predicate::and(vec![
        Predicate::and(vec![a.clone(), b.clone()]),
        Predicate::not(Predicate::not(c.clone())),
    ]);
    assert_eq!(normalize(&nested), Predicate::and(vec![a.clone(), b, c]));

    assert_eq!(normalize(&Predicate::or(vec![a.clone()])), a);
    assert_eq!(normalize(&Predicate::or(vec![])), Predicate::or(vec![]));
}
