use crate::{
    config::EngineConfig,
    db::query::{
        order::OrderSpec,
        predicate::{Predicate, ValidateError},
        projection::{
            FetchSpec, ProjectionError, ProjectionSpec, ResolvedPlan, resolve, resolve_fetch,
        },
    },
    model::SchemaError,
    test_support::registry,
};
use std::collections::BTreeSet;

fn plan_for(entity: &str, projection: &ProjectionSpec) -> Result<ResolvedPlan, ProjectionError> {
    resolve(&registry(), &EngineConfig::default(), entity, projection)
}

fn keys(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| (*name).to_string()).collect()
}

#[test]
fn default_projection_is_every_scalar_in_declaration_order() {
    let plan = plan_for("Movie", &ProjectionSpec::all()).expect("valid");

    assert_eq!(
        plan.fields,
        ["id", "title", "releasedAt", "rating", "tags", "curatorId"]
    );
    assert!(plan.relations.is_empty());
    assert_eq!(plan.depth(), 0);
}

#[test]
fn select_keeps_declaration_order() {
    let projection = ProjectionSpec::all().select(["role", "name", "id"]);
    let plan = plan_for("User", &projection).expect("valid");

    assert_eq!(plan.fields, ["id", "name", "role"]);
}

#[test]
fn omit_drops_named_fields() {
    let plan = plan_for("User", &ProjectionSpec::all().omit(["bio", "email"])).expect("valid");

    assert_eq!(plan.output_keys(), keys(&["id", "name", "role"]));
}

#[test]
fn select_and_omit_together_are_ambiguous() {
    let projection = ProjectionSpec::all().select(["id"]).omit(["bio"]);

    assert_eq!(
        plan_for("User", &projection).unwrap_err(),
        ProjectionError::AmbiguousSelection {
            entity: "User".to_string()
        }
    );
}

#[test]
fn nested_levels_choose_select_or_omit_independently() {
    let projection = ProjectionSpec::all().select(["title"]).include(
        "curator",
        FetchSpec::new().projection(ProjectionSpec::all().omit(["bio"])),
    );
    let plan = plan_for("Movie", &projection).expect("valid");

    assert_eq!(plan.output_keys(), keys(&["title", "curator"]));
    assert_eq!(
        plan.relations[0].fetch.plan.output_keys(),
        keys(&["id", "email", "name", "role"])
    );
}

#[test]
fn unknown_projection_field_is_rejected() {
    assert_eq!(
        plan_for("Movie", &ProjectionSpec::all().omit(["budget"])).unwrap_err(),
        ProjectionError::InvalidField {
            entity: "Movie".to_string(),
            field: "budget".to_string(),
        }
    );
}

#[test]
fn empty_selection_is_rejected() {
    let projection = ProjectionSpec::all().select(Vec::<String>::new());

    assert_eq!(
        plan_for("Review", &projection).unwrap_err(),
        ProjectionError::EmptySelection {
            entity: "Review".to_string()
        }
    );
}

#[test]
fn relations_alone_make_a_non_empty_selection() {
    let projection = ProjectionSpec::all()
        .select(Vec::<String>::new())
        .include("author", FetchSpec::new());
    let plan = plan_for("Review", &projection).expect("valid");

    assert_eq!(plan.output_keys(), keys(&["author"]));
}

#[test]
fn unknown_relation_is_a_schema_error() {
    let projection = ProjectionSpec::all().include("cast", FetchSpec::new());
    let err = plan_for("Movie", &projection).unwrap_err();

    assert!(matches!(
        err,
        ProjectionError::Schema(SchemaError::UnknownRelation { .. })
    ));
}

#[test]
fn nesting_depth_is_capped() {
    let config = EngineConfig::new().with_max_relation_depth(2);
    let three_deep = ProjectionSpec::all().include(
        "reviews",
        FetchSpec::new().projection(ProjectionSpec::all().include(
            "author",
            FetchSpec::new().projection(ProjectionSpec::all().include("curated", FetchSpec::new())),
        )),
    );

    let err = resolve(&registry(), &config, "Movie", &three_deep).unwrap_err();
    assert_eq!(
        err,
        ProjectionError::DepthExceeded {
            entity: "User".to_string(),
            relation: "curated".to_string(),
            limit: 2,
        }
    );

    let two_deep = ProjectionSpec::all().include(
        "reviews",
        FetchSpec::new().projection(ProjectionSpec::all().include("author", FetchSpec::new())),
    );
    let plan = resolve(&registry(), &config, "Movie", &two_deep).expect("within limit");
    assert_eq!(plan.depth(), 2);
}

#[test]
fn to_one_relations_take_no_row_arguments() {
    let specs = [
        FetchSpec::new().filter(Predicate::eq("name", "Carol")),
        FetchSpec::new().order_by(OrderSpec::new().asc("name")),
        FetchSpec::new().take(1),
        FetchSpec::new().skip(1),
    ];

    for fetch in specs {
        let err = plan_for("Movie", &ProjectionSpec::all().include("curator", fetch)).unwrap_err();
        assert_eq!(
            err,
            ProjectionError::ToOneRelationArguments {
                entity: "Movie".to_string(),
                relation: "curator".to_string(),
            }
        );
    }
}

#[test]
fn to_many_relation_fetch_is_resolved_in_target_scope() {
    let without_body = Predicate::and(vec![Predicate::is_null("body")]);
    let fetch = FetchSpec::new()
        .filter(Predicate::gte("rating", 4) & without_body)
        .order_by(OrderSpec::new().desc("rating"))
        .take(2);
    let plan = plan_for("Movie", &ProjectionSpec::all().include("reviews", fetch)).expect("valid");

    let reviews = &plan.relations[0];
    assert_eq!(reviews.relation.target, "Review");
    assert_eq!(
        reviews.fetch.predicate,
        Predicate::and(vec![Predicate::gte("rating", 4), Predicate::is_null("body")])
    );
    assert_eq!(reviews.fetch.window.take, Some(2));
    assert!(reviews.fetch.window.order.is_explicit());
}

#[test]
fn nested_predicates_validate_against_the_relation_target() {
    let fetch = FetchSpec::new().filter(Predicate::eq("title", "Heat"));
    let err = plan_for("User", &ProjectionSpec::all().include("reviews", fetch)).unwrap_err();

    assert_eq!(
        err,
        ProjectionError::Predicate(Box::new(ValidateError::InvalidField {
            entity: "Review".to_string(),
            field: "title".to_string(),
        }))
    );
}

#[test]
fn relation_counts_need_to_many_relations() {
    let plan = plan_for(
        "Movie",
        &ProjectionSpec::all()
            .select(["title"])
            .count("reviews")
            .count_where("genres", Predicate::eq("name", "Drama")),
    )
    .expect("valid");

    assert_eq!(plan.output_keys(), keys(&["title", "_count"]));
    assert_eq!(plan.counts.len(), 2);

    let err = plan_for("Review", &ProjectionSpec::all().count("author")).unwrap_err();
    assert_eq!(
        err,
        ProjectionError::CountOnToOneRelation {
            entity: "Review".to_string(),
            relation: "author".to_string(),
        }
    );
}

#[test]
fn join_predicates_need_a_join_table_relation() {
    let registry = registry();
    let config = EngineConfig::default();

    let root = FetchSpec::new().join_filter(Predicate::eq("isPrimary", true));
    let err = resolve_fetch(&registry, &config, "Movie", &root).unwrap_err();
    assert_eq!(
        err,
        ProjectionError::JoinPredicateAtRoot {
            entity: "Movie".to_string(),
        }
    );
    assert_eq!(
        err.to_string(),
        "join predicate on 'Movie' is only valid under a relation"
    );

    let inverse = ProjectionSpec::all().include(
        "reviews",
        FetchSpec::new().join_filter(Predicate::eq("isPrimary", true)),
    );
    assert_eq!(
        resolve(&registry, &config, "Movie", &inverse).unwrap_err(),
        ProjectionError::JoinPredicateWithoutJoinTable {
            entity: "Movie".to_string(),
            relation: "reviews".to_string(),
        }
    );

    let joined = ProjectionSpec::all().include(
        "genres",
        FetchSpec::new().join_filter(Predicate::eq("isPrimary", true)),
    );
    let plan = resolve(&registry, &config, "Movie", &joined).expect("join table");
    assert_eq!(
        plan.relations[0].fetch.join_predicate,
        Some(Predicate::eq("isPrimary", true))
    );
}

#[test]
fn join_predicates_only_see_join_attributes() {
    let joined = ProjectionSpec::all().include(
        "genres",
        FetchSpec::new().join_filter(Predicate::eq("name", "Drama")),
    );

    assert!(matches!(
        plan_for("Movie", &joined),
        Err(ProjectionError::Predicate(_))
    ));
}

#[test]
fn root_fetch_normalizes_its_filter() {
    let fetch = FetchSpec::new().filter(Predicate::not(Predicate::not(Predicate::has(
        "tags", "classic",
    ))));
    let resolved =
        resolve_fetch(&registry(), &EngineConfig::default(), "Movie", &fetch).expect("valid");

    assert_eq!(resolved.predicate, Predicate::has("tags", "classic"));
    assert!(resolved.join_predicate.is_none());
    assert!(resolved.window.is_unbounded());
}
