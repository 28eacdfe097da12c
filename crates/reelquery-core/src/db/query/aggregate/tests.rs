use crate::{
    config::EngineConfig,
    db::query::{
        aggregate::{
            AggregateError, AggregateFunction, AggregateRow, AggregateSpec, AggregationPlan,
            AggregationRequest, HavingPredicate, resolve, resolve_grouped, resolve_ungrouped,
        },
        order::{Direction, OrderSpec},
        predicate::{CompareOp, Predicate},
    },
    test_support::{date, registry, rows_of, seeded_store},
    value::{Record, Value},
};
use proptest::prelude::*;

fn plan(request: &AggregationRequest) -> Result<AggregationPlan, AggregateError> {
    resolve(&registry(), &EngineConfig::default(), request)
}

fn run(request: &AggregationRequest) -> Vec<AggregateRow> {
    let store = seeded_store();
    let plan = plan(request).expect("valid aggregation");

    plan.evaluate(rows_of(&store, &request.entity))
}

fn single(request: &AggregationRequest) -> AggregateRow {
    let mut rows = run(request);
    assert_eq!(rows.len(), 1, "ungrouped aggregation yields one row");
    rows.remove(0)
}

fn reviews() -> AggregationRequest {
    AggregationRequest::new("Review")
}

//
// Validation
//

#[test]
fn aggregates_check_field_types() {
    let err = plan(&AggregationRequest::new("Movie").aggregate(AggregateSpec::avg("title")))
        .unwrap_err();

    assert_eq!(
        err,
        AggregateError::InvalidAggregateType {
            entity: "Movie".to_string(),
            field: "title".to_string(),
            function: AggregateFunction::Avg,
            kind: "text".to_string(),
        }
    );

    plan(&AggregationRequest::new("Movie").aggregate(AggregateSpec::min("title")))
        .expect("min on text");
    assert!(matches!(
        plan(&AggregationRequest::new("User").aggregate(AggregateSpec::max("role"))),
        Err(AggregateError::InvalidAggregateType { .. })
    ));
}

#[test]
fn only_count_may_omit_its_field() {
    let sum_all = AggregateSpec {
        function: AggregateFunction::Sum,
        field: None,
    };

    assert_eq!(
        plan(&reviews().aggregate(sum_all)).unwrap_err(),
        AggregateError::MissingAggregateField {
            function: AggregateFunction::Sum
        }
    );
    plan(&reviews().aggregate(AggregateSpec::count_all())).expect("count of rows");
}

#[test]
fn unknown_aggregate_field_is_rejected() {
    assert_eq!(
        plan(&reviews().aggregate(AggregateSpec::sum("stars"))).unwrap_err(),
        AggregateError::InvalidField {
            entity: "Review".to_string(),
            field: "stars".to_string(),
        }
    );
}

#[test]
fn ungrouped_aggregation_needs_an_aggregate() {
    assert_eq!(
        plan(&reviews()).unwrap_err(),
        AggregateError::NoAggregates {
            entity: "Review".to_string()
        }
    );
}

#[test]
fn windows_require_an_explicit_order() {
    let ungrouped = reviews().aggregate(AggregateSpec::count_all()).take(2);
    let grouped = reviews().group_by(["userId"]).skip(1);

    for request in [ungrouped, grouped] {
        assert_eq!(
            plan(&request).unwrap_err(),
            AggregateError::OrderRequiredForWindow {
                entity: "Review".to_string()
            }
        );
    }
}

#[test]
fn having_requires_grouping() {
    let request = reviews()
        .aggregate(AggregateSpec::count_all())
        .having(HavingPredicate::aggregate(AggregateSpec::count_all(), CompareOp::Gt, 1));

    assert_eq!(
        plan(&request).unwrap_err(),
        AggregateError::HavingRequiresGroupBy {
            entity: "Review".to_string()
        }
    );
}

#[test]
fn having_reads_group_fields_or_aggregates_only() {
    let request = reviews()
        .group_by(["userId"])
        .having(HavingPredicate::field("rating", CompareOp::Gt, 3));

    assert_eq!(
        plan(&request).unwrap_err(),
        AggregateError::HavingFieldNotInGroupBy {
            entity: "Review".to_string(),
            field: "rating".to_string(),
        }
    );
}

#[test]
fn having_checks_operator_and_literal() {
    let text_op = reviews().group_by(["userId"]).having(HavingPredicate::aggregate(
        AggregateSpec::count_all(),
        CompareOp::Contains,
        "1",
    ));
    assert_eq!(
        plan(&text_op).unwrap_err(),
        AggregateError::InvalidHavingOperator {
            op: CompareOp::Contains
        }
    );

    let wrong_literal = reviews().group_by(["userId"]).having(HavingPredicate::aggregate(
        AggregateSpec::count_all(),
        CompareOp::Gte,
        "many",
    ));
    assert!(matches!(
        plan(&wrong_literal),
        Err(AggregateError::InvalidHavingValue { .. })
    ));

    let float_avg = reviews().group_by(["userId"]).having(HavingPredicate::aggregate(
        AggregateSpec::avg("rating"),
        CompareOp::Gt,
        4,
    ));
    plan(&float_avg).expect("int literal widens for averages");
}

#[test]
fn group_fields_must_be_distinct_scalars() {
    assert_eq!(
        plan(&AggregationRequest::new("Movie").group_by(["tags"])).unwrap_err(),
        AggregateError::UngroupableField {
            entity: "Movie".to_string(),
            field: "tags".to_string(),
        }
    );
    assert!(matches!(
        plan(&reviews().group_by(["userId", "userId"])),
        Err(AggregateError::DuplicateGroupField { .. })
    ));
    assert!(matches!(
        plan(&reviews().group_by(["author"])),
        Err(AggregateError::InvalidField { .. })
    ));
}

#[test]
fn grouped_order_is_limited_to_groups_and_aggregates() {
    let by_rating = reviews()
        .group_by(["userId"])
        .order_by(OrderSpec::new().asc("rating"));
    assert_eq!(
        plan(&by_rating).unwrap_err(),
        AggregateError::OrderFieldNotInGroupBy {
            entity: "Review".to_string(),
            field: "rating".to_string(),
        }
    );

    let by_path = reviews()
        .group_by(["userId"])
        .order_by(OrderSpec::new().by_path(["author"], "name", Direction::Asc));
    assert!(matches!(
        plan(&by_path),
        Err(AggregateError::UnsupportedGroupOrder { .. })
    ));
}

#[test]
fn entry_points_enforce_grouping_shape() {
    let registry = registry();
    let config = EngineConfig::default();

    let ungrouped = reviews().aggregate(AggregateSpec::count_all());
    assert_eq!(
        resolve_grouped(&registry, &config, &ungrouped).unwrap_err(),
        AggregateError::EmptyGroupBy {
            entity: "Review".to_string()
        }
    );

    let no_keys = reviews().group_by(Vec::<String>::new());
    assert_eq!(
        resolve_grouped(&registry, &config, &no_keys).unwrap_err(),
        AggregateError::EmptyGroupBy {
            entity: "Review".to_string()
        }
    );

    let grouped = reviews().group_by(["userId"]);
    assert_eq!(
        resolve_ungrouped(&registry, &config, &grouped).unwrap_err(),
        AggregateError::UnexpectedGroupBy {
            entity: "Review".to_string()
        }
    );
}

//
// Reduction
//

#[test]
fn ungrouped_reduction_over_all_rows() {
    let row = single(
        &reviews()
            .aggregate(AggregateSpec::count_all())
            .aggregate(AggregateSpec::count("body"))
            .aggregate(AggregateSpec::sum("rating"))
            .aggregate(AggregateSpec::min("rating"))
            .aggregate(AggregateSpec::max("rating")),
    );

    assert!(row.group.is_empty());
    assert_eq!(row.values[&AggregateSpec::count_all()], Value::Int(6));
    assert_eq!(row.values[&AggregateSpec::count("body")], Value::Int(3));
    assert_eq!(row.values[&AggregateSpec::sum("rating")], Value::Int(23));
    assert_eq!(row.values[&AggregateSpec::min("rating")], Value::Int(2));
    assert_eq!(row.values[&AggregateSpec::max("rating")], Value::Int(5));
}

#[test]
fn empty_input_yields_null_except_counts() {
    let row = single(
        &reviews()
            .filter(Predicate::gt("rating", 5))
            .aggregate(AggregateSpec::count_all())
            .aggregate(AggregateSpec::count("body"))
            .aggregate(AggregateSpec::sum("rating"))
            .aggregate(AggregateSpec::avg("rating"))
            .aggregate(AggregateSpec::min("rating")),
    );

    assert_eq!(row.values[&AggregateSpec::count_all()], Value::Int(0));
    assert_eq!(row.values[&AggregateSpec::count("body")], Value::Int(0));
    assert_eq!(row.values[&AggregateSpec::sum("rating")], Value::Null);
    assert_eq!(row.values[&AggregateSpec::avg("rating")], Value::Null);
    assert_eq!(row.values[&AggregateSpec::min("rating")], Value::Null);
}

#[test]
fn nulls_are_skipped_by_field_aggregates() {
    let row = single(
        &AggregationRequest::new("Movie")
            .aggregate(AggregateSpec::count("rating"))
            .aggregate(AggregateSpec::max("rating"))
            .aggregate(AggregateSpec::min("releasedAt")),
    );

    assert_eq!(row.values[&AggregateSpec::count("rating")], Value::Int(4));
    assert_eq!(row.values[&AggregateSpec::max("rating")], Value::Float(8.3));
    assert_eq!(
        row.values[&AggregateSpec::min("releasedAt")],
        Value::from(date(1980, 7, 2))
    );
}

#[test]
fn ungrouped_window_narrows_rows_before_reducing() {
    let row = single(
        &AggregationRequest::new("Movie")
            .order_by(OrderSpec::new().asc("releasedAt"))
            .take(2)
            .aggregate(AggregateSpec::count_all())
            .aggregate(AggregateSpec::max("title")),
    );

    assert_eq!(row.values[&AggregateSpec::count_all()], Value::Int(2));
    assert_eq!(
        row.values[&AggregateSpec::max("title")],
        Value::from("Groundhog Day")
    );
}

#[test]
fn grouped_reduction_with_having_order_and_take() {
    let request = reviews()
        .group_by(["userId"])
        .aggregate(AggregateSpec::count_all())
        .aggregate(AggregateSpec::avg("rating"))
        .having(HavingPredicate::aggregate(AggregateSpec::count_all(), CompareOp::Gte, 2))
        .order_by(OrderSpec::new().by_aggregate(AggregateSpec::avg("rating"), Direction::Desc));

    let rows = run(&request);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].group, Record::new().with("userId", 1));
    assert_eq!(rows[0].values[&AggregateSpec::count_all()], Value::Int(3));
    assert_eq!(rows[1].group, Record::new().with("userId", 2));
    assert_eq!(
        rows[1].values[&AggregateSpec::avg("rating")],
        Value::Float(3.5)
    );

    let top = run(&request.take(1));
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].group, Record::new().with("userId", 1));
}

#[test]
fn having_and_order_may_read_unrequested_aggregates() {
    let request = reviews()
        .group_by(["userId"])
        .aggregate(AggregateSpec::count_all())
        .having(HavingPredicate::aggregate(AggregateSpec::max("rating"), CompareOp::Eq, 5))
        .order_by(OrderSpec::new().by_aggregate(AggregateSpec::sum("rating"), Direction::Asc));

    let rows = run(&request);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].group, Record::new().with("userId", 1));
    assert_eq!(
        rows[0].values.keys().cloned().collect::<Vec<_>>(),
        [AggregateSpec::count_all()]
    );
}

#[test]
fn null_group_keys_form_their_own_group() {
    let rows = run(
        &AggregationRequest::new("Movie")
            .group_by(["curatorId"])
            .aggregate(AggregateSpec::count_all()),
    );

    let groups = rows
        .iter()
        .map(|row| {
            (
                row.group.value("curatorId").cloned(),
                row.values[&AggregateSpec::count_all()].clone(),
            )
        })
        .collect::<Vec<_>>();

    assert_eq!(
        groups,
        [
            (Some(Value::Int(1)), Value::Int(2)),
            (Some(Value::Int(3)), Value::Int(2)),
            (Some(Value::Null), Value::Int(1)),
        ]
    );
}

#[test]
fn grouped_results_follow_the_row_filter() {
    let rows = run(
        &reviews()
            .filter(Predicate::is_null("body"))
            .group_by(["movieId"])
            .aggregate(AggregateSpec::count_all()),
    );

    let movies = rows
        .iter()
        .filter_map(|row| row.group.value("movieId").cloned())
        .collect::<Vec<_>>();
    assert_eq!(movies, [1, 3, 5].map(Value::Int));
}

proptest! {
    #[test]
    fn having_rejects_any_field_outside_the_grouping(field in "[a-zA-Z_][a-zA-Z0-9_]{0,12}") {
        prop_assume!(field != "userId");

        let request = reviews()
            .group_by(["userId"])
            .aggregate(AggregateSpec::count_all())
            .having(HavingPredicate::field(field.clone(), CompareOp::Eq, 1));

        prop_assert_eq!(
            plan(&request).unwrap_err(),
            AggregateError::HavingFieldNotInGroupBy {
                entity: "Review".to_string(),
                field,
            }
        );
    }
}
