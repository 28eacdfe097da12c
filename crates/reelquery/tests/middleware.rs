use reelquery::{
    core::db::{
        MemoryStore, Middleware, PhaseEvent, StorageErrorKind,
        query::plan::{FetchPhase, QueryKind},
    },
    prelude::*,
};
use reelquery_catalog_fixtures as catalog;
use std::sync::{Arc, Mutex};

///
/// PhaseRecorder
///

#[derive(Clone, Default)]
struct PhaseRecorder {
    events: Arc<Mutex<Vec<(QueryKind, String, FetchPhase)>>>,
}

impl PhaseRecorder {
    fn take(&self) -> Vec<(QueryKind, String, FetchPhase)> {
        std::mem::take(&mut *self.events.lock().expect("recorder lock"))
    }

    fn phases(&self) -> Vec<FetchPhase> {
        self.take().into_iter().map(|(_, _, phase)| phase).collect()
    }
}

impl Middleware for PhaseRecorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    fn on_phase(&self, event: &PhaseEvent<'_>) {
        self.events
            .lock()
            .expect("recorder lock")
            .push((event.kind, event.entity.to_string(), event.phase));
    }
}

///
/// EmailMask
///

struct EmailMask;

impl Middleware for EmailMask {
    fn name(&self) -> &'static str {
        "email-mask"
    }

    fn after_reshape(&self, _kind: QueryKind, entity: &str, records: &mut Vec<Record>) {
        if entity != "User" {
            return;
        }
        for record in records {
            if let Some(email) = record.get_mut("email") {
                *email = Value::from("hidden");
            }
        }
    }
}

fn session_with(recorder: &PhaseRecorder) -> DbSession<MemoryStore> {
    let registry = catalog::builder()
        .middleware(recorder.clone())
        .middleware(EmailMask)
        .build()
        .expect("catalog schema is valid");
    let registry = Arc::new(registry);
    let store = catalog::seeded_store(Arc::clone(&registry)).expect("seed loads");

    DbSession::new(registry, store)
}

#[test]
fn pipeline_keeps_registration_order() {
    let session = session_with(&PhaseRecorder::default());

    assert_eq!(
        format!("{:?}", session.registry().pipeline()),
        r#"["recorder", "email-mask"]"#
    );
}

#[test]
fn successful_fetch_walks_every_phase_in_order() {
    let recorder = PhaseRecorder::default();
    let session = session_with(&recorder);

    session
        .find_many("Movie", &FetchSpec::new())
        .expect("valid request");

    let events = recorder.take();
    assert!(
        events
            .iter()
            .all(|(kind, entity, _)| *kind == QueryKind::FindMany && entity == "Movie")
    );

    let phases = events
        .into_iter()
        .map(|(_, _, phase)| phase)
        .collect::<Vec<_>>();
    assert_eq!(
        phases,
        [
            FetchPhase::Requested,
            FetchPhase::Validated,
            FetchPhase::Windowed,
            FetchPhase::Delegated,
            FetchPhase::Reshaped,
            FetchPhase::Returned,
        ]
    );
    assert!(
        phases
            .windows(2)
            .all(|pair| pair[0].can_advance_to(pair[1]))
    );
}

fn assert_full_walk(events: Vec<(QueryKind, String, FetchPhase)>, kind: QueryKind) {
    assert!(
        events
            .iter()
            .all(|(k, entity, _)| *k == kind && entity == "Review")
    );

    let phases = events
        .into_iter()
        .map(|(_, _, phase)| phase)
        .collect::<Vec<_>>();
    assert_eq!(
        phases,
        [
            FetchPhase::Requested,
            FetchPhase::Validated,
            FetchPhase::Windowed,
            FetchPhase::Delegated,
            FetchPhase::Reshaped,
            FetchPhase::Returned,
        ],
        "{kind:?}"
    );
    assert!(
        phases
            .windows(2)
            .all(|pair| pair[0].can_advance_to(pair[1]))
    );
}

#[test]
fn aggregation_requests_walk_every_phase_in_order() {
    let recorder = PhaseRecorder::default();
    let session = session_with(&recorder);

    session.count("Review", None).expect("valid request");
    assert_full_walk(recorder.take(), QueryKind::Count);

    session
        .aggregate(&AggregationRequest::new("Review").aggregate(AggregateSpec::avg("rating")))
        .expect("valid request");
    assert_full_walk(recorder.take(), QueryKind::Aggregate);

    session
        .group_by(
            &AggregationRequest::new("Review")
                .group_by(["movieId"])
                .aggregate(AggregateSpec::count_all()),
        )
        .expect("valid request");
    assert_full_walk(recorder.take(), QueryKind::GroupBy);
}

#[test]
fn validation_failure_stops_before_storage() {
    let recorder = PhaseRecorder::default();
    let session = session_with(&recorder);

    let unknown = FetchSpec::new().filter(Predicate::eq("budget", 1));
    session.find_many("Movie", &unknown).unwrap_err();

    assert_eq!(
        recorder.phases(),
        [FetchPhase::Requested, FetchPhase::Failed]
    );
}

#[test]
fn storage_failure_ends_after_windowing() {
    let recorder = PhaseRecorder::default();
    let session = session_with(&recorder);
    session
        .storage()
        .fail_next(StorageErrorKind::Timeout, "replica lagging");

    session.find_many("Movie", &FetchSpec::new()).unwrap_err();

    assert_eq!(
        recorder.phases(),
        [
            FetchPhase::Requested,
            FetchPhase::Validated,
            FetchPhase::Windowed,
            FetchPhase::Failed,
        ]
    );
}

#[test]
fn stages_post_process_reshaped_records() {
    let recorder = PhaseRecorder::default();
    let session = session_with(&recorder);

    let users = session
        .find_many(
            "User",
            &FetchSpec::new()
                .order_by(OrderSpec::new().asc("id"))
                .projection(ProjectionSpec::all().select(["email", "name"])),
        )
        .expect("valid request");

    assert_eq!(users.len(), 3);
    assert!(
        users
            .iter()
            .all(|user| user.value("email") == Some(&Value::from("hidden")))
    );

    // other entities pass through untouched
    let genre = session
        .find_unique(
            "MovieGenre",
            &Predicate::eq("id", 1),
            ProjectionSpec::all().select(["name"]),
        )
        .expect("valid request");
    assert_eq!(genre, Some(Record::new().with("name", "Comedy")));
}
