use reelquery::{
    core::db::{MemoryStore, StorageErrorKind},
    prelude::*,
};
use reelquery_catalog_fixtures as catalog;
use std::{
    fmt::{self, Write as _},
    sync::{Arc, Mutex},
};
use tracing::{
    Event, Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::{
    EnvFilter, Layer,
    layer::{Context, SubscriberExt},
};

///
/// CaptureLayer
///
/// Records every event as `LEVEL name=value ...`.
///

#[derive(Clone, Default)]
struct CaptureLayer {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CaptureLayer {
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock().expect("capture lock"))
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut line = event.metadata().level().to_string();
        event.record(&mut FieldWriter(&mut line));

        self.lines.lock().expect("capture lock").push(line);
    }
}

struct FieldWriter<'a>(&'a mut String);

impl Visit for FieldWriter<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let _ = write!(self.0, " {}={value:?}", field.name());
    }
}

fn session() -> DbSession<MemoryStore> {
    let registry = Arc::new(catalog::registry().expect("catalog schema is valid"));
    let store = catalog::seeded_store(Arc::clone(&registry)).expect("seed loads");

    DbSession::new(registry, store)
}

// One test per binary: the subscriber is installed for this thread only.
#[test]
fn requests_log_plans_and_failures() {
    let capture = CaptureLayer::default();
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::new("reelquery_core=info"))
        .with(capture.clone());

    tracing::subscriber::with_default(subscriber, || {
        // plan summaries stay at debug unless the session opts in
        let quiet = session();
        quiet
            .find_many("Movie", &FetchSpec::new())
            .expect("valid request");
        let lines = capture.take();
        assert!(
            lines.iter().all(|line| !line.contains("resolved plan")),
            "plan summary leaked at info"
        );

        let loud = session().debug();
        loud.find_many("Movie", &FetchSpec::new())
            .expect("valid request");
        let lines = capture.take();
        assert!(
            lines
                .iter()
                .any(|line| line.starts_with("INFO") && line.contains("message=resolved plan")),
            "{lines:?}"
        );

        // failures are logged once, with their retry class
        loud.storage()
            .fail_next(StorageErrorKind::Unavailable, "primary is down");
        loud.find_many("Movie", &FetchSpec::new()).unwrap_err();
        let failures = capture
            .take()
            .into_iter()
            .filter(|line| line.contains("message=request failed"))
            .collect::<Vec<_>>();
        assert_eq!(failures.len(), 1, "{failures:?}");
        assert!(failures[0].starts_with("WARN"));
        assert!(failures[0].contains("retryable=true"));
    });
}
