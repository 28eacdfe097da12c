//! Middleware pipeline.
//!
//! Stages are registered on the schema registry builder and frozen at build
//! time; there is no way to add a stage to a built registry.

use crate::{
    db::query::plan::{FetchPhase, QueryKind},
    value::Record,
};
use std::{fmt, sync::Arc};

///
/// PhaseEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PhaseEvent<'a> {
    pub kind: QueryKind,
    pub entity: &'a str,
    pub phase: FetchPhase,

    /// Rows in hand at this phase, once storage has answered.
    pub rows: Option<usize>,
}

///
/// Middleware
///
/// Observes request phases and may post-process reshaped records. Stages
/// must not assume they see a request more than once.
///

pub trait Middleware: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str {
        "middleware"
    }

    fn on_phase(&self, _event: &PhaseEvent<'_>) {}

    /// Adjust reshaped records before they are returned.
    fn after_reshape(&self, _kind: QueryKind, _entity: &str, _records: &mut Vec<Record>) {}
}

///
/// Pipeline
///

#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
    #[must_use]
    pub const fn new(stages: Vec<Arc<dyn Middleware>>) -> Self {
        Self { stages }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.stages.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Notify every stage, in registration order.
    pub fn phase(&self, event: &PhaseEvent<'_>) {
        for stage in &self.stages {
            stage.on_phase(event);
        }
    }

    /// Run every stage's post-processing, in registration order.
    pub fn reshape(&self, kind: QueryKind, entity: &str, records: &mut Vec<Record>) {
        for stage in &self.stages {
            stage.after_reshape(kind, entity, records);
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.stages.iter().map(|stage| stage.name()))
            .finish()
    }
}
