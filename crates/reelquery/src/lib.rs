//! ## Crate layout
//! - `core`: schema registry, values, request vocabulary, resolution, the
//!   storage boundary and the in-memory reference collaborator.
//! - `db`: the public session facade.
//! - `error`: the public error taxonomy.
//!
//! The `prelude` module carries the request-building vocabulary plus the
//! facade session and error types.

pub use reelquery_core as core;

pub mod db;
pub mod error;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// re-exports
pub use crate::core::{config::EngineConfig, db::StorageCollaborator};
pub use db::DbSession;
pub use error::{Error, ErrorKind, ErrorOrigin, QueryErrorKind, StoreErrorKind};

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        core::prelude::*,
        db::DbSession,
        error::{Error, ErrorKind},
    };
}
