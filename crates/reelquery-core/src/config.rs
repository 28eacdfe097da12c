use serde::{Deserialize, Serialize};

///
/// CONSTANTS
///

/// Default cap on explicit relation nesting below a root fetch.
pub const DEFAULT_MAX_RELATION_DEPTH: usize = 8;

///
/// EngineConfig
///
/// Resolution limits shared by every request issued through one registry.
/// Built once at startup and read-only afterwards.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Deepest explicit relation nesting accepted by projection resolution.
    pub max_relation_depth: usize,

    /// Largest absolute `take` accepted by window resolution.
    pub max_take: Option<u64>,

    /// Emit plan summaries at `info` level instead of `debug`.
    pub debug: bool,
}

impl EngineConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_relation_depth: DEFAULT_MAX_RELATION_DEPTH,
            max_take: None,
            debug: false,
        }
    }

    #[must_use]
    pub const fn with_max_relation_depth(mut self, depth: usize) -> Self {
        self.max_relation_depth = depth;
        self
    }

    #[must_use]
    pub const fn with_max_take(mut self, max_take: u64) -> Self {
        self.max_take = Some(max_take);
        self
    }

    #[must_use]
    pub const fn debug(mut self) -> Self {
        self.debug = true;
        self
    }

    /// Parse a config document; absent keys keep their defaults.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

///
/// TESTS
///
