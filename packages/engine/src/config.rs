use serde::{Deserialize, Serialize};

/// Engine tuning, read from the `pin.config.json` file by the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Lowest value an optimistic counter adjustment may produce
    #[serde(default)]
    pub counter_floor: i64,

    /// Upper bound on outstanding inserts per session (unbounded if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pending: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            counter_floor: 0,
            max_pending: None,
        }
    }
}
