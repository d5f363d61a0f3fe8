// Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tabletop_model::Role;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub player_name: String,
    pub role: Role,
    pub password: Option<String>,
    /// Flush period of the token-drag coalescing queue.
    pub coalesce_interval_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            player_name: "Player".into(),
            role: Role::Player,
            password: None,
            coalesce_interval_ms: 100,
        }
    }
}

impl ClientConfig {
    pub fn new(player_name: impl Into<String>, role: Role) -> Self {
        Self {
            player_name: player_name.into(),
            role,
            ..Self::default()
        }
    }

    pub fn coalesce_interval(&self) -> Duration {
        Duration::from_millis(self.coalesce_interval_ms.max(1))
    }
}
