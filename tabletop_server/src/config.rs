// Server configuration.
//
// `ServerConfig` is a plain serde struct with defaults for every field, so a
// JSON config file only needs the keys it wants to change. The binary loads
// the file (if given) and then applies CLI overrides on top; see `main.rs`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tabletop_protocol::DEFAULT_CHUNK_SIZE;

use crate::error::ServerError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Listen port; 0 lets the OS pick one.
    pub port: u16,
    pub session_name: String,
    /// Required of clients joining as GM, if set.
    pub gm_password: Option<String>,
    /// Required of clients joining as a player, if set.
    pub player_password: Option<String>,
    pub max_players: u32,
    /// Payload bytes per `updateAssetTransfer` chunk.
    pub chunk_size: usize,
    /// How often the asset pump sends the next chunk of each transfer.
    pub pump_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".into(),
            port: 51234,
            session_name: "tabletop".into(),
            gm_password: None,
            player_password: None,
            max_players: 16,
            chunk_size: DEFAULT_CHUNK_SIZE,
            pump_interval_ms: 50,
        }
    }
}

impl ServerConfig {
    /// Load a config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        let text = std::fs::read_to_string(path).map_err(|source| ServerError::ConfigRead {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ServerError::ConfigParse {
            path: path.to_owned(),
            source,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn pump_interval(&self) -> Duration {
        Duration::from_millis(self.pump_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{"port": 9000, "gm_password": "dragon"}"#).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.gm_password.as_deref(), Some("dragon"));
        assert_eq!(config.session_name, "tabletop");
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ServerConfig::load(Path::new("/nonexistent/tabletop.json")).unwrap_err();
        assert!(matches!(err, ServerError::ConfigRead { .. }));
    }

    #[test]
    fn load_reports_bad_json() {
        let path = std::env::temp_dir().join(format!("tabletop-config-{}.json", std::process::id()));
        std::fs::write(&path, "{ port: ").unwrap();
        let err = ServerConfig::load(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, ServerError::ConfigParse { .. }));
    }

    #[test]
    fn zero_pump_interval_is_clamped() {
        let config = ServerConfig {
            pump_interval_ms: 0,
            ..ServerConfig::default()
        };
        assert_eq!(config.pump_interval(), Duration::from_millis(1));
        assert_eq!(ServerConfig::default().listen_addr(), "127.0.0.1:51234");
    }
}
