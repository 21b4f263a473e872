//! HTTP server settings.

use serde::{Deserialize, Serialize};

/// Network settings for the `/embed` service.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Host to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_body_bytes: 64 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = ServerSettings::default();
        assert_eq!(s.host, "0.0.0.0");
        assert_eq!(s.port, 8000);
        assert_eq!(s.max_body_bytes, 65_536);
    }

    #[test]
    fn serde_roundtrip() {
        let s = ServerSettings {
            host: "127.0.0.1".into(),
            port: 9000,
            max_body_bytes: 1024,
        };
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("maxBodyBytes"));
        let back: ServerSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.port, 9000);
        assert_eq!(back.host, "127.0.0.1");
    }
}
