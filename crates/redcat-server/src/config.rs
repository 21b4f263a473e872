//! Server configuration.

use redcat_settings::ServerSettings;
use serde::{Deserialize, Serialize};

/// Bind address and request limits.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"0.0.0.0"`).
    pub host: String,
    /// Port to bind (default `8000`; `0` auto-assigns).
    pub port: u16,
    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from(&ServerSettings::default())
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(s: &ServerSettings) -> Self {
        Self {
            host: s.host.clone(),
            port: s.port,
            max_body_bytes: s.max_body_bytes,
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_settings() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.max_body_bytes, 64 * 1024);
        assert_eq!(cfg.addr(), "0.0.0.0:8000");
    }

    #[test]
    fn from_custom_settings() {
        let settings = ServerSettings {
            host: "127.0.0.1".into(),
            port: 9090,
            max_body_bytes: 1024,
        };
        let cfg = ServerConfig::from(&settings);
        assert_eq!(cfg.addr(), "127.0.0.1:9090");
        assert_eq!(cfg.max_body_bytes, 1024);
    }
}
