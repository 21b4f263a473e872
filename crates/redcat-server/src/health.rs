//! `/health` endpoint.

use serde::Serialize;
use std::time::Instant;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `"ok"` when the service takes requests, `"starting"` otherwise.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Embedding dimension, once a vector has been produced.
    pub dim: Option<usize>,
}

/// Build a health response.
pub fn health_check(start_time: Instant, ready: bool, dim: Option<usize>) -> HealthResponse {
    HealthResponse {
        status: if ready { "ok" } else { "starting" }.into(),
        uptime_secs: start_time.elapsed().as_secs(),
        dim,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_reflects_readiness() {
        assert_eq!(health_check(Instant::now(), true, None).status, "ok");
        assert_eq!(health_check(Instant::now(), false, None).status, "starting");
    }

    #[test]
    fn uptime_increases() {
        let start = Instant::now()
            .checked_sub(std::time::Duration::from_secs(60))
            .unwrap();
        assert!(health_check(start, true, None).uptime_secs >= 59);
    }

    #[test]
    fn serialization() {
        let resp = health_check(Instant::now(), true, Some(1024));
        let parsed = serde_json::to_value(&resp).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["dim"], 1024);
        assert!(parsed["uptimeSecs"].is_number());
    }

    #[test]
    fn unknown_dim_is_null() {
        let parsed = serde_json::to_value(health_check(Instant::now(), true, None)).unwrap();
        assert!(parsed["dim"].is_null());
    }
}
