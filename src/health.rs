//! Liveness reporting for external probes
//!
//! Stores answer [`CategoryStore::liveness_check`](crate::storage::CategoryStore::liveness_check)
//! with a [`Liveness`]; [`HealthReport`] is the JSON body a probe server
//! returns.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of a backend liveness check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Liveness {
    pub reachable: bool,
    pub detail: String,
}

impl Liveness {
    pub fn reachable(detail: impl Into<String>) -> Self {
        Self {
            reachable: true,
            detail: detail.into(),
        }
    }

    pub fn unreachable(detail: impl Into<String>) -> Self {
        Self {
            reachable: false,
            detail: detail.into(),
        }
    }
}

/// Backend status as reported to probes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendState {
    Connected,
    Error,
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackendStatus {
    pub status: BackendState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Health response body
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// "ok" when the backend is connected, "degraded" otherwise
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub backend: BackendStatus,
}

impl HealthReport {
    /// Build a report; `None` means the store could not be opened or checked
    pub fn from_liveness(liveness: Option<Liveness>) -> Self {
        let backend = match liveness {
            Some(l) if l.reachable => BackendStatus {
                status: BackendState::Connected,
                error: None,
            },
            Some(l) => BackendStatus {
                status: BackendState::Error,
                error: Some(l.detail),
            },
            None => BackendStatus {
                status: BackendState::Unknown,
                error: None,
            },
        };

        Self {
            status: if backend.status == BackendState::Connected {
                "ok"
            } else {
                "degraded"
            },
            timestamp: Utc::now(),
            backend,
        }
    }

    /// Report for a store that failed to open
    pub fn from_open_error(err: &crate::error::StoreError) -> Self {
        Self::from_liveness(Some(Liveness::unreachable(err.to_string())))
    }

    pub fn is_healthy(&self) -> bool {
        self.backend.status == BackendState::Connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_report() {
        let report = HealthReport::from_liveness(Some(Liveness::reachable("ping ok")));
        assert!(report.is_healthy());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["backend"]["status"], "connected");
        assert!(json["backend"].get("error").is_none());
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_error_report_carries_detail() {
        let report = HealthReport::from_liveness(Some(Liveness::unreachable("timed out")));
        assert!(!report.is_healthy());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["backend"]["status"], "error");
        assert_eq!(json["backend"]["error"], "timed out");
    }

    #[test]
    fn test_unknown_report() {
        let report = HealthReport::from_liveness(None);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["backend"]["status"], "unknown");
        assert!(!report.is_healthy());
    }
}
