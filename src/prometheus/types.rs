//! Response shapes of the Prometheus HTTP API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::RemoteError;

/// `{"status": ..., "data": ...}` wrapper used by every `/api/v1` endpoint
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct ApiEnvelope<T> {
    pub status: String,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default, rename = "errorType")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn into_data(self) -> Result<T, RemoteError> {
        if self.status != "success" {
            return Err(RemoteError::Api {
                error_type: self.error_type.unwrap_or_else(|| "unknown".to_string()),
                error: self.error.unwrap_or_default(),
            });
        }
        if !self.warnings.is_empty() {
            tracing::warn!(warnings = ?self.warnings, "Prometheus returned warnings");
        }
        self.data
            .ok_or_else(|| RemoteError::Decode("response has no data field".to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConfigData {
    pub yaml: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AlertsData {
    pub alerts: Vec<AlertInstance>,
}

/// An active or pending alert as reported by the monitoring server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertInstance {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    pub state: String,
    #[serde(default, rename = "activeAt")]
    pub active_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub value: Option<String>,
}

impl AlertInstance {
    pub fn alert_name(&self) -> Option<&str> {
        self.labels.get("alertname").map(String::as_str)
    }

    pub fn is_firing(&self) -> bool {
        self.state == "firing"
    }
}

/// Result of an instant or range query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryData {
    #[serde(rename = "resultType")]
    pub result_type: String,
    pub result: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alerts_payload() {
        let body = r#"{
            "status": "success",
            "data": {"alerts": [{
                "labels": {"alertname": "InstanceDown", "instance": "10.0.0.1:9100"},
                "annotations": {"summary": "down"},
                "state": "firing",
                "activeAt": "2024-05-01T10:00:00.123456789+02:00",
                "value": "0e+00"
            }]}
        }"#;
        let envelope: ApiEnvelope<AlertsData> = serde_json::from_str(body).unwrap();
        let alerts = envelope.into_data().unwrap().alerts;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_name(), Some("InstanceDown"));
        assert!(alerts[0].is_firing());
        assert_eq!(
            alerts[0].active_at.unwrap().to_rfc3339(),
            "2024-05-01T08:00:00.123456789+00:00"
        );
    }

    #[test]
    fn test_error_envelope() {
        let body = r#"{"status": "error", "errorType": "bad_data", "error": "parse error"}"#;
        let envelope: ApiEnvelope<QueryData> = serde_json::from_str(body).unwrap();
        assert_eq!(
            envelope.into_data(),
            Err(RemoteError::Api {
                error_type: "bad_data".to_string(),
                error: "parse error".to_string(),
            })
        );
    }

    #[test]
    fn test_missing_data() {
        let envelope: ApiEnvelope<ConfigData> =
            serde_json::from_str(r#"{"status": "success"}"#).unwrap();
        assert!(matches!(envelope.into_data(), Err(RemoteError::Decode(_))));
    }
}
