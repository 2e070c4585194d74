//! Alert rule records

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{is_valid_duration, is_valid_label_name, ModelError};

pub const DEFAULT_FOR_DURATION: &str = "5m";
pub const DEFAULT_SEVERITY: &str = "warning";

/// A named alerting condition
///
/// Labels and annotations are kept in key order so rendering never depends
/// on the order the persistence layer handed them over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAlertRule")]
pub struct AlertRule {
    pub alert_name: String,
    /// Query expression, opaque to the compiler
    pub expr: String,
    pub for_duration: String,
    pub severity: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

impl AlertRule {
    pub fn new(alert_name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            alert_name: alert_name.into(),
            expr: expr.into(),
            for_duration: DEFAULT_FOR_DURATION.to_string(),
            severity: DEFAULT_SEVERITY.to_string(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
        }
    }

    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = severity.into();
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.alert_name.trim().is_empty() {
            return Err(ModelError::EmptyField {
                record: "alert_rule",
                field: "alert_name",
            });
        }
        if self.expr.trim().is_empty() {
            return Err(ModelError::EmptyField {
                record: "alert_rule",
                field: "expr",
            });
        }
        if !is_valid_duration(&self.for_duration) {
            return Err(ModelError::InvalidDuration {
                field: "for_duration",
                value: self.for_duration.clone(),
            });
        }
        if self.severity.is_empty() {
            return Err(ModelError::EmptyField {
                record: "alert_rule",
                field: "severity",
            });
        }
        match self
            .labels
            .keys()
            .chain(self.annotations.keys())
            .find(|k| !is_valid_label_name(k))
        {
            Some(bad) => Err(ModelError::InvalidLabelName(bad.clone())),
            None => Ok(()),
        }
    }
}

#[derive(Deserialize)]
struct RawAlertRule {
    alert_name: String,
    expr: String,
    #[serde(default)]
    for_duration: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    labels: Option<BTreeMap<String, String>>,
    #[serde(default)]
    annotations: Option<BTreeMap<String, String>>,
}

impl TryFrom<RawAlertRule> for AlertRule {
    type Error = ModelError;

    fn try_from(raw: RawAlertRule) -> Result<Self, Self::Error> {
        let rule = AlertRule {
            alert_name: raw.alert_name,
            expr: raw.expr,
            for_duration: raw
                .for_duration
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_FOR_DURATION.to_string()),
            severity: raw
                .severity
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_SEVERITY.to_string()),
            labels: raw.labels.unwrap_or_default(),
            annotations: raw.annotations.unwrap_or_default(),
        };
        rule.validate()?;
        Ok(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let rule: AlertRule =
            serde_json::from_str(r#"{"alert_name": "InstanceDown", "expr": "up == 0"}"#).unwrap();
        assert_eq!(rule.for_duration, "5m");
        assert_eq!(rule.severity, "warning");
        assert!(rule.labels.is_empty());
        assert!(rule.annotations.is_empty());
    }

    #[test]
    fn test_maps_accept_null_and_objects() {
        let rule: AlertRule = serde_json::from_str(
            r#"{
                "alert_name": "HighLatency",
                "expr": "histogram_quantile(0.99, rate(http_duration_bucket[5m])) > 1",
                "for_duration": "10m",
                "labels": {"team": "api", "tier": "1"},
                "annotations": null
            }"#,
        )
        .unwrap();
        assert_eq!(rule.labels.get("team").map(String::as_str), Some("api"));
        assert!(rule.annotations.is_empty());
    }

    #[test]
    fn test_rejects_invalid_rules() {
        assert!(serde_json::from_str::<AlertRule>(r#"{"alert_name": "", "expr": "up"}"#).is_err());
        assert!(serde_json::from_str::<AlertRule>(r#"{"alert_name": "A", "expr": " "}"#).is_err());
        assert!(serde_json::from_str::<AlertRule>(
            r#"{"alert_name": "A", "expr": "up", "for_duration": "five minutes"}"#
        )
        .is_err());
        assert!(serde_json::from_str::<AlertRule>(
            r#"{"alert_name": "A", "expr": "up", "labels": {"bad-key": "x"}}"#
        )
        .is_err());
        // labels must be string to string
        assert!(serde_json::from_str::<AlertRule>(
            r#"{"alert_name": "A", "expr": "up", "labels": {"k": {"nested": 1}}}"#
        )
        .is_err());
    }
}
