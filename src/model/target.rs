//! Scrape target records

use serde::{Deserialize, Serialize};

use super::{is_valid_address, is_valid_duration, ModelError, RelabelConfig};

pub const DEFAULT_SCRAPE_INTERVAL: &str = "15s";
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

/// A named scrape job and the endpoints it polls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTarget")]
pub struct Target {
    pub job_name: String,
    pub targets: Vec<String>,
    pub scrape_interval: String,
    pub metrics_path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub relabel_configs: Vec<RelabelConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metric_relabel_configs: Vec<RelabelConfig>,
}

impl Target {
    /// Create a target with default interval and metrics path
    pub fn new<I, S>(job_name: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            job_name: job_name.into(),
            targets: targets.into_iter().map(Into::into).collect(),
            scrape_interval: DEFAULT_SCRAPE_INTERVAL.to_string(),
            metrics_path: DEFAULT_METRICS_PATH.to_string(),
            relabel_configs: Vec::new(),
            metric_relabel_configs: Vec::new(),
        }
    }

    pub fn with_scrape_interval(mut self, interval: impl Into<String>) -> Self {
        self.scrape_interval = interval.into();
        self
    }

    pub fn with_metrics_path(mut self, path: impl Into<String>) -> Self {
        self.metrics_path = path.into();
        self
    }

    pub fn with_relabel(mut self, relabel: RelabelConfig) -> Self {
        self.relabel_configs.push(relabel);
        self
    }

    pub fn with_metric_relabel(mut self, relabel: RelabelConfig) -> Self {
        self.metric_relabel_configs.push(relabel);
        self
    }

    /// Check the record and its nested relabel rules
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.job_name.trim().is_empty() {
            return Err(ModelError::EmptyField {
                record: "target",
                field: "job_name",
            });
        }
        if self.targets.is_empty() {
            return Err(ModelError::EmptyField {
                record: "target",
                field: "targets",
            });
        }
        if let Some(bad) = self.targets.iter().find(|t| !is_valid_address(t)) {
            return Err(ModelError::InvalidAddress(bad.clone()));
        }
        if !is_valid_duration(&self.scrape_interval) {
            return Err(ModelError::InvalidDuration {
                field: "scrape_interval",
                value: self.scrape_interval.clone(),
            });
        }
        if !self.metrics_path.starts_with('/') {
            return Err(ModelError::InvalidMetricsPath(self.metrics_path.clone()));
        }
        self.relabel_configs
            .iter()
            .chain(&self.metric_relabel_configs)
            .try_for_each(RelabelConfig::validate)
    }
}

#[derive(Deserialize)]
struct RawTarget {
    job_name: String,
    targets: Vec<String>,
    #[serde(default)]
    scrape_interval: Option<String>,
    #[serde(default)]
    metrics_path: Option<String>,
    #[serde(default)]
    relabel_configs: Option<Vec<RelabelConfig>>,
    #[serde(default)]
    metric_relabel_configs: Option<Vec<RelabelConfig>>,
}

impl TryFrom<RawTarget> for Target {
    type Error = ModelError;

    fn try_from(raw: RawTarget) -> Result<Self, Self::Error> {
        let target = Target {
            job_name: raw.job_name,
            targets: raw.targets,
            scrape_interval: raw
                .scrape_interval
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_SCRAPE_INTERVAL.to_string()),
            metrics_path: raw
                .metrics_path
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_METRICS_PATH.to_string()),
            relabel_configs: raw.relabel_configs.unwrap_or_default(),
            metric_relabel_configs: raw.metric_relabel_configs.unwrap_or_default(),
        };
        target.validate()?;
        Ok(target)
    }
}
