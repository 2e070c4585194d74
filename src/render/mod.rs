//! Renders targets and alert rules into Prometheus configuration documents
//!
//! Rendering is pure: the same ordered input always produces byte-identical
//! output. Records appear in input order; nothing is sorted implicitly
//! except label and annotation keys.

pub mod document;
mod rules;
mod scrape;

pub use document::{Mapping, Node, Scalar};
pub use scrape::SELF_JOB_NAME;

use serde::{Deserialize, Serialize};

use crate::model::{AlertRule, ModelError, Target, DEFAULT_SCRAPE_INTERVAL};

/// Fixed parts of the rendered documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// `global.scrape_interval`; targets using this value omit it
    pub scrape_interval: String,
    /// `global.evaluation_interval`
    pub evaluation_interval: String,
    /// Alertmanager addresses; empty leaves out the `alerting` section
    pub alertmanagers: Vec<String>,
    /// Address of the built-in self-scrape job
    pub self_target: String,
    /// Rule file name referenced from `rule_files`
    pub rules_file: String,
    /// Name of the single rendered rule group
    pub rule_group: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            scrape_interval: DEFAULT_SCRAPE_INTERVAL.to_string(),
            evaluation_interval: "15s".to_string(),
            alertmanagers: vec!["alertmanager:9093".to_string()],
            self_target: "localhost:9090".to_string(),
            rules_file: "alerts.yml".to_string(),
            rule_group: "user_alerts".to_string(),
        }
    }
}

/// Rendered documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedConfig {
    /// Scrape and alerting-endpoint document
    pub scrape_config: String,
    /// Rule-group document; `None` when there are no alert rules
    pub rule_config: Option<String>,
}

/// Renderer for the two configuration documents
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    settings: RenderSettings,
}

impl Renderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings }
    }

    /// Render both documents
    ///
    /// Fails only on structurally invalid records; free-text content never
    /// causes an error because every value is escaped on output.
    pub fn render(
        &self,
        targets: &[Target],
        rules: &[AlertRule],
    ) -> Result<RenderedConfig, RenderError> {
        let rule_doc = rules::build(rules, &self.settings)?;
        let scrape_doc = scrape::build(targets, rule_doc.is_some(), &self.settings)?;

        Ok(RenderedConfig {
            scrape_config: document::emit(&scrape_doc),
            rule_config: rule_doc.as_ref().map(document::emit),
        })
    }
}

/// Check that an externally supplied document is a YAML mapping
pub fn check_document(text: &str) -> Result<(), RenderError> {
    match serde_yaml::from_str::<serde_yaml::Value>(text) {
        Ok(serde_yaml::Value::Mapping(_)) => Ok(()),
        Ok(_) => Err(RenderError::InvalidDocument(
            "top level must be a mapping".to_string(),
        )),
        Err(e) => Err(RenderError::InvalidDocument(e.to_string())),
    }
}

/// Render errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("invalid target '{job_name}': {source}")]
    InvalidTarget {
        job_name: String,
        #[source]
        source: ModelError,
    },

    #[error("duplicate job_name '{0}'")]
    DuplicateJob(String),

    #[error("invalid alert rule '{alert_name}': {source}")]
    InvalidRule {
        alert_name: String,
        #[source]
        source: ModelError,
    },

    #[error("invalid configuration document: {0}")]
    InvalidDocument(String),
}
