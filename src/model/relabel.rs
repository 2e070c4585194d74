//! Relabeling rules attached to a scrape job

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ModelError;

/// Relabel action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelabelAction {
    #[default]
    Replace,
    Keep,
    Drop,
    HashMod,
    LabelMap,
    LabelDrop,
    LabelKeep,
}

impl RelabelAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelabelAction::Replace => "replace",
            RelabelAction::Keep => "keep",
            RelabelAction::Drop => "drop",
            RelabelAction::HashMod => "hashmod",
            RelabelAction::LabelMap => "labelmap",
            RelabelAction::LabelDrop => "labeldrop",
            RelabelAction::LabelKeep => "labelkeep",
        }
    }
}

impl fmt::Display for RelabelAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single relabel rule
///
/// Empty strings mean "not set" and are left out of the rendered document.
/// `modulus` is only meaningful for [`RelabelAction::HashMod`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRelabelConfig")]
pub struct RelabelConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub source_labels: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub separator: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub target_label: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub regex: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modulus: Option<u64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub replacement: String,
    pub action: RelabelAction,
}

impl RelabelConfig {
    /// Create a rule with the given action and nothing else set
    pub fn new(action: RelabelAction) -> Self {
        Self {
            action,
            ..Default::default()
        }
    }

    pub fn with_source_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_target_label(mut self, label: impl Into<String>) -> Self {
        self.target_label = label.into();
        self
    }

    pub fn with_regex(mut self, regex: impl Into<String>) -> Self {
        self.regex = regex.into();
        self
    }

    pub fn with_modulus(mut self, modulus: u64) -> Self {
        self.modulus = Some(modulus);
        self
    }

    pub fn with_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.replacement = replacement.into();
        self
    }

    /// Check the action-specific invariants
    pub fn validate(&self) -> Result<(), ModelError> {
        match self.action {
            RelabelAction::HashMod if self.modulus.unwrap_or(0) == 0 => {
                Err(ModelError::MissingModulus)
            }
            RelabelAction::Keep | RelabelAction::Drop if self.regex.is_empty() => {
                Err(ModelError::MissingRegex(self.action))
            }
            _ => Ok(()),
        }
    }
}

/// Wire shape accepted from the persistence layer (nulls and omitted fields allowed)
#[derive(Deserialize)]
struct RawRelabelConfig {
    #[serde(default)]
    source_labels: Option<Vec<String>>,
    #[serde(default)]
    separator: Option<String>,
    #[serde(default)]
    target_label: Option<String>,
    #[serde(default)]
    regex: Option<String>,
    #[serde(default)]
    modulus: Option<u64>,
    #[serde(default)]
    replacement: Option<String>,
    #[serde(default)]
    action: Option<RelabelAction>,
}

impl TryFrom<RawRelabelConfig> for RelabelConfig {
    type Error = ModelError;

    fn try_from(raw: RawRelabelConfig) -> Result<Self, Self::Error> {
        let config = RelabelConfig {
            source_labels: raw.source_labels.unwrap_or_default(),
            separator: raw.separator.unwrap_or_default(),
            target_label: raw.target_label.unwrap_or_default(),
            regex: raw.regex.unwrap_or_default(),
            modulus: raw.modulus.filter(|m| *m > 0),
            replacement: raw.replacement.unwrap_or_default(),
            action: raw.action.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }
}
