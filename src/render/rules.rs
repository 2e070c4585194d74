//! Alert rule-group document

use std::collections::BTreeMap;

use super::document::{Mapping, Node};
use super::{RenderError, RenderSettings};
use crate::model::AlertRule;

/// Build the rule-group document, or `None` when there is nothing to alert on
pub(super) fn build(
    rules: &[AlertRule],
    settings: &RenderSettings,
) -> Result<Option<Mapping>, RenderError> {
    if rules.is_empty() {
        return Ok(None);
    }

    let mut entries: Vec<Node> = Vec::with_capacity(rules.len());
    for rule in rules {
        rule.validate().map_err(|source| RenderError::InvalidRule {
            alert_name: rule.alert_name.clone(),
            source,
        })?;
        entries.push(rule_entry(rule).into());
    }

    let mut group = Mapping::new();
    group
        .insert("name", Node::quoted(settings.rule_group.as_str()))
        .insert("rules", Node::List(entries));

    let mut root = Mapping::new();
    root.insert("groups", Node::List(vec![group.into()]));
    Ok(Some(root))
}

fn rule_entry(rule: &AlertRule) -> Mapping {
    let mut entry = Mapping::new();
    entry
        .insert("alert", Node::quoted(rule.alert_name.as_str()))
        .insert("expr", Node::quoted(rule.expr.as_str()))
        .insert("for", Node::plain(rule.for_duration.as_str()));

    // the severity field wins over a `severity` key in the label map
    let mut labels: BTreeMap<&str, &str> = rule
        .labels
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    labels.insert("severity", rule.severity.as_str());
    entry.insert("labels", string_map(labels));

    if !rule.annotations.is_empty() {
        entry.insert(
            "annotations",
            string_map(rule.annotations.iter().map(|(k, v)| (k.as_str(), v.as_str()))),
        );
    }
    entry
}

fn string_map<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Mapping {
    let mut mapping = Mapping::new();
    for (key, value) in pairs {
        mapping.insert(key, Node::quoted(value));
    }
    mapping
}

#[cfg(test)]
mod tests {
    use super::super::{document, Renderer};
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_no_rules_no_document() {
        assert!(build(&[], &RenderSettings::default()).unwrap().is_none());

        let rendered = Renderer::default().render(&[], &[]).unwrap();
        assert!(rendered.rule_config.is_none());
        assert!(!rendered.scrape_config.contains("rule_files"));
    }

    #[test]
    fn test_rule_document_layout() {
        let rules = vec![AlertRule::new("InstanceDown", "up{job=\"node\"} == 0")
            .with_severity("critical")
            .with_label("team", "ops")
            .with_label("severity", "ignored")
            .with_annotation("summary", "{{ $labels.instance }} down")];

        let doc = build(&rules, &RenderSettings::default()).unwrap().unwrap();
        let expected = "\
groups:
  - name: \"user_alerts\"
    rules:
      - alert: \"InstanceDown\"
        expr: \"up{job=\\\"node\\\"} == 0\"
        for: 5m
        labels:
          severity: \"critical\"
          team: \"ops\"
        annotations:
          summary: \"{{ $labels.instance }} down\"
";
        assert_eq!(document::emit(&doc), expected);
    }

    #[test]
    fn test_rules_reference_in_scrape_document() {
        let rendered = Renderer::default()
            .render(&[], &[AlertRule::new("Down", "up == 0")])
            .unwrap();
        assert!(rendered
            .scrape_config
            .contains("rule_files:\n  - \"alerts.yml\"\n"));

        let parsed: serde_yaml::Value =
            serde_yaml::from_str(rendered.rule_config.as_deref().unwrap()).unwrap();
        let rule = &parsed["groups"][0]["rules"][0];
        assert_eq!(rule["expr"].as_str(), Some("up == 0"));
        assert_eq!(rule["for"].as_str(), Some("5m"));
        assert_eq!(rule["labels"]["severity"].as_str(), Some("warning"));
    }
}
