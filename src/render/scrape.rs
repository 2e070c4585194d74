//! Scrape configuration document

use std::collections::HashSet;

use super::document::{Mapping, Node};
use super::{RenderError, RenderSettings};
use crate::model::{RelabelAction, RelabelConfig, Target, DEFAULT_METRICS_PATH};

/// Job name of the built-in self-scrape job
pub const SELF_JOB_NAME: &str = "prometheus";

pub(super) fn build(
    targets: &[Target],
    with_rules: bool,
    settings: &RenderSettings,
) -> Result<Mapping, RenderError> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(targets.len() + 1);
    seen.insert(SELF_JOB_NAME);

    let mut jobs: Vec<Node> = Vec::with_capacity(targets.len() + 1);
    jobs.push(self_job(settings).into());

    for target in targets {
        target
            .validate()
            .map_err(|source| RenderError::InvalidTarget {
                job_name: target.job_name.clone(),
                source,
            })?;
        if !seen.insert(target.job_name.as_str()) {
            return Err(RenderError::DuplicateJob(target.job_name.clone()));
        }
        jobs.push(job(target, settings).into());
    }

    let mut root = Mapping::new();
    root.insert("global", global(settings));
    if !settings.alertmanagers.is_empty() {
        root.insert("alerting", alerting(settings));
    }
    if with_rules {
        root.insert(
            "rule_files",
            Node::List(vec![Node::quoted(settings.rules_file.as_str())]),
        );
    }
    root.insert("scrape_configs", Node::List(jobs));
    Ok(root)
}

fn global(settings: &RenderSettings) -> Mapping {
    let mut global = Mapping::new();
    global
        .insert("scrape_interval", Node::plain(settings.scrape_interval.as_str()))
        .insert(
            "evaluation_interval",
            Node::plain(settings.evaluation_interval.as_str()),
        );
    global
}

fn alerting(settings: &RenderSettings) -> Mapping {
    let mut alertmanager = Mapping::new();
    alertmanager.insert(
        "static_configs",
        Node::List(vec![static_config(&settings.alertmanagers).into()]),
    );

    let mut alerting = Mapping::new();
    alerting.insert("alertmanagers", Node::List(vec![alertmanager.into()]));
    alerting
}

fn static_config(addresses: &[String]) -> Mapping {
    let mut config = Mapping::new();
    config.insert("targets", Node::flow_quoted(addresses.iter().map(String::as_str)));
    config
}

fn self_job(settings: &RenderSettings) -> Mapping {
    let mut job = Mapping::new();
    job.insert("job_name", Node::quoted(SELF_JOB_NAME)).insert(
        "static_configs",
        Node::List(vec![static_config(std::slice::from_ref(&settings.self_target)).into()]),
    );
    job
}

fn job(target: &Target, settings: &RenderSettings) -> Mapping {
    let mut job = Mapping::new();
    job.insert("job_name", Node::quoted(target.job_name.as_str()));

    if target.scrape_interval != settings.scrape_interval {
        job.insert("scrape_interval", Node::plain(target.scrape_interval.as_str()));
    }
    if target.metrics_path != DEFAULT_METRICS_PATH {
        job.insert("metrics_path", Node::plain(target.metrics_path.as_str()));
    }
    if !target.relabel_configs.is_empty() {
        job.insert("relabel_configs", relabel_list(&target.relabel_configs));
    }

    job.insert(
        "static_configs",
        Node::List(vec![static_config(&target.targets).into()]),
    );

    if !target.metric_relabel_configs.is_empty() {
        job.insert(
            "metric_relabel_configs",
            relabel_list(&target.metric_relabel_configs),
        );
    }
    job
}

fn relabel_list(configs: &[RelabelConfig]) -> Node {
    Node::List(configs.iter().map(|c| Node::from(relabel(c))).collect())
}

fn relabel(config: &RelabelConfig) -> Mapping {
    let mut entry = Mapping::new();

    if !config.source_labels.is_empty() {
        entry.insert(
            "source_labels",
            Node::flow_quoted(config.source_labels.iter().map(String::as_str)),
        );
    }
    if !config.separator.is_empty() {
        entry.insert("separator", Node::quoted(config.separator.as_str()));
    }
    if !config.target_label.is_empty() {
        entry.insert("target_label", Node::plain(config.target_label.as_str()));
    }
    if !config.regex.is_empty() {
        entry.insert("regex", Node::quoted(config.regex.as_str()));
    }
    if config.action == RelabelAction::HashMod {
        if let Some(modulus) = config.modulus {
            entry.insert("modulus", Node::int(modulus));
        }
    }
    if !config.replacement.is_empty() {
        entry.insert("replacement", Node::quoted(config.replacement.as_str()));
    }
    entry.insert("action", Node::plain(config.action.as_str()));
    entry
}
