//! Process configuration read from the environment
//!
//! PROMCONF_HOST=0.0.0.0
//! PROMCONF_PORT=8080
//! PROMETHEUS_URL=http://localhost:9090
//! PROMETHEUS_USERNAME / PROMETHEUS_PASSWORD (basic auth, only sent with a username)
//! PROMETHEUS_TIMEOUT_SECS=10
//! PROMCONF_CONFIG_DIR=./configs
//! PROMCONF_SCRAPE_FILE=prometheus.yml
//! PROMCONF_RULES_FILE=alerts.yml
//! PROMCONF_PER_TENANT=true
//! PROMCONF_WRITE_TIMEOUT_SECS=10
//! PROMCONF_SCRAPE_INTERVAL=15s
//! PROMCONF_EVALUATION_INTERVAL=15s
//! PROMCONF_ALERTMANAGERS=alertmanager:9093 (comma separated, empty disables alerting)
//! PROMCONF_SELF_TARGET=localhost:9090
//! PROMCONF_RULE_GROUP=user_alerts

use std::path::PathBuf;
use std::time::Duration;

use crate::api::ServerConfig;
use crate::persistence::OutputLayout;
use crate::prometheus::ClientSettings;
use crate::render::RenderSettings;

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub client: ClientSettings,
    pub layout: OutputLayout,
    pub render: RenderSettings,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup; unset or unparsable values
    /// fall back to their defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let secs = |key: &str| {
            var(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
        };

        let defaults = AppConfig::default();

        let server = ServerConfig {
            host: var("PROMCONF_HOST").unwrap_or(defaults.server.host),
            port: var("PROMCONF_PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.server.port),
        };

        let mut client = ClientSettings::new(
            var("PROMETHEUS_URL").unwrap_or(defaults.client.base_url),
        )
        .with_timeout(secs("PROMETHEUS_TIMEOUT_SECS").unwrap_or(defaults.client.timeout));
        if let Some(username) = var("PROMETHEUS_USERNAME") {
            client = client.with_basic_auth(username, lookup("PROMETHEUS_PASSWORD"));
        }

        let layout = OutputLayout {
            base_dir: var("PROMCONF_CONFIG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.layout.base_dir),
            scrape_file: var("PROMCONF_SCRAPE_FILE").unwrap_or(defaults.layout.scrape_file),
            rules_file: var("PROMCONF_RULES_FILE").unwrap_or(defaults.layout.rules_file),
            per_tenant: var("PROMCONF_PER_TENANT")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.layout.per_tenant),
            write_timeout: secs("PROMCONF_WRITE_TIMEOUT_SECS")
                .unwrap_or(defaults.layout.write_timeout),
        };

        // an explicitly empty list disables the alerting section
        let alertmanagers = match lookup("PROMCONF_ALERTMANAGERS") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            None => defaults.render.alertmanagers,
        };

        let render = RenderSettings {
            scrape_interval: var("PROMCONF_SCRAPE_INTERVAL")
                .unwrap_or(defaults.render.scrape_interval),
            evaluation_interval: var("PROMCONF_EVALUATION_INTERVAL")
                .unwrap_or(defaults.render.evaluation_interval),
            alertmanagers,
            self_target: var("PROMCONF_SELF_TARGET").unwrap_or(defaults.render.self_target),
            rules_file: layout.rules_file.clone(),
            rule_group: var("PROMCONF_RULE_GROUP").unwrap_or(defaults.render.rule_group),
        };

        Self {
            server,
            client,
            layout,
            render,
        }
    }
}
