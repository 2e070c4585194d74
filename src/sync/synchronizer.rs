use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{SyncError, SyncOutcome};
use crate::model::{AlertRule, Target};
use crate::persistence::{ConfigPaths, ConfigWriter, OutputLayout};
use crate::prometheus::{PrometheusClient, RemoteError};
use crate::render::{check_document, RenderError, RenderSettings, RenderedConfig, Renderer};

/// Composes renderer, writer and reload client
///
/// Render and both file writes for one scrape path happen under a single
/// async lock, so concurrent synchronizations never leave a scrape file and
/// a rule file that came from different requests. Reloads are not locked.
#[derive(Clone)]
pub struct Synchronizer {
    renderer: Arc<Renderer>,
    writer: ConfigWriter,
    client: PrometheusClient,
    layout: Arc<OutputLayout>,
    guards: Arc<DashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl Synchronizer {
    /// The rule file referenced from the scrape document always follows the layout
    pub fn new(mut settings: RenderSettings, layout: OutputLayout, client: PrometheusClient) -> Self {
        settings.rules_file = layout.rules_file.clone();

        Self {
            renderer: Arc::new(Renderer::new(settings)),
            writer: ConfigWriter::new(layout.write_timeout),
            client,
            layout: Arc::new(layout),
            guards: Arc::new(DashMap::new()),
        }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn client(&self) -> &PrometheusClient {
        &self.client
    }

    /// Render without touching disk or the server
    pub fn render(
        &self,
        targets: &[Target],
        rules: &[AlertRule],
    ) -> Result<RenderedConfig, RenderError> {
        self.renderer.render(targets, rules)
    }

    /// Synchronize into the shared output paths
    pub async fn synchronize(&self, targets: Vec<Target>, rules: Vec<AlertRule>) -> SyncOutcome {
        self.synchronize_at(self.layout.shared(), targets, rules)
            .await
    }

    /// Synchronize into a tenant's output paths
    pub async fn synchronize_tenant(
        &self,
        tenant: &str,
        targets: Vec<Target>,
        rules: Vec<AlertRule>,
    ) -> SyncOutcome {
        match self.layout.for_tenant(tenant) {
            Ok(paths) => self.synchronize_at(paths, targets, rules).await,
            Err(e) => SyncOutcome::Failed(e.into()),
        }
    }

    /// Render, write and reload against explicit paths
    ///
    /// Render and write run on a spawned task: once started, they finish
    /// even if the caller stops waiting.
    pub async fn synchronize_at(
        &self,
        paths: ConfigPaths,
        targets: Vec<Target>,
        rules: Vec<AlertRule>,
    ) -> SyncOutcome {
        let this = self.clone();
        let task_paths = paths.clone();
        let task = tokio::spawn(async move {
            this.render_and_write(&task_paths, &targets, &rules)
                .await
        });

        match task.await {
            Ok(Ok(config)) => self.reload_after_write(config, paths).await,
            Ok(Err(e)) => {
                tracing::warn!(path = %paths.scrape.display(), error = %e, "Synchronization failed");
                SyncOutcome::Failed(e)
            }
            Err(e) => SyncOutcome::Failed(SyncError::Aborted(e.to_string())),
        }
    }

    /// Write a caller-supplied scrape document as-is, then reload
    ///
    /// The document must be a YAML mapping. The rule file is left untouched.
    pub async fn apply_raw(&self, paths: ConfigPaths, text: String) -> SyncOutcome {
        if let Err(e) = check_document(&text) {
            return SyncOutcome::Failed(e.into());
        }

        let this = self.clone();
        let task_paths = paths.clone();
        let task = tokio::spawn(async move {
            let guard = this.guard_for(&task_paths);
            let _guard = guard.lock().await;
            this.writer.write(&task_paths.scrape, text.clone()).await?;
            Ok::<_, SyncError>(RenderedConfig {
                scrape_config: text,
                rule_config: None,
            })
        });

        match task.await {
            Ok(Ok(config)) => self.reload_after_write(config, paths).await,
            Ok(Err(e)) => SyncOutcome::Failed(e),
            Err(e) => SyncOutcome::Failed(SyncError::Aborted(e.to_string())),
        }
    }

    /// Retry only the reload step
    pub async fn reload(&self) -> Result<(), RemoteError> {
        self.client.reload().await
    }

    async fn render_and_write(
        &self,
        paths: &ConfigPaths,
        targets: &[Target],
        rules: &[AlertRule],
    ) -> Result<RenderedConfig, SyncError> {
        let guard = self.guard_for(paths);
        let _guard = guard.lock().await;

        let config = self.renderer.render(targets, rules)?;

        self.writer
            .write(&paths.scrape, config.scrape_config.clone())
            .await?;

        match &config.rule_config {
            Some(text) => self.writer.write(&paths.rules, text.clone()).await?,
            None => {
                if self.writer.remove(&paths.rules).await? {
                    tracing::info!(
                        path = %paths.rules.display(),
                        "Removed rule file, no alert rules defined"
                    );
                }
            }
        }

        tracing::info!(
            path = %paths.scrape.display(),
            targets = targets.len(),
            rules = rules.len(),
            "Configuration written"
        );
        Ok(config)
    }

    async fn reload_after_write(&self, config: RenderedConfig, paths: ConfigPaths) -> SyncOutcome {
        match self.client.reload().await {
            Ok(()) => SyncOutcome::FullySynced { config, paths },
            Err(error) => {
                tracing::warn!(
                    path = %paths.scrape.display(),
                    error = %error,
                    "Configuration written but Prometheus did not reload"
                );
                SyncOutcome::WrittenNotReloaded {
                    config,
                    paths,
                    error,
                }
            }
        }
    }

    fn guard_for(&self, paths: &ConfigPaths) -> Arc<Mutex<()>> {
        Arc::clone(self.guards.entry(paths.scrape.clone()).or_default().value())
    }
}
