//! promconf: Prometheus configuration compiler and live-reload synchronizer
//!
//! Turns scrape-target and alert-rule records into the two Prometheus
//! configuration documents, writes them atomically and asks the server to
//! reload them.
//!
//! # Features
//!
//! - **Deterministic rendering**: same input, byte-identical YAML, every
//!   free-text value escaped
//! - **Atomic writes**: temp file, fsync and rename, serialized per path
//! - **Tri-state outcome**: fully synced, written but not reloaded, or failed
//! - **Per-tenant output**: each tenant gets its own pair of files
//! - **Prometheus pass-through**: reload, loaded config, alerts, queries
//!
//! # Example
//!
//! ```no_run
//! use promconf::model::{AlertRule, Target};
//! use promconf::persistence::OutputLayout;
//! use promconf::prometheus::{ClientSettings, PrometheusClient};
//! use promconf::render::RenderSettings;
//! use promconf::sync::{SyncOutcome, Synchronizer};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PrometheusClient::new(ClientSettings::new("http://localhost:9090"))?;
//! let sync = Synchronizer::new(
//!     RenderSettings::default(),
//!     OutputLayout::new("/etc/prometheus"),
//!     client,
//! );
//!
//! let targets = vec![Target::new("node", ["10.0.0.1:9100"])];
//! let rules = vec![AlertRule::new("InstanceDown", "up == 0")];
//!
//! match sync.synchronize(targets, rules).await {
//!     SyncOutcome::FullySynced { .. } => println!("live"),
//!     SyncOutcome::WrittenNotReloaded { error, .. } => println!("on disk, reload failed: {}", error),
//!     SyncOutcome::Failed(e) => println!("nothing changed: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod model;
pub mod persistence;
pub mod prometheus;
pub mod render;
pub mod source;
pub mod sync;

// Re-export commonly used types
pub use config::AppConfig;
pub use model::{AlertRule, ModelError, RelabelAction, RelabelConfig, Target};
pub use render::{RenderError, RenderSettings, RenderedConfig, Renderer};
pub use sync::{SyncError, SyncOutcome, Synchronizer};
