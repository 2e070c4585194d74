//! Durable storage of the rendered configuration files
//!
//! Files are replaced atomically and writes to the same path are serialized,
//! so the monitoring server never rereads a half-written document.

pub mod writer;

pub use writer::{write_atomic, ConfigWriter};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

static TENANT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("tenant pattern is valid"));

/// Where the two configuration artifacts live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLayout {
    /// Base directory for all artifacts
    pub base_dir: PathBuf,
    /// Scrape configuration file name
    pub scrape_file: String,
    /// Rule-group file name, resolved next to the scrape file
    pub rules_file: String,
    /// Give every tenant its own directory under `<base>/tenants/`
    pub per_tenant: bool,
    /// Upper bound for a single file write
    pub write_timeout: Duration,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./configs"),
            scrape_file: "prometheus.yml".to_string(),
            rules_file: "alerts.yml".to_string(),
            per_tenant: true,
            write_timeout: Duration::from_secs(10),
        }
    }
}

impl OutputLayout {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    pub fn with_per_tenant(mut self, enabled: bool) -> Self {
        self.per_tenant = enabled;
        self
    }

    /// Paths shared by every caller that does not name a tenant
    pub fn shared(&self) -> ConfigPaths {
        ConfigPaths::in_dir(&self.base_dir, &self.scrape_file, &self.rules_file)
    }

    /// Paths for a tenant; falls back to the shared paths when per-tenant
    /// output is disabled
    ///
    /// Tenant files only take effect on a Prometheus whose `--config.file`
    /// points into that tenant's directory.
    pub fn for_tenant(&self, tenant: &str) -> Result<ConfigPaths, LayoutError> {
        if !TENANT_RE.is_match(tenant) {
            return Err(LayoutError::InvalidTenant(tenant.to_string()));
        }
        if !self.per_tenant {
            return Ok(self.shared());
        }
        let dir = self.base_dir.join("tenants").join(tenant);
        Ok(ConfigPaths::in_dir(&dir, &self.scrape_file, &self.rules_file))
    }

    pub fn resolve(&self, tenant: Option<&str>) -> Result<ConfigPaths, LayoutError> {
        match tenant {
            Some(tenant) => self.for_tenant(tenant),
            None => Ok(self.shared()),
        }
    }
}

/// Concrete file locations for one synchronization
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigPaths {
    pub scrape: PathBuf,
    pub rules: PathBuf,
}

impl ConfigPaths {
    fn in_dir(dir: &Path, scrape_file: &str, rules_file: &str) -> Self {
        Self {
            scrape: dir.join(scrape_file),
            rules: dir.join(rules_file),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("invalid tenant id '{0}'")]
    InvalidTenant(String),
}

/// Durable write errors
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write to {} timed out after {:?}", .path.display(), .after)]
    Timeout { path: PathBuf, after: Duration },

    #[error("write task failed: {0}")]
    Task(String),
}
