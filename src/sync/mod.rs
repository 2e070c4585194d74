//! Render, write and reload as one operation
//!
//! A synchronization ends in exactly one of three states:
//!
//! - [`SyncOutcome::FullySynced`]: files written and the server reloaded them
//! - [`SyncOutcome::WrittenNotReloaded`]: files are durable on disk, the reload
//!   call failed; only the cheap reload step needs retrying
//! - [`SyncOutcome::Failed`]: rendering or writing failed and no reload was tried
//!
//! Nothing is retried internally.

pub mod synchronizer;

pub use synchronizer::Synchronizer;

use crate::persistence::{ConfigPaths, LayoutError, WriteError};
use crate::prometheus::RemoteError;
use crate::render::{RenderError, RenderedConfig};

#[derive(Debug)]
pub enum SyncOutcome {
    FullySynced {
        config: RenderedConfig,
        paths: ConfigPaths,
    },
    WrittenNotReloaded {
        config: RenderedConfig,
        paths: ConfigPaths,
        error: RemoteError,
    },
    Failed(SyncError),
}

impl SyncOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            SyncOutcome::FullySynced { .. } => "fully_synced",
            SyncOutcome::WrittenNotReloaded { .. } => "written_not_reloaded",
            SyncOutcome::Failed(_) => "failed",
        }
    }

    /// Rendered text, present whenever the files were written
    pub fn config(&self) -> Option<&RenderedConfig> {
        match self {
            SyncOutcome::FullySynced { config, .. }
            | SyncOutcome::WrittenNotReloaded { config, .. } => Some(config),
            SyncOutcome::Failed(_) => None,
        }
    }

    pub fn is_fully_synced(&self) -> bool {
        matches!(self, SyncOutcome::FullySynced { .. })
    }
}

/// Why a synchronization failed before reaching the reload step
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("synchronization task aborted: {0}")]
    Aborted(String),
}
