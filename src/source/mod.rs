//! Read-only snapshots of the persisted scrape targets and alert rules

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::model::{AlertRule, Target};

/// Immutable copy of one tenant's records, newest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub targets: Vec<Target>,
    pub rules: Vec<AlertRule>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty() && self.rules.is_empty()
    }
}

/// Source of the records a synchronization renders
pub trait RecordSource: Send + Sync {
    fn snapshot(&self, tenant: &str) -> Result<Snapshot, SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("unknown tenant '{0}'")]
    UnknownTenant(String),
}

#[derive(Debug, Clone)]
struct Stamped<T> {
    record: T,
    created_at: DateTime<Utc>,
    seq: u64,
}

#[derive(Debug, Default)]
struct TenantRecords {
    targets: Vec<Stamped<Target>>,
    rules: Vec<Stamped<AlertRule>>,
}

/// In-process record store keyed by tenant
#[derive(Debug, Default)]
pub struct MemorySource {
    tenants: DashMap<String, TenantRecords>,
    seq: AtomicU64,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all records of a tenant
    ///
    /// Both lists are taken newest first, the order `snapshot` returns them in.
    pub fn replace(&self, tenant: &str, targets: Vec<Target>, rules: Vec<AlertRule>) {
        let now = Utc::now();
        let records = TenantRecords {
            targets: self.stamp_batch(targets, now),
            rules: self.stamp_batch(rules, now),
        };
        self.tenants.insert(tenant.to_string(), records);
        tracing::debug!(tenant, "Tenant records replaced");
    }

    pub fn add_target(&self, tenant: &str, target: Target) {
        let stamped = self.stamp(target, Utc::now());
        self.tenants
            .entry(tenant.to_string())
            .or_default()
            .targets
            .push(stamped);
    }

    pub fn add_rule(&self, tenant: &str, rule: AlertRule) {
        let stamped = self.stamp(rule, Utc::now());
        self.tenants
            .entry(tenant.to_string())
            .or_default()
            .rules
            .push(stamped);
    }

    pub fn remove_tenant(&self, tenant: &str) -> bool {
        self.tenants.remove(tenant).is_some()
    }

    pub fn tenants(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tenants.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    fn stamp<T>(&self, record: T, created_at: DateTime<Utc>) -> Stamped<T> {
        Stamped {
            record,
            created_at,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
        }
    }

    fn stamp_batch<T>(&self, records: Vec<T>, created_at: DateTime<Utc>) -> Vec<Stamped<T>> {
        // first element is the newest, so it gets the highest sequence number
        let mut stamped: Vec<Stamped<T>> = records
            .into_iter()
            .rev()
            .map(|record| self.stamp(record, created_at))
            .collect();
        stamped.reverse();
        stamped
    }
}

fn newest_first<T: Clone>(records: &[Stamped<T>]) -> Vec<T> {
    let mut sorted: Vec<&Stamped<T>> = records.iter().collect();
    sorted.sort_by(|a, b| (b.created_at, b.seq).cmp(&(a.created_at, a.seq)));
    sorted.into_iter().map(|s| s.record.clone()).collect()
}

impl RecordSource for MemorySource {
    fn snapshot(&self, tenant: &str) -> Result<Snapshot, SourceError> {
        let records = self
            .tenants
            .get(tenant)
            .ok_or_else(|| SourceError::UnknownTenant(tenant.to_string()))?;

        Ok(Snapshot {
            targets: newest_first(&records.targets),
            rules: newest_first(&records.rules),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_is_newest_first() {
        let source = MemorySource::new();
        source.add_target("team", Target::new("first", ["10.0.0.1:9100"]));
        source.add_target("team", Target::new("second", ["10.0.0.2:9100"]));
        source.add_rule("team", AlertRule::new("Old", "up == 0"));
        source.add_rule("team", AlertRule::new("New", "up == 0"));

        let snapshot = source.snapshot("team").unwrap();
        let jobs: Vec<&str> = snapshot.targets.iter().map(|t| t.job_name.as_str()).collect();
        assert_eq!(jobs, vec!["second", "first"]);
        assert_eq!(snapshot.rules[0].alert_name, "New");
    }

    #[test]
    fn test_replace_keeps_given_order() {
        let source = MemorySource::new();
        source.add_target("team", Target::new("stale", ["10.0.0.9:9100"]));
        source.replace(
            "team",
            vec![
                Target::new("a", ["10.0.0.1:1"]),
                Target::new("b", ["10.0.0.2:2"]),
                Target::new("c", ["10.0.0.3:3"]),
            ],
            vec![],
        );

        let snapshot = source.snapshot("team").unwrap();
        let jobs: Vec<&str> = snapshot.targets.iter().map(|t| t.job_name.as_str()).collect();
        assert_eq!(jobs, vec!["a", "b", "c"]);
        assert!(snapshot.rules.is_empty());
    }

    #[test]
    fn test_unknown_tenant() {
        let source = MemorySource::new();
        assert_eq!(
            source.snapshot("nobody"),
            Err(SourceError::UnknownTenant("nobody".to_string()))
        );

        source.replace("empty", vec![], vec![]);
        assert!(source.snapshot("empty").unwrap().is_empty());
        assert_eq!(source.tenants(), vec!["empty".to_string()]);
        assert!(source.remove_tenant("empty"));
        assert!(!source.remove_tenant("empty"));
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let source = MemorySource::new();
        source.add_target("team", Target::new("a", ["10.0.0.1:1"]));
        let before = source.snapshot("team").unwrap();
        source.add_target("team", Target::new("b", ["10.0.0.2:2"]));
        assert_eq!(before.targets.len(), 1);
        assert_eq!(source.snapshot("team").unwrap().targets.len(), 2);
    }
}
