//! Reconciliation state document: loaded leniently, committed atomically.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tokio::fs;
use tracing::{debug, warn};
use ytrep_core::{parse_timestamp, JobDescriptor, OwnerScope, StateSnapshot, SubscriptionKey};

use crate::write_atomic;

const OWNER_FIELD: &str = "onBehalfOfContentOwner";
const JOBS_FIELD: &str = "jobs";

#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the last committed snapshot.
    ///
    /// Never fails: a missing or unreadable document, a missing owner or job
    /// map, and damaged job fields all fall back to defaults. Job entries
    /// without an id are dropped.
    pub async fn load(&self) -> StateSnapshot {
        let text = match fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no state document yet; starting empty");
                return StateSnapshot::default();
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "state document unreadable; starting empty");
                return StateSnapshot::default();
            }
        };

        let value: JsonValue = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "state document is not valid JSON; starting empty");
                return StateSnapshot::default();
            }
        };

        let snapshot = snapshot_from_value(&value);
        debug!(owner = %snapshot.owner, jobs = snapshot.jobs.len(), "loaded state snapshot");
        snapshot
    }

    /// Persist `snapshot` as a whole; on failure the previous document stays in place.
    pub async fn commit(&self, snapshot: &StateSnapshot) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec_pretty(snapshot).context("serializing state snapshot")?;
        write_atomic(&self.path, &bytes)
            .await
            .with_context(|| format!("committing state to {}", self.path.display()))
    }
}

fn snapshot_from_value(value: &JsonValue) -> StateSnapshot {
    let Some(object) = value.as_object() else {
        warn!("state document is not an object; starting empty");
        return StateSnapshot::default();
    };

    let owner = OwnerScope::from_optional(object.get(OWNER_FIELD).and_then(JsonValue::as_str));

    let mut jobs = BTreeMap::new();
    if let Some(entries) = object.get(JOBS_FIELD).and_then(JsonValue::as_object) {
        for (key, entry) in entries {
            if let Some(job) = job_from_entry(key, entry) {
                jobs.insert(SubscriptionKey::new(key.as_str()), job);
            }
        }
    }

    StateSnapshot { owner, jobs }.normalized()
}

/// Salvage what a job entry carries; only an entry without a job id is dropped.
///
/// A damaged field falls back to its default and the rest of the entry is kept.
fn job_from_entry(key: &str, entry: &JsonValue) -> Option<JobDescriptor> {
    let Some(id) = entry
        .get("id")
        .and_then(JsonValue::as_str)
        .filter(|id| !id.is_empty())
    else {
        warn!(%key, "dropping job entry without an id from state");
        return None;
    };
    let text = |field: &str| entry.get(field).and_then(JsonValue::as_str);

    let mut job = JobDescriptor::remote(
        SubscriptionKey::new(text("reportTypeId").unwrap_or_default()),
        id,
        text("name").unwrap_or_default(),
    );
    job.created_by_us = match entry.get("created") {
        None | Some(JsonValue::Null) => false,
        Some(JsonValue::Bool(created)) => *created,
        Some(other) => {
            warn!(%key, value = %other, "unreadable `created` flag in state; treating job as foreign");
            false
        }
    };
    job.remote_created_at = timestamp_field(key, entry, "createTime");
    job.watermark = timestamp_field(key, entry, "lastReportCreateTime");
    Some(job)
}

fn timestamp_field(key: &str, entry: &JsonValue, field: &str) -> Option<DateTime<Utc>> {
    match entry.get(field)? {
        JsonValue::Null => None,
        JsonValue::String(raw) => match parse_timestamp(raw) {
            Ok(ts) => Some(ts),
            Err(err) => {
                warn!(%key, field, raw = %raw, error = %err, "unreadable timestamp in state; resetting it");
                None
            }
        },
        other => {
            warn!(%key, field, value = %other, "unreadable timestamp in state; resetting it");
            None
        }
    }
}
