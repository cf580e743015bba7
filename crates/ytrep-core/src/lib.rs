//! Core domain model for ytrep: subscriptions, remote jobs, report artifacts and
//! the reconciliation state persisted between runs.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod report_types;

pub use report_types::REPORT_TYPES;

pub const CRATE_NAME: &str = "ytrep-core";

/// Identifier of a desired report category (a remote "report type id").
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionKey(String);

impl SubscriptionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubscriptionKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SubscriptionKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Owner qualifier partitioning the remote job registry.
///
/// The empty value means "the caller's own account". An unset owner and an
/// empty owner are the same scope, so comparisons are plain value equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerScope(String);

impl OwnerScope {
    pub fn own_account() -> Self {
        Self(String::new())
    }

    pub fn delegated(owner_id: impl Into<String>) -> Self {
        Self(owner_id.into())
    }

    pub fn from_optional(owner_id: Option<&str>) -> Self {
        Self(owner_id.unwrap_or_default().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_own_account(&self) -> bool {
        self.0.is_empty()
    }

    /// Value to send as the owner request parameter, if any.
    pub fn as_param(&self) -> Option<&str> {
        if self.0.is_empty() {
            None
        } else {
            Some(&self.0)
        }
    }
}

impl fmt::Display for OwnerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<own account>")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// A remote job together with the local progress tracked for it.
///
/// Field names on the wire follow the state document layout used by earlier
/// releases so old snapshots keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    #[serde(rename = "reportTypeId", default)]
    pub subscription_key: SubscriptionKey,
    #[serde(rename = "id")]
    pub remote_job_id: String,
    #[serde(rename = "name", default)]
    pub display_name: String,
    #[serde(rename = "created", default)]
    pub created_by_us: bool,
    #[serde(rename = "createTime", default, skip_serializing_if = "Option::is_none")]
    pub remote_created_at: Option<DateTime<Utc>>,
    #[serde(
        rename = "lastReportCreateTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub watermark: Option<DateTime<Utc>>,
}

impl JobDescriptor {
    /// Descriptor for a job as reported by the remote registry, with no local progress.
    pub fn remote(
        subscription_key: SubscriptionKey,
        remote_job_id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_key,
            remote_job_id: remote_job_id.into(),
            display_name: display_name.into(),
            created_by_us: false,
            remote_created_at: None,
            watermark: None,
        }
    }
}

/// One generated report for a job and reporting period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportArtifact {
    pub artifact_id: String,
    pub remote_job_id: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub download_locator: String,
}

/// Full reconciliation state carried between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(rename = "onBehalfOfContentOwner", default)]
    pub owner: OwnerScope,
    #[serde(default)]
    pub jobs: BTreeMap<SubscriptionKey, JobDescriptor>,
}

impl StateSnapshot {
    pub fn new(owner: OwnerScope) -> Self {
        Self {
            owner,
            jobs: BTreeMap::new(),
        }
    }

    pub fn job(&self, key: &SubscriptionKey) -> Option<&JobDescriptor> {
        self.jobs.get(key)
    }

    /// Fill descriptor keys that older documents left implicit in the map key.
    pub fn normalized(mut self) -> Self {
        for (key, job) in self.jobs.iter_mut() {
            if job.subscription_key.is_empty() {
                job.subscription_key = key.clone();
            }
        }
        self
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("transient remote failure while {context}: {message}")]
    RemoteTransient { context: String, message: String },
    #[error("remote call failed while {context}: {message}")]
    RemoteFatal { context: String, message: String },
    #[error("storage failure: {0}")]
    Storage(#[source] BoxError),
}

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

impl SyncError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn storage(err: impl Into<BoxError>) -> Self {
        Self::Storage(err.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// A transient failure that outlived its retries becomes fatal.
    pub fn escalate(self) -> Self {
        match self {
            Self::RemoteTransient { context, message } => Self::RemoteFatal {
                context,
                message: format!("retries exhausted: {message}"),
            },
            other => other,
        }
    }
}

/// Schema metadata for one report type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportTypeSchema {
    pub id: &'static str,
    pub dimensions: &'static [&'static str],
    pub metrics: &'static [&'static str],
}

/// Lookup of the dimension columns that key each subscription's output table.
pub trait SchemaRegistry: Send + Sync {
    fn lookup(&self, key: &SubscriptionKey) -> Option<ReportTypeSchema>;

    fn dimension_columns_for(&self, key: &SubscriptionKey) -> Result<Vec<String>, SyncError> {
        self.lookup(key)
            .map(|schema| schema.dimensions.iter().map(|c| c.to_string()).collect())
            .ok_or_else(|| SyncError::configuration(format!("unknown report type `{key}`")))
    }
}

/// Registry backed by the compiled-in [`REPORT_TYPES`] table.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSchemaRegistry;

impl StaticSchemaRegistry {
    pub fn all(&self) -> &'static [ReportTypeSchema] {
        REPORT_TYPES
    }
}

impl SchemaRegistry for StaticSchemaRegistry {
    fn lookup(&self, key: &SubscriptionKey) -> Option<ReportTypeSchema> {
        REPORT_TYPES.iter().find(|s| s.id == key.as_str()).copied()
    }
}

/// RFC 3339 rendering used for watermarks and remote filters (`Z` suffix, shortest exact fraction).
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|ts| ts.with_timezone(&Utc))
}

/// Filesystem-safe slice name for a reporting period start.
pub fn slice_name(period_start: DateTime<Utc>) -> String {
    format_timestamp(period_start).replace(':', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_unset_owner_are_the_same_scope() {
        assert_eq!(OwnerScope::from_optional(None), OwnerScope::own_account());
        assert_eq!(OwnerScope::from_optional(Some("")), OwnerScope::own_account());
        assert_ne!(OwnerScope::delegated("CMS1"), OwnerScope::own_account());
        assert_eq!(OwnerScope::own_account().as_param(), None);
        assert_eq!(OwnerScope::delegated("CMS1").as_param(), Some("CMS1"));
    }

    #[test]
    fn legacy_state_document_loads_with_defaults() {
        let snapshot: StateSnapshot = serde_json::from_str("{}").expect("empty doc");
        assert_eq!(snapshot, StateSnapshot::default());

        let raw = r#"{
            "jobs": {
                "channel_basic_a2": {
                    "id": "7a25fac7",
                    "name": "ytrep_channel_basic_a2",
                    "created": true,
                    "lastReportCreateTime": "2023-07-31T04:47:02.012627Z"
                }
            }
        }"#;
        let snapshot: StateSnapshot = serde_json::from_str::<StateSnapshot>(raw)
            .expect("legacy doc")
            .normalized();
        let key = SubscriptionKey::from("channel_basic_a2");
        let job = snapshot.job(&key).expect("job present");
        assert!(snapshot.owner.is_own_account());
        assert_eq!(job.subscription_key, key);
        assert!(job.created_by_us);
        assert_eq!(
            job.watermark.map(format_timestamp).as_deref(),
            Some("2023-07-31T04:47:02.012627Z")
        );
    }

    #[test]
    fn state_round_trips_in_legacy_field_names() {
        let mut snapshot = StateSnapshot::new(OwnerScope::delegated("CMS1"));
        let key = SubscriptionKey::from("channel_cards_a1");
        let mut job = JobDescriptor::remote(key.clone(), "job-1", "ytrep_channel_cards_a1");
        job.created_by_us = true;
        snapshot.jobs.insert(key, job);

        let value = serde_json::to_value(&snapshot).expect("serialize");
        assert_eq!(value["onBehalfOfContentOwner"], "CMS1");
        assert_eq!(value["jobs"]["channel_cards_a1"]["id"], "job-1");
        assert_eq!(value["jobs"]["channel_cards_a1"]["created"], true);
        assert!(value["jobs"]["channel_cards_a1"]
            .get("lastReportCreateTime")
            .is_none());
    }

    #[test]
    fn exhausted_transient_errors_escalate() {
        let err = SyncError::RemoteTransient {
            context: "downloading".into(),
            message: "quota".into(),
        }
        .escalate();
        match err {
            SyncError::RemoteFatal { message, .. } => assert_eq!(message, "retries exhausted: quota"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(SyncError::configuration("x").escalate().is_configuration());
    }

    #[test]
    fn slice_names_replace_colons() {
        let ts = parse_timestamp("2023-07-29T07:00:00Z").expect("ts");
        assert_eq!(slice_name(ts), "2023-07-29T07_00_00Z");
    }

    #[test]
    fn static_registry_knows_dimension_columns() {
        let registry = StaticSchemaRegistry;
        let dims = registry
            .dimension_columns_for(&SubscriptionKey::from("channel_basic_a2"))
            .expect("known type");
        assert_eq!(
            dims,
            vec![
                "date",
                "channel_id",
                "video_id",
                "live_or_on_demand",
                "subscribed_status",
                "country_code"
            ]
        );

        let err = registry
            .dimension_columns_for(&SubscriptionKey::from("no_such_report"))
            .expect_err("unknown type");
        assert!(err.is_configuration());
    }

    #[test]
    fn registry_metrics_are_clean() {
        for schema in REPORT_TYPES {
            assert!(!schema.dimensions.is_empty(), "{} has no dimensions", schema.id);
            for name in schema.dimensions.iter().chain(schema.metrics.iter()) {
                assert_eq!(name.trim(), *name, "{} has padded column {name:?}", schema.id);
                assert!(!name.is_empty());
            }
        }
    }
}
