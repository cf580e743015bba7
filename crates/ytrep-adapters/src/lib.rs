//! Remote reporting collaborator: the `ReportingApi` contract, a reqwest-backed
//! client for the YouTube Reporting API, and an in-memory registry.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ytrep_core::{JobDescriptor, OwnerScope, ReportArtifact, SubscriptionKey, SyncError};
use ytrep_storage::RetryDisposition;

pub mod http;
pub mod memory;

pub use http::{HttpClientConfig, HttpReportingClient};
pub use memory::{ApiCall, InMemoryReportingApi, ScriptedFailure};

pub const CRATE_NAME: &str = "ytrep-adapters";

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("http status {status} for {url}")]
    Http { status: u16, url: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("local io failed: {0}")]
    Io(#[from] std::io::Error),
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Only rate limiting is worth waiting out; everything else fails fast.
    pub fn retry_disposition(&self) -> RetryDisposition {
        match self {
            Self::RateLimited(_) => RetryDisposition::Retryable,
            _ => RetryDisposition::NonRetryable,
        }
    }

    pub fn into_sync_error(self, context: impl Into<String>) -> SyncError {
        let context = context.into();
        let message = self.to_string();
        match self {
            Self::RateLimited(_) => SyncError::RemoteTransient { context, message },
            _ => SyncError::RemoteFatal { context, message },
        }
    }
}

/// Report type as advertised by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteReportType {
    pub id: String,
    pub name: String,
    pub system_managed: bool,
    pub deprecate_time: Option<DateTime<Utc>>,
}

/// Operations the sync core needs from the remote job registry.
///
/// Listing calls follow pagination until the service reports no further page.
#[async_trait]
pub trait ReportingApi: Send + Sync {
    async fn list_jobs(&self, owner: &OwnerScope) -> Result<Vec<JobDescriptor>, RemoteError>;

    /// Fails with `Conflict` if a job for `key` exists, `Forbidden` for system-managed types.
    async fn create_job(
        &self,
        name: &str,
        key: &SubscriptionKey,
        owner: &OwnerScope,
    ) -> Result<JobDescriptor, RemoteError>;

    async fn delete_job(&self, job_id: &str, owner: &OwnerScope) -> Result<(), RemoteError>;

    /// Reports created strictly after `watermark` (all reports when unset).
    async fn list_reports_since(
        &self,
        job_id: &str,
        owner: &OwnerScope,
        watermark: Option<DateTime<Utc>>,
    ) -> Result<Vec<ReportArtifact>, RemoteError>;

    /// Stream the artifact at `locator` into `destination`; returns bytes written.
    async fn download_artifact(&self, locator: &str, destination: &Path)
        -> Result<u64, RemoteError>;

    async fn list_report_types(
        &self,
        owner: &OwnerScope,
    ) -> Result<Vec<RemoteReportType>, RemoteError>;
}
