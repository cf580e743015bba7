//! In-memory job registry with call recording and scripted failures.
//!
//! Behaves like the remote service as far as the sync core can observe, except
//! that deleting an absent job surfaces `NotFound` instead of swallowing it.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::sync::Mutex;
use ytrep_core::{JobDescriptor, OwnerScope, ReportArtifact, SubscriptionKey};

use crate::{RemoteError, RemoteReportType, ReportingApi};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    ListJobs {
        owner: OwnerScope,
    },
    CreateJob {
        name: String,
        key: SubscriptionKey,
        owner: OwnerScope,
    },
    DeleteJob {
        job_id: String,
        owner: OwnerScope,
    },
    ListReports {
        job_id: String,
        owner: OwnerScope,
        watermark: Option<DateTime<Utc>>,
    },
    Download {
        locator: String,
    },
    ListReportTypes {
        owner: OwnerScope,
    },
}

/// Failure to inject into a scripted call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedFailure {
    NotFound,
    Conflict,
    Forbidden,
    RateLimited,
    Http(u16),
}

impl ScriptedFailure {
    fn into_error(self, what: &str) -> RemoteError {
        match self {
            Self::NotFound => RemoteError::NotFound(what.to_string()),
            Self::Conflict => RemoteError::Conflict(what.to_string()),
            Self::Forbidden => RemoteError::Forbidden(what.to_string()),
            Self::RateLimited => RemoteError::RateLimited(what.to_string()),
            Self::Http(status) => RemoteError::Http {
                status,
                url: what.to_string(),
            },
        }
    }
}

#[derive(Debug, Default)]
struct Registry {
    jobs: Vec<(OwnerScope, JobDescriptor)>,
    reports: BTreeMap<String, Vec<ReportArtifact>>,
    bodies: HashMap<String, Vec<u8>>,
    system_managed: HashSet<SubscriptionKey>,
    calls: Vec<ApiCall>,
    next_job_seq: u64,
    list_jobs_failure: Option<ScriptedFailure>,
    list_reports_failures: HashMap<String, ScriptedFailure>,
    delete_failures: HashMap<String, ScriptedFailure>,
    download_failures: HashMap<String, VecDeque<ScriptedFailure>>,
    ignore_created_after: bool,
}

#[derive(Debug, Default)]
pub struct InMemoryReportingApi {
    inner: Mutex<Registry>,
}

impl InMemoryReportingApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job created out-of-band (not by this tool).
    pub async fn seed_job(
        &self,
        owner: &OwnerScope,
        key: impl Into<SubscriptionKey>,
        job_id: &str,
        name: &str,
    ) -> JobDescriptor {
        let job = JobDescriptor::remote(key.into(), job_id, name);
        self.inner
            .lock()
            .await
            .jobs
            .push((owner.clone(), job.clone()));
        job
    }

    /// Drop a job behind the tool's back.
    pub async fn remove_job(&self, job_id: &str) {
        self.inner
            .lock()
            .await
            .jobs
            .retain(|(_, job)| job.remote_job_id != job_id);
    }

    pub async fn jobs(&self, owner: &OwnerScope) -> Vec<JobDescriptor> {
        self.inner
            .lock()
            .await
            .jobs
            .iter()
            .filter(|(o, _)| o == owner)
            .map(|(_, job)| job.clone())
            .collect()
    }

    pub async fn mark_system_managed(&self, key: impl Into<SubscriptionKey>) {
        self.inner.lock().await.system_managed.insert(key.into());
    }

    /// Make `artifact` listable for its job and downloadable with `body`.
    pub async fn publish_report(&self, artifact: ReportArtifact, body: impl Into<Vec<u8>>) {
        let mut inner = self.inner.lock().await;
        inner
            .bodies
            .insert(artifact.download_locator.clone(), body.into());
        inner
            .reports
            .entry(artifact.remote_job_id.clone())
            .or_default()
            .push(artifact);
    }

    /// List every published report regardless of the watermark, as a service
    /// that ignores `createdAfter` would.
    pub async fn serve_stale_reports(&self) {
        self.inner.lock().await.ignore_created_after = true;
    }

    pub async fn fail_list_jobs(&self, failure: ScriptedFailure) {
        self.inner.lock().await.list_jobs_failure = Some(failure);
    }

    pub async fn fail_list_reports(&self, job_id: &str, failure: ScriptedFailure) {
        self.inner
            .lock()
            .await
            .list_reports_failures
            .insert(job_id.to_string(), failure);
    }

    pub async fn fail_delete(&self, job_id: &str, failure: ScriptedFailure) {
        self.inner
            .lock()
            .await
            .delete_failures
            .insert(job_id.to_string(), failure);
    }

    /// Fail the next `times` downloads of `locator` with `failure`.
    pub async fn fail_downloads(&self, locator: &str, failure: ScriptedFailure, times: usize) {
        let mut inner = self.inner.lock().await;
        let queue = inner.download_failures.entry(locator.to_string()).or_default();
        queue.extend(std::iter::repeat(failure).take(times));
    }

    pub async fn calls(&self) -> Vec<ApiCall> {
        self.inner.lock().await.calls.clone()
    }

    pub async fn clear_calls(&self) {
        self.inner.lock().await.calls.clear();
    }
}

#[async_trait]
impl ReportingApi for InMemoryReportingApi {
    async fn list_jobs(&self, owner: &OwnerScope) -> Result<Vec<JobDescriptor>, RemoteError> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(ApiCall::ListJobs {
            owner: owner.clone(),
        });
        if let Some(failure) = inner.list_jobs_failure {
            return Err(failure.into_error("jobs.list"));
        }
        Ok(inner
            .jobs
            .iter()
            .filter(|(o, job)| o == owner && !inner.system_managed.contains(&job.subscription_key))
            .map(|(_, job)| job.clone())
            .collect())
    }

    async fn create_job(
        &self,
        name: &str,
        key: &SubscriptionKey,
        owner: &OwnerScope,
    ) -> Result<JobDescriptor, RemoteError> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(ApiCall::CreateJob {
            name: name.to_string(),
            key: key.clone(),
            owner: owner.clone(),
        });
        if inner.system_managed.contains(key) {
            return Err(ScriptedFailure::Forbidden.into_error(key.as_str()));
        }
        if inner
            .jobs
            .iter()
            .any(|(o, job)| o == owner && &job.subscription_key == key)
        {
            return Err(ScriptedFailure::Conflict.into_error(key.as_str()));
        }
        inner.next_job_seq += 1;
        let job_id = format!("job-{}", inner.next_job_seq);
        let job = JobDescriptor::remote(key.clone(), job_id, name);
        inner.jobs.push((owner.clone(), job.clone()));
        Ok(job)
    }

    async fn delete_job(&self, job_id: &str, owner: &OwnerScope) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(ApiCall::DeleteJob {
            job_id: job_id.to_string(),
            owner: owner.clone(),
        });
        if let Some(failure) = inner.delete_failures.get(job_id).copied() {
            return Err(failure.into_error(job_id));
        }
        let before = inner.jobs.len();
        inner
            .jobs
            .retain(|(o, job)| !(o == owner && job.remote_job_id == job_id));
        if inner.jobs.len() == before {
            return Err(ScriptedFailure::NotFound.into_error(job_id));
        }
        Ok(())
    }

    async fn list_reports_since(
        &self,
        job_id: &str,
        owner: &OwnerScope,
        watermark: Option<DateTime<Utc>>,
    ) -> Result<Vec<ReportArtifact>, RemoteError> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(ApiCall::ListReports {
            job_id: job_id.to_string(),
            owner: owner.clone(),
            watermark,
        });
        if let Some(failure) = inner.list_reports_failures.get(job_id).copied() {
            return Err(failure.into_error(job_id));
        }
        let watermark = watermark.filter(|_| !inner.ignore_created_after);
        Ok(inner
            .reports
            .get(job_id)
            .map(|reports| {
                reports
                    .iter()
                    .filter(|r| watermark.map_or(true, |w| r.created_at > w))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn download_artifact(
        &self,
        locator: &str,
        destination: &Path,
    ) -> Result<u64, RemoteError> {
        let body = {
            let mut inner = self.inner.lock().await;
            inner.calls.push(ApiCall::Download {
                locator: locator.to_string(),
            });
            if let Some(failure) = inner
                .download_failures
                .get_mut(locator)
                .and_then(VecDeque::pop_front)
            {
                return Err(failure.into_error(locator));
            }
            inner
                .bodies
                .get(locator)
                .cloned()
                .ok_or_else(|| ScriptedFailure::NotFound.into_error(locator))?
        };
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(destination, &body).await?;
        Ok(body.len() as u64)
    }

    async fn list_report_types(
        &self,
        owner: &OwnerScope,
    ) -> Result<Vec<RemoteReportType>, RemoteError> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(ApiCall::ListReportTypes {
            owner: owner.clone(),
        });
        Ok(ytrep_core::REPORT_TYPES
            .iter()
            .map(|schema| RemoteReportType {
                id: schema.id.to_string(),
                name: schema.id.to_string(),
                system_managed: inner
                    .system_managed
                    .contains(&SubscriptionKey::from(schema.id)),
                deprecate_time: None,
            })
            .collect())
    }
}
