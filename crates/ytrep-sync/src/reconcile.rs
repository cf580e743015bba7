//! Job reconciliation: desired subscriptions + prior state + remote registry
//! -> create/delete/keep actions and the next state snapshot.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::{info, warn};
use ytrep_adapters::{RemoteError, ReportingApi};
use ytrep_core::{JobDescriptor, OwnerScope, StateSnapshot, SubscriptionKey, SyncError};
use ytrep_storage::RetryPolicy;

pub const JOB_NAME_PREFIX: &str = "ytrep_";

pub fn job_name_for(key: &SubscriptionKey) -> String {
    format!("{JOB_NAME_PREFIX}{key}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReconcileAction {
    Deleted {
        key: SubscriptionKey,
        job_id: String,
    },
    /// Delete requested but the job was already gone remotely.
    AlreadyAbsent {
        key: SubscriptionKey,
        job_id: String,
    },
    Created {
        key: SubscriptionKey,
        job_id: String,
        name: String,
    },
    /// Existing remote job matched; local progress starts fresh.
    Adopted {
        key: SubscriptionKey,
        job_id: String,
    },
    /// Same remote job as last run; prior descriptor kept verbatim.
    Kept {
        key: SubscriptionKey,
        job_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub snapshot: StateSnapshot,
    pub actions: Vec<ReconcileAction>,
}

pub struct JobReconciler<'a> {
    api: &'a dyn ReportingApi,
    retry: &'a RetryPolicy,
}

impl<'a> JobReconciler<'a> {
    pub fn new(api: &'a dyn ReportingApi, retry: &'a RetryPolicy) -> Self {
        Self { api, retry }
    }

    /// Any error aborts the run; the caller must not commit anything on `Err`.
    pub async fn reconcile(
        &self,
        desired: &[SubscriptionKey],
        owner: &OwnerScope,
        prior: &StateSnapshot,
    ) -> Result<ReconcileOutcome, SyncError> {
        let desired = dedup_preserving_order(desired);
        if desired.is_empty() {
            return Err(SyncError::configuration("no report types requested"));
        }

        let mut actions = Vec::new();
        self.delete_stale_jobs(&desired, owner, prior, &mut actions)
            .await?;

        let listed = self
            .retry
            .run("list jobs", RemoteError::retry_disposition, || {
                self.api.list_jobs(owner)
            })
            .await
            .map_err(|e| e.into_sync_error(format!("listing jobs for {owner}")).escalate())?;

        let mut jobs = BTreeMap::new();
        for key in &desired {
            let (job, created_now) = match listed.iter().find(|j| &j.subscription_key == key) {
                Some(existing) => (existing.clone(), false),
                None => {
                    let name = job_name_for(key);
                    warn!(%key, %name, "no existing job found; creating one");
                    let job = self
                        .retry
                        .run("create job", RemoteError::retry_disposition, || {
                            self.api.create_job(&name, key, owner)
                        })
                        .await
                        .map_err(|e| {
                            e.into_sync_error(format!("creating job for {key}")).escalate()
                        })?;
                    (job, true)
                }
            };

            let descriptor = match prior.job(key) {
                Some(previous) if previous.remote_job_id == job.remote_job_id => {
                    actions.push(ReconcileAction::Kept {
                        key: key.clone(),
                        job_id: job.remote_job_id.clone(),
                    });
                    previous.clone()
                }
                _ => {
                    actions.push(if created_now {
                        ReconcileAction::Created {
                            key: key.clone(),
                            job_id: job.remote_job_id.clone(),
                            name: job.display_name.clone(),
                        }
                    } else {
                        ReconcileAction::Adopted {
                            key: key.clone(),
                            job_id: job.remote_job_id.clone(),
                        }
                    });
                    JobDescriptor {
                        subscription_key: key.clone(),
                        created_by_us: created_now,
                        watermark: None,
                        ..job
                    }
                }
            };
            jobs.insert(key.clone(), descriptor);
        }

        Ok(ReconcileOutcome {
            snapshot: StateSnapshot {
                owner: owner.clone(),
                jobs,
            },
            actions,
        })
    }

    /// Remove jobs we created that are no longer wanted, or all of them when
    /// the owner changed. Jobs created out-of-band are never touched.
    async fn delete_stale_jobs(
        &self,
        desired: &[SubscriptionKey],
        owner: &OwnerScope,
        prior: &StateSnapshot,
        actions: &mut Vec<ReconcileAction>,
    ) -> Result<(), SyncError> {
        let owner_changed = prior.owner != *owner;
        if owner_changed {
            info!(previous = %prior.owner, current = %owner, "owner changed; previously created jobs are stale");
        }

        for (key, job) in &prior.jobs {
            if !job.created_by_us || (!owner_changed && desired.contains(key)) {
                continue;
            }
            info!(%key, job_id = %job.remote_job_id, "deleting job");
            let result = self
                .retry
                .run("delete job", RemoteError::retry_disposition, || {
                    self.api.delete_job(&job.remote_job_id, &prior.owner)
                })
                .await;
            match result {
                Ok(()) => actions.push(ReconcileAction::Deleted {
                    key: key.clone(),
                    job_id: job.remote_job_id.clone(),
                }),
                Err(err) if err.is_not_found() => {
                    info!(%key, job_id = %job.remote_job_id, "job already gone");
                    actions.push(ReconcileAction::AlreadyAbsent {
                        key: key.clone(),
                        job_id: job.remote_job_id.clone(),
                    });
                }
                Err(err) => {
                    return Err(err
                        .into_sync_error(format!("deleting job {} for {key}", job.remote_job_id))
                        .escalate())
                }
            }
        }
        Ok(())
    }
}

fn dedup_preserving_order(keys: &[SubscriptionKey]) -> Vec<SubscriptionKey> {
    let mut seen = HashSet::new();
    keys.iter()
        .filter(|k| seen.insert((*k).clone()))
        .cloned()
        .collect()
}
