//! Per-job incremental harvest: list since watermark, select canonical
//! reports, download and materialize them as table slices.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use ytrep_adapters::{RemoteError, ReportingApi};
use ytrep_core::{
    slice_name, JobDescriptor, OwnerScope, SchemaRegistry, StateSnapshot, SubscriptionKey,
    SyncError,
};
use ytrep_storage::{RetryPolicy, TableStore};

use crate::select::select_canonical;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    NoNewReports {
        key: SubscriptionKey,
    },
    Harvested {
        key: SubscriptionKey,
        listed: usize,
        slices: usize,
        watermark: DateTime<Utc>,
    },
    Failed {
        key: SubscriptionKey,
        error: String,
    },
}

impl JobOutcome {
    pub fn key(&self) -> &SubscriptionKey {
        match self {
            Self::NoNewReports { key } | Self::Harvested { key, .. } | Self::Failed { key, .. } => key,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

pub struct Harvester<'a> {
    pub api: &'a dyn ReportingApi,
    pub tables: &'a TableStore,
    pub schemas: &'a dyn SchemaRegistry,
    pub api_retry: &'a RetryPolicy,
    pub download_retry: &'a RetryPolicy,
}

impl Harvester<'_> {
    /// Harvest every job in `snapshot`, one at a time.
    ///
    /// A failing job keeps its prior watermark and does not stop the others.
    pub async fn harvest_all(&self, snapshot: &mut StateSnapshot) -> Vec<JobOutcome> {
        let owner = snapshot.owner.clone();
        let mut outcomes = Vec::with_capacity(snapshot.jobs.len());
        for (key, job) in snapshot.jobs.iter_mut() {
            let outcome = match self.harvest_job(job, &owner).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(%key, job_id = %job.remote_job_id, error = %err, "harvest failed; watermark left unchanged");
                    JobOutcome::Failed {
                        key: key.clone(),
                        error: err.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    /// `job.watermark` is only written once every selected report is in place.
    pub async fn harvest_job(
        &self,
        job: &mut JobDescriptor,
        owner: &OwnerScope,
    ) -> Result<JobOutcome, SyncError> {
        let key = job.subscription_key.clone();
        let api = self.api;
        let job_id = job.remote_job_id.as_str();
        let since = job.watermark;

        let listed = self
            .api_retry
            .run("list reports", RemoteError::retry_disposition, || {
                api.list_reports_since(job_id, owner, since)
            })
            .await
            .map_err(|e| e.into_sync_error(format!("listing reports for {key}")).escalate())?;

        let Some(selection) = select_canonical(listed) else {
            warn!(%key, "no new reports");
            return Ok(JobOutcome::NoNewReports { key });
        };
        info!(
            %key,
            listed = selection.listed,
            selected = selection.canonical.len(),
            "harvesting reports"
        );

        let primary_key = self.schemas.dimension_columns_for(&key)?;
        let mut table = self
            .tables
            .open_table(&key, primary_key)
            .await
            .map_err(SyncError::storage)?;

        for artifact in &selection.canonical {
            let slice = slice_name(artifact.period_start);
            let staged = table.staging_path(&slice);
            let locator = artifact.download_locator.as_str();

            let bytes = self
                .download_retry
                .run("download report", RemoteError::retry_disposition, || {
                    api.download_artifact(locator, &staged)
                })
                .await
                .map_err(|e| {
                    e.into_sync_error(format!("downloading report {} for {key}", artifact.artifact_id))
                        .escalate()
                })?;

            let record = table
                .write_slice(&slice, &staged)
                .await
                .map_err(SyncError::storage)?;
            info!(%key, slice = %record.name, downloaded = bytes, written = record.bytes, "slice written");
        }

        table.finalize().await.map_err(SyncError::storage)?;

        let watermark = match job.watermark {
            Some(prior) if prior > selection.watermark => prior,
            _ => selection.watermark,
        };
        job.watermark = Some(watermark);

        Ok(JobOutcome::Harvested {
            key,
            listed: selection.listed,
            slices: selection.canonical.len(),
            watermark,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::TimeZone;
    use tempfile::tempdir;
    use ytrep_adapters::{ApiCall, InMemoryReportingApi, ScriptedFailure};
    use ytrep_core::{ReportArtifact, StaticSchemaRegistry};
    use ytrep_storage::{BackoffPolicy, RecordingSleeper};

    fn ts(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 7, day, hour, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn artifact(job_id: &str, id: &str, period_day: u32, created: DateTime<Utc>) -> ReportArtifact {
        ReportArtifact {
            artifact_id: id.to_string(),
            remote_job_id: job_id.to_string(),
            period_start: ts(period_day, 7),
            period_end: ts(period_day + 1, 7),
            created_at: created,
            download_locator: format!("mem://{job_id}/{id}"),
        }
    }

    struct Fixture {
        api: InMemoryReportingApi,
        tables: TableStore,
        api_retry: RetryPolicy,
        download_retry: RetryPolicy,
        sleeper: Arc<RecordingSleeper>,
        _dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempdir().expect("tempdir");
            let sleeper = Arc::new(RecordingSleeper::default());
            Self {
                api: InMemoryReportingApi::new(),
                tables: TableStore::new(dir.path().join("out")),
                api_retry: RetryPolicy::new(BackoffPolicy::no_retry(), sleeper.clone()),
                download_retry: RetryPolicy::new(BackoffPolicy::for_downloads(), sleeper.clone()),
                sleeper,
                _dir: dir,
            }
        }

        fn harvester(&self) -> Harvester<'_> {
            Harvester {
                api: &self.api,
                tables: &self.tables,
                schemas: &StaticSchemaRegistry,
                api_retry: &self.api_retry,
                download_retry: &self.download_retry,
            }
        }
    }

    fn job(key: &str, id: &str, watermark: Option<DateTime<Utc>>) -> JobDescriptor {
        let mut job = JobDescriptor::remote(SubscriptionKey::from(key), id, format!("ytrep_{key}"));
        job.created_by_us = true;
        job.watermark = watermark;
        job
    }

    #[tokio::test]
    async fn empty_listing_leaves_watermark_and_writes_nothing() {
        let fx = Fixture::new();
        let prior = Some(ts(10, 0));
        let mut descriptor = job("channel_basic_a2", "job-1", prior);

        let outcome = fx
            .harvester()
            .harvest_job(&mut descriptor, &OwnerScope::own_account())
            .await
            .expect("harvest");

        assert!(matches!(outcome, JobOutcome::NoNewReports { .. }));
        assert_eq!(descriptor.watermark, prior);
        assert!(!fx
            .tables
            .manifest_path(&SubscriptionKey::from("channel_basic_a2"))
            .exists());
        assert_eq!(
            fx.api.calls().await,
            vec![ApiCall::ListReports {
                job_id: "job-1".into(),
                owner: OwnerScope::own_account(),
                watermark: prior,
            }]
        );
    }

    #[tokio::test]
    async fn regenerated_reports_collapse_to_one_slice_per_period() {
        let fx = Fixture::new();
        let (t1, t2, t3) = (ts(20, 1), ts(21, 1), ts(20, 12));
        fx.api
            .publish_report(artifact("job-1", "p1-old", 1, t1), "date,views\nold,1\n")
            .await;
        fx.api
            .publish_report(artifact("job-1", "p1-new", 1, t2), "date,views\nnew,2\n")
            .await;
        fx.api
            .publish_report(artifact("job-1", "p2", 2, t3), "date,views\np2,3\n")
            .await;

        let mut descriptor = job("channel_basic_a2", "job-1", None);
        let outcome = fx
            .harvester()
            .harvest_job(&mut descriptor, &OwnerScope::own_account())
            .await
            .expect("harvest");

        assert_eq!(
            outcome,
            JobOutcome::Harvested {
                key: SubscriptionKey::from("channel_basic_a2"),
                listed: 3,
                slices: 2,
                watermark: t2,
            }
        );
        assert_eq!(descriptor.watermark, Some(t2));

        let downloads: Vec<_> = fx
            .api
            .calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                ApiCall::Download { locator } => Some(locator),
                _ => None,
            })
            .collect();
        assert_eq!(downloads, vec!["mem://job-1/p1-new", "mem://job-1/p2"]);

        let slice = fx
            .tables
            .tables_dir()
            .join("channel_basic_a2.csv")
            .join("2023-07-01T07_00_00Z.csv");
        assert_eq!(std::fs::read_to_string(slice).expect("slice"), "new,2\n");
    }

    #[tokio::test]
    async fn rate_limited_download_is_retried_on_schedule() {
        let fx = Fixture::new();
        let report = artifact("job-1", "r1", 1, ts(20, 0));
        fx.api
            .fail_downloads(&report.download_locator, ScriptedFailure::RateLimited, 2)
            .await;
        fx.api.publish_report(report, "date,views\na,1\n").await;

        let mut descriptor = job("channel_basic_a2", "job-1", None);
        let outcome = fx
            .harvester()
            .harvest_job(&mut descriptor, &OwnerScope::own_account())
            .await
            .expect("harvest");

        assert!(matches!(outcome, JobOutcome::Harvested { slices: 1, .. }));
        let waits = fx.sleeper.recorded().await;
        assert_eq!(waits.len(), 2);
        assert_eq!(waits[0], Duration::from_secs(24));
    }

    #[tokio::test]
    async fn exhausted_retries_fail_only_that_job() {
        let fx = Fixture::new();
        let doomed = artifact("job-1", "r1", 1, ts(20, 0));
        fx.api
            .fail_downloads(&doomed.download_locator, ScriptedFailure::RateLimited, 3)
            .await;
        fx.api.publish_report(doomed, "date,views\na,1\n").await;
        fx.api
            .publish_report(artifact("job-2", "r2", 1, ts(20, 0)), "date,views\nb,2\n")
            .await;

        let prior = Some(ts(2, 0));
        let mut snapshot = StateSnapshot::new(OwnerScope::own_account());
        for (key, id, watermark) in [
            ("channel_basic_a2", "job-1", prior),
            ("channel_cards_a1", "job-2", None),
        ] {
            snapshot
                .jobs
                .insert(SubscriptionKey::from(key), job(key, id, watermark));
        }

        let outcomes = fx.harvester().harvest_all(&mut snapshot).await;

        assert_eq!(outcomes.len(), 2);
        match &outcomes[0] {
            JobOutcome::Failed { key, error } => {
                assert_eq!(key.as_str(), "channel_basic_a2");
                assert!(error.contains("retries exhausted"), "{error}");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(outcomes[1], JobOutcome::Harvested { .. }));
        assert_eq!(
            snapshot.job(&SubscriptionKey::from("channel_basic_a2")).expect("job").watermark,
            prior
        );
        assert_eq!(
            snapshot.job(&SubscriptionKey::from("channel_cards_a1")).expect("job").watermark,
            Some(ts(20, 0))
        );
    }

    #[tokio::test]
    async fn non_rate_limit_download_errors_are_not_retried() {
        let fx = Fixture::new();
        let report = artifact("job-1", "r1", 1, ts(20, 0));
        fx.api
            .fail_downloads(&report.download_locator, ScriptedFailure::Http(500), 1)
            .await;
        fx.api.publish_report(report, "date,views\na,1\n").await;

        let mut descriptor = job("channel_basic_a2", "job-1", None);
        let err = fx
            .harvester()
            .harvest_job(&mut descriptor, &OwnerScope::own_account())
            .await
            .expect_err("fatal");
        assert!(matches!(err, SyncError::RemoteFatal { .. }));
        assert!(fx.sleeper.recorded().await.is_empty());
        assert_eq!(descriptor.watermark, None);
    }

    #[tokio::test]
    async fn unknown_report_type_fails_the_job() {
        let fx = Fixture::new();
        fx.api
            .publish_report(artifact("job-1", "r1", 1, ts(20, 0)), "a,b\n1,2\n")
            .await;
        let mut descriptor = job("made_up_report", "job-1", None);
        let err = fx
            .harvester()
            .harvest_job(&mut descriptor, &OwnerScope::own_account())
            .await
            .expect_err("unknown");
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn failed_listing_fails_only_that_job() {
        let fx = Fixture::new();
        fx.api.fail_list_reports("job-1", ScriptedFailure::Http(503)).await;
        fx.api
            .publish_report(artifact("job-1", "r1", 1, ts(20, 0)), "date,views\na,1\n")
            .await;
        fx.api
            .publish_report(artifact("job-2", "r2", 1, ts(20, 0)), "date,clicks\nb,2\n")
            .await;

        let prior = Some(ts(5, 0));
        let mut snapshot = StateSnapshot::new(OwnerScope::own_account());
        for (key, id, watermark) in [
            ("channel_basic_a2", "job-1", prior),
            ("channel_cards_a1", "job-2", None),
        ] {
            snapshot
                .jobs
                .insert(SubscriptionKey::from(key), job(key, id, watermark));
        }

        let outcomes = fx.harvester().harvest_all(&mut snapshot).await;

        match &outcomes[..] {
            [JobOutcome::Failed { key, error }, JobOutcome::Harvested { key: harvested, .. }] => {
                assert_eq!(key.as_str(), "channel_basic_a2");
                assert!(error.contains("503"), "{error}");
                assert_eq!(harvested.as_str(), "channel_cards_a1");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            snapshot.job(&SubscriptionKey::from("channel_basic_a2")).expect("job").watermark,
            prior
        );
        assert!(!fx
            .api
            .calls()
            .await
            .contains(&ApiCall::Download { locator: "mem://job-1/r1".into() }));
        assert!(!fx
            .tables
            .manifest_path(&SubscriptionKey::from("channel_basic_a2"))
            .exists());
    }

    #[tokio::test]
    async fn partial_download_failure_holds_watermark_until_rerun() {
        let fx = Fixture::new();
        let key = SubscriptionKey::from("channel_basic_a2");
        let first = artifact("job-1", "p1", 1, ts(20, 0));
        let second = artifact("job-1", "p2", 2, ts(21, 0));
        fx.api
            .fail_downloads(&second.download_locator, ScriptedFailure::Http(500), 1)
            .await;
        fx.api.publish_report(first, "date,views\n20230701,1\n").await;
        fx.api.publish_report(second, "date,views\n20230702,2\n").await;

        let prior = Some(ts(10, 0));
        let mut descriptor = job("channel_basic_a2", "job-1", prior);
        let err = fx
            .harvester()
            .harvest_job(&mut descriptor, &OwnerScope::own_account())
            .await
            .expect_err("second download fails");
        assert!(matches!(err, SyncError::RemoteFatal { .. }));

        let table_dir = fx.tables.tables_dir().join("channel_basic_a2.csv");
        assert!(table_dir.join("2023-07-01T07_00_00Z.csv").exists());
        assert!(!table_dir.join("2023-07-02T07_00_00Z.csv").exists());
        assert!(!fx.tables.manifest_path(&key).exists());
        assert_eq!(descriptor.watermark, prior);

        let outcome = fx
            .harvester()
            .harvest_job(&mut descriptor, &OwnerScope::own_account())
            .await
            .expect("rerun");
        assert_eq!(
            outcome,
            JobOutcome::Harvested {
                key: key.clone(),
                listed: 2,
                slices: 2,
                watermark: ts(21, 0),
            }
        );
        assert_eq!(descriptor.watermark, Some(ts(21, 0)));
        assert!(table_dir.join("2023-07-02T07_00_00Z.csv").exists());
        assert!(fx.tables.manifest_path(&key).exists());
    }

    #[tokio::test]
    async fn newer_reports_advance_a_stored_watermark() {
        let fx = Fixture::new();
        fx.api
            .publish_report(artifact("job-1", "old", 1, ts(5, 0)), "date,views\nold,1\n")
            .await;
        fx.api
            .publish_report(artifact("job-1", "new", 2, ts(15, 0)), "date,views\nnew,2\n")
            .await;

        let prior = ts(10, 0);
        let mut descriptor = job("channel_basic_a2", "job-1", Some(prior));
        let outcome = fx
            .harvester()
            .harvest_job(&mut descriptor, &OwnerScope::own_account())
            .await
            .expect("harvest");

        assert!(matches!(
            outcome,
            JobOutcome::Harvested { listed: 1, slices: 1, watermark, .. } if watermark == ts(15, 0)
        ));
        assert!(descriptor.watermark.expect("watermark") > prior);
    }

    #[tokio::test]
    async fn stale_listing_never_moves_the_watermark_back() {
        let fx = Fixture::new();
        fx.api.serve_stale_reports().await;
        fx.api
            .publish_report(artifact("job-1", "r1", 1, ts(20, 0)), "date,views\na,1\n")
            .await;

        let prior = ts(25, 0);
        let mut descriptor = job("channel_basic_a2", "job-1", Some(prior));
        let outcome = fx
            .harvester()
            .harvest_job(&mut descriptor, &OwnerScope::own_account())
            .await
            .expect("harvest");

        assert_eq!(
            outcome,
            JobOutcome::Harvested {
                key: SubscriptionKey::from("channel_basic_a2"),
                listed: 1,
                slices: 1,
                watermark: prior,
            }
        );
        assert_eq!(descriptor.watermark, Some(prior));
    }
}
