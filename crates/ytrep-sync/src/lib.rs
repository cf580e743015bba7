//! Sync pipeline orchestration: configuration, job reconciliation, report
//! harvest, state commit and the optional cron scheduler.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use ytrep_adapters::{HttpClientConfig, HttpReportingClient, ReportingApi};
use ytrep_core::{OwnerScope, SchemaRegistry, StaticSchemaRegistry, SubscriptionKey, SyncError};
use ytrep_storage::{BackoffPolicy, RetryPolicy, StateStore, TableStore};

pub mod harvest;
pub mod reconcile;
pub mod select;

pub use harvest::{Harvester, JobOutcome};
pub use reconcile::{
    job_name_for, JobReconciler, ReconcileAction, ReconcileOutcome, JOB_NAME_PREFIX,
};
pub use select::{select_canonical, Selection};

pub const CRATE_NAME: &str = "ytrep-sync";

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub data_dir: PathBuf,
    pub config_path: PathBuf,
    pub api_base_url: String,
    pub access_token: Option<String>,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub scheduler_enabled: bool,
    pub sync_cron: String,
}

impl SyncConfig {
    pub fn from_env() -> Self {
        let data_dir = std::env::var("YTREP_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        let mut config = Self::for_data_dir(data_dir);
        if let Ok(path) = std::env::var("YTREP_CONFIG") {
            config.config_path = PathBuf::from(path);
        }
        if let Ok(url) = std::env::var("YTREP_API_BASE_URL") {
            config.api_base_url = url;
        }
        config.access_token = std::env::var("YTREP_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());
        config.http_timeout_secs = std::env::var("YTREP_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.http_timeout_secs);
        if let Ok(user_agent) = std::env::var("YTREP_USER_AGENT") {
            config.user_agent = user_agent;
        }
        config.scheduler_enabled = std::env::var("YTREP_SCHEDULER_ENABLED")
            .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "True"))
            .unwrap_or(false);
        if let Ok(cron) = std::env::var("YTREP_SYNC_CRON") {
            config.sync_cron = cron;
        }
        config
    }

    /// Defaults rooted at `data_dir`, ignoring the environment.
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            config_path: data_dir.join("config.yaml"),
            data_dir,
            api_base_url: ytrep_adapters::http::DEFAULT_BASE_URL.to_string(),
            access_token: None,
            http_timeout_secs: 60,
            user_agent: "ytrep/0.1".to_string(),
            scheduler_enabled: false,
            sync_cron: "0 0 6 * * *".to_string(),
        }
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join("state.json")
    }

    pub fn out_dir(&self) -> PathBuf {
        self.data_dir.join("out")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.data_dir.join("reports")
    }
}

/// The desired-subscription document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubscriptionConfig {
    #[serde(default)]
    pub report_types: Vec<String>,
    #[serde(default)]
    pub on_behalf_of_content_owner: bool,
    #[serde(default)]
    pub content_owner_id: String,
    #[serde(default)]
    pub debug: bool,
}

/// Validated subscriptions, ready for reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredSubscriptions {
    pub keys: Vec<SubscriptionKey>,
    pub owner: OwnerScope,
}

impl SubscriptionConfig {
    pub async fn load(path: &Path) -> Result<Self, SyncError> {
        let text = fs::read_to_string(path).await.map_err(|e| {
            SyncError::configuration(format!("reading {}: {e}", path.display()))
        })?;
        Self::parse(&text)
            .map_err(|e| SyncError::configuration(format!("{} in {}", e, path.display())))
    }

    pub fn parse(text: &str) -> Result<Self, SyncError> {
        serde_yaml::from_str(text)
            .map_err(|e| SyncError::configuration(format!("invalid subscription document: {e}")))
    }

    /// Checked before any remote call is made.
    pub fn validate(&self, schemas: &dyn SchemaRegistry) -> Result<DesiredSubscriptions, SyncError> {
        if self.report_types.is_empty() {
            return Err(SyncError::configuration("report_types must list at least one report type"));
        }
        let owner = if self.on_behalf_of_content_owner {
            let id = self.content_owner_id.trim();
            if id.is_empty() {
                return Err(SyncError::configuration(
                    "on_behalf_of_content_owner is set but content_owner_id is empty",
                ));
            }
            OwnerScope::delegated(id)
        } else {
            OwnerScope::own_account()
        };

        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for raw in &self.report_types {
            let key = SubscriptionKey::new(raw.trim());
            if schemas.lookup(&key).is_none() {
                return Err(SyncError::configuration(format!("unknown report type `{key}`")));
            }
            if seen.insert(key.clone()) {
                keys.push(key);
            }
        }
        Ok(DesiredSubscriptions { keys, owner })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    PartiallySucceeded,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncRunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub owner: OwnerScope,
    pub status: RunStatus,
    pub actions: Vec<ReconcileAction>,
    pub outcomes: Vec<JobOutcome>,
    pub state_path: String,
    pub summary_path: String,
}

impl SyncRunSummary {
    pub fn harvested(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, JobOutcome::Harvested { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }
}

pub struct SyncPipeline {
    config: SyncConfig,
    api: Arc<dyn ReportingApi>,
    schemas: Arc<dyn SchemaRegistry>,
    state: StateStore,
    tables: TableStore,
    api_retry: RetryPolicy,
    download_retry: RetryPolicy,
    run_lock: Mutex<()>,
}

impl SyncPipeline {
    pub fn new(config: SyncConfig) -> Result<Self> {
        let client = HttpReportingClient::new(HttpClientConfig {
            base_url: config.api_base_url.clone(),
            access_token: config.access_token.clone(),
            timeout: Duration::from_secs(config.http_timeout_secs),
            user_agent: Some(config.user_agent.clone()),
        })
        .context("building reporting api client")?;
        Ok(Self::with_api(config, Arc::new(client)))
    }

    pub fn with_api(config: SyncConfig, api: Arc<dyn ReportingApi>) -> Self {
        Self {
            state: StateStore::new(config.state_path()),
            tables: TableStore::new(config.out_dir()),
            config,
            api,
            schemas: Arc::new(StaticSchemaRegistry),
            api_retry: RetryPolicy::with_tokio(BackoffPolicy::default()),
            download_retry: RetryPolicy::with_tokio(BackoffPolicy::for_downloads()),
            run_lock: Mutex::new(()),
        }
    }

    pub fn with_retry_policies(mut self, api_retry: RetryPolicy, download_retry: RetryPolicy) -> Self {
        self.api_retry = api_retry;
        self.download_retry = download_retry;
        self
    }

    pub fn with_schema_registry(mut self, schemas: Arc<dyn SchemaRegistry>) -> Self {
        self.schemas = schemas;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn api(&self) -> &dyn ReportingApi {
        self.api.as_ref()
    }

    pub fn state_store(&self) -> &StateStore {
        &self.state
    }

    /// One full pass. A reconciliation failure returns an error and leaves
    /// the committed state untouched; harvest failures only mark their job.
    pub async fn run_once(&self) -> Result<SyncRunSummary> {
        let _running = self.run_lock.lock().await;
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();

        let desired = SubscriptionConfig::load(&self.config.config_path)
            .await?
            .validate(self.schemas.as_ref())?;
        info!(%run_id, owner = %desired.owner, subscriptions = desired.keys.len(), "sync run started");

        let prior = self.state.load().await;
        debug!(state = ?prior, "loaded state");

        let reconciled = JobReconciler::new(self.api.as_ref(), &self.api_retry)
            .reconcile(&desired.keys, &desired.owner, &prior)
            .await?;
        let mut snapshot = reconciled.snapshot;

        let harvester = Harvester {
            api: self.api.as_ref(),
            tables: &self.tables,
            schemas: self.schemas.as_ref(),
            api_retry: &self.api_retry,
            download_retry: &self.download_retry,
        };
        let outcomes = harvester.harvest_all(&mut snapshot).await;

        self.state
            .commit(&snapshot)
            .await
            .context("committing sync state")?;
        debug!(state = ?snapshot, "committed state");

        let status = if outcomes.iter().any(JobOutcome::is_failed) {
            RunStatus::PartiallySucceeded
        } else {
            RunStatus::Succeeded
        };
        let summary_dir = self.config.reports_dir().join(run_id.to_string());
        let summary = SyncRunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            owner: snapshot.owner.clone(),
            status,
            actions: reconciled.actions,
            outcomes,
            state_path: self.state.path().display().to_string(),
            summary_path: summary_dir.join("run_summary.json").display().to_string(),
        };
        self.write_summary(&summary_dir, &summary).await?;

        match summary.status {
            RunStatus::Succeeded => info!(%run_id, harvested = summary.harvested(), "sync run finished"),
            RunStatus::PartiallySucceeded => {
                let failed: Vec<&str> = summary
                    .outcomes
                    .iter()
                    .filter(|o| o.is_failed())
                    .map(|o| o.key().as_str())
                    .collect();
                warn!(%run_id, failed = ?failed, "sync run partially succeeded; failed jobs keep their previous watermark");
            }
        }
        Ok(summary)
    }

    async fn write_summary(&self, dir: &Path, summary: &SyncRunSummary) -> Result<()> {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
        let bytes = serde_json::to_vec_pretty(summary).context("serializing run summary")?;
        fs::write(&summary.summary_path, bytes)
            .await
            .with_context(|| format!("writing {}", summary.summary_path))
    }

    pub async fn maybe_build_scheduler(self: &Arc<Self>) -> Result<Option<JobScheduler>> {
        if !self.config.scheduler_enabled {
            return Ok(None);
        }

        let sched = JobScheduler::new().await.context("creating scheduler")?;
        let pipeline = Arc::clone(self);
        let cron = self.config.sync_cron.clone();
        let job = Job::new_async(cron.as_str(), move |_uuid, _l| {
            let pipeline = Arc::clone(&pipeline);
            Box::pin(async move {
                if let Err(err) = pipeline.run_once().await {
                    error!("scheduled sync run failed: {err:#}");
                }
            })
        })
        .with_context(|| format!("creating scheduler job for cron {cron}"))?;
        sched.add(job).await.context("adding scheduler job")?;
        Ok(Some(sched))
    }

    /// Run on the configured cron schedule until Ctrl-C.
    pub async fn run_scheduled(self: Arc<Self>) -> Result<()> {
        let Some(mut sched) = self.maybe_build_scheduler().await? else {
            return Err(SyncError::configuration(
                "scheduler is disabled; set YTREP_SCHEDULER_ENABLED=true",
            )
            .into());
        };
        sched.start().await.context("starting scheduler")?;
        info!(cron = %self.config.sync_cron, "scheduler running; press Ctrl-C to stop");
        tokio::signal::ctrl_c()
            .await
            .context("waiting for shutdown signal")?;
        info!("shutting down scheduler");
        sched.shutdown().await.context("stopping scheduler")?;
        Ok(())
    }
}

pub async fn run_sync_once_from_env() -> Result<SyncRunSummary> {
    let pipeline = SyncPipeline::new(SyncConfig::from_env())?;
    pipeline.run_once().await
}
