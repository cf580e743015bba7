//! reqwest client for the YouTube Reporting API v1.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;
use ytrep_core::{
    format_timestamp, parse_timestamp, JobDescriptor, OwnerScope, ReportArtifact, SubscriptionKey,
};

use crate::{RemoteError, RemoteReportType, ReportingApi};

pub const DEFAULT_BASE_URL: &str = "https://youtubereporting.googleapis.com/v1";

const OWNER_PARAM: &str = "onBehalfOfContentOwner";
const PAGE_TOKEN_PARAM: &str = "pageToken";

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub base_url: String,
    /// Bearer token; obtaining and refreshing it happens outside this crate.
    pub access_token: Option<String>,
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token: None,
            timeout: Duration::from_secs(60),
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpReportingClient {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobResource {
    id: String,
    report_type_id: String,
    #[serde(default)]
    name: String,
    create_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListJobsResponse {
    #[serde(default)]
    jobs: Vec<JobResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportResource {
    id: String,
    job_id: Option<String>,
    start_time: String,
    end_time: String,
    create_time: String,
    download_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListReportsResponse {
    reports: Option<Vec<ReportResource>>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportTypeResource {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    system_managed: bool,
    deprecate_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListReportTypesResponse {
    #[serde(default)]
    report_types: Vec<ReportTypeResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateJobBody<'a> {
    name: &'a str,
    report_type_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<GoogleErrorItem>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorItem {
    #[serde(default)]
    reason: String,
}

fn decode_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>, RemoteError> {
    parse_timestamp(raw).map_err(|e| RemoteError::Decode(format!("{field} `{raw}`: {e}")))
}

impl JobResource {
    fn into_descriptor(self) -> Result<JobDescriptor, RemoteError> {
        let remote_created_at = self
            .create_time
            .as_deref()
            .map(|raw| decode_timestamp("job createTime", raw))
            .transpose()?;
        let mut job = JobDescriptor::remote(
            SubscriptionKey::new(self.report_type_id),
            self.id,
            self.name,
        );
        job.remote_created_at = remote_created_at;
        Ok(job)
    }
}

impl ReportResource {
    fn into_artifact(self, job_id: &str) -> Result<ReportArtifact, RemoteError> {
        Ok(ReportArtifact {
            period_start: decode_timestamp("report startTime", &self.start_time)?,
            period_end: decode_timestamp("report endTime", &self.end_time)?,
            created_at: decode_timestamp("report createTime", &self.create_time)?,
            remote_job_id: self.job_id.unwrap_or_else(|| job_id.to_string()),
            artifact_id: self.id,
            download_locator: self.download_url,
        })
    }
}

impl ReportTypeResource {
    fn into_report_type(self) -> Result<RemoteReportType, RemoteError> {
        Ok(RemoteReportType {
            deprecate_time: self
                .deprecate_time
                .as_deref()
                .map(|raw| decode_timestamp("report type deprecateTime", raw))
                .transpose()?,
            id: self.id,
            name: self.name,
            system_managed: self.system_managed,
        })
    }
}

/// Map a non-success response onto the error taxonomy.
pub fn error_for_status(status: StatusCode, url: String, body: &str) -> RemoteError {
    let envelope = serde_json::from_str::<GoogleErrorEnvelope>(body).ok();
    let detail = envelope
        .as_ref()
        .map(|e| e.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| url.clone());
    let rate_limited_reason = envelope.as_ref().is_some_and(|e| {
        e.error
            .errors
            .iter()
            .any(|item| item.reason.ends_with("RateLimitExceeded") || item.reason == "rateLimitExceeded")
    });

    match status {
        StatusCode::NOT_FOUND => RemoteError::NotFound(detail),
        StatusCode::CONFLICT => RemoteError::Conflict(detail),
        StatusCode::TOO_MANY_REQUESTS => RemoteError::RateLimited(detail),
        StatusCode::FORBIDDEN if rate_limited_reason => RemoteError::RateLimited(detail),
        StatusCode::FORBIDDEN => RemoteError::Forbidden(detail),
        _ => RemoteError::Http {
            status: status.as_u16(),
            url,
        },
    }
}

async fn check_status(resp: Response) -> Result<Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let url = resp.url().to_string();
    let body = resp.text().await.unwrap_or_default();
    Err(error_for_status(status, url, &body))
}

fn next_page(token: Option<String>) -> Option<String> {
    token.filter(|t| !t.is_empty())
}

impl HttpReportingClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, RemoteError> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, RemoteError> {
        let resp = check_status(builder.send().await?).await?;
        resp.json::<T>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    fn base_query(owner: &OwnerScope, page_token: Option<&str>) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(owner) = owner.as_param() {
            query.push((OWNER_PARAM, owner.to_string()));
        }
        if let Some(token) = page_token {
            query.push((PAGE_TOKEN_PARAM, token.to_string()));
        }
        query
    }
}

#[async_trait]
impl ReportingApi for HttpReportingClient {
    async fn list_jobs(&self, owner: &OwnerScope) -> Result<Vec<JobDescriptor>, RemoteError> {
        let url = self.url("jobs");
        let mut jobs = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let query = Self::base_query(owner, page_token.as_deref());
            let page: ListJobsResponse = self
                .send_json(self.request(Method::GET, &url).query(&query))
                .await?;
            debug!(%owner, count = page.jobs.len(), "listed job page");
            for job in page.jobs {
                jobs.push(job.into_descriptor()?);
            }
            match next_page(page.next_page_token) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(jobs)
    }

    async fn create_job(
        &self,
        name: &str,
        key: &SubscriptionKey,
        owner: &OwnerScope,
    ) -> Result<JobDescriptor, RemoteError> {
        let body = CreateJobBody {
            name,
            report_type_id: key.as_str(),
        };
        let job: JobResource = self
            .send_json(
                self.request(Method::POST, &self.url("jobs"))
                    .query(&Self::base_query(owner, None))
                    .json(&body),
            )
            .await?;
        job.into_descriptor()
    }

    async fn delete_job(&self, job_id: &str, owner: &OwnerScope) -> Result<(), RemoteError> {
        let url = self.url(&format!("jobs/{job_id}"));
        let resp = self
            .request(Method::DELETE, &url)
            .query(&Self::base_query(owner, None))
            .send()
            .await?;
        match check_status(resp).await {
            Ok(_) => Ok(()),
            Err(RemoteError::NotFound(_)) => {
                debug!(job_id, "job already absent remotely");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn list_reports_since(
        &self,
        job_id: &str,
        owner: &OwnerScope,
        watermark: Option<DateTime<Utc>>,
    ) -> Result<Vec<ReportArtifact>, RemoteError> {
        let url = self.url(&format!("jobs/{job_id}/reports"));
        let created_after = watermark.map(format_timestamp);
        let mut reports = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = Self::base_query(owner, page_token.as_deref());
            if let Some(created_after) = &created_after {
                query.push(("createdAfter", created_after.clone()));
            }
            let page: ListReportsResponse = self
                .send_json(self.request(Method::GET, &url).query(&query))
                .await?;
            // No reports array at all means the job has produced nothing yet.
            let Some(batch) = page.reports else {
                break;
            };
            debug!(job_id, count = batch.len(), "listed report page");
            for report in batch {
                reports.push(report.into_artifact(job_id)?);
            }
            match next_page(page.next_page_token) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(reports)
    }

    async fn download_artifact(
        &self,
        locator: &str,
        destination: &Path,
    ) -> Result<u64, RemoteError> {
        let span = info_span!("download_artifact", destination = %destination.display());
        async {
            let mut resp = check_status(self.request(Method::GET, locator).send().await?).await?;

            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent).await?;
            }
            let file_name = destination
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let temp_path = destination.with_file_name(format!(".{file_name}.{}.part", Uuid::new_v4()));

            let written = async {
                let mut file = fs::File::create(&temp_path).await?;
                let mut written = 0u64;
                while let Some(chunk) = resp.chunk().await? {
                    file.write_all(&chunk).await?;
                    written += chunk.len() as u64;
                }
                file.flush().await?;
                Ok::<u64, RemoteError>(written)
            }
            .await;

            match written {
                Ok(written) => {
                    if let Err(err) = fs::rename(&temp_path, destination).await {
                        let _ = fs::remove_file(&temp_path).await;
                        return Err(err.into());
                    }
                    debug!(bytes = written, "artifact downloaded");
                    Ok(written)
                }
                Err(err) => {
                    let _ = fs::remove_file(&temp_path).await;
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn list_report_types(
        &self,
        owner: &OwnerScope,
    ) -> Result<Vec<RemoteReportType>, RemoteError> {
        let url = self.url("reportTypes");
        let mut types = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let query = Self::base_query(owner, page_token.as_deref());
            let page: ListReportTypesResponse = self
                .send_json(self.request(Method::GET, &url).query(&query))
                .await?;
            for report_type in page.report_types {
                types.push(report_type.into_report_type()?);
            }
            match next_page(page.next_page_token) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(types)
    }
}
