//! Job triggering against a Jenkins-style job server.
//!
//! Two round trips: fetch a crumb from the crumb issuer, then POST to the
//! job's `buildWithParameters` endpoint with the crumb echoed as a header.
//! The POST is never sent unless the crumb response yielded both the token
//! and its header name. Every step lands in the audit log.
//!
//! [`TriggerClient`] owns the protocol decisions and is generic over
//! [`JobServer`]; [`JenkinsClient`] is the reqwest transport.

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info};

use crate::audit::AuditLog;
use crate::config::{Credentials, RotateConfig};
use crate::contract::{Crumb, HttpReply, JobServer};
use crate::error::{BoxError, RotateError};

/// Characters left as-is in a query value: RFC 3986 unreserved.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Acknowledgement that the job server accepted the trigger.
#[derive(Debug, Clone)]
pub struct TriggerReceipt {
    pub job: String,
    pub status: u16,
}

#[derive(Debug, Deserialize)]
struct CrumbResponse {
    crumb: Option<String>,
    #[serde(rename = "crumbRequestField")]
    crumb_request_field: Option<String>,
}

/// Extract the crumb from the issuer's JSON body.
pub fn parse_crumb(body: &str) -> Result<Crumb, RotateError> {
    let parsed: CrumbResponse = serde_json::from_str(body)
        .map_err(|e| RotateError::ProtocolError(format!("crumb response is not JSON: {e}")))?;
    let value = parsed
        .crumb
        .filter(|c| !c.is_empty())
        .ok_or_else(|| RotateError::ProtocolError("missing field `crumb`".to_string()))?;
    let request_field = parsed
        .crumb_request_field
        .filter(|f| !f.is_empty())
        .ok_or_else(|| {
            RotateError::ProtocolError("missing field `crumbRequestField`".to_string())
        })?;
    Ok(Crumb {
        value,
        request_field,
    })
}

/// `{base}/job/{job}/buildWithParameters?{parameter}={percent-encoded value}`
pub fn build_trigger_url(base: &str, job: &str, parameter: &str, value: &str) -> String {
    format!(
        "{}/job/{}/buildWithParameters?{}={}",
        base.trim_end_matches('/'),
        utf8_percent_encode(job, QUERY_VALUE),
        utf8_percent_encode(parameter, QUERY_VALUE),
        utf8_percent_encode(value, QUERY_VALUE)
    )
}

pub fn crumb_issuer_url(base: &str) -> String {
    format!("{}/crumbIssuer/api/json", base.trim_end_matches('/'))
}

pub struct TriggerClient<'a, J: JobServer> {
    server: &'a J,
    job: String,
    parameter: String,
    audit: &'a AuditLog,
}

impl<'a, J: JobServer> TriggerClient<'a, J> {
    pub fn new(server: &'a J, config: &RotateConfig, audit: &'a AuditLog) -> Self {
        Self {
            server,
            job: config.job_name.clone(),
            parameter: config.job_parameter.clone(),
            audit,
        }
    }

    /// Ask the job server to run the configured job for `log_path`.
    ///
    /// Returns once the server has accepted the request; the job itself runs
    /// elsewhere and is not awaited.
    pub async fn trigger(&self, log_path: &Path) -> Result<TriggerReceipt, RotateError> {
        let crumb = self.fetch_crumb().await?;
        let value = log_path.to_string_lossy();

        self.audit.info(format!(
            "Triggering job '{}' with {}={}",
            self.job, self.parameter, value
        ));
        info!(job = %self.job, parameter = %self.parameter, value = %value, "[TRIGGER] Sending build request");

        let reply = match self
            .server
            .build_with_parameters(&self.job, &self.parameter, &value, &crumb)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                error!(job = %self.job, error = ?e, "[TRIGGER][ERROR] Build request failed in transport");
                self.audit
                    .error(format!("Build request for job '{}' failed: {e}", self.job));
                return Err(RotateError::RemoteTriggerFailure {
                    status: None,
                    detail: e.to_string(),
                });
            }
        };

        if !reply.is_success() {
            error!(job = %self.job, status = reply.status, "[TRIGGER][ERROR] Job server rejected build request");
            self.audit.error(format!(
                "Job '{}' trigger returned HTTP {}",
                self.job, reply.status
            ));
            return Err(RotateError::RemoteTriggerFailure {
                status: Some(reply.status),
                detail: summarise_body(&reply.body),
            });
        }

        info!(job = %self.job, status = reply.status, "[TRIGGER] Job accepted");
        self.audit.info(format!(
            "Job '{}' accepted with HTTP {}",
            self.job, reply.status
        ));
        Ok(TriggerReceipt {
            job: self.job.clone(),
            status: reply.status,
        })
    }

    async fn fetch_crumb(&self) -> Result<Crumb, RotateError> {
        self.audit.info("Requesting crumb from job server");
        info!("[TRIGGER] Requesting crumb");

        let reply: HttpReply = match self.server.issue_crumb().await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = ?e, "[TRIGGER][ERROR] Crumb issuer unreachable");
                self.audit.error(format!("Crumb issuer unreachable: {e}"));
                return Err(RotateError::AuthFailure(format!("crumb issuer unreachable: {e}")));
            }
        };

        if !reply.is_success() {
            error!(status = reply.status, "[TRIGGER][ERROR] Crumb issuer returned non-2xx");
            self.audit
                .error(format!("Crumb issuer returned HTTP {}", reply.status));
            return Err(RotateError::AuthFailure(format!(
                "crumb issuer returned HTTP {}",
                reply.status
            )));
        }
        if reply.body.trim().is_empty() {
            error!("[TRIGGER][ERROR] Crumb issuer returned an empty body");
            self.audit.error("Crumb issuer returned an empty response");
            return Err(RotateError::AuthFailure(
                "crumb issuer returned an empty response".to_string(),
            ));
        }

        match parse_crumb(&reply.body) {
            Ok(crumb) => {
                info!(field = %crumb.request_field, "[TRIGGER] Crumb obtained");
                self.audit
                    .info(format!("Crumb obtained for header {}", crumb.request_field));
                Ok(crumb)
            }
            Err(e) => {
                error!(error = %e, "[TRIGGER][ERROR] Unusable crumb response");
                self.audit.error(format!("Unusable crumb response: {e}"));
                Err(e)
            }
        }
    }
}

fn summarise_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    trimmed.chars().take(200).collect()
}

/// reqwest transport to a Jenkins server using basic auth.
pub struct JenkinsClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl JenkinsClient {
    pub fn new(
        base_url: impl Into<String>,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, BoxError> {
        // Jenkins binds crumbs to the session that requested them.
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        tracing::info!(
            base_url = %base_url,
            username = %credentials.username,
            "Initialized JenkinsClient"
        );
        Ok(Self {
            http,
            base_url,
            credentials,
        })
    }

    pub fn from_config(config: &RotateConfig) -> Result<Self, BoxError> {
        Self::new(
            config.remote_base_url.clone(),
            config.credentials.clone(),
            config.request_timeout(),
        )
    }
}

#[async_trait]
impl JobServer for JenkinsClient {
    async fn issue_crumb(&self) -> Result<HttpReply, BoxError> {
        let url = crumb_issuer_url(&self.base_url);
        let resp = self
            .http
            .get(&url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.secret))
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        tracing::debug!(url = %url, status, "Crumb issuer responded");
        Ok(HttpReply { status, body })
    }

    async fn build_with_parameters(
        &self,
        job: &str,
        parameter: &str,
        value: &str,
        crumb: &Crumb,
    ) -> Result<HttpReply, BoxError> {
        let url = build_trigger_url(&self.base_url, job, parameter, value);
        let resp = self
            .http
            .post(&url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.secret))
            .header(crumb.request_field.as_str(), crumb.value.as_str())
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        tracing::debug!(url = %url, status, "Build endpoint responded");
        Ok(HttpReply { status, body })
    }
}
