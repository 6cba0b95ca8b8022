//! Remote sandbox provider backend.
//!
//! Talks to an external sandbox-as-a-service provider over HTTP. The
//! provider owns the actual isolation; this driver only translates the
//! [`SandboxDriver`] contract into the provider's REST API and maps its
//! error responses onto [`ProvisionError`]/[`SandboxError`].

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::driver::SandboxDriver;
use crate::error::{ProvisionError, ProvisionReason, SandboxError};
use crate::types::{ExecResult, ResourceLimits, SandboxHandle, bound_output};

pub struct RemoteDriver {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RemoteDriver {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.bearer_auth(&self.api_key)
    }
}

#[derive(Serialize)]
struct ProvisionRequest<'a> {
    sandbox_id: &'a str,
    template: &'a str,
    memory_mb: u64,
    cpu_shares: u64,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    error_code: String,
    message: String,
}

fn map_provider_error(status: reqwest::StatusCode, body: &str) -> ProvisionError {
    let parsed: Option<ProviderErrorBody> = serde_json::from_str(body).ok();
    let (code, message) = match &parsed {
        Some(b) => (b.error_code.as_str(), b.message.clone()),
        None => ("", body.to_string()),
    };

    let reason = match code {
        "quota_exceeded" => ProvisionReason::Quota,
        "unauthorized" | "invalid_api_key" => ProvisionReason::Auth,
        "template_not_found" => ProvisionReason::TemplateMissing,
        _ if status == reqwest::StatusCode::TOO_MANY_REQUESTS => ProvisionReason::Quota,
        _ if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN => {
            ProvisionReason::Auth
        }
        _ if status == reqwest::StatusCode::NOT_FOUND => ProvisionReason::TemplateMissing,
        _ => ProvisionReason::Transport,
    };

    ProvisionError::Failed { reason, message }
}

#[async_trait]
impl SandboxDriver for RemoteDriver {
    async fn provision(
        &self,
        handle: &SandboxHandle,
        template: &str,
        limits: &ResourceLimits,
    ) -> Result<(), ProvisionError> {
        let req = ProvisionRequest {
            sandbox_id: &handle.id,
            template,
            memory_mb: limits.memory_mb,
            cpu_shares: limits.cpu_shares,
        };

        let resp = self
            .authed(self.client.post(self.url("/v1/sandboxes")))
            .json(&req)
            .send()
            .await
            .map_err(|e| ProvisionError::Failed {
                reason: ProvisionReason::Transport,
                message: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(map_provider_error(status, &body));
        }

        tracing::info!(handle = %handle.id, "remote sandbox provisioned");
        Ok(())
    }

    async fn run(
        &self,
        handle: &SandboxHandle,
        argv: &[String],
        env: &[(String, String)],
        stdin: Option<&[u8]>,
        timeout: Duration,
    ) -> Result<ExecResult, SandboxError> {
        #[derive(Serialize)]
        struct ExecRequest<'a> {
            argv: &'a [String],
            env: Vec<(String, String)>,
            stdin: Option<String>,
            timeout_secs: u64,
        }
        #[derive(Deserialize)]
        struct ExecResponse {
            exit_code: i32,
            stdout: String,
            stderr: String,
            timed_out: bool,
        }

        let req = ExecRequest {
            argv,
            env: env.to_vec(),
            stdin: stdin.map(|b| String::from_utf8_lossy(b).into_owned()),
            timeout_secs: timeout.as_secs(),
        };

        let resp = self
            .authed(
                self.client
                    .post(self.url(&format!("/v1/sandboxes/{}/exec", handle.id))),
            )
            .timeout(timeout + Duration::from_secs(5))
            .json(&req)
            .send()
            .await
            .map_err(|e| SandboxError::Provider(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(SandboxError::HandleNotFound(handle.id.clone()));
            }
            return Err(SandboxError::Provider(body));
        }

        let parsed: ExecResponse = resp.json().await.map_err(|e| SandboxError::Provider(e.to_string()))?;
        Ok(ExecResult {
            exit_code: parsed.exit_code,
            stdout: bound_output(parsed.stdout.into_bytes()),
            stderr: bound_output(parsed.stderr.into_bytes()),
            timed_out: parsed.timed_out,
        })
    }

    async fn write_file(
        &self,
        handle: &SandboxHandle,
        path: &str,
        bytes: &[u8],
        mode: u32,
    ) -> Result<(), SandboxError> {
        #[derive(Serialize)]
        struct WriteRequest<'a> {
            path: &'a str,
            content_base64: String,
            mode: u32,
        }
        let req = WriteRequest {
            path,
            content_base64: BASE64.encode(bytes),
            mode,
        };

        let resp = self
            .authed(
                self.client
                    .put(self.url(&format!("/v1/sandboxes/{}/files", handle.id))),
            )
            .json(&req)
            .send()
            .await
            .map_err(|e| SandboxError::Provider(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SandboxError::Provider(resp.text().await.unwrap_or_default()));
        }
        Ok(())
    }

    async fn read_file(&self, handle: &SandboxHandle, path: &str) -> Result<Vec<u8>, SandboxError> {
        #[derive(Deserialize)]
        struct ReadResponse {
            content_base64: String,
        }

        let resp = self
            .authed(
                self.client
                    .get(self.url(&format!("/v1/sandboxes/{}/files", handle.id)))
                    .query(&[("path", path)]),
            )
            .send()
            .await
            .map_err(|e| SandboxError::Provider(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SandboxError::HandleNotFound(handle.id.clone()));
        }
        if !resp.status().is_success() {
            return Err(SandboxError::Provider(resp.text().await.unwrap_or_default()));
        }

        let parsed: ReadResponse = resp.json().await.map_err(|e| SandboxError::Provider(e.to_string()))?;
        BASE64
            .decode(&parsed.content_base64)
            .map_err(|e| SandboxError::Provider(e.to_string()))
    }

    async fn list_handles(&self) -> Result<Vec<SandboxHandle>, SandboxError> {
        #[derive(Deserialize)]
        struct ListedSandbox {
            id: String,
            created_at: chrono::DateTime<chrono::Utc>,
        }
        #[derive(Deserialize)]
        struct ListResponse {
            sandboxes: Vec<ListedSandbox>,
        }

        let resp = self
            .authed(self.client.get(self.url("/v1/sandboxes")))
            .send()
            .await
            .map_err(|e| SandboxError::Provider(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SandboxError::Provider(resp.text().await.unwrap_or_default()));
        }

        let parsed: ListResponse = resp.json().await.map_err(|e| SandboxError::Provider(e.to_string()))?;
        Ok(parsed
            .sandboxes
            .into_iter()
            .map(|s| SandboxHandle {
                id: s.id,
                backend: crate::types::Backend::Remote,
                created_at: s.created_at,
            })
            .collect())
    }

    async fn teardown(&self, handle: &SandboxHandle) -> Result<(), SandboxError> {
        let resp = self
            .authed(
                self.client
                    .delete(self.url(&format!("/v1/sandboxes/{}", handle.id))),
            )
            .send()
            .await
            .map_err(|e| SandboxError::Provider(e.to_string()))?;

        // Already gone is success: teardown must be idempotent.
        if !resp.status().is_success() && resp.status() != reqwest::StatusCode::NOT_FOUND {
            tracing::warn!(handle = %handle.id, status = %resp.status(), "remote teardown reported an error");
        }
        tracing::info!(handle = %handle.id, "remote sandbox torn down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_round_trips() {
        let data = b"hello sandbox world, this is a test payload!";
        let encoded = BASE64.encode(data);
        let decoded = BASE64.decode(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn maps_quota_error() {
        let err = map_provider_error(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            r#"{"error_code":"quota_exceeded","message":"limit reached"}"#,
        );
        assert_eq!(err.reason(), ProvisionReason::Quota);
    }

    #[test]
    fn maps_auth_error() {
        let err = map_provider_error(reqwest::StatusCode::UNAUTHORIZED, "bad key");
        assert_eq!(err.reason(), ProvisionReason::Auth);
    }
}
