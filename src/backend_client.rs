use crate::{config::AppConfig, services::password_reset::ResetPasswordWithOtp};
use anyhow::{Context, Result};
use log::info;
#[cfg(feature = "mock")]
use mockall::automock;
use reqwest::Client;
use serde::Serialize;
use trait_variant::make;

/// Response of the SIS backend, relayed unchanged to the caller
#[derive(Clone, Debug, PartialEq)]
pub struct BackendResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

#[make(Send)]
#[cfg_attr(feature = "mock", automock)]
pub trait BackendClient {
    async fn reset_password_with_otp(
        &self,
        request: ResetPasswordWithOtp,
    ) -> Result<BackendResponse>;
}

#[derive(Clone)]
pub struct SisBackendClient {
    client: Client,
    api_base: String,
}

impl SisBackendClient {
    const RESET_PASSWORD_WITH_OTP_ENDPOINT: &str = "/api/reset-password-with-otp/";

    pub fn new() -> Self {
        Self::with_api_base(&AppConfig::get().backend.api_base)
    }

    pub fn with_api_base(api_base: &str) -> Self {
        SisBackendClient {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn build_url(&self, path: &str) -> String {
        let normalized_path = path.trim_start_matches('/');
        format!("{}/{normalized_path}", self.api_base)
    }

    /// POST request to the backend with JSON body
    ///
    /// Any status is accepted, only transport and body decoding errors fail.
    async fn post_json(&self, path: &str, body: impl Serialize) -> Result<BackendResponse> {
        let url = self.build_url(path);
        info!("POST {url}");

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context(format!("failed to send POST request to {url}"))?;

        let status = res.status().as_u16();
        let body = res
            .json::<serde_json::Value>()
            .await
            .context(format!("failed to parse response body of POST {url}"))?;

        Ok(BackendResponse { status, body })
    }
}

impl Default for SisBackendClient {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendClient for SisBackendClient {
    async fn reset_password_with_otp(
        &self,
        request: ResetPasswordWithOtp,
    ) -> Result<BackendResponse> {
        self.post_json(Self::RESET_PASSWORD_WITH_OTP_ENDPOINT, request)
            .await
    }
}
