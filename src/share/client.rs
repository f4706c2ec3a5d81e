//! HTTP client for the install-script service.
//!
//! The service is an opaque collaborator: POSTing the file set returns a
//! content hash; the script itself is fetched by whoever runs the share
//! command, never by this crate.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Invalid origin URL: {0}")]
    InvalidOrigin(String),
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Install service returned {0}")]
    Status(StatusCode),
    #[error("Malformed install response: {0}")]
    Malformed(String),
}

/// Creates an install request from a file set and returns the service's
/// opaque identifier for it.
#[async_trait]
pub trait InstallClient: Send + Sync {
    async fn create_install(
        &self,
        files: &BTreeMap<String, String>,
    ) -> Result<String, InstallError>;
}

#[derive(Serialize)]
struct InstallRequest<'a> {
    files: &'a BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct InstallResponse {
    hash: String,
}

/// reqwest-backed client against `<origin>/api/install`.
pub struct HttpInstallClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpInstallClient {
    pub fn new(origin: &str) -> Result<Self, InstallError> {
        let base = Url::parse(origin).map_err(|e| InstallError::InvalidOrigin(e.to_string()))?;
        let endpoint = base
            .join("/api/install")
            .map_err(|e| InstallError::InvalidOrigin(e.to_string()))?;
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
        })
    }
}

#[async_trait]
impl InstallClient for HttpInstallClient {
    async fn create_install(
        &self,
        files: &BTreeMap<String, String>,
    ) -> Result<String, InstallError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&InstallRequest { files })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(InstallError::Status(status));
        }

        let body: InstallResponse = response
            .json()
            .await
            .map_err(|e| InstallError::Malformed(e.to_string()))?;
        Ok(body.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_origin() {
        assert!(matches!(
            HttpInstallClient::new("not a url"),
            Err(InstallError::InvalidOrigin(_))
        ));
        assert!(HttpInstallClient::new("http://127.0.0.1:8000").is_ok());
    }
}
