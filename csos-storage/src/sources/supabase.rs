//! Supabase Storage client for rule objects.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use super::RemoteStorage;
use crate::error::RemoteError;

const USER_AGENT_VALUE: &str = concat!("csos-storage/", env!("CARGO_PKG_VERSION"));

/// Object storage backend speaking the Supabase Storage REST API.
///
/// Objects are fetched from `{base_url}/storage/v1/object/{bucket}/{path}`
/// with the service role key as both bearer token and `apikey` header.
#[derive(Clone)]
pub struct SupabaseStorage {
    client: reqwest::Client,
    base_url: String,
    service_key: SecretString,
}

impl fmt::Debug for SupabaseStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseStorage")
            .field("base_url", &self.base_url)
            .field("service_key", &"[REDACTED]")
            .finish()
    }
}

impl SupabaseStorage {
    pub fn new(
        base_url: &str,
        service_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|e| RemoteError::Client(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RemoteStorage for SupabaseStorage {
    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>, RemoteError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path);
        debug!(url = %url, "downloading storage object");

        let network = |e: reqwest::Error| RemoteError::Network {
            bucket: bucket.to_string(),
            path: path.to_string(),
            message: e.to_string(),
        };

        let key = self.service_key.expose_secret();
        let response = self
            .client
            .get(&url)
            .bearer_auth(key)
            .header("apikey", key)
            .send()
            .await
            .map_err(&network)?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(RemoteError::NotFound {
                    bucket: bucket.to_string(),
                    path: path.to_string(),
                })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(RemoteError::PermissionDenied {
                    bucket: bucket.to_string(),
                    path: path.to_string(),
                })
            }
            status => {
                return Err(RemoteError::Status {
                    bucket: bucket.to_string(),
                    path: path.to_string(),
                    status: status.as_u16(),
                })
            }
        }

        let body = response.bytes().await.map_err(&network)?;
        Ok(body.to_vec())
    }
}
