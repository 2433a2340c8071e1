//! Google Cloud Storage download client (JSON API, media download).

use std::io::Write;

use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use tracing::debug;

use crate::error::{TransferError, TransferResult};
use crate::storage::ObjectStoreClient;

use super::config::GcpConfig;

#[derive(Debug, Clone)]
pub struct GcsClient {
    http: Client,
    endpoint: Url,
    access_token: String,
}

impl GcsClient {
    pub fn new(config: &GcpConfig) -> TransferResult<Self> {
        let endpoint = Url::parse(&config.storage_endpoint).map_err(|e| TransferError::Config {
            message: format!("invalid storage endpoint '{}': {e}", config.storage_endpoint),
        })?;
        Ok(Self {
            http: Client::builder().build()?,
            endpoint,
            access_token: config.access_token.clone(),
        })
    }

    /// `{endpoint}/storage/v1/b/{bucket}/o/{object}?alt=media`, with the object name escaped as a
    /// single path segment.
    pub fn media_url(&self, bucket: &str, object: &str) -> TransferResult<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| TransferError::Config {
                message: format!("storage endpoint '{}' cannot be a base url", self.endpoint),
            })?
            .pop_if_empty()
            .extend(["storage", "v1", "b", bucket, "o", object]);
        url.query_pairs_mut().append_pair("alt", "media");
        Ok(url)
    }
}

impl ObjectStoreClient for GcsClient {
    fn copy_object_to(&self, bucket: &str, object: &str, out: &mut dyn Write) -> TransferResult<u64> {
        let url = self.media_url(bucket, object)?;
        debug!(%url, "downloading object");

        let mut response = self.http.get(url).bearer_auth(&self.access_token).send()?;
        match response.status() {
            status if status.is_success() => Ok(response.copy_to(out)?),
            StatusCode::NOT_FOUND => Err(TransferError::NotFound {
                bucket: bucket.to_string(),
                object: object.to_string(),
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(TransferError::Authorization {
                message: format!("read gs://{bucket}/{object}: {}", response.text().unwrap_or_default()),
            }),
            status => Err(TransferError::Store {
                message: format!(
                    "read gs://{bucket}/{object}: http {status}: {}",
                    response.text().unwrap_or_default()
                ),
            }),
        }
    }
}
