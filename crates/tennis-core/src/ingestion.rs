//! HTTP client for the Edge Impulse ingestion API.
//!
//! Signed envelopes are POSTed to `{base_url}/api/{category}/data`. The
//! response status is handed back to the caller as an [`UploadReceipt`];
//! a non-success status is logged but is not an error.
//!
//! # Example
//!
//! ```no_run
//! use tennis_core::export::{EnvelopeOptions, sign_frames};
//! use tennis_core::ingestion::{DatasetCategory, IngestionClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = IngestionClient::new(IngestionClient::DEFAULT_BASE_URL, "ei_api_key")?;
//! let signed = sign_frames(&[], &EnvelopeOptions::default(), "hmac_key")?;
//! let receipt = client
//!     .upload(DatasetCategory::Training, "forehand", &signed)
//!     .await?;
//! println!("status {}", receipt.status);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::export::SignedEnvelope;

/// Dataset bucket an upload is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetCategory {
    #[default]
    Training,
    Testing,
    Anomaly,
}

impl DatasetCategory {
    /// All categories, in display order.
    pub const ALL: [DatasetCategory; 3] = [Self::Training, Self::Testing, Self::Anomaly];

    /// Path segment used in the ingestion URL.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Training => "training",
            Self::Testing => "testing",
            Self::Anomaly => "anomaly",
        }
    }
}

impl fmt::Display for DatasetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "training" => Ok(Self::Training),
            "testing" => Ok(Self::Testing),
            "anomaly" => Ok(Self::Anomaly),
            other => Err(Error::invalid_config(format!(
                "unknown category '{}', expected training, testing or anomaly",
                other
            ))),
        }
    }
}

/// Outcome of one upload attempt that reached the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    /// Endpoint the body was sent to.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// Response body, as text.
    pub body: String,
}

impl UploadReceipt {
    /// Whether the server answered with a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client for the ingestion API.
#[derive(Debug, Clone)]
pub struct IngestionClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl IngestionClient {
    /// Public ingestion endpoint.
    pub const DEFAULT_BASE_URL: &'static str = "https://ingestion.edgeimpulse.com";

    /// Request timeout used by [`IngestionClient::new`].
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a client with the default timeout.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Scheme and host, e.g. `https://ingestion.edgeimpulse.com`
    /// * `api_key` - Project API key sent as `x-api-key`
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, api_key, Self::DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(base_url: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(client_build_error)?;
        Self::with_client(base_url, api_key, client)
    }

    /// Create a client with a custom reqwest Client.
    pub fn with_client(base_url: &str, api_key: impl Into<String>, client: Client) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full endpoint URL for a category.
    pub fn endpoint(&self, category: DatasetCategory) -> String {
        format!("{}/api/{}/data", self.base_url, category)
    }

    /// Upload a signed envelope.
    pub async fn upload(
        &self,
        category: DatasetCategory,
        file_name: &str,
        envelope: &SignedEnvelope,
    ) -> Result<UploadReceipt> {
        self.upload_body(category, file_name, envelope.body.clone())
            .await
    }

    /// Upload pre-serialized body bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Delivery`] if the request could not be sent or the
    /// response could not be read. An HTTP error status is not an error.
    pub async fn upload_body(
        &self,
        category: DatasetCategory,
        file_name: &str,
        body: Vec<u8>,
    ) -> Result<UploadReceipt> {
        let url = self.endpoint(category);
        let bytes = body.len();

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("x-file-name", file_name)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            info!(%url, status = status.as_u16(), bytes, "Upload accepted");
        } else {
            warn!(%url, status = status.as_u16(), response = %text, "Upload returned non-success status");
        }

        Ok(UploadReceipt {
            url,
            status: status.as_u16(),
            body: text,
        })
    }
}

fn normalize_base_url(base_url: &str) -> Result<String> {
    let base_url = base_url.trim_end_matches('/').to_string();

    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(Error::InvalidUrl(format!(
            "URL must start with http:// or https://, got: {}",
            base_url
        )));
    }

    Ok(base_url)
}

/// Client construction never reached the network, so it is a setup error.
fn client_build_error(err: impl fmt::Display) -> Error {
    Error::invalid_config(format!("Failed to build HTTP client: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = IngestionClient::new(IngestionClient::DEFAULT_BASE_URL, "key").unwrap();
        assert_eq!(client.base_url(), "https://ingestion.edgeimpulse.com");
        assert_eq!(
            client.endpoint(DatasetCategory::Training),
            "https://ingestion.edgeimpulse.com/api/training/data"
        );
    }

    #[test]
    fn test_client_normalizes_url() {
        let client = IngestionClient::new("http://localhost:8080/", "key").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(
            client.endpoint(DatasetCategory::Anomaly),
            "http://localhost:8080/api/anomaly/data"
        );
    }

    #[test]
    fn test_client_invalid_url() {
        let result = IngestionClient::new("localhost:8080", "key");
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_client_build_error_is_config_error() {
        let err = client_build_error("no TLS backend");
        assert!(matches!(&err, Error::InvalidConfig(message) if message.contains("no TLS backend")));
        assert!(!matches!(err, Error::Delivery(_)));
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("training".parse::<DatasetCategory>().unwrap(), DatasetCategory::Training);
        assert_eq!("Testing".parse::<DatasetCategory>().unwrap(), DatasetCategory::Testing);
        assert_eq!("anomaly".parse::<DatasetCategory>().unwrap(), DatasetCategory::Anomaly);
        assert!("validation".parse::<DatasetCategory>().is_err());
    }

    #[test]
    fn test_category_serde() {
        let json = serde_json::to_string(&DatasetCategory::Testing).unwrap();
        assert_eq!(json, "\"testing\"");
        let parsed: DatasetCategory = serde_json::from_str("\"anomaly\"").unwrap();
        assert_eq!(parsed, DatasetCategory::Anomaly);
        assert_eq!(DatasetCategory::default(), DatasetCategory::Training);
    }

    #[test]
    fn test_receipt_success_range() {
        let mut receipt = UploadReceipt {
            url: String::new(),
            status: 200,
            body: String::new(),
        };
        assert!(receipt.is_success());
        receipt.status = 401;
        assert!(!receipt.is_success());
    }
}
