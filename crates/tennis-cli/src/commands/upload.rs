//! Upload command implementation.

use std::path::Path;

use anyhow::{Context, Result, bail};
use tennis_core::store::{SharedStore, lock};
use tennis_core::{
    DatasetCategory, Envelope, EnvelopeOptions, IngestionClient, SensorFrame, SignedEnvelope,
    UploadReceipt,
};
use tracing::debug;

use crate::cli::DatasetArgs;
use crate::config::{Config, resolve_api_key, resolve_category, resolve_hmac_key, resolve_label};
use crate::format::format_receipt;
use crate::util::{label_from_file_name, read_dataset};

/// Signs datasets and sends them to the ingestion service.
#[derive(Debug, Clone)]
pub struct Uploader {
    client: IngestionClient,
    hmac_key: String,
    envelope: EnvelopeOptions,
}

impl Uploader {
    /// Resolve keys and endpoint from flags, env vars and config.
    pub fn from_args(
        api_key: Option<String>,
        hmac_key: Option<String>,
        config: &Config,
    ) -> Result<Self> {
        let api_key = resolve_api_key(api_key, config)?;
        let hmac_key = resolve_hmac_key(hmac_key, config)?;
        let client = IngestionClient::new(config.ingestion_url(), api_key)
            .context("Invalid ingestion URL")?;
        Ok(Self {
            client,
            hmac_key,
            envelope: config.envelope.clone(),
        })
    }

    /// Sign a loaded dataset.
    pub fn sign(&self, frames: &[SensorFrame]) -> Result<SignedEnvelope> {
        if frames.is_empty() {
            bail!("Dataset is empty, nothing to upload");
        }
        Envelope::new(frames, &self.envelope)
            .sign(&self.hmac_key)
            .context("Failed to sign dataset")
    }

    /// Sign everything in the store without clearing it.
    pub fn sign_store(&self, store: &SharedStore) -> Result<SignedEnvelope> {
        let store = lock(store);
        if store.is_empty() {
            bail!("No frames captured, nothing to upload");
        }
        store
            .signed_export(&self.envelope, &self.hmac_key)
            .context("Failed to sign dataset")
    }

    /// Send a signed envelope filed under `label`.
    pub async fn send(
        &self,
        category: DatasetCategory,
        label: &str,
        signed: &SignedEnvelope,
    ) -> Result<UploadReceipt> {
        debug!(%category, label, rows = signed.envelope.len(), "Uploading dataset");
        self.client
            .upload(category, label, signed)
            .await
            .with_context(|| format!("Failed to reach {}", self.client.endpoint(category)))
    }
}

pub async fn cmd_upload(
    file: &Path,
    dataset: DatasetArgs,
    config: &Config,
    no_color: bool,
) -> Result<()> {
    let frames = read_dataset(file)?;
    let label = resolve_label(dataset.label.or_else(|| label_from_file_name(file)), config);
    let category = resolve_category(dataset.category, config);

    let uploader = Uploader::from_args(dataset.api_key, dataset.hmac_key, config)?;
    let signed = uploader.sign(&frames)?;
    let receipt = uploader.send(category, &label, &signed).await?;

    println!("{}", format_receipt(&receipt, no_color));
    Ok(())
}
