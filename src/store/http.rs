//! HTTP store posting NDJSON batches to a remote metrics API.

use std::io::Write;

use anyhow::{anyhow, Context, Result};
use flate2::write::GzEncoder;

use crate::config::{Compression, HttpStoreConfig};

use super::{encode_ndjson, BatchWrite, Item};

/// Store that POSTs each batch to `<endpoint>/<table>` as NDJSON.
///
/// Transport failures and 5xx responses are retried with a linear backoff;
/// 4xx responses fail immediately since resending the same payload cannot
/// succeed.
pub struct HttpStore {
    cfg: HttpStoreConfig,
    client: reqwest::Client,
}

impl HttpStore {
    /// Build the store and its HTTP client.
    pub fn new(cfg: HttpStoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .build()
            .context("building HTTP client")?;

        Ok(Self { cfg, client })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.cfg.endpoint.trim_end_matches('/'), table)
    }

    /// Send one batch, classifying failures as retryable or terminal.
    async fn send_once(&self, url: &str, body: Vec<u8>) -> Result<(), SendError> {
        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/x-ndjson")
            .body(body);

        if let Some(encoding) = content_encoding(self.cfg.compression) {
            request = request.header("Content-Encoding", encoding);
        }

        for (key, value) in &self.cfg.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let resp = request.send().await.map_err(|err| SendError {
            source: err.into(),
            retryable: true,
        })?;

        let status = resp.status();

        // Drain the body so the connection can be reused.
        let _ = resp.bytes().await;

        if status.is_success() {
            return Ok(());
        }

        Err(SendError {
            source: anyhow!("store endpoint returned status {status}"),
            retryable: status.is_server_error(),
        })
    }
}

struct SendError {
    source: anyhow::Error,
    retryable: bool,
}

impl BatchWrite for HttpStore {
    async fn write_batch(&self, table: &str, items: &[Item]) -> Result<usize> {
        if items.is_empty() {
            return Ok(0);
        }

        let raw = encode_ndjson(items)?;
        let raw_len = raw.len();
        let body = compress(&raw, self.cfg.compression)?;
        let url = self.table_url(table);

        let mut attempt: u32 = 0;
        loop {
            match self.send_once(&url, body.clone()).await {
                Ok(()) => {
                    tracing::debug!(
                        table,
                        items = items.len(),
                        bytes = raw_len,
                        sent = body.len(),
                        "wrote batch to HTTP store"
                    );
                    return Ok(items.len());
                }
                Err(err) if err.retryable && attempt < self.cfg.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        table,
                        attempt,
                        error = %err.source,
                        "batch write failed, retrying"
                    );
                    tokio::time::sleep(self.cfg.retry_backoff * attempt).await;
                }
                Err(err) => {
                    return Err(err
                        .source
                        .context(format!("writing batch to table {table}")));
                }
            }
        }
    }
}

// --- Compression ---

/// Compress an encoded payload with the configured algorithm.
fn compress(data: &[u8], algorithm: Compression) -> Result<Vec<u8>> {
    match algorithm {
        Compression::None => Ok(data.to_vec()),
        Compression::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(data).context("gzip write")?;
            encoder.finish().context("gzip finish")
        }
    }
}

/// Header value advertising the configured compression, if any.
fn content_encoding(algorithm: Compression) -> Option<&'static str> {
    match algorithm {
        Compression::None => None,
        Compression::Gzip => Some("gzip"),
    }
}
