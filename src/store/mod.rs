//! Persistence backends for assembled dashboard items.
//!
//! A store receives flat items and writes them to one destination table per
//! call. Backends are selected by configuration and dispatched through the
//! [`Store`] enum so callers stay generic over [`BatchWrite`] without boxing.

mod file;
mod http;

pub use file::FileStore;
pub use http::HttpStore;

use anyhow::Result;
use serde_json::{Map, Value};

use crate::config::{StoreBackend, StoreConfig};

/// A single flat dashboard item, keyed by output field name.
pub type Item = Map<String, Value>;

/// Writes batches of items to named tables.
pub trait BatchWrite: Send {
    /// Write every item to the given table, returning the number written.
    fn write_batch(
        &self,
        table: &str,
        items: &[Item],
    ) -> impl std::future::Future<Output = Result<usize>> + Send;
}

/// Store enum for static dispatch over configured backends.
pub enum Store {
    Http(HttpStore),
    File(FileStore),
}

impl Store {
    /// Build the configured backend.
    pub fn from_config(cfg: &StoreConfig) -> Result<Self> {
        match cfg.backend {
            StoreBackend::Http => Ok(Self::Http(HttpStore::new(cfg.http.clone())?)),
            StoreBackend::File => Ok(Self::File(FileStore::new(cfg.file.directory.clone()))),
        }
    }
}

impl BatchWrite for Store {
    async fn write_batch(&self, table: &str, items: &[Item]) -> Result<usize> {
        match self {
            Self::Http(store) => store.write_batch(table, items).await,
            Self::File(store) => store.write_batch(table, items).await,
        }
    }
}

/// Encode items as NDJSON, one object per line.
pub(crate) fn encode_ndjson(items: &[Item]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for item in items {
        serde_json::to_writer(&mut buf, item)?;
        buf.push(b'\n');
    }
    Ok(buf)
}
