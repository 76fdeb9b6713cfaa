//! File store appending NDJSON batches to per-table files.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;

use super::{encode_ndjson, BatchWrite, Item};

/// Store that appends each batch to `<directory>/<table>.ndjson`.
pub struct FileStore {
    directory: PathBuf,
}

impl FileStore {
    pub fn new(directory: PathBuf) -> Self {
        Self { directory }
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.directory.join(format!("{table}.ndjson"))
    }
}

impl BatchWrite for FileStore {
    async fn write_batch(&self, table: &str, items: &[Item]) -> Result<usize> {
        if items.is_empty() {
            return Ok(0);
        }

        tokio::fs::create_dir_all(&self.directory)
            .await
            .with_context(|| format!("creating store directory {}", self.directory.display()))?;

        let path = self.table_path(table);
        let body = encode_ndjson(items)?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("opening {}", path.display()))?;

        file.write_all(&body)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        file.flush()
            .await
            .with_context(|| format!("flushing {}", path.display()))?;

        tracing::debug!(
            table,
            items = items.len(),
            bytes = body.len(),
            path = %path.display(),
            "appended batch to file store"
        );

        Ok(items.len())
    }
}
