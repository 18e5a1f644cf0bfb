use crate::core::ledger::LedgerBackend;
use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::debug;

/// CSV file backend. The header row comes from the record's serde field names.
pub struct CsvFile<R> {
    path: PathBuf,
    _marker: PhantomData<fn() -> R>,
}

impl<R> CsvFile<R> {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<R> LedgerBackend<R> for CsvFile<R>
where
    R: Serialize + DeserializeOwned,
{
    fn load(&self) -> Result<Vec<R>> {
        if !self.path.exists() {
            debug!("No ledger file at {}, starting empty", self.path.display());
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        let records = reader
            .deserialize()
            .collect::<Result<Vec<R>, _>>()
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;

        debug!("Read {} rows from {}", records.len(), self.path.display());
        Ok(records)
    }

    fn save(&self, records: &[R]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        // Write beside the target and rename so a failed write never truncates history.
        let tmp_path = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp_path)
                .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
            for record in records {
                writer
                    .serialize(record)
                    .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
            }
            writer
                .flush()
                .with_context(|| format!("Failed to flush {}", tmp_path.display()))?;
        }
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        debug!("Wrote {} rows to {}", records.len(), self.path.display());
        Ok(())
    }
}
