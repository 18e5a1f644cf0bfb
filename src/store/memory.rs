use crate::core::ledger::LedgerBackend;
use anyhow::{Result, anyhow};
use std::sync::Mutex;
use tracing::debug;

/// In-memory ledger backend. Holds whatever was last saved.
pub struct MemoryBackend<R> {
    inner: Mutex<Vec<R>>,
}

impl<R> MemoryBackend<R> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Vec::new()),
        }
    }

    pub fn with_records(records: Vec<R>) -> Self {
        Self {
            inner: Mutex::new(records),
        }
    }
}

impl<R> Default for MemoryBackend<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> LedgerBackend<R> for MemoryBackend<R>
where
    R: Clone + Send,
{
    fn load(&self) -> Result<Vec<R>> {
        let records = self
            .inner
            .lock()
            .map_err(|_| anyhow!("Memory backend lock poisoned"))?;
        debug!("Memory LOAD of {} records", records.len());
        Ok(records.clone())
    }

    fn save(&self, records: &[R]) -> Result<()> {
        let mut stored = self
            .inner
            .lock()
            .map_err(|_| anyhow!("Memory backend lock poisoned"))?;
        debug!("Memory SAVE of {} records", records.len());
        *stored = records.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_starts_empty() {
        let backend = MemoryBackend::<i32>::new();
        assert!(backend.load().unwrap().is_empty());
    }

    #[test]
    fn test_memory_backend_save_replaces_contents() {
        let backend = MemoryBackend::with_records(vec![1, 2, 3]);
        backend.save(&[4]).unwrap();
        assert_eq!(backend.load().unwrap(), vec![4]);
    }
}
