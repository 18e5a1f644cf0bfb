use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Run-scoped cache shared between providers. Entries live until the process exits.
#[derive(Clone)]
pub struct Cache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<Mutex<HashMap<K, V>>>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Send + Sync + std::fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let entries = self.inner.lock().await;
        let value = entries.get(key).cloned();
        if value.is_some() {
            debug!("Cache HIT for key: {:?}", key);
        } else {
            debug!("Cache MISS for key: {:?}", key);
        }
        value
    }

    pub async fn put(&self, key: K, value: V) {
        let mut entries = self.inner.lock().await;
        debug!("Cache PUT for key: {:?}", key);
        entries.insert(key, value);
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash + Send + Sync + std::fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
