//! Primary/secondary store decorator

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;

use super::KeyValueStore;
use crate::error::Result;

/// Store that uses a primary backend until its first failure, then the secondary.
///
/// After a primary error the store is degraded: the failed operation is retried
/// on the secondary and every later operation goes straight there, so reads
/// never mix the two backends. Secondary errors are returned to the caller as-is.
#[derive(Clone)]
pub struct FallbackStore {
    primary: Option<Arc<dyn KeyValueStore>>,
    secondary: Arc<dyn KeyValueStore>,
    degraded: Arc<AtomicBool>,
}

impl FallbackStore {
    /// `primary` is `None` when it could not be opened at all.
    pub fn new(
        primary: Option<Arc<dyn KeyValueStore>>,
        secondary: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            primary,
            secondary,
            degraded: Arc::new(AtomicBool::new(false)),
        }
    }

    pub const fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// True once the primary has failed and the secondary serves everything.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    fn with_fallback<T>(
        &self,
        operation: &str,
        key: &str,
        run: impl Fn(&dyn KeyValueStore) -> Result<T>,
    ) -> Result<T> {
        if let Some(primary) = self.primary.as_ref().filter(|_| !self.is_degraded()) {
            match run(primary.as_ref()) {
                Ok(value) => return Ok(value),
                Err(error) => {
                    self.degraded.store(true, Ordering::SeqCst);
                    tracing::warn!(
                        "Primary store {operation} failed for {key}, staying on fallback: {error}"
                    );
                }
            }
        }
        run(self.secondary.as_ref())
    }
}

impl KeyValueStore for FallbackStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        self.with_fallback("get", key, |store| store.get(key))
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        self.with_fallback("set", key, |store| store.set(key, value))
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.with_fallback("delete", key, |store| store.delete(key))
    }
}
