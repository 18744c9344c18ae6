use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Keyed single-writer registry for transactions being resolved.
///
/// The mutex is held only to insert or remove a key, never across I/O.
/// A claim is released when its [`InFlightClaim`] drops, including when the
/// owning task panics or is cancelled.
#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`; `None` if another caller holds it.
    pub fn try_claim(&self, key: &str) -> Option<InFlightClaim> {
        let mut keys = self.keys.lock().unwrap_or_else(|p| p.into_inner());
        if !keys.insert(key.to_string()) {
            return None;
        }
        Some(InFlightClaim {
            key: key.to_string(),
            keys: Arc::clone(&self.keys),
        })
    }

    pub fn is_claimed(&self, key: &str) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
pub struct InFlightClaim {
    key: String,
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InFlightClaim {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        let mut keys = self.keys.lock().unwrap_or_else(|p| p.into_inner());
        keys.remove(&self.key);
    }
}
