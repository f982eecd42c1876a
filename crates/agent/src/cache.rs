use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::platform::AgentHandle;

/// Process-wide handle cache keyed by credential string.
///
/// Injected into the resolver rather than held as ambient global state, so
/// tests run against isolated instances. Lookup and insert hold the lock
/// only briefly; agent creation runs unlocked, so two first-time requests
/// presenting the same credential may both create an external agent. The
/// last insert wins and the losing handle is dropped unused.
#[derive(Default)]
pub struct AgentCache {
    handles: RwLock<HashMap<String, Arc<AgentHandle>>>,
}

impl AgentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, credential: &str) -> Option<Arc<AgentHandle>> {
        self.handles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(credential)
            .cloned()
    }

    pub fn insert(&self, credential: impl Into<String>, handle: Arc<AgentHandle>) -> Arc<AgentHandle> {
        let mut handles = self.handles.write().unwrap_or_else(PoisonError::into_inner);
        handles.insert(credential.into(), Arc::clone(&handle));
        handle
    }

    pub fn len(&self) -> usize {
        self.handles.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
