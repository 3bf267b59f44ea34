//! Shared variable store threaded through one workflow run.
//!
//! Every step of a run, including concurrently running parallel branches,
//! sees the same map. Writes are last-write-wins; branches that must not
//! interfere should write disjoint keys. The lock is only taken for single
//! reads and writes and is never held across an `.await`.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map as JsonMap, Value};

/// Cheaply clonable handle to the run's variable map.
#[derive(Debug, Clone, Default)]
pub struct ExecutionState {
    variables: Arc<Mutex<JsonMap<String, Value>>>,
}

impl ExecutionState {
    /// Seeds the state with a shallow copy of the caller's input.
    pub fn new(input: JsonMap<String, Value>) -> Self {
        Self {
            variables: Arc::new(Mutex::new(input)),
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.variables.lock().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.lock().contains_key(name)
    }

    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.variables.lock().insert(name.into(), value);
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        self.variables.lock().remove(name)
    }

    /// Copy of the current map.
    pub fn snapshot(&self) -> JsonMap<String, Value> {
        self.variables.lock().clone()
    }
}
