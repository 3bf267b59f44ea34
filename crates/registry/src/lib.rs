//! Activity registry for Stepflow.
//!
//! The registry maps activity names to async handlers and optional
//! [`ActivitySchema`] metadata. It is an explicit value that hosts build once,
//! wrap in an `Arc`, and hand to the engine; nothing here is global.
//!
//! [`invoke_activity`] is the single error boundary between the interpreter
//! and handler code: lookups that miss, handler errors, and handler panics are
//! all folded into a failed [`ActivityResult`].

use std::{any::Any, fmt, panic::AssertUnwindSafe, sync::Arc};

use futures_util::FutureExt;
use indexmap::IndexMap;
use stepflow_types::{ActivityResult, ActivitySchema};
use tracing::{debug, warn};

pub mod builtin;
pub mod handler;

pub use builtin::{SampleActivityOptions, register_builtin_activities};
pub use handler::{ActivityArguments, ActivityHandler};

#[derive(Clone)]
struct RegisteredActivity {
    handler: Arc<dyn ActivityHandler>,
    schema: Option<ActivitySchema>,
}

/// Name-keyed catalogue of activity handlers and their schemas.
///
/// Registration order is preserved for listings.
#[derive(Clone, Default)]
pub struct ActivityRegistry {
    activities: IndexMap<String, RegisteredActivity>,
}

impl ActivityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`, replacing any earlier registration.
    pub fn register<H>(&mut self, name: impl Into<String>, handler: H, schema: Option<ActivitySchema>)
    where
        H: ActivityHandler + 'static,
    {
        let name = name.into();
        let entry = RegisteredActivity {
            handler: Arc::new(handler),
            schema,
        };
        if self.activities.insert(name.clone(), entry).is_some() {
            debug!(activity = %name, "replaced existing activity registration");
        } else {
            debug!(activity = %name, "registered activity");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ActivityHandler>> {
        self.activities.get(name).map(|entry| Arc::clone(&entry.handler))
    }

    pub fn has(&self, name: &str) -> bool {
        self.activities.contains_key(name)
    }

    /// Registered names in registration order.
    pub fn list_names(&self) -> Vec<&str> {
        self.activities.keys().map(String::as_str).collect()
    }

    pub fn get_schema(&self, name: &str) -> Option<&ActivitySchema> {
        self.activities.get(name).and_then(|entry| entry.schema.as_ref())
    }

    /// Schemas of every activity that registered one.
    pub fn list_schemas(&self) -> Vec<&ActivitySchema> {
        self.activities.values().filter_map(|entry| entry.schema.as_ref()).collect()
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}

impl fmt::Debug for ActivityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityRegistry")
            .field("activities", &self.list_names())
            .finish()
    }
}

/// Looks up `name` and runs its handler with `arguments`.
///
/// Never fails: every problem is reported as `success: false` with a message.
pub async fn invoke_activity(registry: &ActivityRegistry, name: &str, arguments: ActivityArguments) -> ActivityResult {
    let Some(handler) = registry.get(name) else {
        warn!(activity = %name, "activity not found in registry");
        return ActivityResult::failure(format!("Activity '{name}' not found in registry"));
    };

    match AssertUnwindSafe(handler.call(arguments)).catch_unwind().await {
        Ok(Ok(result)) => result,
        Ok(Err(error)) => {
            warn!(activity = %name, error = %error, "activity handler returned an error");
            ActivityResult::failure(error.to_string())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(activity = %name, error = %message, "activity handler panicked");
            ActivityResult::failure(message)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "Unknown error".to_string()
}
