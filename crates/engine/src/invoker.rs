//! The capability the interpreter uses to run activities.
//!
//! The interpreter never talks to the registry directly; it calls an
//! [`ActivityInvoker`]. The registry implements it, [`TimeoutInvoker`] wraps
//! any invoker with a per-activity deadline, and tests supply their own.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use stepflow_registry::{ActivityArguments, ActivityRegistry, invoke_activity};
use stepflow_types::ActivityResult;
use tracing::warn;

/// Executes a named activity with resolved arguments.
///
/// Implementations report every failure through the returned
/// [`ActivityResult`]; they do not error or panic.
#[async_trait]
pub trait ActivityInvoker: Send + Sync {
    async fn invoke(&self, activity_name: &str, arguments: ActivityArguments) -> ActivityResult;
}

#[async_trait]
impl ActivityInvoker for ActivityRegistry {
    async fn invoke(&self, activity_name: &str, arguments: ActivityArguments) -> ActivityResult {
        invoke_activity(self, activity_name, arguments).await
    }
}

#[async_trait]
impl<T> ActivityInvoker for Arc<T>
where
    T: ActivityInvoker + ?Sized,
{
    async fn invoke(&self, activity_name: &str, arguments: ActivityArguments) -> ActivityResult {
        (**self).invoke(activity_name, arguments).await
    }
}

/// Start-to-close deadline applied when none is configured.
pub const DEFAULT_ACTIVITY_TIMEOUT: Duration = Duration::from_secs(60);

/// Bounds every activity invocation by a start-to-close deadline.
#[derive(Debug, Clone)]
pub struct TimeoutInvoker<I> {
    inner: I,
    timeout: Duration,
}

impl<I> TimeoutInvoker<I> {
    pub fn new(inner: I, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn with_default_timeout(inner: I) -> Self {
        Self::new(inner, DEFAULT_ACTIVITY_TIMEOUT)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl<I> ActivityInvoker for TimeoutInvoker<I>
where
    I: ActivityInvoker,
{
    async fn invoke(&self, activity_name: &str, arguments: ActivityArguments) -> ActivityResult {
        match tokio::time::timeout(self.timeout, self.inner.invoke(activity_name, arguments)).await {
            Ok(result) => result,
            Err(_) => {
                let seconds = self.timeout.as_secs_f64();
                warn!(activity = %activity_name, timeout_secs = seconds, "activity timed out");
                ActivityResult::failure(format!("Activity '{activity_name}' timed out after {seconds}s"))
            }
        }
    }
}
