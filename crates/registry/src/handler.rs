use std::future::Future;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map as JsonMap, Value};
use stepflow_types::ActivityResult;

/// Arguments handed to an activity after variable resolution.
pub type ActivityArguments = JsonMap<String, Value>;

/// An executable activity.
///
/// Handlers report domain failures either by returning
/// [`ActivityResult::failure`] or by returning `Err`; both surface to the
/// interpreter as a failed result through [`invoke_activity`](crate::invoke_activity).
#[async_trait]
pub trait ActivityHandler: Send + Sync {
    async fn call(&self, arguments: ActivityArguments) -> Result<ActivityResult>;
}

#[async_trait]
impl<F, Fut> ActivityHandler for F
where
    F: Fn(ActivityArguments) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ActivityResult>> + Send + 'static,
{
    async fn call(&self, arguments: ActivityArguments) -> Result<ActivityResult> {
        (self)(arguments).await
    }
}
