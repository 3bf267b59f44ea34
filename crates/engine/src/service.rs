//! In-process run service: start a workflow, then poll or await its result.
//!
//! Each started run gets a workflow id derived from the definition name and
//! the start time, plus a random run id. Runs execute on spawned Tokio tasks;
//! their terminal outcome is published through a `watch` channel so any number
//! of callers can wait for it. Finished runs stay queryable until
//! [`WorkflowService::forget`] is called.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{Map as JsonMap, Value};
use stepflow_registry::ActivityRegistry;
use stepflow_types::{ActivitySchema, ExecuteWorkflowRequest, ExecuteWorkflowResponse, RunStatus, WorkflowResultResponse};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    interpreter::Interpreter,
    invoker::{ActivityInvoker, DEFAULT_ACTIVITY_TIMEOUT, TimeoutInvoker},
};

/// Errors surfaced by [`WorkflowService`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Invalid workflow definition")]
    InvalidDefinition,
    #[error("Workflow '{0}' not found")]
    RunNotFound(String),
    #[error("Activity '{0}' not found")]
    ActivityNotFound(String),
    /// The run finished with an error; carries the interpreter's message.
    #[error("{0}")]
    RunFailed(String),
}

type RunOutcome = Option<Result<JsonMap<String, Value>, String>>;

/// Starts workflow runs and exposes their results and the activity catalogue.
pub struct WorkflowService {
    registry: Arc<ActivityRegistry>,
    interpreter: Interpreter,
    runs: Mutex<HashMap<String, watch::Receiver<RunOutcome>>>,
}

impl WorkflowService {
    /// Service whose activities run with the default one minute deadline.
    pub fn new(registry: Arc<ActivityRegistry>) -> Self {
        Self::with_activity_timeout(registry, DEFAULT_ACTIVITY_TIMEOUT)
    }

    pub fn with_activity_timeout(registry: Arc<ActivityRegistry>, timeout: Duration) -> Self {
        let invoker: Arc<dyn ActivityInvoker> = Arc::new(TimeoutInvoker::new(Arc::clone(&registry), timeout));
        Self::with_invoker(registry, invoker)
    }

    /// Service that runs activities through `invoker` and uses `registry` for schema lookups.
    pub fn with_invoker(registry: Arc<ActivityRegistry>, invoker: Arc<dyn ActivityInvoker>) -> Self {
        Self {
            registry,
            interpreter: Interpreter::new(invoker),
            runs: Mutex::new(HashMap::new()),
        }
    }

    /// Starts a run in the background. Must be called from within a Tokio runtime.
    pub fn start(&self, request: ExecuteWorkflowRequest) -> Result<ExecuteWorkflowResponse, ServiceError> {
        let definition = request.workflow_definition;
        if definition.name.trim().is_empty() {
            return Err(ServiceError::InvalidDefinition);
        }
        let input = request.input.unwrap_or_default();

        let (sender, receiver) = watch::channel(None);
        let workflow_id = {
            let mut runs = self.runs.lock();
            let mut started_at = Utc::now().timestamp_millis();
            let mut workflow_id = format!("{}-{started_at}", definition.name);
            while runs.contains_key(&workflow_id) {
                started_at += 1;
                workflow_id = format!("{}-{started_at}", definition.name);
            }
            runs.insert(workflow_id.clone(), receiver);
            workflow_id
        };
        let run_id = Uuid::new_v4().to_string();
        info!(workflow_id = %workflow_id, run_id = %run_id, "workflow started");

        let interpreter = self.interpreter.clone();
        let task_workflow_id = workflow_id.clone();
        tokio::spawn(async move {
            let outcome = interpreter.run(definition, input).await.map_err(|error| error.to_string());
            debug!(workflow_id = %task_workflow_id, succeeded = outcome.is_ok(), "workflow finished");
            sender.send_replace(Some(outcome));
        });

        Ok(ExecuteWorkflowResponse {
            workflow_id,
            run_id,
            status: "started".to_string(),
        })
    }

    /// Waits for the run to finish and returns its final state.
    pub async fn result(&self, workflow_id: &str) -> Result<WorkflowResultResponse, ServiceError> {
        let mut receiver = self.receiver(workflow_id)?;
        let outcome = receiver
            .wait_for(Option::is_some)
            .await
            .map_err(|_| ServiceError::RunFailed(format!("Workflow '{workflow_id}' stopped before reporting a result")))?
            .clone();

        match outcome {
            Some(Ok(result)) => Ok(WorkflowResultResponse { result }),
            Some(Err(message)) => Err(ServiceError::RunFailed(message)),
            None => Err(ServiceError::RunFailed(format!("Workflow '{workflow_id}' has no result"))),
        }
    }

    /// Current status without waiting.
    pub fn status(&self, workflow_id: &str) -> Result<RunStatus, ServiceError> {
        let receiver = self.receiver(workflow_id)?;
        let status = status_of(&receiver.borrow());
        Ok(status)
    }

    /// Drops the bookkeeping for `workflow_id` and returns its status at that moment.
    ///
    /// Runs are kept until forgotten, so long-lived hosts should forget runs
    /// once their results have been collected. Forgetting a running workflow
    /// does not stop it; its result is simply discarded.
    pub fn forget(&self, workflow_id: &str) -> Result<RunStatus, ServiceError> {
        let receiver = self
            .runs
            .lock()
            .remove(workflow_id)
            .ok_or_else(|| ServiceError::RunNotFound(workflow_id.to_string()))?;
        let status = status_of(&receiver.borrow());
        debug!(workflow_id = %workflow_id, ?status, "workflow forgotten");
        Ok(status)
    }

    /// Schemas of all registered activities, in registration order.
    pub fn activities(&self) -> Vec<ActivitySchema> {
        self.registry.list_schemas().into_iter().cloned().collect()
    }

    pub fn activity_schema(&self, name: &str) -> Result<ActivitySchema, ServiceError> {
        self.registry
            .get_schema(name)
            .cloned()
            .ok_or_else(|| ServiceError::ActivityNotFound(name.to_string()))
    }

    fn receiver(&self, workflow_id: &str) -> Result<watch::Receiver<RunOutcome>, ServiceError> {
        self.runs
            .lock()
            .get(workflow_id)
            .cloned()
            .ok_or_else(|| ServiceError::RunNotFound(workflow_id.to_string()))
    }
}

fn status_of(outcome: &RunOutcome) -> RunStatus {
    match outcome {
        None => RunStatus::Running,
        Some(Ok(_)) => RunStatus::Succeeded,
        Some(Err(_)) => RunStatus::Failed,
    }
}
