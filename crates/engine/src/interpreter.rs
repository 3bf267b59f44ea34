//! Recursive interpreter for workflow definitions.
//!
//! A run starts at the root step and walks the step graph depth first. Every
//! step kind may carry `next`, which is followed once the step's own work
//! (including any children it dispatched) has finished. All steps of a run
//! share one [`ExecutionState`].
//!
//! Reference handling is permissive: unresolved `next`, `onSuccess`,
//! `onFailure`, and `sequence` children are skipped. A missing root or a
//! missing parallel branch stops the run before anything executes.
//!
//! Parallel branches are spawned as Tokio tasks. The first branch to fail
//! fails the parallel step; branches still in flight are detached, not
//! cancelled, and keep writing to the shared state until they finish.

use std::sync::Arc;

use chrono::Utc;
use futures_util::{
    FutureExt, StreamExt,
    future::BoxFuture,
    stream::FuturesUnordered,
};
use serde_json::{Map as JsonMap, Value};
use stepflow_types::{
    ActivityResult, ActivityStep, ConditionStep, ParallelStep, RunEvent, RunStatus, SequenceStep, Step, StepKind, StepOutcome,
    WorkflowDefinition,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::{
    error::InterpreterError,
    invoker::ActivityInvoker,
    resolve::{evaluate_condition, resolve_arguments},
    state::ExecutionState,
};

type StepFuture = BoxFuture<'static, Result<(), InterpreterError>>;

/// Runs `definition` to completion and returns the final execution state.
pub async fn run_workflow(
    definition: &WorkflowDefinition,
    input: JsonMap<String, Value>,
    invoker: Arc<dyn ActivityInvoker>,
) -> Result<JsonMap<String, Value>, InterpreterError> {
    Interpreter::new(invoker).run(definition.clone(), input).await
}

/// Configured interpreter: an activity invoker plus an optional event sink.
#[derive(Clone)]
pub struct Interpreter {
    invoker: Arc<dyn ActivityInvoker>,
    events: Option<UnboundedSender<RunEvent>>,
}

impl Interpreter {
    pub fn new(invoker: Arc<dyn ActivityInvoker>) -> Self {
        Self { invoker, events: None }
    }

    /// Emits [`RunEvent`]s to `events` while runs progress. A closed receiver
    /// has no effect on execution.
    pub fn with_events(mut self, events: UnboundedSender<RunEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub async fn run(
        &self,
        definition: impl Into<Arc<WorkflowDefinition>>,
        input: JsonMap<String, Value>,
    ) -> Result<JsonMap<String, Value>, InterpreterError> {
        let definition: Arc<WorkflowDefinition> = definition.into();
        let scope = Arc::new(RunScope {
            definition: Arc::clone(&definition),
            invoker: Arc::clone(&self.invoker),
            state: ExecutionState::new(input),
            events: self.events.clone(),
        });

        scope.emit(RunEvent::RunStarted {
            workflow: definition.name.clone(),
            at: Utc::now(),
        });

        let outcome = match scope.position(&definition.root) {
            Some(root) => {
                info!(workflow = %definition.name, root = %definition.root, "starting workflow run");
                execute_step(Arc::clone(&scope), root).await
            }
            None => Err(InterpreterError::root_not_found(&definition.root)),
        };

        match outcome {
            Ok(()) => {
                info!(workflow = %definition.name, "workflow run completed");
                scope.emit(RunEvent::RunCompleted {
                    status: RunStatus::Succeeded,
                    finished_at: Utc::now(),
                    error: None,
                });
                Ok(scope.state.snapshot())
            }
            Err(error) => {
                warn!(workflow = %definition.name, error = %error, "workflow run failed");
                scope.emit(RunEvent::RunCompleted {
                    status: RunStatus::Failed,
                    finished_at: Utc::now(),
                    error: Some(error.to_string()),
                });
                Err(error)
            }
        }
    }
}

struct RunScope {
    definition: Arc<WorkflowDefinition>,
    invoker: Arc<dyn ActivityInvoker>,
    state: ExecutionState,
    events: Option<UnboundedSender<RunEvent>>,
}

impl RunScope {
    /// Index of the first step with `step_id`.
    fn position(&self, step_id: &str) -> Option<usize> {
        self.definition.steps.iter().position(|step| step.id == step_id)
    }

    fn emit(&self, event: RunEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

fn execute_step(scope: Arc<RunScope>, index: usize) -> StepFuture {
    async move {
        let step = &scope.definition.steps[index];
        let kind = step.type_name();
        debug!(step_id = %step.id, kind, "executing step");
        scope.emit(RunEvent::StepStarted {
            step_id: step.id.clone(),
            kind: kind.to_string(),
        });

        let outcome = match &step.kind {
            StepKind::Activity(activity) => execute_activity(&scope, step, activity).await,
            StepKind::Sequence(sequence) => execute_sequence(&scope, step, sequence).await,
            StepKind::Parallel(parallel) => execute_parallel(&scope, step, parallel).await,
            StepKind::Condition(condition) => execute_condition(&scope, step, condition).await,
        };

        scope.emit(RunEvent::StepFinished {
            step_id: step.id.clone(),
            kind: kind.to_string(),
            status: if outcome.is_ok() { StepOutcome::Succeeded } else { StepOutcome::Failed },
            error: outcome.as_ref().err().map(ToString::to_string),
        });
        outcome?;

        if let Some(next) = &step.next {
            follow(&scope, step, "next", next).await?;
        }
        Ok(())
    }
    .boxed()
}

/// Executes the step referenced by `target`, skipping unresolved references.
async fn follow(scope: &Arc<RunScope>, from: &Step, field: &str, target: &str) -> Result<(), InterpreterError> {
    match scope.position(target) {
        Some(index) => execute_step(Arc::clone(scope), index).await,
        None => {
            warn!(step_id = %from.id, field, target = %target, "referenced step not found; skipping");
            Ok(())
        }
    }
}

async fn execute_activity(scope: &RunScope, step: &Step, activity: &ActivityStep) -> Result<(), InterpreterError> {
    if activity.activity_name.trim().is_empty() {
        return Err(InterpreterError::MissingActivityName { step_id: step.id.clone() });
    }

    let arguments = resolve_arguments(&activity.arguments, &scope.state);
    let result = scope.invoker.invoke(&activity.activity_name, arguments).await;

    if result.success
        && let Some(variable) = &activity.result_variable
    {
        match &result.data {
            Some(data) => scope.state.set(variable.clone(), data.clone()),
            None => {
                scope.state.remove(variable);
            }
        }
    }
    scope.state.set(step.id.clone(), result_value(&result));

    if result.success {
        debug!(step_id = %step.id, activity = %activity.activity_name, "activity succeeded");
        Ok(())
    } else {
        warn!(
            step_id = %step.id,
            activity = %activity.activity_name,
            error = %result.error_message(),
            "activity failed"
        );
        Err(InterpreterError::ActivityFailure {
            activity: activity.activity_name.clone(),
            message: result.error_message().to_string(),
        })
    }
}

async fn execute_sequence(scope: &Arc<RunScope>, step: &Step, sequence: &SequenceStep) -> Result<(), InterpreterError> {
    for child in &sequence.steps {
        follow(scope, step, "steps", child).await?;
    }
    Ok(())
}

async fn execute_parallel(scope: &Arc<RunScope>, step: &Step, parallel: &ParallelStep) -> Result<(), InterpreterError> {
    let mut branches = Vec::with_capacity(parallel.branches.len());
    for branch_id in &parallel.branches {
        let Some(index) = scope.position(branch_id) else {
            return Err(InterpreterError::MissingBranch {
                step_id: step.id.clone(),
                branch_id: branch_id.clone(),
            });
        };
        branches.push(index);
    }

    debug!(step_id = %step.id, branches = branches.len(), "fanning out parallel branches");
    let mut pending: FuturesUnordered<_> = branches
        .into_iter()
        .map(|index| tokio::spawn(execute_step(Arc::clone(scope), index)))
        .collect();

    while let Some(joined) = pending.next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(error)) => return Err(error),
            Err(join_error) => {
                return Err(InterpreterError::BranchPanicked {
                    step_id: step.id.clone(),
                    message: join_error.to_string(),
                });
            }
        }
    }
    Ok(())
}

async fn execute_condition(scope: &Arc<RunScope>, step: &Step, condition: &ConditionStep) -> Result<(), InterpreterError> {
    let passed = evaluate_condition(&condition.arguments, &scope.state);
    let (field, target) = if passed {
        ("onSuccess", condition.on_success.as_deref())
    } else {
        ("onFailure", condition.on_failure.as_deref())
    };
    debug!(step_id = %step.id, passed, "condition evaluated");

    match target {
        Some(target) => follow(scope, step, field, target).await,
        None => Ok(()),
    }
}

/// JSON form of an activity result as stored under the step id.
fn result_value(result: &ActivityResult) -> Value {
    let mut object = JsonMap::new();
    object.insert("success".into(), Value::Bool(result.success));
    if let Some(data) = &result.data {
        object.insert("data".into(), data.clone());
    }
    if let Some(error) = &result.error {
        object.insert("error".into(), Value::String(error.clone()));
    }
    Value::Object(object)
}
