use std::{sync::Arc, time::Duration};

use serde_json::json;
use stepflow_engine::{ServiceError, WorkflowService, workflow_from_yaml};
use stepflow_registry::{ActivityRegistry, SampleActivityOptions, register_builtin_activities};
use stepflow_types::{ExecuteWorkflowRequest, RunStatus, WorkflowDefinition};
use uuid::Uuid;

fn registry(options: SampleActivityOptions) -> Arc<ActivityRegistry> {
    let mut registry = ActivityRegistry::new();
    register_builtin_activities(&mut registry, options);
    Arc::new(registry)
}

fn request(definition: WorkflowDefinition, input: serde_json::Value) -> ExecuteWorkflowRequest {
    serde_json::from_value(json!({
        "workflowDefinition": definition,
        "input": input,
    }))
    .expect("request json")
}

fn shout() -> WorkflowDefinition {
    workflow_from_yaml(
        r#"
name: shout
root: upper
steps:
  - id: upper
    type: activity
    activityName: transformData
    arguments: { input: "${word}", operation: "${operation}" }
    resultVariable: shouted
"#,
    )
    .expect("workflow yaml")
}

#[tokio::test]
async fn start_then_result_returns_final_state() {
    let service = WorkflowService::new(registry(SampleActivityOptions::instant()));

    let started = service
        .start(request(shout(), json!({"word": "hello", "operation": "uppercase"})))
        .expect("run starts");

    assert_eq!(started.status, "started");
    let (name, millis) = started.workflow_id.rsplit_once('-').expect("name-millis id");
    assert_eq!(name, "shout");
    assert!(millis.parse::<i64>().is_ok(), "{}", started.workflow_id);
    assert!(Uuid::parse_str(&started.run_id).is_ok());

    let response = service.result(&started.workflow_id).await.expect("run succeeds");
    assert_eq!(response.result["shouted"], json!({"transformed": "HELLO"}));
    assert_eq!(response.result["word"], json!("hello"));
    assert_eq!(service.status(&started.workflow_id), Ok(RunStatus::Succeeded));
}

#[tokio::test]
async fn failed_runs_report_the_interpreter_error() {
    let service = WorkflowService::new(registry(SampleActivityOptions::instant()));
    let started = service
        .start(request(shout(), json!({"word": "hello", "operation": "rot13"})))
        .expect("run starts");

    let error = service.result(&started.workflow_id).await.expect_err("run fails");
    assert_eq!(
        error,
        ServiceError::RunFailed("Activity 'transformData' failed: Unknown operation: rot13".into())
    );
    assert_eq!(service.status(&started.workflow_id), Ok(RunStatus::Failed));
}

#[tokio::test]
async fn rejects_definitions_without_a_name() {
    let service = WorkflowService::new(registry(SampleActivityOptions::instant()));
    let mut definition = shout();
    definition.name = String::new();

    let error = service.start(request(definition, json!(null))).expect_err("invalid");
    assert_eq!(error, ServiceError::InvalidDefinition);
    assert_eq!(error.to_string(), "Invalid workflow definition");
}

#[tokio::test]
async fn unknown_workflow_ids_are_not_found() {
    let service = WorkflowService::new(registry(SampleActivityOptions::instant()));
    assert_eq!(service.result("ghost-1").await, Err(ServiceError::RunNotFound("ghost-1".into())));
    assert_eq!(service.status("ghost-1"), Err(ServiceError::RunNotFound("ghost-1".into())));
}

#[tokio::test]
async fn concurrent_starts_get_distinct_ids() {
    let service = WorkflowService::new(registry(SampleActivityOptions::instant()));
    let input = json!({"word": "a", "operation": "reverse"});

    let first = service.start(request(shout(), input.clone())).expect("first run");
    let second = service.start(request(shout(), input)).expect("second run");

    assert_ne!(first.workflow_id, second.workflow_id);
    assert_ne!(first.run_id, second.run_id);
    assert!(service.result(&first.workflow_id).await.is_ok());
    assert!(service.result(&second.workflow_id).await.is_ok());
}

#[tokio::test]
async fn forgotten_runs_are_released() {
    let service = WorkflowService::new(registry(SampleActivityOptions::instant()));
    let started = service
        .start(request(shout(), json!({"word": "bye", "operation": "lowercase"})))
        .expect("run starts");
    service.result(&started.workflow_id).await.expect("run succeeds");

    assert_eq!(service.forget(&started.workflow_id), Ok(RunStatus::Succeeded));
    assert_eq!(
        service.status(&started.workflow_id),
        Err(ServiceError::RunNotFound(started.workflow_id.clone()))
    );
    assert_eq!(
        service.forget(&started.workflow_id),
        Err(ServiceError::RunNotFound(started.workflow_id.clone()))
    );
}

#[tokio::test]
async fn activity_deadline_fails_slow_runs() {
    let service = WorkflowService::with_activity_timeout(registry(SampleActivityOptions::default()), Duration::from_millis(50));
    let definition = workflow_from_yaml(
        r#"
name: sleepy
root: nap
steps:
  - { id: nap, type: activity, activityName: wait, arguments: { seconds: 5 } }
"#,
    )
    .expect("workflow yaml");

    let started = service.start(request(definition, json!({}))).expect("run starts");
    assert_eq!(service.status(&started.workflow_id), Ok(RunStatus::Running));

    let error = service.result(&started.workflow_id).await.expect_err("run times out");
    assert_eq!(
        error,
        ServiceError::RunFailed("Activity 'wait' failed: Activity 'wait' timed out after 0.05s".into())
    );
}

#[test]
fn exposes_activity_schemas() {
    let service = WorkflowService::new(registry(SampleActivityOptions::instant()));

    let names: Vec<String> = service.activities().into_iter().map(|schema| schema.name).collect();
    assert_eq!(names, vec!["sendEmail", "httpRequest", "transformData", "wait", "logMessage", "echo"]);

    assert_eq!(service.activity_schema("wait").map(|schema| schema.label), Ok("Wait / Delay".to_string()));
    assert_eq!(service.activity_schema("nope"), Err(ServiceError::ActivityNotFound("nope".into())));
}
