//! Strongly typed workflow schema definitions shared across the registry, engine, and CLI.
//!
//! A workflow is a flat list of steps that reference each other by id. The root
//! step is the entry point; `next`, `onSuccess`, `onFailure`, `steps`, and
//! `branches` link the remaining steps into a graph. Keys are camelCase on the
//! wire so documents exported by the visual editor load unchanged.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

pub mod validation;

/// Identifier of a step within a single workflow definition.
pub type StepId = String;

/// Describes a fully authored workflow: metadata, the root step, and every step in the graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowDefinition {
    /// Human-readable workflow name, also used to derive run identifiers.
    pub name: String,
    /// Optional descriptive copy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Author-controlled version string.
    #[serde(default = "default_version")]
    pub version: String,
    /// Identifier of the step evaluated first.
    #[serde(default)]
    pub root: StepId,
    /// Every step of the graph in authoring order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl WorkflowDefinition {
    /// Returns the first step whose id matches `step_id`.
    pub fn find_step(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|step| step.id == step_id)
    }

    /// Returns the root step when it resolves.
    pub fn root_step(&self) -> Option<&Step> {
        self.find_step(&self.root)
    }
}

/// A single node of the workflow graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Step {
    /// Unique step identifier; activity results are stored in state under this key.
    pub id: StepId,
    /// Optional display label carried over from the editor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Type-specific payload, tagged by `type`.
    #[serde(flatten)]
    pub kind: StepKind,
    /// Step evaluated after this one (and its children) completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<StepId>,
}

impl Step {
    /// Wire name of the step type.
    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// Every outgoing step reference as `(field, target)` pairs, in declaration order.
    pub fn references(&self) -> Vec<(&'static str, &str)> {
        let mut references = Vec::new();
        match &self.kind {
            StepKind::Activity(_) => {}
            StepKind::Sequence(sequence) => references.extend(sequence.steps.iter().map(|id| ("steps", id.as_str()))),
            StepKind::Parallel(parallel) => references.extend(parallel.branches.iter().map(|id| ("branches", id.as_str()))),
            StepKind::Condition(condition) => {
                if let Some(target) = &condition.on_success {
                    references.push(("onSuccess", target.as_str()));
                }
                if let Some(target) = &condition.on_failure {
                    references.push(("onFailure", target.as_str()));
                }
            }
        }
        if let Some(next) = &self.next {
            references.push(("next", next.as_str()));
        }
        references
    }
}

/// Closed set of step kinds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    /// Invokes a registered activity by name.
    Activity(ActivityStep),
    /// Evaluates child steps one after another.
    Sequence(SequenceStep),
    /// Evaluates child steps concurrently and joins on all of them.
    Parallel(ParallelStep),
    /// Branches on a comparison against execution state.
    Condition(ConditionStep),
}

impl StepKind {
    /// Wire name of the step type.
    pub fn type_name(&self) -> &'static str {
        match self {
            StepKind::Activity(_) => "activity",
            StepKind::Sequence(_) => "sequence",
            StepKind::Parallel(_) => "parallel",
            StepKind::Condition(_) => "condition",
        }
    }
}

/// Payload of an `activity` step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStep {
    /// Registered activity name.
    #[serde(default)]
    pub activity_name: String,
    /// Arguments passed to the activity; whole-string `${name}` values are resolved from state.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub arguments: IndexMap<String, JsonValue>,
    /// State key receiving the activity's `data` payload on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_variable: Option<String>,
}

/// Payload of a `sequence` step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SequenceStep {
    /// Ordered child step ids.
    #[serde(default)]
    pub steps: Vec<StepId>,
}

/// Payload of a `parallel` step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ParallelStep {
    /// Child step ids evaluated concurrently.
    #[serde(default)]
    pub branches: Vec<StepId>,
}

/// Payload of a `condition` step.
///
/// `arguments` is kept as an open map (`variable`, `operator`, `value`) so
/// documents with unknown operators still load and round-trip; such
/// conditions evaluate to false.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConditionStep {
    /// Condition operands: `variable`, `operator`, `value`.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub arguments: IndexMap<String, JsonValue>,
    /// Step evaluated when the condition holds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_success: Option<StepId>,
    /// Step evaluated when the condition does not hold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<StepId>,
}

impl ConditionStep {
    /// Builds the canonical `{variable, operator, value}` argument map.
    pub fn arguments_for(variable: &str, operator: ConditionOperator, value: JsonValue) -> IndexMap<String, JsonValue> {
        let mut arguments = IndexMap::new();
        arguments.insert("variable".to_string(), JsonValue::String(variable.to_string()));
        arguments.insert("operator".to_string(), JsonValue::String(operator.as_str().to_string()));
        arguments.insert("value".to_string(), value);
        arguments
    }
}

/// Comparison operators understood by `condition` steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Exists,
}

impl ConditionOperator {
    /// Every supported operator.
    pub const ALL: [ConditionOperator; 5] = [
        ConditionOperator::Equals,
        ConditionOperator::NotEquals,
        ConditionOperator::GreaterThan,
        ConditionOperator::LessThan,
        ConditionOperator::Exists,
    ];

    /// Wire name used in workflow documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionOperator::Equals => "equals",
            ConditionOperator::NotEquals => "notEquals",
            ConditionOperator::GreaterThan => "greaterThan",
            ConditionOperator::LessThan => "lessThan",
            ConditionOperator::Exists => "exists",
        }
    }
}

impl FromStr for ConditionOperator {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ConditionOperator::ALL
            .into_iter()
            .find(|operator| operator.as_str() == value)
            .ok_or_else(|| format!("unknown condition operator '{value}'"))
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request accepted by the run service: a definition plus its initial input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteWorkflowRequest {
    pub workflow_definition: WorkflowDefinition,
    #[serde(default)]
    pub input: Option<JsonMap<String, JsonValue>>,
}

/// Acknowledgement returned when a run has been started.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteWorkflowResponse {
    pub workflow_id: String,
    pub run_id: String,
    pub status: String,
}

/// Final state of a completed run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowResultResponse {
    pub result: JsonMap<String, JsonValue>,
}

/// Lifecycle status of a workflow run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
}

/// Outcome of a single evaluated step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Succeeded,
    Failed,
}

/// Events emitted while a workflow run progresses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    /// The interpreter accepted the definition and is about to evaluate the root step.
    RunStarted { workflow: String, at: DateTime<Utc> },
    /// A step began evaluating.
    StepStarted { step_id: StepId, kind: String },
    /// A step (including its children, excluding its `next` chain) finished.
    StepFinished {
        step_id: StepId,
        kind: String,
        status: StepOutcome,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// The run reached a terminal state.
    RunCompleted {
        status: RunStatus,
        finished_at: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

fn default_version() -> String {
    "1.0".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = r#"
name: onboarding
description: Greets a new user
version: "2"
root: greet
steps:
  - id: greet
    name: Greet
    type: activity
    activityName: sendEmail
    arguments:
      to: ${userEmail}
      subject: Welcome
    resultVariable: email
    next: check
  - id: check
    type: condition
    arguments:
      variable: email
      operator: exists
    onSuccess: fanout
  - id: fanout
    type: parallel
    branches: [a, b]
    next: tail
  - id: tail
    type: sequence
    steps: [a]
  - id: a
    type: activity
    activityName: logMessage
  - id: b
    type: activity
    activityName: wait
    arguments:
      seconds: 0
"#;

    #[test]
    fn deserializes_every_step_kind() {
        let definition: WorkflowDefinition = serde_yaml::from_str(SAMPLE).expect("deserialize workflow");

        assert_eq!(definition.name, "onboarding");
        assert_eq!(definition.version, "2");
        assert_eq!(definition.steps.len(), 6);

        let greet = definition.root_step().expect("root resolves");
        let StepKind::Activity(activity) = &greet.kind else {
            panic!("expected activity step, got {}", greet.type_name());
        };
        assert_eq!(activity.activity_name, "sendEmail");
        assert_eq!(activity.arguments["to"], json!("${userEmail}"));
        assert_eq!(activity.result_variable.as_deref(), Some("email"));
        assert_eq!(greet.next.as_deref(), Some("check"));

        let check = definition.find_step("check").expect("condition step");
        assert!(matches!(&check.kind, StepKind::Condition(c) if c.on_success.as_deref() == Some("fanout") && c.on_failure.is_none()));

        let fanout = definition.find_step("fanout").expect("parallel step");
        assert!(matches!(&fanout.kind, StepKind::Parallel(p) if p.branches == vec!["a", "b"]));
        assert_eq!(fanout.next.as_deref(), Some("tail"));

        let tail = definition.find_step("tail").expect("sequence step");
        assert!(matches!(&tail.kind, StepKind::Sequence(s) if s.steps == vec!["a"]));
    }

    #[test]
    fn yaml_round_trip_preserves_fields() {
        let definition: WorkflowDefinition = serde_yaml::from_str(SAMPLE).expect("deserialize workflow");
        let dumped = serde_yaml::to_string(&definition).expect("serialize workflow");
        let reloaded: WorkflowDefinition = serde_yaml::from_str(&dumped).expect("reload workflow");

        assert_eq!(reloaded, definition);
        assert!(dumped.contains("activityName: sendEmail"));
        assert!(dumped.contains("resultVariable: email"));
        assert!(dumped.contains("onSuccess: fanout"));
        assert!(!dumped.contains("onFailure"), "absent optionals are omitted:\n{dumped}");
    }

    #[test]
    fn unknown_step_type_is_rejected() {
        let yaml_text = r#"
name: bad
version: "1.0"
root: s1
steps:
  - id: s1
    type: loop
"#;
        let error = serde_yaml::from_str::<WorkflowDefinition>(yaml_text).expect_err("unknown type should fail");
        assert!(error.to_string().contains("loop"), "{error}");
    }

    #[test]
    fn step_references_follow_declaration_order() {
        let step = Step {
            id: "c".into(),
            name: None,
            kind: StepKind::Condition(ConditionStep {
                arguments: ConditionStep::arguments_for("count", ConditionOperator::Equals, json!(5)),
                on_success: Some("yes".into()),
                on_failure: Some("no".into()),
            }),
            next: Some("after".into()),
        };

        assert_eq!(step.references(), vec![("onSuccess", "yes"), ("onFailure", "no"), ("next", "after")]);
    }

    #[test]
    fn parses_condition_operators() {
        assert_eq!("greaterThan".parse::<ConditionOperator>(), Ok(ConditionOperator::GreaterThan));
        assert!("between".parse::<ConditionOperator>().is_err());
        for operator in ConditionOperator::ALL {
            assert_eq!(operator.as_str().parse::<ConditionOperator>(), Ok(operator));
        }
    }

    #[test]
    fn run_events_serialize_with_event_tag() {
        let event = RunEvent::StepStarted {
            step_id: "s1".into(),
            kind: "activity".into(),
        };
        let value = serde_json::to_value(&event).expect("serialize event");
        assert_eq!(value, json!({"event": "step_started", "step_id": "s1", "kind": "activity"}));
    }
}
