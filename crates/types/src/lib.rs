//! Shared type definitions for Stepflow.
//!
//! The workflow definition model, activity results and schemas, run lifecycle
//! events, and the editor canvas graph all live here so the registry, engine,
//! and CLI agree on a single serialized shape.

pub mod activity;
pub mod canvas;
pub mod workflow;

pub use activity::{
    ActivityResult, ActivitySchema, EnumOption, Parameter, ParameterKind,
    validation::{ArgumentIssue, validate_arguments},
};
pub use canvas::{CanvasEdge, CanvasNode, CanvasNodeData, CanvasPosition, NodeStepType, deserialize_canvas, serialize_canvas};
pub use workflow::{
    ActivityStep, ConditionOperator, ConditionStep, ExecuteWorkflowRequest, ExecuteWorkflowResponse, ParallelStep, RunEvent,
    RunStatus, SequenceStep, Step, StepId, StepKind, StepOutcome, WorkflowDefinition, WorkflowResultResponse,
    validation::{IssueSeverity, ValidationIssue, validate_definition},
};

/// Returns the variable name when `value` is a whole-string `${name}` reference.
///
/// Partial templates such as `"hello ${name}"` are not references.
pub fn variable_reference(value: &serde_json::Value) -> Option<&str> {
    let text = value.as_str()?;
    let name = text.strip_prefix("${")?.strip_suffix('}')?;
    if name.contains('}') {
        return None;
    }
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recognises_whole_string_references() {
        assert_eq!(variable_reference(&json!("${userEmail}")), Some("userEmail"));
        assert_eq!(variable_reference(&json!("${}")), Some(""));
        assert_eq!(variable_reference(&json!("hi ${name}")), None);
        assert_eq!(variable_reference(&json!("${name} there")), None);
        assert_eq!(variable_reference(&json!("${a} and ${b}")), None);
        assert_eq!(variable_reference(&json!(5)), None);
    }
}
