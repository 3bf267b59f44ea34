//! Conversion between the editor's node/edge canvas and [`WorkflowDefinition`].
//!
//! The canvas carries two synthetic nodes, `start` and `end`, that have no step
//! counterpart. Edges out of a step node encode its references; the edge
//! `sourceHandle` disambiguates which reference an edge stands for:
//!
//! | step kind  | handle     | reference           |
//! |------------|------------|---------------------|
//! | activity   | any        | `next` (first edge) |
//! | condition  | `success`  | `onSuccess`         |
//! | condition  | `failure`  | `onFailure`         |
//! | sequence   | `step`     | `steps[]` in order  |
//! | parallel   | none       | `branches[]`        |
//! | non-activity | `next`   | `next`              |
//!
//! Layout is recomputed on every load and is not part of the definition.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::workflow::{ActivityStep, ConditionStep, ParallelStep, SequenceStep, Step, StepKind, WorkflowDefinition};

pub const START_NODE_ID: &str = "start";
pub const END_NODE_ID: &str = "end";
pub const SUCCESS_HANDLE: &str = "success";
pub const FAILURE_HANDLE: &str = "failure";
pub const NEXT_HANDLE: &str = "next";
pub const STEP_HANDLE: &str = "step";
const SUCCESS_LABEL: &str = "✓ Success";
const FAILURE_LABEL: &str = "✗ Failure";

/// Kind of a canvas node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeStepType {
    Start,
    Activity,
    Condition,
    Parallel,
    Sequence,
    End,
}

impl NodeStepType {
    fn node_type(&self) -> &'static str {
        match self {
            NodeStepType::Start => "startNode",
            NodeStepType::Activity => "activityNode",
            NodeStepType::Condition => "conditionNode",
            NodeStepType::Parallel => "parallelNode",
            NodeStepType::Sequence => "sequenceNode",
            NodeStepType::End => "endNode",
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, NodeStepType::Start | NodeStepType::End)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CanvasPosition {
    pub x: f64,
    pub y: f64,
}

/// Editor-side payload of a node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CanvasNodeData {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<IndexMap<String, JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_variable: Option<String>,
    pub step_type: NodeStepType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanvasNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub position: CanvasPosition,
    pub data: CanvasNodeData,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CanvasEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl CanvasEdge {
    fn new(source: &str, target: &str) -> Self {
        Self {
            id: format!("{source}-{target}"),
            source: source.to_string(),
            target: target.to_string(),
            source_handle: None,
            label: None,
        }
    }

    fn with_handle(mut self, handle: &str) -> Self {
        self.source_handle = Some(handle.to_string());
        self
    }

    fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    fn has_handle(&self, handle: &str) -> bool {
        self.source_handle.as_deref() == Some(handle)
    }
}

/// Converts canvas nodes and edges into a workflow definition.
///
/// Start and end nodes are dropped, as are edges whose target is not a step
/// node. The root is the target of the start node's first edge, falling back
/// to the first step.
pub fn serialize_canvas(nodes: &[CanvasNode], edges: &[CanvasEdge], name: &str, description: Option<&str>) -> WorkflowDefinition {
    let step_ids: Vec<&str> = nodes
        .iter()
        .filter(|node| !node.data.step_type.is_terminal())
        .map(|node| node.id.as_str())
        .collect();

    let steps: Vec<Step> = nodes
        .iter()
        .filter(|node| !node.data.step_type.is_terminal())
        .map(|node| {
            let outgoing: Vec<&CanvasEdge> = edges
                .iter()
                .filter(|edge| edge.source == node.id && step_ids.contains(&edge.target.as_str()))
                .collect();
            step_from_node(node, &outgoing)
        })
        .collect();

    let root = nodes
        .iter()
        .find(|node| node.data.step_type == NodeStepType::Start)
        .and_then(|start| edges.iter().find(|edge| edge.source == start.id))
        .map(|edge| edge.target.clone())
        .or_else(|| steps.first().map(|step| step.id.clone()))
        .unwrap_or_default();

    WorkflowDefinition {
        name: name.to_string(),
        description: description.map(str::to_string),
        version: "1.0".to_string(),
        root,
        steps,
    }
}

fn step_from_node(node: &CanvasNode, outgoing: &[&CanvasEdge]) -> Step {
    let data = &node.data;
    let arguments = data.arguments.clone().unwrap_or_default();
    let handled_next = outgoing
        .iter()
        .find(|edge| edge.has_handle(NEXT_HANDLE))
        .map(|edge| edge.target.clone());
    let unhandled: Vec<&CanvasEdge> = outgoing.iter().copied().filter(|edge| !edge.has_handle(NEXT_HANDLE)).collect();

    let (kind, next) = match data.step_type {
        NodeStepType::Condition => {
            let mut condition = ConditionStep {
                arguments,
                on_success: None,
                on_failure: None,
            };
            for edge in &unhandled {
                if edge.has_handle(SUCCESS_HANDLE) {
                    condition.on_success = Some(edge.target.clone());
                } else if edge.has_handle(FAILURE_HANDLE) {
                    condition.on_failure = Some(edge.target.clone());
                }
            }
            if condition.on_success.is_none() && condition.on_failure.is_none() {
                for (index, edge) in unhandled.iter().enumerate() {
                    let label = edge.label.as_deref();
                    if label == Some(SUCCESS_LABEL) || index == 0 {
                        condition.on_success = Some(edge.target.clone());
                    } else if label == Some(FAILURE_LABEL) || index == 1 {
                        condition.on_failure = Some(edge.target.clone());
                    }
                }
            }
            (StepKind::Condition(condition), handled_next)
        }
        NodeStepType::Parallel => (
            StepKind::Parallel(ParallelStep {
                branches: unhandled.iter().map(|edge| edge.target.clone()).collect(),
            }),
            handled_next,
        ),
        NodeStepType::Sequence => (
            StepKind::Sequence(SequenceStep {
                steps: unhandled
                    .iter()
                    .filter(|edge| edge.has_handle(STEP_HANDLE))
                    .map(|edge| edge.target.clone())
                    .collect(),
            }),
            handled_next,
        ),
        NodeStepType::Activity | NodeStepType::Start | NodeStepType::End => (
            StepKind::Activity(ActivityStep {
                activity_name: data.activity_name.clone().unwrap_or_default(),
                arguments,
                result_variable: data.result_variable.clone(),
            }),
            outgoing.first().map(|edge| edge.target.clone()),
        ),
    };

    Step {
        id: node.id.clone(),
        name: Some(data.label.clone()),
        kind,
        next,
    }
}

/// Converts a workflow definition into canvas nodes and edges with a vertical layout.
///
/// The start and end nodes use [`START_NODE_ID`] and [`END_NODE_ID`] unless a
/// step already owns that id, in which case a `-node` suffix is appended until
/// the id is free.
pub fn deserialize_canvas(definition: &WorkflowDefinition) -> (Vec<CanvasNode>, Vec<CanvasEdge>) {
    let mut nodes = Vec::with_capacity(definition.steps.len() + 2);
    let mut edges = Vec::new();
    let start_id = synthetic_node_id(definition, START_NODE_ID);
    let end_id = synthetic_node_id(definition, END_NODE_ID);

    nodes.push(terminal_node(&start_id, "Start", NodeStepType::Start, 50.0));

    for (index, step) in definition.steps.iter().enumerate() {
        nodes.push(node_from_step(step, 150.0 + index as f64 * 120.0));
    }

    let end_y = 150.0 + definition.steps.len() as f64 * 120.0;
    nodes.push(terminal_node(&end_id, "End", NodeStepType::End, end_y));

    if !definition.root.is_empty() {
        edges.push(CanvasEdge::new(&start_id, &definition.root));
    }

    for step in &definition.steps {
        edges.extend(edges_from_step(step));
    }

    if let Some(last) = definition.steps.last() {
        let has_success = matches!(&last.kind, StepKind::Condition(condition) if condition.on_success.is_some());
        if last.next.is_none() && !has_success {
            edges.push(CanvasEdge::new(&last.id, &end_id));
        }
    }

    (nodes, edges)
}

fn synthetic_node_id(definition: &WorkflowDefinition, base: &str) -> String {
    let mut id = base.to_string();
    while definition.find_step(&id).is_some() {
        id.push_str("-node");
    }
    id
}

fn terminal_node(id: &str, label: &str, step_type: NodeStepType, y: f64) -> CanvasNode {
    CanvasNode {
        id: id.to_string(),
        node_type: step_type.node_type().to_string(),
        position: CanvasPosition { x: 250.0, y },
        data: CanvasNodeData {
            label: label.to_string(),
            activity_name: None,
            arguments: None,
            result_variable: None,
            step_type,
        },
    }
}

fn node_from_step(step: &Step, y: f64) -> CanvasNode {
    let label = step.name.clone().unwrap_or_else(|| step.id.clone());
    let non_empty = |arguments: &IndexMap<String, JsonValue>| (!arguments.is_empty()).then(|| arguments.clone());

    let data = match &step.kind {
        StepKind::Activity(activity) => CanvasNodeData {
            label,
            activity_name: Some(activity.activity_name.clone()),
            arguments: non_empty(&activity.arguments),
            result_variable: activity.result_variable.clone(),
            step_type: NodeStepType::Activity,
        },
        StepKind::Condition(condition) => CanvasNodeData {
            label,
            activity_name: None,
            arguments: non_empty(&condition.arguments),
            result_variable: None,
            step_type: NodeStepType::Condition,
        },
        StepKind::Parallel(_) => CanvasNodeData {
            label,
            activity_name: None,
            arguments: None,
            result_variable: None,
            step_type: NodeStepType::Parallel,
        },
        StepKind::Sequence(_) => CanvasNodeData {
            label,
            activity_name: None,
            arguments: None,
            result_variable: None,
            step_type: NodeStepType::Sequence,
        },
    };

    CanvasNode {
        id: step.id.clone(),
        node_type: data.step_type.node_type().to_string(),
        position: CanvasPosition { x: 250.0, y },
        data,
    }
}

fn edges_from_step(step: &Step) -> Vec<CanvasEdge> {
    let mut edges = Vec::new();
    let is_activity = matches!(step.kind, StepKind::Activity(_));

    match &step.kind {
        StepKind::Activity(_) => {}
        StepKind::Condition(condition) => {
            if let Some(target) = &condition.on_success {
                edges.push(CanvasEdge::new(&step.id, target).with_handle(SUCCESS_HANDLE).with_label(SUCCESS_LABEL));
            }
            if let Some(target) = &condition.on_failure {
                edges.push(CanvasEdge::new(&step.id, target).with_handle(FAILURE_HANDLE).with_label(FAILURE_LABEL));
            }
        }
        StepKind::Parallel(parallel) => {
            for (index, target) in parallel.branches.iter().enumerate() {
                edges.push(CanvasEdge::new(&step.id, target).with_label(format!("branch {}", index + 1)));
            }
        }
        StepKind::Sequence(sequence) => {
            for (index, target) in sequence.steps.iter().enumerate() {
                edges.push(CanvasEdge::new(&step.id, target).with_handle(STEP_HANDLE).with_label(format!("step {}", index + 1)));
            }
        }
    }

    if let Some(next) = &step.next {
        let edge = CanvasEdge::new(&step.id, next);
        edges.push(if is_activity { edge } else { edge.with_handle(NEXT_HANDLE) });
    }

    edges
}
