//! Structural validation for workflow definitions.
//!
//! The interpreter itself is permissive: unresolved `next`, `onSuccess`,
//! `onFailure`, and `sequence` references are skipped at runtime. These checks
//! give tooling a strict view of the same graph so authors can catch dangling
//! references, duplicate ids, and cycles before a run starts.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    fmt,
};

use serde::{Deserialize, Serialize};

use super::{ConditionOperator, StepKind, WorkflowDefinition};
use crate::canvas::{END_NODE_ID, START_NODE_ID};

/// How serious a validation finding is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    /// The definition will fail or misbehave at runtime.
    Error,
    /// The definition runs but probably not as intended.
    Warning,
}

/// A single validation finding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    /// Step the finding is attached to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    pub message: String,
}

impl ValidationIssue {
    pub fn error(step_id: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Error,
            step_id: step_id.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn warning(step_id: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Warning,
            step_id: step_id.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == IssueSeverity::Error
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            IssueSeverity::Error => "error",
            IssueSeverity::Warning => "warning",
        };
        match &self.step_id {
            Some(step_id) => write!(f, "{severity}: step '{step_id}': {}", self.message),
            None => write!(f, "{severity}: {}", self.message),
        }
    }
}

/// Validates a workflow definition against the strict reference policy.
///
/// Checks performed:
/// - the workflow has a name and a root that resolves to a step
/// - step ids are non-empty and unique
/// - every `next`, `onSuccess`, `onFailure`, `steps[]`, and `branches[]` reference resolves
/// - activity steps name an activity; condition steps carry `variable` and a known `operator`
/// - the reference graph is acyclic (a cycle recurses forever at runtime)
/// - steps unreachable from the root are reported as warnings
/// - step ids `start` and `end` are reported as warnings (they shadow the canvas terminals)
pub fn validate_definition(definition: &WorkflowDefinition) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if definition.name.trim().is_empty() {
        issues.push(ValidationIssue::error(None, "workflow name is required"));
    }

    let mut known_ids: HashSet<&str> = HashSet::new();
    for step in &definition.steps {
        if step.id.trim().is_empty() {
            issues.push(ValidationIssue::error(None, "step id cannot be empty"));
            continue;
        }
        if !known_ids.insert(step.id.as_str()) {
            issues.push(ValidationIssue::error(Some(&step.id), "duplicate step identifier"));
        }
        if step.id == START_NODE_ID || step.id == END_NODE_ID {
            issues.push(ValidationIssue::warning(
                Some(&step.id),
                "step id is reserved for the canvas start/end nodes; the editor renames that node",
            ));
        }
    }

    if definition.root.trim().is_empty() {
        issues.push(ValidationIssue::error(None, "root step is not set"));
    } else if !known_ids.contains(definition.root.as_str()) {
        issues.push(ValidationIssue::error(None, format!("root step '{}' not found", definition.root)));
    }

    for step in &definition.steps {
        for (field, target) in step.references() {
            if !known_ids.contains(target) {
                issues.push(ValidationIssue::error(
                    Some(&step.id),
                    format!("{field} references unknown step '{target}'"),
                ));
            } else if target == step.id {
                issues.push(ValidationIssue::error(Some(&step.id), format!("{field} references the step itself")));
            }
        }

        match &step.kind {
            StepKind::Activity(activity) if activity.activity_name.trim().is_empty() => {
                issues.push(ValidationIssue::error(Some(&step.id), "activity step is missing activityName"));
            }
            StepKind::Condition(condition) => {
                let variable = condition.arguments.get("variable").and_then(|value| value.as_str()).unwrap_or_default();
                if variable.is_empty() {
                    issues.push(ValidationIssue::warning(
                        Some(&step.id),
                        "condition has no variable and always evaluates to false",
                    ));
                }
                match condition.arguments.get("operator").and_then(|value| value.as_str()) {
                    Some(operator) if operator.parse::<ConditionOperator>().is_err() => {
                        issues.push(ValidationIssue::warning(
                            Some(&step.id),
                            format!("unknown operator '{operator}' always evaluates to false"),
                        ));
                    }
                    None => issues.push(ValidationIssue::warning(
                        Some(&step.id),
                        "condition has no operator and always evaluates to false",
                    )),
                    _ => {}
                }
                if condition.on_success.is_none() && condition.on_failure.is_none() {
                    issues.push(ValidationIssue::warning(Some(&step.id), "condition has neither onSuccess nor onFailure"));
                }
            }
            StepKind::Parallel(parallel) if parallel.branches.is_empty() => {
                issues.push(ValidationIssue::warning(Some(&step.id), "parallel step has no branches"));
            }
            _ => {}
        }
    }

    if let Some(cycle) = find_cycle(definition, &known_ids) {
        issues.push(ValidationIssue::error(
            None,
            format!("cycle detected in step references involving: {}", cycle.join(", ")),
        ));
    }

    if known_ids.contains(definition.root.as_str()) {
        let reachable = reachable_from_root(definition, &known_ids);
        for step in &definition.steps {
            if !step.id.is_empty() && !reachable.contains(step.id.as_str()) {
                issues.push(ValidationIssue::warning(Some(&step.id), "step is unreachable from the root"));
            }
        }
    }

    issues
}

fn adjacency<'a>(definition: &'a WorkflowDefinition, known_ids: &HashSet<&str>) -> HashMap<&'a str, Vec<&'a str>> {
    let mut edges: HashMap<&str, Vec<&str>> = HashMap::new();
    for step in &definition.steps {
        let targets = edges.entry(step.id.as_str()).or_default();
        for (_, target) in step.references() {
            if known_ids.contains(target) && !targets.contains(&target) {
                targets.push(target);
            }
        }
    }
    edges
}

fn find_cycle(definition: &WorkflowDefinition, known_ids: &HashSet<&str>) -> Option<Vec<String>> {
    let edges = adjacency(definition, known_ids);
    let mut in_degrees: HashMap<&str, usize> = edges.keys().map(|id| (*id, 0)).collect();
    for targets in edges.values() {
        for target in targets {
            if let Some(degree) = in_degrees.get_mut(target) {
                *degree += 1;
            }
        }
    }

    let mut queue: VecDeque<&str> = in_degrees.iter().filter(|(_, degree)| **degree == 0).map(|(id, _)| *id).collect();
    let mut visited = 0usize;
    while let Some(step_id) = queue.pop_front() {
        visited += 1;
        for target in edges.get(step_id).into_iter().flatten() {
            if let Some(degree) = in_degrees.get_mut(target) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(*target);
                }
            }
        }
    }

    if visited == in_degrees.len() {
        return None;
    }
    let mut remaining: Vec<String> = in_degrees
        .into_iter()
        .filter(|(_, degree)| *degree > 0)
        .map(|(id, _)| id.to_string())
        .collect();
    remaining.sort();
    Some(remaining)
}

fn reachable_from_root<'a>(definition: &'a WorkflowDefinition, known_ids: &HashSet<&str>) -> HashSet<&'a str> {
    let edges = adjacency(definition, known_ids);
    let mut seen: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::from([definition.root.as_str()]);
    while let Some(step_id) = queue.pop_front() {
        if !seen.insert(step_id) {
            continue;
        }
        for target in edges.get(step_id).into_iter().flatten() {
            queue.push_back(*target);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{ActivityStep, ConditionStep, ParallelStep, SequenceStep, Step};
    use serde_json::json;

    fn activity(id: &str, next: Option<&str>) -> Step {
        Step {
            id: id.into(),
            name: None,
            kind: StepKind::Activity(ActivityStep {
                activity_name: "echo".into(),
                ..Default::default()
            }),
            next: next.map(str::to_string),
        }
    }

    fn definition(root: &str, steps: Vec<Step>) -> WorkflowDefinition {
        WorkflowDefinition {
            name: "demo".into(),
            description: None,
            version: "1.0".into(),
            root: root.into(),
            steps,
        }
    }

    #[test]
    fn accepts_a_well_formed_chain() {
        let issues = validate_definition(&definition("s1", vec![activity("s1", Some("s2")), activity("s2", None)]));
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn reports_missing_root_and_dangling_references() {
        let mut fanout = activity("fan", None);
        fanout.kind = StepKind::Parallel(ParallelStep {
            branches: vec!["s1".into(), "ghost".into()],
        });
        let mut seq = activity("seq", None);
        seq.kind = StepKind::Sequence(SequenceStep {
            steps: vec!["missing".into()],
        });
        let issues = validate_definition(&definition("nope", vec![activity("s1", Some("gone")), fanout, seq]));

        let messages: Vec<String> = issues.iter().filter(|issue| issue.is_error()).map(ToString::to_string).collect();
        assert!(messages.iter().any(|m| m.contains("root step 'nope' not found")), "{messages:?}");
        assert!(messages.iter().any(|m| m.contains("next references unknown step 'gone'")), "{messages:?}");
        assert!(messages.iter().any(|m| m.contains("branches references unknown step 'ghost'")), "{messages:?}");
        assert!(messages.iter().any(|m| m.contains("steps references unknown step 'missing'")), "{messages:?}");
    }

    #[test]
    fn reports_duplicates_and_missing_activity_name() {
        let mut unnamed = activity("s2", None);
        unnamed.kind = StepKind::Activity(ActivityStep::default());
        let issues = validate_definition(&definition("s1", vec![activity("s1", Some("s2")), activity("s1", None), unnamed]));

        assert!(issues.iter().any(|i| i.step_id.as_deref() == Some("s1") && i.message == "duplicate step identifier"));
        assert!(issues.iter().any(|i| i.step_id.as_deref() == Some("s2") && i.message.contains("missing activityName")));
    }

    #[test]
    fn detects_cycles() {
        let issues = validate_definition(&definition("a", vec![activity("a", Some("b")), activity("b", Some("a"))]));
        let cycle = issues.iter().find(|i| i.message.starts_with("cycle detected")).expect("cycle issue");
        assert!(cycle.message.ends_with("a, b"), "{}", cycle.message);
    }

    #[test]
    fn warns_about_conditions_that_never_hold_and_unreachable_steps() {
        let condition = Step {
            id: "check".into(),
            name: None,
            kind: StepKind::Condition(ConditionStep {
                arguments: [("variable".to_string(), json!("count")), ("operator".to_string(), json!("between"))]
                    .into_iter()
                    .collect(),
                on_success: Some("s1".into()),
                on_failure: None,
            }),
            next: None,
        };
        let issues = validate_definition(&definition("check", vec![condition, activity("s1", None), activity("orphan", None)]));

        assert!(issues.iter().all(|issue| !issue.is_error()), "{issues:?}");
        assert!(issues.iter().any(|i| i.message.contains("unknown operator 'between'")));
        assert!(issues.iter().any(|i| i.step_id.as_deref() == Some("orphan") && i.message.contains("unreachable")));
    }

    #[test]
    fn warns_about_reserved_canvas_ids() {
        let issues = validate_definition(&definition("start", vec![activity("start", Some("end")), activity("end", None)]));

        assert!(issues.iter().all(|issue| !issue.is_error()), "{issues:?}");
        let flagged: Vec<&str> = issues
            .iter()
            .filter(|issue| issue.message.contains("reserved"))
            .filter_map(|issue| issue.step_id.as_deref())
            .collect();
        assert_eq!(flagged, vec!["start", "end"]);
    }
}
