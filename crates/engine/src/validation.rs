use stepflow_registry::ActivityRegistry;
use stepflow_types::{StepKind, ValidationIssue, WorkflowDefinition, validate_arguments, validate_definition};

/// Structural validation plus checks against the activities known to `registry`.
///
/// Adds an error for every activity step naming an unregistered activity and
/// for every argument its schema rejects.
pub fn validate_workflow(definition: &WorkflowDefinition, registry: &ActivityRegistry) -> Vec<ValidationIssue> {
    let mut issues = validate_definition(definition);

    for step in &definition.steps {
        let StepKind::Activity(activity) = &step.kind else {
            continue;
        };
        let activity_name = activity.activity_name.trim();
        if activity_name.is_empty() {
            continue;
        }
        if !registry.has(activity_name) {
            issues.push(ValidationIssue::error(
                Some(&step.id),
                format!("activity '{activity_name}' is not registered"),
            ));
            continue;
        }
        if let Some(schema) = registry.get_schema(activity_name) {
            for issue in validate_arguments(schema, &activity.arguments) {
                issues.push(ValidationIssue::error(
                    Some(&step.id),
                    format!("argument '{}': {}", issue.parameter, issue.message),
                ));
            }
        }
    }

    issues
}
