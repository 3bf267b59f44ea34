//! Loading and saving workflow documents.
//!
//! Workflows are stored as YAML with camelCase keys. JSON documents are
//! accepted as well: files ending in `.json` are parsed as JSON, everything
//! else as YAML. Editor canvases are stored as JSON [`CanvasDocument`]s.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use stepflow_types::{CanvasEdge, CanvasNode, WorkflowDefinition, deserialize_canvas, serialize_canvas};

/// Loads a workflow definition from `file_path`, detecting the format from its extension.
///
/// ```rust
/// use stepflow_engine::parse_workflow_file;
///
/// let temp_dir = tempfile::tempdir()?;
/// let workflow_path = temp_dir.path().join("greet.yaml");
/// std::fs::write(&workflow_path, r#"
/// name: greet
/// root: hello
/// steps:
///   - id: hello
///     type: activity
///     activityName: echo
///     arguments:
///       msg: hi
/// "#)?;
///
/// let definition = parse_workflow_file(&workflow_path)?;
/// assert_eq!(definition.root_step().map(|step| step.id.as_str()), Some("hello"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn parse_workflow_file(file_path: impl AsRef<Path>) -> Result<WorkflowDefinition> {
    let file_path = file_path.as_ref();
    let content = fs::read_to_string(file_path).with_context(|| format!("Failed to read workflow file: {}", file_path.display()))?;

    if has_json_extension(file_path) {
        serde_json::from_str(&content).with_context(|| format!("Failed to parse workflow JSON: {}", file_path.display()))
    } else {
        workflow_from_yaml(&content).with_context(|| format!("Failed to parse workflow file: {}", file_path.display()))
    }
}

pub fn workflow_from_yaml(text: &str) -> Result<WorkflowDefinition> {
    serde_yaml::from_str(text).context("workflow document is not a valid workflow definition")
}

pub fn workflow_to_yaml(definition: &WorkflowDefinition) -> Result<String> {
    serde_yaml::to_string(definition).context("failed to serialize workflow definition to YAML")
}

/// The editor's saved graph: nodes and edges plus workflow metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CanvasDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub nodes: Vec<CanvasNode>,
    #[serde(default)]
    pub edges: Vec<CanvasEdge>,
}

impl CanvasDocument {
    pub fn from_definition(definition: &WorkflowDefinition) -> Self {
        let (nodes, edges) = deserialize_canvas(definition);
        Self {
            name: definition.name.clone(),
            description: definition.description.clone(),
            nodes,
            edges,
        }
    }

    pub fn to_definition(&self) -> WorkflowDefinition {
        serialize_canvas(&self.nodes, &self.edges, &self.name, self.description.as_deref())
    }
}

pub fn parse_canvas_file(file_path: impl AsRef<Path>) -> Result<CanvasDocument> {
    let file_path = file_path.as_ref();
    let content = fs::read_to_string(file_path).with_context(|| format!("Failed to read canvas file: {}", file_path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse canvas JSON: {}", file_path.display()))
}

fn has_json_extension(file_path: &Path) -> bool {
    file_path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const WORKFLOW: &str = r#"
name: onboarding
root: greet
steps:
  - id: greet
    name: Greet
    type: activity
    activityName: echo
    arguments:
      msg: ${greeting}
    resultVariable: out
"#;

    #[test]
    fn parses_yaml_and_json_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let yaml_path = temp_dir.path().join("workflow.yaml");
        fs::write(&yaml_path, WORKFLOW).unwrap();

        let from_yaml = parse_workflow_file(&yaml_path).expect("parse yaml workflow");
        assert_eq!(from_yaml.version, "1.0");

        let json_path = temp_dir.path().join("workflow.JSON");
        fs::write(&json_path, serde_json::to_string_pretty(&from_yaml).unwrap()).unwrap();
        let from_json = parse_workflow_file(&json_path).expect("parse json workflow");
        assert_eq!(from_json, from_yaml);
    }

    #[test]
    fn yaml_round_trip_preserves_fields() {
        let definition = workflow_from_yaml(WORKFLOW).unwrap();
        let dumped = workflow_to_yaml(&definition).unwrap();

        assert!(dumped.contains("activityName: echo"), "{dumped}");
        assert!(dumped.contains("resultVariable: out"), "{dumped}");
        assert_eq!(workflow_from_yaml(&dumped).unwrap(), definition);
    }

    #[test]
    fn reports_missing_files_with_path() {
        let error = parse_workflow_file("/definitely/not/here.yaml").expect_err("missing file");
        assert!(error.to_string().contains("Failed to read workflow file: /definitely/not/here.yaml"));
    }

    #[test]
    fn canvas_documents_convert_both_ways() {
        let definition = workflow_from_yaml(WORKFLOW).unwrap();
        let canvas = CanvasDocument::from_definition(&definition);
        assert_eq!(canvas.nodes.len(), 3);

        let as_json = serde_json::to_value(&canvas).unwrap();
        assert_eq!(as_json["nodes"][1]["data"]["activityName"], json!("echo"));

        let temp_dir = tempfile::tempdir().unwrap();
        let canvas_path = temp_dir.path().join("canvas.json");
        fs::write(&canvas_path, as_json.to_string()).unwrap();
        let loaded = parse_canvas_file(&canvas_path).expect("parse canvas");
        assert_eq!(loaded.to_definition(), definition);
    }
}
