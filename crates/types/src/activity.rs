//! Activity result contract and declarative parameter schemas.
//!
//! Schemas are pure metadata for editors and validation tooling; they never
//! influence how an activity executes.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub mod validation;

/// Canonical return value of every activity handler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ActivityResult {
    /// Whether the activity completed successfully.
    pub success: bool,
    /// Payload produced by the activity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
    /// Human-readable failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActivityResult {
    /// Successful result carrying `data`.
    pub fn ok(data: JsonValue) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Failed result carrying an error message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Failure message, or a placeholder when the handler did not supply one.
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or("undefined")
    }
}

/// Complete schema for an activity, rendered by editors as a form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivitySchema {
    /// Registered activity name.
    pub name: String,
    /// Display label.
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Palette grouping (for example `Communication`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl ActivitySchema {
    /// Looks up a parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|parameter| parameter.name == name)
    }
}

/// One input accepted by an activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    /// Argument key.
    pub name: String,
    /// Form label.
    pub label: String,
    /// Type tag plus type-specific constraints.
    #[serde(flatten)]
    pub kind: ParameterKind,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    /// Value applied by editors when the field is left blank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
}

impl Parameter {
    pub fn new(name: &str, label: &str, kind: ParameterKind) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind,
            required: false,
            default: None,
            help_text: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: JsonValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_help(mut self, help_text: &str) -> Self {
        self.help_text = Some(help_text.to_string());
        self
    }
}

/// Parameter type with its constraints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParameterKind {
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        multiline: bool,
    },
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<f64>,
    },
    Boolean,
    Enum {
        #[serde(default)]
        options: Vec<EnumOption>,
    },
    Object,
}

impl ParameterKind {
    /// Single-line string without a placeholder.
    pub fn text() -> Self {
        ParameterKind::String {
            placeholder: None,
            multiline: false,
        }
    }

    /// Wire name of the type tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            ParameterKind::String { .. } => "string",
            ParameterKind::Number { .. } => "number",
            ParameterKind::Boolean => "boolean",
            ParameterKind::Enum { .. } => "enum",
            ParameterKind::Object => "object",
        }
    }
}

/// Enum option: either a bare value or a value with its own label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum EnumOption {
    Value(String),
    Labeled { value: String, label: String },
}

impl EnumOption {
    pub fn value(&self) -> &str {
        match self {
            EnumOption::Value(value) => value,
            EnumOption::Labeled { value, .. } => value,
        }
    }
}

impl From<&str> for EnumOption {
    fn from(value: &str) -> Self {
        EnumOption::Value(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn result_omits_absent_fields() {
        assert_eq!(serde_json::to_value(ActivityResult::ok(json!({"a": 1}))).unwrap(), json!({"success": true, "data": {"a": 1}}));
        assert_eq!(
            serde_json::to_value(ActivityResult::failure("boom")).unwrap(),
            json!({"success": false, "error": "boom"})
        );
    }

    #[test]
    fn schema_matches_editor_json_shape() {
        let schema_json = json!({
            "name": "httpRequest",
            "label": "HTTP Request",
            "category": "Integration",
            "parameters": [
                {"name": "url", "label": "URL", "type": "string", "required": true, "placeholder": "https://api.example.com"},
                {"name": "method", "label": "HTTP Method", "type": "enum", "default": "GET", "options": ["GET", {"value": "POST", "label": "Post"}]},
                {"name": "retries", "label": "Retries", "type": "number", "min": 0.0, "max": 5.0},
                {"name": "verbose", "label": "Verbose", "type": "boolean", "helpText": "Log the response"}
            ]
        });

        let schema: ActivitySchema = serde_json::from_value(schema_json.clone()).expect("deserialize schema");

        let url = schema.parameter("url").expect("url parameter");
        assert!(url.required);
        assert_eq!(url.kind.type_name(), "string");
        let method = schema.parameter("method").expect("method parameter");
        let ParameterKind::Enum { options } = &method.kind else {
            panic!("expected enum parameter");
        };
        assert_eq!(options.iter().map(EnumOption::value).collect::<Vec<_>>(), vec!["GET", "POST"]);
        assert_eq!(schema.parameter("verbose").and_then(|p| p.help_text.as_deref()), Some("Log the response"));

        assert_eq!(serde_json::to_value(&schema).expect("serialize schema"), schema_json);
    }
}
