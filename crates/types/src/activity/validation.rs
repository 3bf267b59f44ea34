//! Validation of authored activity arguments against an [`ActivitySchema`].
//!
//! The checks mirror what the editor's dynamic form enforces: required fields,
//! numeric bounds, enum membership, and basic type agreement. Whole-string
//! `${name}` references are accepted for any parameter because their value is
//! only known at execution time.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ActivitySchema, ParameterKind};
use crate::variable_reference;

/// A problem found in a single argument.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArgumentIssue {
    pub parameter: String,
    pub message: String,
}

impl ArgumentIssue {
    fn new(parameter: &str, message: impl Into<String>) -> Self {
        Self {
            parameter: parameter.to_string(),
            message: message.into(),
        }
    }
}

/// Validates `arguments` against `schema`.
///
/// Arguments not described by the schema are ignored.
pub fn validate_arguments(schema: &ActivitySchema, arguments: &IndexMap<String, Value>) -> Vec<ArgumentIssue> {
    let mut issues = Vec::new();

    for parameter in &schema.parameters {
        let value = arguments.get(&parameter.name);
        let Some(value) = value.filter(|value| !is_blank(value)) else {
            if parameter.required && parameter.default.is_none() {
                issues.push(ArgumentIssue::new(&parameter.name, format!("{} is required", parameter.label)));
            }
            continue;
        };

        if variable_reference(value).is_some() {
            continue;
        }

        match &parameter.kind {
            ParameterKind::String { .. } => {
                if !value.is_string() {
                    issues.push(ArgumentIssue::new(&parameter.name, "expected text"));
                }
            }
            ParameterKind::Number { min, max, .. } => match number_value(value) {
                Some(number) => {
                    if let Some(min) = min
                        && number < *min
                    {
                        issues.push(ArgumentIssue::new(&parameter.name, format!("must be at least {min}")));
                    }
                    if let Some(max) = max
                        && number > *max
                    {
                        issues.push(ArgumentIssue::new(&parameter.name, format!("must be at most {max}")));
                    }
                }
                None => issues.push(ArgumentIssue::new(&parameter.name, "expected a number")),
            },
            ParameterKind::Boolean => {
                if !value.is_boolean() {
                    issues.push(ArgumentIssue::new(&parameter.name, "expected true or false"));
                }
            }
            ParameterKind::Enum { options } => {
                let matches_option = value
                    .as_str()
                    .is_some_and(|text| options.iter().any(|option| option.value() == text));
                if !matches_option {
                    let allowed: Vec<&str> = options.iter().map(|option| option.value()).collect();
                    issues.push(ArgumentIssue::new(
                        &parameter.name,
                        format!("must be one of: {}", allowed.join(", ")),
                    ));
                }
            }
            ParameterKind::Object => {
                if !value.is_object() && !value.is_array() {
                    issues.push(ArgumentIssue::new(&parameter.name, "expected a JSON object"));
                }
            }
        }
    }

    issues
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

/// Numbers may arrive as JSON numbers or as numeric text typed into a form.
fn number_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{EnumOption, Parameter};
    use serde_json::json;

    fn schema() -> ActivitySchema {
        ActivitySchema {
            name: "demo".into(),
            label: "Demo".into(),
            description: None,
            category: None,
            parameters: vec![
                Parameter::new("to", "Recipient", ParameterKind::text()).required(),
                Parameter::new(
                    "seconds",
                    "Duration",
                    ParameterKind::Number {
                        min: Some(0.0),
                        max: Some(3600.0),
                        step: None,
                    },
                )
                .with_default(json!(1)),
                Parameter::new(
                    "level",
                    "Level",
                    ParameterKind::Enum {
                        options: vec![EnumOption::from("info"), EnumOption::from("warn")],
                    },
                ),
                Parameter::new("dry", "Dry run", ParameterKind::Boolean),
            ],
        }
    }

    fn arguments(value: Value) -> IndexMap<String, Value> {
        serde_json::from_value(value).expect("argument map")
    }

    #[test]
    fn accepts_valid_arguments_and_references() {
        let issues = validate_arguments(&schema(), &arguments(json!({"to": "${email}", "seconds": "30", "level": "warn", "dry": true})));
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn flags_missing_required_and_out_of_range_values() {
        let issues = validate_arguments(&schema(), &arguments(json!({"to": "  ", "seconds": 7200, "level": "debug", "dry": "yes"})));
        let by_parameter: Vec<(&str, &str)> = issues.iter().map(|i| (i.parameter.as_str(), i.message.as_str())).collect();

        assert_eq!(
            by_parameter,
            vec![
                ("to", "Recipient is required"),
                ("seconds", "must be at most 3600"),
                ("level", "must be one of: info, warn"),
                ("dry", "expected true or false"),
            ]
        );
    }
}
