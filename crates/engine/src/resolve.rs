//! # Argument Resolution and Condition Evaluation
//!
//! Activity and condition steps carry argument maps authored in the workflow
//! document. Before a step runs, its arguments are resolved against the
//! [`ExecutionState`] of the run.
//!
//! ## Variable references
//!
//! Only a string that is *entirely* a reference, such as `"${userEmail}"`,
//! is substituted. The value is replaced by `state["userEmail"]` as it is at
//! the moment the step starts. When the variable is absent the argument is
//! left out of the resolved map. Partial templates (`"hi ${name}"`), nested
//! objects, and arrays pass through untouched.
//!
//! ## Conditions
//!
//! A condition step's arguments hold `variable`, `operator`, and `value`:
//!
//! - `equals` / `notEquals`: strict equality; numbers compare numerically
//!   (`5 == 5.0`), values of different JSON types are never equal, and an
//!   absent variable equals nothing.
//! - `greaterThan` / `lessThan`: numeric for two numbers, lexicographic for
//!   two strings, otherwise `false`.
//! - `exists`: the variable is present in state (a `null` value counts).
//!
//! A missing, empty, or non-string `variable`/`operator`, or an unknown
//! operator, evaluates to `false`.
//!
//! ```rust
//! use indexmap::IndexMap;
//! use serde_json::json;
//! use stepflow_engine::{ExecutionState, resolve::{evaluate_condition, resolve_arguments}};
//!
//! let state = ExecutionState::new(serde_json::from_value(json!({"count": 5, "email": "a@b.c"}))?);
//!
//! let arguments: IndexMap<String, serde_json::Value> =
//!     serde_json::from_value(json!({"to": "${email}", "cc": "${missing}", "subject": "Hi ${name}"}))?;
//! let resolved = resolve_arguments(&arguments, &state);
//! assert_eq!(serde_json::Value::Object(resolved), json!({"to": "a@b.c", "subject": "Hi ${name}"}));
//!
//! let condition: IndexMap<String, serde_json::Value> =
//!     serde_json::from_value(json!({"variable": "count", "operator": "greaterThan", "value": 3}))?;
//! assert!(evaluate_condition(&condition, &state));
//! # Ok::<(), serde_json::Error>(())
//! ```

use std::cmp::Ordering;

use indexmap::IndexMap;
use serde_json::{Map as JsonMap, Value};
use stepflow_types::{ConditionOperator, variable_reference};
use tracing::debug;

use crate::state::ExecutionState;

/// Resolves whole-string `${name}` references in `arguments` against `state`.
///
/// Argument order is preserved. References to absent variables drop the
/// argument entirely.
pub fn resolve_arguments(arguments: &IndexMap<String, Value>, state: &ExecutionState) -> JsonMap<String, Value> {
    let mut resolved = JsonMap::new();

    for (key, value) in arguments {
        match variable_reference(value) {
            Some(variable) => match state.get(variable) {
                Some(current) => {
                    resolved.insert(key.clone(), current);
                }
                None => {
                    debug!(argument = %key, variable = %variable, "variable not set; omitting argument");
                }
            },
            None => {
                resolved.insert(key.clone(), value.clone());
            }
        }
    }

    resolved
}

/// Evaluates a condition step's `variable`/`operator`/`value` arguments.
pub fn evaluate_condition(arguments: &IndexMap<String, Value>, state: &ExecutionState) -> bool {
    let Some(variable) = non_empty_str(arguments.get("variable")) else {
        return false;
    };
    let Some(operator) = non_empty_str(arguments.get("operator")) else {
        return false;
    };
    let Ok(operator) = operator.parse::<ConditionOperator>() else {
        debug!(operator = %operator, "unknown condition operator");
        return false;
    };

    let expected = arguments.get("value");
    let actual = state.get(variable);

    match operator {
        ConditionOperator::Equals => strictly_equal(actual.as_ref(), expected),
        ConditionOperator::NotEquals => !strictly_equal(actual.as_ref(), expected),
        ConditionOperator::GreaterThan => compare(actual.as_ref(), expected) == Some(Ordering::Greater),
        ConditionOperator::LessThan => compare(actual.as_ref(), expected) == Some(Ordering::Less),
        ConditionOperator::Exists => state.contains(variable),
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|text| !text.is_empty())
}

fn strictly_equal(actual: Option<&Value>, expected: Option<&Value>) -> bool {
    match (actual, expected) {
        (Some(Value::Number(left)), Some(Value::Number(right))) => left.as_f64() == right.as_f64(),
        (Some(left), Some(right)) => left == right,
        (None, None) => true,
        _ => false,
    }
}

fn compare(actual: Option<&Value>, expected: Option<&Value>) -> Option<Ordering> {
    match (actual?, expected?) {
        (Value::Number(left), Value::Number(right)) => left.as_f64()?.partial_cmp(&right.as_f64()?),
        (Value::String(left), Value::String(right)) => Some(left.cmp(right)),
        _ => None,
    }
}
