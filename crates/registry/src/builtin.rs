//! Sample activity catalogue shipped with Stepflow.
//!
//! These activities simulate side effects (email, HTTP) and perform small
//! local operations so workflows can be exercised end to end without external
//! services. Each one registers alongside the schema editors render as a form.

use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use chrono::Utc;
use serde_json::{Value, json};
use stepflow_types::{ActivityResult, ActivitySchema, EnumOption, Parameter, ParameterKind};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{ActivityArguments, ActivityRegistry};

const HTTP_METHODS: [&str; 5] = ["GET", "POST", "PUT", "DELETE", "PATCH"];
const TRANSFORM_OPERATIONS: [&str; 3] = ["uppercase", "lowercase", "reverse"];
const LOG_LEVELS: [&str; 4] = ["debug", "info", "warn", "error"];

/// Simulated latencies for the sample activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleActivityOptions {
    pub email_delay: Duration,
    pub http_delay: Duration,
    /// When false, `wait` reports the requested duration without sleeping.
    pub honor_wait: bool,
}

impl Default for SampleActivityOptions {
    fn default() -> Self {
        Self {
            email_delay: Duration::from_millis(1000),
            http_delay: Duration::from_millis(500),
            honor_wait: true,
        }
    }
}

impl SampleActivityOptions {
    /// No simulated latency; `wait` returns immediately.
    pub fn instant() -> Self {
        Self {
            email_delay: Duration::ZERO,
            http_delay: Duration::ZERO,
            honor_wait: false,
        }
    }
}

/// Registers `sendEmail`, `httpRequest`, `transformData`, `wait`, `logMessage`, and `echo`.
pub fn register_builtin_activities(registry: &mut ActivityRegistry, options: SampleActivityOptions) {
    let email_delay = options.email_delay;
    registry.register(
        "sendEmail",
        move |arguments: ActivityArguments| send_email(arguments, email_delay),
        Some(send_email_schema()),
    );
    let http_delay = options.http_delay;
    registry.register(
        "httpRequest",
        move |arguments: ActivityArguments| http_request(arguments, http_delay),
        Some(http_request_schema()),
    );
    registry.register("transformData", transform_data, Some(transform_data_schema()));
    let honor_wait = options.honor_wait;
    registry.register("wait", move |arguments: ActivityArguments| wait(arguments, honor_wait), Some(wait_schema()));
    registry.register("logMessage", log_message, Some(log_message_schema()));
    registry.register("echo", echo, Some(echo_schema()));
}

async fn send_email(arguments: ActivityArguments, delay: Duration) -> Result<ActivityResult> {
    let to = text_argument(&arguments, "to").unwrap_or_default();
    let subject = text_argument(&arguments, "subject").unwrap_or_default();
    info!(to = %to, subject = %subject, "sending email");
    tokio::time::sleep(delay).await;

    Ok(ActivityResult::ok(json!({ "messageId": format!("msg-{}", Utc::now().timestamp_millis()) })))
}

async fn http_request(arguments: ActivityArguments, delay: Duration) -> Result<ActivityResult> {
    let Some(raw_url) = text_argument(&arguments, "url") else {
        return Ok(ActivityResult::failure("URL is required"));
    };
    let url = Url::parse(&raw_url).map_err(|error| anyhow!("Invalid URL '{raw_url}': {error}"))?;
    let method = text_argument(&arguments, "method")
        .unwrap_or_else(|| "GET".to_string())
        .to_ascii_uppercase();
    if !HTTP_METHODS.contains(&method.as_str()) {
        bail!("Unsupported HTTP method: {method}");
    }

    info!(method = %method, url = %url, "making HTTP request");
    tokio::time::sleep(delay).await;

    Ok(ActivityResult::ok(json!({ "statusCode": 200, "body": "Success" })))
}

async fn transform_data(arguments: ActivityArguments) -> Result<ActivityResult> {
    let operation = arguments.get("operation").map(stringify).unwrap_or_else(|| "undefined".to_string());
    let input = arguments.get("input").map(stringify).unwrap_or_else(|| "undefined".to_string());
    debug!(operation = %operation, "transforming data");

    let transformed = match operation.as_str() {
        "uppercase" => input.to_uppercase(),
        "lowercase" => input.to_lowercase(),
        "reverse" => input.chars().rev().collect(),
        _ => return Ok(ActivityResult::failure(format!("Unknown operation: {operation}"))),
    };

    Ok(ActivityResult::ok(json!({ "transformed": transformed })))
}

async fn wait(arguments: ActivityArguments, honor_wait: bool) -> Result<ActivityResult> {
    let requested = arguments.get("seconds").cloned().unwrap_or_else(|| json!(1));
    let seconds = match &requested {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
    .ok_or_else(|| anyhow!("Invalid duration: {requested}"))?;

    info!(seconds = seconds.as_secs_f64(), "waiting");
    if honor_wait {
        tokio::time::sleep(seconds).await;
    }

    Ok(ActivityResult::ok(json!({ "waited": requested })))
}

async fn log_message(arguments: ActivityArguments) -> Result<ActivityResult> {
    let message = arguments.get("message").map(stringify).unwrap_or_default();
    let level = text_argument(&arguments, "level").unwrap_or_else(|| "info".to_string());
    match level.as_str() {
        "debug" => debug!(target: "stepflow::activity", %message, "workflow log"),
        "warn" => warn!(target: "stepflow::activity", %message, "workflow log"),
        "error" => error!(target: "stepflow::activity", %message, "workflow log"),
        _ => info!(target: "stepflow::activity", %message, level = %level, "workflow log"),
    }

    Ok(ActivityResult::ok(json!({ "logged": true })))
}

async fn echo(arguments: ActivityArguments) -> Result<ActivityResult> {
    Ok(ActivityResult::ok(Value::Object(arguments)))
}

fn text_argument(arguments: &ActivityArguments, name: &str) -> Option<String> {
    arguments.get(name).and_then(Value::as_str).map(str::to_string)
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn string_parameter(name: &str, label: &str, placeholder: &str, multiline: bool) -> Parameter {
    Parameter::new(
        name,
        label,
        ParameterKind::String {
            placeholder: Some(placeholder.to_string()),
            multiline,
        },
    )
}

fn enum_parameter(name: &str, label: &str, options: &[&str]) -> Parameter {
    Parameter::new(
        name,
        label,
        ParameterKind::Enum {
            options: options.iter().copied().map(EnumOption::from).collect(),
        },
    )
}

fn schema(name: &str, label: &str, description: &str, category: &str, parameters: Vec<Parameter>) -> ActivitySchema {
    ActivitySchema {
        name: name.to_string(),
        label: label.to_string(),
        description: Some(description.to_string()),
        category: Some(category.to_string()),
        parameters,
    }
}

fn send_email_schema() -> ActivitySchema {
    schema(
        "sendEmail",
        "Send Email",
        "Send an email message",
        "Communication",
        vec![
            string_parameter("to", "Recipient Email", "user@example.com", false)
                .required()
                .with_help("Email address of the recipient"),
            string_parameter("subject", "Subject", "Enter subject...", false)
                .required()
                .with_help("Email subject line"),
            string_parameter("body", "Message Body", "Enter message...", true)
                .required()
                .with_help("Email message content"),
        ],
    )
}

fn http_request_schema() -> ActivitySchema {
    schema(
        "httpRequest",
        "HTTP Request",
        "Make an HTTP request to an external API",
        "Integration",
        vec![
            string_parameter("url", "URL", "https://api.example.com/endpoint", false)
                .required()
                .with_help("The URL to make the request to"),
            enum_parameter("method", "HTTP Method", &HTTP_METHODS)
                .with_default(json!("GET"))
                .with_help("HTTP method to use"),
        ],
    )
}

fn transform_data_schema() -> ActivitySchema {
    schema(
        "transformData",
        "Transform Data",
        "Transform text data using various operations",
        "Data Processing",
        vec![
            string_parameter("input", "Input Text", "Enter text or use ${variableName}", false)
                .required()
                .with_help("The text to transform"),
            enum_parameter("operation", "Operation", &TRANSFORM_OPERATIONS)
                .required()
                .with_help("Transformation to apply"),
        ],
    )
}

fn wait_schema() -> ActivitySchema {
    schema(
        "wait",
        "Wait / Delay",
        "Pause workflow execution for a specified duration",
        "Flow Control",
        vec![
            Parameter::new(
                "seconds",
                "Duration (seconds)",
                ParameterKind::Number {
                    min: Some(0.0),
                    max: Some(3600.0),
                    step: None,
                },
            )
            .with_default(json!(1))
            .with_help("Number of seconds to wait"),
        ],
    )
}

fn log_message_schema() -> ActivitySchema {
    schema(
        "logMessage",
        "Log Message",
        "Log a message during workflow execution",
        "Debugging",
        vec![
            string_parameter("message", "Message", "Enter log message...", true)
                .required()
                .with_help("The message to log"),
            enum_parameter("level", "Log Level", &LOG_LEVELS)
                .with_default(json!("info"))
                .with_help("Severity level of the log message"),
        ],
    )
}

fn echo_schema() -> ActivitySchema {
    schema(
        "echo",
        "Echo",
        "Return the supplied arguments unchanged",
        "Debugging",
        vec![Parameter::new("payload", "Payload", ParameterKind::Object).with_help("Any arguments; all of them are echoed back")],
    )
}
