//! # Stepflow Engine
//!
//! The engine interprets declarative workflow definitions: it locates the root
//! step, walks the step graph (activities, sequences, parallel fan-out, and
//! conditions), resolves `${variable}` references against the run's shared
//! state, and returns that state as the workflow result.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use stepflow_engine::{ActivityInvoker, run_workflow, workflow_from_yaml};
//! use stepflow_registry::{ActivityRegistry, SampleActivityOptions, register_builtin_activities};
//!
//! # tokio_test_runtime(async {
//! let mut registry = ActivityRegistry::new();
//! register_builtin_activities(&mut registry, SampleActivityOptions::instant());
//! let invoker: Arc<dyn ActivityInvoker> = Arc::new(registry);
//!
//! let definition = workflow_from_yaml(r#"
//! name: shout
//! root: upper
//! steps:
//!   - id: upper
//!     type: activity
//!     activityName: transformData
//!     arguments: { input: "${word}", operation: uppercase }
//!     resultVariable: shouted
//! "#)?;
//!
//! let input = serde_json::from_value(json!({"word": "hello"}))?;
//! let state = run_workflow(&definition, input, invoker).await?;
//! assert_eq!(state["shouted"], json!({"transformed": "HELLO"}));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # }).expect("doc example");
//! # fn tokio_test_runtime<F: std::future::Future>(future: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().expect("runtime").block_on(future)
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **`interpreter`**: recursive step evaluation and run events
//! - **`resolve`**: argument resolution and condition evaluation
//! - **`state`**: the shared variable map of a run
//! - **`invoker`**: the activity capability seam and the timeout wrapper
//! - **`service`**: start/await runs by workflow id
//! - **`document`**: YAML/JSON and canvas document I/O
//! - **`validation`**: registry-aware definition checks

pub mod document;
pub mod error;
pub mod interpreter;
pub mod invoker;
pub mod resolve;
pub mod service;
pub mod state;
pub mod validation;

pub use document::{CanvasDocument, parse_canvas_file, parse_workflow_file, workflow_from_yaml, workflow_to_yaml};
pub use error::InterpreterError;
pub use interpreter::{Interpreter, run_workflow};
pub use invoker::{ActivityInvoker, DEFAULT_ACTIVITY_TIMEOUT, TimeoutInvoker};
pub use service::{ServiceError, WorkflowService};
pub use state::ExecutionState;
pub use validation::validate_workflow;
