use thiserror::Error;

/// Reasons a workflow run stops before reaching the end of its graph.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InterpreterError {
    /// The definition cannot be started (for example the root step is missing).
    #[error("{0}")]
    Definition(String),

    #[error("Activity step '{step_id}' missing activityName")]
    MissingActivityName { step_id: String },

    /// A parallel step lists a branch that does not exist. No branch is started.
    #[error("Branch step '{branch_id}' not found in parallel step '{step_id}'")]
    MissingBranch { step_id: String, branch_id: String },

    /// An activity reported `success: false`.
    #[error("Activity '{activity}' failed: {message}")]
    ActivityFailure { activity: String, message: String },

    /// A spawned branch task panicked or was aborted by the runtime.
    #[error("Branch of parallel step '{step_id}' did not complete: {message}")]
    BranchPanicked { step_id: String, message: String },
}

impl InterpreterError {
    pub fn root_not_found(root: &str) -> Self {
        InterpreterError::Definition(format!("Root step '{root}' not found"))
    }
}
