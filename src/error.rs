/// Errors surfaced to submitters of the scheduler.
///
/// Nothing originating inside a farm process ever reaches this type; a crashing
/// instruction is absorbed by the step executor and observed only as a terminal
/// process status (see [`crate::process::Status::Crashed`]).
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// A caller-supplied request was malformed: an RPC missing its `label`, or
    /// `await`/`lookup` naming a job id that was never queued.
    #[error("argument error: {0}")]
    ArgumentError(String),

    /// The supervisor is mid-tick; the handler is in its busy substate. Callers
    /// must retry — this is a transient control-flow signal, never a user-facing
    /// failure.
    #[error("supervisor busy")]
    Busy,

    /// Convenience variant for [`crate::api::rpc_request`]: a queued RPC program
    /// reached `crashed` instead of `done`.
    #[error("job {job_id} crashed: {reason}")]
    Crashed { job_id: u64, reason: String },

    /// A user-supplied `on_complete` callback panicked; the panic was caught at
    /// the call boundary and never reached the scheduler.
    #[error("callback panicked: {0}")]
    CallbackPanicked(String),
}

pub type SupervisorResult<T> = Result<T, SupervisorError>;
