use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::ast::ProgramNode;
use crate::error::{SupervisorError, SupervisorResult};
use crate::interpreter::Interpreter;
use crate::kind::InstructionKind;
use crate::process::{FarmProcess, Status};
use crate::supervisor::Supervisor;

/// Outcome delivered to an `rpc_request` completion callback.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcOutcome {
    Ok { label: String },
    Error { label: String, message: String },
}

/// Outcome delivered to a `sequence` completion callback.
#[derive(Debug, Clone, PartialEq)]
pub enum SequenceOutcome {
    Ok,
    Error(String),
}

/// Retries `f` until it stops reporting [`SupervisorError::Busy`]. Busy is a
/// transient control-flow signal; callers never see it directly.
/// Yields between attempts instead of sleeping — the busy window is bounded
/// by a single tick's step duration, so a backoff would only add latency.
fn retry_busy<T>(mut f: impl FnMut() -> SupervisorResult<T>) -> SupervisorResult<T> {
    loop {
        match f() {
            Err(SupervisorError::Busy) => thread::yield_now(),
            other => return other,
        }
    }
}

/// Runs a completion callback behind a panic guard: a user-supplied
/// `on_complete` must never be able to crash the scheduler.
fn call_guarded<T>(label: &str, on_complete: impl FnOnce(T), outcome: T) {
    if panic::catch_unwind(AssertUnwindSafe(|| on_complete(outcome))).is_err() {
        log::error!("on_complete callback for {label} panicked; swallowed");
    }
}

impl<I: Interpreter> Supervisor<I> {
    /// Polls `lookup(job_id)` until it reports a terminal process, sleeping
    /// `await_poll` between live observations and retrying immediately on
    /// `Busy`. Raises [`SupervisorError::ArgumentError`] if the job id is
    /// unknown.
    pub fn await_job(&self, job_id: u64) -> SupervisorResult<I::Process> {
        loop {
            match self.lookup(job_id) {
                Ok(Some(process)) if process.status().is_terminal() => return Ok(process),
                Ok(Some(_)) => thread::sleep(self.config().await_poll),
                Ok(None) => {
                    return Err(SupervisorError::ArgumentError(format!(
                        "unknown job id {job_id}"
                    )))
                }
                Err(SupervisorError::Busy) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// As [`Supervisor::await_job`], but gives up once `timeout` has elapsed
    /// since the call began, returning `Ok(None)` for a job still live. Not
    /// part of the core wait protocol (which has no timeout) — a
    /// convenience layered on top for callers that want one.
    pub fn await_job_timeout(
        &self,
        job_id: u64,
        timeout: Duration,
    ) -> SupervisorResult<Option<I::Process>> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.lookup(job_id) {
                Ok(Some(process)) if process.status().is_terminal() => return Ok(Some(process)),
                Ok(Some(_)) => {
                    if Instant::now() >= deadline {
                        return Ok(None);
                    }
                    thread::sleep(self.config().await_poll);
                }
                Ok(None) => {
                    return Err(SupervisorError::ArgumentError(format!(
                        "unknown job id {job_id}"
                    )))
                }
                Err(SupervisorError::Busy) => {
                    if Instant::now() >= deadline {
                        return Ok(None);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Synchronous RPC submission. Decodes `program`, extracts
    /// its required `label`, and either takes the emergency hyper path or
    /// queues and awaits the program to completion before invoking
    /// `on_complete`.
    pub fn rpc_request(
        &self,
        program: &ProgramNode,
        on_complete: impl FnOnce(RpcOutcome) + Send + 'static,
    ) -> SupervisorResult<()> {
        let ast = self.decode(program)?;
        let label = ast
            .label()
            .ok_or_else(|| SupervisorError::ArgumentError("rpc_request missing label".into()))?
            .to_string();

        if let Some(kind) = ast.as_emergency_hyper_call() {
            retry_busy(|| match kind {
                InstructionKind::EmergencyLock => self.emergency_lock(),
                InstructionKind::EmergencyUnlock => self.emergency_unlock(),
                _ => unreachable!("as_emergency_hyper_call only returns these two kinds"),
            })?;
            call_guarded(&label, on_complete, RpcOutcome::Ok { label: label.clone() });
            return Ok(());
        }

        let heap = self.slice(&ast);
        let job_id = retry_busy(|| self.queue(heap.clone(), -1))?;
        let process = self.await_job(job_id)?;
        let outcome = match process.status() {
            Status::Done => RpcOutcome::Ok { label: label.clone() },
            Status::Crashed => RpcOutcome::Error {
                label: label.clone(),
                message: process.crash_reason().unwrap_or("").to_string(),
            },
            Status::Ok | Status::Waiting => unreachable!("await_job only returns terminal processes"),
        };
        call_guarded(&label, on_complete, outcome);
        Ok(())
    }

    /// Asynchronous sequence submission. Queues `program`
    /// immediately, returning its job id, and spawns a background waiter
    /// that invokes `on_complete` once the job reaches a terminal status.
    pub fn sequence(
        self: &Arc<Self>,
        program: &ProgramNode,
        page_id: i64,
        on_complete: impl FnOnce(SequenceOutcome) + Send + 'static,
    ) -> SupervisorResult<u64> {
        let ast = self.decode(program)?;
        let heap = self.slice(&ast);
        let job_id = retry_busy(|| self.queue(heap.clone(), page_id))?;

        let supervisor = Arc::clone(self);
        thread::spawn(move || match supervisor.await_job(job_id) {
            Ok(process) => {
                let outcome = match process.status() {
                    Status::Done => SequenceOutcome::Ok,
                    Status::Crashed => {
                        SequenceOutcome::Error(process.crash_reason().unwrap_or("").to_string())
                    }
                    Status::Ok | Status::Waiting => {
                        unreachable!("await_job only returns terminal processes")
                    }
                };
                call_guarded(&format!("job {job_id}"), on_complete, outcome);
            }
            Err(e) => log::error!("sequence waiter for job {job_id} failed: {e}"),
        });

        Ok(job_id)
    }
}
