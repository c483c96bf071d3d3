use std::panic::{self, AssertUnwindSafe};

use crate::interpreter::{Interpreter, StepOutcome};
use crate::process::{FarmProcess, Status};

/// Invokes the external interpreter's `step` and absorbs any failure — a
/// `StepOutcome::Fatal` or a genuine Rust panic unwinding out of `step`
/// itself — into a terminal `crashed` process. Never propagates a failure to
/// the caller — a misbehaving sequence must not crash the scheduler or any
/// other process.
pub fn execute_step<I: Interpreter>(interpreter: &I, process: I::Process) -> I::Process {
    let before = process.clone();
    match panic::catch_unwind(AssertUnwindSafe(|| interpreter.step(process))) {
        Ok(StepOutcome::Progressed(p)) => p,
        Ok(StepOutcome::Recovered(p)) => p,
        Ok(StepOutcome::Fatal(reason)) => crash(before, reason),
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "interpreter panicked with a non-string payload".to_string());
            crash(before, reason)
        }
    }
}

fn crash<P: FarmProcess>(process: P, reason: String) -> P {
    log::warn!("process {:?} crashed during step: {reason}", process.job_ref());
    let mut crashed = process;
    crashed.set_status(Status::Crashed);
    crashed.set_crash_reason(Some(reason));
    crashed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::InstructionKind;
    use crate::process::ProcRef;

    #[derive(Clone)]
    struct StubProcess {
        status: Status,
        crash_reason: Option<String>,
    }

    impl FarmProcess for StubProcess {
        fn status(&self) -> Status {
            self.status
        }
        fn set_status(&mut self, status: Status) {
            self.status = status;
        }
        fn job_ref(&self) -> ProcRef {
            ProcRef(1)
        }
        fn crash_reason(&self) -> Option<&str> {
            self.crash_reason.as_deref()
        }
        fn set_crash_reason(&mut self, reason: Option<String>) {
            self.crash_reason = reason;
        }
        fn pc_kind(&self) -> InstructionKind {
            InstructionKind::Wait
        }
    }

    struct ProgressingInterpreter;
    impl Interpreter for ProgressingInterpreter {
        type Process = StubProcess;
        fn new_process(&self, _page_address: i64, _heap: crate::ast::Heap) -> StubProcess {
            unimplemented!()
        }
        fn step(&self, mut process: StubProcess) -> StepOutcome<StubProcess> {
            process.status = Status::Done;
            StepOutcome::Progressed(process)
        }
    }

    struct CrashingInterpreter;
    impl Interpreter for CrashingInterpreter {
        type Process = StubProcess;
        fn new_process(&self, _page_address: i64, _heap: crate::ast::Heap) -> StubProcess {
            unimplemented!()
        }
        fn step(&self, _process: StubProcess) -> StepOutcome<StubProcess> {
            StepOutcome::Fatal("division by zero".to_string())
        }
    }

    struct RecoveringInterpreter;
    impl Interpreter for RecoveringInterpreter {
        type Process = StubProcess;
        fn new_process(&self, _page_address: i64, _heap: crate::ast::Heap) -> StubProcess {
            unimplemented!()
        }
        fn step(&self, process: StubProcess) -> StepOutcome<StubProcess> {
            StepOutcome::Recovered(process)
        }
    }

    struct PanickingInterpreter;
    impl Interpreter for PanickingInterpreter {
        type Process = StubProcess;
        fn new_process(&self, _page_address: i64, _heap: crate::ast::Heap) -> StubProcess {
            unimplemented!()
        }
        fn step(&self, _process: StubProcess) -> StepOutcome<StubProcess> {
            panic!("interpreter bug: index out of bounds");
        }
    }

    #[test]
    fn progressed_outcome_is_returned_as_is() {
        let p = StubProcess {
            status: Status::Ok,
            crash_reason: None,
        };
        let result = execute_step(&ProgressingInterpreter, p);
        assert_eq!(result.status, Status::Done);
    }

    #[test]
    fn fatal_outcome_crashes_a_clone_of_the_input_process() {
        let p = StubProcess {
            status: Status::Ok,
            crash_reason: None,
        };
        let result = execute_step(&CrashingInterpreter, p);
        assert_eq!(result.status, Status::Crashed);
        assert_eq!(result.crash_reason.as_deref(), Some("division by zero"));
    }

    #[test]
    fn recovered_outcome_preserves_partial_progress_unchanged() {
        let p = StubProcess {
            status: Status::Waiting,
            crash_reason: None,
        };
        let result = execute_step(&RecoveringInterpreter, p);
        assert_eq!(result.status, Status::Waiting);
    }

    #[test]
    fn a_panic_in_step_crashes_a_clone_of_the_input_process_instead_of_unwinding() {
        let p = StubProcess {
            status: Status::Ok,
            crash_reason: None,
        };
        let result = execute_step(&PanickingInterpreter, p);
        assert_eq!(result.status, Status::Crashed);
        assert_eq!(
            result.crash_reason.as_deref(),
            Some("interpreter bug: index out of bounds")
        );
    }
}
