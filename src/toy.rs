//! A minimal in-tree interpreter, process type, and I/O layers satisfying
//! the scheduler's external contracts — not a deliverable in its own right,
//! but enough to exercise a [`crate::supervisor::Supervisor`]
//! end to end in this crate's own tests without an embedder's real VM.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::ast::{Ast, Heap, Value};
use crate::interpreter::{HyperIoLayer, HyperSignal, Interpreter, ProcessIoLayer, StepOutcome};
use crate::kind::InstructionKind;
use crate::process::{FarmProcess, ProcRef, Status};

/// A farm process driven by [`ToyInterpreter`]: a flat instruction list with
/// a program counter, no heap or variables beyond each instruction's `args`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToyProcess {
    job_ref: ProcRef,
    status: Status,
    crash_reason: Option<String>,
    instructions: Vec<Ast>,
    pc: usize,
    page_address: i64,
}

impl ToyProcess {
    pub fn page_address(&self) -> i64 {
        self.page_address
    }

    pub fn program_counter(&self) -> usize {
        self.pc
    }
}

impl FarmProcess for ToyProcess {
    fn status(&self) -> Status {
        self.status
    }

    fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    fn job_ref(&self) -> ProcRef {
        self.job_ref
    }

    fn crash_reason(&self) -> Option<&str> {
        self.crash_reason.as_deref()
    }

    fn set_crash_reason(&mut self, reason: Option<String>) {
        self.crash_reason = reason;
    }

    fn pc_kind(&self) -> InstructionKind {
        self.instructions[self.pc].kind
    }
}

/// A sequence's instructions are its `body`; a bare single instruction (an
/// RPC with no body) is its own one-instruction program.
fn flatten(ast: &Ast) -> Vec<Ast> {
    if ast.body.is_empty() {
        vec![ast.clone()]
    } else {
        ast.body.clone()
    }
}

/// Reference interpreter: runs each instruction in turn, invoking the I/O
/// layer and honoring one test hook (`args.crash = true` forces a fatal
/// step) and one stateful instruction (`wait`, which suspends for exactly
/// one step before resuming).
pub struct ToyInterpreter<IO> {
    io_layer: IO,
    next_ref: AtomicU64,
}

impl<IO: ProcessIoLayer> ToyInterpreter<IO> {
    pub fn new(io_layer: IO) -> Self {
        ToyInterpreter {
            io_layer,
            next_ref: AtomicU64::new(0),
        }
    }
}

impl<IO: ProcessIoLayer> Interpreter for ToyInterpreter<IO> {
    type Process = ToyProcess;

    fn new_process(&self, page_address: i64, heap: Heap) -> ToyProcess {
        let job_ref = ProcRef(self.next_ref.fetch_add(1, Ordering::Relaxed));
        ToyProcess {
            job_ref,
            status: Status::Ok,
            crash_reason: None,
            instructions: flatten(&heap.0),
            pc: 0,
            page_address,
        }
    }

    fn step(&self, mut process: ToyProcess) -> StepOutcome<ToyProcess> {
        if process.pc >= process.instructions.len() {
            process.status = Status::Done;
            return StepOutcome::Progressed(process);
        }

        let instr = process.instructions[process.pc].clone();
        self.io_layer.call(&instr);

        let forced_crash = matches!(instr.args.get("crash"), Some(Value::Bool(true)));
        if forced_crash {
            return StepOutcome::Fatal(format!(
                "toy interpreter: forced crash at pc {}",
                process.pc
            ));
        }

        if instr.kind == InstructionKind::Wait && process.status != Status::Waiting {
            process.status = Status::Waiting;
            return StepOutcome::Progressed(process);
        }

        process.pc += 1;
        process.status = if process.pc >= process.instructions.len() {
            Status::Done
        } else {
            Status::Ok
        };
        StepOutcome::Progressed(process)
    }
}

/// Reference I/O layer: logs the instruction it was handed and nothing else.
pub struct LoggingProcessIoLayer;

impl ProcessIoLayer for LoggingProcessIoLayer {
    fn call(&self, ast: &Ast) {
        log::trace!("process_io_layer invoked for {:?}", ast.kind);
    }
}

/// Reference hyper I/O layer: logs the signal it was handed and nothing else.
pub struct LoggingHyperIoLayer;

impl HyperIoLayer for LoggingHyperIoLayer {
    fn call(&self, signal: HyperSignal) {
        log::info!("hyper_io_layer invoked with {signal:?}");
    }
}
