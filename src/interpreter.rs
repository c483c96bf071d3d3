use crate::ast::{Ast, Heap};
use crate::process::FarmProcess;

/// Outcome of one interpreter `step` call.
pub enum StepOutcome<P> {
    /// The instruction ran to completion (or made partial progress on a
    /// `waiting` status); `status()` reflects the new state.
    Progressed(P),
    /// The interpreter raised its dedicated recoverable exception, carrying
    /// the partial-progress process. The step executor returns this process
    /// unchanged; its status may still be live.
    Recovered(P),
    /// Any other interpreter failure. The step executor converts this into a
    /// `crashed` clone of the process that was passed in; the interpreter
    /// does not get to choose the process state at that point.
    Fatal(String),
}

/// The AST-decoder/heap-slicer/interpreter contract this crate consumes,
/// bundled behind one trait so a `Supervisor` only needs one type
/// parameter for "the VM". Embedders supply their own.
pub trait Interpreter: Send + Sync + 'static {
    type Process: FarmProcess;

    /// `new(io_callback, page_address, heap) -> Process`. The I/O callback is
    /// the interpreter's own concern (it is invoked internally during
    /// `step`); only `page_address` and `heap` are visible at this boundary.
    fn new_process(&self, page_address: i64, heap: Heap) -> Self::Process;

    /// `step(Process) -> Process`, fallibly.
    fn step(&self, process: Self::Process) -> StepOutcome<Self::Process>;
}

/// `process_io_layer(AST) -> any`, invoked by the interpreter during `step`.
/// Not called directly by the scheduler; listed here only because the
/// bundled reference interpreter needs an instance to construct processes
/// with.
pub trait ProcessIoLayer: Send + Sync + 'static {
    fn call(&self, ast: &Ast);
}

/// The out-of-band command delivered to [`HyperIoLayer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HyperSignal {
    EmergencyLock,
    EmergencyUnlock,
}

/// `hyper_io_layer(:emergency_lock | :emergency_unlock) -> any`, invoked
/// synchronously from the Supervisor's hyper path, never from the
/// tick loop.
pub trait HyperIoLayer: Send + Sync + 'static {
    fn call(&self, signal: HyperSignal);
}
