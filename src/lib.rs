//! Cooperative, single-runner round-robin scheduler and firmware interlock
//! core for farm-automation sequences.
//!
//! A [`Supervisor`] owns a rotating table of farm processes and steps at most
//! one of them per tick, gated by a pure admission predicate over firmware
//! ownership and a global emergency lock. Decoding caller-submitted programs,
//! slicing them into an interpreter's executable form, and actually running
//! them are external concerns — see [`Decoder`], [`Slicer`], and
//! [`Interpreter`].

mod api;
mod ast;
mod config;
mod error;
mod interpreter;
mod kind;
mod predicate;
mod process;
mod step;
mod supervisor;
mod table;
mod toy;

pub use api::{RpcOutcome, SequenceOutcome};
pub use ast::{Ast, Decoder, Heap, IdentitySlicer, MapDecoder, ProgramNode, Slicer, Value};
pub use config::{SupervisorConfig, SupervisorConfigBuilder, DEFAULT_TICK_PERIOD};
pub use error::{SupervisorError, SupervisorResult};
pub use interpreter::{HyperIoLayer, HyperSignal, Interpreter, ProcessIoLayer, StepOutcome};
pub use kind::InstructionKind;
pub use process::{FarmProcess, ProcRef, Status};
pub use supervisor::Supervisor;
pub use toy::{LoggingHyperIoLayer, LoggingProcessIoLayer, ToyInterpreter, ToyProcess};
