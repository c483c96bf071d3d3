//! End-to-end scenarios against the public `Supervisor` API, driven by the
//! bundled reference interpreter and I/O layers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use farmvm_scheduler::{
    Ast, FarmProcess, HyperIoLayer, HyperSignal, IdentitySlicer, InstructionKind, MapDecoder,
    ProgramNode, RpcOutcome, Slicer, Status, Supervisor, SupervisorConfig, SupervisorError,
    ToyInterpreter, LoggingProcessIoLayer,
};

fn config(tick_ms: u64) -> SupervisorConfig {
    SupervisorConfig::builder()
        .tick_period(Duration::from_millis(tick_ms))
        .build()
}

fn instr(kind: InstructionKind) -> Ast {
    Ast {
        kind,
        args: HashMap::new(),
        body: vec![],
    }
}

fn sequence(body: Vec<Ast>) -> Ast {
    Ast {
        kind: InstructionKind::Sequence,
        args: HashMap::new(),
        body,
    }
}

fn program_node(kind: &'static str, label: Option<&str>, body: Vec<ProgramNode>) -> ProgramNode {
    let mut args = vec![];
    if let Some(label) = label {
        args.push(("label", ProgramNode::Text(label.to_string())));
    }
    ProgramNode::map([
        ("kind", ProgramNode::Text(kind.to_string())),
        ("args", ProgramNode::map(args)),
        ("body", ProgramNode::List(body)),
    ])
}

#[derive(Default, Clone)]
struct RecordingHyperIo {
    calls: Arc<Mutex<Vec<HyperSignal>>>,
}

impl HyperIoLayer for RecordingHyperIo {
    fn call(&self, signal: HyperSignal) {
        self.calls.lock().unwrap().push(signal);
    }
}

fn new_supervisor(
    tick_ms: u64,
    hyper_io: RecordingHyperIo,
) -> Arc<Supervisor<ToyInterpreter<LoggingProcessIoLayer>>> {
    Supervisor::spawn(
        ToyInterpreter::new(LoggingProcessIoLayer),
        MapDecoder,
        IdentitySlicer,
        hyper_io,
        config(tick_ms),
    )
}

#[test]
fn emergency_lock_rpc_completes_without_creating_a_job() {
    let hyper_io = RecordingHyperIo::default();
    let supervisor = new_supervisor(10, hyper_io.clone());

    let program = program_node(
        "rpc_request",
        Some("estop"),
        vec![program_node("emergency_lock", None, vec![])],
    );

    let outcome = Arc::new(Mutex::new(None));
    {
        let outcome = Arc::clone(&outcome);
        supervisor
            .rpc_request(&program, move |result| *outcome.lock().unwrap() = Some(result))
            .unwrap();
    }

    assert_eq!(
        *outcome.lock().unwrap(),
        Some(RpcOutcome::Ok {
            label: "estop".to_string()
        })
    );
    assert_eq!(*hyper_io.calls.lock().unwrap(), vec![HyperSignal::EmergencyLock]);
    assert_eq!(supervisor.lookup(0).unwrap(), None, "no job should have been queued");

    supervisor.shutdown();
}

#[test]
fn two_firmware_contending_sequences_both_run_to_completion() {
    let supervisor = new_supervisor(10, RecordingHyperIo::default());

    let seq_a = sequence(vec![
        instr(InstructionKind::MoveAbsolute),
        instr(InstructionKind::MoveAbsolute),
        instr(InstructionKind::MoveAbsolute),
    ]);
    let seq_b = sequence(vec![
        instr(InstructionKind::WritePin),
        instr(InstructionKind::WritePin),
    ]);

    let job_a = supervisor.queue(IdentitySlicer.slice(&seq_a), -1).unwrap();
    let job_b = supervisor.queue(IdentitySlicer.slice(&seq_b), -1).unwrap();

    let a = supervisor
        .await_job_timeout(job_a, Duration::from_secs(2))
        .unwrap()
        .expect("job a should finish within the timeout");
    let b = supervisor
        .await_job_timeout(job_b, Duration::from_secs(2))
        .unwrap()
        .expect("job b should finish within the timeout");

    assert_eq!(a.status(), Status::Done);
    assert_eq!(b.status(), Status::Done);
    assert_eq!(supervisor.lookup(job_a).unwrap(), None);
    assert_eq!(supervisor.lookup(job_b).unwrap(), None);

    supervisor.shutdown();
}

#[test]
fn emergency_lock_pauses_a_live_sequence_until_unlocked() {
    let tick_ms = 20;
    let supervisor = new_supervisor(tick_ms, RecordingHyperIo::default());

    let seq = sequence(vec![
        instr(InstructionKind::MoveAbsolute),
        instr(InstructionKind::MoveAbsolute),
    ]);
    let job = supervisor.queue(IdentitySlicer.slice(&seq), -1).unwrap();

    // Lock before the tick thread's first wake-up so the sequence never
    // gets an unlocked tick to make progress on.
    supervisor.emergency_lock().unwrap();
    std::thread::sleep(Duration::from_millis(tick_ms * 4));

    let process = supervisor.lookup(job).unwrap().expect("job still queued");
    assert_eq!(process.status(), Status::Ok, "move_absolute is not allowed while locked");
    assert_eq!(process.program_counter(), 0, "locked process must not advance");

    supervisor.emergency_unlock().unwrap();
    let process = supervisor
        .await_job_timeout(job, Duration::from_secs(2))
        .unwrap()
        .expect("job should finish after unlock");
    assert_eq!(process.status(), Status::Done);

    supervisor.shutdown();
}

#[test]
fn a_crash_in_one_process_leaves_others_unaffected() {
    let supervisor = new_supervisor(10, RecordingHyperIo::default());

    let mut crashing_args = HashMap::new();
    crashing_args.insert("crash".to_string(), farmvm_scheduler::Value::Bool(true));
    let crashing = Ast {
        kind: InstructionKind::MoveAbsolute,
        args: crashing_args,
        body: vec![],
    };
    let healthy = instr(InstructionKind::ReadStatus);

    let crashing_job = supervisor.queue(IdentitySlicer.slice(&crashing), -1).unwrap();
    let healthy_job = supervisor.queue(IdentitySlicer.slice(&healthy), -1).unwrap();

    let crashed = supervisor
        .await_job_timeout(crashing_job, Duration::from_secs(1))
        .unwrap()
        .expect("crashing job should terminate");
    assert_eq!(crashed.status(), Status::Crashed);
    assert!(crashed.crash_reason().unwrap().contains("forced crash"));
    assert_eq!(supervisor.lookup(crashing_job).unwrap(), None);

    let healthy = supervisor
        .await_job_timeout(healthy_job, Duration::from_secs(1))
        .unwrap()
        .expect("healthy job should terminate");
    assert_eq!(healthy.status(), Status::Done);

    supervisor.shutdown();
}

#[test]
fn awaiting_an_unknown_job_id_is_an_argument_error() {
    let supervisor = new_supervisor(10, RecordingHyperIo::default());
    assert!(matches!(
        supervisor.await_job(12345),
        Err(SupervisorError::ArgumentError(_))
    ));
    supervisor.shutdown();
}

#[test]
fn three_non_contending_sequences_complete_within_a_bounded_spread() {
    let tick_ms = 10;
    let supervisor = new_supervisor(tick_ms, RecordingHyperIo::default());

    let three_reads = || {
        sequence(vec![
            instr(InstructionKind::ReadStatus),
            instr(InstructionKind::ReadStatus),
            instr(InstructionKind::ReadStatus),
        ])
    };

    let jobs: Vec<u64> = (0..3)
        .map(|_| supervisor.queue(IdentitySlicer.slice(&three_reads()), -1).unwrap())
        .collect();

    let start = Instant::now();
    let mut finished_at = Vec::new();
    for job in &jobs {
        supervisor
            .await_job_timeout(*job, Duration::from_secs(2))
            .unwrap()
            .expect("each job should finish");
        finished_at.push(start.elapsed());
    }

    let min = finished_at.iter().min().unwrap();
    let max = finished_at.iter().max().unwrap();
    assert!(
        *max - *min < Duration::from_millis(tick_ms * 12),
        "round-robin should finish all three within a handful of tick periods of each other, got {finished_at:?}"
    );

    supervisor.shutdown();
}
