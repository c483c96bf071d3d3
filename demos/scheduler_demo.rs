//! Runs the bundled toy interpreter under a real `Supervisor` so the crate
//! can be exercised without an embedder: queues two firmware-contending
//! sequences and an emergency-lock RPC, then prints what happened.

use std::collections::HashMap;
use std::time::Duration;

use farmvm_scheduler::{
    Ast, FarmProcess, IdentitySlicer, InstructionKind, LoggingHyperIoLayer, LoggingProcessIoLayer,
    MapDecoder, ProgramNode, Slicer, Supervisor, SupervisorConfig, ToyInterpreter,
};

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

fn main() {
    env_logger::init();

    let config = SupervisorConfig::builder()
        .tick_period(Duration::from_millis(20))
        .build();
    let supervisor = Supervisor::spawn(
        ToyInterpreter::new(LoggingProcessIoLayer),
        MapDecoder,
        IdentitySlicer,
        LoggingHyperIoLayer,
        config,
    );

    let move_seq = sequence(vec![
        instr(InstructionKind::MoveAbsolute),
        instr(InstructionKind::MoveAbsolute),
    ]);
    let pin_seq = sequence(vec![instr(InstructionKind::WritePin)]);

    let job_a = supervisor.queue(IdentitySlicer.slice(&move_seq), -1).unwrap();
    let job_b = supervisor.queue(IdentitySlicer.slice(&pin_seq), -1).unwrap();

    let a = supervisor.await_job(job_a).unwrap();
    let b = supervisor.await_job(job_b).unwrap();
    println!("job {job_a} finished as {:?}", a.status());
    println!("job {job_b} finished as {:?}", b.status());

    let lock_request = ProgramNode::map([
        ("kind", ProgramNode::Text("rpc_request".to_string())),
        (
            "args",
            ProgramNode::map([("label", ProgramNode::Text("estop".to_string()))]),
        ),
        (
            "body",
            ProgramNode::List(vec![ProgramNode::map([
                ("kind", ProgramNode::Text("emergency_lock".to_string())),
                ("args", ProgramNode::map([])),
                ("body", ProgramNode::List(vec![])),
            ])]),
        ),
    ]);
    supervisor
        .rpc_request(&lock_request, |outcome| {
            println!("emergency lock rpc completed: {outcome:?}");
        })
        .unwrap();

    supervisor.shutdown();
}
