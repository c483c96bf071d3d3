use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::ast::{Ast, Decoder, Heap, Slicer};
use crate::config::SupervisorConfig;
use crate::error::{SupervisorError, SupervisorResult};
use crate::interpreter::{HyperIoLayer, HyperSignal, Interpreter};
use crate::predicate;
use crate::process::{FarmProcess, ProcRef};
use crate::step;
use crate::table::CircularTable;

/// Interlock state: firmware owner plus the global emergency-lock flag.
struct Interlock {
    fw_proc: Option<ProcRef>,
    locked: bool,
}

impl Interlock {
    fn new() -> Self {
        Interlock {
            fw_proc: None,
            locked: false,
        }
    }
}

struct Inner<P> {
    table: CircularTable<P>,
    interlock: Interlock,
}

/// The cooperative scheduler and interlock core. Owns a [`CircularTable`] of
/// farm processes and the firmware/emergency-lock [`Interlock`]; serializes
/// every request against a tick loop running on its own thread.
pub struct Supervisor<I: Interpreter> {
    inner: Mutex<Inner<I::Process>>,
    interpreter: I,
    decoder: Box<dyn Decoder>,
    slicer: Box<dyn Slicer>,
    hyper_io: Box<dyn HyperIoLayer>,
    config: SupervisorConfig,
    running: AtomicBool,
    tick_thread: Mutex<Option<JoinHandle<()>>>,
}

impl<I: Interpreter> Supervisor<I> {
    /// Constructs a supervisor and starts its tick loop on a dedicated
    /// thread. Call [`Supervisor::shutdown`] to stop it.
    pub fn spawn(
        interpreter: I,
        decoder: impl Decoder,
        slicer: impl Slicer,
        hyper_io: impl HyperIoLayer,
        config: SupervisorConfig,
    ) -> Arc<Self> {
        let supervisor = Arc::new(Supervisor {
            inner: Mutex::new(Inner {
                table: CircularTable::new(),
                interlock: Interlock::new(),
            }),
            interpreter,
            decoder: Box::new(decoder),
            slicer: Box::new(slicer),
            hyper_io: Box::new(hyper_io),
            config,
            running: AtomicBool::new(true),
            tick_thread: Mutex::new(None),
        });

        let handle = {
            let supervisor = Arc::clone(&supervisor);
            thread::spawn(move || supervisor.run_tick_loop())
        };
        *supervisor.tick_thread.lock().unwrap() = Some(handle);

        log::info!(
            "supervisor started, tick period {:?}",
            supervisor.config.tick_period
        );
        supervisor
    }

    pub fn config(&self) -> SupervisorConfig {
        self.config
    }

    /// Stops the tick loop and joins its thread. Idempotent.
    pub fn shutdown(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            if let Some(handle) = self.tick_thread.lock().unwrap().take() {
                let _ = handle.join();
            }
            log::info!("supervisor stopped");
        }
    }

    /// `queue(heap, page) -> job_id`.
    pub fn queue(&self, heap: Heap, page_id: i64) -> SupervisorResult<u64> {
        let mut inner = self.inner.try_lock().map_err(|_| {
            log::trace!("queue rejected: supervisor busy");
            SupervisorError::Busy
        })?;
        let process = self.interpreter.new_process(page_id, heap);
        let job_id = inner.table.push(process);
        log::debug!("queued job {job_id} at page {page_id}");
        Ok(job_id)
    }

    /// `lookup(id) -> Process | not_found`. Cleans up terminal
    /// processes and releases firmware ownership on their behalf.
    pub fn lookup(&self, job_id: u64) -> SupervisorResult<Option<I::Process>> {
        let mut inner = self.inner.try_lock().map_err(|_| {
            log::trace!("lookup({job_id}) rejected: supervisor busy");
            SupervisorError::Busy
        })?;
        let Some(process) = inner.table.at(job_id).cloned() else {
            return Ok(None);
        };
        if process.status().is_terminal() {
            inner.table.remove(job_id);
            if inner.interlock.fw_proc == Some(process.job_ref()) {
                inner.interlock.fw_proc = None;
            }
            log::debug!("cleaned up terminal job {job_id}");
        }
        Ok(Some(process))
    }

    /// Hyper path: invokes the external hyper callback, then sets
    /// `hyper_state = emergency_lock`. Bypasses scheduling entirely; does
    /// not enqueue a process.
    pub fn emergency_lock(&self) -> SupervisorResult<()> {
        let mut inner = self.inner.try_lock().map_err(|_| {
            log::trace!("emergency_lock rejected: supervisor busy");
            SupervisorError::Busy
        })?;
        self.hyper_io.call(HyperSignal::EmergencyLock);
        inner.interlock.locked = true;
        log::info!("emergency lock engaged");
        Ok(())
    }

    /// Symmetric unlock. Clears `hyper_state` but never touches `fw_proc`.
    pub fn emergency_unlock(&self) -> SupervisorResult<()> {
        let mut inner = self.inner.try_lock().map_err(|_| {
            log::trace!("emergency_unlock rejected: supervisor busy");
            SupervisorError::Busy
        })?;
        self.hyper_io.call(HyperSignal::EmergencyUnlock);
        inner.interlock.locked = false;
        log::info!("emergency lock released");
        Ok(())
    }

    pub(crate) fn decode(&self, node: &crate::ast::ProgramNode) -> SupervisorResult<Ast> {
        self.decoder.decode(node)
    }

    pub(crate) fn slice(&self, ast: &Ast) -> Heap {
        self.slicer.slice(ast)
    }

    fn run_tick_loop(&self) {
        while self.running.load(Ordering::Relaxed) {
            thread::sleep(self.config.tick_period);
            if !self.running.load(Ordering::Relaxed) {
                break;
            }
            self.tick();
        }
    }

    /// One tick: select the cursor entry, gate it through the interlock
    /// predicate, step it if permitted, then rotate. At most one process
    /// advances per tick.
    fn tick(&self) {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Inner { table, interlock } = &mut *inner;

        table.update_current(|process| {
            if process.status().is_terminal() {
                log::trace!("job {:?} already terminal, skipping step", process.job_ref());
                return process;
            }

            let kind = process.pc_kind();
            let needs_fw = kind.needs_firmware();
            let owns_or_unowned = match interlock.fw_proc {
                None => true,
                Some(owner) => owner == process.job_ref(),
            };

            if !predicate::permit(kind.allowed_when_locked(), needs_fw, owns_or_unowned, interlock.locked)
            {
                log::trace!(
                    "job {:?} denied step (kind={kind}, locked={})",
                    process.job_ref(),
                    interlock.locked
                );
                return process;
            }

            if needs_fw && interlock.fw_proc.is_none() {
                interlock.fw_proc = Some(process.job_ref());
            }

            log::debug!("stepping job {:?} (kind={kind})", process.job_ref());
            step::execute_step(&self.interpreter, process)
        });

        table.rotate();
    }
}
