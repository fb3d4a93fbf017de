//! The controller-side interface to a running simulation.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;

use crate::board::Board;
use crate::engine::Task;

/// Verilog text to evaluate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalSource {
    /// Text with the name used in error locations.
    Text { name: String, text: String },
    /// A file resolved against the include path.
    File(PathBuf),
}

/// Work executed by the runtime between two time steps.
#[derive(Debug)]
pub enum Interrupt {
    /// Evaluate source text; the reply is `true` when every element was
    /// accepted.
    Eval {
        source: EvalSource,
        reply: oneshot::Sender<bool>,
    },
    Task(Task),
    /// Equivalent to `$finish(code)`.
    Finish(u64),
    /// Stop without statistics and exit with a failure status.
    Abort,
    CtrlD,
}

impl Interrupt {
    /// Drop an interrupt that arrived after the runtime stopped.
    pub(crate) fn fizzle(self) {
        if let Interrupt::Eval { reply, .. } = self {
            let _ = reply.send(false);
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    queue: Mutex<VecDeque<Interrupt>>,
    wake: Condvar,
    stopped: AtomicBool,
    time: AtomicU64,
    board: Board,
}

/// A cloneable handle for scheduling interrupts on a [`crate::Runtime`].
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    shared: Arc<Shared>,
}

impl RuntimeHandle {
    pub(crate) fn new(board: Board) -> Self {
        Self {
            shared: Arc::new(Shared {
                board,
                ..Shared::default()
            }),
        }
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<Interrupt>> {
        self.shared.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue an interrupt. Interrupts scheduled after the runtime stopped
    /// fizzle immediately.
    pub fn schedule(&self, interrupt: Interrupt) {
        let mut queue = self.queue();
        if self.is_stopped() {
            drop(queue);
            interrupt.fizzle();
            return;
        }
        queue.push_back(interrupt);
        self.shared.wake.notify_all();
    }

    /// Evaluate `text`, reporting errors against `name`.
    pub fn eval(&self, name: impl Into<String>, text: impl Into<String>) -> oneshot::Receiver<bool> {
        self.eval_source(EvalSource::Text {
            name: name.into(),
            text: text.into(),
        })
    }

    pub fn eval_file(&self, path: impl Into<PathBuf>) -> oneshot::Receiver<bool> {
        self.eval_source(EvalSource::File(path.into()))
    }

    fn eval_source(&self, source: EvalSource) -> oneshot::Receiver<bool> {
        let (reply, rx) = oneshot::channel();
        self.schedule(Interrupt::Eval { source, reply });
        rx
    }

    pub fn finish(&self, code: u64) {
        self.schedule(Interrupt::Finish(code));
    }

    pub fn abort(&self) {
        self.schedule(Interrupt::Abort);
    }

    pub fn ctrl_d(&self) {
        self.schedule(Interrupt::CtrlD);
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::Acquire)
    }

    /// Logical time at the end of the most recent step.
    pub fn time(&self) -> u64 {
        self.shared.time.load(Ordering::Relaxed)
    }

    pub fn board(&self) -> &Board {
        &self.shared.board
    }

    pub(crate) fn set_time(&self, time: u64) {
        self.shared.time.store(time, Ordering::Relaxed);
    }

    pub(crate) fn take_interrupts(&self) -> VecDeque<Interrupt> {
        std::mem::take(&mut *self.queue())
    }

    /// Block until an interrupt arrives or `timeout` passes.
    pub(crate) fn wait(&self, timeout: Duration) {
        let queue = self.queue();
        if queue.is_empty() && !self.is_stopped() {
            let _ = self
                .shared
                .wake
                .wait_timeout(queue, timeout)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Mark the runtime stopped and fizzle everything still queued.
    pub(crate) fn stop(&self) {
        let pending = {
            let mut queue = self.queue();
            self.shared.stopped.store(true, Ordering::Release);
            std::mem::take(&mut *queue)
        };
        self.shared.wake.notify_all();
        for interrupt in pending {
            interrupt.fizzle();
        }
    }
}
