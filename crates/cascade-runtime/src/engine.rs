//! The engine interface shared by every executable piece of a design.

use cascade_core::bits::Bits;

use crate::state::{EngineState, Input};

/// Index of a port variable in the data plane.
pub type VId = usize;

/// A system task raised by an engine, executed by the runtime between steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Display(String),
    Write(String),
    Error(String),
    Warning(String),
    Info(String),
    Fatal { code: u64, message: String },
    Finish(u64),
    Save(String),
    Restart(String),
    Retarget(String),
}

/// Output collected from a single engine call.
#[derive(Debug, Default)]
pub struct SimIo {
    /// Logical time seen by `$time`.
    pub time: u64,
    writes: Vec<(VId, Bits)>,
    tasks: Vec<Task>,
}

impl SimIo {
    pub fn new(time: u64) -> Self {
        Self {
            time,
            ..Self::default()
        }
    }

    pub fn write(&mut self, vid: VId, value: Bits) {
        self.writes.push((vid, value));
    }

    pub fn task(&mut self, task: Task) {
        self.tasks.push(task);
    }

    pub fn take_writes(&mut self) -> Vec<(VId, Bits)> {
        std::mem::take(&mut self.writes)
    }

    pub fn take_tasks(&mut self) -> Vec<Task> {
        std::mem::take(&mut self.tasks)
    }

    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }
}

/// An executable model of part of a design.
///
/// The scheduler alternates between [`Core::evaluate`] (settle combinational
/// logic after new inputs) and [`Core::update`] (commit latched state, such as
/// nonblocking assignments or a clock edge) until no engine has work left.
pub trait Core: Send {
    fn get_state(&self) -> EngineState;
    fn set_state(&mut self, state: &EngineState);
    fn get_input(&self) -> Input;
    fn set_input(&mut self, input: &Input);

    /// Deliver a new value for a port this engine reads.
    fn read(&mut self, vid: VId, value: &Bits);

    fn there_are_reads(&self) -> bool {
        false
    }

    fn evaluate(&mut self, io: &mut SimIo);
    fn there_are_updates(&self) -> bool;
    fn update(&mut self, io: &mut SimIo);

    fn there_were_tasks(&self) -> bool {
        false
    }

    fn conditional_evaluate(&mut self, io: &mut SimIo) -> bool {
        if self.there_are_reads() {
            self.evaluate(io);
            true
        } else {
            false
        }
    }

    fn conditional_update(&mut self, io: &mut SimIo) -> bool {
        if self.there_are_updates() {
            self.update(io);
            true
        } else {
            false
        }
    }

    fn done_step(&mut self) {}

    fn done_simulation(&mut self) {}

    /// Drive `clk` internally for up to `iterations` half periods, starting
    /// from `val`. Stops early after any iteration that raised a task.
    /// Returns the number of iterations run.
    fn open_loop(&mut self, clk: VId, val: bool, iterations: usize, io: &mut SimIo) -> usize {
        let mut clock = Bits::from_bool(val);
        let mut run = 0;
        let mut tasks = false;
        while run < iterations && !tasks {
            clock.flip(0);
            self.read(clk, &clock);
            loop {
                self.evaluate(io);
                tasks |= self.there_were_tasks();
                let updated = self.conditional_update(io);
                tasks |= self.there_were_tasks();
                if !updated {
                    break;
                }
            }
            self.done_step();
            io.clear_writes();
            io.time += 1;
            run += 1;
        }
        run
    }

    fn is_clock(&self) -> bool {
        false
    }

    fn is_logic(&self) -> bool {
        false
    }
}
