//! The simulation runtime.
//!
//! Each loop iteration runs one logical time step under the Verilog reference
//! scheduling model: evaluate engines with pending reads until the design is
//! quiet, commit updates, and repeat until neither is left. Between steps the
//! runtime executes system tasks and interrupts, and rebuilds the engines when
//! new root items were accepted. When the design is just a clock and user
//! logic, the logic engine drives the clock itself for batches of steps.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use cascade_core::bits::Bits;
use cascade_core::config::RuntimeConfig;
use cascade_core::march::March;
use cascade_core::ROOT_MODULE;
use cascade_util::errors::CascadeError;
use cascade_util::fs::{read_source, IncludePath};
use cascade_verilog::ast::SourceElement;
use cascade_verilog::ir::Direction;
use cascade_verilog::{elaborate, parse, Issue, Program, SourceFile};
use tracing::{debug, info, trace, warn};

use crate::board::Board;
use crate::compiler::SwCompiler;
use crate::data_plane::DataPlane;
use crate::engine::{Core, SimIo, Task, VId};
use crate::handle::{EvalSource, Interrupt, RuntimeHandle};
use crate::state::{get_scalar, scalar, Input, Snapshot};
use crate::view::View;

const MAX_INCLUDE_DEPTH: usize = 16;
const MAX_OPEN_LOOP_ITERATIONS: usize = 1 << 24;
const IDLE_WAIT: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub march: March,
    pub include: IncludePath,
    /// Target seconds per open-loop batch; zero disables open-loop scheduling.
    pub open_loop_target: u64,
    pub disable_warnings: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            march: March::Minimal,
            include: IncludePath::new(),
            open_loop_target: 1,
            disable_warnings: false,
        }
    }
}

impl RuntimeOptions {
    pub fn from_config(config: &RuntimeConfig) -> Result<Self, CascadeError> {
        let mut include = IncludePath::new();
        for dir in &config.include_dirs {
            include.push(dir);
        }
        Ok(Self {
            march: config.march.parse()?,
            include,
            open_loop_target: config.open_loop_target,
            disable_warnings: config.disable_warnings,
        })
    }
}

/// Render a frequency with the largest unit that keeps it above one.
pub fn format_frequency(hz: u64) -> String {
    if hz > 1_000_000 {
        format!("{} MHz", hz / 1_000_000)
    } else if hz > 1000 {
        format!("{} KHz", hz / 1000)
    } else {
        format!("{hz} Hz")
    }
}

struct Slot {
    name: String,
    core: Box<dyn Core>,
}

pub struct Runtime {
    options: RuntimeOptions,
    view: Box<dyn View>,
    handle: RuntimeHandle,
    compiler: SwCompiler,
    program: Program,
    /// User elements accepted so far, replayed by `$retarget`.
    history: Vec<SourceElement>,
    data_plane: DataPlane,
    engines: Vec<Slot>,
    scheduled: Vec<bool>,
    logic: Option<usize>,
    clock: Option<(usize, VId)>,
    /// Root items covered by the current engines.
    built_items: usize,
    item_evals: usize,
    tasks: Vec<Task>,
    time: u64,
    started: Instant,
    open_loop_iterations: usize,
    finished: bool,
    status: i32,
}

impl Runtime {
    pub fn new(options: RuntimeOptions, view: Box<dyn View>) -> Self {
        let board = Board::new();
        let compiler = SwCompiler::new(board.clone(), options.include.clone());
        Self {
            handle: RuntimeHandle::new(board),
            compiler,
            options,
            view,
            program: Program::new(),
            history: Vec::new(),
            data_plane: DataPlane::new(),
            engines: Vec::new(),
            scheduled: Vec::new(),
            logic: None,
            clock: None,
            built_items: 0,
            item_evals: 0,
            tasks: Vec::new(),
            time: 0,
            started: Instant::now(),
            open_loop_iterations: 2,
            finished: false,
            status: 0,
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    /// Run on a blocking thread until the simulation finishes.
    pub fn spawn(self) -> tokio::task::JoinHandle<i32> {
        tokio::task::spawn_blocking(move || self.run())
    }

    /// Evaluate the march and simulate until `$finish`, a fatal error or an
    /// abort. Returns the process exit status.
    pub fn run(mut self) -> i32 {
        self.started = Instant::now();
        self.view.startup(self.time);
        let march = self.options.march;
        let prelude = SourceFile::new(march.path(), march.source());
        if !self.eval_text(&prelude, None, 0, false) {
            self.abort();
        }
        debug!(march = %march, "runtime started");

        while !self.finished {
            if self.item_evals > 0 {
                self.rebuild(self.built_items);
            }
            if self.finished {
                break;
            }
            if self.open_loop_ready() {
                self.open_loop_step();
            } else if self.clock.is_some() || self.has_activity() {
                self.reference_step();
            } else {
                self.handle.wait(IDLE_WAIT);
                self.drain_interrupts();
            }
        }

        self.view.shutdown(self.time);
        debug!(time = self.time, status = self.status, "runtime stopped");
        self.status
    }

    fn has_activity(&self) -> bool {
        self.scheduled.iter().any(|s| *s)
            || self
                .engines
                .iter()
                .any(|e| e.core.there_are_reads() || e.core.there_are_updates())
    }

    fn open_loop_ready(&self) -> bool {
        self.options.open_loop_target > 0
            && self.engines.len() == 2
            && self.clock.is_some()
            && self.logic.is_some()
            && !self.scheduled.iter().any(|s| *s)
    }

    // Scheduling

    fn dispatch(&mut self, io: &mut SimIo) {
        for (vid, value) in io.take_writes() {
            let readers = self.data_plane.write(vid, &value).to_vec();
            for r in readers {
                self.engines[r].core.read(vid, &value);
            }
        }
        self.tasks.extend(io.take_tasks());
    }

    fn drain_active(&mut self, io: &mut SimIo) {
        loop {
            let next = (0..self.engines.len())
                .find(|&i| self.scheduled[i] || self.engines[i].core.there_are_reads());
            let Some(i) = next else {
                break;
            };
            self.scheduled[i] = false;
            self.engines[i].core.evaluate(io);
            self.dispatch(io);
        }
    }

    fn drain_updates(&mut self, io: &mut SimIo) -> bool {
        let mut any = false;
        for i in 0..self.engines.len() {
            if self.engines[i].core.conditional_update(io) {
                any = true;
                self.dispatch(io);
            }
        }
        any
    }

    fn reference_step(&mut self) {
        let mut io = SimIo::new(self.time);
        loop {
            self.drain_active(&mut io);
            if !self.drain_updates(&mut io) {
                break;
            }
        }
        for e in &mut self.engines {
            e.core.done_step();
        }
        self.drain_interrupts();
        self.time += 1;
        self.handle.set_time(self.time);
    }

    fn open_loop_step(&mut self) {
        let (Some(logic), Some((clock, clk))) = (self.logic, self.clock) else {
            return;
        };
        let val = get_scalar(&self.engines[clock].core.get_state(), "val")
            .is_some_and(Bits::to_bool);
        let mut io = SimIo::new(self.time);
        let target = Duration::from_secs(self.options.open_loop_target);
        let start = Instant::now();
        let run = self.engines[logic]
            .core
            .open_loop(clk, val, self.open_loop_iterations, &mut io);
        let elapsed = start.elapsed();

        let val = val ^ (run % 2 == 1);
        self.engines[clock].core.set_state(&scalar("val", Bits::from_bool(val)));
        self.data_plane.force(clk, Bits::from_bool(val));
        self.tasks.extend(io.take_tasks());

        if run == self.open_loop_iterations {
            if elapsed < target {
                self.open_loop_iterations = (self.open_loop_iterations * 2).min(MAX_OPEN_LOOP_ITERATIONS);
            } else {
                self.open_loop_iterations = (self.open_loop_iterations / 2).max(1);
            }
        }
        trace!(run, next = self.open_loop_iterations, "open loop batch");

        // Tasks belong to the last step of the batch, so they run at its time.
        if run > 0 {
            self.time = io.time - 1;
        }
        self.drain_interrupts();
        self.time = io.time;
        self.handle.set_time(self.time);
    }

    // Interrupts

    fn drain_interrupts(&mut self) {
        for task in std::mem::take(&mut self.tasks) {
            if self.finished {
                break;
            }
            self.run_task(task);
        }
        for interrupt in self.handle.take_interrupts() {
            if self.finished {
                interrupt.fizzle();
                continue;
            }
            match interrupt {
                Interrupt::Eval { source, reply } => {
                    let ok = self.eval_source(source);
                    let _ = reply.send(ok);
                }
                Interrupt::Task(task) => self.run_task(task),
                Interrupt::Finish(code) => self.finish(code),
                Interrupt::Abort => self.abort(),
                Interrupt::CtrlD => {
                    self.view
                        .error(self.time, "*** User Interrupt:\n  > Caught Ctrl-D.");
                    self.finish(0);
                }
            }
        }
    }

    fn run_task(&mut self, task: Task) {
        let t = self.time;
        match task {
            Task::Display(text) => self.view.print(t, &format!("{text}\n")),
            Task::Write(text) => self.view.print(t, &text),
            Task::Error(text) => self.view.error(t, &text),
            Task::Warning(text) => self.view.warn(t, &text),
            Task::Info(text) => self.view.info(t, &text),
            Task::Fatal { code, message } => {
                self.view.error(t, &message);
                self.status = 1;
                self.finish(code);
            }
            Task::Finish(code) => self.finish(code),
            Task::Save(path) => self.save(Path::new(&path)),
            Task::Restart(path) => self.restart(Path::new(&path)),
            Task::Retarget(name) => self.retarget(&name),
        }
    }

    fn stop(&mut self) {
        self.finished = true;
        for e in &mut self.engines {
            e.core.done_simulation();
        }
        self.handle.stop();
    }

    fn finish(&mut self, code: u64) {
        if self.finished {
            return;
        }
        if code > 0 {
            let wall = self.started.elapsed();
            let hz = (self.time as f64 / 2.0 / wall.as_secs_f64().max(1e-9)) as u64;
            self.view.print(
                self.time,
                &format!(
                    "Simulation Time: {}\nWall Clock Time: {}s\nClock Frequency: {}\n",
                    self.time,
                    wall.as_secs(),
                    format_frequency(hz)
                ),
            );
        }
        self.stop();
    }

    fn abort(&mut self) {
        if !self.finished {
            self.status = 1;
            self.stop();
        }
    }

    fn runtime_error(&mut self, message: &str) {
        self.view
            .error(self.time, &format!("*** Runtime Error:\n  > {message}"));
    }

    fn save(&mut self, path: &Path) {
        let snapshot = Snapshot {
            time: self.time,
            engines: self
                .engines
                .iter()
                .map(|e| (e.name.clone(), e.core.get_state()))
                .collect(),
        };
        match snapshot.save(path) {
            Ok(()) => debug!(path = %path.display(), "saved simulation state"),
            Err(e) => self.runtime_error(&e.to_string()),
        }
    }

    fn restart(&mut self, path: &Path) {
        let snapshot = match Snapshot::load(path) {
            Ok(s) => s,
            Err(e) => return self.runtime_error(&e.to_string()),
        };
        for e in &mut self.engines {
            if let Some(state) = snapshot.engines.get(&e.name) {
                e.core.set_state(state);
            }
        }
        self.scheduled.fill(true);
        debug!(path = %path.display(), "restored simulation state");
    }

    fn retarget(&mut self, name: &str) {
        let march: March = match name.parse() {
            Ok(m) => m,
            Err(e) => return self.runtime_error(&e.to_string()),
        };
        let states: HashMap<String, _> = self
            .engines
            .iter()
            .map(|e| (e.name.clone(), e.core.get_state()))
            .collect();

        self.options.march = march;
        self.program = Program::new();
        self.engines.clear();
        self.scheduled.clear();
        self.logic = None;
        self.clock = None;
        let prelude = SourceFile::new(march.path(), march.source());
        if !self.eval_text(&prelude, None, 0, false) {
            return self.abort();
        }
        for element in self.history.clone() {
            let accepted = match element {
                SourceElement::Module(decl) => self.program.declare(decl).is_ok(),
                SourceElement::Item(item) => self.program.eval(item).is_ok(),
                SourceElement::Include { .. } => true,
            };
            if !accepted {
                warn!(march = %march, "element rejected while retargeting");
            }
        }
        self.rebuild(self.program.root_items().len());
        for e in &mut self.engines {
            if let Some(state) = states.get(&e.name) {
                e.core.set_state(state);
            }
        }
        info!(march = %march, "retargeted");
    }

    // Evaluation

    fn eval_source(&mut self, source: EvalSource) -> bool {
        match source {
            EvalSource::Text { name, text } => {
                self.eval_text(&SourceFile::new(name, text), None, 0, true)
            }
            EvalSource::File(path) => {
                let Some(resolved) = self.options.include.resolve(&path.to_string_lossy(), None)
                else {
                    self.view.error(
                        self.time,
                        &format!("*** Parse Error:\n  > unable to locate file {}", path.display()),
                    );
                    return false;
                };
                self.eval_path(&resolved, 0)
            }
        }
    }

    fn eval_path(&mut self, path: &Path, depth: usize) -> bool {
        let text = match read_source(path) {
            Ok(text) => text,
            Err(e) => {
                self.view
                    .error(self.time, &format!("*** Parse Error:\n  > {e}"));
                return false;
            }
        };
        let file = SourceFile::new(path.display().to_string(), text);
        let dir = path.parent().map(Path::to_path_buf);
        self.eval_text(&file, dir.as_deref(), depth, true)
    }

    fn report(&mut self, file: &SourceFile, issues: &[Issue]) {
        for issue in issues {
            let line = format!("{}: {}", file.location(issue.span), issue.message);
            if issue.is_error() {
                self.view
                    .error(self.time, &format!("*** Typechecker Error:\n  > {line}"));
            } else if !self.options.disable_warnings {
                self.view
                    .warn(self.time, &format!("*** Typechecker Warning:\n  > {line}"));
            }
        }
    }

    /// Parse, declare and evaluate every element of `file`, stopping at the
    /// first error. Includes are resolved against `dir` and the include path.
    fn eval_text(&mut self, file: &SourceFile, dir: Option<&Path>, depth: usize, user: bool) -> bool {
        let elements = match parse(file) {
            Ok(elements) => elements,
            Err(e) => {
                self.view.error(
                    self.time,
                    &format!("*** Parse Error:\n  > {}: {}", e.location(), e.message()),
                );
                return false;
            }
        };
        for element in elements {
            match element {
                SourceElement::Include { path, span } => {
                    let location = file.location(span);
                    if depth >= MAX_INCLUDE_DEPTH {
                        self.view.error(
                            self.time,
                            &format!("*** Parse Error:\n  > {location}: include nesting is too deep"),
                        );
                        return false;
                    }
                    let resolved: Option<PathBuf> = self.options.include.resolve(&path, dir);
                    let Some(resolved) = resolved else {
                        self.view.error(
                            self.time,
                            &format!("*** Parse Error:\n  > {location}: unable to locate file {path}"),
                        );
                        return false;
                    };
                    if !self.eval_path(&resolved, depth + 1) {
                        return false;
                    }
                }
                SourceElement::Module(decl) => match self.program.declare(decl.clone()) {
                    Ok(issues) => {
                        self.report(file, &issues);
                        trace!(module = %decl.name.name, "declared");
                        self.view.eval_decl(self.time, &decl);
                        if user {
                            self.history.push(SourceElement::Module(decl));
                        }
                    }
                    Err(issues) => {
                        self.report(file, &issues);
                        return false;
                    }
                },
                SourceElement::Item(item) => match self.program.eval(item.clone()) {
                    Ok(issues) => {
                        self.report(file, &issues);
                        self.item_evals += 1;
                        self.view.eval_item(self.time, &item);
                        if user {
                            self.history.push(SourceElement::Item(item));
                        }
                    }
                    Err(issues) => {
                        self.report(file, &issues);
                        return false;
                    }
                },
            }
        }
        true
    }

    // Rebuilds

    /// Rebuild the engines for the current program. Standard components that
    /// already have an engine keep it; the logic engine is replaced and
    /// inherits the previous one's state and inputs.
    fn rebuild(&mut self, first_origin: usize) {
        self.item_evals = 0;
        let design = match elaborate(&self.program) {
            Ok(design) => design,
            Err(e) => {
                self.view.error(
                    self.time,
                    &format!("*** Internal Compiler Error:\n  > {e}"),
                );
                return self.abort();
            }
        };

        let mut old: HashMap<String, Box<dyn Core>> = self
            .engines
            .drain(..)
            .map(|slot| (slot.name, slot.core))
            .collect();
        let old_logic = old.remove(ROOT_MODULE);

        let mut engines = Vec::with_capacity(design.std_instances.len() + 1);
        let mut fresh = Vec::with_capacity(design.std_instances.len() + 1);
        for inst in &design.std_instances {
            fresh.push(!old.contains_key(&inst.name));
            let core = match old.remove(&inst.name) {
                Some(core) => core,
                None => match self.compiler.compile_std(&design, inst, &mut self.data_plane) {
                    Ok(core) => core,
                    Err(e) => {
                        self.view.error(
                            self.time,
                            &format!("*** Internal Compiler Error:\n  > {e}"),
                        );
                        return self.abort();
                    }
                },
            };
            engines.push(Slot {
                name: inst.name.clone(),
                core,
            });
        }

        let mut logic = self
            .compiler
            .compile_logic(&design, first_origin, &mut self.data_plane);
        if let Some(prev) = old_logic {
            logic.set_state(&prev.get_state());
            logic.set_input(&prev.get_input());
        }
        let logic_index = engines.len();
        engines.push(Slot {
            name: ROOT_MODULE.to_string(),
            core: Box::new(logic),
        });

        self.data_plane.clear_readers();
        self.clock = None;
        for (i, inst) in design.std_instances.iter().enumerate() {
            for port in &inst.ports {
                let vid = self.data_plane.vid(&design.var(port.var).name);
                match port.dir {
                    Direction::Output => self.data_plane.add_reader(vid, logic_index),
                    Direction::Input | Direction::Inout => self.data_plane.add_reader(vid, i),
                }
            }
            if inst.kind == "clock" && self.clock.is_none() {
                if let Some(p) = inst.port("val") {
                    self.clock = Some((i, self.data_plane.vid(&design.var(p.var).name)));
                }
            }
        }

        // New components are primed with the current port values as restored
        // input, so a replayed high clock is not mistaken for a rising edge.
        let mut primed: Vec<Input> = vec![Input::new(); engines.len()];
        for vid in 0..self.data_plane.len() {
            let Some(value) = self.data_plane.last(vid).cloned() else {
                continue;
            };
            for &r in self.data_plane.readers(vid) {
                if r != logic_index && fresh[r] {
                    primed[r].insert(vid, value.clone());
                } else {
                    engines[r].core.read(vid, &value);
                }
            }
        }
        for (slot, input) in engines.iter_mut().zip(&primed) {
            if !input.is_empty() {
                slot.core.set_input(input);
            }
        }

        self.scheduled = vec![true; engines.len()];
        self.engines = engines;
        self.logic = Some(logic_index);
        self.built_items = self.program.root_items().len();
        debug!(
            engines = self.engines.len(),
            processes = design.processes.len(),
            first_origin,
            time = self.time,
            "rebuilt engines"
        );
    }
}
