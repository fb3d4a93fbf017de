//! Event-driven interpreter for the flattened user logic.
//!
//! Processes run to completion. A write that changes a variable wakes every
//! process sensitive to it (except the one performing the write), and
//! nonblocking assignments are buffered until [`Core::update`]. `initial`
//! blocks from earlier builds are dropped, so a rebuild never replays them.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use cascade_core::bits::Bits;
use cascade_verilog::eval::{lvalue_width, split, Evaluator, Store, Target};
use cascade_verilog::ir::{
    Design, Edge, Expr, LValue, Process, ProcessKind, Stmt, SystemTask, TaskArg, TaskKind, Trigger,
    Var, VarId, VarKind,
};
use cascade_verilog::printf::{self, FormatArg};

use crate::engine::{Core, SimIo, Task, VId};
use crate::state::{EngineState, Input};

/// Immutable code shared by the interpreter while it mutates values.
#[derive(Debug)]
struct Code {
    vars: Vec<Var>,
    index: HashMap<String, VarId>,
    processes: Vec<Process>,
    /// Processes woken by a change of each variable.
    sensitivity: Vec<Vec<(Edge, usize)>>,
}

#[derive(Debug)]
pub struct SwLogic {
    code: Arc<Code>,
    values: Vec<Vec<Bits>>,
    reads: HashMap<VId, VarId>,
    writes: Vec<(VarId, VId)>,
    last_out: Vec<Option<Bits>>,
    active: VecDeque<usize>,
    queued: Vec<bool>,
    running: Option<usize>,
    updates: Vec<(Target, Bits)>,
    pending_reads: bool,
    silent: bool,
    tasks: bool,
    time: u64,
}

impl Store for SwLogic {
    fn read(&self, var: VarId, element: usize) -> &Bits {
        &self.values[var][element]
    }

    fn time(&self) -> u64 {
        self.time
    }
}

fn leading_code(args: &[FormatArg]) -> (u64, &[FormatArg]) {
    match args.split_first() {
        Some((FormatArg::Value(b), rest)) => (b.to_u64(), rest),
        _ => (0, args),
    }
}

fn text_arg(args: &[FormatArg]) -> String {
    match args.first() {
        Some(FormatArg::Str(s)) => s.clone(),
        Some(FormatArg::Value(b)) => b.to_ascii(),
        None => String::new(),
    }
}

fn case_match<S: Store + ?Sized>(ev: &Evaluator<'_, S>, cond: &Expr, label: &Expr) -> bool {
    let width = cond.width.max(label.width);
    let signed = cond.signed && label.signed;
    ev.eval_ctx(cond, width, signed) == ev.eval_ctx(label, width, signed)
}

impl SwLogic {
    /// Build an interpreter for `design`. Initial blocks whose origin is
    /// before `first_origin` belong to earlier builds and are skipped.
    /// `reads` maps data-plane ids to the variables they drive and `writes`
    /// lists variables published to the data plane.
    pub fn new(
        design: &Design,
        first_origin: usize,
        reads: HashMap<VId, VarId>,
        writes: Vec<(VarId, VId)>,
    ) -> Self {
        let processes: Vec<Process> = design
            .processes
            .iter()
            .filter(|p| !matches!(p.kind, ProcessKind::Initial { .. }) || p.origin >= first_origin)
            .cloned()
            .collect();
        let mut sensitivity = vec![Vec::new(); design.vars.len()];
        for (pid, p) in processes.iter().enumerate() {
            for (edge, var) in p.sensitivity() {
                sensitivity[var].push((edge, pid));
            }
        }
        let index = design
            .vars
            .iter()
            .enumerate()
            .map(|(id, v)| (v.name.clone(), id))
            .collect();
        let values = design
            .vars
            .iter()
            .map(|v| vec![v.zero(); v.len().max(1)])
            .collect();

        let mut logic = Self {
            values,
            reads,
            last_out: vec![None; writes.len()],
            writes,
            active: VecDeque::new(),
            queued: vec![false; processes.len()],
            running: None,
            updates: Vec::new(),
            pending_reads: false,
            silent: false,
            tasks: false,
            time: 0,
            code: Arc::new(Code {
                vars: design.vars.clone(),
                index,
                processes,
                sensitivity,
            }),
        };

        let code = Arc::clone(&logic.code);
        for (pid, p) in code.processes.iter().enumerate() {
            if matches!(p.kind, ProcessKind::Initial { .. }) {
                logic.schedule(pid);
            }
        }
        for (pid, p) in code.processes.iter().enumerate() {
            match &p.kind {
                ProcessKind::Assign { .. }
                | ProcessKind::Always {
                    trigger: Trigger::Star(_),
                    ..
                } => logic.schedule(pid),
                _ => {}
            }
        }
        logic
    }

    /// Current value of a variable by flat name.
    pub fn value(&self, name: &str) -> Option<&Bits> {
        let id = *self.code.index.get(name)?;
        self.values[id].first()
    }

    fn schedule(&mut self, pid: usize) {
        if !self.queued[pid] {
            self.queued[pid] = true;
            self.active.push_back(pid);
        }
    }

    fn drain(&mut self, io: &mut SimIo) {
        while let Some(pid) = self.active.pop_front() {
            self.queued[pid] = false;
            self.run(pid, io);
        }
    }

    /// Settle combinational logic without producing tasks or nonblocking
    /// updates. Pending initial blocks stay queued.
    fn silent_evaluate(&mut self) {
        let code = Arc::clone(&self.code);
        let mut io = SimIo::new(self.time);
        let mut deferred = Vec::new();
        self.silent = true;
        while let Some(pid) = self.active.pop_front() {
            self.queued[pid] = false;
            if matches!(code.processes[pid].kind, ProcessKind::Initial { .. }) {
                deferred.push(pid);
            } else {
                self.run(pid, &mut io);
            }
        }
        self.silent = false;
        for pid in deferred {
            self.schedule(pid);
        }
    }

    fn run(&mut self, pid: usize, io: &mut SimIo) {
        let code = Arc::clone(&self.code);
        self.running = Some(pid);
        match &code.processes[pid].kind {
            ProcessKind::Assign { lhs, rhs } => self.assign(&code, lhs, rhs),
            ProcessKind::Always { body, .. } | ProcessKind::Initial { body } => {
                self.exec(&code, body, io)
            }
        }
        self.running = None;
    }

    fn truth(&self, code: &Code, e: &Expr) -> bool {
        Evaluator::new(&code.vars, self).eval(e).to_bool()
    }

    fn resolve(&self, code: &Code, lv: &LValue, rhs: &Expr) -> Vec<(Target, Bits)> {
        let ev = Evaluator::new(&code.vars, self);
        let value = ev.eval_for(rhs, lvalue_width(&code.vars, lv));
        split(&value, ev.targets(lv))
    }

    fn assign(&mut self, code: &Code, lv: &LValue, rhs: &Expr) {
        for (target, bits) in self.resolve(code, lv, rhs) {
            self.store(code, &target, &bits);
        }
    }

    fn store(&mut self, code: &Code, t: &Target, bits: &Bits) {
        let slot = &mut self.values[t.var][t.element];
        let old = slot.clone();
        slot.assign_slice(t.lsb + t.width - 1, t.lsb, bits);
        if *slot == old {
            return;
        }
        let (was, is) = (old.get(0), slot.get(0));
        for &(edge, pid) in &code.sensitivity[t.var] {
            let fire = match edge {
                Edge::Any => true,
                Edge::Pos => !was && is,
                Edge::Neg => was && !is,
            };
            if fire && self.running != Some(pid) {
                self.schedule(pid);
            }
        }
    }

    fn whole(&self, var: VarId, element: usize) -> Target {
        Target {
            var,
            element,
            lsb: 0,
            width: self.values[var][element].width(),
        }
    }

    fn exec(&mut self, code: &Code, s: &Stmt, io: &mut SimIo) {
        match s {
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.exec(code, s, io);
                }
            }
            Stmt::Blocking(lv, rhs) => self.assign(code, lv, rhs),
            Stmt::Nonblocking(lv, rhs) => {
                if !self.silent {
                    let parts = self.resolve(code, lv, rhs);
                    self.updates.extend(parts);
                }
            }
            Stmt::If(cond, then, otherwise) => {
                if self.truth(code, cond) {
                    self.exec(code, then, io);
                } else if let Some(o) = otherwise {
                    self.exec(code, o, io);
                }
            }
            Stmt::Case {
                cond,
                arms,
                default,
            } => {
                let chosen = {
                    let ev = Evaluator::new(&code.vars, &*self);
                    arms.iter()
                        .position(|arm| arm.labels.iter().any(|l| case_match(&ev, cond, l)))
                };
                match (chosen, default) {
                    (Some(i), _) => self.exec(code, &arms[i].body, io),
                    (None, Some(d)) => self.exec(code, d, io),
                    (None, None) => {}
                }
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                self.assign(code, &init.0, &init.1);
                while self.truth(code, cond) {
                    self.exec(code, body, io);
                    self.assign(code, &step.0, &step.1);
                }
            }
            Stmt::While(cond, body) => {
                while self.truth(code, cond) {
                    self.exec(code, body, io);
                }
            }
            Stmt::Repeat(count, body) => {
                let n = Evaluator::new(&code.vars, &*self).eval(count);
                let n = if n.is_negative() { 0 } else { n.to_usize() };
                for _ in 0..n {
                    self.exec(code, body, io);
                }
            }
            Stmt::Task(task) => self.task(code, task, io),
            Stmt::Null => {}
        }
    }

    fn task(&mut self, code: &Code, task: &SystemTask, io: &mut SimIo) {
        if self.silent {
            return;
        }
        let args: Vec<FormatArg> = {
            let ev = Evaluator::new(&code.vars, &*self);
            task.args
                .iter()
                .map(|a| match a {
                    TaskArg::Str(s) => FormatArg::Str(s.clone()),
                    TaskArg::Expr(e) => FormatArg::Value(ev.eval(e)),
                })
                .collect()
        };
        let out = match task.kind {
            TaskKind::Display => Task::Display(printf::format(&args)),
            TaskKind::Write => Task::Write(printf::format(&args)),
            TaskKind::Error => Task::Error(printf::format(&args)),
            TaskKind::Warning => Task::Warning(printf::format(&args)),
            TaskKind::Info => Task::Info(printf::format(&args)),
            TaskKind::Fatal => {
                let (code, rest) = leading_code(&args);
                Task::Fatal {
                    code,
                    message: printf::format(rest),
                }
            }
            TaskKind::Finish => Task::Finish(leading_code(&args).0),
            TaskKind::Save => Task::Save(text_arg(&args)),
            TaskKind::Restart => Task::Restart(text_arg(&args)),
            TaskKind::Retarget => Task::Retarget(text_arg(&args)),
        };
        io.task(out);
        self.tasks = true;
    }

    fn flush(&mut self, io: &mut SimIo) {
        for (i, &(var, vid)) in self.writes.iter().enumerate() {
            let value = &self.values[var][0];
            if self.last_out[i].as_ref() != Some(value) {
                self.last_out[i] = Some(value.clone());
                io.write(vid, value.clone());
            }
        }
    }
}

impl Core for SwLogic {
    fn get_state(&self) -> EngineState {
        self.code
            .vars
            .iter()
            .enumerate()
            .filter(|(_, v)| v.kind == VarKind::Variable && v.std_port.is_none())
            .map(|(id, v)| (v.name.clone(), self.values[id].clone()))
            .collect()
    }

    fn set_state(&mut self, state: &EngineState) {
        let code = Arc::clone(&self.code);
        for (name, words) in state {
            let Some(&id) = code.index.get(name) else {
                continue;
            };
            if code.vars[id].kind != VarKind::Variable {
                continue;
            }
            for (element, word) in words.iter().enumerate().take(self.values[id].len()) {
                let target = self.whole(id, element);
                let value = word.resized(target.width);
                self.store(&code, &target, &value);
            }
        }
        self.silent_evaluate();
    }

    fn get_input(&self) -> Input {
        self.reads
            .iter()
            .map(|(&vid, &var)| (vid, self.values[var][0].clone()))
            .collect()
    }

    fn set_input(&mut self, input: &Input) {
        for (vid, value) in input {
            self.read(*vid, value);
        }
        self.pending_reads = false;
        self.silent_evaluate();
    }

    fn read(&mut self, vid: VId, value: &Bits) {
        let Some(&var) = self.reads.get(&vid) else {
            return;
        };
        let code = Arc::clone(&self.code);
        let target = self.whole(var, 0);
        self.store(&code, &target, &value.resized(target.width));
        self.pending_reads = true;
    }

    fn there_are_reads(&self) -> bool {
        self.pending_reads || !self.active.is_empty()
    }

    fn evaluate(&mut self, io: &mut SimIo) {
        self.time = io.time;
        self.tasks = false;
        self.pending_reads = false;
        self.drain(io);
        self.flush(io);
    }

    fn there_are_updates(&self) -> bool {
        !self.updates.is_empty()
    }

    fn update(&mut self, io: &mut SimIo) {
        self.time = io.time;
        self.tasks = false;
        let code = Arc::clone(&self.code);
        for (target, bits) in std::mem::take(&mut self.updates) {
            self.store(&code, &target, &bits);
        }
        self.drain(io);
        self.flush(io);
    }

    fn there_were_tasks(&self) -> bool {
        self.tasks
    }

    fn is_logic(&self) -> bool {
        true
    }
}
