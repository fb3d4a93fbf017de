//! Elaborated design: flat variables, typed expressions and processes.

use std::collections::{BTreeMap, HashMap};

use cascade_core::bits::Bits;

pub use crate::ast::{BinaryOp, CaseKind, Direction, Edge, UnaryOp};

pub type VarId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Net,
    Variable,
}

#[derive(Debug, Clone)]
pub struct Var {
    /// Flat hierarchical name such as `counter.q`.
    pub name: String,
    pub width: usize,
    pub signed: bool,
    /// Declared bit range `[msb:lsb]`.
    pub range: (i64, i64),
    /// Unpacked dimensions as declared bounds.
    pub dims: Vec<(i64, i64)>,
    pub kind: VarKind,
    /// Direction of a standard component port, seen from the component.
    pub std_port: Option<Direction>,
}

impl Var {
    /// Number of array elements (1 for scalars and vectors).
    pub fn len(&self) -> usize {
        self.dims
            .iter()
            .map(|(a, b)| (a - b).unsigned_abs() as usize + 1)
            .product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Storage element for a full set of array indices.
    pub fn element(&self, indices: &[i64]) -> Option<usize> {
        if indices.len() != self.dims.len() {
            return None;
        }
        let mut offset = 0usize;
        for (&i, &(a, b)) in indices.iter().zip(&self.dims) {
            let (lo, hi) = (a.min(b), a.max(b));
            if i < lo || i > hi {
                return None;
            }
            let len = (hi - lo) as usize + 1;
            offset = offset * len + (i - lo) as usize;
        }
        Some(offset)
    }

    /// Storage position of a declared bit index; may fall outside the value.
    pub fn bit_pos(&self, i: i64) -> i64 {
        let (msb, lsb) = self.range;
        if msb >= lsb {
            i.saturating_sub(lsb)
        } else {
            lsb.saturating_sub(i)
        }
    }

    pub fn zero(&self) -> Bits {
        Bits::new(self.width).with_signed(self.signed)
    }
}

#[derive(Debug, Clone)]
pub enum Select {
    Whole,
    /// Single bit at a dynamic declared index.
    Bit(Box<Expr>),
    /// Constant storage positions.
    Part { msb: i64, lsb: i64 },
    /// `[base +: width]`
    Up(Box<Expr>, usize),
    /// `[base -: width]`
    Down(Box<Expr>, usize),
}

#[derive(Debug, Clone)]
pub struct Access {
    pub var: VarId,
    /// Array indices; one per unpacked dimension.
    pub indices: Vec<Expr>,
    pub select: Select,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    /// Self-determined width.
    pub width: usize,
    pub signed: bool,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Const(Bits),
    Load(Access),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Concat(Vec<Expr>),
    Replicate(usize, Box<Expr>),
    Time,
}

impl Expr {
    pub fn constant(value: Bits) -> Self {
        Self {
            width: value.width(),
            signed: value.is_signed(),
            kind: ExprKind::Const(value),
        }
    }

    /// Variables whose value this expression reads.
    pub fn reads(&self, out: &mut Vec<VarId>) {
        match &self.kind {
            ExprKind::Const(_) | ExprKind::Time => {}
            ExprKind::Load(a) => {
                out.push(a.var);
                a.reads(out);
            }
            ExprKind::Unary(_, x) | ExprKind::Replicate(_, x) => x.reads(out),
            ExprKind::Binary(_, a, b) => {
                a.reads(out);
                b.reads(out);
            }
            ExprKind::Ternary(a, b, c) => {
                a.reads(out);
                b.reads(out);
                c.reads(out);
            }
            ExprKind::Concat(es) => es.iter().for_each(|e| e.reads(out)),
        }
    }
}

impl Access {
    /// Variables read while computing where this access points.
    fn reads(&self, out: &mut Vec<VarId>) {
        for i in &self.indices {
            i.reads(out);
        }
        match &self.select {
            Select::Bit(e) | Select::Up(e, _) | Select::Down(e, _) => e.reads(out),
            Select::Whole | Select::Part { .. } => {}
        }
    }
}

#[derive(Debug, Clone)]
pub enum LValue {
    Access(Access),
    Concat(Vec<LValue>),
}

impl LValue {
    /// Variables written through this target.
    pub fn writes(&self, out: &mut Vec<VarId>) {
        match self {
            LValue::Access(a) => out.push(a.var),
            LValue::Concat(parts) => parts.iter().for_each(|p| p.writes(out)),
        }
    }

    /// Variables read while computing the target location.
    pub fn reads(&self, out: &mut Vec<VarId>) {
        match self {
            LValue::Access(a) => a.reads(out),
            LValue::Concat(parts) => parts.iter().for_each(|p| p.reads(out)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Display,
    Write,
    Error,
    Warning,
    Info,
    Fatal,
    Finish,
    Save,
    Restart,
    Retarget,
}

impl TaskKind {
    pub fn from_name(name: &str) -> Option<TaskKind> {
        Some(match name {
            "display" => TaskKind::Display,
            "write" => TaskKind::Write,
            "error" => TaskKind::Error,
            "warning" => TaskKind::Warning,
            "info" => TaskKind::Info,
            "fatal" => TaskKind::Fatal,
            "finish" => TaskKind::Finish,
            "save" => TaskKind::Save,
            "restart" => TaskKind::Restart,
            "retarget" => TaskKind::Retarget,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
pub enum TaskArg {
    Str(String),
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub struct SystemTask {
    pub kind: TaskKind,
    pub args: Vec<TaskArg>,
}

#[derive(Debug, Clone)]
pub struct CaseArm {
    pub labels: Vec<Expr>,
    pub body: Stmt,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Block(Vec<Stmt>),
    Blocking(LValue, Expr),
    Nonblocking(LValue, Expr),
    If(Expr, Box<Stmt>, Option<Box<Stmt>>),
    Case {
        cond: Expr,
        arms: Vec<CaseArm>,
        default: Option<Box<Stmt>>,
    },
    For {
        init: (LValue, Expr),
        cond: Expr,
        step: (LValue, Expr),
        body: Box<Stmt>,
    },
    While(Expr, Box<Stmt>),
    Repeat(Expr, Box<Stmt>),
    Task(SystemTask),
    Null,
}

impl Stmt {
    /// Variables read anywhere in the statement, used for `@*`.
    pub fn reads(&self, out: &mut Vec<VarId>) {
        match self {
            Stmt::Block(ss) => ss.iter().for_each(|s| s.reads(out)),
            Stmt::Blocking(l, e) | Stmt::Nonblocking(l, e) => {
                l.reads(out);
                e.reads(out);
            }
            Stmt::If(c, t, e) => {
                c.reads(out);
                t.reads(out);
                if let Some(e) = e {
                    e.reads(out);
                }
            }
            Stmt::Case {
                cond,
                arms,
                default,
            } => {
                cond.reads(out);
                for arm in arms {
                    arm.labels.iter().for_each(|l| l.reads(out));
                    arm.body.reads(out);
                }
                if let Some(d) = default {
                    d.reads(out);
                }
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                init.1.reads(out);
                cond.reads(out);
                step.1.reads(out);
                body.reads(out);
            }
            Stmt::While(c, b) | Stmt::Repeat(c, b) => {
                c.reads(out);
                b.reads(out);
            }
            Stmt::Task(t) => {
                for arg in &t.args {
                    if let TaskArg::Expr(e) = arg {
                        e.reads(out);
                    }
                }
            }
            Stmt::Null => {}
        }
    }
}

#[derive(Debug, Clone)]
pub enum Trigger {
    /// `@*`: every variable the body reads.
    Star(Vec<VarId>),
    Events(Vec<(Edge, VarId)>),
}

#[derive(Debug, Clone)]
pub enum ProcessKind {
    Assign { lhs: LValue, rhs: Expr },
    Always { trigger: Trigger, body: Stmt },
    Initial { body: Stmt },
}

#[derive(Debug, Clone)]
pub struct Process {
    pub kind: ProcessKind,
    /// Index of the root item this process was elaborated from.
    pub origin: usize,
}

impl Process {
    /// Variables whose change should wake this process.
    pub fn sensitivity(&self) -> Vec<(Edge, VarId)> {
        match &self.kind {
            ProcessKind::Assign { lhs, rhs } => {
                let mut reads = Vec::new();
                rhs.reads(&mut reads);
                lhs.reads(&mut reads);
                reads.sort_unstable();
                reads.dedup();
                reads.into_iter().map(|v| (Edge::Any, v)).collect()
            }
            ProcessKind::Always { trigger, .. } => match trigger {
                Trigger::Star(vars) => vars.iter().map(|v| (Edge::Any, *v)).collect(),
                Trigger::Events(events) => events.clone(),
            },
            ProcessKind::Initial { .. } => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Bits(Bits),
    Flag,
}

#[derive(Debug, Clone)]
pub struct StdPort {
    pub name: String,
    pub dir: Direction,
    pub var: VarId,
}

/// A standard-library component kept out of the flattened logic.
#[derive(Debug, Clone)]
pub struct StdInstance {
    /// Flat instance name such as `clock` or `top.mem`.
    pub name: String,
    /// Component kind from the declaration's `__std` attribute.
    pub kind: String,
    pub params: BTreeMap<String, Bits>,
    pub attrs: BTreeMap<String, AttrValue>,
    pub ports: Vec<StdPort>,
    pub origin: usize,
}

impl StdInstance {
    pub fn param(&self, name: &str) -> Option<u64> {
        self.params.get(name).map(|b| b.to_u64())
    }

    pub fn port(&self, name: &str) -> Option<&StdPort> {
        self.ports.iter().find(|p| p.name == name)
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        match self.attrs.get(name) {
            Some(AttrValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn attr_u64(&self, name: &str) -> Option<u64> {
        match self.attrs.get(name) {
            Some(AttrValue::Bits(b)) => Some(b.to_u64()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Design {
    pub vars: Vec<Var>,
    pub processes: Vec<Process>,
    pub std_instances: Vec<StdInstance>,
    index: HashMap<String, VarId>,
}

impl Design {
    pub fn add_var(&mut self, var: Var) -> VarId {
        let id = self.vars.len();
        self.index.insert(var.name.clone(), id);
        self.vars.push(var);
        id
    }

    pub fn var_id(&self, name: &str) -> Option<VarId> {
        self.index.get(name).copied()
    }

    pub fn var(&self, id: VarId) -> &Var {
        &self.vars[id]
    }

    pub(crate) fn var_mut(&mut self, id: VarId) -> &mut Var {
        &mut self.vars[id]
    }
}
