//! Expression evaluation with Verilog width and sign propagation.
//!
//! An expression is evaluated at a context width and signedness. Operands of
//! arithmetic and bitwise operators and the branches of `?:` inherit the
//! context; comparison operands share their own common width; shift amounts,
//! logical operands, reductions and concatenation parts are self-determined.

use std::cmp::Ordering;

use cascade_core::bits::Bits;

use crate::ir::{Access, BinaryOp, Expr, ExprKind, LValue, Select, UnaryOp, Var, VarId};

/// Variable storage an expression reads from.
pub trait Store {
    fn read(&self, var: VarId, element: usize) -> &Bits;
    fn time(&self) -> u64;
}

/// A store with no variables, for constant expressions.
pub struct NoStore;

impl Store for NoStore {
    fn read(&self, _var: VarId, _element: usize) -> &Bits {
        // Constant expressions never contain loads.
        static ZERO: std::sync::OnceLock<Bits> = std::sync::OnceLock::new();
        ZERO.get_or_init(|| Bits::new(1))
    }

    fn time(&self) -> u64 {
        0
    }
}

/// Where one slice of an assignment lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub var: VarId,
    pub element: usize,
    /// Storage position of the lowest written bit.
    pub lsb: usize,
    pub width: usize,
}

pub struct Evaluator<'a, S: Store + ?Sized> {
    vars: &'a [Var],
    store: &'a S,
}

fn adapt(mut v: Bits, width: usize, signed: bool) -> Bits {
    if !signed {
        v.set_signed(false);
    }
    v.extend(width);
    v.set_signed(signed);
    v
}

fn flag(b: bool, width: usize) -> Bits {
    Bits::from_bool(b).resized(width)
}

/// Bits `start .. start + width` of `value`, reading zero outside it.
fn read_range(value: &Bits, start: i64, width: usize) -> Bits {
    if start >= 0 {
        let start = start as usize;
        return value.slice(start + width - 1, start);
    }
    let mut out = Bits::new(width);
    for k in 0..width {
        let pos = start + k as i64;
        if pos >= 0 && value.get(pos as usize) {
            out.set(k, true);
        }
    }
    out
}

impl<'a, S: Store + ?Sized> Evaluator<'a, S> {
    pub fn new(vars: &'a [Var], store: &'a S) -> Self {
        Self { vars, store }
    }

    /// Evaluate at the expression's own width and sign.
    pub fn eval(&self, e: &Expr) -> Bits {
        self.eval_ctx(e, e.width, e.signed)
    }

    /// Evaluate for assignment to a target of `width` bits.
    pub fn eval_for(&self, e: &Expr, width: usize) -> Bits {
        self.eval_ctx(e, e.width.max(width), e.signed).resized(width)
    }

    pub fn eval_ctx(&self, e: &Expr, width: usize, signed: bool) -> Bits {
        let width = width.max(e.width);
        match &e.kind {
            ExprKind::Const(b) => adapt(b.clone(), width, signed),
            ExprKind::Time => adapt(Bits::from_u64(64, self.store.time()), width, signed),
            ExprKind::Load(a) => adapt(self.load(a), width, signed),
            ExprKind::Unary(op, x) => match op {
                UnaryOp::Plus => self.eval_ctx(x, width, signed),
                UnaryOp::Minus => self.eval_ctx(x, width, signed).neg(),
                UnaryOp::BitNot => self.eval_ctx(x, width, signed).not(),
                UnaryOp::Not => flag(!self.eval(x).to_bool(), width),
                UnaryOp::RedAnd => flag(self.eval(x).reduce_and(), width),
                UnaryOp::RedNand => flag(!self.eval(x).reduce_and(), width),
                UnaryOp::RedOr => flag(self.eval(x).reduce_or(), width),
                UnaryOp::RedNor => flag(!self.eval(x).reduce_or(), width),
                UnaryOp::RedXor => flag(self.eval(x).reduce_xor(), width),
                UnaryOp::RedXnor => flag(!self.eval(x).reduce_xor(), width),
            },
            ExprKind::Binary(op, a, b) => self.binary(*op, a, b, width, signed),
            ExprKind::Ternary(c, t, f) => {
                if self.eval(c).to_bool() {
                    self.eval_ctx(t, width, signed)
                } else {
                    self.eval_ctx(f, width, signed)
                }
            }
            ExprKind::Concat(parts) => {
                let mut iter = parts.iter();
                let mut acc = match iter.next() {
                    Some(first) => self.eval(first).with_signed(false),
                    None => Bits::new(1),
                };
                for p in iter {
                    acc = acc.concat(&self.eval(p));
                }
                adapt(acc, width, signed)
            }
            ExprKind::Replicate(n, x) => {
                let v = self.eval(x).with_signed(false);
                let mut acc = v.clone();
                for _ in 1..*n {
                    acc = acc.concat(&v);
                }
                adapt(acc, width, signed)
            }
        }
    }

    fn binary(&self, op: BinaryOp, a: &Expr, b: &Expr, width: usize, signed: bool) -> Bits {
        match op {
            BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Mod
            | BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor
            | BinaryOp::BitXnor => {
                let l = self.eval_ctx(a, width, signed);
                let r = self.eval_ctx(b, width, signed);
                match op {
                    BinaryOp::Add => l.add(&r),
                    BinaryOp::Sub => l.sub(&r),
                    BinaryOp::Mul => l.mul(&r),
                    BinaryOp::Div => l.div(&r),
                    BinaryOp::Mod => l.rem(&r),
                    BinaryOp::BitAnd => l.and(&r),
                    BinaryOp::BitOr => l.or(&r),
                    BinaryOp::BitXor => l.xor(&r),
                    _ => l.xnor(&r),
                }
            }
            BinaryOp::Pow => {
                let l = self.eval_ctx(a, width, signed);
                l.pow(&self.eval(b))
            }
            BinaryOp::Shl | BinaryOp::AShl => {
                let n = self.eval(b).with_signed(false).to_usize();
                self.eval_ctx(a, width, signed).shl(n)
            }
            BinaryOp::Shr => {
                let n = self.eval(b).with_signed(false).to_usize();
                self.eval_ctx(a, width, signed).lshr(n)
            }
            BinaryOp::AShr => {
                let n = self.eval(b).with_signed(false).to_usize();
                let l = self.eval_ctx(a, width, signed);
                if signed {
                    l.ashr(n)
                } else {
                    l.lshr(n)
                }
            }
            BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge
            | BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::CaseEq
            | BinaryOp::CaseNe => {
                let ow = a.width.max(b.width);
                let os = a.signed && b.signed;
                let l = self.eval_ctx(a, ow, os);
                let r = self.eval_ctx(b, ow, os);
                let ord = if os { l.compare(&r) } else { l.ucmp(&r) };
                let res = match op {
                    BinaryOp::Lt => ord == Ordering::Less,
                    BinaryOp::Le => ord != Ordering::Greater,
                    BinaryOp::Gt => ord == Ordering::Greater,
                    BinaryOp::Ge => ord != Ordering::Less,
                    BinaryOp::Eq | BinaryOp::CaseEq => ord == Ordering::Equal,
                    _ => ord != Ordering::Equal,
                };
                flag(res, width)
            }
            BinaryOp::LogAnd => flag(self.eval(a).to_bool() && self.eval(b).to_bool(), width),
            BinaryOp::LogOr => flag(self.eval(a).to_bool() || self.eval(b).to_bool(), width),
        }
    }

    fn index(&self, e: &Expr) -> i64 {
        let v = self.eval(e);
        if v.is_signed() {
            v.to_i64()
        } else {
            i64::try_from(v.to_usize()).unwrap_or(i64::MAX)
        }
    }

    fn element(&self, a: &Access) -> Option<usize> {
        let var = &self.vars[a.var];
        if a.indices.is_empty() {
            return Some(0);
        }
        let idx: Vec<i64> = a.indices.iter().map(|i| self.index(i)).collect();
        var.element(&idx)
    }

    /// Storage position of the lowest selected bit and the selection width.
    fn selection(&self, var: &Var, select: &Select) -> (i64, usize) {
        match select {
            Select::Whole => (0, var.width),
            Select::Bit(e) => (var.bit_pos(self.index(e)), 1),
            Select::Part { msb, lsb } => ((*msb).min(*lsb), (msb - lsb).unsigned_abs() as usize + 1),
            Select::Up(base, w) => {
                let b = self.index(base);
                let p = var.bit_pos(b).min(var.bit_pos(b.saturating_add(*w as i64 - 1)));
                (p, *w)
            }
            Select::Down(base, w) => {
                let b = self.index(base);
                let p = var.bit_pos(b).min(var.bit_pos(b.saturating_sub(*w as i64 - 1)));
                (p, *w)
            }
        }
    }

    fn load(&self, a: &Access) -> Bits {
        let var = &self.vars[a.var];
        let Some(elem) = self.element(a) else {
            return match a.select {
                Select::Whole => var.zero(),
                _ => Bits::new(access_width(var, &a.select)),
            };
        };
        let value = self.store.read(a.var, elem);
        match &a.select {
            Select::Whole => value.clone(),
            select => {
                let (start, width) = self.selection(var, select);
                read_range(value, start, width)
            }
        }
    }

    /// Resolve an assignment target into slices, most significant first.
    /// Slices that fall outside their variable resolve to `None`.
    pub fn targets(&self, lv: &LValue) -> Vec<(Option<Target>, usize)> {
        let mut out = Vec::new();
        self.collect_targets(lv, &mut out);
        out
    }

    fn collect_targets(&self, lv: &LValue, out: &mut Vec<(Option<Target>, usize)>) {
        match lv {
            LValue::Concat(parts) => {
                for p in parts {
                    self.collect_targets(p, out);
                }
            }
            LValue::Access(a) => {
                let var = &self.vars[a.var];
                let width = access_width(var, &a.select);
                let target = self.element(a).and_then(|element| {
                    let (start, w) = self.selection(var, &a.select);
                    (start >= 0 && (start as usize) < var.width).then(|| Target {
                        var: a.var,
                        element,
                        lsb: start as usize,
                        width: w,
                    })
                });
                out.push((target, width));
            }
        }
    }
}

/// Width selected by an access.
pub fn access_width(var: &Var, select: &Select) -> usize {
    match select {
        Select::Whole => var.width,
        Select::Bit(_) => 1,
        Select::Part { msb, lsb } => (msb - lsb).unsigned_abs() as usize + 1,
        Select::Up(_, w) | Select::Down(_, w) => *w,
    }
}

/// Total width of an assignment target.
pub fn lvalue_width(vars: &[Var], lv: &LValue) -> usize {
    match lv {
        LValue::Access(a) => access_width(&vars[a.var], &a.select),
        LValue::Concat(parts) => parts.iter().map(|p| lvalue_width(vars, p)).sum(),
    }
}

/// Split `value` across targets listed most significant first.
pub fn split(value: &Bits, targets: Vec<(Option<Target>, usize)>) -> Vec<(Target, Bits)> {
    let total: usize = targets.iter().map(|(_, w)| *w).sum();
    let mut offset = total;
    let mut out = Vec::with_capacity(targets.len());
    for (target, width) in targets {
        offset -= width;
        if let Some(t) = target {
            out.push((t, value.slice(offset + width - 1, offset)));
        }
    }
    out
}

/// Evaluate a constant expression.
pub fn const_eval(e: &Expr) -> Bits {
    Evaluator::new(&[], &NoStore).eval(e)
}
