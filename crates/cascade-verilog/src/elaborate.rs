//! Flatten a [`Program`] into a [`Design`].
//!
//! User module instances are inlined with a `<instance path>.` prefix and
//! their port connections become continuous assignments. Instances of
//! standard-library declarations stay opaque: their ports become variables
//! marked with `std_port` and the instance is listed in
//! [`Design::std_instances`].

use std::collections::{BTreeMap, HashMap};

use cascade_core::bits::Bits;
use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

use crate::ast::{self, Connection, Direction, ExprKind as AstExpr, ModuleDecl, ModuleItem, NetKind};
use crate::eval::const_eval;
use crate::ir::{
    Access, AttrValue, BinaryOp, CaseArm, Design, Expr, ExprKind, LValue, Process, ProcessKind,
    Select, StdInstance, StdPort, Stmt, SystemTask, TaskArg, TaskKind, Trigger, UnaryOp, Var,
    VarKind,
};
use crate::program::Program;
use crate::source::Span;

#[derive(Debug, Clone, Error, Diagnostic)]
pub enum ElabError {
    #[error("undeclared identifier `{name}`")]
    #[diagnostic(code(cascade::elaborate::unresolved))]
    Unresolved { name: String, span: Span },
    #[error("expression is not constant")]
    #[diagnostic(code(cascade::elaborate::not_constant))]
    NotConstant { span: Span },
    #[error("undeclared module `{name}`")]
    #[diagnostic(code(cascade::elaborate::unknown_module))]
    UnknownModule { name: String, span: Span },
    #[error("{message}")]
    #[diagnostic(code(cascade::elaborate))]
    Invalid { message: String, span: Span },
}

impl ElabError {
    pub fn span(&self) -> Span {
        match self {
            ElabError::Unresolved { span, .. }
            | ElabError::NotConstant { span }
            | ElabError::UnknownModule { span, .. }
            | ElabError::Invalid { span, .. } => *span,
        }
    }

    fn invalid(span: Span, message: impl Into<String>) -> Self {
        ElabError::Invalid {
            message: message.into(),
            span,
        }
    }
}

type Result<T> = std::result::Result<T, ElabError>;

/// Flatten every root item of `program`.
pub fn elaborate(program: &Program) -> Result<Design> {
    let mut el = Elaborator {
        program,
        design: Design::default(),
    };
    let mut frame = Frame {
        prefix: String::new(),
        params: HashMap::new(),
    };
    let items: Vec<(usize, &ModuleItem)> = program.root_items().iter().enumerate().collect();
    el.items(&mut frame, &items)?;
    debug!(
        vars = el.design.vars.len(),
        processes = el.design.processes.len(),
        std = el.design.std_instances.len(),
        "elaborated design"
    );
    Ok(el.design)
}

struct Frame {
    /// `""` at the root, `"a.b."` inside instance `a.b`.
    prefix: String,
    params: HashMap<String, Bits>,
}

struct Elaborator<'p> {
    program: &'p Program,
    design: Design,
}

fn range_bounds(msb: &Bits, lsb: &Bits) -> (i64, i64) {
    (msb.to_i64(), lsb.to_i64())
}

/// Most bits a single variable may store across all of its array elements.
const MAX_STORAGE_BITS: u64 = 1 << 28;

fn range_width(msb: i64, lsb: i64, span: Span) -> Result<usize> {
    let width = msb.abs_diff(lsb).saturating_add(1);
    if width > Bits::MAX_WIDTH as u64 {
        return Err(ElabError::invalid(
            span,
            format!("width {width} exceeds the limit of {} bits", Bits::MAX_WIDTH),
        ));
    }
    Ok(width as usize)
}

fn is_const(e: &Expr) -> bool {
    match &e.kind {
        ExprKind::Const(_) => true,
        ExprKind::Load(_) | ExprKind::Time => false,
        ExprKind::Unary(_, x) | ExprKind::Replicate(_, x) => is_const(x),
        ExprKind::Binary(_, a, b) => is_const(a) && is_const(b),
        ExprKind::Ternary(a, b, c) => is_const(a) && is_const(b) && is_const(c),
        ExprKind::Concat(es) => es.iter().all(is_const),
    }
}

fn string_bits(s: &str) -> Bits {
    let bytes = s.as_bytes();
    let mut v = Bits::new((bytes.len() * 8).max(8));
    for (i, b) in bytes.iter().rev().enumerate() {
        for k in 0..8 {
            if b & (1 << k) != 0 {
                v.set(i * 8 + k, true);
            }
        }
    }
    v
}

impl<'p> Elaborator<'p> {
    /// Elaborate a list of items in one scope, tagged with their origin.
    fn items(&mut self, frame: &mut Frame, items: &[(usize, &ModuleItem)]) -> Result<()> {
        for (_, item) in items {
            if let ModuleItem::Param(p) = item {
                self.param_decl(frame, p, None)?;
            }
        }
        for (_, item) in items {
            match item {
                ModuleItem::Port(p) => self.port_decl(frame, p)?,
                ModuleItem::Decl(d) => self.declaration(frame, d)?,
                _ => {}
            }
        }
        for (origin, item) in items {
            if let ModuleItem::Instantiation(inst) = item {
                self.instantiation(frame, inst, *origin)?;
            }
        }
        for (origin, item) in items {
            self.processes(frame, item, *origin)?;
        }
        Ok(())
    }

    fn const_value(&self, frame: &Frame, e: &ast::Expr) -> Result<Bits> {
        let lowered = self.expr(frame, e)?;
        if !is_const(&lowered) {
            return Err(ElabError::NotConstant { span: e.span });
        }
        Ok(const_eval(&lowered))
    }

    fn const_int(&self, frame: &Frame, e: &ast::Expr) -> Result<i64> {
        Ok(self.const_value(frame, e)?.to_i64())
    }

    fn param_decl(
        &self,
        frame: &mut Frame,
        p: &ast::ParamDecl,
        overrides: Option<&HashMap<String, Bits>>,
    ) -> Result<()> {
        for (name, default) in &p.assigns {
            let overridden = if p.local {
                None
            } else {
                overrides.and_then(|o| o.get(&name.name)).cloned()
            };
            let mut value = match overridden {
                Some(v) => v,
                None => self.const_value(frame, default)?,
            };
            if let Some(r) = &p.range {
                let (msb, lsb) = (self.const_int(frame, &r.msb)?, self.const_int(frame, &r.lsb)?);
                let width = range_width(msb, lsb, r.msb.span.to(r.lsb.span))?;
                value = value.resized(width).with_signed(p.signed);
            } else if p.signed {
                value.set_signed(true);
            }
            frame.params.insert(name.name.clone(), value);
        }
        Ok(())
    }

    fn shape(&self, frame: &Frame, range: &Option<ast::Range>) -> Result<(usize, (i64, i64))> {
        match range {
            None => Ok((1, (0, 0))),
            Some(r) => {
                let msb = self.const_value(frame, &r.msb)?;
                let lsb = self.const_value(frame, &r.lsb)?;
                let (m, l) = range_bounds(&msb, &lsb);
                Ok((range_width(m, l, r.msb.span.to(r.lsb.span))?, (m, l)))
            }
        }
    }

    fn port_decl(&mut self, frame: &Frame, p: &ast::PortDecl) -> Result<()> {
        let (width, range) = match p.kind {
            Some(NetKind::Integer) => (32, (31, 0)),
            _ => self.shape(frame, &p.range)?,
        };
        let kind = if p.is_reg() {
            VarKind::Variable
        } else {
            VarKind::Net
        };
        for name in &p.names {
            let full = format!("{}{}", frame.prefix, name.name);
            if let Some(id) = self.design.var_id(&full) {
                let var = self.design.var_mut(id);
                var.kind = kind;
                continue;
            }
            self.design.add_var(Var {
                name: full,
                width,
                signed: p.signed || p.kind == Some(NetKind::Integer),
                range,
                dims: Vec::new(),
                kind,
                std_port: None,
            });
        }
        Ok(())
    }

    fn declaration(&mut self, frame: &Frame, d: &ast::Declaration) -> Result<()> {
        let (width, range) = if d.kind == NetKind::Integer {
            (32, (31, 0))
        } else {
            self.shape(frame, &d.range)?
        };
        let kind = match d.kind {
            NetKind::Wire => VarKind::Net,
            NetKind::Reg | NetKind::Integer => VarKind::Variable,
        };
        for v in &d.vars {
            let full = format!("{}{}", frame.prefix, v.name.name);
            let mut dims = Vec::with_capacity(v.dims.len());
            let mut bits = width as u64;
            for dim in &v.dims {
                let (m, l) = (self.const_int(frame, &dim.msb)?, self.const_int(frame, &dim.lsb)?);
                bits = bits.saturating_mul(m.abs_diff(l).saturating_add(1));
                dims.push((m, l));
            }
            if bits > MAX_STORAGE_BITS {
                return Err(ElabError::invalid(
                    v.name.span,
                    format!("`{}` needs more than {MAX_STORAGE_BITS} bits of storage", v.name.name),
                ));
            }
            // `output q; reg [3:0] q;` refines the port variable.
            if let Some(id) = self.design.var_id(&full) {
                let var = self.design.var_mut(id);
                var.kind = kind;
                if d.range.is_some() || d.kind == NetKind::Integer {
                    var.width = width;
                    var.range = range;
                }
                var.signed |= d.signed || d.kind == NetKind::Integer;
                var.dims = dims;
                continue;
            }
            self.design.add_var(Var {
                name: full,
                width,
                signed: d.signed || d.kind == NetKind::Integer,
                range,
                dims,
                kind,
                std_port: None,
            });
        }
        Ok(())
    }

    fn attrs(&self, frame: &Frame, attrs: &ast::Attributes) -> Result<BTreeMap<String, AttrValue>> {
        let mut out = BTreeMap::new();
        for (key, value) in &attrs.entries {
            let v = match value {
                None => AttrValue::Flag,
                Some(ast::Expr {
                    kind: AstExpr::Str(s),
                    ..
                }) => AttrValue::Str(s.clone()),
                Some(e) => AttrValue::Bits(self.const_value(frame, e)?),
            };
            out.insert(key.name.clone(), v);
        }
        Ok(out)
    }

    fn overrides(
        &self,
        frame: &Frame,
        decl: &ModuleDecl,
        conns: &[Connection],
    ) -> Result<HashMap<String, Bits>> {
        let positional = decl.overridable_params();
        let mut out = HashMap::new();
        let mut ordered = 0;
        for c in conns {
            match c {
                Connection::Named(name, Some(e)) => {
                    out.insert(name.name.clone(), self.const_value(frame, e)?);
                }
                Connection::Named(_, None) => {}
                Connection::Ordered(e) => {
                    let Some(name) = positional.get(ordered) else {
                        return Err(ElabError::invalid(e.span, "too many parameter overrides"));
                    };
                    out.insert(name.name.clone(), self.const_value(frame, e)?);
                    ordered += 1;
                }
            }
        }
        Ok(out)
    }

    fn instantiation(&mut self, frame: &Frame, inst: &ast::Instantiation, origin: usize) -> Result<()> {
        let program = self.program;
        let Some(decl) = program.module(&inst.module.name) else {
            return Err(ElabError::UnknownModule {
                name: inst.module.name.clone(),
                span: inst.module.span,
            });
        };
        let overrides = self.overrides(frame, decl, &inst.params)?;

        for instance in &inst.instances {
            let prefix = format!("{}{}.", frame.prefix, instance.name.name);
            let mut child = Frame {
                prefix,
                params: HashMap::new(),
            };
            for p in &decl.params {
                self.param_decl(&mut child, p, Some(&overrides))?;
            }

            match decl.std_kind() {
                Some(kind) => self.std_instance(frame, &child, decl, kind, inst, instance, origin)?,
                None => {
                    if let ast::PortList::Ansi(ports) = &decl.ports {
                        for p in ports {
                            self.port_decl(&child, p)?;
                        }
                    }
                    let items: Vec<(usize, &ModuleItem)> =
                        decl.items.iter().map(|i| (origin, i)).collect();
                    self.module_body(&mut child, &items, &overrides)?;
                }
            }

            self.connect(frame, &child, decl, instance, origin)?;
        }
        Ok(())
    }

    /// Like [`Self::items`], but body parameters may be overridden.
    fn module_body(
        &mut self,
        frame: &mut Frame,
        items: &[(usize, &ModuleItem)],
        overrides: &HashMap<String, Bits>,
    ) -> Result<()> {
        for (_, item) in items {
            if let ModuleItem::Param(p) = item {
                self.param_decl(frame, p, Some(overrides))?;
            }
        }
        let rest: Vec<(usize, &ModuleItem)> = items
            .iter()
            .filter(|(_, i)| !matches!(i, ModuleItem::Param(_)))
            .copied()
            .collect();
        self.items(frame, &rest)
    }

    #[allow(clippy::too_many_arguments)]
    fn std_instance(
        &mut self,
        parent: &Frame,
        child: &Frame,
        decl: &ModuleDecl,
        kind: &str,
        inst: &ast::Instantiation,
        instance: &ast::Instance,
        origin: usize,
    ) -> Result<()> {
        let mut ports = Vec::new();
        for p in decl.port_decls() {
            let (width, range) = self.shape(child, &p.range)?;
            for name in &p.names {
                let var = self.design.add_var(Var {
                    name: format!("{}{}", child.prefix, name.name),
                    width,
                    signed: p.signed,
                    range,
                    dims: Vec::new(),
                    kind: VarKind::Net,
                    std_port: Some(p.dir),
                });
                ports.push(StdPort {
                    name: name.name.clone(),
                    dir: p.dir,
                    var,
                });
            }
        }
        let params = child
            .params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.design.std_instances.push(StdInstance {
            name: child.prefix.trim_end_matches('.').to_string(),
            kind: kind.to_string(),
            params,
            attrs: self.attrs(parent, &inst.attrs)?,
            ports,
            origin,
        });
        debug!(instance = %instance.name.name, kind, "standard component");
        Ok(())
    }

    /// Port connections become continuous assignments in the parent scope.
    fn connect(
        &mut self,
        parent: &Frame,
        child: &Frame,
        decl: &ModuleDecl,
        instance: &ast::Instance,
        origin: usize,
    ) -> Result<()> {
        let names = decl.port_names();
        let mut ordered = 0;
        for c in &instance.ports {
            let (port, expr) = match c {
                Connection::Named(n, Some(e)) => (n.name.as_str(), e),
                Connection::Named(_, None) => continue,
                Connection::Ordered(e) => {
                    let Some(p) = names.get(ordered) else {
                        return Err(ElabError::invalid(e.span, "too many port connections"));
                    };
                    ordered += 1;
                    (*p, e)
                }
            };
            let full = format!("{}{}", child.prefix, port);
            let Some(var) = self.design.var_id(&full) else {
                return Err(ElabError::Unresolved {
                    name: full,
                    span: expr.span,
                });
            };
            let port_expr = self.load_whole(var);
            let port_lv = LValue::Access(Access {
                var,
                indices: Vec::new(),
                select: Select::Whole,
            });
            let kind = match decl.port_dir(port) {
                Some(Direction::Output) => {
                    let lhs = self.lvalue(parent, expr).map_err(|_| {
                        ElabError::invalid(expr.span, format!("output port `{port}` must connect to a net"))
                    })?;
                    ProcessKind::Assign { lhs, rhs: port_expr }
                }
                _ => ProcessKind::Assign {
                    lhs: port_lv,
                    rhs: self.expr(parent, expr)?,
                },
            };
            self.design.processes.push(Process { kind, origin });
        }
        Ok(())
    }

    fn load_whole(&self, var: usize) -> Expr {
        let v = self.design.var(var);
        Expr {
            width: v.width,
            signed: v.signed,
            kind: ExprKind::Load(Access {
                var,
                indices: Vec::new(),
                select: Select::Whole,
            }),
        }
    }

    fn processes(&mut self, frame: &Frame, item: &ModuleItem, origin: usize) -> Result<()> {
        match item {
            ModuleItem::Decl(d) => {
                for v in d.vars.iter() {
                    let Some(init) = &v.init else { continue };
                    let Some(var) = self.design.var_id(&format!("{}{}", frame.prefix, v.name.name)) else {
                        continue;
                    };
                    let lhs = LValue::Access(Access {
                        var,
                        indices: Vec::new(),
                        select: Select::Whole,
                    });
                    let rhs = self.expr(frame, init)?;
                    let kind = if d.kind == NetKind::Wire {
                        ProcessKind::Assign { lhs, rhs }
                    } else {
                        ProcessKind::Initial {
                            body: Stmt::Blocking(lhs, rhs),
                        }
                    };
                    self.design.processes.push(Process { kind, origin });
                }
            }
            ModuleItem::ContinuousAssign(assigns, _) => {
                for a in assigns {
                    let lhs = self.lvalue(frame, &a.lhs)?;
                    let rhs = self.expr(frame, &a.rhs)?;
                    self.design.processes.push(Process {
                        kind: ProcessKind::Assign { lhs, rhs },
                        origin,
                    });
                }
            }
            ModuleItem::Always(a) => {
                let body = self.statement(frame, &a.body)?;
                let trigger = match &a.event {
                    None => {
                        return Err(ElabError::invalid(
                            a.span,
                            "always blocks without an event control are not supported",
                        ))
                    }
                    Some(ast::EventControl::Star) => {
                        let mut reads = Vec::new();
                        body.reads(&mut reads);
                        reads.sort_unstable();
                        reads.dedup();
                        Trigger::Star(reads)
                    }
                    Some(ast::EventControl::Events(events)) => {
                        let mut out = Vec::with_capacity(events.len());
                        for ev in events {
                            let lowered = self.expr(frame, &ev.expr)?;
                            let ExprKind::Load(Access { var, .. }) = lowered.kind else {
                                return Err(ElabError::invalid(
                                    ev.expr.span,
                                    "event expressions must name a variable",
                                ));
                            };
                            out.push((ev.edge, var));
                        }
                        Trigger::Events(out)
                    }
                };
                self.design.processes.push(Process {
                    kind: ProcessKind::Always { trigger, body },
                    origin,
                });
            }
            ModuleItem::Initial(body, _) => {
                let body = self.statement(frame, body)?;
                self.design.processes.push(Process {
                    kind: ProcessKind::Initial { body },
                    origin,
                });
            }
            ModuleItem::Param(_) | ModuleItem::Port(_) | ModuleItem::Instantiation(_) => {}
        }
        Ok(())
    }

    fn statement(&self, frame: &Frame, s: &ast::Statement) -> Result<Stmt> {
        use ast::StatementKind as S;
        Ok(match &s.kind {
            S::Block { stmts, .. } => Stmt::Block(
                stmts
                    .iter()
                    .map(|x| self.statement(frame, x))
                    .collect::<Result<_>>()?,
            ),
            S::Blocking(a) => Stmt::Blocking(self.lvalue(frame, &a.lhs)?, self.expr(frame, &a.rhs)?),
            S::Nonblocking(a) => {
                Stmt::Nonblocking(self.lvalue(frame, &a.lhs)?, self.expr(frame, &a.rhs)?)
            }
            S::If {
                cond,
                then,
                otherwise,
            } => Stmt::If(
                self.expr(frame, cond)?,
                Box::new(self.statement(frame, then)?),
                match otherwise {
                    Some(o) => Some(Box::new(self.statement(frame, o)?)),
                    None => None,
                },
            ),
            S::Case { cond, items, .. } => {
                let mut arms = Vec::new();
                let mut default = None;
                for item in items {
                    let body = self.statement(frame, &item.body)?;
                    if item.exprs.is_empty() {
                        default.get_or_insert(Box::new(body));
                    } else {
                        let labels = item
                            .exprs
                            .iter()
                            .map(|e| self.expr(frame, e))
                            .collect::<Result<_>>()?;
                        arms.push(CaseArm { labels, body });
                    }
                }
                Stmt::Case {
                    cond: self.expr(frame, cond)?,
                    arms,
                    default,
                }
            }
            S::For {
                init,
                cond,
                step,
                body,
            } => Stmt::For {
                init: (self.lvalue(frame, &init.lhs)?, self.expr(frame, &init.rhs)?),
                cond: self.expr(frame, cond)?,
                step: (self.lvalue(frame, &step.lhs)?, self.expr(frame, &step.rhs)?),
                body: Box::new(self.statement(frame, body)?),
            },
            S::While { cond, body } => Stmt::While(
                self.expr(frame, cond)?,
                Box::new(self.statement(frame, body)?),
            ),
            S::Repeat { count, body } => Stmt::Repeat(
                self.expr(frame, count)?,
                Box::new(self.statement(frame, body)?),
            ),
            S::SystemTask { name, args } => {
                let Some(kind) = TaskKind::from_name(&name.name) else {
                    return Err(ElabError::invalid(
                        name.span,
                        format!("unknown system task `${}`", name.name),
                    ));
                };
                let mut lowered = Vec::with_capacity(args.len());
                for a in args {
                    lowered.push(match &a.kind {
                        AstExpr::Str(s) => TaskArg::Str(s.clone()),
                        _ => TaskArg::Expr(self.expr(frame, a)?),
                    });
                }
                Stmt::Task(SystemTask {
                    kind,
                    args: lowered,
                })
            }
            S::Null => Stmt::Null,
        })
    }

    fn lvalue(&self, frame: &Frame, e: &ast::Expr) -> Result<LValue> {
        match &e.kind {
            AstExpr::Ident(r) => match self.reference(frame, r, e.span)? {
                Expr {
                    kind: ExprKind::Load(a),
                    ..
                } => Ok(LValue::Access(a)),
                _ => Err(ElabError::invalid(e.span, format!("cannot assign to `{}`", r.path()))),
            },
            AstExpr::Concat(parts) => Ok(LValue::Concat(
                parts
                    .iter()
                    .map(|p| self.lvalue(frame, p))
                    .collect::<Result<_>>()?,
            )),
            _ => Err(ElabError::invalid(e.span, "invalid assignment target")),
        }
    }

    fn reference(&self, frame: &Frame, r: &ast::IdentRef, span: Span) -> Result<Expr> {
        if r.is_simple() {
            if let Some(value) = frame.params.get(&r.parts[0].name) {
                return self.param_select(frame, value, r, span);
            }
        }
        let name = format!("{}{}", frame.prefix, r.path());
        let Some(id) = self.design.var_id(&name) else {
            return Err(ElabError::Unresolved {
                name: r.path(),
                span,
            });
        };
        let var = self.design.var(id);
        let dims = var.dims.len();
        if r.indices.len() < dims {
            return Err(ElabError::invalid(
                span,
                format!("array `{}` must be indexed", r.path()),
            ));
        }
        if r.indices.len() > dims + 1 || (r.indices.len() == dims + 1 && r.range.is_some()) {
            return Err(ElabError::invalid(span, format!("too many selects on `{}`", r.path())));
        }

        let indices = r.indices[..dims]
            .iter()
            .map(|i| self.expr(frame, i))
            .collect::<Result<Vec<_>>>()?;
        let select = if r.indices.len() == dims + 1 {
            Select::Bit(Box::new(self.expr(frame, &r.indices[dims])?))
        } else {
            match &r.range {
                None => Select::Whole,
                Some(ast::RangeSelect::Part(m, l)) => {
                    let span = m.span.to(l.span);
                    let (m, l) = (self.const_int(frame, m)?, self.const_int(frame, l)?);
                    range_width(m, l, span)?;
                    Select::Part {
                        msb: var.bit_pos(m),
                        lsb: var.bit_pos(l),
                    }
                }
                Some(ast::RangeSelect::Up(b, w)) => {
                    Select::Up(Box::new(self.expr(frame, b)?), self.select_width(frame, w)?)
                }
                Some(ast::RangeSelect::Down(b, w)) => {
                    Select::Down(Box::new(self.expr(frame, b)?), self.select_width(frame, w)?)
                }
            }
        };
        let (width, signed) = match &select {
            Select::Whole => (var.width, var.signed),
            s => (crate::eval::access_width(var, s), false),
        };
        Ok(Expr {
            kind: ExprKind::Load(Access {
                var: id,
                indices,
                select,
            }),
            width,
            signed,
        })
    }

    fn select_width(&self, frame: &Frame, e: &ast::Expr) -> Result<usize> {
        let w = self.const_int(frame, e)?;
        if w <= 0 {
            return Err(ElabError::invalid(e.span, "select width must be positive"));
        }
        if w as u64 > Bits::MAX_WIDTH as u64 {
            return Err(ElabError::invalid(
                e.span,
                format!("select width exceeds {} bits", Bits::MAX_WIDTH),
            ));
        }
        Ok(w as usize)
    }

    fn param_select(&self, frame: &Frame, value: &Bits, r: &ast::IdentRef, span: Span) -> Result<Expr> {
        if r.indices.len() > 1 {
            return Err(ElabError::invalid(span, "parameters cannot be indexed as arrays"));
        }
        if let Some(i) = r.indices.first() {
            let pos = self.const_int(frame, i)?;
            let bit = pos >= 0 && value.get(pos as usize);
            return Ok(Expr::constant(Bits::from_bool(bit)));
        }
        match &r.range {
            None => Ok(Expr::constant(value.clone())),
            Some(ast::RangeSelect::Part(m, l)) => {
                let span = m.span.to(l.span);
                let (m, l) = (self.const_int(frame, m)?, self.const_int(frame, l)?);
                range_width(m, l, span)?;
                let (hi, lo) = (m.max(l).max(0) as usize, m.min(l).max(0) as usize);
                Ok(Expr::constant(value.slice(hi, lo)))
            }
            Some(_) => Err(ElabError::invalid(
                span,
                "indexed part selects of parameters are not supported",
            )),
        }
    }

    fn expr(&self, frame: &Frame, e: &ast::Expr) -> Result<Expr> {
        Ok(match &e.kind {
            AstExpr::Number(n) => Expr::constant(n.bits()),
            AstExpr::Str(s) => Expr::constant(string_bits(s)),
            AstExpr::Ident(r) => self.reference(frame, r, e.span)?,
            AstExpr::Paren(x) => self.expr(frame, x)?,
            AstExpr::SystemCall(name) => {
                if name.name != "time" {
                    return Err(ElabError::invalid(
                        name.span,
                        format!("unknown system function `${}`", name.name),
                    ));
                }
                Expr {
                    kind: ExprKind::Time,
                    width: 64,
                    signed: false,
                }
            }
            AstExpr::Unary(op, x) => {
                let x = self.expr(frame, x)?;
                let (width, signed) = match op {
                    UnaryOp::Plus | UnaryOp::Minus | UnaryOp::BitNot => (x.width, x.signed),
                    _ => (1, false),
                };
                Expr {
                    kind: ExprKind::Unary(*op, Box::new(x)),
                    width,
                    signed,
                }
            }
            AstExpr::Binary(op, a, b) => {
                let a = self.expr(frame, a)?;
                let b = self.expr(frame, b)?;
                let (width, signed) = match op {
                    BinaryOp::Add
                    | BinaryOp::Sub
                    | BinaryOp::Mul
                    | BinaryOp::Div
                    | BinaryOp::Mod
                    | BinaryOp::BitAnd
                    | BinaryOp::BitOr
                    | BinaryOp::BitXor
                    | BinaryOp::BitXnor => (a.width.max(b.width), a.signed && b.signed),
                    BinaryOp::Pow
                    | BinaryOp::Shl
                    | BinaryOp::Shr
                    | BinaryOp::AShl
                    | BinaryOp::AShr => (a.width, a.signed),
                    _ => (1, false),
                };
                Expr {
                    kind: ExprKind::Binary(*op, Box::new(a), Box::new(b)),
                    width,
                    signed,
                }
            }
            AstExpr::Ternary(c, t, f) => {
                let c = self.expr(frame, c)?;
                let t = self.expr(frame, t)?;
                let f = self.expr(frame, f)?;
                Expr {
                    width: t.width.max(f.width),
                    signed: t.signed && f.signed,
                    kind: ExprKind::Ternary(Box::new(c), Box::new(t), Box::new(f)),
                }
            }
            AstExpr::Concat(parts) => {
                let parts = parts
                    .iter()
                    .map(|p| self.expr(frame, p))
                    .collect::<Result<Vec<_>>>()?;
                Expr {
                    width: parts.iter().map(|p| p.width).sum(),
                    signed: false,
                    kind: ExprKind::Concat(parts),
                }
            }
            AstExpr::Replicate(n, parts) => {
                let count = self.const_int(frame, n)?;
                if count <= 0 {
                    return Err(ElabError::invalid(n.span, "replication count must be positive"));
                }
                let mut parts = parts
                    .iter()
                    .map(|p| self.expr(frame, p))
                    .collect::<Result<Vec<_>>>()?;
                let inner = if parts.len() == 1 {
                    parts.remove(0)
                } else {
                    Expr {
                        width: parts.iter().map(|p| p.width).sum(),
                        signed: false,
                        kind: ExprKind::Concat(parts),
                    }
                };
                let width = (count as u64).saturating_mul(inner.width as u64);
                if width > Bits::MAX_WIDTH as u64 {
                    return Err(ElabError::invalid(
                        n.span,
                        format!("replication is wider than {} bits", Bits::MAX_WIDTH),
                    ));
                }
                Expr {
                    width: width as usize,
                    signed: false,
                    kind: ExprKind::Replicate(count as usize, Box::new(inner)),
                }
            }
        })
    }
}
