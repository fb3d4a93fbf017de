//! Name resolution and structural checks for module declarations and root
//! items.

use std::collections::{HashMap, HashSet};

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::ast::*;
use crate::source::{SourceFile, Span};

/// System tasks the runtime knows how to execute.
pub const SYSTEM_TASKS: &[&str] = &[
    "display", "write", "error", "warning", "info", "fatal", "finish", "save", "restart",
    "retarget",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A single typechecker finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
}

impl Issue {
    pub fn error(span: Span, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            span,
        }
    }

    pub fn warning(span: Span, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            span,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Attach source text for rendering with `miette`.
    pub fn to_diagnostic(&self, source: &SourceFile) -> TypeError {
        let location = source.location(self.span);
        let src = source.named_source();
        let span = self.span.into();
        match self.severity {
            Severity::Error => TypeError::Error {
                message: self.message.clone(),
                location,
                src,
                span,
            },
            Severity::Warning => TypeError::Warning {
                message: self.message.clone(),
                location,
                src,
                span,
            },
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum TypeError {
    #[error("{message}")]
    #[diagnostic(code(cascade::typecheck))]
    Error {
        message: String,
        location: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
    },
    #[error("{message}")]
    #[diagnostic(code(cascade::typecheck::warning), severity(Warning))]
    Warning {
        message: String,
        location: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Net,
    Variable,
    Param,
    Instance,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub kind: SymbolKind,
    /// Instantiated module, for instances.
    pub module: Option<String>,
    pub port: Option<Direction>,
    pub span: Span,
    /// Set once a net or variable declaration has named this symbol.
    typed: bool,
}

impl Symbol {
    fn new(kind: SymbolKind, span: Span) -> Self {
        Self {
            kind,
            module: None,
            port: None,
            span,
            typed: false,
        }
    }
}

/// Names declared in one module (or in the root module).
#[derive(Debug, Clone, Default)]
pub struct Scope {
    symbols: HashMap<String, Symbol>,
}

impl Scope {
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub(crate) fn remove(&mut self, name: &str) {
        self.symbols.remove(name);
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    fn insert(&mut self, name: &str, sym: Symbol, issues: &mut Vec<Issue>, added: &mut Vec<String>) {
        if self.symbols.contains_key(name) {
            issues.push(Issue::error(
                sym.span,
                format!("duplicate declaration of `{name}`"),
            ));
            return;
        }
        self.symbols.insert(name.to_string(), sym);
        added.push(name.to_string());
    }
}

/// What other modules need to know about a declared module.
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    pub name: String,
    pub scope: Scope,
    pub ports: Vec<(String, Direction)>,
    /// Overridable parameters in positional order.
    pub params: Vec<String>,
    pub locals: HashSet<String>,
    pub std: bool,
}

impl ModuleInfo {
    pub fn has_port(&self, name: &str) -> bool {
        self.ports.iter().any(|(p, _)| p == name)
    }
}

/// Build the scope of a module declaration, reporting duplicate and
/// malformed port declarations.
pub fn module_info(decl: &ModuleDecl, issues: &mut Vec<Issue>) -> ModuleInfo {
    let mut scope = Scope::default();
    let mut added = Vec::new();

    for p in &decl.params {
        for (name, _) in &p.assigns {
            scope.insert(&name.name, Symbol::new(SymbolKind::Param, name.span), issues, &mut added);
        }
    }

    let mut header_names = Vec::new();
    match &decl.ports {
        PortList::Ansi(decls) => {
            for d in decls {
                for name in &d.names {
                    let kind = if d.is_reg() {
                        SymbolKind::Variable
                    } else {
                        SymbolKind::Net
                    };
                    let mut sym = Symbol::new(kind, name.span);
                    sym.port = Some(d.dir);
                    sym.typed = d.kind.is_some();
                    scope.insert(&name.name, sym, issues, &mut added);
                }
            }
        }
        PortList::NonAnsi(names) => {
            for name in names {
                scope.insert(&name.name, Symbol::new(SymbolKind::Net, name.span), issues, &mut added);
                header_names.push(name.clone());
            }
        }
    }

    for item in &decl.items {
        declare_item(&mut scope, item, true, &header_names, issues, &mut added);
    }

    for name in &header_names {
        if scope.get(&name.name).is_some_and(|s| s.port.is_none()) {
            issues.push(Issue::error(
                name.span,
                format!("port `{}` has no direction declaration", name.name),
            ));
        }
    }

    let ports = decl
        .port_names()
        .into_iter()
        .filter_map(|n| scope.get(n).and_then(|s| s.port).map(|d| (n.to_string(), d)))
        .collect();
    let params = decl
        .overridable_params()
        .into_iter()
        .map(|i| i.name.clone())
        .collect();
    let locals = decl
        .items
        .iter()
        .filter_map(|i| match i {
            ModuleItem::Param(p) if p.local => Some(p),
            _ => None,
        })
        .chain(decl.params.iter().filter(|p| p.local))
        .flat_map(|p| p.assigns.iter().map(|(n, _)| n.name.clone()))
        .collect();

    ModuleInfo {
        name: decl.name.name.clone(),
        scope,
        ports,
        params,
        locals,
        std: decl.std_kind().is_some(),
    }
}

/// Add the names an item declares to `scope`. Names actually inserted are
/// appended to `added`.
pub(crate) fn declare_item(
    scope: &mut Scope,
    item: &ModuleItem,
    in_module: bool,
    header_ports: &[Ident],
    issues: &mut Vec<Issue>,
    added: &mut Vec<String>,
) {
    match item {
        ModuleItem::Decl(d) => {
            let kind = match d.kind {
                NetKind::Wire => SymbolKind::Net,
                NetKind::Reg | NetKind::Integer => SymbolKind::Variable,
            };
            for v in &d.vars {
                match scope.symbols.get_mut(&v.name.name) {
                    // `output q; reg q;`
                    Some(sym) if sym.port.is_some() && !sym.typed => {
                        sym.kind = kind;
                        sym.typed = true;
                    }
                    _ => {
                        let mut sym = Symbol::new(kind, v.name.span);
                        sym.typed = true;
                        scope.insert(&v.name.name, sym, issues, added);
                    }
                }
            }
        }
        ModuleItem::Param(p) => {
            for (name, _) in &p.assigns {
                scope.insert(&name.name, Symbol::new(SymbolKind::Param, name.span), issues, added);
            }
        }
        ModuleItem::Port(p) => {
            if !in_module {
                issues.push(Issue::error(
                    p.span,
                    "port declarations are only allowed inside a module",
                ));
                return;
            }
            for name in &p.names {
                let in_header = header_ports.iter().any(|h| h.name == name.name);
                match scope.symbols.get_mut(&name.name) {
                    Some(sym) if in_header && sym.port.is_none() => {
                        sym.port = Some(p.dir);
                        if p.is_reg() {
                            sym.kind = SymbolKind::Variable;
                        }
                        sym.typed = p.kind.is_some();
                    }
                    Some(_) => issues.push(Issue::error(
                        name.span,
                        format!("duplicate declaration of `{}`", name.name),
                    )),
                    None => issues.push(Issue::error(
                        name.span,
                        format!("`{}` does not appear in the module's port list", name.name),
                    )),
                }
            }
        }
        ModuleItem::Instantiation(inst) => {
            for i in &inst.instances {
                let mut sym = Symbol::new(SymbolKind::Instance, i.name.span);
                sym.module = Some(inst.module.name.clone());
                scope.insert(&i.name.name, sym, issues, added);
            }
        }
        ModuleItem::ContinuousAssign(..) | ModuleItem::Always(_) | ModuleItem::Initial(..) => {}
    }
}

/// Checks item bodies against a fully populated scope.
pub struct Checker<'a> {
    scope: &'a Scope,
    modules: &'a HashMap<String, ModuleInfo>,
    self_name: Option<&'a str>,
    issues: &'a mut Vec<Issue>,
}

impl<'a> Checker<'a> {
    pub fn new(
        scope: &'a Scope,
        modules: &'a HashMap<String, ModuleInfo>,
        self_name: Option<&'a str>,
        issues: &'a mut Vec<Issue>,
    ) -> Self {
        Self {
            scope,
            modules,
            self_name,
            issues,
        }
    }

    fn error(&mut self, span: Span, message: impl Into<String>) {
        self.issues.push(Issue::error(span, message));
    }

    pub fn check_module(&mut self, decl: &ModuleDecl) {
        for p in &decl.params {
            self.param(p);
        }
        if let PortList::Ansi(decls) = &decl.ports {
            for r in decls.iter().filter_map(|d| d.range.as_ref()) {
                self.range(r);
            }
        }
        for item in &decl.items {
            self.item(item);
        }
    }

    pub fn item(&mut self, item: &ModuleItem) {
        match item {
            ModuleItem::Decl(d) => {
                if let Some(r) = &d.range {
                    self.range(r);
                }
                for v in &d.vars {
                    for dim in &v.dims {
                        self.range(dim);
                    }
                    if let Some(init) = &v.init {
                        self.expr(init);
                    }
                }
            }
            ModuleItem::Param(p) => self.param(p),
            ModuleItem::Port(p) => {
                if let Some(r) = &p.range {
                    self.range(r);
                }
            }
            ModuleItem::ContinuousAssign(assigns, _) => {
                for a in assigns {
                    self.lvalue(&a.lhs, false);
                    self.expr(&a.rhs);
                }
            }
            ModuleItem::Always(a) => {
                match &a.event {
                    None => self.error(
                        a.span,
                        "always blocks without an event control are not supported",
                    ),
                    Some(EventControl::Star) => {}
                    Some(EventControl::Events(events)) => {
                        for ev in events {
                            if !matches!(ev.expr.kind, ExprKind::Ident(_)) {
                                self.error(ev.expr.span, "event expressions must be identifiers");
                            }
                            self.expr(&ev.expr);
                        }
                    }
                }
                self.statement(&a.body);
            }
            ModuleItem::Initial(body, _) => self.statement(body),
            ModuleItem::Instantiation(inst) => self.instantiation(inst),
        }
    }

    fn param(&mut self, p: &ParamDecl) {
        if let Some(r) = &p.range {
            self.range(r);
        }
        for (_, value) in &p.assigns {
            self.const_expr(value);
        }
    }

    fn range(&mut self, r: &Range) {
        self.const_expr(&r.msb);
        self.const_expr(&r.lsb);
    }

    fn const_expr(&mut self, e: &Expr) {
        let mut bad = Vec::new();
        e.visit_idents(&mut |r| {
            let ok = r.is_simple()
                && self
                    .scope
                    .get(&r.parts[0].name)
                    .is_some_and(|s| s.kind == SymbolKind::Param);
            if !ok {
                bad.push((r.path(), r.parts[0].span));
            }
        });
        for (name, span) in bad {
            if self.scope.contains(&name) {
                self.error(span, format!("`{name}` is not a constant"));
            } else {
                self.error(span, format!("undeclared identifier `{name}`"));
            }
        }
        self.system_calls(e);
    }

    fn system_calls(&mut self, e: &Expr) {
        match &e.kind {
            ExprKind::SystemCall(name) if name.name != "time" => {
                self.error(name.span, format!("unknown system function `${}`", name.name))
            }
            ExprKind::Unary(_, a) | ExprKind::Paren(a) => self.system_calls(a),
            ExprKind::Binary(_, a, b) => {
                self.system_calls(a);
                self.system_calls(b);
            }
            ExprKind::Ternary(a, b, c) => {
                self.system_calls(a);
                self.system_calls(b);
                self.system_calls(c);
            }
            ExprKind::Concat(es) => es.iter().for_each(|x| self.system_calls(x)),
            ExprKind::Replicate(n, es) => {
                self.system_calls(n);
                es.iter().for_each(|x| self.system_calls(x));
            }
            _ => {}
        }
    }

    /// Resolve a reference to the kind of symbol it names.
    fn resolve(&mut self, r: &IdentRef) -> Option<SymbolKind> {
        let scope = self.scope;
        let modules = self.modules;
        let first = &r.parts[0];
        let Some(sym) = scope.get(&first.name) else {
            self.error(first.span, format!("undeclared identifier `{}`", first.name));
            return None;
        };
        if r.is_simple() {
            return Some(sym.kind);
        }
        if sym.kind != SymbolKind::Instance {
            self.error(
                first.span,
                format!("`{}` is not an instance in this scope", first.name),
            );
            return None;
        }

        let mut module = sym.module.clone()?;
        let last = r.parts.len() - 1;
        for (i, part) in r.parts.iter().enumerate().skip(1) {
            if Some(module.as_str()) == self.self_name {
                return None;
            }
            // Undeclared modules are reported at the instantiation.
            let info = modules.get(&module)?;
            let Some(s) = info.scope.get(&part.name) else {
                self.error(
                    part.span,
                    format!("`{}` is not declared in module `{module}`", part.name),
                );
                return None;
            };
            if i == last {
                return match s.kind {
                    SymbolKind::Net | SymbolKind::Variable => Some(s.kind),
                    _ => {
                        self.error(
                            part.span,
                            format!("`{}` is not a port or variable of module `{module}`", part.name),
                        );
                        None
                    }
                };
            }
            match (&s.kind, &s.module) {
                (SymbolKind::Instance, Some(m)) => module = m.clone(),
                _ => {
                    self.error(
                        part.span,
                        format!("`{}` is not an instance in module `{module}`", part.name),
                    );
                    return None;
                }
            }
        }
        None
    }

    fn ident_selects(&mut self, r: &IdentRef) {
        for i in &r.indices {
            self.expr(i);
        }
        match &r.range {
            Some(RangeSelect::Part(a, b)) => {
                self.const_expr(a);
                self.const_expr(b);
            }
            Some(RangeSelect::Up(a, b)) | Some(RangeSelect::Down(a, b)) => {
                self.expr(a);
                self.const_expr(b);
            }
            None => {}
        }
    }

    pub fn expr(&mut self, e: &Expr) {
        match &e.kind {
            ExprKind::Number(_) | ExprKind::Str(_) => {}
            ExprKind::SystemCall(name) => {
                if name.name != "time" {
                    self.error(name.span, format!("unknown system function `${}`", name.name));
                }
            }
            ExprKind::Ident(r) => {
                if self.resolve(r) == Some(SymbolKind::Instance) {
                    self.error(
                        e.span,
                        format!("instance `{}` cannot be used as a value", r.path()),
                    );
                }
                self.ident_selects(r);
            }
            ExprKind::Unary(_, a) | ExprKind::Paren(a) => self.expr(a),
            ExprKind::Binary(_, a, b) => {
                self.expr(a);
                self.expr(b);
            }
            ExprKind::Ternary(a, b, c) => {
                self.expr(a);
                self.expr(b);
                self.expr(c);
            }
            ExprKind::Concat(es) => es.iter().for_each(|x| self.expr(x)),
            ExprKind::Replicate(n, es) => {
                self.const_expr(n);
                es.iter().for_each(|x| self.expr(x));
            }
        }
    }

    fn lvalue(&mut self, e: &Expr, procedural: bool) {
        match &e.kind {
            ExprKind::Ident(r) => {
                self.ident_selects(r);
                let path = r.path();
                match self.resolve(r) {
                    Some(SymbolKind::Net) if procedural => self.error(
                        e.span,
                        format!("procedural assignment to net `{path}`; declare it as reg"),
                    ),
                    Some(SymbolKind::Variable) if !procedural => self.error(
                        e.span,
                        format!("continuous assignment to variable `{path}`; declare it as wire"),
                    ),
                    Some(SymbolKind::Param) => {
                        self.error(e.span, format!("cannot assign to parameter `{path}`"))
                    }
                    Some(SymbolKind::Instance) => {
                        self.error(e.span, format!("cannot assign to instance `{path}`"))
                    }
                    _ => {}
                }
            }
            ExprKind::Concat(parts) => {
                for p in parts {
                    self.lvalue(p, procedural);
                }
            }
            _ => self.error(e.span, "invalid assignment target"),
        }
    }

    fn statement(&mut self, s: &Statement) {
        match &s.kind {
            StatementKind::Block { stmts, .. } => stmts.iter().for_each(|x| self.statement(x)),
            StatementKind::Blocking(a) | StatementKind::Nonblocking(a) => {
                self.lvalue(&a.lhs, true);
                self.expr(&a.rhs);
            }
            StatementKind::If {
                cond,
                then,
                otherwise,
            } => {
                self.expr(cond);
                self.statement(then);
                if let Some(o) = otherwise {
                    self.statement(o);
                }
            }
            StatementKind::Case { cond, items, .. } => {
                self.expr(cond);
                let defaults = items.iter().filter(|i| i.exprs.is_empty()).count();
                if defaults > 1 {
                    self.error(s.span, "case statement has more than one default");
                }
                for item in items {
                    item.exprs.iter().for_each(|x| self.expr(x));
                    self.statement(&item.body);
                }
            }
            StatementKind::For {
                init,
                cond,
                step,
                body,
            } => {
                self.lvalue(&init.lhs, true);
                self.expr(&init.rhs);
                self.expr(cond);
                self.lvalue(&step.lhs, true);
                self.expr(&step.rhs);
                self.statement(body);
            }
            StatementKind::While { cond, body } => {
                self.expr(cond);
                self.statement(body);
            }
            StatementKind::Repeat { count, body } => {
                self.expr(count);
                self.statement(body);
            }
            StatementKind::SystemTask { name, args } => {
                if !SYSTEM_TASKS.contains(&name.name.as_str()) {
                    self.error(name.span, format!("unknown system task `${}`", name.name));
                }
                args.iter().for_each(|x| self.expr(x));
            }
            StatementKind::Null => {}
        }
    }

    fn instantiation(&mut self, inst: &Instantiation) {
        for c in &inst.params {
            match c {
                Connection::Named(_, Some(e)) | Connection::Ordered(e) => self.const_expr(e),
                Connection::Named(_, None) => {}
            }
        }
        for i in &inst.instances {
            for c in &i.ports {
                match c {
                    Connection::Named(_, Some(e)) | Connection::Ordered(e) => self.expr(e),
                    Connection::Named(_, None) => {}
                }
            }
        }

        let target = &inst.module.name;
        if Some(target.as_str()) == self.self_name {
            // Reported as a cycle in the instantiation graph.
            return;
        }
        let modules = self.modules;
        let Some(info) = modules.get(target) else {
            self.error(inst.module.span, format!("undeclared module `{target}`"));
            return;
        };

        let mut ordered = 0;
        for c in &inst.params {
            match c {
                Connection::Named(name, _) => {
                    if info.locals.contains(&name.name) {
                        self.error(
                            name.span,
                            format!("cannot override localparam `{}` of module `{target}`", name.name),
                        );
                    } else if !info.params.contains(&name.name) {
                        self.error(
                            name.span,
                            format!("unknown parameter `{}` for module `{target}`", name.name),
                        );
                    }
                }
                Connection::Ordered(_) => ordered += 1,
            }
        }
        if ordered > info.params.len() {
            self.error(
                inst.span,
                format!("too many parameter overrides for module `{target}`"),
            );
        }

        for i in &inst.instances {
            let mut ordered = 0;
            let mut connected = HashSet::new();
            for c in &i.ports {
                match c {
                    Connection::Named(name, expr) => {
                        if !info.has_port(&name.name) {
                            self.error(
                                name.span,
                                format!("unknown port `{}` for module `{target}`", name.name),
                            );
                        } else if expr.is_some() {
                            connected.insert(name.name.clone());
                        }
                    }
                    Connection::Ordered(_) => {
                        if let Some((p, _)) = info.ports.get(ordered) {
                            connected.insert(p.clone());
                        }
                        ordered += 1;
                    }
                }
            }
            if ordered > info.ports.len() {
                self.error(
                    i.name.span,
                    format!("too many port connections for module `{target}`"),
                );
            }
            if info.std {
                continue;
            }
            for (port, dir) in &info.ports {
                if *dir == Direction::Input && !connected.contains(port) {
                    self.issues.push(Issue::warning(
                        i.name.span,
                        format!("input port `{port}` of instance `{}` is unconnected", i.name.name),
                    ));
                }
            }
        }
    }
}

/// Names declared by a root item that start with the reserved `__` prefix.
pub fn reserved_names(item: &ModuleItem) -> Vec<&Ident> {
    let names: Vec<&Ident> = match item {
        ModuleItem::Decl(d) => d.vars.iter().map(|v| &v.name).collect(),
        ModuleItem::Param(p) => p.assigns.iter().map(|(n, _)| n).collect(),
        ModuleItem::Instantiation(i) => i.instances.iter().map(|x| &x.name).collect(),
        _ => Vec::new(),
    };
    names
        .into_iter()
        .filter(|n| n.name.starts_with("__"))
        .collect()
}
