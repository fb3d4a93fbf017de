//! Canonical Verilog text for AST nodes.
//!
//! Parenthesised expressions keep their explicit `Paren` nodes, so printing
//! never adds or removes grouping and re-parsing printed text is stable.

use std::fmt::{self, Display, Write};

use crate::ast::*;
use crate::lexer::NumberLit;

const INDENT: &str = "  ";

struct Printer {
    out: String,
    depth: usize,
}

impl Printer {
    fn new(depth: usize) -> Self {
        Self {
            out: String::new(),
            depth,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn module(&mut self, m: &ModuleDecl) {
        if !m.attrs.is_empty() {
            self.line(&m.attrs.to_string());
        }
        let mut head = format!("module {}", m.name.name);
        if !m.params.is_empty() {
            head.push_str("#(\n");
            let params: Vec<String> = m
                .params
                .iter()
                .map(|p| format!("{INDENT}{}", param_text(p)))
                .collect();
            head.push_str(&params.join(",\n"));
            head.push_str("\n)");
        }
        match &m.ports {
            PortList::Ansi(decls) if decls.is_empty() => {
                if !m.params.is_empty() {
                    head.push_str("()");
                }
            }
            PortList::Ansi(decls) => {
                head.push_str("(\n");
                let ports: Vec<String> = decls
                    .iter()
                    .map(|d| format!("{INDENT}{}", port_text(d)))
                    .collect();
                head.push_str(&ports.join(",\n"));
                head.push_str("\n)");
            }
            PortList::NonAnsi(names) => {
                let names: Vec<&str> = names.iter().map(|n| n.name.as_str()).collect();
                let _ = write!(head, "({})", names.join(", "));
            }
        }
        head.push(';');
        self.line(&head);
        self.depth += 1;
        for item in &m.items {
            self.item(item);
        }
        self.depth -= 1;
        self.line("endmodule");
    }

    fn item(&mut self, item: &ModuleItem) {
        match item {
            ModuleItem::Decl(d) => {
                if !d.attrs.is_empty() {
                    self.line(&d.attrs.to_string());
                }
                let mut text = d.kind.as_str().to_string();
                if d.signed && d.kind != NetKind::Integer {
                    text.push_str(" signed");
                }
                if let Some(r) = &d.range {
                    let _ = write!(text, "{r}");
                }
                let vars: Vec<String> = d
                    .vars
                    .iter()
                    .map(|v| {
                        let mut s = v.name.name.clone();
                        for dim in &v.dims {
                            let _ = write!(s, "{dim}");
                        }
                        if let Some(init) = &v.init {
                            let _ = write!(s, " = {init}");
                        }
                        s
                    })
                    .collect();
                self.line(&format!("{text} {};", vars.join(", ")));
            }
            ModuleItem::Param(p) => self.line(&format!("{};", param_text(p))),
            ModuleItem::Port(p) => self.line(&format!("{};", port_text(p))),
            ModuleItem::ContinuousAssign(assigns, _) => {
                let parts: Vec<String> = assigns
                    .iter()
                    .map(|a| format!("{} = {}", a.lhs, a.rhs))
                    .collect();
                self.line(&format!("assign {};", parts.join(", ")));
            }
            ModuleItem::Always(a) => {
                let head = match &a.event {
                    Some(ev) => format!("always {ev}"),
                    None => "always".to_string(),
                };
                self.headed(&head, &a.body);
            }
            ModuleItem::Initial(body, _) => self.headed("initial", body),
            ModuleItem::Instantiation(inst) => {
                if !inst.attrs.is_empty() {
                    self.line(&inst.attrs.to_string());
                }
                let mut text = inst.module.name.clone();
                if !inst.params.is_empty() {
                    let _ = write!(text, "#({})", connections_text(&inst.params));
                }
                let instances: Vec<String> = inst
                    .instances
                    .iter()
                    .map(|i| format!("{}({})", i.name.name, connections_text(&i.ports)))
                    .collect();
                self.line(&format!("{text} {};", instances.join(", ")));
            }
        }
    }

    /// `head` followed by a statement; blocks open on the same line.
    fn headed(&mut self, head: &str, body: &Statement) {
        match &body.kind {
            StatementKind::Block { label, stmts } => {
                self.line(&format!("{head} {}", block_open(label)));
                self.block_body(stmts);
            }
            _ => {
                self.line(head);
                self.depth += 1;
                self.statement(body);
                self.depth -= 1;
            }
        }
    }

    fn block_body(&mut self, stmts: &[Statement]) {
        self.depth += 1;
        for s in stmts {
            self.statement(s);
        }
        self.depth -= 1;
        self.line("end");
    }

    fn statement(&mut self, s: &Statement) {
        match &s.kind {
            StatementKind::Block { label, stmts } => {
                self.line(&block_open(label));
                self.block_body(stmts);
            }
            StatementKind::Blocking(a) => self.line(&format!("{} = {};", a.lhs, a.rhs)),
            StatementKind::Nonblocking(a) => self.line(&format!("{} <= {};", a.lhs, a.rhs)),
            StatementKind::If {
                cond,
                then,
                otherwise,
            } => {
                self.headed(&format!("if ({cond})"), then);
                if let Some(other) = otherwise {
                    self.headed("else", other);
                }
            }
            StatementKind::Case { kind, cond, items } => {
                let kw = match kind {
                    CaseKind::Case => "case",
                    CaseKind::Casex => "casex",
                    CaseKind::Casez => "casez",
                };
                self.line(&format!("{kw} ({cond})"));
                self.depth += 1;
                for item in items {
                    let label = if item.exprs.is_empty() {
                        "default:".to_string()
                    } else {
                        format!("{}:", join(&item.exprs))
                    };
                    self.headed(&label, &item.body);
                }
                self.depth -= 1;
                self.line("endcase");
            }
            StatementKind::For {
                init,
                cond,
                step,
                body,
            } => self.headed(
                &format!(
                    "for ({} = {}; {cond}; {} = {})",
                    init.lhs, init.rhs, step.lhs, step.rhs
                ),
                body,
            ),
            StatementKind::While { cond, body } => self.headed(&format!("while ({cond})"), body),
            StatementKind::Repeat { count, body } => {
                self.headed(&format!("repeat ({count})"), body)
            }
            StatementKind::SystemTask { name, args } => {
                if args.is_empty() {
                    self.line(&format!("${};", name.name));
                } else {
                    self.line(&format!("${}({});", name.name, join(args)));
                }
            }
            StatementKind::Null => self.line(";"),
        }
    }
}

fn block_open(label: &Option<Ident>) -> String {
    match label {
        Some(l) => format!("begin : {}", l.name),
        None => "begin".to_string(),
    }
}

fn join(exprs: &[Expr]) -> String {
    exprs
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn signing_and_range(signed: bool, range: &Option<Range>) -> String {
    let mut s = String::new();
    if signed {
        s.push_str(" signed");
    }
    if let Some(r) = range {
        let _ = write!(s, "{r}");
    }
    s
}

fn param_text(p: &ParamDecl) -> String {
    let kw = if p.local { "localparam" } else { "parameter" };
    let assigns: Vec<String> = p
        .assigns
        .iter()
        .map(|(n, e)| format!("{} = {e}", n.name))
        .collect();
    format!(
        "{kw}{} {}",
        signing_and_range(p.signed, &p.range),
        assigns.join(", ")
    )
}

fn port_text(p: &PortDecl) -> String {
    let mut s = String::new();
    if !p.attrs.is_empty() {
        let _ = write!(s, "{} ", p.attrs);
    }
    s.push_str(p.dir.as_str());
    if let Some(kind) = p.kind {
        let _ = write!(s, " {}", kind.as_str());
    }
    s.push_str(&signing_and_range(p.signed, &p.range));
    let names: Vec<&str> = p.names.iter().map(|n| n.name.as_str()).collect();
    let _ = write!(s, " {}", names.join(", "));
    s
}

fn connections_text(conns: &[Connection]) -> String {
    conns
        .iter()
        .map(|c| match c {
            Connection::Named(n, Some(e)) => format!(".{}({e})", n.name),
            Connection::Named(n, None) => format!(".{}()", n.name),
            Connection::Ordered(e) => e.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
    out
}

impl Display for NumberLit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.based {
            return write!(f, "{}", self.value.to_string_radix(10));
        }
        if let Some(size) = self.size {
            write!(f, "{size}")?;
        }
        let base = match self.radix {
            2 => 'b',
            8 => 'o',
            10 => 'd',
            _ => 'h',
        };
        let s = if self.signed { "s" } else { "" };
        let mut v = self.value.clone();
        v.set_signed(false);
        write!(f, "'{s}{base}{}", v.to_string_radix(self.radix))
    }
}

impl Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = self
            .entries
            .iter()
            .map(|(k, v)| match v {
                Some(v) => format!("{} = {v}", k.name),
                None => k.name.clone(),
            })
            .collect();
        write!(f, "(*{}*)", entries.join(", "))
    }
}

impl Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.msb, self.lsb)
    }
}

impl Display for EventControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventControl::Star => write!(f, "@(*)"),
            EventControl::Events(events) => {
                let parts: Vec<String> = events
                    .iter()
                    .map(|e| match e.edge {
                        Edge::Any => e.expr.to_string(),
                        Edge::Pos => format!("posedge {}", e.expr),
                        Edge::Neg => format!("negedge {}", e.expr),
                    })
                    .collect();
                write!(f, "@({})", parts.join(" or "))
            }
        }
    }
}

impl Display for IdentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())?;
        for i in &self.indices {
            write!(f, "[{i}]")?;
        }
        match &self.range {
            Some(RangeSelect::Part(m, l)) => write!(f, "[{m}:{l}]"),
            Some(RangeSelect::Up(b, w)) => write!(f, "[{b}+:{w}]"),
            Some(RangeSelect::Down(b, w)) => write!(f, "[{b}-:{w}]"),
            None => Ok(()),
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Number(n) => write!(f, "{n}"),
            ExprKind::Str(s) => write!(f, "\"{}\"", escape(s)),
            ExprKind::Ident(r) => write!(f, "{r}"),
            // `~ &x` must not print as `~&x`.
            ExprKind::Unary(op, a) if matches!(a.kind, ExprKind::Unary(..)) => {
                write!(f, "{} {a}", op.as_str())
            }
            ExprKind::Unary(op, a) => write!(f, "{}{a}", op.as_str()),
            ExprKind::Binary(op, a, b) => write!(f, "{a} {} {b}", op.as_str()),
            ExprKind::Ternary(c, t, e) => write!(f, "{c} ? {t} : {e}"),
            ExprKind::Concat(es) => write!(f, "{{{}}}", join(es)),
            ExprKind::Replicate(n, es) => write!(f, "{{{n}{{{}}}}}", join(es)),
            ExprKind::Paren(e) => write!(f, "({e})"),
            ExprKind::SystemCall(name) => write!(f, "${}", name.name),
        }
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut p = Printer::new(0);
        p.statement(self);
        f.write_str(p.out.trim_end())
    }
}

impl Display for ModuleItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut p = Printer::new(0);
        p.item(self);
        f.write_str(p.out.trim_end())
    }
}

impl Display for ModuleDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut p = Printer::new(0);
        p.module(self);
        f.write_str(p.out.trim_end())
    }
}

impl Display for SourceElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceElement::Module(m) => write!(f, "{m}"),
            SourceElement::Item(i) => write!(f, "{i}"),
            SourceElement::Include { path, .. } => write!(f, "`include \"{}\"", escape(path)),
        }
    }
}
