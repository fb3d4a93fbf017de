//! Syntax tree for the supported Verilog subset.
//!
//! Every node carries the [`Span`] it was parsed from. Nodes are plain data:
//! printing lives in [`crate::printer`], checking in [`crate::typecheck`] and
//! lowering in [`crate::elaborate`].

use crate::lexer::NumberLit;
use crate::source::Span;

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// `(* key = value, flag *)`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    pub entries: Vec<(Ident, Option<Expr>)>,
}

impl Attributes {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Expr> {
        self.entries
            .iter()
            .find(|(k, _)| k.name == key)
            .and_then(|(_, v)| v.as_ref())
    }

    /// Value of a string-valued attribute.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key).map(|e| &e.kind) {
            Some(ExprKind::Str(s)) => Some(s),
            _ => None,
        }
    }
}

/// One top-level unit of input.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceElement {
    Module(ModuleDecl),
    Item(ModuleItem),
    Include { path: String, span: Span },
}

impl SourceElement {
    pub fn span(&self) -> Span {
        match self {
            SourceElement::Module(m) => m.span,
            SourceElement::Item(i) => i.span(),
            SourceElement::Include { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDecl {
    pub attrs: Attributes,
    pub name: Ident,
    pub params: Vec<ParamDecl>,
    pub ports: PortList,
    pub items: Vec<ModuleItem>,
    pub span: Span,
}

impl ModuleDecl {
    /// Kind of standard component, if this is a standard library declaration.
    pub fn std_kind(&self) -> Option<&str> {
        self.attrs.get_str("__std")
    }

    /// Port names in declaration order.
    pub fn port_names(&self) -> Vec<&str> {
        match &self.ports {
            PortList::Ansi(decls) => decls
                .iter()
                .flat_map(|d| d.names.iter().map(|n| n.name.as_str()))
                .collect(),
            PortList::NonAnsi(names) => names.iter().map(|n| n.name.as_str()).collect(),
        }
    }

    /// All port declarations, from the header or the body.
    pub fn port_decls(&self) -> Vec<&PortDecl> {
        match &self.ports {
            PortList::Ansi(decls) => decls.iter().collect(),
            PortList::NonAnsi(_) => self
                .items
                .iter()
                .filter_map(|i| match i {
                    ModuleItem::Port(p) => Some(p),
                    _ => None,
                })
                .collect(),
        }
    }

    /// Direction of a named port.
    pub fn port_dir(&self, name: &str) -> Option<Direction> {
        self.port_decls()
            .into_iter()
            .find(|d| d.names.iter().any(|n| n.name == name))
            .map(|d| d.dir)
    }

    /// Overridable parameters in positional order: header parameters when
    /// the header has any, otherwise body `parameter` declarations.
    pub fn overridable_params(&self) -> Vec<&Ident> {
        if !self.params.is_empty() {
            return self
                .params
                .iter()
                .filter(|p| !p.local)
                .flat_map(|p| p.assigns.iter().map(|(n, _)| n))
                .collect();
        }
        self.items
            .iter()
            .filter_map(|i| match i {
                ModuleItem::Param(p) if !p.local => Some(p),
                _ => None,
            })
            .flat_map(|p| p.assigns.iter().map(|(n, _)| n))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PortList {
    /// Ports declared in the header: `module M(input wire a);`
    Ansi(Vec<PortDecl>),
    /// Port names in the header, directions in the body: `module M(a);`
    NonAnsi(Vec<Ident>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
    Inout,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
            Direction::Inout => "inout",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetKind {
    Wire,
    Reg,
    Integer,
}

impl NetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetKind::Wire => "wire",
            NetKind::Reg => "reg",
            NetKind::Integer => "integer",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    pub msb: Expr,
    pub lsb: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortDecl {
    pub attrs: Attributes,
    pub dir: Direction,
    pub kind: Option<NetKind>,
    pub signed: bool,
    pub range: Option<Range>,
    pub names: Vec<Ident>,
    pub span: Span,
}

impl PortDecl {
    pub fn is_reg(&self) -> bool {
        matches!(self.kind, Some(NetKind::Reg | NetKind::Integer))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub local: bool,
    pub signed: bool,
    pub range: Option<Range>,
    pub assigns: Vec<(Ident, Expr)>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub name: Ident,
    /// Unpacked array dimensions: `reg [7:0] mem [0:15]`.
    pub dims: Vec<Range>,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub attrs: Attributes,
    pub kind: NetKind,
    pub signed: bool,
    pub range: Option<Range>,
    pub vars: Vec<Declarator>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assign {
    pub lhs: Expr,
    pub rhs: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Any,
    Pos,
    Neg,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub edge: Edge,
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventControl {
    /// `@*` or `@(*)`
    Star,
    Events(Vec<Event>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Always {
    pub event: Option<EventControl>,
    pub body: Statement,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Connection {
    Named(Ident, Option<Expr>),
    Ordered(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub name: Ident,
    pub ports: Vec<Connection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instantiation {
    pub attrs: Attributes,
    pub module: Ident,
    pub params: Vec<Connection>,
    pub instances: Vec<Instance>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModuleItem {
    Decl(Declaration),
    Param(ParamDecl),
    Port(PortDecl),
    ContinuousAssign(Vec<Assign>, Span),
    Always(Always),
    Initial(Statement, Span),
    Instantiation(Instantiation),
}

impl ModuleItem {
    pub fn span(&self) -> Span {
        match self {
            ModuleItem::Decl(d) => d.span,
            ModuleItem::Param(p) => p.span,
            ModuleItem::Port(p) => p.span,
            ModuleItem::ContinuousAssign(_, span) => *span,
            ModuleItem::Always(a) => a.span,
            ModuleItem::Initial(_, span) => *span,
            ModuleItem::Instantiation(i) => i.span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseKind {
    Case,
    Casex,
    Casez,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseItem {
    /// Empty for `default`.
    pub exprs: Vec<Expr>,
    pub body: Statement,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Block {
        label: Option<Ident>,
        stmts: Vec<Statement>,
    },
    Blocking(Assign),
    Nonblocking(Assign),
    If {
        cond: Expr,
        then: Box<Statement>,
        otherwise: Option<Box<Statement>>,
    },
    Case {
        kind: CaseKind,
        cond: Expr,
        items: Vec<CaseItem>,
    },
    For {
        init: Assign,
        cond: Expr,
        step: Assign,
        body: Box<Statement>,
    },
    While {
        cond: Expr,
        body: Box<Statement>,
    },
    Repeat {
        count: Expr,
        body: Box<Statement>,
    },
    SystemTask {
        name: Ident,
        args: Vec<Expr>,
    },
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    BitNot,
    RedAnd,
    RedNand,
    RedOr,
    RedNor,
    RedXor,
    RedXnor,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::RedAnd => "&",
            UnaryOp::RedNand => "~&",
            UnaryOp::RedOr => "|",
            UnaryOp::RedNor => "~|",
            UnaryOp::RedXor => "^",
            UnaryOp::RedXnor => "~^",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Shl,
    Shr,
    AShl,
    AShr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    CaseEq,
    CaseNe,
    BitAnd,
    BitOr,
    BitXor,
    BitXnor,
    LogAnd,
    LogOr,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::AShl => "<<<",
            BinaryOp::AShr => ">>>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::CaseEq => "===",
            BinaryOp::CaseNe => "!==",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BitXnor => "~^",
            BinaryOp::LogAnd => "&&",
            BinaryOp::LogOr => "||",
        }
    }

    /// Binding strength; larger binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Pow => 11,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 10,
            BinaryOp::Add | BinaryOp::Sub => 9,
            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::AShl | BinaryOp::AShr => 8,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 7,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::CaseEq | BinaryOp::CaseNe => 6,
            BinaryOp::BitAnd => 5,
            BinaryOp::BitXor | BinaryOp::BitXnor => 4,
            BinaryOp::BitOr => 3,
            BinaryOp::LogAnd => 2,
            BinaryOp::LogOr => 1,
        }
    }

    pub fn from_punct(p: &str) -> Option<BinaryOp> {
        Some(match p {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Mod,
            "**" => BinaryOp::Pow,
            "<<" => BinaryOp::Shl,
            ">>" => BinaryOp::Shr,
            "<<<" => BinaryOp::AShl,
            ">>>" => BinaryOp::AShr,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "===" => BinaryOp::CaseEq,
            "!==" => BinaryOp::CaseNe,
            "&" => BinaryOp::BitAnd,
            "|" => BinaryOp::BitOr,
            "^" => BinaryOp::BitXor,
            "~^" | "^~" => BinaryOp::BitXnor,
            "&&" => BinaryOp::LogAnd,
            "||" => BinaryOp::LogOr,
            _ => return None,
        })
    }
}

/// Trailing range selection on an identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeSelect {
    /// `x[msb:lsb]`
    Part(Box<Expr>, Box<Expr>),
    /// `x[base +: width]`
    Up(Box<Expr>, Box<Expr>),
    /// `x[base -: width]`
    Down(Box<Expr>, Box<Expr>),
}

/// A possibly hierarchical identifier with selects: `a.b[3][7:0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentRef {
    pub parts: Vec<Ident>,
    pub indices: Vec<Expr>,
    pub range: Option<RangeSelect>,
}

impl IdentRef {
    /// Dotted name.
    pub fn path(&self) -> String {
        self.parts
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn is_simple(&self) -> bool {
        self.parts.len() == 1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Number(NumberLit),
    Str(String),
    Ident(IdentRef),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Concat(Vec<Expr>),
    Replicate(Box<Expr>, Vec<Expr>),
    Paren(Box<Expr>),
    /// `$time` and other argument-less system functions.
    SystemCall(Ident),
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Calls `f` on every identifier reference in the expression.
    pub fn visit_idents<'a>(&'a self, f: &mut impl FnMut(&'a IdentRef)) {
        match &self.kind {
            ExprKind::Ident(r) => {
                f(r);
                for i in &r.indices {
                    i.visit_idents(f);
                }
                match &r.range {
                    Some(RangeSelect::Part(a, b))
                    | Some(RangeSelect::Up(a, b))
                    | Some(RangeSelect::Down(a, b)) => {
                        a.visit_idents(f);
                        b.visit_idents(f);
                    }
                    None => {}
                }
            }
            ExprKind::Unary(_, a) | ExprKind::Paren(a) => a.visit_idents(f),
            ExprKind::Binary(_, a, b) => {
                a.visit_idents(f);
                b.visit_idents(f);
            }
            ExprKind::Ternary(a, b, c) => {
                a.visit_idents(f);
                b.visit_idents(f);
                c.visit_idents(f);
            }
            ExprKind::Concat(es) => es.iter().for_each(|e| e.visit_idents(f)),
            ExprKind::Replicate(n, es) => {
                n.visit_idents(f);
                es.iter().for_each(|e| e.visit_idents(f));
            }
            ExprKind::Number(_) | ExprKind::Str(_) | ExprKind::SystemCall(_) => {}
        }
    }
}
