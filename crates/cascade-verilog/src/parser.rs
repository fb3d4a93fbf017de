//! Recursive-descent parser producing [`crate::ast`] nodes.
//!
//! Input that ends where more tokens are required yields a [`ParseError`]
//! with [`ParseError::is_incomplete`] set, which lets the interactive
//! controller keep reading lines until an entry is complete.

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::ast::*;
use crate::lexer::{tokenize, Keyword, Token, TokenKind};
use crate::source::{SourceFile, Span};

#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    /// Input ended where more tokens are required.
    #[error("{message}")]
    #[diagnostic(code(cascade::parse::incomplete))]
    Incomplete {
        message: String,
        location: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("input ends here")]
        span: SourceSpan,
    },
    #[error("{message}")]
    #[diagnostic(
        code(cascade::parse),
        help("Check the Verilog source for syntax errors")
    )]
    Syntax {
        message: String,
        /// `path:line:col` of the offending token.
        location: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
    },
}

impl ParseError {
    /// True when the input ended early and more text could complete it.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, ParseError::Incomplete { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            ParseError::Incomplete { message, .. } | ParseError::Syntax { message, .. } => message,
        }
    }

    pub fn location(&self) -> &str {
        match self {
            ParseError::Incomplete { location, .. } | ParseError::Syntax { location, .. } => location,
        }
    }

    fn from_parts(source: &SourceFile, e: PError) -> Self {
        let location = source.location(e.span);
        let src = source.named_source();
        let span = e.span.into();
        if e.incomplete {
            ParseError::Incomplete {
                message: e.message,
                location,
                src,
                span,
            }
        } else {
            ParseError::Syntax {
                message: e.message,
                location,
                src,
                span,
            }
        }
    }
}

struct PError {
    message: String,
    span: Span,
    incomplete: bool,
}

type PResult<T> = Result<T, PError>;

/// Parse every top-level element of `source`.
pub fn parse(source: &SourceFile) -> Result<Vec<SourceElement>, ParseError> {
    let fail = |e: PError| ParseError::from_parts(source, e);

    let tokens = tokenize(source.text()).map_err(|e| {
        fail(PError {
            message: e.message,
            span: e.span,
            incomplete: e.incomplete,
        })
    })?;
    let mut parser = Parser { tokens, pos: 0 };
    let mut out = Vec::new();
    while !parser.at_eof() {
        out.push(parser.source_element().map_err(fail)?);
    }
    Ok(out)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    // Token plumbing

    fn tok(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn peek(&self) -> &TokenKind {
        &self.tok().kind
    }

    fn peek_at(&self, n: usize) -> &TokenKind {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + n).min(last)].kind
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    fn bump(&mut self) -> Token {
        let tok = self.tok().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn prev_end(&self) -> usize {
        if self.pos == 0 {
            0
        } else {
            self.tokens[self.pos - 1].span.end
        }
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.prev_end().max(start))
    }

    fn is_punct(&self, p: &str) -> bool {
        matches!(self.peek(), TokenKind::Punct(q) if *q == p)
    }

    fn is_kw(&self, k: Keyword) -> bool {
        matches!(self.peek(), TokenKind::Keyword(q) if *q == k)
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.is_punct(p) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_kw(&mut self, k: Keyword) -> bool {
        if self.is_kw(k) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> PError {
        let tok = self.tok();
        PError {
            message: format!("expected {expected}, found {}", tok.kind),
            span: tok.span,
            incomplete: tok.kind == TokenKind::Eof,
        }
    }

    fn error_at(&self, span: Span, message: impl Into<String>) -> PError {
        PError {
            message: message.into(),
            span,
            incomplete: false,
        }
    }

    fn expect_punct(&mut self, p: &str) -> PResult<Span> {
        if self.is_punct(p) {
            Ok(self.bump().span)
        } else {
            Err(self.unexpected(&format!("`{p}`")))
        }
    }

    fn expect_kw(&mut self, k: Keyword) -> PResult<Span> {
        if self.is_kw(k) {
            Ok(self.bump().span)
        } else {
            Err(self.unexpected(&format!("`{}`", k.as_str())))
        }
    }

    fn ident(&mut self) -> PResult<Ident> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                let span = self.bump().span;
                Ok(Ident::new(name, span))
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    // Top level

    fn source_element(&mut self) -> PResult<SourceElement> {
        let start = self.tok().span.start;
        let attrs = self.attributes()?;
        match self.peek().clone() {
            TokenKind::Directive(d) if d == "include" => {
                self.bump();
                match self.peek().clone() {
                    TokenKind::Str(path) => {
                        self.bump();
                        Ok(SourceElement::Include {
                            path,
                            span: self.span_from(start),
                        })
                    }
                    _ => Err(self.unexpected("file name string")),
                }
            }
            TokenKind::Directive(d) => {
                let span = self.tok().span;
                Err(self.error_at(span, format!("unsupported compiler directive `{d}")))
            }
            TokenKind::Keyword(Keyword::Module) => Ok(SourceElement::Module(self.module(attrs, start)?)),
            _ => Ok(SourceElement::Item(self.module_item(attrs, start)?)),
        }
    }

    fn attributes(&mut self) -> PResult<Attributes> {
        let mut attrs = Attributes::default();
        while matches!(self.peek(), TokenKind::AttrOpen) {
            self.bump();
            loop {
                let key = self.ident()?;
                let val = if self.eat_punct("=") {
                    Some(self.expr()?)
                } else {
                    None
                };
                attrs.entries.push((key, val));
                if !self.eat_punct(",") {
                    break;
                }
            }
            if !matches!(self.peek(), TokenKind::AttrClose) {
                return Err(self.unexpected("`*)`"));
            }
            self.bump();
        }
        Ok(attrs)
    }

    fn module(&mut self, attrs: Attributes, start: usize) -> PResult<ModuleDecl> {
        self.expect_kw(Keyword::Module)?;
        let name = self.ident()?;

        let mut params = Vec::new();
        if self.eat_punct("#") {
            self.expect_punct("(")?;
            if !self.is_punct(")") {
                loop {
                    let pstart = self.tok().span.start;
                    let local = if self.eat_kw(Keyword::Localparam) {
                        true
                    } else {
                        self.eat_kw(Keyword::Parameter);
                        false
                    };
                    let (signed, range) = self.signing_and_range()?;
                    let pname = self.ident()?;
                    self.expect_punct("=")?;
                    let value = self.expr()?;
                    params.push(ParamDecl {
                        local,
                        signed,
                        range,
                        assigns: vec![(pname, value)],
                        span: self.span_from(pstart),
                    });
                    if !self.eat_punct(",") {
                        break;
                    }
                }
            }
            self.expect_punct(")")?;
        }

        let ports = if self.eat_punct("(") {
            let ports = self.port_list()?;
            self.expect_punct(")")?;
            ports
        } else {
            PortList::Ansi(Vec::new())
        };
        self.expect_punct(";")?;

        let mut items = Vec::new();
        while !self.is_kw(Keyword::Endmodule) {
            if self.is_kw(Keyword::Module) {
                let span = self.tok().span;
                return Err(self.error_at(span, "nested module declarations are not supported"));
            }
            let istart = self.tok().span.start;
            let iattrs = self.attributes()?;
            items.push(self.module_item(iattrs, istart)?);
        }
        self.expect_kw(Keyword::Endmodule)?;

        Ok(ModuleDecl {
            attrs,
            name,
            params,
            ports,
            items,
            span: self.span_from(start),
        })
    }

    fn port_list(&mut self) -> PResult<PortList> {
        if self.is_punct(")") {
            return Ok(PortList::Ansi(Vec::new()));
        }
        let ansi = matches!(
            self.peek(),
            TokenKind::Keyword(Keyword::Input | Keyword::Output | Keyword::Inout) | TokenKind::AttrOpen
        );
        if !ansi {
            let mut names = vec![self.ident()?];
            while self.eat_punct(",") {
                names.push(self.ident()?);
            }
            return Ok(PortList::NonAnsi(names));
        }

        let mut decls: Vec<PortDecl> = Vec::new();
        loop {
            let start = self.tok().span.start;
            let attrs = self.attributes()?;
            let mut decl = self.port_head(attrs)?;
            decl.names.push(self.ident()?);
            // Further names share the declaration until the next direction keyword.
            while self.is_punct(",") && matches!(self.peek_at(1), TokenKind::Ident(_)) {
                self.bump();
                decl.names.push(self.ident()?);
            }
            decl.span = self.span_from(start);
            decls.push(decl);
            if !self.eat_punct(",") {
                break;
            }
        }
        Ok(PortList::Ansi(decls))
    }

    fn port_head(&mut self, attrs: Attributes) -> PResult<PortDecl> {
        let start = self.tok().span.start;
        let dir = match self.peek() {
            TokenKind::Keyword(Keyword::Input) => Direction::Input,
            TokenKind::Keyword(Keyword::Output) => Direction::Output,
            TokenKind::Keyword(Keyword::Inout) => Direction::Inout,
            _ => return Err(self.unexpected("port direction")),
        };
        self.bump();
        let kind = if self.eat_kw(Keyword::Wire) {
            Some(NetKind::Wire)
        } else if self.eat_kw(Keyword::Reg) {
            Some(NetKind::Reg)
        } else if self.eat_kw(Keyword::Integer) {
            Some(NetKind::Integer)
        } else {
            None
        };
        let (signed, range) = self.signing_and_range()?;
        Ok(PortDecl {
            attrs,
            dir,
            kind,
            signed,
            range,
            names: Vec::new(),
            span: Span::new(start, start),
        })
    }

    fn signing_and_range(&mut self) -> PResult<(bool, Option<Range>)> {
        let signed = self.eat_kw(Keyword::Signed);
        let range = if self.is_punct("[") {
            Some(self.range()?)
        } else {
            None
        };
        Ok((signed, range))
    }

    fn range(&mut self) -> PResult<Range> {
        self.expect_punct("[")?;
        let msb = self.expr()?;
        self.expect_punct(":")?;
        let lsb = self.expr()?;
        self.expect_punct("]")?;
        Ok(Range { msb, lsb })
    }

    fn module_item(&mut self, attrs: Attributes, start: usize) -> PResult<ModuleItem> {
        match self.peek().clone() {
            TokenKind::Keyword(Keyword::Input | Keyword::Output | Keyword::Inout) => {
                let mut decl = self.port_head(attrs)?;
                decl.names.push(self.ident()?);
                while self.eat_punct(",") {
                    decl.names.push(self.ident()?);
                }
                self.expect_punct(";")?;
                decl.span = self.span_from(start);
                Ok(ModuleItem::Port(decl))
            }
            TokenKind::Keyword(k @ (Keyword::Wire | Keyword::Reg | Keyword::Integer)) => {
                self.bump();
                let kind = match k {
                    Keyword::Wire => NetKind::Wire,
                    Keyword::Reg => NetKind::Reg,
                    _ => NetKind::Integer,
                };
                let (signed, range) = if kind == NetKind::Integer {
                    (true, None)
                } else {
                    self.signing_and_range()?
                };
                let mut vars = Vec::new();
                loop {
                    let name = self.ident()?;
                    let mut dims = Vec::new();
                    while self.is_punct("[") {
                        dims.push(self.range()?);
                    }
                    let init = if self.eat_punct("=") {
                        Some(self.expr()?)
                    } else {
                        None
                    };
                    vars.push(Declarator { name, dims, init });
                    if !self.eat_punct(",") {
                        break;
                    }
                }
                self.expect_punct(";")?;
                Ok(ModuleItem::Decl(Declaration {
                    attrs,
                    kind,
                    signed,
                    range,
                    vars,
                    span: self.span_from(start),
                }))
            }
            TokenKind::Keyword(k @ (Keyword::Parameter | Keyword::Localparam)) => {
                self.bump();
                let (signed, range) = self.signing_and_range()?;
                let mut assigns = Vec::new();
                loop {
                    let name = self.ident()?;
                    self.expect_punct("=")?;
                    assigns.push((name, self.expr()?));
                    if !self.eat_punct(",") {
                        break;
                    }
                }
                self.expect_punct(";")?;
                Ok(ModuleItem::Param(ParamDecl {
                    local: k == Keyword::Localparam,
                    signed,
                    range,
                    assigns,
                    span: self.span_from(start),
                }))
            }
            TokenKind::Keyword(Keyword::Assign) => {
                self.bump();
                let mut assigns = Vec::new();
                loop {
                    let astart = self.tok().span.start;
                    let lhs = self.lvalue()?;
                    self.expect_punct("=")?;
                    let rhs = self.expr()?;
                    assigns.push(Assign {
                        lhs,
                        rhs,
                        span: self.span_from(astart),
                    });
                    if !self.eat_punct(",") {
                        break;
                    }
                }
                self.expect_punct(";")?;
                Ok(ModuleItem::ContinuousAssign(assigns, self.span_from(start)))
            }
            TokenKind::Keyword(Keyword::Always) => {
                self.bump();
                let event = if self.is_punct("@") {
                    Some(self.event_control()?)
                } else {
                    None
                };
                let body = self.statement()?;
                Ok(ModuleItem::Always(Always {
                    event,
                    body,
                    span: self.span_from(start),
                }))
            }
            TokenKind::Keyword(Keyword::Initial) => {
                self.bump();
                let body = self.statement()?;
                Ok(ModuleItem::Initial(body, self.span_from(start)))
            }
            TokenKind::Ident(_) => self.instantiation(attrs, start),
            _ => Err(self.unexpected("module item")),
        }
    }

    fn event_control(&mut self) -> PResult<EventControl> {
        self.expect_punct("@")?;
        if self.eat_punct("*") {
            return Ok(EventControl::Star);
        }
        self.expect_punct("(")?;
        // `@(*)` lexes as `(` followed by `*)`.
        if matches!(self.peek(), TokenKind::AttrClose) {
            self.bump();
            return Ok(EventControl::Star);
        }
        let mut events = Vec::new();
        loop {
            let edge = if self.eat_kw(Keyword::Posedge) {
                Edge::Pos
            } else if self.eat_kw(Keyword::Negedge) {
                Edge::Neg
            } else {
                Edge::Any
            };
            let expr = self.expr()?;
            events.push(Event { edge, expr });
            if !(self.eat_kw(Keyword::Or) || self.eat_punct(",")) {
                break;
            }
        }
        self.expect_punct(")")?;
        Ok(EventControl::Events(events))
    }

    fn instantiation(&mut self, attrs: Attributes, start: usize) -> PResult<ModuleItem> {
        let module = self.ident()?;
        let params = if self.eat_punct("#") {
            self.expect_punct("(")?;
            let conns = self.connections()?;
            self.expect_punct(")")?;
            conns
        } else {
            Vec::new()
        };
        let mut instances = Vec::new();
        loop {
            let name = self.ident()?;
            self.expect_punct("(")?;
            let ports = self.connections()?;
            self.expect_punct(")")?;
            instances.push(Instance { name, ports });
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(";")?;
        Ok(ModuleItem::Instantiation(Instantiation {
            attrs,
            module,
            params,
            instances,
            span: self.span_from(start),
        }))
    }

    fn connections(&mut self) -> PResult<Vec<Connection>> {
        let mut conns = Vec::new();
        if self.is_punct(")") {
            return Ok(conns);
        }
        loop {
            if self.eat_punct(".") {
                let name = self.ident()?;
                self.expect_punct("(")?;
                let expr = if self.is_punct(")") {
                    None
                } else {
                    Some(self.expr()?)
                };
                self.expect_punct(")")?;
                conns.push(Connection::Named(name, expr));
            } else {
                conns.push(Connection::Ordered(self.expr()?));
            }
            if !self.eat_punct(",") {
                return Ok(conns);
            }
        }
    }

    // Statements

    fn statement(&mut self) -> PResult<Statement> {
        let start = self.tok().span.start;
        let kind = match self.peek().clone() {
            TokenKind::Punct(";") => {
                self.bump();
                StatementKind::Null
            }
            TokenKind::Keyword(Keyword::Begin) => {
                self.bump();
                let label = if self.eat_punct(":") {
                    Some(self.ident()?)
                } else {
                    None
                };
                let mut stmts = Vec::new();
                while !self.is_kw(Keyword::End) {
                    stmts.push(self.statement()?);
                }
                self.expect_kw(Keyword::End)?;
                StatementKind::Block { label, stmts }
            }
            TokenKind::Keyword(Keyword::If) => {
                self.bump();
                self.expect_punct("(")?;
                let cond = self.expr()?;
                self.expect_punct(")")?;
                let then = Box::new(self.statement()?);
                let otherwise = if self.eat_kw(Keyword::Else) {
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };
                StatementKind::If {
                    cond,
                    then,
                    otherwise,
                }
            }
            TokenKind::Keyword(k @ (Keyword::Case | Keyword::Casex | Keyword::Casez)) => {
                self.bump();
                let kind = match k {
                    Keyword::Case => CaseKind::Case,
                    Keyword::Casex => CaseKind::Casex,
                    _ => CaseKind::Casez,
                };
                self.expect_punct("(")?;
                let cond = self.expr()?;
                self.expect_punct(")")?;
                let mut items = Vec::new();
                while !self.is_kw(Keyword::Endcase) {
                    let exprs = if self.eat_kw(Keyword::Default) {
                        self.eat_punct(":");
                        Vec::new()
                    } else {
                        let mut exprs = vec![self.expr()?];
                        while self.eat_punct(",") {
                            exprs.push(self.expr()?);
                        }
                        self.expect_punct(":")?;
                        exprs
                    };
                    let body = self.statement()?;
                    items.push(CaseItem { exprs, body });
                }
                self.expect_kw(Keyword::Endcase)?;
                StatementKind::Case { kind, cond, items }
            }
            TokenKind::Keyword(Keyword::For) => {
                self.bump();
                self.expect_punct("(")?;
                let init = self.blocking_assign()?;
                self.expect_punct(";")?;
                let cond = self.expr()?;
                self.expect_punct(";")?;
                let step = self.blocking_assign()?;
                self.expect_punct(")")?;
                let body = Box::new(self.statement()?);
                StatementKind::For {
                    init,
                    cond,
                    step,
                    body,
                }
            }
            TokenKind::Keyword(Keyword::While) => {
                self.bump();
                self.expect_punct("(")?;
                let cond = self.expr()?;
                self.expect_punct(")")?;
                let body = Box::new(self.statement()?);
                StatementKind::While { cond, body }
            }
            TokenKind::Keyword(Keyword::Repeat) => {
                self.bump();
                self.expect_punct("(")?;
                let count = self.expr()?;
                self.expect_punct(")")?;
                let body = Box::new(self.statement()?);
                StatementKind::Repeat { count, body }
            }
            TokenKind::SystemIdent(name) => {
                let span = self.bump().span;
                let mut args = Vec::new();
                if self.eat_punct("(") {
                    if !self.is_punct(")") {
                        args.push(self.expr()?);
                        while self.eat_punct(",") {
                            args.push(self.expr()?);
                        }
                    }
                    self.expect_punct(")")?;
                }
                self.expect_punct(";")?;
                StatementKind::SystemTask {
                    name: Ident::new(name, span),
                    args,
                }
            }
            TokenKind::Punct("@") | TokenKind::Punct("#") => {
                let span = self.tok().span;
                return Err(self.error_at(span, "timing controls inside statements are not supported"));
            }
            TokenKind::Ident(_) | TokenKind::Punct("{") => {
                let lhs = self.lvalue()?;
                let nonblocking = if self.eat_punct("<=") {
                    true
                } else {
                    self.expect_punct("=")?;
                    false
                };
                let rhs = self.expr()?;
                self.expect_punct(";")?;
                let assign = Assign {
                    lhs,
                    rhs,
                    span: self.span_from(start),
                };
                if nonblocking {
                    StatementKind::Nonblocking(assign)
                } else {
                    StatementKind::Blocking(assign)
                }
            }
            _ => return Err(self.unexpected("statement")),
        };
        Ok(Statement {
            kind,
            span: self.span_from(start),
        })
    }

    fn blocking_assign(&mut self) -> PResult<Assign> {
        let start = self.tok().span.start;
        let lhs = self.lvalue()?;
        self.expect_punct("=")?;
        let rhs = self.expr()?;
        Ok(Assign {
            lhs,
            rhs,
            span: self.span_from(start),
        })
    }

    fn lvalue(&mut self) -> PResult<Expr> {
        let start = self.tok().span.start;
        if self.eat_punct("{") {
            let mut parts = vec![self.lvalue()?];
            while self.eat_punct(",") {
                parts.push(self.lvalue()?);
            }
            self.expect_punct("}")?;
            return Ok(Expr::new(ExprKind::Concat(parts), self.span_from(start)));
        }
        let r = self.ident_ref()?;
        Ok(Expr::new(ExprKind::Ident(r), self.span_from(start)))
    }

    // Expressions

    pub(crate) fn expr(&mut self) -> PResult<Expr> {
        let start = self.tok().span.start;
        let cond = self.binary(1)?;
        if self.eat_punct("?") {
            let then = self.expr()?;
            self.expect_punct(":")?;
            let otherwise = self.expr()?;
            return Ok(Expr::new(
                ExprKind::Ternary(Box::new(cond), Box::new(then), Box::new(otherwise)),
                self.span_from(start),
            ));
        }
        Ok(cond)
    }

    fn binary_op(&self) -> Option<BinaryOp> {
        match self.peek() {
            TokenKind::Punct(p) => BinaryOp::from_punct(p),
            _ => None,
        }
    }

    fn binary(&mut self, min_prec: u8) -> PResult<Expr> {
        let start = self.tok().span.start;
        let mut lhs = self.unary()?;
        while let Some(op) = self.binary_op() {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.bump();
            let rhs = self.binary(prec + 1)?;
            lhs = Expr::new(
                ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)),
                self.span_from(start),
            );
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> PResult<Expr> {
        let start = self.tok().span.start;
        let op = match self.peek() {
            TokenKind::Punct("+") => Some(UnaryOp::Plus),
            TokenKind::Punct("-") => Some(UnaryOp::Minus),
            TokenKind::Punct("!") => Some(UnaryOp::Not),
            TokenKind::Punct("~") => Some(UnaryOp::BitNot),
            TokenKind::Punct("&") => Some(UnaryOp::RedAnd),
            TokenKind::Punct("~&") => Some(UnaryOp::RedNand),
            TokenKind::Punct("|") => Some(UnaryOp::RedOr),
            TokenKind::Punct("~|") => Some(UnaryOp::RedNor),
            TokenKind::Punct("^") => Some(UnaryOp::RedXor),
            TokenKind::Punct("~^" | "^~") => Some(UnaryOp::RedXnor),
            _ => None,
        };
        match op {
            Some(op) => {
                self.bump();
                let arg = self.unary()?;
                Ok(Expr::new(
                    ExprKind::Unary(op, Box::new(arg)),
                    self.span_from(start),
                ))
            }
            None => self.primary(),
        }
    }

    fn primary(&mut self) -> PResult<Expr> {
        let start = self.tok().span.start;
        let kind = match self.peek().clone() {
            TokenKind::Number(n) => {
                self.bump();
                ExprKind::Number(n)
            }
            TokenKind::Str(s) => {
                self.bump();
                ExprKind::Str(s)
            }
            TokenKind::SystemIdent(name) => {
                let span = self.bump().span;
                if self.eat_punct("(") {
                    self.expect_punct(")")?;
                }
                ExprKind::SystemCall(Ident::new(name, span))
            }
            TokenKind::Punct("(") => {
                self.bump();
                let inner = self.expr()?;
                self.expect_punct(")")?;
                ExprKind::Paren(Box::new(inner))
            }
            TokenKind::Punct("{") => {
                self.bump();
                let first = self.expr()?;
                if self.eat_punct("{") {
                    let mut parts = vec![self.expr()?];
                    while self.eat_punct(",") {
                        parts.push(self.expr()?);
                    }
                    self.expect_punct("}")?;
                    self.expect_punct("}")?;
                    ExprKind::Replicate(Box::new(first), parts)
                } else {
                    let mut parts = vec![first];
                    while self.eat_punct(",") {
                        parts.push(self.expr()?);
                    }
                    self.expect_punct("}")?;
                    ExprKind::Concat(parts)
                }
            }
            TokenKind::Ident(_) => ExprKind::Ident(self.ident_ref()?),
            _ => return Err(self.unexpected("expression")),
        };
        Ok(Expr::new(kind, self.span_from(start)))
    }

    fn ident_ref(&mut self) -> PResult<IdentRef> {
        let mut parts = vec![self.ident()?];
        while self.eat_punct(".") {
            parts.push(self.ident()?);
        }
        let mut indices = Vec::new();
        let mut range = None;
        while self.is_punct("[") {
            let bracket = self.bump().span;
            if range.is_some() {
                return Err(self.error_at(bracket, "no selects may follow a part select"));
            }
            let first = self.expr()?;
            if self.eat_punct(":") {
                let lsb = self.expr()?;
                range = Some(RangeSelect::Part(Box::new(first), Box::new(lsb)));
            } else if self.eat_punct("+:") {
                let width = self.expr()?;
                range = Some(RangeSelect::Up(Box::new(first), Box::new(width)));
            } else if self.eat_punct("-:") {
                let width = self.expr()?;
                range = Some(RangeSelect::Down(Box::new(first), Box::new(width)));
            } else {
                indices.push(first);
            }
            self.expect_punct("]")?;
        }
        Ok(IdentRef {
            parts,
            indices,
            range,
        })
    }
}
