//! Tokenizer for the supported Verilog subset.

use std::fmt;

use cascade_core::bits::Bits;

use crate::source::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Module,
    Endmodule,
    Input,
    Output,
    Inout,
    Wire,
    Reg,
    Integer,
    Signed,
    Parameter,
    Localparam,
    Assign,
    Always,
    Initial,
    Begin,
    End,
    If,
    Else,
    Case,
    Casex,
    Casez,
    Endcase,
    Default,
    For,
    While,
    Repeat,
    Posedge,
    Negedge,
    Or,
}

impl Keyword {
    fn lookup(word: &str) -> Option<Keyword> {
        Some(match word {
            "module" => Keyword::Module,
            "endmodule" => Keyword::Endmodule,
            "input" => Keyword::Input,
            "output" => Keyword::Output,
            "inout" => Keyword::Inout,
            "wire" => Keyword::Wire,
            "reg" => Keyword::Reg,
            "integer" => Keyword::Integer,
            "signed" => Keyword::Signed,
            "parameter" => Keyword::Parameter,
            "localparam" => Keyword::Localparam,
            "assign" => Keyword::Assign,
            "always" => Keyword::Always,
            "initial" => Keyword::Initial,
            "begin" => Keyword::Begin,
            "end" => Keyword::End,
            "if" => Keyword::If,
            "else" => Keyword::Else,
            "case" => Keyword::Case,
            "casex" => Keyword::Casex,
            "casez" => Keyword::Casez,
            "endcase" => Keyword::Endcase,
            "default" => Keyword::Default,
            "for" => Keyword::For,
            "while" => Keyword::While,
            "repeat" => Keyword::Repeat,
            "posedge" => Keyword::Posedge,
            "negedge" => Keyword::Negedge,
            "or" => Keyword::Or,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Module => "module",
            Keyword::Endmodule => "endmodule",
            Keyword::Input => "input",
            Keyword::Output => "output",
            Keyword::Inout => "inout",
            Keyword::Wire => "wire",
            Keyword::Reg => "reg",
            Keyword::Integer => "integer",
            Keyword::Signed => "signed",
            Keyword::Parameter => "parameter",
            Keyword::Localparam => "localparam",
            Keyword::Assign => "assign",
            Keyword::Always => "always",
            Keyword::Initial => "initial",
            Keyword::Begin => "begin",
            Keyword::End => "end",
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::Case => "case",
            Keyword::Casex => "casex",
            Keyword::Casez => "casez",
            Keyword::Endcase => "endcase",
            Keyword::Default => "default",
            Keyword::For => "for",
            Keyword::While => "while",
            Keyword::Repeat => "repeat",
            Keyword::Posedge => "posedge",
            Keyword::Negedge => "negedge",
            Keyword::Or => "or",
        }
    }
}

/// A numeric literal as written: an optional size, a base and its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberLit {
    pub size: Option<usize>,
    pub signed: bool,
    /// 2, 8, 10 or 16. Plain decimals have no base marker.
    pub radix: u32,
    pub based: bool,
    pub value: Bits,
}

impl NumberLit {
    /// Width and signedness the literal evaluates at.
    pub fn width(&self) -> usize {
        self.size.unwrap_or(32)
    }

    pub fn is_signed(&self) -> bool {
        self.signed || !self.based
    }

    /// The literal's value at its evaluation width.
    pub fn bits(&self) -> Bits {
        let mut v = self.value.clone();
        v.set_signed(false);
        v.resize(self.width());
        v.with_signed(self.is_signed())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    /// `$display`, `$time`: stored without the dollar sign.
    SystemIdent(String),
    Keyword(Keyword),
    Number(NumberLit),
    Str(String),
    /// `` `include `` and friends, stored without the backtick.
    Directive(String),
    /// `(*`
    AttrOpen,
    /// `*)`
    AttrClose,
    Punct(&'static str),
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(s) => write!(f, "identifier `{s}`"),
            TokenKind::SystemIdent(s) => write!(f, "`${s}`"),
            TokenKind::Keyword(k) => write!(f, "`{}`", k.as_str()),
            TokenKind::Number(_) => write!(f, "number"),
            TokenKind::Str(_) => write!(f, "string"),
            TokenKind::Directive(d) => write!(f, "`{d}"),
            TokenKind::AttrOpen => write!(f, "`(*`"),
            TokenKind::AttrClose => write!(f, "`*)`"),
            TokenKind::Punct(p) => write!(f, "`{p}`"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Failure while tokenizing. `incomplete` marks input that ended inside a
/// comment or string and may become valid with more text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub span: Span,
    pub incomplete: bool,
}

// Longest first so that maximal munch falls out of a linear scan.
const PUNCTS: &[&str] = &[
    "<<<", ">>>", "===", "!==", "**", "==", "!=", "<=", ">=", "&&", "||", "<<", ">>", "~&", "~|",
    "~^", "^~", "+:", "-:", "+", "-", "*", "/", "%", "!", "~", "&", "|", "^", "<", ">", "=", "?",
    ":", ";", ",", ".", "(", ")", "[", "]", "{", "}", "@", "#",
];

pub struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    /// Tokenize the whole input. The result always ends with `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let done = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<u8> {
        self.bytes.get(self.pos + n).copied()
    }

    fn error(&self, message: impl Into<String>, start: usize, incomplete: bool) -> LexError {
        LexError {
            message: message.into(),
            span: Span::new(start, self.pos.max(start + 1).min(self.src.len().max(start))),
            incomplete,
        }
    }

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_ascii_whitespace() => self.pos += 1,
                (Some(b'/'), Some(b'/')) => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                (Some(b'/'), Some(b'*')) => {
                    let start = self.pos;
                    self.pos += 2;
                    loop {
                        match (self.peek(), self.peek_at(1)) {
                            (Some(b'*'), Some(b'/')) => {
                                self.pos += 2;
                                break;
                            }
                            (Some(_), _) => self.pos += 1,
                            (None, _) => {
                                return Err(self.error("unterminated block comment", start, true))
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia()?;
        let start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                span: Span::new(start, start),
            });
        };

        let kind = match c {
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                let word = self.take_word();
                match Keyword::lookup(word) {
                    Some(k) => TokenKind::Keyword(k),
                    None => TokenKind::Ident(word.to_string()),
                }
            }
            b'$' => {
                self.pos += 1;
                let word = self.take_word();
                if word.is_empty() {
                    return Err(self.error("expected system task name after `$`", start, false));
                }
                TokenKind::SystemIdent(word.to_string())
            }
            b'`' => {
                self.pos += 1;
                let word = self.take_word();
                if word.is_empty() {
                    return Err(self.error("expected directive name after backtick", start, false));
                }
                TokenKind::Directive(word.to_string())
            }
            b'"' => TokenKind::Str(self.take_string()?),
            b'0'..=b'9' | b'\'' => TokenKind::Number(self.take_number()?),
            b'(' if self.peek_at(1) == Some(b'*') && self.peek_at(2) != Some(b')') => {
                self.pos += 2;
                TokenKind::AttrOpen
            }
            b'*' if self.peek_at(1) == Some(b')') => {
                self.pos += 2;
                TokenKind::AttrClose
            }
            _ => {
                let rest = &self.src[self.pos..];
                match PUNCTS.iter().find(|p| rest.starts_with(**p)) {
                    Some(p) => {
                        self.pos += p.len();
                        TokenKind::Punct(p)
                    }
                    None => {
                        let ch = rest.chars().next().unwrap_or('?');
                        self.pos += ch.len_utf8();
                        return Err(self.error(format!("unexpected character '{ch}'"), start, false));
                    }
                }
            }
        };

        Ok(Token {
            kind,
            span: Span::new(start, self.pos),
        })
    }

    fn take_word(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' || c == b'$' {
                self.pos += 1;
            } else {
                break;
            }
        }
        &self.src[start..self.pos]
    }

    fn take_string(&mut self) -> Result<String, LexError> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(self.error("unterminated string literal", start, true));
            };
            match c {
                b'"' => {
                    self.pos += 1;
                    return Ok(out);
                }
                b'\n' => return Err(self.error("newline in string literal", start, false)),
                b'\\' => {
                    self.pos += 1;
                    let Some(e) = self.peek() else {
                        return Err(self.error("unterminated string literal", start, true));
                    };
                    self.pos += 1;
                    match e {
                        b'n' => out.push('\n'),
                        b't' => out.push('\t'),
                        b'\\' => out.push('\\'),
                        b'"' => out.push('"'),
                        other => {
                            out.push('\\');
                            out.push(other as char);
                        }
                    }
                }
                _ => {
                    let ch = self.src[self.pos..].chars().next().unwrap_or('?');
                    out.push(ch);
                    self.pos += ch.len_utf8();
                }
            }
        }
    }

    fn take_digits(&mut self, allow: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if allow(c) || c == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        &self.src[start..self.pos]
    }

    fn skip_spaces(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
    }

    fn take_number(&mut self) -> Result<NumberLit, LexError> {
        let start = self.pos;
        let mut size = None;

        if self.peek() != Some(b'\'') {
            let digits = self.take_digits(|c| c.is_ascii_digit());
            let value = Bits::parse_radix(digits, 10)
                .map_err(|e| self.error(e.to_string(), start, false))?;

            let save = self.pos;
            self.skip_spaces();
            if self.peek() != Some(b'\'') {
                self.pos = save;
                return Ok(NumberLit {
                    size: None,
                    signed: true,
                    radix: 10,
                    based: false,
                    value,
                });
            }
            let n = value.to_usize();
            if n == 0 {
                return Err(self.error("literal size must be positive", start, false));
            }
            if n > Bits::MAX_WIDTH {
                return Err(self.error(
                    format!("literal size exceeds {} bits", Bits::MAX_WIDTH),
                    start,
                    false,
                ));
            }
            size = Some(n);
        }

        // At the apostrophe of a based literal.
        self.pos += 1;
        let signed = matches!(self.peek(), Some(b's' | b'S'));
        if signed {
            self.pos += 1;
        }
        let radix = match self.peek() {
            Some(b'b' | b'B') => 2,
            Some(b'o' | b'O') => 8,
            Some(b'd' | b'D') => 10,
            Some(b'h' | b'H') => 16,
            _ => return Err(self.error("expected base specifier after '", start, false)),
        };
        self.pos += 1;
        self.skip_spaces();
        let digits = self.take_digits(|c| c.is_ascii_hexdigit());
        if digits.is_empty() {
            return Err(self.error("expected digits in based literal", start, false));
        }
        let mut value = Bits::parse_radix(digits, radix)
            .map_err(|e| self.error(e.to_string(), start, false))?;
        if let Some(n) = size {
            value.resize(n);
        }
        Ok(NumberLit {
            size,
            signed,
            radix,
            based: true,
            value,
        })
    }
}

/// Tokenize `src`.
pub fn tokenize(src: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(src).tokenize()
}
