//! Recursive-descent reader for hrw4u source form.

use crate::error::{Diagnostic, Translation};
use crate::ir::*;
use crate::traits::{Context, ReadError, Reader};

/// Static instance of the hrw4u reader for registry.
pub static HRW4U_READER: Hrw4uReader = Hrw4uReader;

pub struct Hrw4uReader;

impl Reader for Hrw4uReader {
    fn format(&self) -> &'static str {
        "hrw4u"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["hrw4u"]
    }

    fn read(&self, source: &str, ctx: &Context<'_>) -> Translation<Program> {
        match read_hrw4u(source) {
            Ok(program) => Translation::new(program, Vec::new()),
            Err(err) => {
                let span = err.span();
                Translation::new(
                    Program::default(),
                    vec![Diagnostic::new(ctx.filename, Some(span), err.into())],
                )
            }
        }
    }
}

/// Parse hrw4u source into the IR. Stops at the first syntax error.
pub fn read_hrw4u(source: &str) -> Result<Program, ReadError> {
    let mut ctx = ReadContext::new(source);
    ctx.read_program()
}

const KEYWORDS: &[&str] = &[
    "if", "elif", "else", "in", "with", "and", "or", "break", "true", "false",
];

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '@'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '@')
}

/// Whether `text` reads back as a single identifier.
pub(crate) fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars.next().is_some_and(is_ident_start)
        && chars.all(is_ident_char)
        && !KEYWORDS.contains(&text)
}

fn is_number_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | ':' | '/')
}

struct ReadContext {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl ReadContext {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    // Cursor

    fn span(&self) -> Span {
        Span::new(self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else if c == '#' || (c == '/' && self.peek_at(1) == Some('/')) {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    fn at_eof(&mut self) -> bool {
        self.skip_trivia();
        self.peek().is_none()
    }

    fn looking_at(&mut self, text: &str) -> bool {
        self.skip_trivia();
        text.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
    }

    /// Consume `text` if it is next.
    fn eat(&mut self, text: &str) -> bool {
        if self.looking_at(text) {
            for _ in text.chars() {
                self.bump();
            }
            true
        } else {
            false
        }
    }

    fn looking_at_keyword(&mut self, keyword: &str) -> bool {
        self.looking_at(keyword)
            && !self
                .peek_at(keyword.chars().count())
                .is_some_and(is_ident_char)
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.looking_at_keyword(keyword) {
            for _ in keyword.chars() {
                self.bump();
            }
            true
        } else {
            false
        }
    }

    fn expect(&mut self, text: &str) -> Result<(), ReadError> {
        if self.eat(text) {
            Ok(())
        } else {
            Err(self.unexpected(format!("'{text}'")))
        }
    }

    fn unexpected(&mut self, expected: impl Into<String>) -> ReadError {
        self.skip_trivia();
        let span = self.span();
        let expected = expected.into();
        match self.peek() {
            None => ReadError::UnexpectedEof { expected, span },
            Some(_) => {
                let got: String = self.chars[self.pos..]
                    .iter()
                    .take_while(|c| !c.is_whitespace())
                    .take(20)
                    .collect();
                ReadError::Unexpected {
                    expected,
                    got,
                    span,
                }
            }
        }
    }

    // Tokens

    fn ident(&mut self, what: &str) -> Result<(String, Span), ReadError> {
        self.skip_trivia();
        let span = self.span();
        if !self.peek().is_some_and(is_ident_start) {
            return Err(self.unexpected(what));
        }
        let mut name = String::new();
        while let Some(c) = self.peek().filter(|c| is_ident_char(*c)) {
            name.push(c);
            self.bump();
        }
        if KEYWORDS.contains(&name.as_str()) {
            return Err(ReadError::Unexpected {
                expected: what.to_string(),
                got: name,
                span,
            });
        }
        Ok((name, span))
    }

    /// Read up to an unescaped `close`, returning the raw contents.
    fn delimited(&mut self, close: char, what: &'static str) -> Result<String, ReadError> {
        let span = self.span();
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                None | Some('\n') if close != '}' => {
                    return Err(ReadError::Unterminated { what, span });
                }
                None => return Err(ReadError::Unterminated { what, span }),
                Some('\\') => {
                    text.push('\\');
                    if let Some(c) = self.bump() {
                        text.push(c);
                    }
                }
                Some(c) if c == close => return Ok(text),
                Some(c) => text.push(c),
            }
        }
    }

    fn value(&mut self) -> Result<Value, ReadError> {
        self.skip_trivia();
        match self.peek() {
            Some('"') => Ok(Value::Str(self.delimited('"', "string")?)),
            Some(c)
                if c.is_ascii_digit()
                    || (c == '-' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit())) =>
            {
                let mut text = String::new();
                text.push(c);
                self.bump();
                while let Some(c) = self.peek().filter(|c| is_number_char(*c)) {
                    text.push(c);
                    self.bump();
                }
                Ok(Value::Number(text))
            }
            _ if self.eat_keyword("true") => Ok(Value::Bool(true)),
            _ if self.eat_keyword("false") => Ok(Value::Bool(false)),
            Some(c) if is_ident_start(c) => Ok(Value::Ident(self.ident("a value")?.0)),
            _ => Err(self.unexpected("a value")),
        }
    }

    fn values_until(&mut self, close: &str) -> Result<Vec<Value>, ReadError> {
        let mut values = Vec::new();
        if self.eat(close) {
            return Ok(values);
        }
        loop {
            values.push(self.value()?);
            if self.eat(close) {
                return Ok(values);
            }
            self.expect(",")?;
        }
    }

    fn modifiers(&mut self) -> Result<Vec<String>, ReadError> {
        let mut mods = vec![self.ident("a modifier")?.0];
        while self.eat(",") {
            mods.push(self.ident("a modifier")?.0);
        }
        Ok(mods)
    }

    // Program structure

    fn read_program(&mut self) -> Result<Program, ReadError> {
        let mut program = Program::default();
        while !self.at_eof() {
            if self.looking_at_keyword("VARS") {
                let span = self.span();
                self.eat_keyword("VARS");
                self.read_vars(&mut program.vars)?;
                program.vars_span = Some(span);
            } else {
                program.sections.push(self.read_section()?);
            }
        }
        Ok(program)
    }

    fn read_vars(&mut self, vars: &mut Vec<VarDecl>) -> Result<(), ReadError> {
        self.expect("{")?;
        while !self.eat("}") {
            let (name, span) = self.ident("a variable name")?;
            self.expect(":")?;
            let (ty, _) = self.ident("a type name")?;
            let slot = if self.eat("@") {
                let start = self.span();
                let mut digits = String::new();
                while let Some(c) = self.peek().filter(char::is_ascii_digit) {
                    digits.push(c);
                    self.bump();
                }
                Some(digits.parse().map_err(|_| ReadError::Unexpected {
                    expected: "a slot number".into(),
                    got: digits.clone(),
                    span: start,
                })?)
            } else {
                None
            };
            self.expect(";")?;
            vars.push(VarDecl {
                name,
                ty,
                slot,
                span,
            });
        }
        Ok(())
    }

    fn read_section(&mut self) -> Result<Section, ReadError> {
        let (name, span) = self.ident("a section name")?;
        let body = self.read_block()?;
        Ok(Section { name, body, span })
    }

    fn read_block(&mut self) -> Result<Vec<Stmt>, ReadError> {
        self.expect("{")?;
        let mut body = Vec::new();
        while !self.eat("}") {
            if self.at_eof() {
                return Err(self.unexpected("'}'"));
            }
            body.push(self.read_stmt()?);
        }
        Ok(body)
    }

    fn read_stmt(&mut self) -> Result<Stmt, ReadError> {
        self.skip_trivia();
        let span = self.span();
        if self.eat_keyword("if") {
            return self.read_conditional(span).map(Stmt::If);
        }
        if self.eat_keyword("break") {
            self.expect(";")?;
            return Ok(Stmt::Break { span });
        }
        let (name, span) = self.ident("a statement")?;
        if self.eat("(") {
            let args = self.values_until(")")?;
            let modifiers = if self.eat_keyword("with") {
                self.modifiers()?
            } else {
                Vec::new()
            };
            self.expect(";")?;
            return Ok(Stmt::Call {
                name,
                args,
                modifiers,
                span,
            });
        }
        let op = if self.eat("+=") {
            Some(AssignOp::Add)
        } else if !self.looking_at("==") && self.eat("=") {
            Some(AssignOp::Set)
        } else {
            None
        };
        match op {
            Some(op) => {
                let value = self.value()?;
                self.expect(";")?;
                Ok(Stmt::Assign {
                    target: name,
                    op,
                    value,
                    span,
                })
            }
            None => {
                self.expect(";")?;
                Ok(Stmt::Bare { name, span })
            }
        }
    }

    fn read_conditional(&mut self, span: Span) -> Result<Conditional, ReadError> {
        let mut branches = vec![self.read_branch(span)?];
        let mut otherwise = None;
        loop {
            self.skip_trivia();
            let span = self.span();
            if self.eat_keyword("elif") {
                branches.push(self.read_branch(span)?);
            } else if self.eat_keyword("else") {
                otherwise = Some(self.read_block()?);
                break;
            } else {
                break;
            }
        }
        Ok(Conditional {
            branches,
            otherwise,
            span,
        })
    }

    fn read_branch(&mut self, span: Span) -> Result<Branch, ReadError> {
        let condition = self.read_expr()?;
        let body = self.read_block()?;
        Ok(Branch {
            condition,
            body,
            span,
        })
    }

    // Expressions

    fn read_expr(&mut self) -> Result<Expr, ReadError> {
        let mut lhs = self.read_and()?;
        while self.eat("||") || self.eat_keyword("or") {
            lhs = Expr::or(lhs, self.read_and()?);
        }
        Ok(lhs)
    }

    fn read_and(&mut self) -> Result<Expr, ReadError> {
        let mut lhs = self.read_unary()?;
        while self.eat("&&") || self.eat_keyword("and") {
            lhs = Expr::and(lhs, self.read_unary()?);
        }
        Ok(lhs)
    }

    fn read_unary(&mut self) -> Result<Expr, ReadError> {
        if self.eat("!") {
            return Ok(Expr::not(self.read_unary()?));
        }
        if self.eat("(") {
            let inner = self.read_expr()?;
            self.expect(")")?;
            return Ok(Expr::group(inner));
        }
        if self.eat_keyword("true") {
            return Ok(Expr::Bool(true));
        }
        if self.eat_keyword("false") {
            return Ok(Expr::Bool(false));
        }
        self.read_term()
    }

    fn read_compare_op(&mut self) -> Option<CompareOp> {
        const OPS: &[(&str, CompareOp)] = &[
            ("==", CompareOp::Eq),
            ("!=", CompareOp::Ne),
            ("!~", CompareOp::NotMatch),
            (">=", CompareOp::Ge),
            ("<=", CompareOp::Le),
            (">", CompareOp::Gt),
            ("<", CompareOp::Lt),
            ("~", CompareOp::Match),
        ];
        for (text, op) in OPS {
            if self.eat(text) {
                return Some(*op);
            }
        }
        self.eat_keyword("in").then_some(CompareOp::In)
    }

    fn read_term(&mut self) -> Result<Expr, ReadError> {
        let (name, span) = self.ident("a condition")?;
        let args = if self.eat("(") {
            Some(self.values_until(")")?)
        } else {
            None
        };
        let Some(op) = self.read_compare_op() else {
            if self.looking_at_keyword("with") {
                return Err(self.unexpected("a comparison before 'with'"));
            }
            return Ok(match args {
                Some(args) => Expr::Call { name, args, span },
                None => Expr::Ident { name, span },
            });
        };
        let rhs = self.read_rhs()?;
        let modifiers = if self.eat_keyword("with") {
            self.modifiers()?
        } else {
            Vec::new()
        };
        let lhs = match args {
            Some(args) => Operand::Call { name, args },
            None => Operand::Ident(name),
        };
        Ok(Expr::Compare(Box::new(Comparison {
            lhs,
            op,
            rhs,
            modifiers,
            span,
        })))
    }

    fn read_rhs(&mut self) -> Result<Rhs, ReadError> {
        self.skip_trivia();
        match self.peek() {
            Some('/') => {
                let body = self.delimited('/', "regular expression")?;
                Ok(Rhs::Regex(format!("/{body}/")))
            }
            Some('[') => {
                self.bump();
                Ok(Rhs::Set(self.values_until("]")?))
            }
            Some('{') => {
                let body = self.delimited('}', "IP range")?;
                Ok(Rhs::IpRange(
                    body.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect(),
                ))
            }
            _ => self.value().map(Rhs::Value),
        }
    }
}
