//! Inverse compiler: header_rewrite directives back to hrw4u IR.
//!
//! Input is split into rule blocks on blank lines. A block whose first line
//! is a hook condition belongs to that hook's section; any other block takes
//! the configured default section. Within a block a small state machine
//! rebuilds `if`/`elif`/`else`:
//!
//! | State | condition line | operator line |
//! |-------|----------------|---------------|
//! | outside | buffer | open `if` (or plain statement) |
//! | in branch | close, buffer | append |
//! | elif pending | buffer | open `elif` |
//! | in else | close, buffer | append |
//!
//! Buffered terms are folded to the right by their connectors, matching the
//! engine's evaluation order.

use crate::error::{Diagnostic, Error, Translation};
use crate::ir::*;
use crate::reverse::fallback_symbol;
use crate::sections::SectionType;
use crate::state::{CondState, Connector, OperatorState};
use crate::tables::TableKind;
use crate::traits::{Context, Reader};
use crate::vars::{VarType, VariableSlot};
use regex::{Captures, Regex};
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Static instance of the directives reader for registry.
pub static DIRECTIVES_READER: DirectivesReader = DirectivesReader;

pub struct DirectivesReader;

impl Reader for DirectivesReader {
    fn format(&self) -> &'static str {
        "header_rewrite"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["config", "conf"]
    }

    fn read(&self, source: &str, ctx: &Context<'_>) -> Translation<Program> {
        let lines: Vec<&str> = source.lines().collect();
        read_directives(&lines, ctx)
    }
}

/// Rebuild a program from directive lines.
pub fn read_directives<S: AsRef<str>>(lines: &[S], ctx: &Context<'_>) -> Translation<Program> {
    let mut decompiler = Decompiler::new(*ctx);
    for block in split_blocks(lines) {
        decompiler.block(&block);
    }
    decompiler.finish()
}

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%\{([A-Z0-9_-]+)(?::([^}]*))?\}").expect("static regex")
});

/// Numbered lines of each blank-line separated block, comments dropped.
fn split_blocks<S: AsRef<str>>(lines: &[S]) -> Vec<Vec<(usize, &str)>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let text = line.as_ref().trim();
        if text.is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else if !text.starts_with('#') {
            current.push((i + 1, text));
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

// Line syntax

#[derive(Debug, Clone, PartialEq)]
struct CondLine {
    tag: String,
    arg: Option<String>,
    operand: Option<String>,
    state: CondState,
}

#[derive(Debug, Clone, PartialEq)]
struct OpLine {
    command: String,
    args: Vec<String>,
    flags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Line {
    Hook(SectionType),
    GroupOpen,
    GroupEnd(CondState),
    Condition(CondLine),
    If,
    Elif,
    Else,
    Endif,
    Operator(OpLine),
}

/// Split a trailing ` [A,B]` flag list off a line.
fn split_flags(text: &str) -> (&str, Vec<String>) {
    let text = text.trim();
    if let Some(body) = text.strip_suffix(']')
        && let Some(open) = body.rfind('[')
        && (open == 0 || body[..open].ends_with(char::is_whitespace))
    {
        let inner = &body[open + 1..];
        if !inner.is_empty()
            && inner
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, ',' | '_' | ' '))
        {
            let flags = inner
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(String::from)
                .collect();
            return (body[..open].trim_end(), flags);
        }
    }
    (text, Vec::new())
}

/// Whitespace-separated tokens, keeping quoted strings whole.
fn tokenize(text: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut token = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() {
                break;
            }
            chars.next();
            token.push(c);
            if c == '"' {
                let mut closed = false;
                while let Some(c) = chars.next() {
                    token.push(c);
                    if c == '\\' {
                        if let Some(escaped) = chars.next() {
                            token.push(escaped);
                        }
                    } else if c == '"' {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err("unterminated string".into());
                }
            }
        }
        tokens.push(token);
    }
    Ok(tokens)
}

fn parse_line(text: &str) -> Result<Line, String> {
    match text {
        "if" => return Ok(Line::If),
        "elif" => return Ok(Line::Elif),
        "else" => return Ok(Line::Else),
        "endif" => return Ok(Line::Endif),
        _ => {}
    }
    let (body, flags) = split_flags(text);
    if let Some(rest) = body.strip_prefix("cond").filter(|r| r.starts_with(char::is_whitespace)) {
        let rest = rest.trim_start();
        let inner = rest
            .strip_prefix("%{")
            .ok_or_else(|| "expected %{...} after 'cond'".to_string())?;
        let close = inner
            .find('}')
            .ok_or_else(|| "unterminated %{...}".to_string())?;
        let reference = &inner[..close];
        let operand = inner[close + 1..].trim();
        let state =
            CondState::from_flags(&flags).map_err(|f| format!("unknown condition flag '{f}'"))?;
        if reference == "GROUP" {
            return Ok(Line::GroupOpen);
        }
        if reference == "GROUP:END" {
            return Ok(Line::GroupEnd(state));
        }
        if let Some(section) = SectionType::from_hook(reference) {
            return Ok(Line::Hook(section));
        }
        let (tag, arg) = match reference.split_once(':') {
            Some((tag, arg)) => (tag.to_string(), Some(arg.to_string())),
            None => (reference.to_string(), None),
        };
        return Ok(Line::Condition(CondLine {
            tag,
            arg,
            operand: (!operand.is_empty()).then(|| operand.to_string()),
            state,
        }));
    }
    let mut tokens = tokenize(body)?.into_iter();
    let command = tokens.next().ok_or_else(|| "empty directive".to_string())?;
    Ok(Line::Operator(OpLine {
        command,
        args: tokens.collect(),
        flags,
    }))
}

/// Split a `("a","b")` set body on commas outside quotes.
fn split_set(inner: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in inner.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            ',' if !quoted => items.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        items.push(current.trim().to_string());
    }
    items
}

/// Parse a slot number, which must lie in the bank of `ty`.
fn slot(ty: VarType, text: &str) -> Result<usize, String> {
    let index: usize = text
        .trim()
        .parse()
        .map_err(|_| format!("invalid slot '{text}'"))?;
    if index >= ty.slots() {
        return Err(format!(
            "slot {index} out of range, {ty} has slots 0 to {}",
            ty.slots() - 1
        ));
    }
    Ok(index)
}

fn is_number(token: &str) -> bool {
    let digits = token.strip_prefix('-').unwrap_or(token);
    digits.starts_with(|c: char| c.is_ascii_digit())
}

fn invert(op: CompareOp) -> CompareOp {
    match op {
        CompareOp::Eq => CompareOp::Ne,
        CompareOp::Gt => CompareOp::Le,
        CompareOp::Lt => CompareOp::Ge,
        CompareOp::Match => CompareOp::NotMatch,
        other => other,
    }
}

fn negate_if(expr: Expr, negate: bool) -> Expr {
    if negate { Expr::not(expr) } else { expr }
}

// Expression rebuilding

#[derive(Debug)]
struct Term {
    expr: Expr,
    connector: Option<Connector>,
}

/// `t1 op1 (t2 op2 (t3 ...))`
fn fold(terms: Vec<Term>) -> Option<Expr> {
    let mut terms = terms.into_iter().rev();
    let last = terms.next()?;
    Some(terms.fold(last.expr, |acc, term| match term.connector {
        Some(Connector::Or) => Expr::or(term.expr, acc),
        _ => Expr::and(term.expr, acc),
    }))
}

/// Buffered condition terms, one frame per open group.
#[derive(Debug, Default)]
struct TermBuffer {
    frames: Vec<Vec<Term>>,
}

impl TermBuffer {
    fn push(&mut self, expr: Expr, connector: Option<Connector>) {
        if self.frames.is_empty() {
            self.frames.push(Vec::new());
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.push(Term { expr, connector });
        }
    }

    fn open(&mut self) {
        if self.frames.is_empty() {
            self.frames.push(Vec::new());
        }
        self.frames.push(Vec::new());
    }

    fn close(&mut self, state: CondState) -> Result<(), &'static str> {
        if self.frames.len() < 2 {
            return Err("GROUP:END without a matching GROUP");
        }
        let inner = self.frames.pop().unwrap_or_default();
        let expr = fold(inner).ok_or("empty group")?;
        self.push(negate_if(Expr::group(expr), state.negate), state.connector);
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.frames.iter().all(Vec::is_empty)
    }

    /// The folded expression, and the problems met closing groups left open.
    fn take(&mut self) -> (Option<Expr>, Vec<&'static str>) {
        let mut problems = Vec::new();
        if self.frames.len() > 1 {
            problems.push("GROUP without a matching GROUP:END");
        }
        while self.frames.len() > 1 {
            if let Err(reason) = self.close(CondState::default()) {
                problems.push(reason);
            }
        }
        let root = self.frames.pop().unwrap_or_default();
        (fold(root), problems)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Outside,
    InBranch,
    ElifPending,
    InElse,
}

/// A rule being rebuilt.
#[derive(Debug, Default)]
struct Rule {
    mode: Mode,
    terms: TermBuffer,
    cond: Option<Conditional>,
}

struct Parsed<'s> {
    no: usize,
    text: &'s str,
    line: Line,
}

struct Decompiler<'a> {
    ctx: Context<'a>,
    section: SectionType,
    sections: Vec<Section>,
    vars: BTreeSet<(VarType, usize)>,
    errors: Vec<Diagnostic>,
}

impl<'a> Decompiler<'a> {
    fn new(ctx: Context<'a>) -> Self {
        Self {
            ctx,
            section: ctx.options.decompile.default_section,
            sections: Vec::new(),
            vars: BTreeSet::new(),
            errors: Vec::new(),
        }
    }

    fn malformed(&mut self, no: usize, text: &str, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::debug!(line = no, %reason, "malformed directive");
        self.errors.push(Diagnostic::new(
            self.ctx.filename,
            Some(Span::new(no, 1)),
            Error::malformed(text, reason),
        ));
    }

    fn finish(self) -> Translation<Program> {
        let vars = self
            .vars
            .iter()
            .map(|&(ty, index)| VarDecl {
                name: VariableSlot::synthesized_name(ty, index),
                ty: ty.name().to_string(),
                slot: Some(index),
                span: Span::default(),
            })
            .collect();
        let program = Program {
            vars,
            sections: self.sections,
            vars_span: None,
        };
        Translation::new(program, self.errors)
    }

    fn var(&mut self, ty: VarType, index: usize) -> String {
        self.vars.insert((ty, index));
        VariableSlot::synthesized_name(ty, index)
    }

    fn block(&mut self, lines: &[(usize, &str)]) {
        let mut parsed = Vec::with_capacity(lines.len());
        for &(no, text) in lines {
            match parse_line(text) {
                Ok(line) => parsed.push(Parsed { no, text, line }),
                Err(reason) => self.malformed(no, text, reason),
            }
        }
        let Some(first) = parsed.first() else {
            return;
        };
        let first_no = first.no;
        let (section, start) = match first.line {
            Line::Hook(section) => (section, 1),
            _ => (self.ctx.options.decompile.default_section, 0),
        };
        self.section = section;
        tracing::debug!(section = %section, lines = parsed.len(), "reading rule block");

        let mut pos = start;
        let body = self.body(&parsed, &mut pos, false);
        if body.is_empty() {
            return;
        }
        let merge = self.ctx.options.decompile.merge_sections
            && self.sections.last().is_some_and(|s| s.name == section.name());
        match self.sections.last_mut() {
            Some(last) if merge => last.body.extend(body),
            _ => self.sections.push(Section {
                name: section.name().to_string(),
                body,
                span: Span::new(first_no, 1),
            }),
        }
    }

    /// Statements up to the end of the block, or up to `endif` when nested.
    fn body(&mut self, lines: &[Parsed<'_>], pos: &mut usize, nested: bool) -> Vec<Stmt> {
        let mut out = Vec::new();
        let mut rule = Rule::default();
        let mut last_no = lines.first().map_or(0, |p| p.no);
        while let Some(parsed) = lines.get(*pos) {
            *pos += 1;
            let (no, text) = (parsed.no, parsed.text);
            last_no = no;
            match &parsed.line {
                Line::Hook(_) => {
                    self.malformed(no, text, "a hook condition must start its rule block");
                }
                line @ (Line::GroupOpen | Line::GroupEnd(_) | Line::Condition(_)) => {
                    if matches!(rule.mode, Mode::InBranch | Mode::InElse) {
                        self.close(&mut rule, &mut out, no, text);
                    }
                    self.buffer(&mut rule, no, text, line);
                }
                Line::Operator(op) => match self.operator(no, op) {
                    Ok(stmt) => self.add(&mut rule, &mut out, stmt, no, text),
                    Err(reason) => self.malformed(no, text, reason),
                },
                Line::If => {
                    for stmt in self.body(lines, pos, true) {
                        self.add(&mut rule, &mut out, stmt, no, text);
                    }
                }
                Line::Endif if nested => {
                    self.close(&mut rule, &mut out, no, text);
                    return out;
                }
                Line::Endif => self.malformed(no, text, "'endif' without 'if'"),
                Line::Elif => match rule.mode {
                    Mode::InBranch => rule.mode = Mode::ElifPending,
                    _ => self.malformed(no, text, "'elif' must follow a branch"),
                },
                Line::Else => match rule.mode {
                    Mode::InBranch | Mode::ElifPending => {
                        if rule.mode == Mode::ElifPending {
                            self.open_branch(&mut rule, Vec::new(), no, text);
                        }
                        if let Some(cond) = &mut rule.cond {
                            cond.otherwise = Some(Vec::new());
                        }
                        rule.mode = Mode::InElse;
                    }
                    _ => self.malformed(no, text, "'else' must follow a branch"),
                },
            }
        }
        if nested {
            self.malformed(last_no, "if", "missing 'endif'");
        }
        let text = lines.last().map_or("", |p| p.text);
        self.close(&mut rule, &mut out, last_no, text);
        out
    }

    fn buffer(&mut self, rule: &mut Rule, no: usize, text: &str, line: &Line) {
        match line {
            Line::GroupOpen => rule.terms.open(),
            Line::GroupEnd(state) => {
                if let Err(reason) = rule.terms.close(*state) {
                    self.malformed(no, text, reason);
                }
            }
            Line::Condition(cond) => match self.condition(cond, Span::new(no, 1)) {
                Ok(expr) => rule.terms.push(expr, cond.state.connector),
                Err(reason) => self.malformed(no, text, reason),
            },
            _ => {}
        }
    }

    fn take_condition(&mut self, rule: &mut Rule, no: usize, text: &str) -> Option<Expr> {
        let (expr, problems) = rule.terms.take();
        for reason in problems {
            self.malformed(no, text, reason);
        }
        expr
    }

    /// Start a branch from the buffered conditions, if any.
    fn open_branch(&mut self, rule: &mut Rule, body: Vec<Stmt>, no: usize, text: &str) -> bool {
        let Some(condition) = self.take_condition(rule, no, text) else {
            return false;
        };
        let span = condition.span().unwrap_or(Span::new(no, 1));
        let branch = Branch {
            condition,
            body,
            span,
        };
        match &mut rule.cond {
            Some(cond) => cond.branches.push(branch),
            None => {
                rule.cond = Some(Conditional {
                    branches: vec![branch],
                    otherwise: None,
                    span,
                })
            }
        }
        rule.mode = Mode::InBranch;
        true
    }

    fn add(&mut self, rule: &mut Rule, out: &mut Vec<Stmt>, stmt: Stmt, no: usize, text: &str) {
        match rule.mode {
            Mode::Outside => {
                if rule.terms.is_empty() || !self.open_branch(rule, vec![stmt.clone()], no, text) {
                    out.push(stmt);
                }
            }
            Mode::ElifPending => {
                if !self.open_branch(rule, vec![stmt.clone()], no, text) {
                    self.malformed(no, text, "'elif' without conditions");
                    rule.mode = Mode::InBranch;
                    self.add(rule, out, stmt, no, text);
                }
            }
            Mode::InBranch => {
                if let Some(branch) = rule.cond.as_mut().and_then(|c| c.branches.last_mut()) {
                    branch.body.push(stmt);
                }
            }
            Mode::InElse => {
                if let Some(otherwise) = rule.cond.as_mut().and_then(|c| c.otherwise.as_mut()) {
                    otherwise.push(stmt);
                }
            }
        }
    }

    fn close(&mut self, rule: &mut Rule, out: &mut Vec<Stmt>, no: usize, text: &str) {
        if !rule.terms.is_empty() {
            self.malformed(no, text, "conditions without operators");
            self.open_branch(rule, Vec::new(), no, text);
        }
        if let Some(cond) = rule.cond.take() {
            out.push(Stmt::If(cond));
        }
        rule.mode = Mode::Outside;
    }

    // Terms

    fn condition(&mut self, cond: &CondLine, span: Span) -> Result<Expr, String> {
        let negate = cond.state.negate;
        if cond.arg.is_none() && cond.operand.is_none() {
            match cond.tag.as_str() {
                "TRUE" => return Ok(negate_if(Expr::Bool(true), negate)),
                "FALSE" => return Ok(negate_if(Expr::Bool(false), negate)),
                _ => {}
            }
        }

        let (lhs, exists_test) = self.condition_operand(cond, span)?;
        let bare = |lhs: Operand| match lhs {
            Operand::Ident(name) => Expr::Ident { name, span },
            Operand::Call { name, args } => Expr::Call { name, args, span },
        };
        let modifiers: Vec<String> = cond
            .state
            .match_modifiers()
            .into_iter()
            .map(String::from)
            .collect();
        let Some(operand) = cond.operand.as_deref() else {
            return Ok(negate_if(bare(lhs), negate));
        };
        if exists_test && operand == "=\"\"" && modifiers.is_empty() {
            return Ok(negate_if(bare(lhs), !negate));
        }

        let (op, rhs) = self.parse_operand(operand)?;
        let op = if negate { invert(op) } else { op };
        let compare = Expr::Compare(Box::new(Comparison {
            lhs,
            op,
            rhs,
            modifiers,
            span,
        }));
        Ok(negate_if(compare, negate && op == CompareOp::In))
    }

    /// The left side of a condition, and whether it is an existence test.
    fn condition_operand(&mut self, cond: &CondLine, span: Span) -> Result<(Operand, bool), String> {
        let reference = match &cond.arg {
            Some(arg) => format!("%{{{}:{}}}", cond.tag, arg),
            None => format!("%{{{}}}", cond.tag),
        };
        if let Some(ty) = VarType::from_condition_tag(&cond.tag) {
            let arg = cond
                .arg
                .as_deref()
                .ok_or_else(|| format!("{reference} needs a slot number"))?;
            let index = slot(ty, arg)?;
            return Ok((Operand::Ident(self.var(ty, index)), false));
        }
        let tables = self.ctx.tables;
        if let Some(name) = tables.reverse().function(&cond.tag) {
            let args = cond
                .arg
                .as_deref()
                .map(|a| a.split(',').map(|t| self.value(t.trim(), false)).collect())
                .unwrap_or_default();
            return Ok((
                Operand::Call {
                    name: name.to_string(),
                    args,
                },
                false,
            ));
        }
        let resolved = tables
            .reverse()
            .condition(&cond.tag, cond.arg.as_deref(), self.section)
            .and_then(|hit| Some((tables.entry(TableKind::Condition, hit.key)?, hit.suffix)));
        let Some((entry, suffix)) = resolved else {
            self.errors.push(Diagnostic::new(
                self.ctx.filename,
                Some(span),
                Error::UnknownSymbol(reference),
            ));
            let fallback = fallback_symbol(&cond.tag, cond.arg.as_deref());
            return Ok((Operand::Ident(fallback), false));
        };
        Ok((
            Operand::Ident(entry.surface(suffix.as_deref())),
            entry.exists_test,
        ))
    }

    fn parse_operand(&mut self, operand: &str) -> Result<(CompareOp, Rhs), String> {
        let literal = |this: &mut Self, text: &str| Rhs::Value(this.value(text, false));
        if let Some(rest) = operand.strip_prefix('=') {
            Ok((CompareOp::Eq, literal(self, rest)))
        } else if let Some(rest) = operand.strip_prefix('>') {
            Ok((CompareOp::Gt, literal(self, rest)))
        } else if let Some(rest) = operand.strip_prefix('<') {
            Ok((CompareOp::Lt, literal(self, rest)))
        } else if operand.starts_with('/') && operand.len() > 1 && operand.ends_with('/') {
            Ok((CompareOp::Match, Rhs::Regex(operand.to_string())))
        } else if let Some(inner) = operand.strip_prefix('(').and_then(|o| o.strip_suffix(')')) {
            let values = split_set(inner)
                .iter()
                .map(|item| self.value(item, false))
                .collect();
            Ok((CompareOp::In, Rhs::Set(values)))
        } else if let Some(inner) = operand.strip_prefix('{').and_then(|o| o.strip_suffix('}')) {
            let ranges = inner
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect();
            Ok((CompareOp::In, Rhs::IpRange(ranges)))
        } else {
            Err(format!("unrecognized operand '{operand}'"))
        }
    }

    /// A directive argument as a source value.
    fn value(&mut self, token: &str, bare_ident: bool) -> Value {
        if token.len() >= 2
            && let Some(inner) = token.strip_prefix('"').and_then(|t| t.strip_suffix('"'))
        {
            return Value::Str(self.uninterpolate(inner));
        }
        match token {
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            _ => {}
        }
        if is_number(token) {
            return Value::Number(token.to_string());
        }
        if let Some(caps) = REFERENCE.captures(token)
            && caps.get(0).is_some_and(|m| m.as_str() == token)
            && let Some(ty) = VarType::from_condition_tag(&caps[1])
            && let Some(index) = caps.get(2).and_then(|m| slot(ty, m.as_str()).ok())
        {
            return Value::Ident(self.var(ty, index));
        }
        if bare_ident {
            Value::Ident(token.to_string())
        } else {
            Value::Str(self.uninterpolate(token))
        }
    }

    /// Turn `%{TAG:ARG}` references into `{symbol}` interpolations.
    fn uninterpolate(&mut self, text: &str) -> String {
        REFERENCE
            .replace_all(text, |caps: &Captures<'_>| self.interpolation(caps))
            .into_owned()
    }

    fn interpolation(&mut self, caps: &Captures<'_>) -> String {
        let tag = &caps[1];
        let arg = caps.get(2).map(|m| m.as_str());
        if let Some(ty) = VarType::from_condition_tag(tag)
            && let Some(index) = arg.and_then(|a| slot(ty, a).ok())
        {
            return format!("{{{}}}", self.var(ty, index));
        }
        let tables = self.ctx.tables;
        let reverse = tables.reverse();
        if let Some(name) = reverse.function(tag) {
            let args = arg.unwrap_or("").split(',').map(str::trim).collect::<Vec<_>>();
            return format!("{{{}({})}}", name, args.join(", "));
        }
        if let Some(hit) = reverse.condition(tag, arg, self.section)
            && let Some(entry) = tables.entry(TableKind::Condition, hit.key)
        {
            return format!("{{{}}}", entry.surface(hit.suffix.as_deref()));
        }
        caps[0].to_string()
    }

    // Statements

    fn operator(&mut self, no: usize, op: &OpLine) -> Result<Stmt, String> {
        let span = Span::new(no, 1);
        let state = OperatorState::from_flags(&op.flags)
            .map_err(|f| format!("unknown operator flag '{f}'"))?;
        if op.command == "no-op" && op.args.is_empty() && state.last {
            return Ok(Stmt::Break { span });
        }
        if let Some(ty) = VarType::from_operator(&op.command) {
            let [index, value] = op.args.as_slice() else {
                return Err(format!("{} expects a slot and a value", op.command));
            };
            let index = slot(ty, index)?;
            let target = self.var(ty, index);
            let value = self.value(value, false);
            return Ok(Stmt::Assign {
                target,
                op: AssignOp::Set,
                value,
                span,
            });
        }

        let tables = self.ctx.tables;
        let hit = tables
            .reverse()
            .operator(&op.command, &op.args, &op.flags, self.section)
            .ok_or_else(|| format!("unknown operator '{}'", op.command))?;
        let entry = tables
            .entry(hit.kind, hit.key)
            .ok_or_else(|| format!("unknown operator '{}'", op.command))?;
        let args = &op.args[hit.consumed.min(op.args.len())..];

        if hit.kind == TableKind::StatementFunction {
            let modifiers: Vec<String> = state
                .flags()
                .into_iter()
                .filter(|f| entry.reverse_hint != Some(*f))
                .map(String::from)
                .collect();
            let args: Vec<Value> = args.iter().map(|a| self.value(a, true)).collect();
            if args.is_empty() && modifiers.is_empty() {
                return Ok(Stmt::Bare {
                    name: entry.key.to_string(),
                    span,
                });
            }
            return Ok(Stmt::Call {
                name: entry.key.to_string(),
                args,
                modifiers,
                span,
            });
        }

        let (suffix, rest) = if entry.prefix {
            let (suffix, rest) = args
                .split_first()
                .ok_or_else(|| format!("{} expects a field name", op.command))?;
            (Some(suffix.as_str()), rest)
        } else {
            (None, args)
        };
        let target = entry.surface(suffix);
        if !state.flags().is_empty() {
            tracing::warn!(line = no, flags = ?op.flags, "dropping flags on {}", op.command);
        }
        let (assign, value) = if op.command.starts_with("rm-") {
            (AssignOp::Set, Value::Str(String::new()))
        } else {
            let value = match rest {
                [] => return Err(format!("{} expects a value", op.command)),
                [one] => self.value(one, false),
                many => Value::Str(self.uninterpolate(&many.join(" "))),
            };
            let assign = if op.command.starts_with("add-") {
                AssignOp::Add
            } else {
                AssignOp::Set
            };
            (assign, value)
        };
        Ok(Stmt::Assign {
            target,
            op: assign,
            value,
            span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use crate::error::ErrorKind;
    use crate::tables::Tables;

    fn read(text: &str) -> Translation<Program> {
        let tables = Tables::new();
        let options = Options::default();
        let ctx = Context::new(&tables, &options, "test.config");
        DIRECTIVES_READER.read(text, &ctx)
    }

    fn read_ok(text: &str) -> Program {
        let result = read(text);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        result.output
    }

    fn only_condition(program: &Program) -> &Expr {
        match &program.sections[0].body[0] {
            Stmt::If(cond) => &cond.branches[0].condition,
            other => panic!("expected a conditional, got {other:?}"),
        }
    }

    #[test]
    fn test_split_flags() {
        assert_eq!(
            split_flags("cond %{STATUS} =200 [NOT,OR]"),
            ("cond %{STATUS} =200", vec!["NOT".to_string(), "OR".to_string()])
        );
        assert_eq!(split_flags("cond %{X} /[a-z]/"), ("cond %{X} /[a-z]/", vec![]));
        assert_eq!(split_flags("set-status 404"), ("set-status 404", vec![]));
    }

    #[test]
    fn test_tokenize_keeps_quotes() {
        assert_eq!(
            tokenize(r#"set-header X-Foo "a b \"c\"""#).unwrap(),
            vec!["set-header", "X-Foo", r#""a b \"c\"""#]
        );
        assert!(tokenize(r#"set-header X "open"#).is_err());
    }

    #[test]
    fn test_hook_sets_section_and_blocks_merge() {
        let program = read_ok(
            "cond %{SEND_RESPONSE_HDR_HOOK} [AND]\n    set-header X-A \"1\"\n\n\
             cond %{SEND_RESPONSE_HDR_HOOK} [AND]\n    rm-header X-B\n\n\
             set-status 404\n",
        );
        assert_eq!(program.sections.len(), 2);
        assert_eq!(program.sections[0].name, "SEND_RESPONSE");
        assert_eq!(program.sections[0].body.len(), 2);
        assert!(matches!(
            &program.sections[0].body[1],
            Stmt::Assign { target, value, .. } if target == "inbound.resp.X-B" && value.is_empty_string()
        ));
        // No hook guard: the default section
        assert_eq!(program.sections[1].name, "READ_RESPONSE");
        assert!(matches!(
            &program.sections[1].body[0],
            Stmt::Assign { target, .. } if target == "http.status"
        ));
    }

    #[test]
    fn test_no_merge_when_disabled() {
        let tables = Tables::new();
        let mut options = Options::default();
        options.decompile.merge_sections = false;
        let ctx = Context::new(&tables, &options, "t");
        let text = "cond %{REMAP_PSEUDO_HOOK}\nno-op\n\ncond %{REMAP_PSEUDO_HOOK}\nno-op\n";
        let program = DIRECTIVES_READER.read(text, &ctx).output;
        assert_eq!(program.sections.len(), 2);
    }

    #[test]
    fn test_right_fold() {
        let program = read_ok(
            "cond %{REMAP_PSEUDO_HOOK} [AND]\n\
             cond %{METHOD} =\"GET\" [AND]\n\
             cond %{CLIENT-URL:PATH} /foo/ [OR]\n\
             cond %{IP:CLIENT} {10.0.0.0/8}\n\
             no-op\n",
        );
        let Expr::And(lhs, rhs) = only_condition(&program) else {
            panic!("expected And");
        };
        assert!(matches!(&**lhs, Expr::Compare(c) if c.lhs == Operand::Ident("inbound.method".into())));
        let Expr::Or(path, ip) = &**rhs else {
            panic!("expected Or");
        };
        assert!(matches!(&**path, Expr::Compare(c) if c.op == CompareOp::Match
            && c.lhs == Operand::Ident("inbound.url.path".into())));
        assert!(matches!(&**ip, Expr::Compare(c) if c.rhs == Rhs::IpRange(vec!["10.0.0.0/8".into()])));
    }

    #[test]
    fn test_negation_inverse() {
        let program = read_ok(
            "cond %{SEND_REQUEST_HDR_HOOK}\n\
             cond %{METHOD} =\"GET\" [NOT,AND]\n\
             cond %{STATUS} <200 [NOT,AND]\n\
             cond %{HEADER:X-A} =\"\" [NOT,AND]\n\
             cond %{HEADER:X-B} =\"\" [AND]\n\
             cond %{CLIENT-URL:PATH} /x/ [NOT,AND]\n\
             cond %{IP:CLIENT} (\"1.2.3.4\") [NOT]\n\
             no-op\n",
        );
        let mut terms = Vec::new();
        let mut expr = only_condition(&program);
        while let Expr::And(lhs, rhs) = expr {
            terms.push(&**lhs);
            expr = rhs;
        }
        terms.push(expr);
        assert_eq!(terms.len(), 6);
        assert!(matches!(terms[0], Expr::Compare(c) if c.op == CompareOp::Ne
            && c.lhs == Operand::Ident("outbound.method".into())));
        assert!(matches!(terms[1], Expr::Compare(c) if c.op == CompareOp::Ge));
        assert!(matches!(terms[2], Expr::Ident { name, .. } if name == "outbound.req.X-A"));
        assert!(matches!(terms[3], Expr::Not(inner) if matches!(&**inner, Expr::Ident { .. })));
        assert!(matches!(terms[4], Expr::Compare(c) if c.op == CompareOp::NotMatch));
        assert!(matches!(terms[5], Expr::Not(inner) if matches!(&**inner, Expr::Compare(_))));
    }

    #[test]
    fn test_groups() {
        let program = read_ok(
            "cond %{REMAP_PSEUDO_HOOK} [AND]\n\
             cond %{GROUP}\n\
                 cond %{METHOD} =\"GET\" [AND]\n\
                 cond %{TRUE}\n\
             cond %{GROUP:END} [NOT,OR]\n\
             cond %{FALSE}\n\
             no-op\n",
        );
        let Expr::Or(group, rhs) = only_condition(&program) else {
            panic!("expected Or");
        };
        assert_eq!(**rhs, Expr::Bool(false));
        let Expr::Not(group) = &**group else {
            panic!("expected Not");
        };
        assert!(matches!(group.strip_groups(), Expr::And(..)));
    }

    #[test]
    fn test_elif_else_and_nesting() {
        let program = read_ok(
            "cond %{REMAP_PSEUDO_HOOK} [AND]\n\
             cond %{METHOD} =\"GET\"\n\
                 set-header X-A \"1\"\n\
                 if\n\
                     cond %{TRUE}\n\
                         no-op\n\
                 endif\n\
             elif\n\
                 cond %{METHOD} =\"POST\"\n\
                     set-header X-A \"2\"\n\
             else\n\
                 no-op [L]\n",
        );
        let Stmt::If(cond) = &program.sections[0].body[0] else {
            panic!("expected a conditional");
        };
        assert_eq!(cond.branches.len(), 2);
        assert_eq!(cond.branches[0].body.len(), 2);
        assert!(matches!(&cond.branches[0].body[1], Stmt::If(_)));
        assert!(matches!(cond.otherwise.as_deref(), Some([Stmt::Break { .. }])));
    }

    #[test]
    fn test_condition_after_operators_starts_new_rule() {
        let program = read_ok(
            "cond %{REMAP_PSEUDO_HOOK}\ncond %{TRUE}\nno-op\ncond %{FALSE}\nno-op\n",
        );
        assert_eq!(program.sections[0].body.len(), 2);
    }

    #[test]
    fn test_variables_are_synthesized() {
        let program = read_ok(
            "cond %{REMAP_PSEUDO_HOOK}\n\
             cond %{STATE-FLAG:1}\n\
             set-state-int8 2 7\n\
             set-header X \"%{STATE-INT8:2}\"\n",
        );
        let names: Vec<_> = program.vars.iter().map(|v| (v.name.as_str(), v.slot)).collect();
        assert_eq!(names, vec![("bool_1", Some(1)), ("int8_2", Some(2))]);
        assert!(matches!(only_condition(&program), Expr::Ident { name, .. } if name == "bool_1"));
    }

    #[test]
    fn test_statement_functions_and_hints() {
        let program = read_ok(
            "cond %{REMAP_PSEUDO_HOOK}\n\
             rm-destination QUERY \"a,b\" [INV]\n\
             rm-destination QUERY \"c\"\n\
             rm-destination PATH\n\
             run-plugin \"x.so\" [L]\n\
             set-debug\n\
             set-redirect 302 \"https://%{CLIENT-URL:HOST}/\"\n",
        );
        let body = &program.sections[0].body;
        assert!(matches!(&body[0], Stmt::Call { name, modifiers, .. } if name == "keep_query" && modifiers.is_empty()));
        assert!(matches!(&body[1], Stmt::Call { name, .. } if name == "remove_query"));
        assert!(matches!(&body[2], Stmt::Assign { target, .. } if target == "inbound.url.path"));
        assert!(matches!(&body[3], Stmt::Call { modifiers, .. } if modifiers == &vec!["L".to_string()]));
        assert!(matches!(&body[4], Stmt::Bare { name, .. } if name == "set-debug"));
        assert!(matches!(&body[5], Stmt::Call { args, .. }
            if args[1] == Value::Str("https://{inbound.url.host}/".into())));
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let result = read(
            "cond %{REMAP_PSEUDO_HOOK}\n\
             frobnicate 1 2\n\
             cond %{NOPE:X} =1\n\
             cond SOMETHING\n\
             no-op\n\
             endif\n",
        );
        let mut found: Vec<_> = result
            .errors
            .iter()
            .map(|d| (d.line.unwrap_or(0), d.kind()))
            .collect();
        found.sort_by_key(|(line, _)| *line);
        assert_eq!(
            found,
            vec![
                (2, ErrorKind::MalformedDirective),
                (3, ErrorKind::UnknownSymbol),
                (4, ErrorKind::MalformedDirective),
                (6, ErrorKind::MalformedDirective),
            ]
        );
        // The unknown condition is kept under a generic name
        let cond = only_condition(&result.output);
        assert!(matches!(cond, Expr::Compare(c) if c.lhs == Operand::Ident("nope.x".into())));
    }

    #[test]
    fn test_slots_outside_the_bank() {
        for line in [
            "cond %{STATE-FLAG:99}",
            "cond %{STATE-INT8:4} =1",
            "cond %{STATE-INT16:1} =1",
        ] {
            let result = read(&format!("cond %{{REMAP_PSEUDO_HOOK}}\n{line}\nno-op\n"));
            assert_eq!(result.errors.len(), 1, "{line}: {:?}", result.errors);
            assert_eq!(result.errors[0].kind(), ErrorKind::MalformedDirective);
            assert_eq!(result.errors[0].line, Some(2));
            assert!(result.output.vars.is_empty(), "{line}");
        }

        let result = read("cond %{REMAP_PSEUDO_HOOK}\nset-state-flag 16 true\n");
        assert_eq!(result.errors.len(), 1, "{:?}", result.errors);
        assert!(
            result.errors[0]
                .message()
                .contains("slot 16 out of range, bool has slots 0 to 15"),
            "{}",
            result.errors[0]
        );

        // The last slot of each bank is still fine.
        let program = read_ok(
            "cond %{REMAP_PSEUDO_HOOK}\ncond %{STATE-FLAG:15}\nset-state-int16 0 %{STATE-INT8:3}\n",
        );
        let names: Vec<_> = program.vars.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["bool_15", "int8_3", "int16_0"]);
    }

    #[test]
    fn test_unclosed_groups_are_reported() {
        let result = read(
            "cond %{REMAP_PSEUDO_HOOK}\n\
             cond %{GROUP}\n\
             cond %{TRUE} [OR]\n\
             cond %{GROUP}\n\
             no-op\n",
        );
        let reasons: Vec<_> = result.errors.iter().map(|d| d.message()).collect();
        assert_eq!(reasons.len(), 2, "{reasons:?}");
        assert!(reasons[0].contains("GROUP without a matching GROUP:END"), "{reasons:?}");
        assert!(reasons[1].contains("empty group"), "{reasons:?}");
        assert!(result
            .errors
            .iter()
            .all(|d| d.kind() == ErrorKind::MalformedDirective && d.line == Some(5)));
    }

    #[test]
    fn test_conditions_without_operators() {
        let result = read("cond %{REMAP_PSEUDO_HOOK}\ncond %{TRUE}\n");
        assert_eq!(result.errors.len(), 1);
        let Stmt::If(cond) = &result.output.sections[0].body[0] else {
            panic!("expected an empty conditional");
        };
        assert!(cond.branches[0].body.is_empty());
    }
}
