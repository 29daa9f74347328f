//! Forward compiler: hrw4u IR to header_rewrite directives.
//!
//! Every conditional, and every run of plain statements, becomes one rule
//! block headed by the section's hook guard:
//!
//! ```text
//! cond %{REMAP_PSEUDO_HOOK} [AND]
//! cond %{CLIENT-HEADER:X-Debug} ="1" [OR]
//! cond %{IP:CLIENT} {10.0.0.0/8}
//!     set-header X-Debug-Reply "yes"
//! ```
//!
//! Boolean chains are written left to right and the engine folds them to the
//! right, so `a || b && c` needs no group while `a && b || c` groups `a && b`.

use crate::config::ErrorPolicy;
use crate::error::{Diagnostic, Error, Translation};
use crate::ir::*;
use crate::sections::SectionType;
use crate::state::{CondState, Connector, OperatorState};
use crate::tables::TableKind;
use crate::traits::{Context, Writer};
use crate::validate::Arg;
use crate::vars::{VarType, VariableTable};
use regex::Regex;
use std::sync::LazyLock;

/// Static instance of the directives writer for registry.
pub static DIRECTIVES_WRITER: DirectivesWriter = DirectivesWriter;

pub struct DirectivesWriter;

impl Writer for DirectivesWriter {
    fn format(&self) -> &'static str {
        "header_rewrite"
    }

    fn extension(&self) -> &'static str {
        "config"
    }

    fn write(&self, program: &Program, ctx: &Context<'_>) -> Translation<String> {
        let Translation { output, errors } = compile(program, ctx);
        let mut text = output.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        Translation::new(text, errors)
    }
}

/// Compile a program into directive lines.
pub fn compile(program: &Program, ctx: &Context<'_>) -> Translation<Vec<String>> {
    let mut compiler = Compiler::new(*ctx);
    compiler.declare_vars(program);
    for section in &program.sections {
        if compiler.stopped {
            break;
        }
        compiler.compile_section(section);
    }
    tracing::debug!(
        lines = compiler.lines.len(),
        errors = compiler.errors.len(),
        "compiled {}",
        ctx.filename
    );
    Translation::new(compiler.lines, compiler.errors)
}

static INTERPOLATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_@][A-Za-z0-9_.@-]*(?:\([^)]*\))?)\}").expect("static regex")
});

/// A condition line waiting for its connector.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingTerm {
    text: String,
    state: CondState,
    indent: usize,
}

/// One-term lookahead buffer for condition lines.
///
/// A term's connector is only known once the next term arrives, so each
/// term is held until then. [`connect`](TermQueue::connect) annotates the held
/// term; pushing another term or a marker line writes it out.
#[derive(Debug)]
pub(crate) struct TermQueue {
    width: usize,
    pending: Option<PendingTerm>,
    lines: Vec<String>,
}

impl TermQueue {
    pub(crate) fn new(width: usize) -> Self {
        Self {
            width,
            pending: None,
            lines: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, text: impl Into<String>, state: CondState, indent: usize) {
        self.flush();
        self.pending = Some(PendingTerm {
            text: text.into(),
            state,
            indent,
        });
    }

    /// Join the held term to whatever comes next.
    pub(crate) fn connect(&mut self, connector: Connector) {
        if let Some(pending) = &mut self.pending {
            pending.state.connector = Some(connector);
        }
    }

    /// A line that never takes a connector, such as a group opener.
    pub(crate) fn marker(&mut self, text: &str, indent: usize) {
        self.flush();
        self.lines
            .push(format!("{}{}", " ".repeat(self.width * indent), text));
    }

    fn flush(&mut self) {
        if let Some(term) = self.pending.take() {
            self.lines.push(format!(
                "{}{}{}",
                " ".repeat(self.width * term.indent),
                term.text,
                term.state.render()
            ));
        }
    }

    pub(crate) fn finish(mut self) -> Vec<String> {
        self.flush();
        self.lines
    }
}

/// An error and where it happened.
struct Failure {
    span: Option<Span>,
    error: Error,
}

fn at(span: Span) -> impl FnOnce(Error) -> Failure {
    move |error| Failure {
        span: Some(span),
        error,
    }
}

type Step<T> = Result<T, Failure>;

struct Compiler<'a> {
    ctx: Context<'a>,
    vars: VariableTable,
    section: SectionType,
    lines: Vec<String>,
    errors: Vec<Diagnostic>,
    stopped: bool,
}

impl<'a> Compiler<'a> {
    fn new(ctx: Context<'a>) -> Self {
        Self {
            ctx,
            vars: VariableTable::new(),
            section: ctx.options.decompile.default_section,
            lines: Vec::new(),
            errors: Vec::new(),
            stopped: false,
        }
    }

    fn report(&mut self, failure: Failure) {
        tracing::debug!(kind = %failure.error.kind(), "{}", failure.error);
        self.errors
            .push(Diagnostic::new(self.ctx.filename, failure.span, failure.error));
        if self.ctx.options.compile.policy == ErrorPolicy::Abort {
            self.stopped = true;
        }
    }

    fn pad(&self, indent: usize) -> String {
        self.ctx.options.output.pad(indent)
    }

    fn declare_vars(&mut self, program: &Program) {
        if let (Some(vars), Some(first)) = (program.vars_span, program.sections.first())
            && (vars.line, vars.column) > (first.span.line, first.span.column)
        {
            self.report(Failure {
                span: Some(vars),
                error: Error::variable("VARS", "must come before any section"),
            });
        }
        for decl in &program.vars {
            if self.stopped {
                return;
            }
            if let Err(error) = self.vars.declare(&decl.name, &decl.ty, decl.slot, decl.span) {
                self.report(at(decl.span)(error));
            }
        }
    }

    fn compile_section(&mut self, section: &Section) {
        let Some(kind) = SectionType::from_name(&section.name) else {
            self.report(at(section.span)(Error::UnknownSymbol(section.name.clone())));
            return;
        };
        self.section = kind;
        tracing::debug!(section = %kind, statements = section.body.len(), "compiling section");
        let hook = format!("cond %{{{}}} [AND]", kind.hook());

        let mut run = Vec::new();
        for stmt in &section.body {
            if self.stopped {
                return;
            }
            match stmt {
                Stmt::If(cond) => {
                    self.flush_run(&mut run, &hook);
                    let mut block = Vec::new();
                    match self.conditional(cond, 0, &mut block) {
                        Ok(()) => self.push_block(&hook, block),
                        Err(failure) => self.report(failure),
                    }
                }
                other => run.push(other),
            }
        }
        self.flush_run(&mut run, &hook);
    }

    fn flush_run(&mut self, run: &mut Vec<&Stmt>, hook: &str) {
        if run.is_empty() {
            return;
        }
        let mut block = Vec::new();
        for stmt in run.drain(..) {
            if self.stopped {
                break;
            }
            match self.statement(stmt, 1) {
                Ok(lines) => block.extend(lines),
                Err(failure) => self.report(failure),
            }
        }
        self.push_block(hook, block);
    }

    fn push_block(&mut self, hook: &str, block: Vec<String>) {
        if block.is_empty() {
            return;
        }
        if !self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.lines.push(hook.to_string());
        for line in block {
            tracing::trace!(directive = %line.trim_start());
            self.lines.push(line);
        }
    }

    /// Write `if`/`elif`/`else` with conditions at `base`.
    fn conditional(&mut self, cond: &Conditional, base: usize, out: &mut Vec<String>) -> Step<()> {
        for (i, branch) in cond.branches.iter().enumerate() {
            let indent = if i == 0 {
                base
            } else {
                out.push(format!("{}elif", self.pad(base)));
                base + 1
            };
            out.extend(self.condition(&branch.condition, indent)?);
            self.body(&branch.body, indent + 1, out);
        }
        if let Some(otherwise) = &cond.otherwise {
            out.push(format!("{}else", self.pad(base)));
            self.body(otherwise, base + 1, out);
        }
        Ok(())
    }

    fn body(&mut self, body: &[Stmt], indent: usize, out: &mut Vec<String>) {
        for stmt in body {
            if self.stopped {
                return;
            }
            match self.statement(stmt, indent) {
                Ok(lines) => out.extend(lines),
                Err(failure) => self.report(failure),
            }
        }
    }

    // Conditions

    fn condition(&mut self, expr: &Expr, indent: usize) -> Step<Vec<String>> {
        let mut queue = TermQueue::new(self.ctx.options.output.indent);
        self.emit(expr, false, indent, &mut queue)?;
        Ok(queue.finish())
    }

    fn emit(&mut self, expr: &Expr, negate: bool, indent: usize, queue: &mut TermQueue) -> Step<()> {
        match expr {
            Expr::Group(inner) => self.emit(inner, negate, indent, queue),
            Expr::Not(inner) => self.emit(inner, !negate, indent, queue),
            Expr::Or(..) | Expr::And(..) if negate => self.emit_group(expr, true, indent, queue),
            Expr::Or(..) => self.emit_chain(expr, Connector::Or, indent, queue),
            Expr::And(..) => self.emit_chain(expr, Connector::And, indent, queue),
            Expr::Bool(value) => {
                let text = if *value { "cond %{TRUE}" } else { "cond %{FALSE}" };
                queue.push(text, CondState::negated(negate), indent);
                Ok(())
            }
            Expr::Ident { name, span } => {
                let mut state = CondState::negated(negate);
                let text = self.bare_symbol(name, &mut state).map_err(at(*span))?;
                queue.push(format!("cond {text}"), state, indent);
                Ok(())
            }
            Expr::Call { name, args, span } => {
                let text = self.function_ref(name, args).map_err(at(*span))?;
                queue.push(format!("cond {text}"), CondState::negated(negate), indent);
                Ok(())
            }
            Expr::Compare(cmp) => {
                let mut state = CondState::negated(negate);
                let text = self.comparison(cmp, &mut state).map_err(at(cmp.span))?;
                queue.push(format!("cond {text}"), state, indent);
                Ok(())
            }
        }
    }

    fn emit_chain(
        &mut self,
        expr: &Expr,
        connector: Connector,
        indent: usize,
        queue: &mut TermQueue,
    ) -> Step<()> {
        let mut operands = Vec::new();
        flatten(expr, connector, &mut operands);
        let count = operands.len();
        for (i, operand) in operands.into_iter().enumerate() {
            let last = i + 1 == count;
            let grouped = match (connector, operand) {
                (Connector::Or, Expr::And(..)) => !last,
                (Connector::And, Expr::Or(..)) => true,
                _ => false,
            };
            if grouped {
                self.emit_group(operand, false, indent, queue)?;
            } else {
                self.emit(operand, false, indent, queue)?;
            }
            if !last {
                queue.connect(connector);
            }
        }
        Ok(())
    }

    fn emit_group(
        &mut self,
        inner: &Expr,
        negate: bool,
        indent: usize,
        queue: &mut TermQueue,
    ) -> Step<()> {
        queue.marker("cond %{GROUP}", indent);
        self.emit(inner, false, indent + 1, queue)?;
        queue.push("cond %{GROUP:END}", CondState::negated(negate), indent);
        Ok(())
    }

    /// A symbol used on its own as a condition.
    fn bare_symbol(&self, name: &str, state: &mut CondState) -> Result<String, Error> {
        if let Some(var) = self.vars.get(name) {
            if var.ty != VarType::Bool {
                return Err(Error::variable(
                    name,
                    format!("{} variables cannot be used as a condition", var.ty),
                ));
            }
            return Ok(var.condition_ref());
        }
        let resolved = self
            .ctx
            .tables
            .resolve(TableKind::Condition, name, Some(self.section))?;
        if resolved.entry.exists_test {
            state.negate = !state.negate;
            Ok(format!("{} =\"\"", resolved.condition_ref()))
        } else {
            Ok(resolved.condition_ref())
        }
    }

    /// `%{TAG}` or `%{TAG:arg,arg}` for a condition function.
    fn function_ref(&self, name: &str, args: &[Value]) -> Result<String, Error> {
        let resolved = self
            .ctx
            .tables
            .resolve(TableKind::Function, name, Some(self.section))?;
        let views: Vec<Arg<'_>> = args.iter().map(Value::as_arg).collect();
        resolved.entry.check_args(name, &views)?;
        let tag = resolved.entry.target.primary();
        if args.is_empty() {
            Ok(format!("%{{{tag}}}"))
        } else {
            let args: Vec<&str> = args.iter().map(Value::text).collect();
            Ok(format!("%{{{tag}:{}}}", args.join(",")))
        }
    }

    fn comparison(&self, cmp: &Comparison, state: &mut CondState) -> Result<String, Error> {
        for modifier in &cmp.modifiers {
            if !state.apply_match_modifier(modifier) {
                return Err(Error::validation(
                    "modifier",
                    modifier,
                    "expected one of NOCASE, EXT, PRE, SUF, MID",
                ));
            }
        }
        let lhs = match &cmp.lhs {
            Operand::Ident(name) => match self.vars.get(name) {
                Some(var) => var.condition_ref(),
                None => self
                    .ctx
                    .tables
                    .resolve(TableKind::Condition, name, Some(self.section))?
                    .condition_ref(),
            },
            Operand::Call { name, args } => self.function_ref(name, args)?,
        };
        let operand = match (cmp.op, &cmp.rhs) {
            (CompareOp::Eq | CompareOp::Ne, Rhs::Value(value)) => {
                format!("={}", self.literal(value)?)
            }
            (CompareOp::Gt | CompareOp::Le, Rhs::Value(value)) => {
                format!(">{}", self.literal(value)?)
            }
            (CompareOp::Lt | CompareOp::Ge, Rhs::Value(value)) => {
                format!("<{}", self.literal(value)?)
            }
            (CompareOp::Match | CompareOp::NotMatch, Rhs::Regex(regex)) => regex.clone(),
            (CompareOp::In, Rhs::Set(values)) if values.is_empty() => {
                return Err(Error::validation("set", "[]", "a set needs at least one value"));
            }
            (CompareOp::In, Rhs::IpRange(ranges)) if ranges.is_empty() => {
                return Err(Error::validation("set", "{}", "a range set needs at least one range"));
            }
            (CompareOp::In, Rhs::Set(values)) => {
                let values = values
                    .iter()
                    .map(|v| self.literal(v))
                    .collect::<Result<Vec<_>, _>>()?;
                format!("({})", values.join(","))
            }
            (CompareOp::In, Rhs::IpRange(ranges)) => format!("{{{}}}", ranges.join(",")),
            (op, _) => {
                return Err(Error::validation(
                    "comparison",
                    op.symbol(),
                    "this operator does not accept that kind of operand",
                ));
            }
        };
        if matches!(
            cmp.op,
            CompareOp::Ne | CompareOp::Ge | CompareOp::Le | CompareOp::NotMatch
        ) {
            state.negate = !state.negate;
        }
        Ok(format!("{lhs} {operand}"))
    }

    /// A comparison operand. Strings stay quoted and are not interpolated.
    fn literal(&self, value: &Value) -> Result<String, Error> {
        match value {
            Value::Str(s) => Ok(format!("\"{s}\"")),
            Value::Number(_) | Value::Bool(_) => Ok(value.text().to_string()),
            Value::Ident(name) => self.reference(name).map(|r| format!("\"{r}\"")),
        }
    }

    /// `%{..}` for a variable or a readable symbol.
    fn reference(&self, name: &str) -> Result<String, Error> {
        if let Some(var) = self.vars.get(name) {
            return Ok(var.condition_ref());
        }
        Ok(self
            .ctx
            .tables
            .resolve(TableKind::Condition, name, Some(self.section))?
            .condition_ref())
    }

    // Statements

    fn statement(&mut self, stmt: &Stmt, indent: usize) -> Step<Vec<String>> {
        let pad = self.pad(indent);
        match stmt {
            Stmt::Break { .. } => Ok(vec![format!("{pad}no-op [L]")]),
            Stmt::Assign {
                target,
                op,
                value,
                span,
            } => {
                let line = self.assignment(target, *op, value, *span).map_err(at(*span))?;
                Ok(vec![format!("{pad}{line}")])
            }
            Stmt::Call {
                name,
                args,
                modifiers,
                span,
            } => {
                let line = self.call(name, args, modifiers, *span).map_err(at(*span))?;
                Ok(vec![format!("{pad}{line}")])
            }
            Stmt::Bare { name, span } => {
                let line = self.call(name, &[], &[], *span).map_err(at(*span))?;
                Ok(vec![format!("{pad}{line}")])
            }
            Stmt::If(cond) => {
                let mut lines = vec![format!("{pad}if")];
                self.conditional(cond, indent + 1, &mut lines)?;
                lines.push(format!("{pad}endif"));
                Ok(lines)
            }
        }
    }

    fn assignment(
        &mut self,
        target: &str,
        op: AssignOp,
        value: &Value,
        span: Span,
    ) -> Result<String, Error> {
        if let Some(var) = self.vars.get(target) {
            return self.vars.assignment(var, op, value);
        }

        let tables = self.ctx.tables;
        let resolved = tables.resolve(TableKind::Operator, target, Some(self.section))?;
        let entry = resolved.entry;
        let removing = op == AssignOp::Set
            && value.is_empty_string()
            && entry.target.variant("rm").is_some();
        let verb = match op {
            _ if removing => "rm",
            AssignOp::Add => "add",
            AssignOp::Set => "set",
        };
        let command = entry.target.variant(verb).ok_or_else(|| {
            Error::validation(
                "operator",
                target,
                format!("'{}' cannot be used with '{}'", target, if verb == "add" { "+=" } else { "=" }),
            )
        })?;

        let mut line = command.to_string();
        if let Some(suffix) = resolved.rendered_suffix() {
            line.push(' ');
            line.push_str(&suffix);
        }
        if !removing {
            entry.check_args(target, &[value.as_arg()])?;
            line.push(' ');
            line.push_str(&self.value(value, span, false)?);
        }
        Ok(line)
    }

    fn call(
        &mut self,
        name: &str,
        args: &[Value],
        modifiers: &[String],
        span: Span,
    ) -> Result<String, Error> {
        let tables = self.ctx.tables;
        let entry = tables
            .resolve(TableKind::StatementFunction, name, Some(self.section))?
            .entry;
        let views: Vec<Arg<'_>> = args.iter().map(Value::as_arg).collect();
        entry.check_args(name, &views)?;

        let mut state = OperatorState::default();
        for modifier in modifiers.iter().map(String::as_str).chain(entry.reverse_hint) {
            if !state.apply(modifier) {
                return Err(Error::validation(
                    "modifier",
                    modifier,
                    "expected one of L, QSA, INV",
                ));
            }
        }
        let mut line = entry.target.primary().to_string();
        for arg in args {
            line.push(' ');
            line.push_str(&self.value(arg, span, true)?);
        }
        line.push_str(&state.render());
        Ok(line)
    }

    /// An operator argument. Strings are interpolated; bare identifiers are
    /// kept as tokens when `bare_tokens` is set.
    fn value(&mut self, value: &Value, span: Span, bare_tokens: bool) -> Result<String, Error> {
        match value {
            Value::Str(s) => Ok(format!("\"{}\"", self.interpolate(s, span))),
            Value::Number(_) | Value::Bool(_) => Ok(value.text().to_string()),
            Value::Ident(name) => match self.vars.get(name) {
                Some(var) => Ok(var.condition_ref()),
                None if bare_tokens => Ok(name.clone()),
                None => self.reference(name).map(|r| format!("\"{r}\"")),
            },
        }
    }

    /// Replace `{symbol}`, `{var}` and `{func(args)}` with `%{...}`.
    ///
    /// Unresolved references stay as written and are reported.
    fn interpolate(&mut self, text: &str, span: Span) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in INTERPOLATION.captures_iter(text) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if text[..whole.start()].ends_with('%') {
                continue;
            }
            out.push_str(&text[last..whole.start()]);
            match self.interpolated_ref(inner.as_str()) {
                Ok(reference) => out.push_str(&reference),
                Err(error) => {
                    out.push_str(whole.as_str());
                    self.report(at(span)(error));
                }
            }
            last = whole.end();
        }
        out.push_str(&text[last..]);
        out
    }

    fn interpolated_ref(&self, inner: &str) -> Result<String, Error> {
        let Some((name, rest)) = inner.split_once('(') else {
            return self.reference(inner);
        };
        let args: Vec<Value> = rest
            .trim_end_matches(')')
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(|a| match a.strip_prefix('"').and_then(|a| a.strip_suffix('"')) {
                Some(quoted) => Value::Str(quoted.to_string()),
                None if a.starts_with(|c: char| c.is_ascii_digit()) => Value::Number(a.to_string()),
                None => Value::Ident(a.to_string()),
            })
            .collect();
        self.function_ref(name.trim(), &args)
    }
}

/// Operands of a chain of `connector`, looking through parentheses.
fn flatten<'e>(expr: &'e Expr, connector: Connector, out: &mut Vec<&'e Expr>) {
    match (expr.strip_groups(), connector) {
        (Expr::Or(lhs, rhs), Connector::Or) | (Expr::And(lhs, rhs), Connector::And) => {
            flatten(lhs, connector, out);
            flatten(rhs, connector, out);
        }
        (other, _) => out.push(other),
    }
}
