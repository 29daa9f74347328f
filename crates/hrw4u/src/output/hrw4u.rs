//! hrw4u writer: pretty-prints the IR as source form.

use crate::config::OutputOptions;
use crate::error::Translation;
use crate::input::hrw4u::is_identifier;
use crate::ir::*;
use crate::traits::{Context, Writer};
use crate::vars::VarType;
use std::collections::BTreeSet;

/// Static instance of the hrw4u writer for registry.
pub static HRW4U_WRITER: Hrw4uWriter = Hrw4uWriter;

pub struct Hrw4uWriter;

impl Writer for Hrw4uWriter {
    fn format(&self) -> &'static str {
        "hrw4u"
    }

    fn extension(&self) -> &'static str {
        "hrw4u"
    }

    fn write(&self, program: &Program, ctx: &Context<'_>) -> Translation<String> {
        Translation::new(Printer::emit(program, &ctx.options.output), Vec::new())
    }
}

// Binding strength, loosest first.
const OR: u8 = 1;
const AND: u8 = 2;
const UNARY: u8 = 3;

/// Emits IR as hrw4u source.
pub struct Printer<'o> {
    output: String,
    indent: usize,
    options: &'o OutputOptions,
}

impl<'o> Printer<'o> {
    pub fn new(options: &'o OutputOptions) -> Self {
        Self {
            output: String::new(),
            indent: 0,
            options,
        }
    }

    /// Emit a program to hrw4u source.
    pub fn emit(program: &Program, options: &'o OutputOptions) -> String {
        let mut printer = Self::new(options);
        printer.write_program(program);
        printer.output
    }

    /// Emit one boolean expression.
    pub fn emit_expr(expr: &Expr) -> String {
        let options = OutputOptions::default();
        let mut printer = Printer::new(&options);
        printer.write_expr(expr, OR);
        printer.output
    }

    fn write_program(&mut self, program: &Program) {
        let mut first = true;
        if !program.vars.is_empty() {
            self.write_vars(&program.vars);
            first = false;
        }
        for section in &program.sections {
            if !first {
                self.output.push('\n');
            }
            first = false;
            self.output.push_str(&section.name);
            self.output.push_str(" {\n");
            self.write_body(&section.body);
            self.output.push_str("}\n");
        }
    }

    fn write_vars(&mut self, vars: &[VarDecl]) {
        self.output.push_str("VARS {\n");
        let mut used: BTreeSet<(Option<VarType>, usize)> = BTreeSet::new();
        for var in vars {
            let ty = VarType::from_name(&var.ty);
            let implicit = (0..).find(|i| !used.contains(&(ty, *i))).unwrap_or(0);
            let slot = var.slot.unwrap_or(implicit);
            used.insert((ty, slot));
            self.pad(1);
            self.output.push_str(&var.name);
            self.output.push_str(": ");
            self.output.push_str(&var.ty);
            if slot != implicit {
                self.output.push_str(&format!(" @{slot}"));
            }
            self.output.push_str(";\n");
        }
        self.output.push_str("}\n");
    }

    fn pad(&mut self, extra: usize) {
        self.output.push_str(&self.options.pad(self.indent + extra));
    }

    fn write_body(&mut self, body: &[Stmt]) {
        self.indent += 1;
        for (i, stmt) in body.iter().enumerate() {
            if i > 0 && (matches!(stmt, Stmt::If(_)) || matches!(body[i - 1], Stmt::If(_))) {
                self.output.push('\n');
            }
            self.write_stmt(stmt);
        }
        self.indent -= 1;
    }

    fn write_stmt(&mut self, stmt: &Stmt) {
        self.pad(0);
        match stmt {
            Stmt::Assign {
                target, op, value, ..
            } => {
                self.output.push_str(target);
                self.output.push_str(match op {
                    AssignOp::Set => " = ",
                    AssignOp::Add => " += ",
                });
                self.write_value(value);
                self.output.push_str(";\n");
            }
            Stmt::Call {
                name,
                args,
                modifiers,
                ..
            } => {
                self.write_call(name, args);
                self.write_modifiers(modifiers);
                self.output.push_str(";\n");
            }
            Stmt::Bare { name, .. } => {
                self.output.push_str(name);
                self.output.push_str(";\n");
            }
            Stmt::Break { .. } => self.output.push_str("break;\n"),
            Stmt::If(cond) => self.write_conditional(cond),
        }
    }

    fn write_conditional(&mut self, cond: &Conditional) {
        for (i, branch) in cond.branches.iter().enumerate() {
            self.output.push_str(if i == 0 { "if " } else { " elif " });
            self.write_expr(&branch.condition, OR);
            self.output.push_str(" {\n");
            self.write_body(&branch.body);
            self.pad(0);
            self.output.push('}');
        }
        if let Some(otherwise) = &cond.otherwise {
            self.output.push_str(" else {\n");
            self.write_body(otherwise);
            self.pad(0);
            self.output.push('}');
        }
        self.output.push('\n');
    }

    fn write_expr(&mut self, expr: &Expr, context: u8) {
        let expr = expr.strip_groups();
        let (strength, parens) = match expr {
            Expr::Or(..) => (OR, context > OR),
            Expr::And(..) => (AND, context > AND),
            _ => (UNARY, false),
        };
        if parens {
            self.output.push('(');
        }
        match expr {
            Expr::Or(lhs, rhs) | Expr::And(lhs, rhs) => {
                self.write_expr(lhs, strength);
                self.output
                    .push_str(if strength == OR { " || " } else { " && " });
                self.write_expr(rhs, strength);
            }
            Expr::Not(inner) => {
                self.output.push('!');
                self.write_expr(inner, UNARY);
            }
            Expr::Group(inner) => self.write_expr(inner, context),
            Expr::Bool(b) => self.output.push_str(if *b { "true" } else { "false" }),
            Expr::Ident { name, .. } => self.output.push_str(name),
            Expr::Call { name, args, .. } => self.write_call(name, args),
            Expr::Compare(cmp) => self.write_comparison(cmp),
        }
        if parens {
            self.output.push(')');
        }
    }

    fn write_comparison(&mut self, cmp: &Comparison) {
        match &cmp.lhs {
            Operand::Ident(name) => self.output.push_str(name),
            Operand::Call { name, args } => self.write_call(name, args),
        }
        self.output.push(' ');
        self.output.push_str(cmp.op.symbol());
        self.output.push(' ');
        match &cmp.rhs {
            Rhs::Value(value) => self.write_value(value),
            Rhs::Regex(regex) => self.output.push_str(regex),
            Rhs::Set(values) => {
                self.output.push('[');
                self.write_list(values);
                self.output.push(']');
            }
            Rhs::IpRange(ranges) => {
                self.output.push('{');
                self.output.push_str(&ranges.join(", "));
                self.output.push('}');
            }
        }
        self.write_modifiers(&cmp.modifiers);
    }

    fn write_call(&mut self, name: &str, args: &[Value]) {
        self.output.push_str(name);
        self.output.push('(');
        self.write_list(args);
        self.output.push(')');
    }

    fn write_list(&mut self, values: &[Value]) {
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                self.output.push_str(", ");
            }
            self.write_value(value);
        }
    }

    fn write_modifiers(&mut self, modifiers: &[String]) {
        if !modifiers.is_empty() {
            self.output.push_str(" with ");
            self.output.push_str(&modifiers.join(","));
        }
    }

    fn write_value(&mut self, value: &Value) {
        match value {
            Value::Ident(name) if is_identifier(name) => self.output.push_str(name),
            Value::Str(text) | Value::Ident(text) => {
                self.output.push('"');
                self.output.push_str(text);
                self.output.push('"');
            }
            Value::Number(n) => self.output.push_str(n),
            Value::Bool(b) => self.output.push_str(if *b { "true" } else { "false" }),
        }
    }
}
