//! Document diagnostics, computed without translating.

use crate::document::{DocumentState, Range};
use hrw4u::ir::{Comparison, Expr, Operand, Program, Span, Stmt, Value};
use hrw4u::validate::Arg;
use hrw4u::vars::VariableTable;
use hrw4u::{Error, SectionType, TableKind, Tables, read_hrw4u};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditorDiagnostic {
    pub range: Range,
    pub severity: Severity,
    pub message: String,
}

/// Every problem in the document, in source order.
pub fn diagnostics(tables: &Tables, doc: &DocumentState) -> Vec<EditorDiagnostic> {
    if doc.text().trim().is_empty() {
        return Vec::new();
    }
    let mut out = match read_hrw4u(doc.text()) {
        Ok(program) => Checker::new(tables).run(&program),
        Err(err) => {
            let span = err.span();
            let error = Error::from(err);
            let mut out = vec![at(span, &error)];
            // The block scan survives syntax errors, so section names can still be checked.
            for section in doc.sections().iter().filter(|s| s.section.is_none()) {
                out.push(EditorDiagnostic {
                    range: section.name_range,
                    severity: Severity::Error,
                    message: Error::UnknownSymbol(section.name.clone()).to_string(),
                });
            }
            out
        }
    };
    out.sort_by_key(|d| (d.range.start, d.range.end));
    tracing::debug!(count = out.len(), "computed diagnostics");
    out
}

fn at(span: Span, error: &Error) -> EditorDiagnostic {
    EditorDiagnostic {
        range: Range::from_span(span, error.offending().chars().count()),
        severity: Severity::Error,
        message: error.to_string(),
    }
}

fn undeclared(name: &str) -> Error {
    Error::Variable {
        name: name.to_string(),
        reason: "is not declared".to_string(),
    }
}

/// Walks the IR once, resolving every symbol in its section.
struct Checker<'t> {
    tables: &'t Tables,
    vars: VariableTable,
    section: Option<SectionType>,
    out: Vec<EditorDiagnostic>,
}

impl<'t> Checker<'t> {
    fn new(tables: &'t Tables) -> Self {
        Self {
            tables,
            vars: VariableTable::new(),
            section: None,
            out: Vec::new(),
        }
    }

    fn run(mut self, program: &Program) -> Vec<EditorDiagnostic> {
        if let (Some(vars), Some(first)) = (program.vars_span, program.sections.first())
            && (vars.line, vars.column) > (first.span.line, first.span.column)
        {
            self.report(
                vars,
                Error::Variable {
                    name: "VARS".to_string(),
                    reason: "must come before any section".to_string(),
                },
            );
        }
        for decl in &program.vars {
            if let Err(err) = self.vars.declare(&decl.name, &decl.ty, decl.slot, decl.span) {
                self.report(decl.span, err);
            }
        }
        for section in &program.sections {
            self.section = SectionType::from_name(&section.name);
            if self.section.is_none() {
                self.report(section.span, Error::UnknownSymbol(section.name.clone()));
            }
            self.body(&section.body);
        }
        self.out
    }

    fn report(&mut self, span: Span, error: Error) {
        self.out.push(at(span, &error));
    }

    fn check(&mut self, span: Span, result: Result<(), Error>) {
        if let Err(err) = result {
            self.report(span, err);
        }
    }

    fn body(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Assign {
                target,
                op,
                value,
                span,
            } => {
                let result = if let Some(var) = self.vars.get(target) {
                    match value {
                        Value::Ident(name) if self.vars.get(name).is_none() => {
                            Err(undeclared(name))
                        }
                        _ => self.vars.assignment(var, *op, value).map(|_| ()),
                    }
                } else {
                    self.tables
                        .resolve(TableKind::Operator, target, self.section)
                        .map(|_| ())
                };
                self.check(*span, result);
            }
            Stmt::Call {
                name, args, span, ..
            } => {
                let result = self.call(TableKind::StatementFunction, name, args);
                self.check(*span, result);
            }
            Stmt::Bare { name, span } => {
                let result = self.call(TableKind::StatementFunction, name, &[]);
                self.check(*span, result);
            }
            Stmt::Break { .. } => {}
            Stmt::If(cond) => {
                for branch in &cond.branches {
                    self.expr(&branch.condition);
                    self.body(&branch.body);
                }
                if let Some(otherwise) = &cond.otherwise {
                    self.body(otherwise);
                }
            }
        }
    }

    fn call(&self, kind: TableKind, name: &str, args: &[Value]) -> Result<(), Error> {
        let entry = self.tables.resolve(kind, name, self.section)?.entry;
        let views: Vec<Arg<'_>> = args.iter().map(Value::as_arg).collect();
        entry.check_args(name, &views)
    }

    fn symbol(&self, name: &str) -> Result<(), Error> {
        if self.vars.get(name).is_some() {
            return Ok(());
        }
        match self.tables.resolve(TableKind::Condition, name, self.section) {
            Ok(_) => Ok(()),
            Err(Error::UnknownSymbol(_)) if !name.contains('.') => Err(undeclared(name)),
            Err(err) => Err(err),
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Or(lhs, rhs) | Expr::And(lhs, rhs) => {
                self.expr(lhs);
                self.expr(rhs);
            }
            Expr::Not(inner) | Expr::Group(inner) => self.expr(inner),
            Expr::Bool(_) => {}
            Expr::Ident { name, span } => {
                let result = self.symbol(name);
                self.check(*span, result);
            }
            Expr::Call { name, args, span } => {
                let result = self.call(TableKind::Function, name, args);
                self.check(*span, result);
            }
            Expr::Compare(cmp) => self.comparison(cmp),
        }
    }

    fn comparison(&mut self, cmp: &Comparison) {
        let result = match &cmp.lhs {
            Operand::Ident(name) => self.symbol(name),
            Operand::Call { name, args } => self.call(TableKind::Function, name, args),
        };
        self.check(cmp.span, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Position;

    fn check(text: &str) -> Vec<(u32, u32, String)> {
        let tables = Tables::new();
        let doc = DocumentState::new(text);
        diagnostics(&tables, &doc)
            .into_iter()
            .map(|d| (d.range.start.line, d.range.start.character, d.message))
            .collect()
    }

    #[test]
    fn test_empty_document() {
        assert!(check("").is_empty());
        assert!(check("  \n\n").is_empty());
    }

    #[test]
    fn test_clean_document() {
        let text = r#"VARS { seen: bool; }
REMAP {
    if seen && inbound.req.X-Foo == "1" {
        inbound.req.X-Bar = "2";
        keep_query("id");
    }
}"#;
        assert!(check(text).is_empty());
    }

    #[test]
    fn test_syntax_error() {
        let text = "REMAP {\n    if inbound.method ==\n}\nBOGUS {\n}";
        let found = check(text);
        assert_eq!(found.len(), 2, "{found:?}");
        assert!(found[0].2.starts_with("syntax error"), "{found:?}");
        assert_eq!((found[1].0, found[1].1), (3, 0));
        assert_eq!(found[1].2, "unknown symbol 'BOGUS'");
    }

    #[test]
    fn test_section_and_variable_errors() {
        let text = "REMAP {\n    no-op;\n}\nVARS {\n    a: bool;\n    a: int8;\n    b: float;\n    n: int8;\n}\nNOPE {\n    if ghost { }\n    a = n;\n}";
        let found = check(text);
        let messages: Vec<_> = found.iter().map(|(l, c, m)| (*l, *c, m.as_str())).collect();
        assert_eq!(
            messages,
            [
                (3, 0, "variable 'VARS': must come before any section"),
                (5, 4, "variable 'a': already declared at line 5"),
                (
                    6,
                    4,
                    "variable 'b': unknown type 'float', expected bool, int8 or int16"
                ),
                (9, 0, "unknown symbol 'NOPE'"),
                (10, 7, "variable 'ghost': is not declared"),
                (
                    11,
                    4,
                    "variable 'a': cannot assign int8 variable 'n' to a bool variable"
                ),
            ]
        );
    }

    #[test]
    fn test_unknown_and_restricted_symbols() {
        let text = r#"REMAP {
    outbound.conn.dscp = 8;
    inbound.nope = "x";
    if cidr(24) || inbound.bogus.thing == "a" {
        frobnicate();
    }
}"#;
        let found = check(text);
        let messages: Vec<_> = found.iter().map(|(l, _, m)| (*l, m.as_str())).collect();
        assert_eq!(
            messages,
            [
                (1, "'outbound.conn.dscp' is not available in section REMAP"),
                (2, "unknown symbol 'inbound.nope'"),
                (3, "cidr: expected 2 arguments, got 1"),
                (3, "unknown symbol 'inbound.bogus.thing'"),
                (4, "unknown symbol 'frobnicate'"),
            ]
        );
    }

    #[test]
    fn test_ranges_cover_the_offending_text() {
        let tables = Tables::new();
        let doc = DocumentState::new("REMAP {\n    inbound.nope = \"x\";\n}");
        let found = diagnostics(&tables, &doc);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::Error);
        assert_eq!(
            found[0].range,
            Range::new(Position::new(1, 4), Position::new(1, 16))
        );
    }
}
