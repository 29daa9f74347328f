//! Structural equality for IR trees.
//!
//! `structure_eq` compares trees while ignoring details that do not change
//! what a rule does. Round-trip tests rely on it, since the inverse compiler
//! cannot reproduce every surface choice of the original text.
//!
//! # Ignored
//!
//! - `Span`s everywhere
//! - Redundant parentheses (`Expr::Group`)
//! - Association of `&&` / `||` chains: `a && (b && c)` equals `(a && b) && c`
//! - `!(x == v)` versus `x != v`, and the same for the other invertible operators
//! - Case of section names and modifiers
//!
//! # Compared exactly
//!
//! - Symbol names, values and operators
//! - Statement order and branch structure

use super::{Branch, CompareOp, Comparison, Conditional, Expr, Program, Section, Stmt, VarDecl};

/// Equality that ignores surface details.
pub trait StructureEq {
    fn structure_eq(&self, other: &Self) -> bool;
}

impl StructureEq for Program {
    fn structure_eq(&self, other: &Self) -> bool {
        vec_structure_eq(&self.vars, &other.vars)
            && vec_structure_eq(&self.sections, &other.sections)
    }
}

impl StructureEq for VarDecl {
    fn structure_eq(&self, other: &Self) -> bool {
        self.name == other.name && self.ty == other.ty && self.slot == other.slot
    }
}

impl StructureEq for Section {
    fn structure_eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name) && vec_structure_eq(&self.body, &other.body)
    }
}

impl StructureEq for Stmt {
    fn structure_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Stmt::Assign {
                    target: t1,
                    op: o1,
                    value: v1,
                    ..
                },
                Stmt::Assign {
                    target: t2,
                    op: o2,
                    value: v2,
                    ..
                },
            ) => t1 == t2 && o1 == o2 && v1 == v2,

            (
                Stmt::Call {
                    name: n1,
                    args: a1,
                    modifiers: m1,
                    ..
                },
                Stmt::Call {
                    name: n2,
                    args: a2,
                    modifiers: m2,
                    ..
                },
            ) => n1 == n2 && a1 == a2 && modifiers_eq(m1, m2),

            (Stmt::Bare { name: n1, .. }, Stmt::Bare { name: n2, .. }) => n1 == n2,
            (Stmt::Break { .. }, Stmt::Break { .. }) => true,
            (Stmt::If(a), Stmt::If(b)) => a.structure_eq(b),
            _ => false,
        }
    }
}

impl StructureEq for Conditional {
    fn structure_eq(&self, other: &Self) -> bool {
        vec_structure_eq(&self.branches, &other.branches)
            && match (&self.otherwise, &other.otherwise) {
                (None, None) => true,
                (Some(a), Some(b)) => vec_structure_eq(a, b),
                _ => false,
            }
    }
}

impl StructureEq for Branch {
    fn structure_eq(&self, other: &Self) -> bool {
        self.condition.structure_eq(&other.condition) && vec_structure_eq(&self.body, &other.body)
    }
}

impl StructureEq for Comparison {
    fn structure_eq(&self, other: &Self) -> bool {
        self.lhs == other.lhs
            && self.op == other.op
            && self.rhs == other.rhs
            && modifiers_eq(&self.modifiers, &other.modifiers)
    }
}

impl StructureEq for Expr {
    fn structure_eq(&self, other: &Self) -> bool {
        let (a, b) = (self.strip_groups(), other.strip_groups());
        match (a, b) {
            (Expr::Or(..), Expr::Or(..)) => {
                vec_structure_eq_ref(&chain(a, is_or), &chain(b, is_or))
            }
            (Expr::And(..), Expr::And(..)) => {
                vec_structure_eq_ref(&chain(a, is_and), &chain(b, is_and))
            }
            (Expr::Not(x), Expr::Not(y)) => x.structure_eq(y),
            (Expr::Not(x), Expr::Compare(cmp)) | (Expr::Compare(cmp), Expr::Not(x)) => {
                match (x.strip_groups(), inverted(cmp.op)) {
                    (Expr::Compare(inner), Some(op)) => {
                        inner.op == op
                            && inner.lhs == cmp.lhs
                            && inner.rhs == cmp.rhs
                            && modifiers_eq(&inner.modifiers, &cmp.modifiers)
                    }
                    _ => false,
                }
            }
            (Expr::Bool(x), Expr::Bool(y)) => x == y,
            (Expr::Ident { name: n1, .. }, Expr::Ident { name: n2, .. }) => n1 == n2,
            (
                Expr::Call {
                    name: n1, args: a1, ..
                },
                Expr::Call {
                    name: n2, args: a2, ..
                },
            ) => n1 == n2 && a1 == a2,
            (Expr::Compare(x), Expr::Compare(y)) => x.structure_eq(y),
            _ => false,
        }
    }
}

fn is_or(expr: &Expr) -> Option<(&Expr, &Expr)> {
    match expr {
        Expr::Or(l, r) => Some((l, r)),
        _ => None,
    }
}

fn is_and(expr: &Expr) -> Option<(&Expr, &Expr)> {
    match expr {
        Expr::And(l, r) => Some((l, r)),
        _ => None,
    }
}

/// Operands of a chain of one connector, looking through parentheses.
fn chain<'a>(expr: &'a Expr, split: fn(&Expr) -> Option<(&Expr, &Expr)>) -> Vec<&'a Expr> {
    let expr = expr.strip_groups();
    match split(expr) {
        Some((l, r)) => {
            let mut out = chain(l, split);
            out.extend(chain(r, split));
            out
        }
        None => vec![expr],
    }
}

fn inverted(op: CompareOp) -> Option<CompareOp> {
    match op {
        CompareOp::Eq => Some(CompareOp::Ne),
        CompareOp::Ne => Some(CompareOp::Eq),
        CompareOp::Gt => Some(CompareOp::Le),
        CompareOp::Le => Some(CompareOp::Gt),
        CompareOp::Lt => Some(CompareOp::Ge),
        CompareOp::Ge => Some(CompareOp::Lt),
        CompareOp::Match => Some(CompareOp::NotMatch),
        CompareOp::NotMatch => Some(CompareOp::Match),
        CompareOp::In => None,
    }
}

fn modifiers_eq(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.eq_ignore_ascii_case(y))
}

fn vec_structure_eq<T: StructureEq>(a: &[T], b: &[T]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.structure_eq(y))
}

fn vec_structure_eq_ref<T: StructureEq>(a: &[&T], b: &[&T]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.structure_eq(y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Operand, Rhs, Span, Value};

    fn cmp(lhs: &str, op: CompareOp, value: &str) -> Expr {
        Expr::Compare(Box::new(Comparison {
            lhs: Operand::Ident(lhs.into()),
            op,
            rhs: Rhs::Value(Value::Str(value.into())),
            modifiers: vec![],
            span: Span::new(1, 1),
        }))
    }

    #[test]
    fn test_association_is_ignored() {
        let a = || cmp("inbound.method", CompareOp::Eq, "GET");
        let b = || cmp("inbound.url.host", CompareOp::Eq, "x");
        let c = || cmp("inbound.url.path", CompareOp::Eq, "y");
        let left = Expr::and(Expr::and(a(), b()), c());
        let right = Expr::and(a(), Expr::group(Expr::and(b(), c())));
        assert!(left.structure_eq(&right));
        assert_ne!(left, right);
    }

    #[test]
    fn test_negated_comparison_equals_inverse() {
        let negated = Expr::not(Expr::group(cmp("inbound.method", CompareOp::Eq, "x")));
        let inverse = cmp("inbound.method", CompareOp::Ne, "x");
        assert!(negated.structure_eq(&inverse));
        assert!(inverse.structure_eq(&negated));
    }

    #[test]
    fn test_connector_matters() {
        let a = || Expr::ident("inbound.req.A");
        let b = || Expr::ident("inbound.req.B");
        assert!(!Expr::and(a(), b()).structure_eq(&Expr::or(a(), b())));
    }

    #[test]
    fn test_spans_are_ignored() {
        let x = Expr::Ident {
            name: "flag".into(),
            span: Span::new(1, 4),
        };
        let y = Expr::Ident {
            name: "flag".into(),
            span: Span::new(9, 2),
        };
        assert!(x.structure_eq(&y));
    }
}
