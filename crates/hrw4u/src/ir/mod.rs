//! Abstract syntax tree for hrw4u source form.
//!
//! Both directions of translation meet here: the source reader and the
//! inverse compiler produce a [`Program`]; the forward compiler and the
//! source pretty-printer consume one.

mod structure_eq;

pub use structure_eq::StructureEq;

use crate::validate::Arg;
use serde::{Deserialize, Serialize};

/// A position in source text. Lines and columns are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A whole document: variable declarations, then hook sections.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub vars: Vec<VarDecl>,
    pub sections: Vec<Section>,
    /// Line of the `VARS` keyword, if the document declares variables.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub vars_span: Option<Span>,
}

/// `name: type [@slot];` inside a `VARS` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: String,
    pub ty: String,
    pub slot: Option<usize>,
    pub span: Span,
}

/// `NAME { ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    /// `=`
    Set,
    /// `+=`
    Add,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// `target = value;` or `target += value;`
    Assign {
        target: String,
        op: AssignOp,
        value: Value,
        span: Span,
    },
    /// `name(args) [with MODS];`
    Call {
        name: String,
        args: Vec<Value>,
        modifiers: Vec<String>,
        span: Span,
    },
    /// `name;`
    Bare { name: String, span: Span },
    /// `break;`
    Break { span: Span },
    If(Conditional),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Assign { span, .. }
            | Stmt::Call { span, .. }
            | Stmt::Bare { span, .. }
            | Stmt::Break { span } => *span,
            Stmt::If(cond) => cond.span,
        }
    }
}

/// `if .. { } elif .. { } else { }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditional {
    /// The `if` branch followed by every `elif`.
    pub branches: Vec<Branch>,
    pub otherwise: Option<Vec<Stmt>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub condition: Expr,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    /// Parenthesized sub-expression.
    Group(Box<Expr>),
    Bool(bool),
    /// A bare symbol or variable used as a boolean.
    Ident {
        name: String,
        span: Span,
    },
    /// A condition function such as `cidr(24, 64)`.
    Call {
        name: String,
        args: Vec<Value>,
        span: Span,
    },
    Compare(Box<Comparison>),
}

impl Expr {
    pub fn and(lhs: Expr, rhs: Expr) -> Expr {
        Expr::And(Box::new(lhs), Box::new(rhs))
    }

    pub fn or(lhs: Expr, rhs: Expr) -> Expr {
        Expr::Or(Box::new(lhs), Box::new(rhs))
    }

    pub fn not(inner: Expr) -> Expr {
        Expr::Not(Box::new(inner))
    }

    pub fn group(inner: Expr) -> Expr {
        Expr::Group(Box::new(inner))
    }

    pub fn ident(name: impl Into<String>) -> Expr {
        Expr::Ident {
            name: name.into(),
            span: Span::default(),
        }
    }

    /// Look through any number of parentheses.
    pub fn strip_groups(&self) -> &Expr {
        let mut expr = self;
        while let Expr::Group(inner) = expr {
            expr = inner;
        }
        expr
    }

    /// A single term: not a chain, negation or group.
    pub fn is_term(&self) -> bool {
        matches!(
            self,
            Expr::Bool(_) | Expr::Ident { .. } | Expr::Call { .. } | Expr::Compare(_)
        )
    }

    /// Location of the leftmost term.
    pub fn span(&self) -> Option<Span> {
        match self {
            Expr::Or(lhs, _) | Expr::And(lhs, _) => lhs.span(),
            Expr::Not(inner) | Expr::Group(inner) => inner.span(),
            Expr::Bool(_) => None,
            Expr::Ident { span, .. } | Expr::Call { span, .. } => Some(*span),
            Expr::Compare(cmp) => Some(cmp.span),
        }
    }
}

/// `lhs op rhs [with MODS]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub lhs: Operand,
    pub op: CompareOp,
    pub rhs: Rhs,
    pub modifiers: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Ident(String),
    Call { name: String, args: Vec<Value> },
}

impl Operand {
    pub fn name(&self) -> &str {
        match self {
            Operand::Ident(name) | Operand::Call { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Match,
    NotMatch,
    In,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
            CompareOp::Match => "~",
            CompareOp::NotMatch => "!~",
            CompareOp::In => "in",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Rhs {
    Value(Value),
    /// `/pattern/`, slashes included.
    Regex(String),
    /// `["a", "b"]`
    Set(Vec<Value>),
    /// `{10.0.0.0/8, 192.168.0.0/16}`
    IpRange(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    /// String contents without the surrounding quotes.
    Str(String),
    Number(String),
    Bool(bool),
    Ident(String),
}

impl Value {
    pub fn text(&self) -> &str {
        match self {
            Value::Str(s) | Value::Number(s) | Value::Ident(s) => s,
            Value::Bool(true) => "true",
            Value::Bool(false) => "false",
        }
    }

    pub fn as_arg(&self) -> Arg<'_> {
        match self {
            Value::Str(s) => Arg::quoted(s),
            _ => Arg::bare(self.text()),
        }
    }

    pub fn is_empty_string(&self) -> bool {
        matches!(self, Value::Str(s) if s.is_empty())
    }
}
