//! Typed state variables and their slots.
//!
//! The directive engine stores per-transaction state in three fixed banks
//! (16 flags, 4 eight-bit integers, 1 sixteen-bit integer). A `VARS`
//! declaration binds a name to one slot of its type's bank.

use crate::error::Error;
use crate::ir::{AssignOp, Span, Value};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum VarType {
    Bool,
    Int8,
    Int16,
}

impl VarType {
    pub const ALL: [VarType; 3] = [VarType::Bool, VarType::Int8, VarType::Int16];

    /// Parse a declared type name.
    pub fn from_name(name: &str) -> Option<VarType> {
        match name.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Some(VarType::Bool),
            "int8" => Some(VarType::Int8),
            "int16" => Some(VarType::Int16),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VarType::Bool => "bool",
            VarType::Int8 => "int8",
            VarType::Int16 => "int16",
        }
    }

    pub fn slots(self) -> usize {
        match self {
            VarType::Bool => 16,
            VarType::Int8 => 4,
            VarType::Int16 => 1,
        }
    }

    /// Condition tag: `STATE-FLAG`, `STATE-INT8`, `STATE-INT16`.
    pub fn condition_tag(self) -> &'static str {
        match self {
            VarType::Bool => "STATE-FLAG",
            VarType::Int8 => "STATE-INT8",
            VarType::Int16 => "STATE-INT16",
        }
    }

    /// Operator that writes the slot.
    pub fn operator(self) -> &'static str {
        match self {
            VarType::Bool => "set-state-flag",
            VarType::Int8 => "set-state-int8",
            VarType::Int16 => "set-state-int16",
        }
    }

    pub fn from_condition_tag(tag: &str) -> Option<VarType> {
        Self::ALL.into_iter().find(|t| t.condition_tag() == tag)
    }

    pub fn from_operator(op: &str) -> Option<VarType> {
        Self::ALL.into_iter().find(|t| t.operator() == op)
    }

    /// Largest value a slot of this type can hold.
    pub fn max_value(self) -> i64 {
        match self {
            VarType::Bool => 1,
            VarType::Int8 => i64::from(u8::MAX),
            VarType::Int16 => i64::from(u16::MAX),
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A declared variable bound to a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableSlot {
    pub name: String,
    pub ty: VarType,
    pub index: usize,
    pub span: Span,
}

impl VariableSlot {
    /// `%{STATE-FLAG:3}`
    pub fn condition_ref(&self) -> String {
        format!("%{{{}:{}}}", self.ty.condition_tag(), self.index)
    }

    /// Name given to a slot whose declaration is not known.
    pub fn synthesized_name(ty: VarType, index: usize) -> String {
        format!("{}_{}", ty.name(), index)
    }
}

/// Declarations of one document.
#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    vars: Vec<VariableSlot>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `name`. Without an explicit slot, the lowest free slot of the type is used.
    pub fn declare(
        &mut self,
        name: &str,
        ty_name: &str,
        explicit: Option<usize>,
        span: Span,
    ) -> Result<&VariableSlot, Error> {
        if name.contains('.') || name.contains(':') || name.is_empty() {
            return Err(Error::variable(name, "names cannot contain '.' or ':'"));
        }
        if let Some(existing) = self.get(name) {
            return Err(Error::variable(
                name,
                format!("already declared at line {}", existing.span.line),
            ));
        }
        let ty = VarType::from_name(ty_name).ok_or_else(|| {
            Error::variable(
                name,
                format!("unknown type '{ty_name}', expected bool, int8 or int16"),
            )
        })?;
        let index = match explicit {
            Some(index) if index >= ty.slots() => {
                return Err(Error::variable(
                    name,
                    format!(
                        "slot {} out of range, {} has slots 0 to {}",
                        index,
                        ty,
                        ty.slots() - 1
                    ),
                ));
            }
            Some(index) => {
                if let Some(owner) = self.owner(ty, index) {
                    return Err(Error::variable(
                        name,
                        format!("slot {} of {} is already used by '{}'", index, ty, owner.name),
                    ));
                }
                index
            }
            None => (0..ty.slots())
                .find(|i| self.owner(ty, *i).is_none())
                .ok_or_else(|| {
                    Error::variable(
                        name,
                        format!("no free {} slots, at most {} allowed", ty, ty.slots()),
                    )
                })?,
        };
        tracing::trace!(name, ty = ty.name(), index, "declared variable");
        self.vars.push(VariableSlot {
            name: name.to_string(),
            ty,
            index,
            span,
        });
        Ok(&self.vars[self.vars.len() - 1])
    }

    pub fn get(&self, name: &str) -> Option<&VariableSlot> {
        self.vars.iter().find(|v| v.name == name)
    }

    /// Check an assignment to `target` and render its slot-writing directive.
    pub fn assignment(
        &self,
        target: &VariableSlot,
        op: AssignOp,
        value: &Value,
    ) -> Result<String, Error> {
        let name = target.name.as_str();
        if op == AssignOp::Add {
            return Err(Error::variable(name, "'+=' is not supported on variables"));
        }
        let ty = target.ty;
        let rendered = match value {
            Value::Ident(source_name) => {
                let source = self
                    .get(source_name)
                    .ok_or_else(|| Error::variable(source_name, "is not a declared variable"))?;
                if source.ty != ty {
                    return Err(Error::variable(
                        name,
                        format!(
                            "cannot assign {} variable '{}' to a {} variable",
                            source.ty, source_name, ty
                        ),
                    ));
                }
                source.condition_ref()
            }
            Value::Bool(b) if ty == VarType::Bool => b.to_string(),
            Value::Number(n) if ty != VarType::Bool => match n.parse::<i64>() {
                Ok(v) if (0..=ty.max_value()).contains(&v) => n.clone(),
                _ => {
                    return Err(Error::variable(
                        name,
                        format!("{n} does not fit in {ty} (0 to {})", ty.max_value()),
                    ));
                }
            },
            other => {
                return Err(Error::variable(
                    name,
                    format!("expected a {ty} value, got '{}'", other.text()),
                ));
            }
        };
        Ok(format!("{} {} {}", ty.operator(), target.index, rendered))
    }

    fn owner(&self, ty: VarType, index: usize) -> Option<&VariableSlot> {
        self.vars
            .iter()
            .find(|v| v.ty == ty && v.index == index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariableSlot> {
        self.vars.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
