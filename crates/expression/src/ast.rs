use serde_json::Value as Json;

use crate::{path::lookup_path, value::Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    StrictEq,
    StrictNe,
    LooseEq,
    LooseNe,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// `{{path}}`, resolved against the context at evaluation time.
    Path(String),
    Not(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn evaluate(&self, context: &Json) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Path(path) => {
                lookup_path(context, path).map_or(Value::Undefined, |json| Value::from_json(&json))
            }
            Self::Not(inner) => Value::Bool(!inner.evaluate(context).truthy()),
            Self::Binary { op, lhs, rhs } => {
                let lhs = lhs.evaluate(context);
                let rhs = rhs.evaluate(context);
                Value::Bool(apply(*op, &lhs, &rhs))
            }
            // && and || yield an operand, not a boolean.
            Self::And(lhs, rhs) => {
                let lhs = lhs.evaluate(context);
                if lhs.truthy() {
                    rhs.evaluate(context)
                } else {
                    lhs
                }
            }
            Self::Or(lhs, rhs) => {
                let lhs = lhs.evaluate(context);
                if lhs.truthy() {
                    lhs
                } else {
                    rhs.evaluate(context)
                }
            }
        }
    }
}

fn apply(op: BinaryOp, lhs: &Value, rhs: &Value) -> bool {
    use std::cmp::Ordering::{Equal, Greater, Less};

    match op {
        BinaryOp::StrictEq => lhs.strict_eq(rhs),
        BinaryOp::StrictNe => !lhs.strict_eq(rhs),
        BinaryOp::LooseEq => lhs.loose_eq(rhs),
        BinaryOp::LooseNe => !lhs.loose_eq(rhs),
        BinaryOp::Lt => matches!(lhs.compare(rhs), Some(Less)),
        BinaryOp::Le => matches!(lhs.compare(rhs), Some(Less | Equal)),
        BinaryOp::Gt => matches!(lhs.compare(rhs), Some(Greater)),
        BinaryOp::Ge => matches!(lhs.compare(rhs), Some(Greater | Equal)),
    }
}
