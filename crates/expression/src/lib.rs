//! Restricted expression language for the app builder.
//!
//! Two entry points:
//!
//! - [`resolve_binding`] splices `{{path}}` values from a context into text.
//! - [`evaluate_condition`] evaluates a boolean condition such as
//!   `{{user.role}} === 'admin' && {{count}} > 0`.
//!
//! Conditions fail open: an empty, malformed or disallowed condition
//! evaluates to `true`, so a typo never hides a component.

use serde_json::Value as Json;
use thiserror::Error;
use tracing::debug;

mod ast;
mod binding;
mod lexer;
mod parser;
mod path;
mod value;

pub use ast::{BinaryOp, Expr};
pub use binding::{contains_binding, display_value, resolve_binding};
pub use parser::MAX_DEPTH;
pub use path::lookup_path;
pub use value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("character {0:?} is not allowed in conditions")]
    DisallowedCharacter(char),
    #[error("unexpected character {0:?} at offset {1}")]
    UnexpectedCharacter(char, usize),
    #[error("unterminated string starting at offset {0}")]
    UnterminatedString(usize),
    #[error("unterminated placeholder starting at offset {0}")]
    UnterminatedPlaceholder(usize),
    #[error("empty placeholder at offset {0}")]
    EmptyPlaceholder(usize),
    #[error("invalid number literal {0:?}")]
    InvalidNumber(String),
    #[error("unknown identifier {0:?}")]
    UnknownIdentifier(String),
    #[error("unexpected token {0}")]
    UnexpectedToken(String),
    #[error("missing closing parenthesis")]
    UnclosedParen,
    #[error("unexpected end of condition")]
    UnexpectedEnd,
    #[error("condition nests deeper than {0} levels")]
    TooDeep(usize),
}

/// Characters a condition may contain outside its placeholders.
fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || c.is_whitespace()
        || matches!(
            c,
            '_' | '\'' | '"' | ',' | '.' | '(' | ')' | '=' | '!' | '<' | '>' | '&' | '|'
        )
}

/// A parsed condition, reusable across contexts.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    expr: Expr,
}

impl Condition {
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        if let Some(c) = binding::strip_placeholders(source)
            .chars()
            .find(|c| !is_allowed(*c))
        {
            return Err(ExprError::DisallowedCharacter(c));
        }
        let tokens = lexer::Lexer::new(source).tokenize()?;
        let expr = parser::Parser::new(tokens).parse()?;
        Ok(Self { expr })
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn evaluate(&self, context: &Json) -> bool {
        self.expr.evaluate(context).truthy()
    }
}

/// Evaluates `source` against `context`. Empty conditions and conditions
/// that fail to parse are `true`.
pub fn evaluate_condition(source: &str, context: &Json) -> bool {
    if source.trim().is_empty() {
        return true;
    }
    match Condition::parse(source) {
        Ok(condition) => condition.evaluate(context),
        Err(error) => {
            debug!(condition = source, %error, "condition rejected; treating as true");
            true
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
