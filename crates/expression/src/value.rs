//! Runtime values of the condition language, with JavaScript comparison
//! semantics so conditions written for the web builder keep their meaning.

use std::cmp::Ordering;

use serde_json::Value as Json;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    /// Objects and arrays resolved from the context. Compared structurally.
    Compound(Json),
}

impl Value {
    pub fn from_json(json: &Json) -> Self {
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(*b),
            Json::Number(n) => n.as_f64().map_or(Self::Undefined, Self::Number),
            Json::String(s) => Self::Str(s.clone()),
            Json::Array(_) | Json::Object(_) => Self::Compound(json.clone()),
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Str(s) => !s.is_empty(),
            Self::Compound(_) => true,
        }
    }

    fn to_number(&self) -> f64 {
        match self {
            Self::Undefined | Self::Compound(_) => f64::NAN,
            Self::Null => 0.0,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Number(n) => *n,
            Self::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
        }
    }

    pub fn strict_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Compound(a), Self::Compound(b)) => a == b,
            _ => false,
        }
    }

    pub fn loose_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined | Self::Null, Self::Undefined | Self::Null) => true,
            (Self::Undefined | Self::Null, _) | (_, Self::Undefined | Self::Null) => false,
            (Self::Number(_), Self::Str(_)) | (Self::Str(_), Self::Number(_)) => {
                self.to_number() == other.to_number()
            }
            (Self::Bool(_), _) => Self::Number(self.to_number()).loose_eq(other),
            (_, Self::Bool(_)) => self.loose_eq(&Self::Number(other.to_number())),
            _ => self.strict_eq(other),
        }
    }

    /// Relational comparison; `None` when either side is not comparable
    /// (NaN after numeric coercion), which makes every relational operator
    /// false.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        if let (Self::Str(a), Self::Str(b)) = (self, other) {
            return Some(a.cmp(b));
        }
        self.to_number().partial_cmp(&other.to_number())
    }
}
