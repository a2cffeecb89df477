use super::{num::Number, EResult};
use crate::common::*;
use crate::distribution::Distribution;
use crate::error::EvalError;
use std::fmt;

/// The result of evaluating a node in sampling mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(Number),
    Seq(Vec<Value>),
    /// A distribution reified as data by the `distribution` built-in.
    Distribution(Distribution),
}

impl Value {
    pub fn as_number(&self) -> EResult<Number> {
        match self {
            Self::Number(x) => Ok(*x),
            other => Err(EvalError::value_error(format!(
                "expected a number, found {}",
                other.kind()
            ))),
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Number(_) => "a number",
            Self::Seq(_) => "a sequence",
            Self::Distribution(_) => "a distribution",
        }
    }

    /// Sequence items, or the value itself as a singleton.
    pub fn into_items(self) -> Vec<Value> {
        match self {
            Self::Seq(items) => items,
            other => vec![other],
        }
    }

    /// The law of this value seen as a random variable: numbers become a
    /// unit mass, reified distributions are taken as they are.
    pub fn to_distribution(&self) -> EResult<Distribution> {
        match self {
            Self::Number(x) => Ok(Distribution::certain(*x)),
            Self::Distribution(d) => Ok(d.clone()),
            Self::Seq(_) => Err(EvalError::unsupported(
                "take the distribution of",
                "a sequence value",
            )),
        }
    }
}

impl From<Number> for Value {
    fn from(x: Number) -> Self {
        Self::Number(x)
    }
}

impl From<Int> for Value {
    fn from(x: Int) -> Self {
        Self::Number(x.into())
    }
}

impl From<Float> for Value {
    fn from(x: Float) -> Self {
        Self::Number(x.into())
    }
}

impl From<Distribution> for Value {
    fn from(d: Distribution) -> Self {
        Self::Distribution(d)
    }
}

impl<T: Into<Value>> FromIterator<T> for Value {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::Seq(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(x) => fmt::Display::fmt(x, f),
            Self::Seq(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Self::Distribution(d) => fmt::Display::fmt(d, f),
        }
    }
}
