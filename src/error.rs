use crate::common::Float;
use crate::eval::CallShape;

pub type EResult<T> = Result<T, EvalError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("no function matches the call {shape}")]
    UnknownFunctionShape { shape: CallShape },
    #[error("variable ${name} is not bound")]
    UnboundVariable { name: String },
    #[error("cannot {operation} {kind}")]
    UnsupportedOperation {
        operation: &'static str,
        kind: &'static str,
    },
    #[error("distribution has total mass {total}, expected 1")]
    MalformedDistribution { total: Float },
    #[error("cannot divide by zero")]
    ZeroDivision,
    #[error("too many dice rolled")]
    TooManyRolls,
    #[error("distribution has more than {limit} outcomes")]
    TooManyOutcomes { limit: usize },
    #[error("function calls nested deeper than {limit}")]
    RecursionLimit { limit: usize },
    #[error("block produced no value")]
    EmptyBlock,
    #[error("parameter ${name} is declared more than once")]
    DuplicateParameter { name: String },
    #[error("{0}")]
    ValueError(String),
}

impl EvalError {
    pub fn value_error(msg: impl ToString) -> Self {
        Self::ValueError(msg.to_string())
    }

    pub(crate) fn unsupported(operation: &'static str, kind: &'static str) -> Self {
        Self::UnsupportedOperation { operation, kind }
    }
}
