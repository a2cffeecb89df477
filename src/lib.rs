//! Evaluates dice expressions two ways: by rolling them, or by computing
//! the exact probability of every result.

pub mod common;
mod distribution;
mod error;
pub mod eval;

pub use distribution::{Atom, Distribution, Outcome};
pub use error::{EResult, EvalError};
pub use eval::{
    distribution, evaluate, Arguments, Binary, Binding, Block, Builtin, Call, CallShape,
    Capability, Config, Declaration, DefaultRoller, Dice, Evaluate, Function, GetVar,
    Interpreter, Literal, Node, Number, Output, Registry, Roller, Sequence, SetVar, Signature,
    UserFunction, Value,
};
