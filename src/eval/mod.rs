mod block;
mod builtins;
mod call;
mod ctx;
mod dice;
mod env;
mod mode;
mod num;
mod roller;
mod tree;
mod value;

use crate::distribution::Distribution;
pub(crate) use crate::error::EResult;

pub use block::{Block, Declaration, Signature};
pub use builtins::Builtin;
pub use call::{Arguments, Call, CallShape, Function, Registry, UserFunction};
pub use ctx::{Config, DefaultRoller, Interpreter};
pub use dice::Dice;
pub use env::Binding;
pub use num::Number;
pub use roller::Roller;
pub use tree::{Binary, Capability, Evaluate, GetVar, Literal, Node, Output, Sequence, SetVar};
pub use value::Value;

/// Samples `node` once with a fresh, thread-seeded interpreter.
pub fn evaluate(node: &Node) -> EResult<Value> {
    Interpreter::<DefaultRoller>::default().evaluate(node)
}

/// The exact law of `node`, computed by a fresh interpreter.
pub fn distribution(node: &Node) -> EResult<Distribution> {
    Interpreter::<DefaultRoller>::default().distribution(node)
}
