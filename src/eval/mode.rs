use super::{
    builtins::Builtin,
    call::Arguments,
    ctx::Interpreter,
    env::Binding,
    roller::Roller,
    tree::{Capability, Evaluate, Node},
    value::Value,
    EResult,
};
use crate::distribution::Distribution;

/// An evaluation mode. Blocks, calls and assignments are written once over
/// this trait and run in either mode.
pub(crate) trait Mode {
    type Output;

    fn value<R: Roller>(ctx: &mut Interpreter<R>, node: &Node) -> EResult<Self::Output>;

    /// What an assignment of `node` stores in this mode.
    fn bind<R: Roller>(ctx: &mut Interpreter<R>, node: &Node) -> EResult<Binding>;

    fn builtin<R: Roller>(
        builtin: Builtin,
        ctx: &mut Interpreter<R>,
        args: &Arguments,
    ) -> EResult<Self::Output>;
}

/// One randomized realization.
pub(crate) enum Sample {}

/// The exact probability law.
pub(crate) enum Exact {}

impl Mode for Sample {
    type Output = Value;

    fn value<R: Roller>(ctx: &mut Interpreter<R>, node: &Node) -> EResult<Value> {
        ctx.value_of(node)
    }

    fn bind<R: Roller>(ctx: &mut Interpreter<R>, node: &Node) -> EResult<Binding> {
        ctx.value_of(node).map(Binding::Value)
    }

    fn builtin<R: Roller>(
        builtin: Builtin,
        ctx: &mut Interpreter<R>,
        args: &Arguments,
    ) -> EResult<Value> {
        builtin.sample(ctx, args)
    }
}

impl Mode for Exact {
    type Output = Distribution;

    fn value<R: Roller>(ctx: &mut Interpreter<R>, node: &Node) -> EResult<Distribution> {
        ctx.distribution_of(node)
    }

    fn bind<R: Roller>(ctx: &mut Interpreter<R>, node: &Node) -> EResult<Binding> {
        match node {
            // passed along as stored, so a sequence stays a sequence
            Node::GetVar(get) => ctx.lookup(&get.name),
            _ if node.capability() == Capability::Distributable => {
                ctx.distribution_of(node).map(Binding::Distribution)
            }
            _ => ctx
                .distribution_sequence_of(node)
                .map(Binding::Distributions),
        }
    }

    fn builtin<R: Roller>(
        builtin: Builtin,
        ctx: &mut Interpreter<R>,
        args: &Arguments,
    ) -> EResult<Distribution> {
        builtin.distribution(ctx, args)
    }
}
