use super::{
    block::{Block, Declaration},
    call::Call,
    ctx::Interpreter,
    dice::Dice,
    env::Binding,
    num::Number,
    roller::Roller,
    value::Value,
    EResult,
};
use crate::common::*;
use crate::distribution::{Atom, Distribution};
use crate::error::EvalError;

/// What a node can be asked for, fixed by its variant.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Capability {
    /// Runs for its side effect only; has no value in either mode.
    Statement,
    /// Has a sampled value, but no single distribution.
    Evaluable,
    /// Has both a sampled value and an exact distribution.
    Distributable,
}

#[enum_dispatch::enum_dispatch]
pub trait Evaluate {
    fn kind(&self) -> &'static str;

    fn capability(&self) -> Capability {
        Capability::Distributable
    }

    fn evaluate<R: Roller>(&self, _ctx: &mut Interpreter<R>) -> EResult<Value> {
        Err(EvalError::unsupported("evaluate", self.kind()))
    }

    fn distribution<R: Roller>(&self, _ctx: &mut Interpreter<R>) -> EResult<Distribution> {
        Err(EvalError::unsupported("take the distribution of", self.kind()))
    }

    /// Realized components, e.g. the individual dice of a roll.
    fn sequence<R: Roller>(&self, ctx: &mut Interpreter<R>) -> EResult<Vec<Value>> {
        Ok(vec![self.evaluate(ctx)?])
    }

    /// One law per component.
    fn distribution_sequence<R: Roller>(
        &self,
        ctx: &mut Interpreter<R>,
    ) -> EResult<Vec<Distribution>> {
        Ok(vec![self.distribution(ctx)?])
    }
}

#[derive(Debug, Clone, PartialEq)]
#[enum_dispatch::enum_dispatch(Evaluate)]
pub enum Node {
    Literal(Literal),
    Binary(Binary),
    Dice(Dice),
    Sequence(Sequence),
    GetVar(GetVar),
    SetVar(SetVar),
    Call(Call),
    Block(Block),
    Output(Output),
    Declaration(Declaration),
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Literal {
    pub value: Number,
}

impl Literal {
    pub fn new(value: impl Into<Number>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl Evaluate for Literal {
    fn kind(&self) -> &'static str {
        "a literal"
    }

    fn evaluate<R: Roller>(&self, _ctx: &mut Interpreter<R>) -> EResult<Value> {
        Ok(self.value.into())
    }

    fn distribution<R: Roller>(&self, _ctx: &mut Interpreter<R>) -> EResult<Distribution> {
        Ok(Distribution::certain(self.value))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binary {
    pub left: Box<Node>,
    pub op: BinaryOperator,
    pub right: Box<Node>,
}

impl Binary {
    pub fn new(left: impl Into<Node>, op: BinaryOperator, right: impl Into<Node>) -> Self {
        Self {
            left: Box::new(left.into()),
            op,
            right: Box::new(right.into()),
        }
    }

    /// Resolves `symbol` against the operator table once, up front.
    pub fn parse(
        left: impl Into<Node>,
        symbol: &str,
        right: impl Into<Node>,
    ) -> Result<Self, ParseOperatorError> {
        Ok(Self::new(left, symbol.parse()?, right))
    }
}

impl BinaryOperator {
    pub fn apply(self, left: Number, right: Number) -> EResult<Number> {
        use BinaryOperator::*;

        Ok(match self {
            Add => left + right,
            Sub => left - right,
            Mul => left * right,
            Div => {
                if right.is_zero() {
                    return Err(EvalError::ZeroDivision);
                }
                Number::Float(left.as_float() / right.as_float())
            }
            Lt => (left < right).into(),
            Gt => (left > right).into(),
            Le => (left <= right).into(),
            Ge => (left >= right).into(),
            Eq => (left == right).into(),
            Ne => (left != right).into(),
        })
    }

    pub(crate) fn apply_atoms(self, atoms: &[Atom]) -> EResult<Atom> {
        match atoms {
            [Atom::Number(l), Atom::Number(r)] => self.apply(*l, *r).map(Atom::Number),
            [_, _] => Err(EvalError::unsupported("do arithmetic on", "an absent die")),
            _ => Err(EvalError::value_error(format!(
                "operator {} expects 2 operands, found {}",
                self,
                atoms.len()
            ))),
        }
    }
}

impl Evaluate for Binary {
    fn kind(&self) -> &'static str {
        if self.op.is_comparison() {
            "a comparison"
        } else {
            "an arithmetic expression"
        }
    }

    fn evaluate<R: Roller>(&self, ctx: &mut Interpreter<R>) -> EResult<Value> {
        let left = ctx.value_of(&self.left)?.as_number()?;
        let right = ctx.value_of(&self.right)?.as_number()?;
        Ok(self.op.apply(left, right)?.into())
    }

    fn distribution<R: Roller>(&self, ctx: &mut Interpreter<R>) -> EResult<Distribution> {
        let left = ctx.distribution_of(&self.left)?;
        let right = ctx.distribution_of(&self.right)?;
        let joint = ctx.product(&left, &right)?;
        joint.fold(|atoms| self.op.apply_atoms(atoms))
    }
}

/// A sequence literal `[a, b, ...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub items: Vec<Node>,
}

impl Sequence {
    pub fn new(items: Vec<Node>) -> Self {
        Self { items }
    }
}

impl Evaluate for Sequence {
    fn kind(&self) -> &'static str {
        "a sequence"
    }

    fn capability(&self) -> Capability {
        Capability::Evaluable
    }

    fn evaluate<R: Roller>(&self, ctx: &mut Interpreter<R>) -> EResult<Value> {
        Ok(Value::Seq(self.sequence(ctx)?))
    }

    fn sequence<R: Roller>(&self, ctx: &mut Interpreter<R>) -> EResult<Vec<Value>> {
        self.items.iter().map(|item| ctx.value_of(item)).collect()
    }

    fn distribution_sequence<R: Roller>(
        &self,
        ctx: &mut Interpreter<R>,
    ) -> EResult<Vec<Distribution>> {
        self.items
            .iter()
            .map(|item| ctx.distribution_of(item))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetVar {
    pub name: String,
}

impl GetVar {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Evaluate for GetVar {
    fn kind(&self) -> &'static str {
        "a variable"
    }

    fn evaluate<R: Roller>(&self, ctx: &mut Interpreter<R>) -> EResult<Value> {
        Ok(ctx.lookup(&self.name)?.value())
    }

    fn distribution<R: Roller>(&self, ctx: &mut Interpreter<R>) -> EResult<Distribution> {
        ctx.lookup(&self.name)?.distribution()
    }

    fn sequence<R: Roller>(&self, ctx: &mut Interpreter<R>) -> EResult<Vec<Value>> {
        Ok(ctx.lookup(&self.name)?.sequence())
    }

    fn distribution_sequence<R: Roller>(
        &self,
        ctx: &mut Interpreter<R>,
    ) -> EResult<Vec<Distribution>> {
        ctx.lookup(&self.name)?.distribution_sequence()
    }
}

/// `name = value`. Binds in the innermost frame when executed as a statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SetVar {
    pub name: String,
    pub value: Box<Node>,
}

impl SetVar {
    pub fn new(name: impl Into<String>, value: impl Into<Node>) -> Self {
        Self {
            name: name.into(),
            value: Box::new(value.into()),
        }
    }

    pub(crate) fn bind(&self, ctx: &Interpreter<impl Roller>, binding: Binding) {
        ctx.scope().assign(self.name.clone(), binding);
    }
}

impl Evaluate for SetVar {
    fn kind(&self) -> &'static str {
        "an assignment"
    }

    fn capability(&self) -> Capability {
        Capability::Statement
    }
}

/// `output value`: ends the enclosing function body (or top-level
/// statement) with `value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub value: Box<Node>,
}

impl Output {
    pub fn new(value: impl Into<Node>) -> Self {
        Self {
            value: Box::new(value.into()),
        }
    }
}

impl Evaluate for Output {
    fn kind(&self) -> &'static str {
        "an output statement"
    }

    fn capability(&self) -> Capability {
        Capability::Statement
    }
}
