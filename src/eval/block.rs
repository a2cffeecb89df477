use super::{
    call::{Arguments, CallShape, Function, UserFunction},
    ctx::Interpreter,
    env::Frame,
    mode::{Exact, Mode, Sample},
    roller::Roller,
    tree::{Capability, Evaluate, Node},
    value::Value,
    EResult,
};
use crate::distribution::Distribution;
use crate::error::EvalError;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

/// How a statement hands control back to its block.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Flow<T> {
    /// Carry on. Holds the statement's value, if it has one.
    Next(Option<T>),
    /// An `output` statement ran.
    Return(T),
}

impl<T> Flow<T> {
    pub(crate) fn into_value(self) -> EResult<T> {
        match self {
            Self::Next(Some(x)) | Self::Return(x) => Ok(x),
            Self::Next(None) => Err(EvalError::EmptyBlock),
        }
    }
}

/// Runs one statement in mode `M` against the current frame.
pub(crate) fn execute<M: Mode, R: Roller>(
    ctx: &mut Interpreter<R>,
    node: &Node,
) -> EResult<Flow<M::Output>> {
    Ok(match node {
        Node::SetVar(set) => {
            let binding = M::bind(ctx, &set.value)?;
            set.bind(&*ctx, binding);
            Flow::Next(None)
        }
        Node::Declaration(declaration) => {
            ctx.declare(declaration)?;
            Flow::Next(None)
        }
        Node::Output(output) => Flow::Return(M::value(ctx, &output.value)?),
        Node::Block(block) => block.run::<M, R>(ctx)?,
        other => Flow::Next(Some(M::value(ctx, other)?)),
    })
}

/// A statement list with its own scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Node>,
}

impl Block {
    pub fn new(statements: Vec<Node>) -> Self {
        Self { statements }
    }

    /// Runs in a fresh child of the current frame.
    pub(crate) fn run<M: Mode, R: Roller>(
        &self,
        ctx: &mut Interpreter<R>,
    ) -> EResult<Flow<M::Output>> {
        let frame = Frame::child(ctx.scope());
        ctx.with_scope(frame, |ctx| self.run_in::<M, R>(ctx))
    }

    /// Runs directly in the current frame.
    pub(crate) fn run_in<M: Mode, R: Roller>(
        &self,
        ctx: &mut Interpreter<R>,
    ) -> EResult<Flow<M::Output>> {
        let mut last = None;
        for statement in &self.statements {
            match execute::<M, R>(ctx, statement)? {
                Flow::Return(x) => return Ok(Flow::Return(x)),
                Flow::Next(x) => last = x,
            }
        }
        Ok(Flow::Next(last))
    }

    pub(crate) fn value_in<M: Mode, R: Roller>(
        &self,
        ctx: &mut Interpreter<R>,
    ) -> EResult<M::Output> {
        self.run_in::<M, R>(ctx)?.into_value()
    }
}

impl Evaluate for Block {
    fn kind(&self) -> &'static str {
        "a block"
    }

    fn evaluate<R: Roller>(&self, ctx: &mut Interpreter<R>) -> EResult<Value> {
        self.run::<Sample, R>(ctx)?.into_value()
    }

    fn distribution<R: Roller>(&self, ctx: &mut Interpreter<R>) -> EResult<Distribution> {
        self.run::<Exact, R>(ctx)?.into_value()
    }
}

/// `define name[$a, $b, key: $c, $d]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub name: String,
    pub positional: Vec<String>,
    pub keywords: BTreeMap<String, Vec<String>>,
}

impl Signature {
    pub fn new(name: impl Into<String>, positional: Vec<impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            positional: positional.into_iter().map(Into::into).collect(),
            keywords: BTreeMap::new(),
        }
    }

    pub fn keyword(mut self, name: impl Into<String>, params: Vec<impl Into<String>>) -> Self {
        self.keywords
            .insert(name.into(), params.into_iter().map(Into::into).collect());
        self
    }

    pub fn shape(&self) -> CallShape {
        CallShape::new(
            self.name.as_str(),
            self.positional.len(),
            self.keywords
                .iter()
                .map(|(keyword, params)| (keyword.as_str(), params.len())),
        )
    }

    fn params(&self) -> impl Iterator<Item = &str> {
        self.positional
            .iter()
            .chain(self.keywords.values().flatten())
            .map(String::as_str)
    }

    fn check_params(&self) -> EResult<()> {
        let mut seen = HashSet::new();
        match self.params().find(|param| !seen.insert(*param)) {
            Some(name) => Err(EvalError::DuplicateParameter {
                name: name.to_owned(),
            }),
            None => Ok(()),
        }
    }

    /// Pairs every parameter with its argument. `args` must have this
    /// signature's shape.
    pub(crate) fn bind<'a>(
        &'a self,
        args: &'a Arguments,
    ) -> impl Iterator<Item = (&'a str, &'a Node)> {
        let positional = self.positional.iter().zip(&args.positional);
        let keywords = self
            .keywords
            .iter()
            .filter_map(move |(keyword, params)| {
                args.keywords
                    .get(keyword)
                    .map(|values| params.iter().zip(values))
            })
            .flatten();
        positional
            .chain(keywords)
            .map(|(param, arg)| (param.as_str(), arg))
    }
}

/// Installs a function when executed; it has no value of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub signature: Signature,
    pub body: Rc<Block>,
}

impl Declaration {
    pub fn new(signature: Signature, body: Rc<Block>) -> Self {
        Self { signature, body }
    }

    /// Builds the function this declaration installs, closed over `scope`.
    /// Nothing is registered if this fails.
    pub(crate) fn function(&self, scope: &Rc<Frame>) -> EResult<Function> {
        self.signature.check_params()?;
        Ok(Function::User(Rc::new(UserFunction {
            signature: self.signature.clone(),
            body: Rc::clone(&self.body),
            closure: Rc::clone(scope),
        })))
    }
}

impl Evaluate for Declaration {
    fn kind(&self) -> &'static str {
        "a function declaration"
    }

    fn capability(&self) -> Capability {
        Capability::Statement
    }
}
