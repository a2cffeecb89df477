use super::{
    block::{Block, Signature},
    builtins::Builtin,
    ctx::Interpreter,
    env::Frame,
    mode::{Exact, Mode, Sample},
    roller::Roller,
    tree::{Evaluate, Node},
    value::Value,
    EResult,
};
use crate::distribution::Distribution;
use crate::error::EvalError;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;

/// The overloading key of a call site: its name, how many positional
/// arguments it passes, and which keyword groups (with their sizes).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct CallShape {
    pub name: String,
    pub positional: usize,
    pub keywords: BTreeSet<(String, usize)>,
}

impl CallShape {
    pub fn new(
        name: impl Into<String>,
        positional: usize,
        keywords: impl IntoIterator<Item = (impl Into<String>, usize)>,
    ) -> Self {
        Self {
            name: name.into(),
            positional,
            keywords: keywords
                .into_iter()
                .map(|(keyword, arity)| (keyword.into(), arity))
                .collect(),
        }
    }
}

impl fmt::Display for CallShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}", self.name, self.positional)?;
        for (keyword, arity) in &self.keywords {
            write!(f, ", {}: {}", keyword, arity)?;
        }
        f.write_str(")")
    }
}

/// Arguments at a call site: a positional list and named groups.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Arguments {
    pub positional: Vec<Node>,
    pub keywords: BTreeMap<String, Vec<Node>>,
}

impl Arguments {
    pub fn new(positional: Vec<Node>) -> Self {
        Self {
            positional,
            keywords: BTreeMap::new(),
        }
    }

    /// Adds a keyword group. A repeated keyword replaces the earlier group.
    pub fn keyword(mut self, name: impl Into<String>, values: Vec<Node>) -> Self {
        self.keywords.insert(name.into(), values);
        self
    }

    pub fn shape(&self, name: impl Into<String>) -> CallShape {
        CallShape::new(
            name,
            self.positional.len(),
            self.keywords
                .iter()
                .map(|(keyword, values)| (keyword.as_str(), values.len())),
        )
    }

    pub(crate) fn nth(&self, i: usize) -> EResult<&Node> {
        self.positional.get(i).ok_or_else(|| {
            EvalError::value_error(format!("missing positional argument {}", i + 1))
        })
    }

    pub(crate) fn first_of(&self, keyword: &str) -> EResult<&Node> {
        self.keywords
            .get(keyword)
            .and_then(|values| values.first())
            .ok_or_else(|| EvalError::value_error(format!("missing argument {}:", keyword)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub shape: CallShape,
    pub args: Arguments,
}

impl Call {
    pub fn new(name: impl Into<String>, args: Arguments) -> Self {
        Self {
            shape: args.shape(name),
            args,
        }
    }
}

impl Evaluate for Call {
    fn kind(&self) -> &'static str {
        "a function call"
    }

    fn evaluate<R: Roller>(&self, ctx: &mut Interpreter<R>) -> EResult<Value> {
        ctx.call::<Sample>(self)
    }

    fn distribution<R: Roller>(&self, ctx: &mut Interpreter<R>) -> EResult<Distribution> {
        ctx.call::<Exact>(self)
    }
}

/// A declared function, closed over the frame it was declared in.
#[derive(Debug)]
pub struct UserFunction {
    pub signature: Signature,
    pub body: Rc<Block>,
    pub(crate) closure: Rc<Frame>,
}

impl UserFunction {
    pub(crate) fn invoke<M: Mode, R: Roller>(
        &self,
        ctx: &mut Interpreter<R>,
        args: &Arguments,
    ) -> EResult<M::Output> {
        // arguments see the caller's scope
        let bindings = self
            .signature
            .bind(args)
            .map(|(name, arg)| M::bind(ctx, arg).map(|binding| (name, binding)))
            .collect::<EResult<Vec<_>>>()?;

        let frame = Frame::child(&self.closure);
        for (name, binding) in bindings {
            frame.assign(name, binding);
        }
        ctx.activate(frame, |ctx| self.body.value_in::<M, R>(ctx))
    }
}

/// Both modes of one call shape. Built-ins and declared functions alike
/// always carry a sampling and an exact implementation.
#[derive(Debug, Clone)]
pub enum Function {
    Builtin(Builtin),
    User(Rc<UserFunction>),
}

impl Function {
    pub(crate) fn invoke<M: Mode, R: Roller>(
        &self,
        ctx: &mut Interpreter<R>,
        args: &Arguments,
    ) -> EResult<M::Output> {
        match self {
            Self::Builtin(builtin) => M::builtin(*builtin, ctx, args),
            Self::User(function) => function.invoke::<M, R>(ctx, args),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Registry {
    functions: HashMap<CallShape, Function>,
}

impl Registry {
    /// A registry with no functions at all, not even built-ins.
    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut ret = Self::empty();
        for builtin in Builtin::ALL {
            ret.register(builtin.shape(), Function::Builtin(builtin));
        }
        ret
    }

    /// Installs `function` under `shape`, returning whatever it replaced.
    pub fn register(&mut self, shape: CallShape, function: Function) -> Option<Function> {
        self.functions.insert(shape, function)
    }

    pub fn lookup(&self, shape: &CallShape) -> EResult<&Function> {
        self.functions
            .get(shape)
            .ok_or_else(|| EvalError::UnknownFunctionShape {
                shape: shape.clone(),
            })
    }

    pub fn contains(&self, shape: &CallShape) -> bool {
        self.functions.contains_key(shape)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
