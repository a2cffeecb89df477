use super::{
    block::{self, Declaration, Flow},
    call::{Call, Registry},
    env::{Binding, Frame},
    mode::{Mode, Sample},
    roller::{RollBudget, Roller},
    tree::{Capability, Evaluate, Node},
    value::Value,
    EResult,
};
use crate::common::*;
use crate::distribution::Distribution;
use crate::error::EvalError;
use rand::{rngs::StdRng, SeedableRng};
use std::rc::Rc;

pub type DefaultRoller = rand::prelude::ThreadRng;

/// Limits on a single top-level evaluation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Config {
    /// Dice rolled while sampling.
    pub max_rolls: Option<usize>,
    /// Nested user function calls.
    pub max_depth: Option<usize>,
    /// Outcomes in any joint distribution built along the way.
    pub max_outcomes: Option<usize>,
    /// Allowed distance of a result's total mass from 1.
    pub tolerance: Float,
}

impl Config {
    pub fn unbounded() -> Self {
        Self {
            max_rolls: None,
            max_depth: None,
            max_outcomes: None,
            ..Self::default()
        }
    }

    pub fn with_max_rolls(mut self, max_rolls: Option<usize>) -> Self {
        self.max_rolls = max_rolls;
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_outcomes(mut self, max_outcomes: Option<usize>) -> Self {
        self.max_outcomes = max_outcomes;
        self
    }

    pub fn with_tolerance(mut self, tolerance: Float) -> Self {
        self.tolerance = tolerance;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_rolls: Some(1000),
            max_depth: Some(128),
            max_outcomes: Some(1 << 16),
            tolerance: 1e-9,
        }
    }
}

/// One evaluation session: the function registry, the global frame and the
/// random source that sampling draws from.
pub struct Interpreter<R = DefaultRoller> {
    config: Config,
    roller: R,
    registry: Registry,
    globals: Rc<Frame>,
    scope: Rc<Frame>,
    budget: RollBudget,
    depth: usize,
}

impl<R: Roller> Interpreter<R> {
    pub fn new(config: Config, roller: R) -> Self {
        let globals = Frame::root();
        Self {
            budget: RollBudget::new(config.max_rolls),
            config,
            roller,
            registry: Registry::with_builtins(),
            scope: Rc::clone(&globals),
            globals,
            depth: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn bind_global(&mut self, name: impl Into<String>, binding: impl Into<Binding>) {
        self.globals.assign(name, binding.into());
    }

    /// Samples `node` once.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn evaluate(&mut self, node: &Node) -> EResult<Value> {
        self.begin();
        let ret = self.value_of(node);
        tracing::debug!(rolls = self.budget.spent(), ok = ret.is_ok(), "evaluated");
        ret
    }

    /// The exact law of `node`.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn distribution(&mut self, node: &Node) -> EResult<Distribution> {
        self.begin();
        let ret = self.distribution_of(node)?;
        let total = ret.total_mass();
        tracing::debug!(outcomes = ret.len(), total, "computed distribution");
        if ret.is_normalized(self.config.tolerance) {
            Ok(ret)
        } else {
            Err(EvalError::MalformedDistribution { total })
        }
    }

    /// Executes one top-level statement against the global frame. Assignments
    /// and declarations persist for later calls and have no value. A block
    /// gets its own child of the global frame.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn run(&mut self, node: &Node) -> EResult<Option<Value>> {
        self.begin();
        let globals = Rc::clone(&self.globals);
        let flow = self.with_scope(globals, |ctx| block::execute::<Sample, R>(ctx, node))?;
        Ok(match flow {
            Flow::Next(x) => x,
            Flow::Return(x) => Some(x),
        })
    }

    fn begin(&mut self) {
        self.budget.reset();
        self.depth = 0;
    }

    pub(crate) fn value_of(&mut self, node: &Node) -> EResult<Value> {
        match node.capability() {
            Capability::Statement => Err(EvalError::unsupported("evaluate", node.kind())),
            _ => node.evaluate(self),
        }
    }

    pub(crate) fn distribution_of(&mut self, node: &Node) -> EResult<Distribution> {
        match node.capability() {
            Capability::Distributable => node.distribution(self),
            _ => Err(EvalError::unsupported(
                "take the distribution of",
                node.kind(),
            )),
        }
    }

    pub(crate) fn sequence_of(&mut self, node: &Node) -> EResult<Vec<Value>> {
        match node.capability() {
            Capability::Statement => Err(EvalError::unsupported("evaluate", node.kind())),
            _ => node.sequence(self),
        }
    }

    pub(crate) fn distribution_sequence_of(&mut self, node: &Node) -> EResult<Vec<Distribution>> {
        match node.capability() {
            Capability::Statement => Err(EvalError::unsupported(
                "take the distribution of",
                node.kind(),
            )),
            _ => node.distribution_sequence(self),
        }
    }

    pub(crate) fn scope(&self) -> &Rc<Frame> {
        &self.scope
    }

    pub(crate) fn lookup(&self, name: &str) -> EResult<Binding> {
        self.scope.lookup(name)
    }

    fn check_len(&self, len: usize) -> EResult<()> {
        match self.config.max_outcomes {
            Some(limit) if len > limit => Err(EvalError::TooManyOutcomes { limit }),
            _ => Ok(()),
        }
    }

    /// The joint law of two independent distributions, refused before it is
    /// built when it would exceed the outcome limit.
    pub(crate) fn product(&self, a: &Distribution, b: &Distribution) -> EResult<Distribution> {
        self.check_len(a.len().saturating_mul(b.len()))?;
        Ok(a.cartesian_product(b))
    }

    /// A fair die, refused before its face table is built when it has more
    /// faces than the outcome limit.
    pub(crate) fn uniform(&self, sides: NonZeroUInt) -> EResult<Distribution> {
        self.check_len(usize::try_from(sides.get()).unwrap_or(usize::MAX))?;
        Ok(Distribution::uniform(sides))
    }

    pub(crate) fn roll(&mut self, num: usize, sides: NonZeroUInt) -> EResult<Vec<UInt>> {
        self.budget.spend(num)?;
        Ok(self.roller.roll_dice(num, sides))
    }

    pub(crate) fn call<M: Mode>(&mut self, call: &Call) -> EResult<M::Output> {
        let function = self.registry.lookup(&call.shape)?.clone();
        tracing::trace!(shape = %call.shape, "call");
        function.invoke::<M, R>(self, &call.args)
    }

    /// Runs `f` with `frame` as the current scope, restoring the previous
    /// scope afterwards whether or not `f` fails.
    pub(crate) fn with_scope<T>(
        &mut self,
        frame: Rc<Frame>,
        f: impl FnOnce(&mut Self) -> EResult<T>,
    ) -> EResult<T> {
        let saved = std::mem::replace(&mut self.scope, frame);
        let ret = f(self);
        self.scope = saved;
        ret
    }

    /// Enters a function body.
    pub(crate) fn activate<T>(
        &mut self,
        frame: Rc<Frame>,
        f: impl FnOnce(&mut Self) -> EResult<T>,
    ) -> EResult<T> {
        if let Some(limit) = self.config.max_depth {
            if self.depth >= limit {
                return Err(EvalError::RecursionLimit { limit });
            }
        }
        self.depth += 1;
        let ret = self.with_scope(frame, f);
        self.depth -= 1;
        ret
    }

    pub(crate) fn declare(&mut self, declaration: &Declaration) -> EResult<()> {
        let function = declaration.function(&self.scope)?;
        let shape = declaration.signature.shape();
        tracing::debug!(%shape, "declaring function");
        if self.registry.register(shape, function).is_some() {
            tracing::debug!("replaced an earlier declaration");
        }
        Ok(())
    }
}

impl Interpreter<StdRng> {
    /// An interpreter whose dice are reproducible from `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self::new(Config::default(), StdRng::seed_from_u64(seed))
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(Config::default(), rand::thread_rng())
    }
}

#[cfg(test)]
mod tests {
    use crate::common::test_utils::*;
    use crate::distribution::Distribution;
    use crate::error::EvalError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_seeded_is_reproducible() {
        let node = Node::ndm(10, 20);
        let a = Interpreter::seeded(9).evaluate(&node);
        let b = Interpreter::seeded(9).evaluate(&node);
        assert!(a.is_ok());
        assert_eq!(a, b);
    }

    #[test]
    fn test_run_statements() {
        let mut ctx = Interpreter::seeded(0);
        assert_eq!(ctx.run(&Node::set("x", Node::int(4))), Ok(None));
        assert_eq!(ctx.run(&Node::get("x")), Ok(Some(Value::from(4))));
        assert_eq!(
            ctx.run(&Node::output(Node::int(2))),
            Ok(Some(Value::from(2)))
        );
    }

    #[test]
    fn test_top_level_block_has_its_own_frame() {
        let mut ctx = Interpreter::seeded(0);
        ctx.run(&Node::set("x", Node::int(1))).unwrap();
        let program = Node::block(vec![
            Node::set("x", Node::int(99)),
            Node::define(
                "inc",
                vec!["n"],
                vec![],
                vec![Node::bin(Node::get("n"), Add, Node::int(1))],
            ),
            Node::get("x"),
        ]);
        assert_eq!(ctx.run(&program), Ok(Some(Value::from(99))));

        // the global is untouched, the function outlives the block
        assert_eq!(ctx.run(&Node::get("x")), Ok(Some(Value::from(1))));
        let call = Node::call("inc", vec![Node::get("x")], vec![]);
        assert_eq!(ctx.evaluate(&call), Ok(Value::from(2)));
    }

    #[test]
    fn test_failed_run_restores_scope() {
        let mut ctx = Interpreter::seeded(0);
        let failing = Node::block(vec![
            Node::set("inner", Node::int(1)),
            Node::block(vec![Node::get("missing")]),
        ]);
        assert!(ctx.evaluate(&failing).is_err());
        // the block's frame was dropped with the error
        assert!(matches!(
            ctx.evaluate(&Node::get("inner")),
            Err(EvalError::UnboundVariable { .. })
        ));
    }

    #[test]
    fn test_recursion_limit() {
        let mut ctx = Interpreter::new(
            Config::default().with_max_depth(Some(16)),
            rand::thread_rng(),
        );
        ctx.run(&Node::define(
            "forever",
            vec!["n"],
            vec![],
            vec![Node::call("forever", vec![Node::get("n")], vec![])],
        ))
        .unwrap();
        let call = Node::call("forever", vec![Node::int(0)], vec![]);
        assert_eq!(
            ctx.evaluate(&call),
            Err(EvalError::RecursionLimit { limit: 16 })
        );
        assert_eq!(
            ctx.distribution(&call),
            Err(EvalError::RecursionLimit { limit: 16 })
        );
        // the depth counter unwound
        assert_eq!(ctx.evaluate(&Node::int(1)), Ok(Value::from(1)));
    }

    #[test]
    fn test_too_many_outcomes() {
        let mut ctx = Interpreter::new(
            Config::default().with_max_outcomes(Some(100)),
            rand::thread_rng(),
        );
        // 1d20 x 1d20 has 400 joint outcomes
        let node = Node::bin(Node::ndm(1, 20), Mul, Node::ndm(1, 20));
        assert_eq!(
            ctx.distribution(&node),
            Err(EvalError::TooManyOutcomes { limit: 100 })
        );
        assert!(ctx.distribution(&Node::ndm(3, 6)).is_ok());
    }

    #[test]
    fn test_outcome_limit_covers_dice_sums() {
        let mut ctx = Interpreter::new(
            Config::default().with_max_outcomes(Some(100)),
            rand::thread_rng(),
        );
        // the second convolution step pairs 20 partial sums with 20 faces
        assert_eq!(
            ctx.distribution(&Node::ndm(2, 20)),
            Err(EvalError::TooManyOutcomes { limit: 100 })
        );
        assert_eq!(
            ctx.distribution(&Node::ndm(1, 101)),
            Err(EvalError::TooManyOutcomes { limit: 100 })
        );
        assert!(ctx.distribution(&Node::ndm(1, 100)).is_ok());
    }

    #[test]
    fn test_huge_die_fails_before_building_faces() {
        let mut ctx = Interpreter::seeded(0);
        assert_eq!(
            ctx.distribution(&Node::ndm(1, 3_000_000)),
            Err(EvalError::TooManyOutcomes { limit: 1 << 16 })
        );
        let per_die = Node::call("max", vec![Node::ndm(2, 3_000_000)], vec![]);
        assert_eq!(
            ctx.distribution(&per_die),
            Err(EvalError::TooManyOutcomes { limit: 1 << 16 })
        );
    }

    #[test]
    fn test_malformed_distribution() {
        let mut ctx = Interpreter::seeded(0);
        let half = Distribution::certain(Number::ONE).scaled_accumulate(0.5, None);
        ctx.bind_global("half", half);
        assert_eq!(
            ctx.distribution(&Node::get("half")),
            Err(EvalError::MalformedDistribution { total: 0.5 })
        );
    }

    #[test]
    fn test_unbounded_config() {
        let config = Config::unbounded();
        assert_eq!(config.max_rolls, None);
        assert_eq!(config.tolerance, Config::default().tolerance);

        let mut ctx = Interpreter::new(config, rand::thread_rng());
        assert!(ctx.evaluate(&Node::ndm(5000, 2)).is_ok());
    }

    #[test]
    fn test_free_functions() {
        assert_eq!(evaluate(&Node::int(3)), Ok(Value::from(3)));
        let d = distribution(&Node::ndm(1, 4)).unwrap();
        assert_eq!(d.len(), 4);
    }
}
