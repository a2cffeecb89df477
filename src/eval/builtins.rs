use super::{
    call::{Arguments, CallShape},
    ctx::Interpreter,
    num::Number,
    roller::Roller,
    value::Value,
    EResult,
};
use crate::common::Float;
use crate::distribution::{Atom, Distribution, Outcome};
use crate::error::EvalError;

/// Functions every registry starts with.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Builtin {
    /// `max(seq)`
    Max,
    /// `if(test, then: a, else: b)`
    If,
    /// `distribution(x)`
    Distribution,
}

impl Builtin {
    pub const ALL: [Self; 3] = [Self::Max, Self::If, Self::Distribution];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Max => "max",
            Self::If => "if",
            Self::Distribution => "distribution",
        }
    }

    pub fn shape(self) -> CallShape {
        let keywords: &[(&str, usize)] = match self {
            Self::If => &[("then", 1), ("else", 1)],
            Self::Max | Self::Distribution => &[],
        };
        CallShape::new(self.name(), 1, keywords.iter().copied())
    }

    pub(crate) fn sample<R: Roller>(
        self,
        ctx: &mut Interpreter<R>,
        args: &Arguments,
    ) -> EResult<Value> {
        match self {
            Self::Max => {
                let items = ctx.sequence_of(args.nth(0)?)?;
                items
                    .iter()
                    .map(Value::as_number)
                    .try_fold(Number::NEG_INFINITY, |a, b| b.map(|b| a.max(b)))
                    .map(Value::from)
            }
            Self::If => {
                let test = ctx.value_of(args.nth(0)?)?.as_number()?;
                let branch = if test.is_zero() { "else" } else { "then" };
                ctx.value_of(args.first_of(branch)?)
            }
            Self::Distribution => ctx.distribution_of(args.nth(0)?).map(Value::Distribution),
        }
    }

    pub(crate) fn distribution<R: Roller>(
        self,
        ctx: &mut Interpreter<R>,
        args: &Arguments,
    ) -> EResult<Distribution> {
        match self {
            Self::Max => {
                let dists = ctx.distribution_sequence_of(args.nth(0)?)?;
                dists
                    .iter()
                    .try_fold(Distribution::certain(Number::NEG_INFINITY), |acc, d| {
                        ctx.product(&acc, d)?
                            .fold(|atoms| Ok::<_, EvalError>(max_atom(atoms)))
                    })
            }
            Self::If => {
                let test = ctx.distribution_of(args.nth(0)?)?;
                let zero = Outcome::single(Number::ZERO);
                let else_chance = test.mass(&zero);
                let then_chance: Float = test
                    .iter()
                    .filter(|(outcome, _)| **outcome != zero)
                    .map(|(_, p)| *p)
                    .sum();

                // an unreachable branch is never evaluated, so guarded
                // recursion terminates
                let mut ret = None;
                for (branch, chance) in [("then", then_chance), ("else", else_chance)] {
                    if chance > 0.0 {
                        let d = ctx.distribution_of(args.first_of(branch)?)?;
                        ret = Some(d.scaled_accumulate(chance, ret));
                    }
                }
                Ok(ret.unwrap_or_default())
            }
            Self::Distribution => ctx.distribution_of(args.nth(0)?),
        }
    }
}

/// An absent die never wins over a rolled one.
fn max_atom(atoms: &[Atom]) -> Atom {
    atoms.iter().copied().fold(Atom::Absent, Atom::max)
}

#[cfg(test)]
mod tests {
    use crate::common::test_utils::*;
    use crate::distribution::{Atom, Distribution, Outcome};
    use crate::error::EvalError;
    use pretty_assertions::assert_eq;

    fn approx(actual: Float, expected: Float) -> bool {
        (actual - expected).abs() < 1e-12
    }

    fn max_of(arg: Node) -> Node {
        Node::call("max", vec![arg], vec![])
    }

    fn if_else(test: Node, then: Node, otherwise: Node) -> Node {
        Node::call(
            "if",
            vec![test],
            vec![("then", vec![then]), ("else", vec![otherwise])],
        )
    }

    #[test]
    fn test_max_of_sequence() {
        let mut ctx = Interpreter::seeded(0);
        let node = max_of(Node::seq(vec![Node::int(3), Node::int(7), Node::int(5)]));
        assert_eq!(ctx.evaluate(&node), Ok(Value::from(7)));
        assert_eq!(
            ctx.distribution(&node),
            Ok(Distribution::certain(Number::Int(7)))
        );
    }

    #[test]
    fn test_max_of_empty_sequence() {
        let mut ctx = Interpreter::seeded(0);
        let node = max_of(Node::seq(vec![]));
        assert_eq!(ctx.evaluate(&node), Ok(Value::from(Number::NEG_INFINITY)));
        assert_eq!(
            ctx.distribution(&node),
            Ok(Distribution::certain(Number::NEG_INFINITY))
        );
    }

    #[test]
    fn test_max_of_dice_samples_each_die() {
        let mut ctx = Interpreter::seeded(3);
        let node = max_of(Node::ndm(4, 6));
        for _ in 0..200 {
            let x = ctx.evaluate(&node).unwrap().as_number().unwrap();
            assert!(matches!(x, Number::Int(1..=6)), "got {}", x);
        }
    }

    #[test]
    fn test_max_of_dice_distribution() {
        // highest of 2d6: P(k) = (2k - 1) / 36
        let mut ctx = Interpreter::seeded(0);
        let d = ctx.distribution(&max_of(Node::ndm(2, 6))).unwrap();
        assert_eq!(d.len(), 6);
        for k in 1..=6 {
            assert!(approx(d.mass_of(k), (2 * k - 1) as Float / 36.0), "P({})", k);
        }
    }

    #[test]
    fn test_max_with_random_count() {
        // highest of (1d2)d2: one die half the time, two dice otherwise
        let mut ctx = Interpreter::seeded(0);
        let node = max_of(Node::dice(Node::ndm(1, 2), Node::int(2)));
        let d = ctx.distribution(&node).unwrap();
        assert!(approx(d.mass_of(1), 0.5 * 0.5 + 0.5 * 0.25));
        assert!(approx(d.mass_of(2), 0.5 * 0.5 + 0.5 * 0.75));
        assert_eq!(d.mass_of(Atom::Absent), 0.0);
    }

    #[test]
    fn test_if_sampling_takes_one_branch() {
        let mut ctx = Interpreter::seeded(0);
        // the untaken branch would fail if it ran
        let node = if_else(Node::int(1), Node::int(10), Node::get("unbound"));
        assert_eq!(ctx.evaluate(&node), Ok(Value::from(10)));
        let node = if_else(Node::int(0), Node::get("unbound"), Node::int(20));
        assert_eq!(ctx.evaluate(&node), Ok(Value::from(20)));
    }

    #[test]
    fn test_if_distribution_mixes_branches() {
        let mut ctx = Interpreter::seeded(0);
        let test: Distribution = [
            (Outcome::single(0), 0.3),
            (Outcome::single(1), 0.7),
        ]
        .into_iter()
        .collect();
        ctx.bind_global("t", test);

        let node = if_else(Node::get("t"), Node::int(10), Node::int(20));
        let expected: Distribution = [
            (Outcome::single(10), 0.7),
            (Outcome::single(20), 0.3),
        ]
        .into_iter()
        .collect();
        assert_eq!(ctx.distribution(&node), Ok(expected));
    }

    #[test]
    fn test_if_without_zero_outcome() {
        // 1d6 is never zero, so the else branch is never needed
        let mut ctx = Interpreter::seeded(0);
        let node = if_else(Node::ndm(1, 6), Node::int(1), Node::get("unbound"));
        let d = ctx.distribution(&node).unwrap();
        assert_eq!(d.len(), 1);
        assert!(approx(d.mass_of(1), 1.0));
    }

    #[test]
    fn test_if_with_many_valued_test() {
        // every non-zero outcome counts towards `then`
        let mut ctx = Interpreter::seeded(0);
        let test = Node::bin(Node::ndm(1, 4), Sub, Node::int(1));
        let d = ctx
            .distribution(&if_else(test, Node::int(1), Node::int(0)))
            .unwrap();
        assert!(approx(d.mass_of(1), 0.75));
        assert!(approx(d.mass_of(0), 0.25));
    }

    #[test]
    fn test_distribution_builtin() {
        let mut ctx = Interpreter::seeded(0);
        let node = Node::call("distribution", vec![Node::ndm(2, 6)], vec![]);
        let expected = ctx.distribution(&Node::ndm(2, 6)).unwrap();

        assert_eq!(ctx.evaluate(&node), Ok(Value::Distribution(expected.clone())));
        assert_eq!(ctx.distribution(&node), Ok(expected));
    }

    #[test]
    fn test_distribution_builtin_rejects_sequences() {
        let mut ctx = Interpreter::seeded(0);
        let node = Node::call("distribution", vec![Node::seq(vec![Node::int(1)])], vec![]);
        assert!(matches!(
            ctx.evaluate(&node),
            Err(EvalError::UnsupportedOperation { .. })
        ));
    }
}
