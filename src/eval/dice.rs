use super::{
    ctx::Interpreter,
    num::Number,
    roller::Roller,
    tree::{Evaluate, Node},
    value::Value,
    EResult,
};
use crate::common::*;
use crate::distribution::{Atom, Distribution, Outcome};
use crate::error::EvalError;
use std::collections::BTreeMap;

/// `count d sides`, where both operands may themselves be random.
#[derive(Debug, Clone, PartialEq)]
pub struct Dice {
    pub count: Box<Node>,
    pub sides: Box<Node>,
}

impl Dice {
    pub fn new(count: impl Into<Node>, sides: impl Into<Node>) -> Self {
        Self {
            count: Box::new(count.into()),
            sides: Box::new(sides.into()),
        }
    }

    /// Sum of `count` independent fair dice with `sides` faces, by repeated
    /// self-convolution. Zero dice put all mass on a sum of zero.
    pub(crate) fn sum_distribution(
        ctx: &Interpreter<impl Roller>,
        count: usize,
        sides: NonZeroUInt,
    ) -> EResult<Distribution> {
        let die = ctx.uniform(sides)?;
        (0..count).try_fold(Distribution::certain(Number::ZERO), |acc, _| {
            ctx.product(&acc, &die)?
                .fold(|atoms| BinaryOperator::Add.apply_atoms(atoms))
        })
    }
}

fn dice_count(x: Number) -> EResult<usize> {
    x.as_integer()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| {
            EvalError::value_error(format!("dice count must be a non-negative integer, not {}", x))
        })
}

fn dice_sides(x: Number) -> EResult<NonZeroUInt> {
    x.as_integer()
        .and_then(|n| UInt::try_from(n).ok())
        .and_then(NonZeroUInt::new)
        .ok_or_else(|| {
            EvalError::value_error(format!("dice sides must be a positive integer, not {}", x))
        })
}

fn atom_number(atom: Atom) -> EResult<Number> {
    atom.number()
        .ok_or_else(|| EvalError::unsupported("roll", "an absent die"))
}

fn operand_error(components: usize) -> EvalError {
    EvalError::value_error(format!(
        "dice operands must be scalar, found {} components",
        components
    ))
}

/// The number in a 1-ary outcome of a dice operand.
fn scalar(outcome: &Outcome) -> EResult<Number> {
    match outcome.only() {
        Some(atom) => atom_number(atom),
        None => Err(operand_error(outcome.arity())),
    }
}

impl Evaluate for Dice {
    fn kind(&self) -> &'static str {
        "a dice roll"
    }

    fn evaluate<R: Roller>(&self, ctx: &mut Interpreter<R>) -> EResult<Value> {
        let total = self
            .sequence(ctx)?
            .iter()
            .map(Value::as_number)
            .try_fold(Number::ZERO, |a, b| b.map(|b| a + b))?;
        Ok(total.into())
    }

    fn sequence<R: Roller>(&self, ctx: &mut Interpreter<R>) -> EResult<Vec<Value>> {
        let sides = dice_sides(ctx.value_of(&self.sides)?.as_number()?)?;
        let count = dice_count(ctx.value_of(&self.count)?.as_number()?)?;
        Ok(ctx
            .roll(count, sides)?
            .into_iter()
            .map(|face| Value::from(face as Int))
            .collect())
    }

    fn distribution<R: Roller>(&self, ctx: &mut Interpreter<R>) -> EResult<Distribution> {
        let count = ctx.distribution_of(&self.count)?;
        let sides = ctx.distribution_of(&self.sides)?;

        let mut ret = Distribution::new();
        for (outcome, p) in &ctx.product(&count, &sides)? {
            let (n, m) = match outcome.atoms() {
                [n, m] => (dice_count(atom_number(*n)?)?, dice_sides(atom_number(*m)?)?),
                atoms => return Err(operand_error(atoms.len())),
            };
            let sum = Self::sum_distribution(&*ctx, n, m)?;
            ret.accumulate(&sum, *p);
        }
        tracing::trace!(outcomes = ret.len(), "dice distribution");
        Ok(ret)
    }

    /// The law of each die position `1..=max(count)`. A position that the
    /// realized count does not reach is [`Atom::Absent`].
    fn distribution_sequence<R: Roller>(
        &self,
        ctx: &mut Interpreter<R>,
    ) -> EResult<Vec<Distribution>> {
        let count = ctx.distribution_of(&self.count)?;
        let sides = ctx.distribution_of(&self.sides)?;

        let mut faces = BTreeMap::new();
        for (outcome, p) in &sides {
            let n = dice_sides(scalar(outcome)?)?;
            faces.insert(n, ctx.uniform(n)?.scaled_accumulate(*p, None));
        }
        let max_count = count
            .outcomes()
            .map(|outcome| dice_count(scalar(outcome)?))
            .try_fold(0, |a, b| b.map(|b| a.max(b)))?;

        let mut ret = Vec::with_capacity(max_count);
        for position in 1..=max_count {
            let position = Distribution::certain(position as Int);
            let exists = count
                .cartesian_product(&position)
                .fold(|atoms| BinaryOperator::Ge.apply_atoms(atoms))?
                .mass_of(Number::ONE);

            let mut die = Distribution::new();
            for face in faces.values() {
                die.accumulate(face, exists);
            }
            let absent = 1.0 - exists;
            if absent > 0.0 {
                die.accumulate(&Distribution::certain(Atom::Absent), absent);
            }
            ret.push(die);
        }
        Ok(ret)
    }
}

#[cfg(test)]
mod tests {
    use crate::common::test_utils::*;
    use crate::distribution::{Atom, Distribution};
    use crate::error::EvalError;
    use crate::eval::roller::StepRoller;
    use pretty_assertions::assert_eq;

    fn approx(actual: Float, expected: Float) -> bool {
        (actual - expected).abs() < 1e-12
    }

    fn step_ctx() -> Interpreter<StepRoller> {
        Interpreter::new(
            Config::default(),
            StepRoller::new(NonZeroUInt::new(10).unwrap(), 1),
        )
    }

    #[test]
    fn test_two_d6() {
        let mut ctx = Interpreter::seeded(0);
        let d = ctx.distribution(&Node::ndm(2, 6)).unwrap();

        assert_eq!(d.len(), 11);
        assert!(approx(d.mass_of(7), 6.0 / 36.0));
        assert!(approx(d.mass_of(2), 1.0 / 36.0));
        assert!(approx(d.mass_of(12), 1.0 / 36.0));
        assert!((d.total_mass() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_one_d6_sampling_stays_in_range() {
        let mut ctx = Interpreter::seeded(42);
        let node = Node::ndm(1, 6);
        for _ in 0..1000 {
            let x = ctx.evaluate(&node).unwrap().as_number().unwrap();
            assert!(matches!(x, Number::Int(1..=6)), "rolled {}", x);
        }
    }

    #[test]
    fn test_eval_dice_with_step_roller() {
        let mut ctx = step_ctx();
        assert_eq!(ctx.evaluate(&Node::ndm(1, 20)), Ok(Value::from(10)));
        // the roller moves on to 11 and 12, which wrap to 3 and 4 on a d4
        assert_eq!(ctx.evaluate(&Node::ndm(2, 4)), Ok(Value::from(3 + 4)));
        assert_eq!(
            ctx.evaluate(&Node::bin(Node::ndm(3, 6), Add, Node::int(1))),
            Ok(Value::from(1 + 2 + 3 + 1))
        );
    }

    #[test]
    fn test_sequence_keeps_each_die() {
        let mut ctx = step_ctx();
        let dice = Dice::new(Node::int(3), Node::int(6));
        // faces 4, 5, 6
        assert_eq!(
            dice.sequence(&mut ctx),
            Ok(vec![Value::from(4), Value::from(5), Value::from(6)])
        );
    }

    #[test]
    fn test_zero_dice() {
        let mut ctx = Interpreter::seeded(0);
        let node = Node::ndm(0, 6);
        assert_eq!(ctx.evaluate(&node), Ok(Value::from(0)));
        assert_eq!(
            ctx.distribution(&node),
            Ok(Distribution::certain(Number::ZERO))
        );
    }

    #[test]
    fn test_random_count_is_a_mixture() {
        // (1d2)d4: half the time 1d4, half the time 2d4
        let mut ctx = Interpreter::seeded(0);
        let node = Node::dice(Node::ndm(1, 2), Node::int(4));
        let d = ctx.distribution(&node).unwrap();

        assert!(approx(d.mass_of(1), 0.5 * 0.25));
        assert!(approx(d.mass_of(5), 0.5 * 4.0 / 16.0 + 0.5 * 0.0));
        assert!(approx(d.mass_of(8), 0.5 / 16.0));
        assert!(approx(d.total_mass(), 1.0));
    }

    #[test]
    fn test_random_sides() {
        // 1d(1d2): a d1 or a d2 with equal chance
        let mut ctx = Interpreter::seeded(0);
        let d = ctx
            .distribution(&Node::dice(Node::int(1), Node::ndm(1, 2)))
            .unwrap();
        assert!(approx(d.mass_of(1), 0.5 + 0.25));
        assert!(approx(d.mass_of(2), 0.25));
    }

    #[test]
    fn test_distribution_sequence_marks_absent_dice() {
        let mut ctx = Interpreter::seeded(0);
        let dice = Dice::new(Node::ndm(1, 2), Node::int(2));
        let dists = dice.distribution_sequence(&mut ctx).unwrap();

        assert_eq!(dists.len(), 2);
        assert!(approx(dists[0].mass_of(1), 0.5));
        assert_eq!(dists[0].mass_of(Atom::Absent), 0.0);
        assert!(approx(dists[1].mass_of(Atom::Absent), 0.5));
        assert!(approx(dists[1].mass_of(2), 0.25));
        assert!(dists.iter().all(|d| approx(d.total_mass(), 1.0)));
    }

    #[test]
    fn test_invalid_operands() {
        let mut ctx = Interpreter::seeded(0);
        assert!(matches!(
            ctx.evaluate(&Node::ndm(-1, 6)),
            Err(EvalError::ValueError(_))
        ));
        assert!(matches!(
            ctx.distribution(&Node::ndm(2, 0)),
            Err(EvalError::ValueError(_))
        ));
        assert!(matches!(
            ctx.evaluate(&Node::dice(Node::float(1.5), Node::int(6))),
            Err(EvalError::ValueError(_))
        ));
    }

    #[test]
    fn test_too_many_rolls() {
        let mut ctx = Interpreter::new(
            Config::default().with_max_rolls(Some(10)),
            StepRoller::new(NonZeroUInt::new(1).unwrap(), 1),
        );
        assert_eq!(ctx.evaluate(&Node::ndm(11, 6)), Err(EvalError::TooManyRolls));
        // the budget is per top-level evaluation
        assert!(ctx.evaluate(&Node::ndm(10, 6)).is_ok());
        assert!(ctx.evaluate(&Node::ndm(10, 6)).is_ok());
    }

    #[test]
    fn test_out_of_range_sides() {
        let mut ctx = Interpreter::seeded(0);
        let node = Node::dice(Node::int(1), Node::float(1e20));
        assert!(matches!(ctx.evaluate(&node), Err(EvalError::ValueError(_))));
        assert!(matches!(ctx.distribution(&node), Err(EvalError::ValueError(_))));
    }

    #[test]
    fn test_compound_operand_rejected_in_both_views() {
        let mut ctx = Interpreter::seeded(0);
        let pair = Distribution::certain(1).cartesian_product(&Distribution::certain(2));
        ctx.bind_global("pair", pair);

        let by_count = Dice::new(Node::get("pair"), Node::int(6));
        assert!(matches!(
            by_count.distribution(&mut ctx),
            Err(EvalError::ValueError(_))
        ));
        assert!(matches!(
            by_count.distribution_sequence(&mut ctx),
            Err(EvalError::ValueError(_))
        ));

        let by_sides = Dice::new(Node::int(2), Node::get("pair"));
        assert!(matches!(
            by_sides.distribution_sequence(&mut ctx),
            Err(EvalError::ValueError(_))
        ));
    }
}
