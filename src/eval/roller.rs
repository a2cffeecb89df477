use super::EResult;
use crate::common::{NonZeroUInt, UInt};
use crate::error::EvalError;
use rand::{
    distributions::{Distribution, Uniform},
    Rng,
};

/// Where sampled dice get their faces. Every [`Rng`] is a roller.
pub trait Roller {
    /// `count` faces of a fair die with `sides` faces, in roll order.
    fn roll_dice(&mut self, count: usize, sides: NonZeroUInt) -> Vec<UInt>;
}

impl<R: Rng> Roller for R {
    fn roll_dice(&mut self, count: usize, sides: NonZeroUInt) -> Vec<UInt> {
        Uniform::new_inclusive(1, sides.get())
            .sample_iter(&mut *self)
            .take(count)
            .collect()
    }
}

/// Dice drawn so far in one top-level evaluation, against an optional cap.
#[derive(Debug, Copy, Clone)]
pub(crate) struct RollBudget {
    limit: Option<usize>,
    spent: usize,
}

impl RollBudget {
    pub(crate) fn new(limit: Option<usize>) -> Self {
        Self { limit, spent: 0 }
    }

    /// Charges `count` dice, failing once the cap is passed.
    pub(crate) fn spend(&mut self, count: usize) -> EResult<()> {
        self.spent = self.spent.saturating_add(count);
        match self.limit {
            Some(limit) if self.spent > limit => Err(EvalError::TooManyRolls),
            _ => Ok(()),
        }
    }

    pub(crate) fn spent(&self) -> usize {
        self.spent
    }

    pub(crate) fn reset(&mut self) {
        self.spent = 0;
    }
}

/// Faces `initial, initial + step, ...`, each wrapped into `1..=sides`.
#[cfg(test)]
pub(crate) struct StepRoller {
    next: UInt,
    step: UInt,
}

#[cfg(test)]
impl StepRoller {
    pub fn new(initial: NonZeroUInt, step: UInt) -> Self {
        Self {
            next: initial.get(),
            step,
        }
    }
}

#[cfg(test)]
impl Roller for StepRoller {
    fn roll_dice(&mut self, count: usize, sides: NonZeroUInt) -> Vec<UInt> {
        (0..count)
            .map(|_| {
                let face = (self.next - 1) % sides.get() + 1;
                self.next += self.step;
                face
            })
            .collect()
    }
}
