//! Exact discrete probability laws over outcome tuples.
//!
//! A [`Distribution`] maps each [`Outcome`] (a fixed-arity tuple of
//! [`Atom`]s) to its probability mass. Keys are kept sorted so tables come
//! out in a stable order.

use crate::common::*;
use crate::eval::Number;
use std::cmp::Ordering;
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

/// One component of an outcome tuple.
///
/// `Absent` marks a die that was not rolled at all. It orders below every
/// number, so it is the identity for `max`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum Atom {
    Absent,
    Number(Number),
}

impl Atom {
    pub const fn number(self) -> Option<Number> {
        match self {
            Self::Absent => None,
            Self::Number(x) => Some(x),
        }
    }
}

impl From<Number> for Atom {
    fn from(x: Number) -> Self {
        Self::Number(x)
    }
}

impl From<Int> for Atom {
    fn from(x: Int) -> Self {
        Self::Number(x.into())
    }
}

impl From<Float> for Atom {
    fn from(x: Float) -> Self {
        Self::Number(x.into())
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("absent"),
            Self::Number(x) => fmt::Display::fmt(x, f),
        }
    }
}

/// A joint elementary event.
#[derive(Debug, Clone)]
pub struct Outcome(NonEmpty<Atom>);

impl Outcome {
    pub fn single(atom: impl Into<Atom>) -> Self {
        Self(vec1![atom.into()])
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.0
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }

    /// The lone component of a 1-ary outcome.
    pub fn only(&self) -> Option<Atom> {
        match self.atoms() {
            [atom] => Some(*atom),
            _ => None,
        }
    }

    fn concat(&self, other: &Self) -> Self {
        let mut atoms = self.0.clone();
        atoms.append(&mut other.atoms().to_vec());
        Self(atoms)
    }
}

impl PartialEq for Outcome {
    fn eq(&self, other: &Self) -> bool {
        self.atoms() == other.atoms()
    }
}

impl Eq for Outcome {}

impl Ord for Outcome {
    fn cmp(&self, other: &Self) -> Ordering {
        self.atoms().cmp(other.atoms())
    }
}

impl PartialOrd for Outcome {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(atom) = self.only() {
            return fmt::Display::fmt(&atom, f);
        }
        f.write_str("(")?;
        for (i, atom) in self.atoms().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", atom)?;
        }
        f.write_str(")")
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Distribution {
    masses: BTreeMap<Outcome, Float>,
}

impl Distribution {
    /// The zero distribution. Only useful as an accumulation target.
    pub fn new() -> Self {
        Self::default()
    }

    /// Unit mass on a single 1-ary outcome.
    pub fn certain(atom: impl Into<Atom>) -> Self {
        Self::from_iter([(Outcome::single(atom), 1.0)])
    }

    /// A fair die: each face in `1..=sides` has mass `1/sides`.
    pub fn uniform(sides: NonZeroUInt) -> Self {
        let p = 1.0 / sides.get() as Float;
        (1..=sides.get())
            .map(|face| (Outcome::single(face as Int), p))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Outcome, Float> {
        self.masses.iter()
    }

    pub fn outcomes(&self) -> btree_map::Keys<'_, Outcome, Float> {
        self.masses.keys()
    }

    /// Mass at `outcome`, zero when the outcome never occurs.
    pub fn mass(&self, outcome: &Outcome) -> Float {
        self.masses.get(outcome).copied().unwrap_or(0.0)
    }

    /// Mass at the 1-ary outcome `(atom,)`.
    pub fn mass_of(&self, atom: impl Into<Atom>) -> Float {
        self.mass(&Outcome::single(atom))
    }

    pub fn total_mass(&self) -> Float {
        self.masses.values().sum()
    }

    pub fn is_normalized(&self, tolerance: Float) -> bool {
        (self.total_mass() - 1.0).abs() <= tolerance
    }

    /// Joint law of `self` and `other` taken as independent: every pair of
    /// outcomes is concatenated and its masses multiplied.
    pub fn cartesian_product(&self, other: &Self) -> Self {
        let mut ret = BTreeMap::new();
        for (a, pa) in &self.masses {
            for (b, pb) in &other.masses {
                *ret.entry(a.concat(b)).or_insert(0.0) += pa * pb;
            }
        }
        Self { masses: ret }
    }

    /// Collapses every outcome tuple to a 1-ary outcome through `f`, summing
    /// the masses of tuples that land on the same result.
    pub fn fold<E, F>(&self, mut f: F) -> Result<Self, E>
    where
        F: FnMut(&[Atom]) -> Result<Atom, E>,
    {
        let mut ret = BTreeMap::new();
        for (outcome, p) in &self.masses {
            let key = Outcome::single(f(outcome.atoms())?);
            *ret.entry(key).or_insert(0.0) += p;
        }
        Ok(Self { masses: ret })
    }

    /// Adds `self` scaled by `scalar` into `target`, starting from the zero
    /// distribution when there is no target yet.
    ///
    /// Total mass grows by `scalar * self.total_mass()`; callers building a
    /// mixture are responsible for scalars that sum to one.
    pub fn scaled_accumulate(&self, scalar: Float, target: Option<Self>) -> Self {
        let mut target = target.unwrap_or_default();
        target.accumulate(self, scalar);
        target
    }

    pub(crate) fn accumulate(&mut self, other: &Self, scalar: Float) {
        for (outcome, p) in &other.masses {
            *self.masses.entry(outcome.clone()).or_insert(0.0) += p * scalar;
        }
    }
}

impl FromIterator<(Outcome, Float)> for Distribution {
    fn from_iter<I: IntoIterator<Item = (Outcome, Float)>>(iter: I) -> Self {
        let mut ret = Self::new();
        for (outcome, p) in iter {
            *ret.masses.entry(outcome).or_insert(0.0) += p;
        }
        ret
    }
}

impl<'a> IntoIterator for &'a Distribution {
    type Item = (&'a Outcome, &'a Float);
    type IntoIter = btree_map::Iter<'a, Outcome, Float>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (outcome, p)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}\t{}", outcome, p)?;
        }
        Ok(())
    }
}
