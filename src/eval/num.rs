use crate::common::*;
use std::cmp::Ordering;
use std::fmt;

/// A realized scalar. Comparisons yield `Int(0)` or `Int(1)`.
///
/// Ordering is total so numbers can key a distribution: integers compare
/// exactly among themselves, anything involving a real compares as `f64`
/// under [`f64::total_cmp`] with `-0.0` folded into `0.0`.
#[derive(Debug, Copy, Clone)]
pub enum Number {
    Int(Int),
    Float(Float),
}

impl Number {
    pub const ZERO: Self = Self::Int(0);
    pub const ONE: Self = Self::Int(1);
    pub const NEG_INFINITY: Self = Self::Float(Float::NEG_INFINITY);

    pub fn as_float(self) -> Float {
        match self {
            Self::Int(x) => x as Float,
            Self::Float(x) => x,
        }
    }

    /// The exact integer this number represents, if any.
    pub fn as_integer(self) -> Option<Int> {
        match self {
            Self::Int(x) => Some(x),
            Self::Float(x)
                if x.fract() == 0.0 && (Int::MIN as Float..=Int::MAX as Float).contains(&x) =>
            {
                Some(x as Int)
            }
            Self::Float(_) => None,
        }
    }

    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }

    pub(crate) fn truth(b: bool) -> Self {
        Self::Int(b as Int)
    }

    fn key(self) -> Float {
        // folds -0.0 into 0.0
        self.as_float() + 0.0
    }
}

// Integer results that leave the `Int` range are promoted to `Float`.
macro_rules! num_impl_bin_op {
    ($Name:ident, $fn_name:ident, $checked:ident, $op:tt) => {
        impl std::ops::$Name for Number {
            type Output = Self;

            fn $fn_name(self, rhs: Self) -> Self::Output {
                match (self, rhs) {
                    (Self::Int(x), Self::Int(y)) => x
                        .$checked(y)
                        .map_or_else(|| Self::Float(x as Float $op y as Float), Self::Int),
                    (x, y) => Self::Float(x.as_float() $op y.as_float()),
                }
            }
        }
    };
}

num_impl_bin_op!(Add, add, checked_add, +);
num_impl_bin_op!(Sub, sub, checked_sub, -);
num_impl_bin_op!(Mul, mul, checked_mul, *);

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(x), Self::Int(y)) => x.cmp(y),
            (x, y) => x.key().total_cmp(&y.key()),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Number {}

impl From<Int> for Number {
    fn from(x: Int) -> Self {
        Self::Int(x)
    }
}

impl From<Float> for Number {
    fn from(x: Float) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for Number {
    fn from(b: bool) -> Self {
        Self::truth(b)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(x) => fmt::Display::fmt(x, f),
            Self::Float(x) => fmt::Debug::fmt(x, f),
        }
    }
}
