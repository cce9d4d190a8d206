use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Counts per electron of [`FixedCharge`]
const COUNTS_PER_ELECTRON: f64 = 1024.0;

/// Charge in fixed point, 1/1024 electron per count.
///
/// Accumulated charge is kept as an integer so the sum of the deposits of an
/// event does not depend on the order they arrive in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FixedCharge(i64);

impl FixedCharge {
    pub const ZERO: Self = Self(0);

    /// Round a charge in electrons to the nearest count. Non finite values saturate
    /// (NaN gives zero).
    pub fn from_electrons(electrons: f32) -> Self {
        Self((electrons as f64 * COUNTS_PER_ELECTRON).round() as i64)
    }

    pub fn electrons(self) -> f32 {
        (self.0 as f64 / COUNTS_PER_ELECTRON) as f32
    }

    pub fn counts(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Fraction of `total` this charge represents
    pub fn fraction_of(self, total: FixedCharge) -> f32 {
        (self.0 as f64 / total.0 as f64) as f32
    }
}

impl Add for FixedCharge {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for FixedCharge {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for FixedCharge {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, c| acc + c)
    }
}
