//! # Money Module
//!
//! Amounts are stored in the smallest currency unit (cents) as `i64`.
//!
//! Payment rows carry negative totals (a credit against debt), so the type
//! is signed. Display is for logs only; the UI layer does localized
//! currency formatting.
//!
//! ## Usage
//! ```rust
//! use duka_core::money::Money;
//!
//! let cash = Money::from_cents(20_000);
//! let mpesa = Money::from_cents(10_000);
//! assert_eq!((cash + mpesa).cents(), 30_000);
//!
//! let debt = Money::from_cents(25_000);
//! assert_eq!(debt.saturating_reduce(cash + mpesa), Money::zero());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};
use ts_rs::TS;

/// A monetary value in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from shillings and cents.
    ///
    /// ```rust
    /// use duka_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(150, 50).cents(), 15_050);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Subtracts `amount`, clamping at zero.
    ///
    /// This is the debt rule: a balance never goes negative, overpayment is
    /// not carried as credit.
    #[inline]
    pub fn saturating_reduce(self, amount: Money) -> Money {
        Money((self.0 - amount.0).max(0))
    }
}

/// Display for logs: `KES 150.50`, `-KES 5.50`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}KES {}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(15_050).to_string(), "KES 150.50");
        assert_eq!(Money::from_cents(-550).to_string(), "-KES 5.50");
        assert_eq!(Money::zero().to_string(), "KES 0.00");
    }

    #[test]
    fn test_saturating_reduce() {
        let debt = Money::from_cents(1000);
        assert_eq!(debt.saturating_reduce(Money::from_cents(300)).cents(), 700);
        assert_eq!(debt.saturating_reduce(Money::from_cents(1500)).cents(), 0);
    }

    #[test]
    fn test_sum_and_neg() {
        let parts = [Money::from_cents(200), Money::from_cents(100)];
        let total: Money = parts.iter().sum();
        assert_eq!(total.cents(), 300);
        assert_eq!((-total).cents(), -300);
        assert!((-total).is_negative());
        assert_eq!((-total).abs(), total);
    }
}
