//! # Money Module
//!
//! Provides the `Money` type used by every ledger computation.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004                                      │
//! │                                                                         │
//! │  A sale of 100.00 paid 40.00 + 60.00 must leave EXACTLY 0.00 owed,     │
//! │  otherwise a phantom 0.0000001 debt lands on the customer.             │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents + a one-cent tolerance                    │
//! │    remaining = total - paid         (exact)                            │
//! │    settled   = remaining <= 1 cent  (MONEY_EPSILON)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Arithmetic saturates at the `i64` bounds. Amounts coming from a remote
//! snapshot are not trusted to be small; a clamped total is rejected by
//! validation instead of wrapping into a plausible-looking value.
//!
//! ## Usage
//! ```rust
//! use tally_core::money::Money;
//!
//! let total = Money::from_cents(10_000);
//! let paid = Money::from_cents(9_999);
//! assert!(total.approx_eq(paid));
//! assert!((total - paid).exceeds_epsilon() == false);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Tolerance applied to every "is it settled?" comparison.
pub const MONEY_EPSILON: Money = Money::from_cents(1);

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// Serialized as a bare integer so persisted collections and remote
/// snapshots stay compact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(12, 5).cents(), 1205);
    /// assert_eq!(Money::from_major_minor(-3, 50).cents(), -350);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        let major = major.saturating_mul(100);
        if major < 0 {
            Money(major.saturating_sub(minor))
        } else {
            Money(major.saturating_add(minor))
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns zero.
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

    /// Clamps negative values to zero.
    ///
    /// Used for debt balances and sale totals, which never go below zero.
    #[inline]
    pub const fn non_negative(self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            self
        }
    }

    /// Returns true when the value is larger than [`MONEY_EPSILON`].
    ///
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert!(!Money::from_cents(1).exceeds_epsilon());
    /// assert!(Money::from_cents(2).exceeds_epsilon());
    /// ```
    #[inline]
    pub const fn exceeds_epsilon(&self) -> bool {
        self.0 > MONEY_EPSILON.0
    }

    /// Compares two amounts with a one-cent tolerance.
    #[inline]
    pub const fn approx_eq(&self, other: Money) -> bool {
        self.0.abs_diff(other.0) <= MONEY_EPSILON.0 as u64
    }

    /// Multiplies a unit price by a quantity.
    #[inline]
    pub const fn times(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly rendering. Real currency formatting lives in the UI.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(self.0.saturating_neg())
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_non_negative_clamp() {
        assert_eq!(Money::from_cents(-1).non_negative(), Money::zero());
        assert_eq!(Money::from_cents(42).non_negative().cents(), 42);
    }

    #[test]
    fn test_epsilon_comparisons() {
        let total = Money::from_cents(10_000);
        assert!(total.approx_eq(Money::from_cents(9_999)));
        assert!(!total.approx_eq(Money::from_cents(9_998)));
        assert!(!(total - Money::from_cents(9_999)).exceeds_epsilon());
    }

    #[test]
    fn test_sum_and_times() {
        let lines = vec![Money::from_cents(299).times(3), Money::from_cents(101)];
        let total: Money = lines.into_iter().sum();
        assert_eq!(total.cents(), 998);
    }

    #[test]
    fn test_arithmetic_saturates() {
        let max = Money::from_cents(i64::MAX);
        assert_eq!((max + Money::from_cents(1)).cents(), i64::MAX);
        assert_eq!((Money::from_cents(i64::MIN) - Money::from_cents(1)).cents(), i64::MIN);
        assert_eq!((-Money::from_cents(i64::MIN)).cents(), i64::MAX);
        assert_eq!(Money::from_cents(i64::MAX / 2).times(3).cents(), i64::MAX);
        assert!(!max.approx_eq(Money::from_cents(i64::MIN)));

        let mut total = max;
        total += max;
        assert_eq!(total, max);
    }

    #[test]
    fn test_serializes_as_integer() {
        let json = serde_json::to_string(&Money::from_cents(4000)).unwrap();
        assert_eq!(json, "4000");
        let back: Money = serde_json::from_str("150").unwrap();
        assert_eq!(back.cents(), 150);
    }
}
