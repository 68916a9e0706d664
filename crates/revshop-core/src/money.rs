//! # Money Module
//!
//! Provides the `Money` type for every price, total and sales figure.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Checkout total with doubles:                                           │
//! │    2 × 10.10 + 0.20 = 20.400000000000002                                │
//! │                                                                         │
//! │  The order total would disagree with the sum of its frozen lines.       │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    2 × 1010 + 20 = 2040 cents, exactly, every time                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use revshop_core::money::Money;
//!
//! let unit = Money::from_cents(1000); // $10.00
//! let line = unit.multiply_quantity(2); // $20.00
//! let total = line + Money::from_cents(500);
//! assert_eq!(total.cents(), 2500);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.final_price ──► CartLine line total ──► checkout total         │
/// │         │                                              │                │
/// │         └──► OrderLine.frozen_unit_price ◄── frozen ───┘                │
/// │                         │                                               │
/// │                         └──► seller sales / sales report                │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
///
/// Signed so that refunds and stock-restoring credits can be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use revshop_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from dollars and cents.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -$5.50.
    ///
    /// ```rust
    /// use revshop_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(10, 0).cents(), 1000);
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

    /// Returns the whole-dollar portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero money.
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

    /// Multiplies a unit price by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use revshop_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(500);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 1500);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Divides evenly, truncating toward zero. Returns `None` for a zero divisor.
    ///
    /// Used for average order value in the sales report.
    pub fn checked_div(&self, divisor: i64) -> Option<Money> {
        self.0.checked_div(divisor).map(Money)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly rendering (`$25.00`). Localized formatting belongs to the UI.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
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

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by a quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
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
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(2500)), "$25.00");
        assert_eq!(format!("{}", Money::from_cents(505)), "$5.05");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::zero()), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let mut running = Money::zero();
        running += a;
        running -= b;
        assert_eq!(running.cents(), 500);
    }

    #[test]
    fn test_sum_of_line_totals() {
        // P1 $10.00 × 2 + P2 $5.00 × 1
        let lines = [
            Money::from_cents(1000).multiply_quantity(2),
            Money::from_cents(500).multiply_quantity(1),
        ];
        let total: Money = lines.iter().sum();
        assert_eq!(total.cents(), 2500);
    }

    #[test]
    fn test_checked_div() {
        assert_eq!(Money::from_cents(1000).checked_div(3), Some(Money::from_cents(333)));
        assert_eq!(Money::from_cents(1000).checked_div(0), None);
    }

    #[test]
    fn test_sign_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_cents(1).is_positive());
        assert!(Money::from_cents(-1).is_negative());
    }
}
