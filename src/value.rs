//! Numeric results of formulas.
//!
//! A `NodeValue` is a min/max pair; single numbers have `min == max`.
//! Absence is expressed as `Option<NodeValue>`: `None` means "not
//! applicable" and is absorbing through arithmetic unless an operation
//! documents otherwise.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Tolerance used when comparing values for equality.
pub const EPSILON: f64 = 1e-10;

/// A numeric range produced by evaluating a formula.
///
/// # Examples
///
/// ```rust
/// use zzmod::NodeValue;
///
/// let hit = NodeValue::range(10.0, 20.0);
/// let doubled = hit * NodeValue::from(2.0);
/// assert_eq!(doubled, NodeValue::range(20.0, 40.0));
/// assert!(NodeValue::from(0.1 + 0.2) == 0.3);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NodeValue {
    min: f64,
    max: f64,
}

impl NodeValue {
    /// A single value.
    pub fn new(value: f64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// A range. The bounds are ordered, so `range(5, 1)` is `1 to 5`.
    pub fn range(a: f64, b: f64) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Returns `true` if the value is non-zero.
    ///
    /// A range is true unless both bounds are zero.
    pub fn is_true(&self) -> bool {
        !(almost_equal(self.min, 0.0) && almost_equal(self.max, 0.0))
    }

    /// Apply `op` to both bounds.
    pub fn select(self, op: impl Fn(f64) -> f64) -> Self {
        Self::range(op(self.min), op(self.max))
    }

    /// Combine two values bound by bound.
    pub fn combine(self, other: Self, op: impl Fn(f64, f64) -> f64) -> Self {
        Self::range(op(self.min, other.min), op(self.max, other.max))
    }

    /// Clamp both bounds into `[lower, upper]`.
    pub fn clip(self, lower: f64, upper: f64) -> Self {
        self.select(|d| d.min(upper).max(lower))
    }
}

fn almost_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON
}

impl PartialEq for NodeValue {
    fn eq(&self, other: &Self) -> bool {
        almost_equal(self.min, other.min) && almost_equal(self.max, other.max)
    }
}

impl PartialEq<f64> for NodeValue {
    fn eq(&self, other: &f64) -> bool {
        almost_equal(self.min, *other) && almost_equal(self.max, *other)
    }
}

/// Ranges compare as wholes: `a < b` only if all of `a` lies below `b`.
/// Overlapping ranges that aren't equal are unordered.
impl PartialOrd for NodeValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            Some(Ordering::Equal)
        } else if self.max < other.min {
            Some(Ordering::Less)
        } else if self.min > other.max {
            Some(Ordering::Greater)
        } else {
            None
        }
    }
}

impl From<f64> for NodeValue {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<bool> for NodeValue {
    fn from(value: bool) -> Self {
        Self::new(if value { 1.0 } else { 0.0 })
    }
}

impl Add for NodeValue {
    type Output = NodeValue;

    fn add(self, rhs: Self) -> Self::Output {
        self.combine(rhs, |l, r| l + r)
    }
}

impl Sub for NodeValue {
    type Output = NodeValue;

    fn sub(self, rhs: Self) -> Self::Output {
        self.combine(rhs, |l, r| l - r)
    }
}

impl Mul for NodeValue {
    type Output = NodeValue;

    fn mul(self, rhs: Self) -> Self::Output {
        self.combine(rhs, |l, r| l * r)
    }
}

impl Div for NodeValue {
    type Output = NodeValue;

    fn div(self, rhs: Self) -> Self::Output {
        self.combine(rhs, |l, r| l / r)
    }
}

impl Neg for NodeValue {
    type Output = NodeValue;

    fn neg(self) -> Self::Output {
        self.select(|d| -d)
    }
}

impl fmt::Display for NodeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{} to {}", self.min, self.max)
        }
    }
}

/// Helpers on the nullable form.
pub trait NodeValueExt {
    /// Present and non-zero.
    fn is_true(&self) -> bool;

    /// Map both bounds, keeping absence.
    fn select(self, op: impl Fn(f64) -> f64) -> Option<NodeValue>;
}

impl NodeValueExt for Option<NodeValue> {
    fn is_true(&self) -> bool {
        self.map_or(false, |v| v.is_true())
    }

    fn select(self, op: impl Fn(f64) -> f64) -> Option<NodeValue> {
        self.map(|v| v.select(op))
    }
}

/// Sum of the present values; `None` if none are present.
///
/// # Examples
///
/// ```rust
/// use zzmod::value::{sum, NodeValue};
///
/// let values = [Some(NodeValue::from(2.0)), None, Some(NodeValue::from(3.0))];
/// assert_eq!(sum(values), Some(NodeValue::from(5.0)));
/// assert_eq!(sum([None, None]), None);
/// ```
pub fn sum(values: impl IntoIterator<Item = Option<NodeValue>>) -> Option<NodeValue> {
    values.into_iter().flatten().reduce(|l, r| l + r)
}

/// Product of the present values; `None` if none are present.
pub fn product(values: impl IntoIterator<Item = Option<NodeValue>>) -> Option<NodeValue> {
    values.into_iter().flatten().reduce(|l, r| l * r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_orders_bounds() {
        let v = NodeValue::range(5.0, 1.0);
        assert_eq!(v.min(), 1.0);
        assert_eq!(v.max(), 5.0);
    }

    #[test]
    fn test_equality_tolerance() {
        assert_eq!(NodeValue::from(1.0), NodeValue::from(1.0 + 1e-12));
        assert_ne!(NodeValue::from(1.0), NodeValue::from(1.001));
    }

    #[test]
    fn test_range_comparison() {
        let low = NodeValue::range(1.0, 2.0);
        let high = NodeValue::range(3.0, 4.0);
        let overlapping = NodeValue::range(1.5, 3.5);
        assert!(low < high);
        assert!(high > low);
        assert_eq!(low.partial_cmp(&overlapping), None);
    }

    #[test]
    fn test_truthiness() {
        assert!(NodeValue::from(true).is_true());
        assert!(!NodeValue::from(false).is_true());
        assert!(NodeValue::range(0.0, 1.0).is_true());
        assert!(!None::<NodeValue>.is_true());
        assert!(Some(NodeValue::from(-1.0)).is_true());
    }

    #[test]
    fn test_arithmetic_is_pairwise() {
        let a = NodeValue::range(1.0, 2.0);
        let b = NodeValue::range(10.0, 20.0);
        assert_eq!(a + b, NodeValue::range(11.0, 22.0));
        assert_eq!(b / a, NodeValue::from(10.0));
        assert_eq!(-a, NodeValue::range(-2.0, -1.0));
    }

    #[test]
    fn test_product_skips_absent() {
        let values = [Some(NodeValue::from(2.0)), None, Some(NodeValue::from(1.5))];
        assert_eq!(product(values), Some(NodeValue::from(3.0)));
        assert_eq!(product(Vec::new()), None);
    }

    #[test]
    fn test_clip() {
        let v = NodeValue::range(-5.0, 150.0).clip(0.0, 100.0);
        assert_eq!(v, NodeValue::range(0.0, 100.0));
    }
}
