//! Three-valued (Kleene) logic.
//!
//! Every predicate entry of a [`Structure`][crate::structure::Structure] holds one of
//! three values: definitely false, definitely true, or unknown ("1/2").
//! Unknown is the only way a bounded structure can speak about an unbounded set of
//! concrete stores, so every other module is built on this small algebra.
//!
//! # Orders
//!
//! There are two orders on Kleene values:
//!
//! - The **truth order** `False < Unknown < True`, used by `and` (minimum) and `or` (maximum).
//!   This is the derived [`Ord`] of the enum.
//! - The **information order**, in which `False` and `True` are both strictly more precise
//!   than `Unknown` and incomparable with each other. [`Kleene::less_or_equal`],
//!   [`Kleene::join`] and [`Kleene::meet`] work in this order.
//!
//! # Examples
//!
//! ```
//! use shape_rs::kleene::Kleene;
//!
//! assert_eq!(Kleene::True & Kleene::Unknown, Kleene::Unknown);
//! assert_eq!(Kleene::False | Kleene::Unknown, Kleene::Unknown);
//! assert_eq!(Kleene::join(Kleene::True, Kleene::False), Kleene::Unknown);
//! assert_eq!(Kleene::meet(Kleene::True, Kleene::False), None);
//! assert_eq!(Kleene::Unknown.to_string(), "1/2");
//! ```

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

/// A three-valued truth value.
///
/// The discriminants are the 2-bit codes used by canonical signatures.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(u8)]
pub enum Kleene {
    False = 0,
    Unknown = 1,
    True = 2,
}

impl Kleene {
    /// All values, in truth order.
    pub const ALL: [Kleene; 3] = [Kleene::False, Kleene::Unknown, Kleene::True];

    pub fn from_bool(value: bool) -> Self {
        if value {
            Kleene::True
        } else {
            Kleene::False
        }
    }

    /// Creates a value from its 2-bit code.
    ///
    /// # Panics
    ///
    /// Panics if `code > 2`.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Kleene::False,
            1 => Kleene::Unknown,
            2 => Kleene::True,
            _ => panic!("Invalid Kleene code {}", code),
        }
    }

    /// Returns the 2-bit code of this value.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Returns true for `False` and `True`.
    pub fn is_definite(self) -> bool {
        self != Kleene::Unknown
    }

    pub fn is_true(self) -> bool {
        self == Kleene::True
    }

    pub fn is_false(self) -> bool {
        self == Kleene::False
    }

    pub fn is_unknown(self) -> bool {
        self == Kleene::Unknown
    }

    /// Swaps `False` and `True`, keeps `Unknown`.
    pub fn negate(self) -> Self {
        match self {
            Kleene::False => Kleene::True,
            Kleene::Unknown => Kleene::Unknown,
            Kleene::True => Kleene::False,
        }
    }

    /// Kleene conjunction (minimum in the truth order).
    pub fn and(self, other: Self) -> Self {
        self.min(other)
    }

    /// Kleene disjunction (maximum in the truth order).
    pub fn or(self, other: Self) -> Self {
        self.max(other)
    }

    /// Kleene implication, `!self | other`.
    pub fn implies(self, other: Self) -> Self {
        self.negate().or(other)
    }

    /// Kleene equivalence: definite only when both sides are definite.
    pub fn equiv(self, other: Self) -> Self {
        if self.is_unknown() || other.is_unknown() {
            Kleene::Unknown
        } else {
            Kleene::from_bool(self == other)
        }
    }

    /// Combines two partial observations of the same fact.
    ///
    /// Returns the shared value when both agree, the definite one when exactly one
    /// side is unknown, and `None` when they are opposite definite values.
    pub fn meet(a: Self, b: Self) -> Option<Self> {
        match (a, b) {
            (Kleene::Unknown, x) | (x, Kleene::Unknown) => Some(x),
            (x, y) if x == y => Some(x),
            _ => None,
        }
    }

    /// Returns true iff [`Kleene::meet`] would succeed.
    pub fn agree(a: Self, b: Self) -> bool {
        Kleene::meet(a, b).is_some()
    }

    /// Least upper bound in the information order.
    pub fn join(a: Self, b: Self) -> Self {
        if a == b {
            a
        } else {
            Kleene::Unknown
        }
    }

    /// Information order: `self` is at least as precise as `other`.
    pub fn less_or_equal(self, other: Self) -> bool {
        other == Kleene::Unknown || self == other
    }
}

impl Default for Kleene {
    fn default() -> Self {
        Kleene::False
    }
}

impl From<bool> for Kleene {
    fn from(value: bool) -> Self {
        Kleene::from_bool(value)
    }
}

impl Not for Kleene {
    type Output = Kleene;

    fn not(self) -> Self::Output {
        self.negate()
    }
}

impl BitAnd for Kleene {
    type Output = Kleene;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.and(rhs)
    }
}

impl BitOr for Kleene {
    type Output = Kleene;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.or(rhs)
    }
}

impl fmt::Display for Kleene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kleene::False => write!(f, "0"),
            Kleene::Unknown => write!(f, "1/2"),
            Kleene::True => write!(f, "1"),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_negate() {
        assert_eq!(!Kleene::False, Kleene::True);
        assert_eq!(!Kleene::True, Kleene::False);
        assert_eq!(!Kleene::Unknown, Kleene::Unknown);
    }

    #[test]
    fn test_and_or_tables() {
        use Kleene::*;
        assert_eq!(True & True, True);
        assert_eq!(True & Unknown, Unknown);
        assert_eq!(Unknown & False, False);
        assert_eq!(False | Unknown, Unknown);
        assert_eq!(True | Unknown, True);
        assert_eq!(False | False, False);
    }

    #[test]
    fn test_meet_commutative_and_idempotent() {
        for a in Kleene::ALL {
            assert_eq!(Kleene::meet(a, a), Some(a));
            for b in Kleene::ALL {
                assert_eq!(Kleene::meet(a, b), Kleene::meet(b, a));
            }
        }
    }

    #[test]
    fn test_meet_fails_on_contradiction() {
        assert_eq!(Kleene::meet(Kleene::False, Kleene::True), None);
        assert_eq!(Kleene::meet(Kleene::True, Kleene::False), None);
        assert_eq!(Kleene::meet(Kleene::Unknown, Kleene::True), Some(Kleene::True));
        assert_eq!(Kleene::meet(Kleene::False, Kleene::Unknown), Some(Kleene::False));
    }

    #[test]
    fn test_agree_iff_meet() {
        for a in Kleene::ALL {
            for b in Kleene::ALL {
                assert_eq!(Kleene::agree(a, b), Kleene::meet(a, b).is_some());
            }
        }
    }

    #[test]
    fn test_join_is_upper_bound() {
        for a in Kleene::ALL {
            for b in Kleene::ALL {
                let j = Kleene::join(a, b);
                assert!(a.less_or_equal(j));
                assert!(b.less_or_equal(j));
            }
        }
    }

    #[test]
    fn test_less_or_equal_partial_order() {
        use Kleene::*;
        assert!(True.less_or_equal(Unknown));
        assert!(False.less_or_equal(Unknown));
        assert!(!Unknown.less_or_equal(True));
        assert!(!True.less_or_equal(False));
        for a in Kleene::ALL {
            assert!(a.less_or_equal(a));
        }
    }

    #[test]
    fn test_equiv() {
        use Kleene::*;
        assert_eq!(True.equiv(True), True);
        assert_eq!(True.equiv(False), False);
        assert_eq!(Unknown.equiv(Unknown), Unknown);
    }

    #[test]
    fn test_display() {
        assert_eq!(Kleene::False.to_string(), "0");
        assert_eq!(Kleene::Unknown.to_string(), "1/2");
        assert_eq!(Kleene::True.to_string(), "1");
    }

    #[test]
    #[should_panic(expected = "Invalid Kleene code")]
    fn test_from_code_panics() {
        Kleene::from_code(3);
    }
}
