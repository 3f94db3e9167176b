//! Boolean literals and three-valued results.
//!
//! [`Lit`] is the packed literal exchanged with the enclosing clause
//! database; [`LBool`] is the outcome of every check in the engine.

use std::fmt;
use std::ops::Not;

/// A Boolean variable identifier.
pub type BoolVar = u32;

/// A literal (signed Boolean variable), packed as `var << 1 | sign`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lit(u32);

impl Lit {
    /// Create a positive literal from a variable.
    #[must_use]
    pub const fn positive(var: BoolVar) -> Self {
        Self(var << 1)
    }

    /// Create a negative literal from a variable.
    #[must_use]
    pub const fn negative(var: BoolVar) -> Self {
        Self((var << 1) | 1)
    }

    /// Create a literal with the given polarity.
    #[must_use]
    pub const fn new(var: BoolVar, positive: bool) -> Self {
        if positive {
            Self::positive(var)
        } else {
            Self::negative(var)
        }
    }

    /// Get the variable of this literal.
    #[must_use]
    pub const fn var(self) -> BoolVar {
        self.0 >> 1
    }

    /// Check if this literal is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        (self.0 & 1) == 0
    }

    /// Check if this literal is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        (self.0 & 1) != 0
    }

    /// Get the negation of this literal.
    #[must_use]
    pub const fn negate(self) -> Self {
        Self(self.0 ^ 1)
    }

    /// Get the raw value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl Not for Lit {
    type Output = Lit;

    fn not(self) -> Lit {
        self.negate()
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_positive() {
            write!(f, "{}", self.var())
        } else {
            write!(f, "-{}", self.var())
        }
    }
}

/// Three-valued truth: satisfied, refuted, or unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LBool {
    /// Holds
    True,
    /// Does not hold
    False,
    /// Could not be decided
    #[default]
    Undef,
}

impl LBool {
    /// Swap `True` and `False`; `Undef` stays.
    #[must_use]
    pub const fn negate(self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Undef => Self::Undef,
        }
    }

    /// Check for `True`.
    #[must_use]
    pub const fn is_true(self) -> bool {
        matches!(self, Self::True)
    }

    /// Check for `False`.
    #[must_use]
    pub const fn is_false(self) -> bool {
        matches!(self, Self::False)
    }

    /// Check for `Undef`.
    #[must_use]
    pub const fn is_undef(self) -> bool {
        matches!(self, Self::Undef)
    }
}

impl From<bool> for LBool {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

impl fmt::Display for LBool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "true"),
            Self::False => write!(f, "false"),
            Self::Undef => write!(f, "undef"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_literal() {
        let lit = Lit::positive(5);
        assert!(lit.is_positive());
        assert!(!lit.is_negative());
        assert_eq!(lit.var(), 5);
    }

    #[test]
    fn test_negation() {
        let pos = Lit::new(3, true);
        let neg = !pos;
        assert!(neg.is_negative());
        assert_eq!(pos.var(), neg.var());
        assert_eq!(pos, neg.negate());
        assert_eq!(format!("{}", neg), "-3");
    }

    #[test]
    fn test_lbool() {
        assert_eq!(LBool::from(true), LBool::True);
        assert_eq!(LBool::True.negate(), LBool::False);
        assert_eq!(LBool::Undef.negate(), LBool::Undef);
        assert!(LBool::default().is_undef());
        assert_eq!(LBool::False.to_string(), "false");
    }
}
