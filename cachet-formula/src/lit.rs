//! Variables and signed literals.
use std::{fmt, ops};

/// Integer type backing variable and literal encodings.
pub type LitIdx = u32;

/// A propositional variable.
///
/// Variables are dense 0-based indices. User facing IO uses the 1-based DIMACS
/// convention where a negative integer denotes a negated variable.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Var {
    index: LitIdx,
}

impl Var {
    /// Creates a variable from a 0-based index.
    ///
    /// The index may not be larger than `Var::max_var().index()`.
    #[inline]
    pub fn from_index(index: usize) -> Var {
        debug_assert!(index <= Var::max_var().index());
        Var {
            index: index as LitIdx,
        }
    }

    /// Creates a variable from a positive 1-based DIMACS index.
    #[inline]
    pub fn from_dimacs(number: isize) -> Var {
        debug_assert!(number > 0);
        Var::from_index((number - 1) as usize)
    }

    /// The 0-based index of this variable.
    #[inline]
    pub const fn index(self) -> usize {
        self.index as usize
    }

    /// The 1-based DIMACS index of this variable.
    #[inline]
    pub fn to_dimacs(self) -> isize {
        (self.index + 1) as isize
    }

    /// The variable with the largest supported index.
    ///
    /// Leaves some headroom in the backing type, so a literal or a literal
    /// plus a tag bit still fits into a single word.
    pub const fn max_var() -> Var {
        Var {
            index: LitIdx::max_value() >> 4,
        }
    }

    /// Largest supported number of variables, `max_var().index() + 1`.
    pub const fn max_count() -> usize {
        Self::max_var().index() + 1
    }

    /// The literal of this variable with the given polarity.
    ///
    /// A `true` polarity produces the positive literal.
    #[inline]
    pub fn lit(self, polarity: bool) -> Lit {
        Lit::from_var(self, polarity)
    }

    /// The positive literal of this variable.
    #[inline]
    pub fn positive(self) -> Lit {
        Lit::from_var(self, true)
    }

    /// The negative literal of this variable.
    #[inline]
    pub fn negative(self) -> Lit {
        Lit::from_var(self, false)
    }
}

/// Uses the 1-based DIMACS encoding.
impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_dimacs())
    }
}

/// Uses the 1-based DIMACS encoding.
impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A variable or a negated variable.
///
/// Encoded as twice the variable index, plus one for negated literals. This
/// `code` makes negation a single bit flip and gives a dense index space of
/// size `2 * var_count` for per-literal tables.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Lit {
    code: LitIdx,
}

impl Lit {
    /// Creates a literal from a variable and a polarity.
    ///
    /// A `true` polarity produces the positive literal.
    #[inline]
    pub fn from_var(var: Var, polarity: bool) -> Lit {
        Lit {
            code: (var.index << 1) | (!polarity as LitIdx),
        }
    }

    /// Creates a literal from a 0-based variable index and a polarity.
    #[inline]
    pub fn from_index(index: usize, polarity: bool) -> Lit {
        Lit::from_var(Var::from_index(index), polarity)
    }

    /// Creates a literal with the given code.
    #[inline]
    pub fn from_code(code: usize) -> Lit {
        debug_assert!(code <= Var::max_var().index() * 2 + 1);
        Lit {
            code: code as LitIdx,
        }
    }

    /// Creates a literal from a nonzero DIMACS integer.
    ///
    /// The absolute value is the 1-based variable index, the sign of the
    /// integer is the polarity.
    #[inline]
    pub fn from_dimacs(number: isize) -> Lit {
        Lit::from_var(Var::from_dimacs(number.abs()), number > 0)
    }

    /// The 1-based DIMACS integer for this literal.
    #[inline]
    pub fn to_dimacs(self) -> isize {
        let number = self.var().to_dimacs();
        if self.is_negative() {
            -number
        } else {
            number
        }
    }

    /// The 0-based index of this literal's variable.
    #[inline]
    pub fn index(self) -> usize {
        (self.code >> 1) as usize
    }

    /// This literal's variable.
    #[inline]
    pub fn var(self) -> Var {
        Var {
            index: self.code >> 1,
        }
    }

    /// Whether this literal is a negated variable.
    #[inline]
    pub fn is_negative(self) -> bool {
        (self.code & 1) != 0
    }

    /// Whether this literal is a plain, non-negated variable.
    #[inline]
    pub fn is_positive(self) -> bool {
        !self.is_negative()
    }

    /// The dense encoding of this literal.
    #[inline]
    pub fn code(self) -> usize {
        self.code as usize
    }

    /// Applies a variable mapping to this literal, keeping the polarity.
    #[inline]
    pub fn map_var(self, map: impl FnOnce(Var) -> Var) -> Lit {
        map(self.var()).lit(self.is_positive())
    }
}

impl ops::Not for Lit {
    type Output = Lit;

    #[inline]
    fn not(self) -> Lit {
        Lit {
            code: self.code ^ 1,
        }
    }
}

/// Flips the polarity when the right hand side is `true`.
impl ops::BitXor<bool> for Lit {
    type Output = Lit;

    #[inline]
    fn bitxor(self, rhs: bool) -> Lit {
        Lit {
            code: self.code ^ (rhs as LitIdx),
        }
    }
}

impl From<Var> for Lit {
    #[inline]
    fn from(var: Var) -> Lit {
        var.positive()
    }
}

/// Uses the 1-based DIMACS encoding.
impl fmt::Debug for Lit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_dimacs())
    }
}

/// Uses the 1-based DIMACS encoding.
impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(any(test, feature = "proptest-strategies"))]
#[doc(hidden)]
pub mod strategy {
    use super::*;
    use proptest::prelude::*;

    pub fn var(index: impl Strategy<Value = usize>) -> impl Strategy<Value = Var> {
        index.prop_map(Var::from_index)
    }

    pub fn lit(index: impl Strategy<Value = usize>) -> impl Strategy<Value = Lit> {
        (var(index), proptest::bool::ANY).prop_map(|(var, polarity)| var.lit(polarity))
    }
}
