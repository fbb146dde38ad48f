//! Range literals shared by `Attribute::Range` and a `Dependency`'s
//! optional constraint.

use std::fmt;

use confschema_core::Scalar;
use snafu::Snafu;

/// Failure parsing a range literal.
#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(display("invalid range literal {text:?}: {reason}"))]
pub struct InvalidRange {
    pub text: String,
    pub reason: String,
}

/// One side of a bound: open (exclusive) or closed (inclusive).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Closed(f64),
    Open(f64),
    Unbounded,
}

/// A parsed `[lo,hi]` / `(lo,hi)` / mixed-bracket range literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeSpec {
    pub lo: Bound,
    pub hi: Bound,
}

impl RangeSpec {
    /// Parses `[lo,hi]`, `(lo,hi)`, or a mixed-bracket form
    /// (`[lo,hi)`/`(lo,hi]`); either side may be empty, meaning unbounded.
    pub fn parse(s: &str) -> Result<Self, InvalidRange> {
        let s = s.trim();
        let err = |reason: &str| InvalidRange {
            text: s.to_string(),
            reason: reason.to_string(),
        };
        let mut chars = s.chars();
        let open_bracket = chars.next().ok_or_else(|| err("empty range"))?;
        let close_bracket = s.chars().last().ok_or_else(|| err("empty range"))?;
        let lo_closed = match open_bracket {
            '[' => true,
            '(' => false,
            _ => return Err(err("range must start with '[' or '('")),
        };
        let hi_closed = match close_bracket {
            ']' => true,
            ')' => false,
            _ => return Err(err("range must end with ']' or ')'")),
        };
        let inner = &s[1..s.len() - 1];
        let (lo_s, hi_s) = inner
            .split_once(',')
            .ok_or_else(|| err("range must have a single comma"))?;
        let parse_side = |s: &str| -> Result<f64, InvalidRange> {
            let s = s.trim();
            if s.is_empty() {
                Ok(f64::NAN) // placeholder, replaced by Unbounded below
            } else {
                s.parse::<f64>().map_err(|_| err("malformed bound"))
            }
        };
        let lo_raw = lo_s.trim();
        let hi_raw = hi_s.trim();
        let lo = if lo_raw.is_empty() {
            Bound::Unbounded
        } else if lo_closed {
            Bound::Closed(parse_side(lo_raw)?)
        } else {
            Bound::Open(parse_side(lo_raw)?)
        };
        let hi = if hi_raw.is_empty() {
            Bound::Unbounded
        } else if hi_closed {
            Bound::Closed(parse_side(hi_raw)?)
        } else {
            Bound::Open(parse_side(hi_raw)?)
        };
        Ok(Self { lo, hi })
    }

    /// `true` iff `n` lies within the range.
    #[must_use]
    pub fn contains(&self, n: f64) -> bool {
        let lo_ok = match self.lo {
            Bound::Closed(b) => n >= b,
            Bound::Open(b) => n > b,
            Bound::Unbounded => true,
        };
        let hi_ok = match self.hi {
            Bound::Closed(b) => n <= b,
            Bound::Open(b) => n < b,
            Bound::Unbounded => true,
        };
        lo_ok && hi_ok
    }

    /// `true` iff `self` is a subset of `other` (used when checking a
    /// dependency's range constraint against its target's declared range).
    #[must_use]
    pub fn subset_of(&self, other: &Self) -> bool {
        let lo_ok = match (self.lo, other.lo) {
            (_, Bound::Unbounded) => true,
            (Bound::Unbounded, _) => false,
            (Bound::Closed(a), Bound::Closed(b)) => a >= b,
            (Bound::Closed(a), Bound::Open(b)) => a > b,
            (Bound::Open(a), Bound::Closed(b)) => a >= b,
            (Bound::Open(a), Bound::Open(b)) => a >= b,
        };
        let hi_ok = match (self.hi, other.hi) {
            (_, Bound::Unbounded) => true,
            (Bound::Unbounded, _) => false,
            (Bound::Closed(a), Bound::Closed(b)) => a <= b,
            (Bound::Closed(a), Bound::Open(b)) => a < b,
            (Bound::Open(a), Bound::Closed(b)) => a <= b,
            (Bound::Open(a), Bound::Open(b)) => a <= b,
        };
        lo_ok && hi_ok
    }
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (open, lo) = match self.lo {
            Bound::Closed(v) => ('[', v.to_string()),
            Bound::Open(v) => ('(', v.to_string()),
            Bound::Unbounded => ('[', String::new()),
        };
        let (close, hi) = match self.hi {
            Bound::Closed(v) => (']', v.to_string()),
            Bound::Open(v) => (')', v.to_string()),
            Bound::Unbounded => (']', String::new()),
        };
        write!(f, "{open}{lo},{hi}{close}")
    }
}

/// `true` iff `value` is numeric and falls within `range`; non-numeric
/// scalars never satisfy a range.
#[must_use]
pub fn scalar_in_range(value: &Scalar, range: &RangeSpec) -> bool {
    match value {
        Scalar::Integer(i) => range.contains(*i as f64),
        Scalar::Float(f) => range.contains(*f),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_closed() {
        let r = RangeSpec::parse("[1,10]").unwrap();
        assert!(r.contains(1.0));
        assert!(r.contains(10.0));
        assert!(!r.contains(0.0));
    }

    #[test]
    fn parses_open() {
        let r = RangeSpec::parse("(1,10)").unwrap();
        assert!(!r.contains(1.0));
        assert!(r.contains(5.0));
        assert!(!r.contains(10.0));
    }

    #[test]
    fn parses_unbounded_sides() {
        let r = RangeSpec::parse("[,10]").unwrap();
        assert!(r.contains(-1000.0));
        assert!(!r.contains(11.0));
    }

    #[test]
    fn subset_check() {
        let inner = RangeSpec::parse("[2,8]").unwrap();
        let outer = RangeSpec::parse("[0,10]").unwrap();
        assert!(inner.subset_of(&outer));
        assert!(!outer.subset_of(&inner));
    }
}
