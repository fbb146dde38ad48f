//! Cardinality lattice for option declarations.
//!
//! See the module doc on [`crate`] for how this fits into the rest of the
//! engine. `Arity` mirrors a small finite-state lattice: `Disabled` (0) up
//! through `Any` (`0..`), with `intersect` combining two arities into the
//! narrowest arity compatible with both, and `promote` stepping an optional
//! arity to its corresponding required one.

use std::fmt;

/// The cardinality class of an arity, independent of its concrete bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Parsed but not yet a coherent arity (the zero value / parse failure
    /// sentinel).
    Undefined,
    /// Exactly zero occurrences are permitted.
    Disabled,
    /// Zero or one occurrence.
    UpToOne,
    /// Exactly one occurrence.
    One,
    /// One or more occurrences.
    AtLeastOne,
    /// Zero or more occurrences.
    Any,
}

/// A parsed cardinality: a [`Kind`] plus the concrete `min`/`max` bounds it
/// carries. `max == u64::MAX` stands in for "unbounded".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Arity {
    kind: Kind,
    min: u64,
    max: u64,
}

/// Sentinel for an unbounded upper bound.
pub const UNBOUNDED: u64 = u64::MAX;

impl Arity {
    /// The `Undefined` arity: matches nothing, intersects to itself.
    #[must_use]
    pub const fn undefined() -> Self {
        Self {
            kind: Kind::Undefined,
            min: 0,
            max: 0,
        }
    }

    /// Constructs an arity directly from its parts. Prefer [`Arity::parse`]
    /// for textual forms.
    #[must_use]
    pub const fn new(kind: Kind, min: u64, max: u64) -> Self {
        Self { kind, min, max }
    }

    /// The arity's [`Kind`].
    #[must_use]
    pub const fn kind(&self) -> Kind {
        self.kind
    }

    /// Lower bound (inclusive).
    #[must_use]
    pub const fn min(&self) -> u64 {
        self.min
    }

    /// Upper bound (inclusive); [`UNBOUNDED`] means no upper bound.
    #[must_use]
    pub const fn max(&self) -> u64 {
        self.max
    }

    /// `true` unless the arity is [`Kind::Undefined`].
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        !matches!(self.kind, Kind::Undefined)
    }

    /// Parses one of the short forms (`0`, `?`, `1`, `+`, `*`) or the
    /// `min:max` form, where either side of the colon may be empty (meaning
    /// zero, and unbounded, respectively).
    ///
    /// Returns [`Arity::undefined`] on malformed input; the caller
    /// distinguishes success from failure via [`Arity::is_valid`], matching
    /// the original's `parse(s, &mut arity) -> bool` contract translated to
    /// a single return value.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "0" => return Self::new(Kind::Disabled, 0, 0),
            "?" => return Self::new(Kind::UpToOne, 0, 1),
            "1" => return Self::new(Kind::One, 1, 1),
            "+" => return Self::new(Kind::AtLeastOne, 1, UNBOUNDED),
            "*" => return Self::new(Kind::Any, 0, UNBOUNDED),
            _ => {}
        }
        let Some((lo, hi)) = s.split_once(':') else {
            return Self::undefined();
        };
        let min = if lo.is_empty() {
            Some(0)
        } else {
            lo.parse::<u64>().ok()
        };
        let max = if hi.is_empty() {
            Some(UNBOUNDED)
        } else {
            hi.parse::<u64>().ok()
        };
        let (Some(min), Some(max)) = (min, max) else {
            return Self::undefined();
        };
        if min > max {
            return Self::undefined();
        }
        let kind = match (min, max) {
            (0, 0) => Kind::Disabled,
            (0, 1) => Kind::UpToOne,
            (0, _) => Kind::Any,
            (1, 1) => Kind::One,
            (1, _) => Kind::AtLeastOne,
            _ => Kind::AtLeastOne,
        };
        Self::new(kind, min, max)
    }

    /// `min <= n <= max`.
    #[must_use]
    pub const fn check(&self, n: u64) -> bool {
        self.min <= n && n <= self.max
    }

    /// Combines two arities, returning the narrowest arity compatible with
    /// both, or [`Arity::undefined`] if they are incompatible. Commutative.
    ///
    /// `Disabled` and `Undefined` never combine into anything valid — not
    /// even with themselves — matching the original's `intersect` for those
    /// two kinds. For the remaining (optional/required) kinds, the result's
    /// bounds are the numeric intersection (`max(min)..min(max)`) and its
    /// `Kind` is re-derived from those bounds the same way [`Arity::parse`]
    /// derives a kind from a `min:max` literal. This is a deliberate
    /// tightening of the original, whose hand-written case table for this
    /// operation is not actually commutative (e.g. `One.intersect(UpToOne)`
    /// and `UpToOne.intersect(One)` disagree) — spec.md §8 requires
    /// `intersect` to be commutative, so the kind is derived canonically
    /// from the resulting bounds rather than taken from whichever operand's
    /// case arm happened to run.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        if matches!(self.kind, Kind::Disabled | Kind::Undefined)
            || matches!(other.kind, Kind::Disabled | Kind::Undefined)
        {
            return Self::undefined();
        }
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        if min > max {
            return Self::undefined();
        }
        let kind = match (min, max) {
            (1, 1) => Kind::One,
            (0, 1) => Kind::UpToOne,
            (0, _) => Kind::Any,
            (_, _) => Kind::AtLeastOne,
        };
        Self::new(kind, min, max)
    }

    /// Promotes an optional arity to its required counterpart:
    /// `UpToOne -> One`, `Any -> AtLeastOne`. Returns `true` iff a promotion
    /// was applied.
    pub fn promote(&mut self) -> bool {
        match self.kind {
            Kind::UpToOne => {
                self.kind = Kind::One;
                self.min = 1;
                self.max = 1;
                true
            }
            Kind::Any => {
                self.kind = Kind::AtLeastOne;
                self.min = 1;
                true
            }
            _ => false,
        }
    }

    /// Resets the arity to `Disabled`. A no-op is not performed here — the
    /// caller (the Dependency/BasicType layer) is responsible for only
    /// calling `disable` on options that are not already required, per
    /// spec.md's "no-op if the option is required" rule.
    pub fn disable(&mut self) {
        self.kind = Kind::Disabled;
        self.min = 0;
        self.max = 0;
    }

    /// The single-character marker used in diagnostics (`X`,`0`,`?`,`1`,`+`,`*`).
    #[must_use]
    pub fn marker(&self) -> &'static str {
        match self.kind {
            Kind::Undefined => "X",
            Kind::Disabled => "0",
            Kind::UpToOne => "?",
            Kind::One => "1",
            Kind::AtLeastOne => "+",
            Kind::Any => "*",
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Kind::Undefined => Ok(()),
            Kind::Disabled => write!(f, "0"),
            Kind::UpToOne => write!(f, "?"),
            Kind::One => write!(f, "1"),
            Kind::AtLeastOne if self.max == UNBOUNDED => write!(f, "+"),
            Kind::AtLeastOne => write!(f, "{}:{}", self.min, self.max),
            Kind::Any if self.max == UNBOUNDED => write!(f, "*"),
            Kind::Any => write!(f, "{}:{}", self.min, self.max),
        }
    }
}

/// `One <= UpToOne`, `One <= AtLeastOne`, `UpToOne <= Any`, `AtLeastOne <= Any`,
/// and every arity is `<=` itself.
impl PartialOrd for Arity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        if self.le(other) {
            if other.le(self) {
                Some(std::cmp::Ordering::Equal)
            } else {
                Some(std::cmp::Ordering::Less)
            }
        } else if other.le(self) {
            Some(std::cmp::Ordering::Greater)
        } else {
            None
        }
    }

    fn le(&self, other: &Self) -> bool {
        if self.kind == other.kind {
            return true;
        }
        match self.kind {
            Kind::One => matches!(other.kind, Kind::UpToOne | Kind::AtLeastOne),
            Kind::UpToOne | Kind::AtLeastOne => matches!(other.kind, Kind::Any),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_short_forms() {
        assert_eq!(Arity::parse("0").kind(), Kind::Disabled);
        assert_eq!(Arity::parse("?").kind(), Kind::UpToOne);
        assert_eq!(Arity::parse("1").kind(), Kind::One);
        assert_eq!(Arity::parse("+").kind(), Kind::AtLeastOne);
        assert_eq!(Arity::parse("*").kind(), Kind::Any);
    }

    #[test]
    fn parses_colon_form_with_empty_sides() {
        let a = Arity::parse(":3");
        assert_eq!((a.min(), a.max()), (0, 3));
        let a = Arity::parse("2:");
        assert_eq!((a.min(), a.max()), (2, UNBOUNDED));
    }

    #[test]
    fn rejects_malformed() {
        assert!(!Arity::parse("bogus").is_valid());
        assert!(!Arity::parse("3:1").is_valid());
        assert!(!Arity::parse("a:b").is_valid());
    }

    #[test]
    fn disabled_intersect_anything_is_undefined() {
        let d = Arity::parse("0");
        let any = Arity::parse("*");
        assert!(!d.intersect(&any).is_valid());
    }

    #[test]
    fn promote_semantics() {
        let mut a = Arity::parse("?");
        assert!(a.promote());
        assert_eq!(a.kind(), Kind::One);

        let mut a = Arity::parse("*");
        assert!(a.promote());
        assert_eq!(a.kind(), Kind::AtLeastOne);

        let mut a = Arity::parse("1");
        assert!(!a.promote());
    }

    #[test]
    fn ordering() {
        assert!(Arity::parse("1") <= Arity::parse("?"));
        assert!(Arity::parse("1") <= Arity::parse("+"));
        assert!(Arity::parse("?") <= Arity::parse("*"));
        assert!(Arity::parse("+") <= Arity::parse("*"));
        assert!(!(Arity::parse("*") <= Arity::parse("?")));
    }

    fn arbitrary_arity() -> impl Strategy<Value = Arity> {
        prop_oneof![
            Just(Arity::parse("0")),
            Just(Arity::parse("?")),
            Just(Arity::parse("1")),
            Just(Arity::parse("+")),
            Just(Arity::parse("*")),
            (0u64..5, 0u64..10).prop_filter_map("min<=max", |(min, max)| {
                (min <= max).then(|| Arity::parse(&format!("{min}:{max}")))
            }),
        ]
    }

    proptest! {
        #[test]
        fn intersect_is_commutative(a in arbitrary_arity(), b in arbitrary_arity()) {
            prop_assert_eq!(a.intersect(&b), b.intersect(&a));
        }
    }
}
