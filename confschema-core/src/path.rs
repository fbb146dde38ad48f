//! The JSONPath-like path sub-language used to address, match, and mutate
//! subtrees everywhere in the engine (model attributes, dependency targets,
//! instance diagnostics).
//!
//! Grammar (see spec.md §6 for the authoritative summary):
//!
//! ```text
//! path    := root (step)*
//! root    := '$' | '@' | step               # bare step is local-relative
//! step    := '.' name | '..' name | '[' sel ']' | '.' '*' | '..*'
//! name    := [A-Za-z_][A-Za-z0-9_]*
//! sel     := name-list | int-list | range | '*' | quoted-name
//! range   := int? ':' int? (':' int)?
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use snafu::Snafu;
use std::fmt;

static IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// A single step of a [`Path`]: what to descend into, plus whether it
/// recurses at every depth at or below the current node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Item {
    /// Absolute root marker; only ever the first item of an absolute path.
    Global,
    /// Current-object root marker, for relative paths.
    Local,
    /// Descend into one or more object keys.
    ///
    /// A single dotted step (`.name`) always produces a one-element list;
    /// the bracketed `name-list` form (`[a,b]`) produces the full set, a
    /// natural generalization of the grammar's `sel := name-list | ...`
    /// production symmetric with [`Item::Indexed`]'s `Vec<usize>`.
    Named(Vec<String>),
    /// Descend into one or more array indices.
    Indexed(Vec<usize>),
    /// Descend into an array slice `[lo:hi:step]`. `None` means "open" on
    /// that side (`lo` defaults to 0, `hi` to the end, `step` to 1).
    Ranged {
        lo: Option<usize>,
        hi: Option<usize>,
        step: Option<usize>,
    },
    /// Wildcard: every child of the current node.
    Any,
}

/// One step of a path plus its recursion flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    pub item: Item,
    /// When set, `item` is applied at every depth at or below the current
    /// node, not just the immediate child.
    pub recursive: bool,
}

/// A parsed path: a sequence of [`Segment`]s.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Path {
    segments: Vec<Segment>,
}

/// Failure parsing a textual path.
#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(display("invalid path format: {reason} (in {text:?})"))]
pub struct InvalidPathFormat {
    pub text: String,
    pub reason: String,
}

impl Path {
    /// An empty, local-relative path (matches the current node itself).
    #[must_use]
    pub fn empty() -> Self {
        Self { segments: vec![] }
    }

    /// The path's items, in order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// `true` if the first item is [`Item::Global`].
    #[must_use]
    pub fn global(&self) -> bool {
        matches!(self.segments.first().map(|s| &s.item), Some(Item::Global))
    }

    /// `true` if the path contains any [`Item::Any`] or any item with
    /// `recursive` set — i.e. it may bind more than one target.
    #[must_use]
    pub fn generative(&self) -> bool {
        self.segments
            .iter()
            .any(|s| s.recursive || matches!(s.item, Item::Any))
    }

    /// Appends one item (non-recursive) and returns the new path.
    #[must_use]
    pub fn push(&self, item: Item) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment {
            item,
            recursive: false,
        });
        Self { segments }
    }

    /// Returns the sub-path covering items `[from, to)`.
    #[must_use]
    pub fn sub(&self, from: usize, to: usize) -> Self {
        let to = to.min(self.segments.len());
        let from = from.min(to);
        Self {
            segments: self.segments[from..to].to_vec(),
        }
    }

    /// Concatenates `self` with `other`, dropping `other`'s leading root
    /// marker (if any) since `other` is being appended as a continuation of
    /// `self`, not re-rooted.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut segments = self.segments.clone();
        let tail = match other.segments.first().map(|s| &s.item) {
            Some(Item::Global | Item::Local) => &other.segments[1..],
            _ => &other.segments[..],
        };
        segments.extend_from_slice(tail);
        Self { segments }
    }

    /// Parses the textual form into a [`Path`].
    ///
    /// # Errors
    /// Returns [`InvalidPathFormat`] on syntax error.
    pub fn parse(s: &str) -> Result<Self, InvalidPathFormat> {
        let chars: Vec<char> = s.chars().collect();
        let mut pos = 0;
        let mut segments = Vec::new();

        if chars.first() == Some(&'$') {
            segments.push(Segment {
                item: Item::Global,
                recursive: false,
            });
            pos += 1;
        } else if chars.first() == Some(&'@') {
            segments.push(Segment {
                item: Item::Local,
                recursive: false,
            });
            pos += 1;
        } else if chars.first() == Some(&'*') {
            segments.push(Segment {
                item: Item::Any,
                recursive: false,
            });
            pos += 1;
        }

        while pos < chars.len() {
            match chars[pos] {
                '.' => {
                    pos += 1;
                    let mut recursive = false;
                    if chars.get(pos) == Some(&'.') {
                        recursive = true;
                        pos += 1;
                    }
                    if chars.get(pos) == Some(&'*') {
                        pos += 1;
                        segments.push(Segment {
                            item: Item::Any,
                            recursive,
                        });
                    } else {
                        let name = parse_name(&chars, &mut pos, s)?;
                        segments.push(Segment {
                            item: Item::Named(vec![name]),
                            recursive,
                        });
                    }
                }
                '[' => {
                    pos += 1;
                    let start = pos;
                    while chars.get(pos) != Some(&']') {
                        if pos >= chars.len() {
                            return Err(InvalidPathFormat {
                                text: s.to_string(),
                                reason: "unterminated '['".to_string(),
                            });
                        }
                        pos += 1;
                    }
                    let content: String = chars[start..pos].iter().collect();
                    pos += 1; // consume ']'
                    let item = parse_bracket(&content, s)?;
                    segments.push(Segment {
                        item,
                        recursive: false,
                    });
                }
                _ => {
                    return Err(InvalidPathFormat {
                        text: s.to_string(),
                        reason: format!("unexpected character {:?}", chars[pos]),
                    });
                }
            }
        }
        Ok(Self { segments })
    }

    /// Checks whether a concrete (non-generative) path is an instance of a
    /// possibly-generative pattern path, via pairwise item comparison with
    /// `Any` and `recursive` items handled as wildcards.
    #[must_use]
    pub fn matches(&self, concrete: &Self) -> bool {
        matches_rec(&self.segments, &concrete.segments)
    }
}

fn matches_rec(pattern: &[Segment], concrete: &[Segment]) -> bool {
    let Some((head, rest)) = pattern.split_first() else {
        return concrete.is_empty();
    };
    if concrete.is_empty() {
        return false;
    }
    if head.recursive {
        let consume_here =
            item_matches(&head.item, &concrete[0].item) && matches_rec(rest, &concrete[1..]);
        let descend_deeper = matches_rec(pattern, &concrete[1..]);
        consume_here || descend_deeper
    } else {
        item_matches(&head.item, &concrete[0].item) && matches_rec(rest, &concrete[1..])
    }
}

fn item_matches(pattern: &Item, concrete: &Item) -> bool {
    if matches!(pattern, Item::Any) {
        return true;
    }
    pattern == concrete
}

fn parse_name(chars: &[char], pos: &mut usize, full: &str) -> Result<String, InvalidPathFormat> {
    let start = *pos;
    match chars.get(*pos) {
        Some(c) if is_ident_start(*c) => {}
        _ => {
            return Err(InvalidPathFormat {
                text: full.to_string(),
                reason: "expected identifier".to_string(),
            })
        }
    }
    *pos += 1;
    while chars.get(*pos).map(|c| is_ident_continue(*c)).unwrap_or(false) {
        *pos += 1;
    }
    let name: String = chars[start..*pos].iter().collect();
    if !IDENT.is_match(&name) {
        return Err(InvalidPathFormat {
            text: full.to_string(),
            reason: format!("invalid identifier: {name:?}"),
        });
    }
    Ok(name)
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}
fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn parse_bracket(content: &str, full: &str) -> Result<Item, InvalidPathFormat> {
    let err = |reason: &str| InvalidPathFormat {
        text: full.to_string(),
        reason: reason.to_string(),
    };
    if content.is_empty() {
        return Err(err("empty bracket selector"));
    }
    if content == "*" {
        return Ok(Item::Any);
    }
    if content.contains(':') {
        let parts: Vec<&str> = content.split(':').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(err("range must have one or two colons"));
        }
        let parse_opt = |p: &str| -> Result<Option<usize>, InvalidPathFormat> {
            if p.is_empty() {
                Ok(None)
            } else {
                p.parse::<usize>()
                    .map(Some)
                    .map_err(|_| err("malformed range bound"))
            }
        };
        let lo = parse_opt(parts[0])?;
        let hi = parse_opt(parts[1])?;
        let step = if parts.len() == 3 {
            parse_opt(parts[2])?
        } else {
            None
        };
        return Ok(Item::Ranged { lo, hi, step });
    }
    let parts: Vec<&str> = content.split(',').map(str::trim).collect();
    let all_int = parts.iter().all(|p| p.parse::<usize>().is_ok());
    if all_int {
        let idxs: Vec<usize> = parts.iter().map(|p| p.parse().unwrap()).collect();
        return Ok(Item::Indexed(idxs));
    }
    let mut names = Vec::with_capacity(parts.len());
    for p in parts {
        let unquoted = strip_quotes(p);
        names.push(unquoted.to_string());
    }
    Ok(Item::Named(names))
}

fn strip_quotes(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2
        && ((bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\'')
            || (bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"'))
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            let is_first = i == 0;
            match &seg.item {
                Item::Global => write!(f, "$")?,
                Item::Local => write!(f, "@")?,
                Item::Any => {
                    if is_first {
                        write!(f, "*")?;
                    } else if seg.recursive {
                        write!(f, "..*")?;
                    } else {
                        write!(f, ".*")?;
                    }
                }
                Item::Named(names) if names.len() == 1 && IDENT.is_match(&names[0]) => {
                    write!(f, "{}{}", if seg.recursive { ".." } else { "." }, names[0])?;
                }
                Item::Named(names) => {
                    let quoted: Vec<String> = names.iter().map(|n| format!("'{n}'")).collect();
                    write!(f, "[{}]", quoted.join(","))?;
                }
                Item::Indexed(idxs) => {
                    let parts: Vec<String> = idxs.iter().map(ToString::to_string).collect();
                    write!(f, "[{}]", parts.join(","))?;
                }
                Item::Ranged { lo, hi, step } => {
                    let lo = lo.map(|v| v.to_string()).unwrap_or_default();
                    let hi = hi.map(|v| v.to_string()).unwrap_or_default();
                    match step {
                        Some(st) => write!(f, "[{lo}:{hi}:{st}]")?,
                        None => write!(f, "[{lo}:{hi}]")?,
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_global_and_named() {
        let p = Path::parse("$.a.b").unwrap();
        assert!(p.global());
        assert_eq!(p.segments().len(), 3);
    }

    #[test]
    fn parses_local_named() {
        let p = Path::parse("@.a").unwrap();
        assert!(!p.global());
    }

    #[test]
    fn parses_bare_relative() {
        let p = Path::parse(".a.b").unwrap();
        assert!(!p.global());
        assert_eq!(p.segments().len(), 2);
    }

    #[test]
    fn parses_indexed() {
        let p = Path::parse("$.a[0,1,2]").unwrap();
        assert_eq!(
            p.segments()[2].item,
            Item::Indexed(vec![0, 1, 2])
        );
    }

    #[test]
    fn parses_ranged() {
        let p = Path::parse("$.a[1:3:2]").unwrap();
        assert_eq!(
            p.segments()[2].item,
            Item::Ranged {
                lo: Some(1),
                hi: Some(3),
                step: Some(2)
            }
        );
        let p = Path::parse("$.a[:3]").unwrap();
        assert_eq!(
            p.segments()[2].item,
            Item::Ranged {
                lo: None,
                hi: Some(3),
                step: None
            }
        );
    }

    #[test]
    fn parses_wildcard_forms() {
        assert_eq!(Path::parse("$.*").unwrap().generative(), true);
        assert_eq!(Path::parse("$..a").unwrap().generative(), true);
        assert!(!Path::parse("$.a.b").unwrap().generative());
    }

    #[test]
    fn rejects_malformed() {
        assert!(Path::parse("$.").is_err());
        assert!(Path::parse("$[").is_err());
        assert!(Path::parse("$.1abc").is_err());
    }

    #[test]
    fn match_plain_path() {
        let pattern = Path::parse("$.a.b").unwrap();
        let concrete = Path::parse("$.a.b").unwrap();
        assert!(pattern.matches(&concrete));
        let other = Path::parse("$.a.c").unwrap();
        assert!(!pattern.matches(&other));
    }

    #[test]
    fn match_wildcard() {
        let pattern = Path::parse("$.a.*").unwrap();
        let concrete = Path::parse("$.a.b").unwrap();
        assert!(pattern.matches(&concrete));
    }

    #[test]
    fn match_recursive() {
        let pattern = Path::parse("$..b").unwrap();
        assert!(pattern.matches(&Path::parse("$.b").unwrap()));
        assert!(pattern.matches(&Path::parse("$.a.b").unwrap()));
        assert!(pattern.matches(&Path::parse("$.a.c.b").unwrap()));
        assert!(!pattern.matches(&Path::parse("$.a.c").unwrap()));
    }

    #[test]
    fn indexed_permutation_not_equal() {
        let a = Path::parse("$.a[0,1]").unwrap();
        let b = Path::parse("$.a[1,0]").unwrap();
        assert!(!a.matches(&b));
    }

    #[test]
    fn merge_drops_others_root() {
        let a = Path::parse("$.a").unwrap();
        let b = Path::parse("@.b").unwrap();
        let merged = a.merge(&b);
        assert_eq!(merged.to_string(), "$.a.b");
    }

    #[test]
    fn sub_slices() {
        let p = Path::parse("$.a.b.c").unwrap();
        let s = p.sub(1, 3);
        assert_eq!(s.to_string(), ".a.b");
    }

    proptest! {
        #[test]
        fn round_trip_named(name in "[A-Za-z_][A-Za-z0-9_]{0,8}") {
            let p = Path::parse(&format!("$.{name}")).unwrap();
            let printed = p.to_string();
            let reparsed = Path::parse(&printed).unwrap();
            prop_assert_eq!(p, reparsed);
        }

        #[test]
        fn round_trip_indexed(a in 0usize..20, b in 0usize..20) {
            let p = Path::parse(&format!("$.x[{a},{b}]")).unwrap();
            let printed = p.to_string();
            let reparsed = Path::parse(&printed).unwrap();
            prop_assert_eq!(p, reparsed);
        }
    }
}
