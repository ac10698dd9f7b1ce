//! Natural ordering for path-like identifiers.
//!
//! [`path_compare`] orders `/`-separated paths segment by segment:
//!
//! 1. segment text, case-insensitively, with digit runs compared as numbers
//!    (`name2` < `name10`); characters below `'0'` sort before numbers, all
//!    others after
//! 2. a directory (a segment followed by more path) before a leaf
//! 3. for two leaves, lowercase before uppercase at the first case difference
//!
//! Remaining ties are broken by the raw bytes of the whole path. Every path
//! maps to a [`PathKey`] and paths compare by key, so the comparator is a
//! strict total order on any input.

use std::cmp::Ordering;

/// Compares two paths in natural order.
///
/// ```
/// use sift_locator::path_compare;
/// use std::cmp::Ordering;
///
/// assert_eq!(path_compare("build2.log", "build10.log"), Ordering::Less);
/// assert_eq!(path_compare("lib/a.jar", "lib.txt"), Ordering::Less);
/// assert_eq!(path_compare("docs/readme", "docs"), Ordering::Less);
/// ```
pub fn path_compare(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    PathKey::new(a).cmp(&PathKey::new(b))
}

/// Sort key of a path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PathKey {
    segments: Vec<SegmentKey>,
    raw: Vec<u8>,
}

impl PathKey {
    pub fn new(path: &str) -> Self {
        let parts: Vec<&str> = path.split('/').collect();
        let last = parts.len() - 1;
        PathKey {
            segments: parts
                .iter()
                .enumerate()
                .map(|(i, part)| SegmentKey::new(part, i == last))
                .collect(),
            raw: path.as_bytes().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SegmentKey {
    tokens: Vec<Token>,
    kind: SegmentKind,
    /// Uppercase flags per character; leaves only.
    case: Vec<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum SegmentKind {
    Directory,
    Leaf,
}

impl SegmentKey {
    fn new(segment: &str, leaf: bool) -> Self {
        SegmentKey {
            tokens: tokenize(segment),
            kind: if leaf {
                SegmentKind::Leaf
            } else {
                SegmentKind::Directory
            },
            case: if leaf {
                segment.chars().map(char::is_uppercase).collect()
            } else {
                Vec::new()
            },
        }
    }
}

// Variant order is the sort order: Below < Number < Above.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Token {
    Below(char),
    /// Digit run without leading zeros, compared by length then digits.
    Number { len: usize, digits: String },
    Above(char),
}

fn tokenize(segment: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = segment.chars().flat_map(char::to_lowercase).peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            let mut run = String::from(c);
            while let Some(d) = chars.next_if(char::is_ascii_digit) {
                run.push(d);
            }
            let digits = run.trim_start_matches('0').to_string();
            tokens.push(Token::Number {
                len: digits.len(),
                digits,
            });
        } else if c < '0' {
            tokens.push(Token::Below(c));
        } else {
            tokens.push(Token::Above(c));
        }
    }
    tokens
}

/// A string ordered by [`path_compare`], for sorted collections.
#[derive(Debug, Clone)]
pub struct PathOrder<S>(pub S);

impl<S: AsRef<str>> PartialEq for PathOrder<S> {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_ref() == other.0.as_ref()
    }
}

impl<S: AsRef<str>> Eq for PathOrder<S> {}

impl<S: AsRef<str>> PartialOrd for PathOrder<S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<S: AsRef<str>> Ord for PathOrder<S> {
    fn cmp(&self, other: &Self) -> Ordering {
        path_compare(self.0.as_ref(), other.0.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(paths: &[&str]) -> Vec<String> {
        let mut v: Vec<String> = paths.iter().map(|s| s.to_string()).collect();
        v.sort_by(|a, b| path_compare(a, b));
        v
    }

    mod numbers {
        use super::*;

        #[test]
        fn digit_runs_compare_numerically() {
            assert_eq!(
                sorted(&["name10", "name2", "name1"]),
                vec!["name1", "name2", "name10"]
            );
        }

        #[test]
        fn leading_zeros_tie_break_raw() {
            assert_eq!(path_compare("a007", "a7"), Ordering::Less);
            assert_eq!(path_compare("a7", "a007"), Ordering::Greater);
        }

        #[test]
        fn punctuation_before_digits_letters_after() {
            assert_eq!(path_compare("a-1", "a1"), Ordering::Less);
            assert_eq!(path_compare("a1", "a_1"), Ordering::Less);
            assert_eq!(path_compare("a1", "ab"), Ordering::Less);
        }
    }

    mod segments {
        use super::*;

        #[test]
        fn separator_first() {
            assert_eq!(path_compare("a/b", "a-b"), Ordering::Less);
            assert_eq!(path_compare("a/b", "a.b"), Ordering::Less);
        }

        #[test]
        fn directory_before_leaf() {
            assert_eq!(path_compare("a/x", "a"), Ordering::Less);
            assert_eq!(
                sorted(&["b", "a", "a/z", "a/b/c"]),
                vec!["a/b/c", "a/z", "a", "b"]
            );
        }

        #[test]
        fn case_insensitive_primary() {
            assert_eq!(path_compare("B", "a"), Ordering::Greater);
            assert_eq!(path_compare("Abc", "abd"), Ordering::Less);
        }

        #[test]
        fn lowercase_leaf_first() {
            assert_eq!(path_compare("readme", "README"), Ordering::Less);
            assert_eq!(path_compare("aB", "Ab"), Ordering::Less);
        }

        #[test]
        fn directory_case_ignored_until_tie_break() {
            assert_eq!(path_compare("a/x", "A/y"), Ordering::Less);
            assert_eq!(path_compare("A/x", "a/x"), Ordering::Less);
        }
    }

    mod contract {
        use super::*;

        #[test]
        fn equal_only_for_identical() {
            assert_eq!(path_compare("x", "x"), Ordering::Equal);
            assert_ne!(path_compare("x", "X"), Ordering::Equal);
            assert_ne!(path_compare("01", "1"), Ordering::Equal);
        }

        #[test]
        fn known_cycle_is_ordered() {
            let paths = ["a/x", "a", "A/x"];
            for a in paths {
                for b in paths {
                    assert_eq!(path_compare(a, b), path_compare(b, a).reverse());
                }
            }
            assert_eq!(sorted(&paths), vec!["A/x", "a/x", "a"]);
        }

        #[test]
        fn path_order_in_btree() {
            let set: std::collections::BTreeSet<PathOrder<&str>> =
                ["b10", "b9", "a/c"].into_iter().map(PathOrder).collect();
            let order: Vec<&str> = set.into_iter().map(|p| p.0).collect();
            assert_eq!(order, vec!["a/c", "b9", "b10"]);
        }
    }
}
