//! Store path parsing and matching.
//!
//! Paths address locations in the state tree with `.` separated keys and
//! `[n]` array indices, e.g. `user.items[0].name`.

use std::fmt;

use crate::StoreError;

/// Largest array index a path may address. Writes pad arrays with `null` up
/// to the index, so the cap bounds how far a single write can grow one.
pub const MAX_INDEX: usize = 1 << 16;

/// A single step into the state tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object member, e.g. `profile`
    Key(String),
    /// Array element, e.g. `[3]`
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// A parsed store path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorePath {
    raw: String,
    segments: Vec<PathSegment>,
}

impl StorePath {
    /// Parse `user.items[0].name` into `[Key(user), Key(items), Index(0), Key(name)]`.
    ///
    /// Rejects empty input, empty keys (`a..b`, `.a`, `a.`), unterminated or
    /// non-numeric brackets and indices above [`MAX_INDEX`].
    pub fn parse(input: &str) -> std::result::Result<Self, StoreError> {
        let invalid = |reason: &str| StoreError::InvalidPath {
            path: input.to_string(),
            reason: reason.to_string(),
        };

        if input.is_empty() {
            return Err(invalid("path should be a non-empty string"));
        }

        let mut segments = Vec::new();
        let mut key = String::new();
        // true right after `]`, where only `.`, `[` or the end may follow
        let mut after_index = false;
        let mut chars = input.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '.' => {
                    if key.is_empty() && !after_index {
                        return Err(invalid("empty segment"));
                    }
                    if !key.is_empty() {
                        segments.push(PathSegment::Key(std::mem::take(&mut key)));
                    }
                    after_index = false;
                    if chars.peek().is_none() {
                        return Err(invalid("trailing '.'"));
                    }
                }
                '[' => {
                    if !key.is_empty() {
                        segments.push(PathSegment::Key(std::mem::take(&mut key)));
                    } else if segments.is_empty() {
                        return Err(invalid("path cannot start with an index"));
                    }
                    let mut digits = String::new();
                    let mut closed = false;
                    for d in chars.by_ref() {
                        if d == ']' {
                            closed = true;
                            break;
                        }
                        digits.push(d);
                    }
                    if !closed {
                        return Err(invalid("unterminated '['"));
                    }
                    let index = digits
                        .parse::<usize>()
                        .map_err(|_| invalid("index should be a non-negative integer"))?;
                    if index > MAX_INDEX {
                        return Err(invalid("index exceeds MAX_INDEX"));
                    }
                    segments.push(PathSegment::Index(index));
                    after_index = true;
                }
                ']' => return Err(invalid("unexpected ']'")),
                other => {
                    if after_index {
                        return Err(invalid("expected '.' or '[' after ']'"));
                    }
                    key.push(other);
                }
            }
        }

        if !key.is_empty() {
            segments.push(PathSegment::Key(key));
        }

        Ok(StorePath {
            raw: input.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }
}

impl fmt::Display for StorePath {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// True when `a` and `b` address the same location, or one is an ancestor of
/// the other.
///
/// Works on the raw strings: `a.b` and `a[0]` are descendants of `a`, while
/// `ab` is unrelated to `a`.
pub fn intersects(
    a: &str,
    b: &str,
) -> bool {
    a == b || is_descendant(a, b) || is_descendant(b, a)
}

/// True if any path of `changed` intersects any path of `watched`.
pub fn any_intersects<A, B>(
    changed: &[A],
    watched: &[B],
) -> bool
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    changed
        .iter()
        .any(|c| watched.iter().any(|w| intersects(c.as_ref(), w.as_ref())))
}

fn is_descendant(
    path: &str,
    ancestor: &str,
) -> bool {
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && matches!(path.as_bytes()[ancestor.len()], b'.' | b'[')
}

/// Index addressed by an all-digit key such as the `0` of `items.0`. Only
/// meaningful when the container at that point is an array. Digits that
/// overflow `usize` saturate so they still fail the [`MAX_INDEX`] check.
pub(crate) fn key_as_index(key: &str) -> Option<usize> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(key.parse().unwrap_or(usize::MAX))
}
