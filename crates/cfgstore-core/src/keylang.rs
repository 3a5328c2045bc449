//! Key language
//!
//! Concrete keys are dot separated segments, e.g. `interface.3.address.0`.
//! Schema patterns mark lists with `[]` in place of the index segment, e.g.
//! `interface[].address[]`. Dependency patterns additionally accept `*`,
//! which matches the remainder of a key, and one dangling trailing character
//! (as in `a[]*`) which is a wildcard over whatever follows.
//!
//! The matchers walk both strings byte by byte and never allocate.

use crate::errors::{CfgError, Result};

/// List marker inside a schema pattern
pub const LIST_MARKER: &str = "[]";

/// Regular expression that stands for one list index in a concrete key
pub const INDEX_REGEX: &str = r"\.[0-9]+";

/// Consume the digits starting at `*i`; leaves `*i` on the last digit
fn match_index(key: &[u8], i: &mut usize) -> bool {
    let start = *i;
    let mut j = start;
    while j < key.len() && key[j].is_ascii_digit() {
        j += 1;
    }
    if j == start {
        return false;
    }
    *i = j - 1;
    true
}

enum Walk {
    /// Both strings were consumed
    Complete,
    /// The pattern hit `*` with `i` bytes of the key consumed
    Star(usize),
    /// The key ran out with `remaining` pattern bytes left
    KeyExhausted { consumed: usize, remaining: usize },
    Failed,
}

fn walk(key: &[u8], pattern: &[u8], allow_star: bool) -> Walk {
    let (mut i, mut j) = (0usize, 0usize);
    let mut in_vector = false;
    while i < key.len() && j < pattern.len() {
        let (k, s) = (key[i], pattern[j]);
        if allow_star && s == b'*' {
            return Walk::Star(i);
        }
        if in_vector {
            in_vector = false;
            if s == b']' && match_index(key, &mut i) {
                i += 1;
                j += 1;
                continue;
            }
            return Walk::Failed;
        }
        if s == b'[' && k == b'.' {
            in_vector = true;
        } else if k != s {
            return Walk::Failed;
        }
        i += 1;
        j += 1;
    }
    if in_vector {
        return Walk::Failed;
    }
    if i >= key.len() && j >= pattern.len() {
        return Walk::Complete;
    }
    if i >= key.len() {
        return Walk::KeyExhausted {
            consumed: i,
            remaining: pattern.len() - j,
        };
    }
    Walk::Failed
}

/// Does the concrete `key` instantiate the schema `pattern`?
///
/// `[]` in the pattern consumes `.` followed by one or more digits in the
/// key. Everything else must agree byte for byte, except that a trailing `*`
/// left over once the key is consumed is accepted (`a.3` matches `a[]*`).
pub fn key_match(key: &str, pattern: &str) -> bool {
    match walk(key.as_bytes(), pattern.as_bytes(), false) {
        Walk::Complete => true,
        Walk::KeyExhausted { remaining: 1, .. } => pattern.ends_with('*'),
        Walk::KeyExhausted { .. } | Walk::Star(_) | Walk::Failed => false,
    }
}

/// Match a key against a dependency pattern
///
/// Returns the length of the matched key prefix. `*` ends the match early at
/// the current key position; a single dangling pattern character left when
/// the key is exhausted is accepted as a wildcard.
pub fn dep_match(key: &str, pattern: &str) -> Option<usize> {
    match walk(key.as_bytes(), pattern.as_bytes(), true) {
        Walk::Complete => Some(key.len()),
        Walk::Star(i) => Some(i),
        Walk::KeyExhausted {
            consumed,
            remaining: 1,
        } => Some(consumed),
        Walk::KeyExhausted { .. } | Walk::Failed => None,
    }
}

/// Build a scan expression that matches every concrete key of `pattern`
///
/// `a.b[].c` becomes `^a\.b\.[0-9]+\.c$`; literal text is escaped.
pub fn generate_regex(pattern: &str) -> String {
    let parts: Vec<String> = pattern.split(LIST_MARKER).map(regex::escape).collect();
    format!("^{}$", parts.join(INDEX_REGEX))
}

/// Scan expression for the list entries directly below a concrete prefix
///
/// `interface.2.address` becomes `^interface\.2\.address\.[0-9]+$`.
pub fn entries_regex(prefix: &str) -> String {
    format!("^{}{}$", regex::escape(prefix), INDEX_REGEX)
}

/// Does the pattern contain a list marker anywhere?
pub fn is_list_pattern(pattern: &str) -> bool {
    pattern.contains(LIST_MARKER)
}

/// Does the pattern itself denote list entries (end in a list marker)?
pub fn is_list_entry_pattern(pattern: &str) -> bool {
    pattern.ends_with(LIST_MARKER)
}

/// Is the segment a list index?
pub fn is_index_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Split a concrete key into segments
pub fn segments(key: &str) -> Vec<&str> {
    key.split('.').collect()
}

/// Check that a concrete key is well formed
///
/// A key is non-empty, has no empty segments, carries no list markers or
/// wildcards, and does not start with an index.
pub fn validate_key(key: &str) -> Result<()> {
    let reject = |reason: &str| {
        Err(CfgError::MalformedKey {
            key: key.to_string(),
            reason: reason.to_string(),
        })
    };
    if key.is_empty() {
        return reject("empty key");
    }
    if key.contains(['[', ']', '*']) {
        return reject("concrete keys may not contain list markers or wildcards");
    }
    let segs = segments(key);
    if segs.iter().any(|s| s.is_empty()) {
        return reject("empty segment");
    }
    if is_index_segment(segs[0]) {
        return reject("first segment may not be a list index");
    }
    if key.chars().any(char::is_whitespace) {
        return reject("whitespace in key");
    }
    Ok(())
}

/// Check that a schema pattern is well formed
///
/// Literal segments follow the concrete key rules; `[]` may only directly
/// follow a literal segment.
pub fn validate_pattern(pattern: &str) -> Result<()> {
    let reject = |reason: &str| {
        Err(CfgError::MalformedKey {
            key: pattern.to_string(),
            reason: reason.to_string(),
        })
    };
    if pattern.is_empty() {
        return reject("empty pattern");
    }
    if pattern.contains('*') {
        return reject("wildcards are only valid in dependency patterns");
    }
    for seg in pattern.split('.') {
        let literal = seg.strip_suffix(LIST_MARKER).unwrap_or(seg);
        if literal.is_empty() || literal.contains(['[', ']']) {
            return reject("list marker must follow a literal segment");
        }
    }
    Ok(())
}

/// Replace every list marker with index 0, yielding a sample concrete key
pub fn sample_key(pattern: &str) -> String {
    pattern.replace(LIST_MARKER, ".0")
}
