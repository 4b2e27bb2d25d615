//! Path validation, the two-tier glob language, and the access decision.

use regex::Regex;

use crate::types::{Capability, PolicyRule};

/// What a single `*` may match: a non-empty run of path characters within
/// one segment. Never crosses `/`.
const SEGMENT_WILDCARD: &str = "[A-Za-z0-9_-]+";

/// Whether `path` is a well-formed secret address: one or more `/`-separated
/// segments, each a non-empty run of `[A-Za-z0-9_-]`. No leading, trailing,
/// or consecutive separators.
pub fn is_valid_path(path: &str) -> bool {
    !path.is_empty()
        && path.split('/').all(|segment| {
            !segment.is_empty()
                && segment
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        })
}

/// Match `path` against a policy pattern.
///
/// The pattern language is the path grammar plus `*` (one segment's worth of
/// characters) and `**` (anything, possibly empty, spanning segments). The
/// bare pattern `**` matches every path including the empty string; that
/// exception is what lets a rule cover "list with no prefix".
///
/// Built by splitting on the literal `**`, regex-escaping the remaining
/// parts, widening single `*` to a non-slash repeat, and joining with `.*`.
/// An off-the-shelf glob whose `*` crosses `/` would get this wrong.
pub fn matches_pattern(pattern: &str, path: &str) -> bool {
    if pattern == "**" {
        return true;
    }

    let parts: Vec<String> = pattern
        .split("**")
        .map(|part| regex::escape(part).replace(r"\*", SEGMENT_WILDCARD))
        .collect();
    let source = format!("^{}$", parts.join(".*"));

    Regex::new(&source)
        .map(|re| re.is_match(path))
        .unwrap_or(false)
}

/// Existential lookup with default deny: true iff some rule names this
/// identity, carries this capability, and its pattern matches the path.
/// No ordering, no precedence, no explicit deny, no inheritance.
pub fn check_access(
    policies: &[PolicyRule],
    identity: &str,
    path: &str,
    capability: Capability,
) -> bool {
    policies.iter().any(|rule| {
        rule.identity == identity
            && rule.capabilities.contains(&capability)
            && matches_pattern(&rule.path_pattern, path)
    })
}
