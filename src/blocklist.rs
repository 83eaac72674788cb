//! Name blocking.
//!
//! Patterns are regular expressions matched against the whole name. A pattern
//! that does not compile never matches, so a bad block-list entry cannot stop
//! a schema from loading.

use regex::Regex;

/// Returns true when `name` matches any pattern in `patterns` in full.
pub fn matches_block_list<S: AsRef<str>>(name: &str, patterns: &[S]) -> bool {
    patterns.iter().any(|p| {
        let pattern = p.as_ref();
        match Regex::new(&format!("^(?:{})$", pattern)) {
            Ok(re) => re.is_match(name),
            Err(e) => {
                tracing::warn!("Ignoring block-list pattern '{}': {}", pattern, e);
                false
            }
        }
    })
}
