//! Route matching logic.
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Query strings are part of the path and ignored by prefix matching
//! - No regex to guarantee O(n) matching

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_matches_with_query() {
        let matcher = PathPrefixMatcher::new("/shot.jpg");
        assert!(matcher.matches("/shot.jpg"));
        assert!(matcher.matches("/shot.jpg?t=1700000000"));
        assert!(!matcher.matches("/"));
        assert!(!matcher.matches("/SHOT.JPG"));
        assert!(!matcher.matches("/static/shot.jpg"));
    }
}
