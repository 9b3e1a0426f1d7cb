//! Route matching logic.
//!
//! # Responsibilities
//! - Match the request method (exact)
//! - Match the request path prefix (case-sensitive)
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - No regex to guarantee O(n) matching
//! - A route's conditions are compiled once at registration

use axum::http::Method;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, method: &Method, path: &str) -> bool;
}

/// Matches the request method exactly.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    expected: Method,
}

impl MethodMatcher {
    pub fn new(method: Method) -> Self {
        Self { expected: method }
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, method: &Method, _path: &str) -> bool {
        *method == self.expected
    }
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, _method: &Method, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }

    /// The standard matching key: method AND path prefix.
    pub fn for_key(method: Method, path_prefix: impl Into<String>) -> Self {
        Self::new(vec![
            Box::new(MethodMatcher::new(method)),
            Box::new(PathPrefixMatcher::new(path_prefix)),
        ])
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, method: &Method, path: &str) -> bool {
        self.matchers.iter().all(|m| m.matches(method, path))
    }
}
