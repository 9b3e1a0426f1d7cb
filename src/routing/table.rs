//! Route table: registration, removal, candidate lookup.
//!
//! # Responsibilities
//! - Hold registered routes and their compiled match conditions
//! - Return ALL matching candidates for a request (selection happens
//!   downstream)
//! - Support dynamic add/remove without disturbing in-flight lookups
//!
//! # Design Decisions
//! - Match conditions compiled once at registration
//! - Lookups take a read lock only for the synchronous scan; no await
//!   happens while the lock is held
//! - Explicit empty result rather than silent default

use std::sync::{Arc, RwLock};

use axum::http::Method;

use crate::routing::matcher::{AndMatcher, Matcher};
use crate::routing::route::{Route, RouteId};

struct Entry {
    route: Arc<Route>,
    matcher: AndMatcher,
}

/// Mutable registry of routes.
#[derive(Default)]
pub struct RouteTable {
    entries: RwLock<Vec<Entry>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Register a route, compiling its match conditions. Returns the id
    /// callers use for removal and introspection.
    pub fn register(&self, route: Route) -> RouteId {
        let id = route.id.clone();
        let matcher = AndMatcher::for_key(route.method.clone(), route.path_prefix.clone());
        let mut entries = self.entries.write().expect("route table lock poisoned");
        entries.push(Entry {
            route: Arc::new(route),
            matcher,
        });
        id
    }

    /// Remove a route by id. Returns false if the id is unknown.
    pub fn remove(&self, id: &RouteId) -> bool {
        let mut entries = self.entries.write().expect("route table lock poisoned");
        let before = entries.len();
        entries.retain(|e| e.route.id != *id);
        entries.len() != before
    }

    /// All routes matching the method and path, registration order
    /// preserved. Disabled routes are included; filtering them is the
    /// selector's job.
    pub fn candidates(&self, method: &Method, path: &str) -> Vec<Arc<Route>> {
        let entries = self.entries.read().expect("route table lock poisoned");
        entries
            .iter()
            .filter(|e| e.matcher.matches(method, path))
            .map(|e| e.route.clone())
            .collect()
    }

    /// Look up a route by id.
    pub fn get(&self, id: &RouteId) -> Option<Arc<Route>> {
        let entries = self.entries.read().expect("route table lock poisoned");
        entries
            .iter()
            .find(|e| e.route.id == *id)
            .map(|e| e.route.clone())
    }

    /// All registered routes, registration order preserved.
    pub fn all(&self) -> Vec<Arc<Route>> {
        let entries = self.entries.read().expect("route table lock poisoned");
        entries.iter().map(|e| e.route.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("route table lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
