//! Round-robin route selection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::Error;
use crate::load_balancer::RouteSelector;
use crate::routing::Route;

/// Rotates through enabled candidates in order.
///
/// The cursor is shared across matching keys; fairness within one key is
/// approximate when several keys interleave, which is acceptable for a
/// tie-breaking strategy.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RouteSelector for RoundRobin {
    fn pick(&self, routes: &[Arc<Route>]) -> Result<Arc<Route>, Error> {
        let enabled: Vec<&Arc<Route>> = routes.iter().filter(|r| r.enabled).collect();
        if enabled.is_empty() {
            return Err(Error::NoRouteAvailable);
        }
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % enabled.len();
        Ok(enabled[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RouteConfig, TargetConfig};

    fn make_route(name: &str, enabled: bool) -> Arc<Route> {
        let mut route = Route::from_config(&RouteConfig {
            name: name.into(),
            method: "GET".into(),
            path_prefix: "/api".into(),
            target: TargetConfig {
                scheme: "http".into(),
                host: "127.0.0.1".into(),
                port: 3000,
                endpoint: String::new(),
            },
            weight: 1,
            enabled: true,
        })
        .unwrap();
        route.enabled = enabled;
        Arc::new(route)
    }

    #[test]
    fn test_rotation() {
        let selector = RoundRobin::new();
        let routes = vec![make_route("a", true), make_route("b", true)];

        assert_eq!(selector.pick(&routes).unwrap().name, "a");
        assert_eq!(selector.pick(&routes).unwrap().name, "b");
        assert_eq!(selector.pick(&routes).unwrap().name, "a");
    }

    #[test]
    fn test_skips_disabled() {
        let selector = RoundRobin::new();
        let routes = vec![make_route("a", false), make_route("b", true)];

        assert_eq!(selector.pick(&routes).unwrap().name, "b");
        assert_eq!(selector.pick(&routes).unwrap().name, "b");
    }

    #[test]
    fn test_all_disabled_is_an_error() {
        let selector = RoundRobin::new();
        let routes = vec![make_route("a", false)];
        assert!(matches!(
            selector.pick(&routes),
            Err(Error::NoRouteAvailable)
        ));
    }
}
