//! Weight-proportional route selection.

use std::sync::Arc;

use rand::Rng;

use crate::error::Error;
use crate::load_balancer::RouteSelector;
use crate::routing::Route;

/// Selects among enabled routes with probability proportional to weight.
///
/// Non-positive weights are treated as 1. A single enabled candidate
/// short-circuits without touching the RNG.
#[derive(Debug, Default)]
pub struct Weighted;

impl Weighted {
    pub fn new() -> Self {
        Self
    }

    /// Selection against a caller-supplied RNG. Tests seed a `StdRng`
    /// here to make draws deterministic.
    pub fn pick_with<R: Rng>(
        &self,
        routes: &[Arc<Route>],
        rng: &mut R,
    ) -> Result<Arc<Route>, Error> {
        let enabled: Vec<&Arc<Route>> = routes.iter().filter(|r| r.enabled).collect();
        match enabled.len() {
            0 => Err(Error::NoRouteAvailable),
            1 => Ok(enabled[0].clone()),
            _ => {
                let total: u64 = enabled.iter().map(|r| r.effective_weight() as u64).sum();
                let mut remainder = rng.gen_range(0..total) as i64;
                for route in &enabled {
                    remainder -= route.effective_weight() as i64;
                    if remainder < 0 {
                        return Ok((*route).clone());
                    }
                }
                // Unreachable: the draw is strictly below the weight sum.
                Ok(enabled[enabled.len() - 1].clone())
            }
        }
    }
}

impl RouteSelector for Weighted {
    fn pick(&self, routes: &[Arc<Route>]) -> Result<Arc<Route>, Error> {
        self.pick_with(routes, &mut rand::thread_rng())
    }
}
