//! Introspection endpoints for health checks and operators.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::server::AppState;
use crate::resilience::BreakerSnapshot;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub routes: usize,
}

#[derive(Serialize)]
pub struct RouteStatus {
    pub id: String,
    pub name: String,
    pub method: String,
    pub path_prefix: String,
    pub weight: u32,
    pub enabled: bool,
    pub breaker: BreakerSnapshot,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        routes: state.controller.route_snapshots().len(),
    })
}

pub async fn get_breakers(State(state): State<AppState>) -> Json<Vec<RouteStatus>> {
    let statuses = state
        .controller
        .route_snapshots()
        .into_iter()
        .map(|(route, breaker)| RouteStatus {
            id: route.id.to_string(),
            name: route.name.clone(),
            method: route.method.to_string(),
            path_prefix: route.path_prefix.clone(),
            weight: route.weight,
            enabled: route.enabled,
            breaker,
        })
        .collect();
    Json(statuses)
}
