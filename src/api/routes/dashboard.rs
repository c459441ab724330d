//! Dashboard Routes
//!
//! - GET /api/v1/dashboard - Settings page composition

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::state::AppState;
use crate::dashboard::DashboardView;

pub async fn dashboard(State(state): State<Arc<AppState>>) -> Json<DashboardView> {
    Json(state.dashboard.view())
}
