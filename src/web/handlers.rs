use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};

use super::{ApiResponse, AppState};
use crate::models::{ChatId, TrackedProduct};
use crate::scheduler::SchedulerStats;
use crate::utils::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EngineStats {
    pub tracked_products: usize,
    pub scheduler: SchedulerStats,
}

#[derive(Debug, Deserialize)]
pub struct ProductsQuery {
    pub chat: Option<ChatId>,
}

pub async fn health_check() -> Json<ApiResponse<HealthStatus>> {
    Json(ApiResponse::success(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

pub async fn get_stats(State(state): State<AppState>) -> Json<ApiResponse<EngineStats>> {
    let tracked_products = state.product_manager.registry().len().await;

    Json(ApiResponse::success(EngineStats {
        tracked_products,
        scheduler: state.scheduler.stats(),
    }))
}

pub async fn list_products(
    State(state): State<AppState>,
    query: Result<Query<ProductsQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<TrackedProduct>>>, AppError> {
    let Query(query) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    let chat = query
        .chat
        .ok_or_else(|| AppError::Validation("Query parameter `chat` is required".to_string()))?;

    let products = state.product_manager.list_products(chat).await;
    tracing::debug!(chat, count = products.len(), "Listed products");
    Ok(Json(ApiResponse::success(products)))
}
