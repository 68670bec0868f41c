use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use super::AppState;
use crate::models::*;
use crate::recommend::ArtifactDescriptor;

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
/// The full error is logged server-side for debugging, but clients only
/// see a generic message to avoid leaking internal details.
fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    tracing::error!("Internal error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

fn product_not_found() -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, "Product not found".to_string())
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Catalogue
// ============================================================

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub category: Option<String>,
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<Vec<Product>>, (StatusCode, String)> {
    state
        .db
        .list_products(query.category.as_deref(), true)
        .map(Json)
        .map_err(internal_error)
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(sku): Path<String>,
) -> Result<Json<Product>, (StatusCode, String)> {
    state
        .db
        .get_product(&sku)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(product_not_found)
}

// ============================================================
// Recommendations
// ============================================================

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

pub async fn recommend_for_product(
    State(state): State<AppState>,
    Path(sku): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<RecommendationResult>, (StatusCode, String)> {
    // Unknown SKUs are a caller error; everything past this point degrades instead
    if state.db.get_product(&sku).map_err(internal_error)?.is_none() {
        return Err(product_not_found());
    }

    let limit = query.limit.unwrap_or(state.default_limit);
    Ok(Json(state.facade.recommend_for_product(&sku, limit)))
}

pub async fn recommend_for_basket(
    State(state): State<AppState>,
    Json(input): Json<BasketRecommendationInput>,
) -> Json<RecommendationResult> {
    let limit = input.limit.unwrap_or(state.default_limit);
    Json(state.facade.recommend_for_basket(&input.product_ids, limit))
}

// ============================================================
// Onboarding
// ============================================================

pub async fn predict_category(
    State(state): State<AppState>,
    Json(attributes): Json<RawAttributes>,
) -> Json<CategoryPrediction> {
    Json(state.facade.predict_category(&attributes))
}

// ============================================================
// Artifacts
// ============================================================

pub async fn list_artifacts(State(state): State<AppState>) -> Json<Vec<ArtifactDescriptor>> {
    Json(state.facade.artifacts())
}
