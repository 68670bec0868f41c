mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::DEFAULT_RECOMMENDATION_LIMIT;
use crate::db::Database;
use crate::recommend::RecommendationFacade;

/// Shared handler state: the catalogue and the recommendation facade built on it.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub facade: RecommendationFacade,
    /// Panel size used when a request does not specify `limit`.
    pub default_limit: usize,
}

impl AppState {
    pub fn new(db: Database, facade: RecommendationFacade) -> Self {
        Self {
            db,
            facade,
            default_limit: DEFAULT_RECOMMENDATION_LIMIT,
        }
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        // Catalogue
        .route("/products", get(handlers::list_products))
        .route("/products/{sku}", get(handlers::get_product))
        // Recommendations
        .route(
            "/products/{sku}/recommendations",
            get(handlers::recommend_for_product),
        )
        .route("/recommendations/basket", post(handlers::recommend_for_basket))
        .route("/onboarding/predict", post(handlers::predict_category))
        // Artifacts
        .route("/artifacts", get(handlers::list_artifacts))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
