use crate::handlers::{
    categories::{create_category, get_categories},
    deals::{create_deal, delete_deal, get_deal, get_deals, toggle_deal, update_deal},
    health::health_check,
    product_deals::{
        create_product_deal, delete_product_deal, get_product_deal, toggle_product_deal,
        update_product_deal,
    },
    products::{
        create_product, delete_product, get_product, get_product_plans, get_products,
        update_product,
    },
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Category routes
        .route("/api/v1/categories", post(create_category))
        .route("/api/v1/categories", get(get_categories))
        // Product CRUD routes
        .route("/api/v1/products", post(create_product))
        .route("/api/v1/products", get(get_products))
        .route("/api/v1/products/:product_id", get(get_product))
        .route("/api/v1/products/:product_id", put(update_product))
        .route("/api/v1/products/:product_id", delete(delete_product))
        .route(
            "/api/v1/products/:product_id/installment-plans",
            get(get_product_plans),
        )
        // Deal lifecycle routes
        .route("/api/v1/deals", post(create_deal))
        .route("/api/v1/deals", get(get_deals))
        .route("/api/v1/deals/:deal_id", get(get_deal))
        .route("/api/v1/deals/:deal_id", put(update_deal))
        .route("/api/v1/deals/:deal_id", delete(delete_deal))
        .route("/api/v1/deals/:deal_id/toggle", post(toggle_deal))
        // Product-deal binding routes
        .route("/api/v1/deals/:deal_id/products", post(create_product_deal))
        .route("/api/v1/product-deals/:binding_id", get(get_product_deal))
        .route("/api/v1/product-deals/:binding_id", put(update_product_deal))
        .route(
            "/api/v1/product-deals/:binding_id",
            delete(delete_product_deal),
        )
        .route(
            "/api/v1/product-deals/:binding_id/toggle",
            post(toggle_product_deal),
        )
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
