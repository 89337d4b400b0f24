use axum::http::StatusCode;
use axum::response::Json;
use engine::EngineError;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use utoipa::{OpenApi, ToSchema};

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
}

/// API response wrapper
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

/// Error response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// Maps an engine error to the response status and error code the API
/// exposes for it.
pub fn engine_error_response(err: EngineError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, code) = match &err {
        EngineError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
        EngineError::NoPlanAvailable { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "NO_PLAN_AVAILABLE")
        }
        EngineError::DealConflict { .. } => (StatusCode::CONFLICT, "DEAL_CONFLICT"),
        EngineError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        EngineError::ActivationFailed(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "DEAL_ACTIVATION_FAILED")
        }
        EngineError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
    };

    if status.is_server_error() {
        error!("Engine operation failed: {}", err);
    } else {
        warn!("Engine operation rejected: {}", err);
    }

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            code: code.to_string(),
            success: false,
        }),
    )
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::categories::create_category,
        crate::handlers::categories::get_categories,
        crate::handlers::products::create_product,
        crate::handlers::products::get_products,
        crate::handlers::products::get_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::products::get_product_plans,
        crate::handlers::deals::create_deal,
        crate::handlers::deals::get_deals,
        crate::handlers::deals::get_deal,
        crate::handlers::deals::update_deal,
        crate::handlers::deals::toggle_deal,
        crate::handlers::deals::delete_deal,
        crate::handlers::product_deals::create_product_deal,
        crate::handlers::product_deals::get_product_deal,
        crate::handlers::product_deals::update_product_deal,
        crate::handlers::product_deals::toggle_product_deal,
        crate::handlers::product_deals::delete_product_deal,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            common::InstallmentTemplate,
            common::InstallmentPlanDto,
            common::DealInstallmentDto,
            crate::handlers::categories::CreateCategoryRequest,
            crate::handlers::categories::CategoryResponse,
            crate::handlers::products::CreateProductRequest,
            crate::handlers::products::UpdateProductRequest,
            crate::handlers::products::ProductResponse,
            crate::handlers::deals::CreateDealRequest,
            crate::handlers::deals::UpdateDealRequest,
            crate::handlers::deals::ToggleRequest,
            crate::handlers::deals::DealResponse,
            crate::handlers::product_deals::CreateProductDealRequest,
            crate::handlers::product_deals::UpdateProductDealRequest,
            crate::handlers::product_deals::ProductDealResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "categories", description = "Catalog category endpoints"),
        (name = "products", description = "Product and installment plan endpoints"),
        (name = "deals", description = "Deal lifecycle endpoints"),
        (name = "product-deals", description = "Per-product deal binding endpoints"),
    ),
    info(
        title = "Dealrust API",
        description = "Installment plan and deal lifecycle engine for an e-commerce catalog",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
