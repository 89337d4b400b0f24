use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use common::{DealInstallmentDto, InstallmentTemplate};
use engine::lifecycle::{self, BindingDraft};
use model::entities::{deal_installment, product_deal};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, trace, warn};
use utoipa::ToSchema;

use super::deals::{to_installment_dto, ToggleRequest};
use crate::schemas::{engine_error_response, ApiResponse, AppState, ErrorResponse};

/// Request body for binding a product to a deal
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateProductDealRequest {
    /// The product to bind
    pub product_id: i32,
    /// Whether the binding is live immediately (default: true)
    pub active: Option<bool>,
    /// Per-product installment overrides; derived from the product's price
    /// and category when omitted
    pub installments: Option<Vec<InstallmentTemplate>>,
}

/// Request body for updating a binding; replaces its templates wholesale
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UpdateProductDealRequest {
    /// Desired active state after the update
    pub active: bool,
    /// Replacement installment overrides; derived from the product when
    /// omitted
    pub installments: Option<Vec<InstallmentTemplate>>,
}

/// Product-deal binding response model
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductDealResponse {
    pub id: i32,
    pub deal_id: i32,
    pub product_id: i32,
    pub active: bool,
    pub installments: Vec<DealInstallmentDto>,
}

fn binding_response(
    binding: product_deal::Model,
    rows: Vec<deal_installment::Model>,
) -> ProductDealResponse {
    ProductDealResponse {
        id: binding.id,
        deal_id: binding.deal_id,
        product_id: binding.product_id,
        active: binding.active,
        installments: rows.into_iter().map(to_installment_dto).collect(),
    }
}

/// Bind an additional product to a deal
#[utoipa::path(
    post,
    path = "/api/v1/deals/{deal_id}/products",
    tag = "product-deals",
    params(
        ("deal_id" = i32, Path, description = "Deal ID"),
    ),
    request_body = CreateProductDealRequest,
    responses(
        (status = 201, description = "Product bound successfully", body = ApiResponse<ProductDealResponse>),
        (status = 404, description = "Deal or product not found", body = ErrorResponse),
        (status = 409, description = "Another active deal claims the product", body = ErrorResponse),
        (status = 422, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_product_deal(
    Path(deal_id): Path<i32>,
    State(state): State<AppState>,
    Json(request): Json<CreateProductDealRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductDealResponse>>), (StatusCode, Json<ErrorResponse>)>
{
    trace!("Entering create_product_deal function for deal_id: {}", deal_id);
    debug!("Binding product {} to deal {}", request.product_id, deal_id);

    let draft = BindingDraft {
        deal_id,
        product_id: request.product_id,
        active: request.active.unwrap_or(true),
        installments: request.installments,
    };

    let (binding, rows) = lifecycle::create_product_deal(&state.db, draft)
        .await
        .map_err(engine_error_response)?;

    info!(
        "Product {} bound to deal {} (binding {})",
        binding.product_id, binding.deal_id, binding.id
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: binding_response(binding, rows),
            message: "Product bound successfully".to_string(),
            success: true,
        }),
    ))
}

/// Get a specific product-deal binding by ID
#[utoipa::path(
    get,
    path = "/api/v1/product-deals/{binding_id}",
    tag = "product-deals",
    params(
        ("binding_id" = i32, Path, description = "Binding ID"),
    ),
    responses(
        (status = 200, description = "Binding retrieved successfully", body = ApiResponse<ProductDealResponse>),
        (status = 404, description = "Binding not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn get_product_deal(
    Path(binding_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ProductDealResponse>>, StatusCode> {
    trace!(
        "Entering get_product_deal function for binding_id: {}",
        binding_id
    );

    let binding = match product_deal::Entity::find_by_id(binding_id).one(&state.db).await {
        Ok(Some(binding)) => binding,
        Ok(None) => {
            warn!("Binding with ID {} not found", binding_id);
            return Err(StatusCode::NOT_FOUND);
        }
        Err(db_error) => {
            error!(
                "Failed to retrieve binding with ID {}: {}",
                binding_id, db_error
            );
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let rows = match deal_installment::Entity::find()
        .filter(deal_installment::Column::ProductDealId.eq(binding_id))
        .order_by_asc(deal_installment::Column::TermMonths)
        .all(&state.db)
        .await
    {
        Ok(rows) => rows,
        Err(db_error) => {
            error!(
                "Failed to retrieve installments for binding {}: {}",
                binding_id, db_error
            );
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    Ok(Json(ApiResponse {
        data: binding_response(binding, rows),
        message: "Binding retrieved successfully".to_string(),
        success: true,
    }))
}

/// Update a product-deal binding
#[utoipa::path(
    put,
    path = "/api/v1/product-deals/{binding_id}",
    tag = "product-deals",
    params(
        ("binding_id" = i32, Path, description = "Binding ID"),
    ),
    request_body = UpdateProductDealRequest,
    responses(
        (status = 200, description = "Binding updated successfully", body = ApiResponse<ProductDealResponse>),
        (status = 404, description = "Binding not found", body = ErrorResponse),
        (status = 409, description = "Another active deal claims the product", body = ErrorResponse),
        (status = 422, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_product_deal(
    Path(binding_id): Path<i32>,
    State(state): State<AppState>,
    Json(request): Json<UpdateProductDealRequest>,
) -> Result<Json<ApiResponse<ProductDealResponse>>, (StatusCode, Json<ErrorResponse>)> {
    trace!(
        "Entering update_product_deal function for binding_id: {}",
        binding_id
    );

    let (binding, rows) = lifecycle::update_product_deal(
        &state.db,
        binding_id,
        request.active,
        request.installments,
    )
    .await
    .map_err(engine_error_response)?;

    info!("Binding with ID {} updated successfully", binding.id);
    Ok(Json(ApiResponse {
        data: binding_response(binding, rows),
        message: "Binding updated successfully".to_string(),
        success: true,
    }))
}

/// Toggle a binding's active state
#[utoipa::path(
    post,
    path = "/api/v1/product-deals/{binding_id}/toggle",
    tag = "product-deals",
    params(
        ("binding_id" = i32, Path, description = "Binding ID"),
    ),
    request_body = ToggleRequest,
    responses(
        (status = 200, description = "Binding toggled successfully", body = ApiResponse<ProductDealResponse>),
        (status = 404, description = "Binding not found", body = ErrorResponse),
        (status = 409, description = "Another active deal claims the product", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn toggle_product_deal(
    Path(binding_id): Path<i32>,
    State(state): State<AppState>,
    Json(request): Json<ToggleRequest>,
) -> Result<Json<ApiResponse<ProductDealResponse>>, (StatusCode, Json<ErrorResponse>)> {
    trace!(
        "Entering toggle_product_deal function for binding_id: {}",
        binding_id
    );
    debug!("Toggling binding {} to active={}", binding_id, request.active);

    let (binding, rows) = lifecycle::toggle_product_deal(&state.db, binding_id, request.active)
        .await
        .map_err(engine_error_response)?;

    info!("Binding {} now has active={}", binding.id, binding.active);
    Ok(Json(ApiResponse {
        data: binding_response(binding, rows),
        message: "Binding toggled successfully".to_string(),
        success: true,
    }))
}

/// Delete a product-deal binding
#[utoipa::path(
    delete,
    path = "/api/v1/product-deals/{binding_id}",
    tag = "product-deals",
    params(
        ("binding_id" = i32, Path, description = "Binding ID"),
    ),
    responses(
        (status = 200, description = "Binding deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Binding not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn delete_product_deal(
    Path(binding_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<String>>, (StatusCode, Json<ErrorResponse>)> {
    trace!(
        "Entering delete_product_deal function for binding_id: {}",
        binding_id
    );

    lifecycle::delete_product_deal(&state.db, binding_id)
        .await
        .map_err(engine_error_response)?;

    info!("Binding with ID {} deleted successfully", binding_id);
    Ok(Json(ApiResponse {
        data: format!("Binding {} deleted", binding_id),
        message: "Binding deleted successfully".to_string(),
        success: true,
    }))
}
