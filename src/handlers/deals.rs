use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::NaiveDateTime;
use common::{DealInstallmentDto, InstallmentTemplate};
use engine::lifecycle::{self, DealDraft};
use model::entities::{deal, deal_installment};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::schemas::{engine_error_response, ApiResponse, AppState, ErrorResponse};

/// Request body for creating a deal
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateDealRequest {
    /// Deal name
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Start of the promotional window
    pub start_date: NaiveDateTime,
    /// End of the promotional window; must be after the start
    pub end_date: NaiveDateTime,
    /// The product the deal targets
    pub product_id: i32,
    /// Whether the deal goes live immediately (default: true)
    pub active: Option<bool>,
    /// Explicit installment templates; derived from the product's price and
    /// category when omitted
    pub installments: Option<Vec<InstallmentTemplate>>,
}

/// Request body for updating a deal; replaces the deal wholesale
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateDealRequest {
    /// Deal name
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Start of the promotional window
    pub start_date: NaiveDateTime,
    /// End of the promotional window; must be after the start
    pub end_date: NaiveDateTime,
    /// The product the deal targets
    pub product_id: i32,
    /// Desired active state after the update
    pub active: bool,
    /// Replacement installment templates; derived from the product when
    /// omitted
    pub installments: Option<Vec<InstallmentTemplate>>,
}

/// Request body for toggling a deal or binding
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ToggleRequest {
    /// Desired active state
    pub active: bool,
}

/// Deal response model, always carrying the owned template rows
#[derive(Debug, Serialize, ToSchema)]
pub struct DealResponse {
    pub id: i32,
    pub name: String,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub product_id: i32,
    pub active: bool,
    pub installments: Vec<DealInstallmentDto>,
}

pub(crate) fn to_installment_dto(row: deal_installment::Model) -> DealInstallmentDto {
    DealInstallmentDto {
        id: row.id,
        term_months: row.term_months,
        advance_amount: row.advance_amount,
        monthly_amount: row.monthly_amount,
        total_price: row.total_price,
    }
}

fn deal_response(deal_model: deal::Model, rows: Vec<deal_installment::Model>) -> DealResponse {
    DealResponse {
        id: deal_model.id,
        name: deal_model.name,
        start_date: deal_model.start_date,
        end_date: deal_model.end_date,
        product_id: deal_model.product_id,
        active: deal_model.active,
        installments: rows.into_iter().map(to_installment_dto).collect(),
    }
}

/// Create a new deal
#[utoipa::path(
    post,
    path = "/api/v1/deals",
    tag = "deals",
    request_body = CreateDealRequest,
    responses(
        (status = 201, description = "Deal created successfully", body = ApiResponse<DealResponse>),
        (status = 404, description = "Product not found", body = ErrorResponse),
        (status = 409, description = "Another active deal claims the product", body = ErrorResponse),
        (status = 422, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_deal(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateDealRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<DealResponse>>), (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering create_deal function");
    debug!(
        "Creating deal '{}' on product {}",
        request.name, request.product_id
    );

    let draft = DealDraft {
        name: request.name,
        start_date: request.start_date,
        end_date: request.end_date,
        product_id: request.product_id,
        active: request.active.unwrap_or(true),
        installments: request.installments,
    };

    let (deal_model, rows) = lifecycle::create_deal(&state.db, draft)
        .await
        .map_err(engine_error_response)?;

    info!(
        "Deal created successfully with ID: {}, active: {}",
        deal_model.id, deal_model.active
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: deal_response(deal_model, rows),
            message: "Deal created successfully".to_string(),
            success: true,
        }),
    ))
}

/// Get all deals
///
/// Expired deals are reconciled by the background sweeper, not by this
/// read.
#[utoipa::path(
    get,
    path = "/api/v1/deals",
    tag = "deals",
    responses(
        (status = 200, description = "Deals retrieved successfully", body = ApiResponse<Vec<DealResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn get_deals(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<DealResponse>>>, StatusCode> {
    trace!("Entering get_deals function");

    match deal::Entity::find()
        .find_with_related(deal_installment::Entity)
        .all(&state.db)
        .await
    {
        Ok(deals) => {
            debug!("Retrieved {} deals from database", deals.len());
            let response = ApiResponse {
                data: deals
                    .into_iter()
                    .map(|(deal_model, rows)| deal_response(deal_model, rows))
                    .collect(),
                message: "Deals retrieved successfully".to_string(),
                success: true,
            };
            Ok(Json(response))
        }
        Err(db_error) => {
            error!("Failed to retrieve deals from database: {}", db_error);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Get a specific deal by ID
#[utoipa::path(
    get,
    path = "/api/v1/deals/{deal_id}",
    tag = "deals",
    params(
        ("deal_id" = i32, Path, description = "Deal ID"),
    ),
    responses(
        (status = 200, description = "Deal retrieved successfully", body = ApiResponse<DealResponse>),
        (status = 404, description = "Deal not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn get_deal(
    Path(deal_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DealResponse>>, StatusCode> {
    trace!("Entering get_deal function for deal_id: {}", deal_id);

    let deal_model = match deal::Entity::find_by_id(deal_id).one(&state.db).await {
        Ok(Some(deal_model)) => deal_model,
        Ok(None) => {
            warn!("Deal with ID {} not found", deal_id);
            return Err(StatusCode::NOT_FOUND);
        }
        Err(db_error) => {
            error!("Failed to retrieve deal with ID {}: {}", deal_id, db_error);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let rows = match deal_installment::Entity::find()
        .filter(deal_installment::Column::DealId.eq(deal_id))
        .order_by_asc(deal_installment::Column::TermMonths)
        .all(&state.db)
        .await
    {
        Ok(rows) => rows,
        Err(db_error) => {
            error!(
                "Failed to retrieve installments for deal {}: {}",
                deal_id, db_error
            );
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    Ok(Json(ApiResponse {
        data: deal_response(deal_model, rows),
        message: "Deal retrieved successfully".to_string(),
        success: true,
    }))
}

/// Update a deal
///
/// An active deal is reverted first, then the new state is applied; the
/// template rows are replaced wholesale.
#[utoipa::path(
    put,
    path = "/api/v1/deals/{deal_id}",
    tag = "deals",
    params(
        ("deal_id" = i32, Path, description = "Deal ID"),
    ),
    request_body = UpdateDealRequest,
    responses(
        (status = 200, description = "Deal updated successfully", body = ApiResponse<DealResponse>),
        (status = 404, description = "Deal not found", body = ErrorResponse),
        (status = 409, description = "Another active deal claims the product", body = ErrorResponse),
        (status = 422, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_deal(
    Path(deal_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateDealRequest>>,
) -> Result<Json<ApiResponse<DealResponse>>, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering update_deal function for deal_id: {}", deal_id);

    let draft = DealDraft {
        name: request.name,
        start_date: request.start_date,
        end_date: request.end_date,
        product_id: request.product_id,
        active: request.active,
        installments: request.installments,
    };

    let (deal_model, rows) = lifecycle::update_deal(&state.db, deal_id, draft)
        .await
        .map_err(engine_error_response)?;

    info!("Deal with ID {} updated successfully", deal_model.id);
    Ok(Json(ApiResponse {
        data: deal_response(deal_model, rows),
        message: "Deal updated successfully".to_string(),
        success: true,
    }))
}

/// Toggle a deal's active state
///
/// Toggling to the current state is a no-op.
#[utoipa::path(
    post,
    path = "/api/v1/deals/{deal_id}/toggle",
    tag = "deals",
    params(
        ("deal_id" = i32, Path, description = "Deal ID"),
    ),
    request_body = ToggleRequest,
    responses(
        (status = 200, description = "Deal toggled successfully", body = ApiResponse<DealResponse>),
        (status = 404, description = "Deal not found", body = ErrorResponse),
        (status = 409, description = "Another active deal claims the product", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn toggle_deal(
    Path(deal_id): Path<i32>,
    State(state): State<AppState>,
    Json(request): Json<ToggleRequest>,
) -> Result<Json<ApiResponse<DealResponse>>, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering toggle_deal function for deal_id: {}", deal_id);
    debug!("Toggling deal {} to active={}", deal_id, request.active);

    let (deal_model, rows) = lifecycle::toggle_deal(&state.db, deal_id, request.active)
        .await
        .map_err(engine_error_response)?;

    info!("Deal {} now has active={}", deal_model.id, deal_model.active);
    Ok(Json(ApiResponse {
        data: deal_response(deal_model, rows),
        message: "Deal toggled successfully".to_string(),
        success: true,
    }))
}

/// Delete a deal
///
/// An active deal is reverted first so the product falls back to its
/// standard plans; template rows and bindings cascade away.
#[utoipa::path(
    delete,
    path = "/api/v1/deals/{deal_id}",
    tag = "deals",
    params(
        ("deal_id" = i32, Path, description = "Deal ID"),
    ),
    responses(
        (status = 200, description = "Deal deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Deal not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn delete_deal(
    Path(deal_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<String>>, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering delete_deal function for deal_id: {}", deal_id);

    lifecycle::delete_deal(&state.db, deal_id)
        .await
        .map_err(engine_error_response)?;

    info!("Deal with ID {} deleted successfully", deal_id);
    Ok(Json(ApiResponse {
        data: format!("Deal {} deleted", deal_id),
        message: "Deal deleted successfully".to_string(),
        success: true,
    }))
}
