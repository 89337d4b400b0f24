use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use common::InstallmentPlanDto;
use engine::{generator, store, EngineError};
use model::entities::{category, installment_plan, product};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, trace, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::schemas::{engine_error_response, ApiResponse, AppState, ErrorResponse};

/// Request body for creating a product
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateProductRequest {
    /// Product name
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Category the product belongs to
    pub category_id: i32,
    /// Listed cash price
    pub price: Decimal,
}

/// Request body for updating a product
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateProductRequest {
    /// Product name
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    /// Category the product belongs to
    pub category_id: Option<i32>,
    /// Listed cash price
    pub price: Option<Decimal>,
}

/// Product response model
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: i32,
    pub name: String,
    pub category_id: i32,
    pub price: Decimal,
    pub has_active_deal: bool,
}

impl From<product::Model> for ProductResponse {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            category_id: model.category_id,
            price: model.price,
            has_active_deal: model.has_active_deal,
        }
    }
}

/// Query parameters for listing a product's installment plans
#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct PlanListQuery {
    /// Restrict to plans with this active state
    pub active: Option<bool>,
}

fn to_plan_dto(model: installment_plan::Model) -> InstallmentPlanDto {
    InstallmentPlanDto {
        id: model.id,
        product_id: model.product_id,
        term_months: model.term_months,
        advance_amount: model.advance_amount,
        monthly_amount: model.monthly_amount,
        total_price: model.total_price,
        active: model.active,
        deal_id: model.deal_id,
        product_deal_id: model.product_deal_id,
    }
}

/// Create a new product
///
/// Standard installment plans are generated from the category and price
/// when a bracket matches; otherwise the product is listed cash-only.
#[utoipa::path(
    post,
    path = "/api/v1/products",
    tag = "products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created successfully", body = ApiResponse<ProductResponse>),
        (status = 404, description = "Category not found", body = ErrorResponse),
        (status = 422, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_product(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateProductRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<ProductResponse>>), (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering create_product function");
    debug!(
        "Creating product '{}' in category {} at price {}",
        request.name, request.category_id, request.price
    );

    if request.price < Decimal::ZERO {
        return Err(engine_error_response(EngineError::Validation(format!(
            "price must be non-negative, got {}",
            request.price
        ))));
    }

    let category_model = category::Entity::find_by_id(request.category_id)
        .one(&state.db)
        .await
        .map_err(|e| engine_error_response(EngineError::Database(e)))?
        .ok_or_else(|| {
            warn!("Category {} not found for new product", request.category_id);
            engine_error_response(EngineError::NotFound(format!(
                "Category {}",
                request.category_id
            )))
        })?;

    let product_model = state
        .db
        .transaction::<_, product::Model, EngineError>(move |txn| {
            Box::pin(async move {
                let product_model = product::ActiveModel {
                    name: Set(request.name),
                    category_id: Set(category_model.id),
                    price: Set(request.price),
                    has_active_deal: Set(false),
                    ..Default::default()
                }
                .insert(txn)
                .await?;

                match generator::generate(&category_model.name, product_model.price) {
                    Ok(templates) => {
                        store::set_standard_plans(txn, product_model.id, &templates).await?;
                    }
                    Err(EngineError::NoPlanAvailable { .. }) => {
                        info!(
                            "No installment bracket for product {}, listing it cash-only",
                            product_model.id
                        );
                    }
                    Err(err) => return Err(err),
                }

                Ok(product_model)
            })
        })
        .await
        .map_err(EngineError::from)
        .map_err(engine_error_response)?;

    info!(
        "Product created successfully with ID: {}, name: {}",
        product_model.id, product_model.name
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: ProductResponse::from(product_model),
            message: "Product created successfully".to_string(),
            success: true,
        }),
    ))
}

/// Get all products
#[utoipa::path(
    get,
    path = "/api/v1/products",
    tag = "products",
    responses(
        (status = 200, description = "Products retrieved successfully", body = ApiResponse<Vec<ProductResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn get_products(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ProductResponse>>>, StatusCode> {
    trace!("Entering get_products function");

    match product::Entity::find().all(&state.db).await {
        Ok(products) => {
            debug!("Retrieved {} products from database", products.len());
            let response = ApiResponse {
                data: products.into_iter().map(ProductResponse::from).collect(),
                message: "Products retrieved successfully".to_string(),
                success: true,
            };
            Ok(Json(response))
        }
        Err(db_error) => {
            error!("Failed to retrieve products from database: {}", db_error);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Get a specific product by ID
#[utoipa::path(
    get,
    path = "/api/v1/products/{product_id}",
    tag = "products",
    params(
        ("product_id" = i32, Path, description = "Product ID"),
    ),
    responses(
        (status = 200, description = "Product retrieved successfully", body = ApiResponse<ProductResponse>),
        (status = 404, description = "Product not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn get_product(
    Path(product_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ProductResponse>>, StatusCode> {
    trace!("Entering get_product function for product_id: {}", product_id);

    match product::Entity::find_by_id(product_id).one(&state.db).await {
        Ok(Some(product_model)) => {
            let response = ApiResponse {
                data: ProductResponse::from(product_model),
                message: "Product retrieved successfully".to_string(),
                success: true,
            };
            Ok(Json(response))
        }
        Ok(None) => {
            warn!("Product with ID {} not found", product_id);
            Err(StatusCode::NOT_FOUND)
        }
        Err(db_error) => {
            error!("Failed to retrieve product with ID {}: {}", product_id, db_error);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Update a product
///
/// A price or category change regenerates the standard plan set; the new
/// rows stay inactive while a deal is running on the product.
#[utoipa::path(
    put,
    path = "/api/v1/products/{product_id}",
    tag = "products",
    params(
        ("product_id" = i32, Path, description = "Product ID"),
    ),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated successfully", body = ApiResponse<ProductResponse>),
        (status = 404, description = "Product not found", body = ErrorResponse),
        (status = 422, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_product(
    Path(product_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateProductRequest>>,
) -> Result<Json<ApiResponse<ProductResponse>>, (StatusCode, Json<ErrorResponse>)> {
    trace!("Entering update_product function for product_id: {}", product_id);

    if request.price.is_some_and(|price| price < Decimal::ZERO) {
        return Err(engine_error_response(EngineError::Validation(
            "price must be non-negative".to_string(),
        )));
    }

    let existing = product::Entity::find_by_id(product_id)
        .one(&state.db)
        .await
        .map_err(|e| engine_error_response(EngineError::Database(e)))?
        .ok_or_else(|| {
            warn!("Product with ID {} not found for update", product_id);
            engine_error_response(EngineError::NotFound(format!("Product {product_id}")))
        })?;

    let plans_stale = request.price.is_some_and(|price| price != existing.price)
        || request
            .category_id
            .is_some_and(|category_id| category_id != existing.category_id);

    let updated = state
        .db
        .transaction::<_, product::Model, EngineError>(move |txn| {
            Box::pin(async move {
                let mut product_active: product::ActiveModel = existing.into();
                if let Some(name) = request.name {
                    product_active.name = Set(name);
                }
                if let Some(category_id) = request.category_id {
                    product_active.category_id = Set(category_id);
                }
                if let Some(price) = request.price {
                    product_active.price = Set(price);
                }
                let product_model = product_active.update(txn).await?;

                if plans_stale {
                    let category_model = category::Entity::find_by_id(product_model.category_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            EngineError::NotFound(format!(
                                "Category {}",
                                product_model.category_id
                            ))
                        })?;

                    match generator::generate(&category_model.name, product_model.price) {
                        Ok(templates) => {
                            store::set_standard_plans(txn, product_model.id, &templates).await?;
                        }
                        Err(EngineError::NoPlanAvailable { .. }) => {
                            // The new price falls outside every bracket; the
                            // product becomes cash-only.
                            store::set_standard_plans(txn, product_model.id, &[]).await?;
                            info!("Product {} is now cash-only", product_model.id);
                        }
                        Err(err) => return Err(err),
                    }
                }

                Ok(product_model)
            })
        })
        .await
        .map_err(EngineError::from)
        .map_err(engine_error_response)?;

    info!("Product with ID {} updated successfully", updated.id);
    Ok(Json(ApiResponse {
        data: ProductResponse::from(updated),
        message: "Product updated successfully".to_string(),
        success: true,
    }))
}

/// Delete a product
#[utoipa::path(
    delete,
    path = "/api/v1/products/{product_id}",
    tag = "products",
    params(
        ("product_id" = i32, Path, description = "Product ID"),
    ),
    responses(
        (status = 200, description = "Product deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Product not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn delete_product(
    Path(product_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<String>>, StatusCode> {
    trace!("Entering delete_product function for product_id: {}", product_id);

    match product::Entity::delete_by_id(product_id).exec(&state.db).await {
        Ok(delete_result) => {
            if delete_result.rows_affected > 0 {
                info!("Product with ID {} deleted successfully", product_id);
                let response = ApiResponse {
                    data: format!("Product {} deleted", product_id),
                    message: "Product deleted successfully".to_string(),
                    success: true,
                };
                Ok(Json(response))
            } else {
                warn!("Product with ID {} not found for deletion", product_id);
                Err(StatusCode::NOT_FOUND)
            }
        }
        Err(db_error) => {
            error!("Failed to delete product with ID {}: {}", product_id, db_error);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// List a product's installment plans
///
/// This is the observable surface of the plan store: standard rows carry no
/// deal reference, deal-sourced rows name the deal or binding that produced
/// them.
#[utoipa::path(
    get,
    path = "/api/v1/products/{product_id}/installment-plans",
    tag = "products",
    params(
        ("product_id" = i32, Path, description = "Product ID"),
        PlanListQuery,
    ),
    responses(
        (status = 200, description = "Installment plans retrieved successfully", body = ApiResponse<Vec<InstallmentPlanDto>>),
        (status = 404, description = "Product not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn get_product_plans(
    Path(product_id): Path<i32>,
    Query(query): Query<PlanListQuery>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<InstallmentPlanDto>>>, StatusCode> {
    trace!(
        "Entering get_product_plans function for product_id: {}",
        product_id
    );

    match product::Entity::find_by_id(product_id).one(&state.db).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            warn!("Product with ID {} not found", product_id);
            return Err(StatusCode::NOT_FOUND);
        }
        Err(db_error) => {
            error!("Failed to look up product {}: {}", product_id, db_error);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    let mut plan_query = installment_plan::Entity::find()
        .filter(installment_plan::Column::ProductId.eq(product_id));
    if let Some(active) = query.active {
        plan_query = plan_query.filter(installment_plan::Column::Active.eq(active));
    }

    match plan_query
        .order_by_asc(installment_plan::Column::TermMonths)
        .all(&state.db)
        .await
    {
        Ok(plans) => {
            debug!("Retrieved {} plans for product {}", plans.len(), product_id);
            let response = ApiResponse {
                data: plans.into_iter().map(to_plan_dto).collect(),
                message: "Installment plans retrieved successfully".to_string(),
                success: true,
            };
            Ok(Json(response))
        }
        Err(db_error) => {
            error!(
                "Failed to retrieve plans for product {}: {}",
                product_id, db_error
            );
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
