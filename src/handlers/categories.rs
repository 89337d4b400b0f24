use axum::{extract::State, http::StatusCode, response::Json};
use model::entities::category;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, trace};
use utoipa::ToSchema;

use crate::schemas::{ApiResponse, AppState};

/// Request body for creating a category
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateCategoryRequest {
    /// Category name; the plan generator brackets are keyed on it
    pub name: String,
}

/// Category response model
#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: i32,
    pub name: String,
}

impl From<category::Model> for CategoryResponse {
    fn from(model: category::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

/// Create a new category
#[utoipa::path(
    post,
    path = "/api/v1/categories",
    tag = "categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created successfully", body = ApiResponse<CategoryResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn create_category(
    State(state): State<AppState>,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryResponse>>), StatusCode> {
    trace!("Entering create_category function");
    debug!("Creating category with name: {}", request.name);

    let new_category = category::ActiveModel {
        name: Set(request.name.clone()),
        ..Default::default()
    };

    match new_category.insert(&state.db).await {
        Ok(category_model) => {
            info!(
                "Category created successfully with ID: {}, name: {}",
                category_model.id, category_model.name
            );
            let response = ApiResponse {
                data: CategoryResponse::from(category_model),
                message: "Category created successfully".to_string(),
                success: true,
            };
            Ok((StatusCode::CREATED, Json(response)))
        }
        Err(db_error) => {
            error!("Failed to create category '{}': {}", request.name, db_error);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Get all categories
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    tag = "categories",
    responses(
        (status = 200, description = "Categories retrieved successfully", body = ApiResponse<Vec<CategoryResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn get_categories(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CategoryResponse>>>, StatusCode> {
    trace!("Entering get_categories function");

    match category::Entity::find().all(&state.db).await {
        Ok(categories) => {
            debug!("Retrieved {} categories from database", categories.len());
            let response = ApiResponse {
                data: categories.into_iter().map(CategoryResponse::from).collect(),
                message: "Categories retrieved successfully".to_string(),
                success: true,
            };
            Ok(Json(response))
        }
        Err(db_error) => {
            error!("Failed to retrieve categories from database: {}", db_error);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
