use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    Extension,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::handlers::common::{
    created_response, success_response, validate_input, validate_non_negative, Paginated,
    PaginationParams,
};
use crate::repositories::{ItemPatch, NewItem};
use crate::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(custom = "validate_non_negative")]
    pub price: Decimal,
    #[validate(range(min = 0))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateItemRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom = "validate_non_negative")]
    pub price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub quantity: Option<i32>,
}

pub async fn list_items(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = params.resolve(&state.config);
    let (items, total) = state.services.items.list(page, per_page).await?;
    Ok(success_response(Paginated::new(items, total, page, per_page)))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state.services.items.get(id).await?;
    Ok(success_response(item))
}

/// Create an item (admin)
#[utoipa::path(
    post,
    path = "/api/v1/items",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created"),
        (status = 403, description = "Not an admin"),
        (status = 422, description = "Invalid payload", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let item = state
        .services
        .items
        .create(
            NewItem {
                name: payload.name,
                description: payload.description,
                price: payload.price,
                quantity: payload.quantity,
            },
            &user.email,
        )
        .await?;
    Ok(created_response(item))
}

pub async fn update_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let item = state
        .services
        .items
        .update(
            id,
            ItemPatch {
                name: payload.name,
                description: payload.description,
                price: payload.price,
                quantity: payload.quantity,
            },
            &user.email,
        )
        .await?;
    Ok(success_response(item))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.items.delete(id, &user.email).await?;
    Ok(success_response(serde_json::Value::Null))
}
