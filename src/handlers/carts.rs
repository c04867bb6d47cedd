use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    Extension,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::handlers::common::{success_response, validate_input};
use crate::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddToCartRequest {
    pub item_id: i32,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

/// A quantity of zero or less removes the line.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartRequest {
    pub quantity: i32,
}

pub async fn list_cart(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ServiceError> {
    let lines = state.services.carts.list(&user.email).await?;
    Ok(success_response(lines))
}

pub async fn get_cart_line(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let line = state.services.carts.get(&user.email, id).await?;
    Ok(success_response(line))
}

/// Add an item to the caller's cart
#[utoipa::path(
    post,
    path = "/api/v1/carts",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Line created or merged"),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
        (status = 412, description = "Not enough stock", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "carts"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<AddToCartRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let line = state
        .services
        .carts
        .add(&user.email, payload.item_id, payload.quantity)
        .await?;
    Ok(success_response(line))
}

pub async fn update_cart_line(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCartRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let line = state
        .services
        .carts
        .edit(&user.email, id, payload.quantity)
        .await?;
    Ok(success_response(line))
}

pub async fn remove_cart_line(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.carts.remove(&user.email, id).await?;
    Ok(success_response(serde_json::Value::Null))
}
