use axum::{
    body::Bytes,
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    Extension,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::handlers::common::{
    created_response, success_response, validate_input, Paginated, PaginationParams,
};
use crate::services::checkout::CheckoutRequest;
use crate::AppState;

/// Checkout payload; every field is optional.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct CheckoutBody {
    #[validate(length(max = 64))]
    pub voucher_code: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 32))]
    pub phone_number: Option<String>,
}

/// An empty body means "no voucher, default address"; anything else must be
/// a well-formed [`CheckoutBody`].
fn parse_checkout_body(body: &[u8]) -> Result<CheckoutBody, ServiceError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CheckoutBody::default());
    }
    Json::<CheckoutBody>::from_bytes(body)
        .map(|Json(payload)| payload)
        .map_err(|rejection| {
            ServiceError::ValidationError(format!(
                "invalid checkout body: {}",
                rejection.body_text()
            ))
        })
}

/// Check out the caller's cart
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CheckoutBody,
    responses(
        (status = 201, description = "Order placed"),
        (status = 404, description = "Account or voucher not found", body = crate::errors::ErrorResponse),
        (status = 412, description = "Empty cart or not enough stock", body = crate::errors::ErrorResponse),
        (status = 422, description = "Malformed checkout body", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn checkout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Bytes,
) -> Result<impl IntoResponse, ServiceError> {
    let payload = parse_checkout_body(&body)?;
    validate_input(&payload)?;

    let receipt = state
        .services
        .checkout
        .checkout(CheckoutRequest {
            account_email: user.email,
            voucher_code: payload.voucher_code,
            address: payload.address,
            phone_number: payload.phone_number,
        })
        .await?;
    Ok(created_response(receipt))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = params.resolve(&state.config);
    let (orders, total) = state
        .services
        .orders
        .list(&user.email, page, per_page)
        .await?;
    Ok(success_response(Paginated::new(orders, total, page, per_page)))
}

pub async fn get_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.orders.get(&user.email, id).await?;
    Ok(success_response(order))
}
