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
    created_response, success_response, validate_input, validate_non_negative,
    validate_percentage, Paginated, PaginationParams,
};
use crate::repositories::{NewVoucher, VoucherPatch};
use crate::AppState;

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateVoucherRequest {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(custom = "validate_percentage")]
    pub percentage: Decimal,
    /// Absolute cap on the discount
    #[validate(custom = "validate_non_negative")]
    pub max: Decimal,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateVoucherRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom = "validate_percentage")]
    pub percentage: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub max: Option<Decimal>,
    pub is_active: Option<bool>,
}

pub async fn list_vouchers(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, per_page) = params.resolve(&state.config);
    let (vouchers, total) = state.services.vouchers.list(page, per_page).await?;
    Ok(success_response(Paginated::new(vouchers, total, page, per_page)))
}

pub async fn get_voucher(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let voucher = state.services.vouchers.get(id).await?;
    Ok(success_response(voucher))
}

/// Create a voucher (admin)
#[utoipa::path(
    post,
    path = "/api/v1/vouchers",
    request_body = CreateVoucherRequest,
    responses(
        (status = 201, description = "Voucher created"),
        (status = 409, description = "Code already exists", body = crate::errors::ErrorResponse),
        (status = 422, description = "Invalid payload", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "vouchers"
)]
pub async fn create_voucher(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateVoucherRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let voucher = state
        .services
        .vouchers
        .create(
            NewVoucher {
                code: payload.code,
                name: payload.name,
                description: payload.description,
                percentage: payload.percentage,
                max: payload.max,
                is_active: payload.is_active,
            },
            &user.email,
        )
        .await?;
    Ok(created_response(voucher))
}

pub async fn update_voucher(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateVoucherRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let voucher = state
        .services
        .vouchers
        .update(
            id,
            VoucherPatch {
                name: payload.name,
                description: payload.description,
                percentage: payload.percentage,
                max: payload.max,
                is_active: payload.is_active,
            },
            &user.email,
        )
        .await?;
    Ok(success_response(voucher))
}

pub async fn delete_voucher(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.vouchers.delete(id, &user.email).await?;
    Ok(success_response(serde_json::Value::Null))
}
