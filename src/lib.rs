//! Shopcart API Library
//!
//! Accounts, items, carts, vouchers and transactional order checkout over HTTP.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod repositories;
pub mod services;
pub mod tracing;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::auth::AuthService;

pub const SUCCESS_MESSAGE: &str = "Success!";

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub auth: Arc<AuthService>,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let auth = Arc::new(AuthService::new(auth::AuthConfig::from(&config)));
        let services = handlers::AppServices::new(db.clone(), auth.clone());
        Self {
            db,
            config,
            auth,
            services,
        }
    }
}

/// Success envelope: `{"message": "Success!", "data": ...}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            message: SUCCESS_MESSAGE.to_string(),
            data,
        }
    }
}

/// All `/api/v1` routes.
///
/// Public: health, register, login. Everything else requires a bearer token;
/// item and voucher mutations additionally require an admin account.
pub fn api_v1_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/health", get(health_check))
        .route("/register", post(handlers::accounts::register))
        .route("/login", post(handlers::accounts::login));

    let authenticated = Router::new()
        .route("/me", get(handlers::accounts::me))
        .route("/items", get(handlers::items::list_items))
        .route("/items/:id", get(handlers::items::get_item))
        .route(
            "/carts",
            get(handlers::carts::list_cart).post(handlers::carts::add_to_cart),
        )
        .route(
            "/carts/:id",
            get(handlers::carts::get_cart_line)
                .put(handlers::carts::update_cart_line)
                .delete(handlers::carts::remove_cart_line),
        )
        .route("/vouchers", get(handlers::vouchers::list_vouchers))
        .route("/vouchers/:id", get(handlers::vouchers::get_voucher))
        .route(
            "/orders",
            get(handlers::orders::list_orders).post(handlers::orders::checkout),
        )
        .route("/orders/:id", get(handlers::orders::get_order));

    let admin = Router::new()
        .route("/items", post(handlers::items::create_item))
        .route(
            "/items/:id",
            axum::routing::put(handlers::items::update_item).delete(handlers::items::delete_item),
        )
        .route("/vouchers", post(handlers::vouchers::create_voucher))
        .route(
            "/vouchers/:id",
            axum::routing::put(handlers::vouchers::update_voucher)
                .delete(handlers::vouchers::delete_voucher),
        )
        .route_layer(middleware::from_fn(auth::require_admin));

    let protected = authenticated.merge(admin).route_layer(
        middleware::from_fn_with_state(state.auth.clone(), auth::auth_middleware),
    );

    public.merge(protected)
}

/// Full application router with state applied; layers are added by the caller.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_v1_routes(state.clone()))
        .merge(openapi::swagger_ui())
        .fallback(not_found)
        .with_state(state)
}

async fn not_found() -> Response {
    let body = errors::ErrorResponse {
        error: "Not Found".to_string(),
        message: "route not found".to_string(),
        request_id: crate::tracing::current_request_id().map(|rid| rid.0),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}

async fn health_check(State(state): State<AppState>) -> Response {
    let db_status = match db::check_connection(&state.db).await {
        Ok(()) => "healthy",
        Err(_) => "unhealthy",
    };

    let status = if db_status == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = ApiResponse::success(json!({
        "status": db_status,
        "checks": { "database": db_status },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }));

    (status, Json(body)).into_response()
}
