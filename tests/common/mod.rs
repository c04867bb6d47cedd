#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    middleware,
    response::Response,
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use shopcart_api::{
    config::AppConfig,
    db,
    entities::{account, account::AccountType, cart, item, voucher},
    middleware_helpers::request_id_middleware,
    repositories::{
        AccountRepository, CartRepository, ItemRepository, NewAccount, NewItem, NewVoucher,
        VoucherRepository,
    },
    AppState,
};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";
pub const SEED_ACTOR: &str = "seed";

/// Application state over a private in-memory SQLite database.
///
/// The pool holds exactly one connection: every in-memory connection is its
/// own database, and a single connection also serializes transactions.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_SECRET.to_string(),
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = shopcart_api::app_router(state.clone())
            .layer(middleware::from_fn(request_id_middleware));

        Self { router, state }
    }

    /// Inserts an account directly; its password hash is not usable for login.
    pub async fn seed_account(&self, email: &str, account_type: AccountType) -> account::Model {
        AccountRepository::new(&*self.state.db)
            .create(NewAccount {
                email: email.to_string(),
                password_hash: "not-a-login-hash".to_string(),
                name: "Test Buyer".to_string(),
                address: "1 Main St".to_string(),
                phone_number: "555-0100".to_string(),
                account_type,
            })
            .await
            .expect("seed account")
    }

    pub async fn seed_user(&self, email: &str) -> account::Model {
        self.seed_account(email, AccountType::User).await
    }

    pub async fn seed_item(&self, name: &str, price: Decimal, quantity: i32) -> item::Model {
        ItemRepository::new(&*self.state.db)
            .create(
                NewItem {
                    name: name.to_string(),
                    description: format!("{name} for tests"),
                    price,
                    quantity,
                },
                SEED_ACTOR,
            )
            .await
            .expect("seed item")
    }

    pub async fn seed_voucher(
        &self,
        code: &str,
        percentage: Decimal,
        max: Decimal,
    ) -> voucher::Model {
        VoucherRepository::new(&*self.state.db)
            .create(
                NewVoucher {
                    code: code.to_string(),
                    name: format!("{code} voucher"),
                    description: String::new(),
                    percentage,
                    max,
                    is_active: true,
                },
                SEED_ACTOR,
            )
            .await
            .expect("seed voucher")
    }

    /// Inserts a cart line without any stock check.
    pub async fn seed_cart_line(
        &self,
        account_id: i32,
        item_id: i32,
        quantity: i32,
    ) -> cart::Model {
        CartRepository::new(&*self.state.db)
            .create(account_id, item_id, quantity, SEED_ACTOR)
            .await
            .expect("seed cart line")
    }

    pub async fn item_quantity(&self, item_id: i32) -> i32 {
        ItemRepository::new(&*self.state.db)
            .one_by_id(item_id)
            .await
            .expect("item exists")
            .quantity
    }

    pub async fn cart_len(&self, account_id: i32) -> usize {
        CartRepository::new(&*self.state.db)
            .all_by_account(account_id)
            .await
            .expect("cart lines")
            .len()
    }

    pub fn token_for(&self, account: &account::Model) -> String {
        self.state
            .auth
            .generate_token(account)
            .expect("token")
            .access_token
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        self.request_with_headers(method, uri, body, token, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Sends `body` verbatim as `application/json`.
    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        body: &str,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let request = builder
            .body(Body::from(body.to_string()))
            .expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Decimals serialize as strings; compare them numerically.
pub fn decimal_of(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("not a decimal: {other}"),
    }
}
