pub mod accounts;
pub mod carts;
pub mod common;
pub mod items;
pub mod orders;
pub mod vouchers;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::services::{
    accounts::AccountService, carts::CartService, checkout::CheckoutService, items::ItemService,
    orders::OrderService, vouchers::VoucherService,
};

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub accounts: Arc<AccountService>,
    pub items: Arc<ItemService>,
    pub carts: Arc<CartService>,
    pub vouchers: Arc<VoucherService>,
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
}

impl AppServices {
    pub fn new(db: Arc<DatabaseConnection>, auth: Arc<AuthService>) -> Self {
        Self {
            accounts: Arc::new(AccountService::new(db.clone(), auth)),
            items: Arc::new(ItemService::new(db.clone())),
            carts: Arc::new(CartService::new(db.clone())),
            vouchers: Arc::new(VoucherService::new(db.clone())),
            checkout: Arc::new(CheckoutService::new(db.clone())),
            orders: Arc::new(OrderService::new(db)),
        }
    }
}
