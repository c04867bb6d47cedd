use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;

use crate::entities::{order, order_item, order_voucher};
use crate::errors::ServiceError;
use crate::repositories::{
    AccountRepository, OrderItemRepository, OrderRepository, OrderVoucherRepository,
};

/// An order with its lines and applied voucher, if any
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: order::Model,
    pub lines: Vec<order_item::Model>,
    pub voucher: Option<order_voucher::Model>,
}

/// Read access to an account's order history
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        email: &str,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<order::Model>, u64), ServiceError> {
        let db = &*self.db;
        let account = AccountRepository::new(db).one_by_email(email).await?;
        OrderRepository::new(db)
            .list_by_account(account.id, page, per_page)
            .await
    }

    /// Orders of other accounts are reported as not found.
    pub async fn get(&self, email: &str, order_id: i32) -> Result<OrderDetails, ServiceError> {
        let db = &*self.db;
        let account = AccountRepository::new(db).one_by_email(email).await?;
        let order = OrderRepository::new(db)
            .one_for_account(account.id, order_id)
            .await?;
        let lines = OrderItemRepository::new(db).all_by_order(order.id).await?;
        let voucher = OrderVoucherRepository::new(db).find_by_order(order.id).await?;
        Ok(OrderDetails {
            order,
            lines,
            voucher,
        })
    }
}
