use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use super::page_index;
use crate::entities::order::{self, Entity as Order, STATUS_ORDERED};
use crate::errors::{Resource, ServiceError};

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub account_id: i32,
    pub address: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub total: Option<Decimal>,
    pub status: Option<String>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
}

/// Repository for orders
pub struct OrderRepository<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> OrderRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Inserts an order shell; the total is written once pricing is known.
    pub async fn create(&self, new: NewOrder, actor: &str) -> Result<order::Model, ServiceError> {
        let now = Utc::now();
        let model = order::ActiveModel {
            account_id: Set(new.account_id),
            address: Set(new.address),
            phone_number: Set(new.phone_number),
            total: Set(Decimal::ZERO),
            status: Set(STATUS_ORDERED.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            created_by: Set(actor.to_string()),
            updated_by: Set(actor.to_string()),
            ..Default::default()
        };
        Ok(model.insert(self.conn).await?)
    }

    pub async fn update(
        &self,
        existing: order::Model,
        patch: OrderPatch,
        actor: &str,
    ) -> Result<order::Model, ServiceError> {
        let mut active: order::ActiveModel = existing.into();
        if let Some(total) = patch.total {
            active.total = Set(total);
        }
        if let Some(status) = patch.status {
            active.status = Set(status);
        }
        if let Some(address) = patch.address {
            active.address = Set(address);
        }
        if let Some(phone_number) = patch.phone_number {
            active.phone_number = Set(phone_number);
        }
        active.updated_at = Set(Utc::now());
        active.updated_by = Set(actor.to_string());
        Ok(active.update(self.conn).await?)
    }

    pub async fn one_for_account(
        &self,
        account_id: i32,
        id: i32,
    ) -> Result<order::Model, ServiceError> {
        Order::find_by_id(id)
            .filter(order::Column::AccountId.eq(account_id))
            .one(self.conn)
            .await?
            .ok_or_else(|| ServiceError::not_found(Resource::Order, id))
    }

    /// Orders of an account, newest first
    pub async fn list_by_account(
        &self,
        account_id: i32,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<order::Model>, u64), ServiceError> {
        let paginator = Order::find()
            .filter(order::Column::AccountId.eq(account_id))
            .order_by_desc(order::Column::Id)
            .paginate(self.conn, per_page);

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page_index(page)).await?;
        Ok((orders, total))
    }
}
