use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::order_item::{self, Entity as OrderItem};
use crate::errors::ServiceError;

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub order_id: i32,
    pub item_id: i32,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub quantity: i32,
}

impl NewOrderItem {
    /// price × quantity
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Repository for order lines
pub struct OrderItemRepository<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> OrderItemRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        new: NewOrderItem,
        actor: &str,
    ) -> Result<order_item::Model, ServiceError> {
        let now = Utc::now();
        let total = new.line_total();
        let model = order_item::ActiveModel {
            order_id: Set(new.order_id),
            item_id: Set(new.item_id),
            name: Set(new.name),
            description: Set(new.description),
            price: Set(new.price),
            quantity: Set(new.quantity),
            total: Set(total),
            created_at: Set(now),
            updated_at: Set(now),
            created_by: Set(actor.to_string()),
            updated_by: Set(actor.to_string()),
            ..Default::default()
        };
        Ok(model.insert(self.conn).await?)
    }

    pub async fn all_by_order(
        &self,
        order_id: i32,
    ) -> Result<Vec<order_item::Model>, ServiceError> {
        Ok(OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::Id)
            .all(self.conn)
            .await?)
    }
}
