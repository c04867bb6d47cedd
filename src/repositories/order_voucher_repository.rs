use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::entities::order_voucher::{self, Entity as OrderVoucher};
use crate::entities::voucher;
use crate::errors::ServiceError;

/// Voucher snapshot plus the pricing it produced
#[derive(Debug, Clone)]
pub struct NewOrderVoucher {
    pub order_id: i32,
    pub voucher: voucher::Model,
    pub subtotal: Decimal,
    pub applied: Decimal,
}

/// Repository for applied vouchers
pub struct OrderVoucherRepository<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> OrderVoucherRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        new: NewOrderVoucher,
        actor: &str,
    ) -> Result<order_voucher::Model, ServiceError> {
        let now = Utc::now();
        let model = order_voucher::ActiveModel {
            order_id: Set(new.order_id),
            voucher_id: Set(new.voucher.id),
            code: Set(new.voucher.code),
            name: Set(new.voucher.name),
            description: Set(new.voucher.description),
            percentage: Set(new.voucher.percentage),
            max: Set(new.voucher.max),
            total: Set(new.subtotal),
            applied: Set(new.applied),
            created_at: Set(now),
            updated_at: Set(now),
            created_by: Set(actor.to_string()),
            updated_by: Set(actor.to_string()),
            ..Default::default()
        };
        Ok(model.insert(self.conn).await?)
    }

    pub async fn find_by_order(
        &self,
        order_id: i32,
    ) -> Result<Option<order_voucher::Model>, ServiceError> {
        Ok(OrderVoucher::find()
            .filter(order_voucher::Column::OrderId.eq(order_id))
            .one(self.conn)
            .await?)
    }
}
