//! Inventory ledger: per-item stock checks and deductions.
//!
//! `reserve` is the optimistic check used while a cart is being built. It
//! persists nothing. `commit` is the authoritative deduction performed inside
//! the checkout transaction on rows that are already locked.

use sea_orm::ConnectionTrait;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use crate::entities::item;
use crate::errors::ServiceError;
use crate::repositories::ItemRepository;

/// Stock left after taking `requested` from `available`, or `None` when that
/// would go negative.
pub fn remaining_after(available: i32, requested: i32) -> Option<i32> {
    available
        .checked_sub(requested)
        .filter(|remaining| *remaining >= 0)
}

/// Rejects `qty` if it exceeds the stock recorded on `item`.
pub fn check_stock(item: &item::Model, qty: i32) -> Result<i32, ServiceError> {
    remaining_after(item.quantity, qty).ok_or_else(|| {
        ServiceError::InsufficientStock(format!(
            "item {} ({}): requested {}, available {}",
            item.id, item.name, qty, item.quantity
        ))
    })
}

/// Stock checks and deductions over a pooled connection or a transaction
pub struct InventoryLedger<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> InventoryLedger<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Checks `qty` against current stock and returns what would remain.
    #[instrument(skip(self))]
    pub async fn reserve(&self, item_id: i32, qty: i32) -> Result<i32, ServiceError> {
        let item = ItemRepository::new(self.conn).one_by_id(item_id).await?;
        check_stock(&item, qty)
    }

    /// Same as [`reserve`](Self::reserve) but reads the item under an
    /// exclusive row lock; only meaningful inside a transaction.
    #[instrument(skip(self))]
    pub async fn reserve_locked(&self, item_id: i32, qty: i32) -> Result<i32, ServiceError> {
        let item = ItemRepository::new(self.conn)
            .one_by_id_for_update(item_id)
            .await?;
        check_stock(&item, qty)
    }

    /// Locks every item in ascending id order.
    ///
    /// Concurrent checkouts touching overlapping items acquire their locks in
    /// the same order and therefore cannot deadlock.
    pub async fn lock_items(
        &self,
        ids: impl IntoIterator<Item = i32>,
    ) -> Result<BTreeMap<i32, item::Model>, ServiceError> {
        let repo = ItemRepository::new(self.conn);
        let mut ordered: Vec<i32> = ids.into_iter().collect();
        ordered.sort_unstable();
        ordered.dedup();

        let mut locked = BTreeMap::new();
        for id in ordered {
            let item = repo.one_by_id_for_update(id).await?;
            locked.insert(id, item);
        }
        debug!(count = locked.len(), "items locked");
        Ok(locked)
    }

    /// Deducts `qty` from a locked `item` and persists the new stock.
    ///
    /// The write is a compare-and-set against the quantity read under the
    /// lock, so stock can never be driven negative by a concurrent writer.
    #[instrument(skip(self, item), fields(item_id = item.id))]
    pub async fn commit(
        &self,
        item: &item::Model,
        qty: i32,
        actor: &str,
    ) -> Result<i32, ServiceError> {
        let remaining = check_stock(item, qty)?;
        ItemRepository::new(self.conn)
            .update_quantity(item.id, item.quantity, remaining, actor)
            .await?;
        debug!(remaining, "stock committed");
        Ok(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_is_available_minus_requested() {
        assert_eq!(remaining_after(5, 2), Some(3));
        assert_eq!(remaining_after(2, 2), Some(0));
    }

    #[test]
    fn requesting_more_than_available_is_rejected() {
        assert_eq!(remaining_after(2, 3), None);
        assert_eq!(remaining_after(0, 1), None);
    }

    #[test]
    fn overflowing_subtraction_is_rejected() {
        assert_eq!(remaining_after(i32::MIN, 1), None);
    }
}
