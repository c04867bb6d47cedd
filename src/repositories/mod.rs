//! Per-entity data access.
//!
//! Every repository borrows a connection generic over [`ConnectionTrait`], so
//! the same calls run against the pool or inside an open transaction.

use crate::errors::ServiceError;
use sea_orm::{DbErr, SqlErr};

pub mod account_repository;
pub mod cart_repository;
pub mod item_repository;
pub mod order_item_repository;
pub mod order_repository;
pub mod order_voucher_repository;
pub mod voucher_repository;

pub use account_repository::{AccountRepository, NewAccount};
pub use cart_repository::{CartLine, CartPatch, CartRepository};
pub use item_repository::{ItemPatch, ItemRepository, NewItem};
pub use order_item_repository::{NewOrderItem, OrderItemRepository};
pub use order_repository::{NewOrder, OrderPatch, OrderRepository};
pub use order_voucher_repository::{NewOrderVoucher, OrderVoucherRepository};
pub use voucher_repository::{normalize_code, NewVoucher, VoucherPatch, VoucherRepository};

/// How a delete call treats the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteMode {
    /// Stamp `deleted_at`/`deleted_by`; the row stays but is no longer found.
    #[default]
    Soft,
    /// Remove the row.
    Hard,
}

/// Turns a unique-constraint violation into `Conflict`, everything else into
/// a database error.
pub(crate) fn conflict_or_db(err: DbErr, what: impl FnOnce() -> String) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::Conflict(what()),
        _ => ServiceError::DatabaseError(err),
    }
}

/// Zero-based page index for sea-orm paginators.
pub(crate) fn page_index(page: u64) -> u64 {
    page.saturating_sub(1)
}
