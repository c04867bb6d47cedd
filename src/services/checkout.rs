//! Checkout: converts an account's whole cart into one order.
//!
//! Everything between reading the cart and writing the final total runs in a
//! single database transaction. Any failure rolls back every write made so
//! far: no partial orders, no orphaned order lines, no stock moved.

use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::db::transaction;
use crate::entities::{account, order_item};
use crate::errors::{Resource, ServiceError};
use crate::repositories::{
    AccountRepository, CartRepository, NewOrder, NewOrderItem, NewOrderVoucher,
    OrderItemRepository, OrderPatch, OrderRepository, OrderVoucherRepository, VoucherRepository,
};
use crate::services::inventory::{check_stock, InventoryLedger};
use crate::services::vouchers;

#[derive(Debug, Clone, Default)]
pub struct CheckoutRequest {
    pub account_email: String,
    pub voucher_code: Option<String>,
    /// Falls back to the account's stored address when omitted or blank
    pub address: Option<String>,
    /// Falls back to the account's stored phone number when omitted or blank
    pub phone_number: Option<String>,
}

/// Outcome of a committed checkout
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub order_id: i32,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub lines: Vec<order_item::Model>,
}

/// Payable amount: `subtotal - discount`, never below zero.
pub fn final_total(subtotal: Decimal, discount: Decimal) -> Decimal {
    (subtotal - discount).max(Decimal::ZERO)
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
}

impl CheckoutService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Places an order for everything in the account's cart.
    ///
    /// The account and the voucher code (if any) are resolved before the
    /// transaction opens so obvious mistakes fail fast. The voucher is
    /// resolved again inside the transaction and that lookup is the one that
    /// counts.
    ///
    /// # Errors
    ///
    /// * `NotFound(Account | Voucher | Item)`
    /// * `EmptyCart` when the account has no cart lines
    /// * `InsufficientStock` when any line exceeds the item's current stock
    /// * `DatabaseError` for any persistence failure
    #[instrument(skip(self, request), fields(account = %request.account_email))]
    pub async fn checkout(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutReceipt, ServiceError> {
        let db = &*self.db;

        let account = AccountRepository::new(db)
            .one_by_email(&request.account_email)
            .await?;

        let voucher_code = blank_to_none(request.voucher_code);
        if let Some(code) = &voucher_code {
            VoucherRepository::new(db).one_by_code(code).await?;
        }

        let address = blank_to_none(request.address).unwrap_or_else(|| account.address.clone());
        let phone_number =
            blank_to_none(request.phone_number).unwrap_or_else(|| account.phone_number.clone());

        let txn = db.begin().await?;
        let result = place_order(
            &txn,
            &account,
            voucher_code.as_deref(),
            address,
            phone_number,
        )
        .await;
        let outcome = transaction::finish(txn, result).await;

        match &outcome {
            Ok(receipt) => {
                counter!("shopcart_checkout.completed", 1);
                info!(
                    order_id = receipt.order_id,
                    subtotal = %receipt.subtotal,
                    discount = %receipt.discount,
                    total = %receipt.total,
                    "Checkout committed"
                );
            }
            Err(err) => {
                counter!("shopcart_checkout.failed", 1);
                if err.is_client_error() {
                    info!(error = %err, "Checkout rejected");
                } else {
                    warn!(error = %err, "Checkout failed");
                }
            }
        }

        outcome
    }
}

/// The transactional part of checkout. Uses only `txn`.
async fn place_order(
    txn: &DatabaseTransaction,
    account: &account::Model,
    voucher_code: Option<&str>,
    address: String,
    phone_number: String,
) -> Result<CheckoutReceipt, ServiceError> {
    let actor = account.email.as_str();

    let lines = CartRepository::new(txn).all_by_account(account.id).await?;
    if lines.is_empty() {
        return Err(ServiceError::EmptyCart);
    }

    let orders = OrderRepository::new(txn);
    let order = orders
        .create(
            NewOrder {
                account_id: account.id,
                address,
                phone_number,
            },
            actor,
        )
        .await?;
    debug!(order_id = order.id, "order CREATED");

    let ledger = InventoryLedger::new(txn);
    let locked = ledger
        .lock_items(lines.iter().map(|line| line.line.item_id))
        .await?;

    let carts = CartRepository::new(txn);
    let order_items = OrderItemRepository::new(txn);
    let mut subtotal = Decimal::ZERO;
    let mut snapshots = Vec::with_capacity(lines.len());

    for line in &lines {
        let item = locked
            .get(&line.line.item_id)
            .ok_or_else(|| ServiceError::not_found(Resource::Item, line.line.item_id))?;
        let qty = line.line.quantity;

        check_stock(item, qty)?;

        let new_line = NewOrderItem {
            order_id: order.id,
            item_id: item.id,
            name: item.name.clone(),
            description: item.description.clone(),
            price: item.price,
            quantity: qty,
        };
        subtotal += new_line.line_total();
        let snapshot = order_items.create(new_line, actor).await?;

        carts.delete(line.line.id).await?;
        ledger.commit(item, qty, actor).await?;
        snapshots.push(snapshot);
    }
    debug!(order_id = order.id, %subtotal, "order POPULATED");

    let discount = match voucher_code {
        Some(code) => {
            let applied = vouchers::apply(txn, code, subtotal).await?;
            OrderVoucherRepository::new(txn)
                .create(
                    NewOrderVoucher {
                        order_id: order.id,
                        voucher: applied.voucher,
                        subtotal,
                        applied: applied.applied,
                    },
                    actor,
                )
                .await?;
            applied.applied
        }
        None => Decimal::ZERO,
    };

    let total = final_total(subtotal, discount);
    let order = orders
        .update(
            order,
            OrderPatch {
                total: Some(total),
                ..Default::default()
            },
            actor,
        )
        .await?;
    debug!(order_id = order.id, %total, "order PRICED");

    Ok(CheckoutReceipt {
        order_id: order.id,
        subtotal,
        discount,
        total,
        lines: snapshots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::account::AccountType;
    use crate::repositories::{DeleteMode, ItemRepository, NewAccount, NewItem, NewVoucher};
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use sea_orm::{ConnectOptions, Database, EntityTrait, PaginatorTrait};

    #[test]
    fn total_subtracts_discount() {
        assert_eq!(final_total(dec!(200), dec!(15)), dec!(185));
    }

    #[test]
    fn total_is_floored_at_zero() {
        assert_eq!(final_total(dec!(10), dec!(25)), Decimal::ZERO);
    }

    #[test]
    fn blank_overrides_fall_back() {
        assert_eq!(blank_to_none(Some("   ".into())), None);
        assert_eq!(blank_to_none(None), None);
        assert_eq!(
            blank_to_none(Some(" 2 Side St ".into())).as_deref(),
            Some("2 Side St")
        );
    }

    async fn memory_db() -> DatabaseConnection {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(opts).await.unwrap();
        crate::db::run_migrations(&db).await.unwrap();
        db
    }

    #[tokio::test]
    async fn voucher_removed_after_fast_fail_rolls_back_written_lines() {
        let db = memory_db().await;
        let account = AccountRepository::new(&db)
            .create(NewAccount {
                email: "buyer@example.com".into(),
                password_hash: "-".into(),
                name: "Buyer".into(),
                address: "1 Main St".into(),
                phone_number: "555-0100".into(),
                account_type: AccountType::User,
            })
            .await
            .unwrap();
        let item = ItemRepository::new(&db)
            .create(
                NewItem {
                    name: "Kettle".into(),
                    description: String::new(),
                    price: dec!(100),
                    quantity: 10,
                },
                "seed",
            )
            .await
            .unwrap();
        let vouchers = VoucherRepository::new(&db);
        let voucher = vouchers
            .create(
                NewVoucher {
                    code: "SAVE10".into(),
                    name: "Save".into(),
                    description: String::new(),
                    percentage: dec!(10),
                    max: dec!(15),
                    is_active: true,
                },
                "seed",
            )
            .await
            .unwrap();
        CartRepository::new(&db)
            .create(account.id, item.id, 2, "seed")
            .await
            .unwrap();

        // Passes the fast-fail check, then disappears before the transaction.
        vouchers.one_by_code("SAVE10").await.unwrap();
        vouchers
            .delete(voucher.id, DeleteMode::Soft, "admin")
            .await
            .unwrap();

        let txn = db.begin().await.unwrap();
        let result = place_order(
            &txn,
            &account,
            Some("SAVE10"),
            account.address.clone(),
            account.phone_number.clone(),
        )
        .await;
        assert_matches!(result, Err(ServiceError::NotFound(Resource::Voucher, _)));

        // Lines and stock were already written inside the transaction.
        assert_eq!(order_item::Entity::find().count(&txn).await.unwrap(), 1);
        assert_eq!(
            ItemRepository::new(&txn).one_by_id(item.id).await.unwrap().quantity,
            8
        );

        let outcome = transaction::finish(txn, result).await;
        assert_matches!(outcome, Err(ServiceError::NotFound(Resource::Voucher, _)));

        assert_eq!(order_item::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(crate::entities::order::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(ItemRepository::new(&db).one_by_id(item.id).await.unwrap().quantity, 10);
        assert_eq!(CartRepository::new(&db).all_by_account(account.id).await.unwrap().len(), 1);
    }
}
