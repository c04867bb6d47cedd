use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::db::transaction;
use crate::entities::{account, cart};
use crate::errors::ServiceError;
use crate::repositories::{AccountRepository, CartLine, CartPatch, CartRepository, ItemRepository};
use crate::services::inventory::InventoryLedger;

/// Shopping cart service: the lines an account intends to check out.
///
/// Stock is checked whenever a line is added or edited, but nothing is held
/// back. Checkout performs the authoritative check.
///
/// # Examples
///
/// ```ignore
/// let carts = CartService::new(db);
/// let line = carts.add("buyer@example.com", item_id, 2).await?;
/// carts.edit("buyer@example.com", line.id, 3).await?;
/// ```
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn account(&self, email: &str) -> Result<account::Model, ServiceError> {
        AccountRepository::new(&*self.db).one_by_email(email).await
    }

    /// Adds an item to the cart or increases the quantity of its existing line.
    ///
    /// # Errors
    ///
    /// * `ValidationError` if `qty` is not positive
    /// * `NotFound(Item)` if the item does not exist
    /// * `InsufficientStock` if the resulting line quantity exceeds stock
    #[instrument(skip(self))]
    pub async fn add(
        &self,
        email: &str,
        item_id: i32,
        qty: i32,
    ) -> Result<cart::Model, ServiceError> {
        if qty <= 0 {
            return Err(ServiceError::ValidationError(
                "quantity must be greater than zero".to_string(),
            ));
        }

        let db = &*self.db;
        let account = self.account(email).await?;
        ItemRepository::new(db).one_by_id(item_id).await?;

        let carts = CartRepository::new(db);
        let existing = carts.find_by_account_item(account.id, item_id).await?;
        let wanted = match &existing {
            Some(line) => line.quantity.checked_add(qty).ok_or_else(|| {
                ServiceError::ValidationError("quantity is too large".to_string())
            })?,
            None => qty,
        };

        InventoryLedger::new(db).reserve(item_id, wanted).await?;

        let line = match existing {
            Some(line) => {
                carts
                    .update(
                        line,
                        CartPatch {
                            quantity: Some(wanted),
                        },
                        email,
                    )
                    .await?
            }
            None => carts.create(account.id, item_id, wanted, email).await?,
        };

        info!(cart_id = line.id, item_id, quantity = line.quantity, "Added item to cart");
        Ok(line)
    }

    /// Sets a line's quantity; zero or less removes the line.
    ///
    /// The item is re-read under a row lock inside a transaction, so the stock
    /// check is authoritative at edit time too. Returns `None` when the line
    /// was removed.
    #[instrument(skip(self))]
    pub async fn edit(
        &self,
        email: &str,
        cart_id: i32,
        qty: i32,
    ) -> Result<Option<cart::Model>, ServiceError> {
        let account = self.account(email).await?;

        let txn = self.db.begin().await?;
        let result = edit_line(&txn, account.id, cart_id, qty, email).await;
        let edited = transaction::finish(txn, result).await?;

        match &edited {
            Some(line) => info!(cart_id, quantity = line.quantity, "Updated cart line"),
            None => info!(cart_id, "Removed cart line"),
        }
        Ok(edited)
    }

    /// Removes a line from the account's cart.
    #[instrument(skip(self))]
    pub async fn remove(&self, email: &str, cart_id: i32) -> Result<(), ServiceError> {
        let account = self.account(email).await?;
        let carts = CartRepository::new(&*self.db);
        let line = carts.one_for_account(account.id, cart_id).await?;
        carts.delete(line.id).await?;
        info!(cart_id, "Removed cart line");
        Ok(())
    }

    /// All lines with their items, oldest first.
    pub async fn list(&self, email: &str) -> Result<Vec<CartLine>, ServiceError> {
        let account = self.account(email).await?;
        CartRepository::new(&*self.db).all_by_account(account.id).await
    }

    pub async fn get(&self, email: &str, cart_id: i32) -> Result<CartLine, ServiceError> {
        let account = self.account(email).await?;
        CartRepository::new(&*self.db)
            .line_for_account(account.id, cart_id)
            .await
    }
}

async fn edit_line(
    txn: &DatabaseTransaction,
    account_id: i32,
    cart_id: i32,
    qty: i32,
    actor: &str,
) -> Result<Option<cart::Model>, ServiceError> {
    let carts = CartRepository::new(txn);
    let line = carts.one_for_account(account_id, cart_id).await?;

    if qty <= 0 {
        carts.delete(line.id).await?;
        return Ok(None);
    }

    InventoryLedger::new(txn)
        .reserve_locked(line.item_id, qty)
        .await?;

    let line = carts
        .update(
            line,
            CartPatch {
                quantity: Some(qty),
            },
            actor,
        )
        .await?;
    Ok(Some(line))
}
