use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;

use super::conflict_or_db;
use crate::entities::cart::{self, Entity as Cart};
use crate::entities::item::{self, Entity as Item};
use crate::errors::{Resource, ServiceError};

/// A cart line with its item attached
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    #[serde(flatten)]
    pub line: cart::Model,
    pub item: item::Model,
}

#[derive(Debug, Clone, Default)]
pub struct CartPatch {
    pub quantity: Option<i32>,
}

/// Repository for cart lines
pub struct CartRepository<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> CartRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// All lines of an account in cart order (oldest first)
    pub async fn all_by_account(&self, account_id: i32) -> Result<Vec<CartLine>, ServiceError> {
        let rows = Cart::find()
            .find_also_related(Item)
            .filter(cart::Column::AccountId.eq(account_id))
            .order_by_asc(cart::Column::Id)
            .all(self.conn)
            .await?;

        rows.into_iter()
            .map(|(line, item)| match item {
                Some(item) => Ok(CartLine { line, item }),
                None => Err(ServiceError::not_found(Resource::Item, line.item_id)),
            })
            .collect()
    }

    /// A line owned by `account_id`; other accounts' lines are not found.
    pub async fn one_for_account(
        &self,
        account_id: i32,
        cart_id: i32,
    ) -> Result<cart::Model, ServiceError> {
        Cart::find_by_id(cart_id)
            .filter(cart::Column::AccountId.eq(account_id))
            .one(self.conn)
            .await?
            .ok_or_else(|| ServiceError::not_found(Resource::CartLine, cart_id))
    }

    /// Like [`Self::one_for_account`] with the item attached.
    pub async fn line_for_account(
        &self,
        account_id: i32,
        cart_id: i32,
    ) -> Result<CartLine, ServiceError> {
        let (line, item) = Cart::find_by_id(cart_id)
            .find_also_related(Item)
            .filter(cart::Column::AccountId.eq(account_id))
            .one(self.conn)
            .await?
            .ok_or_else(|| ServiceError::not_found(Resource::CartLine, cart_id))?;
        match item {
            Some(item) => Ok(CartLine { line, item }),
            None => Err(ServiceError::not_found(Resource::Item, line.item_id)),
        }
    }

    pub async fn find_by_account_item(
        &self,
        account_id: i32,
        item_id: i32,
    ) -> Result<Option<cart::Model>, ServiceError> {
        Ok(Cart::find()
            .filter(cart::Column::AccountId.eq(account_id))
            .filter(cart::Column::ItemId.eq(item_id))
            .one(self.conn)
            .await?)
    }

    pub async fn create(
        &self,
        account_id: i32,
        item_id: i32,
        quantity: i32,
        actor: &str,
    ) -> Result<cart::Model, ServiceError> {
        let now = Utc::now();
        let model = cart::ActiveModel {
            account_id: Set(account_id),
            item_id: Set(item_id),
            quantity: Set(quantity),
            created_at: Set(now),
            updated_at: Set(now),
            created_by: Set(actor.to_string()),
            updated_by: Set(actor.to_string()),
            ..Default::default()
        };
        model
            .insert(self.conn)
            .await
            .map_err(|e| conflict_or_db(e, || format!("item {} is already in the cart", item_id)))
    }

    pub async fn update(
        &self,
        line: cart::Model,
        patch: CartPatch,
        actor: &str,
    ) -> Result<cart::Model, ServiceError> {
        let mut active: cart::ActiveModel = line.into();
        if let Some(quantity) = patch.quantity {
            active.quantity = Set(quantity);
        }
        active.updated_at = Set(Utc::now());
        active.updated_by = Set(actor.to_string());
        Ok(active.update(self.conn).await?)
    }

    /// Hard delete; cart lines have no soft-delete state.
    pub async fn delete(&self, cart_id: i32) -> Result<(), ServiceError> {
        let result = Cart::delete_by_id(cart_id).exec(self.conn).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found(Resource::CartLine, cart_id));
        }
        Ok(())
    }
}
