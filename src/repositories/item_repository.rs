use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::debug;

use super::{page_index, DeleteMode};
use crate::entities::item::{self, Entity as Item};
use crate::errors::{Resource, ServiceError};

#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub quantity: i32,
}

/// Fields left as `None` keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
}

/// Repository for items
pub struct ItemRepository<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> ItemRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn one_by_id(&self, id: i32) -> Result<item::Model, ServiceError> {
        Item::find_by_id(id)
            .filter(item::Column::DeletedAt.is_null())
            .one(self.conn)
            .await?
            .ok_or_else(|| ServiceError::not_found(Resource::Item, id))
    }

    /// Reads the item holding an exclusive row lock until the surrounding
    /// transaction ends. Backends without row locks (SQLite) ignore the lock.
    pub async fn one_by_id_for_update(&self, id: i32) -> Result<item::Model, ServiceError> {
        Item::find_by_id(id)
            .filter(item::Column::DeletedAt.is_null())
            .lock_exclusive()
            .one(self.conn)
            .await?
            .ok_or_else(|| ServiceError::not_found(Resource::Item, id))
    }

    /// Get all live items with pagination
    pub async fn list(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<item::Model>, u64), ServiceError> {
        let paginator = Item::find()
            .filter(item::Column::DeletedAt.is_null())
            .order_by_asc(item::Column::Id)
            .paginate(self.conn, per_page);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page_index(page)).await?;
        Ok((items, total))
    }

    pub async fn create(&self, new: NewItem, actor: &str) -> Result<item::Model, ServiceError> {
        let now = Utc::now();
        let model = item::ActiveModel {
            name: Set(new.name),
            description: Set(new.description),
            price: Set(new.price),
            quantity: Set(new.quantity),
            created_at: Set(now),
            updated_at: Set(now),
            created_by: Set(actor.to_string()),
            updated_by: Set(actor.to_string()),
            deleted_at: Set(None),
            deleted_by: Set(None),
            ..Default::default()
        };
        Ok(model.insert(self.conn).await?)
    }

    pub async fn update(
        &self,
        id: i32,
        patch: ItemPatch,
        actor: &str,
    ) -> Result<item::Model, ServiceError> {
        let existing = self.one_by_id(id).await?;
        let mut active: item::ActiveModel = existing.into();

        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(description) = patch.description {
            active.description = Set(description);
        }
        if let Some(price) = patch.price {
            active.price = Set(price);
        }
        if let Some(quantity) = patch.quantity {
            active.quantity = Set(quantity);
        }
        active.updated_at = Set(Utc::now());
        active.updated_by = Set(actor.to_string());

        Ok(active.update(self.conn).await?)
    }

    /// Writes `remaining` only if stock still equals `expected`.
    ///
    /// Zero affected rows means another writer moved the stock since it was
    /// read, which is reported as insufficient stock.
    pub async fn update_quantity(
        &self,
        id: i32,
        expected: i32,
        remaining: i32,
        actor: &str,
    ) -> Result<(), ServiceError> {
        let result = Item::update_many()
            .col_expr(item::Column::Quantity, Expr::value(remaining))
            .col_expr(item::Column::UpdatedAt, Expr::value(Utc::now()))
            .col_expr(item::Column::UpdatedBy, Expr::value(actor))
            .filter(item::Column::Id.eq(id))
            .filter(item::Column::Quantity.eq(expected))
            .exec(self.conn)
            .await?;

        if result.rows_affected == 0 {
            debug!(item_id = id, expected, "stock changed under compare-and-set");
            return Err(ServiceError::InsufficientStock(format!(
                "stock for item {} changed during checkout",
                id
            )));
        }
        Ok(())
    }

    pub async fn delete(&self, id: i32, mode: DeleteMode, actor: &str) -> Result<(), ServiceError> {
        let existing = self.one_by_id(id).await?;
        match mode {
            DeleteMode::Hard => {
                Item::delete_by_id(existing.id).exec(self.conn).await?;
            }
            DeleteMode::Soft => {
                let mut active: item::ActiveModel = existing.into();
                active.deleted_at = Set(Some(Utc::now()));
                active.deleted_by = Set(Some(actor.to_string()));
                active.update(self.conn).await?;
            }
        }
        Ok(())
    }
}
