use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::entities::item;
use crate::errors::ServiceError;
use crate::repositories::{DeleteMode, ItemPatch, ItemRepository, NewItem};

#[derive(Clone)]
pub struct ItemService {
    db: Arc<DatabaseConnection>,
}

impl ItemService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<item::Model>, u64), ServiceError> {
        ItemRepository::new(&*self.db).list(page, per_page).await
    }

    pub async fn get(&self, id: i32) -> Result<item::Model, ServiceError> {
        ItemRepository::new(&*self.db).one_by_id(id).await
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: NewItem, actor: &str) -> Result<item::Model, ServiceError> {
        if input.quantity < 0 {
            return Err(ServiceError::ValidationError(
                "quantity must not be negative".to_string(),
            ));
        }
        let item = ItemRepository::new(&*self.db).create(input, actor).await?;
        info!(item_id = item.id, "Created item");
        Ok(item)
    }

    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: i32,
        patch: ItemPatch,
        actor: &str,
    ) -> Result<item::Model, ServiceError> {
        if matches!(patch.quantity, Some(q) if q < 0) {
            return Err(ServiceError::ValidationError(
                "quantity must not be negative".to_string(),
            ));
        }
        let item = ItemRepository::new(&*self.db).update(id, patch, actor).await?;
        info!(item_id = id, "Updated item");
        Ok(item)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32, actor: &str) -> Result<(), ServiceError> {
        ItemRepository::new(&*self.db)
            .delete(id, DeleteMode::Soft, actor)
            .await?;
        info!(item_id = id, "Deleted item");
        Ok(())
    }
}
