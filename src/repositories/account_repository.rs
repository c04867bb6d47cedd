use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
};

use super::conflict_or_db;
use crate::entities::account::{self, AccountType, Entity as Account};
use crate::entities::SYSTEM_ACTOR;
use crate::errors::{Resource, ServiceError};

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub address: String,
    pub phone_number: String,
    pub account_type: AccountType,
}

/// Repository for accounts
pub struct AccountRepository<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> AccountRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Looks up a live account by email.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<account::Model>, ServiceError> {
        Ok(Account::find()
            .filter(account::Column::Email.eq(email))
            .filter(account::Column::DeletedAt.is_null())
            .one(self.conn)
            .await?)
    }

    pub async fn one_by_email(&self, email: &str) -> Result<account::Model, ServiceError> {
        self.find_by_email(email)
            .await?
            .ok_or_else(|| ServiceError::not_found(Resource::Account, email))
    }

    pub async fn create(&self, new: NewAccount) -> Result<account::Model, ServiceError> {
        let now = Utc::now();
        let email = new.email.clone();
        let model = account::ActiveModel {
            email: Set(new.email),
            password_hash: Set(new.password_hash),
            name: Set(new.name),
            address: Set(new.address),
            phone_number: Set(new.phone_number),
            account_type: Set(new.account_type),
            created_at: Set(now),
            updated_at: Set(now),
            created_by: Set(SYSTEM_ACTOR.to_string()),
            updated_by: Set(SYSTEM_ACTOR.to_string()),
            deleted_at: Set(None),
            deleted_by: Set(None),
            ..Default::default()
        };

        model
            .insert(self.conn)
            .await
            .map_err(|e| conflict_or_db(e, || format!("email already registered: {}", email)))
    }
}
