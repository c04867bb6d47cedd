use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::auth::{hash_password, verify_password, AuthService, TokenResponse};
use crate::entities::account::{self, AccountType};
use crate::errors::ServiceError;
use crate::repositories::{AccountRepository, NewAccount};

/// Registration input; validated at the HTTP boundary.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
    pub address: String,
    pub phone_number: String,
}

#[derive(Clone)]
pub struct AccountService {
    db: Arc<DatabaseConnection>,
    auth: Arc<AuthService>,
}

impl AccountService {
    pub fn new(db: Arc<DatabaseConnection>, auth: Arc<AuthService>) -> Self {
        Self { db, auth }
    }

    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(
        &self,
        registration: Registration,
    ) -> Result<account::Model, ServiceError> {
        self.create(registration, AccountType::User).await
    }

    /// Creates an account of any type. Only reachable from tooling and tests;
    /// the public registration route always creates `USER` accounts.
    pub async fn create(
        &self,
        registration: Registration,
        account_type: AccountType,
    ) -> Result<account::Model, ServiceError> {
        let email = registration.email.trim().to_lowercase();
        let repo = AccountRepository::new(&*self.db);

        if repo.find_by_email(&email).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "email already registered: {}",
                email
            )));
        }

        let password_hash = hash_password(&registration.password)?;
        let account = repo
            .create(NewAccount {
                email,
                password_hash,
                name: registration.name,
                address: registration.address,
                phone_number: registration.phone_number,
                account_type,
            })
            .await?;

        info!(account_id = account.id, account_type = %account.account_type, "Registered account");
        Ok(account)
    }

    /// Verifies credentials and issues an access token.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, ServiceError> {
        let email = email.trim().to_lowercase();
        let invalid = || ServiceError::Unauthorized("invalid email or password".to_string());

        let account = match AccountRepository::new(&*self.db).find_by_email(&email).await? {
            Some(account) => account,
            None => {
                warn!("Login attempt for unknown account");
                return Err(invalid());
            }
        };

        if !verify_password(password, &account.password_hash)? {
            warn!(account_id = account.id, "Login attempt with wrong password");
            return Err(invalid());
        }

        let token = self.auth.generate_token(&account)?;
        info!(account_id = account.id, "Issued access token");
        Ok(token)
    }

    pub async fn profile(&self, email: &str) -> Result<account::Model, ServiceError> {
        AccountRepository::new(&*self.db).one_by_email(email).await
    }
}
