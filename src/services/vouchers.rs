use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ConnectionTrait, DatabaseConnection};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::entities::voucher;
use crate::errors::ServiceError;
use crate::repositories::{DeleteMode, NewVoucher, VoucherPatch, VoucherRepository};

/// A voucher resolved for a subtotal, with the discount it grants
#[derive(Debug, Clone)]
pub struct AppliedVoucher {
    pub voucher: voucher::Model,
    pub applied: Decimal,
}

/// `subtotal × percentage / 100`, capped at `max`. No rounding is applied.
pub fn discount_for(subtotal: Decimal, percentage: Decimal, max: Decimal) -> Decimal {
    (subtotal * percentage / dec!(100)).min(max)
}

/// Resolves `code` through `conn` and prices it against `subtotal`.
///
/// Percentage and cap are used as stored.
pub async fn apply<C: ConnectionTrait>(
    conn: &C,
    code: &str,
    subtotal: Decimal,
) -> Result<AppliedVoucher, ServiceError> {
    let voucher = VoucherRepository::new(conn).one_by_code(code).await?;
    let applied = discount_for(subtotal, voucher.percentage, voucher.max);
    Ok(AppliedVoucher { voucher, applied })
}

fn validate_terms(percentage: Decimal, max: Decimal) -> Result<(), ServiceError> {
    if percentage < Decimal::ZERO || percentage > dec!(100) {
        return Err(ServiceError::ValidationError(
            "percentage must be between 0 and 100".to_string(),
        ));
    }
    if max < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "max must not be negative".to_string(),
        ));
    }
    Ok(())
}

/// Voucher management and evaluation
#[derive(Clone)]
pub struct VoucherService {
    db: Arc<DatabaseConnection>,
}

impl VoucherService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn apply(
        &self,
        code: &str,
        subtotal: Decimal,
    ) -> Result<AppliedVoucher, ServiceError> {
        apply(&*self.db, code, subtotal).await
    }

    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create(
        &self,
        input: NewVoucher,
        actor: &str,
    ) -> Result<voucher::Model, ServiceError> {
        validate_terms(input.percentage, input.max)?;
        if input.code.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "code must not be empty".to_string(),
            ));
        }
        let voucher = VoucherRepository::new(&*self.db).create(input, actor).await?;
        info!(voucher_id = voucher.id, code = %voucher.code, "Created voucher");
        Ok(voucher)
    }

    pub async fn get(&self, id: i32) -> Result<voucher::Model, ServiceError> {
        VoucherRepository::new(&*self.db).one_by_id(id).await
    }

    pub async fn list(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<voucher::Model>, u64), ServiceError> {
        VoucherRepository::new(&*self.db).list(page, per_page).await
    }

    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: i32,
        patch: VoucherPatch,
        actor: &str,
    ) -> Result<voucher::Model, ServiceError> {
        let repo = VoucherRepository::new(&*self.db);
        let current = repo.one_by_id(id).await?;
        validate_terms(
            patch.percentage.unwrap_or(current.percentage),
            patch.max.unwrap_or(current.max),
        )?;
        let voucher = repo.update(id, patch, actor).await?;
        info!(voucher_id = id, "Updated voucher");
        Ok(voucher)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32, actor: &str) -> Result<(), ServiceError> {
        VoucherRepository::new(&*self.db)
            .delete(id, DeleteMode::Soft, actor)
            .await?;
        info!(voucher_id = id, "Deleted voucher");
        Ok(())
    }
}
