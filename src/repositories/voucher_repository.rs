use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use super::{conflict_or_db, page_index, DeleteMode};
use crate::entities::voucher::{self, Entity as Voucher};
use crate::errors::{Resource, ServiceError};

/// Canonical stored form of a voucher code: trimmed, upper-cased.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[derive(Debug, Clone)]
pub struct NewVoucher {
    pub code: String,
    pub name: String,
    pub description: String,
    pub percentage: Decimal,
    pub max: Decimal,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct VoucherPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub percentage: Option<Decimal>,
    pub max: Option<Decimal>,
    pub is_active: Option<bool>,
}

/// Repository for vouchers
pub struct VoucherRepository<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> VoucherRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Resolves a redeemable voucher by code, ignoring case.
    ///
    /// Inactive and soft-deleted vouchers are reported as not found.
    pub async fn one_by_code(&self, code: &str) -> Result<voucher::Model, ServiceError> {
        let normalized = normalize_code(code);
        Voucher::find()
            .filter(voucher::Column::Code.eq(normalized.as_str()))
            .filter(voucher::Column::IsActive.eq(true))
            .filter(voucher::Column::DeletedAt.is_null())
            .one(self.conn)
            .await?
            .ok_or_else(|| ServiceError::not_found(Resource::Voucher, normalized))
    }

    pub async fn one_by_id(&self, id: i32) -> Result<voucher::Model, ServiceError> {
        Voucher::find_by_id(id)
            .filter(voucher::Column::DeletedAt.is_null())
            .one(self.conn)
            .await?
            .ok_or_else(|| ServiceError::not_found(Resource::Voucher, id))
    }

    pub async fn list(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<voucher::Model>, u64), ServiceError> {
        let paginator = Voucher::find()
            .filter(voucher::Column::DeletedAt.is_null())
            .order_by_asc(voucher::Column::Id)
            .paginate(self.conn, per_page);

        let total = paginator.num_items().await?;
        let vouchers = paginator.fetch_page(page_index(page)).await?;
        Ok((vouchers, total))
    }

    pub async fn create(
        &self,
        new: NewVoucher,
        actor: &str,
    ) -> Result<voucher::Model, ServiceError> {
        let now = Utc::now();
        let code = normalize_code(&new.code);
        let model = voucher::ActiveModel {
            code: Set(code.clone()),
            name: Set(new.name),
            description: Set(new.description),
            percentage: Set(new.percentage),
            max: Set(new.max),
            is_active: Set(new.is_active),
            created_at: Set(now),
            updated_at: Set(now),
            created_by: Set(actor.to_string()),
            updated_by: Set(actor.to_string()),
            deleted_at: Set(None),
            deleted_by: Set(None),
            ..Default::default()
        };
        model
            .insert(self.conn)
            .await
            .map_err(|e| conflict_or_db(e, || format!("voucher code already exists: {}", code)))
    }

    pub async fn update(
        &self,
        id: i32,
        patch: VoucherPatch,
        actor: &str,
    ) -> Result<voucher::Model, ServiceError> {
        let existing = self.one_by_id(id).await?;
        let mut active: voucher::ActiveModel = existing.into();

        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(description) = patch.description {
            active.description = Set(description);
        }
        if let Some(percentage) = patch.percentage {
            active.percentage = Set(percentage);
        }
        if let Some(max) = patch.max {
            active.max = Set(max);
        }
        if let Some(is_active) = patch.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());
        active.updated_by = Set(actor.to_string());

        Ok(active.update(self.conn).await?)
    }

    pub async fn delete(&self, id: i32, mode: DeleteMode, actor: &str) -> Result<(), ServiceError> {
        let existing = self.one_by_id(id).await?;
        match mode {
            DeleteMode::Hard => {
                Voucher::delete_by_id(existing.id).exec(self.conn).await?;
            }
            DeleteMode::Soft => {
                let mut active: voucher::ActiveModel = existing.into();
                active.deleted_at = Set(Some(Utc::now()));
                active.deleted_by = Set(Some(actor.to_string()));
                active.update(self.conn).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_code;

    #[test]
    fn codes_compare_case_insensitively() {
        assert_eq!(normalize_code("  spring10 "), "SPRING10");
        assert_eq!(normalize_code("Spring10"), normalize_code("SPRING10"));
    }
}
