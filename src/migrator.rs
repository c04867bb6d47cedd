// Signatures must match sea-orm-migration's `&SchemaManager` exactly under async_trait.
#![allow(elided_lifetimes_in_paths)]

use sea_orm::DbBackend;
use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_accounts_table::Migration),
            Box::new(m20240301_000002_create_items_table::Migration),
            Box::new(m20240301_000003_create_carts_table::Migration),
            Box::new(m20240301_000004_create_vouchers_table::Migration),
            Box::new(m20240301_000005_create_order_tables::Migration),
        ]
    }
}

/// Money column: exact decimal on Postgres, REAL on SQLite.
///
/// SQLite has no decimal type and NUMERIC affinity would store whole
/// amounts as INTEGER, which the decimal decoder then rejects.
fn money(manager: &SchemaManager<'_>, col: impl IntoIden + 'static) -> ColumnDef {
    let mut def = ColumnDef::new(col);
    match manager.get_database_backend() {
        DbBackend::Sqlite => def.double(),
        _ => def.decimal_len(19, 4),
    };
    def.not_null().default(0).to_owned()
}

fn timestamps(table: &mut TableCreateStatement) -> &mut TableCreateStatement {
    table
        .col(
            ColumnDef::new(Audit::CreatedAt)
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .col(
            ColumnDef::new(Audit::UpdatedAt)
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .col(
            ColumnDef::new(Audit::CreatedBy)
                .string()
                .not_null()
                .default("SYSTEM"),
        )
        .col(
            ColumnDef::new(Audit::UpdatedBy)
                .string()
                .not_null()
                .default("SYSTEM"),
        )
}

fn soft_delete(table: &mut TableCreateStatement) -> &mut TableCreateStatement {
    table
        .col(
            ColumnDef::new(Audit::DeletedAt)
                .timestamp_with_time_zone()
                .null(),
        )
        .col(ColumnDef::new(Audit::DeletedBy).string().null())
}

#[derive(DeriveIden)]
enum Audit {
    CreatedAt,
    UpdatedAt,
    CreatedBy,
    UpdatedBy,
    DeletedAt,
    DeletedBy,
}

mod m20240301_000001_create_accounts_table {
    use super::{soft_delete, timestamps};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_accounts_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut table = Table::create();
            table
                .table(Accounts::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(Accounts::Id)
                        .integer()
                        .not_null()
                        .auto_increment()
                        .primary_key(),
                )
                .col(
                    ColumnDef::new(Accounts::Email)
                        .string()
                        .not_null()
                        .unique_key(),
                )
                .col(ColumnDef::new(Accounts::PasswordHash).string().not_null())
                .col(ColumnDef::new(Accounts::Name).string().not_null())
                .col(
                    ColumnDef::new(Accounts::Address)
                        .string()
                        .not_null()
                        .default(""),
                )
                .col(
                    ColumnDef::new(Accounts::PhoneNumber)
                        .string()
                        .not_null()
                        .default(""),
                )
                .col(
                    ColumnDef::new(Accounts::AccountType)
                        .string()
                        .not_null()
                        .default("USER"),
                );
            timestamps(&mut table);
            soft_delete(&mut table);

            manager.create_table(table.to_owned()).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Accounts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Accounts {
        Table,
        Id,
        Email,
        PasswordHash,
        Name,
        Address,
        PhoneNumber,
        AccountType,
    }
}

mod m20240301_000002_create_items_table {
    use super::{money, soft_delete, timestamps};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut table = Table::create();
            table
                .table(Items::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(Items::Id)
                        .integer()
                        .not_null()
                        .auto_increment()
                        .primary_key(),
                )
                .col(ColumnDef::new(Items::Name).string().not_null())
                .col(
                    ColumnDef::new(Items::Description)
                        .text()
                        .not_null()
                        .default(""),
                )
                .col(money(manager, Items::Price))
                .col(
                    ColumnDef::new(Items::Quantity)
                        .integer()
                        .not_null()
                        .default(0)
                        .check(Expr::col(Items::Quantity).gte(0)),
                );
            timestamps(&mut table);
            soft_delete(&mut table);

            manager.create_table(table.to_owned()).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Items::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Items {
        Table,
        Id,
        Name,
        Description,
        Price,
        Quantity,
    }
}

mod m20240301_000003_create_carts_table {
    use super::m20240301_000001_create_accounts_table::Accounts;
    use super::m20240301_000002_create_items_table::Items;
    use super::timestamps;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_carts_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut table = Table::create();
            table
                .table(Carts::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(Carts::Id)
                        .integer()
                        .not_null()
                        .auto_increment()
                        .primary_key(),
                )
                .col(ColumnDef::new(Carts::AccountId).integer().not_null())
                .col(ColumnDef::new(Carts::ItemId).integer().not_null())
                .col(
                    ColumnDef::new(Carts::Quantity)
                        .integer()
                        .not_null()
                        .check(Expr::col(Carts::Quantity).gt(0)),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_carts_account_id")
                        .from(Carts::Table, Carts::AccountId)
                        .to(Accounts::Table, Accounts::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_carts_item_id")
                        .from(Carts::Table, Carts::ItemId)
                        .to(Items::Table, Items::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                );
            timestamps(&mut table);

            manager.create_table(table.to_owned()).await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_carts_account_item")
                        .table(Carts::Table)
                        .col(Carts::AccountId)
                        .col(Carts::ItemId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Carts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Carts {
        Table,
        Id,
        AccountId,
        ItemId,
        Quantity,
    }
}

mod m20240301_000004_create_vouchers_table {
    use super::{money, soft_delete, timestamps};
    use sea_orm::ConnectionTrait;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_vouchers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut table = Table::create();
            table
                .table(Vouchers::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(Vouchers::Id)
                        .integer()
                        .not_null()
                        .auto_increment()
                        .primary_key(),
                )
                .col(ColumnDef::new(Vouchers::Code).string().not_null())
                .col(ColumnDef::new(Vouchers::Name).string().not_null())
                .col(
                    ColumnDef::new(Vouchers::Description)
                        .text()
                        .not_null()
                        .default(""),
                )
                .col(money(manager, Vouchers::Percentage))
                .col(money(manager, Vouchers::Max))
                .col(
                    ColumnDef::new(Vouchers::IsActive)
                        .boolean()
                        .not_null()
                        .default(true),
                );
            timestamps(&mut table);
            soft_delete(&mut table);

            manager.create_table(table.to_owned()).await?;

            // Codes are unique among live vouchers only; a soft-deleted code
            // can be issued again. Partial indexes work on Postgres and SQLite.
            manager
                .get_connection()
                .execute_unprepared(
                    "CREATE UNIQUE INDEX IF NOT EXISTS idx_vouchers_live_code \
                     ON vouchers (code) WHERE deleted_at IS NULL",
                )
                .await?;
            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Vouchers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Vouchers {
        Table,
        Id,
        Code,
        Name,
        Description,
        Percentage,
        Max,
        IsActive,
    }
}

mod m20240301_000005_create_order_tables {
    use super::m20240301_000001_create_accounts_table::Accounts;
    use super::m20240301_000004_create_vouchers_table::Vouchers;
    use super::{money, timestamps};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut orders = Table::create();
            orders
                .table(Orders::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(Orders::Id)
                        .integer()
                        .not_null()
                        .auto_increment()
                        .primary_key(),
                )
                .col(ColumnDef::new(Orders::AccountId).integer().not_null())
                .col(
                    ColumnDef::new(Orders::Address)
                        .string()
                        .not_null()
                        .default(""),
                )
                .col(
                    ColumnDef::new(Orders::PhoneNumber)
                        .string()
                        .not_null()
                        .default(""),
                )
                .col(money(manager, Orders::Total))
                .col(
                    ColumnDef::new(Orders::Status)
                        .string()
                        .not_null()
                        .default("ORDERED"),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_orders_account_id")
                        .from(Orders::Table, Orders::AccountId)
                        .to(Accounts::Table, Accounts::Id),
                );
            timestamps(&mut orders);
            manager.create_table(orders.to_owned()).await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_account_id")
                        .table(Orders::Table)
                        .col(Orders::AccountId)
                        .to_owned(),
                )
                .await?;

            // Item ids are kept without a foreign key: order lines outlive
            // their items.
            let mut lines = Table::create();
            lines
                .table(OrderItems::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(OrderItems::Id)
                        .integer()
                        .not_null()
                        .auto_increment()
                        .primary_key(),
                )
                .col(ColumnDef::new(OrderItems::OrderId).integer().not_null())
                .col(ColumnDef::new(OrderItems::ItemId).integer().not_null())
                .col(ColumnDef::new(OrderItems::Name).string().not_null())
                .col(
                    ColumnDef::new(OrderItems::Description)
                        .text()
                        .not_null()
                        .default(""),
                )
                .col(money(manager, OrderItems::Price))
                .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                .col(money(manager, OrderItems::Total))
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_order_items_order_id")
                        .from(OrderItems::Table, OrderItems::OrderId)
                        .to(Orders::Table, Orders::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                );
            timestamps(&mut lines);
            manager.create_table(lines.to_owned()).await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_order_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .to_owned(),
                )
                .await?;

            let mut applied = Table::create();
            applied
                .table(OrderVouchers::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(OrderVouchers::Id)
                        .integer()
                        .not_null()
                        .auto_increment()
                        .primary_key(),
                )
                .col(
                    ColumnDef::new(OrderVouchers::OrderId)
                        .integer()
                        .not_null()
                        .unique_key(),
                )
                .col(ColumnDef::new(OrderVouchers::VoucherId).integer().not_null())
                .col(ColumnDef::new(OrderVouchers::Code).string().not_null())
                .col(ColumnDef::new(OrderVouchers::Name).string().not_null())
                .col(
                    ColumnDef::new(OrderVouchers::Description)
                        .text()
                        .not_null()
                        .default(""),
                )
                .col(money(manager, OrderVouchers::Percentage))
                .col(money(manager, OrderVouchers::Max))
                .col(money(manager, OrderVouchers::Total))
                .col(money(manager, OrderVouchers::Applied))
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_order_vouchers_order_id")
                        .from(OrderVouchers::Table, OrderVouchers::OrderId)
                        .to(Orders::Table, Orders::Id)
                        .on_delete(ForeignKeyAction::Cascade),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_order_vouchers_voucher_id")
                        .from(OrderVouchers::Table, OrderVouchers::VoucherId)
                        .to(Vouchers::Table, Vouchers::Id),
                );
            timestamps(&mut applied);
            manager.create_table(applied.to_owned()).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderVouchers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        AccountId,
        Address,
        PhoneNumber,
        Total,
        Status,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        ItemId,
        Name,
        Description,
        Price,
        Quantity,
        Total,
    }

    #[derive(DeriveIden)]
    enum OrderVouchers {
        Table,
        Id,
        OrderId,
        VoucherId,
        Code,
        Name,
        Description,
        Percentage,
        Max,
        Total,
        Applied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};

    async fn memory_db() -> DatabaseConnection {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1).min_connections(1).sqlx_logging(false);
        Database::connect(opts).await.unwrap()
    }

    async fn insert_voucher(
        db: &DatabaseConnection,
        code: &str,
        deleted: bool,
    ) -> Result<(), DbErr> {
        let deleted_at = if deleted { "CURRENT_TIMESTAMP" } else { "NULL" };
        db.execute(Statement::from_string(
            DbBackend::Sqlite,
            format!(
                "INSERT INTO vouchers (code, name, percentage, max, deleted_at) \
                 VALUES ('{code}', 'n', 10, 5, {deleted_at})"
            ),
        ))
        .await
        .map(|_| ())
    }

    #[tokio::test]
    async fn migrations_apply_and_revert() {
        let db = memory_db().await;
        Migrator::up(&db, None).await.unwrap();
        assert_eq!(Migrator::get_applied_migrations(&db).await.unwrap().len(), 5);

        Migrator::down(&db, None).await.unwrap();
        assert!(Migrator::get_applied_migrations(&db).await.unwrap().is_empty());

        Migrator::up(&db, None).await.unwrap();
        assert_eq!(Migrator::get_applied_migrations(&db).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn voucher_codes_are_unique_among_live_rows_only() {
        let db = memory_db().await;
        Migrator::up(&db, None).await.unwrap();

        insert_voucher(&db, "SPRING10", true).await.unwrap();
        insert_voucher(&db, "SPRING10", false).await.unwrap();
        assert!(insert_voucher(&db, "SPRING10", false).await.is_err());
    }
}
