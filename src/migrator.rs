use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_users_table::Migration),
            Box::new(m20240101_000002_create_categories_table::Migration),
            Box::new(m20240101_000003_create_stores_table::Migration),
            Box::new(m20240101_000004_create_products_table::Migration),
            Box::new(m20240101_000005_create_stock_by_store_table::Migration),
            Box::new(m20240101_000006_create_audit_logs_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_users_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Users::Name).string().not_null())
                        .col(ColumnDef::new(Users::Email).string().not_null())
                        .col(ColumnDef::new(Users::PasswordHash).text().not_null())
                        .col(
                            ColumnDef::new(Users::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_users_email")
                        .table(Users::Table)
                        .col(Users::Email)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Users {
        Table,
        Id,
        Name,
        Email,
        PasswordHash,
        Active,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_categories_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_categories_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Categories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Categories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Categories::Name).string().not_null())
                        .col(ColumnDef::new(Categories::Description).string().null())
                        .col(ColumnDef::new(Categories::Slug).string().not_null())
                        .col(ColumnDef::new(Categories::ParentId).uuid().null())
                        .col(
                            ColumnDef::new(Categories::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Categories::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Categories::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_categories_parent_id")
                                .from(Categories::Table, Categories::ParentId)
                                .to(Categories::Table, Categories::Id),
                        )
                        .to_owned(),
                )
                .await?;

            // Slug uniqueness backs both lookup-by-slug and the sentinel
            // category's lost-creation-race recovery.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_categories_slug")
                        .table(Categories::Table)
                        .col(Categories::Slug)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_categories_parent_id")
                        .table(Categories::Table)
                        .col(Categories::ParentId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Categories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Categories {
        Table,
        Id,
        Name,
        Description,
        Slug,
        ParentId,
        Active,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_stores_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_stores_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Stores::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Stores::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Stores::Name).string().not_null())
                        .col(
                            ColumnDef::new(Stores::StoreType)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Stores::FullAddress).string().null())
                        .col(ColumnDef::new(Stores::OpeningHours).string().null())
                        .col(
                            ColumnDef::new(Stores::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Stores::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Stores::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stores_name")
                        .table(Stores::Table)
                        .col(Stores::Name)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Stores::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Stores {
        Table,
        Id,
        Name,
        StoreType,
        FullAddress,
        OpeningHours,
        Active,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000004_create_products_table {

    use sea_orm_migration::prelude::*;

    use super::m20240101_000002_create_categories_table::Categories;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Products::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(
                            ColumnDef::new(Products::DetailedDescription)
                                .text()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Products::CategoryId).uuid().not_null())
                        .col(
                            ColumnDef::new(Products::Price)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::PromotionalPrice)
                                .decimal_len(12, 2)
                                .null(),
                        )
                        .col(ColumnDef::new(Products::Sku).string().not_null())
                        .col(ColumnDef::new(Products::EanUpc).string().null())
                        .col(ColumnDef::new(Products::Sizes).json().not_null())
                        .col(ColumnDef::new(Products::Colors).json().not_null())
                        .col(ColumnDef::new(Products::Images).json().not_null())
                        .col(
                            ColumnDef::new(Products::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_products_category_id")
                                .from(Products::Table, Products::CategoryId)
                                .to(Categories::Table, Categories::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_sku")
                        .table(Products::Table)
                        .col(Products::Sku)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_category_id")
                        .table(Products::Table)
                        .col(Products::CategoryId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Products {
        Table,
        Id,
        Name,
        DetailedDescription,
        CategoryId,
        Price,
        PromotionalPrice,
        Sku,
        EanUpc,
        Sizes,
        Colors,
        Images,
        Active,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000005_create_stock_by_store_table {

    use sea_orm_migration::prelude::*;

    use super::m20240101_000003_create_stores_table::Stores;
    use super::m20240101_000004_create_products_table::Products;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_stock_by_store_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockByStore::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockByStore::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockByStore::ProductId).uuid().not_null())
                        .col(ColumnDef::new(StockByStore::StoreId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockByStore::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StockByStore::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockByStore::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_by_store_product_id")
                                .from(StockByStore::Table, StockByStore::ProductId)
                                .to(Products::Table, Products::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_by_store_store_id")
                                .from(StockByStore::Table, StockByStore::StoreId)
                                .to(Stores::Table, Stores::Id),
                        )
                        .to_owned(),
                )
                .await?;

            // One stock row per (product, store) pair; upserts rely on this.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_by_store_product_store")
                        .table(StockByStore::Table)
                        .col(StockByStore::ProductId)
                        .col(StockByStore::StoreId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_by_store_store_id")
                        .table(StockByStore::Table)
                        .col(StockByStore::StoreId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockByStore::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum StockByStore {
        Table,
        Id,
        ProductId,
        StoreId,
        Quantity,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000006_create_audit_logs_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_audit_logs_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(AuditLogs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AuditLogs::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(AuditLogs::UserId).uuid().null())
                        .col(ColumnDef::new(AuditLogs::Action).string_len(20).not_null())
                        .col(
                            ColumnDef::new(AuditLogs::EntityType)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(ColumnDef::new(AuditLogs::EntityId).uuid().null())
                        .col(ColumnDef::new(AuditLogs::ProductId).uuid().null())
                        .col(ColumnDef::new(AuditLogs::CategoryId).uuid().null())
                        .col(ColumnDef::new(AuditLogs::StoreId).uuid().null())
                        .col(ColumnDef::new(AuditLogs::Details).json().null())
                        .col(ColumnDef::new(AuditLogs::IpAddress).string().null())
                        .col(ColumnDef::new(AuditLogs::UserAgent).string().null())
                        .col(
                            ColumnDef::new(AuditLogs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_audit_logs_user_id")
                        .table(AuditLogs::Table)
                        .col(AuditLogs::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_audit_logs_created_at")
                        .table(AuditLogs::Table)
                        .col(AuditLogs::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AuditLogs::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum AuditLogs {
        Table,
        Id,
        UserId,
        Action,
        EntityType,
        EntityId,
        ProductId,
        CategoryId,
        StoreId,
        Details,
        IpAddress,
        UserAgent,
        CreatedAt,
    }
}
