use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_catalog_tables::Migration),
            Box::new(m20240601_000002_create_warehouse_stock_table::Migration),
            Box::new(m20240601_000003_create_institution_stock_table::Migration),
            Box::new(m20240601_000004_create_requirements_table::Migration),
            Box::new(m20240601_000005_create_logistics_table::Migration),
            Box::new(m20240601_000006_create_log_tables::Migration),
        ]
    }
}

mod m20240601_000001_create_catalog_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Medicines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Medicines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Medicines::Name).string().not_null())
                        .col(ColumnDef::new(Medicines::Manufacturer).string())
                        .col(
                            ColumnDef::new(Medicines::IsDeleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Medicines::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Warehouses::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Warehouses::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Warehouses::Name).string().not_null())
                        .col(ColumnDef::new(Warehouses::Email).string().not_null())
                        .col(
                            ColumnDef::new(Warehouses::IsDeleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Warehouses::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Institutions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Institutions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Institutions::Name).string().not_null())
                        .col(ColumnDef::new(Institutions::Email).string().not_null())
                        .col(
                            ColumnDef::new(Institutions::IsDeleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Institutions::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Institutions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Warehouses::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Medicines::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Medicines {
        Table,
        Id,
        Name,
        Manufacturer,
        IsDeleted,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Warehouses {
        Table,
        Id,
        Name,
        Email,
        IsDeleted,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Institutions {
        Table,
        Id,
        Name,
        Email,
        IsDeleted,
        CreatedAt,
    }
}

mod m20240601_000002_create_warehouse_stock_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000002_create_warehouse_stock_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(WarehouseStock::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WarehouseStock::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseStock::WarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseStock::MedicineId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WarehouseStock::Batches).json().not_null())
                        .col(
                            ColumnDef::new(WarehouseStock::Version)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(WarehouseStock::IsDeleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(WarehouseStock::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseStock::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_warehouse_stock_owner_medicine")
                        .table(WarehouseStock::Table)
                        .col(WarehouseStock::WarehouseId)
                        .col(WarehouseStock::MedicineId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WarehouseStock::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum WarehouseStock {
        Table,
        Id,
        WarehouseId,
        MedicineId,
        Batches,
        Version,
        IsDeleted,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000003_create_institution_stock_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000003_create_institution_stock_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InstitutionStock::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InstitutionStock::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InstitutionStock::InstitutionId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InstitutionStock::MedicineId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InstitutionStock::Batches).json().not_null())
                        .col(
                            ColumnDef::new(InstitutionStock::Version)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InstitutionStock::IsDeleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(InstitutionStock::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InstitutionStock::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_institution_stock_owner_medicine")
                        .table(InstitutionStock::Table)
                        .col(InstitutionStock::InstitutionId)
                        .col(InstitutionStock::MedicineId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InstitutionStock::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum InstitutionStock {
        Table,
        Id,
        InstitutionId,
        MedicineId,
        Batches,
        Version,
        IsDeleted,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000004_create_requirements_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000004_create_requirements_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Requirements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Requirements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Requirements::InstitutionId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Requirements::WarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Requirements::Lines).json().not_null())
                        .col(
                            ColumnDef::new(Requirements::OverallStatus)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Requirements::LogisticId).uuid())
                        .col(
                            ColumnDef::new(Requirements::Version)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Requirements::IsDeleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Requirements::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Requirements::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_requirements_institution")
                        .table(Requirements::Table)
                        .col(Requirements::InstitutionId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_requirements_warehouse")
                        .table(Requirements::Table)
                        .col(Requirements::WarehouseId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Requirements::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Requirements {
        Table,
        Id,
        InstitutionId,
        WarehouseId,
        Lines,
        OverallStatus,
        LogisticId,
        Version,
        IsDeleted,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000005_create_logistics_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000005_create_logistics_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Logistics::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Logistics::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Logistics::ShipmentId)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Logistics::RequirementId).uuid().not_null())
                        .col(ColumnDef::new(Logistics::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(Logistics::InstitutionId).uuid().not_null())
                        .col(ColumnDef::new(Logistics::Medicines).json().not_null())
                        .col(ColumnDef::new(Logistics::Vehicles).json().not_null())
                        .col(ColumnDef::new(Logistics::Status).string().not_null())
                        .col(
                            ColumnDef::new(Logistics::ReceivedStatus)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Logistics::Version)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Logistics::IsDeleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Logistics::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Logistics::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_logistics_requirement")
                        .table(Logistics::Table)
                        .col(Logistics::RequirementId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_logistics_institution")
                        .table(Logistics::Table)
                        .col(Logistics::InstitutionId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Logistics::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Logistics {
        Table,
        Id,
        ShipmentId,
        RequirementId,
        WarehouseId,
        InstitutionId,
        Medicines,
        Vehicles,
        Status,
        ReceivedStatus,
        Version,
        IsDeleted,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000006_create_log_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000006_create_log_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(UsageLogs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(UsageLogs::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(UsageLogs::InstitutionId).uuid().not_null())
                        .col(ColumnDef::new(UsageLogs::MedicineId).uuid().not_null())
                        .col(ColumnDef::new(UsageLogs::BatchName).string().not_null())
                        .col(ColumnDef::new(UsageLogs::Quantity).integer().not_null())
                        .col(ColumnDef::new(UsageLogs::EntryType).string().not_null())
                        .col(ColumnDef::new(UsageLogs::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_usage_logs_institution")
                        .table(UsageLogs::Table)
                        .col(UsageLogs::InstitutionId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ReceiptLogs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ReceiptLogs::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ReceiptLogs::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(ReceiptLogs::MedicineId).uuid().not_null())
                        .col(ColumnDef::new(ReceiptLogs::BatchName).string().not_null())
                        .col(ColumnDef::new(ReceiptLogs::Quantity).integer().not_null())
                        .col(ColumnDef::new(ReceiptLogs::EntryType).string().not_null())
                        .col(
                            ColumnDef::new(ReceiptLogs::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_receipt_logs_warehouse")
                        .table(ReceiptLogs::Table)
                        .col(ReceiptLogs::WarehouseId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ReceiptLogs::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(UsageLogs::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum UsageLogs {
        Table,
        Id,
        InstitutionId,
        MedicineId,
        BatchName,
        Quantity,
        EntryType,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum ReceiptLogs {
        Table,
        Id,
        WarehouseId,
        MedicineId,
        BatchName,
        Quantity,
        EntryType,
        CreatedAt,
    }
}
