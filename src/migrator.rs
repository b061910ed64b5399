use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_components_table::Migration),
            Box::new(m20260101_000002_create_session_tables::Migration),
            Box::new(m20260101_000003_create_count_history_table::Migration),
            Box::new(m20260101_000004_create_high_volume_skus_table::Migration),
        ]
    }
}

mod m20260101_000001_create_components_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000001_create_components_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Components::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Components::Id)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Components::Barcode)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Components::Description)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(&mut quantity(Components::MtdQuantity))
                        .col(&mut quantity(Components::FtpQuantity))
                        .col(&mut quantity(Components::HstdQuantity))
                        .col(&mut quantity(Components::TplQuantity))
                        .col(&mut quantity(Components::QuarantineQuantity))
                        .col(&mut quantity(Components::TotalQuantity))
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Components::Table).to_owned())
                .await
        }
    }

    fn quantity(column: Components) -> ColumnDef {
        ColumnDef::new(column)
            .integer()
            .not_null()
            .default(0)
            .to_owned()
    }

    #[derive(DeriveIden)]
    enum Components {
        Table,
        Id,
        Barcode,
        Description,
        MtdQuantity,
        FtpQuantity,
        HstdQuantity,
        TplQuantity,
        QuarantineQuantity,
        TotalQuantity,
    }
}

mod m20260101_000002_create_session_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000002_create_session_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CycleCounts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CycleCounts::Id)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(CycleCounts::Location).string().not_null())
                        .col(
                            ColumnDef::new(CycleCounts::StartDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CycleCounts::LastUpdated)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CycleCounts::Progress).text().not_null())
                        .col(
                            ColumnDef::new(CycleCounts::Completed)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(WeeklyCounts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WeeklyCounts::Id)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(WeeklyCounts::Location).string().not_null())
                        .col(ColumnDef::new(WeeklyCounts::Day).string().not_null())
                        .col(
                            ColumnDef::new(WeeklyCounts::StartDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WeeklyCounts::LastUpdated)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WeeklyCounts::Progress).text().not_null())
                        .col(
                            ColumnDef::new(WeeklyCounts::Completed)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_cycle_counts_location")
                        .table(CycleCounts::Table)
                        .col(CycleCounts::Location)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_weekly_counts_location")
                        .table(WeeklyCounts::Table)
                        .col(WeeklyCounts::Location)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WeeklyCounts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(CycleCounts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum CycleCounts {
        Table,
        Id,
        Location,
        StartDate,
        LastUpdated,
        Progress,
        Completed,
    }

    #[derive(DeriveIden)]
    enum WeeklyCounts {
        Table,
        Id,
        Location,
        Day,
        StartDate,
        LastUpdated,
        Progress,
        Completed,
    }
}

mod m20260101_000003_create_count_history_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000003_create_count_history_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CountHistory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CountHistory::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(CountHistory::Barcode).string().not_null())
                        .col(ColumnDef::new(CountHistory::Quantity).integer().not_null())
                        .col(ColumnDef::new(CountHistory::CountType).string().not_null())
                        .col(ColumnDef::new(CountHistory::SessionId).string().not_null())
                        .col(
                            ColumnDef::new(CountHistory::Timestamp)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CountHistory::Actor).string().not_null())
                        .col(ColumnDef::new(CountHistory::Source).string().not_null())
                        .col(ColumnDef::new(CountHistory::Location).string().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_count_history_barcode_location")
                        .table(CountHistory::Table)
                        .col(CountHistory::Barcode)
                        .col(CountHistory::Location)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_count_history_timestamp")
                        .table(CountHistory::Table)
                        .col(CountHistory::Timestamp)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CountHistory::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum CountHistory {
        Table,
        Id,
        Barcode,
        Quantity,
        CountType,
        SessionId,
        Timestamp,
        Actor,
        Source,
        Location,
    }
}

mod m20260101_000004_create_high_volume_skus_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000004_create_high_volume_skus_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(HighVolumeSkus::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(HighVolumeSkus::Id)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(HighVolumeSkus::Sku).string().not_null())
                        .col(ColumnDef::new(HighVolumeSkus::Day).string().not_null())
                        .col(ColumnDef::new(HighVolumeSkus::Location).string().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_high_volume_skus_day_location")
                        .table(HighVolumeSkus::Table)
                        .col(HighVolumeSkus::Day)
                        .col(HighVolumeSkus::Location)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(HighVolumeSkus::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum HighVolumeSkus {
        Table,
        Id,
        Sku,
        Day,
        Location,
    }
}
