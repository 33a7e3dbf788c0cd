use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_classification_tables::Migration),
            Box::new(m20240301_000002_create_work_orders_table::Migration),
        ]
    }
}

mod m20240301_000001_create_classification_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_classification_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(classification_table(
                    Laboratories::Table,
                    Laboratories::Id,
                    Laboratories::Name,
                ))
                .await?;
            manager
                .create_table(classification_table(
                    Departments::Table,
                    Departments::Id,
                    Departments::Name,
                ))
                .await?;
            manager
                .create_table(classification_table(
                    ProductionLines::Table,
                    ProductionLines::Id,
                    ProductionLines::Name,
                ))
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SizeTemplates::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SizeTemplates::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(SizeTemplates::Name).string().not_null())
                        .col(ColumnDef::new(SizeTemplates::Labels).json().not_null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SizeTemplates::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductionLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Departments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Laboratories::Table).to_owned())
                .await
        }
    }

    /// `(id, name)` lookup table.
    fn classification_table(
        table: impl IntoIden + 'static,
        id: impl IntoIden + 'static,
        name: impl IntoIden + 'static,
    ) -> TableCreateStatement {
        Table::create()
            .table(table)
            .if_not_exists()
            .col(
                ColumnDef::new(id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(name).string().not_null())
            .to_owned()
    }

    #[derive(DeriveIden)]
    pub enum Laboratories {
        Table,
        Id,
        Name,
    }

    #[derive(DeriveIden)]
    pub enum Departments {
        Table,
        Id,
        Name,
    }

    #[derive(DeriveIden)]
    pub enum ProductionLines {
        Table,
        Id,
        Name,
    }

    #[derive(DeriveIden)]
    pub enum SizeTemplates {
        Table,
        Id,
        Name,
        Labels,
    }
}

mod m20240301_000002_create_work_orders_table {

    use super::m20240301_000001_create_classification_tables::{
        Departments, Laboratories, ProductionLines, SizeTemplates,
    };
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_work_orders_table"
        }
    }

    const BUCKET_COLUMNS: [&str; 20] = [
        "p01", "p02", "p03", "p04", "p05", "p06", "p07", "p08", "p09", "p10", "p11", "p12",
        "p13", "p14", "p15", "p16", "p17", "p18", "p19", "p20",
    ];

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut table = Table::create();
            table
                .table(WorkOrders::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(WorkOrders::Id)
                        .integer()
                        .not_null()
                        .auto_increment()
                        .primary_key(),
                )
                .col(ColumnDef::new(WorkOrders::Kind).string_len(32).not_null())
                .col(ColumnDef::new(WorkOrders::DisplayId).string_len(32).not_null())
                .col(ColumnDef::new(WorkOrders::LaboratoryId).integer().null())
                .col(ColumnDef::new(WorkOrders::DepartmentId).integer().null())
                .col(ColumnDef::new(WorkOrders::LineId).integer().null())
                .col(ColumnDef::new(WorkOrders::SizeTemplateId).integer().null())
                .col(ColumnDef::new(WorkOrders::Article).string().null())
                .col(ColumnDef::new(WorkOrders::Reason).text().null())
                .col(ColumnDef::new(WorkOrders::Notes).text().null());

            for bucket in BUCKET_COLUMNS {
                table.col(
                    ColumnDef::new(Alias::new(bucket))
                        .integer()
                        .not_null()
                        .default(0),
                );
            }

            table
                .col(
                    ColumnDef::new(WorkOrders::TotalQuantity)
                        .big_integer()
                        .not_null()
                        .default(0),
                )
                .col(
                    ColumnDef::new(WorkOrders::Completed)
                        .boolean()
                        .not_null()
                        .default(false),
                )
                .col(
                    ColumnDef::new(WorkOrders::ClosedAt)
                        .timestamp_with_time_zone()
                        .null(),
                )
                .col(
                    ColumnDef::new(WorkOrders::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(WorkOrders::UpdatedAt)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_work_orders_laboratory_id")
                        .from(WorkOrders::Table, WorkOrders::LaboratoryId)
                        .to(Laboratories::Table, Laboratories::Id)
                        .on_delete(ForeignKeyAction::SetNull),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_work_orders_department_id")
                        .from(WorkOrders::Table, WorkOrders::DepartmentId)
                        .to(Departments::Table, Departments::Id)
                        .on_delete(ForeignKeyAction::SetNull),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_work_orders_line_id")
                        .from(WorkOrders::Table, WorkOrders::LineId)
                        .to(ProductionLines::Table, ProductionLines::Id)
                        .on_delete(ForeignKeyAction::SetNull),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_work_orders_size_template_id")
                        .from(WorkOrders::Table, WorkOrders::SizeTemplateId)
                        .to(SizeTemplates::Table, SizeTemplates::Id)
                        .on_delete(ForeignKeyAction::SetNull),
                );

            manager.create_table(table.to_owned()).await?;

            // Display ids are sequenced per kind; this index is what turns a
            // concurrent duplicate into a unique-constraint error.
            manager
                .create_index(
                    Index::create()
                        .name("idx_work_orders_kind_display_id")
                        .table(WorkOrders::Table)
                        .col(WorkOrders::Kind)
                        .col(WorkOrders::DisplayId)
                        .unique()
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_work_orders_completed")
                        .table(WorkOrders::Table)
                        .col(WorkOrders::Completed)
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WorkOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum WorkOrders {
        Table,
        Id,
        Kind,
        DisplayId,
        LaboratoryId,
        DepartmentId,
        LineId,
        SizeTemplateId,
        Article,
        Reason,
        Notes,
        TotalQuantity,
        Completed,
        ClosedAt,
        CreatedAt,
        UpdatedAt,
    }
}
