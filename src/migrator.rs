use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_users_table::Migration),
            Box::new(m20250101_000002_create_catalog_tables::Migration),
            Box::new(m20250101_000003_create_material_tables::Migration),
            Box::new(m20250101_000004_create_order_tables::Migration),
            Box::new(m20250101_000005_create_ledger_and_incident_tables::Migration),
        ]
    }
}

const ROLES: [&str; 5] = ["director", "manager", "designer", "master", "assistant"];

const ORDER_STATUSES: [&str; 10] = [
    "created",
    "design",
    "design_done",
    "production",
    "printed",
    "postprocess",
    "ready",
    "closed",
    "cancelled",
    "defect",
];

const LEDGER_ACTIONS: [&str; 6] = [
    "receive",
    "reserve",
    "unreserve",
    "consume",
    "correction",
    "defect",
];

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    PasswordHash,
    FullName,
    Role,
    Phone,
    IsActive,
    Lang,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Services {
    Table,
    Id,
    Code,
    NameRu,
    NameKy,
    Category,
    Unit,
    PriceRetail,
    PriceDealer,
    CostPrice,
    MinOrder,
    Options,
    IsActive,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PriceHistory {
    Table,
    Id,
    ServiceId,
    PriceRetail,
    PriceDealer,
    ChangedBy,
    ChangedAt,
}

#[derive(DeriveIden)]
enum Materials {
    Table,
    Id,
    Code,
    NameRu,
    NameKy,
    Unit,
    Quantity,
    Reserved,
    LowThreshold,
    RollSize,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ServiceMaterialMap {
    Table,
    ServiceId,
    MaterialId,
    Ratio,
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    OrderNumber,
    ClientName,
    ClientPhone,
    ClientType,
    Status,
    TotalPrice,
    MaterialCost,
    Notes,
    DesignFile,
    PhotoFile,
    AssignedDesigner,
    AssignedMaster,
    AssignedAssistant,
    Deadline,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum OrderItems {
    Table,
    Id,
    OrderId,
    ServiceId,
    MaterialId,
    Quantity,
    Width,
    Height,
    UnitPrice,
    Total,
    MaterialQty,
    Options,
}

#[derive(DeriveIden)]
enum OrderHistory {
    Table,
    Id,
    OrderId,
    OldStatus,
    NewStatus,
    ChangedBy,
    Note,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ClientNotifications {
    Table,
    Id,
    OrderId,
    Channel,
    Message,
    Status,
    CreatedAt,
    SentAt,
}

#[derive(DeriveIden)]
enum MaterialLedger {
    Table,
    Id,
    MaterialId,
    OrderId,
    Action,
    Quantity,
    Note,
    PerformedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Incidents {
    Table,
    Id,
    UserId,
    Type,
    Description,
    OrderId,
    MaterialWaste,
    DeductionAmount,
    Status,
    CreatedBy,
    CreatedAt,
}

fn id_column<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name)
        .integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

fn money_column<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name)
        .decimal_len(14, 2)
        .not_null()
        .default(0)
        .to_owned()
}

fn quantity_column<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name)
        .decimal_len(14, 4)
        .not_null()
        .default(0)
        .to_owned()
}

fn created_at_column<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name)
        .timestamp_with_time_zone()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

mod m20250101_000001_create_users_table {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_users_table"
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
                        .col(id_column(Users::Id))
                        .col(
                            ColumnDef::new(Users::Username)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::FullName).string().not_null())
                        .col(
                            ColumnDef::new(Users::Role)
                                .string_len(20)
                                .not_null()
                                .check(Expr::col(Users::Role).is_in(ROLES)),
                        )
                        .col(ColumnDef::new(Users::Phone).string_len(32))
                        .col(
                            ColumnDef::new(Users::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Users::Lang)
                                .string_len(2)
                                .not_null()
                                .default("ru")
                                .check(Expr::col(Users::Lang).is_in(["ru", "ky"])),
                        )
                        .col(created_at_column(Users::CreatedAt))
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
}

mod m20250101_000002_create_catalog_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Services::Table)
                        .if_not_exists()
                        .col(id_column(Services::Id))
                        .col(
                            ColumnDef::new(Services::Code)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Services::NameRu).string().not_null())
                        .col(ColumnDef::new(Services::NameKy).string().not_null().default(""))
                        .col(ColumnDef::new(Services::Category).string_len(64).not_null())
                        .col(ColumnDef::new(Services::Unit).string_len(16).not_null())
                        .col(money_column(Services::PriceRetail))
                        .col(money_column(Services::PriceDealer))
                        .col(money_column(Services::CostPrice))
                        .col(
                            ColumnDef::new(Services::MinOrder)
                                .decimal_len(14, 4)
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(Services::Options).json())
                        .col(
                            ColumnDef::new(Services::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(created_at_column(Services::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PriceHistory::Table)
                        .if_not_exists()
                        .col(id_column(PriceHistory::Id))
                        .col(ColumnDef::new(PriceHistory::ServiceId).integer().not_null())
                        .col(money_column(PriceHistory::PriceRetail))
                        .col(money_column(PriceHistory::PriceDealer))
                        .col(ColumnDef::new(PriceHistory::ChangedBy).integer().not_null())
                        .col(created_at_column(PriceHistory::ChangedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_price_history_service")
                                .from(PriceHistory::Table, PriceHistory::ServiceId)
                                .to(Services::Table, Services::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_price_history_user")
                                .from(PriceHistory::Table, PriceHistory::ChangedBy)
                                .to(Users::Table, Users::Id),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PriceHistory::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Services::Table).to_owned())
                .await
        }
    }
}

mod m20250101_000003_create_material_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000003_create_material_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Materials::Table)
                        .if_not_exists()
                        .col(id_column(Materials::Id))
                        .col(
                            ColumnDef::new(Materials::Code)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Materials::NameRu).string().not_null())
                        .col(ColumnDef::new(Materials::NameKy).string().not_null().default(""))
                        .col(ColumnDef::new(Materials::Unit).string_len(16).not_null())
                        .col(quantity_column(Materials::Quantity))
                        .col(quantity_column(Materials::Reserved))
                        .col(
                            ColumnDef::new(Materials::LowThreshold)
                                .decimal_len(14, 4)
                                .not_null()
                                .default(10),
                        )
                        .col(
                            ColumnDef::new(Materials::RollSize)
                                .decimal_len(14, 4)
                                .not_null()
                                .default(50),
                        )
                        .col(created_at_column(Materials::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ServiceMaterialMap::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ServiceMaterialMap::ServiceId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ServiceMaterialMap::MaterialId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ServiceMaterialMap::Ratio)
                                .decimal_len(14, 4)
                                .not_null()
                                .default(1),
                        )
                        .primary_key(
                            Index::create()
                                .col(ServiceMaterialMap::ServiceId)
                                .col(ServiceMaterialMap::MaterialId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_service_material_service")
                                .from(ServiceMaterialMap::Table, ServiceMaterialMap::ServiceId)
                                .to(Services::Table, Services::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_service_material_material")
                                .from(ServiceMaterialMap::Table, ServiceMaterialMap::MaterialId)
                                .to(Materials::Table, Materials::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ServiceMaterialMap::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Materials::Table).to_owned())
                .await
        }
    }
}

mod m20250101_000004_create_order_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000004_create_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(id_column(Orders::Id))
                        .col(
                            ColumnDef::new(Orders::OrderNumber)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Orders::ClientName).string().not_null())
                        .col(ColumnDef::new(Orders::ClientPhone).string_len(32).not_null().default(""))
                        .col(
                            ColumnDef::new(Orders::ClientType)
                                .string_len(10)
                                .not_null()
                                .default("retail")
                                .check(Expr::col(Orders::ClientType).is_in(["retail", "dealer"])),
                        )
                        .col(
                            ColumnDef::new(Orders::Status)
                                .string_len(20)
                                .not_null()
                                .default("created")
                                .check(Expr::col(Orders::Status).is_in(ORDER_STATUSES)),
                        )
                        .col(money_column(Orders::TotalPrice))
                        .col(money_column(Orders::MaterialCost))
                        .col(ColumnDef::new(Orders::Notes).text().not_null().default(""))
                        .col(ColumnDef::new(Orders::DesignFile).string())
                        .col(ColumnDef::new(Orders::PhotoFile).string())
                        .col(ColumnDef::new(Orders::AssignedDesigner).integer())
                        .col(ColumnDef::new(Orders::AssignedMaster).integer())
                        .col(ColumnDef::new(Orders::AssignedAssistant).integer())
                        .col(ColumnDef::new(Orders::Deadline).string_len(32))
                        .col(ColumnDef::new(Orders::CreatedBy).integer().not_null())
                        .col(created_at_column(Orders::CreatedAt))
                        .col(created_at_column(Orders::UpdatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_created_by")
                                .from(Orders::Table, Orders::CreatedBy)
                                .to(Users::Table, Users::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_designer")
                                .from(Orders::Table, Orders::AssignedDesigner)
                                .to(Users::Table, Users::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_master")
                                .from(Orders::Table, Orders::AssignedMaster)
                                .to(Users::Table, Users::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_assistant")
                                .from(Orders::Table, Orders::AssignedAssistant)
                                .to(Users::Table, Users::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_created_at")
                        .table(Orders::Table)
                        .col(Orders::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(id_column(OrderItems::Id))
                        .col(ColumnDef::new(OrderItems::OrderId).integer().not_null())
                        .col(ColumnDef::new(OrderItems::ServiceId).integer().not_null())
                        .col(ColumnDef::new(OrderItems::MaterialId).integer())
                        .col(quantity_column(OrderItems::Quantity))
                        .col(ColumnDef::new(OrderItems::Width).decimal_len(14, 4))
                        .col(ColumnDef::new(OrderItems::Height).decimal_len(14, 4))
                        .col(money_column(OrderItems::UnitPrice))
                        .col(money_column(OrderItems::Total))
                        .col(quantity_column(OrderItems::MaterialQty))
                        .col(ColumnDef::new(OrderItems::Options).json())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_service")
                                .from(OrderItems::Table, OrderItems::ServiceId)
                                .to(Services::Table, Services::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_material")
                                .from(OrderItems::Table, OrderItems::MaterialId)
                                .to(Materials::Table, Materials::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderHistory::Table)
                        .if_not_exists()
                        .col(id_column(OrderHistory::Id))
                        .col(ColumnDef::new(OrderHistory::OrderId).integer().not_null())
                        .col(
                            ColumnDef::new(OrderHistory::OldStatus)
                                .string_len(20)
                                .check(Expr::col(OrderHistory::OldStatus).is_in(ORDER_STATUSES)),
                        )
                        .col(
                            ColumnDef::new(OrderHistory::NewStatus)
                                .string_len(20)
                                .not_null()
                                .check(Expr::col(OrderHistory::NewStatus).is_in(ORDER_STATUSES)),
                        )
                        .col(ColumnDef::new(OrderHistory::ChangedBy).integer().not_null())
                        .col(ColumnDef::new(OrderHistory::Note).text().not_null().default(""))
                        .col(created_at_column(OrderHistory::CreatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_history_order")
                                .from(OrderHistory::Table, OrderHistory::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_history_user")
                                .from(OrderHistory::Table, OrderHistory::ChangedBy)
                                .to(Users::Table, Users::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ClientNotifications::Table)
                        .if_not_exists()
                        .col(id_column(ClientNotifications::Id))
                        .col(
                            ColumnDef::new(ClientNotifications::OrderId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ClientNotifications::Channel)
                                .string_len(32)
                                .not_null()
                                .default("manual"),
                        )
                        .col(ColumnDef::new(ClientNotifications::Message).text().not_null())
                        .col(
                            ColumnDef::new(ClientNotifications::Status)
                                .string_len(16)
                                .not_null()
                                .default("queued")
                                .check(
                                    Expr::col(ClientNotifications::Status)
                                        .is_in(["queued", "sent", "failed"]),
                                ),
                        )
                        .col(created_at_column(ClientNotifications::CreatedAt))
                        .col(ColumnDef::new(ClientNotifications::SentAt).timestamp_with_time_zone())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_client_notifications_order")
                                .from(ClientNotifications::Table, ClientNotifications::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            for table in [
                ClientNotifications::Table.into_iden(),
                OrderHistory::Table.into_iden(),
                OrderItems::Table.into_iden(),
                Orders::Table.into_iden(),
            ] {
                manager
                    .drop_table(Table::drop().table(table).to_owned())
                    .await?;
            }
            Ok(())
        }
    }
}

mod m20250101_000005_create_ledger_and_incident_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000005_create_ledger_and_incident_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(MaterialLedger::Table)
                        .if_not_exists()
                        .col(id_column(MaterialLedger::Id))
                        .col(ColumnDef::new(MaterialLedger::MaterialId).integer().not_null())
                        .col(ColumnDef::new(MaterialLedger::OrderId).integer())
                        .col(
                            ColumnDef::new(MaterialLedger::Action)
                                .string_len(20)
                                .not_null()
                                .check(Expr::col(MaterialLedger::Action).is_in(LEDGER_ACTIONS)),
                        )
                        .col(
                            ColumnDef::new(MaterialLedger::Quantity)
                                .decimal_len(14, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(MaterialLedger::Note).text().not_null().default(""))
                        .col(ColumnDef::new(MaterialLedger::PerformedBy).integer().not_null())
                        .col(created_at_column(MaterialLedger::CreatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_material_ledger_material")
                                .from(MaterialLedger::Table, MaterialLedger::MaterialId)
                                .to(Materials::Table, Materials::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_material_ledger_order")
                                .from(MaterialLedger::Table, MaterialLedger::OrderId)
                                .to(Orders::Table, Orders::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_material_ledger_user")
                                .from(MaterialLedger::Table, MaterialLedger::PerformedBy)
                                .to(Users::Table, Users::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_material_ledger_material")
                        .table(MaterialLedger::Table)
                        .col(MaterialLedger::MaterialId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Incidents::Table)
                        .if_not_exists()
                        .col(id_column(Incidents::Id))
                        .col(ColumnDef::new(Incidents::UserId).integer().not_null())
                        .col(
                            ColumnDef::new(Incidents::Type)
                                .string_len(16)
                                .not_null()
                                .check(
                                    Expr::col(Incidents::Type)
                                        .is_in(["defect", "late", "complaint", "other"]),
                                ),
                        )
                        .col(ColumnDef::new(Incidents::Description).text().not_null())
                        .col(ColumnDef::new(Incidents::OrderId).integer())
                        .col(quantity_column(Incidents::MaterialWaste))
                        .col(money_column(Incidents::DeductionAmount))
                        .col(
                            ColumnDef::new(Incidents::Status)
                                .string_len(16)
                                .not_null()
                                .default("pending")
                                .check(
                                    Expr::col(Incidents::Status)
                                        .is_in(["pending", "reviewed"]),
                                ),
                        )
                        .col(ColumnDef::new(Incidents::CreatedBy).integer().not_null())
                        .col(created_at_column(Incidents::CreatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_incidents_user")
                                .from(Incidents::Table, Incidents::UserId)
                                .to(Users::Table, Users::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_incidents_order")
                                .from(Incidents::Table, Incidents::OrderId)
                                .to(Orders::Table, Orders::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_incidents_created_by")
                                .from(Incidents::Table, Incidents::CreatedBy)
                                .to(Users::Table, Users::Id),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Incidents::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(MaterialLedger::Table).to_owned())
                .await
        }
    }
}
