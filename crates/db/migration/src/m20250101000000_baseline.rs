use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Users::Table)
                    .col(pk_id_col(manager, Users::Id))
                    .col(uuid_col(Users::Uuid))
                    .col(ColumnDef::new(Users::Email).string().not_null())
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .col(ColumnDef::new(Users::Profile).string_len(32).not_null())
                    .col(timestamp_col(Users::CreatedAt))
                    .col(timestamp_col(Users::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_users_uuid")
                    .table(Users::Table)
                    .col(Users::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_users_email")
                    .table(Users::Table)
                    .col(Users::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Tickets::Table)
                    .col(pk_id_col(manager, Tickets::Id))
                    .col(uuid_col(Tickets::Uuid))
                    .col(ColumnDef::new(Tickets::Number).big_integer().not_null())
                    .col(ColumnDef::new(Tickets::Title).string().not_null())
                    .col(ColumnDef::new(Tickets::Description).text())
                    .col(
                        ColumnDef::new(Tickets::Status)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("New")),
                    )
                    .col(
                        ColumnDef::new(Tickets::Priority)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("Normal")),
                    )
                    .col(timestamp_col(Tickets::Date))
                    .col(fk_id_col(manager, Tickets::UserId))
                    .col(fk_id_nullable_col(manager, Tickets::AssignedUserId))
                    .col(timestamp_col(Tickets::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tickets_user_id")
                            .from(Tickets::Table, Tickets::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tickets_assigned_user_id")
                            .from(Tickets::Table, Tickets::AssignedUserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tickets_uuid")
                    .table(Tickets::Table)
                    .col(Tickets::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        for (name, column) in [
            ("idx_tickets_user_id", Tickets::UserId),
            ("idx_tickets_assigned_user_id", Tickets::AssignedUserId),
            ("idx_tickets_status", Tickets::Status),
            ("idx_tickets_number", Tickets::Number),
        ] {
            manager
                .create_index(
                    Index::create().if_not_exists()
                        .name(name)
                        .table(Tickets::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(ChangeStatuses::Table)
                    .col(pk_id_col(manager, ChangeStatuses::Id))
                    .col(uuid_col(ChangeStatuses::Uuid))
                    .col(fk_id_col(manager, ChangeStatuses::TicketId))
                    .col(fk_id_col(manager, ChangeStatuses::UserId))
                    .col(ColumnDef::new(ChangeStatuses::Status).string_len(32).not_null())
                    .col(timestamp_col(ChangeStatuses::DateChangeStatus))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_change_statuses_ticket_id")
                            .from(ChangeStatuses::Table, ChangeStatuses::TicketId)
                            .to(Tickets::Table, Tickets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_change_statuses_user_id")
                            .from(ChangeStatuses::Table, ChangeStatuses::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_change_statuses_uuid")
                    .table(ChangeStatuses::Table)
                    .col(ChangeStatuses::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_change_statuses_ticket_id")
                    .table(ChangeStatuses::Table)
                    .col(ChangeStatuses::TicketId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChangeStatuses::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tickets::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

fn pk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().auto_increment().primary_key().to_owned()
}

fn fk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().to_owned()
}

fn fk_id_nullable_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.to_owned()
}

fn uuid_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col).uuid().not_null().to_owned()
}

fn timestamp_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Uuid,
    Email,
    Password,
    Profile,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Tickets {
    Table,
    Id,
    Uuid,
    Number,
    Title,
    Description,
    Status,
    Priority,
    Date,
    UserId,
    AssignedUserId,
    UpdatedAt,
}

#[derive(Iden)]
enum ChangeStatuses {
    Table,
    Id,
    Uuid,
    TicketId,
    UserId,
    Status,
    DateChangeStatus,
}
