use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_query::{ColumnDef, ForeignKeyAction, Index, Table};

#[derive(DeriveMigrationName)]
pub struct Migration;

// ----- Iden enums for tables & columns -----
#[derive(Iden)]
enum Users {
    Table,
    Id,
    Email,
    Username,
    PasswordHash,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum MovieHistory {
    Table,
    Id,
    UserId,
    MovieId,
    Title,
    WatchedAt,
}

#[derive(Iden)]
enum Watchlist {
    Table,
    Id,
    UserId,
    MovieId,
    Title,
    AddedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // users
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::Email).string().not_null())
                    .col(ColumnDef::new(Users::Username).string().not_null())
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Users::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ux_users_email")
                    .table(Users::Table)
                    .col(Users::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // movie_history
        manager
            .create_table(
                Table::create()
                    .table(MovieHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MovieHistory::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MovieHistory::UserId).uuid().not_null())
                    .col(ColumnDef::new(MovieHistory::MovieId).integer().not_null())
                    .col(ColumnDef::new(MovieHistory::Title).string().not_null())
                    .col(
                        ColumnDef::new(MovieHistory::WatchedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_history_user_id")
                            .from(MovieHistory::Table, MovieHistory::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_movie_history_user_watched")
                    .table(MovieHistory::Table)
                    .col(MovieHistory::UserId)
                    .col(MovieHistory::WatchedAt)
                    .to_owned(),
            )
            .await?;

        // watchlist
        manager
            .create_table(
                Table::create()
                    .table(Watchlist::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Watchlist::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Watchlist::UserId).uuid().not_null())
                    .col(ColumnDef::new(Watchlist::MovieId).integer().not_null())
                    .col(ColumnDef::new(Watchlist::Title).string().not_null())
                    .col(
                        ColumnDef::new(Watchlist::AddedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_watchlist_user_id")
                            .from(Watchlist::Table, Watchlist::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // a movie appears at most once per watchlist
        manager
            .create_index(
                Index::create()
                    .name("ux_watchlist_user_movie")
                    .table(Watchlist::Table)
                    .col(Watchlist::UserId)
                    .col(Watchlist::MovieId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // drop in reverse order + drop index before table
        manager
            .drop_index(
                Index::drop()
                    .name("ux_watchlist_user_movie")
                    .table(Watchlist::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Watchlist::Table).to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("ix_movie_history_user_watched")
                    .table(MovieHistory::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(MovieHistory::Table).to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("ux_users_email")
                    .table(Users::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}
