use sea_orm_migration::prelude::*;

use super::m20240601_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Posts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Posts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Posts::UserId).uuid().not_null())
                    .col(ColumnDef::new(Posts::Title).string().not_null())
                    .col(ColumnDef::new(Posts::Slug).string_len(50).not_null().unique_key())
                    .col(ColumnDef::new(Posts::Content).text().not_null())
                    .col(ColumnDef::new(Posts::Description).text().null())
                    .col(
                        ColumnDef::new(Posts::Publish)
                            .string_len(16)
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(Posts::Featured).boolean().not_null().default(false))
                    .col(ColumnDef::new(Posts::Views).big_integer().not_null().default(0))
                    .col(ColumnDef::new(Posts::Shares).big_integer().not_null().default(0))
                    .col(ColumnDef::new(Posts::Favorites).big_integer().not_null().default(0))
                    .col(ColumnDef::new(Posts::MetaTitle).string().null())
                    .col(
                        ColumnDef::new(Posts::MetaKeywords)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(ColumnDef::new(Posts::MetaDescription).text().null())
                    .col(ColumnDef::new(Posts::DeletedAt).timestamp_with_time_zone().null())
                    .col(
                        ColumnDef::new(Posts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Posts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_posts_user_id")
                            .from(Posts::Table, Posts::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Public listings, featured and latest all filter on these.
        manager
            .create_index(
                Index::create()
                    .name("idx_posts_publish_created_at")
                    .table(Posts::Table)
                    .col(Posts::Publish)
                    .col(Posts::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_posts_deleted_at")
                    .table(Posts::Table)
                    .col(Posts::DeletedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Posts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Posts {
    Table,
    Id,
    UserId,
    Title,
    Slug,
    Content,
    Description,
    Publish,
    Featured,
    Views,
    Shares,
    Favorites,
    MetaTitle,
    MetaKeywords,
    MetaDescription,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}
