use sea_orm_migration::prelude::*;

use super::m20240601_000002_create_posts::Posts;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tags::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tags::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Tags::Name).string().not_null().unique_key())
                    .col(ColumnDef::new(Tags::Slug).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Taggables::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Taggables::PostId).uuid().not_null())
                    .col(ColumnDef::new(Taggables::TagId).uuid().not_null())
                    .col(ColumnDef::new(Taggables::OrderColumn).integer().not_null().default(0))
                    .primary_key(
                        Index::create()
                            .col(Taggables::PostId)
                            .col(Taggables::TagId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_taggables_post_id")
                            .from(Taggables::Table, Taggables::PostId)
                            .to(Posts::Table, Posts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_taggables_tag_id")
                            .from(Taggables::Table, Taggables::TagId)
                            .to(Tags::Table, Tags::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Taggables::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tags::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Tags {
    Table,
    Id,
    Name,
    Slug,
}

#[derive(DeriveIden)]
enum Taggables {
    Table,
    PostId,
    TagId,
    OrderColumn,
}
