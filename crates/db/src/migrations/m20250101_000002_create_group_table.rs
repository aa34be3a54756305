//! Create group table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PostGroup::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PostGroup::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PostGroup::Title).string_len(200).not_null())
                    .col(
                        ColumnDef::new(PostGroup::Slug)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(PostGroup::Description).text().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PostGroup::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PostGroup {
    Table,
    Id,
    Title,
    Slug,
    Description,
}
