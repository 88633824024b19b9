use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Deal {
    Table,
    Id,
    Title,
    ValueCents,
    Stage,
    CompanyId,
    ContactId,
    ProductId,
    ContactHistory,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum DealStageEnum {
    #[sea_orm(iden = "deal_stage")]
    Table,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

const DEAL_STAGE_VALUES: &[&str] = &[
    "NO_CONTACT",
    "CONTACT_MADE",
    "INTEREST_IDENTIFIED",
    "PROPOSAL_SENT",
    "CLOSING",
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let create_enum_sql = format!(
            "DO $$ BEGIN IF NOT EXISTS (SELECT 1 FROM pg_type WHERE typname = 'deal_stage') THEN CREATE TYPE deal_stage AS ENUM ({}); END IF; END $$;",
            DEAL_STAGE_VALUES
                .iter()
                .map(|v| format!("'{}'", v))
                .collect::<Vec<_>>()
                .join(", ")
        );
        manager
            .get_connection()
            .execute_unprepared(&create_enum_sql)
            .await?;

        // Company/contact/product references carry no foreign keys: dangling
        // references survive parent deletes and are rendered as placeholders.
        manager
            .create_table(
                Table::create()
                    .table(Deal::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Deal::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(Deal::Title).string_len(300).not_null())
                    .col(ColumnDef::new(Deal::ValueCents).big_integer().not_null())
                    .col(
                        ColumnDef::new(Deal::Stage)
                            .custom(DealStageEnum::Table)
                            .not_null()
                            .default(Expr::cust("'NO_CONTACT'::deal_stage")),
                    )
                    .col(ColumnDef::new(Deal::CompanyId).uuid().not_null())
                    .col(ColumnDef::new(Deal::ContactId).uuid().not_null())
                    .col(ColumnDef::new(Deal::ProductId).uuid().not_null())
                    .col(
                        ColumnDef::new(Deal::ContactHistory)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(Deal::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(Deal::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_deal_stage")
                    .table(Deal::Table)
                    .col(Deal::Stage)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_deal_company")
                    .table(Deal::Table)
                    .col(Deal::CompanyId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Deal::Table).to_owned())
            .await?;
        manager
            .get_connection()
            .execute_unprepared("DROP TYPE IF EXISTS deal_stage;")
            .await?;
        Ok(())
    }
}
