use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Company {
    Table,
    Id,
    Name,
    Email,
    Phone,
    Website,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Contact {
    Table,
    Id,
    Name,
    CompanyId,
    Email,
    Phone,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Product {
    Table,
    Id,
    Name,
    PriceCents,
    Description,
    Builder,
    SizeM2,
    Rooms,
    Position,
    PricePerSqmCents,
    Location,
    DeliveryDate,
    Unit,
    Floor,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Broker {
    Table,
    Id,
    Name,
    Email,
    Phone,
    PhotoUrl,
    Role,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Company::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Company::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(Company::Name).string_len(256).not_null())
                    .col(ColumnDef::new(Company::Email).string_len(320))
                    .col(ColumnDef::new(Company::Phone).string_len(64))
                    .col(ColumnDef::new(Company::Website).string_len(512))
                    .col(
                        ColumnDef::new(Company::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(Company::UpdatedAt)
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
                    .name("idx_company_name")
                    .table(Company::Table)
                    .col(Company::Name)
                    .to_owned(),
            )
            .await?;

        // No foreign key to company: the store intentionally tolerates
        // dangling references after a company delete (readers degrade to a
        // placeholder label instead of failing the view).
        manager
            .create_table(
                Table::create()
                    .table(Contact::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Contact::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(Contact::Name).string_len(256).not_null())
                    .col(ColumnDef::new(Contact::CompanyId).uuid().not_null())
                    .col(ColumnDef::new(Contact::Email).string_len(320))
                    .col(ColumnDef::new(Contact::Phone).string_len(64))
                    .col(
                        ColumnDef::new(Contact::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(Contact::UpdatedAt)
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
                    .name("idx_contact_company")
                    .table(Contact::Table)
                    .col(Contact::CompanyId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Product::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Product::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(Product::Name).string_len(256).not_null())
                    .col(ColumnDef::new(Product::PriceCents).big_integer().not_null())
                    .col(ColumnDef::new(Product::Description).text())
                    .col(ColumnDef::new(Product::Builder).string_len(256))
                    .col(ColumnDef::new(Product::SizeM2).integer())
                    .col(ColumnDef::new(Product::Rooms).string_len(64))
                    .col(ColumnDef::new(Product::Position).string_len(64))
                    .col(ColumnDef::new(Product::PricePerSqmCents).big_integer())
                    .col(ColumnDef::new(Product::Location).string_len(256))
                    .col(ColumnDef::new(Product::DeliveryDate).string_len(64))
                    .col(ColumnDef::new(Product::Unit).string_len(64))
                    .col(ColumnDef::new(Product::Floor).string_len(64))
                    .col(
                        ColumnDef::new(Product::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(Product::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Broker::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Broker::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(Broker::Name).string_len(256).not_null())
                    .col(ColumnDef::new(Broker::Email).string_len(320).not_null())
                    .col(ColumnDef::new(Broker::Phone).string_len(64))
                    .col(ColumnDef::new(Broker::PhotoUrl).string_len(512))
                    .col(
                        ColumnDef::new(Broker::Role)
                            .string_len(16)
                            .not_null()
                            .default("BROKER"),
                    )
                    .col(
                        ColumnDef::new(Broker::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(Broker::UpdatedAt)
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
                    .name("idx_broker_email")
                    .table(Broker::Table)
                    .col(Broker::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Broker::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Product::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Contact::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Company::Table).to_owned())
            .await
    }
}
