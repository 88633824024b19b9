pub use sea_orm_migration::prelude::*;

mod m20260110_000001_crm_base;
mod m20260110_120000_deal_pipeline;
mod m20260111_090000_deal_subrecords;

pub struct Migrator;
#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260110_000001_crm_base::Migration),
            Box::new(m20260110_120000_deal_pipeline::Migration),
            Box::new(m20260111_090000_deal_subrecords::Migration),
        ]
    }
}
