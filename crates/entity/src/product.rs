use sea_orm::entity::prelude::*;

/// A listing in the brokerage's catalogue. Everything beyond name and price
/// is optional descriptive data imported from builder spreadsheets.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "product")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub name: String,
    pub price_cents: i64,
    pub description: Option<String>,
    pub builder: Option<String>,
    pub size_m2: Option<i32>,
    pub rooms: Option<String>,
    pub position: Option<String>,
    pub price_per_sqm_cents: Option<i64>,
    pub location: Option<String>,
    pub delivery_date: Option<String>,
    pub unit: Option<String>,
    pub floor: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
