use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "deal")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub title: String,
    pub value_cents: i64,
    pub stage: Stage,
    #[sea_orm(indexed)]
    pub company_id: Uuid,
    #[sea_orm(indexed)]
    pub contact_id: Uuid,
    #[sea_orm(indexed)]
    pub product_id: Uuid,
    #[sea_orm(column_type = "JsonBinary")]
    pub contact_history: ContactHistory,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Append-only log of human-readable contact events, stored as a JSON array
/// on the deal row so stage moves can update stage and history in one write.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult,
)]
pub struct ContactHistory(pub Vec<String>);

impl ContactHistory {
    pub fn push(&mut self, line: String) {
        self.0.push(line);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn lines(&self) -> &[String] {
        &self.0
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "deal_stage")]
pub enum Stage {
    #[sea_orm(string_value = "NO_CONTACT")]
    NoContact,
    #[sea_orm(string_value = "CONTACT_MADE")]
    ContactMade,
    #[sea_orm(string_value = "INTEREST_IDENTIFIED")]
    InterestIdentified,
    #[sea_orm(string_value = "PROPOSAL_SENT")]
    ProposalSent,
    #[sea_orm(string_value = "CLOSING")]
    Closing,
}

impl Stage {
    /// Pipeline order of the board columns.
    pub const ALL: [Stage; 5] = [
        Stage::NoContact,
        Stage::ContactMade,
        Stage::InterestIdentified,
        Stage::ProposalSent,
        Stage::Closing,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Stage::NoContact => "NO_CONTACT",
            Stage::ContactMade => "CONTACT_MADE",
            Stage::InterestIdentified => "INTEREST_IDENTIFIED",
            Stage::ProposalSent => "PROPOSAL_SENT",
            Stage::Closing => "CLOSING",
        }
    }

    /// Display title shown on column headers and in history lines.
    pub fn title(self) -> &'static str {
        match self {
            Stage::NoContact => "Sem Contato",
            Stage::ContactMade => "Contato Feito",
            Stage::InterestIdentified => "Interesse Identificado",
            Stage::ProposalSent => "Proposta Enviada",
            Stage::Closing => "Fechamento",
        }
    }
}
