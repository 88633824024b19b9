use std::{collections::HashMap, sync::Arc};

use async_graphql::{
    Context, EmptySubscription, Enum, Error, ErrorExtensions, InputObject, Object, Schema,
    SimpleObject, ID,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use entity::{broker, company, contact, deal, note, product, task};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::info_span;
use uuid::Uuid;

use crate::auth::CurrentBroker;
use crate::board::partition_by_stage;
use crate::money::format_brl;
use crate::oracle::{SuggestionOracle, SuggestionRequest};

pub struct AppSchema(pub Schema<QueryRoot, MutationRoot, EmptySubscription>);

pub fn build_schema(
    db: Arc<DatabaseConnection>,
    oracle: Arc<dyn SuggestionOracle>,
) -> AppSchema {
    let schema = Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(db)
        .data(oracle)
        .finish();
    AppSchema(schema)
}

pub struct QueryRoot;
pub struct MutationRoot;

/// Label rendered when a deal references a company/contact/product that has
/// since been deleted; the store keeps the dangling id on purpose.
const MISSING_REF_LABEL: &str = "Não encontrado";

#[Object]
impl QueryRoot {
    async fn crm(&self) -> CrmQuery {
        CrmQuery
    }
}

#[Object]
impl MutationRoot {
    async fn crm(&self) -> CrmMutation {
        CrmMutation
    }
}

#[derive(Default)]
pub struct CrmQuery;

#[derive(Default)]
pub struct CrmMutation;

#[Object]
impl CrmQuery {
    /// The five pipeline columns in board order, with display titles.
    async fn stages(&self) -> Vec<PipelineStageNode> {
        deal::Stage::ALL
            .iter()
            .map(|stage| PipelineStageNode::from(*stage))
            .collect()
    }

    #[graphql(name = "pipelineBoard")]
    async fn pipeline_board(&self, ctx: &Context<'_>) -> async_graphql::Result<PipelineBoardNode> {
        let db = database(ctx)?;
        let span = info_span!("crm.pipelineBoard");
        let _guard = span.enter();

        let deals = deal::Entity::find()
            .order_by_asc(deal::Column::CreatedAt)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        let companies: HashMap<Uuid, company::Model> = company::Entity::find()
            .all(db.as_ref())
            .await
            .map_err(db_error)?
            .into_iter()
            .map(|model| (model.id, model))
            .collect();
        let contacts: HashMap<Uuid, contact::Model> = contact::Entity::find()
            .all(db.as_ref())
            .await
            .map_err(db_error)?
            .into_iter()
            .map(|model| (model.id, model))
            .collect();

        let mut columns = Vec::with_capacity(deal::Stage::ALL.len());
        let mut total_count = 0;
        let mut total_value_cents = 0;
        for (stage, stage_deals) in partition_by_stage(deals) {
            let cards: Vec<DealCardNode> = stage_deals
                .into_iter()
                .map(|model| DealCardNode::build(model, &companies, &contacts))
                .collect();
            total_count += cards.len() as i32;
            let column_value: i64 = cards.iter().map(|card| card.value_cents).sum();
            total_value_cents += column_value;
            columns.push(PipelineColumnNode {
                stage: PipelineStageNode::from(stage),
                total_count: cards.len() as i32,
                total_value_cents: column_value,
                deals: cards,
            });
        }

        Ok(PipelineBoardNode {
            columns,
            total_count,
            total_value_cents,
        })
    }

    async fn deals(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<DealNode>> {
        let db = database(ctx)?;
        let records = deal::Entity::find()
            .order_by_asc(deal::Column::CreatedAt)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(records.into_iter().map(DealNode::from).collect())
    }

    async fn deal(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<Option<DealNode>> {
        let db = database(ctx)?;
        let deal_id = parse_uuid(&id)?;
        let record = deal::Entity::find_by_id(deal_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(record.map(DealNode::from))
    }

    async fn companies(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<CompanyNode>> {
        let db = database(ctx)?;
        let records = company::Entity::find()
            .order_by_asc(company::Column::Name)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(records.into_iter().map(CompanyNode::from).collect())
    }

    async fn company(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<Option<CompanyNode>> {
        let db = database(ctx)?;
        let company_id = parse_uuid(&id)?;
        let record = company::Entity::find_by_id(company_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(record.map(CompanyNode::from))
    }

    /// All contacts, or only the contacts of one company. The company-scoped
    /// form backs the deal form's contact picker, which re-filters whenever
    /// the company selection changes.
    async fn contacts(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "companyId")] company_id: Option<ID>,
    ) -> async_graphql::Result<Vec<ContactNode>> {
        let db = database(ctx)?;
        let mut query = contact::Entity::find();
        if let Some(company_id) = company_id {
            let company_id = parse_uuid(&company_id)?;
            query = query.filter(contact::Column::CompanyId.eq(company_id));
        }
        let records = query
            .order_by_asc(contact::Column::Name)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(records.into_iter().map(ContactNode::from).collect())
    }

    async fn products(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<ProductNode>> {
        let db = database(ctx)?;
        let records = product::Entity::find()
            .order_by_asc(product::Column::Name)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(records.into_iter().map(ProductNode::from).collect())
    }

    async fn brokers(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<BrokerNode>> {
        require_admin(ctx)?;
        let db = database(ctx)?;
        let records = broker::Entity::find()
            .order_by_asc(broker::Column::Name)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(records.into_iter().map(BrokerNode::from).collect())
    }

    /// Tasks of one deal, in insertion order. Toggling completion does not
    /// re-sort the list.
    async fn tasks(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "dealId")] deal_id: ID,
    ) -> async_graphql::Result<Vec<TaskNode>> {
        let db = database(ctx)?;
        let deal_id = parse_uuid(&deal_id)?;
        let span = info_span!("crm.tasks.list");
        let _guard = span.enter();
        let records = task::Entity::find()
            .filter(task::Column::DealId.eq(deal_id))
            .order_by_asc(task::Column::CreatedAt)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(records.into_iter().map(TaskNode::from).collect())
    }

    /// Notes of one deal, newest first. The ordering is recomputed from the
    /// immutable creation timestamps on every load.
    async fn notes(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "dealId")] deal_id: ID,
    ) -> async_graphql::Result<Vec<NoteNode>> {
        let db = database(ctx)?;
        let deal_id = parse_uuid(&deal_id)?;
        let records = note::Entity::find()
            .filter(note::Column::DealId.eq(deal_id))
            .order_by_desc(note::Column::CreatedAt)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(records.into_iter().map(NoteNode::from).collect())
    }

    #[graphql(name = "suggestNextAction")]
    async fn suggest_next_action(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "dealId")] deal_id: ID,
    ) -> async_graphql::Result<SuggestionNode> {
        let db = database(ctx)?;
        let deal_id = parse_uuid(&deal_id)?;
        let record = deal::Entity::find_by_id(deal_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Deal not found"))?;

        let request = SuggestionRequest {
            stage: record.stage.title().to_string(),
            contact_history: record.contact_history.lines().join("\n"),
            deal_details: format!("{} ({})", record.title, format_brl(record.value_cents)),
        };
        let oracle = oracle_client(ctx)?;
        let suggestion = oracle
            .suggest(request)
            .await
            .map_err(|err| error_with_code("ORACLE_UNAVAILABLE", err.to_string()))?;
        Ok(SuggestionNode {
            next_action: suggestion.next_action,
            timing: suggestion.timing,
        })
    }
}

#[Object]
impl CrmMutation {
    #[graphql(name = "createDeal")]
    async fn create_deal(
        &self,
        ctx: &Context<'_>,
        input: NewDealInput,
    ) -> async_graphql::Result<DealNode> {
        let db = database(ctx)?;
        let title = validate_title(&input.title)?;
        let value_cents = validate_value_cents(input.value_cents)?;
        let company_id = parse_uuid(&input.company_id)?;
        let contact_id = parse_uuid(&input.contact_id)?;
        let product_id = parse_uuid(&input.product_id)?;
        ensure_contact_in_company(db.as_ref(), contact_id, company_id).await?;

        let stage: deal::Stage = input.stage.unwrap_or(DealStage::NoContact).into();
        let deal_id = Uuid::new_v4();
        let now: DateTimeWithTimeZone = Utc::now().into();
        let active = deal::ActiveModel {
            id: Set(deal_id),
            title: Set(title),
            value_cents: Set(value_cents),
            stage: Set(stage),
            company_id: Set(company_id),
            contact_id: Set(contact_id),
            product_id: Set(product_id),
            contact_history: Set(deal::ContactHistory::default()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        deal::Entity::insert(active)
            .exec_without_returning(db.as_ref())
            .await
            .map_err(db_error)?;
        let record = deal::Entity::find_by_id(deal_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("INTERNAL", "Failed to load inserted deal"))?;
        Ok(record.into())
    }

    /// Full-field edit. The contact history is not touched here; only the
    /// drag transition appends to it.
    #[graphql(name = "updateDeal")]
    async fn update_deal(
        &self,
        ctx: &Context<'_>,
        input: UpdateDealInput,
    ) -> async_graphql::Result<DealNode> {
        let db = database(ctx)?;
        let deal_id = parse_uuid(&input.id)?;
        let title = validate_title(&input.title)?;
        let value_cents = validate_value_cents(input.value_cents)?;
        let company_id = parse_uuid(&input.company_id)?;
        let contact_id = parse_uuid(&input.contact_id)?;
        let product_id = parse_uuid(&input.product_id)?;
        ensure_contact_in_company(db.as_ref(), contact_id, company_id).await?;

        let existing = deal::Entity::find_by_id(deal_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Deal not found"))?;
        let mut active: deal::ActiveModel = existing.into();
        active.title = Set(title);
        active.value_cents = Set(value_cents);
        active.stage = Set(input.stage.into());
        active.company_id = Set(company_id);
        active.contact_id = Set(contact_id);
        active.product_id = Set(product_id);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        Ok(updated.into())
    }

    /// Deletes the deal and its owned tasks and notes in one transaction.
    #[graphql(name = "deleteDeal")]
    async fn delete_deal(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let db = database(ctx)?;
        let deal_id = parse_uuid(&id)?;
        let txn = db.begin().await.map_err(db_error)?;
        task::Entity::delete_many()
            .filter(task::Column::DealId.eq(deal_id))
            .exec(&txn)
            .await
            .map_err(db_error)?;
        note::Entity::delete_many()
            .filter(note::Column::DealId.eq(deal_id))
            .exec(&txn)
            .await
            .map_err(db_error)?;
        let res = deal::Entity::delete_by_id(deal_id)
            .exec(&txn)
            .await
            .map_err(db_error)?;
        txn.commit().await.map_err(db_error)?;
        Ok(res.rows_affected > 0)
    }

    #[graphql(name = "moveDealStage")]
    async fn move_deal_stage(
        &self,
        ctx: &Context<'_>,
        id: ID,
        stage: DealStage,
    ) -> async_graphql::Result<DealNode> {
        let db = database(ctx)?;
        let deal_id = parse_uuid(&id)?;
        let target: deal::Stage = stage.into();
        let model = move_deal_stage_internal(db.as_ref(), deal_id, target)
            .await
            .map_err(stage_move_error)?;
        Ok(model.into())
    }

    #[graphql(name = "createTask")]
    async fn create_task(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "dealId")] deal_id: ID,
        input: NewTaskInput,
    ) -> async_graphql::Result<TaskNode> {
        let db = database(ctx)?;
        let deal_id = parse_uuid(&deal_id)?;
        ensure_deal_exists(db.as_ref(), deal_id).await?;
        let description = validate_description(&input.description)?;

        let task_id = Uuid::new_v4();
        let now: DateTimeWithTimeZone = Utc::now().into();
        let active = task::ActiveModel {
            id: Set(task_id),
            deal_id: Set(deal_id),
            description: Set(description),
            due_at: Set(input.due_at.map(|d| d.into())),
            completed: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };
        task::Entity::insert(active)
            .exec_without_returning(db.as_ref())
            .await
            .map_err(db_error)?;
        let record = task::Entity::find_by_id(task_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("INTERNAL", "Failed to load inserted task"))?;
        Ok(record.into())
    }

    #[graphql(name = "updateTask")]
    async fn update_task(
        &self,
        ctx: &Context<'_>,
        input: UpdateTaskInput,
    ) -> async_graphql::Result<TaskNode> {
        let db = database(ctx)?;
        let task_id = parse_uuid(&input.id)?;
        let existing = task::Entity::find_by_id(task_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Task not found"))?;
        let mut active: task::ActiveModel = existing.into();
        if let Some(description) = &input.description {
            active.description = Set(validate_description(description)?);
        }
        if input.due_at.is_some() {
            active.due_at = Set(input.due_at.map(|d| d.into()));
        }
        if let Some(completed) = input.completed {
            active.completed = Set(completed);
        }
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        Ok(updated.into())
    }

    /// Flips the completed flag while carrying every other field of the
    /// previous record, so description and due date survive the toggle.
    #[graphql(name = "toggleTask")]
    async fn toggle_task(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<TaskNode> {
        let db = database(ctx)?;
        let task_id = parse_uuid(&id)?;
        let existing = task::Entity::find_by_id(task_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Task not found"))?;
        let completed = !existing.completed;
        let mut active: task::ActiveModel = existing.into();
        active.completed = Set(completed);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        Ok(updated.into())
    }

    #[graphql(name = "deleteTask")]
    async fn delete_task(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let db = database(ctx)?;
        let task_id = parse_uuid(&id)?;
        let res = task::Entity::delete_by_id(task_id)
            .exec(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(res.rows_affected > 0)
    }

    /// The creation timestamp is assigned here, not by the client, so note
    /// ordering is immune to client clock skew.
    #[graphql(name = "createNote")]
    async fn create_note(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "dealId")] deal_id: ID,
        content: String,
    ) -> async_graphql::Result<NoteNode> {
        let db = database(ctx)?;
        let deal_id = parse_uuid(&deal_id)?;
        ensure_deal_exists(db.as_ref(), deal_id).await?;
        let content = validate_content(&content)?;

        let note_id = Uuid::new_v4();
        let now: DateTimeWithTimeZone = Utc::now().into();
        let active = note::ActiveModel {
            id: Set(note_id),
            deal_id: Set(deal_id),
            content: Set(content),
            created_at: Set(now),
            updated_at: Set(now),
        };
        note::Entity::insert(active)
            .exec_without_returning(db.as_ref())
            .await
            .map_err(db_error)?;
        let record = note::Entity::find_by_id(note_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("INTERNAL", "Failed to load inserted note"))?;
        Ok(record.into())
    }

    /// Content-only edit; created_at is immutable.
    #[graphql(name = "updateNote")]
    async fn update_note(
        &self,
        ctx: &Context<'_>,
        id: ID,
        content: String,
    ) -> async_graphql::Result<NoteNode> {
        let db = database(ctx)?;
        let note_id = parse_uuid(&id)?;
        let content = validate_content(&content)?;
        let existing = note::Entity::find_by_id(note_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Note not found"))?;
        let mut active: note::ActiveModel = existing.into();
        active.content = Set(content);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        Ok(updated.into())
    }

    #[graphql(name = "deleteNote")]
    async fn delete_note(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let db = database(ctx)?;
        let note_id = parse_uuid(&id)?;
        let res = note::Entity::delete_by_id(note_id)
            .exec(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(res.rows_affected > 0)
    }

    #[graphql(name = "createCompany")]
    async fn create_company(
        &self,
        ctx: &Context<'_>,
        input: NewCompanyInput,
    ) -> async_graphql::Result<CompanyNode> {
        let db = database(ctx)?;
        let name = validate_name(&input.name)?;
        let company_id = Uuid::new_v4();
        let now: DateTimeWithTimeZone = Utc::now().into();
        let active = company::ActiveModel {
            id: Set(company_id),
            name: Set(name),
            email: Set(trim_optional(input.email)),
            phone: Set(trim_optional(input.phone)),
            website: Set(trim_optional(input.website)),
            created_at: Set(now),
            updated_at: Set(now),
        };
        company::Entity::insert(active)
            .exec_without_returning(db.as_ref())
            .await
            .map_err(db_error)?;
        let record = company::Entity::find_by_id(company_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("INTERNAL", "Failed to load inserted company"))?;
        Ok(record.into())
    }

    #[graphql(name = "updateCompany")]
    async fn update_company(
        &self,
        ctx: &Context<'_>,
        input: UpdateCompanyInput,
    ) -> async_graphql::Result<CompanyNode> {
        let db = database(ctx)?;
        let company_id = parse_uuid(&input.id)?;
        let existing = company::Entity::find_by_id(company_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Company not found"))?;
        let mut active: company::ActiveModel = existing.into();
        active.name = Set(validate_name(&input.name)?);
        active.email = Set(trim_optional(input.email));
        active.phone = Set(trim_optional(input.phone));
        active.website = Set(trim_optional(input.website));
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        Ok(updated.into())
    }

    /// Plain delete. Deals keep their dangling reference and the board
    /// renders a placeholder label for it.
    #[graphql(name = "deleteCompany")]
    async fn delete_company(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let db = database(ctx)?;
        let company_id = parse_uuid(&id)?;
        let res = company::Entity::delete_by_id(company_id)
            .exec(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(res.rows_affected > 0)
    }

    #[graphql(name = "createContact")]
    async fn create_contact(
        &self,
        ctx: &Context<'_>,
        input: NewContactInput,
    ) -> async_graphql::Result<ContactNode> {
        let db = database(ctx)?;
        let name = validate_name(&input.name)?;
        let company_id = parse_uuid(&input.company_id)?;
        ensure_company_exists(db.as_ref(), company_id).await?;
        let contact_id = Uuid::new_v4();
        let now: DateTimeWithTimeZone = Utc::now().into();
        let active = contact::ActiveModel {
            id: Set(contact_id),
            name: Set(name),
            company_id: Set(company_id),
            email: Set(trim_optional(input.email)),
            phone: Set(trim_optional(input.phone)),
            created_at: Set(now),
            updated_at: Set(now),
        };
        contact::Entity::insert(active)
            .exec_without_returning(db.as_ref())
            .await
            .map_err(db_error)?;
        let record = contact::Entity::find_by_id(contact_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("INTERNAL", "Failed to load inserted contact"))?;
        Ok(record.into())
    }

    #[graphql(name = "updateContact")]
    async fn update_contact(
        &self,
        ctx: &Context<'_>,
        input: UpdateContactInput,
    ) -> async_graphql::Result<ContactNode> {
        let db = database(ctx)?;
        let contact_id = parse_uuid(&input.id)?;
        let company_id = parse_uuid(&input.company_id)?;
        ensure_company_exists(db.as_ref(), company_id).await?;
        let existing = contact::Entity::find_by_id(contact_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Contact not found"))?;
        let mut active: contact::ActiveModel = existing.into();
        active.name = Set(validate_name(&input.name)?);
        active.company_id = Set(company_id);
        active.email = Set(trim_optional(input.email));
        active.phone = Set(trim_optional(input.phone));
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        Ok(updated.into())
    }

    #[graphql(name = "deleteContact")]
    async fn delete_contact(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let db = database(ctx)?;
        let contact_id = parse_uuid(&id)?;
        let res = contact::Entity::delete_by_id(contact_id)
            .exec(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(res.rows_affected > 0)
    }

    #[graphql(name = "createProduct")]
    async fn create_product(
        &self,
        ctx: &Context<'_>,
        input: NewProductInput,
    ) -> async_graphql::Result<ProductNode> {
        let db = database(ctx)?;
        let name = validate_name(&input.name)?;
        let price_cents = validate_value_cents(input.price_cents)?;
        let product_id = Uuid::new_v4();
        let now: DateTimeWithTimeZone = Utc::now().into();
        let active = product::ActiveModel {
            id: Set(product_id),
            name: Set(name),
            price_cents: Set(price_cents),
            description: Set(trim_optional(input.description)),
            builder: Set(trim_optional(input.builder)),
            size_m2: Set(input.size_m2),
            rooms: Set(trim_optional(input.rooms)),
            position: Set(trim_optional(input.position)),
            price_per_sqm_cents: Set(input.price_per_sqm_cents),
            location: Set(trim_optional(input.location)),
            delivery_date: Set(trim_optional(input.delivery_date)),
            unit: Set(trim_optional(input.unit)),
            floor: Set(trim_optional(input.floor)),
            created_at: Set(now),
            updated_at: Set(now),
        };
        product::Entity::insert(active)
            .exec_without_returning(db.as_ref())
            .await
            .map_err(db_error)?;
        let record = product::Entity::find_by_id(product_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("INTERNAL", "Failed to load inserted product"))?;
        Ok(record.into())
    }

    #[graphql(name = "updateProduct")]
    async fn update_product(
        &self,
        ctx: &Context<'_>,
        input: UpdateProductInput,
    ) -> async_graphql::Result<ProductNode> {
        let db = database(ctx)?;
        let product_id = parse_uuid(&input.id)?;
        let existing = product::Entity::find_by_id(product_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Product not found"))?;
        let mut active: product::ActiveModel = existing.into();
        active.name = Set(validate_name(&input.name)?);
        active.price_cents = Set(validate_value_cents(input.price_cents)?);
        active.description = Set(trim_optional(input.description));
        active.builder = Set(trim_optional(input.builder));
        active.size_m2 = Set(input.size_m2);
        active.rooms = Set(trim_optional(input.rooms));
        active.position = Set(trim_optional(input.position));
        active.price_per_sqm_cents = Set(input.price_per_sqm_cents);
        active.location = Set(trim_optional(input.location));
        active.delivery_date = Set(trim_optional(input.delivery_date));
        active.unit = Set(trim_optional(input.unit));
        active.floor = Set(trim_optional(input.floor));
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        Ok(updated.into())
    }

    #[graphql(name = "deleteProduct")]
    async fn delete_product(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let db = database(ctx)?;
        let product_id = parse_uuid(&id)?;
        let res = product::Entity::delete_by_id(product_id)
            .exec(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(res.rows_affected > 0)
    }

    #[graphql(name = "createBroker")]
    async fn create_broker(
        &self,
        ctx: &Context<'_>,
        input: NewBrokerInput,
    ) -> async_graphql::Result<BrokerNode> {
        require_admin(ctx)?;
        let db = database(ctx)?;
        let name = validate_name(&input.name)?;
        let email = normalize_email(&input.email)?;
        let broker_id = Uuid::new_v4();
        let now: DateTimeWithTimeZone = Utc::now().into();
        let active = broker::ActiveModel {
            id: Set(broker_id),
            name: Set(name),
            email: Set(email),
            phone: Set(trim_optional(input.phone)),
            photo_url: Set(trim_optional(input.photo_url)),
            role: Set(input.role.into()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        broker::Entity::insert(active)
            .exec_without_returning(db.as_ref())
            .await
            .map_err(db_error)?;
        let record = broker::Entity::find_by_id(broker_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("INTERNAL", "Failed to load inserted broker"))?;
        Ok(record.into())
    }

    /// Email is the sign-in identity and stays immutable after creation.
    #[graphql(name = "updateBroker")]
    async fn update_broker(
        &self,
        ctx: &Context<'_>,
        input: UpdateBrokerInput,
    ) -> async_graphql::Result<BrokerNode> {
        require_admin(ctx)?;
        let db = database(ctx)?;
        let broker_id = parse_uuid(&input.id)?;
        let existing = broker::Entity::find_by_id(broker_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "Broker not found"))?;
        let mut active: broker::ActiveModel = existing.into();
        if let Some(name) = &input.name {
            active.name = Set(validate_name(name)?);
        }
        if input.phone.is_some() {
            active.phone = Set(trim_optional(input.phone));
        }
        if input.photo_url.is_some() {
            active.photo_url = Set(trim_optional(input.photo_url));
        }
        if let Some(role) = input.role {
            active.role = Set(role.into());
        }
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        Ok(updated.into())
    }

    #[graphql(name = "deleteBroker")]
    async fn delete_broker(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        require_admin(ctx)?;
        let db = database(ctx)?;
        let broker_id = parse_uuid(&id)?;
        let res = broker::Entity::delete_by_id(broker_id)
            .exec(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(res.rows_affected > 0)
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum DealStage {
    NoContact,
    ContactMade,
    InterestIdentified,
    ProposalSent,
    Closing,
}

impl From<deal::Stage> for DealStage {
    fn from(value: deal::Stage) -> Self {
        match value {
            deal::Stage::NoContact => DealStage::NoContact,
            deal::Stage::ContactMade => DealStage::ContactMade,
            deal::Stage::InterestIdentified => DealStage::InterestIdentified,
            deal::Stage::ProposalSent => DealStage::ProposalSent,
            deal::Stage::Closing => DealStage::Closing,
        }
    }
}

impl From<DealStage> for deal::Stage {
    fn from(value: DealStage) -> Self {
        match value {
            DealStage::NoContact => deal::Stage::NoContact,
            DealStage::ContactMade => deal::Stage::ContactMade,
            DealStage::InterestIdentified => deal::Stage::InterestIdentified,
            DealStage::ProposalSent => deal::Stage::ProposalSent,
            DealStage::Closing => deal::Stage::Closing,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum BrokerRole {
    Admin,
    Broker,
}

impl From<broker::Role> for BrokerRole {
    fn from(value: broker::Role) -> Self {
        match value {
            broker::Role::Admin => BrokerRole::Admin,
            broker::Role::Broker => BrokerRole::Broker,
        }
    }
}

impl From<BrokerRole> for broker::Role {
    fn from(value: BrokerRole) -> Self {
        match value {
            BrokerRole::Admin => broker::Role::Admin,
            BrokerRole::Broker => broker::Role::Broker,
        }
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct NewDealInput {
    pub title: String,
    #[graphql(name = "valueCents")]
    pub value_cents: i64,
    #[graphql(name = "companyId")]
    pub company_id: ID,
    #[graphql(name = "contactId")]
    pub contact_id: ID,
    #[graphql(name = "productId")]
    pub product_id: ID,
    pub stage: Option<DealStage>,
}

#[derive(Clone, Debug, InputObject)]
pub struct UpdateDealInput {
    pub id: ID,
    pub title: String,
    #[graphql(name = "valueCents")]
    pub value_cents: i64,
    #[graphql(name = "companyId")]
    pub company_id: ID,
    #[graphql(name = "contactId")]
    pub contact_id: ID,
    #[graphql(name = "productId")]
    pub product_id: ID,
    pub stage: DealStage,
}

#[derive(Clone, Debug, InputObject)]
pub struct NewTaskInput {
    pub description: String,
    #[graphql(name = "dueAt")]
    pub due_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, InputObject)]
pub struct UpdateTaskInput {
    pub id: ID,
    pub description: Option<String>,
    #[graphql(name = "dueAt")]
    pub due_at: Option<DateTime<Utc>>,
    pub completed: Option<bool>,
}

#[derive(Clone, Debug, InputObject)]
pub struct NewCompanyInput {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
}

#[derive(Clone, Debug, InputObject)]
pub struct UpdateCompanyInput {
    pub id: ID,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
}

#[derive(Clone, Debug, InputObject)]
pub struct NewContactInput {
    pub name: String,
    #[graphql(name = "companyId")]
    pub company_id: ID,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Clone, Debug, InputObject)]
pub struct UpdateContactInput {
    pub id: ID,
    pub name: String,
    #[graphql(name = "companyId")]
    pub company_id: ID,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Clone, Debug, InputObject)]
pub struct NewProductInput {
    pub name: String,
    #[graphql(name = "priceCents")]
    pub price_cents: i64,
    pub description: Option<String>,
    pub builder: Option<String>,
    #[graphql(name = "sizeM2")]
    pub size_m2: Option<i32>,
    pub rooms: Option<String>,
    pub position: Option<String>,
    #[graphql(name = "pricePerSqmCents")]
    pub price_per_sqm_cents: Option<i64>,
    pub location: Option<String>,
    #[graphql(name = "deliveryDate")]
    pub delivery_date: Option<String>,
    pub unit: Option<String>,
    pub floor: Option<String>,
}

#[derive(Clone, Debug, InputObject)]
pub struct UpdateProductInput {
    pub id: ID,
    pub name: String,
    #[graphql(name = "priceCents")]
    pub price_cents: i64,
    pub description: Option<String>,
    pub builder: Option<String>,
    #[graphql(name = "sizeM2")]
    pub size_m2: Option<i32>,
    pub rooms: Option<String>,
    pub position: Option<String>,
    #[graphql(name = "pricePerSqmCents")]
    pub price_per_sqm_cents: Option<i64>,
    pub location: Option<String>,
    #[graphql(name = "deliveryDate")]
    pub delivery_date: Option<String>,
    pub unit: Option<String>,
    pub floor: Option<String>,
}

#[derive(Clone, Debug, InputObject)]
pub struct NewBrokerInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[graphql(name = "photoUrl")]
    pub photo_url: Option<String>,
    pub role: BrokerRole,
}

#[derive(Clone, Debug, InputObject)]
pub struct UpdateBrokerInput {
    pub id: ID,
    pub name: Option<String>,
    pub phone: Option<String>,
    #[graphql(name = "photoUrl")]
    pub photo_url: Option<String>,
    pub role: Option<BrokerRole>,
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "PipelineStage")]
pub struct PipelineStageNode {
    pub key: String,
    pub title: String,
}

impl From<deal::Stage> for PipelineStageNode {
    fn from(stage: deal::Stage) -> Self {
        Self {
            key: stage.key().to_string(),
            title: stage.title().to_string(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Deal")]
pub struct DealNode {
    pub id: ID,
    pub title: String,
    #[graphql(name = "valueCents")]
    pub value_cents: i64,
    #[graphql(name = "valueBrl")]
    pub value_brl: String,
    pub stage: DealStage,
    #[graphql(name = "companyId")]
    pub company_id: ID,
    #[graphql(name = "contactId")]
    pub contact_id: ID,
    #[graphql(name = "productId")]
    pub product_id: ID,
    #[graphql(name = "contactHistory")]
    pub contact_history: Vec<String>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<deal::Model> for DealNode {
    fn from(model: deal::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            title: model.title,
            value_cents: model.value_cents,
            value_brl: format_brl(model.value_cents),
            stage: model.stage.into(),
            company_id: ID::from(model.company_id.to_string()),
            contact_id: ID::from(model.contact_id.to_string()),
            product_id: ID::from(model.product_id.to_string()),
            contact_history: model.contact_history.0,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

/// Card shape rendered inside a board column: the deal plus resolved labels
/// for its references. A dangling reference degrades to a placeholder.
#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "DealCard")]
pub struct DealCardNode {
    pub id: ID,
    pub title: String,
    #[graphql(name = "valueCents")]
    pub value_cents: i64,
    #[graphql(name = "valueBrl")]
    pub value_brl: String,
    #[graphql(name = "stageKey")]
    pub stage_key: String,
    #[graphql(name = "companyId")]
    pub company_id: ID,
    #[graphql(name = "companyName")]
    pub company_name: String,
    #[graphql(name = "contactId")]
    pub contact_id: ID,
    #[graphql(name = "contactName")]
    pub contact_name: String,
    #[graphql(name = "productId")]
    pub product_id: ID,
    #[graphql(name = "historyCount")]
    pub history_count: i32,
}

impl DealCardNode {
    fn build(
        model: deal::Model,
        companies: &HashMap<Uuid, company::Model>,
        contacts: &HashMap<Uuid, contact::Model>,
    ) -> Self {
        let company_name = companies
            .get(&model.company_id)
            .map(|company| company.name.clone())
            .unwrap_or_else(|| MISSING_REF_LABEL.to_string());
        let contact_name = contacts
            .get(&model.contact_id)
            .map(|contact| contact.name.clone())
            .unwrap_or_else(|| MISSING_REF_LABEL.to_string());
        Self {
            id: ID::from(model.id.to_string()),
            title: model.title,
            value_cents: model.value_cents,
            value_brl: format_brl(model.value_cents),
            stage_key: model.stage.key().to_string(),
            company_id: ID::from(model.company_id.to_string()),
            company_name,
            contact_id: ID::from(model.contact_id.to_string()),
            contact_name,
            product_id: ID::from(model.product_id.to_string()),
            history_count: model.contact_history.len() as i32,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "PipelineColumn")]
pub struct PipelineColumnNode {
    pub stage: PipelineStageNode,
    #[graphql(name = "totalCount")]
    pub total_count: i32,
    #[graphql(name = "totalValueCents")]
    pub total_value_cents: i64,
    pub deals: Vec<DealCardNode>,
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "PipelineBoard")]
pub struct PipelineBoardNode {
    pub columns: Vec<PipelineColumnNode>,
    #[graphql(name = "totalCount")]
    pub total_count: i32,
    #[graphql(name = "totalValueCents")]
    pub total_value_cents: i64,
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Company")]
pub struct CompanyNode {
    pub id: ID,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<company::Model> for CompanyNode {
    fn from(model: company::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            name: model.name,
            email: model.email,
            phone: model.phone,
            website: model.website,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Contact")]
pub struct ContactNode {
    pub id: ID,
    pub name: String,
    #[graphql(name = "companyId")]
    pub company_id: ID,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<contact::Model> for ContactNode {
    fn from(model: contact::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            name: model.name,
            company_id: ID::from(model.company_id.to_string()),
            email: model.email,
            phone: model.phone,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Product")]
pub struct ProductNode {
    pub id: ID,
    pub name: String,
    #[graphql(name = "priceCents")]
    pub price_cents: i64,
    #[graphql(name = "priceBrl")]
    pub price_brl: String,
    pub description: Option<String>,
    pub builder: Option<String>,
    #[graphql(name = "sizeM2")]
    pub size_m2: Option<i32>,
    pub rooms: Option<String>,
    pub position: Option<String>,
    #[graphql(name = "pricePerSqmCents")]
    pub price_per_sqm_cents: Option<i64>,
    pub location: Option<String>,
    #[graphql(name = "deliveryDate")]
    pub delivery_date: Option<String>,
    pub unit: Option<String>,
    pub floor: Option<String>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<product::Model> for ProductNode {
    fn from(model: product::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            name: model.name,
            price_cents: model.price_cents,
            price_brl: format_brl(model.price_cents),
            description: model.description,
            builder: model.builder,
            size_m2: model.size_m2,
            rooms: model.rooms,
            position: model.position,
            price_per_sqm_cents: model.price_per_sqm_cents,
            location: model.location,
            delivery_date: model.delivery_date,
            unit: model.unit,
            floor: model.floor,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Broker")]
pub struct BrokerNode {
    pub id: ID,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[graphql(name = "photoUrl")]
    pub photo_url: Option<String>,
    pub role: BrokerRole,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<broker::Model> for BrokerNode {
    fn from(model: broker::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            name: model.name,
            email: model.email,
            phone: model.phone,
            photo_url: model.photo_url,
            role: model.role.into(),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Task")]
pub struct TaskNode {
    pub id: ID,
    #[graphql(name = "dealId")]
    pub deal_id: ID,
    pub description: String,
    #[graphql(name = "dueAt")]
    pub due_at: Option<DateTime<Utc>>,
    pub completed: bool,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<task::Model> for TaskNode {
    fn from(model: task::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            deal_id: ID::from(model.deal_id.to_string()),
            description: model.description,
            due_at: model.due_at.map(|d| d.into()),
            completed: model.completed,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Note")]
pub struct NoteNode {
    pub id: ID,
    #[graphql(name = "dealId")]
    pub deal_id: ID,
    pub content: String,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<note::Model> for NoteNode {
    fn from(model: note::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            deal_id: ID::from(model.deal_id.to_string()),
            content: model.content,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Suggestion")]
pub struct SuggestionNode {
    #[graphql(name = "nextAction")]
    pub next_action: String,
    pub timing: String,
}

#[derive(Debug)]
pub enum StageMoveError {
    NotFound,
    Db(DbErr),
}

impl From<DbErr> for StageMoveError {
    fn from(value: DbErr) -> Self {
        StageMoveError::Db(value)
    }
}

fn stage_move_error(err: StageMoveError) -> Error {
    match err {
        StageMoveError::NotFound => error_with_code("NOT_FOUND", "Deal not found"),
        StageMoveError::Db(e) => db_error(e),
    }
}

/// History line recorded for a stage transition, in the product's fixed
/// locale: "Card movido para <title> em <dd/mm/yyyy>".
pub fn stage_history_line(stage: deal::Stage, date: NaiveDate) -> String {
    format!(
        "Card movido para {} em {}",
        stage.title(),
        date.format("%d/%m/%Y")
    )
}

async fn move_deal_stage_internal(
    db: &DatabaseConnection,
    deal_id: Uuid,
    stage: deal::Stage,
) -> Result<deal::Model, StageMoveError> {
    let txn = db.begin().await?;
    let existing = deal::Entity::find_by_id(deal_id)
        .one(&txn)
        .await?
        .ok_or(StageMoveError::NotFound)?;

    // Same-column drop: no write, no history entry.
    if existing.stage == stage {
        txn.commit().await?;
        return Ok(existing);
    }

    let now: DateTimeWithTimeZone = Utc::now().into();
    let mut history = existing.contact_history.clone();
    history.push(stage_history_line(stage, now.date_naive()));

    let mut active: deal::ActiveModel = existing.into();
    active.stage = Set(stage);
    active.contact_history = Set(history);
    active.updated_at = Set(now);
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    Ok(updated)
}

/// Exposed for seeders/tests to drive the same transactional logic.
pub async fn move_deal_stage_service(
    db: &DatabaseConnection,
    deal_id: Uuid,
    stage: deal::Stage,
) -> Result<deal::Model, StageMoveError> {
    move_deal_stage_internal(db, deal_id, stage).await
}

fn database(ctx: &Context<'_>) -> async_graphql::Result<Arc<DatabaseConnection>> {
    ctx.data::<Arc<DatabaseConnection>>()
        .cloned()
        .map_err(|_| error_with_code("INTERNAL", "Missing database connection"))
}

fn oracle_client(ctx: &Context<'_>) -> async_graphql::Result<Arc<dyn SuggestionOracle>> {
    ctx.data::<Arc<dyn SuggestionOracle>>()
        .cloned()
        .map_err(|_| error_with_code("INTERNAL", "Missing suggestion oracle"))
}

fn require_admin(ctx: &Context<'_>) -> async_graphql::Result<CurrentBroker> {
    let Some(current) = ctx.data_opt::<CurrentBroker>() else {
        return Err(error_with_code("UNAUTHENTICATED", "Login required"));
    };
    if current.is_admin {
        Ok(current.clone())
    } else {
        Err(error_with_code("FORBIDDEN", "Administrator access required"))
    }
}

fn parse_uuid(id: &ID) -> async_graphql::Result<Uuid> {
    Uuid::parse_str(id.as_str()).map_err(|_| error_with_code("BAD_REQUEST", "Invalid ID"))
}

fn db_error(err: DbErr) -> Error {
    error_with_code("INTERNAL", format!("Database error: {}", err))
}

fn validation_error(message: impl Into<String>) -> Error {
    error_with_code("VALIDATION", message)
}

fn error_with_code(code: &'static str, message: impl Into<String>) -> Error {
    Error::new(message).extend_with(|_, e| e.set("code", code))
}

fn validate_title(raw: &str) -> async_graphql::Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(validation_error("title is required"));
    }
    Ok(trimmed.to_string())
}

fn validate_name(raw: &str) -> async_graphql::Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(validation_error("name is required"));
    }
    Ok(trimmed.to_string())
}

fn validate_description(raw: &str) -> async_graphql::Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(validation_error("description is required"));
    }
    Ok(trimmed.to_string())
}

fn validate_content(raw: &str) -> async_graphql::Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(validation_error("content is required"));
    }
    Ok(trimmed.to_string())
}

/// Zero is a legal deal value; only negatives are rejected, and always
/// before any persistence call is made.
fn validate_value_cents(cents: i64) -> async_graphql::Result<i64> {
    if cents < 0 {
        return Err(validation_error("value must be non-negative"));
    }
    Ok(cents)
}

fn normalize_email(raw: &str) -> async_graphql::Result<String> {
    let trimmed = raw.trim().to_lowercase();
    if trimmed.is_empty() || !trimmed.contains('@') {
        return Err(validation_error("a valid email is required"));
    }
    Ok(trimmed)
}

fn trim_optional(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

async fn ensure_deal_exists(db: &DatabaseConnection, deal_id: Uuid) -> async_graphql::Result<()> {
    deal::Entity::find_by_id(deal_id)
        .one(db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| error_with_code("NOT_FOUND", "Deal not found"))?;
    Ok(())
}

async fn ensure_company_exists(
    db: &DatabaseConnection,
    company_id: Uuid,
) -> async_graphql::Result<()> {
    company::Entity::find_by_id(company_id)
        .one(db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| validation_error("selected company does not exist"))?;
    Ok(())
}

/// The deal form only offers contacts of the selected company; the same rule
/// is re-checked here so a stale form submission cannot cross-link.
async fn ensure_contact_in_company(
    db: &DatabaseConnection,
    contact_id: Uuid,
    company_id: Uuid,
) -> async_graphql::Result<()> {
    let record = contact::Entity::find_by_id(contact_id)
        .one(db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| validation_error("selected contact does not exist"))?;
    if record.company_id != company_id {
        return Err(validation_error(
            "contact does not belong to the selected company",
        ));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct SeededDemo {
    pub companies: Vec<company::Model>,
    pub contacts: Vec<contact::Model>,
    pub products: Vec<product::Model>,
    pub brokers: Vec<broker::Model>,
    pub deals: Vec<deal::Model>,
}

impl SeededDemo {
    pub fn company_named(&self, name: &str) -> Option<&company::Model> {
        self.companies.iter().find(|c| c.name == name)
    }

    pub fn contact_named(&self, name: &str) -> Option<&contact::Model> {
        self.contacts.iter().find(|c| c.name == name)
    }

    pub fn deal_titled(&self, title: &str) -> Option<&deal::Model> {
        self.deals.iter().find(|d| d.title == title)
    }
}

/// Demo universe for a fresh database: the brokerage's builders, their
/// contacts, a few listings and deals spread across the board.
pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<SeededDemo, DbErr> {
    let seeded_at: DateTimeWithTimeZone = Utc::now().into();

    let sol_nascente = company::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Construtora Sol Nascente".into()),
        email: Set(Some("contato@solnascente.com".into())),
        phone: Set(Some("(11) 98765-4321".into())),
        website: Set(Some("solnascente.com".into())),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;

    let litoraneos = company::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Parceiros Litorâneos".into()),
        email: Set(Some("parceria@litoraneos.com".into())),
        phone: Set(Some("(21) 91234-5678".into())),
        website: Set(Some("litoraneos.com".into())),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;

    let luxo = company::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Imóveis de Luxo SA".into()),
        email: Set(Some("vendas@luxoimoveis.com".into())),
        phone: Set(Some("(31) 99999-8888".into())),
        website: Set(Some("luxoimoveis.com".into())),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;

    let urban = company::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Urban".into()),
        email: Set(Some("contato@urban.com".into())),
        phone: Set(Some("(83) 5555-5555".into())),
        website: Set(Some("urban.com".into())),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;

    let joao = contact::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("João Silva".into()),
        company_id: Set(urban.id),
        email: Set(Some("joao.silva@urban.com".into())),
        phone: Set(Some("(11) 98765-1111".into())),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;

    let maria = contact::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Maria Oliveira".into()),
        company_id: Set(sol_nascente.id),
        email: Set(Some("maria.oliveira@solnascente.com".into())),
        phone: Set(Some("(11) 98765-2222".into())),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;

    let carlos = contact::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Carlos Pereira".into()),
        company_id: Set(litoraneos.id),
        email: Set(Some("carlos.pereira@litoraneos.com".into())),
        phone: Set(Some("(21) 91234-3333".into())),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;

    let ana = contact::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Ana Costa".into()),
        company_id: Set(luxo.id),
        email: Set(Some("ana.costa@luxoimoveis.com".into())),
        phone: Set(Some("(31) 99999-4444".into())),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;

    let akua = product::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("AKUA".into()),
        price_cents: Set(36_000_000),
        description: Set(Some("Apartamento em Bessa.".into())),
        builder: Set(Some("Urban".into())),
        size_m2: Set(Some(24)),
        rooms: Set(Some("FLAT".into())),
        position: Set(Some("SUL".into())),
        price_per_sqm_cents: Set(Some(1_500_000)),
        location: Set(Some("BESSA".into())),
        delivery_date: Set(Some("dez./26".into())),
        unit: Set(Some("1º andar".into())),
        floor: Set(Some("1º andar".into())),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;

    let cobertura = product::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Cobertura Duplex".into()),
        price_cents: Set(120_000_000),
        description: Set(Some(
            "4 suítes, piscina privativa, 3 vagas de garagem.".into(),
        )),
        builder: Set(Some("Imóveis de Luxo SA".into())),
        size_m2: Set(Some(300)),
        rooms: Set(Some("4 suítes".into())),
        position: Set(Some("Norte".into())),
        price_per_sqm_cents: Set(Some(400_000)),
        location: Set(Some("Altiplano".into())),
        delivery_date: Set(Some("Pronto".into())),
        unit: Set(Some("301".into())),
        floor: Set(Some("3º".into())),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;

    let casa = product::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Casa Térrea com Piscina".into()),
        price_cents: Set(30_000_000),
        description: Set(Some("3 quartos, área gourmet com churrasqueira.".into())),
        builder: Set(Some("Parceiros Litorâneos".into())),
        size_m2: Set(Some(150)),
        rooms: Set(Some("3 quartos".into())),
        position: Set(Some("Leste".into())),
        price_per_sqm_cents: Set(Some(200_000)),
        location: Set(Some("Intermares".into())),
        delivery_date: Set(Some("Pronto".into())),
        unit: Set(None),
        floor: Set(None),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;

    let admin = broker::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Administrador".into()),
        email: Set("admin@mail.com".into()),
        phone: Set(None),
        photo_url: Set(None),
        role: Set(broker::Role::Admin),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;

    let corretor = broker::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Paulo Corretor".into()),
        email: Set("paulo@mail.com".into()),
        phone: Set(Some("(83) 98888-0000".into())),
        photo_url: Set(None),
        role: Set(broker::Role::Broker),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;

    let venda_akua = deal::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set("Venda de Apartamento AKUA".into()),
        value_cents: Set(36_000_000),
        stage: Set(deal::Stage::ProposalSent),
        company_id: Set(urban.id),
        contact_id: Set(joao.id),
        product_id: Set(akua.id),
        contact_history: Set(deal::ContactHistory(vec![
            "Reunião inicial em 10/05/2024.".into(),
            "E-mail com proposta enviado em 15/05/2024.".into(),
        ])),
        created_at: Set(timestamp(2024, 5, 8)),
        updated_at: Set(timestamp(2024, 5, 15)),
    }
    .insert(db)
    .await?;

    let interesse_cobertura = deal::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set("Interesse em Cobertura".into()),
        value_cents: Set(120_000_000),
        stage: Set(deal::Stage::InterestIdentified),
        company_id: Set(luxo.id),
        contact_id: Set(ana.id),
        product_id: Set(cobertura.id),
        contact_history: Set(deal::ContactHistory(vec![
            "Contato via telefone em 12/05/2024.".into(),
            "Agendada visita para 20/05/2024.".into(),
        ])),
        created_at: Set(timestamp(2024, 5, 12)),
        updated_at: Set(timestamp(2024, 5, 14)),
    }
    .insert(db)
    .await?;

    let lead_campanha = deal::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set("Lead de Campanha de Marketing".into()),
        value_cents: Set(30_000_000),
        stage: Set(deal::Stage::NoContact),
        company_id: Set(litoraneos.id),
        contact_id: Set(carlos.id),
        product_id: Set(casa.id),
        contact_history: Set(deal::ContactHistory(vec![
            "Lead recebido via formulário do site em 18/05/2024.".into(),
        ])),
        created_at: Set(timestamp(2024, 5, 18)),
        updated_at: Set(timestamp(2024, 5, 18)),
    }
    .insert(db)
    .await?;

    let retomada = deal::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set("Retomada Casa Térrea".into()),
        value_cents: Set(30_000_000),
        stage: Set(deal::Stage::ContactMade),
        company_id: Set(sol_nascente.id),
        contact_id: Set(maria.id),
        product_id: Set(casa.id),
        contact_history: Set(deal::ContactHistory(vec![
            "Primeiro contato em 02/06/2024.".into(),
        ])),
        created_at: Set(timestamp(2024, 6, 2)),
        updated_at: Set(timestamp(2024, 6, 2)),
    }
    .insert(db)
    .await?;

    let fechamento = deal::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set("Fechamento Flat Bessa".into()),
        value_cents: Set(36_000_000),
        stage: Set(deal::Stage::Closing),
        company_id: Set(urban.id),
        contact_id: Set(joao.id),
        product_id: Set(akua.id),
        contact_history: Set(deal::ContactHistory(vec![
            "Visita realizada em 05/06/2024.".into(),
            "Card movido para Fechamento em 12/06/2024".into(),
        ])),
        created_at: Set(timestamp(2024, 6, 1)),
        updated_at: Set(timestamp(2024, 6, 12)),
    }
    .insert(db)
    .await?;

    let task_due = timestamp(2024, 5, 20);
    task::ActiveModel {
        id: Set(Uuid::new_v4()),
        deal_id: Set(venda_akua.id),
        description: Set("Enviar contrato para análise".into()),
        due_at: Set(Some(task_due)),
        completed: Set(false),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;

    task::ActiveModel {
        id: Set(Uuid::new_v4()),
        deal_id: Set(venda_akua.id),
        description: Set("Ligar para confirmar recebimento da proposta".into()),
        due_at: Set(None),
        completed: Set(true),
        created_at: Set(seeded_at),
        updated_at: Set(seeded_at),
    }
    .insert(db)
    .await?;

    note::ActiveModel {
        id: Set(Uuid::new_v4()),
        deal_id: Set(venda_akua.id),
        content: Set("Cliente prefere contato por WhatsApp.".into()),
        created_at: Set(timestamp(2024, 5, 11)),
        updated_at: Set(timestamp(2024, 5, 11)),
    }
    .insert(db)
    .await?;

    note::ActiveModel {
        id: Set(Uuid::new_v4()),
        deal_id: Set(interesse_cobertura.id),
        content: Set("Avaliar permuta com apartamento atual.".into()),
        created_at: Set(timestamp(2024, 5, 13)),
        updated_at: Set(timestamp(2024, 5, 13)),
    }
    .insert(db)
    .await?;

    Ok(SeededDemo {
        companies: vec![sol_nascente, litoraneos, luxo, urban],
        contacts: vec![joao, maria, carlos, ana],
        products: vec![akua, cobertura, casa],
        brokers: vec![admin, corretor],
        deals: vec![
            venda_akua,
            interesse_cobertura,
            lead_campanha,
            retomada,
            fechamento,
        ],
    })
}

fn timestamp(year: i32, month: u32, day: u32) -> DateTimeWithTimeZone {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .expect("valid seed timestamp")
        .into()
}
