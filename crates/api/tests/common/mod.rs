use std::sync::Arc;

use api::oracle::{OracleError, SuggestionOracle, SuggestionRequest, SuggestionResponse};
use api::schema::{build_schema, AppSchema};
use sea_orm::{
    ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement, Value as DbValue,
};
use uuid::Uuid;

pub type TestSchema = async_graphql::Schema<
    api::schema::QueryRoot,
    api::schema::MutationRoot,
    async_graphql::EmptySubscription,
>;

/// Canned oracle for tests: either answers with fixed values or simulates an
/// outage.
pub struct StubOracle {
    pub fail: bool,
}

#[async_trait::async_trait]
impl SuggestionOracle for StubOracle {
    async fn suggest(&self, _request: SuggestionRequest) -> Result<SuggestionResponse, OracleError> {
        if self.fail {
            return Err(OracleError::Unavailable("stub outage".into()));
        }
        Ok(SuggestionResponse {
            next_action: "Agendar visita ao imóvel".into(),
            timing: "Nos próximos 2 dias".into(),
        })
    }
}

pub async fn sqlite_db() -> Arc<DatabaseConnection> {
    let conn = Database::connect("sqlite::memory:").await.unwrap();
    bootstrap_sqlite(&conn).await;
    Arc::new(conn)
}

pub fn schema_with_oracle(
    db: Arc<DatabaseConnection>,
    oracle: Arc<dyn SuggestionOracle>,
) -> TestSchema {
    let AppSchema(schema) = build_schema(db, oracle);
    schema
}

pub fn test_schema(db: Arc<DatabaseConnection>) -> TestSchema {
    schema_with_oracle(db, Arc::new(StubOracle { fail: false }))
}

async fn bootstrap_sqlite(db: &DatabaseConnection) {
    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        "PRAGMA foreign_keys = ON;",
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE company (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            website TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE contact (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            company_id TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE product (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            price_cents INTEGER NOT NULL,
            description TEXT,
            builder TEXT,
            size_m2 INTEGER,
            rooms TEXT,
            position TEXT,
            price_per_sqm_cents INTEGER,
            location TEXT,
            delivery_date TEXT,
            unit TEXT,
            floor TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE broker (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT,
            photo_url TEXT,
            role TEXT NOT NULL DEFAULT 'BROKER',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE deal (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            value_cents INTEGER NOT NULL,
            stage TEXT NOT NULL DEFAULT 'NO_CONTACT',
            company_id TEXT NOT NULL,
            contact_id TEXT NOT NULL,
            product_id TEXT NOT NULL,
            contact_history TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE task (
            id TEXT PRIMARY KEY,
            deal_id TEXT NOT NULL REFERENCES deal(id) ON DELETE CASCADE,
            description TEXT NOT NULL,
            due_at TEXT,
            completed INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE note (
            id TEXT PRIMARY KEY,
            deal_id TEXT NOT NULL REFERENCES deal(id) ON DELETE CASCADE,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    ))
    .await
    .unwrap();
}

fn now_string() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub async fn insert_company(db: &DatabaseConnection, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    let now = now_string();
    db.execute(Statement::from_sql_and_values(
        DatabaseBackend::Sqlite,
        "INSERT INTO company (id, name, email, phone, website, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        vec![
            id.into(),
            name.into(),
            DbValue::from(None::<String>),
            DbValue::from(None::<String>),
            DbValue::from(None::<String>),
            now.clone().into(),
            now.into(),
        ],
    ))
    .await
    .unwrap();
    id
}

pub async fn insert_contact(db: &DatabaseConnection, name: &str, company_id: Uuid) -> Uuid {
    let id = Uuid::new_v4();
    let now = now_string();
    db.execute(Statement::from_sql_and_values(
        DatabaseBackend::Sqlite,
        "INSERT INTO contact (id, name, company_id, email, phone, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        vec![
            id.into(),
            name.into(),
            company_id.into(),
            DbValue::from(None::<String>),
            DbValue::from(None::<String>),
            now.clone().into(),
            now.into(),
        ],
    ))
    .await
    .unwrap();
    id
}

pub async fn insert_product(db: &DatabaseConnection, name: &str, price_cents: i64) -> Uuid {
    let id = Uuid::new_v4();
    let now = now_string();
    db.execute(Statement::from_sql_and_values(
        DatabaseBackend::Sqlite,
        "INSERT INTO product (id, name, price_cents, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        vec![
            id.into(),
            name.into(),
            price_cents.into(),
            now.clone().into(),
            now.into(),
        ],
    ))
    .await
    .unwrap();
    id
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_deal(
    db: &DatabaseConnection,
    title: &str,
    value_cents: i64,
    stage_key: &str,
    company_id: Uuid,
    contact_id: Uuid,
    product_id: Uuid,
    history_json: &str,
) -> Uuid {
    let id = Uuid::new_v4();
    let now = now_string();
    db.execute(Statement::from_sql_and_values(
        DatabaseBackend::Sqlite,
        "INSERT INTO deal (id, title, value_cents, stage, company_id, contact_id, product_id, contact_history, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        vec![
            id.into(),
            title.into(),
            value_cents.into(),
            stage_key.into(),
            company_id.into(),
            contact_id.into(),
            product_id.into(),
            history_json.into(),
            now.clone().into(),
            now.into(),
        ],
    ))
    .await
    .unwrap();
    id
}

pub async fn insert_note(
    db: &DatabaseConnection,
    deal_id: Uuid,
    content: &str,
    created_at: &str,
) -> Uuid {
    let id = Uuid::new_v4();
    db.execute(Statement::from_sql_and_values(
        DatabaseBackend::Sqlite,
        "INSERT INTO note (id, deal_id, content, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        vec![
            id.into(),
            deal_id.into(),
            content.into(),
            created_at.into(),
            created_at.into(),
        ],
    ))
    .await
    .unwrap();
    id
}

/// Minimal reference graph most pipeline tests need: one company with one
/// contact plus a product.
pub async fn seed_reference_graph(db: &DatabaseConnection) -> (Uuid, Uuid, Uuid) {
    let company_id = insert_company(db, "Construtora Sol Nascente").await;
    let contact_id = insert_contact(db, "Maria Oliveira", company_id).await;
    let product_id = insert_product(db, "AKUA", 36_000_000).await;
    (company_id, contact_id, product_id)
}
