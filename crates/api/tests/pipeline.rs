mod common;

use async_graphql::{Request, Variables};
use chrono::Utc;
use entity::deal;
use sea_orm::EntityTrait;
use serde_json::json;
use uuid::Uuid;

use common::{insert_deal, seed_reference_graph, sqlite_db, test_schema};

#[tokio::test]
async fn board_partitions_every_deal_exactly_once() {
    let db = sqlite_db().await;
    let (company_id, contact_id, product_id) = seed_reference_graph(db.as_ref()).await;

    insert_deal(
        db.as_ref(),
        "Primeiro lead",
        10_000_00,
        "NO_CONTACT",
        company_id,
        contact_id,
        product_id,
        "[]",
    )
    .await;
    insert_deal(
        db.as_ref(),
        "Proposta flat",
        20_000_00,
        "PROPOSAL_SENT",
        company_id,
        contact_id,
        product_id,
        "[]",
    )
    .await;
    insert_deal(
        db.as_ref(),
        "Segundo lead",
        5_000_00,
        "NO_CONTACT",
        company_id,
        contact_id,
        product_id,
        "[]",
    )
    .await;
    // References a company that no longer exists; the board must still render
    // the card, with a placeholder label.
    insert_deal(
        db.as_ref(),
        "Carteira antiga",
        1_000_00,
        "CLOSING",
        Uuid::new_v4(),
        contact_id,
        product_id,
        "[]",
    )
    .await;

    let schema = test_schema(db.clone());
    let query = r#"
        query Board {
            crm {
                pipelineBoard {
                    totalCount
                    columns {
                        stage { key title }
                        totalCount
                        deals { title companyName contactName }
                    }
                }
            }
        }
    "#;
    let resp = schema.execute(Request::new(query)).await;
    assert!(resp.errors.is_empty(), "errors: {:?}", resp.errors);
    let board = &resp.data.into_json().unwrap()["crm"]["pipelineBoard"];

    assert_eq!(board["totalCount"].as_i64().unwrap(), 4);
    let columns = board["columns"].as_array().cloned().unwrap_or_default();
    assert_eq!(columns.len(), 5);
    let keys: Vec<&str> = columns
        .iter()
        .map(|c| c["stage"]["key"].as_str().unwrap())
        .collect();
    assert_eq!(
        keys,
        vec![
            "NO_CONTACT",
            "CONTACT_MADE",
            "INTEREST_IDENTIFIED",
            "PROPOSAL_SENT",
            "CLOSING"
        ]
    );
    assert_eq!(columns[0]["stage"]["title"], "Sem Contato");

    let bucket_total: i64 = columns.iter().map(|c| c["totalCount"].as_i64().unwrap()).sum();
    assert_eq!(bucket_total, 4);

    let no_contact = columns[0]["deals"].as_array().unwrap();
    assert_eq!(no_contact.len(), 2);
    assert_eq!(no_contact[0]["title"], "Primeiro lead");
    assert_eq!(no_contact[1]["title"], "Segundo lead");
    assert_eq!(no_contact[0]["companyName"], "Construtora Sol Nascente");

    let closing = columns[4]["deals"].as_array().unwrap();
    assert_eq!(closing.len(), 1);
    assert_eq!(closing[0]["companyName"], "Não encontrado");
}

#[tokio::test]
async fn same_column_drop_is_a_no_op() {
    let db = sqlite_db().await;
    let (company_id, contact_id, product_id) = seed_reference_graph(db.as_ref()).await;
    let deal_id = insert_deal(
        db.as_ref(),
        "Venda AKUA",
        36_000_000,
        "PROPOSAL_SENT",
        company_id,
        contact_id,
        product_id,
        r#"["Reunião inicial em 10/05/2024.","E-mail com proposta enviado em 15/05/2024."]"#,
    )
    .await;

    let schema = test_schema(db.clone());
    let mutation = r#"
        mutation Move($id: ID!, $stage: DealStage!) {
            crm {
                moveDealStage(id: $id, stage: $stage) {
                    stage
                    contactHistory
                }
            }
        }
    "#;
    let resp = schema
        .execute(
            Request::new(mutation).variables(Variables::from_json(json!({
                "id": deal_id.to_string(),
                "stage": "PROPOSAL_SENT",
            }))),
        )
        .await;
    assert!(resp.errors.is_empty(), "errors: {:?}", resp.errors);
    let moved = &resp.data.into_json().unwrap()["crm"]["moveDealStage"];
    assert_eq!(moved["stage"], "PROPOSAL_SENT");
    assert_eq!(moved["contactHistory"].as_array().unwrap().len(), 2);

    // And the stored record is untouched.
    let stored = deal::Entity::find_by_id(deal_id)
        .one(db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.stage, deal::Stage::ProposalSent);
    assert_eq!(stored.contact_history.len(), 2);
}

#[tokio::test]
async fn stage_moves_append_history_monotonically() {
    let db = sqlite_db().await;
    let (company_id, contact_id, product_id) = seed_reference_graph(db.as_ref()).await;
    let deal_id = insert_deal(
        db.as_ref(),
        "Venda AKUA",
        36_000_000,
        "PROPOSAL_SENT",
        company_id,
        contact_id,
        product_id,
        r#"["Reunião inicial em 10/05/2024.","E-mail com proposta enviado em 15/05/2024."]"#,
    )
    .await;

    let schema = test_schema(db.clone());
    let mutation = r#"
        mutation Move($id: ID!, $stage: DealStage!) {
            crm {
                moveDealStage(id: $id, stage: $stage) {
                    stage
                    contactHistory
                }
            }
        }
    "#;

    let resp = schema
        .execute(
            Request::new(mutation).variables(Variables::from_json(json!({
                "id": deal_id.to_string(),
                "stage": "CLOSING",
            }))),
        )
        .await;
    assert!(resp.errors.is_empty(), "errors: {:?}", resp.errors);
    let moved = &resp.data.into_json().unwrap()["crm"]["moveDealStage"];
    assert_eq!(moved["stage"], "CLOSING");
    let history = moved["contactHistory"].as_array().cloned().unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0], "Reunião inicial em 10/05/2024.");
    assert_eq!(history[1], "E-mail com proposta enviado em 15/05/2024.");
    let expected =
        api::schema::stage_history_line(deal::Stage::Closing, Utc::now().date_naive());
    assert_eq!(history[2].as_str().unwrap(), expected);

    // A second transition appends exactly one more line and leaves the
    // earlier entries alone.
    let resp = schema
        .execute(
            Request::new(mutation).variables(Variables::from_json(json!({
                "id": deal_id.to_string(),
                "stage": "CONTACT_MADE",
            }))),
        )
        .await;
    assert!(resp.errors.is_empty(), "errors: {:?}", resp.errors);
    let moved = &resp.data.into_json().unwrap()["crm"]["moveDealStage"];
    let history = moved["contactHistory"].as_array().cloned().unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[2].as_str().unwrap(), expected);
    assert_eq!(
        history[3].as_str().unwrap(),
        api::schema::stage_history_line(deal::Stage::ContactMade, Utc::now().date_naive())
    );
}

#[tokio::test]
async fn created_deal_round_trips_through_load() {
    let db = sqlite_db().await;
    let (company_id, contact_id, product_id) = seed_reference_graph(db.as_ref()).await;

    let schema = test_schema(db.clone());
    let mutation = r#"
        mutation Create($input: NewDealInput!) {
            crm {
                createDeal(input: $input) {
                    id
                    contactHistory
                }
            }
        }
    "#;
    let resp = schema
        .execute(
            Request::new(mutation).variables(Variables::from_json(json!({
                "input": {
                    "title": "Sale A",
                    "valueCents": 1000,
                    "companyId": company_id.to_string(),
                    "contactId": contact_id.to_string(),
                    "productId": product_id.to_string(),
                }
            }))),
        )
        .await;
    assert!(resp.errors.is_empty(), "errors: {:?}", resp.errors);
    let created = resp.data.into_json().unwrap()["crm"]["createDeal"].clone();
    let created_id = created["id"].as_str().unwrap().to_string();
    assert!(!created_id.is_empty());
    assert_eq!(created["contactHistory"].as_array().unwrap().len(), 0);

    let query = r#"
        query Deals {
            crm {
                deals {
                    id
                    title
                    valueCents
                    stage
                    companyId
                    contactId
                    productId
                    contactHistory
                }
            }
        }
    "#;
    let resp = schema.execute(Request::new(query)).await;
    assert!(resp.errors.is_empty(), "errors: {:?}", resp.errors);
    let deals = resp.data.into_json().unwrap()["crm"]["deals"]
        .as_array()
        .cloned()
        .unwrap();
    assert_eq!(deals.len(), 1);
    let loaded = &deals[0];
    assert_eq!(loaded["id"].as_str().unwrap(), created_id);
    assert_eq!(loaded["title"], "Sale A");
    assert_eq!(loaded["valueCents"].as_i64().unwrap(), 1000);
    assert_eq!(loaded["stage"], "NO_CONTACT");
    assert_eq!(loaded["companyId"].as_str().unwrap(), company_id.to_string());
    assert_eq!(loaded["contactId"].as_str().unwrap(), contact_id.to_string());
    assert_eq!(loaded["productId"].as_str().unwrap(), product_id.to_string());
    assert_eq!(loaded["contactHistory"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn zero_value_is_accepted_and_negative_is_rejected() {
    let db = sqlite_db().await;
    let (company_id, contact_id, product_id) = seed_reference_graph(db.as_ref()).await;

    let schema = test_schema(db.clone());
    let mutation = r#"
        mutation Create($input: NewDealInput!) {
            crm {
                createDeal(input: $input) { id }
            }
        }
    "#;

    let resp = schema
        .execute(
            Request::new(mutation).variables(Variables::from_json(json!({
                "input": {
                    "title": "Comodato",
                    "valueCents": 0,
                    "companyId": company_id.to_string(),
                    "contactId": contact_id.to_string(),
                    "productId": product_id.to_string(),
                }
            }))),
        )
        .await;
    assert!(resp.errors.is_empty(), "errors: {:?}", resp.errors);

    let resp = schema
        .execute(
            Request::new(mutation).variables(Variables::from_json(json!({
                "input": {
                    "title": "Valor inválido",
                    "valueCents": -1,
                    "companyId": company_id.to_string(),
                    "contactId": contact_id.to_string(),
                    "productId": product_id.to_string(),
                }
            }))),
        )
        .await;
    assert!(!resp.errors.is_empty());
    let rendered = format!("{:?}", resp.errors);
    assert!(rendered.contains("VALIDATION"), "errors: {}", rendered);

    // The rejected deal never reached the store.
    let query = r#"query Deals { crm { deals { title } } }"#;
    let resp = schema.execute(Request::new(query)).await;
    let deals = resp.data.into_json().unwrap()["crm"]["deals"]
        .as_array()
        .cloned()
        .unwrap();
    assert_eq!(deals.len(), 1);
    assert_eq!(deals[0]["title"], "Comodato");
}

#[tokio::test]
async fn empty_title_is_rejected_before_persistence() {
    let db = sqlite_db().await;
    let (company_id, contact_id, product_id) = seed_reference_graph(db.as_ref()).await;

    let schema = test_schema(db.clone());
    let mutation = r#"
        mutation Create($input: NewDealInput!) {
            crm {
                createDeal(input: $input) { id }
            }
        }
    "#;
    let resp = schema
        .execute(
            Request::new(mutation).variables(Variables::from_json(json!({
                "input": {
                    "title": "   ",
                    "valueCents": 500,
                    "companyId": company_id.to_string(),
                    "contactId": contact_id.to_string(),
                    "productId": product_id.to_string(),
                }
            }))),
        )
        .await;
    assert!(!resp.errors.is_empty());
    let rendered = format!("{:?}", resp.errors);
    assert!(rendered.contains("VALIDATION"), "errors: {}", rendered);

    let query = r#"query Deals { crm { deals { id } } }"#;
    let resp = schema.execute(Request::new(query)).await;
    let deals = resp.data.into_json().unwrap()["crm"]["deals"]
        .as_array()
        .cloned()
        .unwrap();
    assert!(deals.is_empty());
}
