//! REST datastore client against a mocked gateway

use league_engine::store::{procedures, tables, Datastore, Filter, PostgrestStore, Query, StoreError};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store(server: &MockServer) -> PostgrestStore {
    PostgrestStore::new(&server.uri(), "service-key").unwrap()
}

#[tokio::test]
async fn test_select_sends_auth_and_query_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/ai_league_stats"))
        .and(header("apikey", "service-key"))
        .and(header("authorization", "Bearer service-key"))
        .and(query_param("select", "wallet_balance"))
        .and(query_param("model_id", "eq.grok_3_beta"))
        .and(query_param("order", "date.desc"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "wallet_balance": "10250.00" }])))
        .expect(1)
        .mount(&server)
        .await;

    let rows = store(&server)
        .select(
            tables::AI_LEAGUE_STATS,
            &Query::new()
                .columns("wallet_balance")
                .eq("model_id", "grok_3_beta")
                .order_desc("date")
                .limit(1),
        )
        .await
        .unwrap();
    assert_eq!(rows, vec![json!({ "wallet_balance": "10250.00" })]);
}

#[tokio::test]
async fn test_range_filters_for_active_modifiers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/governance_proposals"))
        .and(query_param("status", "eq.EXECUTED"))
        .and(query_param("active_from", "lte.2026-10-19"))
        .and(query_param("active_until", "gte.2026-10-19"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let rows = store(&server)
        .select(
            tables::GOVERNANCE_PROPOSALS,
            &Query::new()
                .eq("status", "EXECUTED")
                .lte("active_from", "2026-10-19")
                .gte("active_until", "2026-10-19"),
        )
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_upsert_merges_on_conflict_columns() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/ai_league_stats"))
        .and(query_param("on_conflict", "model_id,date"))
        .and(body_json(json!([{ "model_id": "alpha", "date": "2026-10-19" }])))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    store(&server)
        .upsert(
            tables::AI_LEAGUE_STATS,
            vec![json!({ "model_id": "alpha", "date": "2026-10-19" })],
            &["model_id", "date"],
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_insert_and_update_return_rows() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/ai_achievements"))
        .and(header("prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": 7, "model_id": "alpha" }])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/guilds"))
        .and(query_param("id", "eq.g1"))
        .and(body_json(json!({ "roi_7d": 4.2 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "g1", "roi_7d": 4.2 }])))
        .mount(&server)
        .await;

    let store = store(&server);
    let inserted = store
        .insert(tables::AI_ACHIEVEMENTS, vec![json!({ "model_id": "alpha" })])
        .await
        .unwrap();
    assert_eq!(inserted[0]["id"], 7);

    let touched = store
        .update(tables::GUILDS, &[Filter::eq("id", "g1")], json!({ "roi_7d": 4.2 }))
        .await
        .unwrap();
    assert_eq!(touched, 1);
}

#[tokio::test]
async fn test_rpc_posts_arguments() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/award_user_xp"))
        .and(body_json(json!({ "p_user_id": "u1", "p_xp_amount": 200 })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let result = store(&server)
        .rpc(procedures::AWARD_USER_XP, json!({ "p_user_id": "u1", "p_xp_amount": 200 }))
        .await
        .unwrap();
    assert!(result.is_null());
}

#[tokio::test]
async fn test_error_status_carries_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/join_guild"))
        .respond_with(ResponseTemplate::new(400).set_body_string("insufficient balance"))
        .mount(&server)
        .await;

    let err = store(&server)
        .rpc(procedures::JOIN_GUILD, json!({}))
        .await
        .unwrap_err();
    match err {
        StoreError::Status { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "insufficient balance");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_auth_users_accepts_page_or_array() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/admin/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [
                { "id": "u1", "email": "ada@example.com", "role": "authenticated" },
                { "id": "u2" }
            ],
            "aud": "authenticated"
        })))
        .mount(&server)
        .await;

    let users = store(&server).list_auth_users().await.unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].email.as_deref(), Some("ada@example.com"));
    assert!(users[1].email.is_none());

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/admin/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "u3" }])))
        .mount(&server)
        .await;
    let users = store(&server).list_auth_users().await.unwrap();
    assert_eq!(users[0].id, "u3");
}
