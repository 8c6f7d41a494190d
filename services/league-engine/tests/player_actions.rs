//! Player-facing operations against the in-memory datastore

mod common;

use common::field;
use league_engine::actions::{OptionPurchase, ParlaySlip, SlipLeg, VoteSide};
use league_engine::models::{BetStatus, OptionStatus};
use league_engine::store::{procedures, tables};
use league_engine::{ActionError, MemoryStore, PlayerActions};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;

fn actions(store: &Arc<MemoryStore>) -> PlayerActions {
    PlayerActions::new(store.clone())
}

fn purchase(premium: i64) -> OptionPurchase {
    OptionPurchase {
        model_id: Some("grok_3_beta".to_string()),
        match_id: "m1".to_string(),
        premium: Decimal::from(premium),
        strike_confidence: 0.8,
        payout_multiplier: None,
    }
}

#[tokio::test]
async fn test_signed_out_calls_are_rejected() {
    let store = Arc::new(MemoryStore::new());
    let actions = actions(&store);

    assert!(matches!(actions.balance(None).await, Err(ActionError::Unauthorized)));
    assert!(matches!(
        actions.join_guild(None, "g1", Decimal::from(10)).await,
        Err(ActionError::Unauthorized)
    ));
    assert!(matches!(
        actions.checkout(None, "starter").await,
        Err(ActionError::Unauthorized)
    ));
    assert!(store.rpc_calls().await.is_empty());
}

#[tokio::test]
async fn test_guilds_listed_by_return_and_joined_through_ledger() {
    let store = Arc::new(MemoryStore::new());
    store
        .seed(
            tables::GUILDS,
            vec![
                json!({ "id": "g1", "name": "Steady", "risk_level": "Low Risk", "roi_7d": 1.5 }),
                json!({ "id": "g2", "name": "Degens", "risk_level": "High Risk", "roi_7d": 9.25 }),
            ],
        )
        .await;
    store
        .seed(
            tables::GUILD_MEMBERSHIPS,
            vec![
                json!({ "user_id": "u1", "guild_id": "g2", "staked_capital": "250.00" }),
                json!({ "user_id": "u2", "guild_id": "g1", "staked_capital": "10.00" }),
            ],
        )
        .await;
    let actions = actions(&store);

    let guilds = actions.list_guilds().await.unwrap();
    assert_eq!(guilds[0].id, "g2");

    let memberships = actions.memberships(Some("u1")).await.unwrap();
    assert_eq!(memberships.len(), 1);
    assert_eq!(memberships[0].guild_id, "g2");

    assert!(matches!(
        actions.join_guild(Some("u1"), "g1", Decimal::ZERO).await,
        Err(ActionError::InvalidRequest(_))
    ));
    actions
        .join_guild(Some("u1"), "g1", Decimal::from(100))
        .await
        .unwrap();
    assert_eq!(
        store.calls_to(procedures::JOIN_GUILD).await,
        vec![json!({ "p_user_id": "u1", "p_guild_id": "g1", "p_amount": 100.0 })]
    );
}

#[tokio::test]
async fn test_option_purchase_debits_premium() {
    let store = Arc::new(MemoryStore::new());
    store
        .seed(tables::PROFILES, vec![json!({ "id": "u1", "balance": "100.00" })])
        .await;
    let actions = actions(&store);

    let option = actions.purchase_option(Some("u1"), purchase(40)).await.unwrap();
    assert_eq!(option.status, OptionStatus::Pending);
    assert_eq!(option.multiplier(), Decimal::TWO);
    assert_eq!(option.user_id, "u1");

    assert_eq!(
        store.calls_to(procedures::INCREMENT_PROFILE_BALANCE).await,
        vec![json!({ "p_user_id": "u1", "p_amount": -40.0 })]
    );

    let listed = actions.list_options(Some("u1")).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(actions.list_options(Some("u2")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_option_purchase_requires_funds() {
    let store = Arc::new(MemoryStore::new());
    store
        .seed(tables::PROFILES, vec![json!({ "id": "u1", "balance": "10.00" })])
        .await;
    let actions = actions(&store);

    assert!(matches!(
        actions.purchase_option(Some("u1"), purchase(40)).await,
        Err(ActionError::InsufficientBalance)
    ));
    assert!(matches!(
        actions.purchase_option(Some("nobody"), purchase(40)).await,
        Err(ActionError::InsufficientBalance)
    ));
    assert!(matches!(
        actions.purchase_option(Some("u1"), purchase(0)).await,
        Err(ActionError::InvalidRequest(_))
    ));
    assert!(store.rows(tables::BLACK_SWAN_OPTIONS).await.is_empty());
    assert!(store.rpc_calls().await.is_empty());
}

#[tokio::test]
async fn test_votes_go_through_procedure() {
    let store = Arc::new(MemoryStore::new());
    store
        .seed(
            tables::GOVERNANCE_PROPOSALS,
            vec![
                json!({ "id": "p1", "title": "Old", "status": "DEFEATED", "created_at": "2026-10-01T00:00:00Z" }),
                json!({ "id": "p2", "title": "New", "status": "ACTIVE", "created_at": "2026-10-18T00:00:00Z" }),
            ],
        )
        .await;
    let actions = actions(&store);

    let proposals = actions.list_proposals().await.unwrap();
    assert_eq!(proposals[0].title(), "New");

    actions
        .cast_vote(Some("u1"), "p2", VoteSide::Yes, 300.0)
        .await
        .unwrap();
    assert_eq!(
        store.calls_to(procedures::CAST_GOVERNANCE_VOTE).await,
        vec![json!({ "p_user_id": "u1", "p_proposal_id": "p2", "p_vote_type": "YES", "p_power": 300.0 })]
    );
}

#[tokio::test]
async fn test_checkout_tops_up_and_grants_pro() {
    let store = Arc::new(MemoryStore::new());
    store
        .seed(tables::PROFILES, vec![json!({ "id": "u1", "balance": "0" })])
        .await;
    let actions = actions(&store);

    let receipt = actions.checkout(Some("u1"), "governor").await.unwrap();
    assert!(receipt.reference.starts_with("MOCK_TX_"));
    let topups = store.calls_to(procedures::TOPUP_USER_CREDITS).await;
    assert_eq!(topups[0]["p_amount"], 5000);
    assert_eq!(topups[0]["p_type"], "PURCHASE");
    assert_eq!(topups[0]["p_desc"], "Acquired governor package");
    assert!(field(&store.rows(tables::PROFILES).await[0], "is_pro").is_null());

    actions.checkout(Some("u1"), "subscription_pro").await.unwrap();
    let topups = store.calls_to(procedures::TOPUP_USER_CREDITS).await;
    assert_eq!(topups[1]["p_type"], "SUBSCRIPTION");
    let profile = &store.rows(tables::PROFILES).await[0];
    assert_eq!(field(profile, "is_pro"), true);
    assert!(field(profile, "pro_expires_at").is_string());

    assert!(matches!(
        actions.checkout(Some("u1"), "whale").await,
        Err(ActionError::UnknownPackage(_))
    ));
}

#[tokio::test]
async fn test_balance_and_notifications() {
    let store = Arc::new(MemoryStore::new());
    store
        .seed(tables::PROFILES, vec![json!({ "id": "u1", "balance": "42.50" })])
        .await;
    let notes = (0..25)
        .map(|i| {
            json!({ "id": i, "user_id": "u1", "title": format!("Note {}", i),
                    "created_at": format!("2026-10-18T10:{:02}:00Z", i) })
        })
        .collect();
    store.seed(tables::USER_NOTIFICATIONS, notes).await;
    let actions = actions(&store);

    assert_eq!(actions.balance(Some("u1")).await.unwrap(), Decimal::new(4250, 2));
    assert!(actions.balance(Some("u2")).await.is_err());

    let feed = actions.notifications(Some("u1")).await.unwrap();
    assert_eq!(feed.len(), 20);
    assert_eq!(feed[0].id, "24");
}

#[tokio::test]
async fn test_parlay_recorded_and_linked() {
    let store = Arc::new(MemoryStore::new());
    let actions = actions(&store);
    let mut rng = StdRng::seed_from_u64(3);
    let slip = ParlaySlip {
        legs: vec![
            SlipLeg {
                full_match: Some("Arsenal vs Chelsea".to_string()),
                team: Some("Arsenal".to_string()),
                market: Some("Moneyline".to_string()),
                odds: Some(2.0),
                ..SlipLeg::default()
            },
            SlipLeg {
                full_match: Some("Liverpool vs Everton".to_string()),
                market: Some("Totals".to_string()),
                selection: Some("Over 2.5".to_string()),
                odds: Some(1.8),
                ..SlipLeg::default()
            },
        ],
        odds: Some(3.6),
        stake: None,
    };

    let ticket = actions.record_parlay(Some("u1"), &slip, &mut rng).await.unwrap();
    assert_eq!(ticket.kind.as_deref(), Some("2-Fold Parlay"));
    assert_eq!(ticket.status, BetStatus::Pending);
    assert_eq!(ticket.stake, Some(Decimal::from(100)));
    assert_eq!(ticket.legs[0].pick(), Some("Arsenal"));
    assert_eq!(ticket.legs[1].pick(), Some("Over 2.5"));
    assert!(ticket.ticket_id.as_deref().unwrap().starts_with("tx_usr_"));

    let bets = store.rows(tables::USER_BETS).await;
    assert_eq!(bets.len(), 1);
    assert_eq!(field(&bets[0], "ticket_id"), ticket.id.as_str());
    assert_eq!(field(&bets[0], "user_id"), "u1");

    // Anonymous slips are recorded without a linked bet
    actions.record_parlay(None, &slip, &mut rng).await.unwrap();
    assert_eq!(store.rows(tables::PARLAY_TICKETS).await.len(), 2);
    assert_eq!(store.rows(tables::USER_BETS).await.len(), 1);

    let history = actions.betting_history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].bets_placed, 2);
    assert_eq!(history[0].total_pnl, Decimal::ZERO);
}
