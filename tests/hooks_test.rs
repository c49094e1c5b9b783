//! End-to-end tests for the resource hooks against a mock API.
//!
//! Each test starts an httpmock server, points a `BarcodeClient` at it and
//! checks the requests sent, the cache effects and the redirects performed.

use barcode_client::config::{DEFAULT_LOGIN_URL, DEFAULT_UPGRADE_URL};
use barcode_client::hooks::{collection, community, frag, user};
use barcode_client::models::{
    CollectionView, FragForm, GrowthRate, Level, OopsReport, Rules, SettingUpdate, StatsResponse,
};
use barcode_client::{
    BarcodeClient, ClientConfig, Error, MutationStatus, QueryConfig, RecordingNavigator, Route,
};
use httpmock::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn client_with(server: &MockServer, nav: &RecordingNavigator, queries: QueryConfig) -> BarcodeClient {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = ClientConfig::default()
        .with_base_url(&server.url("/api"))
        .expect("mock server URL should parse");
    BarcodeClient::new(config, queries)
        .expect("client should build")
        .with_auth_handler(Arc::new(nav.clone()))
        .with_navigator(Arc::new(nav.clone()))
}

fn client(server: &MockServer, nav: &RecordingNavigator) -> BarcodeClient {
    client_with(server, nav, QueryConfig::default().with_retry(0))
}

fn member(id: u64, name: &str) -> Value {
    json!({ "id": id, "name": name })
}

fn frag_json(frag_id: u64, mother_id: u64, name: &str) -> Value {
    json!({
        "fragId": frag_id,
        "motherId": mother_id,
        "name": name,
        "type": "SPS",
        "rules": "dbtc",
        "status": "alive",
        "isAlive": true,
        "dateAcquired": "2024-03-01",
        "light": "HIGH",
        "flow": "MEDIUM",
        "hardiness": "MODERATE",
        "growthRate": "FAST",
        "owner": member(1, "Ann"),
        "ownsIt": true,
        "fragsAvailable": 2
    })
}

fn collection_json() -> Value {
    json!({
        "user": member(1, "Ann"),
        "frags": [frag_json(5, 5, "Walt Disney"), frag_json(9, 5, "Walt Disney #2")]
    })
}

/// Test 1: 401 Redirects Once
///
/// A 401 on a read sends the user to login exactly once, is not retried and
/// leaves no data or error in the cache.
#[tokio::test]
async fn test_unauthenticated_read_redirects_once() {
    let server = MockServer::start_async().await;
    let denied = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/dbtc/your-collection");
            then.status(401);
        })
        .await;

    let nav = RecordingNavigator::new();
    let client = client_with(
        &server,
        &nav,
        QueryConfig::default()
            .with_retry(3)
            .with_retry_delay(Duration::from_millis(1)),
    );

    let view = client.collection();
    let err = view.result().await.unwrap_err();

    assert!(matches!(err, Error::Unauthenticated { .. }));
    assert_eq!(nav.visits(), vec![DEFAULT_LOGIN_URL.to_string()]);
    denied.assert_hits_async(1).await;

    let state = view.current().unwrap();
    assert!(state.data.is_none());
    assert!(state.error.is_none());
}

/// Test 2: 403 Sends To The Upgrade Page
///
/// A 403 on a write redirects to the membership page and leaves the mutation
/// handle idle.
#[tokio::test]
async fn test_forbidden_write_redirects_to_upgrade() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(PUT).path("/api/impersonate/7");
            then.status(403);
        })
        .await;

    let nav = RecordingNavigator::new();
    let client = client(&server, &nav);

    let start = client.impersonate_start();
    let err = start.mutate_async(7).await.unwrap_err();

    assert!(matches!(err, Error::Forbidden { .. }));
    assert_eq!(nav.visits(), vec![DEFAULT_UPGRADE_URL.to_string()]);
    assert_eq!(start.status(), MutationStatus::Idle);
}

/// Test 3: Add Coral
///
/// Submitting the form posts multipart to /dbtc/add, then invalidates the
/// collection and navigates to it.
#[tokio::test]
async fn test_add_coral_invalidates_collection_and_navigates() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/dbtc/your-collection");
            then.status(200).json_body(collection_json());
        })
        .await;
    let add = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/dbtc/add")
                .body_contains("Red Dragon")
                .body_contains("SPS")
                .body_contains("private")
                .body_contains("HIGH")
                .body_contains("MODERATE")
                .body_contains("SLOW");
            then.status(200).json_body(json!({ "ok": true }));
        })
        .await;

    let nav = RecordingNavigator::new();
    let client = client(&server, &nav);

    let view = client.collection();
    assert_eq!(view.result().await.unwrap().data.unwrap().frags.len(), 2);
    assert!(!view.current().unwrap().is_stale);

    let form = FragForm {
        rules: Rules::Private,
        light: Level::High,
        flow: Level::High,
        growth_rate: GrowthRate::Slow,
        ..FragForm::new("Red Dragon", "SPS")
    };
    let save = client.save_frag();
    save.mutate_async(form).await.unwrap();

    add.assert_async().await;
    assert!(save.is_success());
    assert!(view.current().unwrap().is_stale, "Collection marked stale");
    assert_eq!(nav.visits(), vec![Route::COLLECTION.to_string()]);
}

/// Test 4: Invalid Form Never Reaches The API
#[tokio::test]
async fn test_invalid_form_is_rejected_locally() {
    let server = MockServer::start_async().await;
    let add = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/dbtc/add");
            then.status(200);
        })
        .await;

    let nav = RecordingNavigator::new();
    let client = client(&server, &nav);

    let save = client.save_frag();
    let err = save.mutate_async(FragForm::new("  ", "SPS")).await.unwrap_err();

    assert!(matches!(err, Error::Validation { .. }));
    assert!(save.is_error());
    assert!(nav.visits().is_empty());
    add.assert_hits_async(0).await;
}

/// Test 5: Become A Fan
///
/// PUT /dbtc/fan/42 invalidates the fan list and the collection; the next fan
/// read shows the new member.
#[tokio::test]
async fn test_become_fan_refreshes_fan_list() {
    let server = MockServer::start_async().await;
    let mut fans = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/dbtc/fan/42");
            then.status(200)
                .delay(Duration::from_millis(20))
                .json_body(json!({ "isFan": false, "likes": 1, "users": [member(2, "Bob")] }));
        })
        .await;
    let put = server
        .mock_async(|when, then| {
            when.method(PUT).path("/api/dbtc/fan/42");
            then.status(200).json_body(json!({
                "isFan": true,
                "likes": 2,
                "users": [member(2, "Bob"), member(1, "Ann")]
            }));
        })
        .await;

    let nav = RecordingNavigator::new();
    let client = client(&server, &nav);
    client
        .queries()
        .set_query_data(&collection::collection_key(), &collection_json())
        .unwrap();

    // Two panels open at once share one request.
    let left = client.frag_fans(42, true);
    let right = client.frag_fans(42, true);
    let (a, b) = futures::join!(left.result(), right.result());
    assert_eq!(a.unwrap().data, b.unwrap().data);
    fans.assert_hits_async(1).await;

    fans.delete_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/dbtc/fan/42");
            then.status(200).json_body(json!({
                "isFan": true,
                "likes": 2,
                "users": [member(2, "Bob"), member(1, "Ann")]
            }));
        })
        .await;

    let r#become = client.become_fan();
    let reply = r#become.mutate_async(42).await.unwrap();
    assert!(reply.is_fan);
    put.assert_async().await;

    let stats = client.queries().store().stats();
    assert_eq!(stats.invalidated, 2, "Fans and collection invalidated");

    let stale = left.result().await.unwrap();
    assert_eq!(stale.data.unwrap().users.len(), 1, "Old list shown while refetching");

    client.queries().settled(&frag::fans_key(42)).await;
    let fresh = left.current().unwrap().data.unwrap();
    assert!(fresh.is_fan);
    assert_eq!(fresh.users.len(), 2);
    assert_eq!(fresh.users[1].name, "Ann");
}

/// Test 6: Settings Toggle
#[tokio::test]
async fn test_settings_toggle_refetches_settings() {
    let server = MockServer::start_async().await;
    let mut get = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/user/settings");
            then.status(200)
                .json_body(json!({ "yourCollectionView": "cards", "theme": "dark" }));
        })
        .await;
    let put = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/api/user/settings/yourCollectionView/gallery");
            then.status(200);
        })
        .await;

    let nav = RecordingNavigator::new();
    let client = client(&server, &nav);

    let settings = client.fetch(collection::settings()).await.unwrap();
    assert_eq!(settings.your_collection_view, Some(CollectionView::Cards));
    assert_eq!(settings.extra.get("theme"), Some(&json!("dark")));

    get.delete_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/user/settings");
            then.status(200)
                .json_body(json!({ "yourCollectionView": "gallery", "theme": "dark" }));
        })
        .await;

    client
        .update_setting()
        .mutate_async(SettingUpdate::collection_view(CollectionView::Gallery))
        .await
        .unwrap();
    put.assert_async().await;

    let settings = client.fetch(collection::settings()).await.unwrap();
    assert_eq!(settings.your_collection_view, Some(CollectionView::Gallery));
}

/// Test 7: 404 Is Not Found, Not Retried
#[tokio::test]
async fn test_missing_resource_is_not_found() {
    let server = MockServer::start_async().await;
    let missing = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/tank/9");
            then.status(404);
        })
        .await;

    let nav = RecordingNavigator::new();
    let client = client_with(
        &server,
        &nav,
        QueryConfig::default()
            .with_retry(3)
            .with_retry_delay(Duration::from_millis(1)),
    );

    let state = client.tank(9).result().await.unwrap();
    assert!(state.is_error());
    assert!(state.error.unwrap().is_not_found());
    missing.assert_hits_async(1).await;
    assert!(nav.visits().is_empty());
}

/// Test 8: 5xx Is Retried Then Reported
#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start_async().await;
    let failing = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/market");
            then.status(503).body("maintenance");
        })
        .await;

    let nav = RecordingNavigator::new();
    let client = client_with(
        &server,
        &nav,
        QueryConfig::default()
            .with_retry(1)
            .with_retry_delay(Duration::from_millis(1)),
    );

    let state = client.marketplace().result().await.unwrap();
    assert!(state.is_error());
    match state.error {
        Some(Error::Server { status, message }) => {
            assert_eq!(status, 503);
            assert_eq!(message, "maintenance");
        }
        other => panic!("expected server error, got {:?}", other),
    }
    failing.assert_hits_async(2).await;
}

/// Test 9: Impersonation Round Trip
#[tokio::test]
async fn test_impersonation_invalidates_user() {
    let server = MockServer::start_async().await;
    let mut whoami = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/impersonate");
            then.status(200)
                .json_body(json!({ "name": "Admin", "canImpersonate": true, "impersonating": false }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(PUT).path("/api/impersonate/7");
            then.status(200);
        })
        .await;
    let stop = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/impersonate");
            then.status(200);
        })
        .await;

    let nav = RecordingNavigator::new();
    let client = client(&server, &nav);

    let me = client.fetch(user::user()).await.unwrap();
    assert!(me.can_impersonate);
    assert!(!me.impersonating);

    whoami.delete_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/impersonate");
            then.status(200)
                .json_body(json!({ "name": "Bob", "canImpersonate": false, "impersonating": true }));
        })
        .await;

    client.impersonate_start().mutate_async(7).await.unwrap();
    let me = client.fetch(user::user()).await.unwrap();
    assert!(me.impersonating);
    assert_eq!(me.name, "Bob");

    client.impersonate_stop().mutate_async(()).await.unwrap();
    stop.assert_async().await;
    assert_eq!(client.queries().store().stats().invalidated, 1);
}

/// Test 10: Frag Detail Picks From The Collection
#[tokio::test]
async fn test_frag_detail_selects_from_collection() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/dbtc/your-collection");
            then.status(200).json_body(collection_json());
        })
        .await;

    let nav = RecordingNavigator::new();
    let client = client(&server, &nav);

    let found = client.frag_detail(9, true).result().await.unwrap();
    let detail = found.data.unwrap();
    assert_eq!(detail.frag.frag_id, 9);
    assert_eq!(detail.frag.mother_id, 5);
    assert_eq!(detail.user.name, "Ann");

    let missing = client.frag_detail(404, true).result().await.unwrap();
    assert!(missing.data.is_none());
    assert!(missing.error.unwrap().is_not_found());
}

/// Test 11: Gated Lineage Stays Silent
#[tokio::test]
async fn test_gated_lineage_makes_no_request() {
    let server = MockServer::start_async().await;
    let tree = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/dbtc/tree/5");
            then.status(200).json_body(json!({
                "root": {
                    "fragId": 5,
                    "text": "Walt Disney",
                    "owner": member(1, "Ann"),
                    "isAlive": true,
                    "children": [{
                        "fragId": 9,
                        "text": "Walt Disney #2",
                        "owner": member(2, "Bob"),
                        "isAlive": false
                    }]
                }
            }));
        })
        .await;

    let nav = RecordingNavigator::new();
    let client = client(&server, &nav);

    let mut lineage = client.frag_lineage(5, false);
    assert!(lineage.result().await.unwrap().data.is_none());
    tree.assert_hits_async(0).await;

    lineage.set_enabled(true);
    let root = lineage.result().await.unwrap().data.unwrap().root;
    assert_eq!(root.size(), 2);
    assert_eq!(root.alive_count(), 1);
    tree.assert_hits_async(1).await;
}

/// Test 12: Share Link And Problem Report
#[tokio::test]
async fn test_share_and_report_oops() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/dbtc/share/5");
            then.status(200)
                .json_body(json!({ "url": "https://bareefers.org/bc/share/abc123" }));
        })
        .await;
    let oops = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/dbtc/oops/5")
                .body_contains("notes")
                .body_contains("wrong mother listed");
            then.status(200);
        })
        .await;

    let nav = RecordingNavigator::new();
    let client = client(&server, &nav);

    let link = client.share_frag().mutate_async(5).await.unwrap();
    assert!(link.url.ends_with("abc123"));
    assert!(client.queries().store().is_empty(), "Share links are not cached");

    client
        .report_oops()
        .mutate_async(OopsReport {
            frag_id: 5,
            notes: "wrong mother listed".into(),
        })
        .await
        .unwrap();
    oops.assert_async().await;
}

/// Test 13: Slow Response Times Out And Keeps Cached Stats
#[tokio::test]
async fn test_request_timeout_keeps_previous_data() {
    let server = MockServer::start_async().await;
    let slow = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/public/stats");
            then.status(200)
                .delay(Duration::from_millis(500))
                .json_body(json!({
                    "totalFrags": 99, "totalMembers": 9, "dbtcFrags": 9,
                    "pifFrags": 9, "privateFrags": 9, "aliveFrags": 9
                }));
        })
        .await;

    let config = ClientConfig::default()
        .with_base_url(&server.url("/api"))
        .unwrap()
        .with_timeout(Duration::from_millis(50));
    let client = BarcodeClient::new(config, QueryConfig::default().with_retry(0)).unwrap();

    let seeded = StatsResponse {
        total_frags: 12,
        total_members: 3,
        dbtc_frags: 4,
        pif_frags: 5,
        private_frags: 3,
        alive_frags: 10,
        top_types: vec![],
    };
    client
        .queries()
        .set_query_data(community::stats().key(), &seeded)
        .unwrap();

    let state = client.stats().refetch().await.unwrap();
    assert!(
        matches!(state.error, Some(Error::Timeout(_))),
        "expected timeout, got {:?}",
        state.error
    );
    assert_eq!(state.data, Some(seeded));
    slow.assert_async().await;
}
