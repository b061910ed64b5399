use assert_matches::assert_matches;
use chrono::{TimeZone, Utc};
use cyclecount_api::{
    config::WorkbookConfig,
    errors::StoreError,
    models::{CountDay, CountSession, HistoryFilter, Location, SessionScope},
    stores::{workbook::WorkbookStore, HistoryStore, InventoryStore, SessionStore, SkuCatalog},
};
use serde_json::{json, Value};
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const TABLES: &str = "/sites/site-1/drive/items";

fn rows_path(file: &str, table: &str) -> String {
    format!("{TABLES}/{file}/workbook/tables/{table}/rows")
}

fn store_for(server: &MockServer) -> WorkbookStore {
    let config = WorkbookConfig {
        api_base: server.uri(),
        site_id: Some("site-1".into()),
        access_token: Some("tok".into()),
        components_file_id: Some("components".into()),
        history_file_id: Some("history".into()),
        cycle_counts_file_id: Some("cycles".into()),
        weekly_counts_file_id: Some("weekly".into()),
        high_volume_skus_file_id: Some("hv".into()),
        timeout_secs: 5,
    };
    WorkbookStore::from_config(&config).expect("store should build")
}

fn page(rows: Vec<Value>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "value": rows }))
}

async fn serve_rows(server: &MockServer, file: &str, table: &str, rows: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path(rows_path(file, table)))
        .and(header("Authorization", "Bearer tok"))
        .respond_with(page(rows))
        .mount(server)
        .await;
}

fn history_row(index: u64, sku: &str, location: &str, timestamp: &str) -> Value {
    json!({
        "index": index,
        "values": [[
            format!("00000000-0000-0000-0000-00000000000{index}"),
            sku,
            4,
            "monthly",
            "Cycle_2026-10_MtD",
            timestamp,
            "user",
            "Counted on 10/14/2026 at 02:30:00 PM using Monthly Count at MtD",
            location
        ]]
    })
}

#[tokio::test]
async fn existing_component_is_patched_in_place() {
    let server = MockServer::start().await;
    serve_rows(
        &server,
        "components",
        "ComponentsTable",
        vec![
            json!({ "index": 0, "values": [["c-1", "SKU1", "Widget", 1, 0, 0, 0, 1, 0]] }),
            json!({ "index": 1, "values": [["c-2", "SKU2", "Gadget", 0, 0, 4, 0, 4, 0]] }),
        ],
    )
    .await;
    Mock::given(method("PATCH"))
        .and(path(format!(
            "{}/itemAt(index=1)",
            rows_path("components", "ComponentsTable")
        )))
        .and(body_json(json!({
            "values": [["c-2", "SKU2", "Gadget", 0, 0, 6, 0, 6, 0]]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let updated = store
        .set_component_quantity("SKU2", Location::Hstd, 6)
        .await
        .unwrap();
    assert_eq!(updated.hstd_quantity, 6);
    assert_eq!(updated.total_quantity, 6);
}

#[tokio::test]
async fn unknown_component_is_added() {
    let server = MockServer::start().await;
    serve_rows(&server, "components", "ComponentsTable", vec![]).await;
    Mock::given(method("POST"))
        .and(path(format!(
            "{}/add",
            rows_path("components", "ComponentsTable")
        )))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let created = store
        .set_component_quantity("SKU9", Location::FtP, 2)
        .await
        .unwrap();
    assert_eq!(created.ftp_quantity, 2);
    assert_eq!(created.total_quantity, 2);
}

#[tokio::test]
async fn history_is_filtered_client_side_and_deleted_highest_index_first() {
    let server = MockServer::start().await;
    serve_rows(
        &server,
        "history",
        "CountHistoryTable",
        vec![
            history_row(0, "SKU1", "MtD", "2026-10-14T14:30:00+00:00"),
            history_row(1, "SKU2", "MtD", "2026-10-14T14:31:00+00:00"),
            history_row(2, "SKU1", "MtD", "2026-10-15T09:00:00+00:00"),
            json!({ "index": 3, "values": [["bad", "SKU1", "many", "monthly"]] }),
            json!({ "index": 4, "values": [[
                "not-a-uuid", "SKU1", 4, "monthly", "Cycle_2026-10_MtD",
                "2026-10-14T15:00:00+00:00", "user", "", "MtD"
            ]] }),
            json!({ "index": 5, "values": [[
                "00000000-0000-0000-0000-000000000005", "SKU1", 4, "monthly", "Cycle_2026-10_MtD",
                "2026-10-14T15:00:00+00:00", "robot", "", "MtD"
            ]] }),
        ],
    )
    .await;
    for index in [0, 2] {
        Mock::given(method("DELETE"))
            .and(path(format!(
                "{}/itemAt(index={index})",
                rows_path("history", "CountHistoryTable")
            )))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
    }

    let store = store_for(&server);
    let filter = HistoryFilter::for_barcode("SKU1", Location::MtD);

    let entries = store.query_history(&filter).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].timestamp > entries[1].timestamp);

    let deleted = store.delete_history(&filter).await.unwrap();
    assert_eq!(deleted, 2);

    let deletes: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|request| request.method.as_str() == "DELETE")
        .map(|request| request.url.path().to_string())
        .collect();
    assert!(deletes[0].ends_with("itemAt(index=2)"));
    assert!(deletes[1].ends_with("itemAt(index=0)"));
    assert_eq!(deletes.len(), 2);
}

#[tokio::test]
async fn stored_session_row_is_updated_not_duplicated() {
    let server = MockServer::start().await;
    let now = Utc.with_ymd_and_hms(2026, 10, 14, 14, 30, 0).unwrap();
    serve_rows(
        &server,
        "weekly",
        "WeeklyCountsHstdTable",
        vec![json!({
            "index": 4,
            "values": [[
                "Weekly_2026-10-12_HSTD_Monday",
                "2026-10-12T08:00:00+00:00",
                "2026-10-12T08:05:00+00:00",
                "{\"SKU300\":3}",
                "Monday",
                "FALSE",
                "HSTD"
            ]]
        })],
    )
    .await;
    Mock::given(method("PATCH"))
        .and(path(format!(
            "{}/itemAt(index=4)",
            rows_path("weekly", "WeeklyCountsHstdTable")
        )))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let scope = SessionScope::weekly(CountDay::Monday);
    let mut session = store
        .get_session(&scope.session_id(now))
        .await
        .unwrap()
        .expect("session row should decode");
    assert_eq!(session.progress.get("SKU300"), Some(&3));
    assert!(!session.completed);

    session.record("SKU301", 7, now);
    store.put_session(&session).await.unwrap();
}

#[tokio::test]
async fn new_session_is_appended() {
    let server = MockServer::start().await;
    let now = Utc.with_ymd_and_hms(2026, 10, 14, 14, 30, 0).unwrap();
    serve_rows(&server, "cycles", "CycleCountsTable", vec![]).await;
    Mock::given(method("POST"))
        .and(path(format!("{}/add", rows_path("cycles", "CycleCountsTable"))))
        .and(body_json(json!({
            "values": [[
                "Cycle_2026-10_FtP",
                "2026-10-14T14:30:00+00:00",
                "2026-10-14T14:30:00+00:00",
                "{}",
                "FALSE",
                "user",
                "FtP"
            ]]
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let scope = SessionScope::monthly(Location::FtP);
    let session = CountSession::open(scope.session_id(now), scope, now);
    store.put_session(&session).await.unwrap();
}

#[tokio::test]
async fn weekly_expected_skus_come_from_the_days_list() {
    let server = MockServer::start().await;
    serve_rows(
        &server,
        "hv",
        "HighVolumeSkusTable",
        vec![
            json!({ "values": [["1", "SKU300", "Monday", "HSTD"]] }),
            json!({ "values": [["2", "SKU301", "Monday", "HSTD"]] }),
            json!({ "values": [["3", "SKU302", "Tuesday", "HSTD"]] }),
            json!({ "values": [["4", "", "Monday", "HSTD"]] }),
        ],
    )
    .await;

    let store = store_for(&server);
    let expected = store
        .list_expected_skus(&SessionScope::weekly(CountDay::Monday))
        .await
        .unwrap();
    assert_eq!(
        expected.into_iter().collect::<Vec<_>>(),
        vec!["SKU300".to_string(), "SKU301".to_string()]
    );
}

#[tokio::test]
async fn api_failures_surface_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("InvalidAuthenticationToken"))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let err = store.ping().await.unwrap_err();
    assert_matches!(
        err,
        StoreError::Api { status: 401, ref message } if message == "InvalidAuthenticationToken"
    );
}

#[test]
fn missing_settings_are_reported() {
    let config = WorkbookConfig {
        access_token: Some("tok".into()),
        ..Default::default()
    };
    let err = WorkbookStore::from_config(&config).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("site_id"));
    assert!(message.contains("history_file_id"));
    assert!(!message.contains("access_token"));
}
