mod common;

use axum::http::{Method, StatusCode};
use chrono::Duration;
use common::TestApp;
use cyclecount_api::models::{CountDay, Location};
use cyclecount_api::stores::InventoryStore;
use serde_json::{json, Value};

fn monthly(barcode: &str, quantity: Value, location: &str) -> Value {
    json!({ "barcode": barcode, "quantity": quantity, "location": location })
}

fn weekly(barcode: &str, quantity: Value, day: &str) -> Value {
    json!({ "barcode": barcode, "quantity": quantity, "kind": "weekly", "day": day })
}

async fn on_hand(app: &TestApp, barcode: &str, location: Location) -> i32 {
    app.store
        .get_component_quantity(barcode, location)
        .await
        .expect("stock lookup failed")
}

#[tokio::test]
async fn matching_monthly_count_is_accepted() {
    let app = TestApp::new().await;
    app.stock("SKU100", Location::MtD, 12).await;

    let (status, body) = app
        .json(Method::POST, "/api/v1/counts", Some(monthly("SKU100", json!("12"), "MtD")))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let data = &body["data"];
    assert_eq!(data["quantity"], 12);
    assert_eq!(data["location"], "MtD");
    assert_eq!(data["session"]["id"], "Cycle_2026-10_MtD");
    assert_eq!(data["session"]["progress"]["SKU100"], 12);
    assert_eq!(
        data["provenance"],
        "Counted on 10/14/2026 at 02:30:00 PM using Monthly Count at MtD"
    );

    let (status, history) = app
        .json(Method::GET, "/api/v1/history/monthly/SKU100?location=MtD", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let entries = history["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["session_id"], "Cycle_2026-10_MtD");
    assert_eq!(entries[0]["count_type"], "monthly");
}

#[tokio::test]
async fn numeric_quantity_is_accepted_like_text() {
    let app = TestApp::new().await;
    app.stock("SKU100", Location::FtP, 4).await;

    let (status, body) = app
        .json(Method::POST, "/api/v1/counts", Some(monthly("SKU100", json!(4), "FtP")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["quantity"], 4);
}

#[tokio::test]
async fn mismatched_quantity_is_rejected_without_writes() {
    let app = TestApp::new().await;
    app.stock("SKU200", Location::Hstd, 8).await;

    let (status, body) = app
        .json(Method::POST, "/api/v1/counts", Some(monthly("SKU200", json!("5"), "HSTD")))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Expected: 8, Entered: 5"));
    assert_eq!(body["details"], json!({ "expected": 8, "entered": 5 }));

    assert_eq!(on_hand(&app, "SKU200", Location::Hstd).await, 8);
    let (_, sessions) = app
        .json(Method::GET, "/api/v1/sessions?kind=monthly&location=HSTD", None)
        .await;
    assert_eq!(sessions["data"], json!([]));
    let (_, history) = app.json(Method::GET, "/api/v1/history", None).await;
    assert_eq!(history["data"], json!([]));
}

#[tokio::test]
async fn invalid_input_is_a_bad_request() {
    let app = TestApp::new().await;
    app.stock("SKU100", Location::MtD, 1).await;

    let cases = [
        (json!({ "quantity": "1", "location": "MtD" }), "Please enter a barcode."),
        (json!({ "barcode": "SKU100", "location": "MtD" }), "Please enter a quantity."),
        (monthly("SKU100", json!("-1"), "MtD"), "Invalid quantity"),
        (monthly("SKU100", json!("2.5"), "MtD"), "Invalid quantity"),
        (json!({ "barcode": "SKU100", "quantity": "1" }), "No location selected"),
        (monthly("SKU100", json!("1"), "Warehouse"), "Invalid location"),
    ];
    for (payload, expected) in cases {
        let (status, body) = app.json(Method::POST, "/api/v1/counts", Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{expected}");
        assert!(
            body["message"].as_str().unwrap().starts_with(expected),
            "{} should start with {}",
            body["message"],
            expected
        );
    }
}

#[tokio::test]
async fn conflicting_sibling_count_needs_confirmation() {
    let app = TestApp::new().await;
    app.high_volume("SKU300", CountDay::Monday).await;
    app.high_volume("SKU301", CountDay::Monday).await;
    app.stock("SKU300", Location::Hstd, 3).await;

    let (status, _) = app
        .json(Method::POST, "/api/v1/counts", Some(weekly("SKU300", json!("3"), "Monday")))
        .await;
    assert_eq!(status, StatusCode::OK);

    // Stock moves before the monthly count reaches the same SKU.
    app.stock("SKU300", Location::Hstd, 9).await;

    let (status, body) = app
        .json(Method::POST, "/api/v1/counts", Some(monthly("SKU300", json!("9"), "HSTD")))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["details"]["session_label"], "Monday weekly count");
    assert_eq!(body["details"]["previous_quantity"], 3);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("previously counted with a quantity of 3 in the Monday weekly count"));

    let mut declined = monthly("SKU300", json!("9"), "HSTD");
    declined["confirm_override"] = json!(false);
    let (status, body) = app.json(Method::POST, "/api/v1/counts", Some(declined)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Count not updated. Please recount if necessary.");
    let (_, monthly_status) = app
        .json(Method::GET, "/api/v1/sessions/status?location=HSTD", None)
        .await;
    assert_eq!(monthly_status["data"]["session"]["progress"], json!({ "SKU300": 3 }));

    let mut confirmed = monthly("SKU300", json!("9"), "HSTD");
    confirmed["confirm_override"] = json!(true);
    let (status, body) = app.json(Method::POST, "/api/v1/counts", Some(confirmed)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["conflict_overridden"], true);
    assert_eq!(body["data"]["session"]["progress"]["SKU300"], 9);
    assert_eq!(on_hand(&app, "SKU300", Location::Hstd).await, 9);
}

#[tokio::test]
async fn weekly_count_rejects_skus_outside_the_days_list() {
    let app = TestApp::new().await;
    app.high_volume("SKU300", CountDay::Monday).await;
    app.stock("SKU999", Location::Hstd, 2).await;

    let (status, body) = app
        .json(Method::POST, "/api/v1/counts", Some(weekly("SKU999", json!("2"), "Monday")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Barcode SKU999 is not part of the Monday weekly count."
    );
}

#[tokio::test]
async fn weekly_count_mirrors_into_started_monthly_session() {
    let app = TestApp::new().await;
    app.high_volume("SKU300", CountDay::Tuesday).await;
    app.stock("SKU300", Location::Hstd, 6).await;

    let (status, _) = app
        .json(
            Method::POST,
            "/api/v1/sessions/start",
            Some(json!({ "location": "HSTD" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .json(Method::POST, "/api/v1/counts", Some(weekly("SKU300", json!("6"), "Tuesday")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["session"]["id"], "Weekly_2026-10-12_HSTD_Tuesday");
    assert_eq!(body["data"]["session"]["completed"], true);

    let (_, status_body) = app
        .json(Method::GET, "/api/v1/sessions/status?location=HSTD", None)
        .await;
    assert_eq!(status_body["data"]["session"]["progress"]["SKU300"], 6);
}

#[tokio::test]
async fn weekly_count_opens_the_monthly_session_when_missing() {
    let app = TestApp::new().await;
    app.high_volume("SKU300", CountDay::Monday).await;
    app.stock("SKU300", Location::Hstd, 3).await;

    let (status, _) = app
        .json(Method::POST, "/api/v1/counts", Some(weekly("SKU300", json!("3"), "Monday")))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, status_body) = app
        .json(Method::GET, "/api/v1/sessions/status?location=HSTD", None)
        .await;
    let session = &status_body["data"]["session"];
    assert_eq!(session["id"], "Cycle_2026-10_HSTD");
    assert_eq!(session["progress"], json!({ "SKU300": 3 }));
    assert_eq!(session["started_at"], session["last_updated"]);
}

#[tokio::test]
async fn resetting_one_weekday_keeps_the_other_days_counts() {
    let app = TestApp::new().await;
    app.high_volume("SKU1", CountDay::Monday).await;
    app.high_volume("SKU1", CountDay::Tuesday).await;
    app.stock("SKU1", Location::Hstd, 3).await;

    let (status, _) = app
        .json(Method::POST, "/api/v1/counts", Some(weekly("SKU1", json!("3"), "Monday")))
        .await;
    assert_eq!(status, StatusCode::OK);

    app.stock("SKU1", Location::Hstd, 5).await;
    let mut tuesday = weekly("SKU1", json!("5"), "Tuesday");
    tuesday["confirm_override"] = json!(true);
    let (status, _) = app.json(Method::POST, "/api/v1/counts", Some(tuesday)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .json(
            Method::POST,
            "/api/v1/sessions/reset",
            Some(json!({ "kind": "weekly", "day": "Tuesday" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["touched_siblings"], json!(["Cycle_2026-10_HSTD"]));

    let (_, monday) = app
        .json(
            Method::GET,
            "/api/v1/sessions/status?kind=weekly&day=Monday",
            None,
        )
        .await;
    assert_eq!(monday["data"]["session"]["progress"], json!({ "SKU1": 3 }));
}

#[tokio::test]
async fn starting_a_session_twice_is_idempotent() {
    let app = TestApp::new().await;
    app.stock("SKU100", Location::MtD, 1).await;

    let (status, first) = app
        .json(
            Method::POST,
            "/api/v1/sessions/start",
            Some(json!({ "location": "MtD" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    app.clock.advance(Duration::minutes(10));
    let (status, second) = app
        .json(
            Method::POST,
            "/api/v1/sessions/start",
            Some(json!({ "location": "MtD" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"], second["data"]);

    let (_, sessions) = app
        .json(Method::GET, "/api/v1/sessions?location=MtD", None)
        .await;
    assert_eq!(sessions["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn cached_progress_is_merged_on_start() {
    let app = TestApp::new().await;
    app.stock("SKU100", Location::MtD, 1).await;
    app.stock("SKU101", Location::MtD, 2).await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/v1/sessions/start",
            Some(json!({ "location": "MtD", "cached_progress": { "SKU100": 1, "SKU101": 2 } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["progress"], json!({ "SKU100": 1, "SKU101": 2 }));
    assert_eq!(body["data"]["completed"], true);
}

#[tokio::test]
async fn negative_cached_progress_is_a_bad_request() {
    let app = TestApp::new().await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/v1/sessions/start",
            Some(json!({ "location": "MtD", "cached_progress": { "SKU1": -4 } })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("SKU1"));

    let (_, sessions) = app
        .json(Method::GET, "/api/v1/sessions?kind=monthly&location=MtD", None)
        .await;
    assert_eq!(sessions["data"], json!([]));
}

#[tokio::test]
async fn session_completes_when_every_expected_sku_is_counted() {
    let app = TestApp::new().await;
    app.stock("SKU100", Location::MtD, 1).await;
    app.stock("SKU101", Location::MtD, 2).await;

    let (_, body) = app
        .json(Method::POST, "/api/v1/counts", Some(monthly("SKU100", json!("1"), "MtD")))
        .await;
    assert_eq!(body["data"]["session"]["completed"], false);
    assert_eq!(body["data"]["summary"]["percent"], 50.0);

    let (_, status_body) = app
        .json(Method::GET, "/api/v1/sessions/status?location=MtD", None)
        .await;
    assert_eq!(status_body["data"]["uncounted"], json!(["SKU101"]));
    let skus = status_body["data"]["skus"].as_array().unwrap();
    assert_eq!(skus[1]["note"], "Not yet counted");
    assert!(skus[0]["note"]
        .as_str()
        .unwrap()
        .ends_with("using Monthly Count at MtD"));

    let (_, body) = app
        .json(Method::POST, "/api/v1/counts", Some(monthly("SKU101", json!("2"), "MtD")))
        .await;
    assert_eq!(body["data"]["session"]["completed"], true);
    assert_eq!(body["data"]["summary"]["percent"], 100.0);
}

#[tokio::test]
async fn reset_cascades_into_siblings_and_history() {
    let app = TestApp::new().await;
    app.high_volume("SKU300", CountDay::Monday).await;
    app.high_volume("SKU301", CountDay::Monday).await;
    app.stock("SKU300", Location::Hstd, 3).await;

    app.json(
        Method::POST,
        "/api/v1/sessions/start",
        Some(json!({ "location": "HSTD" })),
    )
    .await;
    let (status, _) = app
        .json(Method::POST, "/api/v1/counts", Some(weekly("SKU300", json!("3"), "Monday")))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .json(
            Method::POST,
            "/api/v1/sessions/reset",
            Some(json!({ "kind": "weekly", "day": "Monday" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let report = &body["data"];
    assert_eq!(report["existed"], true);
    assert_eq!(report["cleared_barcodes"], json!(["SKU300"]));
    assert_eq!(report["touched_siblings"], json!(["Cycle_2026-10_HSTD"]));
    assert_eq!(report["history_deleted"], 1);

    let (_, monthly_status) = app
        .json(Method::GET, "/api/v1/sessions/status?location=HSTD", None)
        .await;
    assert_eq!(monthly_status["data"]["session"]["progress"], json!({}));
    let (_, weekly_status) = app
        .json(
            Method::GET,
            "/api/v1/sessions/status?kind=weekly&day=Monday",
            None,
        )
        .await;
    assert_eq!(weekly_status["data"]["session"], Value::Null);

    // Nothing left to reset.
    let (status, body) = app
        .json(
            Method::POST,
            "/api/v1/sessions/reset",
            Some(json!({ "kind": "weekly", "day": "Monday" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["existed"], false);
}

#[tokio::test]
async fn removing_a_sku_drops_its_progress_and_history() {
    let app = TestApp::new().await;
    app.stock("SKU100", Location::MtD, 1).await;
    app.stock("SKU101", Location::MtD, 2).await;
    app.json(Method::POST, "/api/v1/counts", Some(monthly("SKU100", json!("1"), "MtD")))
        .await;
    app.json(Method::POST, "/api/v1/counts", Some(monthly("SKU101", json!("2"), "MtD")))
        .await;

    let (status, body) = app
        .json(
            Method::DELETE,
            "/api/v1/sessions/skus/SKU101?location=MtD",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["progress"], json!({ "SKU100": 1 }));
    assert_eq!(body["data"]["completed"], false);

    let (_, history) = app
        .json(Method::GET, "/api/v1/history?barcode=SKU101", None)
        .await;
    assert_eq!(history["data"], json!([]));

    let (status, _) = app
        .json(
            Method::DELETE,
            "/api/v1/sessions/skus/SKU101?location=MtD",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn monthly_history_can_be_cleared() {
    let app = TestApp::new().await;
    app.stock("SKU100", Location::MtD, 5).await;
    app.json(Method::POST, "/api/v1/counts", Some(monthly("SKU100", json!("5"), "MtD")))
        .await;
    app.clock.advance(Duration::hours(1));
    app.json(Method::POST, "/api/v1/counts", Some(monthly("SKU100", json!("5"), "MtD")))
        .await;

    let (status, body) = app
        .json(
            Method::DELETE,
            "/api/v1/history/monthly/SKU100?location=MtD",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({ "barcode": "SKU100", "deleted": 2 }));

    let (_, history) = app
        .json(Method::GET, "/api/v1/history/monthly/SKU100?location=MtD", None)
        .await;
    assert_eq!(history["data"], json!([]));
}

#[tokio::test]
async fn audit_trail_lists_scans_newest_first() {
    let app = TestApp::new().await;
    app.stock("SKU100", Location::MtD, 12).await;
    app.stock("SKU101", Location::MtD, 3).await;
    app.json(Method::POST, "/api/v1/counts", Some(monthly("SKU100", json!("12"), "MtD")))
        .await;
    app.clock.advance(Duration::minutes(1));
    app.json(Method::POST, "/api/v1/counts", Some(monthly("SKU101", json!("3"), "MtD")))
        .await;

    let (status, body) = app
        .json(Method::GET, "/api/v1/audit?location=MtD&action=scan", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let page = &body["data"];
    assert_eq!(page["total"], 2);
    assert_eq!(page["events"][0]["sku"], "SKU101");
    assert_eq!(page["events"][1]["details"], "Quantity: 12 at MtD");

    let (_, filtered) = app
        .json(Method::GET, "/api/v1/audit?location=MtD&sku=sku100", None)
        .await;
    assert_eq!(filtered["data"]["total"], 1);
}

#[tokio::test]
async fn audit_trail_survives_extreme_paging() {
    let app = TestApp::new().await;
    app.stock("SKU100", Location::MtD, 12).await;
    app.json(Method::POST, "/api/v1/counts", Some(monthly("SKU100", json!("12"), "MtD")))
        .await;

    let (status, body) = app
        .json(
            Method::GET,
            "/api/v1/audit?location=MtD&per_page=18446744073709551615",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["per_page"], 100);
    assert_eq!(body["data"]["total"], 1);

    let (status, body) = app
        .json(
            Method::GET,
            "/api/v1/audit?location=MtD&page=18446744073709551615&per_page=2",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["events"], json!([]));
}

#[tokio::test]
async fn dashboard_aggregates_accepted_counts() {
    let app = TestApp::new().await;
    app.stock("SKU100", Location::MtD, 2).await;
    app.stock("SKU100", Location::FtP, 1).await;
    app.json(Method::POST, "/api/v1/counts", Some(monthly("SKU100", json!("2"), "MtD")))
        .await;
    app.json(Method::POST, "/api/v1/counts", Some(monthly("SKU100", json!("1"), "FtP")))
        .await;

    let (status, body) = app
        .json(Method::GET, "/api/v1/dashboard?location=HSTD", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let summary = &body["data"];
    assert_eq!(summary["top_skus"][0], json!({ "barcode": "SKU100", "scans": 2 }));
    assert_eq!(
        summary["progress_over_time"],
        json!([{ "date": "2026-10-14", "cumulative": 2 }])
    );
    assert_eq!(summary["scans_by_location"][0]["by_location"]["MtD"], 1);
    assert_eq!(summary["scans_by_location"][0]["by_location"]["FtP"], 1);
}

#[tokio::test]
async fn components_report_stock_at_a_location() {
    let app = TestApp::new().await;
    app.stock("SKU100", Location::MtD, 2).await;
    app.stock("SKU100", Location::Hstd, 7).await;

    let (status, body) = app
        .json(Method::GET, "/api/v1/components?location=HSTD", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let component = &body["data"][0];
    assert_eq!(component["barcode"], "SKU100");
    assert_eq!(component["quantity"], 7);
    assert_eq!(component["total_quantity"], 9);
}

#[tokio::test]
async fn health_and_request_ids_are_served() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health/ready", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}
