use crate::helpers::{measurement, seed_database, spawn_app, spawn_app_with_view, station};
use axum::http::StatusCode;
use climate_api::{ClimateAccess, StationsView};
use serde_json::{json, Value};
use std::sync::Arc;

#[tokio::test]
async fn bounded_range_averages_single_station() {
    let (_dir, climate_db) = seed_database(
        &[station("USC00519397", "WAIKIKI 717.2, HI US")],
        &[
            measurement("USC00519397", "2017-01-01", Some(0.0), 60.0),
            measurement("USC00519397", "2017-06-01", Some(0.1), 80.0),
        ],
    )
    .await;
    let test_app = spawn_app(climate_db).await;

    let body = test_app.get_json("/api/v1.0/2017-01-01/2017-06-01").await;

    assert_eq!(
        body,
        json!([{"min temp": 60.0, "max temp": 80.0, "average temp": 70.0}])
    );
}

#[tokio::test]
async fn precip_window_is_anchored_on_latest_date() {
    let (_dir, climate_db) = seed_database(
        &[],
        &[
            measurement("A", "2010-01-01", Some(1.2), 65.0),
            measurement("A", "2010-06-01", Some(0.3), 70.0),
        ],
    )
    .await;
    let test_app = spawn_app(climate_db).await;

    let body = test_app.get_json("/api/v1.0/precip").await;
    // 2010-06-01 is the latest date, so only it is inside its own window
    assert_eq!(body, json!([{"2010-06-01": 0.3}]));

    let (_dir, climate_db) = seed_database(&[], &[]).await;
    let test_app = spawn_app(climate_db).await;
    assert_eq!(test_app.get_json("/api/v1.0/precip").await, json!([]));
}

#[tokio::test]
async fn activity_counts_are_sorted_and_sum_to_row_count() {
    let measurements = vec![
        measurement("USC00519281", "2017-08-01", None, 77.0),
        measurement("USC00519281", "2017-08-02", None, 78.0),
        measurement("USC00519281", "2017-08-03", None, 79.0),
        measurement("USC00513117", "2017-08-01", None, 76.0),
        measurement("USC00519397", "2017-08-01", None, 80.0),
        measurement("USC00519397", "2017-08-02", None, 81.0),
    ];
    let (_dir, climate_db) = seed_database(&[], &measurements).await;
    let test_app = spawn_app_with_view(climate_db, StationsView::Activity).await;

    let body = test_app.get_json("/api/v1.0/stations").await;
    let counts: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| {
            let entry = entry.as_object().unwrap();
            assert_eq!(entry.len(), 1);
            entry.values().next().and_then(Value::as_i64).unwrap()
        })
        .collect();

    assert_eq!(counts.iter().sum::<i64>(), measurements.len() as i64);
    assert!(counts.windows(2).all(|pair| pair[0] >= pair[1]));
    assert_eq!(body[0], json!({"USC00519281": 3}));
}

#[tokio::test]
async fn tobs_uses_busiest_station_over_trailing_year() {
    let (_dir, climate_db) = seed_database(
        &[],
        &[
            measurement("USC00519281", "2016-01-01", None, 62.0),
            measurement("USC00519281", "2017-08-17", None, 76.0),
            measurement("USC00519281", "2017-08-18", None, 79.0),
            measurement("USC00519397", "2017-08-23", None, 81.0),
        ],
    )
    .await;
    let test_app = spawn_app(climate_db).await;

    let body = test_app.get_json("/api/v1.0/tobs").await;

    assert_eq!(body, json!([{"2017-08-17": 76.0}, {"2017-08-18": 79.0}]));
}

#[tokio::test]
async fn start_at_minimum_date_matches_whole_table() {
    let (_dir, climate_db) = seed_database(
        &[],
        &[
            measurement("A", "2010-01-01", None, 53.0),
            measurement("B", "2013-04-12", None, 71.0),
            measurement("A", "2017-08-23", None, 87.0),
        ],
    )
    .await;
    let test_app = spawn_app(climate_db).await;

    let body = test_app.get_json("/api/v1.0/2010-01-01").await;

    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["min temp"], json!(53.0));
    assert_eq!(body[0]["max temp"], json!(87.0));
    let average = body[0]["average temp"].as_f64().unwrap();
    assert!((average - 211.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn inverted_range_returns_nulls() {
    let (_dir, climate_db) =
        seed_database(&[], &[measurement("A", "2017-01-01", None, 60.0)]).await;
    let test_app = spawn_app(climate_db).await;

    let body = test_app.get_json("/api/v1.0/2017-06-01/2017-01-01").await;

    assert_eq!(
        body,
        json!([{"min temp": null, "max temp": null, "average temp": null}])
    );
}

#[tokio::test]
async fn stations_list_metadata_from_database() {
    let (_dir, climate_db) = seed_database(
        &[
            station("USC00519397", "WAIKIKI 717.2, HI US"),
            station("USC00513117", "KANEOHE 838.1, HI US"),
        ],
        &[],
    )
    .await;
    let test_app = spawn_app(climate_db).await;

    let body = test_app.get_json("/api/v1.0/stations").await;

    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["USC00519397"], json!("WAIKIKI 717.2, HI US"));
    assert_eq!(body[1]["USC00513117"], json!("KANEOHE 838.1, HI US"));
}

#[tokio::test]
async fn missing_database_is_a_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.sqlite");
    let climate_db = Arc::new(ClimateAccess::new(path.to_str().unwrap(), 1));
    let test_app = spawn_app(climate_db).await;

    let (status, _) = test_app.get("/api/v1.0/tobs").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
