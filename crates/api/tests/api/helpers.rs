use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use climate_api::{
    app, build_app_state, ClimateAccess, ClimateData, DailyValue, DateRange, Error, Measurement,
    Station, StationActivity, StationsView, TemperatureStats,
};
use hyper::{header, Method};
use mockall::mock;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub app: Router,
}

mock! {
    pub ClimateAccess {}
    #[async_trait]
    impl ClimateData for ClimateAccess {
        async fn precipitation(&self) -> Result<Vec<DailyValue<Option<f64>>>, Error>;
        async fn stations(&self) -> Result<Vec<Station>, Error>;
        async fn station_activity(&self) -> Result<Vec<StationActivity>, Error>;
        async fn most_active_temperatures(&self) -> Result<Vec<DailyValue<f64>>, Error>;
        async fn temperature_stats(&self, range: &DateRange) -> Result<TemperatureStats, Error>;
    }
}

pub async fn spawn_app(climate_db: Arc<dyn ClimateData>) -> TestApp {
    spawn_app_with_view(climate_db, StationsView::Metadata).await
}

pub async fn spawn_app_with_view(
    climate_db: Arc<dyn ClimateData>,
    stations_view: StationsView,
) -> TestApp {
    let app_state = build_app_state(
        String::from("http://127.0.0.1:9810"),
        stations_view,
        climate_db,
    );
    TestApp {
        app: app(app_state),
    }
}

impl TestApp {
    pub async fn get(&self, uri: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(header::ACCEPT, "application/json")
            .body(Body::empty())
            .unwrap();

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request.");

        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    pub async fn get_json(&self, uri: &str) -> Value {
        let (status, body) = self.get(uri).await;
        assert_eq!(status, StatusCode::OK, "unexpected status for {}: {}", uri, body);
        serde_json::from_str(&body).expect("response body should be JSON")
    }
}

pub fn station(id: &str, name: &str) -> Station {
    Station {
        station: id.to_string(),
        name: name.to_string(),
        latitude: 21.2716,
        longitude: -157.8168,
        elevation: 3.0,
    }
}

pub fn measurement(station: &str, date: &str, prcp: Option<f64>, tobs: f64) -> Measurement {
    Measurement {
        station: station.to_string(),
        date: date.to_string(),
        prcp,
        tobs,
    }
}

/// Writes a throwaway database with the `station` and `measurement` tables
/// and returns a read-only accessor over it. Keep the `TempDir` alive for
/// as long as the accessor is used.
pub async fn seed_database(
    stations: &[Station],
    measurements: &[Measurement],
) -> (TempDir, Arc<ClimateAccess>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hawaii.sqlite");

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(
            SqliteConnectOptions::new()
                .filename(&path)
                .create_if_missing(true),
        )
        .await
        .unwrap();

    sqlx::query(
        "CREATE TABLE station (id INTEGER PRIMARY KEY, station TEXT, name TEXT,
            latitude FLOAT, longitude FLOAT, elevation FLOAT)",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "CREATE TABLE measurement (id INTEGER PRIMARY KEY, station TEXT, date TEXT,
            prcp FLOAT, tobs FLOAT)",
    )
    .execute(&pool)
    .await
    .unwrap();

    for s in stations {
        sqlx::query(
            "INSERT INTO station (station, name, latitude, longitude, elevation)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&s.station)
        .bind(&s.name)
        .bind(s.latitude)
        .bind(s.longitude)
        .bind(s.elevation)
        .execute(&pool)
        .await
        .unwrap();
    }
    for m in measurements {
        sqlx::query("INSERT INTO measurement (station, date, prcp, tobs) VALUES (?, ?, ?, ?)")
            .bind(&m.station)
            .bind(&m.date)
            .bind(m.prcp)
            .bind(m.tobs)
            .execute(&pool)
            .await
            .unwrap();
    }
    pool.close().await;

    let access = Arc::new(ClimateAccess::new(path.to_str().unwrap(), 2));
    (dir, access)
}
