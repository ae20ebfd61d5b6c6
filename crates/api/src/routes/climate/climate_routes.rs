use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use log::{debug, error};
use std::sync::Arc;

use crate::{
    db::{self, DailyValue, DateRange, StationListing, TemperatureStats},
    AppState, StationsView,
};

fn query_failed(err: db::Error) -> (StatusCode, String) {
    error!("error querying climate data: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Failed to query climate data: {}", err),
    )
}

#[utoipa::path(
    get,
    path = "/api/v1.0/precip",
    responses(
        (status = OK, description = "One {date: precipitation} entry per measurement in the last year of data", content_type = "application/json", body = Vec<Object>),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to query the climate database")
    ))]
pub async fn precipitation(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DailyValue<Option<f64>>>>, (StatusCode, String)> {
    let readings = state
        .climate_db
        .precipitation()
        .await
        .map_err(query_failed)?;
    Ok(Json(readings))
}

#[utoipa::path(
    get,
    path = "/api/v1.0/stations",
    responses(
        (status = OK, description = "Every station, either as {station: name, latitude, longitude, elevation} or as {station: measurement count} depending on server configuration", content_type = "application/json", body = Vec<Object>),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to query the climate database")
    ))]
pub async fn stations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<StationListing>>, (StatusCode, String)> {
    let listing: Vec<StationListing> = match state.stations_view {
        StationsView::Metadata => state
            .climate_db
            .stations()
            .await
            .map_err(query_failed)?
            .into_iter()
            .map(StationListing::Detail)
            .collect(),
        StationsView::Activity => state
            .climate_db
            .station_activity()
            .await
            .map_err(query_failed)?
            .into_iter()
            .map(StationListing::Activity)
            .collect(),
    };
    Ok(Json(listing))
}

#[utoipa::path(
    get,
    path = "/api/v1.0/tobs",
    responses(
        (status = OK, description = "One {date: temperature} entry per observation of the most active station in the last year of data", content_type = "application/json", body = Vec<Object>),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to query the climate database")
    ))]
pub async fn temperature_observations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DailyValue<f64>>>, (StatusCode, String)> {
    let observations = state
        .climate_db
        .most_active_temperatures()
        .await
        .map_err(query_failed)?;
    Ok(Json(observations))
}

#[utoipa::path(
    get,
    path = "/api/v1.0/{start}",
    params(
        ("start" = String, Path, description = "First date included, YYYY-MM-DD"),
    ),
    responses(
        (status = OK, description = "Temperature aggregates from start to the end of the dataset; null when nothing matched", content_type = "application/json", body = Vec<TemperatureStats>),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to query the climate database")
    ))]
pub async fn temperature_stats_from(
    State(state): State<Arc<AppState>>,
    Path(start): Path<String>,
) -> Result<Json<Vec<TemperatureStats>>, (StatusCode, String)> {
    debug!("temperature stats from {}", start);
    let stats = state
        .climate_db
        .temperature_stats(&DateRange::from_start(start))
        .await
        .map_err(query_failed)?;
    Ok(Json(vec![stats]))
}

#[utoipa::path(
    get,
    path = "/api/v1.0/{start}/{end}",
    params(
        ("start" = String, Path, description = "First date included, YYYY-MM-DD"),
        ("end" = String, Path, description = "Last date included, YYYY-MM-DD"),
    ),
    responses(
        (status = OK, description = "Temperature aggregates between start and end; null when nothing matched", content_type = "application/json", body = Vec<TemperatureStats>),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to query the climate database")
    ))]
pub async fn temperature_stats_between(
    State(state): State<Arc<AppState>>,
    Path((start, end)): Path<(String, String)>,
) -> Result<Json<Vec<TemperatureStats>>, (StatusCode, String)> {
    debug!("temperature stats from {} to {}", start, end);
    let stats = state
        .climate_db
        .temperature_stats(&DateRange::between(start, end))
        .await
        .map_err(query_failed)?;
    Ok(Json(vec![stats]))
}
