use async_trait::async_trait;
use log::debug;
use serde::{ser::SerializeMap, Serialize, Serializer};
use sqlx::{
    pool::PoolConnection,
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    Row, Sqlite,
};
use std::time::Duration as StdDuration;
use time::{format_description::BorrowedFormatItem, macros::format_description, Date, Duration};
use utoipa::ToSchema;

/// Dates are stored as `YYYY-MM-DD` text and compared lexicographically.
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Length of the trailing window, counted back from the latest measurement date.
pub const TRAILING_YEAR_DAYS: i64 = 366;

const LATEST_DATE_SQL: &str = "SELECT MAX(date) AS latest FROM measurement";

// Ties on count fall back to station id so the ranking is deterministic.
const STATION_ACTIVITY_SQL: &str = "SELECT station, COUNT(station) AS count
     FROM measurement
     GROUP BY station
     ORDER BY count DESC, station ASC";

pub struct ClimateAccess {
    pool: SqlitePool,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Failed to query climate database: {0}")]
    Query(#[from] sqlx::Error),
    #[error("Failed to parse date '{0}': {1}")]
    DateParse(String, time::error::Parse),
    #[error("Failed to format date: {0}")]
    DateFormat(#[from] time::error::Format),
    #[error("Date out of range: {0}")]
    DateRange(String),
}

/// Read-only queries over the `station` and `measurement` tables.
///
/// Every method runs against a single connection that is handed back to the
/// pool when the call returns, whether it succeeded or not.
#[async_trait]
pub trait ClimateData: Sync + Send {
    /// Precipitation for every measurement in the trailing year.
    async fn precipitation(&self) -> Result<Vec<DailyValue<Option<f64>>>, Error>;
    /// Metadata for every station, in storage order.
    async fn stations(&self) -> Result<Vec<Station>, Error>;
    /// Measurement counts per station, busiest first.
    async fn station_activity(&self) -> Result<Vec<StationActivity>, Error>;
    /// Trailing-year temperature observations of the busiest station.
    async fn most_active_temperatures(&self) -> Result<Vec<DailyValue<f64>>, Error>;
    /// Min/max/average temperature over an inclusive date range.
    async fn temperature_stats(&self, range: &DateRange) -> Result<TemperatureStats, Error>;
}

/// Computes the first date (inclusive) of the trailing year ending at `latest`.
pub fn trailing_year_start(latest: &str) -> Result<String, Error> {
    let latest_date =
        Date::parse(latest, DATE_FORMAT).map_err(|e| Error::DateParse(latest.to_owned(), e))?;
    let cutoff = latest_date
        .checked_sub(Duration::days(TRAILING_YEAR_DAYS))
        .ok_or_else(|| Error::DateRange(latest.to_owned()))?;
    Ok(cutoff.format(DATE_FORMAT)?)
}

impl ClimateAccess {
    /// Builds a lazy, read-only pool over an existing database file.
    /// No connection is opened until the first query.
    pub fn new(database_path: &str, max_connections: u32) -> Self {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .read_only(true)
            .create_if_missing(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(StdDuration::from_secs(30))
            .connect_lazy_with(options);

        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn connection(&self) -> Result<PoolConnection<Sqlite>, Error> {
        Ok(self.pool.acquire().await?)
    }

    async fn trailing_year_cutoff(
        conn: &mut PoolConnection<Sqlite>,
    ) -> Result<Option<String>, Error> {
        let latest: Option<String> = sqlx::query_scalar(LATEST_DATE_SQL)
            .fetch_one(&mut **conn)
            .await?;

        match latest {
            Some(latest) => {
                let cutoff = trailing_year_start(&latest)?;
                debug!("trailing year: {} to {}", cutoff, latest);
                Ok(Some(cutoff))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ClimateData for ClimateAccess {
    async fn precipitation(&self) -> Result<Vec<DailyValue<Option<f64>>>, Error> {
        let mut conn = self.connection().await?;
        let Some(cutoff) = Self::trailing_year_cutoff(&mut conn).await? else {
            return Ok(vec![]);
        };

        let rows = sqlx::query(
            "SELECT date, CAST(prcp AS REAL) AS prcp FROM measurement WHERE date >= ?",
        )
        .bind(&cutoff)
        .fetch_all(&mut *conn)
        .await?;

        let readings = rows
            .iter()
            .map(|row| {
                Ok(DailyValue {
                    date: row.try_get("date")?,
                    value: row.try_get("prcp")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;
        Ok(readings)
    }

    async fn stations(&self) -> Result<Vec<Station>, Error> {
        let mut conn = self.connection().await?;
        let stations = sqlx::query_as::<_, Station>(
            "SELECT station, name, latitude, longitude, elevation FROM station",
        )
        .fetch_all(&mut *conn)
        .await?;
        Ok(stations)
    }

    async fn station_activity(&self) -> Result<Vec<StationActivity>, Error> {
        let mut conn = self.connection().await?;
        let activity = sqlx::query_as::<_, StationActivity>(STATION_ACTIVITY_SQL)
            .fetch_all(&mut *conn)
            .await?;
        Ok(activity)
    }

    async fn most_active_temperatures(&self) -> Result<Vec<DailyValue<f64>>, Error> {
        let mut conn = self.connection().await?;

        let most_active = sqlx::query_as::<_, StationActivity>(STATION_ACTIVITY_SQL)
            .fetch_optional(&mut *conn)
            .await?;
        let Some(most_active) = most_active else {
            return Ok(vec![]);
        };
        let Some(cutoff) = Self::trailing_year_cutoff(&mut conn).await? else {
            return Ok(vec![]);
        };
        debug!(
            "most active station: {} ({} measurements)",
            most_active.station, most_active.count
        );

        let rows = sqlx::query(
            "SELECT CAST(tobs AS REAL) AS tobs, date
             FROM measurement
             WHERE station = ? AND date >= ?",
        )
        .bind(&most_active.station)
        .bind(&cutoff)
        .fetch_all(&mut *conn)
        .await?;

        let observations = rows
            .iter()
            .map(|row| {
                Ok(DailyValue {
                    date: row.try_get("date")?,
                    value: row.try_get("tobs")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;
        Ok(observations)
    }

    async fn temperature_stats(&self, range: &DateRange) -> Result<TemperatureStats, Error> {
        let mut conn = self.connection().await?;

        let mut sql = String::from(
            "SELECT CAST(MIN(tobs) AS REAL) AS min_temp,
                    CAST(MAX(tobs) AS REAL) AS max_temp,
                    AVG(tobs) AS average_temp
             FROM measurement
             WHERE date >= ?",
        );
        if range.end.is_some() {
            sql.push_str(" AND date <= ?");
        }

        let mut query = sqlx::query_as::<_, TemperatureStats>(&sql).bind(&range.start);
        if let Some(end) = &range.end {
            query = query.bind(end);
        }

        Ok(query.fetch_one(&mut *conn).await?)
    }
}

/// A row of the `station` table.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Station {
    pub station: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
}

/// Serialized as `{"<station>": "<name>", "latitude": .., "longitude": .., "elevation": ..}`.
impl Serialize for Station {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry(&self.station, &self.name)?;
        map.serialize_entry("latitude", &self.latitude)?;
        map.serialize_entry("longitude", &self.longitude)?;
        map.serialize_entry("elevation", &self.elevation)?;
        map.end()
    }
}

/// A row of the `measurement` table.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Measurement {
    pub station: String,
    pub date: String,
    pub prcp: Option<f64>,
    pub tobs: f64,
}

/// Number of measurements recorded by one station, serialized as `{"<station>": count}`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StationActivity {
    pub station: String,
    pub count: i64,
}

impl Serialize for StationActivity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.station, &self.count)?;
        map.end()
    }
}

/// One value keyed by its measurement date, serialized as `{"<date>": value}`.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyValue<T> {
    pub date: String,
    pub value: T,
}

impl<T: Serialize> Serialize for DailyValue<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.date, &self.value)?;
        map.end()
    }
}

/// Either shape the station listing can take.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StationListing {
    Detail(Station),
    Activity(StationActivity),
}

/// Inclusive date range; `end` of `None` means open-ended.
///
/// Bounds are compared as text and are not validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub start: String,
    pub end: Option<String>,
}

impl DateRange {
    pub fn from_start(start: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: None,
        }
    }

    pub fn between(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: Some(end.into()),
        }
    }
}

/// Temperature aggregates; all three are `null` when no measurement matched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, sqlx::FromRow, ToSchema)]
pub struct TemperatureStats {
    #[serde(rename = "min temp")]
    pub min_temp: Option<f64>,
    #[serde(rename = "max temp")]
    pub max_temp: Option<f64>,
    #[serde(rename = "average temp")]
    pub average_temp: Option<f64>,
}
