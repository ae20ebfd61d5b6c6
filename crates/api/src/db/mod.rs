pub mod climate_data;

pub use climate_data::{
    trailing_year_start, ClimateAccess, ClimateData, DailyValue, DateRange, Error, Measurement,
    Station, StationActivity, StationListing, TemperatureStats, TRAILING_YEAR_DAYS,
};
