//! Read-only JSON API over a climate database of weather stations and their
//! daily precipitation/temperature measurements.

pub mod db;
pub mod routes;
pub mod startup;
pub mod templates;
pub mod utils;

pub use db::*;
pub use routes::*;
pub use startup::*;
pub use utils::*;
