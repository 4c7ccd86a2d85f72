//! Decoding of the compressed source archives into typed rows.

pub mod fields;
pub mod hourly;
pub mod station;
pub mod timestamp;

pub use hourly::{HourlyReader, Measurements};
pub use station::for_each_station;
