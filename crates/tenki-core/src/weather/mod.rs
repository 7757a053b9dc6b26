//! Weather lookup and forecast aggregation.
//!
//! - `provider`: the geocoding/weather port implemented in tenki-infra
//! - `normalize`: geocoding query normalization rules
//! - `aggregate`: daily bucketing and relative date labelling

pub mod aggregate;
pub mod normalize;
pub mod provider;
