//! Core types for the campus energy dashboard.
//!
//! Holds the validated reading and dataset types, aggregation output rows,
//! calendar bucketing, the building object model, pipeline configuration and
//! the shared error type. No I/O beyond reading a config file lives here.

pub mod building;
pub mod config;
pub mod error;
pub mod formatting;
pub mod models;
pub mod time_utils;

pub use error::{EnergyError, MalformedRow, Result};
