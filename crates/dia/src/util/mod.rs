//! Utility modules for Dia.

pub mod datetime;

pub use datetime::{DateTimeParseError, format_timestamp, parse_timestamp};
