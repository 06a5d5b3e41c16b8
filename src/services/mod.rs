//! Read-path services
//!
//! Consumed by an external route layer. Reads only ever see the last
//! committed snapshot/history rows; nothing here waits on an in-flight
//! refresh.

pub mod history_service;
pub mod quotes_service;

pub use history_service::{HistoryPoint, HistoryService};
pub use quotes_service::{LatestCache, LatestResult, QuotesService};
