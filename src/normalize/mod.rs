//! Pure parsing and derivation core
//!
//! No I/O lives here: every function is deterministic over its inputs so
//! the provider-specific formats can be covered by plain unit tests.

mod date;
mod derive;
mod price;

pub use date::{date_to_ts, parse_archive_date, parse_month_name_date};
pub use derive::{cross_rate, ratio_quote, KARAT_14_RATIO, TROY_OUNCE_GRAMS};
pub use price::parse_localized_price;
