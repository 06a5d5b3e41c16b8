//! Localized numeric parsing
//!
//! The upstream feeds disagree on number formatting: the metals feed and
//! the protected archive publish comma-decimal with dot-thousands
//! ("6.942,61", sometimes with a currency symbol glued on), while the
//! secondary archive publishes plain dot-decimal ("7356.1000").

use crate::error::{AppError, Result};

/// Parse a price string in any of the source-localized decimal formats.
///
/// Currency symbols and whitespace are stripped first. When both
/// separators appear, the rightmost one is the decimal separator. A lone
/// dot followed by exactly three digits is treated as a thousands group
/// (the localized feeds never print trailing zeros to three places).
pub fn parse_localized_price(raw: &str) -> Result<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();

    if cleaned.is_empty() || !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::Parse(format!("unparseable price '{}'", raw)));
    }

    let dots = cleaned.matches('.').count();
    let commas = cleaned.matches(',').count();

    let normalized = if dots > 0 && commas > 0 {
        let last_dot = cleaned.rfind('.').unwrap_or(0);
        let last_comma = cleaned.rfind(',').unwrap_or(0);
        if last_comma > last_dot {
            // "6.942,61" -> comma decimal, dots are grouping
            cleaned.replace('.', "").replace(',', ".")
        } else {
            // "6,942.61" -> dot decimal, commas are grouping
            cleaned.replace(',', "")
        }
    } else if commas == 1 {
        // "123,45" -> comma decimal
        cleaned.replace(',', ".")
    } else if commas > 1 {
        cleaned.replace(',', "")
    } else if dots > 1 {
        cleaned.replace('.', "")
    } else if dots == 1 {
        let fraction = &cleaned[cleaned.rfind('.').unwrap_or(0) + 1..];
        if fraction.len() == 3 {
            // "5.096" -> thousands grouping
            cleaned.replace('.', "")
        } else {
            // "7356.1000" -> dot decimal
            cleaned
        }
    } else {
        cleaned
    };

    normalized
        .parse::<f64>()
        .map_err(|_| AppError::Parse(format!("unparseable price '{}'", raw)))
}
