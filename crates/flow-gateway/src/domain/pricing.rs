//! Session pricing rule.
//!
//! One pure function shared by both dispatch call sites (the HEALTH_NOTES
//! data exchange and the standalone `calculate_pricing` action). The two
//! sites emit different wire formats for the result, preserved behind
//! [`PriceFormat`].

use serde_json::{Map, Value};

/// Currency symbol the remote client prefixes amounts with.
pub const CURRENCY_SYMBOL: char = 'R';

/// Fallback trainer price when no metadata supplies one.
pub const FALLBACK_DEFAULT_PRICE: &str = "500";

/// Output format for the calculated price, one per call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceFormat {
    /// Re-prefix the amount with the currency symbol (HEALTH_NOTES branch)
    CurrencyPrefixed,
    /// Emit the resolved amount verbatim (standalone pricing action)
    Bare,
}

/// Trim whitespace and a leading currency symbol.
fn strip_currency(raw: &str) -> &str {
    raw.trim()
        .strip_prefix(CURRENCY_SYMBOL)
        .unwrap_or(raw.trim())
        .trim()
}

/// Resolve the session price from the client's pricing choice.
///
/// Only the literal `custom_price` choice selects the custom amount, and
/// only when it is non-empty once whitespace and the currency symbol are
/// stripped. `use_default`, unknown, and missing choices all resolve to the
/// trainer's default. The winning amount is returned trimmed but otherwise
/// verbatim; formatting is the caller's concern.
pub fn resolve_price(choice: Option<&str>, default_price: &str, custom_amount: &str) -> String {
    match choice.map(str::trim) {
        Some("custom_price") if !strip_currency(custom_amount).is_empty() => {
            custom_amount.trim().to_string()
        }
        _ => default_price.trim().to_string(),
    }
}

/// Apply the call site's wire format to a resolved amount.
pub fn format_price(amount: &str, format: PriceFormat) -> String {
    match format {
        PriceFormat::CurrencyPrefixed => {
            format!("{}{}", CURRENCY_SYMBOL, strip_currency(amount))
        }
        PriceFormat::Bare => amount.trim().to_string(),
    }
}

/// Run the pricing rule over a merged field map.
///
/// Reads `pricing_choice`, `trainer_default_price` (falling back to the
/// `selected_price` hydrated at init, then to the global default), and
/// `custom_price_amount`.
pub fn price_from_fields(fields: &Map<String, Value>, format: PriceFormat) -> String {
    let choice = fields.get("pricing_choice").and_then(Value::as_str);
    let default_price = fields
        .get("trainer_default_price")
        .and_then(Value::as_str)
        .or_else(|| fields.get("selected_price").and_then(Value::as_str))
        .unwrap_or(FALLBACK_DEFAULT_PRICE);
    let custom = fields
        .get("custom_price_amount")
        .and_then(Value::as_str)
        .unwrap_or("");

    format_price(&resolve_price(choice, default_price, custom), format)
}
