//! # Document Codes
//!
//! Sequencing for human-readable sale order and payment codes.
//!
//! ```text
//! Sale orders:  S + YYMMDD + 4-digit daily sequence   S2401100001, S2401100002, ...
//! Payments:     D + 6-digit global sequence           D000001, D000002, ...
//! ```
//!
//! The database layer looks up the numerically highest code inside the insert
//! transaction and asks these functions for the next one. Sequences widen past
//! their padding, so the lookup compares numbers, never strings. A highest code
//! that does not follow the pattern restarts the sequence at 1.

use chrono::NaiveDate;

/// Prefix of every generated sale order code.
pub const SALE_ORDER_PREFIX: char = 'S';

/// Prefix of every generated payment code.
pub const PAYMENT_PREFIX: char = 'D';

/// The `S` + YYMMDD prefix shared by every sale order code of `date`.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use tally_core::codes::sale_order_day_prefix;
///
/// let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
/// assert_eq!(sale_order_day_prefix(date), "S240110");
/// ```
pub fn sale_order_day_prefix(date: NaiveDate) -> String {
    format!("{}{}", SALE_ORDER_PREFIX, date.format("%y%m%d"))
}

/// Next sale order code for `date`, given the highest code already used that day.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use tally_core::codes::next_sale_order_code;
///
/// let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
/// assert_eq!(next_sale_order_code(date, None), "S2401100001");
/// assert_eq!(next_sale_order_code(date, Some("S2401100041")), "S2401100042");
/// ```
pub fn next_sale_order_code(date: NaiveDate, current_max: Option<&str>) -> String {
    let prefix = sale_order_day_prefix(date);
    let next = current_max
        .and_then(|code| code.strip_prefix(prefix.as_str()))
        .and_then(|digits| digits.parse::<u64>().ok())
        .map_or(1, |n| n + 1);

    format!("{}{:04}", prefix, next)
}

/// Next payment code, given the highest payment code in use.
///
/// ## Example
/// ```rust
/// use tally_core::codes::next_payment_code;
///
/// assert_eq!(next_payment_code(None), "D000001");
/// assert_eq!(next_payment_code(Some("D000099")), "D000100");
/// ```
pub fn next_payment_code(current_max: Option<&str>) -> String {
    let next = current_max
        .and_then(|code| code.strip_prefix(PAYMENT_PREFIX))
        .and_then(|digits| digits.parse::<u64>().ok())
        .map_or(1, |n| n + 1);

    format!("{}{:06}", PAYMENT_PREFIX, next)
}
