//! Number and label formatting for report output.

use crate::time_utils::month_name;

/// Format a number with thousands separators and a fixed number of decimal
/// places.
///
/// # Examples
///
/// ```
/// use insight_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5, 1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::with_capacity(fixed.len() + fixed.len() / 3 + 1);
    // `-0.00` reads badly in a ledger; only print the sign for non-zero output.
    if value < 0.0 && fixed.bytes().any(|b| matches!(b, b'1'..=b'9')) {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Format a ledger amount as dollars with two decimals.
///
/// # Examples
///
/// ```
/// use insight_core::formatting::format_currency;
///
/// assert_eq!(format_currency(1234.56), "$1,234.56");
/// assert_eq!(format_currency(-30.0), "-$30.00");
/// ```
pub fn format_currency(amount: f64) -> String {
    let body = format_number(amount, 2);
    match body.strip_prefix('-') {
        Some(rest) => format!("-${}", rest),
        None => format!("${}", body),
    }
}

/// Share of `part` in `whole` as a percentage rounded to `decimal_places`.
///
/// Returns `0.0` when `whole` is zero.
pub fn percentage(part: f64, whole: f64, decimal_places: i32) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    let factor = 10_f64.powi(decimal_places);
    ((part / whole) * 100.0 * factor).round() / factor
}

/// `"February, 2023"` style label for a period.
pub fn period_title(year: i32, month: u32) -> String {
    match month_name(month) {
        Some(name) => format!("{}, {}", name, year),
        None => format!("{}-{}", year, month),
    }
}

/// Insert commas every three digits from the right of a digit string.
fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────
