// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Decimal-string amount parsing at the API boundary.
//!
//! Clients send amounts like `"250.50"`; the ledger stores i64 minor
//! units. Parsing is digit-by-digit, no floating point.

use crate::error::ApiError;

/// Parse a decimal amount string into `(normalized, minor_units)`.
///
/// Accepts at most two decimal places and rejects zero, negative and
/// non-numeric input.
pub fn parse_amount_to_minor(amount: &str) -> Result<(String, i64), ApiError> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request(
            "amount must be a valid positive number",
        ));
    }

    let parts: Vec<&str> = trimmed.split('.').collect();
    if parts.len() > 2 {
        return Err(ApiError::bad_request(
            "amount must be a valid positive number",
        ));
    }

    let whole_part = parts[0];
    if whole_part.is_empty() || !whole_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::bad_request(
            "amount must be a valid positive number",
        ));
    }

    let whole = whole_part
        .parse::<i64>()
        .map_err(|_| ApiError::bad_request("amount is too large"))?;

    let fraction_part = if parts.len() == 2 { parts[1] } else { "" };
    if !fraction_part.chars().all(|c| c.is_ascii_digit()) || fraction_part.len() > 2 {
        return Err(ApiError::bad_request(
            "amount must have at most 2 decimal places",
        ));
    }

    let fraction = if fraction_part.is_empty() {
        0
    } else if fraction_part.len() == 1 {
        fraction_part
            .parse::<i64>()
            .map_err(|_| ApiError::bad_request("amount must be a valid positive number"))?
            * 10
    } else {
        fraction_part
            .parse::<i64>()
            .map_err(|_| ApiError::bad_request("amount must be a valid positive number"))?
    };

    let minor = whole
        .checked_mul(100)
        .and_then(|base| base.checked_add(fraction))
        .ok_or_else(|| ApiError::bad_request("amount is too large"))?;

    if minor == 0 {
        return Err(ApiError::bad_request(
            "amount must be a valid positive number",
        ));
    }

    let normalized = format!("{whole}.{fraction:02}");
    Ok((normalized, minor))
}

/// Format minor units back into a decimal string.
pub fn format_minor(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn parses_and_normalizes() {
        assert_eq!(parse_amount_to_minor("25.5").unwrap(), ("25.50".to_string(), 2550));
        assert_eq!(parse_amount_to_minor("100").unwrap(), ("100.00".to_string(), 10_000));
        assert_eq!(parse_amount_to_minor(" 0.01 ").unwrap(), ("0.01".to_string(), 1));
    }

    #[test]
    fn rejects_zero_and_garbage() {
        for bad in ["0", "0.00", "", "-5", "1.234", "12a", "1.2.3"] {
            let err = parse_amount_to_minor(bad).unwrap_err();
            assert_eq!(err.status, StatusCode::BAD_REQUEST, "input: {bad}");
        }
    }

    #[test]
    fn formats_minor_units() {
        assert_eq!(format_minor(2550), "25.50");
        assert_eq!(format_minor(5), "0.05");
        assert_eq!(format_minor(0), "0.00");
        assert_eq!(format_minor(-150), "-1.50");
    }

    #[test]
    fn roundtrips() {
        let (normalized, minor) = parse_amount_to_minor("1234.56").unwrap();
        assert_eq!(format_minor(minor), normalized);
    }
}
