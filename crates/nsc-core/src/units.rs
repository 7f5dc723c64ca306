//! # Limits and Data Sizes
//!
//! User limits (`subs`, `data`, `payload`) are signed integers where `-1`
//! means unlimited. Any negative input collapses to `-1` so there is exactly
//! one spelling of "no limit".

use crate::error::CoreError;

/// The "unlimited" sentinel for user limits.
pub const NO_LIMIT: i64 = -1;

/// Collapse any negative value to [`NO_LIMIT`].
pub fn normalize_limit(value: i64) -> i64 {
    if value < 0 {
        NO_LIMIT
    } else {
        value
    }
}

/// Parse a data size such as `1024`, `1K`, `1Kib` or `-1`.
///
/// Decimal suffixes (`k`, `kb`, `m`, `mb`, `g`, `gb`) use powers of 1000;
/// binary suffixes (`ki`, `kib`, `mi`, `mib`, `gi`, `gib`) use powers of
/// 1024. Suffixes are case-insensitive. Negative sizes normalize to
/// [`NO_LIMIT`].
pub fn parse_data_size(expr: &str) -> Result<i64, CoreError> {
    let s = expr.trim();
    if s.is_empty() {
        return Err(CoreError::invalid_value("data size", expr, "empty"));
    }

    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let digits = body.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return Err(CoreError::invalid_value("data size", expr, "expected a number"));
    }
    let (num, suffix) = body.split_at(digits);
    let n: i64 = num
        .parse()
        .map_err(|_| CoreError::invalid_value("data size", expr, "number is out of range"))?;
    if negative {
        return Ok(NO_LIMIT);
    }

    let multiplier: i64 = match suffix.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" => 1_000,
        "m" | "mb" => 1_000_000,
        "g" | "gb" => 1_000_000_000,
        "ki" | "kib" => 1 << 10,
        "mi" | "mib" => 1 << 20,
        "gi" | "gib" => 1 << 30,
        other => {
            return Err(CoreError::invalid_value(
                "data size",
                expr,
                format!("unknown unit {other:?}"),
            ))
        }
    };
    n.checked_mul(multiplier)
        .ok_or_else(|| CoreError::invalid_value("data size", expr, "size is out of range"))
}

/// Parse a plain integer limit, normalizing negatives.
pub fn parse_limit(expr: &str) -> Result<i64, CoreError> {
    expr.trim()
        .parse::<i64>()
        .map(normalize_limit)
        .map_err(|e| CoreError::invalid_value("limit", expr, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn binary_and_decimal_suffixes() {
        assert_eq!(parse_data_size("1Kib").unwrap(), 1024);
        assert_eq!(parse_data_size("1KIB").unwrap(), 1024);
        assert_eq!(parse_data_size("1k").unwrap(), 1000);
        assert_eq!(parse_data_size("2MB").unwrap(), 2_000_000);
        assert_eq!(parse_data_size("1Gi").unwrap(), 1 << 30);
        assert_eq!(parse_data_size("512").unwrap(), 512);
    }

    #[test]
    fn negative_size_is_unlimited() {
        assert_eq!(parse_data_size("-1").unwrap(), NO_LIMIT);
        assert_eq!(parse_data_size("-20K").unwrap(), NO_LIMIT);
    }

    #[test]
    fn unknown_unit_is_rejected() {
        let err = parse_data_size("12Q").unwrap_err();
        assert!(err.to_string().contains("unknown unit"));
        assert!(parse_data_size("kb").is_err());
        assert!(parse_data_size("").is_err());
    }

    #[test]
    fn parse_limit_normalizes() {
        assert_eq!(parse_limit("100").unwrap(), 100);
        assert_eq!(parse_limit("-7").unwrap(), NO_LIMIT);
        assert!(parse_limit("ten").is_err());
    }

    proptest! {
        #[test]
        fn normalize_limit_never_below_sentinel(v in any::<i64>()) {
            let n = normalize_limit(v);
            prop_assert!(n >= NO_LIMIT);
            if v >= 0 {
                prop_assert_eq!(n, v);
            } else {
                prop_assert_eq!(n, NO_LIMIT);
            }
        }

        #[test]
        fn normalize_limit_is_idempotent(v in any::<i64>()) {
            prop_assert_eq!(normalize_limit(normalize_limit(v)), normalize_limit(v));
        }

        #[test]
        fn plain_numbers_parse_literally(v in 0i64..1_000_000_000) {
            prop_assert_eq!(parse_data_size(&v.to_string()).unwrap(), v);
        }
    }
}
