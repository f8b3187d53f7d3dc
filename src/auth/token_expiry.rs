/// Refresh Token Lifetime Parsing
///
/// Lifetimes are written as `<N><unit>` where unit is `d`, `h` or `m`
/// (`"30d"`, `"1h"`, `"15m"`). The same grammar drives the signed token's
/// `exp`, the cookie max-age and the pruning threshold.

use chrono::{DateTime, Duration, Utc};

use crate::error::{AppError, ConfigError};

/// Parse a lifetime string into a duration
///
/// # Errors
/// Returns `ConfigError::InvalidTokenExpires` for anything outside `<digits><d|h|m>`
pub fn parse_token_expiry(token_expires: &str) -> Result<Duration, AppError> {
    let invalid = || AppError::Config(ConfigError::InvalidTokenExpires);

    let unit = token_expires.chars().last().ok_or_else(invalid)?;
    let digits = &token_expires[..token_expires.len() - unit.len_utf8()];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let value: i64 = digits.parse().map_err(|_| invalid())?;

    let duration = match unit {
        'd' => Duration::try_days(value),
        'h' => Duration::try_hours(value),
        'm' => Duration::try_minutes(value),
        _ => None,
    };

    let duration = duration.ok_or_else(invalid)?;

    // Must stay applicable to the current time in both directions
    let now = Utc::now();
    if now.checked_sub_signed(duration).is_none() || now.checked_add_signed(duration).is_none() {
        return Err(invalid());
    }
    Ok(duration)
}

/// Cookie max-age in milliseconds for a lifetime string
pub fn cookie_max_age(token_expires: &str) -> Result<i64, AppError> {
    Ok(parse_token_expiry(token_expires)?.num_milliseconds())
}

/// Oldest creation time a record may have and still be considered live
pub fn calculate_expiration_threshold(token_expires: &str) -> Result<DateTime<Utc>, AppError> {
    let lifetime = parse_token_expiry(token_expires)?;
    Utc::now()
        .checked_sub_signed(lifetime)
        .ok_or(AppError::Config(ConfigError::InvalidTokenExpires))
}
