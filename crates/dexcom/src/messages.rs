//! Wire types for the Dexcom Share API.

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use glucowatch_core::glucose::{MeasuredAt, ProviderReading, Trend};
use serde::{Deserialize, Serialize};

/// Sentinel session id the service returns for a failed login.
pub const NULL_SESSION_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Body for `General/AuthenticatePublisherAccount`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateRequest<'a> {
    pub account_name: &'a str,
    pub password: &'a str,
    pub application_id: &'a str,
}

/// Body for `General/LoginPublisherAccountById`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginByIdRequest<'a> {
    pub account_id: &'a str,
    pub password: &'a str,
    pub application_id: &'a str,
}

/// Error body the service sends with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ShareFault {
    #[serde(rename = "Code", default)]
    pub code: String,
    #[serde(rename = "Message", default)]
    pub message: String,
}

/// One entry from `Publisher/ReadPublisherLatestGlucoseValues`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawGlucoseValue {
    /// Display time, e.g. `Date(1691455258000-0400)`.
    #[serde(rename = "DT")]
    pub display_time: String,
    #[serde(rename = "Value")]
    pub value: i32,
    /// Either a name (`"Flat"`) or a legacy numeric code.
    #[serde(rename = "Trend")]
    pub trend: serde_json::Value,
}

impl RawGlucoseValue {
    /// Convert into a domain reading.
    pub fn into_reading(self) -> Result<ProviderReading, String> {
        let measured_at = parse_share_date(&self.display_time)?;
        Ok(ProviderReading {
            value: self.value,
            trend: parse_trend(&self.trend),
            measured_at: MeasuredAt::Zoned(measured_at),
        })
    }
}

/// Parse `Date(<epoch millis>[+-HHMM])` into a zoned timestamp.
///
/// Without an offset suffix the instant is still unambiguous (epoch
/// millis), so it is returned at UTC.
pub fn parse_share_date(raw: &str) -> Result<DateTime<FixedOffset>, String> {
    let inner = raw
        .trim()
        .strip_prefix("Date(")
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| format!("malformed Share date '{raw}'"))?;

    let split = inner.find(['+', '-']).unwrap_or(inner.len());
    let (millis, offset) = inner.split_at(split);

    let millis: i64 = millis
        .parse()
        .map_err(|_| format!("malformed Share date millis '{raw}'"))?;
    let instant = Utc
        .timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| format!("Share date out of range '{raw}'"))?;

    let offset = if offset.is_empty() {
        FixedOffset::east_opt(0)
    } else {
        parse_offset(offset)
    }
    .ok_or_else(|| format!("malformed Share date offset '{raw}'"))?;

    Ok(instant.with_timezone(&offset))
}

/// Parse `+HHMM` / `-HHMM`.
fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let (sign, digits) = raw.split_at(1);
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    let seconds = hours * 3600 + minutes * 60;
    match sign {
        "+" => FixedOffset::east_opt(seconds),
        "-" => FixedOffset::west_opt(seconds),
        _ => None,
    }
}

/// Unknown or missing trends map to [`Trend::None`] rather than failing
/// the whole reading.
pub fn parse_trend(raw: &serde_json::Value) -> Trend {
    let parsed = match raw {
        serde_json::Value::String(s) => s.parse::<Trend>().ok(),
        serde_json::Value::Number(n) => n
            .as_u64()
            .and_then(|code| u8::try_from(code).ok())
            .and_then(Trend::from_code),
        _ => None,
    };
    parsed.unwrap_or_else(|| {
        tracing::debug!(trend = %raw, "Unrecognised Dexcom trend, recording as NONE");
        Trend::None
    })
}
