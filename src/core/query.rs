use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: u32 = 30;

/// Filters forwarded to the data source as query parameters. Unset values are
/// left off the request entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_group_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_group_id: Option<u64>,
    /// Relative (`-31m`, `-1h30m`) or absolute RFC 3339 lower bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_out_after: Option<String>,
    /// Upper bound, same syntax as `checked_out_after`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_out_before: Option<String>,
}

impl Default for CheckoutQuery {
    fn default() -> Self {
        Self {
            limit: Some(DEFAULT_LIMIT),
            location_group_name: None,
            location_group_id: None,
            checked_out_after: None,
            checked_out_before: None,
        }
    }
}

impl CheckoutQuery {
    pub fn validate(&self) -> Result<()> {
        self.validate_at(Utc::now())
    }

    fn validate_at(&self, now: DateTime<Utc>) -> Result<()> {
        if let Some(name) = &self.location_group_name {
            if name.trim().is_empty() {
                anyhow::bail!("query.location_group_name must not be blank");
            }
        }

        let after = resolve_bound("checked_out_after", self.checked_out_after.as_deref(), now)?;
        let before = resolve_bound("checked_out_before", self.checked_out_before.as_deref(), now)?;

        if let (Some(after), Some(before)) = (after, before) {
            if after > before {
                anyhow::bail!("query.checked_out_after must be before query.checked_out_before");
            }
        }

        Ok(())
    }
}

/// Resolves a relative or RFC 3339 bound to an instant.
fn resolve_bound(
    field: &str,
    value: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>> {
    let Some(value) = value else {
        return Ok(None);
    };

    if let Some(offset) = parse_relative_duration(value) {
        return Ok(Some(now + offset));
    }

    match DateTime::parse_from_rfc3339(value) {
        Ok(at) => Ok(Some(at.with_timezone(&Utc))),
        Err(_) => anyhow::bail!(
            "query.{} must be a duration like -31m or an RFC 3339 timestamp, got {:?}",
            field,
            value
        ),
    }
}

/// Parses signed durations built from `h`, `m`, `s` and `ms` components,
/// e.g. `-31m`, `90s` or `-1h30m`.
fn parse_relative_duration(input: &str) -> Option<Duration> {
    let (sign, body) = match input.strip_prefix('-') {
        Some(body) => (-1.0, body),
        None => (1.0, input.strip_prefix('+').unwrap_or(input)),
    };

    if body.is_empty() {
        return None;
    }

    let mut total_ms = 0.0;
    let mut rest = body;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let number: f64 = rest[..digits].parse().ok()?;
        rest = &rest[digits..];

        let (unit, unit_ms) = [("ms", 1.0), ("h", 3_600_000.0), ("m", 60_000.0), ("s", 1_000.0)]
            .into_iter()
            .find(|(unit, _)| rest.starts_with(unit))?;
        rest = &rest[unit.len()..];
        total_ms += number * unit_ms;
    }

    Some(Duration::milliseconds((sign * total_ms).round() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_query_requests_thirty() {
        let query = CheckoutQuery::default();
        assert_eq!(query.limit, Some(30));
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_relative_durations() {
        for ok in ["-31m", "31m", "+2h", "-1h30m", "90s", "-150h", "1.5h", "250ms"] {
            assert!(parse_relative_duration(ok).is_some(), "{} should parse", ok);
        }
        for bad in ["", "-", "31", "m", "-31x", "yesterday", "1h30", "."] {
            assert!(parse_relative_duration(bad).is_none(), "{} should not parse", bad);
        }

        assert_eq!(parse_relative_duration("-31m"), Some(Duration::minutes(-31)));
        assert_eq!(parse_relative_duration("-1h30m"), Some(Duration::minutes(-90)));
        assert_eq!(parse_relative_duration("1.5h"), Some(Duration::minutes(90)));
        assert_eq!(parse_relative_duration("250ms"), Some(Duration::milliseconds(250)));
    }

    #[test]
    fn test_validate_bound_ordering() {
        let now = DateTime::parse_from_rfc3339("2026-01-18T15:10:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut query = CheckoutQuery {
            checked_out_after: Some("-31m".to_string()),
            checked_out_before: Some("-1m".to_string()),
            ..CheckoutQuery::default()
        };
        assert!(query.validate_at(now).is_ok());

        query.checked_out_before = Some("-1h".to_string());
        assert!(query.validate_at(now).is_err());

        // Absolute and relative bounds compare on the same clock.
        query.checked_out_before = Some("2026-01-18T09:00:00-06:00".to_string());
        assert!(query.validate_at(now).is_ok());
        query.checked_out_before = Some("2026-01-18T08:30:00-06:00".to_string());
        assert!(query.validate_at(now).is_err());

        query.checked_out_before = Some("whenever".to_string());
        assert!(query.validate_at(now).is_err());
    }

    #[test]
    fn test_validate_checked_out_after() {
        let mut query = CheckoutQuery {
            checked_out_after: Some("-31m".to_string()),
            ..CheckoutQuery::default()
        };
        assert!(query.validate().is_ok());

        query.checked_out_after = Some("2026-01-18T14:00:00-06:00".to_string());
        assert!(query.validate().is_ok());

        query.checked_out_after = Some("last tuesday".to_string());
        assert!(query.validate().is_err());
    }

    #[test]
    fn test_validate_blank_group_name() {
        let query = CheckoutQuery {
            location_group_name: Some("  ".to_string()),
            ..CheckoutQuery::default()
        };
        assert!(query.validate().is_err());
    }

    #[test]
    fn test_parse_toml_section() {
        let toml = r#"
            limit = 12
            location_group_name = "Nursery & Toddlers"
            checked_out_after = "-31m"
        "#;

        let query: CheckoutQuery = toml::from_str(toml).unwrap();
        assert_eq!(query.limit, Some(12));
        assert_eq!(query.location_group_name.as_deref(), Some("Nursery & Toddlers"));
        assert_eq!(query.location_group_id, None);
    }
}
