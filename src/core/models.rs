use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Room or group a child was checked into. The data source sends a number,
/// older deployments send the location name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocationId {
    Number(i64),
    Name(String),
}

impl Default for LocationId {
    fn default() -> Self {
        LocationId::Number(0)
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationId::Number(id) => write!(f, "{}", id),
            LocationId::Name(name) => f.write_str(name),
        }
    }
}

/// One child's most recent checkout event, as returned by the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRecord {
    #[serde(rename = "planning_center_id", alias = "id", default)]
    pub external_id: String,
    #[serde(default)]
    pub location_id: LocationId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub security_code: String,
    #[serde(default, deserialize_with = "deserialize_checked_out_at")]
    pub checked_out_at: Option<DateTime<Utc>>,
}

impl CheckoutRecord {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn is_called(&self) -> bool {
        self.checked_out_at.is_some()
    }
}

fn deserialize_checked_out_at<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;

    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_timestamp(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Parses an RFC 3339 timestamp, or a naive ISO-8601 timestamp in the host's
/// local zone.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| format!("invalid checked_out_at {:?}: {}", value, e))?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| format!("checked_out_at {:?} does not exist in the local zone", value))
}
