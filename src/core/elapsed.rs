use chrono::{DateTime, Utc};

pub const DEFAULT_JUST_NOW_LABEL: &str = "just now";

/// Turns a checkout time into the "N min ago" label shown next to a child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElapsedFormatter {
    just_now: String,
    missing: String,
}

impl ElapsedFormatter {
    /// `missing` is what a record without a checkout time shows. Lobby boards
    /// use "just now", room boards use "0 min ago".
    pub fn new(just_now: impl Into<String>, missing: impl Into<String>) -> Self {
        Self {
            just_now: just_now.into(),
            missing: missing.into(),
        }
    }

    pub fn format(&self, checked_out_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
        let Some(checked_out_at) = checked_out_at else {
            return self.missing.clone();
        };

        // Floor division so clock skew into the future also reads "just now".
        let minutes = now
            .signed_duration_since(checked_out_at)
            .num_seconds()
            .div_euclid(60);

        if minutes < 1 {
            return self.just_now.clone();
        }

        format!("{} min ago", minutes)
    }
}

impl Default for ElapsedFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_JUST_NOW_LABEL, DEFAULT_JUST_NOW_LABEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn checkout_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 18, 15, 0, 0).unwrap()
    }

    #[test]
    fn test_same_instant_is_just_now() {
        let formatter = ElapsedFormatter::default();
        let t = checkout_time();
        assert_eq!(formatter.format(Some(t), t), "just now");
    }

    #[test]
    fn test_minutes_are_floored() {
        let formatter = ElapsedFormatter::default();
        let t = checkout_time();

        assert_eq!(formatter.format(Some(t), t + Duration::seconds(59)), "just now");
        assert_eq!(formatter.format(Some(t), t + Duration::seconds(90)), "1 min ago");
        assert_eq!(formatter.format(Some(t), t + Duration::seconds(150)), "2 min ago");
        assert_eq!(formatter.format(Some(t), t + Duration::minutes(31)), "31 min ago");
    }

    #[test]
    fn test_future_timestamp_is_just_now() {
        let formatter = ElapsedFormatter::default();
        let t = checkout_time();
        assert_eq!(formatter.format(Some(t), t - Duration::seconds(30)), "just now");
    }

    #[test]
    fn test_missing_uses_configured_label() {
        let lobby = ElapsedFormatter::default();
        let room = ElapsedFormatter::new("just now", "0 min ago");
        let now = checkout_time();

        assert_eq!(lobby.format(None, now), "just now");
        assert_eq!(room.format(None, now), "0 min ago");
    }
}
