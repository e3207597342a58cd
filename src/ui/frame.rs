use crate::core::cache::previously_called;
use crate::core::elapsed::ElapsedFormatter;
use crate::core::models::CheckoutRecord;
use crate::core::settings::{ClockFormat, LabelSettings};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;

/// Presentation options shared by every projection.
#[derive(Debug, Clone)]
pub struct BoardView {
    pub previous_list_size: usize,
    pub formatter: ElapsedFormatter,
    pub labels: LabelSettings,
    pub clock_format: ClockFormat,
}

impl BoardView {
    pub fn new(previous_list_size: usize, labels: LabelSettings, clock_format: ClockFormat) -> Self {
        Self {
            previous_list_size,
            formatter: labels.formatter(),
            labels,
            clock_format,
        }
    }

    pub fn clock_text(&self, now: DateTime<Utc>) -> String {
        now.with_timezone(&Local)
            .format(self.clock_format.pattern())
            .to_string()
    }
}

/// The prominent "now calling" slot. `elapsed` is `None` when nobody has been
/// called yet, so the time label is hidden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentSlot {
    pub name: String,
    pub code: String,
    pub elapsed: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub name: String,
    pub code: String,
    pub elapsed: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListArea {
    Cards { cards: Vec<Card> },
    Placeholder { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardFrame {
    pub current: CurrentSlot,
    pub list: ListArea,
}

impl BoardFrame {
    pub fn project(records: &[CheckoutRecord], view: &BoardView, now: DateTime<Utc>) -> Self {
        let Some(first) = records.first() else {
            return Self {
                current: CurrentSlot {
                    name: view.labels.empty_current.clone(),
                    code: view.labels.empty_code.clone(),
                    elapsed: None,
                },
                list: ListArea::Placeholder {
                    text: view.labels.empty_list.clone(),
                },
            };
        };

        let current = CurrentSlot {
            name: first.display_name(),
            code: first.security_code.clone(),
            elapsed: Some(view.formatter.format(first.checked_out_at, now)),
        };

        let window = previously_called(records, view.previous_list_size);
        let list = if window.is_empty() {
            ListArea::Placeholder {
                text: view.labels.empty_list.clone(),
            }
        } else {
            ListArea::Cards {
                cards: window
                    .iter()
                    .map(|record| Card {
                        name: record.display_name(),
                        code: record.security_code.clone(),
                        elapsed: view.formatter.format(record.checked_out_at, now),
                    })
                    .collect(),
            }
        };

        Self { current, list }
    }

    /// Swaps in fresh elapsed labels by position without touching names,
    /// codes or the number of cards.
    pub fn apply_labels(&mut self, labels: &LabelFrame) {
        if self.current.elapsed.is_some() {
            if let Some(current) = &labels.current {
                self.current.elapsed = Some(current.clone());
            }
        }

        if let ListArea::Cards { cards } = &mut self.list {
            for (card, label) in cards.iter_mut().zip(&labels.previous) {
                card.elapsed = label.clone();
            }
        }
    }
}

/// Elapsed-time text for the entries currently on screen, in screen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelFrame {
    pub current: Option<String>,
    pub previous: Vec<String>,
}

impl LabelFrame {
    pub fn project(records: &[CheckoutRecord], view: &BoardView, now: DateTime<Utc>) -> Self {
        Self {
            current: records
                .first()
                .map(|r| view.formatter.format(r.checked_out_at, now)),
            previous: previously_called(records, view.previous_list_size)
                .iter()
                .map(|r| view.formatter.format(r.checked_out_at, now))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorFrame {
    pub current: String,
    pub list: String,
    pub detail: String,
}

impl ErrorFrame {
    pub fn new(view: &BoardView, detail: impl Into<String>) -> Self {
        Self {
            current: view.labels.error_current.clone(),
            list: view.labels.error_list.clone(),
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::LocationId;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 18, 15, 10, 0).unwrap()
    }

    fn make_record(first: &str, code: &str, minutes_ago: i64) -> CheckoutRecord {
        CheckoutRecord {
            external_id: code.to_lowercase(),
            location_id: LocationId::Number(101),
            first_name: first.to_string(),
            last_name: "Smith".to_string(),
            security_code: code.to_string(),
            checked_out_at: Some(now() - Duration::minutes(minutes_ago)),
        }
    }

    fn view(size: usize) -> BoardView {
        BoardView::new(size, LabelSettings::default(), ClockFormat::TwentyFourHour)
    }

    #[test]
    fn test_empty_records_render_placeholders() {
        let frame = BoardFrame::project(&[], &view(7), now());

        assert_eq!(frame.current.name, "No checkouts yet");
        assert_eq!(frame.current.code, "");
        assert_eq!(frame.current.elapsed, None);
        assert_eq!(
            frame.list,
            ListArea::Placeholder {
                text: "No previous calls".to_string()
            }
        );
    }

    #[test]
    fn test_single_record_has_no_previous_cards() {
        let records = vec![make_record("Noah", "A5B3", 0)];
        let frame = BoardFrame::project(&records, &view(7), now());

        assert_eq!(frame.current.name, "Noah Smith");
        assert_eq!(frame.current.code, "A5B3");
        assert_eq!(frame.current.elapsed.as_deref(), Some("just now"));
        assert!(matches!(frame.list, ListArea::Placeholder { .. }));
    }

    #[test]
    fn test_cards_follow_record_order_and_window() {
        let records: Vec<CheckoutRecord> = (0..5)
            .map(|i| make_record(&format!("Kid{}", i), &format!("C{}", i), i * 2))
            .collect();
        let frame = BoardFrame::project(&records, &view(3), now());

        let ListArea::Cards { cards } = frame.list else {
            panic!("expected cards");
        };
        let names: Vec<&str> = cards.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Kid1 Smith", "Kid2 Smith", "Kid3 Smith"]);
        assert_eq!(cards[0].elapsed, "2 min ago");
        assert_eq!(cards[2].elapsed, "6 min ago");
    }

    #[test]
    fn test_label_frame_matches_window() {
        let records: Vec<CheckoutRecord> = (0..10)
            .map(|i| make_record("Kid", &format!("C{}", i), i))
            .collect();
        let labels = LabelFrame::project(&records, &view(7), now());

        assert_eq!(labels.current.as_deref(), Some("just now"));
        assert_eq!(labels.previous.len(), 7);
        assert_eq!(labels.previous[0], "1 min ago");
        assert_eq!(labels.previous[6], "7 min ago");
    }

    #[test]
    fn test_apply_labels_only_touches_elapsed_text() {
        let records = vec![
            make_record("Ava", "C7D4", 0),
            make_record("Liam", "B2K9", 1),
        ];
        let v = view(7);
        let mut frame = BoardFrame::project(&records, &v, now());
        let later = LabelFrame::project(&records, &v, now() + Duration::minutes(5));

        frame.apply_labels(&later);

        assert_eq!(frame.current.name, "Ava Smith");
        assert_eq!(frame.current.elapsed.as_deref(), Some("5 min ago"));
        let ListArea::Cards { cards } = &frame.list else {
            panic!("expected cards");
        };
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].code, "B2K9");
        assert_eq!(cards[0].elapsed, "6 min ago");
    }

    #[test]
    fn test_error_frame_uses_configured_text() {
        let frame = ErrorFrame::new(&view(7), "data source returned HTTP 500");
        assert_eq!(frame.current, "Error loading data");
        assert_eq!(frame.list, "Error loading data. Please try again.");
        assert_eq!(frame.detail, "data source returned HTTP 500");
    }

    #[test]
    fn test_clock_text_formats() {
        let twelve = BoardView::new(7, LabelSettings::default(), ClockFormat::TwelveHour);
        let text = twelve.clock_text(now());
        assert!(text.ends_with("AM") || text.ends_with("PM"));

        let twenty_four = view(7).clock_text(now());
        assert_eq!(twenty_four.len(), 5);
        assert_eq!(&twenty_four[2..3], ":");
    }
}
