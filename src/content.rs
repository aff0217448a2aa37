// File: ./src/content.rs
// Builds the display fields of a reminder from a calendar component.
use crate::address;
use crate::model::CalendarComponent;
use chrono::DateTime;
use chrono_tz::Tz;

/// Subjects longer than this many characters are cut.
pub const SUBJECT_MAX_CHARS: usize = 70;
const ELLIPSIS: &str = "...";

/// Everything a reminder shows, with whitespace already normalised.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmailContent {
    pub subject: String,
    pub summary: String,
    pub location: String,
    pub description: String,
    /// Human-readable start of the occurrence; filled in per alarm.
    pub start_time: String,
}

impl EmailContent {
    pub fn from_component(component: &CalendarComponent) -> Self {
        let summary = component.summary.trim().to_string();
        Self {
            subject: make_subject(&summary),
            summary,
            location: component.location.trim().to_string(),
            description: address::strip_block(&component.description)
                .trim()
                .to_string(),
            start_time: String::new(),
        }
    }

    pub fn with_start_time(&self, start: &DateTime<Tz>) -> Self {
        Self {
            start_time: format_start_time(start),
            ..self.clone()
        }
    }
}

/// Collapses whitespace runs and cuts to [`SUBJECT_MAX_CHARS`] plus `...`.
pub fn make_subject(summary: &str) -> String {
    let collapsed = summary.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= SUBJECT_MAX_CHARS {
        return collapsed;
    }
    let mut cut: String = collapsed.chars().take(SUBJECT_MAX_CHARS).collect();
    cut.push_str(ELLIPSIS);
    cut
}

/// `Mon Jan 6, 2025 9:05AM CET`: day and hour lose their leading zero.
pub fn format_start_time(start: &DateTime<Tz>) -> String {
    start
        .format("%a %b %d, %Y %I:%M%p %Z")
        .to_string()
        .replace(" 0", " ")
}
