// File: ./src/report.rs
// Run-wide counters, owned by the sweep and printed once at the end.
use crate::model::ComponentKind;
use crate::window::AlarmState;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    CalendarFiles,
    FileAccessErrors,
    FileFormatErrors,
    EventAlarms,
    TodoAlarms,
    AlarmsExpired,
    AlarmsTriggered,
    AlarmsPending,
    EmailsSent,
    EmailsFailed,
}

impl Counter {
    pub fn for_state(state: AlarmState) -> Self {
        match state {
            AlarmState::Expired => Counter::AlarmsExpired,
            AlarmState::Triggered => Counter::AlarmsTriggered,
            AlarmState::Pending => Counter::AlarmsPending,
        }
    }

    pub fn for_alarm_of(kind: ComponentKind) -> Self {
        match kind {
            ComponentKind::Event => Counter::EventAlarms,
            ComponentKind::Todo => Counter::TodoAlarms,
        }
    }
}

/// Counters only ever go up during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub calendar_files: u64,
    pub calendar_file_access_errors: u64,
    pub calendar_file_format_errors: u64,
    pub event_alarms: u64,
    pub todo_alarms: u64,
    pub alarms_expired: u64,
    pub alarms_triggered: u64,
    pub alarms_pending: u64,
    pub emails_sent: u64,
    pub emails_failed: u64,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, counter: Counter) -> &mut u64 {
        match counter {
            Counter::CalendarFiles => &mut self.calendar_files,
            Counter::FileAccessErrors => &mut self.calendar_file_access_errors,
            Counter::FileFormatErrors => &mut self.calendar_file_format_errors,
            Counter::EventAlarms => &mut self.event_alarms,
            Counter::TodoAlarms => &mut self.todo_alarms,
            Counter::AlarmsExpired => &mut self.alarms_expired,
            Counter::AlarmsTriggered => &mut self.alarms_triggered,
            Counter::AlarmsPending => &mut self.alarms_pending,
            Counter::EmailsSent => &mut self.emails_sent,
            Counter::EmailsFailed => &mut self.emails_failed,
        }
    }

    pub fn record(&mut self, counter: Counter) {
        *self.slot(counter) += 1;
    }

    /// Pretty JSON, the form printed at the end of a run.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files ({} unreadable, {} malformed), {} alarms: {} expired, {} triggered, {} pending; {} emails sent, {} failed",
            self.calendar_files,
            self.calendar_file_access_errors,
            self.calendar_file_format_errors,
            self.event_alarms + self.todo_alarms,
            self.alarms_expired,
            self.alarms_triggered,
            self.alarms_pending,
            self.emails_sent,
            self.emails_failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts() {
        let mut r = Report::new();
        r.record(Counter::AlarmsPending);
        r.record(Counter::AlarmsPending);
        r.record(Counter::for_state(AlarmState::Triggered));
        r.record(Counter::for_alarm_of(ComponentKind::Todo));
        assert_eq!(r.alarms_pending, 2);
        assert_eq!(r.alarms_triggered, 1);
        assert_eq!(r.todo_alarms, 1);
        assert_eq!(r.emails_sent, 0);
    }

    #[test]
    fn test_json_keys() {
        let mut r = Report::new();
        r.record(Counter::CalendarFiles);
        let json: serde_json::Value = serde_json::from_str(&r.to_json()).unwrap();
        assert_eq!(json["calendar_files"], 1);
        assert_eq!(json["calendar_file_access_errors"], 0);
        assert_eq!(json.as_object().unwrap().len(), 10);
    }
}
