// File: ./src/model/item.rs
use crate::model::recurrence::RecurrenceRule;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone};
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ComponentKind {
    Event,
    Todo,
}

impl ComponentKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "VEVENT" => Some(Self::Event),
            "VTODO" => Some(Self::Todo),
            _ => None,
        }
    }
}

// --- DATE TYPES ---

/// A date-time that may or may not carry a zone.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Timestamp {
    Floating(NaiveDateTime),
    Zoned(DateTime<Tz>),
}

impl Timestamp {
    /// Pins a floating value to `zone`; zoned values are returned untouched.
    pub fn in_zone_or(&self, zone: &Tz) -> DateTime<Tz> {
        match self {
            Timestamp::Floating(naive) => localize(zone, *naive),
            Timestamp::Zoned(dt) => *dt,
        }
    }
}

/// Value of a DTSTART-like property.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DateValue {
    AllDay(NaiveDate),
    Specific(Timestamp),
}

impl DateValue {
    /// Date-only values become midnight in `zone`, floating values take `zone`.
    pub fn in_zone_or(&self, zone: &Tz) -> DateTime<Tz> {
        match self {
            DateValue::AllDay(d) => localize(zone, d.and_time(NaiveTime::MIN)),
            DateValue::Specific(ts) => ts.in_zone_or(zone),
        }
    }
}

/// Attaches `zone` to a wall-clock time.
///
/// Ambiguous times (DST fall-back) take the earlier instant. Times inside a DST
/// gap are read with the offset in force before the gap, so 02:30 on a
/// spring-forward night in Europe/Berlin becomes 03:30 CEST.
pub fn localize(zone: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    if let Some(dt) = zone.from_local_datetime(&naive).earliest() {
        return dt;
    }
    let before = zone.from_utc_datetime(&(naive - Duration::days(1)));
    let offset = Duration::seconds(i64::from(before.offset().fix().local_minus_utc()));
    zone.from_utc_datetime(&(naive - offset))
}

// --- ALARMS ---

/// Signed RFC 5545 duration.
///
/// Weeks and days are nominal and move the wall clock; hours, minutes and
/// seconds are exact.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct TriggerOffset {
    pub days: i64,
    pub seconds: i64,
}

impl TriggerOffset {
    pub fn minutes(mins: i64) -> Self {
        Self {
            days: 0,
            seconds: mins * 60,
        }
    }

    pub fn apply(&self, start: &DateTime<Tz>) -> DateTime<Tz> {
        let zone = start.timezone();
        let shifted = if self.days == 0 {
            *start
        } else {
            localize(&zone, start.naive_local() + Duration::days(self.days))
        };
        shifted + Duration::seconds(self.seconds)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum AlarmTrigger {
    Relative(TriggerOffset),
    Absolute(Timestamp),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Alarm {
    pub trigger: AlarmTrigger,
}

impl Alarm {
    pub fn new_relative(offset: TriggerOffset) -> Self {
        Self {
            trigger: AlarmTrigger::Relative(offset),
        }
    }

    pub fn new_absolute(ts: Timestamp) -> Self {
        Self {
            trigger: AlarmTrigger::Absolute(ts),
        }
    }

    /// Absolute instant at which this alarm fires for the given occurrence.
    ///
    /// A floating absolute trigger takes the occurrence's zone, never the
    /// host's local zone.
    pub fn resolve_trigger(&self, occurrence_start: &DateTime<Tz>) -> DateTime<Tz> {
        match &self.trigger {
            AlarmTrigger::Absolute(ts) => ts.in_zone_or(&occurrence_start.timezone()),
            AlarmTrigger::Relative(offset) => offset.apply(occurrence_start),
        }
    }
}

// --- COMPONENTS ---

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarComponent {
    pub kind: ComponentKind,
    pub stamp_time: DateTime<Tz>,
    pub start_time: Option<DateValue>,
    pub recurrence_rule: Option<RecurrenceRule>,
    pub summary: String,
    pub location: String,
    pub description: String,
    pub alarms: Vec<Alarm>,
}

impl CalendarComponent {
    pub fn new(kind: ComponentKind, stamp_time: DateTime<Tz>) -> Self {
        Self {
            kind,
            stamp_time,
            start_time: None,
            recurrence_rule: None,
            summary: String::new(),
            location: String::new(),
            description: String::new(),
            alarms: Vec::new(),
        }
    }

    /// The component start with the stamp's zone filled in where needed.
    /// Falls back to the stamp itself when there is no DTSTART.
    pub fn zoned_start(&self) -> DateTime<Tz> {
        let zone = self.stamp_time.timezone();
        match &self.start_time {
            Some(value) => value.in_zone_or(&zone),
            None => self.stamp_time,
        }
    }
}
