// File: ./src/model/mod.rs
pub mod adapter;
pub mod item;
pub mod recurrence;

pub use item::{
    Alarm, AlarmTrigger, CalendarComponent, ComponentKind, DateValue, Timestamp, TriggerOffset,
};
pub use recurrence::{Frequency, Occurrence, RecurrenceEngine, RecurrenceRule};
