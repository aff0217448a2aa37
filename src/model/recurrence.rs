// File: ./src/model/recurrence.rs
use crate::error::RecurrenceError;
use crate::model::item::localize;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use rrule::{RRule, RRuleSet, Unvalidated};
use std::str::FromStr;

/// Years past this are outside what any calendar will store.
const LAST_YEAR: i64 = 9999;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Length of one step when the frequency has a fixed wall-clock length.
    fn fixed_step(&self, interval: u32) -> Option<i64> {
        let unit = match self {
            Frequency::Secondly => 1,
            Frequency::Minutely => 60,
            Frequency::Hourly => 60 * 60,
            Frequency::Daily => 24 * 60 * 60,
            Frequency::Weekly => 7 * 24 * 60 * 60,
            Frequency::Monthly | Frequency::Yearly => return None,
        };
        Some(unit * i64::from(interval))
    }
}

impl FromStr for Frequency {
    type Err = RecurrenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SECONDLY" => Ok(Frequency::Secondly),
            "MINUTELY" => Ok(Frequency::Minutely),
            "HOURLY" => Ok(Frequency::Hourly),
            "DAILY" => Ok(Frequency::Daily),
            "WEEKLY" => Ok(Frequency::Weekly),
            "MONTHLY" => Ok(Frequency::Monthly),
            "YEARLY" => Ok(Frequency::Yearly),
            other => Err(RecurrenceError::InvalidRule(format!(
                "unknown FREQ '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Until {
    Date(NaiveDate),
    Floating(NaiveDateTime),
    Utc(DateTime<Utc>),
}

impl Until {
    /// Last instant the series may produce. Date-only values cover the whole day.
    fn resolve(&self, zone: &Tz) -> DateTime<Tz> {
        match self {
            Until::Date(d) => {
                let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
                localize(zone, d.and_time(end_of_day))
            }
            Until::Floating(naive) => localize(zone, *naive),
            Until::Utc(dt) => dt.with_timezone(zone),
        }
    }

    fn parse(value: &str) -> Result<Self, RecurrenceError> {
        let value = value.trim();
        let bad = || RecurrenceError::InvalidRule(format!("invalid UNTIL '{}'", value));
        if value.len() == 8 {
            return NaiveDate::parse_from_str(value, "%Y%m%d")
                .map(Until::Date)
                .map_err(|_| bad());
        }
        if let Some(stripped) = value.strip_suffix('Z') {
            return NaiveDateTime::parse_from_str(stripped, "%Y%m%dT%H%M%S")
                .map(|naive| Until::Utc(naive.and_utc()))
                .map_err(|_| bad());
        }
        NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
            .map(Until::Floating)
            .map_err(|_| bad())
    }
}

/// A parsed RRULE value.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RecurrenceRule {
    pub freq: Frequency,
    pub interval: u32,
    pub count: Option<u32>,
    pub until: Option<Until>,
    /// Any BYxxx part present; such rules are expanded by the `rrule` crate.
    pub has_by_parts: bool,
    source: String,
}

impl FromStr for RecurrenceRule {
    type Err = RecurrenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Stored rules sometimes carry the property name along with the value.
        let clean = s.trim();
        let source = match clean.get(..6) {
            Some(prefix) if prefix.eq_ignore_ascii_case("RRULE:") => clean[6..].trim().to_string(),
            _ => clean.to_string(),
        };

        let mut freq = None;
        let mut interval = 1;
        let mut count = None;
        let mut until = None;
        let mut has_by_parts = false;

        for part in source.split(';').filter(|p| !p.trim().is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                RecurrenceError::InvalidRule(format!("malformed part '{}'", part))
            })?;
            let key = key.trim().to_ascii_uppercase();
            match key.as_str() {
                "FREQ" => freq = Some(value.parse::<Frequency>()?),
                "INTERVAL" => {
                    interval = value
                        .trim()
                        .parse::<u32>()
                        .ok()
                        .filter(|i| *i > 0)
                        .ok_or_else(|| {
                            RecurrenceError::InvalidRule(format!("invalid INTERVAL '{}'", value))
                        })?;
                }
                "COUNT" => {
                    count = Some(value.trim().parse::<u32>().map_err(|_| {
                        RecurrenceError::InvalidRule(format!("invalid COUNT '{}'", value))
                    })?);
                }
                "UNTIL" => until = Some(Until::parse(value)?),
                "WKST" => {}
                k if k.starts_with("BY") => has_by_parts = true,
                k if k.starts_with("X-") => {}
                other => {
                    return Err(RecurrenceError::InvalidRule(format!(
                        "unsupported part '{}'",
                        other
                    )));
                }
            }
        }

        let freq =
            freq.ok_or_else(|| RecurrenceError::InvalidRule("missing FREQ".to_string()))?;

        if has_by_parts {
            // Reject what the expander would reject, before any alarm is evaluated.
            source
                .parse::<RRule<Unvalidated>>()
                .map_err(|e| RecurrenceError::InvalidRule(e.to_string()))?;
        }

        Ok(Self {
            freq,
            interval,
            count,
            until,
            has_by_parts,
            source,
        })
    }
}

impl RecurrenceRule {
    /// Rule text with UNTIL rewritten to UTC, which the expander requires when
    /// DTSTART carries a zone.
    fn normalized_source(&self, zone: &Tz) -> String {
        let Some(until) = self.until else {
            return self.source.clone();
        };
        let utc_until = until
            .resolve(zone)
            .with_timezone(&Utc)
            .format("%Y%m%dT%H%M%SZ")
            .to_string();
        self.source
            .split(';')
            .filter(|p| !p.trim().is_empty())
            .map(|part| {
                if part.trim().to_ascii_uppercase().starts_with("UNTIL=") {
                    format!("UNTIL={}", utc_until)
                } else {
                    part.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Outcome of an occurrence query.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Occurrence {
    At(DateTime<Tz>),
    /// The series ended before the reference instant.
    Expired,
}

pub struct RecurrenceEngine;

impl RecurrenceEngine {
    /// First occurrence strictly after `after`.
    ///
    /// Without a rule the component occurs once, at `start`, whatever `after` is.
    pub fn next_occurrence(
        rule: Option<&RecurrenceRule>,
        start: DateTime<Tz>,
        after: DateTime<Utc>,
    ) -> Result<Occurrence, RecurrenceError> {
        let Some(rule) = rule else {
            return Ok(Occurrence::At(start));
        };

        if rule.has_by_parts {
            return Self::next_expanded(rule, start, after);
        }

        Ok(match rule.freq.fixed_step(rule.interval) {
            Some(step) => Self::next_fixed(rule, start, after, step),
            None => Self::next_calendar(rule, start, after),
        })
    }

    /// SECONDLY through WEEKLY: occurrence `n` sits at `start + n * step` on the
    /// wall clock, so the index just before `after` is a division away.
    fn next_fixed(
        rule: &RecurrenceRule,
        start: DateTime<Tz>,
        after: DateTime<Utc>,
        step: i64,
    ) -> Occurrence {
        let zone = start.timezone();
        let after = after.with_timezone(&zone);
        let until = rule.until.map(|u| u.resolve(&zone));
        let base = start.naive_local();

        let elapsed = (after.naive_local() - base).num_seconds();
        // One step of slack absorbs the offset change of a DST transition.
        let mut index: i64 = if elapsed <= 0 {
            0
        } else {
            (elapsed / step - 1).max(0)
        };

        loop {
            if rule.count.is_some_and(|c| index >= i64::from(c)) {
                return Occurrence::Expired;
            }
            let Some(naive) = step
                .checked_mul(index)
                .and_then(Duration::try_seconds)
                .and_then(|d| base.checked_add_signed(d))
            else {
                return Occurrence::Expired;
            };
            if i64::from(naive.year()) > LAST_YEAR {
                return Occurrence::Expired;
            }
            let candidate = localize(&zone, naive);
            if until.is_some_and(|u| candidate > u) {
                return Occurrence::Expired;
            }
            if candidate > after {
                return Occurrence::At(candidate);
            }
            index += 1;
        }
    }

    /// MONTHLY and YEARLY: same day-of-month and time each period. Periods where
    /// that day does not exist produce nothing and do not consume COUNT.
    fn next_calendar(
        rule: &RecurrenceRule,
        start: DateTime<Tz>,
        after: DateTime<Utc>,
    ) -> Occurrence {
        let zone = start.timezone();
        let after = after.with_timezone(&zone);
        let until = rule.until.map(|u| u.resolve(&zone));
        let base = start.naive_local();

        let months_step = i64::from(rule.interval)
            * match rule.freq {
                Frequency::Yearly => 12,
                _ => 1,
            };
        let base_month = i64::from(base.year()) * 12 + i64::from(base.month0());
        let target = after.naive_local();
        let target_month = i64::from(target.year()) * 12 + i64::from(target.month0());

        // With COUNT and a day that some months lack, skipped periods must be
        // counted one by one; otherwise every period up to the target is valid.
        let must_count_each = rule.count.is_some() && base.day() > 28;
        let mut index = if target_month > base_month && !must_count_each {
            ((target_month - base_month) / months_step - 1).max(0)
        } else {
            0
        };
        let mut produced = index as u64;

        loop {
            let month_abs = base_month + index * months_step;
            let year = month_abs.div_euclid(12);
            if year > LAST_YEAR {
                return Occurrence::Expired;
            }
            index += 1;

            let month = (month_abs.rem_euclid(12) + 1) as u32;
            let Some(date) = NaiveDate::from_ymd_opt(year as i32, month, base.day()) else {
                continue;
            };
            if rule.count.is_some_and(|c| produced >= u64::from(c)) {
                return Occurrence::Expired;
            }
            produced += 1;

            let candidate = localize(&zone, date.and_time(base.time()));
            if until.is_some_and(|u| candidate > u) {
                return Occurrence::Expired;
            }
            if candidate > after {
                return Occurrence::At(candidate);
            }
        }
    }

    /// Rules with BYxxx parts go through the `rrule` crate, whose iterator gives
    /// up after a bounded number of empty steps.
    fn next_expanded(
        rule: &RecurrenceRule,
        start: DateTime<Tz>,
        after: DateTime<Utc>,
    ) -> Result<Occurrence, RecurrenceError> {
        let zone = start.timezone();
        let dtstart = if zone == Tz::UTC {
            format!("DTSTART:{}", start.format("%Y%m%dT%H%M%SZ"))
        } else {
            format!(
                "DTSTART;TZID={}:{}",
                zone.name(),
                start.naive_local().format("%Y%m%dT%H%M%S")
            )
        };
        let rrule_string = format!("{}\nRRULE:{}", dtstart, rule.normalized_source(&zone));

        let rrule_set = RRuleSet::from_str(&rrule_string)
            .map_err(|e| RecurrenceError::Expansion(e.to_string()))?;

        let after_zoned = after.with_timezone(&zone);
        // `after` may be inclusive depending on the crate version; ask for two.
        let result = rrule_set
            .after(after.with_timezone(&rrule::Tz::Tz(Tz::UTC)))
            .all(2);

        Ok(result
            .dates
            .into_iter()
            .map(|d| d.with_timezone(&zone))
            .find(|d| *d > after_zoned)
            .map_or(Occurrence::Expired, Occurrence::At))
    }
}
