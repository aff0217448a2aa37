// File: ./src/model/adapter.rs
use crate::error::ModelError;
use crate::model::item::{
    Alarm, CalendarComponent, ComponentKind, DateValue, Timestamp, TriggerOffset, localize,
};
use crate::model::recurrence::RecurrenceRule;
use chrono::{NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use icalendar::parser::{Component, Property, read_calendar, unfold};

/// Typed view over one raw calendar component's properties.
struct Fields<'c, 'a> {
    component: &'c Component<'a>,
}

impl<'c, 'a> Fields<'c, 'a> {
    fn new(component: &'c Component<'a>) -> Self {
        Self { component }
    }

    fn get(&self, key: &str) -> Option<&'c Property<'a>> {
        self.component
            .properties
            .iter()
            .find(|p| p.name.as_str().eq_ignore_ascii_case(key))
    }

    fn text(&self, key: &str) -> String {
        self.get(key)
            .map(|p| unescape_text(p.val.as_str()))
            .unwrap_or_default()
    }
}

fn param<'p>(prop: &'p Property<'_>, key: &str) -> Option<&'p str> {
    prop.params
        .iter()
        .find(|p| p.key.as_str().eq_ignore_ascii_case(key))
        .and_then(|p| p.val.as_ref())
        .map(|v| v.as_str().trim_matches('"'))
}

/// Parses the text of one calendar file into its VEVENT and VTODO components.
///
/// Conversion is all-or-nothing: a single bad component rejects the file, so no
/// alarm of a malformed file is ever evaluated.
pub fn components_from_ics(raw_ics: &str) -> Result<Vec<CalendarComponent>, ModelError> {
    let unfolded = unfold(raw_ics);
    let calendar = read_calendar(&unfolded).map_err(|e| ModelError::Parse(e.to_string()))?;
    if calendar.components.is_empty() {
        return Err(ModelError::Parse("no calendar object found".to_string()));
    }

    let mut components = Vec::new();
    for component in &calendar.components {
        collect_components(component, &mut components)?;
    }
    Ok(components)
}

fn collect_components(
    component: &Component<'_>,
    out: &mut Vec<CalendarComponent>,
) -> Result<(), ModelError> {
    match ComponentKind::from_name(component.name.as_str()) {
        Some(kind) => out.push(build_component(kind, component)?),
        None => {
            for child in &component.components {
                collect_components(child, out)?;
            }
        }
    }
    Ok(())
}

fn build_component(
    kind: ComponentKind,
    component: &Component<'_>,
) -> Result<CalendarComponent, ModelError> {
    let fields = Fields::new(component);
    let component_name = match kind {
        ComponentKind::Event => "VEVENT",
        ComponentKind::Todo => "VTODO",
    };

    let stamp_prop = fields.get("DTSTAMP").ok_or(ModelError::MissingProperty {
        component: component_name,
        property: "DTSTAMP",
    })?;
    // DTSTAMP is UTC by definition; a floating one is read as UTC too.
    let stamp_time = parse_date_value("DTSTAMP", stamp_prop)?.in_zone_or(&Tz::UTC);

    let mut item = CalendarComponent::new(kind, stamp_time);
    item.start_time = fields
        .get("DTSTART")
        .map(|p| parse_date_value("DTSTART", p))
        .transpose()?;
    item.recurrence_rule = fields
        .get("RRULE")
        .map(|p| p.val.as_str().parse::<RecurrenceRule>())
        .transpose()?;
    item.summary = fields.text("SUMMARY");
    item.location = fields.text("LOCATION");
    item.description = fields.text("DESCRIPTION");

    let mut raw_alarms = Vec::new();
    walk_alarms(component, &mut raw_alarms);
    for raw in raw_alarms {
        item.alarms.push(parse_alarm(raw)?);
    }

    Ok(item)
}

fn walk_alarms<'c, 'a>(component: &'c Component<'a>, out: &mut Vec<&'c Component<'a>>) {
    for child in &component.components {
        if child.name.as_str().eq_ignore_ascii_case("VALARM") {
            out.push(child);
        }
        walk_alarms(child, out);
    }
}

fn parse_alarm(component: &Component<'_>) -> Result<Alarm, ModelError> {
    let trigger = Fields::new(component)
        .get("TRIGGER")
        .ok_or(ModelError::MissingProperty {
            component: "VALARM",
            property: "TRIGGER",
        })?;

    let value = trigger.val.as_str().trim();
    let explicit_type = param(trigger, "VALUE").map(|v| v.to_ascii_uppercase());
    let is_absolute = match explicit_type.as_deref() {
        Some("DATE-TIME") => true,
        Some("DURATION") => false,
        Some(other) => {
            return Err(ModelError::InvalidTrigger(format!(
                "unsupported value type {}",
                other
            )));
        }
        None => !value.starts_with(['P', 'p', '+', '-']),
    };

    if is_absolute {
        match parse_date_value("TRIGGER", trigger)? {
            DateValue::Specific(ts) => Ok(Alarm::new_absolute(ts)),
            DateValue::AllDay(_) => Err(ModelError::InvalidTrigger(format!(
                "date without time '{}'",
                value
            ))),
        }
    } else {
        parse_duration(value)
            .map(Alarm::new_relative)
            .ok_or_else(|| ModelError::InvalidTrigger(format!("bad duration '{}'", value)))
    }
}

/// Reads a DATE or DATE-TIME property, honouring `VALUE=DATE`, a trailing `Z`
/// and the `TZID` parameter. Unknown zone names leave the value floating.
fn parse_date_value(property: &'static str, prop: &Property<'_>) -> Result<DateValue, ModelError> {
    let val = prop.val.as_str().trim();
    let invalid = || ModelError::InvalidDate {
        property,
        value: val.to_string(),
    };

    let is_date = param(prop, "VALUE").is_some_and(|v| v.eq_ignore_ascii_case("DATE"))
        || (val.len() == 8 && val.chars().all(|c| c.is_ascii_digit()));
    if is_date {
        return NaiveDate::parse_from_str(val, "%Y%m%d")
            .map(DateValue::AllDay)
            .map_err(|_| invalid());
    }

    if let Some(utc_val) = val.strip_suffix('Z').or_else(|| val.strip_suffix('z')) {
        let naive =
            NaiveDateTime::parse_from_str(utc_val, "%Y%m%dT%H%M%S").map_err(|_| invalid())?;
        return Ok(DateValue::Specific(Timestamp::Zoned(
            naive.and_utc().with_timezone(&Tz::UTC),
        )));
    }

    let naive = NaiveDateTime::parse_from_str(val, "%Y%m%dT%H%M%S").map_err(|_| invalid())?;
    match param(prop, "TZID") {
        Some(tzid) => match resolve_tzid(tzid) {
            Some(zone) => Ok(DateValue::Specific(Timestamp::Zoned(localize(&zone, naive)))),
            None => {
                log::warn!("Unknown TZID '{}' on {}, treating as floating", tzid, property);
                Ok(DateValue::Specific(Timestamp::Floating(naive)))
            }
        },
        None => Ok(DateValue::Specific(Timestamp::Floating(naive))),
    }
}

/// Accepts plain IANA names as well as vendor-prefixed ones such as
/// `/mozilla.org/20050126_1/Europe/Berlin`.
fn resolve_tzid(tzid: &str) -> Option<Tz> {
    let tzid = tzid.trim();
    if let Ok(zone) = tzid.parse::<Tz>() {
        return Some(zone);
    }
    let segments: Vec<&str> = tzid.split('/').filter(|s| !s.is_empty()).collect();
    (1..segments.len()).find_map(|skip| segments[skip..].join("/").parse::<Tz>().ok())
}

/// Offsets beyond roughly ten thousand years cannot point at a real date.
const MAX_OFFSET_DAYS: i64 = 3_660_000;

/// Parses an RFC 5545 duration such as `-PT15M`, `P1D`, `-P1DT2H` or `P2W`.
pub fn parse_duration(val: &str) -> Option<TriggerOffset> {
    let val = val.trim();
    let (negative, rest) = match val.as_bytes().first()? {
        b'-' => (true, &val[1..]),
        b'+' => (false, &val[1..]),
        _ => (false, val),
    };
    let rest = rest.strip_prefix(['P', 'p'])?;
    if rest.is_empty() {
        return None;
    }

    let mut days: i64 = 0;
    let mut seconds: i64 = 0;
    let mut num_buf = String::new();
    let mut in_time = false;
    let mut saw_unit = false;

    for c in rest.chars() {
        let c = c.to_ascii_uppercase();
        if c == 'T' {
            if in_time || !num_buf.is_empty() {
                return None;
            }
            in_time = true;
        } else if c.is_ascii_digit() {
            num_buf.push(c);
        } else {
            let n: i64 = num_buf.parse().ok()?;
            num_buf.clear();
            match (c, in_time) {
                ('W', false) => days = days.checked_add(n.checked_mul(7)?)?,
                ('D', false) => days = days.checked_add(n)?,
                ('H', true) => seconds = seconds.checked_add(n.checked_mul(3600)?)?,
                ('M', true) => seconds = seconds.checked_add(n.checked_mul(60)?)?,
                ('S', true) => seconds = seconds.checked_add(n)?,
                _ => return None,
            }
            saw_unit = true;
        }
    }

    if !num_buf.is_empty() || !saw_unit {
        return None;
    }
    if days > MAX_OFFSET_DAYS || seconds / 86_400 > MAX_OFFSET_DAYS {
        return None;
    }

    let sign = if negative { -1 } else { 1 };
    Some(TriggerOffset {
        days: sign * days,
        seconds: sign * seconds,
    })
}

/// Undoes RFC 5545 TEXT escaping (`\n`, `\,`, `\;`, `\\`).
pub fn unescape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') | Some('N') => out.push('\n'),
                Some(next) => out.push(next),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}
