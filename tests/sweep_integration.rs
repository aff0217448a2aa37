// Whole-run behaviour over calendar trees on disk.
use chrono::{DateTime, TimeZone, Utc};
use ical_reminder::config::Config;
use ical_reminder::content::EmailContent;
use ical_reminder::controller::ReminderController;
use ical_reminder::error::DispatchError;
use ical_reminder::mailer::Mailer;
use ical_reminder::report::Report;
use ical_reminder::window::ReferenceWindow;
use std::cell::RefCell;
use std::fs;
use std::path::Path;

/// Records every delivery and refuses the addresses in `reject`.
#[derive(Default)]
struct RecordingMailer {
    reject: Vec<&'static str>,
    sent: RefCell<Vec<(String, EmailContent)>>,
}

impl Mailer for RecordingMailer {
    fn deliver(&self, recipient: &str, content: &EmailContent) -> Result<(), DispatchError> {
        if self.reject.contains(&recipient) {
            return Err(DispatchError::InvalidRecipient {
                address: recipient.to_string(),
                reason: "mailbox unavailable".to_string(),
            });
        }
        self.sent
            .borrow_mut()
            .push((recipient.to_string(), content.clone()));
        Ok(())
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

fn calendar(kind: &str, uid: &str, dtstart: &str, extra: &str, recipients: &[&str]) -> String {
    let notify = if recipients.is_empty() {
        String::new()
    } else {
        format!("\\nNOTIFY:\\n{}\\n-", recipients.join("\\n"))
    };
    format!(
        "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//test//EN\r\n\
BEGIN:{kind}\r\n\
UID:{uid}\r\n\
DTSTAMP:20250101T000000Z\r\n\
DTSTART:{dtstart}\r\n\
{extra}\
SUMMARY:Item {uid}\r\n\
DESCRIPTION:About {uid}{notify}\r\n\
BEGIN:VALARM\r\n\
ACTION:EMAIL\r\n\
TRIGGER:-PT10M\r\n\
END:VALARM\r\n\
END:{kind}\r\n\
END:VCALENDAR\r\n"
    )
}

fn event(uid: &str, dtstart: &str, recipients: &[&str]) -> String {
    calendar("VEVENT", uid, dtstart, "", recipients)
}

fn sweep(root: &Path, mailer: &RecordingMailer) -> Report {
    let window = ReferenceWindow::new(now(), 30).unwrap();
    ReminderController::new(window, mailer, &Config::default()).sweep(root)
}

#[cfg(unix)]
#[test]
fn test_one_unreadable_file_among_ten() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    // Alarms at 12:10 (inside [12:00, 12:30)), 13:50 (after) and 10:50 (before).
    for i in 0..3 {
        fs::write(
            root.join(format!("due{}.ics", i)),
            event(&format!("due{}", i), "20250601T122000Z", &["ops@example.com"]),
        )
        .unwrap();
        fs::write(
            root.join(format!("later{}.ics", i)),
            event(&format!("later{}", i), "20250601T140000Z", &["ops@example.com"]),
        )
        .unwrap();
        fs::write(
            root.join(format!("past{}.ics", i)),
            event(&format!("past{}", i), "20250601T110000Z", &["ops@example.com"]),
        )
        .unwrap();
    }
    std::os::unix::fs::symlink(root.join("gone.ics"), root.join("broken.ics")).unwrap();

    let mailer = RecordingMailer::default();
    let report = sweep(root, &mailer);

    assert_eq!(report.calendar_files, 10);
    assert_eq!(report.calendar_file_access_errors, 1);
    assert_eq!(report.calendar_file_format_errors, 0);
    assert_eq!(report.event_alarms, 9);
    assert_eq!(report.alarms_triggered, 3);
    assert_eq!(report.alarms_pending, 3);
    assert_eq!(report.alarms_expired, 3);
    assert_eq!(report.emails_sent, 3);
    assert_eq!(report.emails_failed, 0);
    assert_eq!(mailer.sent.borrow().len(), 3);
}

#[test]
fn test_failed_recipient_does_not_stop_the_others() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("team.ics"),
        event(
            "team",
            "20250601T121500Z",
            &["a@example.com", "bounce@example.com", "c@example.com"],
        ),
    )
    .unwrap();

    let mailer = RecordingMailer {
        reject: vec!["bounce@example.com"],
        ..Default::default()
    };
    let report = sweep(dir.path(), &mailer);

    assert_eq!(report.alarms_triggered, 1);
    assert_eq!(report.emails_sent, 2);
    assert_eq!(report.emails_failed, 1);
    let sent = mailer.sent.borrow();
    let to: Vec<_> = sent.iter().map(|(r, _)| r.as_str()).collect();
    assert_eq!(to, vec!["a@example.com", "c@example.com"]);
    assert_eq!(sent[0].1.subject, "Item team");
    assert_eq!(sent[0].1.start_time, "Sun Jun 1, 2025 12:15PM UTC");
    // The closing "-" line stays in the text.
    assert_eq!(sent[0].1.description, "About team\n-");
}

#[test]
fn test_todo_alarms_are_counted_separately() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("task.ics"),
        calendar("VTODO", "task", "20250601T122500Z", "", &["me@example.com"]),
    )
    .unwrap();
    fs::write(
        dir.path().join("meeting.ics"),
        event("meeting", "20250601T180000Z", &[]),
    )
    .unwrap();

    let mailer = RecordingMailer::default();
    let report = sweep(dir.path(), &mailer);

    assert_eq!(report.todo_alarms, 1);
    assert_eq!(report.event_alarms, 1);
    assert_eq!(report.alarms_triggered, 1);
    assert_eq!(report.alarms_pending, 1);
    assert_eq!(report.emails_sent, 1);
}

#[test]
fn test_finished_series_is_expired() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("short.ics"),
        calendar(
            "VEVENT",
            "short",
            "20250101T090000Z",
            "RRULE:FREQ=DAILY;COUNT=3\r\n",
            &["me@example.com"],
        ),
    )
    .unwrap();
    fs::write(
        dir.path().join("daily.ics"),
        calendar(
            "VEVENT",
            "daily",
            "20250101T122000Z",
            "RRULE:FREQ=DAILY\r\n",
            &["me@example.com"],
        ),
    )
    .unwrap();

    let mailer = RecordingMailer::default();
    let report = sweep(dir.path(), &mailer);

    assert_eq!(report.event_alarms, 2);
    assert_eq!(report.alarms_expired, 1);
    assert_eq!(report.alarms_triggered, 1);
    assert_eq!(
        mailer.sent.borrow()[0].1.start_time,
        "Sun Jun 1, 2025 12:20PM UTC"
    );
}

#[test]
fn test_malformed_component_rejects_whole_file() {
    let dir = tempfile::tempdir().unwrap();
    let good = event("good", "20250601T122000Z", &["me@example.com"]);
    // Second component lacks DTSTAMP.
    let bad = good.replacen(
        "END:VCALENDAR\r\n",
        "BEGIN:VEVENT\r\nUID:bad\r\nDTSTART:20250601T122000Z\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n",
        1,
    );
    fs::write(dir.path().join("mixed.ics"), bad).unwrap();
    fs::write(dir.path().join("bad-trigger.ics"), good.replace("-PT10M", "-PT10Q")).unwrap();

    let mailer = RecordingMailer::default();
    let report = sweep(dir.path(), &mailer);

    assert_eq!(report.calendar_files, 2);
    assert_eq!(report.calendar_file_format_errors, 2);
    assert_eq!(report.event_alarms, 0);
    assert!(mailer.sent.borrow().is_empty());
}

#[test]
fn test_custom_extension() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("a.ical"),
        event("a", "20250601T122000Z", &["me@example.com"]),
    )
    .unwrap();
    fs::write(
        dir.path().join("b.ics"),
        event("b", "20250601T122000Z", &["me@example.com"]),
    )
    .unwrap();

    let config = Config::from_toml("extension = \"ical\"").unwrap();
    let mailer = RecordingMailer::default();
    let window = ReferenceWindow::new(now(), 30).unwrap();
    let report = ReminderController::new(window, &mailer, &config).sweep(dir.path());

    assert_eq!(report.calendar_files, 1);
    assert_eq!(report.emails_sent, 1);
}
