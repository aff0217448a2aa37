// Recipient extraction and the text shown in reminders.
use chrono::TimeZone;
use chrono_tz::Tz;
use ical_reminder::address::{extract_addresses, strip_block};
use ical_reminder::content::{EmailContent, make_subject};
use ical_reminder::model::{CalendarComponent, ComponentKind};
use lettre::message::Mailbox;

fn component(summary: &str, description: &str) -> CalendarComponent {
    let stamp = Tz::UTC.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let mut c = CalendarComponent::new(ComponentKind::Event, stamp);
    c.summary = summary.to_string();
    c.description = description.to_string();
    c
}

#[test]
fn test_block_addresses_and_sanitized_description() {
    let description = "intro text\nNOTIFY:\n  a@x.com \r\n b@y.com\n-\nfooter";
    assert_eq!(extract_addresses(description), vec!["a@x.com", "b@y.com"]);

    let content = EmailContent::from_component(&component("Meeting", description));
    assert!(content.description.contains("intro text"));
    assert!(content.description.contains("footer"));
    assert!(!content.description.contains("NOTIFY:"));
    assert!(!content.description.contains("a@x.com"));
    assert!(!content.description.contains("b@y.com"));
}

#[test]
fn test_without_marker() {
    let description = "  Just a note about NOTIFY: nothing here\nsecond line  \n";
    assert!(extract_addresses(description).is_empty());
    assert_eq!(strip_block(description), description);

    let content = EmailContent::from_component(&component("Meeting", description));
    assert_eq!(content.description, description.trim());
}

#[test]
fn test_named_recipients_keep_order_and_duplicates() {
    let description = "NOTIFY:\nAnn <ann@example.com>\n\"Lee, Bo\" <bo@example.com>\nann@example.com\n-";
    let lee = Mailbox::new(Some("Lee, Bo".to_string()), "bo@example.com".parse().unwrap());
    assert_eq!(
        extract_addresses(description),
        vec![
            "Ann <ann@example.com>".to_string(),
            lee.to_string(),
            "ann@example.com".to_string(),
        ]
    );
}

#[test]
fn test_only_tokens_without_an_address_are_dropped() {
    let description = "NOTIFY:\njust some words\nfoo\na@x.com, b@y.com\n<>\n-";
    assert_eq!(extract_addresses(description), vec!["a@x.com"]);
}

#[test]
fn test_subject_truncation() {
    let long = "s".repeat(75);
    assert_eq!(make_subject(&long), format!("{}...", "s".repeat(70)));

    let exact = "t".repeat(70);
    assert_eq!(make_subject(&exact), exact);

    let content = EmailContent::from_component(&component(&format!("  {}  ", long), ""));
    assert_eq!(content.subject.chars().count(), 73);
    assert_eq!(content.summary, long);
}
