// File: ./src/mailer.rs
// Sends reminder emails, one message per recipient over a shared SMTP transport.
use crate::config::{Config, StartTls};
use crate::content::EmailContent;
use crate::error::DispatchError;
use crate::report::{Counter, Report};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Message, SmtpTransport, Transport};
use std::time::Duration;

/// Anything that can deliver one reminder to one recipient.
pub trait Mailer {
    fn deliver(&self, recipient: &str, content: &EmailContent) -> Result<(), DispatchError>;
}

/// Sends `content` to every recipient, counting each outcome.
///
/// A failure for one recipient does not stop the others.
pub fn dispatch(
    mailer: &dyn Mailer,
    recipients: &[String],
    content: &EmailContent,
    report: &mut Report,
) {
    for recipient in recipients {
        match mailer.deliver(recipient, content) {
            Ok(()) => {
                log::info!("Reminder '{}' sent to {}", content.subject, recipient);
                report.record(Counter::EmailsSent);
            }
            Err(e) => {
                log::warn!("Reminder '{}' to {} failed: {}", content.subject, recipient, e);
                report.record(Counter::EmailsFailed);
            }
        }
    }
}

pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    /// Builds the transport; no connection is opened until the first send or
    /// [`SmtpMailer::check_connection`].
    pub fn new(host: &str, port: u16, from: Mailbox, config: &Config) -> Result<Self, DispatchError> {
        let tls = match config.starttls {
            StartTls::Disabled => Tls::None,
            StartTls::Opportunistic => Tls::Opportunistic(TlsParameters::new(host.to_string())?),
            StartTls::Required => Tls::Required(TlsParameters::new(host.to_string())?),
        };
        let transport = SmtpTransport::builder_dangerous(host)
            .port(port)
            .tls(tls)
            .timeout(Some(Duration::from_secs(config.smtp_timeout_secs)))
            .build();
        Ok(Self { transport, from })
    }

    pub fn check_connection(&self) -> Result<bool, DispatchError> {
        Ok(self.transport.test_connection()?)
    }

    pub fn build_message(&self, recipient: &str, content: &EmailContent) -> Result<Message, DispatchError> {
        let to: Mailbox = recipient
            .parse()
            .map_err(|e: lettre::address::AddressError| DispatchError::InvalidRecipient {
                address: recipient.to_string(),
                reason: e.to_string(),
            })?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject_line(content))
            .multipart(MultiPart::alternative_plain_html(
                render_plain(content),
                render_html(content),
            ))?;
        Ok(message)
    }
}

impl Mailer for SmtpMailer {
    fn deliver(&self, recipient: &str, content: &EmailContent) -> Result<(), DispatchError> {
        let message = self.build_message(recipient, content)?;
        self.transport.send(&message)?;
        Ok(())
    }
}

pub fn subject_line(content: &EmailContent) -> String {
    format!("{} on {}", content.subject, content.start_time)
}

pub fn render_plain(content: &EmailContent) -> String {
    let mut body = format!(
        "Summary:\n\n{}\n\nTime:\n\n{}\n\n",
        content.summary, content.start_time
    );
    if !content.location.is_empty() {
        body.push_str(&format!("Location:\n\n{}\n\n", content.location));
    }
    if !content.description.is_empty() {
        body.push_str(&format!("Description:\n\n{}\n\n", content.description));
    }
    body
}

pub fn render_html(content: &EmailContent) -> String {
    fn section(title: &str, value: &str) -> String {
        format!(
            "<div>{}:</div><ul><li style=\"white-space: pre;\">{}</li></ul>\n",
            title,
            escape_html(value)
        )
    }

    let mut body = String::from(
        "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Strict//EN\" \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd\">\n",
    );
    body.push_str("<html xmlns=\"http://www.w3.org/1999/xhtml\">\n");
    body.push_str(&format!(
        "<head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=utf-8\" /><title>{}</title></head>\n",
        escape_html(&content.subject)
    ));
    body.push_str("<body>\n");
    body.push_str(&section("Summary", &content.summary));
    body.push_str(&section("Time", &content.start_time));
    if !content.location.is_empty() {
        body.push_str(&section("Location", &content.location));
    }
    if !content.description.is_empty() {
        body.push_str(&section("Description", &content.description));
    }
    body.push_str("</body>\n</html>\n");
    body
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
