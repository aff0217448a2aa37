// File: ./src/cli.rs
//! Command-line arguments and their validation.
use crate::error::{UsageError, WindowError};
use clap::{ArgAction, CommandFactory, Parser};
use lettre::message::Mailbox;
use log::LevelFilter;
use std::path::PathBuf;

/// Emails reminders for calendar alarms due within the next few minutes.
///
/// Recipients are listed in the event or todo description, one per line,
/// between a `NOTIFY:` line and a line starting with `-`.
#[derive(Parser, Debug, Clone)]
#[command(name = "ical-reminder", version, about)]
pub struct Args {
    /// Directory searched recursively for calendar files
    pub directory: PathBuf,

    /// Length of the notification window, in minutes
    #[arg(allow_hyphen_values = true)]
    pub minutes_ahead: String,

    /// SMTP server host
    pub mail_host: String,

    /// SMTP server port
    pub mail_port: String,

    /// Sender address, e.g. "Reminders <reminders@example.com>"
    pub from_address: String,

    /// Optional TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Check that the SMTP server answers before scanning
    #[arg(long)]
    pub check_connection: bool,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Arguments after validation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub root: PathBuf,
    pub minutes_ahead: i64,
    pub mail_host: String,
    pub mail_port: u16,
    pub from: Mailbox,
    pub config: Option<PathBuf>,
    pub check_connection: bool,
    pub log_level: LevelFilter,
}

impl Args {
    pub fn validate(self) -> Result<Invocation, UsageError> {
        if !self.directory.is_dir() {
            return Err(UsageError::NotADirectory(
                self.directory.display().to_string(),
            ));
        }

        let minutes_ahead: i64 = self
            .minutes_ahead
            .trim()
            .parse()
            .map_err(|_| UsageError::NotAnInteger(self.minutes_ahead.clone()))?;
        if minutes_ahead <= 0 {
            return Err(WindowError::NonPositive(minutes_ahead).into());
        }

        let mail_port = match self.mail_port.trim().parse::<u16>() {
            Ok(port) if port > 0 => port,
            _ => return Err(UsageError::InvalidPort(self.mail_port.clone())),
        };

        let from: Mailbox =
            self.from_address
                .trim()
                .parse()
                .map_err(|e: lettre::address::AddressError| UsageError::InvalidSender {
                    address: self.from_address.clone(),
                    reason: e.to_string(),
                })?;

        Ok(Invocation {
            root: self.directory,
            minutes_ahead,
            mail_host: self.mail_host,
            mail_port,
            from,
            config: self.config,
            check_connection: self.check_connection,
            log_level: level_for(self.verbose),
        })
    }
}

pub fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

pub fn usage() -> String {
    Args::command().render_usage().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(dir: &str, minutes: &str, port: &str, from: &str) -> Args {
        Args::try_parse_from(["ical-reminder", dir, minutes, "localhost", port, from]).unwrap()
    }

    #[test]
    fn test_valid_invocation() {
        let dir = tempfile::tempdir().unwrap();
        let inv = args(
            dir.path().to_str().unwrap(),
            "15",
            "2525",
            "Reminders <r@example.com>",
        )
        .validate()
        .unwrap();
        assert_eq!(inv.minutes_ahead, 15);
        assert_eq!(inv.mail_port, 2525);
        assert_eq!(inv.from.email.to_string(), "r@example.com");
        assert_eq!(inv.log_level, LevelFilter::Warn);
    }

    #[test]
    fn test_rejects_bad_minutes() {
        let dir = tempfile::tempdir().unwrap();
        let d = dir.path().to_str().unwrap();
        assert!(matches!(
            args(d, "abc", "25", "r@example.com").validate(),
            Err(UsageError::NotAnInteger(_))
        ));
        assert!(matches!(
            args(d, "0", "25", "r@example.com").validate(),
            Err(UsageError::Window(WindowError::NonPositive(0)))
        ));
        assert!(matches!(
            args(d, "-5", "25", "r@example.com").validate(),
            Err(UsageError::Window(WindowError::NonPositive(-5)))
        ));
    }

    #[test]
    fn test_rejects_bad_port_and_sender() {
        let dir = tempfile::tempdir().unwrap();
        let d = dir.path().to_str().unwrap();
        assert!(matches!(
            args(d, "5", "70000", "r@example.com").validate(),
            Err(UsageError::InvalidPort(_))
        ));
        assert!(matches!(
            args(d, "5", "25", "not an address").validate(),
            Err(UsageError::InvalidSender { .. })
        ));
    }

    #[test]
    fn test_rejects_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(
            args(missing.to_str().unwrap(), "5", "25", "r@example.com").validate(),
            Err(UsageError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_wrong_argument_count() {
        assert!(Args::try_parse_from(["ical-reminder", "/tmp", "5"]).is_err());
    }

    #[test]
    fn test_verbosity() {
        let a = Args::try_parse_from(["ical-reminder", "-vv", "/tmp", "5", "h", "25", "a@b.c"])
            .unwrap();
        assert_eq!(level_for(a.verbose), LevelFilter::Debug);
    }
}
