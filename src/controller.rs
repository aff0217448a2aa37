// File: ./src/controller.rs
//! Drives one sweep over a calendar tree.
//!
//! Every selected file is loaded as a whole, then each alarm of each component
//! is resolved against the run's window. Alarms that land inside the window are
//! mailed to the addresses listed in the component's description. Nothing is
//! remembered between runs; the [`Report`] is the only output besides mail.
use crate::address;
use crate::config::Config;
use crate::content::EmailContent;
use crate::error::{FileError, ModelError};
use crate::mailer::{self, Mailer};
use crate::model::adapter::components_from_ics;
use crate::model::recurrence::{Occurrence, RecurrenceEngine};
use crate::model::CalendarComponent;
use crate::report::{Counter, Report};
use crate::window::{AlarmState, ReferenceWindow};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

pub struct ReminderController<'m> {
    window: ReferenceWindow,
    mailer: &'m dyn Mailer,
    extension: String,
    report: Report,
}

impl<'m> ReminderController<'m> {
    pub fn new(window: ReferenceWindow, mailer: &'m dyn Mailer, config: &Config) -> Self {
        Self {
            window,
            mailer,
            extension: config.extension.clone(),
            report: Report::new(),
        }
    }

    /// Processes every calendar file under `root` and returns the counters.
    pub fn sweep(mut self, root: &Path) -> Report {
        log::info!(
            "Checking alarms between {} and {} under {}",
            self.window.start,
            self.window.end,
            root.display()
        );
        for path in collect_calendar_files(root, &self.extension) {
            self.process_file(&path);
        }
        self.report
    }

    /// Loads one file and evaluates its alarms. Any failure skips the rest of
    /// the file and is counted, never propagated.
    pub fn process_file(&mut self, path: &Path) {
        self.report.record(Counter::CalendarFiles);

        let result = load_components(path).and_then(|components| {
            components
                .iter()
                .try_for_each(|c| self.evaluate_component(c))
                .map_err(FileError::from)
        });

        if let Err(e) = result {
            if e.is_access() {
                self.report.record(Counter::FileAccessErrors);
            } else {
                self.report.record(Counter::FileFormatErrors);
            }
            log::warn!("Skipping {}: {}", path.display(), e);
        }
    }

    fn evaluate_component(&mut self, component: &CalendarComponent) -> Result<(), ModelError> {
        if component.alarms.is_empty() {
            return Ok(());
        }
        let content = EmailContent::from_component(component);
        let recipients = address::extract_addresses(&component.description);
        let start = component.zoned_start();

        for alarm in &component.alarms {
            self.report.record(Counter::for_alarm_of(component.kind));

            let occurrence = match RecurrenceEngine::next_occurrence(
                component.recurrence_rule.as_ref(),
                start,
                self.window.start,
            )? {
                Occurrence::At(at) => at,
                Occurrence::Expired => {
                    log::debug!("'{}': series has ended", content.subject);
                    self.report.record(Counter::AlarmsExpired);
                    continue;
                }
            };

            let trigger = alarm.resolve_trigger(&occurrence);
            let state = self.window.classify(&trigger);
            self.report.record(Counter::for_state(state));
            log::debug!(
                "'{}': occurrence {}, trigger {} is {:?}",
                content.subject,
                occurrence,
                trigger,
                state
            );

            if state == AlarmState::Triggered {
                if recipients.is_empty() {
                    log::info!("'{}' triggered but lists no recipients", content.subject);
                }
                let content = content.with_start_time(&occurrence);
                mailer::dispatch(self.mailer, &recipients, &content, &mut self.report);
            }
        }
        Ok(())
    }
}

/// Reads and converts a whole file. Opening failures are access errors,
/// everything after that is a format error.
pub fn load_components(path: &Path) -> Result<Vec<CalendarComponent>, FileError> {
    let mut file = File::open(path).map_err(FileError::Access)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(FileError::Read)?;
    let text = String::from_utf8(bytes)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    Ok(components_from_ics(text)?)
}

/// Files under `root` whose name ends in `.{extension}`, depth first, each
/// directory in name order. Unreadable directories are logged and skipped.
/// Symlinked directories are not followed.
pub fn collect_calendar_files(root: &Path, extension: &str) -> Vec<PathBuf> {
    let suffix = format!(".{}", extension);
    let mut out = Vec::new();
    walk(root, &suffix, &mut out);
    out
}

fn walk(dir: &Path, suffix: &str, out: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Cannot list {}: {}", dir.display(), e);
            return;
        }
    };
    let mut entries: Vec<_> = entries.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            walk(&path, suffix, out);
        } else if !path.is_dir() && entry.file_name().to_string_lossy().ends_with(suffix) {
            out.push(path);
        }
    }
}
