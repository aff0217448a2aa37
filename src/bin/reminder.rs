// File: ./src/bin/reminder.rs
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use clap::error::ErrorKind;
use ical_reminder::cli::{self, Args, Invocation};
use ical_reminder::config::Config;
use ical_reminder::controller::ReminderController;
use ical_reminder::mailer::SmtpMailer;
use ical_reminder::window::ReferenceWindow;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
            // clap already appends usage to its own errors.
            let _ = e.print();
            return code;
        }
    };

    let invocation = match args.validate() {
        Ok(inv) => inv,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            eprintln!("{}", cli::usage());
            return ExitCode::FAILURE;
        }
    };

    init_logging(&invocation);

    match run(invocation) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(invocation: &Invocation) {
    let config = ConfigBuilder::new()
        .set_time_level(log::LevelFilter::Off)
        .build();
    // A second logger cannot be installed; nothing to do then.
    let _ = TermLogger::init(
        invocation.log_level,
        config,
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );
}

fn run(invocation: Invocation) -> Result<()> {
    let config = Config::load(invocation.config.as_deref())?;
    let window = ReferenceWindow::new(Utc::now(), invocation.minutes_ahead)?;

    let mailer = SmtpMailer::new(
        &invocation.mail_host,
        invocation.mail_port,
        invocation.from.clone(),
        &config,
    )
    .with_context(|| {
        format!(
            "Cannot set up SMTP for {}:{}",
            invocation.mail_host, invocation.mail_port
        )
    })?;

    if invocation.check_connection {
        let ok = mailer.check_connection().with_context(|| {
            format!(
                "SMTP server {}:{} is not reachable",
                invocation.mail_host, invocation.mail_port
            )
        })?;
        if !ok {
            anyhow::bail!(
                "SMTP server {}:{} did not answer",
                invocation.mail_host,
                invocation.mail_port
            );
        }
    }

    let report = ReminderController::new(window, &mailer, &config).sweep(&invocation.root);
    log::info!("{}", report);
    println!("{}", report.to_json());
    Ok(())
}
