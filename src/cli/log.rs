//! questlog log commands: append applications, manual entries, and status
//! changes to the journal.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::journal::{parse_timestamp, ApplicationKind, ApplicationRecord, ManualEntry};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::storage::Store;

pub struct AppOptions {
    pub platform: String,
    pub kind: String,
    pub city: Option<String>,
    pub cv_tailored: bool,
    pub motivation: bool,
    pub favorite: bool,
    pub quality: Option<u8>,
    pub date: Option<String>,
    pub dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub fn run_app(opts: AppOptions) -> Result<()> {
    let kind = parse_kind(&opts.kind)?;
    if let Some(score) = opts.quality {
        if score > 3 {
            return Err(Error::InvalidArgument(format!(
                "quality score {score} out of range (0-3)"
            )));
        }
    }
    let when = parse_date_override(opts.date.as_deref())?;

    let store = Store::open(Store::default_dir(opts.dir)?)?;
    let mut record = ApplicationRecord::new(kind, opts.platform, when);
    record.city = opts.city;
    record.cv_tailored = opts.cv_tailored;
    record.motivation = opts.motivation;
    record.favorite = opts.favorite;
    record.quality_score = opts.quality;
    store.append_application(&record)?;

    let mut human = HumanOutput::new("questlog log app: recorded");
    human.push_summary("id", record.id.clone());
    human.push_summary("platform", record.platform.clone());
    human.push_summary(
        "kind",
        match record.kind {
            ApplicationKind::Full => "full",
            ApplicationKind::Easy => "easy",
        },
    );
    human.push_next_step("questlog status");

    emit_success(
        OutputOptions {
            json: opts.json,
            quiet: opts.quiet,
        },
        "log app",
        &record,
        Some(&human),
    )?;

    Ok(())
}

pub struct ManualOptions {
    pub stream: String,
    pub date: Option<String>,
    pub dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub fn run_manual(opts: ManualOptions) -> Result<()> {
    let stream = opts.stream.trim();
    if stream.is_empty() {
        return Err(Error::InvalidArgument("stream name is empty".to_string()));
    }
    let when = parse_date_override(opts.date.as_deref())?;

    let store = Store::open(Store::default_dir(opts.dir)?)?;
    let entry = ManualEntry::at(when);
    store.append_manual(stream, entry.clone())?;

    #[derive(serde::Serialize)]
    struct ManualReport<'a> {
        stream: &'a str,
        #[serde(flatten)]
        entry: &'a ManualEntry,
    }

    let mut human = HumanOutput::new("questlog log manual: recorded");
    human.push_summary("stream", stream);
    human.push_summary("at", when.to_rfc3339());

    emit_success(
        OutputOptions {
            json: opts.json,
            quiet: opts.quiet,
        },
        "log manual",
        &ManualReport {
            stream,
            entry: &entry,
        },
        Some(&human),
    )?;

    Ok(())
}

pub struct StatusOptions {
    pub id: String,
    pub to: String,
    pub dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub fn run_status(opts: StatusOptions) -> Result<()> {
    let store = Store::open(Store::default_dir(opts.dir)?)?;
    let updated = store.update_application_status(&opts.id, &opts.to, Utc::now())?;

    let mut human = HumanOutput::new("questlog log status: recorded");
    human.push_summary("id", updated.id.clone());
    human.push_summary("status", updated.status.clone());
    human.push_next_step("questlog quests");

    emit_success(
        OutputOptions {
            json: opts.json,
            quiet: opts.quiet,
        },
        "log status",
        &updated,
        Some(&human),
    )?;

    Ok(())
}

fn parse_kind(raw: &str) -> Result<ApplicationKind> {
    match raw.to_lowercase().as_str() {
        "full" => Ok(ApplicationKind::Full),
        "easy" => Ok(ApplicationKind::Easy),
        _ => Err(Error::InvalidArgument(format!(
            "invalid kind '{raw}': must be full or easy"
        ))),
    }
}

fn parse_date_override(raw: Option<&str>) -> Result<DateTime<Utc>> {
    match raw {
        None => Ok(Utc::now()),
        Some(raw) => parse_timestamp(raw)
            .ok_or_else(|| Error::InvalidArgument(format!("unparseable date '{raw}'"))),
    }
}
