//! questlog status command implementation
//!
//! Runs a full engine pass and summarizes today, this week, and lifetime.

use std::path::PathBuf;

use chrono::Utc;

use crate::error::Result;
use crate::journal::STREAM_COLD_OUTREACH;
use crate::metrics::{LifetimeMetrics, PerfectTotals, ScopeMetrics};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::storage::Store;

#[derive(serde::Serialize)]
struct StatusReport<'a> {
    today: &'a str,
    this_week: &'a str,
    daily: &'a ScopeMetrics,
    weekly: &'a ScopeMetrics,
    lifetime: &'a LifetimeMetrics,
    totals: PerfectTotals,
    perfect_day: bool,
    perfect_week: bool,
    unclaimed: usize,
    active_events: Vec<&'a str>,
}

pub fn run(dir: Option<PathBuf>, json: bool, quiet: bool) -> Result<()> {
    let store = Store::open(Store::default_dir(dir)?)?;
    let resolution = store.refresh(Utc::now())?;
    let metrics = &resolution.metrics;

    let perfect_day = metrics
        .completion
        .daily
        .get(&metrics.today)
        .copied()
        .unwrap_or(false);
    let perfect_week = metrics
        .completion
        .weekly
        .get(&metrics.this_week)
        .copied()
        .unwrap_or(false);
    let unclaimed: usize = resolution.tabs.unclaimed.values().sum();
    let active_events: Vec<&str> = resolution
        .event_states
        .iter()
        .filter(|(_, state)| state.active)
        .map(|(id, _)| id.as_str())
        .collect();

    let report = StatusReport {
        today: &metrics.today,
        this_week: &metrics.this_week,
        daily: &metrics.daily,
        weekly: &metrics.weekly,
        lifetime: &metrics.lifetime,
        totals: metrics.totals,
        perfect_day,
        perfect_week,
        unclaimed,
        active_events,
    };

    let mut human = HumanOutput::new(format!("questlog status: {}", metrics.today));
    human.push_summary(
        "today",
        format!(
            "{} applications ({} full, {} outreach)",
            metrics.daily.applications,
            metrics.daily.full_applications,
            metrics.daily.manual_count(STREAM_COLD_OUTREACH),
        ),
    );
    human.push_summary(
        "this week",
        format!(
            "{} applications across {} platforms",
            metrics.weekly.applications,
            metrics.weekly.distinct_platforms(),
        ),
    );
    human.push_summary(
        "lifetime",
        format!(
            "{} applications, {} interviews",
            metrics.lifetime.counts.applications, metrics.lifetime.interviews,
        ),
    );
    human.push_summary(
        "perfect",
        format!(
            "{} days, {} weeks",
            metrics.totals.daily_perfect, metrics.totals.weekly_perfect,
        ),
    );
    if report.perfect_day {
        human.push_detail("today is a perfect day".to_string());
    }
    for id in &report.active_events {
        human.push_detail(format!("event active: {id}"));
    }
    if unclaimed > 0 {
        human.push_warning(format!("{unclaimed} unclaimed reward(s)"));
        human.push_next_step("questlog quests");
    }

    emit_success(OutputOptions { json, quiet }, "status", &report, Some(&human))?;

    Ok(())
}
