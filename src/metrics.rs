//! Metrics aggregation over the journal.
//!
//! A single pass over the application log buckets every record into its
//! local day; weeks are then folded from their constituent days plus
//! week-scoped manual counts, so a record can never be double counted
//! across weeks. Malformed timestamps are skipped silently: a corrupt
//! historical entry must never break metric computation.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::{Config, DailyPolicy, WeeklyPolicy};
use crate::journal::{
    ApplicationKind, ApplicationRecord, ManualLogs, STREAM_COLD_OUTREACH, STREAM_SKILL_LEARNING,
    STATUS_GHOSTED, STATUS_INTERVIEW, STATUS_REJECTED,
};
use crate::timekeys::{day_key, week_key, week_key_of_date};

/// Counters for one day, one week, or the whole journal.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ScopeMetrics {
    pub applications: u32,
    pub full_applications: u32,
    pub combo_applications: u32,
    pub tailored_cvs: u32,
    pub letters: u32,
    pub referral_applications: u32,
    pub platforms: BTreeSet<String>,
    pub cities: BTreeSet<String>,
    /// Manual-stream counts keyed by stream name.
    pub manual: BTreeMap<String, u32>,
}

impl ScopeMetrics {
    fn absorb(&mut self, app: &ApplicationRecord, platform: &str) {
        self.applications += 1;
        if app.kind == ApplicationKind::Full {
            self.full_applications += 1;
        }
        if app.is_combo() {
            self.combo_applications += 1;
        }
        if app.cv_tailored {
            self.tailored_cvs += 1;
        }
        if app.motivation {
            self.letters += 1;
        }
        if app.is_referral() {
            self.referral_applications += 1;
        }
        self.platforms.insert(platform.to_string());
        if let Some(city) = app.city.as_deref() {
            let city = city.trim();
            if !city.is_empty() {
                self.cities.insert(city.to_string());
            }
        }
    }

    fn merge(&mut self, other: &ScopeMetrics) {
        self.applications += other.applications;
        self.full_applications += other.full_applications;
        self.combo_applications += other.combo_applications;
        self.tailored_cvs += other.tailored_cvs;
        self.letters += other.letters;
        self.referral_applications += other.referral_applications;
        self.platforms.extend(other.platforms.iter().cloned());
        self.cities.extend(other.cities.iter().cloned());
        for (stream, count) in &other.manual {
            *self.manual.entry(stream.clone()).or_insert(0) += count;
        }
    }

    pub fn distinct_platforms(&self) -> u32 {
        self.platforms.len() as u32
    }

    pub fn distinct_cities(&self) -> u32 {
        self.cities.len() as u32
    }

    pub fn manual_count(&self, stream: &str) -> u32 {
        self.manual.get(stream).copied().unwrap_or(0)
    }
}

/// Lifetime counters: the scope counters plus outcome counts that only make
/// sense over the full journal.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct LifetimeMetrics {
    #[serde(flatten)]
    pub counts: ScopeMetrics,
    pub rejections: u32,
    pub ghosted: u32,
    pub interviews: u32,
    pub favorites: u32,
}

/// Perfect-day / perfect-week completion maps.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Completion {
    pub daily: BTreeMap<String, bool>,
    pub weekly: BTreeMap<String, bool>,
}

/// Historical totals of perfect days and weeks.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct PerfectTotals {
    pub daily_perfect: u32,
    pub weekly_perfect: u32,
}

/// Immutable snapshot of every rolling metric the quest engine consumes.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Today's counters.
    pub daily: ScopeMetrics,
    /// Current week's counters.
    pub weekly: ScopeMetrics,
    pub lifetime: LifetimeMetrics,
    /// Per-day counters for every day seen in the journal.
    pub days: BTreeMap<String, ScopeMetrics>,
    /// Per-week counters, folded from days plus week-scoped manual counts.
    pub weeks: BTreeMap<String, ScopeMetrics>,
    pub completion: Completion,
    pub totals: PerfectTotals,
    /// Manual counts in the trailing 7x24h window ending at `now`.
    pub manual_trailing_week: BTreeMap<String, u32>,
    /// Day key of `now`, kept so consumers agree on what "today" was.
    pub today: String,
    /// Week key of `now`.
    pub this_week: String,
}

impl MetricsSnapshot {
    /// Counters for the scope a quest tracks against.
    pub fn scope(&self, scope: MetricScope) -> &ScopeMetrics {
        match scope {
            MetricScope::Daily => &self.daily,
            MetricScope::Weekly => &self.weekly,
            MetricScope::Lifetime => &self.lifetime.counts,
        }
    }
}

/// Aggregation scope for tracked quests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricScope {
    Daily,
    Weekly,
    Lifetime,
}

/// Fold the journal into a metrics snapshot.
///
/// Pure and idempotent: identical inputs produce an identical snapshot.
pub fn compute_metrics(
    applications: &[ApplicationRecord],
    manual_logs: &ManualLogs,
    now: DateTime<Utc>,
    config: &Config,
) -> MetricsSnapshot {
    let today = day_key(now);
    let this_week = week_key(now);

    let mut days: BTreeMap<String, ScopeMetrics> = BTreeMap::new();
    let mut lifetime = LifetimeMetrics::default();

    for app in applications {
        let Some(ts) = app.timestamp() else {
            continue;
        };
        let platform = normalize_platform(&app.platform, config);
        days.entry(day_key(ts))
            .or_default()
            .absorb(app, &platform);
        lifetime.counts.absorb(app, &platform);

        let status = app.status.trim();
        if status.eq_ignore_ascii_case(STATUS_REJECTED) {
            lifetime.rejections += 1;
        } else if status.eq_ignore_ascii_case(STATUS_GHOSTED) {
            lifetime.ghosted += 1;
        } else if status.eq_ignore_ascii_case(STATUS_INTERVIEW) {
            lifetime.interviews += 1;
        }
        if app.favorite {
            lifetime.favorites += 1;
        }
    }

    // Manual streams bucket into days and weeks independently of the
    // application log, plus a trailing 7x24h window for quick lookups.
    let trailing_cutoff = now - Duration::days(7);
    let mut week_manual: BTreeMap<String, BTreeMap<String, u32>> = BTreeMap::new();
    let mut manual_trailing_week: BTreeMap<String, u32> = BTreeMap::new();

    for (stream, entries) in manual_logs {
        for entry in entries {
            let Some(ts) = entry.timestamp() else {
                continue;
            };
            let day = day_key(ts);
            *days.entry(day).or_default().manual.entry(stream.clone()).or_insert(0) += 1;
            *week_manual
                .entry(week_key(ts))
                .or_default()
                .entry(stream.clone())
                .or_insert(0) += 1;
            *lifetime.counts.manual.entry(stream.clone()).or_insert(0) += 1;
            if ts > trailing_cutoff && ts <= now {
                *manual_trailing_week.entry(stream.clone()).or_insert(0) += 1;
            }
        }
    }

    // Weekly aggregates are the sum of their days; manual counts come from
    // the week buckets directly (same result, already bucketed by week key).
    let mut weeks: BTreeMap<String, ScopeMetrics> = BTreeMap::new();
    for (day, metrics) in &days {
        let week = week_of_day_key(day);
        let bucket = weeks.entry(week).or_default();
        bucket.merge(metrics);
    }
    for (week, streams) in &week_manual {
        let bucket = weeks.entry(week.clone()).or_default();
        bucket.manual = streams.clone();
    }

    let mut completion = Completion::default();
    let mut totals = PerfectTotals::default();
    for (day, metrics) in &days {
        let perfect = is_perfect_day(metrics, &config.policy.daily);
        completion.daily.insert(day.clone(), perfect);
        if perfect {
            totals.daily_perfect += 1;
        }
    }
    for (week, metrics) in &weeks {
        let perfect = is_perfect_week(metrics, &config.policy.weekly);
        completion.weekly.insert(week.clone(), perfect);
        if perfect {
            totals.weekly_perfect += 1;
        }
    }

    let daily = days.get(&today).cloned().unwrap_or_default();
    let weekly = weeks.get(&this_week).cloned().unwrap_or_default();

    MetricsSnapshot {
        daily,
        weekly,
        lifetime,
        days,
        weeks,
        completion,
        totals,
        manual_trailing_week,
        today,
        this_week,
    }
}

/// Perfect-day policy predicate. Thresholds are config with defaults that
/// must match the shipped policy exactly.
pub fn is_perfect_day(metrics: &ScopeMetrics, policy: &DailyPolicy) -> bool {
    metrics.applications >= policy.applications
        && metrics.full_applications >= policy.full_applications
        && metrics.distinct_platforms() >= policy.platforms
        && metrics.tailored_cvs >= policy.tailored_cvs
        && metrics.letters >= policy.letters
        && metrics.manual_count(STREAM_COLD_OUTREACH) >= policy.cold_outreach
}

/// Perfect-week predicate: every weekly core requirement passes.
pub fn is_perfect_week(metrics: &ScopeMetrics, policy: &WeeklyPolicy) -> bool {
    metrics.applications >= policy.applications
        && metrics.full_applications >= policy.full_applications
        && metrics.combo_applications >= policy.combo_applications
        && metrics.tailored_cvs >= policy.tailored_cvs
        && metrics.letters >= policy.letters
        && metrics.distinct_platforms() >= policy.platforms
        && metrics.manual_count(STREAM_COLD_OUTREACH) >= policy.cold_outreach
        && metrics.manual_count(STREAM_SKILL_LEARNING) >= policy.skill_sessions
}

fn normalize_platform(platform: &str, config: &Config) -> String {
    let trimmed = platform.trim();
    if trimmed.is_empty() {
        return config.journal.default_platform.clone();
    }
    if config.journal.normalize_platforms {
        trimmed.to_lowercase()
    } else {
        trimmed.to_string()
    }
}

fn week_of_day_key(day: &str) -> String {
    match chrono::NaiveDate::parse_from_str(day, "%Y-%m-%d") {
        Ok(date) => week_key_of_date(date),
        // Day keys are produced by `day_key`, so this arm is unreachable in
        // practice; fold stray keys into their own bucket rather than panic.
        Err(_) => day.to_string(),
    }
}
