mod support;

use chrono::Utc;

use questlog::config::Config;
use questlog::journal::{ApplicationKind, ManualLogs, STREAM_COLD_OUTREACH};
use questlog::metrics::compute_metrics;
use questlog::timekeys::{day_key, week_key};
use support::{app_at, local, TestStore};

#[test]
fn day_buckets_sum_to_lifetime() {
    // Tuesday through Thursday of one week, plus one app the week after.
    let times = [
        local(2025, 3, 11, 10),
        local(2025, 3, 11, 15),
        local(2025, 3, 12, 9),
        local(2025, 3, 13, 18),
        local(2025, 3, 20, 12),
    ];
    let apps: Vec<_> = times
        .iter()
        .map(|at| app_at(*at, ApplicationKind::Easy, "board"))
        .collect();

    let now = local(2025, 3, 21, 13);
    let metrics = compute_metrics(&apps, &ManualLogs::new(), now, &Config::default());

    let day_sum: u32 = metrics.days.values().map(|day| day.applications).sum();
    assert_eq!(day_sum, metrics.lifetime.counts.applications);
    assert_eq!(day_sum, 5);

    // The first week's bucket folds exactly its own days.
    let first_week = week_key(times[0]);
    assert_eq!(metrics.weeks[&first_week].applications, 4);
    assert_eq!(metrics.daily.applications, 0);
    assert_eq!(metrics.weekly.applications, 1);
}

#[test]
fn identical_inputs_produce_identical_snapshots() {
    let apps = vec![
        app_at(local(2025, 3, 11, 10), ApplicationKind::Full, "board"),
        app_at(local(2025, 3, 12, 10), ApplicationKind::Easy, "Board "),
    ];
    let mut logs = ManualLogs::new();
    logs.insert(
        STREAM_COLD_OUTREACH.to_string(),
        vec![questlog::journal::ManualEntry::at(local(2025, 3, 11, 11))],
    );
    let now = local(2025, 3, 12, 20);

    let first = compute_metrics(&apps, &logs, now, &Config::default());
    let second = compute_metrics(&apps, &logs, now, &Config::default());
    assert_eq!(first, second);

    // Platform normalization folds "Board " into "board".
    assert_eq!(first.lifetime.counts.distinct_platforms(), 1);
}

#[test]
fn perfect_day_end_to_end() {
    let store = TestStore::init();
    let day = |h| local(2025, 3, 11, h);

    // Hit every daily threshold exactly: 20 applications, 5 of them full
    // combos (tailored + letter), spread over 3 platforms.
    let platforms = ["alpha", "beta", "gamma"];
    for i in 0..20u32 {
        let kind = if i < 5 {
            ApplicationKind::Full
        } else {
            ApplicationKind::Easy
        };
        let mut app = app_at(day(8 + i % 10), kind, platforms[(i % 3) as usize]);
        if i < 5 {
            app.cv_tailored = true;
            app.motivation = true;
        }
        store.log_app(&app);
    }
    store.log_manual(STREAM_COLD_OUTREACH, day(9));
    store.log_manual(STREAM_COLD_OUTREACH, day(17));

    let now = day(20);
    let apps = store.store.read_applications().expect("read applications");
    let logs = store.store.read_manual_logs().expect("read manual logs");
    let metrics = compute_metrics(&apps, &logs, now, &Config::default());

    let today = day_key(now);
    assert_eq!(metrics.completion.daily.get(&today), Some(&true));
    assert_eq!(metrics.totals.daily_perfect, 1);
    assert_eq!(metrics.totals.weekly_perfect, 0);
}

#[test]
fn one_short_of_any_threshold_is_not_perfect() {
    // Same shape as above but only one cold outreach ping.
    let day = |h| local(2025, 3, 11, h);
    let platforms = ["alpha", "beta", "gamma"];
    let mut apps = Vec::new();
    for i in 0..20u32 {
        let kind = if i < 5 {
            ApplicationKind::Full
        } else {
            ApplicationKind::Easy
        };
        let mut app = app_at(day(8 + i % 10), kind, platforms[(i % 3) as usize]);
        if i < 5 {
            app.cv_tailored = true;
            app.motivation = true;
        }
        apps.push(app);
    }
    let mut logs = ManualLogs::new();
    logs.insert(
        STREAM_COLD_OUTREACH.to_string(),
        vec![questlog::journal::ManualEntry::at(day(9))],
    );

    let now = day(20);
    let metrics = compute_metrics(&apps, &logs, now, &Config::default());
    assert_eq!(metrics.totals.daily_perfect, 0);
}

#[test]
fn malformed_timestamps_are_skipped_not_fatal() {
    let mut good = app_at(Utc::now(), ApplicationKind::Easy, "board");
    good.date = "2025-03-11T10:00:00+00:00".to_string();
    let mut bad = app_at(Utc::now(), ApplicationKind::Easy, "board");
    bad.date = "soonish".to_string();

    let metrics = compute_metrics(
        &[good, bad],
        &ManualLogs::new(),
        local(2025, 3, 12, 10),
        &Config::default(),
    );
    assert_eq!(metrics.lifetime.counts.applications, 1);
}
