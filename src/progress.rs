//! In-window progress counters for active event quests.
//!
//! For each active event state this computes the journal activity that
//! happened inside `[triggered_at, min(expires_at, now)]`. Event-scoped
//! quest tracking reads these counters instead of the rolling metrics.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::Policy;
use crate::events::EventStates;
use crate::journal::{ApplicationKind, ApplicationRecord, ManualLogs};

/// Counters for one event's active window.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct EventProgress {
    pub applications: u32,
    pub full_applications: u32,
    /// Applications at or above the policy quality floor.
    pub quality_applications: u32,
    /// Applications inside the burst window right after the trigger.
    pub burst_applications: u32,
    /// Manual-stream counts inside the window.
    pub manual: BTreeMap<String, u32>,
}

impl EventProgress {
    pub fn manual_count(&self, stream: &str) -> u32 {
        self.manual.get(stream).copied().unwrap_or(0)
    }
}

/// Per-event progress, keyed by event quest id. Only active events with a
/// trigger timestamp appear.
pub type EventProgressMap = BTreeMap<String, EventProgress>;

/// Compute in-window counters for every active event.
pub fn compute_event_progress(
    states: &EventStates,
    applications: &[ApplicationRecord],
    manual_logs: &ManualLogs,
    now: DateTime<Utc>,
    policy: &Policy,
) -> EventProgressMap {
    let mut out = EventProgressMap::new();

    for (id, state) in states {
        if !state.active {
            continue;
        }
        let Some(start) = state.triggered_at else {
            continue;
        };
        let end = match state.expires_at {
            Some(expires) => expires.min(now),
            None => now,
        };
        if end < start {
            continue;
        }

        let burst_end = start + Duration::hours(policy.burst_window_hours);
        let mut progress = EventProgress::default();

        for app in applications {
            let Some(ts) = app.timestamp() else {
                continue;
            };
            if ts < start || ts > end {
                continue;
            }
            progress.applications += 1;
            if app.kind == ApplicationKind::Full {
                progress.full_applications += 1;
            }
            if app.quality_score.is_some_and(|qs| qs >= policy.quality_floor) {
                progress.quality_applications += 1;
            }
            if ts <= burst_end {
                progress.burst_applications += 1;
            }
        }

        for (stream, entries) in manual_logs {
            let count = entries
                .iter()
                .filter_map(|entry| entry.timestamp())
                .filter(|ts| *ts >= start && *ts <= end)
                .count() as u32;
            if count > 0 {
                progress.manual.insert(stream.clone(), count);
            }
        }

        out.insert(id.clone(), progress);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventState;
    use crate::journal::ManualEntry;
    use chrono::TimeZone;

    fn hour(n: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(n * 3_600_000).single().unwrap()
    }

    fn active_state(id: &str, from: DateTime<Utc>, until: DateTime<Utc>) -> (String, EventState) {
        let mut state = EventState::inactive(id);
        state.active = true;
        state.triggered_at = Some(from);
        state.expires_at = Some(until);
        (id.to_string(), state)
    }

    fn app_at(ts: DateTime<Utc>, kind: ApplicationKind, qs: Option<u8>) -> ApplicationRecord {
        let mut app = ApplicationRecord::new(kind, "board", ts);
        app.quality_score = qs;
        app
    }

    #[test]
    fn counts_only_inside_the_window() {
        let states: EventStates = [active_state("ev", hour(10), hour(20))].into_iter().collect();
        let apps = vec![
            app_at(hour(9), ApplicationKind::Full, None), // before
            app_at(hour(11), ApplicationKind::Full, Some(3)), // burst + quality
            app_at(hour(15), ApplicationKind::Easy, Some(1)),
            app_at(hour(21), ApplicationKind::Full, None), // after expiry
        ];
        let progress = compute_event_progress(
            &states,
            &apps,
            &ManualLogs::new(),
            hour(22),
            &Policy::default(),
        );
        let ev = &progress["ev"];
        assert_eq!(ev.applications, 2);
        assert_eq!(ev.full_applications, 1);
        assert_eq!(ev.quality_applications, 1);
        assert_eq!(ev.burst_applications, 1);
    }

    #[test]
    fn window_is_capped_at_now_before_expiry() {
        let states: EventStates = [active_state("ev", hour(10), hour(20))].into_iter().collect();
        let apps = vec![app_at(hour(15), ApplicationKind::Easy, None)];
        let progress =
            compute_event_progress(&states, &apps, &ManualLogs::new(), hour(12), &Policy::default());
        assert_eq!(progress["ev"].applications, 0);
    }

    #[test]
    fn inactive_states_are_skipped() {
        let mut state = EventState::inactive("ev");
        state.triggered_at = Some(hour(10));
        let states: EventStates = [("ev".to_string(), state)].into_iter().collect();
        let progress = compute_event_progress(
            &states,
            &[],
            &ManualLogs::new(),
            hour(12),
            &Policy::default(),
        );
        assert!(progress.is_empty());
    }

    #[test]
    fn manual_entries_bucket_by_stream() {
        let states: EventStates = [active_state("ev", hour(10), hour(20))].into_iter().collect();
        let mut logs = ManualLogs::new();
        logs.insert(
            "coldOutreach".to_string(),
            vec![ManualEntry::at(hour(11)), ManualEntry::at(hour(25))],
        );
        let progress = compute_event_progress(
            &states,
            &[],
            &logs,
            hour(22),
            &Policy::default(),
        );
        assert_eq!(progress["ev"].manual_count("coldOutreach"), 1);
    }
}
