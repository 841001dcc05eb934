//! Event-quest state machine.
//!
//! Each event quest has one `EventState` that moves through a trigger /
//! expiry / cooldown lifecycle driven entirely by the journal and `now`.
//! Evaluation is deterministic and idempotent: the same inputs always
//! produce the same states, and an unchanged pass hands back the previous
//! map as `Cow::Borrowed` so callers can memoize without deep comparison.

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{EventQuest, Trigger};
use crate::journal::{ApplicationRecord, ManualLogs, STREAM_STATUS_CHANGE};
use crate::timekeys::local_date;

/// Lifecycle state of one event quest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EventState {
    pub id: String,
    #[serde(default)]
    pub active: bool,
    /// Start of the current (or most recent) activation window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggered_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_until: Option<DateTime<Utc>>,
    /// Most recent trigger ever; survives deactivation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_trigger_at: Option<DateTime<Utc>>,
    /// Set when the quest's goal was met inside a window; cleared on
    /// activation. Chained events trigger off this.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl EventState {
    pub fn inactive(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// Event states keyed by quest id.
pub type EventStates = BTreeMap<String, EventState>;

/// Evaluate every event definition against the journal.
///
/// Returns `Cow::Borrowed(previous)` when nothing changed, which callers
/// can use for cheap identity-style memoization.
pub fn evaluate_event_states<'a>(
    definitions: &[&EventQuest],
    previous: &'a EventStates,
    manual_logs: &ManualLogs,
    applications: &[ApplicationRecord],
    now: DateTime<Utc>,
) -> Cow<'a, EventStates> {
    let mut next: EventStates = previous.clone();
    let mut changed = false;

    // Definition order is evaluation order; chained events see the states
    // already settled earlier in this same pass.
    for def in definitions {
        let prev = next
            .get(def.core.id.as_str())
            .cloned()
            .unwrap_or_else(|| EventState::inactive(def.core.id.clone()));
        let state = step(def, prev, manual_logs, applications, &next, now);
        let slot = next
            .entry(def.core.id.clone())
            .or_insert_with(|| EventState::inactive(def.core.id.clone()));
        if *slot != state {
            *slot = state;
            changed = true;
        }
    }

    if changed {
        Cow::Owned(next)
    } else {
        Cow::Borrowed(previous)
    }
}

/// Record that an event quest's goal was met at `at`. Chained events key
/// off this; the claim path calls it when an event reward is claimed.
pub fn mark_completed(states: &mut EventStates, event_id: &str, at: DateTime<Utc>) {
    if let Some(state) = states.get_mut(event_id) {
        state.completed_at = Some(at);
    }
}

/// Purge claims invalidated by reactivations between two state snapshots.
///
/// A reactivation is a changed `triggered_at` on an id that had already
/// triggered before. Claims granted under the old trigger (and the bare
/// pre-migration ids) are removed so the fresh window is claimable again.
/// Returns every key that was removed.
pub fn cleanup_reactivations(
    definitions: &[&EventQuest],
    previous: &EventStates,
    next: &EventStates,
    claimed: &mut crate::claim::ClaimedSet,
) -> Vec<String> {
    let mut removed = Vec::new();
    for def in definitions {
        let id = def.core.id.as_str();
        let Some(old_trigger) = previous.get(id).and_then(|state| state.triggered_at) else {
            continue; // first activation, nothing to invalidate
        };
        let Some(new_trigger) = next.get(id).and_then(|state| state.triggered_at) else {
            continue;
        };
        if new_trigger == old_trigger {
            continue;
        }
        let stage_ids: Vec<String> = def.stages.iter().map(|stage| stage.id.clone()).collect();
        removed.extend(crate::claim::purge_stale_claims(
            claimed,
            id,
            &stage_ids,
            old_trigger,
        ));
    }
    removed
}

fn step(
    def: &EventQuest,
    mut state: EventState,
    manual_logs: &ManualLogs,
    applications: &[ApplicationRecord],
    all_states: &EventStates,
    now: DateTime<Utc>,
) -> EventState {
    if state.active {
        match state.expires_at {
            Some(expires) if now >= expires => {
                // Window over. History stays; the cooldown clock runs from
                // the trigger, not from expiry.
                state.active = false;
                if let (Some(last), Some(hours)) = (state.last_trigger_at, def.cooldown_hours) {
                    state.cooldown_until = Some(last + Duration::hours(hours));
                }
                state
            }
            // An active event is not re-evaluated for triggering.
            _ => state,
        }
    } else {
        let min_time = earliest_allowed(&state);
        let Some(triggered) = earliest_trigger(
            &def.trigger,
            manual_logs,
            applications,
            all_states,
            min_time,
        ) else {
            return state;
        };
        if triggered > now {
            return state;
        }

        state.active = true;
        state.triggered_at = Some(triggered);
        state.last_trigger_at = Some(triggered);
        state.expires_at = def.duration_hours.map(|hours| triggered + Duration::hours(hours));
        state.cooldown_until = def.cooldown_hours.map(|hours| triggered + Duration::hours(hours));
        state.completed_at = None;
        state
    }
}

/// A new trigger must be strictly later than the previous one and past any
/// cooldown.
fn earliest_allowed(state: &EventState) -> Option<DateTime<Utc>> {
    let after_last = state
        .last_trigger_at
        .map(|last| last + Duration::milliseconds(1));
    match (state.cooldown_until, after_last) {
        (Some(cooldown), Some(last)) => Some(cooldown.max(last)),
        (Some(cooldown), None) => Some(cooldown),
        (None, last) => last,
    }
}

fn earliest_trigger(
    trigger: &Trigger,
    manual_logs: &ManualLogs,
    applications: &[ApplicationRecord],
    all_states: &EventStates,
    min_time: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    match trigger {
        Trigger::DailyStatusCount { status, threshold } => {
            daily_nth(&status_timestamps(manual_logs, status), *threshold, min_time)
        }
        Trigger::LifetimeManualCount { stream, threshold } => {
            let mut times: Vec<DateTime<Utc>> = manual_logs
                .get(stream)
                .map(|entries| entries.iter().filter_map(|e| e.timestamp()).collect())
                .unwrap_or_default();
            times.sort_unstable();
            lifetime_nth(&times, *threshold, min_time)
        }
        Trigger::LifetimeStatusCount { status, threshold } => {
            lifetime_nth(&status_timestamps(manual_logs, status), *threshold, min_time)
        }
        Trigger::Momentum { gap_hours, run_days } => momentum_trigger(
            manual_logs,
            applications,
            *gap_hours,
            *run_days,
            min_time,
        ),
        Trigger::AfterEvent { event_id } => {
            let completed = all_states.get(event_id.as_str())?.completed_at?;
            match min_time {
                Some(min) if completed < min => None,
                _ => Some(completed),
            }
        }
    }
}

/// Sorted timestamps of status-change entries landing on `status`.
fn status_timestamps(manual_logs: &ManualLogs, status: &str) -> Vec<DateTime<Utc>> {
    let mut times: Vec<DateTime<Utc>> = manual_logs
        .get(STREAM_STATUS_CHANGE)
        .map(|entries| {
            entries
                .iter()
                .filter(|entry| {
                    entry
                        .new_status()
                        .is_some_and(|s| s.trim().eq_ignore_ascii_case(status))
                })
                .filter_map(|entry| entry.timestamp())
                .collect()
        })
        .unwrap_or_default();
    times.sort_unstable();
    times
}

/// Earliest instant at which the running count reaches `threshold`, at or
/// after `min_time`. Once the count is at threshold, every later entry
/// also qualifies, which is what lets a cooled-down event re-arm.
fn lifetime_nth(
    sorted: &[DateTime<Utc>],
    threshold: u32,
    min_time: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    let threshold = threshold.max(1) as usize;
    sorted
        .iter()
        .enumerate()
        .skip(threshold - 1)
        .map(|(_, ts)| *ts)
        .find(|ts| min_time.is_none_or(|min| *ts >= min))
}

/// Same as `lifetime_nth`, but the count resets at each local midnight.
fn daily_nth(
    sorted: &[DateTime<Utc>],
    threshold: u32,
    min_time: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    let threshold = threshold.max(1) as usize;
    let mut current_day: Option<NaiveDate> = None;
    let mut count_today = 0usize;
    for ts in sorted {
        let day = local_date(*ts);
        if current_day != Some(day) {
            current_day = Some(day);
            count_today = 0;
        }
        count_today += 1;
        if count_today >= threshold && min_time.is_none_or(|min| *ts >= min) {
            return Some(*ts);
        }
    }
    None
}

/// A comeback after a hiatus: at least `run_days` consecutive active days,
/// then a gap of `gap_hours` or more, then the first activity of a new day.
fn momentum_trigger(
    manual_logs: &ManualLogs,
    applications: &[ApplicationRecord],
    gap_hours: i64,
    run_days: u32,
    min_time: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    let mut activity: Vec<DateTime<Utc>> = applications
        .iter()
        .filter_map(|app| app.timestamp())
        .collect();
    for entries in manual_logs.values() {
        activity.extend(entries.iter().filter_map(|entry| entry.timestamp()));
    }
    activity.sort_unstable();
    if activity.len() < 2 {
        return None;
    }

    let gap = Duration::hours(gap_hours.max(1));
    for i in 1..activity.len() {
        let comeback = activity[i];
        let last_before = activity[i - 1];
        if comeback - last_before < gap {
            continue;
        }
        if local_date(comeback) == local_date(last_before) {
            continue;
        }
        if !ends_streak(&activity[..i], local_date(last_before), run_days) {
            continue;
        }
        if min_time.is_none_or(|min| comeback >= min) {
            return Some(comeback);
        }
    }
    None
}

/// Whether the activity before the gap covered `run_days` consecutive
/// local days ending on `last_day`.
fn ends_streak(activity: &[DateTime<Utc>], last_day: NaiveDate, run_days: u32) -> bool {
    let run_days = run_days.max(1) as i64;
    let mut needed: Vec<NaiveDate> = (0..run_days)
        .map(|back| last_day - Duration::days(back))
        .collect();
    for ts in activity.iter().rev() {
        let day = local_date(*ts);
        let Some(oldest) = needed.last().copied() else {
            break;
        };
        if day < oldest {
            break;
        }
        needed.retain(|d| *d != day);
        if needed.is_empty() {
            return true;
        }
    }
    false
}
