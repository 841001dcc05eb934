//! Claim key composition and reactivation cleanup.
//!
//! Every claimable unit (quest, tier, step) is identified by a claim key.
//! Keys for event-bound quests are scoped to one activation instance by
//! embedding the trigger timestamp, so a reactivated event starts with a
//! clean slate instead of appearing permanently claimed. All composing and
//! parsing goes through this module; nothing else builds key strings.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};

/// Separator between id and trigger timestamp in a scoped key.
const SCOPE_SEPARATOR: &str = "::";

/// The set of claimed keys, persisted by the caller as a flat string array.
pub type ClaimedSet = BTreeSet<String>;

/// Identity under which a quest or stage reward is claimed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ClaimKey {
    /// A quest or stage that exists permanently.
    Plain(String),
    /// A unit scoped to one event activation, keyed by trigger millis.
    Scoped { id: String, triggered_at: i64 },
}

impl ClaimKey {
    /// Compose the key for a unit, scoping it when an event trigger exists.
    pub fn compose(id: &str, event_trigger: Option<DateTime<Utc>>) -> Self {
        match event_trigger {
            Some(ts) => ClaimKey::Scoped {
                id: id.to_string(),
                triggered_at: ts.timestamp_millis(),
            },
            None => ClaimKey::Plain(id.to_string()),
        }
    }

    /// Parse a persisted key string. Anything without a trailing numeric
    /// scope is a plain key; corrupt scoped keys degrade to plain keys,
    /// which makes them inert rather than harmful.
    pub fn parse(raw: &str) -> Self {
        if let Some((id, scope)) = raw.rsplit_once(SCOPE_SEPARATOR) {
            if !id.is_empty() && !scope.is_empty() && scope.chars().all(|c| c.is_ascii_digit()) {
                if let Ok(triggered_at) = scope.parse::<i64>() {
                    return ClaimKey::Scoped {
                        id: id.to_string(),
                        triggered_at,
                    };
                }
            }
        }
        ClaimKey::Plain(raw.to_string())
    }

    pub fn id(&self) -> &str {
        match self {
            ClaimKey::Plain(id) => id,
            ClaimKey::Scoped { id, .. } => id,
        }
    }
}

impl fmt::Display for ClaimKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimKey::Plain(id) => f.write_str(id),
            ClaimKey::Scoped { id, triggered_at } => {
                write!(f, "{id}{SCOPE_SEPARATOR}{triggered_at}")
            }
        }
    }
}

/// Remove every claim granted under a previous activation of an event.
///
/// Drops the scoped keys for the event id and all of its stage ids under
/// `old_trigger`, plus the bare ids written before keys were scoped.
/// Without this, a reactivated event quest would stay claimed forever.
/// Returns the removed keys.
pub fn purge_stale_claims(
    claimed: &mut ClaimedSet,
    event_id: &str,
    stage_ids: &[String],
    old_trigger: DateTime<Utc>,
) -> Vec<String> {
    let mut doomed: Vec<String> = Vec::with_capacity(2 * (stage_ids.len() + 1));
    doomed.push(ClaimKey::compose(event_id, Some(old_trigger)).to_string());
    doomed.push(event_id.to_string());
    for stage_id in stage_ids {
        doomed.push(ClaimKey::compose(stage_id, Some(old_trigger)).to_string());
        doomed.push(stage_id.clone());
    }

    let mut removed = Vec::new();
    for key in doomed {
        if claimed.remove(&key) {
            removed.push(key);
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn compose_and_parse_round_trip() {
        let ts = Utc.timestamp_millis_opt(1741775400000).single().unwrap();
        let key = ClaimKey::compose("ev-streak", Some(ts));
        assert_eq!(key.to_string(), "ev-streak::1741775400000");
        assert_eq!(ClaimKey::parse("ev-streak::1741775400000"), key);

        let plain = ClaimKey::compose("q-apps", None);
        assert_eq!(plain.to_string(), "q-apps");
        assert_eq!(ClaimKey::parse("q-apps"), plain);
    }

    #[test]
    fn corrupt_scope_degrades_to_plain() {
        let key = ClaimKey::parse("ev::not-millis");
        assert_eq!(key, ClaimKey::Plain("ev::not-millis".to_string()));
    }

    #[test]
    fn purge_clears_old_activation_only() {
        let old = Utc.timestamp_millis_opt(100).single().unwrap();
        let new = Utc.timestamp_millis_opt(200).single().unwrap();
        let mut claimed: ClaimedSet = [
            "ev::100",
            "ev-stage-1::100",
            "ev",
            "ev::200",
            "other::100",
        ]
        .iter()
        .map(|key| key.to_string())
        .collect();

        let removed = purge_stale_claims(
            &mut claimed,
            "ev",
            &["ev-stage-1".to_string()],
            old,
        );

        assert_eq!(removed.len(), 3);
        assert!(!claimed.contains("ev::100"));
        assert!(!claimed.contains("ev-stage-1::100"));
        assert!(!claimed.contains("ev"));
        // The fresh activation and unrelated quests are untouched.
        assert!(claimed.contains(&ClaimKey::compose("ev", Some(new)).to_string()));
        assert!(claimed.contains("other::100"));
    }
}
