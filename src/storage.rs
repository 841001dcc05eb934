//! Storage layer for questlog
//!
//! Persists the journal and engine state in a single data directory:
//!
//! ```text
//! <data dir>/
//!   .questlog.toml       # policy + journal config (optional)
//!   catalog.json         # quest catalog override (optional)
//!   applications.jsonl   # append-only application log
//!   manual.jsonl         # append-only manual entries, tagged with stream
//!   event_states.json    # event-quest lifecycle states
//!   claimed.json         # flat array of claim-key strings
//!   store.lock           # cross-process write lock
//! ```
//!
//! The engine itself never touches disk; this module is the single writer
//! of event states and the claimed set, and the home of the claim action.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{Catalog, Reward};
use crate::claim::ClaimedSet;
use crate::config::{Config, CONFIG_FILE};
use crate::error::{Error, Result};
use crate::events::{
    cleanup_reactivations, evaluate_event_states, mark_completed, EventStates,
};
use crate::journal::{ApplicationRecord, ManualEntry, ManualLogs, STREAM_STATUS_CHANGE};
use crate::lock::{atomic_write, FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::metrics::{compute_metrics, MetricsSnapshot};
use crate::progress::{compute_event_progress, EventProgressMap};
use crate::tabs::{build_quest_tabs, event_quests, ResolvedEntry, TabSet};

const APPLICATIONS_LOG: &str = "applications.jsonl";
const MANUAL_LOG: &str = "manual.jsonl";
const EVENT_STATES_FILE: &str = "event_states.json";
const CLAIMED_FILE: &str = "claimed.json";
const CATALOG_FILE: &str = "catalog.json";
const LOCK_FILE: &str = "store.lock";

/// One line of `manual.jsonl`: an entry tagged with its stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ManualRecord {
    stream: String,
    #[serde(flatten)]
    entry: ManualEntry,
}

/// Store manager for a questlog data directory.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
    config: Config,
}

/// Everything the engine resolved in one pass.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub metrics: MetricsSnapshot,
    pub event_states: EventStates,
    pub event_progress: EventProgressMap,
    pub tabs: TabSet,
    /// Claim keys purged because their event reactivated.
    pub purged_claims: Vec<String>,
}

/// Outcome of a successful claim.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimOutcome {
    pub key: String,
    pub quest_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<Reward>,
}

impl Store {
    /// Open an initialized store.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.join(APPLICATIONS_LOG).exists() {
            return Err(Error::StoreNotFound(root));
        }
        let config = Config::load_from_dir(&root);
        Ok(Self { root, config })
    }

    /// Initialize a store directory, creating empty logs and a default
    /// config. Idempotent: existing files are left alone.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let config_path = root.join(CONFIG_FILE);
        if !config_path.exists() {
            atomic_write(&config_path, Config::default().to_toml()?.as_bytes())?;
        }
        for log in [APPLICATIONS_LOG, MANUAL_LOG] {
            let path = root.join(log);
            if !path.exists() {
                File::create(&path)?;
            }
        }
        let states_path = root.join(EVENT_STATES_FILE);
        if !states_path.exists() {
            atomic_write(&states_path, b"{}")?;
        }
        let claimed_path = root.join(CLAIMED_FILE);
        if !claimed_path.exists() {
            atomic_write(&claimed_path, b"[]")?;
        }

        debug!(root = %root.display(), "initialized store");
        let config = Config::load_from_dir(&root);
        Ok(Self { root, config })
    }

    /// Resolve the default data directory (`--dir`, else the platform
    /// data dir for questlog).
    pub fn default_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(dir) = explicit {
            return Ok(dir);
        }
        directories::ProjectDirs::from("", "", "questlog")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| Error::OperationFailed("no home directory available".to_string()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Journal
    // =========================================================================

    pub fn read_applications(&self) -> Result<Vec<ApplicationRecord>> {
        self.read_jsonl(&self.root.join(APPLICATIONS_LOG))
    }

    pub fn append_application(&self, record: &ApplicationRecord) -> Result<()> {
        let _lock = self.lock()?;
        self.append_jsonl(&self.root.join(APPLICATIONS_LOG), record)
    }

    /// Update an application's status and record the transition on the
    /// `statusChange` stream, which is what status-based triggers read.
    pub fn update_application_status(
        &self,
        application_id: &str,
        to: &str,
        now: DateTime<Utc>,
    ) -> Result<ApplicationRecord> {
        let _lock = self.lock()?;

        let mut applications = self.read_applications()?;
        let record = applications
            .iter_mut()
            .find(|app| app.id == application_id)
            .ok_or_else(|| {
                Error::InvalidArgument(format!("no application with id {application_id}"))
            })?;
        let from = std::mem::replace(&mut record.status, to.to_string());
        let updated = record.clone();

        let mut contents = String::new();
        for app in &applications {
            contents.push_str(&serde_json::to_string(app)?);
            contents.push('\n');
        }
        atomic_write(&self.root.join(APPLICATIONS_LOG), contents.as_bytes())?;

        let entry = ManualEntry {
            application_id: Some(application_id.to_string()),
            from: Some(from),
            to: Some(to.to_string()),
            ..ManualEntry::at(now)
        };
        let record = ManualRecord {
            stream: STREAM_STATUS_CHANGE.to_string(),
            entry,
        };
        self.append_jsonl(&self.root.join(MANUAL_LOG), &record)?;
        Ok(updated)
    }

    pub fn read_manual_logs(&self) -> Result<ManualLogs> {
        let records: Vec<ManualRecord> = self.read_jsonl(&self.root.join(MANUAL_LOG))?;
        let mut logs = ManualLogs::new();
        for record in records {
            logs.entry(record.stream).or_default().push(record.entry);
        }
        Ok(logs)
    }

    pub fn append_manual(&self, stream: &str, entry: ManualEntry) -> Result<()> {
        let _lock = self.lock()?;
        let record = ManualRecord {
            stream: stream.to_string(),
            entry,
        };
        self.append_jsonl(&self.root.join(MANUAL_LOG), &record)
    }

    // =========================================================================
    // Engine state
    // =========================================================================

    pub fn read_event_states(&self) -> Result<EventStates> {
        self.read_json_or(&self.root.join(EVENT_STATES_FILE), EventStates::new)
    }

    pub fn write_event_states(&self, states: &EventStates) -> Result<()> {
        atomic_write(
            &self.root.join(EVENT_STATES_FILE),
            serde_json::to_string_pretty(states)?.as_bytes(),
        )
    }

    /// Claimed keys, deduplicated on load via the set representation.
    pub fn read_claimed(&self) -> Result<ClaimedSet> {
        let keys: Vec<String> = self.read_json_or(&self.root.join(CLAIMED_FILE), Vec::new)?;
        Ok(keys.into_iter().collect())
    }

    pub fn write_claimed(&self, claimed: &ClaimedSet) -> Result<()> {
        let keys: Vec<&String> = claimed.iter().collect();
        atomic_write(
            &self.root.join(CLAIMED_FILE),
            serde_json::to_string_pretty(&keys)?.as_bytes(),
        )
    }

    /// The quest catalog: `catalog.json` when present, else the built-in.
    pub fn load_catalog(&self) -> Result<Catalog> {
        let path = self.root.join(CATALOG_FILE);
        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            return Ok(serde_json::from_str(&contents)?);
        }
        Ok(default_catalog())
    }

    // =========================================================================
    // Engine driving
    // =========================================================================

    /// Run the full engine pass and persist the state it owns: refreshed
    /// event states and any claims purged by reactivation.
    pub fn refresh(&self, now: DateTime<Utc>) -> Result<Resolution> {
        let _lock = self.lock()?;
        self.refresh_locked(now)
    }

    /// Engine pass body; the caller must already hold the store lock.
    fn refresh_locked(&self, now: DateTime<Utc>) -> Result<Resolution> {
        let applications = self.read_applications()?;
        let manual_logs = self.read_manual_logs()?;
        let catalog = self.load_catalog()?;
        let previous_states = self.read_event_states()?;
        let mut claimed = self.read_claimed()?;

        let definitions = event_quests(&catalog);
        let next_states = evaluate_event_states(
            &definitions,
            &previous_states,
            &manual_logs,
            &applications,
            now,
        );
        let purged_claims =
            cleanup_reactivations(&definitions, &previous_states, &next_states, &mut claimed);
        let states_changed = matches!(next_states, std::borrow::Cow::Owned(_));
        let event_states = next_states.into_owned();

        if states_changed {
            self.write_event_states(&event_states)?;
        }
        if !purged_claims.is_empty() {
            debug!(count = purged_claims.len(), "purged stale claims");
            self.write_claimed(&claimed)?;
        }

        let metrics = compute_metrics(&applications, &manual_logs, now, &self.config);
        let event_progress = compute_event_progress(
            &event_states,
            &applications,
            &manual_logs,
            now,
            &self.config.policy,
        );
        let tabs = build_quest_tabs(
            &catalog,
            &metrics,
            &claimed,
            &event_states,
            &event_progress,
            &self.config.policy,
        );

        Ok(Resolution {
            metrics,
            event_states,
            event_progress,
            tabs,
            purged_claims,
        })
    }

    /// Claim a reward by claim key or quest id.
    ///
    /// Verifies claimability against a fresh engine pass, records the key,
    /// and marks event quests completed so chained events can trigger.
    pub fn claim(&self, target: &str, now: DateTime<Utc>) -> Result<ClaimOutcome> {
        // One lock spans the verifying pass and the claimed-set write, so a
        // concurrent claim or reactivation purge cannot land in between.
        let _lock = self.lock()?;
        let resolution = self.refresh_locked(now)?;

        let quest = resolution
            .tabs
            .tabs
            .values()
            .flat_map(|tab| tab.entries.iter())
            .find_map(|entry| match entry {
                ResolvedEntry::Quest(quest)
                    if quest.claim_key.as_deref() == Some(target) || quest.id == target =>
                {
                    Some(quest)
                }
                _ => None,
            })
            .ok_or_else(|| Error::UnknownClaimKey(target.to_string()))?;

        let key = quest
            .claim_key
            .clone()
            .ok_or_else(|| Error::NotClaimable {
                key: target.to_string(),
                reason: "nothing left to claim".to_string(),
            })?;
        if !quest.claimable {
            let reason = if quest.claimed {
                "already claimed"
            } else if quest.locked {
                "locked by prerequisites"
            } else {
                "goal not reached"
            };
            return Err(Error::NotClaimable {
                key,
                reason: reason.to_string(),
            });
        }

        let mut claimed = self.read_claimed()?;
        claimed.insert(key.clone());
        self.write_claimed(&claimed)?;

        // Event quests record completion when their reward lands, which is
        // what chained events trigger off.
        let mut states = resolution.event_states.clone();
        if states.contains_key(quest.id.as_str()) && quest.is_final {
            mark_completed(&mut states, &quest.id, now);
            self.write_event_states(&states)?;
        }

        debug!(key = %key, quest = %quest.id, "claimed reward");
        Ok(ClaimOutcome {
            key,
            quest_id: quest.id.clone(),
            reward: quest.claim_reward.clone(),
        })
    }

    // =========================================================================
    // File helpers
    // =========================================================================

    fn lock(&self) -> Result<FileLock> {
        FileLock::acquire(self.root.join(LOCK_FILE), DEFAULT_LOCK_TIMEOUT_MS)
    }

    fn read_jsonl<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut out = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            // Lenient on malformed history: skip bad lines, keep reading.
            match serde_json::from_str(trimmed) {
                Ok(value) => out.push(value),
                Err(err) => debug!(path = %path.display(), %err, "skipping bad journal line"),
            }
        }
        Ok(out)
    }

    fn append_jsonl<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut line = serde_json::to_string(value)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    fn read_json_or<T: DeserializeOwned>(&self, path: &Path, empty: impl Fn() -> T) -> Result<T> {
        if !path.exists() {
            return Ok(empty());
        }
        let contents = fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(empty());
        }
        Ok(serde_json::from_str(&contents)?)
    }
}

/// Built-in catalog used when the data directory has no `catalog.json`.
/// Content is deliberately small; real deployments ship their own.
pub fn default_catalog() -> Catalog {
    use crate::catalog::*;

    let mut catalog = BTreeMap::new();

    catalog.insert(
        "Daily".to_string(),
        vec![
            QuestDef::Summary {
                id: "daily-summary".to_string(),
                title: "Today".to_string(),
            },
            QuestDef::Simple(SimpleQuest {
                core: QuestCore::new("daily-apps", "Send 20 applications")
                    .with_reward(Reward::new(20, 10)),
                tracking: Tracking::metric(TrackScope::Daily, Metric::Applications, 20),
            }),
            QuestDef::Simple(SimpleQuest {
                core: QuestCore::new("daily-full", "Send 5 full applications")
                    .with_reward(Reward::new(15, 10)),
                tracking: Tracking::metric(TrackScope::Daily, Metric::FullApplications, 5),
            }),
            QuestDef::Simple(SimpleQuest {
                core: QuestCore::new("daily-outreach", "Make 2 cold outreach pings")
                    .with_reward(Reward::new(10, 5)),
                tracking: Tracking::manual(TrackScope::Daily, "coldOutreach", 2),
            }),
        ],
    );

    let mut weekly = vec![QuestDef::Section {
        id: "weekly-section".to_string(),
        title: "This week".to_string(),
    }];
    let core_quests: [(&str, &str, Metric, u32); 3] = [
        ("weekly-apps", "Send 80 applications", Metric::Applications, 80),
        ("weekly-full", "Send 25 full applications", Metric::FullApplications, 25),
        ("weekly-combo", "Send 5 combo applications", Metric::ComboApplications, 5),
    ];
    for (id, title, metric, goal) in core_quests {
        weekly.push(QuestDef::Simple(SimpleQuest {
            core: QuestCore::new(id, title)
                .with_category(CATEGORY_WEEKLY_CORE)
                .with_reward(Reward::new(25, 15)),
            tracking: Tracking::metric(TrackScope::Weekly, metric, goal),
        }));
    }
    let cyclables: [(&str, &str, Metric, u32); 5] = [
        ("cyc-platforms", "Apply on 3 platforms", Metric::Platforms, 3),
        ("cyc-tailored", "Tailor 10 CVs", Metric::TailoredCvs, 10),
        ("cyc-letters", "Write 10 letters", Metric::Letters, 10),
        ("cyc-referral", "Land 2 referral applications", Metric::ReferralApplications, 2),
        ("cyc-cities", "Apply in 3 cities", Metric::Cities, 3),
    ];
    for (id, title, metric, goal) in cyclables {
        weekly.push(QuestDef::Simple(SimpleQuest {
            core: QuestCore::new(id, title)
                .with_category(CATEGORY_WEEKLY_CYCLABLE)
                .with_reward(Reward::new(15, 10)),
            tracking: Tracking::metric(TrackScope::Weekly, metric, goal),
        }));
    }
    catalog.insert(WEEKLY_TAB.to_string(), weekly);

    catalog.insert(
        "Career".to_string(),
        vec![
            QuestDef::Tiered(TieredQuest {
                core: QuestCore::new("career-volume", "Application milestones"),
                tiers: [10u32, 50, 100, 250]
                    .iter()
                    .enumerate()
                    .map(|(i, goal)| Stage {
                        id: format!("career-volume-t{}", i + 1),
                        title: format!("Send {goal} applications"),
                        tracking: Tracking::metric(
                            TrackScope::Lifetime,
                            Metric::Applications,
                            *goal,
                        ),
                        reward: Some(Reward::new(25 * (i as u32 + 1), 20)),
                    })
                    .collect(),
            }),
            QuestDef::Simple(SimpleQuest {
                core: QuestCore::new("career-interview", "Reach a first interview")
                    .with_reward(Reward::new(100, 50)),
                tracking: Tracking::metric(TrackScope::Lifetime, Metric::Interviews, 1),
            }),
            QuestDef::Simple(SimpleQuest {
                core: QuestCore::new("career-perfect", "Complete a perfect day")
                    .with_reward(Reward::new(50, 30)),
                tracking: Tracking::metric(TrackScope::Lifetime, Metric::PerfectDays, 1),
            }),
            QuestDef::Simple(SimpleQuest {
                core: QuestCore::new("career-ready", "Prove the routine sticks"),
                tracking: Tracking::requires(&["career-interview", "career-perfect"]),
            }),
        ],
    );

    catalog.insert(
        "Events".to_string(),
        vec![
            QuestDef::Event(EventQuest {
                core: QuestCore::new("ev-bounce-back", "Bounce back")
                    .with_reward(Reward::new(40, 25)),
                trigger: Trigger::DailyStatusCount {
                    status: "Rejected".to_string(),
                    threshold: 2,
                },
                duration_hours: Some(24),
                cooldown_hours: Some(72),
                tracking: Some(Tracking::metric(TrackScope::Event, Metric::Applications, 5)),
                stages: Vec::new(),
            }),
            QuestDef::Event(EventQuest {
                core: QuestCore::new("ev-momentum", "Back in the saddle")
                    .with_reward(Reward::new(30, 20)),
                trigger: Trigger::Momentum {
                    gap_hours: 48,
                    run_days: 3,
                },
                duration_hours: Some(24),
                cooldown_hours: Some(168),
                tracking: Some(Tracking::metric(TrackScope::Event, Metric::Applications, 3)),
                stages: Vec::new(),
            }),
        ],
    );

    catalog
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::ApplicationKind;

    #[test]
    fn init_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::init(dir.path()).expect("init");
        store
            .append_application(&ApplicationRecord::new(
                ApplicationKind::Full,
                "board",
                Utc::now(),
            ))
            .expect("append");

        let store = Store::init(dir.path()).expect("re-init");
        assert_eq!(store.read_applications().expect("read").len(), 1);
    }

    #[test]
    fn claimed_set_dedupes_on_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::init(dir.path()).expect("init");
        fs::write(
            dir.path().join(CLAIMED_FILE),
            r#"["a", "b", "a"]"#,
        )
        .expect("write");
        let claimed = store.read_claimed().expect("read");
        assert_eq!(claimed.len(), 2);
    }

    #[test]
    fn bad_journal_lines_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::init(dir.path()).expect("init");
        store
            .append_application(&ApplicationRecord::new(
                ApplicationKind::Easy,
                "board",
                Utc::now(),
            ))
            .expect("append");
        let mut file = OpenOptions::new()
            .append(true)
            .open(dir.path().join(APPLICATIONS_LOG))
            .expect("open");
        writeln!(file, "{{ not json").expect("write");

        assert_eq!(store.read_applications().expect("read").len(), 1);
    }

    #[test]
    fn claim_verifies_records_and_rejects_repeats_in_one_call() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::init(dir.path()).expect("init");
        fs::write(
            dir.path().join(CATALOG_FILE),
            r#"{"Daily": [{
                "type": "simple",
                "id": "one-app",
                "title": "One application",
                "reward": {"gold": 5, "xp": 5},
                "tracking": {"scope": "daily", "metric": "applications", "goal": 1}
            }]}"#,
        )
        .expect("write catalog");

        let now = Utc::now();
        store
            .append_application(&ApplicationRecord::new(ApplicationKind::Easy, "board", now))
            .expect("append");

        let outcome = store.claim("one-app", now).expect("claim");
        assert_eq!(outcome.key, "one-app");
        assert!(store.read_claimed().expect("read").contains("one-app"));

        match store.claim("one-app", now) {
            Err(Error::NotClaimable { reason, .. }) => {
                assert_eq!(reason, "already claimed");
            }
            other => panic!("expected NotClaimable, got {other:?}"),
        }
    }

    #[test]
    fn default_catalog_orders_dependencies_first() {
        let catalog = default_catalog();
        let career = &catalog["Career"];
        let position = |id: &str| {
            career
                .iter()
                .position(|def| def.id() == id)
                .expect("quest present")
        };
        assert!(position("career-interview") < position("career-ready"));
        assert!(position("career-perfect") < position("career-ready"));
    }
}
