//! Quest catalog definitions.
//!
//! The catalog is static content supplied from outside the engine: a map of
//! tab name to ordered quest definitions. Quest kinds are an explicit tagged
//! union so the tab builder can match exhaustively instead of sniffing for
//! ad hoc marker fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Category label for the always-on weekly quests.
pub const CATEGORY_WEEKLY_CORE: &str = "Weekly core quest";
/// Category label for the rotating weekly pool.
pub const CATEGORY_WEEKLY_CYCLABLE: &str = "Weekly cyclable quest";
/// Tab whose sections and cyclable quests get special handling.
pub const WEEKLY_TAB: &str = "Weekly";

/// A catalog: tab name -> ordered quest definitions. Dependencies must
/// appear before their dependents within a tab.
pub type Catalog = BTreeMap<String, Vec<QuestDef>>;

/// One catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestDef {
    /// Display-only aggregate card (reward totals, completion counts).
    Summary { id: String, title: String },
    /// Display-only free text.
    Note {
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        text: String,
    },
    /// Display-only divider.
    Section { id: String, title: String },
    /// A quest with a single tracked goal.
    Simple(SimpleQuest),
    /// A quest with ordered tiers, claimed one at a time.
    Tiered(TieredQuest),
    /// A quest with ordered steps, claimed one at a time.
    Stepped(SteppedQuest),
    /// A time-boxed quest that only exists while its trigger window is open.
    Event(EventQuest),
}

impl QuestDef {
    pub fn id(&self) -> &str {
        match self {
            QuestDef::Summary { id, .. }
            | QuestDef::Note { id, .. }
            | QuestDef::Section { id, .. } => id,
            QuestDef::Simple(quest) => &quest.core.id,
            QuestDef::Tiered(quest) => &quest.core.id,
            QuestDef::Stepped(quest) => &quest.core.id,
            QuestDef::Event(quest) => &quest.core.id,
        }
    }

    pub fn category(&self) -> Option<&str> {
        match self {
            QuestDef::Simple(quest) => quest.core.category.as_deref(),
            QuestDef::Tiered(quest) => quest.core.category.as_deref(),
            QuestDef::Stepped(quest) => quest.core.category.as_deref(),
            QuestDef::Event(quest) => quest.core.category.as_deref(),
            _ => None,
        }
    }

    /// Stage ids of every tier/step, used when purging stale claims.
    pub fn stage_ids(&self) -> Vec<String> {
        let stages = match self {
            QuestDef::Tiered(quest) => &quest.tiers,
            QuestDef::Stepped(quest) => &quest.steps,
            QuestDef::Event(quest) => &quest.stages,
            _ => return Vec::new(),
        };
        stages.iter().map(|stage| stage.id.clone()).collect()
    }
}

/// Fields shared by every trackable quest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestCore {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<Reward>,
}

impl QuestCore {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            category: None,
            reward: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_reward(mut self, reward: Reward) -> Self {
        self.reward = Some(reward);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimpleQuest {
    #[serde(flatten)]
    pub core: QuestCore,
    pub tracking: Tracking,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TieredQuest {
    #[serde(flatten)]
    pub core: QuestCore,
    pub tiers: Vec<Stage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SteppedQuest {
    #[serde(flatten)]
    pub core: QuestCore,
    pub steps: Vec<Stage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventQuest {
    #[serde(flatten)]
    pub core: QuestCore,
    pub trigger: Trigger,
    /// Window length; `None` means the event never auto-expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_hours: Option<i64>,
    /// Re-arm delay after the trigger; `None` means no cooldown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_hours: Option<i64>,
    /// Single-goal event quests track directly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking: Option<Tracking>,
    /// Multi-task event quests carry stages instead.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<Stage>,
}

/// An ordered sub-stage of a quest (tier, step, or event task).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stage {
    pub id: String,
    pub title: String,
    pub tracking: Tracking,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<Reward>,
}

/// What a quest (or stage) measures and how much of it is needed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tracking {
    pub scope: TrackScope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<Metric>,
    /// Manual-stream counter, mutually exclusive with `metric` in practice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<u32>,
    /// Prerequisite quest ids; when present the quest is locked until all
    /// are completed and progress becomes satisfied/total prerequisites.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
}

impl Tracking {
    pub fn metric(scope: TrackScope, metric: Metric, goal: u32) -> Self {
        Self {
            scope,
            metric: Some(metric),
            manual_key: None,
            goal: Some(goal),
            requires: Vec::new(),
        }
    }

    pub fn manual(scope: TrackScope, key: impl Into<String>, goal: u32) -> Self {
        Self {
            scope,
            metric: None,
            manual_key: Some(key.into()),
            goal: Some(goal),
            requires: Vec::new(),
        }
    }

    pub fn requires(ids: &[&str]) -> Self {
        Self {
            scope: TrackScope::Lifetime,
            metric: None,
            manual_key: None,
            goal: None,
            requires: ids.iter().map(|id| id.to_string()).collect(),
        }
    }
}

/// Which metric window a tracked goal reads from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrackScope {
    Daily,
    Weekly,
    Lifetime,
    /// Counters from the quest's own active event window.
    Event,
}

/// Named metric a tracked goal reads.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Applications,
    FullApplications,
    ComboApplications,
    TailoredCvs,
    Letters,
    ReferralApplications,
    Platforms,
    Cities,
    Rejections,
    Ghosted,
    Interviews,
    Favorites,
    PerfectDays,
    PerfectWeeks,
    /// Event scope only: applications at or above the quality floor.
    QualityApplications,
    /// Event scope only: applications within the burst window.
    BurstApplications,
}

/// What opens an event quest's window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    /// Nth occurrence of a status within one local calendar day.
    DailyStatusCount { status: String, threshold: u32 },
    /// Nth entry ever in a manual stream.
    LifetimeManualCount { stream: String, threshold: u32 },
    /// Nth application ever carrying a status.
    LifetimeStatusCount { status: String, threshold: u32 },
    /// A return after a gap: at least `gap_hours` of silence following
    /// `run_days` consecutive active days, then the next day's first entry.
    Momentum {
        #[serde(default = "default_gap_hours")]
        gap_hours: i64,
        #[serde(default = "default_run_days")]
        run_days: u32,
    },
    /// Chains off another event's completion.
    AfterEvent { event_id: String },
}

fn default_gap_hours() -> i64 {
    48
}

fn default_run_days() -> u32 {
    3
}

/// Reward attached to a quest or stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Reward {
    #[serde(default)]
    pub gold: u32,
    #[serde(default)]
    pub xp: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cleanse: bool,
}

impl Reward {
    pub fn new(gold: u32, xp: u32) -> Self {
        Self {
            gold,
            xp,
            effect: None,
            cleanse: false,
        }
    }
}
