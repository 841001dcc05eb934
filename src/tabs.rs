//! Quest tab resolution.
//!
//! The top-level fold of the engine: combines the static catalog, a metrics
//! snapshot, event states and progress, and the claimed set into a fully
//! resolved, render-ready tab structure. Everything here is pure; claiming
//! itself happens in the storage layer.
//!
//! Ordering rules the catalog must honor:
//! - prerequisite quests (`requires`) appear before their dependents in a
//!   tab, because the builder resolves top to bottom with a running status
//!   map and never looks ahead;
//! - chained event definitions follow the events they chain from.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::catalog::{
    Catalog, EventQuest, Metric, QuestDef, Reward, Stage, TrackScope, Tracking,
    CATEGORY_WEEKLY_CORE, CATEGORY_WEEKLY_CYCLABLE, WEEKLY_TAB,
};
use crate::claim::{ClaimKey, ClaimedSet};
use crate::config::Policy;
use crate::events::EventStates;
use crate::metrics::{MetricScope, MetricsSnapshot, ScopeMetrics};
use crate::progress::{EventProgress, EventProgressMap};
use crate::rotation::weekly_rotation;

/// A resolved catalog entry, ready to render.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolvedEntry {
    Summary { id: String, title: String },
    Note {
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        text: String,
    },
    Section { id: String, title: String },
    Quest(ResolvedQuest),
}

/// A trackable quest with all progress and claim state computed.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResolvedQuest {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub trackable: bool,
    pub progress: u32,
    pub goal: u32,
    pub percent: u8,
    pub completed: bool,
    pub locked: bool,
    pub claimed: bool,
    pub claimable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_key: Option<String>,
    /// Reward granted by claiming now (the active stage's, or the quest's).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_reward: Option<Reward>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_stage_id: Option<String>,
    /// No further unclaimed stage remains after the active one.
    pub is_final: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<ResolvedStage>,
}

/// One resolved tier/step/task.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResolvedStage {
    pub id: String,
    pub title: String,
    pub progress: u32,
    pub goal: u32,
    pub percent: u8,
    pub completed: bool,
    /// `None` for stages claimed wholesale under the quest id before
    /// per-stage tracking existed; such stages earn on completion.
    pub claimed: Option<bool>,
    pub claim_key: String,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<Reward>,
}

impl ResolvedStage {
    /// Earned-for-aggregates rule, including the pre-migration leniency:
    /// explicitly claimed, or completed with unknown claim tracking.
    fn earned(&self) -> bool {
        match self.claimed {
            Some(claimed) => claimed,
            None => self.completed,
        }
    }
}

/// Reward and completion aggregates for one tab.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct TabAggregates {
    pub gold_total: u32,
    pub gold_earned: u32,
    pub xp_total: u32,
    pub xp_earned: u32,
    pub core_total: u32,
    pub core_completed: u32,
    pub cyclable_total: u32,
    pub cyclable_completed: u32,
}

/// One resolved tab.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ResolvedTab {
    pub entries: Vec<ResolvedEntry>,
    pub aggregates: TabAggregates,
}

/// The full resolved catalog plus per-tab unclaimed counts.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TabSet {
    pub tabs: BTreeMap<String, ResolvedTab>,
    /// Count of currently claimable quests per tab, for badge rendering.
    pub unclaimed: BTreeMap<String, usize>,
}

/// All event-quest definitions in catalog order, for state evaluation.
pub fn event_quests(catalog: &Catalog) -> Vec<&EventQuest> {
    catalog
        .values()
        .flatten()
        .filter_map(|def| match def {
            QuestDef::Event(quest) => Some(quest),
            _ => None,
        })
        .collect()
}

/// Resolve the whole catalog. Pure; identical inputs give identical output.
pub fn build_quest_tabs(
    catalog: &Catalog,
    metrics: &MetricsSnapshot,
    claimed: &ClaimedSet,
    event_states: &EventStates,
    event_progress: &EventProgressMap,
    policy: &Policy,
) -> TabSet {
    let mut tabs = BTreeMap::new();
    let mut unclaimed = BTreeMap::new();

    for (tab_name, defs) in catalog {
        let tab = build_tab(
            tab_name,
            defs,
            metrics,
            claimed,
            event_states,
            event_progress,
            policy,
        );
        let claimable = tab
            .entries
            .iter()
            .filter(|entry| matches!(entry, ResolvedEntry::Quest(quest) if quest.claimable))
            .count();
        unclaimed.insert(tab_name.clone(), claimable);
        tabs.insert(tab_name.clone(), tab);
    }

    TabSet { tabs, unclaimed }
}

fn build_tab(
    tab_name: &str,
    defs: &[QuestDef],
    metrics: &MetricsSnapshot,
    claimed: &ClaimedSet,
    event_states: &EventStates,
    event_progress: &EventProgressMap,
    policy: &Policy,
) -> ResolvedTab {
    let is_weekly_tab = tab_name == WEEKLY_TAB;
    let active_cyclables = if is_weekly_tab {
        let pool: Vec<String> = defs
            .iter()
            .filter(|def| def.category() == Some(CATEGORY_WEEKLY_CYCLABLE))
            .map(|def| def.id().to_string())
            .collect();
        weekly_rotation(&metrics.this_week, &pool, policy.rotation_size)
    } else {
        Vec::new()
    };

    let mut tab = ResolvedTab::default();
    // Completion of already-resolved quests, for `requires` lookups.
    // Dependencies must precede dependents; later ids are simply unknown.
    let mut status_map: BTreeMap<String, bool> = BTreeMap::new();

    for def in defs {
        match def {
            QuestDef::Summary { id, title } => {
                tab.entries.push(ResolvedEntry::Summary {
                    id: id.clone(),
                    title: title.clone(),
                });
            }
            QuestDef::Note { id, title, text } => {
                tab.entries.push(ResolvedEntry::Note {
                    id: id.clone(),
                    title: title.clone(),
                    text: text.clone(),
                });
            }
            QuestDef::Section { id, title } => {
                // The weekly tab is bucketed by core/cyclable aggregates
                // instead of sections.
                if !is_weekly_tab {
                    tab.entries.push(ResolvedEntry::Section {
                        id: id.clone(),
                        title: title.clone(),
                    });
                }
            }
            QuestDef::Simple(quest) => {
                let mut resolved = resolve_single(
                    &quest.core.id,
                    &quest.core.title,
                    quest.core.category.clone(),
                    &quest.tracking,
                    quest.core.reward.clone(),
                    None,
                    metrics,
                    claimed,
                    &status_map,
                    None,
                );
                relabel_cyclable(&mut resolved, is_weekly_tab, &active_cyclables);
                if keep_cyclable(&resolved, is_weekly_tab, &active_cyclables, quest.core.category.as_deref()) {
                    finish_quest(&mut tab, &mut status_map, resolved);
                }
            }
            QuestDef::Tiered(quest) => {
                let mut resolved = resolve_staged(
                    &quest.core.id,
                    &quest.core.title,
                    quest.core.category.clone(),
                    &quest.tiers,
                    None,
                    metrics,
                    claimed,
                    &status_map,
                    None,
                );
                relabel_cyclable(&mut resolved, is_weekly_tab, &active_cyclables);
                if keep_cyclable(&resolved, is_weekly_tab, &active_cyclables, quest.core.category.as_deref()) {
                    finish_quest(&mut tab, &mut status_map, resolved);
                }
            }
            QuestDef::Stepped(quest) => {
                let mut resolved = resolve_staged(
                    &quest.core.id,
                    &quest.core.title,
                    quest.core.category.clone(),
                    &quest.steps,
                    None,
                    metrics,
                    claimed,
                    &status_map,
                    None,
                );
                relabel_cyclable(&mut resolved, is_weekly_tab, &active_cyclables);
                if keep_cyclable(&resolved, is_weekly_tab, &active_cyclables, quest.core.category.as_deref()) {
                    finish_quest(&mut tab, &mut status_map, resolved);
                }
            }
            QuestDef::Event(quest) => {
                // Event quests only exist while their window is open.
                let Some(state) = event_states.get(quest.core.id.as_str()) else {
                    continue;
                };
                if !state.active {
                    continue;
                }
                let trigger = state.triggered_at;
                let progress = event_progress.get(quest.core.id.as_str());

                let resolved = if quest.stages.is_empty() {
                    let tracking = quest.tracking.clone().unwrap_or(Tracking {
                        scope: TrackScope::Event,
                        metric: Some(Metric::Applications),
                        manual_key: None,
                        goal: None,
                        requires: Vec::new(),
                    });
                    resolve_single(
                        &quest.core.id,
                        &quest.core.title,
                        quest.core.category.clone(),
                        &tracking,
                        quest.core.reward.clone(),
                        trigger,
                        metrics,
                        claimed,
                        &status_map,
                        progress,
                    )
                } else {
                    resolve_staged(
                        &quest.core.id,
                        &quest.core.title,
                        quest.core.category.clone(),
                        &quest.stages,
                        trigger,
                        metrics,
                        claimed,
                        &status_map,
                        progress,
                    )
                };
                finish_quest(&mut tab, &mut status_map, resolved);
            }
        }
    }

    tab
}

fn relabel_cyclable(quest: &mut ResolvedQuest, is_weekly_tab: bool, active: &[String]) {
    if is_weekly_tab
        && quest.category.as_deref() == Some(CATEGORY_WEEKLY_CYCLABLE)
        && active.iter().any(|id| id == &quest.id)
    {
        // This week's active cyclables count as core for the aggregates.
        quest.category = Some(CATEGORY_WEEKLY_CORE.to_string());
    }
}

fn keep_cyclable(
    quest: &ResolvedQuest,
    is_weekly_tab: bool,
    active: &[String],
    original_category: Option<&str>,
) -> bool {
    if !is_weekly_tab || original_category != Some(CATEGORY_WEEKLY_CYCLABLE) {
        return true;
    }
    active.iter().any(|id| id == &quest.id)
}

fn finish_quest(
    tab: &mut ResolvedTab,
    status_map: &mut BTreeMap<String, bool>,
    quest: ResolvedQuest,
) {
    status_map.insert(quest.id.clone(), quest_satisfied(&quest));
    accumulate(&mut tab.aggregates, &quest);
    tab.entries.push(ResolvedEntry::Quest(quest));
}

/// A quest satisfies a dependency when its tracked goal is fully met: every
/// stage complete for staged quests, the goal reached otherwise.
fn quest_satisfied(quest: &ResolvedQuest) -> bool {
    if quest.stages.is_empty() {
        quest.completed || quest.claimed
    } else {
        quest.stages.iter().all(|stage| stage.completed)
    }
}

#[allow(clippy::too_many_arguments)]
fn resolve_single(
    id: &str,
    title: &str,
    category: Option<String>,
    tracking: &Tracking,
    reward: Option<Reward>,
    event_trigger: Option<chrono::DateTime<chrono::Utc>>,
    metrics: &MetricsSnapshot,
    claimed_set: &ClaimedSet,
    status_map: &BTreeMap<String, bool>,
    event_progress: Option<&EventProgress>,
) -> ResolvedQuest {
    let (progress, goal, locked) =
        resolve_tracking(tracking, metrics, status_map, event_progress);
    let completed = goal > 0 && progress >= goal;
    let claim_key = ClaimKey::compose(id, event_trigger).to_string();
    let claimed = claimed_set.contains(&claim_key);
    let claimable = completed && !claimed && !locked;

    ResolvedQuest {
        id: id.to_string(),
        title: title.to_string(),
        category,
        trackable: true,
        progress,
        goal,
        percent: percent(progress, goal),
        completed,
        locked,
        claimed,
        claimable,
        claim_key: Some(claim_key),
        claim_reward: reward,
        active_stage_id: None,
        is_final: true,
        stages: Vec::new(),
    }
}

#[allow(clippy::too_many_arguments)]
fn resolve_staged(
    id: &str,
    title: &str,
    category: Option<String>,
    stages: &[Stage],
    event_trigger: Option<chrono::DateTime<chrono::Utc>>,
    metrics: &MetricsSnapshot,
    claimed_set: &ClaimedSet,
    status_map: &BTreeMap<String, bool>,
    event_progress: Option<&EventProgress>,
) -> ResolvedQuest {
    // A quest claimed wholesale before per-stage tracking has its bare id
    // in the set; its stages carry unknown claim state.
    let legacy_quest_claim = claimed_set.contains(id);

    let mut resolved_stages: Vec<ResolvedStage> = stages
        .iter()
        .map(|stage| {
            let (progress, goal, _locked) =
                resolve_tracking(&stage.tracking, metrics, status_map, event_progress);
            let completed = goal > 0 && progress >= goal;
            let claim_key = ClaimKey::compose(&stage.id, event_trigger).to_string();
            let claimed = if claimed_set.contains(&claim_key) {
                Some(true)
            } else if legacy_quest_claim {
                None
            } else {
                Some(false)
            };
            ResolvedStage {
                id: stage.id.clone(),
                title: stage.title.clone(),
                progress,
                goal,
                percent: percent(progress, goal),
                completed,
                claimed,
                claim_key,
                active: false,
                reward: stage.reward.clone(),
            }
        })
        .collect();

    // Sequential gating: the first unclaimed stage with a positive goal is
    // the active one; later stages wait until it is claimed.
    let active_index = resolved_stages
        .iter()
        .position(|stage| stage.claimed != Some(true) && stage.goal > 0);
    if let Some(index) = active_index {
        resolved_stages[index].active = true;
    }
    let is_final = match active_index {
        Some(index) => resolved_stages[index + 1..]
            .iter()
            .all(|stage| stage.claimed == Some(true)),
        None => true,
    };

    let (progress, goal, completed, claim_key, claim_reward, active_stage_id) =
        match active_index {
            Some(index) => {
                let stage = &resolved_stages[index];
                (
                    stage.progress,
                    stage.goal,
                    stage.completed,
                    Some(stage.claim_key.clone()),
                    stage.reward.clone(),
                    Some(stage.id.clone()),
                )
            }
            // Every stage claimed: the quest is spent.
            None => (0, 0, false, None, None, None),
        };

    let all_claimed = active_index.is_none();
    let claimable = completed
        && active_stage_id.is_some()
        && !all_claimed;

    ResolvedQuest {
        id: id.to_string(),
        title: title.to_string(),
        category,
        trackable: true,
        progress,
        goal,
        percent: if all_claimed { 100 } else { percent(progress, goal) },
        completed,
        locked: false,
        claimed: all_claimed,
        claimable,
        claim_key,
        claim_reward,
        active_stage_id,
        is_final,
        stages: resolved_stages,
    }
}

/// Resolve a tracking rule into (progress, goal, locked).
fn resolve_tracking(
    tracking: &Tracking,
    metrics: &MetricsSnapshot,
    status_map: &BTreeMap<String, bool>,
    event_progress: Option<&EventProgress>,
) -> (u32, u32, bool) {
    if !tracking.requires.is_empty() {
        let satisfied = tracking
            .requires
            .iter()
            .filter(|id| status_map.get(id.as_str()).copied().unwrap_or(false))
            .count() as u32;
        let total = tracking.requires.len() as u32;
        return (satisfied, total, satisfied < total);
    }

    let goal = tracking.goal.unwrap_or(0);
    let progress = match tracking.scope {
        TrackScope::Event => match event_progress {
            Some(progress) => event_metric_value(tracking, progress),
            None => 0,
        },
        TrackScope::Daily => scoped_metric_value(tracking, metrics, MetricScope::Daily),
        TrackScope::Weekly => scoped_metric_value(tracking, metrics, MetricScope::Weekly),
        TrackScope::Lifetime => lifetime_metric_value(tracking, metrics),
    };
    (progress, goal, false)
}

fn scoped_metric_value(
    tracking: &Tracking,
    metrics: &MetricsSnapshot,
    scope: MetricScope,
) -> u32 {
    let counts = metrics.scope(scope);
    if let Some(stream) = tracking.manual_key.as_deref() {
        return counts.manual_count(stream);
    }
    match tracking.metric {
        Some(metric) => plain_metric(counts, metric),
        None => 0,
    }
}

fn lifetime_metric_value(tracking: &Tracking, metrics: &MetricsSnapshot) -> u32 {
    if let Some(stream) = tracking.manual_key.as_deref() {
        return metrics.lifetime.counts.manual_count(stream);
    }
    match tracking.metric {
        Some(Metric::Rejections) => metrics.lifetime.rejections,
        Some(Metric::Ghosted) => metrics.lifetime.ghosted,
        Some(Metric::Interviews) => metrics.lifetime.interviews,
        Some(Metric::Favorites) => metrics.lifetime.favorites,
        Some(Metric::PerfectDays) => metrics.totals.daily_perfect,
        Some(Metric::PerfectWeeks) => metrics.totals.weekly_perfect,
        Some(metric) => plain_metric(&metrics.lifetime.counts, metric),
        None => 0,
    }
}

/// Metrics that exist in any scope bucket.
fn plain_metric(counts: &ScopeMetrics, metric: Metric) -> u32 {
    match metric {
        Metric::Applications => counts.applications,
        Metric::FullApplications => counts.full_applications,
        Metric::ComboApplications => counts.combo_applications,
        Metric::TailoredCvs => counts.tailored_cvs,
        Metric::Letters => counts.letters,
        Metric::ReferralApplications => counts.referral_applications,
        Metric::Platforms => counts.distinct_platforms(),
        Metric::Cities => counts.distinct_cities(),
        // Lifetime-only metrics read zero from day/week buckets.
        Metric::Rejections
        | Metric::Ghosted
        | Metric::Interviews
        | Metric::Favorites
        | Metric::PerfectDays
        | Metric::PerfectWeeks
        | Metric::QualityApplications
        | Metric::BurstApplications => 0,
    }
}

fn event_metric_value(tracking: &Tracking, progress: &EventProgress) -> u32 {
    if let Some(stream) = tracking.manual_key.as_deref() {
        return progress.manual_count(stream);
    }
    match tracking.metric {
        Some(Metric::Applications) => progress.applications,
        Some(Metric::FullApplications) => progress.full_applications,
        Some(Metric::QualityApplications) => progress.quality_applications,
        Some(Metric::BurstApplications) => progress.burst_applications,
        _ => 0,
    }
}

fn percent(progress: u32, goal: u32) -> u8 {
    if goal == 0 {
        return 0;
    }
    let pct = (u64::from(progress) * 100) / u64::from(goal);
    pct.min(100) as u8
}

fn accumulate(aggregates: &mut TabAggregates, quest: &ResolvedQuest) {
    if let Some(reward) = &quest.claim_reward {
        if quest.stages.is_empty() {
            aggregates.gold_total += reward.gold;
            aggregates.xp_total += reward.xp;
            if quest.claimed {
                aggregates.gold_earned += reward.gold;
                aggregates.xp_earned += reward.xp;
            }
        }
    }
    for stage in &quest.stages {
        if let Some(reward) = &stage.reward {
            aggregates.gold_total += reward.gold;
            aggregates.xp_total += reward.xp;
            if stage.earned() {
                aggregates.gold_earned += reward.gold;
                aggregates.xp_earned += reward.xp;
            }
        }
    }

    match quest.category.as_deref() {
        Some(CATEGORY_WEEKLY_CORE) => {
            aggregates.core_total += 1;
            if quest_satisfied(quest) {
                aggregates.core_completed += 1;
            }
        }
        Some(CATEGORY_WEEKLY_CYCLABLE) => {
            aggregates.cyclable_total += 1;
            if quest_satisfied(quest) {
                aggregates.cyclable_completed += 1;
            }
        }
        _ => {}
    }
}
