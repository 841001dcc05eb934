mod support;

use questlog::catalog::{
    Metric, QuestCore, QuestDef, Reward, SimpleQuest, Stage, TieredQuest, TrackScope, Tracking,
    Catalog, CATEGORY_WEEKLY_CORE, CATEGORY_WEEKLY_CYCLABLE,
};
use questlog::claim::ClaimedSet;
use questlog::config::{Config, Policy};
use questlog::events::EventStates;
use questlog::journal::{ApplicationKind, ManualLogs};
use questlog::metrics::compute_metrics;
use questlog::progress::EventProgressMap;
use questlog::rotation::weekly_rotation;
use questlog::storage::default_catalog;
use questlog::tabs::{build_quest_tabs, ResolvedEntry, ResolvedQuest, TabSet};
use support::{app_at, local};

fn resolve(catalog: &Catalog, claimed: &ClaimedSet, apps_count: u32) -> TabSet {
    let now = local(2025, 3, 11, 12);
    let apps: Vec<_> = (0..apps_count)
        .map(|i| {
            app_at(
                local(2025, 3, 11, 8) + chrono::Duration::minutes(i as i64),
                ApplicationKind::Easy,
                "board",
            )
        })
        .collect();
    let metrics = compute_metrics(&apps, &ManualLogs::new(), now, &Config::default());
    build_quest_tabs(
        catalog,
        &metrics,
        claimed,
        &EventStates::new(),
        &EventProgressMap::new(),
        &Policy::default(),
    )
}

fn quests(entries: &[ResolvedEntry]) -> Vec<&ResolvedQuest> {
    entries
        .iter()
        .filter_map(|entry| match entry {
            ResolvedEntry::Quest(quest) => Some(quest),
            _ => None,
        })
        .collect()
}

#[test]
fn weekly_tab_shows_rotation_as_core() {
    let catalog = default_catalog();
    let tabs = resolve(&catalog, &ClaimedSet::new(), 0);
    let weekly = &tabs.tabs["Weekly"];

    // Sections are suppressed on the weekly tab.
    assert!(weekly
        .entries
        .iter()
        .all(|entry| !matches!(entry, ResolvedEntry::Section { .. })));

    // 3 always-on core quests plus rotation_size cyclables, all presented
    // under the core label.
    let shown = quests(&weekly.entries);
    assert_eq!(shown.len(), 6);
    assert!(shown
        .iter()
        .all(|quest| quest.category.as_deref() == Some(CATEGORY_WEEKLY_CORE)));

    // The shown cyclables are exactly this week's rotation.
    let pool: Vec<String> = catalog["Weekly"]
        .iter()
        .filter(|def| def.category() == Some(CATEGORY_WEEKLY_CYCLABLE))
        .map(|def| def.id().to_string())
        .collect();
    let now = local(2025, 3, 11, 12);
    let metrics = compute_metrics(&[], &ManualLogs::new(), now, &Config::default());
    let rotation = weekly_rotation(&metrics.this_week, &pool, 3);
    for id in &rotation {
        assert!(shown.iter().any(|quest| &quest.id == id));
    }
    for id in pool.iter().filter(|id| !rotation.contains(id)) {
        assert!(!shown.iter().any(|quest| &quest.id == id));
    }
}

#[test]
fn completed_simple_quest_is_claimable_exactly_once() {
    let mut catalog = Catalog::new();
    catalog.insert(
        "Daily".to_string(),
        vec![QuestDef::Simple(SimpleQuest {
            core: QuestCore::new("q-five", "Five applications").with_reward(Reward::new(10, 5)),
            tracking: Tracking::metric(TrackScope::Daily, Metric::Applications, 5),
        })],
    );

    let tabs = resolve(&catalog, &ClaimedSet::new(), 5);
    let quest = quests(&tabs.tabs["Daily"].entries)[0];
    assert!(quest.completed);
    assert!(quest.claimable);
    assert_eq!(quest.claim_key.as_deref(), Some("q-five"));
    assert_eq!(tabs.unclaimed["Daily"], 1);

    let claimed: ClaimedSet = ["q-five".to_string()].into_iter().collect();
    let tabs = resolve(&catalog, &claimed, 5);
    let quest = quests(&tabs.tabs["Daily"].entries)[0];
    assert!(quest.claimed);
    assert!(!quest.claimable);
    assert_eq!(tabs.unclaimed.get("Daily").copied().unwrap_or(0), 0);
}

#[test]
fn tiers_unlock_sequentially() {
    let mut catalog = Catalog::new();
    catalog.insert(
        "Career".to_string(),
        vec![QuestDef::Tiered(TieredQuest {
            core: QuestCore::new("vol", "Volume"),
            tiers: vec![
                Stage {
                    id: "vol-1".to_string(),
                    title: "Five".to_string(),
                    tracking: Tracking::metric(TrackScope::Lifetime, Metric::Applications, 5),
                    reward: Some(Reward::new(10, 5)),
                },
                Stage {
                    id: "vol-2".to_string(),
                    title: "Ten".to_string(),
                    tracking: Tracking::metric(TrackScope::Lifetime, Metric::Applications, 10),
                    reward: Some(Reward::new(20, 10)),
                },
            ],
        })],
    );

    // Seven lifetime applications: tier 1 done, tier 2 in progress.
    let tabs = resolve(&catalog, &ClaimedSet::new(), 7);
    let quest = quests(&tabs.tabs["Career"].entries)[0];
    assert_eq!(quest.active_stage_id.as_deref(), Some("vol-1"));
    assert!(quest.claimable);
    assert_eq!(quest.claim_key.as_deref(), Some("vol-1"));
    assert_eq!(quest.claim_reward.as_ref().map(|r| r.gold), Some(10));
    assert!(!quest.is_final);

    // Claiming tier 1 moves the active stage to tier 2.
    let claimed: ClaimedSet = ["vol-1".to_string()].into_iter().collect();
    let tabs = resolve(&catalog, &claimed, 7);
    let quest = quests(&tabs.tabs["Career"].entries)[0];
    assert_eq!(quest.active_stage_id.as_deref(), Some("vol-2"));
    assert!(!quest.claimable);
    assert_eq!(quest.progress, 7);
    assert_eq!(quest.goal, 10);
    assert!(quest.is_final);
}

#[test]
fn requires_locks_until_dependencies_are_met() {
    let mut catalog = Catalog::new();
    catalog.insert(
        "Career".to_string(),
        vec![
            QuestDef::Simple(SimpleQuest {
                core: QuestCore::new("first", "First"),
                tracking: Tracking::metric(TrackScope::Lifetime, Metric::Applications, 3),
            }),
            QuestDef::Simple(SimpleQuest {
                core: QuestCore::new("gated", "Gated").with_reward(Reward::new(50, 25)),
                tracking: Tracking::requires(&["first"]),
            }),
        ],
    );

    let tabs = resolve(&catalog, &ClaimedSet::new(), 1);
    let gated = quests(&tabs.tabs["Career"].entries)[1];
    assert!(gated.locked);
    assert_eq!((gated.progress, gated.goal), (0, 1));

    let tabs = resolve(&catalog, &ClaimedSet::new(), 3);
    let gated = quests(&tabs.tabs["Career"].entries)[1];
    assert!(!gated.locked);
    assert_eq!((gated.progress, gated.goal), (1, 1));
    assert!(gated.claimable);
}

#[test]
fn aggregates_count_rewards_and_core_completion() {
    let mut catalog = Catalog::new();
    catalog.insert(
        "Weekly".to_string(),
        vec![
            QuestDef::Simple(SimpleQuest {
                core: QuestCore::new("w-1", "One")
                    .with_category(CATEGORY_WEEKLY_CORE)
                    .with_reward(Reward::new(10, 5)),
                tracking: Tracking::metric(TrackScope::Weekly, Metric::Applications, 2),
            }),
            QuestDef::Simple(SimpleQuest {
                core: QuestCore::new("w-2", "Two")
                    .with_category(CATEGORY_WEEKLY_CORE)
                    .with_reward(Reward::new(30, 15)),
                tracking: Tracking::metric(TrackScope::Weekly, Metric::Applications, 99),
            }),
        ],
    );

    let claimed: ClaimedSet = ["w-1".to_string()].into_iter().collect();
    let tabs = resolve(&catalog, &claimed, 2);
    let agg = &tabs.tabs["Weekly"].aggregates;
    assert_eq!(agg.gold_total, 40);
    assert_eq!(agg.gold_earned, 10);
    assert_eq!(agg.xp_total, 20);
    assert_eq!(agg.xp_earned, 5);
    assert_eq!(agg.core_total, 2);
    assert_eq!(agg.core_completed, 1);
}

#[test]
fn empty_journal_resolves_every_tab_without_claims() {
    let catalog = default_catalog();
    let tabs = resolve(&catalog, &ClaimedSet::new(), 0);
    assert!(tabs.tabs.contains_key("Daily"));
    assert!(tabs.tabs.contains_key("Career"));
    let total_unclaimed: usize = tabs.unclaimed.values().sum();
    assert_eq!(total_unclaimed, 0);
    for tab in tabs.tabs.values() {
        for quest in quests(&tab.entries) {
            assert!(!quest.claimable);
            assert!(!quest.claimed);
        }
    }
}

#[test]
fn section_and_summary_entries_pass_through_outside_weekly() {
    let mut catalog = Catalog::new();
    catalog.insert(
        "Daily".to_string(),
        vec![
            QuestDef::Summary {
                id: "sum".to_string(),
                title: "Today".to_string(),
            },
            QuestDef::Section {
                id: "sec".to_string(),
                title: "Morning".to_string(),
            },
        ],
    );
    let tabs = resolve(&catalog, &ClaimedSet::new(), 0);
    let entries = &tabs.tabs["Daily"].entries;
    assert_eq!(entries.len(), 2);
    assert!(matches!(&entries[0], ResolvedEntry::Summary { id, .. } if id == "sum"));
    assert!(matches!(&entries[1], ResolvedEntry::Section { id, .. } if id == "sec"));
}
