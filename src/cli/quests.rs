//! questlog quests command implementation
//!
//! Resolves the catalog into tabs and renders them, all of them or one.

use std::path::PathBuf;

use chrono::Utc;

use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::storage::Store;
use crate::tabs::{ResolvedEntry, ResolvedQuest, ResolvedTab, TabSet};

pub struct QuestsOptions {
    pub tab: Option<String>,
    pub dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub fn run(opts: QuestsOptions) -> Result<()> {
    let store = Store::open(Store::default_dir(opts.dir)?)?;
    let resolution = store.refresh(Utc::now())?;
    let tabs = &resolution.tabs;

    let shown: TabSet = match &opts.tab {
        Some(name) => {
            let tab = tabs
                .tabs
                .get(name)
                .ok_or_else(|| Error::InvalidArgument(format!("no tab named '{name}'")))?;
            TabSet {
                tabs: [(name.clone(), tab.clone())].into_iter().collect(),
                unclaimed: tabs
                    .unclaimed
                    .iter()
                    .filter(|(tab_name, _)| tab_name.as_str() == name.as_str())
                    .map(|(tab_name, count)| (tab_name.clone(), *count))
                    .collect(),
            }
        }
        None => tabs.clone(),
    };

    let mut human = HumanOutput::new("questlog quests");
    for (name, tab) in &shown.tabs {
        push_tab(&mut human, name, tab);
    }
    let claimable: usize = shown.unclaimed.values().sum();
    if claimable > 0 {
        human.push_next_step("questlog claim <key>");
    }

    emit_success(
        OutputOptions {
            json: opts.json,
            quiet: opts.quiet,
        },
        "quests",
        &shown,
        Some(&human),
    )?;

    Ok(())
}

fn push_tab(human: &mut HumanOutput, name: &str, tab: &ResolvedTab) {
    let agg = &tab.aggregates;
    human.push_summary(
        name,
        format!(
            "{}/{} gold, {}/{} xp earned",
            agg.gold_earned, agg.gold_total, agg.xp_earned, agg.xp_total,
        ),
    );
    for entry in &tab.entries {
        match entry {
            ResolvedEntry::Section { title, .. } => {
                human.push_detail(format!("[{name}] -- {title} --"));
            }
            ResolvedEntry::Quest(quest) => {
                human.push_detail(format!("[{name}] {}", format_quest(quest)));
            }
            ResolvedEntry::Summary { .. } | ResolvedEntry::Note { .. } => {}
        }
    }
}

fn format_quest(quest: &ResolvedQuest) -> String {
    let marker = if quest.locked {
        "locked"
    } else if quest.claimable {
        "claimable"
    } else if quest.claimed {
        "claimed"
    } else if quest.completed {
        "done"
    } else {
        "open"
    };
    let mut line = format!("{} ({marker})", quest.title);
    if quest.trackable {
        line.push_str(&format!(" {}/{}", quest.progress, quest.goal));
    }
    if let Some(key) = &quest.claim_key {
        if quest.claimable {
            line.push_str(&format!(" key={key}"));
        }
    }
    line
}
