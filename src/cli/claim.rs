//! questlog claim command implementation

use std::path::PathBuf;

use chrono::Utc;

use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::storage::Store;

pub struct ClaimOptions {
    pub key: String,
    pub dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub fn run(opts: ClaimOptions) -> Result<()> {
    let store = Store::open(Store::default_dir(opts.dir)?)?;
    let outcome = store.claim(&opts.key, Utc::now())?;

    let mut human = HumanOutput::new(format!("questlog claim: {}", outcome.quest_id));
    human.push_summary("key", outcome.key.clone());
    if let Some(reward) = &outcome.reward {
        human.push_summary("reward", format!("{} gold, {} xp", reward.gold, reward.xp));
        if let Some(effect) = &reward.effect {
            human.push_detail(format!("effect: {effect}"));
        }
        if reward.cleanse {
            human.push_detail("cleanses active debuffs".to_string());
        }
    }
    human.push_next_step("questlog quests");

    emit_success(
        OutputOptions {
            json: opts.json,
            quiet: opts.quiet,
        },
        "claim",
        &outcome,
        Some(&human),
    )?;

    Ok(())
}
