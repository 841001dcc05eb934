//! questlog init command implementation
//!
//! Creates the data directory with a default config and empty journal files.

use std::path::PathBuf;

use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::storage::Store;

#[derive(serde::Serialize)]
struct InitReport {
    root: PathBuf,
    created: bool,
}

pub fn run(dir: Option<PathBuf>, json: bool, quiet: bool) -> Result<()> {
    let root = Store::default_dir(dir)?;
    let existed = Store::open(&root).is_ok();
    let store = Store::init(&root)?;

    let report = InitReport {
        root: store.root().to_path_buf(),
        created: !existed,
    };

    let header = if existed {
        "questlog init: nothing to do".to_string()
    } else {
        "questlog init: initialized store".to_string()
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("root", store.root().display().to_string());
    human.push_next_step("questlog log app --platform <name>");
    human.push_next_step("questlog quests");

    emit_success(OutputOptions { json, quiet }, "init", &report, Some(&human))?;

    Ok(())
}
