//! questlog - Quest & Progression Metrics Engine
//!
//! This library turns a journal of discrete life events (job applications,
//! outreach pings, skill sessions) into quest progression: rolling metrics,
//! time-boxed event quests, and a fully resolved quest-tab structure with
//! claim eligibility.
//!
//! # Core Concepts
//!
//! - **Journal**: the raw log of applications plus named manual streams
//! - **Metrics**: daily/weekly/lifetime counters folded from the journal
//! - **Event quests**: time-boxed quests opened by trigger predicates
//! - **Claim keys**: stable claim identities scoped to event activations
//! - **Weekly rotation**: deterministic selection of the cyclable pool
//!
//! The engine is a set of pure folds: no I/O, no hidden clock, no
//! randomness. Callers pass collections and `now` and get values back.
//! Persistence and the claim action live in `storage`; everything else is
//! side-effect free.
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Policy thresholds and journal settings from `.questlog.toml`
//! - `error`: Error types and result aliases
//! - `timekeys`: Local-calendar day and week bucketing
//! - `journal`: Application and manual-entry record types
//! - `metrics`: Metrics aggregation and perfect-day/week predicates
//! - `rotation`: Deterministic weekly rotation of the cyclable pool
//! - `events`: Event-quest trigger/expiry/cooldown state machine
//! - `progress`: In-window counters for active event quests
//! - `catalog`: Quest definition types (tagged union)
//! - `claim`: Claim-key composition and reactivation cleanup
//! - `tabs`: The top-level fold resolving the catalog into tabs
//! - `storage`: Data-dir persistence and the claim action
//! - `lock`: File locking and atomic writes

pub mod catalog;
pub mod claim;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod journal;
pub mod lock;
pub mod metrics;
pub mod output;
pub mod progress;
pub mod rotation;
pub mod storage;
pub mod tabs;
pub mod timekeys;

pub use error::{Error, Result};
