//! Clock, market, economy, events, objectives, and the day pipeline for the
//! Cryptopolis simulation.
//!
//! This crate owns the ordered per-day pipeline that drives a session:
//! Clock, queued request, Sentiment, Economy, Events, Objectives, ledger
//! settle, and notification flush.
//!
//! # Modules
//!
//! - [`clock`] -- Converts real elapsed time into discrete in-game days.
//! - [`config`] -- Configuration loading from `cryptopolis-config.yaml` into
//!   strongly-typed structs.
//! - [`sentiment`] -- Mean-reverting, seeded market sentiment index.
//! - [`economy`] -- Yields, placement, demolition, and penalties.
//! - [`scheduler`] -- Disaster and rug-pull rolls.
//! - [`objectives`] -- Win/lose registries and milestones.
//! - [`state`] -- The single owned [`GameState`].
//! - [`tick`] -- The [`Session`] and its day pipeline.
//! - [`snapshot`] -- Versioned save/restore with validation.
//! - [`runner`] -- Real-time tokio driver with a command channel.
//!
//! # Determinism
//!
//! Every stochastic decision draws from one `ChaCha8` stream seeded from
//! `session.seed` and stored inside the state. Buildings are kept in id
//! order and ids are handed out sequentially, so the same seed and the same
//! inputs reproduce the same event log and end statistics.
//!
//! [`GameState`]: state::GameState
//! [`Session`]: tick::Session

pub mod clock;
pub mod config;
pub mod economy;
pub mod objectives;
pub mod runner;
pub mod scheduler;
pub mod sentiment;
pub mod snapshot;
pub mod state;
pub mod tick;
