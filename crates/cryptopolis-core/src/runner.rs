//! Real-time session driver with player and operator commands.
//!
//! This module provides [`run_session`], the async loop that drives a
//! [`Session`] on a fixed [`tokio::time::interval`] and services commands
//! arriving over an `mpsc` channel:
//!
//! - **Placement / demolition**: queued on the session and applied at the
//!   next day boundary, at most one per day; the result is returned on a
//!   `oneshot` reply channel once the request has been processed
//! - **Pause / resume**: pausing suspends the clock entirely; interval
//!   ticks while paused are dropped, not buffered
//! - **Sentiment pin**: operator override of the market index
//! - **Save**: a snapshot taken between days, returned on a reply channel
//! - **Stop**: ends the loop immediately; there is nothing to unwind
//!
//! Commands always take priority over a pending interval tick, so a
//! command sent before a day boundary is seen before that day runs.
//!
//! A session that has already ended (and is not in sandbox mode) never
//! advances, so the loop returns [`SessionEndReason::GameEnded`] as soon as
//! it observes one. Replies for requests still queued when the loop returns
//! are dropped.

use std::collections::HashMap;

use cryptopolis_types::{Building, BuildingId, GameEnd};
use cryptopolis_world::PlacementError;
use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::economy::PlacementRequest;
use crate::snapshot::SnapshotError;
use crate::state::GameState;
use crate::tick::{ProcessedRequest, Request, RequestOutcome, RequestTicket, Session, TickSummary};

/// Errors that can occur while driving a session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunnerError {
    /// The session's day interval cannot drive a timer.
    #[error("day interval must be greater than zero")]
    ZeroInterval,
}

/// A request sent to a running session.
#[derive(Debug)]
pub enum Command {
    /// Queue a building placement for the next day boundary.
    Place {
        /// What to build and where.
        request: PlacementRequest,
        /// Receives the placed building or the rejection.
        reply: oneshot::Sender<Result<Building, PlacementError>>,
    },
    /// Queue a demolition for the next day boundary.
    Demolish {
        /// The building to remove.
        id: BuildingId,
        /// Receives the removed building and refund, or the rejection.
        reply: oneshot::Sender<Result<(Building, Decimal), PlacementError>>,
    },
    /// Suspend the clock.
    Pause,
    /// Resume the clock.
    Resume,
    /// Pin the sentiment index, or release it with `None`.
    PinSentiment(Option<Decimal>),
    /// Serialize the current state.
    Save {
        /// Receives the snapshot envelope.
        reply: oneshot::Sender<Result<String, SnapshotError>>,
    },
    /// End the session loop.
    Stop,
}

/// Why [`run_session`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEndReason {
    /// A win or lose condition matched.
    GameEnded,
    /// The configured day limit was reached.
    MaxDaysReached,
    /// A [`Command::Stop`] was received.
    Stopped,
    /// Every command sender was dropped.
    CommandChannelClosed,
}

/// Reply channel of a request waiting in the session queue.
enum PendingReply {
    Place(oneshot::Sender<Result<Building, PlacementError>>),
    Demolish(oneshot::Sender<Result<(Building, Decimal), PlacementError>>),
}

/// Result of a session run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResult {
    /// The reason the loop ended.
    pub end_reason: SessionEndReason,
    /// Day the session was on when the loop ended.
    pub final_day: u64,
    /// Days executed during this run.
    pub days_run: u64,
    /// The game-end record, if the session has one.
    pub end: Option<GameEnd>,
}

/// Callback invoked after each day completes.
///
/// Implementations can forward summaries to a UI, persist periodic
/// snapshots, and so on.
pub trait TickCallback: Send {
    /// Called after a day completes.
    fn on_tick(&mut self, summary: &TickSummary, state: &GameState);
}

/// A no-op tick callback.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _state: &GameState) {}
}

/// Drive `session` in real time until a termination condition is met.
///
/// One day runs per interval tick. `max_days == 0` means no day limit.
/// Returns immediately with [`SessionEndReason::GameEnded`] if the session
/// has already ended.
///
/// # Errors
///
/// Returns [`RunnerError::ZeroInterval`] if the session's day interval is
/// zero.
pub async fn run_session(
    session: &mut Session,
    commands: &mut mpsc::Receiver<Command>,
    max_days: u64,
    callback: &mut dyn TickCallback,
) -> Result<SessionResult, RunnerError> {
    let period = session.state().clock.interval();
    if period.is_zero() {
        return Err(RunnerError::ZeroInterval);
    }
    let start = Instant::now();
    let mut ticker = tokio::time::interval_at(start.checked_add(period).unwrap_or(start), period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut days_run: u64 = 0;
    let mut pending: HashMap<RequestTicket, PendingReply> = HashMap::new();

    info!(
        session_id = %session.state().session_id,
        day = session.state().day(),
        max_days,
        day_interval_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
        "Session loop starting"
    );

    loop {
        if session.state().is_frozen() {
            info!(
                day = session.state().day(),
                status = ?session.state().status,
                "Session has already ended"
            );
            return Ok(finish(session, SessionEndReason::GameEnded, days_run));
        }

        tokio::select! {
            biased;

            command = commands.recv() => {
                let Some(command) = command else {
                    info!("Command channel closed");
                    return Ok(finish(session, SessionEndReason::CommandChannelClosed, days_run));
                };
                if matches!(command, Command::Stop) {
                    info!(day = session.state().day(), "Stop requested");
                    return Ok(finish(session, SessionEndReason::Stopped, days_run));
                }
                handle_command(session, &mut pending, command);
            }

            _ = ticker.tick() => {
                let Some(mut summary) = session.step(period) else {
                    continue;
                };
                days_run = days_run.saturating_add(1);
                callback.on_tick(&summary, session.state());
                if let Some(processed) = summary.request.take() {
                    resolve(&mut pending, processed);
                }

                if summary.end.is_some() {
                    return Ok(finish(session, SessionEndReason::GameEnded, days_run));
                }
                if max_days > 0 && summary.day >= max_days {
                    info!(day = summary.day, max_days, "Day limit reached");
                    return Ok(finish(session, SessionEndReason::MaxDaysReached, days_run));
                }
            }
        }
    }
}

fn handle_command(
    session: &mut Session,
    pending: &mut HashMap<RequestTicket, PendingReply>,
    command: Command,
) {
    match command {
        Command::Place { request, reply } => {
            let ticket = session.submit(Request::Place(request));
            pending.insert(ticket, PendingReply::Place(reply));
        }
        Command::Demolish { id, reply } => {
            let ticket = session.submit(Request::Demolish(id));
            pending.insert(ticket, PendingReply::Demolish(reply));
        }
        Command::Pause => {
            session.pause();
            info!(day = session.state().day(), "Session paused");
        }
        Command::Resume => {
            session.resume();
            info!(day = session.state().day(), "Session resumed");
        }
        Command::PinSentiment(value) => session.pin_sentiment(value),
        Command::Save { reply } => {
            let snapshot = session.snapshot();
            if let Err(err) = &snapshot {
                warn!(error = %err, "Snapshot failed");
            }
            send_reply(reply, snapshot);
        }
        Command::Stop => {}
    }
}

fn resolve(pending: &mut HashMap<RequestTicket, PendingReply>, processed: ProcessedRequest) {
    let Some(reply) = pending.remove(&processed.ticket) else {
        return;
    };
    match (reply, processed.outcome) {
        (PendingReply::Place(reply), RequestOutcome::Placed(building)) => {
            send_reply(reply, Ok(building));
        }
        (PendingReply::Place(reply), RequestOutcome::Rejected(err)) => send_reply(reply, Err(err)),
        (PendingReply::Demolish(reply), RequestOutcome::Demolished { building, refund }) => {
            send_reply(reply, Ok((building, refund)));
        }
        (PendingReply::Demolish(reply), RequestOutcome::Rejected(err)) => {
            send_reply(reply, Err(err));
        }
        (_, outcome) => warn!(?outcome, "Request outcome does not match its reply channel"),
    }
}

fn send_reply<T>(reply: oneshot::Sender<T>, value: T) {
    if reply.send(value).is_err() {
        debug!("Command reply dropped; requester went away");
    }
}

fn finish(session: &Session, end_reason: SessionEndReason, days_run: u64) -> SessionResult {
    SessionResult {
        end_reason,
        final_day: session.state().day(),
        days_run,
        end: session.state().end.clone(),
    }
}

/// Log the session end sequence.
pub fn log_session_end(result: &SessionResult) {
    info!(
        reason = ?result.end_reason,
        final_day = result.final_day,
        days_run = result.days_run,
        "Session ended"
    );

    if let Some(ref end) = result.end {
        info!(
            condition = %end.end_condition_id,
            is_victory = end.is_victory,
            days_survived = end.stats.days_survived,
            peak_tvl = %end.stats.peak_tvl,
            peak_population = end.stats.peak_population,
            total_yield = %end.stats.total_yield_earned,
            final_treasury = %end.stats.final_treasury,
            "Final statistics"
        );
    } else if result.days_run == 0 {
        warn!("Session ended with no days executed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use cryptopolis_types::{BuildingType, SessionStatus};

    use super::*;
    use crate::config::SimulationConfig;
    use crate::snapshot;

    fn quiet_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.events.enabled = false;
        config
    }

    struct Counter(u64);

    impl TickCallback for Counter {
        fn on_tick(&mut self, summary: &TickSummary, _state: &GameState) {
            self.0 = summary.day;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_by_max_days() {
        let mut session = Session::new(&quiet_config()).unwrap();
        let (_tx, mut rx) = mpsc::channel(8);
        let mut cb = Counter(0);
        let start = Instant::now();

        let result = run_session(&mut session, &mut rx, 5, &mut cb).await.unwrap();

        assert_eq!(result.end_reason, SessionEndReason::MaxDaysReached);
        assert_eq!(result.final_day, 5);
        assert_eq!(result.days_run, 5);
        assert_eq!(cb.0, 5);
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_first_day() {
        let mut session = Session::new(&quiet_config()).unwrap();
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(Command::Stop).await.unwrap();

        let result = run_session(&mut session, &mut rx, 0, &mut NoOpCallback)
            .await
            .unwrap();

        assert_eq!(result.end_reason, SessionEndReason::Stopped);
        assert_eq!(result.final_day, 0);
        assert!(result.end.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn closed_channel_ends_the_loop() {
        let mut session = Session::new(&quiet_config()).unwrap();
        let (tx, mut rx) = mpsc::channel::<Command>(8);
        drop(tx);

        let result = run_session(&mut session, &mut rx, 0, &mut NoOpCallback)
            .await
            .unwrap();
        assert_eq!(result.end_reason, SessionEndReason::CommandChannelClosed);
    }

    struct BuildingCounts(Vec<u64>);

    impl TickCallback for BuildingCounts {
        fn on_tick(&mut self, summary: &TickSummary, _state: &GameState) {
            self.0.push(summary.building_count);
        }
    }

    async fn send_place(
        tx: &mpsc::Sender<Command>,
        building_type: BuildingType,
        x: i32,
        y: i32,
    ) -> oneshot::Receiver<Result<Building, PlacementError>> {
        let (reply, rx) = oneshot::channel();
        tx.send(Command::Place {
            request: PlacementRequest::new(building_type, x, y),
            reply,
        })
        .await
        .unwrap();
        rx
    }

    #[tokio::test(start_paused = true)]
    async fn placements_apply_one_per_day() {
        let mut session = Session::new(&quiet_config()).unwrap();
        let (tx, mut rx) = mpsc::channel(8);
        let mut replies = Vec::new();
        for x in 0..3 {
            replies.push(send_place(&tx, BuildingType::HodlerHousing, x, 0).await);
        }
        let mut counts = BuildingCounts(Vec::new());

        let result = run_session(&mut session, &mut rx, 3, &mut counts)
            .await
            .unwrap();

        assert_eq!(result.end_reason, SessionEndReason::MaxDaysReached);
        assert_eq!(counts.0, vec![1, 2, 3]);
        for (day, reply) in (1..).zip(replies) {
            assert_eq!(reply.await.unwrap().unwrap().built_on_day, day);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn queued_placements_wait_for_a_day_boundary() {
        let mut session = Session::new(&quiet_config()).unwrap();
        let (tx, mut rx) = mpsc::channel(8);
        let first = send_place(&tx, BuildingType::Exchange, 4, 4).await;
        let clash = send_place(&tx, BuildingType::Exchange, 4, 4).await;
        let unserved = send_place(&tx, BuildingType::Exchange, 5, 4).await;

        run_session(&mut session, &mut rx, 2, &mut NoOpCallback)
            .await
            .unwrap();

        assert_eq!(session.state().building_count(), 1);
        assert_eq!(session.queued(), 1);
        assert_eq!(
            first.await.unwrap().unwrap().building_type,
            BuildingType::Exchange
        );
        assert!(matches!(
            clash.await.unwrap(),
            Err(PlacementError::TileOccupied(_))
        ));
        // The loop returned before the third request's day.
        assert!(unserved.await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn save_replies_between_days() {
        let mut session = Session::new(&quiet_config()).unwrap();
        session
            .place_building(PlacementRequest::new(BuildingType::Exchange, 4, 4))
            .unwrap();
        let (tx, mut rx) = mpsc::channel(8);
        let (save_tx, save_rx) = oneshot::channel();
        tx.send(Command::Save { reply: save_tx }).await.unwrap();
        tx.send(Command::Stop).await.unwrap();

        run_session(&mut session, &mut rx, 0, &mut NoOpCallback)
            .await
            .unwrap();

        let restored = snapshot::load(&save_rx.await.unwrap().unwrap()).unwrap();
        assert_eq!(restored.buildings.len(), 1);
        assert_eq!(restored, *session.state());
    }

    #[tokio::test(start_paused = true)]
    async fn pause_suspends_days() {
        let mut session = Session::new(&quiet_config()).unwrap();
        let (tx, mut rx) = mpsc::channel(8);
        let start = Instant::now();

        let driver = async move {
            tx.send(Command::Pause).await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            tx.send(Command::Resume).await.unwrap();
            tx
        };
        let mut cb = NoOpCallback;
        let (result, _tx) = tokio::join!(run_session(&mut session, &mut rx, 3, &mut cb), driver);

        let result = result.unwrap();
        assert_eq!(result.end_reason, SessionEndReason::MaxDaysReached);
        assert_eq!(result.final_day, 3);
        assert!(start.elapsed() >= Duration::from_secs(12));
    }

    #[tokio::test(start_paused = true)]
    async fn game_end_stops_the_loop() {
        let mut config = quiet_config();
        config.session.starting_treasury = Decimal::from(300_000);
        let mut session = Session::new(&config).unwrap();
        let (_tx, mut rx) = mpsc::channel(8);

        let result = run_session(&mut session, &mut rx, 0, &mut NoOpCallback)
            .await
            .unwrap();

        assert_eq!(result.end_reason, SessionEndReason::GameEnded);
        assert_eq!(result.final_day, 1);
        let end = result.end.unwrap();
        assert!(end.is_victory);
        assert_eq!(end.end_condition_id, "moonshot");
        assert_eq!(session.state().status, SessionStatus::Won);
    }

    #[tokio::test(start_paused = true)]
    async fn already_ended_session_returns_immediately() {
        let mut config = quiet_config();
        config.session.starting_treasury = Decimal::from(300_000);
        let mut session = Session::new(&config).unwrap();
        session.advance_day().unwrap();
        assert_eq!(session.state().status, SessionStatus::Won);

        let (resumed, warning) = Session::restore(&session.snapshot().unwrap(), &config).unwrap();
        assert!(warning.is_none());

        for mut ended in [session, resumed] {
            let (_tx, mut rx) = mpsc::channel(8);
            let start = Instant::now();
            let result = tokio::time::timeout(
                Duration::from_secs(3_600),
                run_session(&mut ended, &mut rx, 5, &mut NoOpCallback),
            )
            .await
            .unwrap()
            .unwrap();

            assert_eq!(result.end_reason, SessionEndReason::GameEnded);
            assert_eq!(result.days_run, 0);
            assert_eq!(result.final_day, 1);
            assert_eq!(result.end.unwrap().end_condition_id, "moonshot");
            assert_eq!(start.elapsed(), Duration::ZERO);
        }
    }
}
