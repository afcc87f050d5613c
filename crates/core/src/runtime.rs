//! Async driver that connects a [`HuntSession`] to real time and a real
//! location feed.
//!
//! The session itself is synchronous and clock-agnostic; this runtime
//! owns the timers. One task multiplexes the position stream, the capture
//! poll, the respawn tick and a command channel, so the session is never
//! touched from two places at once.

use std::sync::Arc;

use chrono::Utc;
use futures_util::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;

use crate::error::Result;
use crate::position::{LocationError, LocationSource};
use crate::session::{DepositOutcome, HuntSession, SessionPhase};

/// Control surface for a running session. Senders live on the UI side.
#[derive(Debug)]
pub enum SessionCommand {
    FirePressed,
    FireReleased,
    ScanToken {
        token: String,
        reply: oneshot::Sender<Result<DepositOutcome>>,
    },
    Pause,
    Resume,
    Stop,
}

pub struct SessionRuntime {
    session: HuntSession,
    source: Arc<dyn LocationSource>,
}

impl SessionRuntime {
    pub fn new(session: HuntSession, source: Arc<dyn LocationSource>) -> Self {
        Self { session, source }
    }

    pub fn session(&self) -> &HuntSession {
        &self.session
    }

    /// Runs the session until a `Stop` command arrives or the command
    /// channel closes. Returns the stopped session so callers can read
    /// final state out of it.
    pub async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) -> HuntSession {
        self.session.start();

        let mut positions = self.source.watch().fuse();
        let mut watch_done = false;

        let mut capture_poll =
            tokio::time::interval(self.session.config().capture.poll_interval());
        capture_poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut respawn = tokio::time::interval(self.session.config().ghosts.respawn_interval());
        respawn.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let running = self.session.phase() == SessionPhase::Running;
            tokio::select! {
                // Paused sessions stop consuming the watch; the stream
                // buffers and the last applied fix stays current.
                update = positions.next(), if !watch_done && running => {
                    match update {
                        Some(Ok(fix)) => {
                            self.session.apply_fix(fix);
                        }
                        Some(Err(err)) => self.session.apply_location_error(&err),
                        None => {
                            watch_done = true;
                            self.session.apply_location_error(&LocationError::Unavailable(
                                "position stream ended".into(),
                            ));
                        }
                    }
                }
                _ = capture_poll.tick(), if self.session.is_charging() => {
                    self.session.capture_tick(Utc::now()).await;
                }
                _ = respawn.tick(), if running => {
                    self.session.respawn_tick(Utc::now()).await;
                }
                command = commands.recv() => {
                    match command {
                        Some(SessionCommand::FirePressed) => {
                            self.session.fire_pressed(Utc::now());
                        }
                        Some(SessionCommand::FireReleased) => self.session.fire_released(),
                        Some(SessionCommand::ScanToken { token, reply }) => {
                            let result = self.session.scan_token(&token, Utc::now()).await;
                            let _ = reply.send(result);
                        }
                        Some(SessionCommand::Pause) => self.session.pause(),
                        Some(SessionCommand::Resume) => self.session.resume(Utc::now()),
                        Some(SessionCommand::Stop) | None => break,
                    }
                }
            }
        }

        self.session.stop().await;
        self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureOutcome;
    use crate::config::GameConfig;
    use crate::events::GameEvent;
    use crate::position::{PositionFix, PositionResult, PositionStream};
    use crate::store::MemoryStore;
    use crate::sync::NullSync;
    use futures_util::stream;
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;
    use tokio::time::sleep;

    /// Replays a fixed script of position updates, then stays quiet.
    struct ScriptedSource {
        fixes: Vec<PositionResult>,
    }

    impl LocationSource for ScriptedSource {
        fn current_position<'a>(
            &'a self,
        ) -> Pin<Box<dyn Future<Output = PositionResult> + Send + 'a>> {
            let first = self.fixes.first().cloned();
            Box::pin(async move {
                first.unwrap_or_else(|| Err(LocationError::Unavailable("no fix scripted".into())))
            })
        }

        fn watch(&self) -> PositionStream {
            Box::pin(stream::iter(self.fixes.clone()).chain(stream::pending()))
        }
    }

    /// Short charge so tests complete captures in real time quickly.
    fn quick_config() -> GameConfig {
        let mut cfg = GameConfig::default();
        cfg.capture.duration_ms = 80;
        cfg.capture.poll_interval_ms = 10;
        cfg
    }

    fn in_zone_fix(cfg: &GameConfig) -> PositionFix {
        PositionFix {
            point: cfg.zone.center(),
            accuracy_m: 5.0,
            timestamp: Utc::now(),
        }
    }

    fn launch(
        cfg: GameConfig,
        fixes: Vec<PositionResult>,
    ) -> (
        mpsc::Sender<SessionCommand>,
        tokio::task::JoinHandle<HuntSession>,
        tokio::sync::broadcast::Receiver<GameEvent>,
    ) {
        let session = HuntSession::new(
            cfg,
            Arc::new(MemoryStore::default()),
            Arc::new(NullSync),
        )
        .unwrap()
        .with_rng_seed(7);
        let events = session.subscribe();
        let runtime = SessionRuntime::new(session, Arc::new(ScriptedSource { fixes }));
        let (tx, rx) = mpsc::channel(16);
        (tx, tokio::spawn(runtime.run(rx)), events)
    }

    #[tokio::test]
    async fn test_hold_to_capture_end_to_end() {
        let cfg = quick_config();
        let fix = in_zone_fix(&cfg);
        let (tx, handle, mut events) = launch(cfg, vec![Ok(fix)]);

        sleep(Duration::from_millis(50)).await;
        tx.send(SessionCommand::FirePressed).await.unwrap();
        sleep(Duration::from_millis(300)).await;
        tx.send(SessionCommand::Stop).await.unwrap();
        let session = handle.await.unwrap();

        assert_eq!(session.phase(), SessionPhase::Idle);
        assert_eq!(session.inventory().len(), 1);
        let mut saw_success = false;
        while let Ok(ev) = events.try_recv() {
            if matches!(
                ev,
                GameEvent::CaptureResolved {
                    outcome: CaptureOutcome::Success { .. }
                }
            ) {
                saw_success = true;
            }
        }
        assert!(saw_success, "no successful capture observed");
    }

    #[tokio::test]
    async fn test_release_before_full_charge_cancels() {
        let cfg = quick_config();
        let fix = in_zone_fix(&cfg);
        let (tx, handle, mut events) = launch(cfg, vec![Ok(fix)]);

        sleep(Duration::from_millis(50)).await;
        tx.send(SessionCommand::FirePressed).await.unwrap();
        sleep(Duration::from_millis(20)).await;
        tx.send(SessionCommand::FireReleased).await.unwrap();
        sleep(Duration::from_millis(150)).await;
        tx.send(SessionCommand::Stop).await.unwrap();
        let session = handle.await.unwrap();

        assert!(session.inventory().is_empty());
        let mut saw_cancel = false;
        while let Ok(ev) = events.try_recv() {
            if matches!(
                ev,
                GameEvent::CaptureResolved {
                    outcome: CaptureOutcome::Cancelled { .. }
                }
            ) {
                saw_cancel = true;
            }
        }
        assert!(saw_cancel, "no cancellation observed");
    }

    #[tokio::test]
    async fn test_scan_command_round_trips_a_receipt() {
        let cfg = quick_config();
        let fix = in_zone_fix(&cfg);
        let (tx, handle, _events) = launch(cfg, vec![Ok(fix)]);

        sleep(Duration::from_millis(50)).await;
        tx.send(SessionCommand::FirePressed).await.unwrap();
        sleep(Duration::from_millis(300)).await;

        let (reply, rx) = oneshot::channel();
        tx.send(SessionCommand::ScanToken {
            token: "CONTAINMENT_UNIT_FLORIPA_001".into(),
            reply,
        })
        .await
        .unwrap();
        let outcome = rx.await.unwrap().unwrap();
        let DepositOutcome::Completed { receipt, .. } = outcome else {
            panic!("expected a completed deposit, got {outcome:?}");
        };
        assert_eq!(receipt.ghost_count, 1);

        tx.send(SessionCommand::Stop).await.unwrap();
        let session = handle.await.unwrap();
        assert!(session.inventory().is_empty());
        assert_eq!(session.progress().ghosts_deposited, 1);
    }

    #[tokio::test]
    async fn test_dropping_the_command_channel_stops_the_session() {
        let cfg = quick_config();
        let fix = in_zone_fix(&cfg);
        let (tx, handle, _events) = launch(cfg, vec![Ok(fix)]);

        sleep(Duration::from_millis(30)).await;
        drop(tx);
        let session = handle.await.unwrap();
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.active_ghosts().is_empty());
    }
}
