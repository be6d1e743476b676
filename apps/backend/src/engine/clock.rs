//! Countdown scheduler: at most one live timer per session
//!
//! A timer is a spawned task carrying the epoch it was armed with. It sleeps
//! with no lock held, then re-checks its epoch under the session lock before
//! touching anything. Pause and reset only clear the live epoch, so a timer that
//! wakes after cancellation sees the mismatch and exits without a trace.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::store::{CommitKind, SessionSlot, SessionStore};
use crate::errors::Result;
use crate::models::domain::{ClockAction, ClockReport, ClockState, SessionCode};

pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

pub struct ClockScheduler {
    store: Arc<SessionStore>,
    period: Duration,
}

impl ClockScheduler {
    pub fn new(store: Arc<SessionStore>, period: Duration) -> Self {
        Self { store, period }
    }

    pub async fn action(&self, code: &SessionCode, action: ClockAction) -> Result<ClockReport> {
        match action {
            ClockAction::Start => self.start(code).await,
            ClockAction::Pause => self.pause(code).await,
            ClockAction::Reset => self.reset(code).await,
        }
    }

    /// Arm a timer unless one is already live, the session has ended, or
    /// there is nothing left to count down
    pub async fn start(&self, code: &SessionCode) -> Result<ClockReport> {
        let mut slot = self.store.lock(code).await?;

        if slot.timer.is_running() || slot.session.ended || slot.session.clocks_expired() {
            log::debug!("Clock start on {} is a no-op ({:?})", code, state_of(&slot));
            return Ok(report(&slot, false));
        }

        let epoch = slot.timer.arm();
        tokio::spawn(run_timer(
            Arc::clone(&self.store),
            code.clone(),
            epoch,
            self.period,
        ));
        log::info!("Clock started on {} (epoch {})", code, epoch);

        Ok(report(&slot, true))
    }

    pub async fn pause(&self, code: &SessionCode) -> Result<ClockReport> {
        let mut slot = self.store.lock(code).await?;

        let applied = slot.timer.cancel();
        if applied {
            log::info!("Clock paused on {} at {}", code, slot.session.game_clock);
        }

        Ok(report(&slot, applied))
    }

    /// Stop any timer, restore both clocks to the session preset and publish
    pub async fn reset(&self, code: &SessionCode) -> Result<ClockReport> {
        let mut slot = self.store.lock(code).await?;

        slot.timer.cancel();
        let before = (slot.session.game_clock, slot.session.shot_clock);
        slot.session.reset_clocks();
        let changed = before != (slot.session.game_clock, slot.session.shot_clock);

        self.store
            .commit(CommitKind::Reset, &mut slot.session, changed);
        log::info!("Clock reset on {}", code);

        Ok(report(&slot, true))
    }

    pub async fn state(&self, code: &SessionCode) -> Result<ClockState> {
        let slot = self.store.lock(code).await?;
        Ok(state_of(&slot))
    }
}

fn state_of(slot: &SessionSlot) -> ClockState {
    if slot.timer.is_running() {
        ClockState::Running
    } else if slot.session.clocks_expired() {
        ClockState::Expired
    } else {
        ClockState::Idle
    }
}

fn report(slot: &SessionSlot, applied: bool) -> ClockReport {
    ClockReport {
        state: state_of(slot),
        applied,
        session: slot.session.clone(),
    }
}

/// Tick loop for one timer generation
async fn run_timer(store: Arc<SessionStore>, code: SessionCode, epoch: u64, period: Duration) {
    // Absolute deadlines keep lock waits from stretching the second
    let mut deadline = Instant::now() + period;

    loop {
        tokio::time::sleep_until(deadline).await;

        let Ok(mut slot) = store.lock(&code).await else {
            return;
        };
        if !slot.timer.is_current(epoch) {
            log::debug!("Stale timer {} on {} exiting", epoch, code);
            return;
        }

        let before = (slot.session.game_clock, slot.session.shot_clock);
        let running = slot.session.tick_clocks();
        let changed = before != (slot.session.game_clock, slot.session.shot_clock);
        if !running {
            slot.timer.cancel();
        }

        store.commit(CommitKind::Tick, &mut slot.session, changed);
        drop(slot);

        if !running {
            log::info!("Clock expired on {}", code);
            return;
        }
        deadline += period;
    }
}
