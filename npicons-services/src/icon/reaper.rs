// SPDX-License-Identifier: LGPL-3.0-only
//! Periodic eviction of renders nobody holds anymore.
//!
//! The reaper is a coarse polling sweep. It is scheduled whenever something
//! could become evictable (an insertion or a release) and unschedules itself
//! once no sole-owned entry is left, so an idle cache costs no timer wakeups.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::icon::store::Store;
use crate::tasks::{Scheduler, Tick};

/// Whether a recurring sweep is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaperState {
    /// No sweep scheduled.
    Idle,
    /// A recurring sweep is scheduled.
    Scheduled,
}

/// Outcome of one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries removed.
    pub evicted: usize,
    /// Surviving entries that are sole-owned and will expire later.
    pub pending: usize,
}

pub(crate) struct Reaper {
    state: Cell<ReaperState>,
    generation: Cell<u64>,
    interval: Duration,
    eviction_age: Duration,
    scheduler: Rc<dyn Scheduler>,
}

impl Reaper {
    pub(crate) fn new(scheduler: Rc<dyn Scheduler>, interval: Duration, eviction_age: Duration) -> Self {
        Self {
            state: Cell::new(ReaperState::Idle),
            generation: Cell::new(0),
            interval,
            eviction_age,
            scheduler,
        }
    }

    pub(crate) fn state(&self) -> ReaperState {
        self.state.get()
    }

    /// How long a sole-owned entry survives untouched.
    pub(crate) fn eviction_age(&self) -> Duration {
        self.eviction_age
    }

    /// Move Idle→Scheduled. `make_tick` receives the generation the new timer
    /// must present to [`Reaper::is_current`]; it is not called when a sweep is
    /// already scheduled. If the scheduler refuses the timer the reaper stays
    /// Idle and the next call retries.
    pub(crate) fn ensure_scheduled(&self, make_tick: impl FnOnce(u64) -> Tick) {
        if self.state.get() == ReaperState::Scheduled {
            return;
        }
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        self.state.set(ReaperState::Scheduled);
        log::trace!("Reaper: scheduling sweep every {:?}", self.interval);
        if let Err(e) = self
            .scheduler
            .schedule_repeating(self.interval, make_tick(generation))
        {
            log::warn!("Reaper: Could not schedule sweep, staying idle: {}", e);
            self.state.set(ReaperState::Idle);
        }
    }

    /// The timer of `generation` was dropped without ending its sweep, e.g.
    /// because its event loop went away.
    pub(crate) fn timer_lost(&self, generation: u64) {
        if self.is_current(generation) {
            log::debug!("Reaper: Sweep timer dropped, going idle");
            self.state.set(ReaperState::Idle);
        }
    }

    /// Whether the timer of `generation` is still the one in charge.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.state.get() == ReaperState::Scheduled && self.generation.get() == generation
    }

    /// Remove every expired sole-owned entry from `store`.
    pub(crate) fn sweep(&self, store: &mut Store, now: Instant) -> SweepReport {
        let mut pending = 0;
        let evicted = store.retain(|entry| {
            if entry.is_expired(now, self.eviction_age) {
                return false;
            }
            if entry.is_sole_owner() {
                pending += 1;
            }
            true
        });
        SweepReport { evicted, pending }
    }

    /// Settle the state after a sweep. Returns whether to keep ticking.
    pub(crate) fn finish_sweep(&self, report: &SweepReport) -> bool {
        if report.pending == 0 {
            log::trace!("Reaper: nothing left to expire, going idle");
            self.state.set(ReaperState::Idle);
            false
        } else {
            true
        }
    }
}
