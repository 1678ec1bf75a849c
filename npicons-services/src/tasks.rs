// SPDX-License-Identifier: LGPL-3.0-only
//! Recurring, non-blocking timers on the event loop thread.
//!
//! Nothing here sleeps: a scheduled tick is a callback that the loop runs
//! between other work, and it keeps running until it returns `false`.

use std::cell::RefCell;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// A recurring callback. Returning `false` cancels it.
pub type Tick = Box<dyn FnMut() -> bool>;

/// Errors from handing a tick to a scheduler.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The task running the scheduler's ticks is gone.
    #[error("timer driver has stopped")]
    DriverStopped,
}

/// Something that can run a [`Tick`] periodically on the current thread.
///
/// Implementations must not run or poll anything from inside
/// `schedule_repeating`: it is called from drop glue.
pub trait Scheduler {
    /// Run `tick` every `period`, starting one period from now, until it
    /// returns `false`. On error the tick has been dropped unrun.
    fn schedule_repeating(&self, period: Duration, tick: Tick) -> Result<(), TaskError>;
}

type Job = (Duration, Tick);

/// Queues ticks for a [`TimerDriver`] running on a tokio `LocalSet`.
///
/// Scheduling only sends a message, so it works from anywhere on the thread,
/// inside the event loop or not. Ticks run once the driver is polled.
///
/// ```no_run
/// use npicons_services::tasks::LocalScheduler;
///
/// let scheduler = LocalScheduler::new();
/// let local = tokio::task::LocalSet::new();
/// local.spawn_local(scheduler.driver().run());
/// ```
pub struct LocalScheduler {
    sender: RefCell<mpsc::UnboundedSender<Job>>,
    receiver: RefCell<Option<mpsc::UnboundedReceiver<Job>>>,
}

impl LocalScheduler {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender: RefCell::new(sender),
            receiver: RefCell::new(Some(receiver)),
        }
    }

    /// The task that runs this scheduler's ticks.
    ///
    /// The first call returns the driver for everything queued so far. Later
    /// calls start a fresh driver that receives every tick scheduled from
    /// then on; an earlier driver finishes the ticks it already holds.
    pub fn driver(&self) -> TimerDriver {
        let receiver = self.receiver.borrow_mut().take();
        let receiver = receiver.unwrap_or_else(|| {
            let (sender, receiver) = mpsc::unbounded_channel();
            *self.sender.borrow_mut() = sender;
            receiver
        });
        TimerDriver { receiver }
    }
}

impl Default for LocalScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for LocalScheduler {
    fn schedule_repeating(&self, period: Duration, tick: Tick) -> Result<(), TaskError> {
        self.sender
            .borrow()
            .send((period, tick))
            .map_err(|_| TaskError::DriverStopped)
    }
}

struct Timer {
    deadline: Instant,
    period: Duration,
    tick: Tick,
}

/// Runs the ticks of a [`LocalScheduler`].
///
/// Dropping the driver (or the `LocalSet` it was spawned on) drops every tick
/// it holds.
pub struct TimerDriver {
    receiver: mpsc::UnboundedReceiver<Job>,
}

impl TimerDriver {
    /// Fire ticks as they come due. Finishes once the scheduler is gone and
    /// every tick has cancelled itself.
    pub async fn run(mut self) {
        let mut timers: Vec<Timer> = Vec::new();
        let mut open = true;

        loop {
            let next = timers.iter().map(|timer| timer.deadline).min();
            if !open && next.is_none() {
                break;
            }

            tokio::select! {
                job = self.receiver.recv(), if open => match job {
                    Some((period, tick)) => timers.push(Timer {
                        deadline: Instant::now() + period,
                        period,
                        tick,
                    }),
                    None => open = false,
                },
                _ = tokio::time::sleep_until(next.unwrap_or_else(Instant::now)), if next.is_some() => {
                    let now = Instant::now();
                    timers.retain_mut(|timer| {
                        if timer.deadline > now {
                            return true;
                        }
                        // Late ticks push the schedule back instead of bursting.
                        timer.deadline = now + timer.period;
                        (timer.tick)()
                    });
                },
            }
        }
        log::trace!("TimerDriver: all ticks finished");
    }
}

/// A scheduler driven by hand.
///
/// Host loops with their own timer source call [`ManualScheduler::fire`] from
/// it; tests call it to step through ticks deterministically.
#[derive(Default)]
pub struct ManualScheduler {
    ticks: RefCell<Vec<(Duration, Tick)>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recurring ticks currently scheduled.
    pub fn pending(&self) -> usize {
        self.ticks.borrow().len()
    }

    /// Whether no tick is scheduled.
    pub fn is_idle(&self) -> bool {
        self.ticks.borrow().is_empty()
    }

    /// The shortest scheduled period, if any.
    pub fn next_period(&self) -> Option<Duration> {
        self.ticks.borrow().iter().map(|(period, _)| *period).min()
    }

    /// Run every scheduled tick once. Returns how many remain scheduled.
    pub fn fire(&self) -> usize {
        // Ticks may schedule new ticks, so run them with the list released.
        let mut due = std::mem::take(&mut *self.ticks.borrow_mut());
        due.retain_mut(|(_, tick)| tick());

        let mut ticks = self.ticks.borrow_mut();
        due.append(&mut ticks);
        *ticks = due;
        ticks.len()
    }

    /// Drop every scheduled tick without running it, as a host loop does
    /// when it shuts down.
    pub fn cancel_all(&self) {
        let cancelled = std::mem::take(&mut *self.ticks.borrow_mut());
        drop(cancelled);
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_repeating(&self, period: Duration, tick: Tick) -> Result<(), TaskError> {
        self.ticks.borrow_mut().push((period, tick));
        Ok(())
    }
}
