use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Countdown granularity
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Source of the current time for the countdown
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Clone, Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.offset.get()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerId(u64);

#[derive(Clone, Copy, Debug)]
struct TickTimer {
    id: TimerId,
    next_due: Instant,
}

/// Holds at most one repeating tick timer.
///
/// Every arm hands out a fresh [`TimerId`]; a firing is only honoured when it
/// carries the id of the timer currently armed, so a timer cancelled along
/// with an old session can never reach the next one.
#[derive(Debug)]
pub struct TimerSlot {
    period: Duration,
    armed: Option<TickTimer>,
    next_id: u64,
}

impl TimerSlot {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            armed: None,
            next_id: 0,
        }
    }

    /// Arms a new timer whose first tick is one period after `now`,
    /// replacing any timer already armed.
    pub fn arm(&mut self, now: Instant) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.armed = Some(TickTimer {
            id,
            next_due: now + self.period,
        });
        id
    }

    pub fn cancel(&mut self) -> Option<TimerId> {
        self.armed.take().map(|t| t.id)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn armed_id(&self) -> Option<TimerId> {
        self.armed.map(|t| t.id)
    }

    pub fn accepts(&self, id: TimerId) -> bool {
        self.armed_id() == Some(id)
    }

    /// Returns the armed timer's id if a tick is due at `now` and schedules
    /// the following one. Call repeatedly to drain ticks that piled up.
    pub fn poll(&mut self, now: Instant) -> Option<TimerId> {
        let period = self.period;
        let timer = self.armed.as_mut()?;
        if now < timer.next_due {
            return None;
        }
        timer.next_due += period;
        Some(timer.id)
    }
}

impl Default for TimerSlot {
    fn default() -> Self {
        Self::new(TICK_PERIOD)
    }
}
