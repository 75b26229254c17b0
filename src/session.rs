use rand::RngCore;
use std::collections::VecDeque;

use crate::corpus::Corpus;
use crate::metrics::{self, FinalReport, LiveMetrics};
use crate::store::{self, KvStore, BEST_WPM_KEY};
use crate::timer::{Clock, TimerId, TimerSlot};

/// Durations offered to the user, in seconds
pub const ALLOWED_DURATIONS: [u32; 4] = [15, 30, 60, 120];
pub const DEFAULT_DURATION: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Phase {
    Idle,
    Ready,
    Running,
    Ended,
}

/// One attempt at the test, from configuration to end
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub phase: Phase,
    pub reference_text: String,
    pub typed_text: String,
    pub duration_total: u32,
    pub duration_remaining: u32,
}

impl Session {
    pub fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            reference_text: String::new(),
            typed_text: String::new(),
            duration_total: 0,
            duration_remaining: 0,
        }
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.duration_total.saturating_sub(self.duration_remaining)
    }

    /// Fraction of the countdown used so far, 0.0 to 1.0
    pub fn progress(&self) -> f64 {
        match self.duration_total {
            0 if self.phase == Phase::Ended => 1.0,
            0 => 0.0,
            total => self.elapsed_secs() as f64 / total as f64,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.typed_text == self.reference_text
    }
}

/// Notifications for whatever is displaying the session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A fresh session is ready; configuration is open and input is closed
    Reset,
    /// Input is open and configuration is locked
    Started,
    Live(LiveMetrics),
    Progress(f64),
    /// Input is closed and configuration is open again
    Ended(FinalReport),
    NewBest(u32),
}

/// Everything the display needs for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub phase: Phase,
    pub reference_text: String,
    pub typed_text: String,
    pub duration_total: u32,
    pub duration_remaining: u32,
    pub accuracy: u32,
    pub wpm: u32,
    pub best_wpm: u32,
    pub progress: f64,
}

/// Drives a [`Session`] through its lifecycle and owns its countdown.
pub struct SessionController {
    session: Session,
    corpus: Corpus,
    store: Box<dyn KvStore>,
    rng: Box<dyn RngCore>,
    clock: Box<dyn Clock>,
    timer: TimerSlot,
    live: LiveMetrics,
    best_wpm: u32,
    events: VecDeque<SessionEvent>,
}

impl SessionController {
    /// Builds an idle controller. The best score is read from `store` here and
    /// only written back when a session beats it.
    pub fn new(
        corpus: Corpus,
        store: Box<dyn KvStore>,
        rng: Box<dyn RngCore>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let best_wpm = store::load_best_wpm(store.as_ref());
        log::debug!("loaded best wpm {best_wpm}");

        Self {
            session: Session::idle(),
            corpus,
            store,
            rng,
            clock,
            timer: TimerSlot::default(),
            live: LiveMetrics::default(),
            best_wpm,
            events: VecDeque::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    pub fn best_wpm(&self) -> u32 {
        self.best_wpm
    }

    pub fn live(&self) -> LiveMetrics {
        self.live
    }

    pub fn is_ticking(&self) -> bool {
        self.timer.is_armed()
    }

    pub fn armed_timer(&self) -> Option<TimerId> {
        self.timer.armed_id()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.session.phase,
            reference_text: self.session.reference_text.clone(),
            typed_text: self.session.typed_text.clone(),
            duration_total: self.session.duration_total,
            duration_remaining: self.session.duration_remaining,
            accuracy: self.live.accuracy,
            wpm: self.live.wpm,
            best_wpm: self.best_wpm,
            progress: self.session.progress(),
        }
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain(..).collect()
    }

    /// Discards the current session and prepares a new one with a freshly
    /// drawn passage.
    pub fn configure(&mut self, duration_total: u32) {
        if let Some(id) = self.timer.cancel() {
            log::debug!("cancelled tick timer {id:?}");
        }

        let reference_text = self.corpus.pick(&mut *self.rng).to_string();
        self.session = Session {
            phase: Phase::Ready,
            reference_text,
            typed_text: String::new(),
            duration_total,
            duration_remaining: duration_total,
        };
        self.live = LiveMetrics::default();

        log::debug!("session ready: {duration_total}s");
        self.events.push_back(SessionEvent::Reset);
    }

    /// Same as [`configure`](Self::configure) with the current duration.
    pub fn restart(&mut self) {
        if self.session.phase == Phase::Idle {
            log::warn!("restart ignored: no duration configured yet");
            return;
        }
        self.configure(self.session.duration_total);
    }

    /// Opens input. The countdown waits for the first keystroke.
    pub fn start(&mut self) {
        match self.session.phase {
            Phase::Ready => {
                self.session.phase = Phase::Running;
                log::debug!("session running");
                self.events.push_back(SessionEvent::Started);
            }
            Phase::Idle => log::warn!("start ignored: configure a session first"),
            Phase::Running | Phase::Ended => {}
        }
    }

    /// Takes the full current input. Returns live metrics while running.
    pub fn on_input_changed(&mut self, typed_text: &str) -> Option<LiveMetrics> {
        self.session.typed_text = typed_text.to_string();

        if self.session.phase != Phase::Running {
            return None;
        }

        if !self.timer.is_armed() {
            let id = self.timer.arm(self.clock.now());
            log::debug!("armed tick timer {id:?}");
        }

        let live = metrics::compute_live(
            &self.session.reference_text,
            &self.session.typed_text,
            self.session.elapsed_secs(),
        );
        self.live = live;
        self.events.push_back(SessionEvent::Live(live));

        if self.session.is_complete() {
            self.end();
        }

        Some(live)
    }

    /// One second of countdown. Does nothing unless running with the
    /// countdown armed.
    pub fn on_tick(&mut self) {
        if self.session.phase != Phase::Running || !self.timer.is_armed() {
            return;
        }

        self.session.duration_remaining = self.session.duration_remaining.saturating_sub(1);
        self.events
            .push_back(SessionEvent::Progress(self.session.progress()));

        if self.session.duration_remaining == 0 {
            self.end();
        }
    }

    /// Delivers a tick from a specific timer; ticks from a cancelled timer
    /// are dropped.
    pub fn on_timer_fired(&mut self, id: TimerId) {
        if !self.timer.accepts(id) {
            log::debug!("dropped tick from stale timer {id:?}");
            return;
        }
        self.on_tick();
    }

    /// Fires every tick that has come due. Returns how many fired.
    pub fn poll_timer(&mut self) -> usize {
        let mut fired = 0;
        while let Some(id) = self.timer.poll(self.clock.now()) {
            self.on_timer_fired(id);
            fired += 1;
        }
        fired
    }

    fn end(&mut self) {
        self.timer.cancel();
        self.session.phase = Phase::Ended;

        let elapsed = metrics::effective_elapsed_secs(
            self.session.duration_total,
            self.session.duration_remaining,
        );
        let report = metrics::compute_final(
            &self.session.reference_text,
            &self.session.typed_text,
            elapsed,
        );
        self.live.wpm = report.wpm;

        log::debug!(
            "session ended: {} wpm, {}% over {}s",
            report.wpm,
            report.accuracy,
            report.elapsed_secs
        );
        self.events.push_back(SessionEvent::Ended(report));

        if report.wpm > self.best_wpm {
            self.best_wpm = report.wpm;
            log::info!("new best: {} wpm", report.wpm);
            if let Err(e) = self.store.set(BEST_WPM_KEY, &report.wpm.to_string()) {
                log::warn!("unable to persist best wpm: {e}");
            }
            self.events.push_back(SessionEvent::NewBest(report.wpm));
        }
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("session", &self.session)
            .field("timer", &self.timer)
            .field("live", &self.live)
            .field("best_wpm", &self.best_wpm)
            .finish_non_exhaustive()
    }
}
