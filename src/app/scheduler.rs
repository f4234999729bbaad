//! Control and display tick scheduling
//!
//! A host loop owns the clock and calls `TickScheduler::poll` with the
//! current time; the scheduler decides which ticks are due. Control ticks
//! keep a fixed cadence and catch up after a stall (up to a limit), display
//! ticks simply run at most once per poll.

use std::time::Duration;

use log::{debug, trace};

/// Control ticks replayed at most per poll before the clock is resynced
const MAX_CATCH_UP: u32 = 10;

/// Something driven by the scheduler
pub trait TickHost {
    /// Control-rate work; `dt` is the control period in seconds
    fn on_control_tick(&mut self, dt: f64);

    /// Slow UI work
    fn on_display_tick(&mut self) {}
}

/// Runs control and display ticks at independent periods
#[derive(Debug, Clone)]
pub struct TickScheduler {
    control_period: Duration,
    display_period: Duration,
    next_control: Duration,
    next_display: Duration,
    /// Simulated time reached by `run_for`
    clock: Duration,
    control_ticks: u64,
    display_ticks: u64,
}

impl TickScheduler {
    pub fn new(control_period: Duration, display_period: Duration) -> Self {
        Self {
            control_period: control_period.max(Duration::from_micros(1)),
            display_period: display_period.max(Duration::from_micros(1)),
            next_control: Duration::ZERO,
            next_display: Duration::ZERO,
            clock: Duration::ZERO,
            control_ticks: 0,
            display_ticks: 0,
        }
    }

    /// Scheduler with periods given in milliseconds
    pub fn from_millis(control_ms: u64, display_ms: u64) -> Self {
        Self::new(Duration::from_millis(control_ms), Duration::from_millis(display_ms))
    }

    pub fn control_period(&self) -> Duration {
        self.control_period
    }

    pub fn display_period(&self) -> Duration {
        self.display_period
    }

    pub fn control_ticks(&self) -> u64 {
        self.control_ticks
    }

    pub fn display_ticks(&self) -> u64 {
        self.display_ticks
    }

    /// Run every tick due at `now`; returns the control ticks run
    pub fn poll<H: TickHost + ?Sized>(&mut self, now: Duration, host: &mut H) -> u32 {
        let dt = self.control_period.as_secs_f64();
        let mut ran = 0;
        while now >= self.next_control {
            if ran == MAX_CATCH_UP {
                debug!("control ticks behind at {:?}, resyncing", now);
                self.next_control = now + self.control_period;
                break;
            }
            host.on_control_tick(dt);
            self.control_ticks += 1;
            self.next_control += self.control_period;
            ran += 1;
        }

        if now >= self.next_display {
            host.on_display_tick();
            self.display_ticks += 1;
            self.next_display = now + self.display_period;
        }

        trace!("poll {:?}: {} control ticks", now, ran);
        ran
    }

    /// Drive `host` on a simulated clock for `duration`, one control
    /// period per step. Successive calls carry on from where the last one
    /// stopped.
    pub fn run_for<H: TickHost + ?Sized>(&mut self, duration: Duration, host: &mut H) {
        let end = self.clock + duration;
        let mut now = self.clock;
        while now <= end {
            self.poll(now, host);
            now += self.control_period;
        }
        self.clock = now;
    }
}
