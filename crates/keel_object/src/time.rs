//! Deterministic time system
//!
//! Fixed 60Hz tick rate; one tick is one Update + PostUpdate pair.

use std::time::Duration;

/// Fixed simulation tick rate (60 Hz = 16.666ms per tick)
pub const TICK_RATE_HZ: u32 = 60;
pub const TICK_DURATION: Duration = Duration::from_micros(1_000_000 / TICK_RATE_HZ as u64);

/// Per-tick context handed to component update callbacks.
#[derive(Debug, Clone, Copy)]
pub struct UpdateContext {
    /// Delta time for this tick, in seconds.
    pub dt: f32,
}

impl UpdateContext {
    pub fn new(dt: f32) -> Self {
        Self { dt }
    }

    /// Context for one fixed-rate tick.
    pub fn fixed() -> Self {
        Self {
            dt: TICK_DURATION.as_secs_f32(),
        }
    }
}

/// Simulation time tracker
pub struct SimulationTime {
    tick_count: u64,
    accumulated_time: Duration,
}

impl SimulationTime {
    pub fn new() -> Self {
        Self {
            tick_count: 0,
            accumulated_time: Duration::ZERO,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn advance_tick(&mut self) {
        self.tick_count += 1;
        self.accumulated_time += TICK_DURATION;
    }

    pub fn total_time(&self) -> Duration {
        self.accumulated_time
    }
}

impl Default for SimulationTime {
    fn default() -> Self {
        Self::new()
    }
}
