//! Frame timing for the variable-timestep loop.
//!
//! Every tick advances the simulation by the measured wall-clock delta,
//! capped so a stall (window drag, debugger pause, machine suspend) cannot
//! produce one huge delta and a matching teleport in everything integrated
//! against it. No fixed step, no accumulator; speed is consistent in real
//! time but not bit-identical across frame rates.

use std::time::Instant;

/// Longest delta the simulation will accept, in seconds.
pub const MAX_FRAME_DT: f64 = 0.25;

const FPS_WINDOW: usize = 60;

pub struct FrameClock {
    last_tick: Option<Instant>,
    frame_count: u64,
    samples: [f64; FPS_WINDOW],
    sample_cursor: usize,
    sample_len: usize,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last_tick: None,
            frame_count: 0,
            samples: [0.0; FPS_WINDOW],
            sample_cursor: 0,
            sample_len: 0,
        }
    }

    /// Measure the time since the previous tick and return the clamped
    /// delta in seconds. The first tick reports zero.
    pub fn begin_frame(&mut self) -> f32 {
        let now = Instant::now();
        let raw = match self.last_tick {
            Some(prev) => now.duration_since(prev).as_secs_f64(),
            None => 0.0,
        };
        self.last_tick = Some(now);
        self.advance(raw)
    }

    /// Clock bookkeeping with the measurement injected, so tests can drive
    /// it without sleeping.
    pub fn advance(&mut self, raw_dt: f64) -> f32 {
        let dt = if raw_dt > MAX_FRAME_DT {
            log::warn!(
                "Frame took {:.1}ms; clamping dt to {:.0}ms",
                raw_dt * 1000.0,
                MAX_FRAME_DT * 1000.0
            );
            MAX_FRAME_DT
        } else {
            raw_dt.max(0.0)
        };
        self.frame_count += 1;
        self.samples[self.sample_cursor] = dt;
        self.sample_cursor = (self.sample_cursor + 1) % FPS_WINDOW;
        self.sample_len = (self.sample_len + 1).min(FPS_WINDOW);
        dt as f32
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Average frame time over the sample window, in seconds.
    pub fn average_frame_time(&self) -> f64 {
        if self.sample_len == 0 {
            return 0.0;
        }
        self.samples[..self.sample_len].iter().sum::<f64>() / self.sample_len as f64
    }

    /// Smoothed frames-per-second over the sample window.
    pub fn fps(&self) -> f64 {
        let avg = self.average_frame_time();
        if avg > 0.0 {
            1.0 / avg
        } else {
            0.0
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_passes_ordinary_deltas_through() {
        let mut clock = FrameClock::new();
        let dt = clock.advance(1.0 / 60.0);
        assert!((f64::from(dt) - 1.0 / 60.0).abs() < 1e-6);
        assert_eq!(clock.frame_count(), 1);
    }

    #[test]
    fn test_advance_clamps_stall_deltas() {
        let mut clock = FrameClock::new();
        let dt = clock.advance(3.0);
        assert!((f64::from(dt) - MAX_FRAME_DT).abs() < 1e-9);
    }

    #[test]
    fn test_advance_floors_negative_deltas_at_zero() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.advance(-0.5), 0.0);
    }

    #[test]
    fn test_fps_averages_the_sample_window() {
        let mut clock = FrameClock::new();
        for _ in 0..10 {
            clock.advance(0.02);
        }
        assert!((clock.fps() - 50.0).abs() < 1e-6);
        assert!((clock.average_frame_time() - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_first_begin_frame_reports_zero() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.begin_frame(), 0.0);
    }
}
