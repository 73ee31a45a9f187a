//! Frame-rate monitoring and downward auto-tuning.
//!
//! The monitor accumulates instantaneous FPS over fixed 30-frame windows.
//! At each window boundary the average is handed to the tuner, which (in safe
//! mode, below the FPS threshold) multiplicatively decays the effective
//! simulation parameters. Values only ever go down; a full reinitialization
//! is the only way back up.

use crate::config::{ConnectionConfig, ParticleConfig};

/// Frames per averaging window.
pub const FPS_WINDOW: u32 = 30;

/// Window averages below this trigger a downward adjustment.
pub const LOW_FPS_THRESHOLD: f32 = 45.0;

// Safe-mode initial clamps.
pub const SAFE_MAX_PARTICLES: usize = 90;
pub const SAFE_MAX_DISTANCE: f32 = 250.0;
pub const SAFE_MAX_CONNECTIONS: usize = 20;

// Decay factors and hard floors for the tuner. Decay arithmetic runs in f64:
// 170 * 0.9 floors to 153 in f64 but to 152 in f32.
const COUNT_DECAY: f64 = 0.85;
const DISTANCE_DECAY: f64 = 0.90;
const CONNECTION_DECAY: f64 = 0.90;
pub const MIN_PARTICLES: usize = 20;
pub const MIN_DISTANCE: f32 = 100.0;
pub const MIN_CONNECTIONS: usize = 8;

/// Rolling FPS accumulator over fixed-size windows of frames.
#[derive(Debug, Default)]
pub struct FpsMonitor {
    sum: f32,
    frames: u32,
}

impl FpsMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one frame delta. Returns the window average when the 30th sample
    /// lands, resetting the accumulator.
    pub fn sample(&mut self, delta_ms: f32) -> Option<f32> {
        self.sum += 1000.0 / delta_ms.max(1.0);
        self.frames += 1;

        if self.frames >= FPS_WINDOW {
            let average = self.sum / self.frames as f32;
            self.sum = 0.0;
            self.frames = 0;
            Some(average)
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.sum = 0.0;
        self.frames = 0;
    }
}

/// The currently active simulation parameters, as opposed to the user's
/// configured values. Starts at the (safe-mode clamped) settings and is only
/// adjusted downward by [`EffectiveConfig::tune_down`].
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct EffectiveConfig {
    pub particle_count: usize,
    pub connection_distance: f32,
    pub max_connections: usize,
}

impl EffectiveConfig {
    /// Derive the starting effective values from the settings surface.
    pub fn from_settings(particles: &ParticleConfig, connections: &ConnectionConfig) -> Self {
        if particles.safe_mode {
            Self {
                particle_count: particles.count.min(SAFE_MAX_PARTICLES),
                connection_distance: connections.max_distance.min(SAFE_MAX_DISTANCE),
                max_connections: connections.max_connections.min(SAFE_MAX_CONNECTIONS),
            }
        } else {
            Self {
                particle_count: particles.count,
                connection_distance: connections.max_distance,
                max_connections: connections.max_connections,
            }
        }
    }

    /// One multiplicative decay step, floored so the simulation never
    /// collapses to nothing.
    pub fn tune_down(&mut self) {
        self.particle_count =
            (((self.particle_count as f64) * COUNT_DECAY).floor() as usize).max(MIN_PARTICLES);
        self.connection_distance = (((self.connection_distance as f64) * DISTANCE_DECAY).floor()
            as f32)
            .max(MIN_DISTANCE);
        self.max_connections =
            (((self.max_connections as f64) * CONNECTION_DECAY).floor() as usize)
                .max(MIN_CONNECTIONS);
    }
}

/// Reported upward once per window when the tuner lowers the effective values.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct AutoTuneEvent {
    pub effective: EffectiveConfig,
    pub avg_fps: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(count: usize, distance: f32, connections: usize, safe: bool) -> EffectiveConfig {
        let particles = ParticleConfig {
            count,
            safe_mode: safe,
            ..Default::default()
        };
        let conn = ConnectionConfig {
            max_distance: distance,
            max_connections: connections,
            ..Default::default()
        };
        EffectiveConfig::from_settings(&particles, &conn)
    }

    #[test]
    fn test_window_emits_on_thirtieth_sample() {
        let mut monitor = FpsMonitor::new();

        // 60 fps frames: 16.666ms each
        for _ in 0..29 {
            assert_eq!(monitor.sample(1000.0 / 60.0), None);
        }
        let avg = monitor.sample(1000.0 / 60.0).expect("window boundary");
        assert!((avg - 60.0).abs() < 0.01);

        // Accumulator reset: next window starts from scratch
        for _ in 0..29 {
            assert_eq!(monitor.sample(1000.0 / 30.0), None);
        }
        let avg = monitor.sample(1000.0 / 30.0).unwrap();
        assert!((avg - 30.0).abs() < 0.01);
    }

    #[test]
    fn test_tiny_deltas_are_floored_to_one_ms() {
        let mut monitor = FpsMonitor::new();
        for _ in 0..29 {
            monitor.sample(0.0);
        }
        // 1000 / max(1, 0) = 1000 fps per sample
        let avg = monitor.sample(0.0).unwrap();
        assert!((avg - 1000.0).abs() < 0.01);
    }

    #[test]
    fn test_safe_mode_clamps_at_derivation() {
        let eff = settings(120, 300.0, 30, true);
        assert_eq!(eff.particle_count, SAFE_MAX_PARTICLES);
        assert_eq!(eff.connection_distance, SAFE_MAX_DISTANCE);
        assert_eq!(eff.max_connections, SAFE_MAX_CONNECTIONS);

        let raw = settings(120, 300.0, 30, false);
        assert_eq!(raw.particle_count, 120);
        assert_eq!(raw.connection_distance, 300.0);
        assert_eq!(raw.max_connections, 30);
    }

    #[test]
    fn test_tune_down_matches_decay_arithmetic() {
        let mut eff = settings(45, 170.0, 20, true);
        eff.tune_down();

        assert_eq!(eff.particle_count, 38); // floor(45 * 0.85)
        assert_eq!(eff.connection_distance, 153.0); // floor(170 * 0.90)
        assert_eq!(eff.max_connections, 18); // floor(20 * 0.90)
    }

    #[test]
    fn test_tune_down_is_monotonic_and_floored() {
        let mut eff = settings(90, 250.0, 20, true);
        let mut previous = eff;

        for _ in 0..50 {
            eff.tune_down();
            assert!(eff.particle_count <= previous.particle_count);
            assert!(eff.connection_distance <= previous.connection_distance);
            assert!(eff.max_connections <= previous.max_connections);
            previous = eff;
        }

        assert_eq!(eff.particle_count, MIN_PARTICLES);
        assert_eq!(eff.connection_distance, MIN_DISTANCE);
        assert_eq!(eff.max_connections, MIN_CONNECTIONS);
    }
}
