//! Configuration for Particle Backdrop RS
//! Settings surface consumed by the particle engine; owned by the app shell.

use serde::{Deserialize, Serialize};

// ============================================================================
// Slider / clamp ranges
// ============================================================================

pub const COUNT_RANGE: (usize, usize) = (10, 120);
pub const SIZE_RANGE: (f32, f32) = (0.5, 10.0);
pub const SPEED_RANGE: (f32, f32) = (0.0, 5.0);
pub const CURSOR_RANGE_RANGE: (f32, f32) = (0.0, 400.0);
pub const CURSOR_INTERACTION_RANGE: (f32, f32) = (-5.0, 5.0);
pub const DISTANCE_RANGE: (f32, f32) = (50.0, 300.0);
pub const MAX_CONNECTIONS_RANGE: (usize, usize) = (1, 30);

// ============================================================================
// Particle Configuration
// ============================================================================

#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct ParticleConfig {
    pub enabled: bool,
    pub count: usize,
    pub min_size: f32,
    pub max_size: f32,
    pub speed: f32,
    /// Fixed particle color; ignored when `dynamic_hue` is on.
    pub color: [u8; 3],
    /// Drift all particle hues continuously instead of using `color`.
    pub dynamic_hue: bool,
    /// Radius around the pointer within which particles feel a force.
    pub cursor_range: f32,
    /// Force sign and magnitude: negative attracts, positive repels.
    pub cursor_interaction: f32,
    /// Clamp the configuration at init and auto-tune down on low FPS.
    pub safe_mode: bool,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            count: 45,
            min_size: 1.0,
            max_size: 4.0,
            speed: 1.0,
            color: [130, 190, 255],
            dynamic_hue: true,
            cursor_range: 120.0,
            cursor_interaction: 1.5,
            safe_mode: true,
        }
    }
}

impl ParticleConfig {
    /// Clamp numeric fields back into their documented ranges.
    /// `min_size > max_size` is deliberately left alone; the engine derives
    /// the sorted range at use sites.
    pub fn clamp(&mut self) {
        self.count = self.count.clamp(COUNT_RANGE.0, COUNT_RANGE.1);
        self.min_size = self.min_size.clamp(SIZE_RANGE.0, SIZE_RANGE.1);
        self.max_size = self.max_size.clamp(SIZE_RANGE.0, SIZE_RANGE.1);
        self.speed = self.speed.clamp(SPEED_RANGE.0, SPEED_RANGE.1);
        self.cursor_range = self
            .cursor_range
            .clamp(CURSOR_RANGE_RANGE.0, CURSOR_RANGE_RANGE.1);
        self.cursor_interaction = self
            .cursor_interaction
            .clamp(CURSOR_INTERACTION_RANGE.0, CURSOR_INTERACTION_RANGE.1);
    }
}

// ============================================================================
// Connection Configuration
// ============================================================================

#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct ConnectionConfig {
    /// Enable connection lines between nearby particles
    pub enabled: bool,

    /// Maximum distance for a connection
    pub max_distance: f32,

    /// Maximum connections per particle, enforced on both endpoints
    pub max_connections: usize,

    /// Line color; ignored when dynamic hue is on
    pub color: [u8; 3],

    /// Base line opacity
    pub opacity: f32,

    /// Line thickness
    pub thickness: f32,

    /// Draw curved (breathing) lines instead of straight segments
    pub curved: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_distance: 170.0,
            max_connections: 20,
            color: [90, 140, 220],
            opacity: 0.35,
            thickness: 1.0,
            curved: true,
        }
    }
}

impl ConnectionConfig {
    pub fn clamp(&mut self) {
        self.max_distance = self.max_distance.clamp(DISTANCE_RANGE.0, DISTANCE_RANGE.1);
        self.max_connections = self
            .max_connections
            .clamp(MAX_CONNECTIONS_RANGE.0, MAX_CONNECTIONS_RANGE.1);
        self.opacity = self.opacity.clamp(0.0, 1.0);
        self.thickness = self.thickness.clamp(0.5, 3.0);
    }
}

// ============================================================================
// Background
// ============================================================================

#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct BackgroundConfig {
    pub color: [u8; 3],
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self { color: [6, 10, 22] }
    }
}

// ============================================================================
// App Configuration
// ============================================================================

#[derive(Clone, PartialEq, Serialize, Deserialize, Debug, Default)]
pub struct AppConfig {
    pub particles: ParticleConfig,
    pub connections: ConnectionConfig,
    #[serde(default)]
    pub background: BackgroundConfig,
}

impl AppConfig {
    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &str) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&json)?;
        config.clamp();
        Ok(config)
    }

    pub fn clamp(&mut self) {
        self.particles.clamp();
        self.connections.clamp();
    }

    /// Get all available preset names
    pub fn preset_names() -> Vec<&'static str> {
        vec!["Default", "Calm Drift", "Dense Grid", "Minimal", "Neon Pulse"]
    }

    /// Apply a preset by name
    pub fn apply_preset(&mut self, name: &str) {
        match name {
            "Default" => self.preset_default(),
            "Calm Drift" => self.preset_calm_drift(),
            "Dense Grid" => self.preset_dense_grid(),
            "Minimal" => self.preset_minimal(),
            "Neon Pulse" => self.preset_neon_pulse(),
            _ => {}
        }
        self.clamp();
    }

    fn preset_default(&mut self) {
        *self = Self::default();
    }

    fn preset_calm_drift(&mut self) {
        self.particles.count = 30;
        self.particles.speed = 0.4;
        self.particles.min_size = 1.5;
        self.particles.max_size = 3.5;
        self.particles.dynamic_hue = false;
        self.particles.color = [150, 180, 230];
        self.particles.cursor_interaction = 0.5;
        self.connections.max_distance = 140.0;
        self.connections.max_connections = 4;
        self.connections.opacity = 0.25;
        self.connections.curved = true;
    }

    fn preset_dense_grid(&mut self) {
        self.particles.count = 100;
        self.particles.speed = 0.8;
        self.particles.min_size = 0.8;
        self.particles.max_size = 2.0;
        self.connections.max_distance = 120.0;
        self.connections.max_connections = 30;
        self.connections.opacity = 0.3;
        self.connections.curved = false;
    }

    fn preset_minimal(&mut self) {
        self.particles.count = 15;
        self.particles.speed = 0.6;
        self.particles.dynamic_hue = false;
        self.particles.color = [200, 200, 210];
        self.connections.max_distance = 200.0;
        self.connections.max_connections = 2;
        self.connections.opacity = 0.2;
        self.connections.thickness = 0.5;
    }

    fn preset_neon_pulse(&mut self) {
        self.particles.count = 60;
        self.particles.speed = 2.0;
        self.particles.min_size = 1.0;
        self.particles.max_size = 5.0;
        self.particles.dynamic_hue = true;
        self.particles.cursor_interaction = -2.0;
        self.connections.max_distance = 150.0;
        self.connections.max_connections = 8;
        self.connections.opacity = 0.5;
        self.connections.thickness = 1.5;
        self.background.color = [10, 4, 20];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_trip() {
        let mut config = AppConfig::default();
        config.particles.count = 72;
        config.connections.max_distance = 210.0;

        let json = serde_json::to_string(&config).unwrap();
        let back: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(back, config);
    }

    #[test]
    fn test_clamp_pulls_fields_into_range() {
        let mut config = AppConfig::default();
        config.particles.count = 9999;
        config.particles.speed = -3.0;
        config.connections.max_distance = 10.0;
        config.connections.max_connections = 500;

        config.clamp();

        assert_eq!(config.particles.count, COUNT_RANGE.1);
        assert_eq!(config.particles.speed, SPEED_RANGE.0);
        assert_eq!(config.connections.max_distance, DISTANCE_RANGE.0);
        assert_eq!(config.connections.max_connections, MAX_CONNECTIONS_RANGE.1);
    }

    #[test]
    fn test_clamp_keeps_inverted_size_range() {
        // min > max is tolerated here; the engine sorts the pair at use sites.
        let mut config = AppConfig::default();
        config.particles.min_size = 6.0;
        config.particles.max_size = 2.0;

        config.clamp();

        assert_eq!(config.particles.min_size, 6.0);
        assert_eq!(config.particles.max_size, 2.0);
    }

    #[test]
    fn test_every_preset_applies_clean() {
        for name in AppConfig::preset_names() {
            let mut config = AppConfig::default();
            config.apply_preset(name);

            assert!(config.particles.count >= COUNT_RANGE.0);
            assert!(config.particles.count <= COUNT_RANGE.1);
            assert!(config.connections.max_connections <= MAX_CONNECTIONS_RANGE.1);
        }
    }

    #[test]
    fn test_unknown_preset_is_a_no_op() {
        let mut config = AppConfig::default();
        config.apply_preset("Does Not Exist");
        assert_eq!(config, AppConfig::default());
    }
}
