//! Particle engine for Particle Backdrop RS
//! Constellation-style particles with pointer forces, quota-bounded
//! connection lines, and downward auto-tuning on sustained low FPS.

use crate::config::{ConnectionConfig, ParticleConfig};
use crate::perf::{AutoTuneEvent, EffectiveConfig, FpsMonitor, LOW_FPS_THRESHOLD};
use egui::ecolor::Hsva;
use egui::epaint::QuadraticBezierShape;
use egui::{Color32, Painter, Rect, Stroke, Vec2};
use rand::Rng;
use rayon::prelude::*;
use std::collections::HashMap;
use std::f32::consts::TAU;

/// Per-component velocity cap, as a multiple of the configured speed.
pub const MAX_SPEED_FACTOR: f32 = 2.0;

const POINTER_FORCE_SCALE: f32 = 0.1;
const ORBIT_SCALE: f32 = 0.1;
/// Chance per frame that one random particle is regenerated in place.
const RESPAWN_PROBABILITY: f64 = 0.01;
const HUE_DRIFT_PER_FRAME: f32 = 0.0008;
const HUE_SPREAD: f32 = 0.15;
const MIN_LINK_ALPHA: f32 = 0.05;
const CURVE_AMPLITUDE: f32 = 0.12;

/// Individual particle data
#[derive(Clone, Debug)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: f32,
    /// Per-particle hue offset in [0,1), combined with the engine hue shift.
    pub hue: f32,
    pub angle: f32,
    pub orbit_speed: f32,
    pub orbit_radius: f32,
}

impl Particle {
    /// Spawn at a random position and roll the rest of the state.
    pub fn spawn(width: f32, height: f32, config: &ParticleConfig, rng: &mut impl Rng) -> Self {
        let mut p = Self {
            pos: Vec2::new(rng.gen_range(0.0..width), rng.gen_range(0.0..height)),
            vel: Vec2::ZERO,
            size: 1.0,
            hue: 0.0,
            angle: 0.0,
            orbit_speed: 0.0,
            orbit_radius: 0.0,
        };
        p.reset(config, rng);
        p
    }

    /// Re-roll velocity, size, hue, and orbit. Position is kept, so a live
    /// particle can be regenerated in place without visual popping.
    pub fn reset(&mut self, config: &ParticleConfig, rng: &mut impl Rng) {
        // Tolerate an inverted min/max pair from the settings surface.
        let min_size = config.min_size.min(config.max_size);
        let max_size = config.min_size.max(config.max_size);

        self.vel = Vec2::new(
            (rng.gen::<f32>() - 0.5) * config.speed,
            (rng.gen::<f32>() - 0.5) * config.speed,
        );
        self.size = rng.gen_range(min_size..=max_size);
        self.hue = rng.gen::<f32>();
        self.angle = rng.gen_range(0.0..TAU);
        self.orbit_speed = rng.gen_range(-0.02..0.02);
        self.orbit_radius = rng.gen_range(0.3..2.0);
    }

    /// Advance one frame: pointer force, speed limit, orbital wobble, linear
    /// motion, boundary bounce.
    pub fn update(
        &mut self,
        pointer: Option<Vec2>,
        config: &ParticleConfig,
        width: f32,
        height: f32,
    ) {
        // -- POINTER FORCE --
        // Negative interaction pulls toward the cursor, positive pushes away.
        if let Some(cursor) = pointer {
            let away = self.pos - cursor;
            let dist = away.length();
            if dist > 0.0 && dist < config.cursor_range {
                let falloff = 1.0 - dist / config.cursor_range;
                self.vel +=
                    (away / dist) * config.cursor_interaction * falloff * POINTER_FORCE_SCALE;
            }
        }

        // -- SPEED LIMIT --
        let max_speed = config.speed * MAX_SPEED_FACTOR;
        self.vel.x = self.vel.x.clamp(-max_speed, max_speed);
        self.vel.y = self.vel.y.clamp(-max_speed, max_speed);

        // -- ORBITAL WOBBLE --
        self.angle += self.orbit_speed;
        self.pos += Vec2::angled(self.angle) * self.orbit_radius * ORBIT_SCALE;

        // -- LINEAR MOTION --
        self.pos += self.vel;

        // -- BOUNCE --
        // Sign flip only; the position may sit slightly outside for a frame.
        if self.pos.x < 0.0 || self.pos.x > width {
            self.vel.x = -self.vel.x;
        }
        if self.pos.y < 0.0 || self.pos.y > height {
            self.vel.y = -self.vel.y;
        }
    }
}

/// Connection between two particles for the current frame
#[derive(Clone, Copy, Debug)]
pub struct Connection {
    pub a: usize,
    pub b: usize,
    /// 1.0 at zero distance, 0.0 at the connection distance.
    pub strength: f32,
}

pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<usize>>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(1.0),
            cells: HashMap::new(),
        }
    }

    pub fn clear(&mut self) {
        for cell in self.cells.values_mut() {
            cell.clear();
        }
    }

    pub fn insert(&mut self, index: usize, pos: Vec2) {
        let cell = (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        );
        self.cells.entry(cell).or_default().push(index);
    }

    pub fn query_radius(&self, pos: Vec2, radius: f32) -> Vec<usize> {
        let mut neighbors = Vec::new();
        let cell_x = (pos.x / self.cell_size).floor() as i32;
        let cell_y = (pos.y / self.cell_size).floor() as i32;
        let search_range = (radius / self.cell_size).ceil() as i32;

        for dx in -search_range..=search_range {
            for dy in -search_range..=search_range {
                if let Some(indices) = self.cells.get(&(cell_x + dx, cell_y + dy)) {
                    neighbors.extend_from_slice(indices);
                }
            }
        }
        neighbors
    }
}

/// Particle engine: owns the particle collection, the per-frame connection
/// cache, and all simulation-global state (hue shift, elapsed time, FPS
/// window, effective configuration).
pub struct ParticleEngine {
    pub particles: Vec<Particle>,
    pub width: f32,
    pub height: f32,
    /// Currently active (possibly auto-tuned-down) parameters.
    pub effective: EffectiveConfig,
    /// Connections recomputed every frame; indices into `particles`.
    pub connections: Vec<Connection>,

    fps: FpsMonitor,
    spatial_grid: SpatialGrid,
    time: f32,
    hue_shift: f32,
}

impl ParticleEngine {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            particles: Vec::new(),
            width,
            height,
            effective: EffectiveConfig::from_settings(
                &ParticleConfig::default(),
                &ConnectionConfig::default(),
            ),
            connections: Vec::new(),
            fps: FpsMonitor::new(),
            spatial_grid: SpatialGrid::new(170.0),
            time: 0.0,
            hue_shift: 0.0,
        }
    }

    /// Full teardown/rebuild: recompute the effective configuration from the
    /// settings (clamped when safe mode is on) and spawn a fresh population.
    /// Runs on mount, on resize, and whenever a tunable setting changes.
    pub fn reinitialize(&mut self, particles: &ParticleConfig, connections: &ConnectionConfig) {
        self.effective = EffectiveConfig::from_settings(particles, connections);
        self.particles.clear();
        self.connections.clear();
        self.fps.reset();

        // Surface not laid out yet: skip silently, retry on the next rebuild.
        if self.width < 1.0 || self.height < 1.0 || !particles.enabled {
            return;
        }

        let mut rng = rand::thread_rng();
        for _ in 0..self.effective.particle_count {
            self.particles
                .push(Particle::spawn(self.width, self.height, particles, &mut rng));
        }
    }

    /// Advance the simulation by one frame. Returns an event when the
    /// auto-tuner lowered the effective configuration this tick (at most once
    /// per FPS window, and only in safe mode).
    pub fn update(
        &mut self,
        config: &ParticleConfig,
        pointer: Option<Vec2>,
        dt: f32,
    ) -> Option<AutoTuneEvent> {
        if !config.enabled {
            self.particles.clear();
            self.connections.clear();
            return None;
        }

        self.time += dt;

        // -- GLOBAL HUE DRIFT --
        if config.dynamic_hue {
            self.hue_shift = (self.hue_shift + HUE_DRIFT_PER_FRAME).fract();
        }

        // -- KINEMATICS --
        let (width, height) = (self.width, self.height);
        self.particles
            .par_iter_mut()
            .for_each(|p| p.update(pointer, config, width, height));

        // -- STOCHASTIC RESPAWN --
        let mut rng = rand::thread_rng();
        if !self.particles.is_empty() && rng.gen_bool(RESPAWN_PROBABILITY) {
            let idx = rng.gen_range(0..self.particles.len());
            self.particles[idx].reset(config, &mut rng);
        }

        // -- CONNECTION PASS --
        self.rebuild_connections();

        // -- PERFORMANCE SAMPLE + AUTO-TUNE --
        if let Some(avg_fps) = self.fps.sample(dt * 1000.0) {
            if config.safe_mode && avg_fps < LOW_FPS_THRESHOLD {
                let before = self.effective;
                self.effective.tune_down();
                if self.particles.len() > self.effective.particle_count {
                    self.particles.truncate(self.effective.particle_count);
                }
                // Report only an actual adjustment; at the floors the decay
                // is fully absorbed and there is nothing to announce.
                if self.effective != before {
                    return Some(AutoTuneEvent {
                        effective: self.effective,
                        avg_fps,
                    });
                }
            }
        }

        None
    }

    /// Rebuild the spatial grid with the current particles and recompute the
    /// per-frame connection cache.
    pub fn rebuild_connections(&mut self) {
        let cell_size = self.effective.connection_distance.max(1.0);
        // Tolerance avoids thrashing the grid while the tuner walks distance down.
        if (self.spatial_grid.cell_size - cell_size).abs() > 5.0 {
            self.spatial_grid = SpatialGrid::new(cell_size);
        }

        self.spatial_grid.clear();
        for (i, p) in self.particles.iter().enumerate() {
            self.spatial_grid.insert(i, p.pos);
        }

        self.connections = self.find_connections();
    }

    /// Quota-bounded distance join. Each pair is considered once (`j > i`);
    /// an accepted edge charges both endpoints' quotas, so the per-particle
    /// degree cap holds symmetrically.
    pub fn find_connections(&self) -> Vec<Connection> {
        let max_connections = self.effective.max_connections;
        let max_dist = self.effective.connection_distance;
        if max_connections == 0 || max_dist <= 0.0 {
            return Vec::new();
        }
        let max_dist_sq = max_dist * max_dist;

        let mut degrees = vec![0usize; self.particles.len()];
        let mut connections = Vec::new();

        for (i, p) in self.particles.iter().enumerate() {
            if degrees[i] >= max_connections {
                continue;
            }

            let neighbors = self.spatial_grid.query_radius(p.pos, max_dist);
            for &j in &neighbors {
                if j <= i {
                    continue;
                }
                if degrees[i] >= max_connections {
                    break;
                }
                if degrees[j] >= max_connections {
                    continue;
                }

                let dist_sq = (p.pos - self.particles[j].pos).length_sq();
                if dist_sq < max_dist_sq {
                    let strength = 1.0 - dist_sq.sqrt() / max_dist;
                    connections.push(Connection { a: i, b: j, strength });
                    degrees[i] += 1;
                    degrees[j] += 1;
                }
            }
        }

        connections
    }

    /// Render connections then particles to the egui painter.
    pub fn render(
        &self,
        painter: &Painter,
        rect: Rect,
        particles: &ParticleConfig,
        connections: &ConnectionConfig,
    ) {
        if !particles.enabled {
            return;
        }

        if connections.enabled {
            self.render_connections(painter, rect, connections, particles.dynamic_hue);
        }

        for p in &self.particles {
            let pos = rect.min + p.pos;
            let color = self.particle_color(p, particles);
            // Soft halo under the core circle
            painter.circle_filled(pos, p.size * 1.6, color.gamma_multiply(0.25));
            painter.circle_filled(pos, p.size, color);
        }
    }

    fn particle_color(&self, p: &Particle, config: &ParticleConfig) -> Color32 {
        if config.dynamic_hue {
            let hue = (self.hue_shift + p.hue * HUE_SPREAD).fract();
            Color32::from(Hsva::new(hue, 0.6, 1.0, 1.0))
        } else {
            Color32::from_rgb(config.color[0], config.color[1], config.color[2])
        }
    }

    fn render_connections(
        &self,
        painter: &Painter,
        rect: Rect,
        config: &ConnectionConfig,
        dynamic_hue: bool,
    ) {
        for conn in &self.connections {
            // Indices can be stale for one frame right after a truncation.
            if conn.a >= self.particles.len() || conn.b >= self.particles.len() {
                continue;
            }

            let pa = &self.particles[conn.a];
            let pb = &self.particles[conn.b];
            let a = rect.min + pa.pos;
            let b = rect.min + pb.pos;

            // Opacity decays linearly with distance, floored so long links
            // stay faintly visible.
            let alpha = conn.strength.max(MIN_LINK_ALPHA) * config.opacity;
            let color = if dynamic_hue {
                Color32::from(Hsva::new(self.hue_shift, 0.55, 0.9, alpha))
            } else {
                Color32::from_rgba_unmultiplied(
                    config.color[0],
                    config.color[1],
                    config.color[2],
                    (alpha * 255.0) as u8,
                )
            };
            let stroke = Stroke::new(config.thickness, color);

            if config.curved {
                let dist = (pb.pos - pa.pos).length();
                let mid = a.lerp(b, 0.5);
                let normal = if dist > 0.0 {
                    Vec2::new(-(b.y - a.y), b.x - a.x) / dist
                } else {
                    Vec2::ZERO
                };
                // Breathing offset: phase follows elapsed time and pair distance
                let wave = (self.time * 1.5 + dist * 0.05).sin() * dist * CURVE_AMPLITUDE;
                painter.add(QuadraticBezierShape {
                    points: [a, mid + normal * wave, b],
                    closed: false,
                    fill: Color32::TRANSPARENT,
                    stroke,
                });
            } else {
                painter.line_segment([a, b], stroke);
            }
        }
    }

    /// Elapsed simulation time in seconds.
    pub fn elapsed(&self) -> f32 {
        self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionConfig;

    fn fixed_config() -> ParticleConfig {
        ParticleConfig {
            dynamic_hue: false,
            ..Default::default()
        }
    }

    fn particle_at(x: f32, y: f32) -> Particle {
        Particle {
            pos: Vec2::new(x, y),
            vel: Vec2::ZERO,
            size: 2.0,
            hue: 0.0,
            angle: 0.0,
            orbit_speed: 0.0,
            orbit_radius: 0.0,
        }
    }

    fn cluster_engine(positions: &[(f32, f32)], distance: f32, max_connections: usize) -> ParticleEngine {
        let mut engine = ParticleEngine::new(400.0, 400.0);
        engine.particles = positions.iter().map(|&(x, y)| particle_at(x, y)).collect();
        engine.effective = EffectiveConfig {
            particle_count: positions.len(),
            connection_distance: distance,
            max_connections,
        };
        engine.rebuild_connections();
        engine
    }

    #[test]
    fn test_bounce_flips_velocity_sign() {
        let config = fixed_config();

        let mut p = particle_at(201.0, 100.0);
        p.vel = Vec2::new(1.0, 0.0);
        p.update(None, &config, 200.0, 200.0);
        assert!(p.vel.x < 0.0);

        let mut p = particle_at(100.0, -1.0);
        p.vel = Vec2::new(0.0, -1.0);
        p.update(None, &config, 200.0, 200.0);
        assert!(p.vel.y > 0.0);
    }

    #[test]
    fn test_velocity_stays_within_speed_limit() {
        let config = fixed_config();
        let max_speed = config.speed * MAX_SPEED_FACTOR;

        let mut p = particle_at(100.0, 100.0);
        p.vel = Vec2::new(100.0, -100.0);
        p.update(None, &config, 200.0, 200.0);

        assert!(p.vel.x.abs() <= max_speed);
        assert!(p.vel.y.abs() <= max_speed);
    }

    #[test]
    fn test_pointer_attraction_moves_particle_closer() {
        let mut config = fixed_config();
        config.cursor_range = 80.0;
        config.cursor_interaction = -2.0; // attract

        let cursor = Vec2::new(110.0, 100.0);
        let mut p = particle_at(100.0, 100.0);
        let before = (p.pos - cursor).length();
        assert_eq!(before, 10.0);

        p.update(Some(cursor), &config, 1000.0, 1000.0);

        let after = (p.pos - cursor).length();
        assert!(after < before);
    }

    #[test]
    fn test_pointer_outside_range_applies_no_force() {
        let mut config = fixed_config();
        config.cursor_range = 80.0;
        config.cursor_interaction = 5.0;

        let cursor = Vec2::new(500.0, 500.0);
        let mut p = particle_at(100.0, 100.0);
        p.update(Some(cursor), &config, 1000.0, 1000.0);

        assert_eq!(p.vel, Vec2::ZERO);
    }

    #[test]
    fn test_reset_size_within_sorted_range() {
        // Inverted min/max must be tolerated, not rejected.
        let mut config = fixed_config();
        config.min_size = 6.0;
        config.max_size = 2.0;

        let mut rng = rand::thread_rng();
        let mut p = particle_at(0.0, 0.0);
        for _ in 0..200 {
            p.reset(&config, &mut rng);
            assert!(p.size >= 2.0 && p.size <= 6.0);
        }
    }

    #[test]
    fn test_reset_velocity_within_limit() {
        let config = fixed_config();
        let max_speed = config.speed * MAX_SPEED_FACTOR;

        let mut rng = rand::thread_rng();
        let mut p = particle_at(0.0, 0.0);
        for _ in 0..200 {
            p.reset(&config, &mut rng);
            assert!(p.vel.x.abs() <= max_speed);
            assert!(p.vel.y.abs() <= max_speed);
        }
    }

    #[test]
    fn test_connection_quota_holds_for_both_endpoints() {
        // Nine particles all within range of each other.
        let positions: Vec<(f32, f32)> = (0..9)
            .map(|i| (100.0 + (i % 3) as f32 * 10.0, 100.0 + (i / 3) as f32 * 10.0))
            .collect();
        let engine = cluster_engine(&positions, 100.0, 2);

        let mut degrees = vec![0usize; engine.particles.len()];
        for conn in &engine.connections {
            degrees[conn.a] += 1;
            degrees[conn.b] += 1;
        }

        assert!(!engine.connections.is_empty());
        for degree in degrees {
            assert!(degree <= 2);
        }
    }

    #[test]
    fn test_each_pair_connects_at_most_once() {
        let positions: Vec<(f32, f32)> = (0..6).map(|i| (50.0 + i as f32 * 5.0, 50.0)).collect();
        let engine = cluster_engine(&positions, 100.0, 10);

        let mut seen = std::collections::HashSet::new();
        for conn in &engine.connections {
            assert_ne!(conn.a, conn.b);
            assert!(seen.insert((conn.a, conn.b)), "duplicate edge");
            assert!(conn.a < conn.b, "edges stored with a < b");
        }
    }

    #[test]
    fn test_no_connection_beyond_distance() {
        let engine = cluster_engine(&[(0.0, 0.0), (300.0, 300.0)], 100.0, 8);
        assert!(engine.connections.is_empty());
    }

    #[test]
    fn test_connection_strength_decays_with_distance() {
        let engine = cluster_engine(&[(0.0, 0.0), (60.0, 0.0)], 100.0, 8);
        assert_eq!(engine.connections.len(), 1);

        let strength = engine.connections[0].strength;
        assert!((strength - 0.4).abs() < 1e-4); // 1 - 60/100
    }

    #[test]
    fn test_disabled_engine_clears_population() {
        let mut config = fixed_config();
        let connections = ConnectionConfig::default();

        let mut engine = ParticleEngine::new(800.0, 600.0);
        engine.reinitialize(&config, &connections);
        assert!(!engine.particles.is_empty());

        config.enabled = false;
        let event = engine.update(&config, None, 1.0 / 60.0);
        assert!(event.is_none());
        assert!(engine.particles.is_empty());
        assert!(engine.connections.is_empty());
    }

    #[test]
    fn test_zero_sized_surface_is_a_no_op() {
        let config = fixed_config();
        let connections = ConnectionConfig::default();

        let mut engine = ParticleEngine::new(0.0, 0.0);
        engine.reinitialize(&config, &connections);
        assert!(engine.particles.is_empty());
    }
}
