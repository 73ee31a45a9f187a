//! Particle Backdrop RS
//!
//! A self-tuning particle background renderer: constellation-style particles
//! with pointer interaction and quota-bounded connection lines, monitored by
//! a rolling FPS window that feeds a downward-only auto-tuner in safe mode.
//!
//! The engine ([`ParticleEngine`]) is headless and fully driveable from
//! tests; the binary wraps it in an `eframe` shell that owns the settings
//! surface, resize/pointer sources, and the auto-tune notification.

pub mod config;
pub mod particles;
pub mod perf;

pub use config::{AppConfig, BackgroundConfig, ConnectionConfig, ParticleConfig};
pub use particles::{Connection, Particle, ParticleEngine, SpatialGrid};
pub use perf::{AutoTuneEvent, EffectiveConfig, FpsMonitor};
