/*
 * Silhouette Swarm - Module Definitions
 *
 * This file defines the module structure for the silhouette swarm.
 * The simulation core (edges, flow field, particles, detection) is plain Rust
 * and testable headless; app, input, renderer and ui wire it into nannou.
 */

// Re-export key components for easier access
pub use context::{DetectionBackend, FrameOutput, SimulationContext};
pub use detection::{CanvasBox, Detection, DetectionWorker, Detector, SilhouetteDetector};
pub use edges::{EdgeExtractor, EdgePoint, LumaFrame, Region};
pub use error::{DetectionError, FrameError};
pub use flow_field::FlowField;
pub use params::{MotionVariant, SimulationParams};
pub use particle::Particle;
pub use particle_system::{ParticleSystem, UpdateStats};
pub use video::{FrameSource, SyntheticSource, VideoFrame};

// Define modules
pub mod app;
pub mod canvas;
pub mod context;
pub mod debug;
pub mod detection;
pub mod edges;
pub mod error;
pub mod flow_field;
pub mod input;
pub mod params;
pub mod particle;
pub mod particle_system;
pub mod renderer;
pub mod spatial_grid;
pub mod steering;
pub mod ui;
pub mod video;
