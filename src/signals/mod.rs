pub mod velocity;

pub use velocity::{detect_velocity_signals, VelocitySignals};
