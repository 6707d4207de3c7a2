pub mod timer;

pub use timer::{CalibrationStats, HighPrecisionTimer, SimulatedTimer, Timer};
