pub mod config;
pub mod env;
pub mod error;
pub mod rl;
pub mod sc2;

// Re-export commonly used types for convenience
pub use env::{EnvConfig, HallucinationEnv};
pub use error::{ConfigError, EnvError, TrainError};
pub use sc2::{LocalMinigame, Simulator};
