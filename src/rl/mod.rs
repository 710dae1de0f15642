//! Learner side of the experiment: exploration, the perception network and the
//! training driver.
//!
//! ```text
//! HallucinationEnv ──observation──▶ PerceptionNetwork ──scores──▶ LinearAnnealedPolicy
//!        ▲                                                               │
//!        └──────────────────────────── action ◀──────────────────────────┘
//! ```

// Core modules that don't depend on Burn
pub mod metrics;
pub mod policy;

// Burn-dependent modules
#[cfg(feature = "rl")]
pub mod callbacks;
#[cfg(feature = "rl")]
pub mod driver;
#[cfg(feature = "rl")]
pub mod network;

pub use metrics::{EpisodeSummary, MovingAverage};
pub use policy::{AnnealingConfig, EpsGreedyQPolicy, LinearAnnealedPolicy, Policy, argmax};

#[cfg(feature = "rl")]
pub use callbacks::{CallbackList, FileLogger, ModelIntervalCheckpoint, TrainingCallback, TrainingLog};
#[cfg(feature = "rl")]
pub use driver::DqnDriver;
#[cfg(feature = "rl")]
pub use network::{BatchMetrics, PerceptionConfig, PerceptionNetwork, PerceptionTrainer, compile, images_to_tensor};
