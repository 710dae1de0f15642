//! Environment adapter between the simulator and the learner

pub mod action_shim;
pub mod episode;
pub mod processor;

pub use action_shim::{ActionShim, HALLUCINATIONS};
pub use episode::{
    ActionSubmission, EnvConfig, EpisodeState, HallucinationEnv, StepInfo, Transition,
};
pub use processor::{RewardShaping, Sc2Processor};
