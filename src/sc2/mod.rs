//! StarCraft II simulator contract and the simulators implementing it

pub mod actions;
pub mod environment;
pub mod features;
pub mod local;
pub mod scripted;

pub use actions::{FunctionCall, FunctionId, NOT_QUEUED, SELECT_ALL};
pub use environment::{Observation, Simulator, SimulatorError, StepType, TimeStep};
pub use features::{Dimensions, FeatureScreen, ScreenFeature};
pub use local::{LocalMinigame, LocalMinigameConfig};
pub use scripted::ScriptedSimulator;
