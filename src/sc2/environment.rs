//! Simulator contract: timesteps, observations and the step/reset trait

use std::error::Error;
use std::fmt;

use super::actions::{FunctionCall, FunctionId};
use super::features::{Dimensions, FeatureScreen};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepType {
    First,
    Mid,
    Last,
}

/// Structured observation emitted by the simulator for one tick
#[derive(Debug, Clone, Default)]
pub struct Observation {
    pub feature_screen: FeatureScreen,
    pub available_actions: Vec<FunctionId>,
}

/// One simulator tick as seen by the agent
#[derive(Debug, Clone)]
pub struct TimeStep {
    pub step_type: StepType,
    pub reward: f32,
    pub discount: f32,
    pub observation: Observation,
}

impl TimeStep {
    pub fn first(observation: Observation) -> Self {
        Self {
            step_type: StepType::First,
            reward: 0.0,
            discount: 0.0,
            observation,
        }
    }

    pub fn is_last(&self) -> bool {
        self.step_type == StepType::Last
    }
}

#[derive(Debug)]
pub enum SimulatorError {
    UnknownMap { name: String },
    Protocol { message: String },
}

impl fmt::Display for SimulatorError {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SimulatorError::UnknownMap { name } => write!(formatter, "Unknown map '{}'", name),
            SimulatorError::Protocol { message } => {
                write!(formatter, "Simulator protocol error: {}", message)
            }
        }
    }
}

impl Error for SimulatorError {}

/// A single-agent game simulator.
///
/// Calls block until the simulator has advanced.
pub trait Simulator {
    /// Starts a new episode and returns its first timestep
    fn reset(&mut self) -> Result<TimeStep, SimulatorError>;

    /// Submits one command and advances the game
    fn step(&mut self, action: &FunctionCall) -> Result<TimeStep, SimulatorError>;

    /// Feature layer resolution of the observations this simulator emits
    fn dimensions(&self) -> Dimensions;
}
