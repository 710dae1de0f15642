use std::error::Error;
use std::fmt;
use std::io;

use crate::sc2::{ScreenFeature, SimulatorError};

/// Errors raised by the episode environment wrapper
#[derive(Debug)]
pub enum EnvError {
    /// `step` called before the first `reset`
    NotRunning,
    /// `step` called after a terminal step without an intervening `reset`
    EpisodeOver,
    /// The observation lacks the feature plane the adapter reads
    MissingFeature { feature: ScreenFeature },
    Simulator(SimulatorError),
}

impl fmt::Display for EnvError {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EnvError::NotRunning => write!(formatter, "Environment stepped before reset"),
            EnvError::EpisodeOver => {
                write!(formatter, "Episode is over, reset before stepping again")
            }
            EnvError::MissingFeature { feature } => {
                write!(formatter, "Observation has no '{}' screen feature", feature)
            }
            EnvError::Simulator(err) => write!(formatter, "Simulator failed: {}", err),
        }
    }
}

impl Error for EnvError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EnvError::Simulator(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SimulatorError> for EnvError {
    fn from(err: SimulatorError) -> Self {
        EnvError::Simulator(err)
    }
}

/// Run settings that cannot be honoured
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Screen too small for the simulator or for the network's conv and pool windows
    ScreenTooSmall { screen_size: usize, minimum: usize },
    ZeroFilters,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::ScreenTooSmall {
                screen_size,
                minimum,
            } => write!(
                formatter,
                "Screen size {} is below the minimum of {}",
                screen_size, minimum
            ),
            ConfigError::ZeroFilters => {
                write!(formatter, "The perception network needs at least one filter")
            }
        }
    }
}

impl Error for ConfigError {}

/// Errors raised while training or evaluating
#[derive(Debug)]
pub enum TrainError {
    Env(EnvError),
    Checkpoint { path: String, message: String },
    Log(io::Error),
    /// Network output could not be read back
    Tensor(String),
}

impl fmt::Display for TrainError {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TrainError::Env(err) => write!(formatter, "{}", err),
            TrainError::Checkpoint { path, message } => {
                write!(formatter, "Checkpoint '{}' failed: {}", path, message)
            }
            TrainError::Log(err) => write!(formatter, "Training log failed: {}", err),
            TrainError::Tensor(message) => write!(formatter, "Tensor readback failed: {}", message),
        }
    }
}

impl Error for TrainError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TrainError::Env(err) => Some(err),
            TrainError::Log(err) => Some(err),
            TrainError::Checkpoint { .. } | TrainError::Tensor(_) => None,
        }
    }
}

impl From<EnvError> for TrainError {
    fn from(err: EnvError) -> Self {
        TrainError::Env(err)
    }
}

impl From<io::Error> for TrainError {
    fn from(err: io::Error) -> Self {
        TrainError::Log(err)
    }
}

impl From<serde_json::Error> for TrainError {
    fn from(err: serde_json::Error) -> Self {
        TrainError::Log(err.into())
    }
}
