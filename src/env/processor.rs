//! Observation and reward preprocessing between the simulator and the learner

use ndarray::{Array3, Axis};

use crate::error::EnvError;
use crate::sc2::{ScreenFeature, TimeStep};

/// What happens to the simulator's reward before the learner sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RewardShaping {
    /// Every reward is replaced by zero
    #[default]
    Disabled,
    /// The simulator's reward is forwarded unchanged
    Passthrough,
}

/// Reshapes observations and rewards into the form the learner consumes
#[derive(Debug, Clone)]
pub struct Sc2Processor {
    feature: ScreenFeature,
    reward_shaping: RewardShaping,
}

impl Sc2Processor {
    pub fn new(reward_shaping: RewardShaping) -> Self {
        Self {
            feature: ScreenFeature::PlayerRelative,
            reward_shaping,
        }
    }

    pub fn reward_shaping(&self) -> RewardShaping {
        self.reward_shaping
    }

    /// Extracts the `player_relative` plane as a `(height, width, 1)` image.
    ///
    /// Labels are cast to `f32` as-is.
    pub fn process_observation(&self, step: &TimeStep) -> Result<Array3<f32>, EnvError> {
        let plane = step
            .observation
            .feature_screen
            .get(self.feature)
            .ok_or(EnvError::MissingFeature {
                feature: self.feature,
            })?;

        Ok(plane.mapv(f32::from).insert_axis(Axis(2)))
    }

    pub fn process_reward(&self, reward: f32) -> f32 {
        match self.reward_shaping {
            RewardShaping::Disabled => 0.0,
            RewardShaping::Passthrough => reward,
        }
    }
}

impl Default for Sc2Processor {
    fn default() -> Self {
        Self::new(RewardShaping::default())
    }
}
