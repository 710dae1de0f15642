//! Simulator that replays a fixed script of rewards and step types

use ndarray::Array2;

use super::actions::FunctionCall;
use super::environment::{Observation, Simulator, SimulatorError, StepType, TimeStep};
use super::features::{Dimensions, FeatureScreen, PLAYER_BACKGROUND, ScreenFeature};

/// Deterministic simulator for exercising the episode wrapper.
///
/// Every `step` consumes the next `(reward, step_type)` entry; `reset`
/// rewinds to the start of the script. Each submitted call is recorded.
#[derive(Debug, Clone)]
pub struct ScriptedSimulator {
    dimensions: Dimensions,
    script: Vec<(f32, StepType)>,
    cursor: usize,
    screen: FeatureScreen,
    submitted: Vec<FunctionCall>,
    resets: usize,
}

impl ScriptedSimulator {
    pub fn new(dimensions: Dimensions, script: Vec<(f32, StepType)>) -> Self {
        let plane = Array2::from_elem((dimensions.screen, dimensions.screen), PLAYER_BACKGROUND);
        Self {
            dimensions,
            script,
            cursor: 0,
            screen: FeatureScreen::new().with_plane(ScreenFeature::PlayerRelative, plane),
            submitted: Vec::new(),
            resets: 0,
        }
    }

    /// Replaces the feature screen returned with every timestep
    pub fn with_screen(mut self, screen: FeatureScreen) -> Self {
        self.screen = screen;
        self
    }

    /// Every call passed to `step`, in order
    pub fn submitted(&self) -> &[FunctionCall] {
        &self.submitted
    }

    pub fn resets(&self) -> usize {
        self.resets
    }

    fn observation(&self) -> Observation {
        Observation {
            feature_screen: self.screen.clone(),
            available_actions: Vec::new(),
        }
    }
}

impl Simulator for ScriptedSimulator {
    fn reset(&mut self) -> Result<TimeStep, SimulatorError> {
        self.cursor = 0;
        self.resets += 1;
        Ok(TimeStep::first(self.observation()))
    }

    fn step(&mut self, action: &FunctionCall) -> Result<TimeStep, SimulatorError> {
        self.submitted.push(action.clone());

        let &(reward, step_type) =
            self.script
                .get(self.cursor)
                .ok_or_else(|| SimulatorError::Protocol {
                    message: format!("script exhausted after {} steps", self.cursor),
                })?;
        self.cursor += 1;

        Ok(TimeStep {
            step_type,
            reward,
            discount: if step_type == StepType::Last { 0.0 } else { 1.0 },
            observation: self.observation(),
        })
    }

    fn dimensions(&self) -> Dimensions {
        self.dimensions
    }
}
