//! Episodic environment wrapper - the reset/step interface the learner drives

use ndarray::Array3;
use rand::Rng;

use super::action_shim::ActionShim;
use super::processor::{RewardShaping, Sc2Processor};
use crate::error::EnvError;
use crate::sc2::{Dimensions, FunctionCall, Simulator};

/// Which command reaches the simulator on `step`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionSubmission {
    /// Submit `no_op`; the shim's choice is computed and discarded
    #[default]
    NoOp,
    /// Submit the hallucination command picked by the shim
    ShimChoice,
}

/// Environment configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfig {
    pub reward_shaping: RewardShaping,
    pub action_submission: ActionSubmission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeState {
    /// Waiting for a successful `reset`
    Reset,
    Running,
    /// Last step reported the terminal step type
    Terminated,
}

/// Auxiliary step information, always empty
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepInfo {}

/// Step result handed back to the learner
#[derive(Debug, Clone)]
pub struct Transition {
    /// `(height, width, 1)` player-relative image
    pub observation: Array3<f32>,
    /// Reward after the processor's shaping
    pub reward: f32,
    /// Episode over
    pub done: bool,
    pub info: StepInfo,
}

/// Wraps a simulator with the action shim, the processor and episode
/// bookkeeping.
pub struct HallucinationEnv<S: Simulator, R: Rng> {
    simulator: S,
    processor: Sc2Processor,
    shim: ActionShim<R>,
    config: EnvConfig,
    state: EpisodeState,
    /// Sum of raw simulator rewards since the last reset
    episode_reward: f32,
    episode_steps: usize,
    last_shim_action: Option<FunctionCall>,
}

impl<S: Simulator, R: Rng> HallucinationEnv<S, R> {
    pub fn new(simulator: S, config: EnvConfig, rng: R) -> Self {
        Self {
            simulator,
            processor: Sc2Processor::new(config.reward_shaping),
            shim: ActionShim::new(rng),
            config,
            state: EpisodeState::Reset,
            episode_reward: 0.0,
            episode_steps: 0,
            last_shim_action: None,
        }
    }

    /// Starts a new episode and selects the whole army
    pub fn reset(&mut self) -> Result<Array3<f32>, EnvError> {
        // A failed reset leaves the wrapper refusing steps
        self.state = EpisodeState::Reset;
        self.episode_reward = 0.0;
        self.episode_steps = 0;
        self.last_shim_action = None;

        self.simulator.reset()?;
        let step = self.simulator.step(&FunctionCall::select_army())?;
        let observation = self.processor.process_observation(&step)?;

        self.state = if step.is_last() {
            EpisodeState::Terminated
        } else {
            EpisodeState::Running
        };
        tracing::debug!("Episode reset, state {:?}", self.state);

        Ok(observation)
    }

    /// Advances one step. `action` is accepted for interface compatibility
    /// only; the shim decides what is executed.
    pub fn step(&mut self, action: usize) -> Result<Transition, EnvError> {
        match self.state {
            EpisodeState::Running => {}
            EpisodeState::Reset => return Err(EnvError::NotRunning),
            EpisodeState::Terminated => return Err(EnvError::EpisodeOver),
        }

        let chosen = self.shim.choose(action);
        let submitted = match self.config.action_submission {
            ActionSubmission::NoOp => FunctionCall::no_op(),
            ActionSubmission::ShimChoice => chosen.clone(),
        };
        tracing::trace!("Proposed {}, shim chose {}, submitting {}", action, chosen, submitted);
        self.last_shim_action = Some(chosen);

        let step = self.simulator.step(&submitted)?;

        self.episode_reward += step.reward;
        self.episode_steps += 1;

        let done = step.is_last();
        if done {
            self.state = EpisodeState::Terminated;
            tracing::debug!(
                "Episode over after {} steps, simulator reward {:.2}",
                self.episode_steps,
                self.episode_reward
            );
        }

        let observation = self.processor.process_observation(&step)?;

        Ok(Transition {
            observation,
            reward: self.processor.process_reward(step.reward),
            done,
            info: StepInfo::default(),
        })
    }

    pub fn state(&self) -> EpisodeState {
        self.state
    }

    /// Cumulative raw simulator reward of the current episode
    pub fn episode_reward(&self) -> f32 {
        self.episode_reward
    }

    pub fn episode_steps(&self) -> usize {
        self.episode_steps
    }

    /// The command the shim picked on the most recent step
    pub fn last_shim_action(&self) -> Option<&FunctionCall> {
        self.last_shim_action.as_ref()
    }

    pub fn config(&self) -> EnvConfig {
        self.config
    }

    pub fn dimensions(&self) -> Dimensions {
        self.simulator.dimensions()
    }

    /// Size of the learner's action space: one action per screen cell
    pub fn nb_actions(&self) -> usize {
        let screen = self.dimensions().screen;
        screen * screen
    }

    pub fn simulator(&self) -> &S {
        &self.simulator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::action_shim::HALLUCINATIONS;
    use crate::sc2::{
        FeatureScreen, FunctionId, ScreenFeature, ScriptedSimulator, SimulatorError, StepType,
        TimeStep,
    };
    use ndarray::Array2;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// The first scripted entry answers the army selection made by `reset`
    fn scripted(episode: &[(f32, StepType)]) -> ScriptedSimulator {
        let mut script = vec![(0.0, StepType::Mid)];
        script.extend_from_slice(episode);
        ScriptedSimulator::new(Dimensions::default(), script)
    }

    /// Scripted simulator that fails its n-th reset and can drop the
    /// feature screen from later timesteps
    struct FlakySimulator {
        inner: ScriptedSimulator,
        resets: usize,
        fail_on_reset: usize,
        steps: usize,
        blank_after: Option<usize>,
    }

    impl FlakySimulator {
        fn new(inner: ScriptedSimulator, fail_on_reset: usize, blank_after: Option<usize>) -> Self {
            Self {
                inner,
                resets: 0,
                fail_on_reset,
                steps: 0,
                blank_after,
            }
        }
    }

    impl Simulator for FlakySimulator {
        fn reset(&mut self) -> Result<TimeStep, SimulatorError> {
            self.resets += 1;
            if self.resets == self.fail_on_reset {
                return Err(SimulatorError::Protocol {
                    message: "connection dropped".to_string(),
                });
            }
            self.inner.reset()
        }

        fn step(&mut self, action: &FunctionCall) -> Result<TimeStep, SimulatorError> {
            let mut step = self.inner.step(action)?;
            self.steps += 1;
            if self.blank_after.is_some_and(|n| self.steps > n) {
                step.observation.feature_screen = FeatureScreen::new();
            }
            Ok(step)
        }

        fn dimensions(&self) -> Dimensions {
            self.inner.dimensions()
        }
    }

    fn env(
        sim: ScriptedSimulator,
        action_submission: ActionSubmission,
    ) -> HallucinationEnv<ScriptedSimulator, StdRng> {
        let config = EnvConfig {
            action_submission,
            ..EnvConfig::default()
        };
        HallucinationEnv::new(sim, config, StdRng::seed_from_u64(5))
    }

    #[test]
    fn test_three_step_episode() {
        let sim = scripted(&[
            (1.0, StepType::Mid),
            (0.0, StepType::Mid),
            (5.0, StepType::Last),
        ]);
        let mut env = env(sim, ActionSubmission::NoOp);

        let observation = env.reset().unwrap();
        assert_eq!(observation.dim(), (64, 64, 1));
        assert_eq!(env.episode_reward(), 0.0);

        let mut rewards = Vec::new();
        let mut dones = Vec::new();
        let mut counters = Vec::new();
        for action in [10, 20, 30] {
            let transition = env.step(action).unwrap();
            assert_eq!(transition.observation.dim(), (64, 64, 1));
            assert_eq!(transition.info, StepInfo::default());
            rewards.push(transition.reward);
            dones.push(transition.done);
            counters.push(env.episode_reward());
        }

        assert_eq!(rewards, vec![0.0, 0.0, 0.0]);
        assert_eq!(dones, vec![false, false, true]);
        assert_eq!(counters, vec![1.0, 1.0, 6.0]);
        assert_eq!(env.state(), EpisodeState::Terminated);
    }

    #[test]
    fn test_reset_selects_army_then_steps_submit_no_op() {
        let sim = scripted(&[(0.0, StepType::Mid), (0.0, StepType::Last)]);
        let mut env = env(sim, ActionSubmission::NoOp);

        env.reset().unwrap();
        env.step(0).unwrap();
        env.step(0).unwrap();

        let submitted = env.simulator().submitted();
        assert_eq!(submitted[0], FunctionCall::select_army());
        assert_eq!(&submitted[1..], &[FunctionCall::no_op(), FunctionCall::no_op()]);
        assert!(
            env.last_shim_action()
                .is_some_and(|call| HALLUCINATIONS.contains(&call.function))
        );
    }

    #[test]
    fn test_shim_choice_submitted_once_per_step() {
        let sim = scripted(&[(0.0, StepType::Mid); 9]);
        let mut env = env(sim, ActionSubmission::ShimChoice);

        env.reset().unwrap();
        for action in 0..9 {
            env.step(action).unwrap();
            assert_eq!(
                env.simulator().submitted().last(),
                env.last_shim_action()
            );
        }

        let submitted = env.simulator().submitted();
        assert_eq!(submitted.len(), 10);
        assert!(submitted[1..].iter().all(|call| call.function.is_hallucination()));
        assert!(submitted[1..].iter().all(|call| call.function != FunctionId::NoOp));
    }

    #[test]
    fn test_step_before_reset_rejected() {
        let mut env = env(scripted(&[(0.0, StepType::Mid)]), ActionSubmission::NoOp);
        assert!(matches!(env.step(0), Err(EnvError::NotRunning)));
        assert!(env.simulator().submitted().is_empty());
    }

    #[test]
    fn test_step_after_terminal_rejected_until_reset() {
        let sim = scripted(&[(2.0, StepType::Last)]);
        let mut env = env(sim, ActionSubmission::NoOp);

        env.reset().unwrap();
        assert!(env.step(0).unwrap().done);
        assert!(matches!(env.step(0), Err(EnvError::EpisodeOver)));
        assert_eq!(env.simulator().submitted().len(), 2);

        env.reset().unwrap();
        assert_eq!(env.state(), EpisodeState::Running);
        assert!(env.step(0).unwrap().done);
    }

    #[test]
    fn test_reset_zeroes_counter() {
        let sim = scripted(&[(3.0, StepType::Mid), (4.0, StepType::Mid)]);
        let mut env = env(sim, ActionSubmission::NoOp);

        env.reset().unwrap();
        env.step(0).unwrap();
        env.step(0).unwrap();
        assert_eq!(env.episode_reward(), 7.0);
        assert_eq!(env.episode_steps(), 2);

        env.reset().unwrap();
        assert_eq!(env.episode_reward(), 0.0);
        assert_eq!(env.episode_steps(), 0);
        env.reset().unwrap();
        assert_eq!(env.episode_reward(), 0.0);

        env.step(0).unwrap();
        assert_eq!(env.episode_reward(), 3.0);
    }

    #[test]
    fn test_passthrough_rewards_reach_learner() {
        let sim = scripted(&[(1.0, StepType::Mid), (5.0, StepType::Last)]);
        let config = EnvConfig {
            reward_shaping: RewardShaping::Passthrough,
            action_submission: ActionSubmission::NoOp,
        };
        let mut env = HallucinationEnv::new(sim, config, StdRng::seed_from_u64(0));

        env.reset().unwrap();
        assert_eq!(env.step(0).unwrap().reward, 1.0);
        assert_eq!(env.step(0).unwrap().reward, 5.0);
    }

    #[test]
    fn test_missing_feature_fails_reset() {
        let screen = FeatureScreen::new()
            .with_plane(ScreenFeature::HeightMap, Array2::zeros((64, 64)));
        let sim = scripted(&[(0.0, StepType::Mid)]).with_screen(screen);
        let mut env = env(sim, ActionSubmission::NoOp);

        assert!(matches!(
            env.reset(),
            Err(EnvError::MissingFeature { .. })
        ));
    }

    #[test]
    fn test_simulator_failure_propagates() {
        let mut env = env(scripted(&[]), ActionSubmission::NoOp);
        env.reset().unwrap();
        assert!(matches!(env.step(0), Err(EnvError::Simulator(_))));
    }

    #[test]
    fn test_failed_reset_refuses_steps() {
        let sim = FlakySimulator::new(
            scripted(&[(9.0, StepType::Mid), (0.0, StepType::Mid)]),
            2,
            None,
        );
        let mut env = HallucinationEnv::new(sim, EnvConfig::default(), StdRng::seed_from_u64(3));

        env.reset().unwrap();
        env.step(0).unwrap();
        assert_eq!(env.episode_reward(), 9.0);

        assert!(matches!(env.reset(), Err(EnvError::Simulator(_))));
        assert_eq!(env.state(), EpisodeState::Reset);
        assert!(matches!(env.step(0), Err(EnvError::NotRunning)));
        assert_eq!(env.episode_reward(), 0.0);

        env.reset().unwrap();
        assert_eq!(env.state(), EpisodeState::Running);
    }

    #[test]
    fn test_terminal_step_recorded_when_observation_fails() {
        // selection and the first agent step keep their screen
        let sim = FlakySimulator::new(
            scripted(&[(2.0, StepType::Mid), (3.0, StepType::Last)]),
            0,
            Some(2),
        );
        let mut env = HallucinationEnv::new(sim, EnvConfig::default(), StdRng::seed_from_u64(3));

        env.reset().unwrap();
        env.step(0).unwrap();
        assert!(matches!(
            env.step(0),
            Err(EnvError::MissingFeature { .. })
        ));
        assert_eq!(env.state(), EpisodeState::Terminated);
        assert_eq!(env.episode_reward(), 5.0);
        assert_eq!(env.episode_steps(), 2);
        assert!(matches!(env.step(0), Err(EnvError::EpisodeOver)));
    }

    #[test]
    fn test_nb_actions_covers_screen() {
        let env = env(scripted(&[]), ActionSubmission::NoOp);
        assert_eq!(env.nb_actions(), 64 * 64);
    }
}
