//! Deep-Q style driver: rolls the network's policy through the environment

use std::time::Instant;

use burn::prelude::*;
use ndarray::Array3;
use rand::Rng;

use super::callbacks::TrainingCallback;
use super::metrics::{EpisodeSummary, MovingAverage};
use super::network::{PerceptionNetwork, images_to_tensor};
use super::policy::{LinearAnnealedPolicy, Policy};
use crate::env::{EpisodeState, HallucinationEnv};
use crate::error::{EnvError, TrainError};
use crate::sc2::Simulator;

/// Episode in progress during `fit`
struct OpenEpisode {
    observation: Array3<f32>,
    started: Instant,
    steps: usize,
    reward: f32,
    q_sum: f32,
}

/// Owns the network and the exploration policy and drives episodes
pub struct DqnDriver<B: Backend, R: Rng> {
    network: PerceptionNetwork<B>,
    policy: LinearAnnealedPolicy<R>,
    device: B::Device,
}

impl<B: Backend, R: Rng> DqnDriver<B, R> {
    pub fn new(
        network: PerceptionNetwork<B>,
        policy: LinearAnnealedPolicy<R>,
        device: B::Device,
    ) -> Self {
        Self {
            network,
            policy,
            device,
        }
    }

    pub fn network(&self) -> &PerceptionNetwork<B> {
        &self.network
    }

    pub fn set_network(&mut self, network: PerceptionNetwork<B>) {
        self.network = network;
    }

    pub fn into_network(self) -> PerceptionNetwork<B> {
        self.network
    }

    pub fn policy(&self) -> &LinearAnnealedPolicy<R> {
        &self.policy
    }

    /// Softmax score per screen cell for one observation
    pub fn scores(&self, observation: &Array3<f32>) -> Result<Vec<f32>, TrainError> {
        let images = images_to_tensor::<B>(std::slice::from_ref(observation), &self.device)?;
        self.network
            .scores(images)
            .into_data()
            .to_vec::<f32>()
            .map_err(|err| TrainError::Tensor(format!("{:?}", err)))
    }

    fn act(&mut self, observation: &Array3<f32>) -> Result<(usize, f32), TrainError> {
        let scores = self.scores(observation)?;
        let best = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        Ok((self.policy.select_action(&scores), best))
    }

    /// Applies `action` up to `repetition` times, stopping at the end of the episode
    fn repeat<S: Simulator, E: Rng>(
        env: &mut HallucinationEnv<S, E>,
        action: usize,
        repetition: usize,
    ) -> Result<(Array3<f32>, f32, bool), TrainError> {
        let mut reward = 0.0;
        let mut last = env.step(action)?;
        reward += last.reward;
        for _ in 1..repetition {
            if last.done {
                break;
            }
            last = env.step(action)?;
            reward += last.reward;
        }
        Ok((last.observation, reward, last.done))
    }

    fn open_episode<S: Simulator, E: Rng>(
        env: &mut HallucinationEnv<S, E>,
    ) -> Result<OpenEpisode, TrainError> {
        let observation = env.reset()?;
        if env.state() == EpisodeState::Terminated {
            return Err(EnvError::EpisodeOver.into());
        }
        Ok(OpenEpisode {
            observation,
            started: Instant::now(),
            steps: 0,
            reward: 0.0,
            q_sum: 0.0,
        })
    }

    /// Runs `nb_steps` agent steps with the annealed policy.
    ///
    /// Returns a summary of every episode that finished within the budget.
    pub fn fit<S: Simulator, E: Rng>(
        &mut self,
        env: &mut HallucinationEnv<S, E>,
        callbacks: &mut dyn TrainingCallback<B>,
        nb_steps: usize,
        action_repetition: usize,
        log_interval: usize,
    ) -> Result<Vec<EpisodeSummary>, TrainError> {
        tracing::info!(
            "Training for {} steps, action repetition {}",
            nb_steps,
            action_repetition
        );
        self.policy.set_training(true);

        let repetition = action_repetition.max(1);
        let mut summaries = Vec::new();
        let mut recent_rewards = MovingAverage::new(100);
        let mut episode: Option<OpenEpisode> = None;

        for step in 1..=nb_steps {
            let mut current = match episode.take() {
                Some(open) => open,
                None => Self::open_episode(env)?,
            };

            self.policy.set_step(step - 1);
            let (action, best) = self.act(&current.observation)?;
            let (observation, reward, done) = Self::repeat(env, action, repetition)?;

            current.observation = observation;
            current.steps += 1;
            current.reward += reward;
            current.q_sum += best;

            callbacks.on_step_end(step, &self.network)?;

            if log_interval > 0 && step % log_interval == 0 {
                tracing::info!(
                    "Step {}/{}: episodes={}, eps={:.3}, avg_simulator_reward={:.2}",
                    step,
                    nb_steps,
                    summaries.len(),
                    self.policy.current_value(),
                    recent_rewards.average()
                );
            }

            if done {
                let summary = EpisodeSummary {
                    episode: summaries.len(),
                    episode_reward: current.reward,
                    simulator_reward: env.episode_reward(),
                    nb_episode_steps: current.steps,
                    nb_steps: step,
                    duration_secs: current.started.elapsed().as_secs_f64(),
                    mean_q: current.q_sum / current.steps as f32,
                };
                let average = recent_rewards.push(summary.simulator_reward);
                tracing::debug!(
                    "Episode {} finished: steps={}, simulator_reward={:.2}, recent_avg={:.2}",
                    summary.episode,
                    summary.nb_episode_steps,
                    summary.simulator_reward,
                    average
                );
                callbacks.on_episode_end(&summary)?;
                summaries.push(summary);
            } else {
                episode = Some(current);
            }
        }

        callbacks.on_train_end(&self.network)?;
        tracing::info!("Training complete after {} episodes", summaries.len());
        Ok(summaries)
    }

    /// Plays `nb_episodes` full episodes with the test epsilon
    pub fn test<S: Simulator, E: Rng>(
        &mut self,
        env: &mut HallucinationEnv<S, E>,
        nb_episodes: usize,
        action_repetition: usize,
    ) -> Result<Vec<EpisodeSummary>, TrainError> {
        tracing::info!("Testing for {} episodes", nb_episodes);
        self.policy.set_training(false);

        let repetition = action_repetition.max(1);
        let mut summaries = Vec::with_capacity(nb_episodes);
        let mut total_steps = 0;

        for episode in 0..nb_episodes {
            let mut current = Self::open_episode(env)?;
            loop {
                let (action, best) = self.act(&current.observation)?;
                let (observation, reward, done) = Self::repeat(env, action, repetition)?;
                current.observation = observation;
                current.steps += 1;
                current.reward += reward;
                current.q_sum += best;
                if done {
                    break;
                }
            }
            total_steps += current.steps;

            let summary = EpisodeSummary {
                episode,
                episode_reward: current.reward,
                simulator_reward: env.episode_reward(),
                nb_episode_steps: current.steps,
                nb_steps: total_steps,
                duration_secs: current.started.elapsed().as_secs_f64(),
                mean_q: current.q_sum / current.steps as f32,
            };
            tracing::info!(
                "Episode {}: reward={:.2}, simulator_reward={:.2}, steps={}",
                episode + 1,
                summary.episode_reward,
                summary.simulator_reward,
                summary.nb_episode_steps
            );
            summaries.push(summary);
        }

        self.policy.set_training(true);
        Ok(summaries)
    }
}
