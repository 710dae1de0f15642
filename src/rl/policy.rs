//! Exploration policies that turn network scores into an action index

use rand::Rng;

/// Picks an action index from one score per action
pub trait Policy {
    fn select_action(&mut self, scores: &[f32]) -> usize;
}

/// Index of the first maximal score, 0 for an empty slice
pub fn argmax(scores: &[f32]) -> usize {
    scores
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, best_score), (i, &score)| {
            if score > best_score { (i, score) } else { (best, best_score) }
        })
        .0
}

/// With probability `eps` a uniformly random action, otherwise the best scored one
#[derive(Debug)]
pub struct EpsGreedyQPolicy<R: Rng> {
    pub eps: f64,
    rng: R,
}

impl<R: Rng> EpsGreedyQPolicy<R> {
    pub fn new(eps: f64, rng: R) -> Self {
        Self { eps, rng }
    }
}

impl<R: Rng> Policy for EpsGreedyQPolicy<R> {
    fn select_action(&mut self, scores: &[f32]) -> usize {
        if scores.is_empty() {
            return 0;
        }
        if self.rng.random::<f64>() < self.eps {
            self.rng.random_range(0..scores.len())
        } else {
            argmax(scores)
        }
    }
}

/// Linear epsilon schedule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnealingConfig {
    pub value_max: f64,
    pub value_min: f64,
    /// Epsilon used while testing
    pub value_test: f64,
    /// Steps over which epsilon falls from `value_max` to `value_min`
    pub nb_steps: usize,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        Self {
            value_max: 1.0,
            value_min: 0.7,
            value_test: 0.0,
            nb_steps: 1_000_000,
        }
    }
}

/// Epsilon-greedy policy whose epsilon decays linearly with the training step
#[derive(Debug)]
pub struct LinearAnnealedPolicy<R: Rng> {
    inner: EpsGreedyQPolicy<R>,
    config: AnnealingConfig,
    step: usize,
    training: bool,
}

impl<R: Rng> LinearAnnealedPolicy<R> {
    pub fn new(config: AnnealingConfig, rng: R) -> Self {
        Self {
            inner: EpsGreedyQPolicy::new(config.value_max, rng),
            config,
            step: 0,
            training: true,
        }
    }

    pub fn set_step(&mut self, step: usize) {
        self.step = step;
    }

    pub fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    pub fn current_value(&self) -> f64 {
        if !self.training {
            return self.config.value_test;
        }
        let slope = -(self.config.value_max - self.config.value_min)
            / self.config.nb_steps.max(1) as f64;
        (slope * self.step as f64 + self.config.value_max).max(self.config.value_min)
    }
}

impl<R: Rng> Policy for LinearAnnealedPolicy<R> {
    fn select_action(&mut self, scores: &[f32]) -> usize {
        self.inner.eps = self.current_value();
        self.inner.select_action(scores)
    }
}
