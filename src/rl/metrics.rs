//! Episode statistics collected while training and testing

/// Mean of the last `capacity` values, kept in a fixed ring
#[derive(Debug, Clone)]
pub struct MovingAverage {
    ring: Vec<f32>,
    capacity: usize,
    next: usize,
}

impl MovingAverage {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Vec::with_capacity(capacity),
            capacity: capacity.max(1),
            next: 0,
        }
    }

    /// Records `value` and returns the updated mean
    pub fn push(&mut self, value: f32) -> f32 {
        if self.ring.len() < self.capacity {
            self.ring.push(value);
        } else {
            self.ring[self.next] = value;
        }
        self.next = (self.next + 1) % self.capacity;
        self.average()
    }

    pub fn average(&self) -> f32 {
        if self.ring.is_empty() {
            return 0.0;
        }
        self.ring.iter().sum::<f32>() / self.ring.len() as f32
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.ring.len() == self.capacity
    }
}

/// Outcome of one finished episode
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummary {
    pub episode: usize,
    /// Sum of rewards as the learner saw them
    pub episode_reward: f32,
    /// Sum of raw simulator rewards
    pub simulator_reward: f32,
    pub nb_episode_steps: usize,
    /// Agent steps taken so far in the run
    pub nb_steps: usize,
    pub duration_secs: f64,
    /// Mean over the episode of the best action score
    pub mean_q: f32,
}
