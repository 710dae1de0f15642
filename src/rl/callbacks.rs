//! Observers invoked by the training driver: weight checkpoints and the JSON log

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::metrics::EpisodeSummary;
use super::network::PerceptionNetwork;
use crate::error::TrainError;

/// Trait for observing training progress
pub trait TrainingCallback<B: Backend> {
    /// Called after every agent step, `step` counts from 1
    fn on_step_end(&mut self, _step: usize, _network: &PerceptionNetwork<B>) -> Result<(), TrainError> {
        Ok(())
    }

    /// Called when an episode finishes
    fn on_episode_end(&mut self, _summary: &EpisodeSummary) -> Result<(), TrainError> {
        Ok(())
    }

    /// Called once when the step budget is spent
    fn on_train_end(&mut self, _network: &PerceptionNetwork<B>) -> Result<(), TrainError> {
        Ok(())
    }
}

pub struct CallbackList<B: Backend> {
    callbacks: Vec<Box<dyn TrainingCallback<B>>>,
}

impl<B: Backend> CallbackList<B> {
    pub fn new(callbacks: Vec<Box<dyn TrainingCallback<B>>>) -> Self {
        Self { callbacks }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl<B: Backend> TrainingCallback<B> for CallbackList<B> {
    fn on_step_end(&mut self, step: usize, network: &PerceptionNetwork<B>) -> Result<(), TrainError> {
        for callback in &mut self.callbacks {
            callback.on_step_end(step, network)?;
        }
        Ok(())
    }

    fn on_episode_end(&mut self, summary: &EpisodeSummary) -> Result<(), TrainError> {
        for callback in &mut self.callbacks {
            callback.on_episode_end(summary)?;
        }
        Ok(())
    }

    fn on_train_end(&mut self, network: &PerceptionNetwork<B>) -> Result<(), TrainError> {
        for callback in &mut self.callbacks {
            callback.on_train_end(network)?;
        }
        Ok(())
    }
}

/// Saves the network weights every `interval` steps.
///
/// `{step}` in the path template is replaced by the step count; a template
/// without it overwrites one file.
#[derive(Debug, Clone)]
pub struct ModelIntervalCheckpoint {
    template: String,
    interval: usize,
}

impl ModelIntervalCheckpoint {
    pub fn new(template: impl Into<String>, interval: usize) -> Self {
        Self {
            template: template.into(),
            interval,
        }
    }

    pub fn path_for(&self, step: usize) -> String {
        self.template.replace("{step}", &step.to_string())
    }
}

impl<B: Backend> TrainingCallback<B> for ModelIntervalCheckpoint {
    fn on_step_end(&mut self, step: usize, network: &PerceptionNetwork<B>) -> Result<(), TrainError> {
        if self.interval == 0 || step % self.interval != 0 {
            return Ok(());
        }
        let path = self.path_for(step);
        tracing::debug!("Step {}: saving checkpoint {}", step, path);
        network.save_weights(&path)
    }
}

/// Column-oriented episode log, serialised as one JSON object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingLog {
    pub started_at: String,
    pub episode: Vec<usize>,
    pub episode_reward: Vec<f32>,
    pub simulator_reward: Vec<f32>,
    pub nb_episode_steps: Vec<usize>,
    pub nb_steps: Vec<usize>,
    pub duration: Vec<f64>,
    pub mean_q: Vec<f32>,
}

impl TrainingLog {
    fn push(&mut self, summary: &EpisodeSummary) {
        self.episode.push(summary.episode);
        self.episode_reward.push(summary.episode_reward);
        self.simulator_reward.push(summary.simulator_reward);
        self.nb_episode_steps.push(summary.nb_episode_steps);
        self.nb_steps.push(summary.nb_steps);
        self.duration.push(summary.duration_secs);
        self.mean_q.push(summary.mean_q);
    }
}

/// Writes the episode log to a JSON file every `interval` episodes and at the end
#[derive(Debug)]
pub struct FileLogger {
    path: PathBuf,
    interval: usize,
    log: TrainingLog,
}

impl FileLogger {
    pub fn new(path: impl Into<PathBuf>, interval: usize) -> Self {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        Self {
            path: path.into(),
            interval,
            log: TrainingLog {
                started_at: now.format(&Rfc3339).unwrap_or_default(),
                ..TrainingLog::default()
            },
        }
    }

    pub fn log(&self) -> &TrainingLog {
        &self.log
    }

    fn save(&self) -> Result<(), TrainError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer(writer, &self.log)?;
        tracing::debug!("Wrote training log {}", self.path.display());
        Ok(())
    }
}

impl<B: Backend> TrainingCallback<B> for FileLogger {
    fn on_episode_end(&mut self, summary: &EpisodeSummary) -> Result<(), TrainError> {
        self.log.push(summary);
        if self.interval > 0 && self.log.episode.len() % self.interval == 0 {
            self.save()?;
        }
        Ok(())
    }

    fn on_train_end(&mut self, _network: &PerceptionNetwork<B>) -> Result<(), TrainError> {
        self.save()
    }
}
