//! Command-line options and the run configuration derived from them

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::env::{ActionSubmission, EnvConfig, RewardShaping};
use crate::error::ConfigError;
use crate::rl::AnnealingConfig;
use crate::sc2::Dimensions;
use crate::sc2::local::{MAP_NAME, MIN_SCREEN_SIZE};

/// Reward handed to the learner
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RewardMode {
    /// Every reward is replaced by zero
    Zero,
    /// Simulator rewards pass through unchanged
    Simulator,
}

impl From<RewardMode> for RewardShaping {
    fn from(mode: RewardMode) -> Self {
        match mode {
            RewardMode::Zero => RewardShaping::Disabled,
            RewardMode::Simulator => RewardShaping::Passthrough,
        }
    }
}

/// Command-line arguments for the HallucinIce experiment.
#[derive(Parser, Debug, Clone)]
#[command(name = "hallucinice")]
pub struct Cli {
    /// Mini-game map to play.
    #[arg(long, env = "HALLUCINICE_MINI_GAME", default_value = MAP_NAME)]
    pub mini_game: String,

    /// Learning algorithm label, only recorded in the log.
    #[arg(long, env = "HALLUCINICE_ALGORITHM", default_value = "deepq")]
    pub algorithm: String,

    /// Agent steps to train for.
    #[arg(long, env = "HALLUCINICE_STEPS", default_value_t = 10_000_000)]
    pub steps: usize,

    /// Episodes played after training.
    #[arg(long, env = "HALLUCINICE_TEST_EPISODES", default_value_t = 30)]
    pub test_episodes: usize,

    /// Times each chosen action is applied.
    #[arg(long, env = "HALLUCINICE_ACTION_REPETITION", default_value_t = 2)]
    pub action_repetition: usize,

    /// Load weights from this file before training.
    #[arg(long, env = "HALLUCINICE_LOAD_WEIGHTS")]
    pub load_weights: Option<PathBuf>,

    /// Keep a single checkpoint file instead of one per interval.
    #[arg(long, env = "HALLUCINICE_OVERWRITE_CHECKPOINTS")]
    pub overwrite_checkpoints: bool,

    /// Send the hallucination picked each step instead of no_op.
    #[arg(long, env = "HALLUCINICE_SUBMIT_SHIM_ACTION")]
    pub submit_shim_action: bool,

    #[arg(long, env = "HALLUCINICE_REWARD_SHAPING", value_enum, default_value_t = RewardMode::Zero)]
    pub reward_shaping: RewardMode,

    /// Seed for the simulator, the action shim and exploration.
    #[arg(long, env = "HALLUCINICE_SEED")]
    pub seed: Option<u64>,

    /// Directory for weights, checkpoints and the training log.
    #[arg(long, env = "HALLUCINICE_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Screen resolution in cells per side.
    #[arg(long, env = "HALLUCINICE_SCREEN_SIZE", default_value_t = 64)]
    pub screen_size: usize,

    /// Convolution filters in the perception network.
    #[arg(long, env = "HALLUCINICE_FILTERS", default_value_t = 256)]
    pub filters: usize,

    #[arg(long, env = "HALLUCINICE_GAME_STEPS_PER_EPISODE", default_value_t = 150)]
    pub game_steps_per_episode: usize,
}

/// When the driver logs, checkpoints and anneals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Schedule {
    pub nb_steps: usize,
    pub action_repetition: usize,
    pub log_interval: usize,
    pub checkpoint_interval: usize,
    /// Episodes between training log writes
    pub file_log_interval: usize,
    pub test_episodes: usize,
    pub annealing: AnnealingConfig,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            nb_steps: 10_000_000,
            action_repetition: 2,
            log_interval: 10_000,
            checkpoint_interval: 1000,
            file_log_interval: 100,
            test_episodes: 30,
            annealing: AnnealingConfig::default(),
        }
    }
}

/// Resolved, immutable settings for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub map_name: String,
    pub algorithm: String,
    pub dimensions: Dimensions,
    pub game_steps_per_episode: usize,
    pub env: EnvConfig,
    pub schedule: Schedule,
    pub filters: usize,
    pub load_weights: Option<PathBuf>,
    pub overwrite_checkpoints: bool,
    pub seed: u64,
    pub output_dir: PathBuf,
}

impl RunConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let action_submission = if cli.submit_shim_action {
            ActionSubmission::ShimChoice
        } else {
            ActionSubmission::NoOp
        };

        let config = Self {
            map_name: cli.mini_game.clone(),
            algorithm: cli.algorithm.clone(),
            dimensions: Dimensions {
                screen: cli.screen_size,
                minimap: (cli.screen_size / 2).max(1),
            },
            game_steps_per_episode: cli.game_steps_per_episode,
            env: EnvConfig {
                reward_shaping: cli.reward_shaping.into(),
                action_submission,
            },
            schedule: Schedule {
                nb_steps: cli.steps,
                action_repetition: cli.action_repetition,
                test_episodes: cli.test_episodes,
                ..Schedule::default()
            },
            filters: cli.filters,
            load_weights: cli.load_weights.clone(),
            overwrite_checkpoints: cli.overwrite_checkpoints,
            seed: cli.seed.unwrap_or_else(rand::random::<u64>),
            output_dir: cli.output_dir.clone(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.filters == 0 {
            return Err(ConfigError::ZeroFilters);
        }

        let minimum = self.min_screen_size();
        if self.dimensions.screen < minimum {
            return Err(ConfigError::ScreenTooSmall {
                screen_size: self.dimensions.screen,
                minimum,
            });
        }
        Ok(())
    }

    #[cfg(feature = "rl")]
    fn min_screen_size(&self) -> usize {
        MIN_SCREEN_SIZE.max(self.perception().min_screen_size())
    }

    #[cfg(not(feature = "rl"))]
    fn min_screen_size(&self) -> usize {
        MIN_SCREEN_SIZE
    }

    /// Final weights: `dqn_<map>_weights`
    pub fn weights_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("dqn_{}_weights", self.map_name))
    }

    /// Interval checkpoints, `{step}` is filled in by the checkpoint callback
    pub fn checkpoint_template(&self) -> String {
        let name = if self.overwrite_checkpoints {
            format!("train_w{}_weights", self.map_name)
        } else {
            format!("train_w{}_weights_{{step}}", self.map_name)
        };
        self.output_dir.join(name).to_string_lossy().into_owned()
    }

    pub fn log_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("training_w_{}_log.json", self.map_name))
    }

    #[cfg(feature = "rl")]
    pub fn perception(&self) -> crate::rl::PerceptionConfig {
        crate::rl::PerceptionConfig {
            screen_size: self.dimensions.screen,
            filters: self.filters,
            ..crate::rl::PerceptionConfig::default()
        }
    }
}
