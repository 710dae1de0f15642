//! In-process stand-in for the HallucinIce minigame
//!
//! A friendly group holds the centre of the screen while hostile units walk
//! toward the nearest friendly-looking cell. Hallucination commands place a
//! decoy that hostiles are drawn to. A hostile consuming a decoy scores +1,
//! a hostile reaching the real group scores -1; either way it respawns at
//! the screen edge.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::actions::{FunctionCall, FunctionId};
use super::environment::{Observation, Simulator, SimulatorError, StepType, TimeStep};
use super::features::{
    Dimensions, FeatureScreen, PLAYER_BACKGROUND, PLAYER_HOSTILE, PLAYER_SELF, ScreenFeature,
};

pub const MAP_NAME: &str = "HallucinIce";

/// Room for the 3x3 friendly group and a ring of edge cells
pub const MIN_SCREEN_SIZE: usize = 4;

type Cell = (usize, usize);

#[derive(Debug, Clone)]
pub struct LocalMinigameConfig {
    pub dimensions: Dimensions,
    /// Game steps before the episode is cut off
    pub game_steps_per_episode: usize,
    pub hostile_units: usize,
    /// Max distance from the group centre at which decoys appear
    pub decoy_radius: usize,
}

impl Default for LocalMinigameConfig {
    fn default() -> Self {
        Self {
            dimensions: Dimensions::default(),
            game_steps_per_episode: 150,
            hostile_units: 4,
            decoy_radius: 8,
        }
    }
}

pub struct LocalMinigame {
    config: LocalMinigameConfig,
    rng: StdRng,
    hostiles: Vec<Cell>,
    decoys: Vec<Cell>,
    game_step: usize,
    started: bool,
}

impl LocalMinigame {
    pub fn new(
        map_name: &str,
        config: LocalMinigameConfig,
        seed: u64,
    ) -> Result<Self, SimulatorError> {
        if map_name != MAP_NAME {
            return Err(SimulatorError::UnknownMap {
                name: map_name.to_string(),
            });
        }

        Ok(Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            hostiles: Vec::new(),
            decoys: Vec::new(),
            game_step: 0,
            started: false,
        })
    }

    fn size(&self) -> usize {
        self.config.dimensions.screen
    }

    fn center(&self) -> Cell {
        (self.size() / 2, self.size() / 2)
    }

    fn is_group_cell(&self, (row, col): Cell) -> bool {
        let (cr, cc) = self.center();
        row.abs_diff(cr) <= 1 && col.abs_diff(cc) <= 1
    }

    fn edge_cell(&mut self) -> Cell {
        let last = self.size() - 1;
        let along = self.rng.random_range(0..self.size());
        match self.rng.random_range(0..4) {
            0 => (0, along),
            1 => (last, along),
            2 => (along, 0),
            _ => (along, last),
        }
    }

    fn decoy_cell(&mut self) -> Cell {
        let (cr, cc) = self.center();
        let radius = self.config.decoy_radius.max(2);
        let last = self.size() - 1;
        loop {
            let row = (cr + self.rng.random_range(0..=2 * radius)).saturating_sub(radius);
            let col = (cc + self.rng.random_range(0..=2 * radius)).saturating_sub(radius);
            let cell = (row.min(last), col.min(last));
            if !self.is_group_cell(cell) {
                return cell;
            }
        }
    }

    fn nearest_target(&self, from: Cell) -> Cell {
        let distance = |to: &Cell| from.0.abs_diff(to.0).max(from.1.abs_diff(to.1));
        self.decoys
            .iter()
            .copied()
            .min_by_key(distance)
            .filter(|decoy| distance(decoy) <= distance(&self.center()))
            .unwrap_or_else(|| self.center())
    }

    fn advance_hostiles(&mut self) -> f32 {
        let mut reward = 0.0;

        for i in 0..self.hostiles.len() {
            let (row, col) = self.hostiles[i];
            let (tr, tc) = self.nearest_target((row, col));
            let next = (step_toward(row, tr), step_toward(col, tc));

            if let Some(pos) = self.decoys.iter().position(|&d| d == next) {
                self.decoys.swap_remove(pos);
                reward += 1.0;
                self.hostiles[i] = self.edge_cell();
            } else if self.is_group_cell(next) {
                reward -= 1.0;
                self.hostiles[i] = self.edge_cell();
            } else {
                self.hostiles[i] = next;
            }
        }

        reward
    }

    fn observation(&self) -> Observation {
        let mut plane = Array2::from_elem((self.size(), self.size()), PLAYER_BACKGROUND);
        let (cr, cc) = self.center();
        for row in cr.saturating_sub(1)..=(cr + 1).min(self.size() - 1) {
            for col in cc.saturating_sub(1)..=(cc + 1).min(self.size() - 1) {
                plane[[row, col]] = PLAYER_SELF;
            }
        }
        for &(row, col) in &self.decoys {
            plane[[row, col]] = PLAYER_SELF;
        }
        for &(row, col) in &self.hostiles {
            plane[[row, col]] = PLAYER_HOSTILE;
        }

        Observation {
            feature_screen: FeatureScreen::new().with_plane(ScreenFeature::PlayerRelative, plane),
            available_actions: vec![
                FunctionId::NoOp,
                FunctionId::SelectArmy,
                FunctionId::HallucinationAdeptQuick,
                FunctionId::HallucinationArchonQuick,
            ],
        }
    }
}

fn step_toward(from: usize, to: usize) -> usize {
    match from.cmp(&to) {
        std::cmp::Ordering::Less => from + 1,
        std::cmp::Ordering::Greater => from - 1,
        std::cmp::Ordering::Equal => from,
    }
}

impl Simulator for LocalMinigame {
    fn reset(&mut self) -> Result<TimeStep, SimulatorError> {
        if self.size() < MIN_SCREEN_SIZE {
            return Err(SimulatorError::Protocol {
                message: format!("screen size {} is too small for {}", self.size(), MAP_NAME),
            });
        }

        self.decoys.clear();
        self.hostiles = (0..self.config.hostile_units)
            .map(|_| self.edge_cell())
            .collect();
        self.game_step = 0;
        self.started = true;

        tracing::debug!("{} reset with {} hostiles", MAP_NAME, self.hostiles.len());
        Ok(TimeStep::first(self.observation()))
    }

    fn step(&mut self, action: &FunctionCall) -> Result<TimeStep, SimulatorError> {
        if !self.started {
            return Err(SimulatorError::Protocol {
                message: "step before reset".to_string(),
            });
        }

        if action.function.is_hallucination() {
            let decoy = self.decoy_cell();
            self.decoys.push(decoy);
        }

        let reward = self.advance_hostiles();
        self.game_step += 1;

        let step_type = if self.game_step >= self.config.game_steps_per_episode {
            self.started = false;
            StepType::Last
        } else {
            StepType::Mid
        };

        Ok(TimeStep {
            step_type,
            reward,
            discount: if step_type == StepType::Last { 0.0 } else { 1.0 },
            observation: self.observation(),
        })
    }

    fn dimensions(&self) -> Dimensions {
        self.config.dimensions
    }
}
