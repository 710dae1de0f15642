//! Substitutes a random hallucination command for the learner's action

use rand::Rng;

use crate::sc2::{FunctionCall, FunctionId};

/// The two commands the shim chooses between
pub const HALLUCINATIONS: [FunctionId; 2] = [
    FunctionId::HallucinationAdeptQuick,
    FunctionId::HallucinationArchonQuick,
];

/// Ignores the action index proposed by the learner and picks one of
/// [`HALLUCINATIONS`] uniformly at random.
#[derive(Debug)]
pub struct ActionShim<R: Rng> {
    rng: R,
}

impl<R: Rng> ActionShim<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn choose(&mut self, _proposed: usize) -> FunctionCall {
        let index = self.rng.random_range(0..HALLUCINATIONS.len());
        FunctionCall::quick(HALLUCINATIONS[index])
    }
}
