use super::cue::TwoCuesDecision;
use crate::experiment_control::{Reward, Transition};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// A win (value 1) or no-win (value 0), optionally flagged for a reward display.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub struct BinaryReward {
    win: bool,
    highlight: bool,
}

impl BinaryReward {
    pub fn new(win: bool, highlight: bool) -> Self { Self { win, highlight } }
    pub fn win(&self) -> bool { self.win }
    pub fn highlight(&self) -> bool { self.highlight }
}

impl Reward for BinaryReward {
    fn value(&self) -> f32 { if self.win { 1.0 } else { 0.0 } }
}

/// Which branch of a stochastic decision was realized.
#[derive(Debug, Display, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum TransitionOutcome {
    Common,
    Rare,
    Win,
    NoWin,
}

/// A transition together with the probability of the branch that was drawn.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct ProbabilisticTransition {
    probability: f32,
    outcome: TransitionOutcome,
    reward: BinaryReward,
    next_state: TwoCuesDecision,
}

impl ProbabilisticTransition {
    pub fn new(
        probability: f32,
        outcome: TransitionOutcome,
        reward: BinaryReward,
        next_state: TwoCuesDecision,
    ) -> Self {
        Self { probability, outcome, reward, next_state }
    }

    /// Probability with which this particular outcome was realized.
    pub fn probability(&self) -> f32 { self.probability }
    pub fn outcome(&self) -> TransitionOutcome { self.outcome }
}

impl Transition for ProbabilisticTransition {
    type State = TwoCuesDecision;
    type Reward = BinaryReward;

    fn reward(&self) -> &BinaryReward { &self.reward }
    fn next_state(&self) -> &TwoCuesDecision { &self.next_state }
}
