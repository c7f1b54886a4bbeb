use crate::experiment_control::{Cue, DecisionState};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// The six selectable options of the two-stage task.
#[derive(Debug, Display, PartialEq, Eq, Clone, Copy, Hash, EnumIter, Serialize, Deserialize)]
pub enum StageCue {
    #[strum(serialize = "First A")]
    FirstA,
    #[strum(serialize = "First B")]
    FirstB,
    #[strum(serialize = "Second 1 A")]
    Second1A,
    #[strum(serialize = "Second 1 B")]
    Second1B,
    #[strum(serialize = "Second 2 A")]
    Second2A,
    #[strum(serialize = "Second 2 B")]
    Second2B,
}

impl StageCue {
    /// Second-stage cues in the order used to pick the favoured one.
    pub const SECOND_STAGE: [StageCue; 4] =
        [StageCue::Second1A, StageCue::Second1B, StageCue::Second2A, StageCue::Second2B];

    pub fn is_second_stage(self) -> bool { Self::SECOND_STAGE.contains(&self) }
}

impl Cue for StageCue {}

#[derive(Debug, Display, PartialEq, Eq, Clone, Copy, Hash, EnumIter, Serialize, Deserialize)]
pub enum DecisionName {
    First,
    #[strum(serialize = "Second 1")]
    Second1,
    #[strum(serialize = "Second 2")]
    Second2,
}

/// A decision point showing two cues side by side.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct TwoCuesDecision {
    name: DecisionName,
    cues: [StageCue; 2],
}

impl TwoCuesDecision {
    pub fn new(name: DecisionName) -> Self {
        let cues = match name {
            DecisionName::First => [StageCue::FirstA, StageCue::FirstB],
            DecisionName::Second1 => [StageCue::Second1A, StageCue::Second1B],
            DecisionName::Second2 => [StageCue::Second2A, StageCue::Second2B],
        };
        Self { name, cues }
    }

    pub fn name(&self) -> DecisionName { self.name }
    pub fn first(&self) -> StageCue { self.cues[0] }
    pub fn second(&self) -> StageCue { self.cues[1] }
}

impl DecisionState for TwoCuesDecision {
    type Cue = StageCue;

    fn cues(&self) -> &[StageCue] { &self.cues }
}
