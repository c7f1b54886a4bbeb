use super::cue::{DecisionName, StageCue};
use crate::experiment_control::TaskModelError;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Per-experiment random assignment of the decision graph, fixed once drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskWiring {
    /// Whether the common transition of `First A` leads to `Second 1` (and `First B` to `Second 2`).
    common_first_a_to_second_1: bool,
    /// The single second-stage cue granted the great win probability.
    favoured_cue: StageCue,
}

impl TaskWiring {
    /// # Errors
    /// [`TaskModelError::NoWinProbability`] if `favoured_cue` is not a second-stage cue.
    pub fn new(common_first_a_to_second_1: bool, favoured_cue: StageCue) -> Result<Self, TaskModelError> {
        if !favoured_cue.is_second_stage() {
            return Err(TaskModelError::NoWinProbability { cue: favoured_cue.to_string() });
        }
        Ok(Self { common_first_a_to_second_1, favoured_cue })
    }

    /// Draws a fair coin for the common mapping, then a uniform favoured second-stage cue.
    pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let common_first_a_to_second_1 = rng.random_bool(0.5);
        let favoured_cue = StageCue::SECOND_STAGE[rng.random_range(0..StageCue::SECOND_STAGE.len())];
        Self { common_first_a_to_second_1, favoured_cue }
    }

    pub fn common_first_a_to_second_1(&self) -> bool { self.common_first_a_to_second_1 }
    pub fn favoured_cue(&self) -> StageCue { self.favoured_cue }

    /// The second-stage state reached from `first_choice` on a common or rare transition.
    pub fn second_stage_for(&self, first_choice: StageCue, common: bool) -> DecisionName {
        let via_second_1 = (first_choice == StageCue::FirstA) == (common == self.common_first_a_to_second_1);
        if via_second_1 { DecisionName::Second1 } else { DecisionName::Second2 }
    }
}
