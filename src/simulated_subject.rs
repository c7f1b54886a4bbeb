use chrono::{DateTime, TimeDelta, Utc};
use rand::{Rng, rngs::StdRng};
use std::ops::Range;
use two_stage_task::{
    experiment_control::{DecisionState, ExperimentEvent, Transition},
    two_stage::{StageCue, TwoStageEvent},
};

const REACTION_MS: Range<i64> = 350..1400;
const MISS_PROBABILITY: f64 = 0.08;

/// Stand-in for a participant: answers after a random reaction time, misses a decision now and
/// then, and repeats a first-stage choice that just led to a win.
pub struct SimulatedSubject {
    rng: StdRng,
    pending: Option<(StageCue, DateTime<Utc>)>,
    first_choice: Option<StageCue>,
    repeat: Option<StageCue>,
}

impl SimulatedSubject {
    pub fn new(rng: StdRng) -> Self { Self { rng, pending: None, first_choice: None, repeat: None } }

    pub fn observe(&mut self, event: &TwoStageEvent, now: DateTime<Utc>) {
        match event {
            ExperimentEvent::DecisionStateShown { state, .. } => {
                if self.rng.random_bool(MISS_PROBABILITY) {
                    self.pending = None;
                    return;
                }
                let cue = match self.repeat {
                    Some(cue) if state.offers(&cue) => cue,
                    _ if self.rng.random_bool(0.5) => state.first(),
                    _ => state.second(),
                };
                let reaction = TimeDelta::milliseconds(self.rng.random_range(REACTION_MS));
                self.pending = Some((cue, now + reaction));
            }
            ExperimentEvent::ChoiceHighlighted { cue, .. } => {
                self.pending = None;
                if !cue.is_second_stage() {
                    self.first_choice = Some(*cue);
                }
            }
            ExperimentEvent::TransitionResolved { transition } if transition.reward().highlight() => {
                self.repeat = self.first_choice.filter(|_| transition.reward().win());
            }
            ExperimentEvent::TrialAborted => {
                self.pending = None;
                self.first_choice = None;
            }
            _ => (),
        }
    }

    /// The planned answer, once its reaction time has passed.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Option<StageCue> {
        match self.pending {
            Some((cue, due)) if due <= now => {
                self.pending = None;
                Some(cue)
            }
            _ => None,
        }
    }
}
