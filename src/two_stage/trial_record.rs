use super::cue::{DecisionName, StageCue, TwoCuesDecision};
use super::outcome::{BinaryReward, ProbabilisticTransition, TransitionOutcome};
use crate::experiment_control::{EngineProgress, ExperimentEvent, Transition};
use crate::warn;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Events emitted by an engine running the two-stage task, independent of its random source.
pub type TwoStageEvent = ExperimentEvent<StageCue, TwoCuesDecision, BinaryReward, ProbabilisticTransition>;

/// Everything observed about one trial, completed or aborted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialRecord {
    pub trial_number: u32,
    pub completed: bool,
    pub inter_trial_started_at: DateTime<Utc>,
    pub inter_trial_ms: i64,
    pub first_shown_at: Option<DateTime<Utc>>,
    pub first_choice: Option<StageCue>,
    pub first_reaction_ms: Option<i64>,
    pub common_transition: Option<bool>,
    pub second_stage: Option<DecisionName>,
    pub second_shown_at: Option<DateTime<Utc>>,
    pub second_choice: Option<StageCue>,
    pub second_reaction_ms: Option<i64>,
    pub win: Option<bool>,
    /// Win probability of the chosen second-stage cue.
    pub win_probability: Option<f32>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl TrialRecord {
    fn new(trial_number: u32, inter_trial_started_at: DateTime<Utc>, inter_trial_ms: i64) -> Self {
        Self {
            trial_number,
            completed: false,
            inter_trial_started_at,
            inter_trial_ms,
            first_shown_at: None,
            first_choice: None,
            first_reaction_ms: None,
            common_transition: None,
            second_stage: None,
            second_shown_at: None,
            second_choice: None,
            second_reaction_ms: None,
            win: None,
            win_probability: None,
            ended_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FillState {
    BeforeFirst,
    FirstShown,
    FirstDecision,
    FirstTransition,
    SecondShown,
    SecondDecision,
    SecondTransition,
}

/// Assembles one [`TrialRecord`] per trial from the engine's event stream.
#[derive(Debug, Default)]
pub struct TrialRecorder {
    current: Option<(TrialRecord, FillState)>,
    records: Vec<TrialRecord>,
}

impl TrialRecorder {
    pub fn new() -> Self { Self::default() }

    /// Finished trials in the order they ended.
    pub fn records(&self) -> &[TrialRecord] { &self.records }
    pub fn completed_count(&self) -> usize { self.records.iter().filter(|r| r.completed).count() }
    pub fn aborted_count(&self) -> usize { self.records.iter().filter(|r| !r.completed).count() }

    pub fn observe(&mut self, event: &TwoStageEvent, progress: &EngineProgress, now: DateTime<Utc>) {
        if let ExperimentEvent::InterTrialScreenShown { duration } = event {
            if let Some((unfinished, fill)) = self.current.take() {
                if fill != FillState::BeforeFirst {
                    warn!("Trial recorder dropped trial {} which never ended.", unfinished.trial_number);
                }
            }
            let record = TrialRecord::new(progress.current_trial_number(), now, duration.num_milliseconds());
            self.current = Some((record, FillState::BeforeFirst));
            return;
        }
        if matches!(event, ExperimentEvent::ExperimentCompleted) {
            return;
        }
        let Some((record, fill)) = self.current.as_mut() else {
            warn!("Trial recorder received {event} outside of a trial.");
            return;
        };

        match (event, *fill) {
            (ExperimentEvent::DecisionStateShown { .. }, FillState::BeforeFirst) => {
                record.first_shown_at = Some(now);
                *fill = FillState::FirstShown;
            }
            (ExperimentEvent::DecisionStateShown { state, .. }, FillState::FirstTransition) => {
                if record.second_stage != Some(state.name()) {
                    warn!("Trial recorder expected {:?} but {} was shown.", record.second_stage, state.name());
                }
                record.second_shown_at = Some(now);
                *fill = FillState::SecondShown;
            }
            (ExperimentEvent::ChoiceHighlighted { cue, .. }, FillState::FirstShown) => {
                record.first_choice = Some(*cue);
                record.first_reaction_ms = record.first_shown_at.map(|t| (now - t).num_milliseconds());
                *fill = FillState::FirstDecision;
            }
            (ExperimentEvent::ChoiceHighlighted { cue, .. }, FillState::SecondShown) => {
                record.second_choice = Some(*cue);
                record.second_reaction_ms = record.second_shown_at.map(|t| (now - t).num_milliseconds());
                *fill = FillState::SecondDecision;
            }
            (ExperimentEvent::TransitionResolved { transition }, FillState::FirstDecision) => {
                record.common_transition = Some(transition.outcome() == TransitionOutcome::Common);
                record.second_stage = Some(transition.next_state().name());
                *fill = FillState::FirstTransition;
            }
            (ExperimentEvent::TransitionResolved { transition }, FillState::SecondDecision) => {
                let win = transition.reward().win();
                record.win = Some(win);
                let p = transition.probability();
                record.win_probability = Some(if win { p } else { 1.0 - p });
                *fill = FillState::SecondTransition;
            }
            (ExperimentEvent::TrialCompleted, state) => {
                if state != FillState::SecondTransition {
                    warn!("Trial recorder saw trial {} complete while in {state:?}.", record.trial_number);
                }
                self.finish(true, now);
            }
            (ExperimentEvent::TrialAborted, _) => self.finish(false, now),
            (
                ExperimentEvent::RewardEarned { .. }
                | ExperimentEvent::RewardShown { .. }
                | ExperimentEvent::RewardSkipped { .. },
                _,
            ) => (),
            (other, state) => {
                warn!("Trial recorder cannot place {other} in {state:?}.");
            }
        }
    }

    fn finish(&mut self, completed: bool, now: DateTime<Utc>) {
        if let Some((mut record, _)) = self.current.take() {
            record.completed = completed;
            record.ended_at = Some(now);
            self.records.push(record);
        }
    }
}
