use super::{
    cue::{DecisionName, StageCue, TwoCuesDecision},
    outcome::{BinaryReward, ProbabilisticTransition, TransitionOutcome},
    parameters::{TaskParameters, secs_to_delta},
    wiring::TaskWiring,
};
use crate::experiment_control::{ConfigError, DecisionState, TaskModel, TaskModelError};
use crate::info;
use chrono::TimeDelta;
use rand::{Rng, rngs::StdRng};
use rand_distr::{Distribution, Exp};

/// The two-stage decision task.
///
/// A first-stage choice leads through a common or rare transition to one of two second-stage
/// states; a second-stage choice is rewarded with its cue's win probability and returns to the
/// first stage. All draws come from the single random source `R`, in call order.
pub struct TwoStageTask<R: Rng = StdRng> {
    params: TaskParameters,
    wiring: TaskWiring,
    rng: R,
    inter_trial: Option<Exp<f32>>,
    first: TwoCuesDecision,
    second_1: TwoCuesDecision,
    second_2: TwoCuesDecision,
}

impl<R: Rng> TwoStageTask<R> {
    /// Creates a task whose wiring is drawn from `rng` before any trial draw.
    ///
    /// # Errors
    /// Any [`ConfigError`] reported by [`TaskParameters::validate`].
    pub fn new(params: TaskParameters, mut rng: R) -> Result<Self, ConfigError> {
        let wiring = TaskWiring::draw(&mut rng);
        Self::with_wiring(params, wiring, rng)
    }

    /// Creates a task with a predetermined wiring.
    ///
    /// # Errors
    /// As [`TwoStageTask::new`].
    pub fn with_wiring(params: TaskParameters, wiring: TaskWiring, rng: R) -> Result<Self, ConfigError> {
        params.validate()?;
        let inter_trial = if params.mean_inter_trial_secs > 0.0 {
            Exp::new(params.mean_inter_trial_secs.recip()).ok()
        } else {
            None
        };
        info!(
            "Two-stage wiring: First A commonly leads to {}, favoured cue is {}.",
            wiring.second_stage_for(StageCue::FirstA, true),
            wiring.favoured_cue()
        );
        Ok(Self {
            params,
            wiring,
            rng,
            inter_trial,
            first: TwoCuesDecision::new(DecisionName::First),
            second_1: TwoCuesDecision::new(DecisionName::Second1),
            second_2: TwoCuesDecision::new(DecisionName::Second2),
        })
    }

    pub fn params(&self) -> &TaskParameters { &self.params }
    pub fn wiring(&self) -> &TaskWiring { &self.wiring }

    pub fn state(&self, name: DecisionName) -> &TwoCuesDecision {
        match name {
            DecisionName::First => &self.first,
            DecisionName::Second1 => &self.second_1,
            DecisionName::Second2 => &self.second_2,
        }
    }

    /// Win probability of a second-stage cue.
    pub fn win_probability(&self, cue: StageCue) -> Result<f32, TaskModelError> {
        if !cue.is_second_stage() {
            Err(TaskModelError::NoWinProbability { cue: cue.to_string() })
        } else if cue == self.wiring.favoured_cue() {
            Ok(self.params.great_win_probability)
        } else {
            Ok(self.params.normal_win_probability)
        }
    }

    fn uniform(&mut self) -> f32 { self.rng.random::<f32>() }

    fn resolve_first_stage(&mut self, cue: StageCue) -> ProbabilisticTransition {
        let p = self.params.common_transition_probability;
        let common = self.uniform() < p;
        let next_state = *self.state(self.wiring.second_stage_for(cue, common));
        let (probability, outcome) =
            if common { (p, TransitionOutcome::Common) } else { (1.0 - p, TransitionOutcome::Rare) };
        ProbabilisticTransition::new(probability, outcome, BinaryReward::new(false, false), next_state)
    }

    fn resolve_second_stage(&mut self, cue: StageCue) -> Result<ProbabilisticTransition, TaskModelError> {
        let q = self.win_probability(cue)?;
        let win = self.uniform() < q;
        let (probability, outcome) =
            if win { (q, TransitionOutcome::Win) } else { (1.0 - q, TransitionOutcome::NoWin) };
        Ok(ProbabilisticTransition::new(probability, outcome, BinaryReward::new(win, true), self.first))
    }
}

impl<R: Rng> TaskModel for TwoStageTask<R> {
    type Cue = StageCue;
    type State = TwoCuesDecision;
    type Reward = BinaryReward;
    type Transition = ProbabilisticTransition;

    fn number_of_trials(&self) -> u32 { self.params.successful_trials_to_complete }

    fn start_state(&self) -> &TwoCuesDecision { &self.first }

    fn inter_trial_time(&mut self, _trial_number: u32) -> TimeDelta {
        match &self.inter_trial {
            Some(exp) => secs_to_delta(exp.sample(&mut self.rng)),
            None => TimeDelta::zero(),
        }
    }

    fn time_for_decision(&self, _state: &TwoCuesDecision) -> TimeDelta { self.params.time_per_decision() }

    fn decision_highlight_duration(&self, _cue: &StageCue) -> TimeDelta { self.params.decision_highlight() }

    fn reward_highlight_duration(&self, reward: &BinaryReward) -> TimeDelta {
        if reward.highlight() { self.params.reward_highlight() } else { TimeDelta::zero() }
    }

    fn transition(
        &mut self,
        state: &TwoCuesDecision,
        cue: &StageCue,
    ) -> Result<ProbabilisticTransition, TaskModelError> {
        if !state.offers(cue) {
            return Err(TaskModelError::UnresolvableCue {
                cue: cue.to_string(),
                state: state.name().to_string(),
            });
        }
        match state.name() {
            DecisionName::First => Ok(self.resolve_first_stage(*cue)),
            DecisionName::Second1 | DecisionName::Second2 => self.resolve_second_stage(*cue),
        }
    }

    fn no_action_transition(
        &mut self,
        _state: &TwoCuesDecision,
    ) -> Result<Option<ProbabilisticTransition>, TaskModelError> {
        Ok(None)
    }
}
