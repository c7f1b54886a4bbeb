use super::error::TaskModelError;
use chrono::TimeDelta;
use std::fmt::Debug;

/// Marker for a token the subject can select at a decision point.
pub trait Cue: Copy + Eq + Debug {}

/// A decision point offering a fixed, ordered set of cues.
///
/// Implementations must never change the offered cues after construction; the engine relies on
/// [`DecisionState::offers`] to validate every selection against the state currently on display.
pub trait DecisionState: Clone + PartialEq + Debug {
    type Cue: Cue;

    fn cues(&self) -> &[Self::Cue];

    fn offers(&self, cue: &Self::Cue) -> bool { self.cues().contains(cue) }
}

/// A scalar outcome. Negative values are permitted by the engine.
pub trait Reward: Clone + PartialEq + Debug {
    fn value(&self) -> f32;
}

/// The resolved outcome of acting on a cue: what was earned and where the graph continues.
pub trait Transition: Clone + PartialEq + Debug {
    type State: DecisionState;
    type Reward: Reward;

    fn reward(&self) -> &Self::Reward;
    fn next_state(&self) -> &Self::State;
}

/// The task-specific half of an experiment: decision graph, stochastic resolution and timing.
///
/// The engine calls into the model at fixed points of a trial and never inspects the concrete
/// cue, state or reward types beyond the traits above. Methods taking `&mut self` may draw from
/// the model's random source; the engine calls them in a fixed order so that a seeded source
/// replays identically.
pub trait TaskModel {
    type Cue: Cue;
    type State: DecisionState<Cue = Self::Cue>;
    type Reward: Reward;
    type Transition: Transition<State = Self::State, Reward = Self::Reward>;

    /// Number of successful trials after which the experiment is complete.
    fn number_of_trials(&self) -> u32;

    /// The decision state every trial starts from and must return to in order to count.
    fn start_state(&self) -> &Self::State;

    fn inter_trial_time(&mut self, trial_number: u32) -> TimeDelta;
    fn time_for_decision(&self, state: &Self::State) -> TimeDelta;
    fn decision_highlight_duration(&self, cue: &Self::Cue) -> TimeDelta;
    fn reward_highlight_duration(&self, reward: &Self::Reward) -> TimeDelta;

    /// Resolves acting on `cue` while `state` is displayed.
    fn transition(
        &mut self,
        state: &Self::State,
        cue: &Self::Cue,
    ) -> Result<Self::Transition, TaskModelError>;

    /// The transition applied when the decision deadline passes without a selection.
    ///
    /// # Returns
    /// - `Ok(None)`: The trial is aborted.
    /// - `Err(_)`: The model cannot answer for `state`; the engine treats this as fatal.
    fn no_action_transition(
        &mut self,
        state: &Self::State,
    ) -> Result<Option<Self::Transition>, TaskModelError>;
}
