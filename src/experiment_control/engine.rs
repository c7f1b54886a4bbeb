use super::{
    engine_phase::EnginePhase,
    error::SelectionError,
    event::{EventOf, ExperimentEvent, ExperimentListener, ListenerHub},
    phase_deadline::PhaseDeadline,
    progress::EngineProgress,
    task_model::{DecisionState, Reward, TaskModel, Transition},
};
use crate::{fatal, log, warn};
use chrono::{DateTime, TimeDelta, Utc};

/// Phase bookkeeping. Every timed phase owns its deadline, so an untimed phase can never be polled.
#[derive(Debug)]
enum Phase<R> {
    Idle,
    BeforeTrial(PhaseDeadline),
    Decision(PhaseDeadline),
    /// The choice is resolved and its reward already booked; `reward` is displayed next.
    HighlightChoice { deadline: PhaseDeadline, reward: R },
    HighlightReward(PhaseDeadline),
}

impl<R> Phase<R> {
    fn kind(&self) -> EnginePhase {
        match self {
            Phase::Idle => EnginePhase::Idle,
            Phase::BeforeTrial(_) => EnginePhase::BeforeTrial,
            Phase::Decision(_) => EnginePhase::Decision,
            Phase::HighlightChoice { .. } => EnginePhase::HighlightChoice,
            Phase::HighlightReward(_) => EnginePhase::HighlightReward,
        }
    }

    fn deadline(&self) -> Option<&PhaseDeadline> {
        match self {
            Phase::Idle => None,
            Phase::BeforeTrial(d) | Phase::Decision(d) | Phase::HighlightReward(d) => Some(d),
            Phase::HighlightChoice { deadline, .. } => Some(deadline),
        }
    }
}

/// Deadline-driven state machine sequencing the trials of an experiment.
///
/// The engine owns no clock: every command and every poll carries the caller's `now`, which must
/// never decrease over the lifetime of the engine. Each call performs its phase changes
/// synchronously and notifies the registered listeners before returning.
pub struct TrialEngine<M: TaskModel> {
    model: M,
    phase: Phase<M::Reward>,
    current_state: M::State,
    progress: EngineProgress,
    listeners: ListenerHub<M>,
    last_now: Option<DateTime<Utc>>,
}

impl<M: TaskModel> TrialEngine<M> {
    pub fn new(model: M) -> Self {
        let current_state = model.start_state().clone();
        let progress = EngineProgress::new(model.number_of_trials());
        Self {
            model,
            phase: Phase::Idle,
            current_state,
            progress,
            listeners: ListenerHub::default(),
            last_now: None,
        }
    }

    pub fn model(&self) -> &M { &self.model }
    pub fn progress(&self) -> &EngineProgress { &self.progress }
    pub fn phase(&self) -> EnginePhase { self.phase.kind() }
    pub fn listener_count(&self) -> usize { self.listeners.len() }

    /// The decision state on display, or the one the running trial will continue with.
    pub fn current_state(&self) -> &M::State { &self.current_state }

    /// Time left in the active phase; zero while idle.
    pub fn countdown(&self, now: DateTime<Utc>) -> TimeDelta {
        self.phase.deadline().map_or(TimeDelta::zero(), |d| d.time_left(now))
    }

    pub fn subscribe<L>(&mut self, listener: L)
    where
        L: ExperimentListener<M> + 'static,
    {
        self.listeners.subscribe(Box::new(listener));
    }

    /// Registers a closure listener. Closures registered earlier are called first.
    pub fn subscribe_fn<F>(&mut self, listener: F)
    where
        F: FnMut(&EventOf<M>, &EngineProgress, DateTime<Utc>) + 'static,
    {
        self.listeners.subscribe(Box::new(listener));
    }

    /// Enters the inter-trial interval of the next trial.
    ///
    /// Only acts while idle. If the completion target is already reached, the experiment completed
    /// notification is repeated and the engine stays idle.
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.observe(now);
        if let Phase::Idle = self.phase {
            self.prepare_next_trial(now);
        } else {
            log!("Ignoring start request, engine is already in {}.", self.phase());
        }
    }

    /// Suspends the experiment. A trial with visible content is aborted, never resumed.
    pub fn pause(&mut self, now: DateTime<Utc>) {
        self.observe(now);
        let was_mid_trial = self.phase().is_mid_trial();
        self.phase = Phase::Idle;
        if was_mid_trial {
            self.emit(ExperimentEvent::TrialAborted, now);
        }
    }

    /// Submits the subject's choice for the decision state on display.
    ///
    /// # Errors
    /// - [`SelectionError::NoDecisionActive`]: No decision state is currently displayed.
    /// - [`SelectionError::CueNotOffered`]: `cue` is not one of the displayed state's cues.
    pub fn select_cue(&mut self, cue: M::Cue, now: DateTime<Utc>) -> Result<(), SelectionError> {
        self.observe(now);
        if !matches!(self.phase, Phase::Decision(_)) {
            let err = SelectionError::NoDecisionActive { phase: self.phase() };
            warn!("Rejected selection of {cue:?}: {err}");
            return Err(err);
        }
        if !self.current_state.offers(&cue) {
            let err = SelectionError::CueNotOffered {
                cue: format!("{cue:?}"),
                state: format!("{:?}", self.current_state),
            };
            warn!("Rejected selection: {err}");
            return Err(err);
        }

        let transition = self
            .model
            .transition(&self.current_state, &cue)
            .unwrap_or_else(|e| fatal!("Task model failed to resolve a valid selection: {e}"));
        let duration = self.model.decision_highlight_duration(&cue);
        self.emit(ExperimentEvent::ChoiceHighlighted { cue, duration }, now);
        let reward = self.apply_transition(transition, now);

        if duration > TimeDelta::zero() {
            let deadline = PhaseDeadline::new(now, duration);
            self.phase = Phase::HighlightChoice { deadline, reward };
        } else {
            self.show_reward(reward, now);
        }
        Ok(())
    }

    /// Polls the active deadline and performs at most one phase change if it has elapsed.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        self.observe(now);
        match self.phase.deadline() {
            Some(deadline) if deadline.has_elapsed(now) => (),
            _ => return,
        }
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => fatal!("Idle phase reported an elapsed deadline"),
            Phase::BeforeTrial(_) => self.show_current_state(now),
            Phase::Decision(_) => self.decision_deadline_missed(now),
            Phase::HighlightChoice { reward, .. } => self.show_reward(reward, now),
            Phase::HighlightReward(_) => self.after_highlight_reward(now),
        }
    }

    fn observe(&mut self, now: DateTime<Utc>) {
        if let Some(last) = self.last_now {
            if now < last {
                fatal!("Engine clock went backwards from {last} to {now}");
            }
        }
        self.last_now = Some(now);
    }

    fn emit(&mut self, event: EventOf<M>, now: DateTime<Utc>) {
        self.listeners.emit(&event, &self.progress, now);
    }

    fn prepare_next_trial(&mut self, now: DateTime<Utc>) {
        if self.progress.target_reached() {
            self.phase = Phase::Idle;
            self.emit(ExperimentEvent::ExperimentCompleted, now);
            return;
        }

        let trial_number = self.progress.begin_trial();
        self.current_state = self.model.start_state().clone();
        let duration = self.model.inter_trial_time(trial_number);
        self.phase = Phase::BeforeTrial(PhaseDeadline::new(now, duration));
        self.emit(ExperimentEvent::InterTrialScreenShown { duration }, now);
    }

    fn show_current_state(&mut self, now: DateTime<Utc>) {
        let max_decision_time = self.model.time_for_decision(&self.current_state);
        self.phase = Phase::Decision(PhaseDeadline::new(now, max_decision_time));
        let state = self.current_state.clone();
        self.emit(ExperimentEvent::DecisionStateShown { state, max_decision_time }, now);
    }

    fn decision_deadline_missed(&mut self, now: DateTime<Utc>) {
        let default = self.model.no_action_transition(&self.current_state).unwrap_or_else(|e| {
            fatal!("Task model rejected the no-action query: {e}")
        });
        if let Some(transition) = default {
            let reward = self.apply_transition(transition, now);
            self.show_reward(reward, now);
        } else {
            self.emit(ExperimentEvent::TrialAborted, now);
            self.prepare_next_trial(now);
        }
    }

    /// Books the reward and moves the graph on. Returns the reward for display.
    fn apply_transition(&mut self, transition: M::Transition, now: DateTime<Utc>) -> M::Reward {
        self.current_state = transition.next_state().clone();
        let reward = transition.reward().clone();
        self.progress.add_reward(reward.value());
        self.emit(ExperimentEvent::TransitionResolved { transition }, now);
        self.emit(ExperimentEvent::RewardEarned { reward: reward.clone() }, now);
        reward
    }

    fn show_reward(&mut self, reward: M::Reward, now: DateTime<Utc>) {
        let duration = self.model.reward_highlight_duration(&reward);
        if duration > TimeDelta::zero() {
            self.phase = Phase::HighlightReward(PhaseDeadline::new(now, duration));
            self.emit(ExperimentEvent::RewardShown { reward, duration }, now);
        } else {
            self.emit(ExperimentEvent::RewardSkipped { reward }, now);
            self.after_highlight_reward(now);
        }
    }

    fn after_highlight_reward(&mut self, now: DateTime<Utc>) {
        if self.current_state == *self.model.start_state() {
            self.progress.complete_trial();
            self.emit(ExperimentEvent::TrialCompleted, now);
            self.prepare_next_trial(now);
        } else {
            self.show_current_state(now);
        }
    }
}
