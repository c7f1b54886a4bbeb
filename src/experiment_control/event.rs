use super::{progress::EngineProgress, task_model::TaskModel};
use crate::{event, info, trial};
use chrono::{DateTime, TimeDelta, Utc};
use strum_macros::Display;

/// One notification per engine phase change, carrying the data a renderer or logger needs.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum ExperimentEvent<C, S, R, T> {
    InterTrialScreenShown { duration: TimeDelta },
    DecisionStateShown { state: S, max_decision_time: TimeDelta },
    ChoiceHighlighted { cue: C, duration: TimeDelta },
    TransitionResolved { transition: T },
    RewardEarned { reward: R },
    RewardShown { reward: R, duration: TimeDelta },
    RewardSkipped { reward: R },
    TrialAborted,
    TrialCompleted,
    ExperimentCompleted,
}

/// The event type emitted by an engine driving the model `M`.
pub type EventOf<M> = ExperimentEvent<
    <M as TaskModel>::Cue,
    <M as TaskModel>::State,
    <M as TaskModel>::Reward,
    <M as TaskModel>::Transition,
>;

/// Receives engine events in registration order.
///
/// Listeners only ever see the event, a progress snapshot taken after the phase change and the
/// `now` of the call that caused it, so they cannot feed commands back into the engine mid-step.
pub trait ExperimentListener<M: TaskModel> {
    fn on_event(&mut self, event: &EventOf<M>, progress: &EngineProgress, now: DateTime<Utc>);
}

impl<M, F> ExperimentListener<M> for F
where
    M: TaskModel,
    F: FnMut(&EventOf<M>, &EngineProgress, DateTime<Utc>),
{
    fn on_event(&mut self, event: &EventOf<M>, progress: &EngineProgress, now: DateTime<Utc>) {
        self(event, progress, now);
    }
}

pub(crate) struct ListenerHub<M: TaskModel> {
    listeners: Vec<Box<dyn ExperimentListener<M>>>,
}

impl<M: TaskModel> Default for ListenerHub<M> {
    fn default() -> Self { Self { listeners: Vec::new() } }
}

impl<M: TaskModel> ListenerHub<M> {
    pub(crate) fn subscribe(&mut self, listener: Box<dyn ExperimentListener<M>>) {
        self.listeners.push(listener);
    }

    pub(crate) fn len(&self) -> usize { self.listeners.len() }

    pub(crate) fn emit(&mut self, event: &EventOf<M>, progress: &EngineProgress, now: DateTime<Utc>) {
        for listener in &mut self.listeners {
            listener.on_event(event, progress, now);
        }
    }
}

/// Writes every engine event to the console log.
#[derive(Debug, Default, Clone, Copy)]
pub struct EventLogger;

impl<M: TaskModel> ExperimentListener<M> for EventLogger {
    fn on_event(&mut self, event: &EventOf<M>, progress: &EngineProgress, _now: DateTime<Utc>) {
        let trial_no = progress.current_trial_number();
        match event {
            ExperimentEvent::InterTrialScreenShown { duration } => {
                trial!("Trial {trial_no} starts in {}ms.", duration.num_milliseconds());
            }
            ExperimentEvent::TrialCompleted => trial!(
                "Trial {trial_no} completed, {}/{} successful, cumulative reward {}.",
                progress.successful_trial_count(),
                progress.target_successful_trial_count(),
                progress.cumulative_reward()
            ),
            ExperimentEvent::TrialAborted => trial!("Trial {trial_no} aborted."),
            ExperimentEvent::ExperimentCompleted => info!(
                "Experiment completed after {trial_no} trials with cumulative reward {}.",
                progress.cumulative_reward()
            ),
            other => event!("Trial {trial_no}: {other:?}"),
        }
    }
}
