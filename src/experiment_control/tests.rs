use super::{
    Cue, DecisionState, EngineProgress, EnginePhase, EventOf, ExperimentEvent, PhaseDeadline,
    Reward, SelectionError, TaskModel, TaskModelError, Transition, TrialEngine,
};
use chrono::{DateTime, TimeDelta, Utc};
use std::{cell::RefCell, rc::Rc};
use strum::IntoEnumIterator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Token(u8);

impl Cue for Token {}

#[derive(Debug, Clone, PartialEq)]
struct Node {
    id: u8,
    cues: Vec<Token>,
}

impl DecisionState for Node {
    type Cue = Token;

    fn cues(&self) -> &[Token] { &self.cues }
}

#[derive(Debug, Clone, PartialEq)]
struct Points(f32);

impl Reward for Points {
    fn value(&self) -> f32 { self.0 }
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    reward: Points,
    next: Node,
}

impl Transition for Step {
    type State = Node;
    type Reward = Points;

    fn reward(&self) -> &Points { &self.reward }
    fn next_state(&self) -> &Node { &self.next }
}

/// Start node offers tokens 1 and 2 (reward = token value) and leads to a second node offering
/// token 3, which returns to the start with reward 10.
struct ChainModel {
    trials: u32,
    start: Node,
    second: Node,
    iti: TimeDelta,
    decision: TimeDelta,
    choice_highlight: TimeDelta,
    reward_highlight: TimeDelta,
    default_reward: Option<f32>,
}

impl ChainModel {
    fn new(trials: u32) -> Self {
        Self {
            trials,
            start: Node { id: 0, cues: vec![Token(1), Token(2)] },
            second: Node { id: 1, cues: vec![Token(3)] },
            iti: TimeDelta::milliseconds(100),
            decision: TimeDelta::milliseconds(1000),
            choice_highlight: TimeDelta::milliseconds(200),
            reward_highlight: TimeDelta::milliseconds(300),
            default_reward: None,
        }
    }

    fn instant(mut self) -> Self {
        self.iti = TimeDelta::zero();
        self.choice_highlight = TimeDelta::zero();
        self.reward_highlight = TimeDelta::zero();
        self
    }
}

impl TaskModel for ChainModel {
    type Cue = Token;
    type State = Node;
    type Reward = Points;
    type Transition = Step;

    fn number_of_trials(&self) -> u32 { self.trials }
    fn start_state(&self) -> &Node { &self.start }
    fn inter_trial_time(&mut self, _trial_number: u32) -> TimeDelta { self.iti }
    fn time_for_decision(&self, _state: &Node) -> TimeDelta { self.decision }
    fn decision_highlight_duration(&self, _cue: &Token) -> TimeDelta { self.choice_highlight }
    fn reward_highlight_duration(&self, _reward: &Points) -> TimeDelta { self.reward_highlight }

    fn transition(&mut self, state: &Node, cue: &Token) -> Result<Step, TaskModelError> {
        match state.id {
            0 => Ok(Step { reward: Points(f32::from(cue.0)), next: self.second.clone() }),
            1 => Ok(Step { reward: Points(10.0), next: self.start.clone() }),
            _ => Err(TaskModelError::UnresolvableCue {
                cue: format!("{cue:?}"),
                state: format!("{state:?}"),
            }),
        }
    }

    fn no_action_transition(&mut self, _state: &Node) -> Result<Option<Step>, TaskModelError> {
        Ok(self.default_reward.map(|v| Step { reward: Points(v), next: self.start.clone() }))
    }
}

type Log = Rc<RefCell<Vec<EventOf<ChainModel>>>>;

fn at(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap() + TimeDelta::milliseconds(ms)
}

fn engine_with_log(model: ChainModel) -> (TrialEngine<ChainModel>, Log) {
    let mut engine = TrialEngine::new(model);
    let log: Log = Rc::default();
    let sink = Rc::clone(&log);
    engine.subscribe_fn(move |event: &EventOf<ChainModel>, _: &EngineProgress, _| {
        sink.borrow_mut().push(event.clone());
    });
    (engine, log)
}

fn drain(log: &Log) -> Vec<EventOf<ChainModel>> { log.borrow_mut().drain(..).collect() }

#[test]
fn test_start_enters_inter_trial_interval() {
    let (mut engine, log) = engine_with_log(ChainModel::new(3));
    assert_eq!(engine.phase(), EnginePhase::Idle);
    engine.start(at(0));
    assert_eq!(engine.phase(), EnginePhase::BeforeTrial);
    assert_eq!(engine.progress().current_trial_number(), 1);
    assert_eq!(
        drain(&log),
        vec![ExperimentEvent::InterTrialScreenShown { duration: TimeDelta::milliseconds(100) }]
    );

    engine.start(at(10));
    assert!(drain(&log).is_empty());
    assert_eq!(engine.progress().current_trial_number(), 1);
}

#[test]
fn test_full_trial_cycle() {
    let (mut engine, log) = engine_with_log(ChainModel::new(3));
    let start = engine.model().start.clone();
    let second = engine.model().second.clone();
    engine.start(at(0));
    drain(&log);

    engine.tick(at(50));
    assert_eq!(engine.phase(), EnginePhase::BeforeTrial);
    engine.tick(at(100));
    assert_eq!(engine.phase(), EnginePhase::Decision);
    assert_eq!(
        drain(&log),
        vec![ExperimentEvent::DecisionStateShown {
            state: start.clone(),
            max_decision_time: TimeDelta::milliseconds(1000),
        }]
    );

    engine.select_cue(Token(2), at(150)).unwrap();
    assert_eq!(engine.phase(), EnginePhase::HighlightChoice);
    assert!((engine.progress().cumulative_reward() - 2.0).abs() < f32::EPSILON);
    assert_eq!(
        drain(&log),
        vec![
            ExperimentEvent::ChoiceHighlighted { cue: Token(2), duration: TimeDelta::milliseconds(200) },
            ExperimentEvent::TransitionResolved {
                transition: Step { reward: Points(2.0), next: second.clone() },
            },
            ExperimentEvent::RewardEarned { reward: Points(2.0) },
        ]
    );

    engine.tick(at(349));
    assert_eq!(engine.phase(), EnginePhase::HighlightChoice);
    engine.tick(at(350));
    assert_eq!(engine.phase(), EnginePhase::HighlightReward);
    assert_eq!(
        drain(&log),
        vec![ExperimentEvent::RewardShown {
            reward: Points(2.0),
            duration: TimeDelta::milliseconds(300),
        }]
    );

    engine.tick(at(650));
    assert_eq!(engine.phase(), EnginePhase::Decision);
    assert_eq!(engine.current_state(), &second);
    engine.select_cue(Token(3), at(700)).unwrap();
    engine.tick(at(900));
    drain(&log);
    engine.tick(at(1200));

    assert_eq!(
        drain(&log),
        vec![
            ExperimentEvent::TrialCompleted,
            ExperimentEvent::InterTrialScreenShown { duration: TimeDelta::milliseconds(100) },
        ]
    );
    assert_eq!(engine.phase(), EnginePhase::BeforeTrial);
    assert_eq!(engine.progress().successful_trial_count(), 1);
    assert_eq!(engine.progress().current_trial_number(), 2);
    assert!((engine.progress().cumulative_reward() - 12.0).abs() < f32::EPSILON);
}

#[test]
fn test_selection_outside_decision_is_rejected() {
    let (mut engine, log) = engine_with_log(ChainModel::new(1));
    assert_eq!(
        engine.select_cue(Token(1), at(0)),
        Err(SelectionError::NoDecisionActive { phase: EnginePhase::Idle })
    );
    engine.start(at(0));
    drain(&log);
    assert_eq!(
        engine.select_cue(Token(1), at(10)),
        Err(SelectionError::NoDecisionActive { phase: EnginePhase::BeforeTrial })
    );
    assert!(drain(&log).is_empty());
    assert_eq!(engine.phase(), EnginePhase::BeforeTrial);
}

#[test]
fn test_unoffered_cue_is_rejected_without_mutation() {
    let (mut engine, log) = engine_with_log(ChainModel::new(1));
    engine.start(at(0));
    engine.tick(at(100));
    drain(&log);

    let res = engine.select_cue(Token(3), at(200));
    assert!(matches!(res, Err(SelectionError::CueNotOffered { .. })));
    assert!(drain(&log).is_empty());
    assert_eq!(engine.phase(), EnginePhase::Decision);
    assert_eq!(engine.progress().cumulative_reward(), 0.0);
    assert!(engine.select_cue(Token(1), at(300)).is_ok());
}

#[test]
fn test_decision_timeout_aborts_trial() {
    let (mut engine, log) = engine_with_log(ChainModel::new(2));
    engine.start(at(0));
    engine.tick(at(100));
    drain(&log);

    engine.tick(at(1099));
    assert!(drain(&log).is_empty());
    engine.tick(at(1100));
    assert_eq!(
        drain(&log),
        vec![
            ExperimentEvent::TrialAborted,
            ExperimentEvent::InterTrialScreenShown { duration: TimeDelta::milliseconds(100) },
        ]
    );
    assert_eq!(engine.phase(), EnginePhase::BeforeTrial);
    assert_eq!(engine.progress().successful_trial_count(), 0);
    assert_eq!(engine.progress().current_trial_number(), 2);
}

#[test]
fn test_decision_timeout_applies_default_transition() {
    let mut model = ChainModel::new(2);
    model.default_reward = Some(5.0);
    let (mut engine, log) = engine_with_log(model);
    let start = engine.model().start.clone();
    engine.start(at(0));
    engine.tick(at(100));
    drain(&log);

    engine.tick(at(1100));
    assert_eq!(
        drain(&log),
        vec![
            ExperimentEvent::TransitionResolved { transition: Step { reward: Points(5.0), next: start } },
            ExperimentEvent::RewardEarned { reward: Points(5.0) },
            ExperimentEvent::RewardShown { reward: Points(5.0), duration: TimeDelta::milliseconds(300) },
        ]
    );
    engine.tick(at(1400));
    assert_eq!(drain(&log)[0], ExperimentEvent::TrialCompleted);
    assert_eq!(engine.progress().successful_trial_count(), 1);
    assert!((engine.progress().cumulative_reward() - 5.0).abs() < f32::EPSILON);
}

#[test]
fn test_zero_highlights_skip_display_phases() {
    let (mut engine, log) = engine_with_log(ChainModel::new(5).instant());
    let second = engine.model().second.clone();
    engine.start(at(0));
    engine.tick(at(0));
    drain(&log);

    engine.select_cue(Token(1), at(10)).unwrap();
    assert_eq!(engine.phase(), EnginePhase::Decision);
    assert_eq!(engine.current_state(), &second);
    assert_eq!(
        drain(&log),
        vec![
            ExperimentEvent::ChoiceHighlighted { cue: Token(1), duration: TimeDelta::zero() },
            ExperimentEvent::TransitionResolved {
                transition: Step { reward: Points(1.0), next: second.clone() },
            },
            ExperimentEvent::RewardEarned { reward: Points(1.0) },
            ExperimentEvent::RewardSkipped { reward: Points(1.0) },
            ExperimentEvent::DecisionStateShown {
                state: second,
                max_decision_time: TimeDelta::milliseconds(1000),
            },
        ]
    );
}

#[test]
fn test_negative_highlight_is_skipped() {
    let mut model = ChainModel::new(5);
    model.choice_highlight = TimeDelta::milliseconds(-50);
    model.reward_highlight = TimeDelta::milliseconds(-50);
    let (mut engine, log) = engine_with_log(model);
    engine.start(at(0));
    engine.tick(at(100));
    drain(&log);
    engine.select_cue(Token(2), at(120)).unwrap();
    assert_eq!(engine.phase(), EnginePhase::Decision);
    let events = drain(&log);
    assert!(events.iter().any(|e| matches!(e, ExperimentEvent::RewardSkipped { .. })));
    assert!(!events.iter().any(|e| matches!(e, ExperimentEvent::RewardShown { .. })));
}

#[test]
fn test_pause_mid_decision_aborts_once() {
    let (mut engine, log) = engine_with_log(ChainModel::new(3));
    let start = engine.model().start.clone();
    engine.start(at(0));
    engine.tick(at(100));
    engine.select_cue(Token(1), at(150)).unwrap();
    engine.tick(at(350));
    engine.tick(at(650));
    assert_eq!(engine.phase(), EnginePhase::Decision);
    drain(&log);

    engine.pause(at(700));
    assert_eq!(engine.phase(), EnginePhase::Idle);
    assert_eq!(drain(&log), vec![ExperimentEvent::TrialAborted]);

    engine.tick(at(5000));
    engine.pause(at(5000));
    assert!(drain(&log).is_empty());

    engine.start(at(6000));
    assert_eq!(engine.progress().current_trial_number(), 2);
    assert_eq!(engine.current_state(), &start);
    engine.tick(at(6100));
    assert_eq!(
        drain(&log)[1],
        ExperimentEvent::DecisionStateShown { state: start, max_decision_time: TimeDelta::milliseconds(1000) }
    );
    assert_eq!(engine.progress().successful_trial_count(), 0);
}

#[test]
fn test_pause_mid_choice_highlight_aborts_once() {
    let (mut engine, log) = engine_with_log(ChainModel::new(3));
    engine.start(at(0));
    engine.tick(at(100));
    engine.select_cue(Token(2), at(150)).unwrap();
    assert_eq!(engine.phase(), EnginePhase::HighlightChoice);
    drain(&log);

    engine.pause(at(200));
    assert_eq!(engine.phase(), EnginePhase::Idle);
    assert_eq!(drain(&log), vec![ExperimentEvent::TrialAborted]);
    assert_eq!(engine.progress().successful_trial_count(), 0);
    assert!((engine.progress().cumulative_reward() - 2.0).abs() < f32::EPSILON);

    engine.tick(at(1000));
    assert!(drain(&log).is_empty());
}

#[test]
fn test_pause_mid_reward_highlight_aborts_once() {
    let (mut engine, log) = engine_with_log(ChainModel::new(3));
    engine.start(at(0));
    engine.tick(at(100));
    engine.select_cue(Token(1), at(150)).unwrap();
    engine.tick(at(350));
    assert_eq!(engine.phase(), EnginePhase::HighlightReward);
    drain(&log);

    engine.pause(at(400));
    assert_eq!(engine.phase(), EnginePhase::Idle);
    assert_eq!(drain(&log), vec![ExperimentEvent::TrialAborted]);
    assert_eq!(engine.progress().successful_trial_count(), 0);
    assert!((engine.progress().cumulative_reward() - 1.0).abs() < f32::EPSILON);

    engine.tick(at(2000));
    assert!(drain(&log).is_empty());
}

#[test]
fn test_pause_before_trial_does_not_abort() {
    let (mut engine, log) = engine_with_log(ChainModel::new(3));
    engine.start(at(0));
    drain(&log);
    engine.pause(at(50));
    assert_eq!(engine.phase(), EnginePhase::Idle);
    assert!(drain(&log).is_empty());
}

#[test]
fn test_experiment_completes_at_target() {
    let (mut engine, log) = engine_with_log(ChainModel::new(1).instant());
    engine.start(at(0));
    engine.tick(at(0));
    engine.select_cue(Token(2), at(10)).unwrap();
    engine.select_cue(Token(3), at(20)).unwrap();

    let events = drain(&log);
    assert_eq!(
        events[events.len() - 2..],
        [ExperimentEvent::TrialCompleted, ExperimentEvent::ExperimentCompleted]
    );
    assert_eq!(engine.phase(), EnginePhase::Idle);
    assert_eq!(engine.progress().successful_trial_count(), 1);
    assert!(engine.progress().target_reached());

    engine.tick(at(100_000));
    assert!(engine.select_cue(Token(1), at(100_001)).is_err());
    assert!(drain(&log).is_empty());

    engine.start(at(100_002));
    assert_eq!(drain(&log), vec![ExperimentEvent::ExperimentCompleted]);
    assert_eq!(engine.phase(), EnginePhase::Idle);
    assert_eq!(engine.progress().current_trial_number(), 1);
}

#[test]
fn test_countdown_tracks_active_deadline() {
    let (mut engine, _log) = engine_with_log(ChainModel::new(1));
    assert_eq!(engine.countdown(at(0)), TimeDelta::zero());
    engine.start(at(0));
    engine.tick(at(100));
    assert_eq!(engine.countdown(at(400)), TimeDelta::milliseconds(700));
    assert_eq!(engine.countdown(at(2000)), TimeDelta::zero());
}

#[test]
fn test_listeners_run_in_registration_order() {
    let mut engine = TrialEngine::new(ChainModel::new(1));
    let order = Rc::new(RefCell::new(Vec::new()));
    for id in 0..3 {
        let sink = Rc::clone(&order);
        engine.subscribe_fn(move |_: &EventOf<ChainModel>, _: &EngineProgress, _| sink.borrow_mut().push(id));
    }
    engine.subscribe(super::EventLogger);
    assert_eq!(engine.listener_count(), 4);
    engine.start(at(0));
    assert_eq!(*order.borrow(), vec![0, 1, 2]);
}

#[test]
fn test_listener_sees_progress_after_phase_change() {
    let mut engine = TrialEngine::new(ChainModel::new(2).instant());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    engine.subscribe_fn(move |event: &EventOf<ChainModel>, progress: &EngineProgress, now| {
        if matches!(event, ExperimentEvent::TrialCompleted) {
            sink.borrow_mut().push((progress.successful_trial_count(), now));
        }
    });
    engine.start(at(0));
    engine.tick(at(0));
    engine.select_cue(Token(1), at(5)).unwrap();
    engine.select_cue(Token(3), at(9)).unwrap();
    assert_eq!(*seen.borrow(), vec![(1, at(9))]);
}

#[test]
#[should_panic(expected = "clock went backwards")]
fn test_backwards_clock_is_fatal() {
    let mut engine = TrialEngine::new(ChainModel::new(1));
    engine.start(at(100));
    engine.tick(at(50));
}

#[test]
fn test_phase_deadline_and_mid_trial_phases() {
    let deadline = PhaseDeadline::new(at(0), TimeDelta::milliseconds(250));
    assert_eq!(deadline.end(), at(250));
    assert!(!deadline.has_elapsed(at(249)));
    assert!(deadline.has_elapsed(at(250)));
    assert_eq!(deadline.time_left(at(100)), TimeDelta::milliseconds(150));

    let mid_trial: Vec<_> = EnginePhase::iter().filter(|p| p.is_mid_trial()).collect();
    assert_eq!(
        mid_trial,
        vec![EnginePhase::Decision, EnginePhase::HighlightChoice, EnginePhase::HighlightReward]
    );
}

#[test]
#[should_panic(expected = "overflows the calendar")]
fn test_overflowing_deadline_is_fatal() {
    let deadline = PhaseDeadline::new(at(0), TimeDelta::MAX);
    deadline.has_elapsed(at(10));
}
