#![allow(clippy::similar_names)]
#![warn(clippy::shadow_reuse, clippy::shadow_same, clippy::builtin_type_shadow)]
mod simulated_subject;

use crate::simulated_subject::SimulatedSubject;
use chrono::{DateTime, TimeDelta, Utc};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::{cell::RefCell, env, rc::Rc, time::Duration};
use tokio::time::{Instant, MissedTickBehavior};
use two_stage_task::{
    error,
    experiment_control::{EnginePhase, EngineProgress, EventLogger, TrialEngine},
    fatal, info,
    two_stage::{TaskParameters, TrialRecorder, TwoStageEvent, TwoStageTask},
    warn,
};

const POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Wall-clock anchor plus a monotonic offset, so the engine never sees time run backwards.
struct MonotonicClock {
    anchor: DateTime<Utc>,
    origin: Instant,
}

impl MonotonicClock {
    fn new() -> Self { Self { anchor: Utc::now(), origin: Instant::now() } }

    fn now(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(self.origin.elapsed())
            .unwrap_or_else(|e| fatal!("Monotonic clock overflowed: {e}"));
        self.anchor + elapsed
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let params = TaskParameters::from_env().unwrap_or_else(|e| fatal!("Invalid task configuration: {e}"));
    let mut seed_rng = match read_seed() {
        Some(seed) => {
            info!("Using seed {seed}.");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_rng(&mut rand::rng()),
    };
    let task = TwoStageTask::new(params, StdRng::seed_from_u64(seed_rng.random()))
        .unwrap_or_else(|e| fatal!("Invalid task configuration: {e}"));
    let subject = Rc::new(RefCell::new(SimulatedSubject::new(StdRng::seed_from_u64(seed_rng.random()))));
    let recorder = Rc::new(RefCell::new(TrialRecorder::new()));

    let mut engine = TrialEngine::new(task);
    engine.subscribe(EventLogger);
    let recorder_sink = Rc::clone(&recorder);
    engine.subscribe_fn(move |event: &TwoStageEvent, progress: &EngineProgress, now| {
        recorder_sink.borrow_mut().observe(event, progress, now);
    });
    let subject_sink = Rc::clone(&subject);
    engine.subscribe_fn(move |event: &TwoStageEvent, _: &EngineProgress, now| {
        subject_sink.borrow_mut().observe(event, now);
    });
    info!("Running {} trials with {} listeners.", params.successful_trials_to_complete, engine.listener_count());

    let clock = MonotonicClock::new();
    let mut interval = tokio::time::interval(POLL_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    engine.start(clock.now());
    while engine.phase() != EnginePhase::Idle {
        tokio::select! {
            _ = interval.tick() => {
                let now = clock.now();
                engine.tick(now);
                let due = subject.borrow_mut().take_due(now);
                if let Some(cue) = due {
                    if let Err(e) = engine.select_cue(cue, now) {
                        warn!("Simulated subject answered out of turn: {e}");
                    }
                }
            }
            res = &mut ctrl_c => {
                if let Err(e) = res {
                    error!("Failed to listen for Ctrl-C: {e}");
                }
                info!("Interrupted, pausing the experiment.");
                engine.pause(clock.now());
                break;
            }
        }
    }

    let progress = engine.progress();
    info!(
        "Stopped after trial {}: {}/{} successful, cumulative reward {:.1}.",
        progress.current_trial_number(),
        progress.successful_trial_count(),
        progress.target_successful_trial_count(),
        progress.cumulative_reward()
    );
    let records = recorder.borrow();
    info!("Recorded {} completed and {} aborted trials.", records.completed_count(), records.aborted_count());
}

fn read_seed() -> Option<u64> {
    let raw = env::var("TST_SEED").ok()?;
    match raw.trim().parse() {
        Ok(seed) => Some(seed),
        Err(e) => fatal!("TST_SEED '{raw}' is not a valid seed: {e}"),
    }
}
