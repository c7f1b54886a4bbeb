//! The two-stage task: decision graph, per-experiment wiring, outcome draws, timing parameters,
//! and a recorder that turns the engine's event stream into per-trial records.

mod cue;
mod outcome;
mod parameters;
mod task;
mod trial_record;
mod wiring;

pub use cue::{DecisionName, StageCue, TwoCuesDecision};
pub use outcome::{BinaryReward, ProbabilisticTransition, TransitionOutcome};
pub use parameters::{TaskParameters, secs_to_delta};
pub use task::TwoStageTask;
pub use trial_record::{TrialRecord, TrialRecorder, TwoStageEvent};
pub use wiring::TaskWiring;
