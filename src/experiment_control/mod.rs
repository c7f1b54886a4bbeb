//! The generic trial engine: a deadline-driven state machine that sequences inter-trial
//! intervals, decisions and highlight windows, validates selections, and reports every phase
//! change to registered listeners. The task-specific decision graph is supplied through the
//! [`TaskModel`] contract.

mod engine;
mod engine_phase;
mod error;
mod event;
mod phase_deadline;
mod progress;
mod task_model;
#[cfg(test)]
mod tests;

pub use engine::TrialEngine;
pub use engine_phase::EnginePhase;
pub use error::{ConfigError, SelectionError, TaskModelError};
pub use event::{EventLogger, EventOf, ExperimentEvent, ExperimentListener};
pub use phase_deadline::PhaseDeadline;
pub use progress::EngineProgress;
pub use task_model::{Cue, DecisionState, Reward, TaskModel, Transition};
