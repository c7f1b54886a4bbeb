use super::engine_phase::EnginePhase;
use strum_macros::Display;

/// Rejected `select_cue` calls. The engine state is left untouched.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[strum(to_string = "no decision state is active (engine is in {phase})")]
    NoDecisionActive { phase: EnginePhase },
    #[strum(to_string = "cue {cue} is not offered by decision state {state}")]
    CueNotOffered { cue: String, state: String },
}

impl std::error::Error for SelectionError {}

/// The task model and the engine disagree about the decision graph.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum TaskModelError {
    #[strum(to_string = "cue {cue} cannot be resolved from decision state {state}")]
    UnresolvableCue { cue: String, state: String },
    #[strum(to_string = "cue {cue} has no win probability assigned")]
    NoWinProbability { cue: String },
}

impl std::error::Error for TaskModelError {}

/// Invalid experiment parameters, either from code or from the environment.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum ConfigError {
    #[strum(to_string = "{name} must be a probability in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f32 },
    #[strum(to_string = "{name} must be between 0 and 86400 seconds, got {value}")]
    InvalidDuration { name: &'static str, value: f32 },
    #[strum(to_string = "the experiment needs at least one successful trial")]
    NoTrials,
    #[strum(to_string = "environment variable {key} holds unparsable value '{value}'")]
    UnparsableEnv { key: &'static str, value: String },
}

impl std::error::Error for ConfigError {}
