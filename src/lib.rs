#![allow(clippy::similar_names, clippy::module_name_repetitions)]
#![warn(clippy::shadow_reuse, clippy::shadow_same, clippy::builtin_type_shadow)]
//! Trial engine and task model for the two-stage decision task.
//!
//! [`experiment_control`] holds the generic, deadline-driven trial state machine;
//! [`two_stage`] supplies the concrete decision graph it runs.

pub mod logger;
pub mod experiment_control;
pub mod two_stage;
