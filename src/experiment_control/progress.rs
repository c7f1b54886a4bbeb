use serde::{Deserialize, Serialize};

/// Experiment-lifetime counters. Only the engine mutates them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineProgress {
    current_trial_number: u32,
    successful_trial_count: u32,
    target_successful_trial_count: u32,
    cumulative_reward: f32,
}

impl EngineProgress {
    pub(crate) fn new(target_successful_trial_count: u32) -> Self {
        Self { target_successful_trial_count, ..Self::default() }
    }

    pub fn current_trial_number(&self) -> u32 { self.current_trial_number }
    pub fn successful_trial_count(&self) -> u32 { self.successful_trial_count }
    pub fn target_successful_trial_count(&self) -> u32 { self.target_successful_trial_count }
    pub fn cumulative_reward(&self) -> f32 { self.cumulative_reward }

    pub fn target_reached(&self) -> bool {
        self.successful_trial_count >= self.target_successful_trial_count
    }

    pub(crate) fn begin_trial(&mut self) -> u32 {
        self.current_trial_number += 1;
        self.current_trial_number
    }

    pub(crate) fn complete_trial(&mut self) { self.successful_trial_count += 1; }

    pub(crate) fn add_reward(&mut self, value: f32) { self.cumulative_reward += value; }
}
