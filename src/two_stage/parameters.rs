use crate::experiment_control::ConfigError;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::{env, str::FromStr};

/// Tunable settings of one two-stage experiment. Times are given in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskParameters {
    /// Successful trials needed to complete the experiment.
    pub successful_trials_to_complete: u32,
    /// Probability that a first-stage choice leads to its usual second-stage state.
    pub common_transition_probability: f32,
    /// Win probability of the single favoured second-stage cue.
    pub great_win_probability: f32,
    /// Win probability of the remaining second-stage cues.
    pub normal_win_probability: f32,
    /// Mean of the exponentially distributed inter-trial interval.
    pub mean_inter_trial_secs: f32,
    pub time_per_decision_secs: f32,
    pub decision_highlight_secs: f32,
    /// Reward display window. Only highlighted (second-stage) rewards are shown.
    pub reward_highlight_secs: f32,
}

impl Default for TaskParameters {
    fn default() -> Self {
        Self {
            successful_trials_to_complete: 50,
            common_transition_probability: 0.7,
            great_win_probability: 0.8,
            normal_win_probability: 0.2,
            mean_inter_trial_secs: 1.0,
            time_per_decision_secs: 2.0,
            decision_highlight_secs: 0.5,
            reward_highlight_secs: 1.0,
        }
    }
}

impl TaskParameters {
    const ENV_TRIALS: &'static str = "TST_TRIALS";
    const ENV_COMMON_PROB: &'static str = "TST_COMMON_PROB";
    const ENV_GREAT_WIN_PROB: &'static str = "TST_GREAT_WIN_PROB";
    const ENV_NORMAL_WIN_PROB: &'static str = "TST_NORMAL_WIN_PROB";
    const ENV_MEAN_ITI: &'static str = "TST_MEAN_ITI";
    const ENV_DECISION_TIME: &'static str = "TST_DECISION_TIME";
    const ENV_CHOICE_HIGHLIGHT: &'static str = "TST_CHOICE_HIGHLIGHT";
    const ENV_REWARD_HIGHLIGHT: &'static str = "TST_REWARD_HIGHLIGHT";

    /// Default parameters overlaid with the `TST_*` environment variables, validated.
    ///
    /// # Errors
    /// [`ConfigError::UnparsableEnv`] for a variable that does not parse, otherwise as
    /// [`TaskParameters::validate`].
    pub fn from_env() -> Result<Self, ConfigError> { Self::from_lookup(|key| env::var(key).ok()) }

    /// Like [`TaskParameters::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    /// As [`TaskParameters::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where F: Fn(&'static str) -> Option<String> {
        let mut params = Self::default();
        overlay(&lookup, Self::ENV_TRIALS, &mut params.successful_trials_to_complete)?;
        overlay(&lookup, Self::ENV_COMMON_PROB, &mut params.common_transition_probability)?;
        overlay(&lookup, Self::ENV_GREAT_WIN_PROB, &mut params.great_win_probability)?;
        overlay(&lookup, Self::ENV_NORMAL_WIN_PROB, &mut params.normal_win_probability)?;
        overlay(&lookup, Self::ENV_MEAN_ITI, &mut params.mean_inter_trial_secs)?;
        overlay(&lookup, Self::ENV_DECISION_TIME, &mut params.time_per_decision_secs)?;
        overlay(&lookup, Self::ENV_CHOICE_HIGHLIGHT, &mut params.decision_highlight_secs)?;
        overlay(&lookup, Self::ENV_REWARD_HIGHLIGHT, &mut params.reward_highlight_secs)?;
        params.validate()?;
        Ok(params)
    }

    /// # Errors
    /// - [`ConfigError::NoTrials`]: The completion target is zero.
    /// - [`ConfigError::InvalidProbability`]: A probability lies outside [0, 1].
    /// - [`ConfigError::InvalidDuration`]: A time is negative, not finite, or longer than a day.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.successful_trials_to_complete == 0 {
            return Err(ConfigError::NoTrials);
        }
        check_probability("common_transition_probability", self.common_transition_probability)?;
        check_probability("great_win_probability", self.great_win_probability)?;
        check_probability("normal_win_probability", self.normal_win_probability)?;
        check_duration("mean_inter_trial_secs", self.mean_inter_trial_secs)?;
        check_duration("time_per_decision_secs", self.time_per_decision_secs)?;
        check_duration("decision_highlight_secs", self.decision_highlight_secs)?;
        check_duration("reward_highlight_secs", self.reward_highlight_secs)
    }

    pub fn time_per_decision(&self) -> TimeDelta { secs_to_delta(self.time_per_decision_secs) }
    pub fn decision_highlight(&self) -> TimeDelta { secs_to_delta(self.decision_highlight_secs) }
    pub fn reward_highlight(&self) -> TimeDelta { secs_to_delta(self.reward_highlight_secs) }
}

/// Converts fractional seconds to a [`TimeDelta`] with microsecond resolution.
#[allow(clippy::cast_possible_truncation)]
pub fn secs_to_delta(secs: f32) -> TimeDelta {
    TimeDelta::microseconds((f64::from(secs) * 1_000_000.0).round() as i64)
}

fn overlay<F, T>(lookup: &F, key: &'static str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::UnparsableEnv { key, value: raw.clone() })?;
    }
    Ok(())
}

fn check_probability(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidProbability { name, value })
    }
}

/// Longest accepted phase time, one day.
const MAX_DURATION_SECS: f32 = 86_400.0;

fn check_duration(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=MAX_DURATION_SECS).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidDuration { name, value })
    }
}
