use strum_macros::{Display, EnumIter};

/// The externally visible phase of the trial engine.
#[derive(Debug, Display, PartialEq, Eq, Clone, Copy, Hash, EnumIter)]
pub enum EnginePhase {
    /// Waiting for `start()`: after construction, pause, or experiment completion.
    Idle,
    /// Inter-trial interval before the start state is shown.
    BeforeTrial,
    /// A decision state is displayed and a selection is accepted.
    Decision,
    HighlightChoice,
    HighlightReward,
}

impl EnginePhase {
    /// Whether a trial with visible content is in flight. Pausing in such a phase aborts the trial.
    pub fn is_mid_trial(self) -> bool {
        matches!(
            self,
            EnginePhase::Decision | EnginePhase::HighlightChoice | EnginePhase::HighlightReward
        )
    }
}
