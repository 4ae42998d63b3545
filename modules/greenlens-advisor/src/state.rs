//! Explicit analysis lifecycle, owned by the orchestrating caller.
//!
//! One page load gets at most one completed analysis: a run only starts
//! from `Idle`, and `Done`/`Failed` refuse re-triggering until a
//! navigation event resets the machine. This replaces ad-hoc
//! running/has-run flags with transitions that can be asserted on.

use greenlens_core::types::AnalysisResult;

#[derive(Debug, Clone)]
pub enum AnalysisState {
    Idle,
    Detecting,
    Extracting,
    Scoring,
    Done(Box<AnalysisResult>),
    Failed(String),
}

impl AnalysisState {
    /// A new pass may only begin from `Idle`. `Detecting`/`Extracting`/
    /// `Scoring` mean a pass is in flight; `Done`/`Failed` mean this page
    /// load already ran.
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Detecting | Self::Extracting | Self::Scoring)
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            Self::Done(result) => Some(result),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Detecting => "detecting",
            Self::Extracting => "extracting",
            Self::Scoring => "scoring",
            Self::Done(_) => "done",
            Self::Failed(_) => "failed",
        }
    }
}

impl std::fmt::Display for AnalysisState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
