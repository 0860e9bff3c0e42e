use std::fmt;

use serde::Serialize;

use crate::event::run_status::RunStatus;

/// Progress of one sample through the two chained runs
///
/// Nothing stores this. Each handler invocation starts from the state implied by the
/// event it received and reports the state it reached, so the correlation between the two
/// stages stays visible in logs and return values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    Uploaded,
    Run1Submitted,
    Run1Completed,
    Run1Failed,
    Run2Submitted,
    Run2Completed,
    Run2Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Submit,
    Finish(RunStatus),
}

impl PipelineState {
    pub fn next(self, transition: Transition) -> Option<PipelineState> {
        use PipelineState::*;

        match (self, transition) {
            (Uploaded, Transition::Submit) => Some(Run1Submitted),
            (Run1Submitted, Transition::Finish(RunStatus::Completed)) => Some(Run1Completed),
            (Run1Submitted, Transition::Finish(RunStatus::Failed)) => Some(Run1Failed),
            (Run1Completed, Transition::Submit) => Some(Run2Submitted),
            (Run2Submitted, Transition::Finish(RunStatus::Completed)) => Some(Run2Completed),
            (Run2Submitted, Transition::Finish(RunStatus::Failed)) => Some(Run2Failed),
            _ => None,
        }
    }

    /// Failures only trigger a notification, never cleanup or retry
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Run1Failed | PipelineState::Run2Completed | PipelineState::Run2Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = match self {
            PipelineState::Uploaded => "UPLOADED",
            PipelineState::Run1Submitted => "RUN1_SUBMITTED",
            PipelineState::Run1Completed => "RUN1_COMPLETED",
            PipelineState::Run1Failed => "RUN1_FAILED",
            PipelineState::Run2Submitted => "RUN2_SUBMITTED",
            PipelineState::Run2Completed => "RUN2_COMPLETED",
            PipelineState::Run2Failed => "RUN2_FAILED",
        };
        write!(f, "{state}")
    }
}
