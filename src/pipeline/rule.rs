use log::debug;

use crate::event::run_status::{RunStatus, RunStatusEvent};

pub static ENGINE_SOURCE: &str = "aws.omics";

/// Where a matching run status event is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The chained dispatcher handler
    ChainedDispatch,
    /// The failure notification topic (external, forwards the event unmodified)
    FailureTopic,
}

/// An exact-match event pattern on source, detail type and run status
#[derive(Debug)]
pub struct EventRule {
    pub name: &'static str,
    pub source: &'static str,
    pub detail_type: &'static str,
    pub statuses: &'static [RunStatus],
    pub target: Target,
}

pub static RULES: [EventRule; 2] = [
    EventRule {
        name: "rule_second_workflow",
        source: "aws.omics",
        detail_type: "Run Status Change",
        statuses: &[RunStatus::Completed],
        target: Target::ChainedDispatch,
    },
    EventRule {
        name: "rule_workflow_status_topic",
        source: "aws.omics",
        detail_type: "Run Status Change",
        statuses: &[RunStatus::Failed],
        target: Target::FailureTopic,
    },
];

impl EventRule {
    pub fn matches(&self, event: &RunStatusEvent) -> bool {
        event.source.as_deref() == Some(self.source)
            && event.detail_type == self.detail_type
            && self.statuses.contains(&event.detail.status)
    }
}

/// Every target whose rule matches the event
pub fn route(event: &RunStatusEvent) -> Vec<Target> {
    RULES
        .iter()
        .filter(|rule| rule.matches(event))
        .inspect(|rule| debug!("Event matches {} for {:?}", rule.name, rule.target))
        .map(|rule| rule.target)
        .collect()
}
