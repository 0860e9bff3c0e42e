//! The two stage orchestration: routing rules and the implicit state of a sample

/// Event patterns that connect run status changes to their targets
pub mod rule;
pub mod state;

pub use rule::{route, Target};
pub use state::{PipelineState, Transition};
