use std::fmt;
use clap::ValueEnum;

/// Which half of the workflow chain a process serves
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum Stage {
    /// Manifest upload starts one initial run per sample
    Initial,
    /// Completed initial run starts the downstream run
    Chained
}

impl fmt::Display for Stage {
      fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Stage::Initial => write!(f, "initial"),
            Stage::Chained => write!(f, "chained")
        }
    }
}
