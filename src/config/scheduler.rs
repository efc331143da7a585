use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Change propagation settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SchedulerConfig {
    /// How many times one propagation class may be drained within a single
    /// flush. Ensurers that keep re-triggering themselves are cut off here and
    /// the remaining paths are carried over to the next flush.
    #[serde(default = "default_max_drain_passes")]
    pub max_drain_passes: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_drain_passes: default_max_drain_passes(),
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_drain_passes == 0 {
            return Err(Error::InvalidConfig(
                "scheduler.max_drain_passes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn default_max_drain_passes() -> usize {
    100
}
