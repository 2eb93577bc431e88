use crate::analysis::AnalysisError;
use std::time::Duration;

pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(300);
pub const DEFAULT_MAX_MEMORY_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// Resource limits for one analysis run.
///
/// `max_duration` bounds graph construction only; cycle detection and metrics
/// always run on whatever was merged in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisBudget {
    pub max_duration: Duration,
    /// Ceiling for the estimated size of the merged node and edge accumulator.
    pub max_memory_bytes: u64,
    /// Worker threads used for graph construction.
    pub parallelism: usize,
}

impl Default for AnalysisBudget {
    fn default() -> Self {
        Self {
            max_duration: DEFAULT_MAX_DURATION,
            max_memory_bytes: DEFAULT_MAX_MEMORY_BYTES,
            parallelism: available_parallelism(),
        }
    }
}

impl AnalysisBudget {
    /// No practical time or memory limit.
    pub fn unlimited() -> Self {
        Self {
            max_duration: Duration::MAX,
            max_memory_bytes: u64::MAX,
            parallelism: available_parallelism(),
        }
    }

    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = max_duration;
        self
    }

    pub fn with_max_memory_bytes(mut self, max_memory_bytes: u64) -> Self {
        self.max_memory_bytes = max_memory_bytes;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.parallelism == 0 {
            return Err(AnalysisError::InvalidBudget(
                "parallelism must be at least 1".to_string(),
            ));
        }
        if self.max_duration.is_zero() {
            return Err(AnalysisError::InvalidBudget(
                "max duration must be positive".to_string(),
            ));
        }
        if self.max_memory_bytes == 0 {
            return Err(AnalysisError::InvalidBudget(
                "memory ceiling must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
