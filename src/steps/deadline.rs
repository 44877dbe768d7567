use crate::{Error, Result};

use std::time::{Duration, Instant};

/// Wall clock budget of one tile, checked between the pipeline stages.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Option<Duration>,
}

impl Deadline {
    pub fn start(budget: Option<Duration>) -> Deadline {
        Deadline {
            started: Instant::now(),
            budget,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn check(&self) -> Result<()> {
        match self.budget {
            Some(budget) if self.elapsed() > budget => Err(Error::DeadlineExceeded {
                elapsed: self.elapsed(),
                budget,
            }),
            _ => Ok(()),
        }
    }

    /// more than 80% of the budget is used
    pub fn is_close(&self) -> bool {
        self.budget
            .is_some_and(|budget| self.elapsed().as_secs_f64() > 0.8 * budget.as_secs_f64())
    }
}
