use tracing::warn;

/// Interview-wide time budget
///
/// Decrements once per tick regardless of what the current question is
/// doing. Expiry is reported exactly once.
#[derive(Debug, Clone)]
pub struct DeadlineTimer {
    total_secs: u64,
    remaining_secs: u64,
    fired: bool,
}

impl DeadlineTimer {
    pub fn new(total_secs: u64) -> Self {
        Self {
            total_secs,
            remaining_secs: total_secs,
            fired: false,
        }
    }

    /// `seconds_per_question` summed over `total_questions`, saturating at `u64::MAX`
    pub fn for_questions(total_questions: usize, seconds_per_question: u64) -> Self {
        Self::new(seconds_per_question.saturating_mul(total_questions as u64))
    }

    /// Advance one second; true on the tick that exhausts the budget
    pub fn tick(&mut self) -> bool {
        if self.fired {
            return false;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            warn!("Interview time budget of {}s exhausted", self.total_secs);
            self.fired = true;
            return true;
        }
        false
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.total_secs - self.remaining_secs
    }

    pub fn expired(&self) -> bool {
        self.fired
    }
}
