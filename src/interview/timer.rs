use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::TimingPolicy;
use crate::error::InterviewError;

/// Phase of a single question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum QuestionPhase {
    Preparing { remaining: u32 },
    Recording { elapsed: u32 },
    /// `elapsed` is the final answer length, zero if recording never began
    Done { elapsed: u32 },
}

/// Why recording ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Candidate pressed finish
    Manual,
    /// Per-question cap reached
    TimeLimit,
}

/// Signals the timer raises for its owner to act on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSignal {
    /// Start capture; `skipped` when the candidate cut the countdown short
    BeginRecording { skipped: bool },
    /// The finish control may now be shown
    FinishAvailable,
    /// Stop capture
    StopRecording(StopReason),
}

/// Prepare → record → done lifecycle of one question
///
/// Driven by one-second ticks. Knows nothing about the recorder; it only
/// tells its owner when to start and stop.
#[derive(Debug, Clone)]
pub struct QuestionTimer {
    phase: QuestionPhase,
    max_answer_secs: u32,
    min_answer_secs: u32,
    finish_visible_after_secs: u32,
    finish_visible: bool,
}

impl QuestionTimer {
    pub fn new(countdown_secs: u32, policy: &TimingPolicy) -> Self {
        Self {
            phase: QuestionPhase::Preparing {
                remaining: countdown_secs,
            },
            max_answer_secs: policy.max_answer_secs,
            min_answer_secs: policy.min_answer_secs,
            finish_visible_after_secs: policy.finish_visible_after_secs,
            finish_visible: false,
        }
    }

    /// Timer for `question`, with the countdown taken from the policy
    pub fn for_question(question: &str, policy: &TimingPolicy) -> Self {
        Self::new(policy.countdown.countdown_for(question), policy)
    }

    pub fn phase(&self) -> QuestionPhase {
        self.phase
    }

    pub fn countdown_remaining(&self) -> Option<u32> {
        match self.phase {
            QuestionPhase::Preparing { remaining } => Some(remaining),
            _ => None,
        }
    }

    /// Seconds recorded so far, kept once the question is done
    pub fn recording_elapsed(&self) -> u32 {
        match self.phase {
            QuestionPhase::Recording { elapsed } | QuestionPhase::Done { elapsed } => elapsed,
            QuestionPhase::Preparing { .. } => 0,
        }
    }

    pub fn finish_visible(&self) -> bool {
        self.finish_visible
    }

    /// Zero-length countdowns start recording immediately
    pub fn begin(&mut self) -> Option<TimerSignal> {
        match self.phase {
            QuestionPhase::Preparing { remaining: 0 } => {
                self.phase = QuestionPhase::Recording { elapsed: 0 };
                Some(TimerSignal::BeginRecording { skipped: false })
            }
            _ => None,
        }
    }

    /// Advance by one second
    pub fn tick(&mut self) -> Option<TimerSignal> {
        match self.phase {
            QuestionPhase::Preparing { remaining } => {
                let remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    self.phase = QuestionPhase::Recording { elapsed: 0 };
                    Some(TimerSignal::BeginRecording { skipped: false })
                } else {
                    self.phase = QuestionPhase::Preparing { remaining };
                    None
                }
            }
            QuestionPhase::Recording { elapsed } => {
                let elapsed = elapsed + 1;
                if elapsed >= self.max_answer_secs {
                    debug!("Answer reached the {}s cap", self.max_answer_secs);
                    self.phase = QuestionPhase::Done { elapsed };
                    return Some(TimerSignal::StopRecording(StopReason::TimeLimit));
                }
                self.phase = QuestionPhase::Recording { elapsed };
                if !self.finish_visible && elapsed >= self.finish_visible_after_secs {
                    self.finish_visible = true;
                    return Some(TimerSignal::FinishAvailable);
                }
                None
            }
            QuestionPhase::Done { .. } => None,
        }
    }

    /// Candidate skipped the countdown
    pub fn skip_countdown(&mut self) -> Option<TimerSignal> {
        match self.phase {
            QuestionPhase::Preparing { .. } => {
                self.phase = QuestionPhase::Recording { elapsed: 0 };
                Some(TimerSignal::BeginRecording { skipped: true })
            }
            _ => None,
        }
    }

    /// Candidate asked to finish the answer
    ///
    /// Only the minimum answer length gates this. `FinishAvailable` tells the
    /// renderer when to show the control and is not checked here.
    pub fn request_finish(&mut self) -> Result<TimerSignal, InterviewError> {
        match self.phase {
            QuestionPhase::Recording { elapsed } if elapsed < self.min_answer_secs => {
                Err(InterviewError::MinDurationNotMet {
                    elapsed,
                    minimum: self.min_answer_secs,
                })
            }
            QuestionPhase::Recording { elapsed } => {
                self.phase = QuestionPhase::Done { elapsed };
                Ok(TimerSignal::StopRecording(StopReason::Manual))
            }
            _ => Err(InterviewError::NotInProgress),
        }
    }

    /// Force the timer to `Done` (global timeout, teardown)
    pub fn force_done(&mut self) {
        self.phase = QuestionPhase::Done {
            elapsed: self.recording_elapsed(),
        };
    }
}
