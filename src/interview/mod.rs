//! Interview orchestration
//!
//! This module provides the `InterviewFlow` controller and the pieces it
//! drives:
//! - Per-question countdown/recording timing (`QuestionTimer`)
//! - The interview-wide deadline (`DeadlineTimer`)
//! - Candidate-visible progress and per-question attempts
//! - Question order generation and validation

mod config;
mod deadline;
mod flow;
mod order;
mod progress;
mod timer;

pub use config::{CountdownPolicy, TimingPolicy};
pub use deadline::DeadlineTimer;
pub use flow::{
    CompletionReason, FlowCommand, FlowEvent, FlowPhase, InterviewFlow, InterviewOutcome,
    SessionEnd,
};
pub use order::{generate_question_order, generate_question_order_with, is_permutation};
pub use progress::{InterviewProgress, QuestionAttempt, UploadState};
pub use timer::{QuestionPhase, QuestionTimer, StopReason, TimerSignal};
