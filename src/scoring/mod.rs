//! Post-interview grading
//!
//! The scoring service itself (an LLM grading a transcript against a role
//! rubric) is external. This module defines its interface and the
//! aggregation into an overall 1–10 style score.

use anyhow::Result;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Highest per-answer score
pub const MAX_ANSWER_SCORE: u8 = 2;

/// Score and feedback for one answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerScore {
    /// 0 (poor) to 2 (strong)
    pub score: u8,
    pub reasoning: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

/// Role context given to the scorer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobContext {
    pub job_title: String,
    pub description: Option<String>,
}

/// Candidate context given to the scorer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateContext {
    pub name: String,
    pub resume_summary: Option<String>,
}

/// One question with the transcript of its answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribedAnswer {
    pub question_index: usize,
    pub question: String,
    pub transcript: String,
}

/// Per-answer results plus the aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewScore {
    /// (question index, score) for every answer that could be scored
    pub answers: Vec<(usize, AnswerScore)>,
    pub overall: Option<f64>,
}

/// External grader
#[async_trait::async_trait]
pub trait ScoringService: Send + Sync {
    async fn score_answer(
        &self,
        question: &str,
        transcript: &str,
        job: &JobContext,
        candidate: &CandidateContext,
    ) -> Result<AnswerScore>;
}

/// `1.0 + mean(score) * 4.25`; `None` when nothing was scored
pub fn overall_score(scores: &[AnswerScore]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let total: u32 = scores
        .iter()
        .map(|s| s.score.min(MAX_ANSWER_SCORE) as u32)
        .sum();
    let mean = total as f64 / scores.len() as f64;
    Some(1.0 + mean * 4.25)
}

/// Score every answer concurrently and aggregate
///
/// Answers the scorer fails on are logged and left out of the aggregate.
pub async fn grade_answers(
    scorer: &dyn ScoringService,
    answers: &[TranscribedAnswer],
    job: &JobContext,
    candidate: &CandidateContext,
) -> InterviewScore {
    let results = join_all(answers.iter().map(|answer| async move {
        let result = scorer
            .score_answer(&answer.question, &answer.transcript, job, candidate)
            .await;
        (answer.question_index, result)
    }))
    .await;

    let mut scored = Vec::with_capacity(results.len());
    for (question_index, result) in results {
        match result {
            Ok(mut score) => {
                score.score = score.score.min(MAX_ANSWER_SCORE);
                scored.push((question_index, score));
            }
            Err(e) => warn!("Could not score question {}: {}", question_index, e),
        }
    }

    let scores: Vec<AnswerScore> = scored.iter().map(|(_, s)| s.clone()).collect();
    let overall = overall_score(&scores);
    info!(
        "Graded {}/{} answers for {} (overall {:?})",
        scored.len(),
        answers.len(),
        candidate.name,
        overall
    );

    InterviewScore {
        answers: scored,
        overall,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    fn score(value: u8) -> AnswerScore {
        AnswerScore {
            score: value,
            reasoning: String::new(),
            strengths: vec![],
            weaknesses: vec![],
        }
    }

    #[test]
    fn aggregate_formula() {
        assert_eq!(overall_score(&[]), None);
        assert_eq!(overall_score(&[score(0), score(0)]), Some(1.0));
        assert_eq!(overall_score(&[score(2), score(2)]), Some(9.5));
        assert_eq!(overall_score(&[score(1), score(2)]), Some(1.0 + 1.5 * 4.25));
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        assert_eq!(overall_score(&[score(7)]), Some(9.5));
    }

    struct LengthScorer;

    #[async_trait::async_trait]
    impl ScoringService for LengthScorer {
        async fn score_answer(
            &self,
            _question: &str,
            transcript: &str,
            _job: &JobContext,
            _candidate: &CandidateContext,
        ) -> Result<AnswerScore> {
            if transcript.is_empty() {
                bail!("empty transcript");
            }
            Ok(score(transcript.split_whitespace().count().min(5) as u8))
        }
    }

    #[tokio::test]
    async fn failed_answers_are_left_out() {
        let answers = vec![
            TranscribedAnswer {
                question_index: 0,
                question: "q0".into(),
                transcript: "one".into(),
            },
            TranscribedAnswer {
                question_index: 1,
                question: "q1".into(),
                transcript: String::new(),
            },
            TranscribedAnswer {
                question_index: 2,
                question: "q2".into(),
                transcript: "a long detailed answer here".into(),
            },
        ];

        let result = grade_answers(
            &LengthScorer,
            &answers,
            &JobContext::default(),
            &CandidateContext::default(),
        )
        .await;

        assert_eq!(result.answers.len(), 2);
        assert_eq!(result.answers[1], (2, score(2)));
        assert_eq!(result.overall, Some(1.0 + 1.5 * 4.25));
    }
}
