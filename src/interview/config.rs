use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long the pre-roll countdown lasts before recording starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CountdownPolicy {
    /// Same countdown for every question
    Fixed { seconds: u32 },
    /// Time to read the question, plus a fixed buffer
    ReadingSpeed {
        words_per_second: f64,
        buffer_secs: u32,
    },
}

impl Default for CountdownPolicy {
    fn default() -> Self {
        CountdownPolicy::ReadingSpeed {
            words_per_second: 3.0,
            buffer_secs: 5,
        }
    }
}

impl CountdownPolicy {
    /// Countdown length in seconds for the given question text
    pub fn countdown_for(&self, question: &str) -> u32 {
        match self {
            CountdownPolicy::Fixed { seconds } => *seconds,
            CountdownPolicy::ReadingSpeed {
                words_per_second,
                buffer_secs,
            } => {
                let words = question.split_whitespace().count() as f64;
                let reading = if *words_per_second > 0.0 {
                    (words / words_per_second).ceil() as u32
                } else {
                    0
                };
                reading + buffer_secs
            }
        }
    }
}

/// Interview timing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingPolicy {
    /// Global budget per question; the interview deadline is this times the question count
    pub seconds_per_question: u64,

    /// Hard cap on a single answer; recording stops automatically
    pub max_answer_secs: u32,

    /// Manual stop is refused before this many seconds of recording
    pub min_answer_secs: u32,

    /// The finish control is shown after this many seconds of recording
    pub finish_visible_after_secs: u32,

    /// Cosmetic pause before showing the next question
    pub advance_delay_ms: u64,

    /// Pre-roll countdown policy
    pub countdown: CountdownPolicy,
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            seconds_per_question: 300,
            max_answer_secs: 180,
            min_answer_secs: 5,
            finish_visible_after_secs: 10,
            advance_delay_ms: 800,
            countdown: CountdownPolicy::default(),
        }
    }
}

impl TimingPolicy {
    /// Total interview budget for `total_questions`
    pub fn global_budget_secs(&self, total_questions: usize) -> u64 {
        self.seconds_per_question
            .saturating_mul(total_questions as u64)
    }

    pub fn advance_delay(&self) -> Duration {
        Duration::from_millis(self.advance_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_speed_countdown() {
        let policy = CountdownPolicy::default();
        // 7 words / 3 wps = 2.33 → 3, plus 5s buffer
        assert_eq!(
            policy.countdown_for("Tell me about a project you led."),
            8
        );
        assert_eq!(policy.countdown_for(""), 5);
    }

    #[test]
    fn fixed_countdown_ignores_text() {
        let policy = CountdownPolicy::Fixed { seconds: 3 };
        assert_eq!(policy.countdown_for("a b c d e f g h i j k l"), 3);
    }

    #[test]
    fn global_budget_scales_with_questions() {
        let timing = TimingPolicy::default();
        assert_eq!(timing.global_budget_secs(5), 1500);

        let huge = TimingPolicy {
            seconds_per_question: u64::MAX / 2,
            ..TimingPolicy::default()
        };
        assert_eq!(huge.global_budget_secs(4), u64::MAX);
    }

    #[test]
    fn countdown_deserializes_from_tagged_table() {
        let fixed: CountdownPolicy =
            serde_json::from_str(r#"{"mode":"fixed","seconds":4}"#).unwrap();
        assert_eq!(fixed, CountdownPolicy::Fixed { seconds: 4 });
    }
}
