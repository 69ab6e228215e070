//! Trivia items and the rules used to score an answer.

use std::fmt;

pub const DEFAULT_CORRECT_MESSAGE: &str = "Correct! Your present is unwrapped.";
pub const DEFAULT_INCORRECT_MESSAGE: &str = "Wrong answer! Your present disappeared.";

/// How a submitted answer is checked.
#[derive(Clone, Copy)]
pub enum AnswerRule {
    /// Pick one of `options`; the submission is the chosen index.
    SingleChoice {
        options: &'static [&'static str],
        correct_index: usize,
    },
    /// Free text matched against literals, ignoring case and surrounding whitespace.
    AcceptedAnswers(&'static [&'static str]),
    /// Free text checked by a total function of the trimmed submission.
    Predicate(fn(&str) -> bool),
}

impl fmt::Debug for AnswerRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerRule::SingleChoice {
                options,
                correct_index,
            } => f
                .debug_struct("SingleChoice")
                .field("options", options)
                .field("correct_index", correct_index)
                .finish(),
            AnswerRule::AcceptedAnswers(answers) => {
                f.debug_tuple("AcceptedAnswers").field(answers).finish()
            }
            AnswerRule::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// One quiz entry of the catalog.
#[derive(Debug, Clone, Copy)]
pub struct TriviaItem {
    /// Question text, empty when the image carries the question.
    pub prompt: &'static str,
    /// Static asset path of an illustrative image.
    pub media: Option<&'static str>,
    pub rule: AnswerRule,
    pub on_correct: Option<&'static str>,
    pub on_incorrect: Option<&'static str>,
}

impl TriviaItem {
    /// Options to render as radio buttons, `None` for free-text items.
    pub fn options(&self) -> Option<&'static [&'static str]> {
        match self.rule {
            AnswerRule::SingleChoice { options, .. } => Some(options),
            AnswerRule::AcceptedAnswers(_) | AnswerRule::Predicate(_) => None,
        }
    }

    pub fn is_free_text(&self) -> bool {
        self.options().is_none()
    }

    pub fn correct_message(&self) -> &'static str {
        self.on_correct.unwrap_or(DEFAULT_CORRECT_MESSAGE)
    }

    pub fn incorrect_message(&self) -> &'static str {
        self.on_incorrect.unwrap_or(DEFAULT_INCORRECT_MESSAGE)
    }
}

/// Scores `submission` against the item's rule.
///
/// Single-choice submissions are the decimal index of the chosen option.
/// Anything that is not a valid index, including an empty string, is
/// simply wrong; rejecting empty input before scoring is the caller's job.
pub fn evaluate(item: &TriviaItem, submission: &str) -> bool {
    let submission = submission.trim();
    match item.rule {
        AnswerRule::SingleChoice { correct_index, .. } => submission
            .parse::<usize>()
            .map(|index| index == correct_index)
            .unwrap_or(false),
        AnswerRule::AcceptedAnswers(answers) => {
            let normalized = normalize(submission);
            answers.iter().any(|answer| normalize(answer) == normalized)
        }
        AnswerRule::Predicate(predicate) => predicate(submission),
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Parses a finite number. `NaN`, `inf` and non-numeric text yield `None`.
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
