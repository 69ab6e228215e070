//! One-shot reveal gate wrapped around every assistant reply.

use rand::Rng;
use serde::Serialize;
use thiserror::Error;

use crate::bank::TriviaBank;
use crate::trivia::{evaluate, TriviaItem};

pub const GIVE_UP_MESSAGE: &str = "Response disappeared... Better luck next time!";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("pick or type an answer before submitting")]
    EmptySubmission,
    #[error("no trivia challenge is open for this present")]
    NoOpenChallenge,
}

#[derive(Debug, Clone, Copy)]
enum GateState {
    /// `challenge` is the item drawn for the current engagement, if any.
    Sealed {
        challenge: Option<&'static TriviaItem>,
    },
    Revealed,
    Discarded,
}

/// Coarse gate state, safe to hand to renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    Sealed,
    Revealed,
    Discarded,
}

/// What a gate action did.
#[derive(Debug, Clone, Copy)]
pub enum Transition {
    Opened(&'static TriviaItem),
    Revealed { feedback: &'static str },
    Discarded { feedback: &'static str },
    /// The gate already settled, or there was nothing to act on.
    Unchanged,
}

impl Transition {
    /// Whether the gate reached a terminal state with this action.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            Transition::Revealed { .. } | Transition::Discarded { .. }
        )
    }
}

#[derive(Debug)]
pub struct RevealGate {
    state: GateState,
    payload: String,
}

impl RevealGate {
    pub fn new(payload: String) -> Self {
        Self {
            state: GateState::Sealed { challenge: None },
            payload,
        }
    }

    pub fn status(&self) -> GateStatus {
        match self.state {
            GateState::Sealed { .. } => GateStatus::Sealed,
            GateState::Revealed => GateStatus::Revealed,
            GateState::Discarded => GateStatus::Discarded,
        }
    }

    /// The challenge currently open on a sealed gate.
    pub fn open_challenge(&self) -> Option<&'static TriviaItem> {
        match self.state {
            GateState::Sealed { challenge } => challenge,
            GateState::Revealed | GateState::Discarded => None,
        }
    }

    /// The reply text, only once the gate is revealed.
    pub fn revealed_payload(&self) -> Option<&str> {
        match self.state {
            GateState::Revealed => Some(&self.payload),
            GateState::Sealed { .. } | GateState::Discarded => None,
        }
    }

    /// Raw reply text for the completion history. Never render this.
    pub(crate) fn payload(&self) -> &str {
        &self.payload
    }

    /// Opens a challenge, drawing one item per engagement.
    pub fn engage<R: Rng + ?Sized>(&mut self, bank: &TriviaBank, rng: &mut R) -> Transition {
        match self.state {
            GateState::Sealed {
                challenge: Some(item),
            } => Transition::Opened(item),
            GateState::Sealed { challenge: None } => {
                let item = bank.pick_random(rng);
                self.state = GateState::Sealed {
                    challenge: Some(item),
                };
                Transition::Opened(item)
            }
            GateState::Revealed | GateState::Discarded => Transition::Unchanged,
        }
    }

    /// Scores an answer to the open challenge and settles the gate.
    pub fn submit(&mut self, submission: &str) -> Result<Transition, GateError> {
        let item = match self.state {
            GateState::Sealed {
                challenge: Some(item),
            } => item,
            GateState::Sealed { challenge: None } => return Err(GateError::NoOpenChallenge),
            GateState::Revealed | GateState::Discarded => return Ok(Transition::Unchanged),
        };
        if submission.trim().is_empty() {
            return Err(GateError::EmptySubmission);
        }

        if evaluate(item, submission) {
            Ok(self.settle(GateStatus::Revealed, item.correct_message()))
        } else {
            Ok(self.settle(GateStatus::Discarded, item.incorrect_message()))
        }
    }

    /// Closing the challenge without answering counts as a wrong answer.
    pub fn abandon(&mut self) -> Transition {
        match self.state {
            GateState::Sealed { challenge: Some(_) } => {
                self.settle(GateStatus::Discarded, GIVE_UP_MESSAGE)
            }
            GateState::Sealed { challenge: None }
            | GateState::Revealed
            | GateState::Discarded => Transition::Unchanged,
        }
    }

    fn settle(&mut self, outcome: GateStatus, feedback: &'static str) -> Transition {
        if !matches!(self.state, GateState::Sealed { .. }) {
            return Transition::Unchanged;
        }
        match outcome {
            GateStatus::Revealed => {
                self.state = GateState::Revealed;
                Transition::Revealed { feedback }
            }
            GateStatus::Discarded => {
                self.state = GateState::Discarded;
                Transition::Discarded { feedback }
            }
            GateStatus::Sealed => Transition::Unchanged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trivia::AnswerRule;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    static ONLY_ITEM: [TriviaItem; 1] = [TriviaItem {
        prompt: "What beverage is left out for Santa on Christmas Eve?",
        media: None,
        rule: AnswerRule::SingleChoice {
            options: &["Hot chocolate", "Coffee", "Milk"],
            correct_index: 2,
        },
        on_correct: None,
        on_incorrect: None,
    }];

    fn bank() -> TriviaBank {
        TriviaBank::new(&ONLY_ITEM).unwrap()
    }

    fn engaged_gate() -> RevealGate {
        let mut gate = RevealGate::new("hi there".to_string());
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            gate.engage(&bank(), &mut rng),
            Transition::Opened(_)
        ));
        gate
    }

    #[test]
    fn test_new_gate_is_sealed_and_hides_payload() {
        let gate = RevealGate::new("hi there".to_string());
        assert_eq!(gate.status(), GateStatus::Sealed);
        assert!(gate.revealed_payload().is_none());
        assert!(gate.open_challenge().is_none());
    }

    #[test]
    fn test_correct_answer_reveals() {
        let mut gate = engaged_gate();
        let transition = gate.submit("2").unwrap();
        assert!(transition.is_settled());
        assert_eq!(gate.status(), GateStatus::Revealed);
        assert_eq!(gate.revealed_payload(), Some("hi there"));
    }

    #[test]
    fn test_wrong_answer_discards() {
        let mut gate = engaged_gate();
        assert!(matches!(
            gate.submit("0").unwrap(),
            Transition::Discarded { .. }
        ));
        assert_eq!(gate.status(), GateStatus::Discarded);
        assert!(gate.revealed_payload().is_none());
    }

    #[test]
    fn test_empty_submission_is_not_scored() {
        let mut gate = engaged_gate();
        assert_eq!(gate.submit("   ").unwrap_err(), GateError::EmptySubmission);
        assert_eq!(gate.status(), GateStatus::Sealed);
        assert!(gate.open_challenge().is_some());
    }

    #[test]
    fn test_submit_without_challenge_is_an_error() {
        let mut gate = RevealGate::new("hi there".to_string());
        assert_eq!(gate.submit("2").unwrap_err(), GateError::NoOpenChallenge);
        assert_eq!(gate.status(), GateStatus::Sealed);
    }

    #[test]
    fn test_abandon_discards() {
        let mut gate = engaged_gate();
        assert!(matches!(
            gate.abandon(),
            Transition::Discarded {
                feedback: GIVE_UP_MESSAGE
            }
        ));
        assert_eq!(gate.status(), GateStatus::Discarded);
    }

    #[test]
    fn test_abandon_without_challenge_is_ignored() {
        let mut gate = RevealGate::new("hi there".to_string());
        assert!(matches!(gate.abandon(), Transition::Unchanged));
        assert_eq!(gate.status(), GateStatus::Sealed);
    }

    #[test]
    fn test_engaging_twice_keeps_the_same_item() {
        let mut gate = engaged_gate();
        let first = gate.open_challenge().unwrap();
        let mut rng = StdRng::seed_from_u64(99);
        match gate.engage(&TriviaBank::standard(), &mut rng) {
            Transition::Opened(item) => assert!(std::ptr::eq(item, first)),
            other => panic!("expected the open challenge, got {:?}", other),
        }
    }

    #[test]
    fn test_terminal_gates_never_move() {
        let mut rng = StdRng::seed_from_u64(3);

        let mut revealed = engaged_gate();
        revealed.submit("2").unwrap();
        assert!(matches!(revealed.engage(&bank(), &mut rng), Transition::Unchanged));
        assert!(matches!(revealed.submit("0").unwrap(), Transition::Unchanged));
        assert!(matches!(revealed.abandon(), Transition::Unchanged));
        assert_eq!(revealed.status(), GateStatus::Revealed);
        assert_eq!(revealed.revealed_payload(), Some("hi there"));

        let mut discarded = engaged_gate();
        discarded.submit("1").unwrap();
        assert!(matches!(discarded.engage(&bank(), &mut rng), Transition::Unchanged));
        assert!(matches!(discarded.submit("2").unwrap(), Transition::Unchanged));
        assert_eq!(discarded.status(), GateStatus::Discarded);
        assert!(discarded.revealed_payload().is_none());
        assert!(discarded.open_challenge().is_none());
    }
}
