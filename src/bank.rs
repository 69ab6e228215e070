//! The built-in trivia catalog and random selection over it.

use rand::Rng;
use thiserror::Error;

use crate::trivia::{parse_number, AnswerRule, TriviaItem};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BankError {
    #[error("a trivia bank needs at least one item")]
    Empty,
    #[error("trivia item {0:?} has no option matching its correct index")]
    InvalidItem(&'static str),
}

/// Read-only view over a non-empty `'static` table of trivia items.
#[derive(Debug, Clone, Copy)]
pub struct TriviaBank {
    items: &'static [TriviaItem],
}

impl TriviaBank {
    pub fn new(items: &'static [TriviaItem]) -> Result<Self, BankError> {
        if items.is_empty() {
            return Err(BankError::Empty);
        }
        if let Some(item) = items.iter().find(|item| !is_answerable(item)) {
            return Err(BankError::InvalidItem(item.prompt));
        }
        Ok(Self { items })
    }

    /// The catalog shipped with the app.
    pub fn standard() -> Self {
        Self {
            items: &STANDARD_CATALOG,
        }
    }

    pub fn items(&self) -> &'static [TriviaItem] {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false for a bank built through `new` or `standard`.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Uniform draw with replacement.
    pub fn pick_random<R: Rng + ?Sized>(&self, rng: &mut R) -> &'static TriviaItem {
        &self.items[rng.gen_range(0..self.items.len())]
    }
}

// A single-choice item needs its correct index to name an option.
fn is_answerable(item: &TriviaItem) -> bool {
    match item.rule {
        AnswerRule::SingleChoice {
            options,
            correct_index,
        } => correct_index < options.len(),
        AnswerRule::AcceptedAnswers(_) | AnswerRule::Predicate(_) => true,
    }
}

fn equals_sixty_seven(answer: &str) -> bool {
    parse_number(answer) == Some(67.0)
}

fn more_than_a_hundred(answer: &str) -> bool {
    parse_number(answer).is_some_and(|value| value > 100.0)
}

fn anything_goes(_answer: &str) -> bool {
    true
}

static STANDARD_CATALOG: [TriviaItem; 15] = [
    TriviaItem {
        prompt: "What are the names of Santa's reindeer?",
        media: None,
        rule: AnswerRule::SingleChoice {
            options: &[
                "Dasher, Dancer, Prancer, Vixen, Comet, Cupid, Donner, Blitzen, Rudolph",
                "Dasher, Dancer, Prancer, Vixen, Comet, Cupid, Donder, Blitzen, Rudolph",
                "Dasher, Dancer, Prancer, Vixen, Comet, Cupid, Thunder, Blitzen, Rudolph",
            ],
            correct_index: 1,
        },
        on_correct: Some("Donder it is! Your present is unwrapped."),
        on_incorrect: None,
    },
    TriviaItem {
        prompt: "In which country did the Christmas tree tradition originate?",
        media: None,
        rule: AnswerRule::SingleChoice {
            options: &["Norway", "Germany", "Finland"],
            correct_index: 1,
        },
        on_correct: None,
        on_incorrect: Some("It was Germany. Your present disappeared."),
    },
    TriviaItem {
        prompt: "What is the best-selling Christmas song of all time?",
        media: None,
        rule: AnswerRule::SingleChoice {
            options: &["White Christmas by Bing Crosby", "Silent Night", "Jingle Bells"],
            correct_index: 0,
        },
        on_correct: None,
        on_incorrect: None,
    },
    TriviaItem {
        prompt: "In the song 'The Twelve Days of Christmas', what gift is given on the 5th day?",
        media: None,
        rule: AnswerRule::SingleChoice {
            options: &["Five golden rings", "Five calling birds", "Five french hens"],
            correct_index: 0,
        },
        on_correct: None,
        on_incorrect: None,
    },
    TriviaItem {
        prompt: "What beverage is left out for Santa on Christmas Eve?",
        media: None,
        rule: AnswerRule::SingleChoice {
            options: &["Hot chocolate", "Coffee", "Milk"],
            correct_index: 2,
        },
        on_correct: None,
        on_incorrect: None,
    },
    TriviaItem {
        prompt: "Which Christmas movie features the line 'Every time a bell rings, an angel gets his wings'?",
        media: None,
        rule: AnswerRule::SingleChoice {
            options: &["Miracle on 34th Street", "It's a Wonderful Life", "A Christmas Carol"],
            correct_index: 1,
        },
        on_correct: None,
        on_incorrect: None,
    },
    TriviaItem {
        prompt: "What do children in France leave out for Santa Claus?",
        media: None,
        rule: AnswerRule::SingleChoice {
            options: &["Cookies", "Their shoes", "Milk and cookies"],
            correct_index: 1,
        },
        on_correct: None,
        on_incorrect: None,
    },
    TriviaItem {
        prompt: "In what year was the first Christmas card sent?",
        media: None,
        rule: AnswerRule::SingleChoice {
            options: &["1843", "1850", "1837"],
            correct_index: 0,
        },
        on_correct: None,
        on_incorrect: Some("It was 1843, commissioned by Henry Cole."),
    },
    TriviaItem {
        prompt: "",
        media: Some("/static/gift-box.svg"),
        rule: AnswerRule::SingleChoice {
            options: &["A snowman", "A wrapped present", "A sleigh"],
            correct_index: 1,
        },
        on_correct: None,
        on_incorrect: None,
    },
    TriviaItem {
        prompt: "What is the capital of Idaho?",
        media: None,
        rule: AnswerRule::AcceptedAnswers(&["Boise"]),
        on_correct: None,
        on_incorrect: Some("The capital of Idaho is Boise."),
    },
    TriviaItem {
        prompt: "Which reindeer has a red nose?",
        media: None,
        rule: AnswerRule::AcceptedAnswers(&["Rudolph", "Rudolph the Red-Nosed Reindeer"]),
        on_correct: None,
        on_incorrect: None,
    },
    TriviaItem {
        prompt: "What color is Santa's suit?",
        media: None,
        rule: AnswerRule::AcceptedAnswers(&["red", "red and white"]),
        on_correct: None,
        on_incorrect: None,
    },
    TriviaItem {
        prompt: "What is 6 x 7 + 25?",
        media: None,
        rule: AnswerRule::Predicate(equals_sixty_seven),
        on_correct: None,
        on_incorrect: Some("6 x 7 + 25 = 67."),
    },
    TriviaItem {
        prompt: "Name any number greater than 100.",
        media: None,
        rule: AnswerRule::Predicate(more_than_a_hundred),
        on_correct: None,
        on_incorrect: None,
    },
    TriviaItem {
        prompt: "What is your favorite holiday memory?",
        media: None,
        rule: AnswerRule::Predicate(anything_goes),
        on_correct: Some("What a lovely memory! Your present is unwrapped."),
        on_incorrect: None,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trivia::evaluate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_empty_bank_is_refused() {
        static NOTHING: [TriviaItem; 0] = [];
        assert_eq!(TriviaBank::new(&NOTHING).unwrap_err(), BankError::Empty);
    }

    #[test]
    fn test_every_item_is_reachable() {
        let bank = TriviaBank::standard();
        let mut rng = StdRng::seed_from_u64(7);
        let mut hits = vec![0usize; bank.len()];

        for _ in 0..bank.len() * 400 {
            let picked = bank.pick_random(&mut rng);
            let index = bank
                .items()
                .iter()
                .position(|item| std::ptr::eq(item, picked))
                .unwrap();
            hits[index] += 1;
        }

        assert!(hits.iter().all(|&count| count > 0), "hits: {:?}", hits);
    }

    #[test]
    fn test_unanswerable_single_choice_is_refused() {
        static NO_OPTIONS: [TriviaItem; 1] = [TriviaItem {
            prompt: "Pick nothing",
            media: None,
            rule: AnswerRule::SingleChoice {
                options: &[],
                correct_index: 3,
            },
            on_correct: None,
            on_incorrect: None,
        }];
        static OUT_OF_RANGE: [TriviaItem; 1] = [TriviaItem {
            prompt: "Pick the fourth of three",
            media: None,
            rule: AnswerRule::SingleChoice {
                options: &["a", "b", "c"],
                correct_index: 3,
            },
            on_correct: None,
            on_incorrect: None,
        }];

        assert_eq!(
            TriviaBank::new(&NO_OPTIONS).unwrap_err(),
            BankError::InvalidItem("Pick nothing")
        );
        assert_eq!(
            TriviaBank::new(&OUT_OF_RANGE).unwrap_err(),
            BankError::InvalidItem("Pick the fourth of three")
        );
    }

    #[test]
    fn test_standard_catalog_passes_validation() {
        let bank = TriviaBank::new(&STANDARD_CATALOG).unwrap();
        assert_eq!(bank.len(), TriviaBank::standard().len());
    }

    #[test]
    fn test_single_choice_items_are_well_formed() {
        for item in TriviaBank::standard().items() {
            if let AnswerRule::SingleChoice {
                options,
                correct_index,
            } = item.rule
            {
                assert!(!options.is_empty());
                assert!(correct_index < options.len(), "{}", item.prompt);
                for index in 0..options.len() {
                    assert_eq!(
                        evaluate(item, &index.to_string()),
                        index == correct_index,
                        "{}",
                        item.prompt
                    );
                }
            }
        }
    }

    #[test]
    fn test_items_have_a_prompt_or_an_image() {
        for item in TriviaBank::standard().items() {
            assert!(!item.prompt.is_empty() || item.media.is_some());
        }
    }

    #[test]
    fn test_catalog_predicates() {
        assert!(equals_sixty_seven("67"));
        assert!(equals_sixty_seven("67.0"));
        assert!(!equals_sixty_seven("sixty-seven"));
        assert!(more_than_a_hundred("100.5"));
        assert!(!more_than_a_hundred("100"));
        assert!(!more_than_a_hundred("inf"));
        assert!(!more_than_a_hundred("lots"));
        assert!(anything_goes("sledding with my sister"));
    }
}
