#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use giftwrap::bank::TriviaBank;
use giftwrap::completion::{
    CompletionError, CompletionReply, CompletionRequest, CompletionService, TokenUsage,
};
use giftwrap::controller::{ControllerSettings, ConversationController};
use giftwrap::trivia::{AnswerRule, TriviaItem};
use rand::rngs::StdRng;
use rand::SeedableRng;
use reqwest::StatusCode;
use tokio::sync::{Mutex, Notify};

/// A one-question bank so tests know the right answer ("2").
pub static MILK: [TriviaItem; 1] = [TriviaItem {
    prompt: "What beverage is left out for Santa on Christmas Eve?",
    media: None,
    rule: AnswerRule::SingleChoice {
        options: &["Hot chocolate", "Coffee", "Milk"],
        correct_index: 2,
    },
    on_correct: None,
    on_incorrect: None,
}];

pub const MILK_ANSWER: &str = "2";
pub const WRONG_ANSWER: &str = "0";

pub fn milk_bank() -> TriviaBank {
    TriviaBank::new(&MILK).unwrap()
}

/// Replays canned replies in order and records every request.
#[derive(Default)]
pub struct ScriptedService {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl ScriptedService {
    pub fn replying(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            ..Default::default()
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::from(vec![Err(message.to_string())])),
            ..Default::default()
        })
    }

    /// Holds every call until `release` is notified.
    pub fn held(replies: &[&str], release: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            gate: Some(release),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedService {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionReply, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        match self.replies.lock().await.pop_front() {
            Some(Ok(text)) => Ok(CompletionReply {
                text,
                usage: TokenUsage {
                    input_tokens: 10,
                    output_tokens: 3,
                },
            }),
            Some(Err(message)) => Err(CompletionError::Api {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message,
            }),
            None => Err(CompletionError::Api {
                status: StatusCode::SERVICE_UNAVAILABLE,
                message: "no scripted reply left".to_string(),
            }),
        }
    }
}

pub fn controller(service: Arc<ScriptedService>) -> ConversationController {
    ConversationController::with_rng(
        service,
        milk_bank(),
        ControllerSettings::default(),
        StdRng::seed_from_u64(42),
    )
}
