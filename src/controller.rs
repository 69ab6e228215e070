//! Drives a conversation: completion calls in, gate actions, change events out.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use crate::bank::TriviaBank;
use crate::completion::{
    CompletionError, CompletionReply, CompletionRequest, CompletionService, Role, TokenUsage,
};
use crate::constants;
use crate::conversation::{
    Conversation, ConversationError, ConversationEvent, SubmitError, TranscriptView,
};
use crate::gate::Transition;

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Model used when a submission names none, or an unsupported one.
    pub default_model: String,
    pub max_tokens: u32,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            default_model: constants::DEFAULT_MODEL.to_string(),
            max_tokens: constants::DEFAULT_MAX_TOKENS,
        }
    }
}

/// A reply that arrived and was wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivered {
    pub entry_id: usize,
    pub usage: TokenUsage,
}

struct Session {
    conversation: Conversation,
    rng: StdRng,
}

pub struct ConversationController {
    service: Arc<dyn CompletionService>,
    bank: TriviaBank,
    settings: ControllerSettings,
    session: Arc<Mutex<Session>>,
    events: broadcast::Sender<ConversationEvent>,
}

impl ConversationController {
    pub fn new(
        service: Arc<dyn CompletionService>,
        bank: TriviaBank,
        settings: ControllerSettings,
    ) -> Self {
        Self::with_rng(service, bank, settings, StdRng::from_entropy())
    }

    /// Same as [`ConversationController::new`] with a caller-supplied random source.
    pub fn with_rng(
        service: Arc<dyn CompletionService>,
        bank: TriviaBank,
        settings: ControllerSettings,
        rng: StdRng,
    ) -> Self {
        let (events, _) = broadcast::channel(100);
        Self {
            service,
            bank,
            settings,
            session: Arc::new(Mutex::new(Session {
                conversation: Conversation::new(),
                rng,
            })),
            events,
        }
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.events.subscribe()
    }

    /// Picks the requested model when it is one we offer.
    pub fn resolve_model(&self, requested: Option<&str>) -> String {
        match requested.map(str::trim).filter(|model| !model.is_empty()) {
            Some(model) if constants::is_supported_model(model) => model.to_string(),
            Some(model) => {
                warn!(model, "Unsupported model requested, using default");
                self.settings.default_model.clone()
            }
            None => self.settings.default_model.clone(),
        }
    }

    /// Sends the user's text and wraps the reply in a sealed gate.
    ///
    /// Empty text and submissions made while a reply is pending are
    /// refused without touching the transcript or calling the service.
    pub async fn submit_user_text(
        &self,
        text: &str,
        model: Option<&str>,
    ) -> Result<Delivered, SubmitError> {
        let messages = {
            let mut session = self.session.lock().await;
            let messages = session.conversation.begin_exchange(text)?;
            let id = session.conversation.len() - 1;
            self.publish(ConversationEvent::EntryAppended { id, role: Role::User });
            messages
        };

        let request = CompletionRequest {
            model: self.resolve_model(model),
            max_tokens: self.settings.max_tokens,
            messages,
        };
        info!(model = %request.model, messages = request.messages.len(), "Requesting completion");

        // Runs detached: the exchange settles even if this caller is dropped.
        let service = Arc::clone(&self.service);
        let session = Arc::clone(&self.session);
        let events = self.events.clone();
        let exchange = tokio::spawn(async move {
            let result = service.complete(&request).await;
            settle_exchange(&session, &events, result).await
        });

        match exchange.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Completion task failed: {}", e);
                self.session.lock().await.conversation.abort_exchange();
                publish(
                    &self.events,
                    ConversationEvent::RequestFailed {
                        message: SubmitError::Interrupted.to_string(),
                    },
                );
                Err(SubmitError::Interrupted)
            }
        }
    }

    /// Opens (or re-shows) the trivia challenge for reply `id`.
    pub async fn engage(&self, id: usize) -> Result<Transition, ConversationError> {
        let mut session = self.session.lock().await;
        self.engage_locked(&mut session, id)
    }

    pub async fn answer(&self, id: usize, submission: &str) -> Result<Transition, ConversationError> {
        let mut session = self.session.lock().await;
        let gate = session.conversation.gate_mut(id)?;
        let transition = gate.submit(submission)?;
        if transition.is_settled() {
            let status = gate.status();
            info!(id, ?status, "Present settled");
            self.publish(ConversationEvent::EntryUpdated { id, status });
        }
        Ok(transition)
    }

    pub async fn give_up(&self, id: usize) -> Result<Transition, ConversationError> {
        let mut session = self.session.lock().await;
        let gate = session.conversation.gate_mut(id)?;
        let transition = gate.abandon();
        if transition.is_settled() {
            info!(id, "Challenge abandoned");
            self.publish(ConversationEvent::EntryUpdated {
                id,
                status: gate.status(),
            });
        }
        Ok(transition)
    }

    /// Engages the most recent wrapped reply.
    pub async fn engage_newest(&self) -> Option<(usize, Transition)> {
        let mut session = self.session.lock().await;
        let id = session.conversation.newest_sealed()?;
        let transition = self.engage_locked(&mut session, id).ok()?;
        Some((id, transition))
    }

    pub async fn transcript(&self) -> TranscriptView {
        self.session.lock().await.conversation.view()
    }

    pub async fn is_busy(&self) -> bool {
        self.session.lock().await.conversation.is_in_flight()
    }

    fn engage_locked(
        &self,
        session: &mut Session,
        id: usize,
    ) -> Result<Transition, ConversationError> {
        let Session { conversation, rng } = session;
        let transition = conversation.gate_mut(id)?.engage(&self.bank, rng);
        if let Transition::Opened(item) = transition {
            debug!(id, prompt = item.prompt, "Challenge opened");
            self.publish(ConversationEvent::ChallengeOpened { id });
        }
        Ok(transition)
    }

    fn publish(&self, event: ConversationEvent) {
        publish(&self.events, event);
    }
}

/// Records the outcome of a completion call and ends the exchange.
async fn settle_exchange(
    session: &Mutex<Session>,
    events: &broadcast::Sender<ConversationEvent>,
    result: Result<CompletionReply, CompletionError>,
) -> Result<Delivered, SubmitError> {
    let mut session = session.lock().await;
    match result {
        Ok(reply) => {
            let entry_id = session.conversation.complete_exchange(reply.text);
            info!(
                entry_id,
                input_tokens = reply.usage.input_tokens,
                output_tokens = reply.usage.output_tokens,
                "Reply wrapped"
            );
            publish(
                events,
                ConversationEvent::EntryAppended {
                    id: entry_id,
                    role: Role::Assistant,
                },
            );
            Ok(Delivered {
                entry_id,
                usage: reply.usage,
            })
        }
        Err(e) => {
            session.conversation.abort_exchange();
            warn!("Completion failed: {}", e);
            publish(
                events,
                ConversationEvent::RequestFailed {
                    message: e.to_string(),
                },
            );
            Err(SubmitError::Service(e))
        }
    }
}

fn publish(events: &broadcast::Sender<ConversationEvent>, event: ConversationEvent) {
    // No subscribers is fine.
    let _ = events.send(event);
}
