use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router, serve,
};
use futures::{sink::SinkExt, stream::StreamExt};
use minijinja::{path_loader, Environment};
use minijinja_autoreload::AutoReloader;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::sync::{broadcast, Mutex};
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::constants::SUPPORTED_MODELS;
use crate::controller::ConversationController;
use crate::conversation::ConversationError;
use crate::gate::{GateError, Transition};

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub templates_dir: PathBuf,
    pub static_dir: PathBuf,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            templates_dir: PathBuf::from("templates"),
            static_dir: PathBuf::from("static"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

/// One-shot toast shown on the next page render.
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub description: String,
}

impl Notice {
    fn new(kind: NoticeKind, title: &str, description: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.to_string(),
            description: description.into(),
        }
    }
}

#[derive(Debug)]
struct PageState {
    notice: Option<Notice>,
    model: String,
}

// Shared application state
#[derive(Clone)]
struct AppState {
    templates: Arc<AutoReloader>,
    controller: Arc<ConversationController>,
    page: Arc<Mutex<PageState>>,
}

impl AppState {
    async fn flash(&self, notice: Notice) {
        self.page.lock().await.notice = Some(notice);
    }
}

#[derive(Debug, Deserialize)]
struct MessageForm {
    #[serde(default)]
    text: String,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnswerForm {
    // Absent when no radio button was picked.
    #[serde(default)]
    answer: String,
}

// Minijinja Environment setup
fn create_minijinja_env(templates_dir: PathBuf) -> AutoReloader {
    AutoReloader::new(move |notifier| {
        let mut env = Environment::new();
        env.set_loader(path_loader(&templates_dir));
        notifier.watch_path(&templates_dir, true);
        Ok(env)
    })
}

async fn index_handler(State(state): State<AppState>) -> Response {
    let transcript = state.controller.transcript().await;
    let (notice, model) = {
        let mut page = state.page.lock().await;
        (page.notice.take(), page.model.clone())
    };

    let rendered = state.templates.acquire_env().and_then(|env| {
        env.get_template("index.html").and_then(|tmpl| {
            tmpl.render(minijinja::context! {
                title => "Claude Gift Wrapper",
                transcript => transcript,
                models => SUPPORTED_MODELS,
                selected_model => model,
                notice => notice,
            })
        })
    });

    match rendered {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Failed to get or render template: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!("Internal Server Error: {}", e)),
            )
                .into_response()
        }
    }
}

async fn transcript_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.controller.transcript().await)
}

async fn message_handler(State(state): State<AppState>, Form(form): Form<MessageForm>) -> Redirect {
    let model = state.controller.resolve_model(form.model.as_deref());
    state.page.lock().await.model = model.clone();

    match state
        .controller
        .submit_user_text(&form.text, Some(&model))
        .await
    {
        Ok(delivered) => {
            state
                .flash(Notice::new(
                    NoticeKind::Success,
                    "Response received",
                    format!(
                        "Used {} input tokens, {} output tokens",
                        delivered.usage.input_tokens, delivered.usage.output_tokens
                    ),
                ))
                .await;
        }
        Err(e) if !e.is_rejection() => {
            state
                .flash(Notice::new(NoticeKind::Error, "Error", e.to_string()))
                .await;
        }
        Err(e) => info!("Submission ignored: {}", e),
    }
    Redirect::to("/")
}

async fn engage_handler(State(state): State<AppState>, Path(id): Path<usize>) -> Redirect {
    if let Err(e) = state.controller.engage(id).await {
        report_gate_error(&state, e).await;
    }
    Redirect::to("/")
}

async fn answer_handler(
    State(state): State<AppState>,
    Path(id): Path<usize>,
    Form(form): Form<AnswerForm>,
) -> Redirect {
    match state.controller.answer(id, &form.answer).await {
        Ok(transition) => flash_transition(&state, transition).await,
        Err(e) => report_gate_error(&state, e).await,
    }
    Redirect::to("/")
}

async fn give_up_handler(State(state): State<AppState>, Path(id): Path<usize>) -> Redirect {
    match state.controller.give_up(id).await {
        Ok(transition) => flash_transition(&state, transition).await,
        Err(e) => report_gate_error(&state, e).await,
    }
    Redirect::to("/")
}

async fn flash_transition(state: &AppState, transition: Transition) {
    let notice = match transition {
        Transition::Revealed { feedback } => {
            Notice::new(NoticeKind::Success, "Response Unwrapped!", feedback)
        }
        Transition::Discarded { feedback } => {
            Notice::new(NoticeKind::Error, "Present lost", feedback)
        }
        Transition::Opened(_) | Transition::Unchanged => return,
    };
    state.flash(notice).await;
}

async fn report_gate_error(state: &AppState, e: ConversationError) {
    match e {
        ConversationError::Gate(GateError::EmptySubmission) => {
            state
                .flash(Notice::new(NoticeKind::Info, "Almost there", e.to_string()))
                .await;
        }
        other => warn!("Gate action rejected: {}", other),
    }
}

// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    info!("WebSocket connection upgrade requested");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

// Pushes conversation events to one client until it goes away
async fn handle_socket(socket: WebSocket, state: AppState) {
    info!("New WebSocket connection established");
    let mut events = state.controller.subscribe();
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        let json_msg = match serde_json::to_string(&event) {
                            Ok(json_msg) => json_msg,
                            Err(e) => {
                                error!("Failed to serialize conversation event: {}", e);
                                continue;
                            }
                        };
                        if sender.send(Message::Text(json_msg)).await.is_err() {
                            warn!("WebSocket client disconnected or send error. Closing connection.");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "WebSocket client lagged behind conversation events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(Message::Text(text))) => {
                        warn!("Ignoring text message from client: {}", text);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket receive error: {}", e);
                        break;
                    }
                }
            }
        }
    }
    info!("WebSocket connection closed");
}

/// Builds the application router around a controller.
pub fn router(controller: Arc<ConversationController>, config: &WebConfig) -> Router {
    let model = controller.settings().default_model.clone();
    let state = AppState {
        templates: Arc::new(create_minijinja_env(config.templates_dir.clone())),
        controller,
        page: Arc::new(Mutex::new(PageState {
            notice: None,
            model,
        })),
    };

    Router::new()
        .route("/", get(index_handler))
        .route("/messages", post(message_handler))
        .route("/entries/:id/engage", post(engage_handler))
        .route("/entries/:id/answer", post(answer_handler))
        .route("/entries/:id/give-up", post(give_up_handler))
        .route("/api/transcript", get(transcript_handler))
        .route("/ws", get(ws_handler))
        .nest_service("/static", ServeDir::new(&config.static_dir))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

pub async fn start_web_server(
    port: u16,
    controller: Arc<ConversationController>,
    config: WebConfig,
) -> Result<()> {
    let app = router(controller, &config);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Web server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;

    serve(listener, app.into_make_service())
        .await
        .context("Web server failed")?;

    Ok(())
}
