// Terminal front end for the same gift-wrapped conversation the web UI drives.

use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::info;

use crate::controller::ConversationController;
use crate::conversation::ConversationError;
use crate::gate::{GateError, Transition};
use crate::trivia::TriviaItem;

const HELP: &str = "Type a message and press Enter. Commands: /unwrap, /giveup, /quit";

/// Runs the chat loop until `/quit` or end of input.
pub async fn run_chat<R, W>(controller: &ConversationController, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    info!("Starting terminal chat session...");
    writeln!(out, "{}", HELP)?;

    let mut lines = input.lines();
    // Reply whose challenge is waiting for an answer.
    let mut pending: Option<usize> = None;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "/quit" => break,
            "/giveup" => {
                match pending.take() {
                    Some(id) => {
                        let transition = controller.give_up(id).await?;
                        print_transition(controller, id, transition, out).await?;
                    }
                    None => writeln!(out, "There is no open challenge.")?,
                }
            }
            "/unwrap" => {
                // An open challenge is shown again rather than starting another.
                let opened = match pending {
                    Some(id) => controller.engage(id).await.ok().map(|t| (id, t)),
                    None => controller.engage_newest().await,
                };
                match opened {
                    Some((id, Transition::Opened(item))) => {
                        print_challenge(item, out)?;
                        pending = Some(id);
                    }
                    Some(_) | None => {
                        pending = None;
                        writeln!(out, "No wrapped presents to open.")?;
                    }
                }
            }
            _ => match pending {
                Some(id) => {
                    match controller.answer(id, line).await {
                        Ok(transition) => {
                            pending = None;
                            print_transition(controller, id, transition, out).await?;
                        }
                        Err(ConversationError::Gate(GateError::EmptySubmission)) => {
                            writeln!(out, "Pick or type an answer first (or /giveup).")?;
                        }
                        Err(e) => {
                            pending = None;
                            writeln!(out, "Could not answer: {}", e)?;
                        }
                    }
                }
                None => submit(controller, line, out).await?,
            },
        }
    }

    info!("Chat session finished.");
    Ok(())
}

async fn submit<W: Write>(controller: &ConversationController, text: &str, out: &mut W) -> Result<()> {
    match controller.submit_user_text(text, None).await {
        Ok(delivered) => {
            writeln!(
                out,
                "A present arrived! Type /unwrap to open it. (Used {} input tokens, {} output tokens)",
                delivered.usage.input_tokens, delivered.usage.output_tokens
            )?;
        }
        Err(e) if !e.is_rejection() => writeln!(out, "Error: {}", e)?,
        Err(e) => info!("Submission ignored: {}", e),
    }
    Ok(())
}

fn print_challenge<W: Write>(item: &TriviaItem, out: &mut W) -> Result<()> {
    writeln!(out, "Christmas Trivia Challenge!")?;
    if let Some(media) = item.media {
        writeln!(out, "[picture: {}]", media)?;
    }
    if !item.prompt.is_empty() {
        writeln!(out, "{}", item.prompt)?;
    }
    if let Some(options) = item.options() {
        for (index, option) in options.iter().enumerate() {
            writeln!(out, "  {}) {}", index, option)?;
        }
        writeln!(out, "Answer with the option number.")?;
    }
    Ok(())
}

async fn print_transition<W: Write>(
    controller: &ConversationController,
    id: usize,
    transition: Transition,
    out: &mut W,
) -> Result<()> {
    match transition {
        Transition::Revealed { feedback } => {
            writeln!(out, "{}", feedback)?;
            let transcript = controller.transcript().await;
            if let Some(text) = transcript.entries.get(id).and_then(|entry| entry.text.as_deref()) {
                writeln!(out, "{}", text)?;
            }
        }
        Transition::Discarded { feedback } => writeln!(out, "{}", feedback)?,
        Transition::Opened(_) | Transition::Unchanged => {}
    }
    Ok(())
}
