use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use giftwrap::bank::TriviaBank;
use giftwrap::chat;
use giftwrap::completion::AnthropicClient;
use giftwrap::constants;
use giftwrap::controller::{ControllerSettings, ConversationController};
use giftwrap::web_server::{self, WebConfig};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug)]
struct ModelArgs {
    #[arg(long, env = "GIFTWRAP_MODEL", help = "Default model for completions.")]
    model: Option<String>,
    #[arg(long, env = "GIFTWRAP_MAX_TOKENS", default_value_t = constants::DEFAULT_MAX_TOKENS, help = "Maximum output tokens per reply.")]
    max_tokens: u32,
}

// Define the available subcommands
#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the gift-wrapped chat web server.
    Start {
        #[arg(long, env = "GIFTWRAP_PORT", default_value_t = 9900, help = "Port for the web server.")]
        port: u16,
        #[arg(long, default_value = "templates", help = "Directory holding the page templates.")]
        templates_dir: PathBuf,
        #[arg(long, default_value = "static", help = "Directory served under /static.")]
        static_dir: PathBuf,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Chat in the terminal instead of the browser.
    Chat {
        #[command(flatten)]
        model: ModelArgs,
    },
}

fn build_controller(args: ModelArgs) -> Arc<ConversationController> {
    if constants::ANTHROPIC_API_KEY.is_empty() {
        warn!("ANTHROPIC_API_KEY is not set; every message will fail until it is");
    }
    let settings = ControllerSettings {
        default_model: args
            .model
            .unwrap_or_else(|| constants::DEFAULT_MODEL.to_string()),
        max_tokens: args.max_tokens,
    };
    Arc::new(ConversationController::new(
        Arc::new(AnthropicClient::from_env()),
        TriviaBank::standard(),
        settings,
    ))
}

// The main entry point of the application, using tokio's async runtime
#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for ANTHROPIC_API_KEY and friends)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG (e.g. RUST_LOG=info,giftwrap=debug)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("giftwrap starting with command: {:?}", cli.command);

    match cli.command {
        Commands::Start {
            port,
            templates_dir,
            static_dir,
            model,
        } => {
            info!("Starting web server on port {}...", port);
            let controller = build_controller(model);
            let config = WebConfig {
                templates_dir,
                static_dir,
            };

            let mut web_server_handle = tokio::spawn(async move {
                if let Err(e) = web_server::start_web_server(port, controller, config).await {
                    error!("Web server failed: {:?}", e);
                }
            });

            let ctrl_c = tokio::signal::ctrl_c();
            // Pin the ctrl_c future to the stack so its address is stable
            tokio::pin!(ctrl_c);

            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Ctrl-C received, initiating shutdown...");
                }
                res = &mut web_server_handle => {
                    match res {
                        Ok(_) => info!("Web server task completed unexpectedly."),
                        Err(e) if e.is_panic() => error!("Web server task panicked: {:?}", e),
                        Err(e) => error!("Web server task failed: {:?}", e),
                    }
                }
            }

            if !web_server_handle.is_finished() {
                info!("Aborting web server task...");
                web_server_handle.abort();
            }
            info!("Shutdown complete.");
        }
        Commands::Chat { model } => {
            let controller = build_controller(model);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut stdout = std::io::stdout();
            chat::run_chat(&controller, stdin, &mut stdout)
                .await
                .context("Chat session failed")?;
        }
    }

    Ok(())
}
