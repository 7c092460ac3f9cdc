use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use nova::chat::{self, Interrupts};
use nova::constants;
use nova::dictation::Dictation;
use nova::gateway::{GatewayConfig, GeminiGateway};
use nova::location::Location;
use nova::turn::TurnController;
use nova::ConversationStore;

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Gemini model to call.
    #[arg(long, global = true)]
    model: Option<String>,

    /// Base URL of the Generative Language API.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Environment variable holding the API key.
    #[arg(long, global = true, env = "NOVA_API_KEY_ENV", default_value = constants::DEFAULT_API_KEY_ENV)]
    api_key_env: String,

    /// Current position as "<latitude>,<longitude>".
    #[arg(long, global = true, env = "NOVA_LOCATION")]
    location: Option<Location>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Chat with Nova interactively. Type /voice for simulated voice input, /quit to leave.
    Chat,
    /// Send a single request and print the reply.
    Ask {
        prompt: String,
        #[arg(long, help = "Print the reply message as JSON.")]
        json: bool,
    },
    /// Simulate a spoken request and submit it.
    Voice {
        #[arg(long, default_value_t = constants::DICTATION_TICK_MS, help = "Milliseconds per revealed character.")]
        tick_ms: u64,
    },
}

impl Cli {
    fn gateway_config(&self) -> GatewayConfig {
        let defaults = GatewayConfig::default();
        GatewayConfig {
            base_url: self.base_url.clone().unwrap_or(defaults.base_url),
            model: self.model.clone().unwrap_or(defaults.model),
            api_key_env: self.api_key_env.clone(),
            api_key: None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for environment variables like API keys)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG; logs go to stderr so stdout carries only the transcript.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("Nova starting with command: {:?}", cli.command);

    let gateway = Arc::new(GeminiGateway::new(cli.gateway_config()));
    let settle = Duration::from_millis(constants::DICTATION_SETTLE_MS);
    let mut stdout = std::io::stdout();

    match cli.command {
        Commands::Chat => {
            let controller = TurnController::with_store(
                gateway,
                cli.location,
                ConversationStore::with_greeting(constants::GREETING),
            );
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut interrupts = Interrupts::ctrl_c();
            chat::run_chat(&controller, stdin, &mut stdout, Dictation::demo, settle, &mut interrupts)
                .await
                .context("Chat session failed")?;
        }
        Commands::Ask { prompt, json } => {
            if prompt.trim().is_empty() {
                anyhow::bail!("prompt is empty");
            }
            let controller = TurnController::new(gateway, cli.location);
            if json {
                let outcome = controller.submit(&prompt).await;
                info!(?outcome, "Turn finished");
                let reply = controller.transcript().pop().context("No reply recorded")?;
                println!("{}", serde_json::to_string_pretty(&reply)?);
            } else {
                chat::run_turn(&controller, &prompt, &mut stdout).await?;
            }
        }
        Commands::Voice { tick_ms } => {
            let controller = TurnController::new(gateway, cli.location);
            let dictation = Dictation::new(constants::DEMO_UTTERANCE, Duration::from_millis(tick_ms));
            let mut interrupts = Interrupts::ctrl_c();
            let outcome = chat::run_voice_turn(&controller, dictation, settle, &mut stdout, &mut interrupts).await?;
            info!(?outcome, "Voice turn finished");
        }
    }

    Ok(())
}
