use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use chat_widget::chat_client::ChatClient;
use chat_widget::cli::chat::ChatContext;
use chat_widget::cli::chat::widget::LateReplyPolicy;
use chat_widget::config::{Config, Overrides};
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use eyre::Result;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    chat: ChatArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a chat session
    Chat(ChatArgs),
}

#[derive(Args, Clone)]
struct ChatArgs {
    /// Send a single message and exit
    #[arg(short, long)]
    input: Option<String>,

    /// Base URL of the chat service (default: $CHAT_API_URL or http://localhost:8000)
    #[arg(long)]
    api_url: Option<String>,

    /// Seconds to wait for a reply before giving up
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Do not keep the conversation id between messages
    #[arg(long)]
    no_conversation_id: bool,

    /// What to do with a reply that arrives after a reset
    #[arg(long, value_parser = parse_late_reply)]
    late_reply: Option<LateReplyPolicy>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl ChatArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            api_url: self.api_url.clone(),
            timeout_secs: self.timeout_secs,
            no_conversation_id: self.no_conversation_id,
            late_reply: self.late_reply,
        }
    }
}

fn parse_late_reply(raw: &str) -> Result<LateReplyPolicy, String> {
    raw.parse().map_err(|e: eyre::Report| e.to_string())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();
    let args = match cli.command {
        Some(Commands::Chat(args)) => args,
        None => cli.chat,
    };

    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = Config::from_env()?;
    config.apply(&args.overrides())?;

    info!("Starting chat widget against {}", config.api_url);

    let client = match ChatClient::new(&config.api_url, config.timeout) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to initialize chat client: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let mut chat_context = ChatContext::new(
        Box::new(io::stdout()),
        args.input,
        true,
        Arc::new(client),
        config.widget,
    );
    chat_context.run().await
}
